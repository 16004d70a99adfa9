mod common;

use common::{constant_program, dev, sum_program, verify_dev};
use zkc_sdk::{
    codec, execute_with_input, join_segment_receipts, join_succinct_receipts, journal_digest,
    lift_segment_receipt, prove_segment, reduce_succinct_receipts, verify, verify_receipt,
    verify_receipt_with, verify_segment_receipt, Digest, ExitCode, Image, ProverOpts, Receipt,
    RecursionError, ReductionStrategy, SegmentReceipt, SessionProver, SuccinctReceipt,
};

fn test_opts() -> ProverOpts {
    ProverOpts::default().with_workers(4).with_memory_budget(1 << 30)
}

fn prove_all(image: &Image, limit: u32) -> Vec<SegmentReceipt> {
    let (segments, _) = execute_with_input(image, &[], limit).unwrap();
    segments.into_iter().map(|s| prove_segment(s).unwrap()).collect()
}

#[test]
fn constant_output_end_to_end() {
    let constant = *b"zkc!";
    let image = constant_program(constant);
    let (segments, info) = execute_with_input(&image, &[], 1 << 16).unwrap();
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].exit_code, ExitCode::Halted(0));
    assert_eq!(info.journal, constant);

    let receipt = prove_segment(segments.into_iter().next().unwrap()).unwrap();
    let succinct = join_segment_receipts(vec![receipt]).unwrap();
    assert_eq!(succinct.claim.exit.output_digest, journal_digest(&constant));
    assert!(verify_dev(&succinct, &image.config_digest(), &journal_digest(&constant)));
    assert!(succinct.verify_session_with(&dev(), &image, &journal_digest(&constant)));

    for i in 0..constant.len() {
        let mut flipped = constant;
        flipped[i] ^= 0x01;
        assert!(!verify_dev(&succinct, &image.config_digest(), &journal_digest(&flipped)));
    }
    assert!(!verify_dev(&succinct, &Digest::hash(b"other config"), &journal_digest(&constant)));
}

#[test]
fn segmentation_is_transparent() {
    let image = sum_program(40);
    let (_, whole) = execute_with_input(&image, &[], 1 << 16).unwrap();
    assert_eq!(whole.journal, 820u32.to_le_bytes());
    for limit in [1, 2, 7, 16, 64] {
        let (segments, info) = execute_with_input(&image, &[], limit).unwrap();
        assert_eq!(info.output_digest, whole.output_digest, "limit {limit}");
        assert_eq!(info.journal, whole.journal);
        assert_eq!(info.total_cycles, whole.total_cycles);
        assert_eq!(info.exit_code, ExitCode::Halted(0));
        let cycles: u64 = segments.iter().map(|s| s.instruction_count as u64).sum();
        assert_eq!(cycles, info.total_cycles);
    }
}

#[test]
fn segments_form_a_chain() {
    let image = sum_program(30);
    let (segments, _) = execute_with_input(&image, &[], 9).unwrap();
    assert!(segments.len() > 5);
    assert_eq!(segments[0].start_commitment, image.entry_state());
    for pair in segments.windows(2) {
        assert_eq!(pair[0].end_commitment, pair[1].start_commitment);
        assert_eq!(pair[0].exit_code, ExitCode::SystemSplit);
    }
}

#[test]
fn every_segment_round_trips_and_corruption_fails() {
    let image = sum_program(12);
    for receipt in prove_all(&image, 16) {
        verify_segment_receipt(&receipt).unwrap();

        let mut corrupted = receipt.clone();
        let mut bytes = *corrupted.claim.end_commitment.as_bytes();
        bytes[0] ^= 1;
        corrupted.claim.end_commitment = Digest::from(bytes);
        assert!(verify_segment_receipt(&corrupted).is_err());
        assert!(verify_receipt(&Receipt::Segment(corrupted)).is_err());
    }
}

#[test]
fn tampered_proof_bytes_are_never_lifted() {
    let image = sum_program(12);
    let receipt = prove_all(&image, 1 << 16).remove(0);
    for at in [0, receipt.seal.len() / 3, receipt.seal.len() / 2, receipt.seal.len() - 1] {
        let mut tampered = receipt.clone();
        tampered.seal[at] ^= 0x80;
        assert!(
            matches!(lift_segment_receipt(&tampered), Err(RecursionError::InvalidReceipt(_))),
            "byte {at}"
        );
    }
}

#[test]
fn dev_mode_receipts_need_an_explicit_opt_in() {
    let constant = *b"dev!";
    let image = constant_program(constant);
    let receipt = join_segment_receipts(prove_all(&image, 1 << 16)).unwrap();
    let journal = journal_digest(&constant);

    assert!(!verify(&receipt, &image.config_digest(), &journal));
    assert!(!receipt.verify_session(&image, &journal));
    let as_receipt = Receipt::Succinct(receipt.clone());
    assert_eq!(verify_receipt(&as_receipt), Err(RecursionError::DevModeSeal));

    verify_receipt_with(&dev(), &as_receipt).unwrap();
    assert!(verify_dev(&receipt, &image.config_digest(), &journal));
}

#[test]
fn reduce_lifted_receipts_by_hand() {
    let image = sum_program(12);
    let lifted: Vec<SuccinctReceipt> =
        prove_all(&image, 20).iter().map(|r| lift_segment_receipt(r).unwrap()).collect();
    let count = lifted.len() as u32;

    let tree = reduce_succinct_receipts(lifted.clone(), ReductionStrategy::Tree).unwrap();
    let fold = reduce_succinct_receipts(lifted, ReductionStrategy::Fold).unwrap();
    assert_eq!(tree.claim, fold.claim);
    assert_eq!(tree.span.count, count);
    assert_eq!(fold.recursion_depth, count - 1);
    let sum = journal_digest(&78u32.to_le_bytes());
    assert!(tree.verify_session_with(&dev(), &image, &sum));
    assert_eq!(
        reduce_succinct_receipts(Vec::new(), ReductionStrategy::Tree),
        Err(RecursionError::EmptyInput)
    );
}

#[test]
fn join_is_associative() {
    let image = sum_program(12);
    let lifted: Vec<SuccinctReceipt> =
        prove_all(&image, 20).iter().map(|r| lift_segment_receipt(r).unwrap()).collect();
    assert!(lifted.len() >= 3);
    let (a, b, c) = (&lifted[0], &lifted[1], &lifted[2]);
    let left = join_succinct_receipts(&join_succinct_receipts(a, b).unwrap(), c).unwrap();
    let right = join_succinct_receipts(a, &join_succinct_receipts(b, c).unwrap()).unwrap();
    assert_eq!(left.claim.start_commitment, right.claim.start_commitment);
    assert_eq!(left.claim.end_commitment, right.claim.end_commitment);
    assert_eq!(left.claim, right.claim);
}

#[test]
fn claims_do_not_depend_on_the_segment_limit() {
    let image = sum_program(20);
    let prover = SessionProver::new(test_opts()).unwrap();
    let n = 10;
    let (short, _) = execute_with_input(&image, &[], n).unwrap();
    let (long, _) = execute_with_input(&image, &[], 2 * n).unwrap();
    assert_ne!(short.len(), long.len());

    let a = prover.prove_session(short).unwrap();
    let b = prover.prove_session(long).unwrap();
    assert_eq!(a.claim, b.claim);
    assert_ne!(a.span.count, b.span.count);
    assert_ne!(a.seal, b.seal);
    assert_eq!(a.span.cycles, b.span.cycles);
    assert!(a.verify_session_with(&dev(), &image, &journal_digest(&210u32.to_le_bytes())));
}

#[test]
fn session_prover_matches_sequential_join() {
    let image = sum_program(15);
    let (_, info) = execute_with_input(&image, &[], 8).unwrap();
    let sequential = join_segment_receipts(prove_all(&image, 8)).unwrap();

    for reduction in [ReductionStrategy::Tree, ReductionStrategy::Fold] {
        let prover = SessionProver::new(test_opts().with_reduction(reduction)).unwrap();
        let (segments, _) = execute_with_input(&image, &[], 8).unwrap();
        let receipt = prover.prove_session(segments).unwrap();
        assert_eq!(receipt.claim, sequential.claim);
        assert_eq!(receipt.span.count, info.segment_count);
        assert!(verify_dev(&receipt, &image.config_digest(), &info.output_digest));
    }
}

#[test]
fn receipts_survive_the_canonical_encoding() {
    let image = constant_program(*b"abcd");
    let (segments, _) = execute_with_input(&image, &[], 1 << 16).unwrap();
    let receipt = zkc_sdk::prove_session(segments).unwrap();

    let bytes = codec::encode(&receipt).unwrap();
    let decoded: SuccinctReceipt = codec::decode(&bytes).unwrap();
    assert_eq!(decoded, receipt);
    assert!(verify_dev(&decoded, &image.config_digest(), &journal_digest(b"abcd")));

    let image_bytes = codec::encode(&image).unwrap();
    let decoded_image: Image = codec::decode(&image_bytes).unwrap();
    assert_eq!(decoded_image.entry_state(), image.entry_state());

    let json = serde_json::to_string(&receipt.claim).unwrap();
    assert_eq!(serde_json::from_str::<zkc_sdk::SuccinctClaim>(&json).unwrap(), receipt.claim);
}

//! Segment receipt verification.
//!
//! Every row is replayed through [`zkc_core::step`] with ports that only answer with the
//! witness values carried by the row. Any access the row did not authenticate marks the replay
//! as invalid.

use rayon::prelude::*;
use tracing::debug;
use zkc_core::{
    step, Digest, ExitCode, FaultReason, HostPort, HostReply, MemoryPort, StepOutcome, SystemState,
    VmParams,
};

use crate::{
    last_outcome_matches, needs_instruction, trace_root, DataWitness, FetchWitness, ProofSystemTag,
    SegmentClaim, SegmentReceipt, StepWitness, VerificationError,
};

#[derive(Default)]
struct ReplayMemory<'a> {
    fetch: Option<&'a FetchWitness>,
    data: Option<&'a DataWitness>,
    fetched: bool,
    loaded: bool,
    stored: bool,
    invalid: bool,
}

impl MemoryPort for ReplayMemory<'_> {
    fn fetch(&mut self, pc: u32) -> u32 {
        match self.fetch {
            Some(f) if f.addr == pc && !self.fetched => {
                self.fetched = true;
                f.value
            }
            _ => {
                self.invalid = true;
                0
            }
        }
    }

    fn load_word(&mut self, addr: u32) -> u32 {
        match self.data {
            Some(d) if d.addr == addr && !self.loaded => {
                self.loaded = true;
                d.old
            }
            _ => {
                self.invalid = true;
                0
            }
        }
    }

    fn store_word(&mut self, addr: u32, value: u32) {
        match self.data {
            Some(d) if d.addr == addr && d.new == value && self.loaded && !self.stored => {
                self.stored = true
            }
            _ => self.invalid = true,
        }
    }
}

struct ReplayHost {
    reply: Option<HostReply>,
    used: bool,
    invalid: bool,
}

impl HostPort for ReplayHost {
    fn host_call(&mut self, _syscall: u32) -> HostReply {
        match self.reply {
            Some(reply) if !self.used => {
                self.used = true;
                reply
            }
            _ => {
                self.invalid = true;
                HostReply::default()
            }
        }
    }
}

/// Re-executes one row. Returns the step result and the state it leads to.
fn replay_row(
    params: &VmParams,
    index: u32,
    row: &StepWitness,
) -> Result<(Result<StepOutcome, FaultReason>, SystemState), VerificationError> {
    let invalid = |reason: &str| VerificationError::InvalidTransition {
        row: index,
        reason: reason.to_string(),
    };
    let depth = params.merkle_depth();

    if let Some(f) = &row.fetch {
        if f.addr % 4 != 0 || !f.path.verify_word(&row.memory_root, depth, f.addr >> 2, f.value) {
            return Err(invalid("instruction word not authenticated"));
        }
    }
    if let Some(d) = &row.data {
        if d.addr % 4 != 0 || !d.path.verify_word(&row.memory_root, depth, d.addr >> 2, d.old) {
            return Err(invalid("data word not authenticated"));
        }
    }

    let state = row.state();
    let mut cpu = state.cpu();
    let mut output = state.output();
    let mut mem =
        ReplayMemory { fetch: row.fetch.as_ref(), data: row.data.as_ref(), ..Default::default() };
    let mut host = ReplayHost { reply: row.host, used: false, invalid: false };

    let result = step(params, &mut cpu, &mut output, &mut mem, &mut host);

    if mem.invalid || host.invalid {
        return Err(invalid("access outside the row witness"));
    }
    if mem.fetched != row.fetch.is_some()
        || mem.loaded != row.data.is_some()
        || host.used != row.host.is_some()
    {
        return Err(invalid("unused witness value"));
    }

    let memory_root = match &row.data {
        Some(d) if mem.stored => d.path.root_for_word(d.addr >> 2, d.new),
        Some(d) if d.new != d.old => return Err(invalid("load witness changes memory")),
        _ => row.memory_root,
    };
    Ok((result, SystemState::new(&cpu, memory_root, &output)))
}

/// Checks that row `index` leads to row `index + 1` with the outcome the claim allows
fn check_transition(
    params: &VmParams,
    claim: &SegmentClaim,
    index: u32,
    row: &StepWitness,
    next: &StepWitness,
) -> Result<(), VerificationError> {
    let (result, state) = replay_row(params, index, row)?;
    let outcome = result.map_err(|reason| VerificationError::InvalidTransition {
        row: index,
        reason: format!("row faults: {reason}"),
    })?;
    let allowed = if index + 1 == claim.instruction_count {
        last_outcome_matches(&claim.exit_code, outcome)
    } else {
        outcome == StepOutcome::Continue
    };
    if !allowed {
        return Err(VerificationError::ExitMismatch(format!("row {index} gives {outcome:?}")));
    }
    if state.commitment() != next.state().commitment() {
        return Err(VerificationError::InvalidTransition {
            row: index,
            reason: "next row does not follow".to_string(),
        });
    }
    Ok(())
}

/// Verifies a segment receipt against its own claim
pub fn verify_segment_receipt(receipt: &SegmentReceipt) -> Result<(), VerificationError> {
    let claim = &receipt.claim;
    match receipt.proof_system_tag {
        ProofSystemTag::TraceReplayV1 => {}
    }
    let seal = receipt.decode_seal()?;
    let params = seal.params;
    if params.validate().is_err() || params.config_digest() != claim.config_digest {
        return Err(VerificationError::ConfigMismatch);
    }

    let n = claim.instruction_count;
    if n as u64 > params.max_segment_cycles() || seal.rows.len() as u64 != n as u64 + 1 {
        return Err(VerificationError::MalformedSeal(format!(
            "{} rows for {} instructions",
            seal.rows.len(),
            n
        )));
    }
    if n == 0 && needs_instruction(&claim.exit_code) {
        return Err(VerificationError::ExitMismatch(format!(
            "{} with no instructions",
            claim.exit_code
        )));
    }

    let leaves: Vec<Digest> = seal.rows.par_iter().map(StepWitness::digest).collect();
    if trace_root(leaves) != seal.trace_root {
        return Err(VerificationError::TraceRootMismatch);
    }

    let rows = &seal.rows;
    let last = &rows[n as usize];
    if rows[0].state().commitment() != claim.start_commitment {
        return Err(VerificationError::Boundary("first row does not match the start state"));
    }
    if last.state().commitment() != claim.end_commitment {
        return Err(VerificationError::Boundary("last row does not match the end state"));
    }
    if last.output_digest != claim.output_digest {
        return Err(VerificationError::Boundary("output digest"));
    }

    rows.par_windows(2)
        .enumerate()
        .try_for_each(|(i, pair)| check_transition(&params, claim, i as u32, &pair[0], &pair[1]))?;

    if let ExitCode::Fault(reason) = claim.exit_code {
        if reason != FaultReason::SessionLimitExceeded {
            let (result, _) = replay_row(&params, n, last)?;
            if result != Err(reason) {
                return Err(VerificationError::ExitMismatch(format!(
                    "final row gives {result:?}, claim is {reason}"
                )));
            }
        }
    }

    debug!("verify: segment {} ok, {} rows replayed", claim.index, rows.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use riscv::asm::{self, Asm};
    use zkc_core::{codec, testing::program_elf, Image, REG_A0, REG_A7};
    use zkcemu::{execute_with_input, Segment};

    use super::*;
    use crate::{prove_segment, ProverError, SegmentProver, SegmentSeal};

    fn halt_program(code: u32) -> Vec<u32> {
        let mut p = Vec::new();
        p.extend(asm::li(5, 0));
        for _ in 0..6 {
            p.push(asm::addi(5, 5, 3));
        }
        p.push(asm::sw(5, 2, -4));
        p.push(asm::lw(6, 2, -4));
        p.extend(asm::li(REG_A0 as u32, code));
        p.extend(asm::li(REG_A7 as u32, 0));
        p.push(asm::ecall());
        p
    }

    /// Counts t0 up to `iterations` and halts with code 0
    fn loop_program(iterations: u32) -> Vec<u32> {
        let mut a = Asm::new();
        a.extend(asm::li(6, iterations));
        let top = a.here();
        a.push(asm::addi(5, 5, 1));
        a.push_to(top, |off| asm::bne(5, 6, off));
        a.extend(asm::li(REG_A0 as u32, 0));
        a.extend(asm::li(REG_A7 as u32, 0));
        a.push(asm::ecall());
        a.words().to_vec()
    }

    fn segments(words: &[u32], limit: u32) -> Vec<Segment> {
        let image = Image::from_elf(&program_elf(words)).unwrap();
        execute_with_input(&image, &[], limit).unwrap().0
    }

    fn reseal(receipt: &mut SegmentReceipt, f: impl FnOnce(&mut SegmentSeal)) {
        let mut seal = receipt.decode_seal().unwrap();
        f(&mut seal);
        receipt.seal = codec::encode(&seal).unwrap();
    }

    /// Rewrites the trace root so it commits to the (possibly edited) rows
    fn recommit(seal: &mut SegmentSeal) {
        seal.trace_root = trace_root(seal.rows.iter().map(StepWitness::digest).collect());
    }

    #[test]
    fn proves_and_verifies_each_segment() {
        for segment in segments(&halt_program(5), 4) {
            let receipt = prove_segment(segment).unwrap();
            verify_segment_receipt(&receipt).unwrap();
        }
    }

    #[test]
    fn fault_segment_is_provable() {
        let segs = segments(&[asm::addi(5, 0, 1), asm::ebreak()], 1 << 10);
        assert_eq!(segs.len(), 1);
        let receipt = prove_segment(segs.into_iter().next().unwrap()).unwrap();
        assert!(matches!(
            receipt.claim.exit_code,
            ExitCode::Fault(FaultReason::Breakpoint { .. })
        ));
        verify_segment_receipt(&receipt).unwrap();
    }

    #[test]
    fn tampered_claims_are_rejected() {
        let receipt = prove_segment(segments(&halt_program(5), 1 << 10).remove(0)).unwrap();

        let mut r = receipt.clone();
        r.claim.exit_code = ExitCode::Halted(6);
        assert!(verify_segment_receipt(&r).is_err());

        let mut r = receipt.clone();
        r.claim.end_commitment = Digest::hash(b"forged");
        assert!(verify_segment_receipt(&r).is_err());

        let mut r = receipt.clone();
        r.claim.output_digest = Digest::hash(b"forged");
        assert!(verify_segment_receipt(&r).is_err());

        let mut r = receipt.clone();
        r.claim.config_digest = Digest::hash(b"forged");
        assert_eq!(verify_segment_receipt(&r), Err(VerificationError::ConfigMismatch));
    }

    #[test]
    fn tampered_seals_are_rejected() {
        let receipt = prove_segment(segments(&halt_program(5), 1 << 10).remove(0)).unwrap();

        let mut r = receipt.clone();
        reseal(&mut r, |seal| seal.rows[1].regs[5] ^= 1);
        assert_eq!(verify_segment_receipt(&r), Err(VerificationError::TraceRootMismatch));

        let mut r = receipt.clone();
        reseal(&mut r, |seal| {
            seal.rows.pop();
        });
        assert!(matches!(verify_segment_receipt(&r), Err(VerificationError::MalformedSeal(_))));

        let mut r = receipt.clone();
        r.seal.truncate(r.seal.len() / 2);
        assert!(matches!(verify_segment_receipt(&r), Err(VerificationError::MalformedSeal(_))));
    }

    #[test]
    fn one_broken_transition_anywhere_is_caught() {
        let honest = prove_segment(segments(&loop_program(300), 1 << 10).remove(0)).unwrap();
        let n = honest.claim.instruction_count;
        assert!(n > 600);

        for k in [1, 10, n / 2, n] {
            let mut forged = honest.clone();
            let mut end = Digest::ZERO;
            reseal(&mut forged, |seal| {
                // x31 is never touched by the program, so only transition k - 1 breaks
                for row in &mut seal.rows[k as usize..] {
                    row.regs[31] ^= 1;
                }
                recommit(seal);
                end = seal.rows[n as usize].state().commitment();
            });
            forged.claim.end_commitment = end;
            assert_ne!(end, honest.claim.end_commitment);

            match verify_segment_receipt(&forged) {
                Err(VerificationError::InvalidTransition { row, .. }) => assert_eq!(row, k - 1),
                other => panic!("k = {k}: {other:?}"),
            }
        }
    }

    #[test]
    fn forged_row_fails_replay() {
        let receipt = prove_segment(segments(&halt_program(5), 1 << 10).remove(0)).unwrap();
        let seal = receipt.decode_seal().unwrap();
        let mut row = seal.rows[0].clone();
        if let Some(fetch) = row.fetch.as_mut() {
            fetch.value = asm::addi(5, 5, 100);
        }
        let params = seal.params;
        assert!(matches!(
            replay_row(&params, 0, &row),
            Err(VerificationError::InvalidTransition { .. })
        ));
        let (result, _) = replay_row(&params, 0, &seal.rows[0]).unwrap();
        assert_eq!(result, Ok(StepOutcome::Continue));
    }

    #[test]
    fn witness_budget_and_cancellation() {
        let segment = segments(&halt_program(5), 1 << 10).remove(0);
        let prover = SegmentProver::new(1024, Default::default());
        assert!(matches!(
            prover.prove(segment),
            Err(ProverError::ResourceExhausted { budget: 1024, .. })
        ));

        let segment = segments(&halt_program(5), 1 << 10).remove(0);
        let cancel = crate::CancellationToken::new();
        cancel.cancel();
        let prover = SegmentProver::new(u64::MAX, cancel);
        assert!(matches!(prover.prove(segment), Err(ProverError::Cancelled)));
    }

    #[test]
    fn inconsistent_segment_is_refused() {
        let mut segment = segments(&halt_program(5), 1 << 10).remove(0);
        segment.exit_code = ExitCode::Halted(7);
        assert!(matches!(prove_segment(segment), Err(ProverError::Proving(_))));

        let mut segment = segments(&halt_program(5), 1 << 10).remove(0);
        segment.end_commitment = Digest::hash(b"elsewhere");
        assert!(matches!(prove_segment(segment), Err(ProverError::Proving(_))));
    }
}

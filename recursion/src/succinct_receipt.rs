use std::env;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use zkc_core::{Digest, ExitCode, Image};

use crate::{
    seal::{RecursionBackend, RecursionSeal},
    RecursionError, RecursionProgram, SegmentSpan, SuccinctClaim,
};

/// Receipt of any depth produced by the recursion layer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccinctReceipt {
    pub claim: SuccinctClaim,
    pub seal: Vec<u8>,
    /// 0 for a lifted segment, `max(inputs) + 1` for a join
    pub recursion_depth: u32,
    pub control_id: Digest,
    pub span: SegmentSpan,
}

/// What a verifier is willing to accept.
///
/// The default context rejects seals from the dev-mode backend. Dev mode is opt-in, either
/// with [`VerifierContext::with_dev_mode`] or with `ZKC_DEV_MODE=1` through
/// [`VerifierContext::from_env`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VerifierContext {
    pub dev_mode: bool,
}

impl VerifierContext {
    pub fn with_dev_mode(mut self, dev_mode: bool) -> Self {
        self.dev_mode = dev_mode;
        self
    }

    pub fn from_env() -> Self {
        let dev_mode = flag_enabled(env::var("ZKC_DEV_MODE").ok().as_deref());
        if dev_mode {
            warn!("ZKC_DEV_MODE is set, dev-mode recursion seals will be accepted");
        }
        Self { dev_mode }
    }

    fn accepts(&self, backend: RecursionBackend) -> bool {
        match backend {
            RecursionBackend::DevMode => self.dev_mode,
        }
    }
}

fn flag_enabled(value: Option<&str>) -> bool {
    value.is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

impl SuccinctReceipt {
    /// Checks the seal against the claim, control id, depth and span and returns it
    pub(crate) fn checked_seal(&self) -> Result<RecursionSeal, RecursionError> {
        let invalid = |msg: &str| RecursionError::InvalidReceipt(msg.to_string());
        let seal = RecursionSeal::decode(&self.seal)?;

        let program = if self.recursion_depth == 0 {
            RecursionProgram::Lift
        } else {
            RecursionProgram::Join
        };
        let control_id = program.control_id(seal.backend, &self.claim.config_digest);
        if self.control_id != control_id || seal.control_id != self.control_id {
            return Err(invalid("control id does not match the recursion program"));
        }
        if self.span.count == 0 || (program == RecursionProgram::Lift && self.span.count != 1) {
            return Err(invalid("segment span does not match the recursion depth"));
        }
        if seal.claim_digest != self.claim.digest() {
            return Err(invalid("seal does not commit to the claim"));
        }
        if !seal.is_bound(self.recursion_depth, &self.span) {
            return Err(invalid("seal binding mismatch"));
        }
        Ok(seal)
    }

    /// Checks the seal is well formed and bound to this receipt, whatever backend produced it.
    ///
    /// This is what the recursion layer checks on its own outputs. It says nothing about
    /// soundness; use [`SuccinctReceipt::verify_with`] to verify a receipt from elsewhere.
    pub fn verify_integrity(&self) -> Result<(), RecursionError> {
        self.checked_seal().map(|_| ())
    }

    /// Verifies the seal, independent of what the claim says
    pub fn verify_with(&self, ctx: &VerifierContext) -> Result<(), RecursionError> {
        let seal = self.checked_seal()?;
        if !ctx.accepts(seal.backend) {
            return Err(RecursionError::DevModeSeal);
        }
        Ok(())
    }

    /// Verifies a complete session against the image it ran and the journal it produced
    pub fn verify_session(&self, image: &Image, expected_output_digest: &Digest) -> bool {
        self.verify_session_with(&VerifierContext::default(), image, expected_output_digest)
    }

    pub fn verify_session_with(
        &self,
        ctx: &VerifierContext,
        image: &Image,
        expected_output_digest: &Digest,
    ) -> bool {
        self.claim.start_commitment == image.entry_state()
            && verify_with_context(ctx, self, &image.config_digest(), expected_output_digest)
    }
}

/// True iff the receipt is valid, was proven under `expected_config_digest`, halted and
/// produced `expected_output_digest`. Dev-mode seals are rejected.
pub fn verify(
    receipt: &SuccinctReceipt,
    expected_config_digest: &Digest,
    expected_output_digest: &Digest,
) -> bool {
    verify_with_context(
        &VerifierContext::default(),
        receipt,
        expected_config_digest,
        expected_output_digest,
    )
}

/// [`verify`] under an explicit verifier context
pub fn verify_with_context(
    ctx: &VerifierContext,
    receipt: &SuccinctReceipt,
    expected_config_digest: &Digest,
    expected_output_digest: &Digest,
) -> bool {
    if let Err(e) = receipt.verify_with(ctx) {
        debug!("verify: {}", e);
        return false;
    }
    receipt.claim.config_digest == *expected_config_digest
        && receipt.claim.exit.output_digest == *expected_output_digest
        && matches!(receipt.claim.exit.exit_code, ExitCode::Halted(_))
}

#[cfg(test)]
mod tests {
    use zkc_core::{codec, journal_digest, TaggedHasher};

    use super::*;
    use crate::{
        test_utils::{journal_program, prove_session},
        ExitSummary, RECURSION_VERSION,
    };

    /// Builds a seal by hand for a claim no execution produced
    fn hand_made_receipt(image: &Image, journal: &[u8]) -> SuccinctReceipt {
        let claim = SuccinctClaim {
            config_digest: image.config_digest(),
            start_commitment: image.entry_state(),
            end_commitment: Digest::hash(b"anywhere"),
            exit: ExitSummary {
                exit_code: ExitCode::Halted(0),
                output_digest: journal_digest(journal),
            },
        };
        let span = SegmentSpan { first: 0, count: 1, cycles: 1 };
        let control_id = TaggedHasher::new("zkc.recursion")
            .u32(RECURSION_VERSION)
            .bytes(b"dev")
            .bytes(b"lift")
            .digest(&claim.config_digest)
            .finalize();
        let binding = TaggedHasher::new("zkc.recursion.binding.v1")
            .bytes(b"dev")
            .digest(&control_id)
            .digest(&claim.digest())
            .digest(&Digest::ZERO)
            .u32(0)
            .u32(span.first)
            .u32(span.count)
            .u64(span.cycles)
            .finalize();
        let seal = RecursionSeal {
            backend: RecursionBackend::DevMode,
            control_id,
            claim_digest: claim.digest(),
            inputs_digest: Digest::ZERO,
            binding,
        };
        SuccinctReceipt {
            claim,
            seal: codec::encode(&seal).unwrap(),
            recursion_depth: 0,
            control_id,
            span,
        }
    }

    #[test]
    fn hand_made_seal_is_rejected_by_default() {
        let image = journal_program(0);
        let forged = hand_made_receipt(&image, b"pwned");
        // the hash binding alone is reproducible by anyone
        forged.verify_integrity().unwrap();

        let journal = journal_digest(b"pwned");
        assert!(!verify(&forged, &image.config_digest(), &journal));
        assert!(!forged.verify_session(&image, &journal));
        assert_eq!(
            forged.verify_with(&VerifierContext::default()),
            Err(RecursionError::DevModeSeal)
        );
    }

    #[test]
    fn dev_mode_flag_values() {
        for on in ["1", "true", "YES", " true "] {
            assert!(flag_enabled(Some(on)), "{on}");
        }
        for off in [None, Some(""), Some("0"), Some("false"), Some("dev")] {
            assert!(!flag_enabled(off), "{off:?}");
        }
        assert!(!VerifierContext::default().dev_mode);
    }

    #[test]
    fn dev_mode_is_opt_in() {
        let image = journal_program(0);
        let receipt = prove_session(&image, 4);
        let journal = journal_digest(b"zk");
        let dev = VerifierContext::default().with_dev_mode(true);

        assert!(!verify(&receipt, &image.config_digest(), &journal));
        assert!(!receipt.verify_session(&image, &journal));
        assert!(verify_with_context(&dev, &receipt, &image.config_digest(), &journal));
        assert!(receipt.verify_session_with(&dev, &image, &journal));
        assert!(!receipt.verify_session_with(&dev, &image, &journal_digest(b"zz")));
    }
}

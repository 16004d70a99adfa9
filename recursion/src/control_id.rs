use serde::{Deserialize, Serialize};
use zkc_core::{Digest, TaggedHasher};

use crate::seal::RecursionBackend;

/// Version of the recursion programs this crate produces and accepts
pub const RECURSION_VERSION: u32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecursionProgram {
    Lift,
    Join,
}

impl RecursionProgram {
    fn name(&self) -> &'static str {
        match self {
            RecursionProgram::Lift => "lift",
            RecursionProgram::Join => "join",
        }
    }

    /// Identifier of this program under a given backend and config
    pub fn control_id(&self, backend: RecursionBackend, config_digest: &Digest) -> Digest {
        TaggedHasher::new("zkc.recursion")
            .u32(RECURSION_VERSION)
            .bytes(backend.name().as_bytes())
            .bytes(self.name().as_bytes())
            .digest(config_digest)
            .finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_ids_depend_on_program_and_config() {
        let a = Digest::hash(b"config a");
        let b = Digest::hash(b"config b");
        let dev = RecursionBackend::DevMode;
        let lift = RecursionProgram::Lift;
        assert_ne!(lift.control_id(dev, &a), RecursionProgram::Join.control_id(dev, &a));
        assert_ne!(lift.control_id(dev, &a), lift.control_id(dev, &b));
        assert_eq!(lift.control_id(dev, &b), lift.control_id(dev, &b));
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::TaggedHasher;

/// Reason a session stopped on a fault
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaultReason {
    IllegalInstruction { pc: u32, word: u32 },
    /// Fetch from a misaligned or unmapped program counter
    InstructionFault { pc: u32 },
    MemoryOutOfBounds { addr: u32 },
    MisalignedAccess { addr: u32 },
    Breakpoint { pc: u32 },
    UnknownSyscall { id: u32 },
    InvalidSyscallArgs { id: u32 },
    OutputLimitExceeded,
    /// The executor's session cycle budget ran out
    SessionLimitExceeded,
}

impl FaultReason {
    fn kind_and_args(&self) -> (u32, u32, u32) {
        match *self {
            FaultReason::IllegalInstruction { pc, word } => (0, pc, word),
            FaultReason::InstructionFault { pc } => (1, pc, 0),
            FaultReason::MemoryOutOfBounds { addr } => (2, addr, 0),
            FaultReason::MisalignedAccess { addr } => (3, addr, 0),
            FaultReason::Breakpoint { pc } => (4, pc, 0),
            FaultReason::UnknownSyscall { id } => (5, id, 0),
            FaultReason::InvalidSyscallArgs { id } => (6, id, 0),
            FaultReason::OutputLimitExceeded => (7, 0, 0),
            FaultReason::SessionLimitExceeded => (8, 0, 0),
        }
    }
}

impl fmt::Display for FaultReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultReason::IllegalInstruction { pc, word } => {
                write!(f, "illegal instruction {word:#010x} at pc={pc:#x}")
            }
            FaultReason::InstructionFault { pc } => {
                write!(f, "instruction fetch fault at pc={pc:#x}")
            }
            FaultReason::MemoryOutOfBounds { addr } => {
                write!(f, "memory access out of bounds at {addr:#x}")
            }
            FaultReason::MisalignedAccess { addr } => {
                write!(f, "misaligned memory access at {addr:#x}")
            }
            FaultReason::Breakpoint { pc } => write!(f, "breakpoint at pc={pc:#x}"),
            FaultReason::UnknownSyscall { id } => write!(f, "unknown syscall {id}"),
            FaultReason::InvalidSyscallArgs { id } => {
                write!(f, "invalid arguments to syscall {id}")
            }
            FaultReason::OutputLimitExceeded => write!(f, "journal size limit exceeded"),
            FaultReason::SessionLimitExceeded => write!(f, "session cycle limit exceeded"),
        }
    }
}

/// How a segment, or a whole session, ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExitCode {
    Halted(u32),
    Paused(u32),
    /// Forced segment boundary; never the final outcome of a session
    SystemSplit,
    Fault(FaultReason),
}

impl ExitCode {
    /// True for outcomes after which execution cannot be continued
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExitCode::Halted(_) | ExitCode::Fault(_))
    }

    /// True when a following segment may continue from the end state
    pub fn is_continuable(&self) -> bool {
        matches!(self, ExitCode::SystemSplit | ExitCode::Paused(_))
    }

    /// Appends the canonical encoding: a kind tag followed by three words
    pub fn hash_into(&self, h: TaggedHasher) -> TaggedHasher {
        let (kind, a, b, c) = match self {
            ExitCode::Halted(code) => (0, *code, 0, 0),
            ExitCode::Paused(code) => (1, *code, 0, 0),
            ExitCode::SystemSplit => (2, 0, 0, 0),
            ExitCode::Fault(reason) => {
                let (k, a, b) = reason.kind_and_args();
                (3, k, a, b)
            }
        };
        h.u32(kind).u32(a).u32(b).u32(c)
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitCode::Halted(code) => write!(f, "halted({code})"),
            ExitCode::Paused(code) => write!(f, "paused({code})"),
            ExitCode::SystemSplit => write!(f, "system split"),
            ExitCode::Fault(reason) => write!(f, "fault: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodings_are_distinct() {
        let codes = [
            ExitCode::Halted(0),
            ExitCode::Halted(1),
            ExitCode::Paused(0),
            ExitCode::SystemSplit,
            ExitCode::Fault(FaultReason::Breakpoint { pc: 0 }),
            ExitCode::Fault(FaultReason::InstructionFault { pc: 0 }),
            ExitCode::Fault(FaultReason::SessionLimitExceeded),
        ];
        let digests: std::collections::HashSet<_> =
            codes.iter().map(|c| c.hash_into(TaggedHasher::new("t")).finalize()).collect();
        assert_eq!(digests.len(), codes.len());
    }

    #[test]
    fn classification() {
        assert!(ExitCode::Halted(0).is_terminal());
        assert!(ExitCode::Fault(FaultReason::OutputLimitExceeded).is_terminal());
        assert!(ExitCode::Paused(3).is_continuable());
        assert!(ExitCode::SystemSplit.is_continuable());
        assert!(!ExitCode::Halted(0).is_continuable());
    }
}

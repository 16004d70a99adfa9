use zkc_core::{CpuState, Image, MemoryImage, OutputState, SystemState, VmParams};

use crate::Continuation;

/// ZKC executor context data container, storing the state of the execution
pub struct EmuContext {
    pub params: VmParams,
    pub cpu: CpuState,
    pub memory: MemoryImage,
    pub output: OutputState,
    /// Journal bytes written since the start of the session chain
    pub journal: Vec<u8>,
    pub input: Vec<u8>,
    pub input_pos: usize,
    /// Instructions executed in this run
    pub step: u64,
    pub segment_index: u32,
}

impl EmuContext {
    /// Context at the entry point of an image
    pub fn from_image(image: &Image, input: Vec<u8>) -> Self {
        Self {
            params: *image.params(),
            cpu: image.initial_cpu(),
            memory: image.memory().clone(),
            output: OutputState::default(),
            journal: Vec::new(),
            input,
            input_pos: 0,
            step: 0,
            segment_index: 0,
        }
    }

    /// Context of a paused machine, fed with fresh input
    pub fn from_continuation(continuation: Continuation, input: Vec<u8>) -> Self {
        let (params, cpu, memory, output, journal, segment_index) = continuation.into_parts();
        Self { params, cpu, memory, output, journal, input, input_pos: 0, step: 0, segment_index }
    }

    pub fn state(&self) -> SystemState {
        SystemState::new(&self.cpu, self.memory.root(), &self.output)
    }
}

//! Helpers to build RISC-V ELF executables in tests, without a cross compiler.

/// Default load address of test program code
pub const CODE_BASE: u32 = 0x0001_0000;

const EHDR_SIZE: u32 = 52;
const PHDR_SIZE: u32 = 32;
const PT_LOAD: u32 = 1;
const PF_X: u32 = 1;
const PF_W: u32 = 2;
const PF_R: u32 = 4;

struct Segment {
    p_type: u32,
    vaddr: u32,
    data: Vec<u8>,
    mem_size: u32,
    flags: u32,
}

/// Builder of minimal ELF32 little-endian executables: one program header per segment, no
/// section headers
pub struct ElfBuilder {
    entry: Option<u32>,
    e_type: u16,
    machine: u16,
    flags: u32,
    segments: Vec<Segment>,
}

impl Default for ElfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ElfBuilder {
    pub fn new() -> Self {
        Self { entry: None, e_type: 2, machine: 243, flags: 0, segments: Vec::new() }
    }

    /// Adds a read/execute segment holding `words`; the first code segment sets the entry point
    pub fn code(mut self, vaddr: u32, words: &[u32]) -> Self {
        let data = words.iter().flat_map(|w| w.to_le_bytes()).collect::<Vec<u8>>();
        self.entry.get_or_insert(vaddr);
        let size = data.len() as u32;
        self.segment(PT_LOAD, vaddr, &data, size, PF_R | PF_X)
    }

    pub fn data(self, vaddr: u32, bytes: &[u8]) -> Self {
        let size = bytes.len() as u32;
        self.segment(PT_LOAD, vaddr, bytes, size, PF_R | PF_W)
    }

    /// Zero-initialized segment with no file data
    pub fn bss(self, vaddr: u32, size: u32) -> Self {
        self.segment(PT_LOAD, vaddr, &[], size, PF_R | PF_W)
    }

    pub fn segment(
        mut self,
        p_type: u32,
        vaddr: u32,
        data: &[u8],
        mem_size: u32,
        flags: u32,
    ) -> Self {
        self.segments.push(Segment { p_type, vaddr, data: data.to_vec(), mem_size, flags });
        self
    }

    pub fn entry(mut self, entry: u32) -> Self {
        self.entry = Some(entry);
        self
    }

    pub fn machine(mut self, machine: u16) -> Self {
        self.machine = machine;
        self
    }

    pub fn elf_type(mut self, e_type: u16) -> Self {
        self.e_type = e_type;
        self
    }

    pub fn flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let phnum = self.segments.len() as u32;
        let mut out = Vec::new();

        // e_ident: magic, ELFCLASS32, ELFDATA2LSB, EV_CURRENT, System V ABI, padding
        out.extend_from_slice(&[0x7f, b'E', b'L', b'F', 1, 1, 1, 0]);
        out.extend_from_slice(&[0u8; 8]);
        out.extend_from_slice(&self.e_type.to_le_bytes());
        out.extend_from_slice(&self.machine.to_le_bytes());
        out.extend_from_slice(&1u32.to_le_bytes());
        out.extend_from_slice(&self.entry.unwrap_or(0).to_le_bytes());
        out.extend_from_slice(&(if phnum > 0 { EHDR_SIZE } else { 0 }).to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes()); // e_shoff
        out.extend_from_slice(&self.flags.to_le_bytes());
        out.extend_from_slice(&(EHDR_SIZE as u16).to_le_bytes());
        out.extend_from_slice(&(PHDR_SIZE as u16).to_le_bytes());
        out.extend_from_slice(&(phnum as u16).to_le_bytes());
        out.extend_from_slice(&40u16.to_le_bytes()); // e_shentsize
        out.extend_from_slice(&0u16.to_le_bytes()); // e_shnum
        out.extend_from_slice(&0u16.to_le_bytes()); // e_shstrndx

        let mut offset = EHDR_SIZE + phnum * PHDR_SIZE;
        let mut payload = Vec::new();
        for s in &self.segments {
            let file_size = s.data.len() as u32;
            for field in [s.p_type, offset, s.vaddr, s.vaddr, file_size, s.mem_size, s.flags, 4] {
                out.extend_from_slice(&field.to_le_bytes());
            }
            payload.extend_from_slice(&s.data);
            while payload.len() % 4 != 0 {
                payload.push(0);
            }
            offset = EHDR_SIZE + phnum * PHDR_SIZE + payload.len() as u32;
        }
        out.extend_from_slice(&payload);
        out
    }
}

/// ELF with a single code segment at [`CODE_BASE`]
pub fn program_elf(words: &[u32]) -> Vec<u8> {
    ElfBuilder::new().code(CODE_BASE, words).build()
}

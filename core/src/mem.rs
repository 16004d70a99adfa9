use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Digest, MemoryTree, MerklePath, VmParams, WORD_SIZE};

/// Guest memory, stored as sparse pages and committed by a word-level Merkle tree.
///
/// Every store keeps the tree up to date, so `root()` is always the commitment of the current
/// contents. Addresses passed in here are expected to be word aligned and inside the guest
/// address space; range checks belong to the instruction semantics.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "MemorySnapshot", into = "MemorySnapshot")]
pub struct MemoryImage {
    page_size: u32,
    memory_bits: u32,
    pages: BTreeMap<u32, Vec<u8>>,
    tree: MemoryTree,
}

/// Serialized form of a [`MemoryImage`]; the Merkle tree is rebuilt on decode
#[derive(Clone, Debug, Serialize, Deserialize)]
struct MemorySnapshot {
    page_size: u32,
    memory_bits: u32,
    pages: Vec<(u32, Vec<u8>)>,
}

impl MemoryImage {
    pub fn new(params: &VmParams) -> Self {
        Self {
            page_size: params.page_size,
            memory_bits: params.memory_bits,
            pages: BTreeMap::new(),
            tree: MemoryTree::new(params.merkle_depth()),
        }
    }

    /// Builds a memory image from `(address, bytes)` regions in one pass over the tree
    pub fn from_regions<'a>(
        params: &VmParams,
        regions: impl IntoIterator<Item = (u32, &'a [u8])>,
    ) -> Self {
        let mut mem = Self::new(params);
        for (addr, data) in regions {
            for (i, b) in data.iter().enumerate() {
                mem.write_byte_raw(addr + i as u32, *b);
            }
        }
        mem.rebuild_tree();
        mem
    }

    fn write_byte_raw(&mut self, addr: u32, value: u8) {
        let page_size = self.page_size as usize;
        let page = self.pages.entry(addr / self.page_size).or_insert_with(|| vec![0u8; page_size]);
        page[(addr % self.page_size) as usize] = value;
    }

    fn rebuild_tree(&mut self) {
        let words_per_page = self.page_size / WORD_SIZE;
        let words = self.pages.iter().flat_map(|(page, data)| {
            data.chunks_exact(WORD_SIZE as usize).enumerate().map(move |(i, w)| {
                let word = u32::from_le_bytes([w[0], w[1], w[2], w[3]]);
                (page * words_per_page + i as u32, word)
            })
        });
        self.tree = MemoryTree::from_words(self.memory_bits - 2, words);
    }

    pub fn root(&self) -> Digest {
        self.tree.root()
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn memory_bits(&self) -> u32 {
        self.memory_bits
    }

    pub fn load_word(&self, addr: u32) -> u32 {
        match self.pages.get(&(addr / self.page_size)) {
            Some(page) => {
                let o = (addr % self.page_size) as usize;
                u32::from_le_bytes([page[o], page[o + 1], page[o + 2], page[o + 3]])
            }
            None => 0,
        }
    }

    pub fn store_word(&mut self, addr: u32, value: u32) {
        let page_size = self.page_size as usize;
        let o = (addr % self.page_size) as usize;
        let page = self.pages.entry(addr / self.page_size).or_insert_with(|| vec![0u8; page_size]);
        page[o..o + 4].copy_from_slice(&value.to_le_bytes());
        self.tree.update(addr >> 2, value);
    }

    /// Authentication path of the word at `addr`
    pub fn path(&self, addr: u32) -> MerklePath {
        self.tree.path(addr >> 2)
    }


    /// Approximate heap footprint in bytes: page data plus stored tree nodes
    pub fn resident_bytes(&self) -> u64 {
        self.pages.len() as u64 * self.page_size as u64 + self.tree.stored_nodes() as u64 * 40
    }
}

impl From<MemoryImage> for MemorySnapshot {
    fn from(mem: MemoryImage) -> Self {
        Self {
            page_size: mem.page_size,
            memory_bits: mem.memory_bits,
            pages: mem.pages.into_iter().collect(),
        }
    }
}

impl TryFrom<MemorySnapshot> for MemoryImage {
    type Error = String;

    fn try_from(snapshot: MemorySnapshot) -> Result<Self, Self::Error> {
        let params = VmParams {
            page_size: snapshot.page_size,
            memory_bits: snapshot.memory_bits,
            ..VmParams::default()
        };
        params.validate().map_err(|e| e.to_string())?;
        let mut mem = MemoryImage::new(&params);
        for (index, data) in snapshot.pages {
            if data.len() != snapshot.page_size as usize {
                return Err(format!(
                    "page {index} has {} bytes, expected {}",
                    data.len(),
                    snapshot.page_size
                ));
            }
            if (index as u64 + 1) * snapshot.page_size as u64 > params.guest_max_mem() as u64 {
                return Err(format!("page {index} outside the address space"));
            }
            mem.pages.insert(index, data);
        }
        mem.rebuild_tree();
        Ok(mem)
    }
}

use crate::core::error::{Error, ErrorKind, Result};

/// Dense bit vector over `[0, len)`.
#[derive(Debug, Clone)]
pub struct BitSet {
    words: Vec<u64>,
    len: usize,
}

impl BitSet {
    pub fn new(len: usize) -> Self {
        BitSet { words: vec![0u64; len.div_ceil(64)], len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn set(&mut self, index: usize, value: bool) {
        debug_assert!(index < self.len);
        let word = index / 64;
        let bit = index % 64;
        if value {
            self.words[word] |= 1u64 << bit;
        } else {
            self.words[word] &= !(1u64 << bit);
        }
    }

    pub fn get(&self, index: usize) -> bool {
        debug_assert!(index < self.len);
        (self.words[index / 64] >> (index % 64)) & 1 == 1
    }

    pub fn pop_count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn words(&self) -> &[u64] {
        &self.words
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + self.words.len() * 8);
        out.extend_from_slice(&(self.len as i32).to_le_bytes());
        out.extend_from_slice(&(self.words.len() as i32).to_le_bytes());
        for w in &self.words {
            out.extend_from_slice(&w.to_le_bytes());
        }
        out
    }

    pub fn deserialize(bytes: &[u8]) -> Result<(Self, usize)> {
        if bytes.len() < 8 {
            return Err(Error::new(ErrorKind::InvalidIndexFormat, "truncated BitSet header"));
        }
        let len = i32::from_le_bytes(bytes[0..4].try_into().unwrap());
        let word_count = i32::from_le_bytes(bytes[4..8].try_into().unwrap());
        if len < 0 || word_count < 0 {
            return Err(Error::new(ErrorKind::InvalidIndexFormat, "negative BitSet header field"));
        }
        let word_count = word_count as usize;
        let needed = 8 + word_count * 8;
        if bytes.len() < needed {
            return Err(Error::new(ErrorKind::InvalidIndexFormat, "truncated BitSet body"));
        }
        let mut words = Vec::with_capacity(word_count);
        for i in 0..word_count {
            let off = 8 + i * 8;
            words.push(u64::from_le_bytes(bytes[off..off + 8].try_into().unwrap()));
        }
        Ok((BitSet { words, len: len as usize }, needed))
    }
}

const BLOCK_BITS: usize = 512; // one "block" covers 8 u64 words

/// Auxiliary structure over a `BitSet` giving constant-time `select1`/`select0`, built via a
/// single-pass block/sub-block hierarchy (§4.4).
#[derive(Debug, Clone)]
pub struct DArray {
    block_rank: Vec<u32>, // cumulative popcount at the start of each block
    ones: usize,
    zeros: usize,
    len: usize,
}

impl DArray {
    pub fn build(bits: &BitSet) -> Self {
        let mut block_rank = Vec::new();
        let mut running = 0u32;
        let words_per_block = BLOCK_BITS / 64;

        for chunk in bits.words().chunks(words_per_block) {
            block_rank.push(running);
            running += chunk.iter().map(|w| w.count_ones()).sum::<u32>();
        }
        block_rank.push(running);

        let ones = running as usize;
        DArray { block_rank, ones, zeros: bits.len() - ones, len: bits.len() }
    }

    /// Position of the `i`-th (0-indexed) set bit.
    pub fn select1(&self, bits: &BitSet, i: usize) -> Result<usize> {
        if i >= self.ones {
            return Err(Error::new(ErrorKind::InvalidArgument, "select1 index out of range"));
        }
        self.select_generic(bits, i, true)
    }

    /// Position of the `i`-th (0-indexed) unset bit.
    pub fn select0(&self, bits: &BitSet, i: usize) -> Result<usize> {
        if i >= self.zeros {
            return Err(Error::new(ErrorKind::InvalidArgument, "select0 index out of range"));
        }
        self.select_generic(bits, i, false)
    }

    fn select_generic(&self, bits: &BitSet, target_rank: usize, want_one: bool) -> Result<usize> {
        let words_per_block = BLOCK_BITS / 64;

        // Find the block whose cumulative rank window contains target_rank. block_rank
        // stores a sentinel as its last entry, so scanning pairs is safe.
        let mut block = 0usize;
        while block + 1 < self.block_rank.len() {
            let rank_at_next = if want_one {
                self.block_rank[block + 1] as usize
            } else {
                (block + 1) * BLOCK_BITS - self.block_rank[block + 1] as usize
            };
            if rank_at_next > target_rank {
                break;
            }
            block += 1;
        }

        let block_start_bit = block * BLOCK_BITS;
        let mut remaining = if want_one {
            target_rank - self.block_rank[block] as usize
        } else {
            target_rank - (block_start_bit - self.block_rank[block] as usize)
        };

        let word_start = block * words_per_block;
        for w in 0..words_per_block {
            let word_idx = word_start + w;
            if word_idx >= bits.words().len() {
                break;
            }
            let word = if want_one { bits.words()[word_idx] } else { !bits.words()[word_idx] };
            let count = word.count_ones() as usize;
            if remaining < count {
                let mut w_copy = word;
                for _ in 0..remaining {
                    w_copy &= w_copy - 1;
                }
                let pos = w_copy.trailing_zeros() as usize;
                let global_pos = word_idx * 64 + pos;
                if global_pos < self.len {
                    return Ok(global_pos);
                }
            }
            remaining -= count;
        }

        Err(Error::new(ErrorKind::Internal, "select target not found"))
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(12 + self.block_rank.len() * 4);
        out.extend_from_slice(&(self.len as i32).to_le_bytes());
        out.extend_from_slice(&(self.ones as i32).to_le_bytes());
        out.extend_from_slice(&(self.block_rank.len() as i32).to_le_bytes());
        for r in &self.block_rank {
            out.extend_from_slice(&r.to_le_bytes());
        }
        out
    }

    pub fn deserialize(bytes: &[u8]) -> Result<(Self, usize)> {
        if bytes.len() < 12 {
            return Err(Error::new(ErrorKind::InvalidIndexFormat, "truncated DArray header"));
        }
        let len = i32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
        let ones = i32::from_le_bytes(bytes[4..8].try_into().unwrap()) as usize;
        let n = i32::from_le_bytes(bytes[8..12].try_into().unwrap()) as usize;
        let needed = 12 + n * 4;
        if bytes.len() < needed {
            return Err(Error::new(ErrorKind::InvalidIndexFormat, "truncated DArray body"));
        }
        let mut block_rank = Vec::with_capacity(n);
        for i in 0..n {
            let off = 12 + i * 4;
            block_rank.push(u32::from_le_bytes(bytes[off..off + 4].try_into().unwrap()));
        }
        Ok((DArray { block_rank, ones, zeros: len - ones, len }, needed))
    }
}

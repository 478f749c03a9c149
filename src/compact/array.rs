use crate::core::error::{Error, ErrorKind, Result};

/// Bit-packed array of fixed-width unsigned integers, each occupying `width` contiguous
/// bits within a `u64[]` backing store (§4.4).
#[derive(Debug, Clone)]
pub struct CompactArray {
    data: Vec<u64>,
    width: u32,
    count: usize,
}

impl CompactArray {
    /// Width is chosen as `ceil(log2(max+1))`, clamped to at least 1 bit.
    pub fn width_for_max(max: u64) -> u32 {
        if max == 0 {
            1
        } else {
            (64 - max.leading_zeros()).max(1)
        }
    }

    pub fn new(width: u32, count: usize) -> Result<Self> {
        if width == 0 || width > 64 {
            return Err(Error::new(ErrorKind::InvalidArgument, "width must be in [1, 64]"));
        }
        let total_bits = width as usize * count;
        let words = total_bits.div_ceil(64);
        Ok(CompactArray { data: vec![0u64; words], width, count })
    }

    pub fn from_values(values: &[u64]) -> Result<Self> {
        let max = values.iter().copied().max().unwrap_or(0);
        let width = Self::width_for_max(max);
        let mut arr = Self::new(width, values.len())?;
        for (i, &v) in values.iter().enumerate() {
            arr.set(i, v)?;
        }
        Ok(arr)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn check_bounds(&self, index: usize) -> Result<()> {
        if index >= self.count {
            return Err(Error::new(ErrorKind::InvalidArgument, format!("index {} out of range", index)));
        }
        Ok(())
    }

    pub fn get(&self, index: usize) -> Result<u64> {
        self.check_bounds(index)?;
        let bit_pos = index * self.width as usize;
        let word_idx = bit_pos / 64;
        let bit_off = bit_pos % 64;
        let mask = if self.width == 64 { u64::MAX } else { (1u64 << self.width) - 1 };

        let low = self.data[word_idx] >> bit_off;
        if bit_off + self.width as usize <= 64 {
            Ok(low & mask)
        } else {
            let bits_from_next = (bit_off + self.width as usize) - 64;
            let high = self.data[word_idx + 1] << (self.width as usize - bits_from_next);
            Ok((low | high) & mask)
        }
    }

    pub fn set(&mut self, index: usize, value: u64) -> Result<()> {
        self.check_bounds(index)?;
        let mask = if self.width == 64 { u64::MAX } else { (1u64 << self.width) - 1 };
        if value & !mask != 0 {
            return Err(Error::new(ErrorKind::InvalidArgument, "value does not fit in configured width"));
        }

        let bit_pos = index * self.width as usize;
        let word_idx = bit_pos / 64;
        let bit_off = bit_pos % 64;

        self.data[word_idx] &= !(mask << bit_off);
        self.data[word_idx] |= value << bit_off;

        if bit_off + self.width as usize > 64 {
            let bits_written = 64 - bit_off;
            let remaining_mask = mask >> bits_written;
            self.data[word_idx + 1] &= !remaining_mask;
            self.data[word_idx + 1] |= value >> bits_written;
        }
        Ok(())
    }

    /// `(width, count, dataLen, data)` per §4.4.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(12 + self.data.len() * 8);
        out.extend_from_slice(&(self.width as i32).to_le_bytes());
        out.extend_from_slice(&(self.count as i32).to_le_bytes());
        out.extend_from_slice(&(self.data.len() as i32).to_le_bytes());
        for word in &self.data {
            out.extend_from_slice(&word.to_le_bytes());
        }
        out
    }

    pub fn deserialize(bytes: &[u8]) -> Result<(Self, usize)> {
        if bytes.len() < 12 {
            return Err(Error::new(ErrorKind::InvalidIndexFormat, "truncated CompactArray header"));
        }
        let width = i32::from_le_bytes(bytes[0..4].try_into().unwrap());
        let count = i32::from_le_bytes(bytes[4..8].try_into().unwrap());
        let data_len = i32::from_le_bytes(bytes[8..12].try_into().unwrap());
        if width <= 0 || count < 0 || data_len < 0 {
            return Err(Error::new(ErrorKind::InvalidIndexFormat, "negative CompactArray header field"));
        }
        let data_len = data_len as usize;
        let needed = 12 + data_len * 8;
        if bytes.len() < needed {
            return Err(Error::new(ErrorKind::InvalidIndexFormat, "truncated CompactArray body"));
        }
        let mut data = Vec::with_capacity(data_len);
        for i in 0..data_len {
            let off = 12 + i * 8;
            data.push(u64::from_le_bytes(bytes[off..off + 8].try_into().unwrap()));
        }
        Ok((CompactArray { data, width: width as u32, count: count as usize }, needed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_matches_max_value() {
        let arr = CompactArray::from_values(&[5, 2, 9, 100, 0, 5, 10, 90, 9, 1, 65, 10]).unwrap();
        assert_eq!(arr.width(), 7);
    }

    #[test]
    fn round_trips_all_values() {
        let input = vec![5u64, 2, 9, 100, 0, 5, 10, 90, 9, 1, 65, 10];
        let arr = CompactArray::from_values(&input).unwrap();
        for (i, &v) in input.iter().enumerate() {
            assert_eq!(arr.get(i).unwrap(), v);
        }
    }

    #[test]
    fn serialize_round_trip() {
        let arr = CompactArray::from_values(&[1, 2, 3, 1000]).unwrap();
        let bytes = arr.serialize();
        let (restored, consumed) = CompactArray::deserialize(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        for i in 0..4 {
            assert_eq!(arr.get(i).unwrap(), restored.get(i).unwrap());
        }
    }

    #[test]
    fn straddles_word_boundary() {
        let mut arr = CompactArray::new(37, 10).unwrap();
        for i in 0..10 {
            arr.set(i, (i as u64) * 12345).unwrap();
        }
        for i in 0..10 {
            assert_eq!(arr.get(i).unwrap(), (i as u64) * 12345);
        }
    }
}

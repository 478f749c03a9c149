use crate::compact::array::CompactArray;
use crate::compact::bitset::{BitSet, DArray};
use crate::core::error::{Error, ErrorKind, Result};

/// Succinct encoding of a monotone (non-decreasing) sequence of `n` integers bounded by `U`.
/// Low `floor(log2(U/n))` bits are packed in a `CompactArray`; high bits are unary-coded in a
/// `BitSet` with a `DArray` over it for constant-time `select1` (§4.4).
#[derive(Debug, Clone)]
pub struct EliasFano {
    low_bits: CompactArray,
    high_bits: BitSet,
    high_darray: DArray,
    low_width: u32,
    n: usize,
}

impl EliasFano {
    pub fn build(values: &[u64], universe: u64) -> Result<Self> {
        for w in values.windows(2) {
            if w[0] > w[1] {
                return Err(Error::new(ErrorKind::InvalidArgument, "EliasFano input must be non-decreasing"));
            }
        }
        let n = values.len();
        let low_width = if n == 0 {
            0
        } else {
            let ratio = universe / (n as u64).max(1);
            if ratio == 0 { 0 } else { 63 - ratio.leading_zeros() }
        };

        let mut low_bits = CompactArray::new(low_width.max(1), n.max(1))?;
        let high_len = if n == 0 { 1 } else { (universe >> low_width) as usize + n + 1 };
        let mut high_bits = BitSet::new(high_len);

        for (i, &v) in values.iter().enumerate() {
            if low_width > 0 {
                low_bits.set(i, v & ((1u64 << low_width) - 1))?;
            }
            let high = v >> low_width;
            let pos = high as usize + i;
            high_bits.set(pos, true);
        }

        let high_darray = DArray::build(&high_bits);
        Ok(EliasFano { low_bits, high_bits, high_darray, low_width, n })
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// `get(i) = (select1(i) - i) * 2^low_width + low_bits[i]`.
    pub fn get(&self, i: usize) -> Result<u64> {
        if i >= self.n {
            return Err(Error::new(ErrorKind::InvalidArgument, "index out of range"));
        }
        let pos = self.high_darray.select1(&self.high_bits, i)?;
        let high = (pos - i) as u64;
        let low = if self.low_width > 0 { self.low_bits.get(i)? } else { 0 };
        Ok((high << self.low_width) | low)
    }

    pub fn to_vec(&self) -> Result<Vec<u64>> {
        (0..self.n).map(|i| self.get(i)).collect()
    }

    /// `(lowWidth, n, lowBits, highBits)`; `high_darray` is rebuilt on load rather than stored,
    /// since it's a pure function of `high_bits` (§4.4).
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.low_width.to_le_bytes());
        out.extend_from_slice(&(self.n as i32).to_le_bytes());
        let low = self.low_bits.serialize();
        out.extend_from_slice(&(low.len() as i32).to_le_bytes());
        out.extend_from_slice(&low);
        out.extend_from_slice(&self.high_bits.serialize());
        out
    }

    pub fn deserialize(bytes: &[u8]) -> Result<(Self, usize)> {
        if bytes.len() < 12 {
            return Err(Error::new(ErrorKind::InvalidIndexFormat, "truncated EliasFano header"));
        }
        let low_width = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        let n = i32::from_le_bytes(bytes[4..8].try_into().unwrap());
        if n < 0 {
            return Err(Error::new(ErrorKind::InvalidIndexFormat, "negative EliasFano count"));
        }
        let low_len = i32::from_le_bytes(bytes[8..12].try_into().unwrap());
        if low_len < 0 {
            return Err(Error::new(ErrorKind::InvalidIndexFormat, "negative EliasFano low-bits length"));
        }
        let low_len = low_len as usize;
        let low_start = 12;
        if bytes.len() < low_start + low_len {
            return Err(Error::new(ErrorKind::InvalidIndexFormat, "truncated EliasFano low bits"));
        }
        let (low_bits, low_consumed) = CompactArray::deserialize(&bytes[low_start..low_start + low_len])?;
        if low_consumed != low_len {
            return Err(Error::new(ErrorKind::InvalidIndexFormat, "EliasFano low-bits length mismatch"));
        }
        let high_start = low_start + low_len;
        let (high_bits, high_consumed) = BitSet::deserialize(&bytes[high_start..])?;
        let high_darray = DArray::build(&high_bits);
        let total = high_start + high_consumed;
        Ok((EliasFano { low_bits, high_bits, high_darray, low_width, n: n as usize }, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_monotone_sequence() {
        let values = vec![0u64, 2, 2, 5, 10, 100, 1000, 1000, 5000];
        let ef = EliasFano::build(&values, 5000).unwrap();
        assert_eq!(ef.to_vec().unwrap(), values);
    }

    #[test]
    fn rejects_non_monotone_input() {
        assert!(EliasFano::build(&[5, 3], 10).is_err());
    }

    #[test]
    fn handles_empty_sequence() {
        let ef = EliasFano::build(&[], 0).unwrap();
        assert_eq!(ef.len(), 0);
        assert!(ef.to_vec().unwrap().is_empty());
    }

    #[test]
    fn serialize_round_trip() {
        let values = vec![0u64, 2, 2, 5, 10, 100, 1000, 1000, 5000];
        let ef = EliasFano::build(&values, 5000).unwrap();
        let bytes = ef.serialize();
        let (restored, consumed) = EliasFano::deserialize(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(restored.to_vec().unwrap(), values);
    }

    #[test]
    fn serialize_round_trip_empty() {
        let ef = EliasFano::build(&[], 0).unwrap();
        let bytes = ef.serialize();
        let (restored, _) = EliasFano::deserialize(&bytes).unwrap();
        assert!(restored.to_vec().unwrap().is_empty());
    }
}

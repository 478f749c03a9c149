use crate::core::error::{Error, ErrorKind, Result};
use std::io::Cursor;

/// Hybrid set of 32-bit integers (array / bitmap / run chunks), used as the posting-list set
/// representation for fuzzy-union terms (§4.3). Backed by the `roaring` crate, which already
/// implements the standard Roaring interchange format this spec mandates (magic cookies
/// `12346`/`12347`, sorted 16-bit container keys, cardinality-minus-one, optional offset
/// table) -- reimplementing that container layout by hand would just be a slower copy of the
/// same format the crate already gets right.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoaringBitmap(roaring::RoaringBitmap);

impl RoaringBitmap {
    pub fn new() -> Self {
        RoaringBitmap(roaring::RoaringBitmap::new())
    }

    pub fn from_sorted_iter(values: impl IntoIterator<Item = u32>) -> Result<Self> {
        roaring::RoaringBitmap::from_sorted_iter(values)
            .map(RoaringBitmap)
            .map_err(|e| Error::new(ErrorKind::InvalidArgument, e.to_string()))
    }

    pub fn insert(&mut self, value: u32) -> bool {
        self.0.insert(value)
    }

    pub fn contains(&self, value: u32) -> bool {
        self.0.contains(value)
    }

    pub fn union(&self, other: &Self) -> Self {
        RoaringBitmap(&self.0 | &other.0)
    }

    pub fn intersect(&self, other: &Self) -> Self {
        RoaringBitmap(&self.0 & &other.0)
    }

    pub fn and_not(&self, other: &Self) -> Self {
        RoaringBitmap(&self.0 - &other.0)
    }

    pub fn xor(&self, other: &Self) -> Self {
        RoaringBitmap(&self.0 ^ &other.0)
    }

    /// Complement relative to `[0, universe)` -- every value in that range this bitmap does not
    /// contain. Roaring has no native infinite-universe complement, so callers always bound it by
    /// the engine's own document-id space (§4.3), e.g. excluding a tier's candidates from the
    /// full corpus for a fallback scan.
    pub fn complement(&self, universe: u32) -> Self {
        let mut full = roaring::RoaringBitmap::new();
        full.insert_range(0..universe);
        RoaringBitmap(&full - &self.0)
    }

    pub fn cardinality(&self) -> u64 {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter()
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.0.serialize_into(&mut buf)?;
        Ok(buf)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let bitmap = roaring::RoaringBitmap::deserialize_from(Cursor::new(bytes))?;
        Ok(RoaringBitmap(bitmap))
    }

    pub fn inner(&self) -> &roaring::RoaringBitmap {
        &self.0
    }
}

impl From<roaring::RoaringBitmap> for RoaringBitmap {
    fn from(inner: roaring::RoaringBitmap) -> Self {
        RoaringBitmap(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_serialize() {
        let mut bm = RoaringBitmap::new();
        for v in [1u32, 5, 9000, 70_000, 1_000_000] {
            bm.insert(v);
        }
        let bytes = bm.serialize().unwrap();
        let restored = RoaringBitmap::deserialize(&bytes).unwrap();
        assert_eq!(bm, restored);
        let restored_values: Vec<u32> = restored.iter().collect();
        assert_eq!(restored_values, vec![1, 5, 9000, 70_000, 1_000_000]);
    }

    #[test]
    fn set_operations() {
        let a = RoaringBitmap::from_sorted_iter([1, 2, 3]).unwrap();
        let b = RoaringBitmap::from_sorted_iter([2, 3, 4]).unwrap();
        assert_eq!(a.union(&b).cardinality(), 4);
        assert_eq!(a.intersect(&b).cardinality(), 2);
        assert_eq!(a.and_not(&b).cardinality(), 1);
        assert_eq!(a.xor(&b).cardinality(), 2);
    }

    #[test]
    fn complement_is_everything_else_in_the_universe() {
        let a = RoaringBitmap::from_sorted_iter([0u32, 2, 4]).unwrap();
        let complement = a.complement(5);
        let values: Vec<u32> = complement.iter().collect();
        assert_eq!(values, vec![1, 3]);
        assert!(a.intersect(&complement).is_empty());
        assert_eq!(a.union(&complement).cardinality(), 5);
    }
}

pub mod array;
pub mod bitset;
pub mod elias_fano;

pub use array::CompactArray;
pub use bitset::{BitSet, DArray};
pub use elias_fano::EliasFano;

pub mod document;
pub mod positional_prefix;
pub mod term;

pub use document::{Document, DocumentCollection};
pub use positional_prefix::PositionalPrefixIndex;
pub use term::{STOP_TERM_DF, Term, TermCollection};

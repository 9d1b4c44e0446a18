pub mod inverted;

pub use inverted::{FieldOptions, InvertedIndex, Posting, PostingList, TermInfo};

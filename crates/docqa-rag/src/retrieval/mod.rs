//! Retrieval: vector index and similarity scoring

pub mod index;
pub mod similarity;

pub use index::{Insertion, VectorIndex};
pub use similarity::cosine_similarity;

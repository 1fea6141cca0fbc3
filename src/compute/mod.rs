//! Compute module - Parsing, embedding and packing of growth-form sequences.

mod embedding;
mod packer;
mod parser;
mod pca;

pub use embedding::*;
pub use packer::*;
pub use parser::*;
pub use pca::*;

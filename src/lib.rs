//! Growth form packer - colorize exported growth-form sequences and pack them
//! into flat buffers for the web viewer.
//!
//! The simulator exports one text snapshot per growth step. This crate turns a
//! directory of snapshots into a handful of binary buffers the viewer can
//! slice per frame without re-parsing anything.
//!
//! # Architecture
//!
//! - `schema`: Frame data and run configuration
//! - `compute`: Snapshot parsing, sequence-wide PCA coloring, buffer packing
//! - `export`: Binary buffer and colorized text mesh output
//! - `discovery`: Ordered snapshot discovery in export directories
//! - `pipeline`: The batch job tying the stages together
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use form_packer::{PipelineConfig, pipeline};
//!
//! let config = PipelineConfig::default();
//! match pipeline::run(Path::new("runs/coral"), Path::new("public/data/coral"), &config) {
//!     Ok(Some(report)) => println!("Packed {report}"),
//!     Ok(None) => println!("No snapshots found"),
//!     Err(e) => eprintln!("Error: {e}"),
//! }
//! ```

pub mod compute;
pub mod discovery;
pub mod export;
pub mod pipeline;
pub mod schema;

// Re-export commonly used types
pub use compute::{EmbeddingComputer, PackedBuffers, SequenceEmbedding, pack, parse_frame};
pub use pipeline::{PipelineError, PipelineReport};
pub use schema::{AttributeKind, Frame, PipelineConfig};

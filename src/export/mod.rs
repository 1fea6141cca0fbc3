//! Export of packed sequences for the viewer.
//!
//! # Binary layout
//!
//! Five headerless little-endian files in the output directory:
//!
//! ```text
//! vert_array    f32 x 3 per vertex, all frames concatenated
//! color_array   f32 x 3 per vertex (r, g, b in [0, 1])
//! face_array    u32 x 3 per face, frame-local vertex indices
//! vert_indices  u32 per frame, cumulative vertex count
//! face_indices  u32 per frame, cumulative face count
//! ```
//!
//! Frame `i` spans `[indices[i - 1], indices[i])` of its buffer, in elements.
//!
//! The text mode instead writes `NNNN.obj` per frame with colors inlined on
//! each vertex line.

mod binary;
mod format;
mod text;

pub use binary::{ExportStats, read_buffers, write_buffers, write_last_frame};
pub use format::{
    COLOR_FILE, ELEMENT_SIZE, ExportError, FACE_FILE, FACE_OFFSET_FILE, LAST_COLOR_FILE,
    LAST_FACE_FILE, LAST_VERTEX_FILE, VERTEX_FILE, VERTEX_OFFSET_FILE, decode_f32, decode_u32,
    encode_f32, encode_u32,
};
pub use text::{frame_file_name, frame_to_text, write_text_frames};

//! Binary layout of the packed-buffer artifact.
//!
//! Every array is a raw little-endian dump with no header. Element types are
//! fixed: `f32` for vertex and color data, `u32` for faces and offsets.

use std::path::PathBuf;

/// Vertex positions, `f32` x3 per vertex.
pub const VERTEX_FILE: &str = "vert_array";
/// Vertex colors, `f32` x3 per vertex.
pub const COLOR_FILE: &str = "color_array";
/// Faces, `u32` x3 per face, frame-local indices.
pub const FACE_FILE: &str = "face_array";
/// Cumulative vertex count per frame, `u32`.
pub const VERTEX_OFFSET_FILE: &str = "vert_indices";
/// Cumulative face count per frame, `u32`.
pub const FACE_OFFSET_FILE: &str = "face_indices";

/// Last frame's vertex positions.
pub const LAST_VERTEX_FILE: &str = "last_vert_array";
/// Last frame's colors.
pub const LAST_COLOR_FILE: &str = "last_color_array";
/// Last frame's faces.
pub const LAST_FACE_FILE: &str = "last_face_array";

/// Size of every scalar element in bytes.
pub const ELEMENT_SIZE: usize = 4;

/// Export and read-back errors.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed buffer {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },
}

impl ExportError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| ExportError::Io { path, source }
    }
}

/// Encode `f32` values as little-endian bytes.
pub fn encode_f32(data: &[f32]) -> Vec<u8> {
    let mut bytes = vec![0u8; data.len() * ELEMENT_SIZE];
    for (chunk, v) in bytes.chunks_exact_mut(ELEMENT_SIZE).zip(data) {
        chunk.copy_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Encode `u32` values as little-endian bytes.
pub fn encode_u32(data: &[u32]) -> Vec<u8> {
    let mut bytes = vec![0u8; data.len() * ELEMENT_SIZE];
    for (chunk, v) in bytes.chunks_exact_mut(ELEMENT_SIZE).zip(data) {
        chunk.copy_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode little-endian bytes into `f32` values.
///
/// Returns `None` if the length is not a whole number of elements.
pub fn decode_f32(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % ELEMENT_SIZE != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(ELEMENT_SIZE)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
    )
}

/// Decode little-endian bytes into `u32` values.
///
/// Returns `None` if the length is not a whole number of elements.
pub fn decode_u32(bytes: &[u8]) -> Option<Vec<u32>> {
    if bytes.len() % ELEMENT_SIZE != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(ELEMENT_SIZE)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
    )
}

//! Colorized text mesh output, one file per frame.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use super::format::ExportError;
use crate::compute::{FrameSlice, PackedBuffers};

/// File name for frame `index`: zero-padded to four digits.
pub fn frame_file_name(index: usize) -> String {
    format!("{index:04}.obj")
}

/// Render one frame as `v x y z r g b` lines followed by 1-based `f` lines.
pub fn frame_to_text(frame: &FrameSlice<'_>) -> String {
    let vertices = frame
        .vertices
        .iter()
        .zip(frame.colors)
        .map(|([x, y, z], [r, g, b])| format!("v {x} {y} {z} {r} {g} {b}\n"));
    let faces = frame
        .faces
        .iter()
        .map(|[i, j, k]| format!("f {} {} {}\n", i + 1, j + 1, k + 1));
    vertices.chain(faces).collect()
}

/// Write every frame of `packed` as a colorized text mesh into `dir`.
///
/// Returns the written paths in frame order. Buffers with inconsistent
/// offsets are rejected before anything is written.
pub fn write_text_frames<P: AsRef<Path>>(
    dir: P,
    packed: &PackedBuffers,
) -> Result<Vec<PathBuf>, ExportError> {
    let dir = dir.as_ref();
    packed.validate().map_err(|e| ExportError::Malformed {
        path: dir.to_path_buf(),
        reason: e.to_string(),
    })?;
    fs::create_dir_all(dir).map_err(ExportError::io(dir))?;

    let mut paths = Vec::with_capacity(packed.frame_count());
    for (index, frame) in packed.frames().enumerate() {
        let path = dir.join(frame_file_name(index));
        fs::write(&path, frame_to_text(&frame)).map_err(ExportError::io(&path))?;
        paths.push(path);
    }
    info!("Wrote {} text meshes to {}", paths.len(), dir.display());
    Ok(paths)
}

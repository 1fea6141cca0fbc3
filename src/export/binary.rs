//! Writer and reader for the five-file packed-buffer artifact.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::info;

use super::format::{
    COLOR_FILE, ExportError, FACE_FILE, FACE_OFFSET_FILE, LAST_COLOR_FILE, LAST_FACE_FILE,
    LAST_VERTEX_FILE, VERTEX_FILE, VERTEX_OFFSET_FILE, decode_f32, decode_u32, encode_f32,
    encode_u32,
};
use crate::compute::PackedBuffers;

/// Summary of a binary export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportStats {
    /// Frames written.
    pub frame_count: usize,
    /// Total vertices written.
    pub vertex_count: usize,
    /// Total faces written.
    pub face_count: usize,
    /// Bytes written across all files.
    pub total_bytes: u64,
}

impl std::fmt::Display for ExportStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} frames, {} vertices, {} faces, {} bytes total",
            self.frame_count, self.vertex_count, self.face_count, self.total_bytes
        )
    }
}

fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> Result<u64, ExportError> {
    let path = dir.join(name);
    let file = fs::File::create(&path).map_err(ExportError::io(&path))?;
    let mut writer = BufWriter::new(file);
    writer.write_all(bytes).map_err(ExportError::io(&path))?;
    writer.flush().map_err(ExportError::io(&path))?;
    Ok(bytes.len() as u64)
}

fn create_dir(dir: &Path) -> Result<(), ExportError> {
    fs::create_dir_all(dir).map_err(ExportError::io(dir))
}

/// Write the five packed buffers into `dir`, creating it if needed.
///
/// Existing files are overwritten.
pub fn write_buffers<P: AsRef<Path>>(
    dir: P,
    packed: &PackedBuffers,
) -> Result<ExportStats, ExportError> {
    let dir = dir.as_ref();
    create_dir(dir)?;

    let mut total_bytes = 0;
    total_bytes += write_file(
        dir,
        VERTEX_FILE,
        &encode_f32(bytemuck::cast_slice(&packed.vertex_buffer)),
    )?;
    total_bytes += write_file(
        dir,
        COLOR_FILE,
        &encode_f32(bytemuck::cast_slice(&packed.color_buffer)),
    )?;
    total_bytes += write_file(
        dir,
        FACE_FILE,
        &encode_u32(bytemuck::cast_slice(&packed.face_buffer)),
    )?;
    total_bytes += write_file(dir, VERTEX_OFFSET_FILE, &encode_u32(&packed.vertex_offsets))?;
    total_bytes += write_file(dir, FACE_OFFSET_FILE, &encode_u32(&packed.face_offsets))?;

    let stats = ExportStats {
        frame_count: packed.frame_count(),
        vertex_count: packed.vertex_count(),
        face_count: packed.face_count(),
        total_bytes,
    };
    info!("Wrote {} to {}", stats, dir.display());
    Ok(stats)
}

/// Write the final frame's vertex, color and face slices on their own.
///
/// Does nothing for an empty sequence.
pub fn write_last_frame<P: AsRef<Path>>(dir: P, packed: &PackedBuffers) -> Result<(), ExportError> {
    let Some(last) = packed.frame_count().checked_sub(1) else {
        return Ok(());
    };
    let Some(frame) = packed.frame(last) else {
        return Ok(());
    };
    let dir = dir.as_ref();
    create_dir(dir)?;
    write_file(
        dir,
        LAST_VERTEX_FILE,
        &encode_f32(bytemuck::cast_slice(frame.vertices)),
    )?;
    write_file(
        dir,
        LAST_COLOR_FILE,
        &encode_f32(bytemuck::cast_slice(frame.colors)),
    )?;
    write_file(
        dir,
        LAST_FACE_FILE,
        &encode_u32(bytemuck::cast_slice(frame.faces)),
    )?;
    Ok(())
}

fn read_file(dir: &Path, name: &str) -> Result<(std::path::PathBuf, Vec<u8>), ExportError> {
    let path = dir.join(name);
    let bytes = fs::read(&path).map_err(ExportError::io(&path))?;
    Ok((path, bytes))
}

fn read_vec3_f32(dir: &Path, name: &str) -> Result<Vec<[f32; 3]>, ExportError> {
    let (path, bytes) = read_file(dir, name)?;
    let flat = decode_f32(&bytes).ok_or_else(|| ExportError::Malformed {
        path: path.clone(),
        reason: format!("{} bytes is not a whole number of f32 values", bytes.len()),
    })?;
    bytemuck::try_cast_slice::<f32, [f32; 3]>(&flat)
        .map(<[[f32; 3]]>::to_vec)
        .map_err(|_| ExportError::Malformed {
            path,
            reason: format!("{} values is not a multiple of 3", flat.len()),
        })
}

fn read_vec3_u32(dir: &Path, name: &str) -> Result<Vec<[u32; 3]>, ExportError> {
    let (path, bytes) = read_file(dir, name)?;
    let flat = decode_u32(&bytes).ok_or_else(|| ExportError::Malformed {
        path: path.clone(),
        reason: format!("{} bytes is not a whole number of u32 values", bytes.len()),
    })?;
    bytemuck::try_cast_slice::<u32, [u32; 3]>(&flat)
        .map(<[[u32; 3]]>::to_vec)
        .map_err(|_| ExportError::Malformed {
            path,
            reason: format!("{} values is not a multiple of 3", flat.len()),
        })
}

fn read_u32(dir: &Path, name: &str) -> Result<Vec<u32>, ExportError> {
    let (path, bytes) = read_file(dir, name)?;
    decode_u32(&bytes).ok_or_else(|| ExportError::Malformed {
        path,
        reason: format!("{} bytes is not a whole number of u32 values", bytes.len()),
    })
}

/// Read a packed-buffer artifact back from `dir`.
///
/// The offset tables are validated against the buffer lengths.
pub fn read_buffers<P: AsRef<Path>>(dir: P) -> Result<PackedBuffers, ExportError> {
    let dir = dir.as_ref();
    let packed = PackedBuffers {
        vertex_buffer: read_vec3_f32(dir, VERTEX_FILE)?,
        color_buffer: read_vec3_f32(dir, COLOR_FILE)?,
        face_buffer: read_vec3_u32(dir, FACE_FILE)?,
        vertex_offsets: read_u32(dir, VERTEX_OFFSET_FILE)?,
        face_offsets: read_u32(dir, FACE_OFFSET_FILE)?,
    };
    packed
        .validate()
        .map_err(|e| ExportError::Malformed {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;
    Ok(packed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::pack;
    use crate::schema::Frame;
    use tempfile::tempdir;

    fn sample() -> PackedBuffers {
        let frames = vec![
            Frame {
                vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                faces: vec![[0, 1, 2]],
                attributes: vec![vec![0.0]; 3],
            },
            Frame {
                vertices: vec![[2.0, 2.0, 2.0], [3.0, 3.0, 3.0]],
                faces: vec![],
                attributes: vec![vec![0.0]; 2],
            },
        ];
        let colors = vec![
            vec![[0.0, 0.5, 1.0], [1.0, 0.5, 0.0], [0.5, 0.5, 0.5]],
            vec![[1.0, 1.0, 1.0], [0.0, 0.0, 0.0]],
        ];
        pack(&frames, &colors).unwrap()
    }

    #[test]
    fn test_write_creates_five_files() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("nested").join("out");
        let packed = sample();

        let stats = write_buffers(&out, &packed).unwrap();
        assert_eq!(stats.frame_count, 2);
        assert_eq!(stats.vertex_count, 5);

        let len = |name: &str| fs::metadata(out.join(name)).unwrap().len();
        assert_eq!(len(VERTEX_FILE), 5 * 3 * 4);
        assert_eq!(len(COLOR_FILE), 5 * 3 * 4);
        assert_eq!(len(FACE_FILE), 3 * 4);
        assert_eq!(len(VERTEX_OFFSET_FILE), 2 * 4);
        assert_eq!(len(FACE_OFFSET_FILE), 2 * 4);
        assert_eq!(stats.total_bytes, 60 + 60 + 12 + 8 + 8);

        let offsets = fs::read(out.join(VERTEX_OFFSET_FILE)).unwrap();
        assert_eq!(offsets, vec![3, 0, 0, 0, 5, 0, 0, 0]);
    }

    #[test]
    fn test_read_back() {
        let dir = tempdir().unwrap();
        let packed = sample();
        write_buffers(dir.path(), &packed).unwrap();
        // Second write overwrites in place
        write_buffers(dir.path(), &packed).unwrap();

        let loaded = read_buffers(dir.path()).unwrap();
        assert_eq!(loaded, packed);
        let first = loaded.frame(0).unwrap();
        assert_eq!(first.colors[0], [0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_last_frame_dump() {
        let dir = tempdir().unwrap();
        let packed = sample();
        write_last_frame(dir.path(), &packed).unwrap();

        let verts = fs::read(dir.path().join(LAST_VERTEX_FILE)).unwrap();
        assert_eq!(
            decode_f32(&verts).unwrap(),
            vec![2.0, 2.0, 2.0, 3.0, 3.0, 3.0]
        );
        let faces = fs::read(dir.path().join(LAST_FACE_FILE)).unwrap();
        assert!(faces.is_empty());
    }

    #[test]
    fn test_read_rejects_truncated() {
        let dir = tempdir().unwrap();
        write_buffers(dir.path(), &sample()).unwrap();
        fs::write(dir.path().join(COLOR_FILE), [0u8; 10]).unwrap();
        assert!(matches!(
            read_buffers(dir.path()),
            Err(ExportError::Malformed { .. })
        ));

        fs::write(dir.path().join(COLOR_FILE), [0u8; 16]).unwrap();
        assert!(matches!(
            read_buffers(dir.path()),
            Err(ExportError::Malformed { .. })
        ));
    }

    #[test]
    fn test_read_missing_dir() {
        let dir = tempdir().unwrap();
        let err = read_buffers(dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, ExportError::Io { .. }));
        assert!(err.to_string().contains("absent"));
    }
}

//! Packing of per-frame geometry into flat buffers with offset tables.
//!
//! All frames are concatenated in sequence order. `vertex_offsets[i]` and
//! `face_offsets[i]` hold the cumulative vertex / face count after frame `i`,
//! so frame `i` occupies `[offsets[i - 1], offsets[i])` (starting at 0 for the
//! first frame).

use std::ops::Range;

use crate::schema::Frame;

/// Packing errors.
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("Frame count {frames} does not match color array count {colors}")]
    FrameCountMismatch { frames: usize, colors: usize },
    #[error("Frame {frame} has {vertices} vertices but {colors} colors")]
    LengthMismatch {
        frame: usize,
        vertices: usize,
        colors: usize,
    },
    #[error("Cumulative count {0} does not fit in a u32 offset")]
    OffsetOverflow(usize),
    #[error("Offset table invalid: {0}")]
    InvalidOffsets(String),
}

/// Concatenated geometry for a whole sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackedBuffers {
    /// Vertex positions of every frame.
    pub vertex_buffer: Vec<[f32; 3]>,
    /// Vertex colors, aligned with `vertex_buffer`.
    pub color_buffer: Vec<[f32; 3]>,
    /// Faces of every frame; indices are local to their frame.
    pub face_buffer: Vec<[u32; 3]>,
    /// Cumulative vertex count after each frame.
    pub vertex_offsets: Vec<u32>,
    /// Cumulative face count after each frame.
    pub face_offsets: Vec<u32>,
}

/// Borrowed view of one frame inside [`PackedBuffers`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSlice<'a> {
    /// Frame vertices.
    pub vertices: &'a [[f32; 3]],
    /// Frame colors.
    pub colors: &'a [[f32; 3]],
    /// Frame faces (frame-local indices).
    pub faces: &'a [[u32; 3]],
}

fn to_offset(count: usize) -> Result<u32, PackError> {
    u32::try_from(count).map_err(|_| PackError::OffsetOverflow(count))
}

/// Pack frames and their colors into flat buffers.
///
/// Buffers are allocated once at their final size and filled through a
/// running cursor.
pub fn pack(frames: &[Frame], colors: &[Vec<[f32; 3]>]) -> Result<PackedBuffers, PackError> {
    if frames.len() != colors.len() {
        return Err(PackError::FrameCountMismatch {
            frames: frames.len(),
            colors: colors.len(),
        });
    }
    for (i, (frame, c)) in frames.iter().zip(colors).enumerate() {
        if frame.vertex_count() != c.len() {
            return Err(PackError::LengthMismatch {
                frame: i,
                vertices: frame.vertex_count(),
                colors: c.len(),
            });
        }
    }

    let total_vertices: usize = frames.iter().map(Frame::vertex_count).sum();
    let total_faces: usize = frames.iter().map(Frame::face_count).sum();
    to_offset(total_vertices)?;
    to_offset(total_faces)?;

    let mut packed = PackedBuffers {
        vertex_buffer: vec![[0.0; 3]; total_vertices],
        color_buffer: vec![[0.0; 3]; total_vertices],
        face_buffer: vec![[0; 3]; total_faces],
        vertex_offsets: Vec::with_capacity(frames.len()),
        face_offsets: Vec::with_capacity(frames.len()),
    };

    let mut vertex_cursor = 0usize;
    let mut face_cursor = 0usize;
    for (frame, c) in frames.iter().zip(colors) {
        let v_end = vertex_cursor + frame.vertex_count();
        packed.vertex_buffer[vertex_cursor..v_end].copy_from_slice(&frame.vertices);
        packed.color_buffer[vertex_cursor..v_end].copy_from_slice(c);
        vertex_cursor = v_end;

        let f_end = face_cursor + frame.face_count();
        packed.face_buffer[face_cursor..f_end].copy_from_slice(&frame.faces);
        face_cursor = f_end;

        packed.vertex_offsets.push(to_offset(vertex_cursor)?);
        packed.face_offsets.push(to_offset(face_cursor)?);
    }

    Ok(packed)
}

impl PackedBuffers {
    /// Number of packed frames.
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.vertex_offsets.len()
    }

    /// Total vertex count.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertex_buffer.len()
    }

    /// Total face count.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.face_buffer.len()
    }

    /// Vertex range of frame `index`.
    pub fn vertex_range(&self, index: usize) -> Option<Range<usize>> {
        slice_range(&self.vertex_offsets, index)
    }

    /// Face range of frame `index`.
    pub fn face_range(&self, index: usize) -> Option<Range<usize>> {
        slice_range(&self.face_offsets, index)
    }

    /// Borrow frame `index` without copying.
    pub fn frame(&self, index: usize) -> Option<FrameSlice<'_>> {
        let v = self.vertex_range(index)?;
        let f = self.face_range(index)?;
        Some(FrameSlice {
            vertices: self.vertex_buffer.get(v.clone())?,
            colors: self.color_buffer.get(v)?,
            faces: self.face_buffer.get(f)?,
        })
    }

    /// Iterate over every frame in order.
    pub fn frames(&self) -> impl Iterator<Item = FrameSlice<'_>> {
        (0..self.frame_count()).filter_map(move |i| self.frame(i))
    }

    /// Check the offset-table invariants.
    ///
    /// Both tables have one entry per frame, never decrease, and end at the
    /// length of their buffer. Colors must be aligned with vertices.
    pub fn validate(&self) -> Result<(), PackError> {
        if self.color_buffer.len() != self.vertex_buffer.len() {
            return Err(PackError::InvalidOffsets(format!(
                "{} colors for {} vertices",
                self.color_buffer.len(),
                self.vertex_buffer.len()
            )));
        }
        if self.vertex_offsets.len() != self.face_offsets.len() {
            return Err(PackError::InvalidOffsets(format!(
                "{} vertex offsets but {} face offsets",
                self.vertex_offsets.len(),
                self.face_offsets.len()
            )));
        }
        check_offsets("vertex", &self.vertex_offsets, self.vertex_buffer.len())?;
        check_offsets("face", &self.face_offsets, self.face_buffer.len())
    }
}

fn slice_range(offsets: &[u32], index: usize) -> Option<Range<usize>> {
    let end = *offsets.get(index)? as usize;
    let start = match index {
        0 => 0,
        _ => offsets[index - 1] as usize,
    };
    (start <= end).then_some(start..end)
}

fn check_offsets(name: &str, offsets: &[u32], len: usize) -> Result<(), PackError> {
    if let Some(pos) = offsets.windows(2).position(|w| w[0] > w[1]) {
        return Err(PackError::InvalidOffsets(format!(
            "{name} offsets decrease at frame {}",
            pos + 1
        )));
    }
    let last = offsets.last().map_or(0, |&o| o as usize);
    if last != len {
        return Err(PackError::InvalidOffsets(format!(
            "last {name} offset {last} but buffer holds {len}"
        )));
    }
    Ok(())
}

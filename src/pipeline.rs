//! The batch job: discover → parse → embed → pack → export.
//!
//! Parsing runs per file and can be spread over the rayon pool. The embedding
//! fit is the single barrier: it needs every frame before any color exists.
//! Packing and export then run once over the whole sequence.

use std::path::Path;
use std::time::{Duration, Instant};

use log::{info, warn};
use rayon::prelude::*;

use crate::compute::{
    EmbeddingComputer, EmbeddingError, FormatError, PackError, PackedBuffers, SequenceEmbedding,
    pack, parse_frame_file,
};
use crate::discovery::{DiscoveryError, discover};
use crate::export::{ExportError, write_buffers, write_last_frame, write_text_frames};
use crate::schema::{ConfigError, ExportFormat, Frame, PipelineConfig};

/// Any failure that aborts a run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    #[error(transparent)]
    Pack(#[from] PackError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Frames packed.
    pub frame_count: usize,
    /// Total vertices across all frames.
    pub vertex_count: usize,
    /// Total faces across all frames.
    pub face_count: usize,
    /// Explained-variance ratio of the first three components.
    pub explained_variance: f64,
    /// (frame, axis) pairs that used the degenerate fill value.
    pub degenerate_axes: usize,
    /// Output format written.
    pub format: ExportFormat,
    /// Wall time of the run.
    pub elapsed: Duration,
}

impl std::fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} frames, {} vertices, {} faces ({:?}), explained variance {:.4}, {:.2}s",
            self.frame_count,
            self.vertex_count,
            self.face_count,
            self.format,
            self.explained_variance,
            self.elapsed.as_secs_f32()
        )
    }
}

/// Parse every snapshot, preserving path order.
pub fn parse_all<P: AsRef<Path> + Sync>(
    paths: &[P],
    config: &PipelineConfig,
) -> Result<Vec<Frame>, FormatError> {
    let kinds = &config.attribute_kinds;
    if config.parallel {
        paths
            .par_iter()
            .map(|p| parse_frame_file(p.as_ref(), kinds))
            .collect()
    } else {
        paths
            .iter()
            .map(|p| parse_frame_file(p.as_ref(), kinds))
            .collect()
    }
}

/// Embed and pack an in-memory sequence.
///
/// Returns `None` for an empty sequence.
pub fn pack_sequence(
    frames: &[Frame],
    config: &PipelineConfig,
) -> Result<Option<(PackedBuffers, SequenceEmbedding)>, PipelineError> {
    let computer =
        EmbeddingComputer::new(config.embedding.clone()).with_parallel(config.parallel);
    let Some(embedding) = computer.compute(frames)? else {
        return Ok(None);
    };
    let packed = pack(frames, &embedding.colors)?;
    Ok(Some((packed, embedding)))
}

/// Embed, pack and export an in-memory sequence into `output`.
pub fn process(
    frames: &[Frame],
    output: &Path,
    config: &PipelineConfig,
) -> Result<Option<PipelineReport>, PipelineError> {
    let start = Instant::now();
    let Some((packed, embedding)) = pack_sequence(frames, config)? else {
        return Ok(None);
    };

    match config.export.format {
        ExportFormat::Binary => {
            write_buffers(output, &packed)?;
            if config.export.write_last_frame {
                write_last_frame(output, &packed)?;
            }
        }
        ExportFormat::Text => {
            write_text_frames(output, &packed)?;
        }
    }

    Ok(Some(PipelineReport {
        frame_count: packed.frame_count(),
        vertex_count: packed.vertex_count(),
        face_count: packed.face_count(),
        explained_variance: embedding.explained_variance,
        degenerate_axes: embedding.degenerate_axes,
        format: config.export.format,
        elapsed: start.elapsed(),
    }))
}

/// Run the whole job on a directory of snapshots.
///
/// An input with no snapshots is a no-op: nothing is written and `Ok(None)`
/// is returned.
pub fn run(
    input: &Path,
    output: &Path,
    config: &PipelineConfig,
) -> Result<Option<PipelineReport>, PipelineError> {
    config.validate()?;
    let start = Instant::now();

    let paths = discover(input, config)?;
    if paths.is_empty() {
        warn!("No snapshots found in {}; nothing to do", input.display());
        return Ok(None);
    }
    info!("Parsing {} snapshots from {}", paths.len(), input.display());

    let frames = parse_all(&paths, config)?;
    let report = process(&frames, output, config)?.map(|mut report| {
        report.elapsed = start.elapsed();
        report
    });
    if let Some(report) = &report {
        info!("Packed {report}");
    }
    Ok(report)
}

//! Sequence-wide attribute embedding and per-vertex coloring.
//!
//! One PCA basis is fit on every attribute vector of the sequence, so a given
//! attribute state maps to the same projected point in every frame. Colors
//! are the first three projected axes, min-max normalized and routed to RGB
//! through [`CHANNEL_MAP`].

use log::{debug, info};
use rayon::prelude::*;

use super::pca::{Pca, PcaError};
use crate::schema::{EmbeddingConfig, Frame, NormalizationScope};

/// Number of projected axes used for coloring.
pub const EMBEDDING_AXES: usize = 3;

/// Projected axis feeding each color channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelMap {
    /// Axis routed to red.
    pub red: usize,
    /// Axis routed to green.
    pub green: usize,
    /// Axis routed to blue.
    pub blue: usize,
}

impl ChannelMap {
    /// Axes in `[r, g, b]` order.
    #[inline]
    pub fn axes(self) -> [usize; 3] {
        [self.red, self.green, self.blue]
    }
}

/// Channel routing expected by the viewer: red from axis 1, green from
/// axis 2, blue from axis 0.
pub const CHANNEL_MAP: ChannelMap = ChannelMap {
    red: 1,
    green: 2,
    blue: 0,
};

/// Embedding errors.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("Frame {frame} has {found} attribute columns, expected {expected}")]
    DimensionMismatch {
        frame: usize,
        expected: usize,
        found: usize,
    },
    #[error("No attribute columns selected; nothing to embed")]
    NoAttributes,
    #[error("PCA fit failed: {0}")]
    Pca(#[from] PcaError),
}

/// Per-axis min/max of projected points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisRange {
    /// Minimum per axis.
    pub min: [f64; EMBEDDING_AXES],
    /// Maximum per axis.
    pub max: [f64; EMBEDDING_AXES],
}

impl Default for AxisRange {
    fn default() -> Self {
        Self {
            min: [f64::INFINITY; EMBEDDING_AXES],
            max: [f64::NEG_INFINITY; EMBEDDING_AXES],
        }
    }
}

impl AxisRange {
    /// Range covering `points`.
    pub fn of(points: &[[f64; EMBEDDING_AXES]]) -> Self {
        let mut range = Self::default();
        for p in points {
            for axis in 0..EMBEDDING_AXES {
                range.min[axis] = range.min[axis].min(p[axis]);
                range.max[axis] = range.max[axis].max(p[axis]);
            }
        }
        range
    }

    /// Smallest range covering both.
    pub fn merge(self, other: Self) -> Self {
        let mut out = self;
        for axis in 0..EMBEDDING_AXES {
            out.min[axis] = out.min[axis].min(other.min[axis]);
            out.max[axis] = out.max[axis].max(other.max[axis]);
        }
        out
    }

    /// Whether `axis` has no usable spread.
    #[inline]
    pub fn is_degenerate(&self, axis: usize) -> bool {
        let span = self.max[axis] - self.min[axis];
        !(span > 0.0 && span.is_finite())
    }

    /// Map `value` on `axis` into `[0, 1]`, or `fill` for a degenerate axis.
    #[inline]
    pub fn normalize(&self, axis: usize, value: f64, fill: f32) -> f32 {
        if self.is_degenerate(axis) {
            return fill;
        }
        let t = (value - self.min[axis]) / (self.max[axis] - self.min[axis]);
        t.clamp(0.0, 1.0) as f32
    }
}

/// Result of embedding a sequence.
#[derive(Debug, Clone)]
pub struct SequenceEmbedding {
    /// Per-frame RGB colors, aligned with each frame's vertices.
    pub colors: Vec<Vec<[f32; 3]>>,
    /// Range used to normalize each frame.
    pub ranges: Vec<AxisRange>,
    /// Summed explained-variance ratio of the first three components.
    pub explained_variance: f64,
    /// Number of (frame, axis) pairs that fell back to the fill value.
    pub degenerate_axes: usize,
}

/// Fits the sequence-wide basis and colors every frame.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingComputer {
    config: EmbeddingConfig,
    parallel: bool,
}

impl EmbeddingComputer {
    /// Create a computer with the given configuration (sequential).
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            config,
            parallel: false,
        }
    }

    /// Project frames on the rayon pool.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Check that all non-empty frames share one attribute width.
    fn corpus_width(frames: &[Frame]) -> Result<Option<usize>, EmbeddingError> {
        let mut width = None;
        for (i, frame) in frames.iter().enumerate() {
            let Some(found) = frame.attribute_width() else {
                continue;
            };
            match width {
                None => width = Some(found),
                Some(expected) if expected != found => {
                    return Err(EmbeddingError::DimensionMismatch {
                        frame: i,
                        expected,
                        found,
                    });
                }
                Some(_) => {}
            }
            // Every row must match its frame's width.
            if let Some(row) = frame.attributes.iter().find(|r| r.len() != found) {
                return Err(EmbeddingError::DimensionMismatch {
                    frame: i,
                    expected: found,
                    found: row.len(),
                });
            }
        }
        match width {
            Some(0) => Err(EmbeddingError::NoAttributes),
            w => Ok(w),
        }
    }

    /// Fit the PCA basis on the concatenated attributes of every frame.
    ///
    /// Returns `None` when the sequence holds no vertices at all.
    pub fn fit(&self, frames: &[Frame]) -> Result<Option<Pca>, EmbeddingError> {
        if Self::corpus_width(frames)?.is_none() {
            return Ok(None);
        }
        let corpus = frames
            .iter()
            .flat_map(|f| f.attributes.iter().map(Vec::as_slice));
        let pca = Pca::fit(corpus)?;
        info!(
            "Fit PCA on {} vectors ({} dims); first {} components explain {:.4} of variance {:?}",
            pca.samples(),
            pca.width(),
            EMBEDDING_AXES,
            pca.explained_variance_top(EMBEDDING_AXES),
            pca.explained_variance_ratio()
        );
        Ok(Some(pca))
    }

    /// Color every frame of the sequence.
    ///
    /// Returns `None` for an empty sequence.
    pub fn compute(&self, frames: &[Frame]) -> Result<Option<SequenceEmbedding>, EmbeddingError> {
        if frames.is_empty() {
            return Ok(None);
        }

        let Some(pca) = self.fit(frames)? else {
            // Frames exist but none has a vertex: nothing to color.
            return Ok(Some(SequenceEmbedding {
                colors: vec![Vec::new(); frames.len()],
                ranges: vec![AxisRange::default(); frames.len()],
                explained_variance: 0.0,
                degenerate_axes: 0,
            }));
        };

        let projected: Vec<Vec<[f64; EMBEDDING_AXES]>> = if self.parallel {
            frames.par_iter().map(|f| project_frame(&pca, f)).collect()
        } else {
            frames.iter().map(|f| project_frame(&pca, f)).collect()
        };

        let local: Vec<AxisRange> = projected.iter().map(|p| AxisRange::of(p)).collect();
        let ranges = match self.config.normalization {
            NormalizationScope::PerFrame => local,
            NormalizationScope::Sequence => {
                let global = local
                    .iter()
                    .fold(AxisRange::default(), |acc, r| acc.merge(*r));
                vec![global; frames.len()]
            }
        };

        let mut degenerate_axes = 0;
        for (i, (range, points)) in ranges.iter().zip(&projected).enumerate() {
            if points.is_empty() {
                continue;
            }
            let flat: Vec<usize> = (0..EMBEDDING_AXES)
                .filter(|&axis| range.is_degenerate(axis))
                .collect();
            if !flat.is_empty() {
                debug!(
                    "Frame {i}: degenerate axes {flat:?}, filled with {}",
                    self.config.degenerate_fill
                );
                degenerate_axes += flat.len();
            }
        }

        let fill = self.config.degenerate_fill;
        let colors: Vec<Vec<[f32; 3]>> = if self.parallel {
            projected
                .par_iter()
                .zip(ranges.par_iter())
                .map(|(points, range)| colorize(points, range, fill))
                .collect()
        } else {
            projected
                .iter()
                .zip(&ranges)
                .map(|(points, range)| colorize(points, range, fill))
                .collect()
        };

        Ok(Some(SequenceEmbedding {
            colors,
            ranges,
            explained_variance: pca.explained_variance_top(EMBEDDING_AXES),
            degenerate_axes,
        }))
    }
}

/// Project a frame's attribute vectors onto the leading axes.
fn project_frame(pca: &Pca, frame: &Frame) -> Vec<[f64; EMBEDDING_AXES]> {
    frame
        .attributes
        .iter()
        .map(|row| {
            let mut p = [0.0; EMBEDDING_AXES];
            pca.project_into(row, &mut p);
            p
        })
        .collect()
}

/// Normalize projected points into RGB through [`CHANNEL_MAP`].
pub fn colorize(points: &[[f64; EMBEDDING_AXES]], range: &AxisRange, fill: f32) -> Vec<[f32; 3]> {
    let axes = CHANNEL_MAP.axes();
    points
        .iter()
        .map(|p| axes.map(|axis| range.normalize(axis, p[axis], fill)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn frame(attributes: Vec<Vec<f64>>) -> Frame {
        Frame {
            vertices: vec![[0.0; 3]; attributes.len()],
            faces: vec![],
            attributes,
        }
    }

    fn two_frames() -> Vec<Frame> {
        vec![
            frame(vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]]),
            frame(vec![vec![2.0, 2.0], vec![0.0, 0.0]]),
        ]
    }

    fn channel(colors: &[[f32; 3]], c: usize) -> Vec<f32> {
        colors.iter().map(|rgb| rgb[c]).collect()
    }

    #[test]
    fn test_channel_map() {
        assert_eq!(CHANNEL_MAP.axes(), [1, 2, 0]);
    }

    #[test]
    fn test_per_frame_normalization() {
        let frames = two_frames();
        let emb = EmbeddingComputer::default()
            .compute(&frames)
            .unwrap()
            .unwrap();

        assert_eq!(emb.colors.len(), 2);
        assert_eq!(emb.colors[0].len(), 3);
        assert_eq!(emb.colors[1].len(), 2);

        // Blue (axis 0) spans each frame's own range
        for colors in &emb.colors {
            let blue = channel(colors, 2);
            let lo = blue.iter().copied().fold(f32::INFINITY, f32::min);
            let hi = blue.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            assert!(lo.abs() < 1e-6);
            assert!((hi - 1.0).abs() < 1e-6);
        }

        // Frame 0: (0,0) sits midway along axis 1
        let red = channel(&emb.colors[0], 0);
        assert!((red[0] - 0.5).abs() < 1e-6);

        // Frame 1 only varies along (1,1), so axis 1 is flat; 2-wide data has no axis 2
        assert_eq!(channel(&emb.colors[1], 0), vec![0.0, 0.0]);
        assert_eq!(channel(&emb.colors[1], 1), vec![0.0, 0.0]);
        assert_eq!(emb.degenerate_axes, 3);
    }

    #[test]
    fn test_sequence_normalization() {
        let frames = two_frames();
        let config = EmbeddingConfig {
            normalization: NormalizationScope::Sequence,
            degenerate_fill: 0.0,
        };
        let emb = EmbeddingComputer::new(config)
            .compute(&frames)
            .unwrap()
            .unwrap();

        assert_eq!(emb.ranges[0], emb.ranges[1]);
        // Frame 0 no longer reaches the top of the blue range
        let blue = channel(&emb.colors[0], 2);
        let hi = blue.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        assert!((hi - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_fill() {
        let frames = vec![frame(vec![vec![1.0, 1.0]; 4])];
        let config = EmbeddingConfig {
            normalization: NormalizationScope::PerFrame,
            degenerate_fill: 0.5,
        };
        let emb = EmbeddingComputer::new(config)
            .compute(&frames)
            .unwrap()
            .unwrap();
        assert!(emb.colors[0].iter().all(|rgb| *rgb == [0.5, 0.5, 0.5]));
        assert_eq!(emb.explained_variance, 0.0);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let frames = two_frames();
        let seq = EmbeddingComputer::default().compute(&frames).unwrap().unwrap();
        let par = EmbeddingComputer::default()
            .with_parallel(true)
            .compute(&frames)
            .unwrap()
            .unwrap();
        assert_eq!(seq.colors, par.colors);
    }

    #[test]
    fn test_empty_sequence() {
        assert!(EmbeddingComputer::default().compute(&[]).unwrap().is_none());
    }

    #[test]
    fn test_frames_without_vertices() {
        let frames = vec![Frame::default(), Frame::default()];
        let emb = EmbeddingComputer::default()
            .compute(&frames)
            .unwrap()
            .unwrap();
        assert_eq!(emb.colors, vec![Vec::<[f32; 3]>::new(); 2]);
    }

    #[test]
    fn test_dimension_mismatch() {
        let frames = vec![frame(vec![vec![0.0, 1.0]]), frame(vec![vec![0.0]])];
        assert!(matches!(
            EmbeddingComputer::default().compute(&frames),
            Err(EmbeddingError::DimensionMismatch {
                frame: 1,
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn test_no_attribute_columns() {
        let frames = vec![frame(vec![vec![], vec![]])];
        assert!(matches!(
            EmbeddingComputer::default().compute(&frames),
            Err(EmbeddingError::NoAttributes)
        ));
    }

    proptest! {
        #[test]
        fn colors_stay_in_unit_cube(
            frames in prop::collection::vec(
                prop::collection::vec(prop::collection::vec(-1e3f64..1e3, 4), 0..12),
                1..5,
            )
        ) {
            let frames: Vec<Frame> = frames.into_iter().map(frame).collect();
            let emb = EmbeddingComputer::default().compute(&frames).unwrap().unwrap();
            for (colors, f) in emb.colors.iter().zip(&frames) {
                prop_assert_eq!(colors.len(), f.vertices.len());
                for rgb in colors {
                    for &c in rgb {
                        prop_assert!(c.is_finite());
                        prop_assert!((0.0..=1.0).contains(&c));
                    }
                }
            }
        }
    }
}

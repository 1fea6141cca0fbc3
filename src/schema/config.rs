//! Configuration types for a packing run.

use serde::{Deserialize, Serialize};

use super::AttributeKind;

fn default_suffix() -> String {
    ".form.obj".to_string()
}

/// Subject directory used in evolution mode when none is named.
pub const DEFAULT_SUBJECT: &str = "0";

fn default_subject() -> String {
    DEFAULT_SUBJECT.to_string()
}

fn default_kinds() -> Vec<AttributeKind> {
    AttributeKind::ALL.to_vec()
}

fn default_parallel() -> bool {
    true
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// How snapshot files are discovered in the input directory.
    #[serde(default)]
    pub discovery: DiscoveryMode,
    /// File-name suffix identifying snapshot files.
    #[serde(default = "default_suffix")]
    pub file_suffix: String,
    /// Drop the final snapshot of each sequence (often written mid-step).
    #[serde(default)]
    pub drop_last: bool,
    /// Attribute kinds selected from the header.
    #[serde(default = "default_kinds")]
    pub attribute_kinds: Vec<AttributeKind>,
    /// Embedding and color normalization.
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    /// Output format.
    #[serde(default)]
    pub export: ExportConfig,
    /// Parse files and project frames on the rayon pool.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            discovery: DiscoveryMode::default(),
            file_suffix: default_suffix(),
            drop_last: false,
            attribute_kinds: default_kinds(),
            embedding: EmbeddingConfig::default(),
            export: ExportConfig::default(),
            parallel: true,
        }
    }
}

/// Snapshot discovery mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DiscoveryMode {
    /// Every snapshot in the input directory is one frame.
    #[default]
    Sequence,
    /// Each numeric subdirectory is a generation; its subject's final
    /// snapshot becomes one frame.
    Evolution {
        /// Subject subdirectory inside each generation.
        #[serde(default = "default_subject")]
        subject: String,
    },
}

/// Scope of the per-axis min/max used to normalize colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationScope {
    /// Min/max taken within each frame.
    #[default]
    PerFrame,
    /// Min/max taken across the whole sequence.
    Sequence,
}

/// Embedding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Min/max normalization scope.
    #[serde(default)]
    pub normalization: NormalizationScope,
    /// Channel value emitted for an axis with zero range.
    #[serde(default)]
    pub degenerate_fill: f32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            normalization: NormalizationScope::PerFrame,
            degenerate_fill: 0.0,
        }
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// Five raw little-endian buffers.
    #[default]
    Binary,
    /// One colorized text mesh per frame.
    Text,
}

/// Export configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Output format.
    #[serde(default)]
    pub format: ExportFormat,
    /// Also dump the final frame's slices (binary format only).
    #[serde(default)]
    pub write_last_frame: bool,
}

impl PipelineConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.file_suffix.is_empty() {
            return Err(ConfigError::EmptySuffix);
        }
        if self.attribute_kinds.is_empty() {
            return Err(ConfigError::NoAttributeKinds);
        }
        let fill = self.embedding.degenerate_fill;
        if !(0.0..=1.0).contains(&fill) {
            return Err(ConfigError::InvalidDegenerateFill(fill));
        }
        if let DiscoveryMode::Evolution { subject } = &self.discovery {
            if subject.is_empty() {
                return Err(ConfigError::EmptySubject);
            }
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Snapshot file suffix must be non-empty")]
    EmptySuffix,
    #[error("At least one attribute kind must be selected")]
    NoAttributeKinds,
    #[error("Degenerate fill value {0} must lie in [0, 1]")]
    InvalidDegenerateFill(f32),
    #[error("Evolution subject directory must be non-empty")]
    EmptySubject,
}

//! Discovery of snapshot files in an export directory.
//!
//! The simulator writes one snapshot per step as `<step>.form.obj`. A sequence
//! is ordered by that numeric step, never by lexical file name. Evolution runs
//! nest one directory per generation, each holding per-subject sequences.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::schema::{DiscoveryMode, PipelineConfig};

/// Discovery errors.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("Cannot list {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Snapshot {} has no numeric step index", path.display())]
    MissingIndex { path: PathBuf },
}

/// Numeric step index of a snapshot file name.
///
/// The index is the run of digits directly before `suffix`, so both
/// `12.form.obj` and `coral_12.form.obj` map to 12.
pub fn snapshot_index(name: &str, suffix: &str) -> Option<u64> {
    let stem = name.strip_suffix(suffix)?;
    let digits_start = stem
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    stem[digits_start..].parse().ok()
}

fn list_dir(dir: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
    let io_err = |source: std::io::Error| DiscoveryError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        paths.push(entry.map_err(io_err)?.path());
    }
    Ok(paths)
}

/// Ordered snapshot paths of one sequence directory.
pub fn sequence_paths(
    dir: &Path,
    suffix: &str,
    drop_last: bool,
) -> Result<Vec<PathBuf>, DiscoveryError> {
    let mut indexed = Vec::new();
    for path in list_dir(dir)? {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.ends_with(suffix) || !path.is_file() {
            continue;
        }
        let index = snapshot_index(name, suffix)
            .ok_or_else(|| DiscoveryError::MissingIndex { path: path.clone() })?;
        indexed.push((index, path));
    }
    indexed.sort();

    let mut paths: Vec<PathBuf> = indexed.into_iter().map(|(_, p)| p).collect();
    if drop_last {
        paths.pop();
    }
    debug!("Found {} snapshots in {}", paths.len(), dir.display());
    Ok(paths)
}

/// Final snapshot of `subject` in every numbered generation directory.
pub fn evolution_paths(
    dir: &Path,
    subject: &str,
    suffix: &str,
    drop_last: bool,
) -> Result<Vec<PathBuf>, DiscoveryError> {
    let mut generations: Vec<(u64, PathBuf)> = list_dir(dir)?
        .into_iter()
        .filter(|p| p.is_dir())
        .filter_map(|p| {
            let generation = p.file_name()?.to_str()?.parse().ok()?;
            Some((generation, p))
        })
        .collect();
    generations.sort();

    let mut paths = Vec::with_capacity(generations.len());
    for (generation, gen_dir) in generations {
        let subject_dir = gen_dir.join(subject);
        if !subject_dir.is_dir() {
            warn!("Generation {generation}: no subject directory {}", subject_dir.display());
            continue;
        }
        match sequence_paths(&subject_dir, suffix, drop_last)?.pop() {
            Some(path) => paths.push(path),
            None => warn!("Generation {generation}: no snapshots in {}", subject_dir.display()),
        }
    }
    Ok(paths)
}

/// Discover the ordered frame files for a run.
pub fn discover(input: &Path, config: &PipelineConfig) -> Result<Vec<PathBuf>, DiscoveryError> {
    match &config.discovery {
        DiscoveryMode::Sequence => sequence_paths(input, &config.file_suffix, config.drop_last),
        DiscoveryMode::Evolution { subject } => {
            evolution_paths(input, subject, &config.file_suffix, config.drop_last)
        }
    }
}

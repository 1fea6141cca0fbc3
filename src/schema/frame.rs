//! Frame and attribute-column types for exported growth forms.

use serde::{Deserialize, Serialize};

/// Kind of per-vertex attribute column recognized in a `#form` header.
///
/// Columns are matched by name prefix; every other column is carried in the
/// file but never enters the embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    /// Membrane values (`mem_*`).
    Membrane,
    /// Signal values (`sig_*`).
    Signal,
    /// Mean-field values (`mu_*`).
    Mean,
}

impl AttributeKind {
    /// All recognized kinds, in header-matching order.
    pub const ALL: [AttributeKind; 3] = [
        AttributeKind::Membrane,
        AttributeKind::Signal,
        AttributeKind::Mean,
    ];

    /// Column-name prefix for this kind.
    pub fn prefix(self) -> &'static str {
        match self {
            AttributeKind::Membrane => "mem_",
            AttributeKind::Signal => "sig_",
            AttributeKind::Mean => "mu_",
        }
    }

    /// Classify a header column name, if it belongs to any of `kinds`.
    pub fn classify(name: &str, kinds: &[AttributeKind]) -> Option<Self> {
        kinds
            .iter()
            .copied()
            .find(|kind| name.starts_with(kind.prefix()))
    }
}

/// One attribute column selected from the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedColumn {
    /// Attribute kind of the column.
    pub kind: AttributeKind,
    /// Zero-based position among the header's column names (tag excluded).
    pub index: usize,
}

/// Fixed column-selection plan for one snapshot file.
///
/// Built once from the `#form` header and applied to every `c` line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnPlan {
    /// Selected columns in header order.
    pub columns: Vec<SelectedColumn>,
}

impl ColumnPlan {
    /// Build a plan from header column names (tag excluded).
    pub fn from_header<'a, I>(names: I, kinds: &[AttributeKind]) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let columns = names
            .into_iter()
            .enumerate()
            .filter_map(|(index, name)| {
                AttributeKind::classify(name, kinds).map(|kind| SelectedColumn { kind, index })
            })
            .collect();
        Self { columns }
    }

    /// Number of attribute dimensions produced per vertex.
    #[inline]
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Original column indices, in plan order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.columns.iter().map(|c| c.index)
    }
}

/// One parsed growth-form snapshot.
///
/// Immutable after parsing. `attributes[i]` belongs to `vertices[i]` and every
/// face index is below `vertices.len()`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    /// Vertex positions.
    pub vertices: Vec<[f32; 3]>,
    /// Triangle faces as zero-based vertex indices.
    pub faces: Vec<[u32; 3]>,
    /// Per-vertex attribute vectors, one entry per selected column.
    pub attributes: Vec<Vec<f64>>,
}

impl Frame {
    /// Number of vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of faces.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Width of the attribute vectors, or `None` for a frame without vertices.
    pub fn attribute_width(&self) -> Option<usize> {
        self.attributes.first().map(Vec::len)
    }
}

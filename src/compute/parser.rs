//! Parser for exported growth-form snapshot files.
//!
//! A snapshot is line-oriented text:
//!
//! ```text
//! #Exported from growth_forms
//! #form <col_1> <col_2> ... <col_k>
//! v <x> <y> <z>
//! f <i> <j> <k>            (1-based vertex indices)
//! c <a_1> ... <a_k>        (one per vertex, in vertex order)
//! ```
//!
//! Lines are dispatched on their first token. Unknown tags are skipped so
//! newer exporters can add records without breaking older readers.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::schema::{AttributeKind, ColumnPlan, Frame};

/// Required first line of every snapshot.
pub const PROVENANCE_MARKER: &str = "#Exported from growth_forms";

/// Tag opening the column header on line 2.
pub const HEADER_TAG: &str = "#form";

/// Errors raised while parsing a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("First line must be \"#Exported from growth_forms\"")]
    MissingProvenance,
    #[error("Line 2 must start with \"#form\"")]
    BadHeader,
    #[error("Line {line}: '{tag}' record is missing field {field}")]
    MissingField {
        line: usize,
        tag: &'static str,
        field: usize,
    },
    #[error("Line {line}: field {field} is not a number: {value:?}")]
    InvalidNumber {
        line: usize,
        field: usize,
        value: String,
    },
    #[error("Line {line}: field {field} is not finite: {value:?}")]
    NonFinite {
        line: usize,
        field: usize,
        value: String,
    },
    #[error("Line {line}: face indices are 1-based, found 0")]
    ZeroFaceIndex { line: usize },
    #[error("Line {line}: face index {index} out of range ({vertices} vertices)")]
    FaceIndexOutOfRange {
        line: usize,
        index: u32,
        vertices: usize,
    },
    #[error("{attributes} attribute rows for {vertices} vertices")]
    AttributeCountMismatch { attributes: usize, vertices: usize },
    #[error("{}: {source}", path.display())]
    InFile {
        path: PathBuf,
        #[source]
        source: Box<FormatError>,
    },
}

/// Parse a snapshot file, selecting every recognized attribute kind.
pub fn parse_frame<P: AsRef<Path>>(path: P) -> Result<Frame, FormatError> {
    parse_frame_file(path.as_ref(), &AttributeKind::ALL)
}

/// Parse a snapshot file, selecting only the given attribute kinds.
pub fn parse_frame_file(path: &Path, kinds: &[AttributeKind]) -> Result<Frame, FormatError> {
    let text = fs::read_to_string(path).map_err(|source| FormatError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_frame_with(&text, kinds).map_err(|e| FormatError::InFile {
        path: path.to_path_buf(),
        source: Box::new(e),
    })
}

/// Parse snapshot text, selecting every recognized attribute kind.
pub fn parse_frame_str(text: &str) -> Result<Frame, FormatError> {
    parse_frame_with(text, &AttributeKind::ALL)
}

/// Parse snapshot text, selecting only the given attribute kinds.
pub fn parse_frame_with(text: &str, kinds: &[AttributeKind]) -> Result<Frame, FormatError> {
    let mut lines = text.lines().map(str::trim_end);

    if lines.next() != Some(PROVENANCE_MARKER) {
        return Err(FormatError::MissingProvenance);
    }

    let mut header = lines.next().ok_or(FormatError::BadHeader)?.split_whitespace();
    if header.next() != Some(HEADER_TAG) {
        return Err(FormatError::BadHeader);
    }
    let plan = ColumnPlan::from_header(header, kinds);

    let mut frame = Frame::default();
    // Source line of each face; ranges are checked once every vertex is known.
    let mut face_lines = Vec::new();

    for (i, line) in lines.enumerate() {
        let line_no = i + 3;
        let mut tokens = line.split_whitespace();
        let Some(tag) = tokens.next() else {
            continue;
        };
        let fields: Vec<&str> = tokens.collect();

        match tag {
            "v" => {
                let x = finite_field(&fields, line_no, "v", 1)?;
                let y = finite_field(&fields, line_no, "v", 2)?;
                let z = finite_field(&fields, line_no, "v", 3)?;
                frame.vertices.push([x, y, z]);
            }
            "f" => {
                let mut face = [0u32; 3];
                for (k, slot) in face.iter_mut().enumerate() {
                    let index: u32 = field(&fields, line_no, "f", k + 1)?;
                    *slot = index
                        .checked_sub(1)
                        .ok_or(FormatError::ZeroFaceIndex { line: line_no })?;
                }
                face_lines.push(line_no);
                frame.faces.push(face);
            }
            "c" => {
                let row = plan
                    .indices()
                    .map(|idx| finite_field(&fields, line_no, "c", idx + 1))
                    .collect::<Result<Vec<f64>, _>>()?;
                frame.attributes.push(row);
            }
            _ => {}
        }
    }

    if frame.attributes.len() != frame.vertices.len() {
        return Err(FormatError::AttributeCountMismatch {
            attributes: frame.attributes.len(),
            vertices: frame.vertices.len(),
        });
    }

    let vertices = frame.vertices.len();
    for (face, &line) in frame.faces.iter().zip(&face_lines) {
        if let Some(&index) = face.iter().find(|&&v| v as usize >= vertices) {
            return Err(FormatError::FaceIndexOutOfRange {
                line,
                index: index + 1,
                vertices,
            });
        }
    }

    Ok(frame)
}

/// Parse 1-based field `n` of a record.
fn field<T: FromStr>(
    fields: &[&str],
    line: usize,
    tag: &'static str,
    n: usize,
) -> Result<T, FormatError> {
    let raw = fields
        .get(n - 1)
        .ok_or(FormatError::MissingField { line, tag, field: n })?;
    raw.parse().map_err(|_| FormatError::InvalidNumber {
        line,
        field: n,
        value: raw.to_string(),
    })
}

/// Parse 1-based float field `n`, rejecting NaN and infinities.
///
/// Literals that overflow the target type parse as infinite and are rejected
/// too.
fn finite_field<T>(
    fields: &[&str],
    line: usize,
    tag: &'static str,
    n: usize,
) -> Result<T, FormatError>
where
    T: FromStr + Copy + Into<f64>,
{
    let value: T = field(fields, line, tag, n)?;
    if value.into().is_finite() {
        Ok(value)
    } else {
        Err(FormatError::NonFinite {
            line,
            field: n,
            value: fields[n - 1].to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = "#Exported from growth_forms
#form foo mem_a sig_b x
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.5
f 1 2 3
c 9 0.25 0.5 7
c 9 0.75 1.5 7
c 9 -1 2.5 7
";

    #[test]
    fn test_parse_sample() {
        let frame = parse_frame_str(SAMPLE).unwrap();
        assert_eq!(frame.vertices.len(), 3);
        assert_eq!(frame.vertices[2], [0.0, 1.0, 0.5]);
        assert_eq!(frame.faces, vec![[0, 1, 2]]);
        assert_eq!(frame.attributes.len(), frame.vertices.len());
        // Only mem_a and sig_b survive column selection
        assert_eq!(frame.attributes[0], vec![0.25, 0.5]);
        assert_eq!(frame.attributes[2], vec![-1.0, 2.5]);
    }

    #[test]
    fn test_kind_filter() {
        let frame = parse_frame_with(SAMPLE, &[AttributeKind::Signal]).unwrap();
        assert_eq!(frame.attributes[1], vec![1.5]);
    }

    #[test]
    fn test_unknown_tags_and_blank_lines_ignored() {
        let text = "#Exported from growth_forms\r
#form mu_0\r
\r
vn 0 0 1\r
v 1 2 3\r
c 0.5\r
# trailing comment\r
";
        let frame = parse_frame_str(text).unwrap();
        assert_eq!(frame.vertices, vec![[1.0, 2.0, 3.0]]);
        assert_eq!(frame.attributes, vec![vec![0.5]]);
    }

    #[test]
    fn test_bad_provenance() {
        let text = SAMPLE.replacen("growth_forms", "elsewhere", 1);
        assert!(matches!(
            parse_frame_str(&text),
            Err(FormatError::MissingProvenance)
        ));
        assert!(matches!(
            parse_frame_str(""),
            Err(FormatError::MissingProvenance)
        ));
    }

    #[test]
    fn test_bad_header() {
        let text = SAMPLE.replacen("#form", "#coral", 1);
        assert!(matches!(parse_frame_str(&text), Err(FormatError::BadHeader)));
        assert!(matches!(
            parse_frame_str(PROVENANCE_MARKER),
            Err(FormatError::BadHeader)
        ));
    }

    #[test]
    fn test_invalid_number() {
        let text = SAMPLE.replacen("v 1.0 0.0 0.0", "v 1.0 abc 0.0", 1);
        match parse_frame_str(&text) {
            Err(FormatError::InvalidNumber { line, field, value }) => {
                assert_eq!(line, 4);
                assert_eq!(field, 2);
                assert_eq!(value, "abc");
            }
            other => panic!("expected InvalidNumber, got {other:?}"),
        }
    }

    #[test]
    fn test_non_finite_rejected() {
        let cases = [
            ("v 1.0 0.0 0.0", "v 1.0 nan 0.0", 4, 2),
            ("v 1.0 0.0 0.0", "v inf 0.0 0.0", 4, 1),
            ("v 1.0 0.0 0.0", "v 1.0 0.0 1e400", 4, 3),
            // Finite as f64 but overflows a vertex coordinate
            ("v 1.0 0.0 0.0", "v 1e39 0.0 0.0", 4, 1),
            ("c 9 0.75 1.5 7", "c 9 nan 1.5 7", 8, 2),
            ("c 9 0.75 1.5 7", "c 9 0.75 -inf 7", 8, 3),
            ("c 9 0.75 1.5 7", "c 9 1e400 1.5 7", 8, 2),
        ];
        for (from, to, expected_line, expected_field) in cases {
            let text = SAMPLE.replacen(from, to, 1);
            match parse_frame_str(&text) {
                Err(FormatError::NonFinite { line, field, .. }) => {
                    assert_eq!(line, expected_line, "{to}");
                    assert_eq!(field, expected_field, "{to}");
                }
                other => panic!("{to}: expected NonFinite, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_non_finite_in_unselected_column_ignored() {
        let text = SAMPLE.replacen("c 9 0.75 1.5 7", "c nan 0.75 1.5 inf", 1);
        let frame = parse_frame_str(&text).unwrap();
        assert_eq!(frame.attributes[1], vec![0.75, 1.5]);
    }

    #[test]
    fn test_face_extra_indices_ignored() {
        let text = SAMPLE.replacen("f 1 2 3", "f 1 2 3 4", 1);
        let frame = parse_frame_str(&text).unwrap();
        assert_eq!(frame.faces, vec![[0, 1, 2]]);
    }

    #[test]
    fn test_missing_attribute_field() {
        let text = SAMPLE.replacen("c 9 0.25 0.5 7", "c 9 0.25", 1);
        assert!(matches!(
            parse_frame_str(&text),
            Err(FormatError::MissingField {
                tag: "c",
                field: 3,
                ..
            })
        ));
    }

    #[test]
    fn test_face_range_checked() {
        let text = SAMPLE.replacen("f 1 2 3", "f 1 2 4", 1);
        assert!(matches!(
            parse_frame_str(&text),
            Err(FormatError::FaceIndexOutOfRange {
                index: 4,
                vertices: 3,
                ..
            })
        ));
        let text = SAMPLE.replacen("f 1 2 3", "f 0 1 2", 1);
        assert!(matches!(
            parse_frame_str(&text),
            Err(FormatError::ZeroFaceIndex { line: 6 })
        ));
    }

    #[test]
    fn test_attribute_count_mismatch() {
        let text = SAMPLE.replacen("c 9 -1 2.5 7\n", "", 1);
        assert!(matches!(
            parse_frame_str(&text),
            Err(FormatError::AttributeCountMismatch {
                attributes: 2,
                vertices: 3
            })
        ));
    }

    #[test]
    fn test_parse_file_reports_path() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"not a snapshot\n").unwrap();

        let err = parse_frame(file.path()).unwrap_err();
        assert!(matches!(err, FormatError::InFile { .. }));
        assert!(err.to_string().contains(&file.path().display().to_string()));

        let missing = parse_frame(file.path().with_extension("missing")).unwrap_err();
        assert!(matches!(missing, FormatError::Io { .. }));
    }
}

//! Rule file parsing and validation
//!
//! One rule per line, `source<TAB>target`. Blank lines are skipped; any
//! other line must have exactly two tab-separated fields. A single bad line
//! rejects the whole file.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tsvmap_store::{MAX_SOURCE_CHARS, MAX_TARGET_CHARS};

const EXCERPT_CHARS: usize = 60;

/// One parsed rule with its 1-based line number
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleEntry {
    pub source: String,
    pub target: String,
    pub line: usize,
}

/// Why a rule file was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatError {
    /// 1-based line, absent for whole-file problems such as encoding
    pub line: Option<usize>,
    pub kind: FormatErrorKind,
}

/// Categories of format errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatErrorKind {
    NotUtf8,
    ColumnCount { found: usize, excerpt: String },
    EmptySource,
    SourceTooLong { chars: usize },
    TargetTooLong { chars: usize },
    DuplicateKey { source: String, first_line: usize },
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(line) = self.line {
            write!(f, "line {}: ", line)?;
        }
        match &self.kind {
            FormatErrorKind::NotUtf8 => write!(f, "file is not valid UTF-8"),
            FormatErrorKind::ColumnCount { found, excerpt } => write!(
                f,
                "expected 2 tab-separated columns, found {} in {:?}",
                found, excerpt
            ),
            FormatErrorKind::EmptySource => write!(f, "source column is empty"),
            FormatErrorKind::SourceTooLong { chars } => write!(
                f,
                "source is {} characters long (max {})",
                chars, MAX_SOURCE_CHARS
            ),
            FormatErrorKind::TargetTooLong { chars } => write!(
                f,
                "target is {} characters long (max {})",
                chars, MAX_TARGET_CHARS
            ),
            FormatErrorKind::DuplicateKey { source, first_line } => write!(
                f,
                "duplicate source {:?} (first defined on line {})",
                source, first_line
            ),
        }
    }
}

impl std::error::Error for FormatError {}

impl FormatError {
    fn at(line: usize, kind: FormatErrorKind) -> Self {
        Self {
            line: Some(line),
            kind,
        }
    }
}

/// A validated rule file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleFile {
    entries: Vec<RuleEntry>,
}

impl RuleFile {
    /// Parse raw file bytes
    pub fn parse(data: &[u8]) -> Result<Self, FormatError> {
        let text = std::str::from_utf8(data).map_err(|_| FormatError {
            line: None,
            kind: FormatErrorKind::NotUtf8,
        })?;
        Self::parse_str(text)
    }

    /// Parse already-decoded text
    pub fn parse_str(text: &str) -> Result<Self, FormatError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let mut entries = Vec::new();
        let mut seen: HashMap<&str, usize> = HashMap::new();

        for (idx, raw) in text.split('\n').enumerate() {
            let line_no = idx + 1;
            let line = raw.strip_suffix('\r').unwrap_or(raw);
            if line.trim().is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() != 2 {
                return Err(FormatError::at(
                    line_no,
                    FormatErrorKind::ColumnCount {
                        found: fields.len(),
                        excerpt: excerpt(line),
                    },
                ));
            }
            let (source, target) = (fields[0], fields[1]);

            if source.is_empty() {
                return Err(FormatError::at(line_no, FormatErrorKind::EmptySource));
            }
            let source_chars = source.chars().count();
            if source_chars > MAX_SOURCE_CHARS {
                return Err(FormatError::at(
                    line_no,
                    FormatErrorKind::SourceTooLong {
                        chars: source_chars,
                    },
                ));
            }
            let target_chars = target.chars().count();
            if target_chars > MAX_TARGET_CHARS {
                return Err(FormatError::at(
                    line_no,
                    FormatErrorKind::TargetTooLong {
                        chars: target_chars,
                    },
                ));
            }

            if let Some(first_line) = seen.insert(source, line_no) {
                return Err(FormatError::at(
                    line_no,
                    FormatErrorKind::DuplicateKey {
                        source: source.to_string(),
                        first_line,
                    },
                ));
            }

            entries.push(RuleEntry {
                source: source.to_string(),
                target: target.to_string(),
                line: line_no,
            });
        }

        Ok(Self { entries })
    }

    /// Parsed rules in file order
    pub fn entries(&self) -> &[RuleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rules keyed by source text
    pub fn as_map(&self) -> HashMap<&str, &str> {
        self.entries
            .iter()
            .map(|e| (e.source.as_str(), e.target.as_str()))
            .collect()
    }
}

fn excerpt(line: &str) -> String {
    if line.chars().count() <= EXCERPT_CHARS {
        line.to_string()
    } else {
        let mut s: String = line.chars().take(EXCERPT_CHARS).collect();
        s.push('…');
        s
    }
}

/// File name recorded as provenance on each rule
pub fn provenance(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_basic_file() {
        let file = RuleFile::parse(b"hello\thi\nbye\tlater\n").unwrap();
        assert_eq!(file.len(), 2);
        assert_eq!(file.entries()[0].source, "hello");
        assert_eq!(file.entries()[1].target, "later");
        assert_eq!(file.entries()[1].line, 2);
    }

    #[test]
    fn test_blank_lines_crlf_and_bom() {
        let file = RuleFile::parse("\u{feff}a\t1\r\n\r\n   \nb\t2".as_bytes()).unwrap();
        let map = file.as_map();
        assert_eq!(map.len(), 2);
        assert_eq!(map["a"], "1");
        assert_eq!(map["b"], "2");
    }

    #[test]
    fn test_fields_are_not_trimmed() {
        let file = RuleFile::parse(b" padded \t x ").unwrap();
        assert_eq!(file.entries()[0].source, " padded ");
        assert_eq!(file.entries()[0].target, " x ");
    }

    #[test]
    fn test_empty_target_is_allowed() {
        let file = RuleFile::parse(b"remove-me\t\n").unwrap();
        assert_eq!(file.entries()[0].target, "");
    }

    #[test]
    fn test_wrong_column_count_reports_line() {
        let err = RuleFile::parse(b"a\t1\nb\t2\textra\n").unwrap_err();
        assert_eq!(err.line, Some(2));
        assert!(matches!(err.kind, FormatErrorKind::ColumnCount { found: 3, .. }));

        let err = RuleFile::parse(b"no tab here\n").unwrap_err();
        assert!(matches!(err.kind, FormatErrorKind::ColumnCount { found: 1, .. }));
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let err = RuleFile::parse(b"a\t1\nb\t2\na\t3\n").unwrap_err();
        assert_eq!(err.line, Some(3));
        assert_eq!(
            err.kind,
            FormatErrorKind::DuplicateKey {
                source: "a".to_string(),
                first_line: 1
            }
        );
    }

    #[test]
    fn test_empty_source_rejected() {
        let err = RuleFile::parse(b"\tvalue\n").unwrap_err();
        assert_eq!(err.kind, FormatErrorKind::EmptySource);
    }

    #[test]
    fn test_length_bounds() {
        let long = "s".repeat(MAX_SOURCE_CHARS + 1);
        let err = RuleFile::parse_str(&format!("{}\tt", long)).unwrap_err();
        assert!(matches!(err.kind, FormatErrorKind::SourceTooLong { .. }));

        let long = "t".repeat(MAX_TARGET_CHARS + 1);
        let err = RuleFile::parse_str(&format!("s\t{}", long)).unwrap_err();
        assert!(matches!(err.kind, FormatErrorKind::TargetTooLong { .. }));
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let err = RuleFile::parse(&[0x61, 0x09, 0xff, 0xfe]).unwrap_err();
        assert_eq!(err.line, None);
        assert_eq!(err.kind, FormatErrorKind::NotUtf8);
    }

    #[test]
    fn test_empty_file_is_valid() {
        assert!(RuleFile::parse(b"").unwrap().is_empty());
        assert!(RuleFile::parse(b"\n\n").unwrap().is_empty());
    }

    #[test]
    fn test_provenance_is_file_name() {
        let path = PathBuf::from("/rules/greetings.tsv");
        assert_eq!(provenance(&path), "greetings.tsv");
        assert_eq!(provenance(Path::new("/")), "");
    }
}

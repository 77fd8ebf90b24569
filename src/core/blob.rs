//! Multiline blob codec.
//!
//! Some secrets hold a whole `.env` file: several `KEY=value` lines packed
//! into one value. The vault hands these back either with real newlines or
//! with the two-character sequence `\n`; a [`Blob`] remembers which, so an
//! untouched blob re-encodes to exactly the bytes it was parsed from.
//!
//! Nesting stops at one level. An inner value that itself looks like a blob
//! is kept as a literal string.

use thiserror::Error;

use crate::core::domain::Entry;
use crate::core::validation::is_blob_key;

/// Why a value was not classified as a blob.
///
/// Never fatal: callers treat the value as a plain string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlobParseError {
    #[error("value has a single line")]
    SingleLine,

    #[error("line {0} is not a KEY=value assignment")]
    MalformedLine(usize),

    #[error("duplicate key in blob: {0}")]
    DuplicateKey(String),

    #[error("blob needs at least two entries, found {0}")]
    TooFewEntries(usize),
}

/// Line separator used inside a blob value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Separator {
    /// A real `\n` character.
    #[default]
    Newline,
    /// The escaped two-character sequence backslash, `n`.
    Escaped,
}

impl Separator {
    /// The separator as it appears in the raw value.
    pub fn token(self) -> &'static str {
        match self {
            Separator::Newline => "\n",
            Separator::Escaped => "\\n",
        }
    }

    fn detect(raw: &str) -> Option<Self> {
        if raw.contains('\n') {
            Some(Separator::Newline)
        } else if raw.contains("\\n") {
            Some(Separator::Escaped)
        } else {
            None
        }
    }
}

/// Layout of an encoded blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobFormat {
    pub separator: Separator,
    /// Whether the last line carries a terminator.
    pub trailing: bool,
}

impl Default for BlobFormat {
    fn default() -> Self {
        Self {
            separator: Separator::Newline,
            trailing: true,
        }
    }
}

/// An ordered sequence of inner entries plus the format they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    entries: Vec<Entry>,
    format: BlobFormat,
}

impl Blob {
    /// Build a blob from entries in the given format.
    pub fn from_entries(entries: Vec<Entry>, format: BlobFormat) -> Self {
        Self { entries, format }
    }

    /// Parse a value already known to be blob-shaped.
    ///
    /// Blank lines and lines that are not `KEY=value` assignments are
    /// skipped rather than rejected; use [`classify`] to decide whether a
    /// value is a blob in the first place. Keys are trimmed, values are
    /// kept verbatim.
    pub fn parse(raw: &str) -> Self {
        let separator = Separator::detect(raw).unwrap_or_default();
        let (lines, trailing) = split_lines(raw, separator);

        let entries = lines
            .into_iter()
            .filter_map(|line| {
                let (key, value) = line.split_once('=')?;
                let key = key.trim();
                is_blob_key(key).then(|| Entry::new(key, value))
            })
            .collect();

        Self {
            entries,
            format: BlobFormat {
                separator,
                trailing,
            },
        }
    }

    /// Inner entries in order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Consume the blob, returning its entries.
    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }

    /// Format the blob will be encoded in.
    pub fn format(&self) -> BlobFormat {
        self.format
    }

    /// Look up an inner value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.key() == key)
            .map(|e| e.value())
    }

    /// Number of inner entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no inner entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encode back into a single secret value.
    pub fn encode(&self) -> String {
        encode_with(&self.entries, self.format)
    }
}

/// Classify a raw value.
///
/// A value is a blob when it spans two or more lines, every non-blank line
/// is a `KEY=value` assignment with an identifier-like key, and keys are
/// unique.
///
/// # Errors
///
/// Returns `BlobParseError` describing why the value is a plain string.
pub fn classify(raw: &str) -> Result<Blob, BlobParseError> {
    let separator = Separator::detect(raw).ok_or(BlobParseError::SingleLine)?;
    let (lines, trailing) = split_lines(raw, separator);

    let mut entries: Vec<Entry> = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let (key, value) = line
            .split_once('=')
            .filter(|(key, _)| is_blob_key(key))
            .ok_or(BlobParseError::MalformedLine(i + 1))?;
        if entries.iter().any(|e| e.key() == key) {
            return Err(BlobParseError::DuplicateKey(key.to_string()));
        }
        entries.push(Entry::new(key, value));
    }

    if entries.len() < 2 {
        return Err(BlobParseError::TooFewEntries(entries.len()));
    }

    Ok(Blob {
        entries,
        format: BlobFormat {
            separator,
            trailing,
        },
    })
}

/// Whether a value is a multiline blob.
pub fn is_blob(raw: &str) -> bool {
    classify(raw).is_ok()
}

/// Parse a blob-shaped value into its inner entries.
pub fn parse(raw: &str) -> Vec<Entry> {
    Blob::parse(raw).into_entries()
}

/// Serialize entries in canonical form.
///
/// One `KEY=value` line per entry, joined by `\n`, with a single trailing
/// terminator. An empty list serializes to an empty string.
pub fn serialize(entries: &[Entry]) -> String {
    encode_with(entries, BlobFormat::default())
}

fn encode_with(entries: &[Entry], format: BlobFormat) -> String {
    let sep = format.separator.token();
    let mut out = entries
        .iter()
        .map(|e| format!("{}={}", e.key(), e.value()))
        .collect::<Vec<_>>()
        .join(sep);

    if format.trailing && !entries.is_empty() {
        out.push_str(sep);
    }

    out
}

fn split_lines(raw: &str, separator: Separator) -> (Vec<&str>, bool) {
    let sep = separator.token();
    let (body, trailing) = match raw.strip_suffix(sep) {
        Some(body) => (body, true),
        None => (raw, false),
    };

    if body.is_empty() {
        return (Vec::new(), trailing);
    }

    (body.split(sep).collect(), trailing)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(pairs: &[(&str, &str)]) -> Vec<Entry> {
        pairs.iter().map(|(k, v)| Entry::new(*k, *v)).collect()
    }

    #[test]
    fn test_classify_newline_blob() {
        let blob = classify("host=localhost\nport=5432\n").unwrap();

        assert_eq!(blob.len(), 2);
        assert_eq!(blob.get("host"), Some("localhost"));
        assert_eq!(blob.get("port"), Some("5432"));
        assert_eq!(blob.format(), BlobFormat::default());
    }

    #[test]
    fn test_classify_escaped_blob() {
        let blob = classify("host=localhost\\nport=5432").unwrap();

        assert_eq!(blob.len(), 2);
        assert_eq!(
            blob.format(),
            BlobFormat {
                separator: Separator::Escaped,
                trailing: false
            }
        );
    }

    #[test]
    fn test_classify_rejects_plain_values() {
        assert_eq!(
            classify("postgres://localhost"),
            Err(BlobParseError::SingleLine)
        );
        assert_eq!(
            classify("host=localhost\n"),
            Err(BlobParseError::TooFewEntries(1))
        );
        assert_eq!(
            classify("line one\nline two"),
            Err(BlobParseError::MalformedLine(1))
        );
        assert_eq!(
            classify("# comment\nA=1\nB=2"),
            Err(BlobParseError::MalformedLine(1))
        );
        assert_eq!(
            classify("A=1\nA=2"),
            Err(BlobParseError::DuplicateKey("A".to_string()))
        );
    }

    #[test]
    fn test_classify_skips_blank_lines() {
        let blob = classify("A=1\n\nB=2").unwrap();
        assert_eq!(blob.len(), 2);
    }

    #[test]
    fn test_values_keep_equals_signs() {
        let blob = classify("TOKEN=abc==\nURL=a=b").unwrap();

        assert_eq!(blob.get("TOKEN"), Some("abc=="));
        assert_eq!(blob.get("URL"), Some("a=b"));
    }

    #[test]
    fn test_inner_values_are_not_reparsed() {
        let blob = classify("OUTER=x\\ny=z\nOTHER=1").unwrap();

        assert_eq!(blob.format().separator, Separator::Newline);
        assert_eq!(blob.get("OUTER"), Some("x\\ny=z"));
    }

    #[test]
    fn test_parse_is_lenient() {
        let parsed = parse("A=1\nnot an assignment\n B =2\n\n");

        assert_eq!(parsed, entries(&[("A", "1"), ("B", "2")]));
    }

    #[test]
    fn test_serialize_canonical() {
        let out = serialize(&entries(&[("host", "localhost"), ("port", "5432")]));
        assert_eq!(out, "host=localhost\nport=5432\n");
        assert_eq!(serialize(&[]), "");
    }

    #[test]
    fn test_encode_preserves_format() {
        for raw in [
            "host=localhost\nport=5432",
            "host=localhost\nport=5432\n",
            "host=localhost\\nport=5432",
            "host=localhost\\nport=5432\\n",
        ] {
            assert_eq!(classify(raw).unwrap().encode(), raw);
        }
    }
}

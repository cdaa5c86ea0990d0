//! Composite index keys

use std::fmt;

const PART_TERMINATOR: char = '\u{1}';
const MAX_MARKER: char = char::MAX;

/// One component of a composite key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyPart {
    Str(String),
    /// Sorts after every string; closes a range over all keys sharing a prefix
    Max,
}

/// Composite key ordered component-wise, shorter prefixes first.
///
/// [`IndexKey::encode`] maps keys onto strings whose byte order equals key
/// order, so a range can be answered by any ordered string store.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexKey(Vec<KeyPart>);

impl IndexKey {
    pub fn from_strs<S: AsRef<str>>(parts: &[S]) -> Self {
        Self(
            parts
                .iter()
                .map(|part| KeyPart::Str(part.as_ref().to_string()))
                .collect(),
        )
    }

    #[must_use]
    pub fn push_str(mut self, part: impl Into<String>) -> Self {
        self.0.push(KeyPart::Str(part.into()));
        self
    }

    #[must_use]
    pub fn push_max(mut self) -> Self {
        self.0.push(KeyPart::Max);
        self
    }

    /// Order-preserving string encoding.
    ///
    /// Control characters `\u{0}` and `\u{1}` are dropped from string parts.
    pub fn encode(&self) -> String {
        let mut encoded = String::new();
        for part in &self.0 {
            match part {
                KeyPart::Str(value) => {
                    encoded.extend(value.chars().filter(|c| *c > PART_TERMINATOR));
                    encoded.push(PART_TERMINATOR);
                }
                KeyPart::Max => encoded.push(MAX_MARKER),
            }
        }
        encoded
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match part {
                KeyPart::Str(value) => write!(f, "{value:?}")?,
                KeyPart::Max => f.write_str("MAX")?,
            }
        }
        f.write_str("]")
    }
}

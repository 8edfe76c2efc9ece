use std::fmt;
use std::str::FromStr;

use crate::error::FrameError;

/// Model name used as the outer element of every frame, e.g. `li820`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrameTag(String);

impl FrameTag {
    /// Validate and wrap a tag name.
    ///
    /// Tags are limited to ASCII alphanumerics, `-`, `_` and `.`, which keeps
    /// the markers free of `<`, `>` and whitespace.
    pub fn new(tag: impl Into<String>) -> Result<Self, FrameError> {
        let tag = tag.into();
        let valid = !tag.is_empty()
            && tag
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'));
        if valid {
            Ok(Self(tag))
        } else {
            Err(FrameError::InvalidTag(tag))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Opening and closing markers for this tag.
    pub fn markers(&self) -> Markers {
        Markers {
            start: format!("<{}>", self.0).into_bytes(),
            end: format!("</{}>", self.0).into_bytes(),
        }
    }
}

impl FromStr for FrameTag {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for FrameTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Byte markers delimiting one frame: `<tag>` and `</tag>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    pub start: Vec<u8>,
    pub end: Vec<u8>,
}

/// Last occurrence of `needle` in `haystack`.
pub(crate) fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

/// First occurrence of `needle` in `haystack`.
pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

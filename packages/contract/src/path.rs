//! Procedure addresses: an ordered sequence of plain segment strings.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Errors related to parsing path literals.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// A segment between two separators was empty.
    #[error("empty segment at position {position} in '{literal}'")]
    EmptySegment { literal: String, position: usize },
}

/// The address of a procedure inside a router tree.
///
/// Segments are compared exactly. The core never normalizes case,
/// whitespace or separators; `Path::parse` rejects what it cannot split
/// cleanly instead of guessing.
#[derive(
    Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Path {
    pub segments: Vec<String>,
}

impl Path {
    /// The empty path (the root of a router).
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a path from segments, taken verbatim.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Path {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a `/`-separated literal.
    ///
    /// The empty string is the root path. Leading, trailing or doubled
    /// separators produce an empty segment and are rejected.
    ///
    /// ```rust
    /// use contour_contract::Path;
    ///
    /// let path = Path::parse("posts/getPost").unwrap();
    /// assert_eq!(path.len(), 2);
    /// assert!(Path::parse("posts//getPost").is_err());
    /// ```
    pub fn parse(literal: &str) -> Result<Self, PathError> {
        if literal.is_empty() {
            return Ok(Path::root());
        }

        let mut segments = Vec::new();
        for (position, segment) in literal.split('/').enumerate() {
            if segment.is_empty() {
                return Err(PathError::EmptySegment {
                    literal: literal.to_string(),
                    position,
                });
            }
            segments.push(segment.to_string());
        }
        Ok(Path { segments })
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(String::as_str)
    }

    pub fn first(&self) -> Option<&str> {
        self.segments.first().map(String::as_str)
    }

    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Join this path with another.
    #[must_use]
    pub fn join(&self, other: &Path) -> Path {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Path { segments }
    }

    /// This path extended by a single segment.
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Path {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Path { segments }
    }

    pub fn has_prefix(&self, prefix: &Path) -> bool {
        prefix.segments.len() <= self.segments.len()
            && prefix.segments == self.segments[..prefix.segments.len()]
    }

    /// Strip a prefix from this path, or `None` if it does not match.
    #[must_use]
    pub fn strip_prefix(&self, prefix: &Path) -> Option<Path> {
        if self.has_prefix(prefix) {
            Some(Path {
                segments: self.segments[prefix.segments.len()..].to_vec(),
            })
        } else {
            None
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

impl std::ops::Index<usize> for Path {
    type Output = str;

    fn index(&self, i: usize) -> &Self::Output {
        self.segments[i].as_str()
    }
}

impl<S: Into<String>> FromIterator<S> for Path {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Path::new(iter)
    }
}

impl From<Vec<String>> for Path {
    fn from(segments: Vec<String>) -> Self {
        Path { segments }
    }
}

impl From<&[&str]> for Path {
    fn from(segments: &[&str]) -> Self {
        Path::new(segments.iter().copied())
    }
}

/// Macro for writing path literals.
///
/// # Example
///
/// ```rust
/// use contour_contract::path;
///
/// let p = path!("posts/getPost");
/// assert_eq!(p.len(), 2);
/// ```
#[macro_export]
macro_rules! path {
    ($s:expr) => {
        $crate::Path::parse($s).expect("invalid path literal")
    };
}

//! Parsed property paths (`marker.size[2]`).

use std::fmt;
use std::str::FromStr;

use crate::error::{EditError, EditResult};

/// Keys that must never be written or deleted.
pub const BLOCKED_KEYS: [&str; 3] = ["__proto__", "constructor", "prototype"];

/// One step of a [`KeyPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    /// Object property.
    Key(String),
    /// Array position.
    Index(usize),
}

/// A property path parsed once from its dotted/bracket string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyPath {
    segments: Vec<PathSegment>,
}

impl KeyPath {
    /// Parses `raw` into segments.
    ///
    /// Dots separate keys, `[n]` suffixes select array positions:
    /// `xaxis.range[0]` is `Key(xaxis), Key(range), Index(0)`. Indexes must
    /// fit in a `u32`.
    pub fn parse(raw: &str) -> EditResult<Self> {
        let invalid = || EditError::InvalidPath {
            path: raw.to_owned(),
        };
        if raw.is_empty() {
            return Err(invalid());
        }

        let mut segments = Vec::new();
        for part in raw.split('.') {
            let (name, mut rest) = part.find('[').map_or((part, ""), |pos| part.split_at(pos));
            if name.is_empty() && rest.is_empty() {
                return Err(invalid());
            }
            if !name.is_empty() {
                segments.push(PathSegment::Key(name.to_owned()));
            }
            while let Some(body) = rest.strip_prefix('[') {
                let close = body.find(']').ok_or_else(invalid)?;
                // Indexes are bounded to u32.
                let index = body[..close]
                    .parse::<u32>()
                    .ok()
                    .and_then(|index| usize::try_from(index).ok())
                    .ok_or_else(invalid)?;
                segments.push(PathSegment::Index(index));
                rest = &body[close + 1..];
            }
            if !rest.is_empty() {
                return Err(invalid());
            }
        }
        Ok(Self { segments })
    }

    /// A single-key path, used when a key must not be split on dots.
    #[must_use]
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            segments: vec![PathSegment::Key(key.into())],
        }
    }

    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Returns `true` if any key segment is in [`BLOCKED_KEYS`].
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.segments
            .iter()
            .any(|segment| matches!(segment, PathSegment::Key(key) if is_blocked_key(key)))
    }
}

/// Returns `true` for keys that must never be written or deleted.
#[must_use]
pub fn is_blocked_key(key: &str) -> bool {
    BLOCKED_KEYS.contains(&key)
}

impl FromStr for KeyPath {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if i == 0 => write!(f, "{key}")?,
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

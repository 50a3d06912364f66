use std::fmt;

/// A normalized url path: an ordered list of non-empty segments.
///
/// Construction never fails; malformed input is normalized instead of
/// rejected. After construction the segment list contains no `.` and no
/// unresolved `..`: a `..` pops the previous segment when one exists and is
/// dropped otherwise, so a path can never escape above its root. Callers
/// that need a non-root result must check [`UrlPath::name`] themselves.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UrlPath {
    segments: Vec<String>,
}

/// Name reported for the empty path.
pub const ROOT_NAME: &str = "/";

impl UrlPath {
    /// The empty path
    pub fn root() -> Self {
        UrlPath { segments: Vec::new() }
    }

    /// Parse a raw path string, splitting on `/` and normalizing.
    ///
    /// Empty segments and `.` are dropped; `..` pops the previous segment
    /// if present and is otherwise discarded.
    pub fn parse(raw: &str) -> Self {
        let mut segments: Vec<String> = Vec::new();
        for part in raw.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    // No escape above root: a leading ".." is dropped
                    segments.pop();
                }
                other => segments.push(other.to_string()),
            }
        }
        UrlPath { segments }
    }

    /// Append a segment or sub-path, renormalizing the result.
    pub fn join(&self, raw: &str) -> Self {
        let mut joined = self.clone();
        for part in raw.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    joined.segments.pop();
                }
                other => joined.segments.push(other.to_string()),
            }
        }
        joined
    }

    /// The path with the last segment dropped; root stays root.
    pub fn parent(&self) -> Self {
        let mut parent = self.clone();
        parent.segments.pop();
        parent
    }

    /// The last segment, or [`ROOT_NAME`] for the empty path.
    pub fn name(&self) -> &str {
        self.segments.last().map_or(ROOT_NAME, String::as_str)
    }

    /// The substring of [`UrlPath::name`] after its last `.`, if any.
    pub fn extension(&self) -> Option<&str> {
        let name = self.segments.last()?;
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
            _ => None,
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Canonical rendering: `/`-joined segments with a leading slash.
    pub fn raw(&self) -> String {
        if self.segments.is_empty() {
            "/".to_string()
        } else {
            format!("/{}", self.segments.join("/"))
        }
    }
}

impl fmt::Display for UrlPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw())
    }
}

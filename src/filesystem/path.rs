use derive_more::{Deref, Display};

/// Splits `path` on `/`, dropping the empty segments produced by leading,
/// trailing or repeated separators. `"/"` and `""` both yield no segments.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

/// A tokenized path, kept together with the text it was parsed from so errors
/// can point at what the caller wrote.
#[derive(Debug, Display, Deref, Clone, PartialEq, Eq)]
#[display("{raw}")]
pub struct Segments<'a> {
    raw: &'a str,
    #[deref]
    segments: Vec<&'a str>,
}

impl<'a> Segments<'a> {
    pub fn parse(raw: &'a str) -> Self {
        Self {
            raw,
            segments: split_path(raw),
        }
    }

    pub fn raw(&self) -> &'a str {
        self.raw
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// All segments except the final one.
    pub fn parent(&self) -> &[&'a str] {
        match self.segments.split_last() {
            Some((_, parent)) => parent,
            None => &[],
        }
    }

    pub fn last(&self) -> Option<&'a str> {
        self.segments.last().copied()
    }

    /// Canonical absolute form of the first `len` segments.
    pub fn prefix(&self, len: usize) -> String {
        format!("/{}", self.segments[..len.min(self.segments.len())].join("/"))
    }

    pub fn canonical(&self) -> String {
        self.prefix(self.segments.len())
    }

    /// First segment that can never name an entry, if any.
    pub fn first_invalid(&self) -> Option<&'a str> {
        self.segments
            .iter()
            .copied()
            .find(|segment| matches!(*segment, "." | ".."))
    }
}

use std::path::Path;

/// Extensions exported by default. Matching is case-sensitive.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "h", "cpp", "ush", "usf", "ini", "md", "hlsl", "glsl", "cs", "inl",
];

/// Decides whether a path is an export candidate.
///
/// A candidate carries exactly one extension and that extension is on the
/// allow-list, so generated variants such as `Foo.gen.cpp` are rejected.
/// The filesystem is never consulted; directories are answered like any
/// other path.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    extensions: Vec<String>,
}

impl Default for PathMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()))
    }
}

impl PathMatcher {
    /// Build a matcher from an allow-list; a leading dot on an entry is ignored
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let extensions = extensions
            .into_iter()
            .map(Into::into)
            .map(|ext: String| ext.trim_start_matches('.').to_string())
            .filter(|ext| !ext.is_empty())
            .collect();

        Self { extensions }
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Names that are not valid UTF-8 are matched on their raw bytes.
    pub fn matches(&self, path: &Path) -> bool {
        let Some(name) = path.file_name() else {
            return false;
        };

        let mut suffixes = suffixes(name.as_encoded_bytes());
        match (suffixes.next(), suffixes.next()) {
            (Some(ext), None) => self.extensions.iter().any(|allowed| allowed.as_bytes() == ext),
            _ => false,
        }
    }
}

/// Dot-delimited suffixes of a file name, leading dots excluded.
/// A name ending in a dot has none.
fn suffixes(name: &[u8]) -> impl Iterator<Item = &[u8]> {
    let stem_and_suffixes = if name.ends_with(b".") {
        &name[name.len()..]
    } else {
        let start = name.iter().position(|&b| b != b'.').unwrap_or(name.len());
        &name[start..]
    };

    stem_and_suffixes.split(|&b| b == b'.').skip(1)
}

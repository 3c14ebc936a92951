//! Cache keys.

use std::fmt;

/// Identifies one logical upstream resource, e.g. `en-US:movie:550`.
///
/// Parts are joined with `:`; a `:` inside a part is escaped so that distinct
/// part lists never produce the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn from_parts<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = parts
            .into_iter()
            .map(|p| escape(p.as_ref()))
            .collect::<Vec<_>>()
            .join(":");
        Self(joined)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn escape(part: &str) -> String {
    part.replace('%', "%25").replace(':', "%3A")
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

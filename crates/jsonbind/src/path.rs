//! Structural addresses within a JSON document.

use std::{fmt, sync::Arc};

/// The structural location of the value currently being parsed, e.g.
/// `.foo[3].bar`. Object member descent appends `.name`, array element
/// descent appends `[n]`, the document root is the empty path.
///
/// A path is never mutated in place; every descent derives a new path and
/// the parent remains valid. Cloning is cheap, the rendered form is shared.
///
/// Member names are spliced into the rendered form verbatim, so matching on
/// paths is textual; a key that itself contains `.` or `[` is
/// indistinguishable from deeper descent.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ParsePath(Arc<str>);

impl ParsePath {
    /// The empty path addressing the document root.
    #[must_use]
    pub fn root() -> Self {
        Self(Arc::from(""))
    }

    /// Derives the path of the object member `name` under `self`.
    #[must_use]
    pub fn member(&self, name: &str) -> Self {
        let mut s = String::with_capacity(self.0.len() + name.len() + 1);
        s.push_str(&self.0);
        s.push('.');
        s.push_str(name);
        Self(s.into())
    }

    /// Derives the path of array element `index` under `self`.
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        use fmt::Write as _;

        let mut s = String::with_capacity(self.0.len() + 8);
        s.push_str(&self.0);
        let _ = write!(s, "[{index}]");
        Self(s.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for ParsePath {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for ParsePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ParsePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParsePath({:?})", &*self.0)
    }
}

impl AsRef<str> for ParsePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

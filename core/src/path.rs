//! Typed path segments.
//!
//! A `Path` carries two type-level tags: whether it is rooted (`Absolute`)
//! or not (`Relative`), and whether it ends in a `Directory` or a `File`.
//! Only directory paths can be extended, so appending after a file segment
//! is rejected by the compiler:
//!
//! ```compile_fail
//! use fetch_core::path::Path;
//!
//! let bad = Path::root().file("feed.json").directory("more");
//! ```
//!
//! Relative paths can be joined onto any directory path; absolute paths can
//! only start a chain:
//!
//! ```
//! use fetch_core::path::Path;
//!
//! let posts = Path::relative().directory("posts");
//! let path = Path::root().directory("api").join(posts).file("index.json");
//! assert_eq!(path.to_string(), "/api/posts/index.json");
//! ```

use std::fmt;
use std::marker::PhantomData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Absolute;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relative;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Directory;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct File;

/// Rooting tag of a [`Path`].
pub trait Root: sealed::Sealed {
    const ABSOLUTE: bool;
}

impl Root for Absolute {
    const ABSOLUTE: bool = true;
}

impl Root for Relative {
    const ABSOLUTE: bool = false;
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Absolute {}
    impl Sealed for super::Relative {}
}

/// Ordered, immutable sequence of path segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path<R, K> {
    segments: Vec<String>,
    _tags: PhantomData<(R, K)>,
}

impl Path<Absolute, Directory> {
    /// The absolute root, rendered as `/`.
    pub fn root() -> Self {
        Self::from_segments(Vec::new())
    }
}

impl Path<Relative, Directory> {
    /// An empty relative path, ready to be extended and joined.
    pub fn relative() -> Self {
        Self::from_segments(Vec::new())
    }
}

impl<R, K> Path<R, K> {
    fn from_segments(segments: Vec<String>) -> Self {
        Self {
            segments,
            _tags: PhantomData,
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl<R> Path<R, Directory> {
    pub fn directory(mut self, name: impl Into<String>) -> Path<R, Directory> {
        self.segments.push(name.into());
        Path::from_segments(self.segments)
    }

    pub fn file(mut self, name: impl Into<String>) -> Path<R, File> {
        self.segments.push(name.into());
        Path::from_segments(self.segments)
    }

    /// Append a relative path, keeping this path's rooting and taking the
    /// other path's kind.
    pub fn join<K>(mut self, other: Path<Relative, K>) -> Path<R, K> {
        self.segments.extend(other.segments);
        Path::from_segments(self.segments)
    }
}

impl<R: Root, K> Path<R, K> {
    pub fn is_absolute(&self) -> bool {
        R::ABSOLUTE
    }
}

impl<R: Root, K> fmt::Display for Path<R, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if R::ABSOLUTE {
            f.write_str("/")?;
        }
        f.write_str(&self.segments.join("/"))
    }
}

impl<R: Root, K> From<Path<R, K>> for String {
    fn from(path: Path<R, K>) -> Self {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_paths_render_with_leading_slash() {
        let path = Path::root().directory("posts").file("1");
        assert_eq!(path.to_string(), "/posts/1");
        assert!(path.is_absolute());
    }

    #[test]
    fn relative_paths_render_without_leading_slash() {
        let path = Path::relative().directory("posts").directory("drafts");
        assert_eq!(path.to_string(), "posts/drafts");
        assert!(!path.is_absolute());
    }

    #[test]
    fn root_renders_as_slash() {
        assert_eq!(Path::root().to_string(), "/");
        assert_eq!(Path::relative().to_string(), "");
    }

    #[test]
    fn join_preserves_segment_order() {
        let tail = Path::relative().directory("b").file("c.json");
        let path = Path::root().directory("a").join(tail);
        assert_eq!(path.segments(), ["a", "b", "c.json"]);
        assert_eq!(String::from(path), "/a/b/c.json");
    }

    #[test]
    fn join_is_associative() {
        let a = Path::relative().directory("a");
        let b = Path::relative().directory("b");
        let c = Path::relative().file("c");
        let left = Path::root().join(a.clone()).join(b.clone()).join(c.clone());
        let right = Path::root().join(a.join(b.join(c)));
        assert_eq!(left, right);
    }
}

//! Input path confinement.
//!
//! Every input is resolved against an allowed root directory. The check runs
//! twice: first lexically, before anything touches the disk, and then on the
//! canonical path for inputs that exist, which catches symlinks pointing out
//! of the root.

use crate::error::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// An input path confirmed to lie inside the allowed root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Normalized absolute path
    pub path: PathBuf,
    /// Path relative to the allowed root
    pub relative: PathBuf,
}

impl ResolvedPath {
    /// File stem, used to name outputs.
    pub fn stem(&self) -> Option<&str> {
        self.path.file_stem().and_then(|s| s.to_str())
    }
}

/// Resolves input paths and rejects anything outside the allowed root.
///
/// # Example
///
/// ```
/// use docport::security::PathResolver;
/// use docport::ErrorKind;
///
/// let resolver = PathResolver::new("/srv/docs");
/// let resolved = resolver.resolve("guide/intro.md").unwrap();
/// assert!(resolved.path.ends_with("guide/intro.md"));
///
/// let err = resolver.resolve("../../etc/passwd").unwrap_err();
/// assert_eq!(err.kind(), ErrorKind::PathTraversal);
/// ```
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// Create a resolver for an allowed root; relative roots are taken from
    /// the current working directory.
    pub fn new(allowed_root: impl AsRef<Path>) -> Self {
        let root = allowed_root.as_ref();
        let absolute = if root.is_absolute() {
            root.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(root))
                .unwrap_or_else(|_| root.to_path_buf())
        };
        Self {
            root: normalize_lexically(&absolute).unwrap_or(absolute),
        }
    }

    /// The allowed root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an input path against the root.
    pub fn resolve(&self, input: impl AsRef<Path>) -> Result<ResolvedPath> {
        let input = input.as_ref();
        if input.as_os_str().is_empty() {
            return Err(Error::InvalidArgument("empty input path".into()));
        }
        if input.to_string_lossy().contains('\0') {
            return Err(Error::InvalidArgument("input path contains a NUL byte".into()));
        }

        let traversal = || Error::PathTraversal {
            path: input.to_path_buf(),
            root: self.root.clone(),
        };

        let path = normalize_lexically(&self.root.join(input)).ok_or_else(traversal)?;
        let relative = path
            .strip_prefix(&self.root)
            .map_err(|_| traversal())?
            .to_path_buf();
        if relative.as_os_str().is_empty() {
            return Err(Error::InvalidArgument(format!(
                "input path is the root itself: {}",
                input.display()
            )));
        }

        // Lexically safe. Symlinks can still point elsewhere.
        if path.symlink_metadata().is_ok() {
            let canonical = path.canonicalize()?;
            let canonical_root = self.root.canonicalize().unwrap_or_else(|_| self.root.clone());
            if !canonical.starts_with(&canonical_root) {
                log::warn!(
                    "Rejected {}: resolves to {} outside {}",
                    input.display(),
                    canonical.display(),
                    canonical_root.display()
                );
                return Err(traversal());
            }
        }

        Ok(ResolvedPath { path, relative })
    }

    /// Confine a glob pattern to the root without touching the disk.
    ///
    /// Returns the pattern joined to the root with `.` and `..` removed. A
    /// `..` after a wildcard component is rejected outright, since the
    /// wildcard may match at any depth.
    pub fn confine_pattern(&self, pattern: &str) -> Result<PathBuf> {
        let traversal = || Error::PathTraversal {
            path: PathBuf::from(pattern),
            root: self.root.clone(),
        };

        let mut wildcard = false;
        for component in Path::new(pattern).components() {
            match component {
                Component::ParentDir if wildcard => return Err(traversal()),
                Component::Normal(name) if crate::is_glob(&name.to_string_lossy()) => wildcard = true,
                _ => {}
            }
        }

        let full = normalize_lexically(&self.root.join(pattern)).ok_or_else(traversal)?;
        if !full.starts_with(&self.root) {
            log::warn!("Rejected pattern '{}': leaves {}", pattern, self.root.display());
            return Err(traversal());
        }
        Ok(full)
    }
}

/// Remove `.` and `..` components without touching the disk.
///
/// Returns `None` when `..` would climb above the filesystem root.
pub fn normalize_lexically(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    let mut depth = 0usize;
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return None;
                }
                out.pop();
                depth -= 1;
            }
            Component::Normal(name) => {
                out.push(name);
                depth += 1;
            }
        }
    }
    Some(out)
}

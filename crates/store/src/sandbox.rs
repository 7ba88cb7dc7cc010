//! Confinement of client paths to the shared root.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use crate::StoreError;

/// Resolves client-relative paths to absolute paths under a fixed root.
///
/// Resolution is two-staged:
/// 1. Lexical: `.` and `..` are folded without touching the filesystem, and
///    any `..` that would climb above the root is rejected outright.
/// 2. Physical: the deepest existing ancestor of the result is
///    canonicalized, so a symlink inside the root that points outside it is
///    rejected as well. The returned path is the canonical one.
#[derive(Debug, Clone)]
pub struct PathSandbox {
    root: PathBuf,
}

impl PathSandbox {
    /// Creates the root directory if needed and pins its canonical form.
    pub fn new(root: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(root)?;
        let root = std::fs::canonicalize(root)?;
        Ok(Self { root })
    }

    /// Canonical absolute path of the shared root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `relative` against the root.
    ///
    /// Leading and trailing separators are stripped; the empty path is the
    /// root itself. Violations are rejected, never clamped.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, StoreError> {
        let escape = || StoreError::PathEscape(relative.to_string());

        let trimmed = relative.trim_matches(['/', '\\']);
        if trimmed.contains('\0') {
            return Err(escape());
        }

        let mut normalized = PathBuf::new();
        for component in Path::new(trimmed).components() {
            match component {
                Component::Normal(part) => normalized.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    if !normalized.pop() {
                        return Err(escape());
                    }
                }
                Component::RootDir | Component::Prefix(_) => return Err(escape()),
            }
        }

        let candidate = if normalized.as_os_str().is_empty() {
            self.root.clone()
        } else {
            self.root.join(&normalized)
        };
        let resolved = self.physical(&candidate, relative);
        if let Err(StoreError::PathEscape(_)) = &resolved {
            tracing::warn!(path = %relative, "rejected path outside shared root");
        }
        resolved
    }

    /// Canonicalizes the deepest existing ancestor of `candidate`, checks it
    /// against the root and re-appends the missing tail.
    ///
    /// The result names the physical file, so two spellings of the same file
    /// through an in-root symlink resolve (and lock) identically.
    fn physical(&self, candidate: &Path, relative: &str) -> Result<PathBuf, StoreError> {
        let mut tail: Vec<&OsStr> = Vec::new();
        for ancestor in candidate.ancestors() {
            match std::fs::canonicalize(ancestor) {
                Ok(real) if real.starts_with(&self.root) => {
                    let mut resolved = real;
                    resolved.extend(tail.iter().rev());
                    return Ok(resolved);
                }
                Ok(_) => return Err(StoreError::PathEscape(relative.to_string())),
                Err(_) => {
                    // A link that cannot be resolved (dangling or looping) is
                    // never followed; a later create() would write through it.
                    if let Ok(target) = std::fs::read_link(ancestor) {
                        let target = match ancestor.parent() {
                            Some(dir) => dir.join(target),
                            None => target,
                        };
                        return Err(if self.lexically_inside(&target) {
                            StoreError::NotFound(relative.to_string())
                        } else {
                            StoreError::PathEscape(relative.to_string())
                        });
                    }
                    if let Some(name) = ancestor.file_name() {
                        tail.push(name);
                    }
                }
            }
        }
        Err(StoreError::PathEscape(relative.to_string()))
    }

    fn lexically_inside(&self, path: &Path) -> bool {
        let mut folded = PathBuf::new();
        for component in path.components() {
            match component {
                Component::ParentDir => {
                    folded.pop();
                }
                Component::CurDir => {}
                other => folded.push(other),
            }
        }
        folded.starts_with(&self.root)
    }
}

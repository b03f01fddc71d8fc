//! Iterative directory traversal.
//!
//! An explicit stack of (path, depth) pairs instead of call-stack
//! recursion, so directory nesting never bounds the walk. The iterator is
//! finite and one-shot; each popped entry is classified with a single
//! metadata query. Listing failures are isolated into error items and the
//! walk continues.

use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;

use thiserror::Error;
use tracing::trace;

/// A per-entry traversal failure. The walk goes on past it.
#[derive(Debug, Error)]
#[error("walk error at {path}: {source}")]
pub struct WalkError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Depth-bounded, stack-based directory walker yielding file paths.
///
/// The root is at depth 0 and its direct entries at depth 1. Children of a
/// directory are expanded only while `max_depth == 0` (unlimited) or
/// `current_depth < max_depth`; with `recurse` off, only the root itself
/// expands. Symbolic links are skipped.
pub struct DirWalker {
    stack: Vec<(PathBuf, u32)>,
    pending_errors: VecDeque<WalkError>,
    max_depth: u32,
    recurse: bool,
}

impl DirWalker {
    pub fn new(root: impl Into<PathBuf>, max_depth: u32, recurse: bool) -> Self {
        Self {
            stack: vec![(root.into(), 0)],
            pending_errors: VecDeque::new(),
            max_depth,
            recurse,
        }
    }

    fn may_expand(&self, depth: u32) -> bool {
        if depth == 0 {
            return true;
        }
        self.recurse && (self.max_depth == 0 || depth < self.max_depth)
    }
}

impl Iterator for DirWalker {
    type Item = Result<PathBuf, WalkError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(error) = self.pending_errors.pop_front() {
            return Some(Err(error));
        }

        while let Some((path, depth)) = self.stack.pop() {
            let metadata = match fs::symlink_metadata(&path) {
                Ok(metadata) => metadata,
                Err(source) => return Some(Err(WalkError { path, source })),
            };

            if metadata.is_file() {
                trace!(path = %path.display(), depth, "Walker yields file");
                return Some(Ok(path));
            }

            if metadata.is_dir() && self.may_expand(depth) {
                let entries = match fs::read_dir(&path) {
                    Ok(entries) => entries,
                    Err(source) => return Some(Err(WalkError { path, source })),
                };
                for entry in entries {
                    match entry {
                        Ok(entry) => self.stack.push((entry.path(), depth + 1)),
                        Err(source) => self.pending_errors.push_back(WalkError {
                            path: path.clone(),
                            source,
                        }),
                    }
                }
                if let Some(error) = self.pending_errors.pop_front() {
                    return Some(Err(error));
                }
            }
            // Symlinks and special files fall through silently.
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::path::Path;

    /// Five nested levels with one file each:
    /// root/f0, root/d1/f1, root/d1/d2/f2, ...
    fn build_tree(root: &Path, levels: u32) {
        let mut dir = root.to_path_buf();
        File::create(dir.join("f0")).unwrap();
        for level in 1..=levels {
            dir = dir.join(format!("d{level}"));
            fs::create_dir(&dir).unwrap();
            File::create(dir.join(format!("f{level}"))).unwrap();
        }
    }

    fn file_names(walker: DirWalker) -> Vec<String> {
        let mut names: Vec<String> = walker
            .map(|item| {
                item.unwrap()
                    .file_name()
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        names.sort();
        names
    }

    #[test]
    fn depth_bound_is_enforced() {
        let dir = tempfile::tempdir().unwrap();
        build_tree(dir.path(), 5);

        let names = file_names(DirWalker::new(dir.path(), 2, true));
        assert_eq!(names, vec!["f0", "f1"]);
    }

    #[test]
    fn zero_means_unlimited() {
        let dir = tempfile::tempdir().unwrap();
        build_tree(dir.path(), 5);

        let names = file_names(DirWalker::new(dir.path(), 0, true));
        assert_eq!(names, vec!["f0", "f1", "f2", "f3", "f4", "f5"]);
    }

    #[test]
    fn non_recursive_stays_in_root() {
        let dir = tempfile::tempdir().unwrap();
        build_tree(dir.path(), 3);

        let names = file_names(DirWalker::new(dir.path(), 0, false));
        assert_eq!(names, vec!["f0"]);
    }

    #[test]
    fn file_root_is_yielded() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("single");
        File::create(&file).unwrap();

        let mut walker = DirWalker::new(&file, 0, true);
        assert_eq!(walker.next().unwrap().unwrap(), file);
        assert!(walker.next().is_none());
    }

    #[test]
    fn missing_root_is_an_error_item() {
        let mut walker = DirWalker::new("/definitely/not/here", 0, true);
        assert!(walker.next().unwrap().is_err());
        assert!(walker.next().is_none());
    }

    #[test]
    fn symlinks_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("real")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("link")).unwrap();

        let names = file_names(DirWalker::new(dir.path(), 0, true));
        assert_eq!(names, vec!["real"]);
    }
}

//! Candidate file discovery.
//!
//! Directories are walked recursively in file-name order; explicitly named
//! files are taken as given. Walking never reads file contents.

use crate::config::{ConfigError, WalkSection};
use crate::error::FileError;
use glob::Pattern;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::{DirEntry, WalkDir};

pub struct Walker {
    extensions: Vec<String>,
    skip_dirs: Vec<String>,
    exclude: Vec<Pattern>,
}

impl Walker {
    pub fn new(section: &WalkSection) -> Result<Self, ConfigError> {
        let exclude = section
            .exclude
            .iter()
            .map(|p| {
                Pattern::new(p)
                    .map_err(|source| ConfigError::Pattern { pattern: p.clone(), source })
            })

            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            extensions: section.extensions.clone(),
            skip_dirs: section.skip_dirs.clone(),
            exclude,
        })
    }

    fn has_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|want| want == ext))
    }

    fn excluded(&self, root: &Path, path: &Path) -> bool {
        let relative = path.strip_prefix(root).unwrap_or(path);
        self.exclude.iter().any(|p| p.matches_path(relative))
    }

    fn skipped_dir(&self, root: &Path, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        name.starts_with('.')
            || self.skip_dirs.iter().any(|d| *d == name)
            || self.excluded(root, entry.path())
    }

    /// Expand `roots` into candidate files, in walk order. Unusable roots and
    /// unreadable entries come back as errors in place.
    pub fn collect(&self, roots: &[PathBuf]) -> Vec<Result<PathBuf, FileError>> {
        let mut found = Vec::new();
        for root in roots {
            if root.is_dir() {
                self.walk_dir(root, &mut found);
            } else if root.is_file() {
                if self.has_extension(root) {
                    found.push(Ok(root.clone()));
                } else {
                    let expected: Vec<String> =
                        self.extensions.iter().map(|e| format!(".{}", e)).collect();
                    found.push(Err(FileError::NotSource {
                        path: root.clone(),
                        expected: expected.join("/"),
                    }));
                }
            } else {
                found.push(Err(FileError::Missing { path: root.clone() }));
            }
        }
        debug!(roots = roots.len(), files = found.len(), "walk finished");
        found
    }

    fn walk_dir(&self, root: &Path, found: &mut Vec<Result<PathBuf, FileError>>) {
        let entries = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.skipped_dir(root, e));
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(source) => {
                    let path = source
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| root.to_path_buf());
                    found.push(Err(FileError::Walk { path, source }));
                    continue;
                }
            };
            if !entry.file_type().is_file() || !self.has_extension(entry.path()) {
                continue;
            }
            if self.excluded(root, entry.path()) {
                trace!(path = %entry.path().display(), "excluded");
                continue;
            }
            found.push(Ok(entry.into_path()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "package p\n").unwrap();
    }

    fn names(root: &Path, found: Vec<Result<PathBuf, FileError>>) -> Vec<String> {
        found
            .into_iter()
            .map(|r| r.unwrap().strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn walks_sorted_and_skips_defaults() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let files = [
            "b.go",
            "a.go",
            "notes.txt",
            "sub/c.go",
            "vendor/v.go",
            ".hidden/h.go",
            "testdata/t.go",
        ];
        for rel in files {
            touch(root, rel);
        }
        let walker = Walker::new(&WalkSection::default()).unwrap();
        assert_eq!(
            names(root, walker.collect(&[root.to_path_buf()])),
            vec!["a.go", "b.go", "sub/c.go"]
        );
    }

    #[test]
    fn exclude_globs_are_relative_to_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        for rel in ["main.go", "gen/api.go", "pkg/x_gen.go", "pkg/x.go"] {
            touch(root, rel);
        }
        let section = WalkSection {
            exclude: vec!["gen".to_string(), "**/*_gen.go".to_string()],
            ..WalkSection::default()
        };
        let walker = Walker::new(&section).unwrap();
        assert_eq!(
            names(root, walker.collect(&[root.to_path_buf()])),
            vec!["main.go", "pkg/x.go"]
        );
    }

    #[test]
    fn explicit_roots() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "vendor/keep.go");
        touch(root, "readme.md");
        let walker = Walker::new(&WalkSection::default()).unwrap();
        let roots = [root.join("vendor/keep.go"), root.join("readme.md"), root.join("gone.go")];
        let found = walker.collect(&roots);

        assert_eq!(found.len(), 3);
        assert!(found[0].is_ok());
        assert!(matches!(found[1], Err(FileError::NotSource { .. })));
        assert!(matches!(found[2], Err(FileError::Missing { .. })));
    }
}

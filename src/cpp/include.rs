use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// The capability the preprocessor uses to resolve `#include` references
/// to source text. Injected by the driver so tests can supply headers
/// without touching the filesystem.
pub trait IncludeSearcher {
    /// Invoked for `#include "foo.h"`. Searches relative to the
    /// requesting file first, then falls back to the angled search.
    /// Returns the resolved path and the file contents.
    fn include_quote(
        &self,
        requesting_file: &str,
        header_path: &str,
    ) -> io::Result<(PathBuf, String)>;

    /// Invoked for `#include <foo.h>`. Searches the configured system
    /// header directories in priority order.
    fn include_angled(
        &self,
        requesting_file: &str,
        header_path: &str,
    ) -> io::Result<(PathBuf, String)>;
}

/// Filesystem searcher over a `;`-separated list of system header
/// directories.
pub struct StandardIncludeSearcher {
    system_dirs: Vec<PathBuf>,
}

impl StandardIncludeSearcher {
    pub fn new(include_paths: &str) -> Self {
        let system_dirs = include_paths
            .split(';')
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .collect();
        Self { system_dirs }
    }
}

fn read_header(path: &Path) -> io::Result<(PathBuf, String)> {
    let contents = fs::read_to_string(path)?;
    Ok((path.to_path_buf(), contents))
}

impl IncludeSearcher for StandardIncludeSearcher {
    fn include_quote(
        &self,
        requesting_file: &str,
        header_path: &str,
    ) -> io::Result<(PathBuf, String)> {
        let dir = Path::new(requesting_file)
            .parent()
            .unwrap_or_else(|| Path::new("."));
        let candidate = dir.join(header_path);
        if candidate.exists() {
            return read_header(&candidate);
        }
        self.include_angled(requesting_file, header_path)
    }

    fn include_angled(
        &self,
        _requesting_file: &str,
        header_path: &str,
    ) -> io::Result<(PathBuf, String)> {
        for dir in &self.system_dirs {
            let candidate = dir.join(header_path);
            if candidate.exists() {
                return read_header(&candidate);
            }
        }
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("header {header_path} not found"),
        ))
    }
}

//! Source discovery: walk a tree, skip non-source directories, keep allow-listed extensions.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Directory names never descended into.
pub const EXCLUDED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    "dist",
    "build",
    "coverage",
    "target",
    ".next",
    "out",
    ".cache",
    "__pycache__",
    "vendor",
];

const FRONTEND_EXTENSIONS: &[&str] = &[
    "js", "jsx", "ts", "tsx", "vue", "svelte", "css", "scss", "html",
];

const GENERAL_EXTENSIONS: &[&str] = &[
    "rs", "py", "go", "java", "kt", "swift", "c", "h", "cpp", "hpp", "cs", "rb", "php", "js",
    "jsx", "ts", "tsx",
];

/// Which file extensions count as source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionSet {
    /// Web frontend sources.
    Frontend,
    /// General-purpose programming languages.
    General,
    /// Explicit list, without leading dots.
    Custom(Vec<String>),
}

impl ExtensionSet {
    /// Case-insensitive membership test. A leading dot in custom entries is ignored.
    pub fn allows(&self, extension: &str) -> bool {
        let ext = extension.to_ascii_lowercase();
        match self {
            ExtensionSet::Frontend => FRONTEND_EXTENSIONS.contains(&ext.as_str()),
            ExtensionSet::General => GENERAL_EXTENSIONS.contains(&ext.as_str()),
            ExtensionSet::Custom(list) => list
                .iter()
                .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(&ext)),
        }
    }
}

/// A discovered source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    pub absolute_path: PathBuf,
    /// Path relative to the scan root, `/`-separated.
    pub relative_name: String,
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("scan root does not exist: {0}")]
    NotFound(PathBuf),
    #[error("scan root is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("failed to resolve scan root {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn is_excluded_dir(entry: &DirEntry) -> bool {
    // The root itself is never excluded, even if it is called e.g. `build`.
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|name| EXCLUDED_DIRS.contains(&name))
            .unwrap_or(false)
}

fn relative_name(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Recursively collect source files under `root`, depth first, in enumeration order.
///
/// Unreadable subentries are skipped with a warning; only a bad root is an error.
pub fn scan(root: &Path, extensions: &ExtensionSet) -> Result<Vec<FileDescriptor>, ScanError> {
    let metadata = match std::fs::metadata(root) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ScanError::NotFound(root.to_path_buf()))
        }
        Err(source) => {
            return Err(ScanError::Io {
                path: root.to_path_buf(),
                source,
            })
        }
    };
    if !metadata.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }

    info!(root = %root.display(), ?extensions, "Scanning source tree");
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !is_excluded_dir(e));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(
                    path = ?e.path(),
                    error = %e,
                    "Skipping unreadable entry during scan"
                );
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let allowed = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| extensions.allows(ext))
            .unwrap_or(false);
        if !allowed {
            continue;
        }
        let relative_name = relative_name(root, path);
        debug!(file = %relative_name, "Discovered source file");
        files.push(FileDescriptor {
            absolute_path: path.to_path_buf(),
            relative_name,
        });
    }

    info!(count = files.len(), "Scan complete");
    Ok(files)
}

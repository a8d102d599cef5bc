//! Filesystem provider
//!
//! The planner only needs four operations from a filesystem: list, wildcard
//! enumeration, status, and open-with-seek. They are behind a trait so a
//! remote store can slot in; the bundled implementation walks the local
//! filesystem.

use jsplit_core::{PartitionOptions, Result, SplitError};
use std::fs::File;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;
use walkdir::WalkDir;

/// Seekable byte stream
pub trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

/// Status of one enumerated path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStatus {
    /// Resolved path
    pub path: Arc<str>,
    /// Whether the path is a directory
    pub is_directory: bool,
    /// File length in bytes (0 for directories)
    pub len: u64,
}

/// Filesystem operations the planner consumes
pub trait FileProvider: Send + Sync {
    /// Enumerate files under `root`, optionally recursing into
    /// subdirectories
    fn list_files(&self, root: &str, recursive: bool) -> Result<Vec<FileStatus>>;

    /// Enumerate files matching a pattern containing `*` or `?`
    fn glob(&self, pattern: &str) -> Result<Vec<FileStatus>>;

    /// Status of a single path
    fn file_status(&self, path: &str) -> Result<FileStatus>;

    /// Open a path for positioned reads
    fn open(&self, path: &str) -> Result<Box<dyn ReadSeek + Send>>;
}

/// Local filesystem provider with an optional base path for relative inputs
#[derive(Debug, Clone, Default)]
pub struct LocalFs {
    base: Option<PathBuf>,
}

impl LocalFs {
    /// Provider rooted at the process working directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider resolving relative paths against `base`
    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self {
            base: Some(base.into()),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        match (&self.base, candidate.is_absolute()) {
            (Some(base), false) => base.join(candidate),
            _ => candidate.to_path_buf(),
        }
    }

    fn status_of(path: &Path) -> Result<FileStatus> {
        let meta = std::fs::metadata(path)?;
        Ok(FileStatus {
            path: Arc::from(path.to_string_lossy().as_ref()),
            is_directory: meta.is_dir(),
            len: if meta.is_dir() { 0 } else { meta.len() },
        })
    }
}

impl FileProvider for LocalFs {
    fn list_files(&self, root: &str, recursive: bool) -> Result<Vec<FileStatus>> {
        let root = self.resolve(root);
        let max_depth = if recursive { usize::MAX } else { 1 };
        let mut files = Vec::new();
        for entry in WalkDir::new(&root).max_depth(max_depth) {
            let entry = entry.map_err(|err| {
                SplitError::InvalidPath(format!("{}: {err}", root.display()))
            })?;
            if entry.file_type().is_file() {
                files.push(Self::status_of(entry.path())?);
            }
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    fn glob(&self, pattern: &str) -> Result<Vec<FileStatus>> {
        let resolved = self.resolve(pattern);
        let resolved = resolved.to_string_lossy().into_owned();
        let walk_root = literal_prefix_dir(&resolved);
        if !walk_root.exists() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in WalkDir::new(&walk_root) {
            let entry = entry.map_err(|err| {
                SplitError::InvalidPath(format!("{}: {err}", walk_root.display()))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let text = entry.path().to_string_lossy();
            if wildcard_match(&resolved, &text) {
                files.push(Self::status_of(entry.path())?);
            }
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    fn file_status(&self, path: &str) -> Result<FileStatus> {
        Self::status_of(&self.resolve(path))
    }

    fn open(&self, path: &str) -> Result<Box<dyn ReadSeek + Send>> {
        let file = File::open(self.resolve(path))?;
        Ok(Box::new(file))
    }
}

/// Longest directory prefix of `pattern` free of wildcard characters
fn literal_prefix_dir(pattern: &str) -> PathBuf {
    let mut prefix = PathBuf::new();
    for component in Path::new(pattern).components() {
        let text = component.as_os_str().to_string_lossy();
        if text.contains('*') || text.contains('?') {
            break;
        }
        prefix.push(component);
    }
    if prefix.as_os_str().is_empty() {
        PathBuf::from(".")
    } else if prefix == Path::new(pattern) {
        // No wildcard at all: match against the parent directory.
        prefix.parent().map(Path::to_path_buf).unwrap_or(prefix)
    } else {
        prefix
    }
}

/// Match `text` against a pattern where `*` matches any run of characters
/// and `?` matches exactly one.
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    let (mut p, mut t) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some((p, t));
            p += 1;
        } else if let Some((star_p, star_t)) = star {
            // Backtrack: let the last '*' absorb one more character.
            p = star_p + 1;
            t = star_t + 1;
            star = Some((star_p, star_t + 1));
        } else {
            return false;
        }
    }
    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }
    p == pattern.len()
}

/// Enumerate the input files selected by `options`.
///
/// A missing path or an unmatched pattern is not an error: partitioning an
/// empty selection legitimately yields no partitions.
pub fn enumerate_inputs(
    provider: &dyn FileProvider,
    options: &PartitionOptions,
) -> Result<Vec<FileStatus>> {
    let path = options.filepath.as_str();
    if path.is_empty() {
        return Err(SplitError::InvalidOptions(
            "no input path configured".to_string(),
        ));
    }

    let mut files = if path.contains('*') || path.contains('?') {
        provider.glob(path)?
    } else {
        match provider.file_status(path) {
            Ok(status) if status.is_directory => provider.list_files(path, options.recursive)?,
            Ok(status) => vec![status],
            Err(SplitError::Stream(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!(path, "input path does not exist");
                Vec::new()
            }
            Err(err) => return Err(err),
        }
    };

    if let Some(filter) = &options.path_glob_filter {
        files.retain(|status| wildcard_match(filter, file_name(&status.path)));
    }
    files.retain(|status| !status.is_directory);
    Ok(files)
}

fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

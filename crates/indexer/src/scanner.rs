use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Directories never worth indexing: VCS state, IDE metadata, build
/// output, and dependency trees.
pub const IGNORED_SCOPES: &[&str] = &[
    // VCS / tooling
    ".git",
    ".hg",
    ".svn",
    ".idea",
    ".vs",
    ".vscode",
    // caches / builds
    ".cache",
    "bin",
    "obj",
    "build",
    "dist",
    "coverage",
    "target",
    "node_modules",
    "__pycache__",
    ".venv",
    // data / vendor
    "packages",
    "vendor",
    "third_party",
    "third-party",
];

const MAX_FILE_SIZE_BYTES: u64 = 1_048_576; // 1 MB

/// Scanner for finding indexable source files under a root.
///
/// The walk is gitignore-aware; the extension allow-list comes from the
/// chunker registry so the scanner and the pipeline always agree on what
/// is indexable.
pub struct FileScanner {
    root: PathBuf,
    allowed_extensions: Vec<String>,
}

impl FileScanner {
    pub fn new(root: impl AsRef<Path>, allowed_extensions: Vec<String>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            allowed_extensions,
        }
    }

    /// Scan the root for source files (.gitignore aware).
    pub fn scan(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();

        let root = self.root.clone();
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true);
        builder.filter_entry(move |entry| !is_ignored_scope(entry.path(), &root));

        for result in builder.build() {
            match result {
                Ok(entry) => {
                    let Some(file_type) = entry.file_type() else {
                        continue;
                    };
                    if !file_type.is_file() {
                        continue;
                    }

                    let path = entry.path();
                    if let Ok(meta) = entry.metadata() {
                        if meta.len() > MAX_FILE_SIZE_BYTES {
                            log::debug!(
                                "Skipping large file {} ({} bytes > {MAX_FILE_SIZE_BYTES})",
                                path.display(),
                                meta.len()
                            );
                            continue;
                        }
                    }

                    if !self.is_allowed(path) {
                        continue;
                    }

                    files.push(path.to_path_buf());
                }
                Err(e) => log::warn!("Failed to read entry: {e}"),
            }
        }

        log::info!("Found {} indexable files", files.len());
        files
    }

    fn is_allowed(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
            return false;
        };
        let ext = ext.to_lowercase();
        self.allowed_extensions.iter().any(|allowed| allowed == &ext)
    }
}

fn is_ignored_scope(path: &Path, root: &Path) -> bool {
    if let Ok(relative) = path.strip_prefix(root) {
        for component in relative.components() {
            if let std::path::Component::Normal(name) = component {
                let lowered = name.to_string_lossy().to_lowercase();
                if IGNORED_SCOPES.iter().any(|ignored| ignored == &lowered) {
                    return true;
                }
            }
        }
    }
    false
}

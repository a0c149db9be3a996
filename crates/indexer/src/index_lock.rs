use crate::error::{IndexerError, Result};
use fs2::FileExt;
use std::path::{Path, PathBuf};

const LOCK_FILE_NAME: &str = "librarian.lock";

/// Advisory lock guarding the caches and store against a second process.
///
/// Multiple processes sharing the same persistent state is unsupported;
/// this makes the constraint explicit instead of silently corrupting.
pub struct IndexLock {
    file: std::fs::File,
    path: PathBuf,
}

impl IndexLock {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for IndexLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

fn open_lock_file(path: &Path) -> Result<std::fs::File> {
    std::fs::OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(path)
        .map_err(|err| IndexerError::Other(format!("open lock {}: {err}", path.display())))
}

/// Block until the exclusive lock under `state_dir` is acquired.
pub async fn acquire_index_lock(state_dir: &Path) -> Result<IndexLock> {
    let path = state_dir.join(LOCK_FILE_NAME);
    tokio::fs::create_dir_all(state_dir).await?;

    let lock_path = path.clone();
    tokio::task::spawn_blocking(move || -> Result<IndexLock> {
        let file = open_lock_file(&lock_path)?;
        file.lock_exclusive().map_err(|err| {
            IndexerError::Other(format!("acquire lock {}: {err}", lock_path.display()))
        })?;
        Ok(IndexLock {
            file,
            path: lock_path,
        })
    })
    .await
    .map_err(|err| IndexerError::Other(format!("join lock task: {err}")))?
}

/// Try to take the exclusive lock without blocking; `None` means another
/// process holds it.
pub fn try_acquire_index_lock(state_dir: &Path) -> Result<Option<IndexLock>> {
    std::fs::create_dir_all(state_dir)?;
    let path = state_dir.join(LOCK_FILE_NAME);
    let file = open_lock_file(&path)?;

    match file.try_lock_exclusive() {
        Ok(()) => Ok(Some(IndexLock { file, path })),
        Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
        Err(err) => Err(IndexerError::Other(format!(
            "acquire lock {}: {err}",
            path.display()
        ))),
    }
}

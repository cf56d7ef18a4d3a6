use crate::Cache;
use async_std::fs;
use async_std::stream::StreamExt;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Debug;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

/// The filesystem operations needed by [`FileCache`] and by sweeping a [`FileStore`](crate::FileStore).
#[async_trait]
pub trait Filesystem: Debug + Send + Sync {
    /// Read the file at `path`, returning `None` if it does not exist.
    async fn get(&self, path: &Path) -> io::Result<Option<Vec<u8>>>;

    /// Write `contents` to the file at `path`, creating missing parent directories.
    async fn put(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// List the regular files directly inside `directory`.
    /// A missing directory contains no files.
    async fn files(&self, directory: &Path) -> io::Result<Vec<PathBuf>>;

    /// The last modification time of the file at `path`.
    async fn last_modified(&self, path: &Path) -> io::Result<DateTime<Utc>>;

    /// Delete the file at `path`. Deleting a file that does not exist succeeds.
    async fn delete(&self, path: &Path) -> io::Result<()>;
}

/// The local filesystem, via [`async_std::fs`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFilesystem;

#[async_trait]
impl Filesystem for LocalFilesystem {
    async fn get(&self, path: &Path) -> io::Result<Option<Vec<u8>>> {
        match fs::read(path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error),
        }
    }

    async fn put(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, contents).await
    }

    async fn files(&self, directory: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = match fs::read_dir(directory).await {
            Ok(entries) => entries,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(error),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next().await {
            let entry = entry?;
            if entry.file_type().await?.is_file() {
                files.push(entry.path().into());
            }
        }
        Ok(files)
    }

    async fn last_modified(&self, path: &Path) -> io::Result<DateTime<Utc>> {
        Ok(fs::metadata(path).await?.modified()?.into())
    }

    async fn delete(&self, path: &Path) -> io::Result<()> {
        match fs::remove_file(path).await {
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            result => result,
        }
    }
}

/// A cache storing each entry in its own file inside a directory.
///
/// File names are the hex encoded blake3 hash of the key,
/// so keys chosen by clients never reach the filesystem as paths.
#[derive(Debug)]
pub struct FileCache {
    filesystem: Box<dyn Filesystem>,
    directory: PathBuf,
}

impl FileCache {
    /// Create a file cache in `directory` on the local filesystem.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self::new_with_filesystem(LocalFilesystem, directory)
    }

    /// Create a file cache in `directory` on the given filesystem.
    pub fn new_with_filesystem(
        filesystem: impl Filesystem + 'static,
        directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            filesystem: Box::new(filesystem),
            directory: directory.into(),
        }
    }

    /// The filesystem this cache writes to.
    pub fn filesystem(&self) -> &dyn Filesystem {
        self.filesystem.as_ref()
    }

    /// The directory holding the cache files.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The path of the file storing `key`.
    pub fn path(&self, key: &str) -> PathBuf {
        self.directory
            .join(blake3::hash(key.as_bytes()).to_hex().as_str())
    }
}

#[async_trait]
impl Cache for FileCache {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.filesystem.get(&self.path(key)).await?)
    }

    async fn forever(&self, key: &str, value: Vec<u8>) -> anyhow::Result<()> {
        Ok(self.filesystem.put(&self.path(key), &value).await?)
    }

    fn as_file_cache(&self) -> Option<&FileCache> {
        Some(self)
    }
}

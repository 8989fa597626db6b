//! Filesystem capability used by the `file` requester.
//!
//! The real filesystem is the default; [`MemoryFileSystem`] lets callers and
//! tests serve files without touching disk.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::{self, Cursor};
use std::path::{Component, Path, PathBuf};

use crate::data::Body;

/// What the file requester needs to know about a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileInfo {
    pub is_dir: bool,
    pub len: u64,
}

#[async_trait]
pub trait FileSystem: Send + Sync {
    async fn stat(&self, path: &Path) -> io::Result<FileInfo>;

    async fn open(&self, path: &Path) -> io::Result<Body>;

    /// Names of the immediate entries of a directory
    async fn read_dir(&self, path: &Path) -> io::Result<Vec<String>>;
}

/// The operating system's filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileSystem;

#[async_trait]
impl FileSystem for OsFileSystem {
    async fn stat(&self, path: &Path) -> io::Result<FileInfo> {
        let meta = tokio::fs::metadata(path).await?;
        Ok(FileInfo {
            is_dir: meta.is_dir(),
            len: meta.len(),
        })
    }

    async fn open(&self, path: &Path) -> io::Result<Body> {
        let file = tokio::fs::File::open(path).await?;
        Ok(Box::pin(file))
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(path).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }
}

#[derive(Debug, Clone)]
enum Node {
    File(Vec<u8>),
    Dir,
}

/// An in-memory filesystem. Parent directories are created implicitly.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    nodes: BTreeMap<PathBuf, Node>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) -> Self {
        let path = normalize(path.as_ref());
        self.add_parents(&path);
        self.nodes.insert(path, Node::File(contents.into()));
        self
    }

    pub fn with_dir(mut self, path: impl AsRef<Path>) -> Self {
        let path = normalize(path.as_ref());
        self.add_parents(&path);
        self.nodes.insert(path, Node::Dir);
        self
    }

    fn add_parents(&mut self, path: &Path) {
        for parent in path.ancestors().skip(1) {
            self.nodes.entry(parent.to_path_buf()).or_insert(Node::Dir);
        }
    }

    fn node(&self, path: &Path) -> io::Result<&Node> {
        self.nodes.get(&normalize(path)).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{}: file does not exist", path.display()),
            )
        })
    }
}

#[async_trait]
impl FileSystem for MemoryFileSystem {
    async fn stat(&self, path: &Path) -> io::Result<FileInfo> {
        Ok(match self.node(path)? {
            Node::File(data) => FileInfo {
                is_dir: false,
                len: data.len() as u64,
            },
            Node::Dir => FileInfo {
                is_dir: true,
                len: 0,
            },
        })
    }

    async fn open(&self, path: &Path) -> io::Result<Body> {
        match self.node(path)? {
            Node::File(data) => Ok(Box::pin(Cursor::new(data.clone()))),
            Node::Dir => Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{}: is a directory", path.display()),
            )),
        }
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        let dir = normalize(path);
        if !matches!(self.node(&dir)?, Node::Dir) {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{}: not a directory", path.display()),
            ));
        }

        Ok(self
            .nodes
            .keys()
            .filter(|p| p.parent() == Some(dir.as_path()))
            .filter_map(|p| p.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect())
    }
}

/// Lexically clean a path so `/tmp/foo/` and `/tmp/./foo` name the same node
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    if out.as_os_str().is_empty() {
        out.push("/");
    }
    out
}

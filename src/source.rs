//! Byte sources backing a selected file

use async_trait::async_trait;
use std::io;
use std::rc::Rc;

/// Asynchronous read of a selected blob's contents.
#[async_trait(?Send)]
pub trait ByteSource {
    async fn read_bytes(&self) -> io::Result<Vec<u8>>;
}

/// Bytes already held in memory.
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Rc<[u8]>,
}

impl MemorySource {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into().into(),
        }
    }
}

#[async_trait(?Send)]
impl ByteSource for MemorySource {
    async fn read_bytes(&self) -> io::Result<Vec<u8>> {
        Ok(self.data.to_vec())
    }
}

/// A file on the local filesystem, read when the session asks for it.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct PathSource {
    path: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl PathSource {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[async_trait(?Send)]
impl ByteSource for PathSource {
    async fn read_bytes(&self) -> io::Result<Vec<u8>> {
        std::fs::read(&self.path)
    }
}

/// The file slot: a blob, its declared content type and display name.
///
/// Replaced wholesale on every selection, never mutated.
#[derive(Clone)]
pub struct SelectedFile {
    name: String,
    declared_type: String,
    source: Rc<dyn ByteSource>,
}

impl SelectedFile {
    pub fn new(
        name: impl Into<String>,
        declared_type: impl Into<String>,
        source: impl ByteSource + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            source: Rc::new(source),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_type(&self) -> &str {
        &self.declared_type
    }

    pub fn source(&self) -> Rc<dyn ByteSource> {
        Rc::clone(&self.source)
    }
}

impl std::fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.name)
            .field("declared_type", &self.declared_type)
            .finish_non_exhaustive()
    }
}

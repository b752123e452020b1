//! Reading a picked `File` through its `arrayBuffer()` promise

use async_trait::async_trait;
use js_sys::Uint8Array;
use std::io;
use wasm_bindgen_futures::JsFuture;

use super::epubjs::js_error_message;
use crate::source::ByteSource;

pub struct FileSource {
    file: web_sys::File,
}

impl FileSource {
    pub fn new(file: web_sys::File) -> Self {
        Self { file }
    }
}

#[async_trait(?Send)]
impl ByteSource for FileSource {
    async fn read_bytes(&self) -> io::Result<Vec<u8>> {
        let buffer = JsFuture::from(self.file.array_buffer())
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, js_error_message(&e)))?;
        Ok(Uint8Array::new(&buffer).to_vec())
    }
}

//! File holders.
//!
//! A file travels by reference: a `file://` path on the local host, an
//! `http(s)://` URL served by a file server (token protected), or an empty
//! path for a stub. Contents are only fetched when userland asks for them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

const LOCAL_PREFIX: &str = "file://";

/// Errors raised while reading file contents.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FileError {
    #[error("File read error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File server request failed: {0}")]
    Http(String),

    #[error("Unsupported file path: {0}")]
    UnsupportedPath(String),
}

/// Result type for file operations.
pub type FileResult<T> = Result<T, FileError>;

/// A file reference with its wire metadata.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct File {
    #[serde(rename = "n")]
    pub name: String,

    #[serde(rename = "p", default, skip_serializing_if = "String::is_empty")]
    pub path: String,

    #[serde(rename = "m", default, skip_serializing_if = "String::is_empty")]
    pub mime: String,

    #[serde(rename = "f", default, skip_serializing_if = "String::is_empty")]
    pub filename: String,

    #[serde(rename = "s", default, skip_serializing_if = "is_zero")]
    pub size: u64,

    #[serde(rename = "t", default, skip_serializing_if = "String::is_empty")]
    pub token: String,
}

fn is_zero(size: &u64) -> bool {
    *size == 0
}

impl File {
    /// Create a file holder for a local path.
    ///
    /// The filename and size are taken from the filesystem when the path
    /// points at an existing local file.
    pub fn new(name: &str, path: &str, mime: &str) -> Self {
        let mut file = Self {
            name: name.to_string(),
            path: path.to_string(),
            mime: mime.to_string(),
            ..Self::default()
        };
        if let Some(local) = file.local_path() {
            file.filename = std::path::Path::new(&local)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if let Ok(info) = std::fs::metadata(&local) {
                file.size = info.len();
            }
        }
        file
    }

    /// Typed stub for a file that is not present in the request.
    pub fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Whether the holder points at a file on the local host.
    pub fn is_local(&self) -> bool {
        self.path.starts_with(LOCAL_PREFIX)
    }

    /// Whether the file can be read.
    ///
    /// Local paths are checked against the filesystem; remote holders
    /// report `true` when they carry an access token.
    pub fn exists(&self) -> bool {
        match self.local_path() {
            Some(local) => std::path::Path::new(&local).exists(),
            None if self.path.is_empty() => false,
            None => !self.token.is_empty(),
        }
    }

    /// Read the file contents.
    ///
    /// Local files read from disk; remote files are fetched from the file
    /// server with the token sent in the `X-Token` header. An empty path
    /// yields empty contents.
    pub fn read(&self) -> FileResult<Vec<u8>> {
        if self.path.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(local) = self.local_path() {
            return Ok(std::fs::read(local)?);
        }
        if self.path.starts_with("http://") || self.path.starts_with("https://") {
            let client = reqwest::blocking::Client::new();
            let response = client
                .get(&self.path)
                .header("X-Token", &self.token)
                .send()
                .map_err(|e| FileError::Http(e.to_string()))?;
            if !response.status().is_success() {
                return Err(FileError::Http(format!(
                    "{} responded with {}",
                    self.path,
                    response.status()
                )));
            }
            let body = response.bytes().map_err(|e| FileError::Http(e.to_string()))?;
            return Ok(body.to_vec());
        }
        Err(FileError::UnsupportedPath(self.path.clone()))
    }

    fn local_path(&self) -> Option<String> {
        self.path
            .strip_prefix(LOCAL_PREFIX)
            .map(|p| p.to_string())
    }
}

//! File backed storage

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use reqwest::Url;
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

use super::{Error, TokenStorage};

/// Storage keeping every key in a separate file of a single directory
///
/// Values are written to a uniquely named temporary file first and then moved in place, so a
/// reader sees either the old or the new value, even with concurrent writers.
#[derive(Debug, Clone)]
pub struct FileStorage {
    /// Directory with stored keys
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Storage scoped to the API origin inside the `base` directory
    ///
    /// Different origins never share stored values.
    pub fn for_origin(base: impl AsRef<Path>, url: &Url) -> Self {
        Self::new(base.as_ref().join(origin_dir(url)))
    }

    /// Directory of this storage
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    fn unavailable(path: PathBuf) -> impl FnOnce(std::io::Error) -> Error {
        move |source| Error::Unavailable { path, source }
    }
}

impl TokenStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let path = self.path(key);
        let value = match fs::read(&path) {
            Ok(value) => value,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(Self::unavailable(path)(err)),
        };

        String::from_utf8(value)
            .map(Some)
            .map_err(|_| Error::Corrupted { path })
    }

    #[instrument(skip(self, value), fields(dir = ?self.dir))]
    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        fs::create_dir_all(&self.dir).map_err(Self::unavailable(self.dir.clone()))?;

        let mut tmp =
            NamedTempFile::new_in(&self.dir).map_err(Self::unavailable(self.dir.clone()))?;
        tmp.write_all(value.as_bytes())
            .map_err(Self::unavailable(tmp.path().to_owned()))?;

        let path = self.path(key);
        tmp.persist(&path)
            .map_err(|err| Self::unavailable(path)(err.error))?;

        debug!("Value stored");
        Ok(())
    }

    #[instrument(skip(self), fields(dir = ?self.dir))]
    fn remove(&self, key: &str) -> Result<(), Error> {
        let path = self.path(key);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Value removed");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Self::unavailable(path)(err)),
        }
    }
}

/// Directory name for an URL origin: `{scheme}_{host}_{port}`
fn origin_dir(url: &Url) -> String {
    let host = url
        .host_str()
        .unwrap_or("local")
        .replace(|c: char| !(c.is_ascii_alphanumeric() || c == '.' || c == '-'), "_");

    match url.port_or_known_default() {
        Some(port) => format!("{}_{host}_{port}", url.scheme()),
        None => format!("{}_{host}", url.scheme()),
    }
}

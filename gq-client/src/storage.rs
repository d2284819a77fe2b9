//! Persisted key-value slot for the authentication token

use std::io;
use std::path::PathBuf;

use thiserror::Error;

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Key holding the token of the logged in user
pub const TOKEN_KEY: &str = "jwtToken";

#[derive(Debug, Error)]
pub enum Error {
    #[error("Storage at {path} is unavailable")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Value stored at {path} is not valid UTF-8")]
    Corrupted { path: PathBuf },
    #[error("No storage location available")]
    Disabled,
}

/// Durable string storage
///
/// The session store is the only writer of `TOKEN_KEY`, other components are only allowed to read
/// it.
pub trait TokenStorage: Send + Sync {
    /// Reads the value stored under the `key`
    fn get(&self, key: &str) -> Result<Option<String>, Error>;

    /// Stores the value under the `key`, replacing the previous one
    fn set(&self, key: &str, value: &str) -> Result<(), Error>;

    /// Removes the `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), Error>;
}

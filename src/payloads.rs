//! Loading of the opaque instance metadata payloads.
//!
//! The init script and container declaration are never interpreted; they are
//! read from disk and injected into instance metadata byte for byte.

use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8::Dir};
use thiserror::Error;

use crate::config::EnvironmentConfig;

/// Errors raised while reading instance payloads.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum PayloadError {
    /// Raised when a payload path is empty or only whitespace.
    #[error("{payload} file path must not be empty")]
    FilePathEmpty {
        /// Payload being loaded.
        payload: &'static str,
    },
    /// Raised when reading a payload file fails.
    #[error("failed to read {payload} file `{path}`: {message}")]
    FileRead {
        /// Payload being loaded.
        payload: &'static str,
        /// Path that failed to read.
        path: String,
        /// Underlying error message.
        message: String,
    },
}

/// Opaque payloads injected into instance metadata.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InstancePayloads {
    /// Cloud-init user-data.
    pub init_script: String,
    /// Container declaration.
    pub container_spec: String,
}

impl InstancePayloads {
    /// Reads both payloads from the files named in the configuration.
    ///
    /// Relative paths resolve against the current working directory.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError`] when a path is blank or a file cannot be read.
    pub fn load(config: &EnvironmentConfig) -> Result<Self, PayloadError> {
        Ok(Self {
            init_script: read_payload("cloud-init", &config.cloud_init_file)?,
            container_spec: read_payload("container spec", &config.container_spec_file)?,
        })
    }
}

fn read_payload(payload: &'static str, path: &str) -> Result<String, PayloadError> {
    if path.trim().is_empty() {
        return Err(PayloadError::FilePathEmpty { payload });
    }
    read_to_string_ambient(path).map_err(|message| PayloadError::FileRead {
        payload,
        path: path.to_owned(),
        message,
    })
}

fn read_to_string_ambient(path: &str) -> Result<String, String> {
    let path_buf = Utf8Path::new(path);

    let (dir_path, file_path) = match (path_buf.parent(), path_buf.file_name()) {
        (Some(parent), Some(file_name)) if !parent.as_str().is_empty() => {
            (parent, Utf8Path::new(file_name))
        }
        (_, Some(_)) => (Utf8Path::new("."), path_buf),
        (_, None) => return Err(format!("path has no file name: {path_buf}")),
    };

    let dir =
        Dir::open_ambient_dir(dir_path, ambient_authority()).map_err(|err| err.to_string())?;
    dir.read_to_string(file_path).map_err(|err| err.to_string())
}

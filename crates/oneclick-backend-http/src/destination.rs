//! Local persistence for the build destination, one JSON file on disk.

use std::fs;
use std::io;
use std::path::PathBuf;

use oneclick_client_core::{BuildDestination, DestinationStore};
use thiserror::Error;

const DESTINATION_FILE: &str = "build_destination.json";

#[derive(Debug, Error)]
pub enum DestinationStoreError {
    #[error("destination file io: {0}")]
    Io(#[from] io::Error),
    #[error("destination file is not valid json: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub struct FileDestinationStore {
    path: PathBuf,
}

impl FileDestinationStore {
    /// Stores the destination under `dir/build_destination.json`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join(DESTINATION_FILE),
        }
    }
}

impl DestinationStore for FileDestinationStore {
    type Error = DestinationStoreError;

    fn load_destination(&self) -> Result<Option<BuildDestination>, Self::Error> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn persist_destination(&self, destination: &BuildDestination) -> Result<(), Self::Error> {
        fs::write(&self.path, serde_json::to_string_pretty(destination)?)?;
        Ok(())
    }

    fn clear_destination(&self) -> Result<(), Self::Error> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

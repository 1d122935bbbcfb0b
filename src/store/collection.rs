use super::StoreError;
use crate::shared::fs_atomic::atomic_write_file;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// How a collection load concluded. Absent or unreadable backing files are
/// never surfaced to the caller; the status keeps that recovery observable
/// so a recovered-empty collection is distinguishable from a genuinely
/// empty one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Missing,
    Loaded,
    Recovered(String),
}

impl LoadStatus {
    pub fn is_recovered(&self) -> bool {
        matches!(self, Self::Recovered(_))
    }
}

#[derive(Debug)]
pub struct LoadedCollection<T> {
    pub records: T,
    pub status: LoadStatus,
}

/// Whole-collection read. Liveness over durability: any failure yields an
/// empty collection instead of an error.
pub fn load_collection<T>(path: &Path) -> LoadedCollection<T>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        return LoadedCollection {
            records: T::default(),
            status: LoadStatus::Missing,
        };
    }

    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            return LoadedCollection {
                records: T::default(),
                status: LoadStatus::Recovered(format!(
                    "unreadable collection {}: {err}",
                    path.display()
                )),
            }
        }
    };

    match serde_json::from_str(&raw) {
        Ok(records) => LoadedCollection {
            records,
            status: LoadStatus::Loaded,
        },
        Err(err) => LoadedCollection {
            records: T::default(),
            status: LoadStatus::Recovered(format!(
                "malformed collection {}: {err}",
                path.display()
            )),
        },
    }
}

/// Whole-collection overwrite through a temp file and rename.
pub fn persist_collection<T: Serialize>(path: &Path, records: &T) -> Result<(), StoreError> {
    let body = serde_json::to_string_pretty(records).map_err(|source| StoreError::Encode {
        path: path.display().to_string(),
        source,
    })?;
    atomic_write_file(path, body.as_bytes()).map_err(|source| StoreError::Write {
        path: path.display().to_string(),
        source,
    })
}

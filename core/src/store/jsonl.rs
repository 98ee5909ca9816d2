use std::fs;
use std::fs::OpenOptions;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::warn;

use super::VersionStore;
use crate::error::StoreError;
use crate::version::ItemRef;
use crate::version::NewVersion;
use crate::version::Version;
use crate::version::sort_versions;

/// Append-only store writing one JSON-encoded version per line.
///
/// Lines that fail to parse are skipped with a warning so a single damaged
/// record does not hide the rest of the history.
#[derive(Debug)]
pub struct JsonlVersionStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlVersionStore {
    /// Opens (without creating) the store at `path`. Parent directories are
    /// created on first append.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every readable record in file order.
    pub fn read_all(&self) -> Result<Vec<Version>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(fs::File::open(&self.path)?);
        let mut versions = Vec::new();
        for (line_no, line) in reader.split(b'\n').enumerate() {
            let line = line?;
            if line.trim_ascii().is_empty() {
                continue;
            }
            match serde_json::from_slice::<Version>(&line) {
                Ok(version) => versions.push(version),
                Err(e) => {
                    warn!(
                        path = %self.path.display(),
                        line = line_no + 1,
                        "Failed to parse version record: {e}"
                    );
                }
            }
        }
        Ok(versions)
    }
}

impl VersionStore for JsonlVersionStore {
    fn append(&self, version: NewVersion) -> Result<Version, StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;

        // Skipped records may leave gaps; never reuse an index that was read.
        let next_index = self
            .read_all()?
            .iter()
            .filter(|stored| stored.item == version.item)
            .map(|stored| stored.sequence_index + 1)
            .max()
            .unwrap_or(0);
        let stored = Version::from_new(version, next_index);
        let line = serde_json::to_string(&stored)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;

        Ok(stored)
    }

    fn list(&self, item: &ItemRef) -> Result<Vec<Version>, StoreError> {
        let mut versions: Vec<Version> = self
            .read_all()?
            .into_iter()
            .filter(|version| &version.item == item)
            .collect();
        sort_versions(&mut versions);
        Ok(versions)
    }
}

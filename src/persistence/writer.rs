use chrono::{DateTime, Local};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::Record;
use crate::error::PersistError;

/// What to do when a same-minute log file already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionPolicy {
    /// Replace the earlier file
    Overwrite,
    /// Keep the earlier file and append `_1`, `_2`, ... to the new name
    Suffix,
}

impl Default for CollisionPolicy {
    fn default() -> Self {
        CollisionPolicy::Overwrite
    }
}

/// Writes received session records under `<root>/<username>/<activity>/`
#[derive(Debug, Clone)]
pub struct PersistenceWriter {
    root: PathBuf,
    collision_policy: CollisionPolicy,
}

impl PersistenceWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            collision_policy: CollisionPolicy::default(),
        }
    }

    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collision_policy = policy;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for a user/activity pair, created with parents if absent
    pub fn derive_directory(&self, username: &str, activity_name: &str) -> Result<PathBuf, PersistError> {
        let directory = self
            .root
            .join(sanitize_component(username))
            .join(sanitize_component(activity_name));

        if directory.is_dir() {
            debug!("Directory already exists: {:?}", directory);
        } else {
            debug!("Creating directory: {:?}", directory);
        }
        fs::create_dir_all(&directory).map_err(|source| PersistError::CreateDir {
            path: directory.clone(),
            source,
        })?;

        Ok(directory)
    }

    /// Resolve the file to write in `directory`, honouring the collision policy
    pub fn resolve_file(
        &self,
        directory: &Path,
        sensor_name: &str,
        username: &str,
        activity_name: &str,
        now: &DateTime<Local>,
    ) -> PathBuf {
        let name = derive_filename(sensor_name, username, activity_name, now);
        let path = directory.join(&name);
        if self.collision_policy == CollisionPolicy::Overwrite || !path.exists() {
            return path;
        }

        let stem = name.trim_end_matches(".txt");
        (1u32..)
            .map(|n| directory.join(format!("{}_{}.txt", stem, n)))
            .find(|candidate| !candidate.exists())
            .unwrap_or(path)
    }

    /// Derive directory and file name for one sensor's records, then write them
    pub fn write_session(
        &self,
        sensor_name: &str,
        username: &str,
        activity_name: &str,
        records: &[Record],
        now: &DateTime<Local>,
    ) -> Result<PathBuf, PersistError> {
        let directory = self.derive_directory(username, activity_name)?;
        let path = self.resolve_file(&directory, sensor_name, username, activity_name, now);
        write(&path, records)?;
        Ok(path)
    }
}

/// `{sensor}_{username}_{activity}_{yyyyMMdd_HHmm}.txt`
pub fn derive_filename(
    sensor_name: &str,
    username: &str,
    activity_name: &str,
    now: &DateTime<Local>,
) -> String {
    format!(
        "{}_{}_{}_{}.txt",
        sanitize_component(sensor_name),
        sanitize_component(username),
        sanitize_component(activity_name),
        now.format("%Y%m%d_%H%M")
    )
}

/// Write one `timestamp x y z` line per record, replacing any existing file.
///
/// All bytes are flushed to disk before returning. On error the file may be
/// partially written or absent.
pub fn write(path: &Path, records: &[Record]) -> Result<usize, PersistError> {
    let io_err = |source| PersistError::Write {
        path: path.to_path_buf(),
        source,
    };

    info!("Writing file {:?} ({} lines)", path, records.len());

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(io_err)?;

    let mut writer = BufWriter::new(file);
    for record in records {
        writeln!(writer, "{}", record).map_err(io_err)?;
    }
    writer.flush().map_err(io_err)?;

    let file = writer.into_inner().map_err(|e| io_err(e.into_error()))?;
    file.sync_all().map_err(io_err)?;

    Ok(records.len())
}

// Labels come from the UI; keep them to a single path component.
fn sanitize_component(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();

    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

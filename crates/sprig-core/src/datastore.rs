use std::fs;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

use crate::plant::Plant;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed parsing {path} line {line}: {source}")]
    Parse {
        path: String,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to persist {path}: {message}")]
    Persist { path: String, message: String },
}

pub trait PlantStore {
    fn load_all(&self) -> Result<Option<Vec<Plant>>, StoreError>;

    fn save_all(&self, plants: &[Plant]) -> Result<(), StoreError>;
}

#[derive(Debug)]
pub struct FileStore {
    pub data_dir: PathBuf,
    pub plants_path: PathBuf,
}

impl FileStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)?;

        let plants_path = data_dir.join("plants.data");

        info!(
            data_dir = %data_dir.display(),
            plants = %plants_path.display(),
            "opened plant store"
        );

        Ok(Self {
            data_dir,
            plants_path,
        })
    }
}

impl PlantStore for FileStore {
    #[tracing::instrument(skip(self))]
    fn load_all(&self) -> Result<Option<Vec<Plant>>, StoreError> {
        if !self.plants_path.exists() {
            debug!(file = %self.plants_path.display(), "no stored plants yet");
            return Ok(None);
        }
        load_jsonl(&self.plants_path).map(Some)
    }

    #[tracing::instrument(skip(self, plants))]
    fn save_all(&self, plants: &[Plant]) -> Result<(), StoreError> {
        save_jsonl_atomic(&self.plants_path, plants)
    }
}

#[tracing::instrument(skip(path))]
fn load_jsonl(path: &Path) -> Result<Vec<Plant>, StoreError> {
    debug!(file = %path.display(), "loading jsonl");
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|err| match err.kind() {
            io::ErrorKind::InvalidData => StoreError::Parse {
                path: path.display().to_string(),
                line: idx + 1,
                source: serde_json::Error::io(err),
            },
            _ => StoreError::Io(err),
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let plant: Plant = serde_json::from_str(trimmed).map_err(|err| StoreError::Parse {
            path: path.display().to_string(),
            line: idx + 1,
            source: err,
        })?;
        out.push(plant);
    }

    debug!(count = out.len(), "loaded plants from jsonl");
    Ok(out)
}

#[tracing::instrument(skip(path, plants))]
fn save_jsonl_atomic(path: &Path, plants: &[Plant]) -> Result<(), StoreError> {
    debug!(file = %path.display(), count = plants.len(), "saving jsonl atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    for plant in plants {
        let serialized = serde_json::to_string(plant)?;
        writeln!(temp, "{serialized}")?;
    }
    temp.flush()?;

    temp.persist(path).map_err(|err| StoreError::Persist {
        path: path.display().to_string(),
        message: err.to_string(),
    })?;

    Ok(())
}

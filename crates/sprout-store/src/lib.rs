//! Persisted state for the plant-care pipeline.
//!
//! Three JSON-array log files (sensor, health, watering), a single-value
//! plant-identity file and a pot-info file, all living under one data
//! directory. The on-disk format is frozen: the legacy dashboard reads these
//! files directly.
//!
//! Every mutation of a log goes through the log handle's async mutex and
//! lands via temp-file + rename, so concurrent writers (the decision loop
//! and the sensor/watering upload surface) serialize instead of clobbering
//! each other with whole-file rewrites. All writers must share one
//! [`PlantStore`] for that to hold.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;
use sprout_schema::PotInfo;
use tokio::sync::Mutex;

/// Explicit file layout under a data directory. No implicit globals: every
/// component receives its paths from here.
#[derive(Debug, Clone)]
pub struct StorePaths {
    data_dir: PathBuf,
}

impl StorePaths {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn sensor_log(&self) -> PathBuf {
        self.data_dir.join("sensor_log.json")
    }

    pub fn health_log(&self) -> PathBuf {
        self.data_dir.join("plant_health_log.json")
    }

    pub fn watering_log(&self) -> PathBuf {
        self.data_dir.join("watering_log.json")
    }

    pub fn plant_identity(&self) -> PathBuf {
        self.data_dir.join("sci_name.txt")
    }

    pub fn pot_info(&self) -> PathBuf {
        self.data_dir.join("pot_info.json")
    }

    pub fn images_dir(&self) -> PathBuf {
        self.data_dir.join("images")
    }

    /// Setup-time photo, used when the camera has not uploaded anything yet.
    pub fn setup_photo(&self) -> PathBuf {
        self.data_dir.join("image.jpg")
    }
}

/// One append-only JSON-array log file with a serialized write path.
#[derive(Debug, Clone)]
pub struct JsonLog {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl JsonLog {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole log. A missing file is an empty log; a corrupt file is
    /// treated as empty with a warning rather than failing every reader.
    pub async fn read_all(&self) -> Result<Vec<Value>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read log: {}", self.path.display()))
            }
        };
        match serde_json::from_str::<Vec<Value>>(&content) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "log file is not a JSON array, treating as empty"
                );
                Ok(Vec::new())
            }
        }
    }

    /// Append one entry. Read-modify-write happens entirely under the write
    /// lock, so appends from different tasks never lose each other.
    pub async fn append(&self, entry: Value) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read_all().await?;
        entries.push(entry);
        self.write_atomic(&entries).await
    }

    /// Truncate the log to an empty array.
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write_atomic(&[]).await
    }

    async fn write_atomic(&self, entries: &[Value]) -> Result<()> {
        let json = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .with_context(|| format!("failed to write log: {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("failed to replace log: {}", self.path.display()))?;
        Ok(())
    }
}

/// Handle over all persisted plant state.
#[derive(Debug, Clone)]
pub struct PlantStore {
    paths: StorePaths,
    sensor: JsonLog,
    health: JsonLog,
    watering: JsonLog,
}

impl PlantStore {
    pub fn open(paths: StorePaths) -> Result<Self> {
        std::fs::create_dir_all(paths.data_dir())
            .with_context(|| format!("failed to create data dir: {}", paths.data_dir().display()))?;
        std::fs::create_dir_all(paths.images_dir())?;
        Ok(Self {
            sensor: JsonLog::new(paths.sensor_log()),
            health: JsonLog::new(paths.health_log()),
            watering: JsonLog::new(paths.watering_log()),
            paths,
        })
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    pub fn sensor_log(&self) -> &JsonLog {
        &self.sensor
    }

    pub fn health_log(&self) -> &JsonLog {
        &self.health
    }

    pub fn watering_log(&self) -> &JsonLog {
        &self.watering
    }

    /// Cached scientific name. Blank or missing file means unresolved.
    pub async fn load_plant_identity(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.paths.plant_identity()).await {
            Ok(content) => {
                let trimmed = content.trim();
                if trimmed.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(trimmed.to_string()))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).context("failed to read plant identity"),
        }
    }

    pub async fn save_plant_identity(&self, scientific_name: &str) -> Result<()> {
        tokio::fs::write(self.paths.plant_identity(), scientific_name)
            .await
            .context("failed to write plant identity")
    }

    pub async fn load_pot_info(&self) -> Result<Option<PotInfo>> {
        match tokio::fs::read_to_string(self.paths.pot_info()).await {
            Ok(content) => {
                let pot = serde_json::from_str::<PotInfo>(&content)
                    .context("failed to parse pot info")?;
                Ok(Some(pot))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).context("failed to read pot info"),
        }
    }

    pub async fn save_pot_info(&self, pot: &PotInfo) -> Result<()> {
        let json = serde_json::to_string_pretty(pot)?;
        tokio::fs::write(self.paths.pot_info(), json)
            .await
            .context("failed to write pot info")
    }

    /// Newest uploaded photo (camera uploads carry sortable timestamp
    /// names), falling back to the setup photo.
    pub async fn latest_photo(&self) -> Result<Option<PathBuf>> {
        let mut names: Vec<String> = Vec::new();
        let mut dir = match tokio::fs::read_dir(self.paths.images_dir()).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return self.setup_photo_if_present().await
            }
            Err(e) => return Err(e).context("failed to list images dir"),
        };
        while let Some(entry) = dir.next_entry().await? {
            if entry.file_type().await?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        match names.last() {
            Some(name) => Ok(Some(self.paths.images_dir().join(name))),
            None => self.setup_photo_if_present().await,
        }
    }

    async fn setup_photo_if_present(&self) -> Result<Option<PathBuf>> {
        let path = self.paths.setup_photo();
        match tokio::fs::metadata(&path).await {
            Ok(_) => Ok(Some(path)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).context("failed to stat setup photo"),
        }
    }

    /// Start a new generation: truncate all three logs, blank the cached
    /// plant identity and clear the pot info. Uploaded photos are removed
    /// too so the next identification uses a fresh picture.
    pub async fn reset_generation(&self) -> Result<()> {
        self.sensor.clear().await?;
        self.health.clear().await?;
        self.watering.clear().await?;
        tokio::fs::write(self.paths.plant_identity(), "").await?;
        tokio::fs::write(self.paths.pot_info(), "{}").await?;

        let mut dir = tokio::fs::read_dir(self.paths.images_dir()).await?;
        while let Some(entry) = dir.next_entry().await? {
            if entry.file_type().await?.is_file() {
                if let Err(e) = tokio::fs::remove_file(entry.path()).await {
                    tracing::warn!(path = %entry.path().display(), error = %e, "failed to delete image");
                }
            }
        }
        match tokio::fs::remove_file(self.paths.setup_photo()).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e).context("failed to delete setup photo"),
        }
        tracing::info!(data_dir = %self.paths.data_dir().display(), "generation reset");
        Ok(())
    }
}

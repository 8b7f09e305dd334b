use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use uuid::Uuid;

use crate::error::{Error, Result, StorageError};
use crate::geodesic::compute_metrics;
use crate::polygon::Ring;
use crate::record::{PolygonDraft, PolygonPatch, PolygonRecord, normalize_name};

/// Where records live between runs. Implementations see whole snapshots and
/// must either persist all of `records` or fail without side effects.
pub trait StorageBackend: Send + Sync {
    fn load(&self) -> std::result::Result<Vec<PolygonRecord>, StorageError>;
    fn save(&self, records: &[PolygonRecord]) -> std::result::Result<(), StorageError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryBackend;

impl StorageBackend for MemoryBackend {
    fn load(&self) -> std::result::Result<Vec<PolygonRecord>, StorageError> {
        Ok(Vec::new())
    }

    fn save(&self, _records: &[PolygonRecord]) -> std::result::Result<(), StorageError> {
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct StoreFile {
    polygons: Vec<PolygonRecord>,
}

/// Single JSON document on disk, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageBackend for JsonFileBackend {
    fn load(&self) -> std::result::Result<Vec<PolygonRecord>, StorageError> {
        if !self.path.exists() {
            log::debug!("store: {} does not exist yet", self.path.display());
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        let mut file: StoreFile = serde_json::from_str(&content)?;
        for record in &mut file.polygons {
            remeasure(record)?;
        }
        Ok(file.polygons)
    }

    fn save(&self, records: &[PolygonRecord]) -> std::result::Result<(), StorageError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let file = StoreFile {
            polygons: records.to_vec(),
        };
        let mut tmp = NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut tmp, &file)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)?;
        log::trace!("store: wrote {} records to {}", records.len(), self.path.display());
        Ok(())
    }
}

pub struct Repository<B: StorageBackend> {
    backend: B,
    records: RwLock<Vec<PolygonRecord>>,
}

impl Repository<MemoryBackend> {
    pub fn in_memory() -> Self {
        Self {
            backend: MemoryBackend,
            records: RwLock::new(Vec::new()),
        }
    }
}

impl<B: StorageBackend> Repository<B> {
    pub fn open(backend: B) -> Result<Self> {
        let records = backend.load()?;
        log::info!("repository: loaded {} polygons", records.len());
        Ok(Self {
            backend,
            records: RwLock::new(records),
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn create(&self, name: &str, ring: Ring) -> Result<PolygonRecord> {
        let record = build_record(name, ring)?;
        self.mutate(|records| {
            records.push(record.clone());
            Ok(())
        })?;
        log::info!(
            "repository: created {} '{}' ({:.1} m2)",
            record.id,
            record.name,
            record.area_sq_meters
        );
        Ok(record)
    }

    /// Creates every draft or none of them.
    pub fn create_many(&self, drafts: Vec<PolygonDraft>) -> Result<Vec<PolygonRecord>> {
        let created = drafts
            .into_iter()
            .map(|d| build_record(&d.name, d.ring))
            .collect::<Result<Vec<_>>>()?;
        self.mutate(|records| {
            records.extend(created.iter().cloned());
            Ok(())
        })?;
        log::info!("repository: created {} polygons", created.len());
        Ok(created)
    }

    pub fn get(&self, id: Uuid) -> Result<PolygonRecord> {
        self.read()?
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(Error::NotFound(id))
    }

    pub fn list(&self) -> Result<Vec<PolygonRecord>> {
        Ok(self.read()?.clone())
    }

    /// Applies `patch`. An unknown id is reported before any validation error.
    /// A new ring is measured before the write lock is taken.
    pub fn update(&self, id: Uuid, patch: PolygonPatch) -> Result<PolygonRecord> {
        if !self.read()?.iter().any(|r| r.id == id) {
            return Err(Error::NotFound(id));
        }
        if patch.is_empty() {
            log::debug!("repository: empty patch for {}", id);
        }
        let name = match &patch.name {
            Some(n) => Some(normalize_name(n).ok_or(Error::InvalidName)?),
            None => None,
        };
        let measured = match patch.ring {
            Some(ring) => {
                let metrics = compute_metrics(&ring)?;
                Some((ring, metrics))
            }
            None => None,
        };

        let updated = self.mutate(|records| {
            let record = records
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or(Error::NotFound(id))?;
            if let Some(name) = name {
                record.name = name;
            }
            if let Some((ring, metrics)) = measured {
                record.ring = ring;
                record.area_sq_meters = metrics.area_sq_meters;
                record.perimeter_meters = metrics.perimeter_meters;
            }
            record.updated_at = Utc::now().max(record.created_at);
            Ok(record.clone())
        })?;
        log::info!("repository: updated {} '{}'", updated.id, updated.name);
        Ok(updated)
    }

    pub fn delete(&self, id: Uuid) -> Result<()> {
        self.mutate(|records| {
            let index = records
                .iter()
                .position(|r| r.id == id)
                .ok_or(Error::NotFound(id))?;
            records.remove(index);
            Ok(())
        })?;
        log::info!("repository: deleted {}", id);
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<PolygonRecord>>> {
        Ok(self.records.read().map_err(|_| StorageError::LockPoisoned)?)
    }

    // the next state is saved before it is swapped in, so a failed save changes nothing
    fn mutate<T>(&self, f: impl FnOnce(&mut Vec<PolygonRecord>) -> Result<T>) -> Result<T> {
        let mut guard = self
            .records
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        let mut next = guard.clone();
        let out = f(&mut next)?;
        self.backend.save(&next)?;
        *guard = next;
        Ok(out)
    }
}

// cached metrics on disk are not trusted
fn remeasure(record: &mut PolygonRecord) -> std::result::Result<(), StorageError> {
    let metrics = compute_metrics(&record.ring).map_err(|e| StorageError::InvalidRecord {
        id: record.id,
        message: e.to_string(),
    })?;
    if record.metrics() != metrics {
        log::warn!("store: {} had stale metrics, recomputed", record.id);
        record.area_sq_meters = metrics.area_sq_meters;
        record.perimeter_meters = metrics.perimeter_meters;
    }
    Ok(())
}

fn build_record(name: &str, ring: Ring) -> Result<PolygonRecord> {
    let name = normalize_name(name).ok_or(Error::InvalidName)?;
    ring.info();
    let metrics = compute_metrics(&ring)?;
    let now = Utc::now();
    Ok(PolygonRecord {
        id: Uuid::new_v4(),
        name,
        ring,
        area_sq_meters: metrics.area_sq_meters,
        perimeter_meters: metrics.perimeter_meters,
        created_at: now,
        updated_at: now,
    })
}

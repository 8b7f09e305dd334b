use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geodesic::Metrics;
use crate::polygon::Ring;

/// A stored polygon. `area_sq_meters` and `perimeter_meters` are derived from
/// `ring` by the repository and are never taken from callers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolygonRecord {
    pub id: Uuid,
    pub name: String,
    pub ring: Ring,
    pub area_sq_meters: f64,
    pub perimeter_meters: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PolygonRecord {
    pub fn metrics(&self) -> Metrics {
        Metrics {
            area_sq_meters: self.area_sq_meters,
            perimeter_meters: self.perimeter_meters,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolygonDraft {
    pub name: String,
    pub ring: Ring,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PolygonPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ring: Option<Ring>,
}

impl PolygonPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.ring.is_none()
    }
}

pub fn normalize_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

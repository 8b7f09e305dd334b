use std::path::Path;

use geojson::{Feature, FeatureCollection};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::codec;
use crate::error::{Error, Result};
use crate::read_polygon;
use crate::record::{PolygonDraft, PolygonPatch, PolygonRecord};
use crate::repository::{Repository, StorageBackend};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolygonView {
    #[serde(flatten)]
    pub record: PolygonRecord,
    pub area_hectares: f64,
    pub area_acres: f64,
}

impl From<PolygonRecord> for PolygonView {
    fn from(record: PolygonRecord) -> Self {
        let metrics = record.metrics();
        Self {
            area_hectares: metrics.area_hectares(),
            area_acres: metrics.area_acres(),
            record,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    List,
    Get { id: Uuid },
    Create(PolygonDraft),
    Update {
        id: Uuid,
        #[serde(flatten)]
        patch: PolygonPatch,
    },
    Delete { id: Uuid },
    ExportGeojson { id: Uuid },
    ExportGeojsonCollection,
    ImportGeojson { geojson: serde_json::Value },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub status: u16,
    pub body: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub code: u32,
    pub error: &'static str,
    pub message: String,
}

impl From<&Error> for ErrorBody {
    fn from(err: &Error) -> Self {
        Self {
            code: err.code() as u32,
            error: err.code().as_str(),
            message: err.to_string(),
        }
    }
}

pub struct PolygonService<B: StorageBackend> {
    repo: Repository<B>,
}

impl<B: StorageBackend> PolygonService<B> {
    pub fn new(repo: Repository<B>) -> Self {
        Self { repo }
    }

    pub fn list(&self) -> Result<Vec<PolygonView>> {
        Ok(self.repo.list()?.into_iter().map(PolygonView::from).collect())
    }

    pub fn get(&self, id: Uuid) -> Result<PolygonView> {
        self.repo.get(id).map(PolygonView::from)
    }

    pub fn create(&self, draft: PolygonDraft) -> Result<PolygonView> {
        self.repo.create(&draft.name, draft.ring).map(PolygonView::from)
    }

    pub fn update(&self, id: Uuid, patch: PolygonPatch) -> Result<PolygonView> {
        self.repo.update(id, patch).map(PolygonView::from)
    }

    pub fn delete(&self, id: Uuid) -> Result<()> {
        self.repo.delete(id)
    }

    pub fn export_geojson(&self, id: Uuid) -> Result<Feature> {
        Ok(codec::to_feature(&self.repo.get(id)?))
    }

    pub fn export_geojson_collection(&self) -> Result<FeatureCollection> {
        Ok(codec::to_feature_collection(&self.repo.list()?))
    }

    /// Stores every Polygon feature in `text`, or none if any is invalid.
    pub fn import_geojson(&self, text: &str) -> Result<Vec<PolygonView>> {
        let drafts = codec::drafts_from_str(text)?;
        self.store_all(drafts)
    }

    /// Stores the polygons of a GeoJSON, KML or GPX file. Unnamed polygons
    /// are called `fallback_name`, or the file stem when that is absent.
    pub fn import_file(&self, path: &Path, fallback_name: Option<&str>) -> Result<Vec<PolygonView>> {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let fallback = fallback_name.unwrap_or(&stem);
        let drafts = fill_blank_names(read_polygon::read_file(path)?, fallback);
        self.store_all(drafts)
    }

    fn store_all(&self, drafts: Vec<PolygonDraft>) -> Result<Vec<PolygonView>> {
        Ok(self
            .repo
            .create_many(drafts)?
            .into_iter()
            .map(PolygonView::from)
            .collect())
    }

    pub fn handle(&self, request: Request) -> Response {
        log::debug!("service: {:?}", request);
        match self.dispatch(request) {
            Ok((status, body)) => Response { status, body },
            Err(err) => {
                if err.is_client_error() {
                    log::debug!("service: rejected: {}", err);
                } else {
                    log::warn!("service: failed: {}", err);
                }
                Response {
                    status: err.status(),
                    body: json!(ErrorBody::from(&err)),
                }
            }
        }
    }

    fn dispatch(&self, request: Request) -> Result<(u16, serde_json::Value)> {
        Ok(match request {
            Request::List => (200, json!(self.list()?)),
            Request::Get { id } => (200, json!(self.get(id)?)),
            Request::Create(draft) => (201, json!(self.create(draft)?)),
            Request::Update { id, patch } => (200, json!(self.update(id, patch)?)),
            Request::Delete { id } => {
                self.delete(id)?;
                (204, serde_json::Value::Null)
            }
            Request::ExportGeojson { id } => (200, json!(self.export_geojson(id)?)),
            Request::ExportGeojsonCollection => (200, json!(self.export_geojson_collection()?)),
            Request::ImportGeojson { geojson } => {
                (201, json!(self.import_geojson(&geojson.to_string())?))
            }
        })
    }
}

fn fill_blank_names(mut drafts: Vec<PolygonDraft>, fallback: &str) -> Vec<PolygonDraft> {
    let multi = drafts.len() > 1;
    for (i, draft) in drafts.iter_mut().enumerate() {
        if draft.name.trim().is_empty() {
            draft.name = if multi {
                format!("{} #{}", fallback, i + 1)
            } else {
                fallback.to_string()
            };
        }
    }
    drafts
}

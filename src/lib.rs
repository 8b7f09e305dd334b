//! Geodesic polygon metrics with a small persistence and GeoJSON exchange layer.
//!
//! ```
//! use polygon_mapper::polygon::Ring;
//! use polygon_mapper::repository::Repository;
//!
//! let repo = Repository::in_memory();
//! let ring = Ring::from(vec![[-74.01, 40.70], [-74.00, 40.70], [-74.00, 40.71], [-74.01, 40.71]]);
//! let record = repo.create("Plot A", ring).unwrap();
//! assert!(record.perimeter_meters > 3_000.0);
//! ```

pub mod codec;
pub mod error;
pub mod geodesic;
pub mod point;
pub mod polygon;
pub mod read_polygon;
pub mod record;
pub mod reference;
pub mod repository;
pub mod service;

pub use error::{Error, ErrorCode, Result, StorageError};
pub use geodesic::{Metrics, compute_metrics};
pub use point::WGS84Point;
pub use polygon::Ring;
pub use record::{PolygonDraft, PolygonPatch, PolygonRecord};
pub use repository::{JsonFileBackend, MemoryBackend, Repository, StorageBackend};
pub use service::PolygonService;

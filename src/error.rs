use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid name: polygon name must not be empty")]
    InvalidName,

    #[error("Polygon not found: {0}")]
    NotFound(Uuid),

    #[error("Invalid GeoJSON: {0}")]
    InvalidGeoJson(String),

    #[error("Cannot import {path}: {message}")]
    Import { path: String, message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt store file: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cannot replace store file: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("Invalid record {id} in store file: {message}")]
    InvalidRecord { id: Uuid, message: String },

    #[error("Store lock poisoned")]
    LockPoisoned,
}

// range: 20xxx
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidGeometry = 20001,
    InvalidName = 20002,
    NotFound = 20003,
    InvalidGeoJson = 20004,
    Import = 20005,
    Storage = 20006,
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::InvalidGeometry(_) => ErrorCode::InvalidGeometry,
            Error::InvalidName => ErrorCode::InvalidName,
            Error::NotFound(_) => ErrorCode::NotFound,
            Error::InvalidGeoJson(_) => ErrorCode::InvalidGeoJson,
            Error::Import { .. } => ErrorCode::Import,
            Error::Storage(_) => ErrorCode::Storage,
        }
    }

    /// HTTP-style status for the request boundary.
    pub fn status(&self) -> u16 {
        match self {
            Error::InvalidGeometry(_)
            | Error::InvalidName
            | Error::InvalidGeoJson(_)
            | Error::Import { .. } => 400,
            Error::NotFound(_) => 404,
            Error::Storage(_) => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status() < 500
    }
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidGeometry => "invalid_geometry",
            ErrorCode::InvalidName => "invalid_name",
            ErrorCode::NotFound => "not_found",
            ErrorCode::InvalidGeoJson => "invalid_geojson",
            ErrorCode::Import => "import_failed",
            ErrorCode::Storage => "storage_error",
        }
    }
}

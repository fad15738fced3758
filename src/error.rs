use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum GlobeError {
    #[error("malformed ISO-8601 duration: {0:?}")]
    #[diagnostic(help("expected P[nY][nM][nD][T[nH][nM][nS]] with at least one component"))]
    MalformedDuration(String),

    #[error("malformed ISO-8601 date: {0:?}")]
    MalformedDate(String),

    #[error("time specification contains no intervals")]
    EmptyTimeSpec,

    #[error("tile request failed: {0}")]
    FetchHttp(String),

    #[error("map server returned status {status} for {url}")]
    FetchStatus { status: u16, url: String },

    #[error("failed to decode image {path}: {message}")]
    Decode { path: String, message: String },

    #[error("worker pool error: {0}")]
    WorkerPool(String),

    #[error("unknown data set: {0}")]
    UnknownDataSet(String),

    #[error("unknown body: {0}")]
    UnknownBody(String),

    #[error("body {0} has no WMS data sets configured")]
    NoDataSets(String),

    #[error("missing settings file wms-globe.json in current directory")]
    MissingConfig,

    #[error("failed to read settings file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON settings: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl GlobeError {
    pub fn is_parse(&self) -> bool {
        matches!(
            self,
            GlobeError::MalformedDuration(_)
                | GlobeError::MalformedDate(_)
                | GlobeError::EmptyTimeSpec
        )
    }

    pub fn is_fetch(&self) -> bool {
        matches!(
            self,
            GlobeError::FetchHttp(_) | GlobeError::FetchStatus { .. } | GlobeError::Filesystem(_)
        )
    }
}

use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use image::ImageReader;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::domain::{BucketId, PixelBuffer};
use crate::error::GlobeError;
use crate::pool::{DEFAULT_WORKERS, TaskHandle, WorkerPool};
use crate::store::TileStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchReport {
    pub status: u16,
    pub bytes: u64,
}

/// Blocking "HTTP GET into a file" primitive.
///
/// Implementations must not leave a file at `destination` unless the server answered with a
/// success status, and must report non-success statuses as [`GlobeError::FetchStatus`].
pub trait HttpFetch: Send + Sync {
    fn fetch_to_file(&self, url: &str, destination: &Utf8Path)
    -> Result<FetchReport, GlobeError>;
}

pub trait ImageDecode: Send + Sync {
    fn decode(&self, path: &Utf8Path) -> Result<PixelBuffer, GlobeError>;
}

#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, GlobeError> {
        Self::with_timeout(Duration::from_secs(60))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, GlobeError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("wms-globe/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| GlobeError::FetchHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| GlobeError::FetchHttp(err.to_string()))?;
        Ok(Self { client })
    }
}

impl HttpFetch for HttpFetcher {
    fn fetch_to_file(
        &self,
        url: &str,
        destination: &Utf8Path,
    ) -> Result<FetchReport, GlobeError> {
        TileStore::ensure_parent(destination)?;
        let parent = destination
            .parent()
            .ok_or_else(|| GlobeError::Filesystem("invalid destination path".to_string()))?;
        // Streamed into a temp file so an interrupted download never looks like a cache hit.
        let mut temp = tempfile::Builder::new()
            .prefix(".wms-tile")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| GlobeError::Filesystem(err.to_string()))?;

        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|err| GlobeError::FetchHttp(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(GlobeError::FetchStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = std::io::copy(&mut response, temp.as_file_mut())
            .map_err(|err| GlobeError::FetchHttp(err.to_string()))?;
        temp.persist(destination.as_std_path())
            .map_err(|err| GlobeError::Filesystem(err.to_string()))?;
        Ok(FetchReport {
            status: status.as_u16(),
            bytes,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ImageDecoder;

impl ImageDecode for ImageDecoder {
    fn decode(&self, path: &Utf8Path) -> Result<PixelBuffer, GlobeError> {
        let decode_err = |message: String| GlobeError::Decode {
            path: path.to_string(),
            message,
        };
        let image = ImageReader::open(path.as_std_path())
            .map_err(|err| decode_err(err.to_string()))?
            .with_guessed_format()
            .map_err(|err| decode_err(err.to_string()))?
            .decode()
            .map_err(|err| decode_err(err.to_string()))?;
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(PixelBuffer::new(width, height, rgba.into_raw()))
    }
}

pub type FetchHandle = TaskHandle<Result<Utf8PathBuf, GlobeError>>;
pub type DecodeHandle = TaskHandle<Result<PixelBuffer, GlobeError>>;

pub struct FetchPipeline {
    pool: WorkerPool,
    fetcher: Arc<dyn HttpFetch>,
    decoder: Arc<dyn ImageDecode>,
    store: TileStore,
}

impl FetchPipeline {
    pub fn new(
        store: TileStore,
        fetcher: Arc<dyn HttpFetch>,
        decoder: Arc<dyn ImageDecode>,
        workers: usize,
    ) -> Result<Self, GlobeError> {
        Ok(Self {
            pool: WorkerPool::new(workers)?,
            fetcher,
            decoder,
            store,
        })
    }

    pub fn with_defaults(store: TileStore) -> Result<Self, GlobeError> {
        Self::new(
            store,
            Arc::new(HttpFetcher::new()?),
            Arc::new(ImageDecoder),
            DEFAULT_WORKERS,
        )
    }

    pub fn store(&self) -> &TileStore {
        &self.store
    }

    pub fn workers(&self) -> usize {
        self.pool.size()
    }

    pub fn cancel_pending(&self) {
        self.pool.cancel_pending();
    }

    pub fn tile_url(request: &str, bucket: &BucketId) -> String {
        format!("{request}&TIME={bucket}")
    }

    pub fn fetch_to_disk(&self, bucket: &BucketId, request: &str, layer: &str) -> FetchHandle {
        let path = self.store.tile_path(layer, bucket);
        let url = Self::tile_url(request, bucket);
        let fetcher = Arc::clone(&self.fetcher);
        self.pool
            .submit(move || download_tile(fetcher.as_ref(), &url, path))
    }

    pub fn decode_from_file(&self, path: Utf8PathBuf) -> DecodeHandle {
        let decoder = Arc::clone(&self.decoder);
        self.pool.submit(move || decoder.decode(&path))
    }

    pub fn fetch_static(&self, request: &str, layer: &str) -> Result<Utf8PathBuf, GlobeError> {
        let path = self.store.static_path(layer);
        let report = self.fetcher.fetch_to_file(request, &path)?;
        tracing::debug!(%path, bytes = report.bytes, "downloaded static map");
        Ok(path)
    }

    pub fn decode_now(&self, path: &Utf8Path) -> Result<PixelBuffer, GlobeError> {
        self.decoder.decode(path)
    }
}

fn download_tile(
    fetcher: &dyn HttpFetch,
    url: &str,
    path: Utf8PathBuf,
) -> Result<Utf8PathBuf, GlobeError> {
    if path.as_std_path().is_file() {
        tracing::debug!(%path, "tile cache hit");
        return Ok(path);
    }
    match fetcher.fetch_to_file(url, &path) {
        Ok(report) => {
            tracing::debug!(%path, bytes = report.bytes, "downloaded tile");
            Ok(path)
        }
        Err(err) => {
            tracing::warn!(%url, error = %err, "tile download failed");
            Err(err)
        }
    }
}

#![allow(dead_code)]

use std::fs;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

use wms_globe::cache::{FetchContext, TileCache};
use wms_globe::domain::PixelBuffer;
use wms_globe::error::GlobeError;
use wms_globe::fetch::{FetchPipeline, FetchReport, HttpFetch, ImageDecode};
use wms_globe::selector::{TextureSink, TextureSlot};
use wms_globe::store::TileStore;

pub const BACKGROUND: &[u8] = b"background";

/// Writes the requested `TIME` value (or `static`) as the file body.
#[derive(Default)]
pub struct MockFetcher {
    pub calls: Mutex<Vec<String>>,
    pub missing: Vec<String>,
    pub corrupt: Vec<String>,
    pub delay: Option<Duration>,
}

impl MockFetcher {
    pub fn failing(missing: &[&str]) -> Self {
        Self {
            missing: missing.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn corrupting(corrupt: &[&str]) -> Self {
        Self {
            corrupt: corrupt.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for(&self, time: &str) -> usize {
        let needle = format!("&TIME={time}");
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|url| url.ends_with(&needle))
            .count()
    }
}

impl HttpFetch for MockFetcher {
    fn fetch_to_file(
        &self,
        url: &str,
        destination: &Utf8Path,
    ) -> Result<FetchReport, GlobeError> {
        self.calls.lock().unwrap().push(url.to_string());
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        let time = url
            .split_once("&TIME=")
            .map(|(_, time)| time.to_string())
            .unwrap_or_else(|| "static".to_string());
        if self.missing.contains(&time) {
            return Err(GlobeError::FetchStatus {
                status: 400,
                url: url.to_string(),
            });
        }
        let body = if self.corrupt.contains(&time) {
            "corrupt".to_string()
        } else {
            time
        };
        TileStore::ensure_parent(destination)?;
        fs::write(destination, body.as_bytes())
            .map_err(|err| GlobeError::Filesystem(err.to_string()))?;
        Ok(FetchReport {
            status: 200,
            bytes: body.len() as u64,
        })
    }
}

/// "Decodes" a file into one pixel row holding its raw bytes.
pub struct MockDecoder;

impl ImageDecode for MockDecoder {
    fn decode(&self, path: &Utf8Path) -> Result<PixelBuffer, GlobeError> {
        let bytes = fs::read(path).map_err(|err| GlobeError::Decode {
            path: path.to_string(),
            message: err.to_string(),
        })?;
        if bytes == b"corrupt" {
            return Err(GlobeError::Decode {
                path: path.to_string(),
                message: "bad header".to_string(),
            });
        }
        Ok(PixelBuffer::new(bytes.len() as u32, 1, bytes))
    }
}

pub struct Fixture {
    pub dir: TempDir,
    pub fetcher: Arc<MockFetcher>,
    pub background: Utf8PathBuf,
}

impl Fixture {
    pub fn new(fetcher: MockFetcher) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let background = Utf8PathBuf::from_path_buf(dir.path().join("background.img")).unwrap();
        fs::write(&background, BACKGROUND).unwrap();
        Self {
            dir,
            fetcher: Arc::new(fetcher),
            background,
        }
    }

    pub fn store(&self) -> TileStore {
        TileStore::new_with_root(
            Utf8PathBuf::from_path_buf(self.dir.path().join("cache")).unwrap(),
        )
    }

    pub fn pipeline(&self) -> FetchPipeline {
        self.pipeline_with_workers(4)
    }

    pub fn pipeline_with_workers(&self, workers: usize) -> FetchPipeline {
        FetchPipeline::new(
            self.store(),
            self.fetcher.clone(),
            Arc::new(MockDecoder),
            workers,
        )
        .unwrap()
    }

    pub fn context(&self) -> FetchContext {
        FetchContext {
            request: "https://maps.example/wms?SERVICE=WMS&LAYERS=Clouds".to_string(),
            layer: "Clouds".to_string(),
            fallback: self.background.clone(),
        }
    }
}

pub fn pump_until<F>(cache: &mut TileCache, ctx: &FetchContext, mut done: F)
where
    F: FnMut(&TileCache) -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(5);
    while !done(cache) {
        assert!(Instant::now() < deadline, "cache did not settle in time");
        cache.pump(ctx);
        thread::sleep(Duration::from_millis(2));
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub uploads: Vec<(TextureSlot, Vec<u8>)>,
}

impl RecordingSink {
    pub fn count(&self, slot: TextureSlot) -> usize {
        self.uploads.iter().filter(|(s, _)| *s == slot).count()
    }
}

impl TextureSink for RecordingSink {
    fn upload(&mut self, slot: TextureSlot, pixels: &PixelBuffer, _generate_mipmaps: bool) {
        self.uploads.push((slot, pixels.rgba.clone()));
    }
}

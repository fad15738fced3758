use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;

use crate::domain::BucketId;
use crate::error::GlobeError;

pub const TILE_EXTENSION: &str = "img";

#[derive(Debug, Clone)]
pub struct TileStore {
    cache_root: Utf8PathBuf,
}

impl TileStore {
    pub fn new() -> Result<Self, GlobeError> {
        let cache_root = BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(dirs.cache_dir().join("wms-globe").join("map-cache"))
                    .ok()
            })
            .ok_or_else(|| {
                GlobeError::Filesystem("unable to resolve cache directory".to_string())
            })?;
        Ok(Self { cache_root })
    }

    pub fn new_with_root(cache_root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
        }
    }

    pub fn cache_root(&self) -> &Utf8Path {
        &self.cache_root
    }

    pub fn layer_dir(&self, layer: &str) -> Utf8PathBuf {
        self.cache_root.join(layer)
    }

    pub fn tile_path(&self, layer: &str, bucket: &BucketId) -> Utf8PathBuf {
        let file_name = bucket.as_str().replace('/', "-");
        self.layer_dir(layer)
            .join(bucket.year())
            .join(format!("{file_name}.{TILE_EXTENSION}"))
    }

    pub fn static_path(&self, layer: &str) -> Utf8PathBuf {
        self.layer_dir(layer).join(format!("static.{TILE_EXTENSION}"))
    }

    pub fn exists(&self, path: &Utf8Path) -> bool {
        path.as_std_path().is_file()
    }

    pub fn ensure_parent(path: &Utf8Path) -> Result<(), GlobeError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| GlobeError::Filesystem(format!("create {parent}: {err}")))?;
        }
        Ok(())
    }
}

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::GlobeError;
use crate::store::TileStore;

pub const DEFAULT_SETTINGS_FILE: &str = "wms-globe.json";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WmsConfig {
    pub name: String,
    #[serde(default)]
    pub copyright: String,
    pub url: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub pre_fetch: Option<u32>,
    pub layers: String,
}

impl WmsConfig {
    pub fn request(&self) -> String {
        format!(
            "{}&WIDTH={}&HEIGHT={}&LAYERS={}",
            self.url, self.width, self.height, self.layers
        )
    }

    pub fn prefetch(&self) -> u32 {
        self.pre_fetch.unwrap_or(0)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BodySettings {
    pub texture: Utf8PathBuf,
    #[serde(default = "unit_radii")]
    pub radii: [f64; 3],
    pub wms: Vec<WmsConfig>,
}

fn unit_radii() -> [f64; 3] {
    [1.0; 3]
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub map_cache: Option<Utf8PathBuf>,
    #[serde(default)]
    pub bodies: BTreeMap<String, BodySettings>,
}

impl Settings {
    pub fn body(&self, name: &str) -> Result<&BodySettings, GlobeError> {
        self.bodies
            .get(name)
            .ok_or_else(|| GlobeError::UnknownBody(name.to_string()))
    }

    pub fn tile_store(&self) -> Result<TileStore, GlobeError> {
        match &self.map_cache {
            Some(root) => Ok(TileStore::new_with_root(root.clone())),
            None => TileStore::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Properties {
    pub enable_interpolation: bool,
    pub enable_timespan: bool,
}

impl Default for Properties {
    fn default() -> Self {
        Self {
            enable_interpolation: true,
            enable_timespan: false,
        }
    }
}

pub struct SettingsLoader;

impl SettingsLoader {
    pub fn resolve(path: Option<&str>) -> Result<Settings, GlobeError> {
        let settings_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_SETTINGS_FILE),
        };

        if path.is_none() && !settings_path.exists() {
            return Err(GlobeError::MissingConfig);
        }

        let content = fs::read_to_string(&settings_path)
            .map_err(|_| GlobeError::ConfigRead(settings_path.clone()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Settings, GlobeError> {
        let settings: Settings = serde_json::from_str(content)
            .map_err(|err| GlobeError::ConfigParse(err.to_string()))?;
        for (name, body) in &settings.bodies {
            if body.wms.is_empty() {
                return Err(GlobeError::NoDataSets(name.clone()));
            }
        }
        Ok(settings)
    }
}

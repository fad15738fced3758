use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};

use crate::cache::{CacheStats, FetchContext, TileCache};
use crate::clock::BucketClock;
use crate::config::{BodySettings, Properties, WmsConfig};
use crate::domain::{PixelBuffer, TimeInterval};
use crate::error::GlobeError;
use crate::fetch::FetchPipeline;
use crate::interval::parse_time_spec;
use crate::mesh::{SphereGrid, ray_intersection};
use crate::selector::{FrameState, Primary, TemporalTextureSelector, TextureSlot, TextureSink};
use crate::timeline::{TimelineEvent, timeline_events};

enum Mode {
    Timed {
        clock: BucketClock,
        ctx: FetchContext,
    },
    Static {
        pixels: Option<PixelBuffer>,
        uploaded: bool,
    },
}

impl Mode {
    fn empty() -> Self {
        Mode::Static {
            pixels: None,
            uploaded: false,
        }
    }
}

pub struct WmsBody {
    name: String,
    background: Utf8PathBuf,
    radii: [f64; 3],
    grid: SphereGrid,
    data_sets: Vec<WmsConfig>,
    active: WmsConfig,
    request: String,
    mode: Mode,
    cache: TileCache,
    selector: TemporalTextureSelector,
}

impl WmsBody {
    pub fn new(
        name: impl Into<String>,
        settings: BodySettings,
        pipeline: FetchPipeline,
    ) -> Result<Self, GlobeError> {
        let name = name.into();
        let first = settings
            .wms
            .first()
            .cloned()
            .ok_or_else(|| GlobeError::NoDataSets(name.clone()))?;
        let mut body = Self {
            name,
            background: settings.texture,
            radii: settings.radii,
            grid: SphereGrid::default(),
            data_sets: settings.wms,
            request: first.request(),
            active: first.clone(),
            mode: Mode::empty(),
            cache: TileCache::new(pipeline),
            selector: TemporalTextureSelector::new(first.prefetch()),
        };
        if let Err(err) = body.activate(first) {
            tracing::warn!(body = %body.name, error = %err, "initial data set activated without time");
        }
        Ok(body)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn background(&self) -> &Utf8Path {
        &self.background
    }

    pub fn radii(&self) -> [f64; 3] {
        self.radii
    }

    pub fn grid(&self) -> &SphereGrid {
        &self.grid
    }

    pub fn intersection(&self, origin: [f64; 3], direction: [f64; 3]) -> Option<[f64; 3]> {
        ray_intersection(origin, direction, self.radii[0])
    }

    pub fn data_sets(&self) -> &[WmsConfig] {
        &self.data_sets
    }

    pub fn active(&self) -> &WmsConfig {
        &self.active
    }

    pub fn request(&self) -> &str {
        &self.request
    }

    pub fn is_timed(&self) -> bool {
        matches!(self.mode, Mode::Timed { .. })
    }

    pub fn time_intervals(&self) -> &[TimeInterval] {
        match &self.mode {
            Mode::Timed { clock, .. } => clock.intervals(),
            Mode::Static { .. } => &[],
        }
    }

    pub fn timeline_events(&self) -> Vec<TimelineEvent> {
        timeline_events(self.time_intervals(), &self.active.name, &self.name)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    pub fn activate_by_name(&mut self, name: &str) -> Result<(), GlobeError> {
        let config = self
            .data_sets
            .iter()
            .find(|config| config.name == name)
            .cloned()
            .ok_or_else(|| GlobeError::UnknownDataSet(name.to_string()))?;
        self.activate(config)
    }

    /// Switches to `config`, dropping every cached and in-flight bucket of the previous data
    /// set. On a malformed time specification the data set is still activated, without time
    /// dimension, and the parse error is returned.
    pub fn activate(&mut self, config: WmsConfig) -> Result<(), GlobeError> {
        self.cache.invalidate();
        self.request = config.request();
        self.selector.reset(config.prefetch());
        self.active = config;
        tracing::info!(body = %self.name, data_set = %self.active.name, "activating data set");

        let parsed = self
            .active
            .time
            .as_deref()
            .map(|spec| parse_time_spec(spec).and_then(BucketClock::new));

        match parsed {
            Some(Ok(clock)) => {
                self.mode = Mode::Timed {
                    clock,
                    ctx: FetchContext {
                        request: self.request.clone(),
                        layer: self.active.layers.clone(),
                        fallback: self.background.clone(),
                    },
                };
                Ok(())
            }
            Some(Err(err)) => {
                tracing::warn!(data_set = %self.active.name, error = %err, "invalid time specification");
                self.mode = self.load_static();
                Err(err)
            }
            None => {
                self.mode = self.load_static();
                Ok(())
            }
        }
    }

    fn load_static(&self) -> Mode {
        let pipeline = self.cache.pipeline();
        let pixels = pipeline
            .fetch_static(&self.request, &self.active.layers)
            .and_then(|path| pipeline.decode_now(&path));
        match pixels {
            Ok(pixels) => Mode::Static {
                pixels: Some(pixels),
                uploaded: false,
            },
            Err(err) => {
                tracing::warn!(data_set = %self.active.name, error = %err, "static map unavailable");
                Mode::empty()
            }
        }
    }

    /// Advances the body to simulation time `time`. Never blocks on network or decoding.
    pub fn tick(
        &mut self,
        time: DateTime<Utc>,
        properties: Properties,
        sink: &mut dyn TextureSink,
    ) -> FrameState {
        match &mut self.mode {
            Mode::Timed { clock, ctx } => {
                self.selector
                    .tick(time, clock, &mut self.cache, ctx, properties, sink)
            }
            Mode::Static {
                pixels: Some(pixels),
                uploaded,
            } => {
                if !*uploaded {
                    sink.upload(TextureSlot::Primary, pixels, false);
                    *uploaded = true;
                }
                FrameState {
                    primary: Primary::Static,
                    secondary: None,
                    fade: 1.0,
                }
            }
            Mode::Static { pixels: None, .. } => FrameState::background(),
        }
    }
}

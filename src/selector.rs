use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::cache::{FetchContext, TileCache};
use crate::clock::BucketClock;
use crate::config::Properties;
use crate::domain::{BucketId, PixelBuffer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextureSlot {
    Primary,
    Secondary,
}

pub trait TextureSink {
    fn upload(&mut self, slot: TextureSlot, pixels: &PixelBuffer, generate_mipmaps: bool);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "bucket", rename_all = "lowercase")]
pub enum Primary {
    Background,
    Static,
    Tile(BucketId),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameState {
    pub primary: Primary,
    pub secondary: Option<BucketId>,
    pub fade: f32,
}

impl FrameState {
    pub fn background() -> Self {
        Self {
            primary: Primary::Background,
            secondary: None,
            fade: 1.0,
        }
    }

    pub fn uses_map_texture(&self) -> bool {
        self.primary != Primary::Background
    }
}

#[derive(Debug, Default)]
pub struct TemporalTextureSelector {
    prefetch: u32,
    current_primary: Option<BucketId>,
    current_secondary: Option<BucketId>,
}

impl TemporalTextureSelector {
    pub fn new(prefetch: u32) -> Self {
        Self {
            prefetch,
            ..Self::default()
        }
    }

    pub fn prefetch(&self) -> u32 {
        self.prefetch
    }

    pub fn current_primary(&self) -> Option<&BucketId> {
        self.current_primary.as_ref()
    }

    pub fn current_secondary(&self) -> Option<&BucketId> {
        self.current_secondary.as_ref()
    }

    pub fn reset(&mut self, prefetch: u32) {
        *self = Self::new(prefetch);
    }

    pub fn tick(
        &mut self,
        time: DateTime<Utc>,
        clock: &BucketClock,
        cache: &mut TileCache,
        ctx: &FetchContext,
        properties: Properties,
        sink: &mut dyn TextureSink,
    ) -> FrameState {
        let time_span = properties.enable_timespan;
        let duration = clock.duration();

        if let Some(bucket) = clock.resolve(time, time_span) {
            cache.ensure_scheduled(&bucket.id, ctx);
        }
        if duration > 0 {
            // Only offsets whose probe can land inside some interval.
            let (earliest, latest) = clock.span();
            let radius = i64::from(self.prefetch);
            let lowest = -(time - earliest).num_seconds().div_euclid(duration);
            let highest = (latest - time).num_seconds().div_euclid(duration);
            for step in lowest.max(-radius)..=highest.min(radius) {
                if step == 0 {
                    continue;
                }
                let probe = offset_time(time, step, duration);
                if let Some(bucket) = probe.and_then(|probe| clock.resolve(probe, time_span)) {
                    cache.ensure_scheduled(&bucket.id, ctx);
                }
            }
        }

        cache.pump(ctx);

        let Some((bucket, pixels)) = clock
            .resolve(time, time_span)
            .and_then(|bucket| cache.lookup(&bucket.id).map(|pixels| (bucket, pixels)))
        else {
            self.current_primary = None;
            self.current_secondary = None;
            return FrameState::background();
        };

        if self.current_primary.as_ref() != Some(&bucket.id) {
            sink.upload(TextureSlot::Primary, pixels, false);
            self.current_primary = Some(bucket.id.clone());
        }

        let mut frame = FrameState {
            primary: Primary::Tile(bucket.id.clone()),
            secondary: None,
            fade: 1.0,
        };

        if !properties.enable_interpolation || duration == 0 {
            self.current_secondary = None;
            return frame;
        }

        let Some(next_start) = clock.next_bucket_start(bucket.start) else {
            self.current_secondary = None;
            return frame;
        };
        let next_id = clock.bucket_id(next_start, time_span);
        if let Some(pixels) = cache.lookup(&next_id) {
            if self.current_secondary.as_ref() != Some(&next_id) {
                sink.upload(TextureSlot::Secondary, pixels, false);
                self.current_secondary = Some(next_id.clone());
            }
            frame.secondary = Some(next_id);
            frame.fade = fade_weight(time, next_start, duration);
        }
        frame
    }
}

fn offset_time(time: DateTime<Utc>, buckets: i64, duration: i64) -> Option<DateTime<Utc>> {
    buckets
        .checked_mul(duration)
        .and_then(TimeDelta::try_seconds)
        .and_then(|offset| time.checked_add_signed(offset))
}

pub fn fade_weight(time: DateTime<Utc>, next_start: DateTime<Utc>, duration: i64) -> f32 {
    if duration <= 0 {
        return 1.0;
    }
    let remaining = (next_start - time).num_milliseconds() as f64;
    (remaining / (duration as f64 * 1_000.0)).clamp(0.0, 1.0) as f32
}

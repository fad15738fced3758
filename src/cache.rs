use std::collections::HashMap;

use camino::Utf8PathBuf;
use serde::Serialize;

use crate::domain::{BucketId, PixelBuffer};
use crate::fetch::{DecodeHandle, FetchHandle, FetchPipeline};
use crate::pool::TaskPoll;

#[derive(Debug, Clone)]
pub struct FetchContext {
    pub request: String,
    pub layer: String,
    pub fallback: Utf8PathBuf,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub downloading: usize,
    pub decoding: usize,
    pub ready: usize,
}

struct PendingDecode {
    handle: DecodeHandle,
    is_fallback: bool,
}

/// Three-stage bucket cache: downloading -> decoding -> ready.
///
/// The cache lives on the tick thread; workers hand results back through their task
/// handles, so [`TileCache::pump`] only ever polls. Ready buffers are kept until
/// [`TileCache::invalidate`]; there is no eviction, so memory grows with the number of
/// distinct buckets visited while a data set is active.
pub struct TileCache {
    pipeline: FetchPipeline,
    downloading: HashMap<BucketId, FetchHandle>,
    decoding: HashMap<BucketId, PendingDecode>,
    ready: HashMap<BucketId, PixelBuffer>,
}

impl TileCache {
    pub fn new(pipeline: FetchPipeline) -> Self {
        Self {
            pipeline,
            downloading: HashMap::new(),
            decoding: HashMap::new(),
            ready: HashMap::new(),
        }
    }

    pub fn pipeline(&self) -> &FetchPipeline {
        &self.pipeline
    }

    pub fn contains(&self, id: &BucketId) -> bool {
        self.downloading.contains_key(id)
            || self.decoding.contains_key(id)
            || self.ready.contains_key(id)
    }

    pub fn ensure_scheduled(&mut self, id: &BucketId, ctx: &FetchContext) -> bool {
        if self.contains(id) {
            return false;
        }
        let handle = self.pipeline.fetch_to_disk(id, &ctx.request, &ctx.layer);
        self.downloading.insert(id.clone(), handle);
        tracing::trace!(bucket = %id, "scheduled tile");
        true
    }

    pub fn pump(&mut self, ctx: &FetchContext) {
        let finished = self
            .downloading
            .iter()
            .filter_map(|(id, handle)| match handle.poll() {
                TaskPoll::Pending => None,
                TaskPoll::Ready(result) => Some((id.clone(), result.ok())),
                TaskPoll::Lost => Some((id.clone(), None)),
            })
            .collect::<Vec<_>>();
        for (id, path) in finished {
            self.downloading.remove(&id);
            let (path, is_fallback) = match path {
                Some(path) => (path, false),
                None => {
                    tracing::warn!(bucket = %id, "using fallback image for bucket");
                    (ctx.fallback.clone(), true)
                }
            };
            let handle = self.pipeline.decode_from_file(path);
            self.decoding.insert(
                id,
                PendingDecode {
                    handle,
                    is_fallback,
                },
            );
        }

        let decoded = self
            .decoding
            .iter()
            .filter_map(|(id, pending)| match pending.handle.poll() {
                TaskPoll::Pending => None,
                TaskPoll::Ready(result) => Some((id.clone(), pending.is_fallback, result.ok())),
                TaskPoll::Lost => Some((id.clone(), pending.is_fallback, None)),
            })
            .collect::<Vec<_>>();
        for (id, is_fallback, pixels) in decoded {
            self.decoding.remove(&id);
            match (pixels, is_fallback) {
                (Some(pixels), _) => {
                    tracing::debug!(bucket = %id, width = pixels.width, height = pixels.height, "tile ready");
                    self.ready.insert(id, pixels);
                }
                (None, false) => {
                    tracing::warn!(bucket = %id, "tile could not be decoded, using fallback image");
                    let handle = self.pipeline.decode_from_file(ctx.fallback.clone());
                    self.decoding.insert(
                        id,
                        PendingDecode {
                            handle,
                            is_fallback: true,
                        },
                    );
                }
                (None, true) => {
                    tracing::warn!(bucket = %id, fallback = %ctx.fallback, "fallback image unusable");
                    self.ready.insert(id, PixelBuffer::transparent());
                }
            }
        }
    }

    pub fn lookup(&self, id: &BucketId) -> Option<&PixelBuffer> {
        self.ready.get(id)
    }

    pub fn invalidate(&mut self) {
        let stats = self.stats();
        self.pipeline.cancel_pending();
        self.downloading.clear();
        self.decoding.clear();
        self.ready.clear();
        tracing::debug!(?stats, "tile cache invalidated");
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            downloading: self.downloading.len(),
            decoding: self.decoding.len(),
            ready: self.ready.len(),
        }
    }
}

//! Source-generation strategies and the resolver that dispatches them.

use crate::classify::infer_content_tag;
use bridge_traits::playback::{ContentTag, MediaRequest, PlayableSource};
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;

/// One algorithm for turning a request into a playable source handle.
///
/// The resolver owns one strategy instance per supported content tag; the
/// instances are stateless across requests apart from the per-locator
/// generator cache.
pub trait SourceStrategy: Send + Sync {
    /// The content tag this strategy serves.
    fn content_tag(&self) -> ContentTag;

    /// Produce the source handle for `request`.
    fn build_source(&self, request: &MediaRequest) -> PlayableSource;

    /// Replace the header set of the generator cached for `request`'s
    /// locator, so the next build (and the engine's next segment fetch)
    /// carries fresh credentials.
    fn refresh_headers(&self, request: &MediaRequest);
}

/// The cached per-locator generator. Holding it per strategy instance keeps
/// header refreshes cheap; keying it by locator keeps one request's
/// generator from leaking into another request's resolution.
#[derive(Debug, Clone)]
struct SourceGenerator {
    locator: String,
    headers: HashMap<String, String>,
}

impl SourceGenerator {
    fn new(request: &MediaRequest) -> Self {
        Self {
            locator: request.locator.clone(),
            headers: request.headers.clone(),
        }
    }

    fn generate(&self, content_tag: ContentTag) -> PlayableSource {
        PlayableSource {
            locator: self.locator.clone(),
            content_tag,
            headers: self.headers.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct GeneratorSlot {
    inner: Mutex<Option<SourceGenerator>>,
}

impl GeneratorSlot {
    /// Reuse the cached generator when it was built for this locator,
    /// otherwise replace it with a fresh one.
    fn obtain(&self, request: &MediaRequest) -> SourceGenerator {
        let mut slot = self.inner.lock();
        match slot.as_ref() {
            Some(generator) if generator.locator == request.locator => generator.clone(),
            _ => {
                let generator = SourceGenerator::new(request);
                *slot = Some(generator.clone());
                generator
            }
        }
    }

    fn refresh(&self, request: &MediaRequest) {
        let mut slot = self.inner.lock();
        match slot.as_mut() {
            Some(generator) if generator.locator == request.locator => {
                generator.headers = request.headers.clone();
            }
            _ => *slot = Some(SourceGenerator::new(request)),
        }
    }
}

/// Segmented-stream strategy for HLS playlists.
#[derive(Debug, Default)]
pub struct HlsSourceFactory {
    slot: GeneratorSlot,
}

impl SourceStrategy for HlsSourceFactory {
    fn content_tag(&self) -> ContentTag {
        ContentTag::Hls
    }

    fn build_source(&self, request: &MediaRequest) -> PlayableSource {
        self.slot.obtain(request).generate(ContentTag::Hls)
    }

    fn refresh_headers(&self, request: &MediaRequest) {
        self.slot.refresh(request);
    }
}

/// Progressive strategy for single-file media.
#[derive(Debug, Default)]
pub struct ProgressiveSourceFactory {
    slot: GeneratorSlot,
}

impl SourceStrategy for ProgressiveSourceFactory {
    fn content_tag(&self) -> ContentTag {
        ContentTag::Progressive
    }

    fn build_source(&self, request: &MediaRequest) -> PlayableSource {
        self.slot.obtain(request).generate(ContentTag::Progressive)
    }

    fn refresh_headers(&self, request: &MediaRequest) {
        self.slot.refresh(request);
    }
}

/// Dispatches a request to the strategy its classification selects.
#[derive(Debug, Default)]
pub struct MediaSourceResolver {
    hls: HlsSourceFactory,
    progressive: ProgressiveSourceFactory,
}

impl MediaSourceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the strategy for `request`.
    ///
    /// # Panics
    ///
    /// Panics when classification yields a recognized but unmapped type
    /// (DASH, Smooth Streaming). That is a configuration error in the
    /// content pipeline, not a runtime condition to recover from, so it
    /// fails fast instead of being routed through the store.
    pub fn resolve(&self, request: &MediaRequest) -> &dyn SourceStrategy {
        match infer_content_tag(request) {
            ContentTag::Hls => &self.hls,
            ContentTag::Progressive => &self.progressive,
            unsupported => panic!(
                "no media source strategy for content type {unsupported} \
                 (locator {}); only HLS and progressive sources are supported",
                request.locator
            ),
        }
    }

    /// Classify and build in one step.
    pub fn build_source(&self, request: &MediaRequest) -> PlayableSource {
        let strategy = self.resolve(request);
        debug!(locator = %request.locator, tag = %strategy.content_tag(), "building playable source");
        strategy.build_source(request)
    }

    /// Classify and refresh headers in one step.
    pub fn refresh_headers(&self, request: &MediaRequest) {
        self.resolve(request).refresh_headers(request);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authorized(locator: &str, token: &str) -> MediaRequest {
        let mut headers = HashMap::new();
        headers.insert("Authorization".to_string(), token.to_string());
        MediaRequest::new(locator).with_headers(headers)
    }

    #[test]
    fn resolver_selects_by_content_tag() {
        let resolver = MediaSourceResolver::new();

        let hls = MediaRequest::new("https://cdn.example.com/master.m3u8");
        assert_eq!(resolver.resolve(&hls).content_tag(), ContentTag::Hls);

        let mp3 = MediaRequest::new("https://cdn.example.com/book.mp3");
        assert_eq!(resolver.resolve(&mp3).content_tag(), ContentTag::Progressive);
    }

    #[test]
    fn same_request_always_selects_the_same_strategy() {
        let resolver = MediaSourceResolver::new();
        let request = MediaRequest::new("https://cdn.example.com/master.m3u8");

        let first = resolver.resolve(&request).content_tag();
        let second = resolver.resolve(&request).content_tag();
        assert_eq!(first, second);
    }

    #[test]
    #[should_panic(expected = "DASH")]
    fn unmapped_content_type_fails_fast_naming_the_type() {
        let resolver = MediaSourceResolver::new();
        let dash = MediaRequest::new("https://cdn.example.com/manifest.mpd");
        let _ = resolver.resolve(&dash);
    }

    #[test]
    fn built_source_carries_locator_tag_and_headers() {
        let resolver = MediaSourceResolver::new();
        let request = authorized("https://cdn.example.com/master.m3u8", "Bearer abc");

        let source = resolver.build_source(&request);
        assert_eq!(source.locator, request.locator);
        assert_eq!(source.content_tag, ContentTag::Hls);
        assert_eq!(source.headers["Authorization"], "Bearer abc");
    }

    #[test]
    fn generator_is_not_leaked_across_requests() {
        let resolver = MediaSourceResolver::new();

        let first = authorized("https://cdn.example.com/one.mp3", "Bearer one");
        let _ = resolver.build_source(&first);

        // Different locator, no headers: must get a fresh generator, not the
        // cached one with the previous request's credentials.
        let second = MediaRequest::new("https://cdn.example.com/two.mp3");
        let source = resolver.build_source(&second);
        assert!(source.headers.is_empty());
    }

    #[test]
    fn refresh_headers_updates_subsequent_builds_for_the_same_locator() {
        let resolver = MediaSourceResolver::new();

        let original = authorized("https://cdn.example.com/master.m3u8", "Bearer old");
        let _ = resolver.build_source(&original);

        let refreshed = authorized("https://cdn.example.com/master.m3u8", "Bearer new");
        resolver.refresh_headers(&refreshed);

        let source = resolver.build_source(&original.clone());
        assert_eq!(source.headers["Authorization"], "Bearer new");
    }
}

//! Locator classification.

use bridge_traits::playback::{ContentTag, MediaRequest};
use tracing::debug;

/// Infer the content tag for a request.
///
/// Pure function of the locator and the optional extension override: the same
/// request always classifies the same way. The override takes precedence,
/// covering tokenized CDN locators whose path hides the container type.
pub fn infer_content_tag(request: &MediaRequest) -> ContentTag {
    let extension = request
        .extension_override
        .as_deref()
        .unwrap_or_else(|| extension_of(&request.locator));

    let tag = match extension.to_ascii_lowercase().as_str() {
        "mpd" => ContentTag::Dash,
        "ism" | "isml" => ContentTag::SmoothStreaming,
        "m3u8" => ContentTag::Hls,
        _ => ContentTag::Progressive,
    };
    debug!(locator = %request.locator, %tag, "classified media request");
    tag
}

/// Extension of the locator's final path segment, with query string and
/// fragment stripped. Empty when the segment carries no dot.
fn extension_of(locator: &str) -> &str {
    let path = locator.split(['?', '#']).next().unwrap_or(locator);
    let segment = path.rsplit('/').next().unwrap_or(path);
    match segment.rsplit_once('.') {
        Some((_, extension)) => extension,
        None => "",
    }
}

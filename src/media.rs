//! Media URL lookup on raw post JSON.
//!
//! Works on the JSON shape used by the post archives the store is loaded
//! from: `entities.media` and `extended_entities.media`, each an array of
//! objects carrying `type` and `media_url`.

use std::collections::BTreeSet;

use serde_json::Value as Json;

use crate::error::{Error, Result};

/// Media types looked up when the caller does not choose.
pub const DEFAULT_MEDIA_TYPES: &[&str] = &["photo"];

/// Collect the media URLs of `post` whose type is in `types`.
///
/// Returns `Ok(None)` when the post has no `entities.media` block, or when
/// its `extended_entities.media` holds any item of a type outside `types`
/// (mixed-media posts are not split). Otherwise returns the URLs of matching
/// items from both blocks, deduplicated.
///
/// Only a single requested type is supported; more than one is an
/// [`Error::UnsupportedProjection`].
pub fn extract_media_urls(post: &Json, types: &[&str]) -> Result<Option<BTreeSet<String>>> {
    if types.len() > 1 {
        return Err(Error::UnsupportedProjection(format!(
            "media lookup supports one type at a time, got {}",
            types.join(", ")
        )));
    }

    let Some(media) = post.pointer("/entities/media").and_then(Json::as_array) else {
        return Ok(None);
    };

    let extended = post
        .pointer("/extended_entities/media")
        .and_then(Json::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    if !extended.iter().all(|item| is_requested(item, types)) {
        return Ok(None);
    }

    let urls = media
        .iter()
        .chain(extended)
        .filter(|item| is_requested(item, types))
        .filter_map(|item| item.get("media_url").and_then(Json::as_str))
        .map(str::to_string)
        .collect();

    Ok(Some(urls))
}

fn is_requested(item: &Json, types: &[&str]) -> bool {
    item.get("type")
        .and_then(Json::as_str)
        .is_some_and(|kind| types.contains(&kind))
}

use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;

use crate::conv2d::ChannelIndexing;

pub const HARDWARE_PROFILE_VAR: &str = "ROOFLINE_HARDWARE_PROFILE";
pub const CHANNEL_INDEXING_VAR: &str = "ROOFLINE_CHANNEL_INDEXING";

static CHANNEL_INDEXING: OnceLock<ChannelIndexing> = OnceLock::new();

pub(crate) fn parse_channel_indexing(value: &str) -> Option<ChannelIndexing> {
    match value.trim().to_ascii_lowercase().as_str() {
        "source" | "legacy" => Some(ChannelIndexing::Source),
        "conv2d" | "weight" => Some(ChannelIndexing::Conv2d),
        _ => None,
    }
}

/// Channel indexing used by [`crate::Conv2dRoofline::new`]; read once per process.
pub(crate) fn default_channel_indexing() -> ChannelIndexing {
    *CHANNEL_INDEXING.get_or_init(|| match env::var(CHANNEL_INDEXING_VAR) {
        Ok(value) => parse_channel_indexing(&value).unwrap_or_else(|| {
            tracing::warn!(
                var = CHANNEL_INDEXING_VAR,
                %value,
                "unrecognised channel indexing, using source indexing"
            );
            ChannelIndexing::Source
        }),
        Err(_) => ChannelIndexing::Source,
    })
}

pub(crate) fn hardware_profile_path() -> Option<PathBuf> {
    match env::var_os(HARDWARE_PROFILE_VAR) {
        Some(value) if !value.is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}

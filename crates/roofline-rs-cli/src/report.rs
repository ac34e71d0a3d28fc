use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use roofline_rs::{
    ChannelIndexing, Conv2dRoofline, Conv2dStrategy, HardwareProfile, RooflineBreakdown,
    RooflineQuery,
};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct EstimateReport {
    pub key: String,
    pub channel_indexing: ChannelIndexing,
    pub naive: f64,
    pub vectorized: f64,
    pub preferred: Conv2dStrategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<RooflineBreakdown>,
}

pub fn load_query(path: &Path) -> Result<RooflineQuery> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read query {}", path.display()))?;
    parse_query(&json).with_context(|| format!("invalid query {}", path.display()))
}

pub fn parse_query(json: &str) -> Result<RooflineQuery> {
    Ok(serde_json::from_str(json)?)
}

pub fn load_profile(path: Option<&Path>) -> Result<HardwareProfile> {
    match path {
        Some(path) => HardwareProfile::from_path(path)
            .with_context(|| format!("failed to load hardware profile {}", path.display())),
        None => HardwareProfile::from_env().context(
            "no --profile given and ROOFLINE_HARDWARE_PROFILE could not be loaded",
        ),
    }
}

/// Fingerprint line printed by `roofline key`.
pub fn key_line(query: &RooflineQuery) -> String {
    query.key().to_string()
}

/// Description printed by `roofline repr`.
pub fn repr_text(query: &RooflineQuery) -> Result<String> {
    query.repr().context("failed to render query")
}

pub fn estimate_report(
    query: RooflineQuery,
    profile: HardwareProfile,
    channel_indexing: Option<ChannelIndexing>,
    include_breakdown: bool,
) -> Result<EstimateReport> {
    let mut roofline = Conv2dRoofline::new(query, profile)?;
    if let Some(channel_indexing) = channel_indexing {
        roofline = roofline.with_channel_indexing(channel_indexing);
    }

    let breakdown = roofline.breakdown();
    let estimate = breakdown.estimate();
    Ok(EstimateReport {
        key: roofline.key().to_string(),
        channel_indexing: roofline.channel_indexing(),
        naive: estimate.naive,
        vectorized: estimate.vectorized,
        preferred: estimate.preferred(),
        breakdown: include_breakdown.then_some(breakdown),
    })
}

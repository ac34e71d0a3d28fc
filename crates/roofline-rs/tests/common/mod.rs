#![allow(dead_code)]

use roofline_rs::hardware::{MainMemory, MemoryBandwidth};
use roofline_rs::{ChannelIndexing, Conv2dRoofline, HardwareProfile, RooflineQuery};

pub fn reference_profile() -> HardwareProfile {
    HardwareProfile {
        cpu_hz: 1e9,
        cpu_vector_size: 8,
        cache_line_size: 64,
        main_memory: MainMemory {
            approx_latency: 1e-7,
            bandwidth: MemoryBandwidth {
                sequential_read: 1e10,
                sequential_write: 1e10,
            },
        },
    }
}

/// 3x3 conv over a 1x3x8x8 NCHW input producing 1x4x6x6.
pub fn reference_query() -> RooflineQuery {
    RooflineQuery::new(
        &[1, 3, 8, 8],
        &[192, 64, 8, 1],
        &[4, 3, 3, 3],
        &[27, 9, 3, 1],
        &[1, 4, 6, 6],
        4,
    )
    .unwrap_or_else(|err| panic!("unexpected error: {err}"))
}

pub fn roofline(query: RooflineQuery, indexing: ChannelIndexing) -> Conv2dRoofline {
    Conv2dRoofline::new(query, reference_profile())
        .unwrap_or_else(|err| panic!("unexpected error: {err}"))
        .with_channel_indexing(indexing)
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() <= expected.abs() * 1e-12,
        "expected {expected}, got {actual}"
    );
}

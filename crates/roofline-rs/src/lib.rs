//! Roofline cost estimates for choosing a conv2d implementation ahead of execution.
//!
//! ```
//! use roofline_rs::{Conv2dRoofline, HardwareProfile, RooflineQuery};
//!
//! let profile = HardwareProfile::from_json_str(
//!     r#"{
//!         "cpu_hz": 1e9, "cpu_vector_size": 8, "cache_line_size": 64,
//!         "main_memory": {
//!             "approx_latency": 1e-7,
//!             "bandwidth": { "sequential_read": 1e10, "sequential_write": 1e10 }
//!         }
//!     }"#,
//! )?;
//! let query = RooflineQuery::new(
//!     &[1, 3, 8, 8],
//!     &[192, 64, 8, 1],
//!     &[4, 3, 3, 3],
//!     &[27, 9, 3, 1],
//!     &[1, 4, 6, 6],
//!     4,
//! )?;
//! let estimate = Conv2dRoofline::new(query, profile)?.compute();
//! assert!(estimate.vectorized <= estimate.naive);
//! # Ok::<(), roofline_rs::RooflineError>(())
//! ```

pub mod cache;
pub mod conv2d;
mod env;
pub mod error;
pub mod geometry;
pub mod hardware;
pub mod hashing;
pub mod span;

pub use cache::{CachePolicy, CostCache};
pub use conv2d::{
    ChannelIndexing, Conv2dRoofline, Conv2dStrategy, CostEstimate, RooflineBreakdown,
    RooflineQuery,
};
pub use env::{CHANNEL_INDEXING_VAR, HARDWARE_PROFILE_VAR};
pub use error::{RooflineError, RooflineResult, TensorRole};
pub use geometry::{Layout4D, TensorGeometry};
pub use hardware::HardwareProfile;
pub use hashing::RooflineKey;
pub use span::bytes_span;

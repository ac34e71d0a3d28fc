//! Roofline cost model for 2D convolution.
//!
//! A [`Conv2dRoofline`] pairs a [`RooflineQuery`] (tensor sizes, strides and element width) with
//! a [`HardwareProfile`] and predicts the runtime of two implementations:
//!
//! - **naive**: scalar loops that pay a fixed latency for every fetched cache line and are
//!   bounded by the slower of stalled memory traffic and scalar compute;
//! - **vectorized**: a library kernel that hides read latency and vectorizes either the
//!   input-channel reduction or the kernel window, whichever is cheaper.
//!
//! Both numbers are lower-bound style estimates meant for ranking, not for wall-clock
//! prediction.

use std::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};

use crate::error::{RooflineError, RooflineResult, TensorRole};
use crate::geometry::TensorGeometry;
use crate::hardware::HardwareProfile;
use crate::hashing::{FingerprintHasher, RooflineKey};
use crate::span::{checked_bytes_span_or_error, checked_element_count_or_error};

const CONV2D_RANK: usize = 4;

/// Where the compute estimate reads its channel counts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelIndexing {
    /// `C_out = output_sizes[0]`, `C_in = output_sizes[1]`.
    ///
    /// This is how the model was first calibrated. For NCHW outputs these are the batch and
    /// output-channel counts, so the compute term counts the batch twice and never sees the
    /// real input-channel count.
    #[default]
    Source,
    /// `C_out = weight_sizes[0]`, `C_in = weight_sizes[1]` (OIHW weights).
    Conv2d,
}

impl ChannelIndexing {
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelIndexing::Source => "source",
            ChannelIndexing::Conv2d => "conv2d",
        }
    }
}

/// Implementation strategy ranked by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Conv2dStrategy {
    Naive,
    Vectorized,
}

impl Conv2dStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Conv2dStrategy::Naive => "naive",
            Conv2dStrategy::Vectorized => "vectorized",
        }
    }
}

/// Predicted seconds for each strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub naive: f64,
    pub vectorized: f64,
}

impl CostEstimate {
    /// `(naive, vectorized)`.
    pub fn as_pair(self) -> (f64, f64) {
        (self.naive, self.vectorized)
    }

    /// Cheaper strategy; ties go to the naive kernel.
    pub fn preferred(self) -> Conv2dStrategy {
        if self.vectorized < self.naive {
            Conv2dStrategy::Vectorized
        } else {
            Conv2dStrategy::Naive
        }
    }

    pub fn cost_of(self, strategy: Conv2dStrategy) -> f64 {
        match strategy {
            Conv2dStrategy::Naive => self.naive,
            Conv2dStrategy::Vectorized => self.vectorized,
        }
    }
}

/// Every intermediate term of the model. Times are in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RooflineBreakdown {
    pub read_bytes: usize,
    pub write_bytes: usize,
    pub cache_lines_fetched: usize,
    pub read_stall_time: f64,
    pub memory: f64,
    pub memory_with_stalls: f64,
    pub compute_naive: f64,
    pub compute_c_in_vectorized: f64,
    pub compute_kernel_hw_vectorized: f64,
}

impl RooflineBreakdown {
    pub fn compute_vectorized(&self) -> f64 {
        self.compute_c_in_vectorized.min(self.compute_kernel_hw_vectorized)
    }

    pub fn estimate(&self) -> CostEstimate {
        CostEstimate {
            naive: self.memory_with_stalls.max(self.compute_naive),
            vectorized: self.memory.max(self.compute_vectorized()),
        }
    }
}

/// Geometry of one conv2d invocation, captured as plain values.
///
/// Invariants, checked by [`RooflineQuery::new`]: every tensor is rank 4, strides are
/// non-negative, `itemsize > 0`, and all byte counts fit in `usize`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RooflineQuerySpec", into = "RooflineQuerySpec")]
pub struct RooflineQuery {
    input: TensorGeometry,
    weight: TensorGeometry,
    output_sizes: [usize; CONV2D_RANK],
    itemsize: usize,
    read_bytes: usize,
    write_bytes: usize,
}

impl RooflineQuery {
    pub fn new(
        input_sizes: &[usize],
        input_strides: &[i64],
        weight_sizes: &[usize],
        weight_strides: &[i64],
        output_sizes: &[usize],
        itemsize: usize,
    ) -> RooflineResult<Self> {
        let input = TensorGeometry::try_new(TensorRole::Input, input_sizes, input_strides)?;
        let weight = TensorGeometry::try_new(TensorRole::Weight, weight_sizes, weight_strides)?;
        Self::from_geometries(input, weight, output_sizes, itemsize)
    }

    pub fn from_geometries(
        input: TensorGeometry,
        weight: TensorGeometry,
        output_sizes: &[usize],
        itemsize: usize,
    ) -> RooflineResult<Self> {
        require_rank(TensorRole::Input, input.rank())?;
        require_rank(TensorRole::Weight, weight.rank())?;
        require_rank(TensorRole::Output, output_sizes.len())?;
        let output_sizes: [usize; CONV2D_RANK] = output_sizes
            .try_into()
            .map_err(|_| RooflineError::geometry(TensorRole::Output, "expected rank 4"))?;

        if itemsize == 0 {
            return Err(RooflineError::InvalidItemsize {
                itemsize,
                reason: "must be at least one byte".into(),
            });
        }

        let input_bytes = span_of(TensorRole::Input, &input, itemsize)?;
        let weight_bytes = span_of(TensorRole::Weight, &weight, itemsize)?;
        let read_bytes = input_bytes.checked_add(weight_bytes).ok_or_else(|| {
            RooflineError::geometry(TensorRole::Weight, "input and weight spans overflow usize")
        })?;
        let write_bytes = checked_element_count_or_error(&output_sizes, || ())
            .ok()
            .and_then(|numel| numel.checked_mul(itemsize))
            .ok_or_else(|| {
                RooflineError::geometry(TensorRole::Output, "byte count overflows usize")
            })?;

        Ok(RooflineQuery {
            input,
            weight,
            output_sizes,
            itemsize,
            read_bytes,
            write_bytes,
        })
    }

    pub fn input(&self) -> &TensorGeometry {
        &self.input
    }

    pub fn weight(&self) -> &TensorGeometry {
        &self.weight
    }

    pub fn output_sizes(&self) -> &[usize; CONV2D_RANK] {
        &self.output_sizes
    }

    pub fn itemsize(&self) -> usize {
        self.itemsize
    }

    /// Bytes spanned by the input and the weight.
    pub fn read_bytes(&self) -> usize {
        self.read_bytes
    }

    /// Bytes written to the output; only its element count matters.
    pub fn write_bytes(&self) -> usize {
        self.write_bytes
    }

    /// Fingerprint over input sizes and strides, weight sizes and strides, then output sizes.
    ///
    /// Output strides and the element width do not participate.
    pub fn key(&self) -> RooflineKey {
        let mut hasher = FingerprintHasher::new();
        hasher.write_usizes(self.input.sizes());
        hasher.write_usizes(self.input.strides());
        hasher.write_usizes(self.weight.sizes());
        hasher.write_usizes(self.weight.strides());
        hasher.write_usizes(&self.output_sizes);
        hasher.finish()
    }

    /// Fixed-width diagnostic text; see the [`fmt::Display`] impl.
    pub fn repr(&self) -> RooflineResult<String> {
        let mut out = String::new();
        write!(out, "{self}")?;
        Ok(out)
    }
}

impl fmt::Display for RooflineQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Input sizes  (strides):   ")?;
        write_dims(f, self.input.sizes())?;
        write!(f, "     (")?;
        write_dims(f, self.input.strides())?;
        writeln!(f, ")")?;
        write!(f, "Weight sizes (strides):   ")?;
        write_dims(f, self.weight.sizes())?;
        write!(f, "     (")?;
        write_dims(f, self.weight.strides())?;
        writeln!(f, ")")?;
        write!(f, "Output sizes:             ")?;
        write_dims(f, &self.output_sizes)
    }
}

fn write_dims(f: &mut fmt::Formatter<'_>, dims: &[usize]) -> fmt::Result {
    for (idx, dim) in dims.iter().enumerate() {
        if idx > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{dim}")?;
    }
    Ok(())
}

fn require_rank(role: TensorRole, rank: usize) -> RooflineResult<()> {
    if rank == CONV2D_RANK {
        Ok(())
    } else {
        Err(RooflineError::geometry(
            role,
            format!("expected rank {CONV2D_RANK}, got rank {rank}"),
        ))
    }
}

fn span_of(role: TensorRole, geometry: &TensorGeometry, itemsize: usize) -> RooflineResult<usize> {
    checked_bytes_span_or_error(geometry.sizes(), geometry.strides(), itemsize, || {
        RooflineError::geometry(role, "byte span overflows usize")
    })
}

/// Serialized form of a [`RooflineQuery`]; field names follow the runtime tensor metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RooflineQuerySpec {
    input_sizes: Vec<usize>,
    input_strides: Vec<i64>,
    weight_sizes: Vec<usize>,
    weight_strides: Vec<i64>,
    output_sizes: Vec<usize>,
    itemsize: usize,
}

impl TryFrom<RooflineQuerySpec> for RooflineQuery {
    type Error = RooflineError;

    fn try_from(spec: RooflineQuerySpec) -> Result<Self, Self::Error> {
        RooflineQuery::new(
            &spec.input_sizes,
            &spec.input_strides,
            &spec.weight_sizes,
            &spec.weight_strides,
            &spec.output_sizes,
            spec.itemsize,
        )
    }
}

impl From<RooflineQuery> for RooflineQuerySpec {
    fn from(query: RooflineQuery) -> Self {
        let signed = |strides: &[usize]| strides.iter().map(|&s| s as i64).collect();
        RooflineQuerySpec {
            input_strides: signed(query.input.strides()),
            weight_strides: signed(query.weight.strides()),
            input_sizes: query.input.sizes().to_vec(),
            weight_sizes: query.weight.sizes().to_vec(),
            output_sizes: query.output_sizes.to_vec(),
            itemsize: query.itemsize,
        }
    }
}

/// A conv2d query bound to the hardware it will run on.
#[derive(Debug, Clone, PartialEq)]
pub struct Conv2dRoofline {
    query: RooflineQuery,
    profile: HardwareProfile,
    channel_indexing: ChannelIndexing,
}

impl Conv2dRoofline {
    /// Binds `query` to `profile` using the process-wide channel indexing
    /// (`ROOFLINE_CHANNEL_INDEXING`, source indexing when unset).
    pub fn new(query: RooflineQuery, profile: HardwareProfile) -> RooflineResult<Self> {
        profile.validate()?;
        if query.itemsize() > profile.cache_line_size {
            return Err(RooflineError::InvalidItemsize {
                itemsize: query.itemsize(),
                reason: format!("exceeds the {}-byte cache line", profile.cache_line_size),
            });
        }

        let roofline = Conv2dRoofline {
            query,
            profile,
            channel_indexing: crate::env::default_channel_indexing(),
        };
        tracing::debug!(
            key = %roofline.key(),
            channel_indexing = roofline.channel_indexing.as_str(),
            "bound conv2d roofline"
        );
        Ok(roofline)
    }

    pub fn with_channel_indexing(mut self, channel_indexing: ChannelIndexing) -> Self {
        self.channel_indexing = channel_indexing;
        self
    }

    pub fn query(&self) -> &RooflineQuery {
        &self.query
    }

    pub fn profile(&self) -> &HardwareProfile {
        &self.profile
    }

    pub fn channel_indexing(&self) -> ChannelIndexing {
        self.channel_indexing
    }

    pub fn key(&self) -> RooflineKey {
        self.query.key()
    }

    pub fn repr(&self) -> RooflineResult<String> {
        self.query.repr()
    }

    /// `(C_out, C_in)` as read by the compute estimate.
    pub fn channels(&self) -> (usize, usize) {
        match self.channel_indexing {
            ChannelIndexing::Source => (self.query.output_sizes[0], self.query.output_sizes[1]),
            ChannelIndexing::Conv2d => {
                let weight = self.query.weight.sizes();
                (weight[0], weight[1])
            }
        }
    }

    pub fn breakdown(&self) -> RooflineBreakdown {
        let query = &self.query;
        let profile = &self.profile;
        let memory_profile = &profile.main_memory;

        let read_bytes = query.read_bytes;
        let write_bytes = query.write_bytes;

        let elements_per_cache_line = profile.elements_per_cache_line(query.itemsize);
        let cache_lines_fetched = read_bytes.div_ceil(elements_per_cache_line);
        let read_stall_time = cache_lines_fetched as f64 * memory_profile.approx_latency;

        let memory = read_bytes as f64 / memory_profile.bandwidth.sequential_read
            + write_bytes as f64 / memory_profile.bandwidth.sequential_write;
        let memory_with_stalls = memory + read_stall_time;

        let n = query.input.sizes()[0];
        let (c_out, c_in) = self.channels();
        let weight = query.weight.sizes();
        let kernel_hw = weight[2].saturating_mul(weight[3]);
        let output_hw = query.output_sizes[2].saturating_mul(query.output_sizes[3]);

        let vector = profile.cpu_vector_size;
        let c_in_vectorized = c_in.div_ceil(vector);
        let kernel_hw_vectorized = kernel_hw.div_ceil(vector);

        let cycles = |c_in: usize, kernel_hw: usize| {
            n as f64 * c_in as f64 * c_out as f64 * kernel_hw as f64 * output_hw as f64
        };
        let compute_naive = cycles(c_in, kernel_hw) / profile.cpu_hz;
        let compute_c_in_vectorized = cycles(c_in_vectorized, kernel_hw) / profile.cpu_hz;
        let compute_kernel_hw_vectorized = cycles(c_in, kernel_hw_vectorized) / profile.cpu_hz;

        RooflineBreakdown {
            read_bytes,
            write_bytes,
            cache_lines_fetched,
            read_stall_time,
            memory,
            memory_with_stalls,
            compute_naive,
            compute_c_in_vectorized,
            compute_kernel_hw_vectorized,
        }
    }

    /// Predicted `(naive, vectorized)` seconds.
    pub fn compute(&self) -> CostEstimate {
        let breakdown = self.breakdown();
        let estimate = breakdown.estimate();
        tracing::trace!(
            key = %self.key(),
            naive = estimate.naive,
            vectorized = estimate.vectorized,
            naive_memory_bound = breakdown.memory_with_stalls >= breakdown.compute_naive,
            vectorized_memory_bound = breakdown.memory >= breakdown.compute_vectorized(),
            "conv2d roofline estimate"
        );
        estimate
    }
}

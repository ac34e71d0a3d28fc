mod common;

use common::{assert_close, reference_profile, reference_query, roofline};
use roofline_rs::{
    ChannelIndexing, Conv2dRoofline, Conv2dStrategy, Layout4D, RooflineError, RooflineQuery,
    TensorGeometry, TensorRole,
};

#[test]
fn reference_conv_with_source_indexing() {
    let estimate = roofline(reference_query(), ChannelIndexing::Source).compute();
    assert_close(estimate.naive, 7.6776e-6);
    assert_close(estimate.vectorized, 2.88e-7);
    assert!(estimate.naive.is_finite() && estimate.naive > 0.0);
    assert!(estimate.vectorized.is_finite() && estimate.vectorized > 0.0);
    assert_eq!(estimate.preferred(), Conv2dStrategy::Vectorized);
}

#[test]
fn reference_conv_with_conv2d_indexing() {
    let roofline = roofline(reference_query(), ChannelIndexing::Conv2d);
    let breakdown = roofline.breakdown();
    assert_close(breakdown.compute_naive, 3.888e-6);
    assert_close(breakdown.compute_c_in_vectorized, 1.296e-6);
    assert_close(breakdown.compute_kernel_hw_vectorized, 8.64e-7);

    let estimate = roofline.compute();
    assert_close(estimate.naive, 7.6776e-6);
    assert_close(estimate.vectorized, 8.64e-7);
}

#[test]
fn compute_equals_breakdown_estimate() {
    let roofline = roofline(reference_query(), ChannelIndexing::Source);
    assert_eq!(roofline.compute(), roofline.breakdown().estimate());
}

#[test]
fn minimal_compute_is_memory_bound() {
    let query = RooflineQuery::new(
        &[1, 1, 4, 4],
        &[16, 16, 4, 1],
        &[1, 1, 1, 1],
        &[1, 1, 1, 1],
        &[1, 1, 4, 4],
        4,
    )
    .unwrap_or_else(|err| panic!("unexpected error: {err}"));

    for indexing in [ChannelIndexing::Source, ChannelIndexing::Conv2d] {
        let roofline = roofline(query.clone(), indexing);
        let breakdown = roofline.breakdown();
        assert_eq!(breakdown.read_bytes, 68);
        assert_eq!(breakdown.cache_lines_fetched, 5);
        assert_eq!(roofline.compute().naive, breakdown.memory_with_stalls);
    }
}

#[test]
fn vectorized_kernel_hides_read_stalls() {
    let roofline = roofline(reference_query(), ChannelIndexing::Source);
    let breakdown = roofline.breakdown();
    assert!(breakdown.memory < breakdown.memory_with_stalls);
    assert_close(
        breakdown.memory_with_stalls - breakdown.memory,
        breakdown.read_stall_time,
    );
}

#[test]
fn asymmetric_bandwidth_weights_reads_and_writes_separately() {
    let mut profile = reference_profile();
    profile.main_memory.bandwidth.sequential_write = 1e9;
    let roofline = Conv2dRoofline::new(reference_query(), profile)
        .unwrap_or_else(|err| panic!("unexpected error: {err}"));
    assert_close(roofline.breakdown().memory, 1200.0 / 1e10 + 576.0 / 1e9);
}

#[test]
fn channels_last_input_spans_the_same_bytes() {
    let weight = TensorGeometry::contiguous(vec![4, 3, 3, 3]);
    let nchw = RooflineQuery::from_geometries(
        TensorGeometry::with_layout([1, 3, 8, 8], Layout4D::NCHW),
        weight.clone(),
        &[1, 4, 6, 6],
        4,
    )
    .unwrap_or_else(|err| panic!("unexpected error: {err}"));
    let nhwc = RooflineQuery::from_geometries(
        TensorGeometry::with_layout([1, 3, 8, 8], Layout4D::NHWC),
        weight,
        &[1, 4, 6, 6],
        4,
    )
    .unwrap_or_else(|err| panic!("unexpected error: {err}"));

    assert_eq!(nchw, reference_query());
    assert_eq!(nchw.read_bytes(), nhwc.read_bytes());
    assert_ne!(nchw.key(), nhwc.key());
    assert_eq!(
        roofline(nchw, ChannelIndexing::Source).compute(),
        roofline(nhwc, ChannelIndexing::Source).compute()
    );
}

#[test]
fn strided_input_view_reads_more_bytes() {
    // Every other column of a 1x3x8x16 buffer.
    let strided = RooflineQuery::new(
        &[1, 3, 8, 8],
        &[384, 128, 16, 2],
        &[4, 3, 3, 3],
        &[27, 9, 3, 1],
        &[1, 4, 6, 6],
        4,
    )
    .unwrap_or_else(|err| panic!("unexpected error: {err}"));
    assert_eq!(strided.read_bytes(), (1 + 2 * 128 + 7 * 16 + 7 * 2) * 4 + 432);
    assert!(strided.read_bytes() > reference_query().read_bytes());
}

#[test]
fn key_is_deterministic_and_ignores_itemsize() {
    let query = reference_query();
    assert_eq!(query.key(), reference_query().key());

    let wide = RooflineQuery::new(
        &[1, 3, 8, 8],
        &[192, 64, 8, 1],
        &[4, 3, 3, 3],
        &[27, 9, 3, 1],
        &[1, 4, 6, 6],
        8,
    )
    .unwrap_or_else(|err| panic!("unexpected error: {err}"));
    assert_eq!(query.key(), wide.key());
    assert_eq!(
        roofline(query, ChannelIndexing::Source).key(),
        reference_query().key()
    );
}

#[test]
fn key_is_stable_across_processes() {
    assert_eq!(reference_query().key().as_u64(), 0xdb20_5adc_e18b_4e2f);
    assert_eq!(reference_query().key().to_string(), "0xdb205adce18b4e2f");
}

#[test]
fn key_is_sensitive_to_dimension_order() {
    let permuted = RooflineQuery::new(
        &[1, 3, 8, 8],
        &[192, 64, 8, 1],
        &[4, 3, 3, 3],
        &[27, 9, 3, 1],
        &[1, 6, 6, 4],
        4,
    )
    .unwrap_or_else(|err| panic!("unexpected error: {err}"));
    assert_ne!(permuted.key(), reference_query().key());
}

#[test]
fn repr_renders_fixed_width_table() {
    let text = reference_query()
        .repr()
        .unwrap_or_else(|err| panic!("unexpected error: {err}"));
    assert_eq!(
        text,
        "Input sizes  (strides):   1, 3, 8, 8     (192, 64, 8, 1)\n\
         Weight sizes (strides):   4, 3, 3, 3     (27, 9, 3, 1)\n\
         Output sizes:             1, 4, 6, 6"
    );
    assert_eq!(reference_query().to_string(), text);
}

#[test]
fn query_round_trips_through_json() {
    let json = r#"{
        "input_sizes": [1, 3, 8, 8],
        "input_strides": [192, 64, 8, 1],
        "weight_sizes": [4, 3, 3, 3],
        "weight_strides": [27, 9, 3, 1],
        "output_sizes": [1, 4, 6, 6],
        "itemsize": 4
    }"#;
    let query: RooflineQuery =
        serde_json::from_str(json).unwrap_or_else(|err| panic!("unexpected error: {err}"));
    assert_eq!(query, reference_query());

    let encoded = serde_json::to_string(&query).unwrap_or_else(|err| panic!("{err}"));
    let decoded: RooflineQuery =
        serde_json::from_str(&encoded).unwrap_or_else(|err| panic!("unexpected error: {err}"));
    assert_eq!(decoded, query);
}

#[test]
fn json_query_with_negative_stride_is_rejected() {
    let json = r#"{
        "input_sizes": [1, 3, 8, 8],
        "input_strides": [192, 64, -8, 1],
        "weight_sizes": [4, 3, 3, 3],
        "weight_strides": [27, 9, 3, 1],
        "output_sizes": [1, 4, 6, 6],
        "itemsize": 4
    }"#;
    let err = serde_json::from_str::<RooflineQuery>(json).expect_err("negative stride");
    assert!(err.to_string().contains("negative stride -8 on axis 2"), "{err}");
}

#[test]
fn rejects_non_rank4_tensors() {
    let err = RooflineQuery::new(
        &[1, 3, 8],
        &[24, 8, 1],
        &[4, 3, 3, 3],
        &[27, 9, 3, 1],
        &[1, 4, 6, 6],
        4,
    )
    .expect_err("rank 3 input");
    assert!(matches!(
        err,
        RooflineError::InvalidGeometry {
            tensor: TensorRole::Input,
            ..
        }
    ));

    let err = RooflineQuery::new(
        &[1, 3, 8, 8],
        &[192, 64, 8, 1],
        &[4, 3, 3, 3],
        &[27, 9, 3, 1],
        &[1, 4, 36],
        4,
    )
    .expect_err("rank 3 output");
    assert_eq!(
        err.to_string(),
        "invalid output geometry: expected rank 4, got rank 3"
    );
}

#[test]
fn rejects_zero_itemsize() {
    let err = RooflineQuery::new(
        &[1, 3, 8, 8],
        &[192, 64, 8, 1],
        &[4, 3, 3, 3],
        &[27, 9, 3, 1],
        &[1, 4, 6, 6],
        0,
    )
    .expect_err("zero itemsize");
    assert!(matches!(err, RooflineError::InvalidItemsize { itemsize: 0, .. }));
}

#[test]
fn rejects_overflowing_span() {
    let err = RooflineQuery::new(
        &[1, 3, 8, 8],
        &[192, i64::MAX, 8, 1],
        &[4, 3, 3, 3],
        &[27, 9, 3, 1],
        &[1, 4, 6, 6],
        4,
    )
    .expect_err("span overflow");
    assert!(matches!(
        err,
        RooflineError::InvalidGeometry {
            tensor: TensorRole::Input,
            ..
        }
    ));
}

#[test]
fn rejects_invalid_profile() {
    let mut profile = reference_profile();
    profile.cpu_hz = f64::NAN;
    let err = Conv2dRoofline::new(reference_query(), profile).expect_err("nan clock");
    assert!(matches!(
        err,
        RooflineError::InvalidProfile {
            field: "cpu_hz",
            ..
        }
    ));
}

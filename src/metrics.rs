use std::sync::LazyLock;

use prometheus::*;

static METRIC_REQUEST_COUNT: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "card_request_count",
        "count of handled requests",
        &["endpoint", "outcome"]
    )
    .unwrap()
});

static METRIC_SIMILAR_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "card_similar_duration",
        "duration of the similarity search in seconds",
        &["metric"]
    )
    .unwrap()
});

static METRIC_RESULT_SIZE: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "card_result_size",
        "number of cards returned per request",
        &["endpoint"],
        (0..=20).map(|x| x as f64).collect()
    )
    .unwrap()
});

/// 记录一次请求的结果
pub fn inc_request(endpoint: &str, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    METRIC_REQUEST_COUNT.with_label_values(&[endpoint, outcome]).inc();
}

pub fn observe_similar_duration(metric: &str, duration: f32) {
    METRIC_SIMILAR_DURATION.with_label_values(&[metric]).observe(duration as f64);
}

pub fn observe_result_size(endpoint: &str, size: usize) {
    METRIC_RESULT_SIZE.with_label_values(&[endpoint]).observe(size as f64);
}

/// 以文本格式导出所有指标
pub fn gather() -> Result<String> {
    let mut buffer = vec![];
    TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

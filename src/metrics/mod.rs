use lazy_static::lazy_static;
use prometheus::exponential_buckets;
use prometheus::Encoder;
use prometheus::HistogramOpts;
use prometheus::HistogramVec;
use prometheus::IntCounter;
use prometheus::IntCounterVec;
use prometheus::Opts;
use prometheus::Registry;
use tracing::error;


lazy_static! {
    pub static ref HANDLES_CREATED: IntCounter =
        IntCounter::new("handles_created", "Map handles loaded from a mapfile")
            .expect("metric can not be created");

    pub static ref HANDLES_REUSED: IntCounter =
        IntCounter::new("handles_reused", "Map handles adopted from an idle queue")
            .expect("metric can not be created");

    pub static ref HANDLES_RELEASED: IntCounterVec = IntCounterVec::new(
        Opts::new("handles_released", "Map handles taken out of the pool, by reason"),
        &["reason"]
    )
    .expect("metric can not be created");

    pub static ref RELEASE_FAILURES: IntCounter =
        IntCounter::new("release_failures", "Engine releases of dropped map handles that failed")
            .expect("metric can not be created");

    pub static ref FLUSHES: IntCounter =
        IntCounter::new("flushes", "Pool invalidations triggered by mapfile changes")
            .expect("metric can not be created");

    pub static ref RECLAIM_SCANS: IntCounter =
        IntCounter::new("reclaim_scans", "Scans for handles of exited threads")
            .expect("metric can not be created");

    pub static ref REQUEST_DURATION_MS: HistogramVec = HistogramVec::new(
        HistogramOpts::new("request_duration_ms", "Histogram of render request duration in ms")
            .buckets(exponential_buckets(1.0, 2.0, 16).expect("valid buckets")),
        &["status"]
    )
    .expect("metric can not be created");
}

/// Registers every pool collector with `registry`.
pub fn register_custom_metrics(registry: &Registry) -> prometheus::Result<()> {
    registry.register(Box::new(HANDLES_CREATED.clone()))?;
    registry.register(Box::new(HANDLES_REUSED.clone()))?;
    registry.register(Box::new(HANDLES_RELEASED.clone()))?;
    registry.register(Box::new(RELEASE_FAILURES.clone()))?;
    registry.register(Box::new(FLUSHES.clone()))?;
    registry.register(Box::new(RECLAIM_SCANS.clone()))?;
    registry.register(Box::new(REQUEST_DURATION_MS.clone()))?;
    Ok(())
}

/// Text exposition of `registry` for Prometheus to scrape
pub fn gather_metrics(registry: &Registry) -> String {
    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        error!("could not encode custom metrics: {}", e);
    }
    match String::from_utf8(buffer) {
        Ok(v) => v,
        Err(e) => {
            error!("custom metrics could not be from_utf8'd: {}", e);
            String::default()
        }
    }
}

use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::cache::{METRIC_EVICT, METRIC_HIT, METRIC_INVALIDATED, METRIC_MISS};
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install the global tracing subscriber and describe the feed cache metrics.
///
/// `RUST_LOG` directives refine the configured base level.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_HIT,
            Unit::Count,
            "Total number of feed pages served from the cache."
        );
        describe_counter!(
            METRIC_MISS,
            Unit::Count,
            "Total number of feed page lookups that missed the cache."
        );
        describe_counter!(
            METRIC_EVICT,
            Unit::Count,
            "Total number of cached feed pages evicted due to capacity."
        );
        describe_counter!(
            METRIC_INVALIDATED,
            Unit::Count,
            "Total number of cached feed pages dropped by invalidation."
        );
    });
}

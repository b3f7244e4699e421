//! # Telemetry
//!
//! Console logging is always on. OpenTelemetry export is opt-in through cargo
//! features.
//!
//! ## Feature matrix
//!
//! - `tracing`: OpenTelemetry distributed tracing (spans).
//! - `metrics`: OpenTelemetry metrics (counters, histograms).
//! - `honeycomb`: Honeycomb OTLP exporter.
//! - `stdout`: stdout exporter.
//!
//! Exporters require at least one of `tracing` or `metrics`. `honeycomb` and
//! `stdout` can be combined.
//!
//! ## Instruments
//!
//! | Name | Kind | Attributes |
//! |---|---|---|
//! | `fibonacci_calculation_duration` | histogram (ns) | |
//! | `fibonacci_calculations_total` | counter | `n` |
//! | `fibonacci_stream_calculation_duration` | histogram (ns) | |
//! | `fibonacci_stream_calculations_total` | counter | `n`, `chunk_size` |
//! | `requests` | counter | `method` |
//! | `errors` | counter | `method` |
//! | `streams_inflight` | up/down counter | |
//!
//! The first four are fed by [`OtelMetrics`], the engine's metrics sink, and
//! therefore only count successful computations.
//!
//! ## Example usage
//!
//! ```bash
//! cargo run --features tracing,metrics,stdout
//! HONEYCOMB_API_KEY=... HONEYCOMB_DATASET=... HONEYCOMB_ENDPOINT=... \
//!   HONEYCOMB_COMPRESSION=zstd cargo run --features tracing,honeycomb
//! ```

#[cfg(all(
    feature = "honeycomb",
    not(any(feature = "tracing", feature = "metrics"))
))]
compile_error!(
    "The 'honeycomb' feature requires at least one of 'tracing' or 'metrics' to be enabled."
);

#[cfg(all(feature = "stdout", not(any(feature = "tracing", feature = "metrics"))))]
compile_error!(
    "The 'stdout' feature requires at least one of 'tracing' or 'metrics' to be enabled."
);

use core::time::Duration;
use fibstream::MetricsSink;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(all(feature = "honeycomb", any(feature = "metrics", feature = "tracing")))]
use opentelemetry_otlp::{Compression, Protocol, WithExportConfig, WithTonicConfig};
#[cfg(all(feature = "honeycomb", feature = "metrics"))]
use opentelemetry_sdk::metrics::Temporality;
#[cfg(feature = "honeycomb")]
use tonic::metadata::MetadataMap;
#[cfg(all(feature = "honeycomb", any(feature = "metrics", feature = "tracing")))]
use tonic::transport::ClientTlsConfig;

#[cfg(feature = "metrics")]
use opentelemetry::metrics::{Counter, Histogram, Meter, UpDownCounter};
#[cfg(feature = "metrics")]
use opentelemetry_sdk::metrics as sdkmetrics;
#[cfg(feature = "metrics")]
use std::sync::OnceLock;

#[cfg(any(feature = "metrics", feature = "tracing"))]
use opentelemetry::{InstrumentationScope, KeyValue};
#[cfg(any(feature = "metrics", feature = "tracing"))]
use opentelemetry_sdk::Resource;
#[cfg(any(feature = "metrics", feature = "tracing"))]
use opentelemetry_semantic_conventions as semvcns;

#[cfg(feature = "tracing")]
use opentelemetry::trace::TracerProvider;
#[cfg(feature = "tracing")]
use opentelemetry_sdk::propagation::TraceContextPropagator;
#[cfg(feature = "tracing")]
use opentelemetry_sdk::trace as sdktrace;

const SERVICE_NAME: &str = "fibstream";

pub struct TelemetryProviders {
    #[cfg(feature = "tracing")]
    pub tracer_provider: sdktrace::SdkTracerProvider,
    #[cfg(feature = "metrics")]
    pub meter_provider: sdkmetrics::SdkMeterProvider,
}

impl TelemetryProviders {
    /// Flushes and shuts down every enabled provider. Failures are printed,
    /// since the subscriber may already be gone.
    pub fn shutdown(self) {
        #[cfg(feature = "tracing")]
        {
            if let Err(err) = self.tracer_provider.force_flush() {
                eprintln!("Error flushing traces: {err:#?}");
            }
            if let Err(err) = self.tracer_provider.shutdown() {
                eprintln!("Error shutting down tracer: {err:#?}");
            }
        }

        #[cfg(feature = "metrics")]
        {
            if let Err(err) = self.meter_provider.force_flush() {
                eprintln!("Error flushing metrics: {err:#?}");
            }
            if let Err(err) = self.meter_provider.shutdown() {
                eprintln!("Error shutting down meter: {err:#?}");
            }
        }
    }
}

pub fn init_telemetry() -> anyhow::Result<TelemetryProviders> {
    #[cfg(feature = "tracing")]
    opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());

    #[cfg(feature = "tracing")]
    let tracer_provider = init_tracer()?;

    #[cfg(feature = "metrics")]
    let meter_provider = init_metrics()?;

    #[cfg(any(feature = "metrics", feature = "tracing"))]
    let scope = InstrumentationScope::builder(SERVICE_NAME)
        .with_version(env!("CARGO_PKG_VERSION"))
        .with_schema_url(semvcns::SCHEMA_URL)
        .build();

    // Human-readable console output, independent of any OTLP exporter.
    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_line_number(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .with_file(true)
                .pretty(),
        );

    #[cfg(feature = "tracing")]
    let registry = {
        opentelemetry::global::set_tracer_provider(tracer_provider.clone());
        registry.with(
            tracing_opentelemetry::layer()
                .with_tracer(tracer_provider.tracer_with_scope(scope.clone()))
                .with_error_records_to_exceptions(true),
        )
    };

    #[cfg(feature = "metrics")]
    let registry = {
        opentelemetry::global::set_meter_provider(meter_provider.clone());
        let meter = opentelemetry::global::meter_with_scope(scope);
        init_metric_handles(&meter);

        registry.with(tracing_opentelemetry::MetricsLayer::new(
            meter_provider.clone(),
        ))
    };

    registry.init();

    Ok(TelemetryProviders {
        #[cfg(feature = "tracing")]
        tracer_provider,
        #[cfg(feature = "metrics")]
        meter_provider,
    })
}

/// Connection settings shared by the Honeycomb span and metric exporters.
#[cfg(feature = "honeycomb")]
struct HoneycombConfig {
    metadata: MetadataMap,
    endpoint: String,
    compression: Compression,
}

#[cfg(feature = "honeycomb")]
impl HoneycombConfig {
    fn from_env() -> anyhow::Result<Self> {
        use anyhow::Context;
        use std::str::FromStr;

        let api_key = std::env::var("HONEYCOMB_API_KEY").context("missing `HONEYCOMB_API_KEY`")?;
        let dataset = std::env::var("HONEYCOMB_DATASET").context("missing `HONEYCOMB_DATASET`")?;
        let endpoint =
            std::env::var("HONEYCOMB_ENDPOINT").context("missing `HONEYCOMB_ENDPOINT`")?;
        let compression = std::env::var("HONEYCOMB_COMPRESSION")
            .context("missing `HONEYCOMB_COMPRESSION`")?
            .to_ascii_lowercase();

        let mut metadata = MetadataMap::new();
        metadata.insert(
            "x-honeycomb-team",
            api_key.parse().context("invalid API key")?,
        );
        metadata.insert(
            "x-honeycomb-dataset",
            dataset.parse().context("invalid dataset")?,
        );

        Ok(Self {
            metadata,
            endpoint,
            compression: Compression::from_str(&compression)?,
        })
    }
}

#[cfg(any(feature = "metrics", feature = "tracing"))]
fn resource() -> Resource {
    Resource::builder()
        .with_service_name(SERVICE_NAME)
        .with_schema_url(
            [KeyValue::new(
                semvcns::resource::SERVICE_VERSION,
                env!("CARGO_PKG_VERSION"),
            )],
            semvcns::SCHEMA_URL,
        )
        .build()
}

#[cfg(feature = "metrics")]
fn init_metrics() -> anyhow::Result<sdkmetrics::SdkMeterProvider> {
    let builder = sdkmetrics::SdkMeterProvider::builder().with_resource(resource());

    #[cfg(feature = "stdout")]
    let builder = {
        let exporter = opentelemetry_stdout::MetricExporter::default();
        let reader = sdkmetrics::PeriodicReader::builder(exporter)
            .with_interval(Duration::from_secs(5))
            .build();
        builder.with_reader(reader)
    };

    #[cfg(feature = "honeycomb")]
    let builder = {
        use anyhow::Context;

        let honeycomb = HoneycombConfig::from_env()?;
        let exporter = opentelemetry_otlp::MetricExporter::builder()
            .with_tonic()
            .with_tls_config(ClientTlsConfig::new().with_native_roots())
            .with_metadata(honeycomb.metadata)
            .with_timeout(Duration::from_secs(10))
            .with_compression(honeycomb.compression)
            .with_endpoint(honeycomb.endpoint)
            .with_protocol(Protocol::Grpc)
            .with_temporality(Temporality::Delta)
            .build()
            .context("failed to build metrics exporter")?;
        builder.with_periodic_exporter(exporter)
    };

    Ok(builder.build())
}

#[cfg(all(feature = "tracing", any(feature = "stdout", feature = "honeycomb")))]
fn batch_processor<E>(exporter: E) -> sdktrace::BatchSpanProcessor
where
    E: sdktrace::SpanExporter + Send + Sync + 'static,
{
    sdktrace::BatchSpanProcessor::builder(exporter)
        .with_batch_config(
            sdktrace::BatchConfigBuilder::default()
                .with_scheduled_delay(Duration::from_secs(5))
                .with_max_queue_size(2048)
                .build(),
        )
        .build()
}

#[cfg(feature = "tracing")]
fn init_tracer() -> anyhow::Result<sdktrace::SdkTracerProvider> {
    let builder = sdktrace::SdkTracerProvider::builder().with_resource(resource());

    #[cfg(feature = "stdout")]
    let builder =
        builder.with_span_processor(batch_processor(opentelemetry_stdout::SpanExporter::default()));

    #[cfg(feature = "honeycomb")]
    let builder = {
        use anyhow::Context;

        let honeycomb = HoneycombConfig::from_env()?;
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_tls_config(ClientTlsConfig::new().with_native_roots())
            .with_metadata(honeycomb.metadata)
            .with_timeout(Duration::from_secs(10))
            .with_compression(honeycomb.compression)
            .with_endpoint(honeycomb.endpoint)
            .with_protocol(Protocol::Grpc)
            .build()
            .context("failed to build tracer exporter")?;
        builder.with_span_processor(batch_processor(exporter))
    };

    Ok(builder.build())
}

#[cfg(feature = "metrics")]
struct Instruments {
    calculation_duration: Histogram<f64>,
    calculations_total: Counter<u64>,
    stream_calculation_duration: Histogram<f64>,
    stream_calculations_total: Counter<u64>,
    requests: Counter<u64>,
    errors: Counter<u64>,
    streams_inflight: UpDownCounter<i64>,
}

#[cfg(feature = "metrics")]
static INSTRUMENTS: OnceLock<Instruments> = OnceLock::new();

#[cfg(feature = "metrics")]
fn init_metric_handles(meter: &Meter) {
    let _ = INSTRUMENTS.set(Instruments {
        calculation_duration: meter
            .f64_histogram("fibonacci_calculation_duration")
            .with_unit("ns")
            .with_description("Time spent computing a full Fibonacci sequence")
            .build(),
        calculations_total: meter
            .u64_counter("fibonacci_calculations_total")
            .with_description("Completed full-sequence computations")
            .build(),
        stream_calculation_duration: meter
            .f64_histogram("fibonacci_stream_calculation_duration")
            .with_unit("ns")
            .with_description("Time spent streaming a Fibonacci sequence")
            .build(),
        stream_calculations_total: meter
            .u64_counter("fibonacci_stream_calculations_total")
            .with_description("Completed streamed computations")
            .build(),
        requests: meter
            .u64_counter("requests")
            .with_description("Total gRPC requests")
            .build(),
        errors: meter
            .u64_counter("errors")
            .with_description("Failed or cancelled requests")
            .build(),
        streams_inflight: meter
            .i64_up_down_counter("streams_inflight")
            .with_description("Concurrent gRPC streams")
            .build(),
    });
}

/// The gRPC method a request counter is attributed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Fibonacci,
    FibonacciStream,
}

impl Method {
    #[cfg_attr(not(feature = "metrics"), allow(dead_code))]
    const fn as_str(self) -> &'static str {
        match self {
            Self::Fibonacci => "Fibonacci",
            Self::FibonacciStream => "FibonacciStream",
        }
    }
}

/// Engine metrics sink backed by the OpenTelemetry instruments above.
///
/// Without the `metrics` feature every call is a no-op.
#[derive(Clone, Copy, Debug, Default)]
pub struct OtelMetrics;

impl MetricsSink for OtelMetrics {
    #[cfg(feature = "metrics")]
    fn record_sequence(&self, n: usize, elapsed: Duration) {
        if let Some(m) = INSTRUMENTS.get() {
            m.calculation_duration
                .record(elapsed.as_nanos() as f64, &[]);
            m.calculations_total
                .add(1, &[KeyValue::new("n", n as i64)]);
        }
    }

    #[cfg(not(feature = "metrics"))]
    fn record_sequence(&self, _n: usize, _elapsed: Duration) {}

    #[cfg(feature = "metrics")]
    fn record_stream(&self, n: usize, chunk_size: usize, elapsed: Duration) {
        if let Some(m) = INSTRUMENTS.get() {
            m.stream_calculation_duration
                .record(elapsed.as_nanos() as f64, &[]);
            m.stream_calculations_total.add(
                1,
                &[
                    KeyValue::new("n", n as i64),
                    KeyValue::new("chunk_size", chunk_size as i64),
                ],
            );
        }
    }

    #[cfg(not(feature = "metrics"))]
    fn record_stream(&self, _n: usize, _chunk_size: usize, _elapsed: Duration) {}
}

#[cfg(feature = "metrics")]
pub fn increment_requests(method: Method) {
    if let Some(m) = INSTRUMENTS.get() {
        m.requests.add(1, &[KeyValue::new("method", method.as_str())]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_requests(_method: Method) {}

#[cfg(feature = "metrics")]
pub fn increment_errors(method: Method) {
    if let Some(m) = INSTRUMENTS.get() {
        m.errors.add(1, &[KeyValue::new("method", method.as_str())]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_errors(_method: Method) {}

#[cfg(feature = "metrics")]
pub fn increment_streams_inflight() {
    if let Some(m) = INSTRUMENTS.get() {
        m.streams_inflight.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_streams_inflight() {}

#[cfg(feature = "metrics")]
pub fn decrement_streams_inflight() {
    if let Some(m) = INSTRUMENTS.get() {
        m.streams_inflight.add(-1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn decrement_streams_inflight() {}

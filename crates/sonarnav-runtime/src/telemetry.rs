//! `tracing` subscriber setup with optional OpenTelemetry export.
//!
//! Call [`init_tracing`] once at process startup and keep the returned
//! [`TracerProviderGuard`] alive until exit.
//!
//! # Environment variables
//!
//! | Variable | Effect |
//! |---|---|
//! | `RUST_LOG` | Log filter (default `"info"`). |
//! | `SONARNAV_LOG_FORMAT=json` | Emit newline-delimited JSON logs. |
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | OTLP/HTTP collector URL.  When set, the `control_run` and `cycle` spans are exported. |
//!
//! # Example
//!
//! ```rust,no_run
//! use sonarnav_runtime::telemetry::{init_tracing, TelemetryConfig};
//!
//! let _guard = init_tracing(&TelemetryConfig::from_env("sonarnav"));
//! ```

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

/// Output and export settings for [`init_tracing`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    pub service_name: String,
    /// JSON lines instead of the compact human format.
    pub json: bool,
    /// OTLP/HTTP endpoint; `None` disables span export.
    pub otlp_endpoint: Option<String>,
}

impl TelemetryConfig {
    /// Read `SONARNAV_LOG_FORMAT` and `OTEL_EXPORTER_OTLP_ENDPOINT`.
    pub fn from_env(service_name: &str) -> Self {
        Self {
            service_name: service_name.to_string(),
            json: std::env::var("SONARNAV_LOG_FORMAT").as_deref() == Ok("json"),
            otlp_endpoint: std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .ok()
                .filter(|v| !v.trim().is_empty()),
        }
    }
}

/// Install the global subscriber.
///
/// If a global subscriber is already installed (e.g. a second call in the
/// same process) the new one is discarded and a note is printed to stderr.
pub fn init_tracing(config: &TelemetryConfig) -> TracerProviderGuard {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let provider = config
        .otlp_endpoint
        .as_deref()
        .and_then(|endpoint| build_provider(&config.service_name, endpoint));
    let otel_layer = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer("sonarnav")));

    let fmt_layer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_target(true)
            .boxed()
    };

    if let Err(e) = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()
    {
        eprintln!("[sonarnav] tracing subscriber already installed: {e}");
    }

    TracerProviderGuard(provider)
}

/// Shuts the OTel [`SdkTracerProvider`] down on drop, flushing pending spans.
pub struct TracerProviderGuard(Option<SdkTracerProvider>);

impl TracerProviderGuard {
    /// `true` when spans are being exported.
    pub fn is_exporting(&self) -> bool {
        self.0.is_some()
    }
}

impl Drop for TracerProviderGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.0.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("[sonarnav] OpenTelemetry provider shutdown error: {e}");
            }
        }
    }
}

/// Build an OTLP/HTTP tracer provider for `endpoint`.
///
/// Returns `None` (after printing to stderr) when the exporter cannot be
/// created; logging then continues without export.
fn build_provider(service_name: &str, endpoint: &str) -> Option<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| eprintln!("[sonarnav] OTLP exporter init failed: {e}"))
        .ok()?;

    let resource = Resource::builder()
        .with_service_name(service_name.to_string())
        .build();

    // The control loop is synchronous; the simple exporter needs no async
    // runtime.
    Some(
        SdkTracerProvider::builder()
            .with_resource(resource)
            .with_simple_exporter(exporter)
            .build(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_reads_log_format_and_endpoint() {
        // SAFETY: env vars touched only by this test in this module.
        unsafe {
            std::env::set_var("SONARNAV_LOG_FORMAT", "json");
            std::env::set_var("OTEL_EXPORTER_OTLP_ENDPOINT", "   ");
        }
        let cfg = TelemetryConfig::from_env("sonarnav-test");
        assert!(cfg.json);
        assert_eq!(cfg.otlp_endpoint, None, "blank endpoint disables export");
        assert_eq!(cfg.service_name, "sonarnav-test");
        unsafe {
            std::env::remove_var("SONARNAV_LOG_FORMAT");
            std::env::remove_var("OTEL_EXPORTER_OTLP_ENDPOINT");
        }
    }

    #[test]
    fn guard_without_provider_is_not_exporting() {
        let guard = TracerProviderGuard(None);
        assert!(!guard.is_exporting());
        drop(guard);
    }

    #[test]
    fn init_twice_does_not_panic() {
        let cfg = TelemetryConfig {
            service_name: "sonarnav-test".to_string(),
            json: false,
            otlp_endpoint: None,
        };
        let first = init_tracing(&cfg);
        let second = init_tracing(&cfg);
        assert!(!first.is_exporting());
        assert!(!second.is_exporting());
    }
}

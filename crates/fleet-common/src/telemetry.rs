//! Process-wide tracing setup for fleet binaries.

use std::collections::HashMap;

use opentelemetry::trace::TracerProvider as TracerProviderTrait;
use opentelemetry::KeyValue;
use opentelemetry_otlp::{WithExportConfig, WithHttpConfig};
use opentelemetry_sdk::trace::TracerProvider;
use opentelemetry_sdk::Resource;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global subscriber: a `RUST_LOG` filter (default `info`) and a
/// formatter on stderr, so artifacts printed on stdout stay clean.
///
/// With `otlp_endpoint` set, spans are also exported over OTLP/HTTP
/// (`/v1/traces` is appended by the exporter). The returned provider has to
/// be shut down before exit to flush what is still batched. If the exporter
/// cannot be built, a warning is logged and only stderr output remains.
pub fn init_tracing(
    service_name: &str,
    otlp_endpoint: Option<&str>,
    otlp_token: Option<&str>,
) -> Option<TracerProvider> {
    let mut export_error = None;
    let provider = match otlp_endpoint {
        Some(endpoint) => match build_provider(service_name, endpoint, otlp_token) {
            Ok(provider) => Some(provider),
            Err(e) => {
                export_error = Some(e);
                None
            }
        },
        None => None,
    };

    let otel_layer = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer(service_name.to_string())));

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(otel_layer)
        .init();

    if let Some(err) = export_error {
        tracing::warn!(error = %err, "span export disabled, logging to stderr only");
    } else if let Some(endpoint) = otlp_endpoint {
        tracing::info!(endpoint, service_name, "exporting spans over OTLP");
    }
    provider
}

fn build_provider(
    service_name: &str,
    endpoint: &str,
    token: Option<&str>,
) -> Result<TracerProvider, String> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .with_headers(auth_headers(token))
        .build()
        .map_err(|e| e.to_string())?;

    Ok(TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .with_resource(Resource::new([KeyValue::new(
            "service.name",
            service_name.to_string(),
        )]))
        .build())
}

/// Blank tokens send no header.
fn auth_headers(token: Option<&str>) -> HashMap<String, String> {
    token
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| ("Authorization".to_string(), format!("Bearer {t}")))
        .into_iter()
        .collect()
}

//! Metrics collection and exposition.
//!
//! # Metrics
//! - `socksd_connections_accepted_total` (counter)
//! - `socksd_active_connections` (gauge)
//! - `socksd_accept_errors_total` (counter): by `kind` = transient | fatal
//! - `socksd_handler_errors_total` (counter)
//! - `socksd_resolver_cache_total` (counter): by `result` = hit | miss
//! - `socksd_resolver_lookups_total` (counter): by `outcome`
//! - `socksd_dial_total` (counter): by `outcome`

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use thiserror::Error;
use tokio::task::JoinHandle;

// the metrics facade accepts one global recorder per process
static RECORDER_INSTALLED: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("a metrics recorder is already installed in this process")]
    RecorderInstalled,
}

/// The running `/metrics` HTTP endpoint. Dropping it stops serving.
#[derive(Debug)]
pub struct MetricsEndpoint {
    address: SocketAddr,
    exporter: JoinHandle<()>,
}

impl MetricsEndpoint {
    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Stop serving and wait for the listening socket to close.
    ///
    /// The recorder stays installed: counters keep accumulating, but a new
    /// endpoint cannot be started in the same process.
    pub async fn shutdown(mut self) {
        self.exporter.abort();
        let _ = (&mut self.exporter).await;
        tracing::info!(address = %self.address, "Metrics endpoint stopped");
    }
}

impl Drop for MetricsEndpoint {
    fn drop(&mut self) {
        self.exporter.abort();
    }
}

/// Install the Prometheus recorder and serve it on `addr`.
///
/// Must be called from within a Tokio runtime. Fails with
/// [`MetricsError::RecorderInstalled`] on a second call.
pub fn init_metrics(addr: SocketAddr) -> Result<MetricsEndpoint, MetricsError> {
    if RECORDER_INSTALLED.swap(true, Ordering::SeqCst) {
        return Err(MetricsError::RecorderInstalled);
    }

    let (recorder, exporter) = match PrometheusBuilder::new().with_http_listener(addr).build() {
        Ok(built) => built,
        Err(e) => {
            RECORDER_INSTALLED.store(false, Ordering::SeqCst);
            return Err(e.into());
        }
    };
    metrics::set_global_recorder(recorder).map_err(|_| MetricsError::RecorderInstalled)?;

    let exporter = tokio::spawn(async move {
        if let Err(e) = exporter.await {
            tracing::error!(error = ?e, "Metrics endpoint failed");
        }
    });

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(MetricsEndpoint {
        address: addr,
        exporter,
    })
}

pub fn record_connection_accepted() {
    metrics::counter!("socksd_connections_accepted_total").increment(1);
}

pub fn record_active_connections(count: u64) {
    metrics::gauge!("socksd_active_connections").set(count as f64);
}

pub fn record_accept_error(transient: bool) {
    let kind = if transient { "transient" } else { "fatal" };
    metrics::counter!("socksd_accept_errors_total", "kind" => kind).increment(1);
}

pub fn record_handler_error() {
    metrics::counter!("socksd_handler_errors_total").increment(1);
}

pub fn record_resolver_cache(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    metrics::counter!("socksd_resolver_cache_total", "result" => result).increment(1);
}

pub fn record_lookup(outcome: &'static str) {
    metrics::counter!("socksd_resolver_lookups_total", "outcome" => outcome).increment(1);
}

pub fn record_dial(outcome: &'static str) {
    metrics::counter!("socksd_dial_total", "outcome" => outcome).increment(1);
}

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::OnceLock;

// It's important to use the exported crate `prometheus_exporter::prometheus`
// instead of `prometheus`, as different versions of that crate have
// incompatible global registries.
use prometheus_exporter::prometheus;

pub struct PrometheusMetrics {
    /// Root field invocations, labeled by the permission check outcome.
    pub graphql_operations: prometheus::IntCounterVec,
    pub jwt_verifications: prometheus::IntCounterVec,
    pub published_events: prometheus::IntCounterVec,
}

static METRICS: OnceLock<PrometheusMetrics> = OnceLock::new();

pub fn metrics() -> &'static PrometheusMetrics {
    METRICS.get_or_init(|| {
        PrometheusMetrics::new(prometheus_exporter::prometheus::default_registry().clone())
    })
}

impl PrometheusMetrics {
    fn new(registry: prometheus::Registry) -> Self {
        let graphql_operations = prometheus::register_int_counter_vec_with_registry!(
            "graphql_operations",
            "Number of GraphQL root field invocations",
            &["operation", "outcome"],
            registry
        )
        .unwrap();
        let jwt_verifications = prometheus::register_int_counter_vec_with_registry!(
            "jwt_verifications",
            "Number of access token verifications",
            &["outcome"],
            registry
        )
        .unwrap();
        let published_events = prometheus::register_int_counter_vec_with_registry!(
            "published_events",
            "Number of subscription events published",
            &["entity", "mutation"],
            registry
        )
        .unwrap();

        Self {
            graphql_operations,
            jwt_verifications,
            published_events,
        }
    }
}

#[derive(Debug)]
pub struct PrometheusExporter {
    binding: SocketAddr,
    _exporter: prometheus_exporter::Exporter,
}

impl PrometheusExporter {
    /// Starts exporting Prometheus metrics at `http://0.0.0.0:{port}/metrics`. The server
    /// will keep running until the returned [`PrometheusExporter`] is dropped.
    pub fn start(port: u16, registry: prometheus::Registry) -> anyhow::Result<Self> {
        let binding = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port));
        let exporter = {
            let mut builder = prometheus_exporter::Builder::new(binding);
            builder.with_registry(registry);
            builder.start()?
        };

        Ok(Self {
            binding,
            _exporter: exporter,
        })
    }

    /// Returns the port this Prometheus exporter is bound to.
    pub fn port(&self) -> u16 {
        self.binding.port()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_registered_once() {
        let before = metrics()
            .jwt_verifications
            .with_label_values(&["test"])
            .get();
        metrics().jwt_verifications.with_label_values(&["test"]).inc();

        assert_eq!(
            metrics()
                .jwt_verifications
                .with_label_values(&["test"])
                .get(),
            before + 1
        );
    }

    fn free_port() -> u16 {
        let listener = std::net::TcpListener::bind((Ipv4Addr::UNSPECIFIED, 0)).unwrap();
        listener.local_addr().unwrap().port()
    }

    #[test]
    fn exporter_reports_its_port() {
        let port = free_port();
        let exporter = PrometheusExporter::start(port, prometheus::Registry::new()).unwrap();
        assert_eq!(exporter.port(), port);
        assert!(std::net::TcpStream::connect((Ipv4Addr::LOCALHOST, port)).is_ok());
    }
}

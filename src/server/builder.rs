//! ServerBuilder for fluent API to build HTTP servers

use super::handlers::AppState;
use super::router::build_router;
use crate::config::UnfoldConfig;
use crate::core::document::Document;
use crate::core::service::ResourceService;
use crate::expansion::gateway::PopulationGateway;
use crate::expansion::pipeline::{DocumentGateway, ExpansionPipeline};
use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Builder for creating HTTP servers over expandable resources
///
/// # Example
///
/// ```ignore
/// let store = InMemoryStore::new();
/// let app = ServerBuilder::new()
///     .with_config(UnfoldConfig::from_yaml_file("unfold.yaml")?)
///     .with_store(store)
///     .build()?;
/// ```
pub struct ServerBuilder {
    config: UnfoldConfig,
    service: Option<Arc<dyn ResourceService>>,
    gateway: Option<DocumentGateway>,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder
    pub fn new() -> Self {
        Self {
            config: UnfoldConfig::default(),
            service: None,
            gateway: None,
            custom_routes: Vec::new(),
        }
    }

    /// Set the configuration (schemas, pagination, gateway timeout)
    pub fn with_config(mut self, config: UnfoldConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the service loading root resources (required)
    pub fn with_service(mut self, service: impl ResourceService + 'static) -> Self {
        self.service = Some(Arc::new(service));
        self
    }

    /// Set the population gateway (required)
    pub fn with_gateway(
        mut self,
        gateway: impl PopulationGateway<Entity = Document> + 'static,
    ) -> Self {
        self.gateway = Some(Arc::new(gateway));
        self
    }

    /// Use one in-memory store as both service and gateway
    #[cfg(feature = "in-memory")]
    pub fn with_store(self, store: crate::storage::InMemoryStore) -> Self {
        self.with_service(store.clone()).with_gateway(store)
    }

    /// Add custom routes to the server
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Validate the configuration and build the shared pipeline
    pub fn build_pipeline(&mut self) -> Result<ExpansionPipeline> {
        let registry = Arc::new(self.config.build_registry()?);

        let service = self.service.take().ok_or_else(|| {
            anyhow::anyhow!("ResourceService is required. Call .with_service()")
        })?;
        let gateway = self.gateway.take().ok_or_else(|| {
            anyhow::anyhow!("PopulationGateway is required. Call .with_gateway()")
        })?;

        tracing::debug!(
            resources = registry.resource_names().len(),
            "schema registry built"
        );

        Ok(ExpansionPipeline::new(&self.config, registry, service, gateway))
    }

    /// Build the final REST router
    pub fn build(mut self) -> Result<Router> {
        let pipeline = Arc::new(self.build_pipeline()?);
        let custom_routes = std::mem::take(&mut self.custom_routes);
        Ok(build_router(AppState { pipeline }, custom_routes))
    }

    /// Serve the application with graceful shutdown
    ///
    /// This will:
    /// - Bind to the provided address
    /// - Start serving requests
    /// - Handle SIGTERM and SIGINT (Ctrl+C) for graceful shutdown
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = self.build()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}

#[cfg(all(test, feature = "in-memory"))]
mod tests {
    use super::*;
    use crate::expansion::schema::ResourceSchema;
    use crate::storage::InMemoryStore;

    fn config() -> UnfoldConfig {
        UnfoldConfig::default().with_resource(ResourceSchema::new("articles"))
    }

    // ── Constructor tests ────────────────────────────────────────────────

    #[test]
    fn test_new_creates_empty_builder() {
        let builder = ServerBuilder::new();
        assert!(builder.service.is_none());
        assert!(builder.gateway.is_none());
        assert!(builder.custom_routes.is_empty());
        assert!(builder.config.resources.is_empty());
    }

    // ── with_store ───────────────────────────────────────────────────────

    #[test]
    fn test_with_store_sets_service_and_gateway() {
        let builder = ServerBuilder::new().with_store(InMemoryStore::new());
        assert!(builder.service.is_some());
        assert!(builder.gateway.is_some());
    }

    // ── build ────────────────────────────────────────────────────────────

    #[test]
    fn test_build_without_service_fails() {
        let result = ServerBuilder::new()
            .with_config(config())
            .with_gateway(InMemoryStore::new())
            .build();
        let err_msg = format!("{}", result.err().expect("should be Err"));
        assert!(err_msg.contains("ResourceService is required"), "{}", err_msg);
    }

    #[test]
    fn test_build_without_gateway_fails() {
        let result = ServerBuilder::new()
            .with_config(config())
            .with_service(InMemoryStore::new())
            .build();
        let err_msg = format!("{}", result.err().expect("should be Err"));
        assert!(err_msg.contains("PopulationGateway is required"), "{}", err_msg);
    }

    #[test]
    fn test_build_rejects_unbounded_cycle() {
        use crate::expansion::schema::RelationSchema;

        let config = UnfoldConfig::default().with_resource(
            ResourceSchema::new("nodes").with_relation(
                "children",
                RelationSchema::to_resource("nodes", "/nodes/:parentId/children"),
            ),
        );
        let result = ServerBuilder::new()
            .with_config(config)
            .with_store(InMemoryStore::new())
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_build_with_custom_routes() {
        use axum::routing::get;

        let custom = Router::new().route("/custom", get(|| async { "ok" }));
        let router = ServerBuilder::new()
            .with_config(config())
            .with_store(InMemoryStore::new())
            .with_custom_routes(custom)
            .build();
        assert!(router.is_ok());
    }
}

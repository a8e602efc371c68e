//! Master server

use crate::common::{shutdown_signal, MasterConfig, Result};
use crate::master::coordinator::Coordinator;
use crate::master::http::{create_router, MasterState};
use std::net::SocketAddr;
use std::sync::Arc;

pub struct Master {
    config: MasterConfig,
}

impl Master {
    pub fn new(config: MasterConfig) -> Self {
        Self { config }
    }

    /// Bind the HTTP API and serve until SIGINT/SIGTERM. Membership and
    /// placement live only in this process; a restart starts empty and
    /// nodes re-register themselves.
    pub async fn serve(self) -> Result<()> {
        tracing::info!("starting master");
        tracing::info!("  HTTP API: {}", self.config.bind_addr);

        let coordinator = Arc::new(Coordinator::new());
        let router = create_router(MasterState { coordinator });

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!("✓ master ready");

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        tracing::info!("master stopped");
        Ok(())
    }
}

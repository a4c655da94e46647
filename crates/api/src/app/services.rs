//! Store selection and service wiring.

use std::sync::Arc;

use anyhow::Context;

use storefront_infra::{InMemoryCartStore, PostgresStore, Services, StoreBackend};

/// Wire every service to the configured backend.
///
/// Postgres mode connects, applies the schema and keeps carts in memory.
pub async fn build_services(backend: &StoreBackend) -> anyhow::Result<Services> {
    match backend {
        StoreBackend::InMemory => {
            tracing::info!("using in-memory stores");
            Ok(Services::in_memory())
        }
        StoreBackend::Postgres {
            database_url,
            max_connections,
        } => {
            let store = PostgresStore::connect(database_url, *max_connections)
                .await
                .context("failed to connect to Postgres")?;
            store.migrate().await.context("failed to apply schema")?;
            tracing::info!(max_connections, "using Postgres stores");
            Ok(Services::from_store(
                Arc::new(store),
                Arc::new(InMemoryCartStore::new()),
            ))
        }
    }
}

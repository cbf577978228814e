use leasing_core::services::{RegistryError, SchemaRegistry};
use surrealdb::engine::local::Db;
use tracing::{info, warn};

use crate::config::LeasingConfig;

pub async fn build_registry(config: &LeasingConfig) -> Result<SchemaRegistry<Db>, RegistryError> {
    let registry = SchemaRegistry::in_memory(&config.registry_config()).await?;

    if registry.tables().is_empty() {
        warn!(
            data_dir = %config.data_dir.display(),
            "no tables loaded; reports will return errors until the sources are present"
        );
    } else {
        info!(
            tables = ?registry.table_names(),
            charts_dir = %registry.charts_dir().display(),
            "schema registry ready"
        );
    }
    Ok(registry)
}

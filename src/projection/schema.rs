//! Per-batch remote schema cache.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::SchemaDefinition;
use crate::destinations::SchemaSource;

/// Caches one [`SchemaDefinition`] per destination for a single batch.
///
/// Create one at batch start and drop it at batch end. A failed fetch is
/// cached as an empty schema, so the mapper degrades to the legacy mapping
/// for the rest of the batch instead of refetching.
#[derive(Debug, Default)]
pub struct BatchSchemaCache {
    schemas: HashMap<String, Arc<SchemaDefinition>>,
}

impl BatchSchemaCache {
    /// An empty cache for a new batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the schema for `destination_id`, fetching it on first use.
    pub async fn schema_for(
        &mut self,
        source: &dyn SchemaSource,
        destination_id: &str,
    ) -> Arc<SchemaDefinition> {
        if let Some(schema) = self.schemas.get(destination_id) {
            debug!(destination_id, "schema cache hit");
            return Arc::clone(schema);
        }

        let schema = match source.fetch_schema(destination_id).await {
            Ok(pairs) => {
                let schema = SchemaDefinition::from_type_names(pairs);
                if schema.is_empty() {
                    warn!(destination_id, "destination schema has no properties");
                }
                schema
            }
            Err(e) => {
                warn!(destination_id, error = %e, "destination schema unavailable");
                SchemaDefinition::empty()
            }
        };

        let schema = Arc::new(schema);
        self.schemas
            .insert(destination_id.to_owned(), Arc::clone(&schema));
        schema
    }

    /// Number of destinations cached so far.
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Whether nothing has been fetched yet.
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

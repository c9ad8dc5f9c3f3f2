//! Per-batch schema cache behaviour.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use cardsync::destinations::{DestinationError, SchemaSource};
use cardsync::projection::schema::BatchSchemaCache;
use cardsync::projection::PropertyType;

struct CountingSource {
    calls: AtomicUsize,
    fail: bool,
}

impl CountingSource {
    fn new(fail: bool) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SchemaSource for CountingSource {
    async fn fetch_schema(
        &self,
        destination_id: &str,
    ) -> Result<Vec<(String, String)>, DestinationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DestinationError::HttpStatus {
                status: 404,
                body: format!("database {destination_id} not found"),
            });
        }
        Ok(vec![
            ("Name".to_owned(), "title".to_owned()),
            ("Email".to_owned(), "email".to_owned()),
            ("Rollup".to_owned(), "rollup".to_owned()),
        ])
    }
}

#[tokio::test]
async fn fetches_once_per_destination_per_batch() {
    let source = CountingSource::new(false);
    let mut cache = BatchSchemaCache::new();

    let first = cache.schema_for(&source, "db-1").await;
    let second = cache.schema_for(&source, "db-1").await;
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(source.calls(), 1);

    let _other = cache.schema_for(&source, "db-2").await;
    assert_eq!(source.calls(), 2);
    assert_eq!(cache.len(), 2);

    assert_eq!(
        first.get("rollup").map(|p| &p.kind),
        Some(&PropertyType::Other("rollup".to_owned()))
    );
}

#[tokio::test]
async fn new_batch_refetches() {
    let source = CountingSource::new(false);
    {
        let mut cache = BatchSchemaCache::new();
        let _ = cache.schema_for(&source, "db-1").await;
    }
    let mut next_batch = BatchSchemaCache::new();
    let _ = next_batch.schema_for(&source, "db-1").await;
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn failed_fetch_is_cached_as_empty() {
    let source = CountingSource::new(true);
    let mut cache = BatchSchemaCache::new();

    let schema = cache.schema_for(&source, "missing").await;
    assert!(schema.is_empty());
    let again = cache.schema_for(&source, "missing").await;
    assert!(again.is_empty());
    assert_eq!(source.calls(), 1);
}

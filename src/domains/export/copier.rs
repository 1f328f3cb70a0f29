use std::sync::Arc;

use futures::future::{join_all, try_join_all};
use log::{debug, warn};
use tokio::sync::Semaphore;

use crate::config::CopyPolicy;
use crate::errors::{ServiceError, ServiceResult};
use crate::storage::ObjectStore;

use super::layout::PlannedItem;

/// Copy every planned audio object to its destination under bounded
/// parallelism. No ordering is guaranteed among completed copies.
///
/// Under `CopyPolicy::FailFast` the first item failure aborts the remaining
/// in-flight batch; under `CopyPolicy::Collect` every item is attempted and
/// failures are reported together.
pub async fn copy_all(
    store: &Arc<dyn ObjectStore>,
    plan: &[PlannedItem],
    concurrency: usize,
    policy: CopyPolicy,
) -> ServiceResult<()> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    debug!(
        "copying {} object(s) with {} permit(s), policy {:?}",
        plan.len(),
        concurrency.max(1),
        policy
    );

    let copies = plan.iter().map(|item| {
        let store = store.clone();
        let semaphore = semaphore.clone();
        let source = item.source_key.clone();
        let destination = item.destination.clone();
        async move {
            let _permit = semaphore
                .acquire()
                .await
                .map_err(|_| ServiceError::ServiceUnavailable("copy engine shut down".into()))?;
            store
                .copy_object(&source, &destination)
                .await
                .map_err(|e| {
                    warn!("copy {} -> {} failed: {}", source, destination, e);
                    ServiceError::from(e)
                })
        }
    });

    match policy {
        CopyPolicy::FailFast => {
            try_join_all(copies).await?;
        }
        CopyPolicy::Collect => {
            let failures: Vec<String> = join_all(copies)
                .await
                .into_iter()
                .filter_map(|r| r.err())
                .map(|e| e.to_string())
                .collect();
            if !failures.is_empty() {
                return Err(ServiceError::ServiceUnavailable(format!(
                    "{} of {} copies failed: {}",
                    failures.len(),
                    plan.len(),
                    failures.join("; ")
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryObjectStore;

    fn item(source: &str, destination: &str) -> PlannedItem {
        PlannedItem {
            source_key: source.to_string(),
            destination: destination.to_string(),
            transcript_key: "export/transcript.txt".to_string(),
            category_key: "Greetings".to_string(),
        }
    }

    async fn seeded_store(keys: &[&str]) -> Arc<dyn ObjectStore> {
        let store = InMemoryObjectStore::new();
        for key in keys {
            store
                .put_object(key, b"RIFF".to_vec(), "audio/wav")
                .await
                .unwrap();
        }
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_copies_every_item() {
        let store = seeded_store(&["raw/a.wav", "raw/b.wav"]).await;
        let plan = vec![
            item("raw/a.wav", "export/g/files/a.wav"),
            item("raw/b.wav", "export/g/files/b.wav"),
        ];

        copy_all(&store, &plan, 4, CopyPolicy::FailFast).await.unwrap();
        assert!(store.get_object("export/g/files/a.wav").await.is_ok());
        assert!(store.get_object("export/g/files/b.wav").await.is_ok());
    }

    #[tokio::test]
    async fn test_fail_fast_surfaces_missing_source() {
        let store = seeded_store(&["raw/a.wav"]).await;
        let plan = vec![
            item("raw/a.wav", "export/g/files/a.wav"),
            item("raw/missing.wav", "export/g/files/missing.wav"),
        ];

        let err = copy_all(&store, &plan, 4, CopyPolicy::FailFast)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("missing.wav"));
    }

    #[tokio::test]
    async fn test_collect_attempts_every_item() {
        let store = seeded_store(&["raw/a.wav", "raw/c.wav"]).await;
        let plan = vec![
            item("raw/a.wav", "export/g/files/a.wav"),
            item("raw/missing.wav", "export/g/files/missing.wav"),
            item("raw/c.wav", "export/g/files/c.wav"),
        ];

        let err = copy_all(&store, &plan, 1, CopyPolicy::Collect)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("1 of 3 copies failed"));
        // The healthy items still landed.
        assert!(store.get_object("export/g/files/a.wav").await.is_ok());
        assert!(store.get_object("export/g/files/c.wav").await.is_ok());
    }

    #[tokio::test]
    async fn test_empty_plan_is_noop() {
        let store = seeded_store(&[]).await;
        copy_all(&store, &[], 4, CopyPolicy::FailFast).await.unwrap();
    }
}

use std::io::{Cursor, Write};
use std::sync::Arc;

use log::info;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::errors::{ServiceError, ServiceResult};
use crate::storage::ObjectStore;

/// Build the downloadable archive from the current state of the output
/// prefix: list every materialized object, stream each into one zip at a
/// prefix-relative path, and republish the zip under the fixed archive key.
///
/// Fails with a "nothing to export" condition when the prefix holds no
/// objects; an export must run before an archive can be built.
pub async fn build_archive(
    store: &Arc<dyn ObjectStore>,
    output_prefix: &str,
    archive_key: &str,
) -> ServiceResult<u64> {
    let keys = store.list_objects(output_prefix).await?;
    if keys.is_empty() {
        return Err(ServiceError::NothingToExport(format!(
            "no finalized files under '{output_prefix}'; run an export first"
        )));
    }

    let relative_root = format!("{}/", output_prefix.trim_end_matches('/'));
    let mut entries = Vec::with_capacity(keys.len());
    for key in keys {
        let data = store.get_object(&key).await?;
        let name = key
            .strip_prefix(&relative_root)
            .unwrap_or(key.as_str())
            .to_string();
        entries.push((name, data));
    }

    // Zip assembly is sync CPU work over in-memory buffers.
    let buffer = tokio::task::spawn_blocking(move || write_zip(entries))
        .await
        .map_err(|e| ServiceError::ServiceUnavailable(format!("archive task failed: {e}")))??;

    let size = buffer.len() as u64;
    store.delete_object(archive_key).await?;
    store
        .put_object(archive_key, buffer, "application/zip")
        .await?;
    info!("published archive {} ({} bytes)", archive_key, size);
    Ok(size)
}

fn write_zip(entries: Vec<(String, Vec<u8>)>) -> ServiceResult<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, data) in entries {
        zip.start_file(&name, options)
            .map_err(|e| ServiceError::ServiceUnavailable(format!("zip entry {name}: {e}")))?;
        zip.write_all(&data)
            .map_err(|e| ServiceError::ServiceUnavailable(format!("zip write {name}: {e}")))?;
    }

    let cursor = zip
        .finish()
        .map_err(|e| ServiceError::ServiceUnavailable(format!("zip finish: {e}")))?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryObjectStore;
    use std::io::Read;
    use zip::ZipArchive;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_archive_contains_prefix_relative_entries() {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemoryObjectStore::new());
        store
            .put_object("export/Greetings/files/a.wav", b"RIFF".to_vec(), "audio/wav")
            .await
            .unwrap();
        store
            .put_object(
                "export/Greetings/transcript.txt",
                b"files/a.wav|hi\n".to_vec(),
                "text/plain",
            )
            .await
            .unwrap();

        let size = build_archive(&store, "export", "dataset.zip").await.unwrap();
        assert!(size > 0);

        let bytes = store.get_object("dataset.zip").await.unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert!(names.contains(&"Greetings/files/a.wav".to_string()));
        assert!(names.contains(&"Greetings/transcript.txt".to_string()));

        let mut transcript = String::new();
        archive
            .by_name("Greetings/transcript.txt")
            .unwrap()
            .read_to_string(&mut transcript)
            .unwrap();
        assert_eq!(transcript, "files/a.wav|hi\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_empty_prefix_is_nothing_to_export() {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemoryObjectStore::new());
        let err = build_archive(&store, "export", "dataset.zip")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NothingToExport(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_rebuild_replaces_previous_archive() {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemoryObjectStore::new());
        store
            .put_object("export/files/a.wav", b"one".to_vec(), "audio/wav")
            .await
            .unwrap();
        build_archive(&store, "export", "dataset.zip").await.unwrap();
        let first = store.get_object("dataset.zip").await.unwrap();

        store
            .put_object("export/files/b.wav", b"two".to_vec(), "audio/wav")
            .await
            .unwrap();
        build_archive(&store, "export", "dataset.zip").await.unwrap();
        let second = store.get_object("dataset.zip").await.unwrap();

        let mut archive = ZipArchive::new(Cursor::new(second.clone())).unwrap();
        assert_eq!(archive.len(), 2);
        assert!(archive.by_name("files/b.wav").is_ok());
        assert_ne!(first, second);
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use crate::config::{ExportOptions, FORMAT_KEY_RE};
use crate::domains::binding::BindingRecord;
use crate::errors::ServiceResult;
use crate::storage::{ObjectStore, StorageError};

use super::category::category_key;
use super::layout::PlannedItem;

/// Sentinel written in place of a transcript that is blank after trimming,
/// so downstream filtering can recognize and drop it.
pub const EMPTY_TEXT_TAG: &str = "<empty-text>";

/// Rendered transcript lines headed for one transcript object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptBlock {
    pub category_key: String,
    pub transcript_key: String,
    pub lines: Vec<String>,
}

/// Render one transcript line for a binding by substituting the recognized
/// `line_format` keys. The template was validated before the run started.
///
/// Substitution is a single pass over the template: placeholders are only
/// looked up in `line_format` itself, never inside substituted values, so a
/// transcript body such as `"say {duration} seconds"` passes through intact.
pub fn render_line(
    binding: &BindingRecord,
    options: &ExportOptions,
    indexed_categories: &HashMap<String, usize>,
) -> String {
    let key = category_key(binding.category_name(&options.uncategorized_name), options);
    let index = indexed_categories.get(&key).copied().unwrap_or(0);
    let text = if binding.has_blank_text() {
        EMPTY_TEXT_TAG
    } else {
        binding.text.body.as_str()
    };

    FORMAT_KEY_RE
        .replace_all(&options.line_format, |caps: &regex::Captures| {
            match &caps[1] {
                "file" => format!("files/{}", binding.audio.file_name),
                "text" => text.to_string(),
                "duration" => binding.audio.duration_seconds.to_string(),
                "category" => key.clone(),
                "category_index" => index.to_string(),
                // Validation rejects anything else before a run starts.
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Group rendered lines by transcript object, preserving input binding order
/// within each block. Block order follows first appearance in the batch.
pub fn accumulate(
    bindings: &[BindingRecord],
    plan: &[PlannedItem],
    options: &ExportOptions,
    indexed_categories: &HashMap<String, usize>,
) -> Vec<TranscriptBlock> {
    let mut blocks: Vec<TranscriptBlock> = Vec::new();
    for (binding, item) in bindings.iter().zip(plan) {
        let line = render_line(binding, options, indexed_categories);
        match blocks
            .iter_mut()
            .find(|b| b.transcript_key == item.transcript_key)
        {
            Some(block) => block.lines.push(line),
            None => blocks.push(TranscriptBlock {
                category_key: item.category_key.clone(),
                transcript_key: item.transcript_key.clone(),
                lines: vec![line],
            }),
        }
    }
    blocks
}

/// Append each block's lines to its transcript object. Object stores have no
/// append primitive, so this reads the current content (if any) and rewrites
/// the object with the new lines concatenated.
pub async fn write_blocks(
    store: &Arc<dyn ObjectStore>,
    blocks: &[TranscriptBlock],
) -> ServiceResult<()> {
    for block in blocks {
        let mut content = match store.get_object(&block.transcript_key).await {
            Ok(existing) => existing,
            Err(StorageError::NotFound(_)) => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        for line in &block.lines {
            content.extend_from_slice(line.as_bytes());
            content.push(b'\n');
        }
        debug!(
            "writing {} transcript line(s) to {}",
            block.lines.len(),
            block.transcript_key
        );
        store
            .put_object(&block.transcript_key, content, "text/plain")
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::binding::{AudioRef, CategoryRef, TextRef};
    use crate::domains::export::category::index_categories;
    use crate::domains::export::layout::plan_layout;
    use crate::storage::InMemoryObjectStore;
    use uuid::Uuid;

    fn binding(category: Option<&str>, file_name: &str, text: &str) -> BindingRecord {
        BindingRecord {
            id: Uuid::new_v4(),
            category: category.map(|name| CategoryRef {
                id: Uuid::new_v4(),
                name: name.to_string(),
            }),
            audio: AudioRef {
                id: Uuid::new_v4(),
                object_key: format!("raw/{file_name}"),
                file_name: file_name.to_string(),
                duration_seconds: 2.5,
            },
            text: TextRef {
                id: Uuid::new_v4(),
                body: text.to_string(),
            },
        }
    }

    #[test]
    fn test_default_template_renders_file_and_text() {
        let options = ExportOptions::default();
        let b = binding(Some("Greetings"), "a.wav", "hi");
        let indexed = index_categories(std::slice::from_ref(&b), &options);
        assert_eq!(render_line(&b, &options, &indexed), "files/a.wav|hi");
    }

    #[test]
    fn test_blank_text_gets_sentinel() {
        let options = ExportOptions {
            omit_empty: false,
            ..Default::default()
        };
        let b = binding(None, "b.wav", "  \t ");
        let indexed = index_categories(std::slice::from_ref(&b), &options);
        assert_eq!(
            render_line(&b, &options, &indexed),
            "files/b.wav|<empty-text>"
        );
    }

    #[test]
    fn test_placeholders_in_text_are_not_substituted() {
        let options = ExportOptions::default();
        let b = binding(Some("Greetings"), "a.wav", "say {duration} seconds");
        let indexed = index_categories(std::slice::from_ref(&b), &options);
        assert_eq!(
            render_line(&b, &options, &indexed),
            "files/a.wav|say {duration} seconds"
        );
    }

    #[test]
    fn test_placeholders_in_file_name_are_not_substituted() {
        let options = ExportOptions {
            line_format: "{file} {text}".to_string(),
            ..Default::default()
        };
        let b = binding(Some("Greetings"), "{text}.wav", "hi");
        let indexed = index_categories(std::slice::from_ref(&b), &options);
        assert_eq!(render_line(&b, &options, &indexed), "files/{text}.wav hi");
    }

    #[test]
    fn test_all_substitution_keys() {
        let options = ExportOptions {
            line_format: "{category_index};{category};{file};{duration};{text}".to_string(),
            ..Default::default()
        };
        let b = binding(Some("Greetings"), "a.wav", "hi");
        let indexed = index_categories(std::slice::from_ref(&b), &options);
        assert_eq!(
            render_line(&b, &options, &indexed),
            "1;Greetings;files/a.wav;2.5;hi"
        );
    }

    #[test]
    fn test_one_block_per_distinct_category_key() {
        let options = ExportOptions::default();
        let bindings = vec![
            binding(Some("Greetings"), "a.wav", "hi"),
            binding(Some("Farewells"), "b.wav", "bye"),
            binding(Some("Greetings"), "c.wav", "hello"),
        ];
        let plan = plan_layout(&bindings, &options, "export");
        let indexed = index_categories(&bindings, &options);

        let blocks = accumulate(&bindings, &plan, &options, &indexed);
        assert_eq!(blocks.len(), 2);
        let greetings = blocks
            .iter()
            .find(|b| b.category_key == "Greetings")
            .unwrap();
        assert_eq!(greetings.lines, vec!["files/a.wav|hi", "files/c.wav|hello"]);
    }

    #[test]
    fn test_flat_layout_accumulates_single_block() {
        let options = ExportOptions {
            divide_by_category: false,
            ..Default::default()
        };
        let bindings = vec![
            binding(Some("Greetings"), "a.wav", "hi"),
            binding(None, "b.wav", "x"),
        ];
        let plan = plan_layout(&bindings, &options, "export");
        let indexed = index_categories(&bindings, &options);

        let blocks = accumulate(&bindings, &plan, &options, &indexed);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].transcript_key, "export/transcript.txt");
        assert_eq!(blocks[0].lines.len(), 2);
    }

    #[tokio::test]
    async fn test_write_blocks_appends_across_batches() {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemoryObjectStore::new());
        let block = TranscriptBlock {
            category_key: "Greetings".to_string(),
            transcript_key: "export/Greetings/transcript.txt".to_string(),
            lines: vec!["files/a.wav|hi".to_string()],
        };

        write_blocks(&store, std::slice::from_ref(&block)).await.unwrap();
        write_blocks(&store, &[block]).await.unwrap();

        let content = store
            .get_object("export/Greetings/transcript.txt")
            .await
            .unwrap();
        assert_eq!(
            String::from_utf8(content).unwrap(),
            "files/a.wav|hi\nfiles/a.wav|hi\n"
        );
    }
}

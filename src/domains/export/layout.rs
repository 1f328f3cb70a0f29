use crate::config::ExportOptions;
use crate::domains::binding::BindingRecord;

use super::category::category_key;

/// Planned destination for one binding. Pure data; no I/O happens here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedItem {
    /// Key of the raw audio object in the content store.
    pub source_key: String,
    /// Key the audio object is copied to under the output prefix.
    pub destination: String,
    /// Key of the transcript file this binding's line belongs to.
    pub transcript_key: String,
    pub category_key: String,
}

/// Compute the destination and transcript keys for every binding.
///
/// `{prefix}/{category_key}/files/{file_name}` and
/// `{prefix}/{category_key}/transcript.txt` when dividing by category,
/// otherwise the flat `{prefix}/files/{file_name}` / `{prefix}/transcript.txt`.
pub fn plan_layout(
    bindings: &[BindingRecord],
    options: &ExportOptions,
    output_prefix: &str,
) -> Vec<PlannedItem> {
    bindings
        .iter()
        .map(|binding| {
            let key = category_key(binding.category_name(&options.uncategorized_name), options);
            let category_root = if options.divide_by_category {
                format!("{output_prefix}/{key}")
            } else {
                output_prefix.to_string()
            };
            PlannedItem {
                source_key: binding.audio.object_key.clone(),
                destination: format!("{category_root}/files/{}", binding.audio.file_name),
                transcript_key: format!("{category_root}/transcript.txt"),
                category_key: key,
            }
        })
        .collect()
}

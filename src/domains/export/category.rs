use std::collections::HashMap;

use crate::config::ExportOptions;
use crate::domains::binding::BindingRecord;

/// Derive the path-safe category key for a display name: whitespace replaced
/// by the configured character, optionally lowercased.
pub fn category_key(name: &str, options: &ExportOptions) -> String {
    let mut key = name.replace(' ', &options.category_space_replacer);
    if options.category_to_lower {
        key = key.to_lowercase();
    }
    key
}

/// Assign a stable index to every distinct category key in the batch.
///
/// Indices start at 1 and follow first-seen binding order, so repeated runs
/// over an unchanged binding set always produce the same `{category_index}`
/// values.
pub fn index_categories(
    bindings: &[BindingRecord],
    options: &ExportOptions,
) -> HashMap<String, usize> {
    let mut indexed = HashMap::new();
    let mut next = 1;
    for binding in bindings {
        let key = category_key(binding.category_name(&options.uncategorized_name), options);
        if !indexed.contains_key(&key) {
            indexed.insert(key, next);
            next += 1;
        }
    }
    indexed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::binding::{AudioRef, CategoryRef, TextRef};
    use uuid::Uuid;

    pub(crate) fn binding(category: Option<&str>, file_name: &str, text: &str) -> BindingRecord {
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
                duration_seconds: 2.0,
            },
            text: TextRef {
                id: Uuid::new_v4(),
                body: text.to_string(),
            },
        }
    }

    #[test]
    fn test_key_replaces_whitespace() {
        let options = ExportOptions {
            category_space_replacer: "_".to_string(),
            ..Default::default()
        };
        assert_eq!(category_key("Morning Greetings", &options), "Morning_Greetings");
    }

    #[test]
    fn test_key_lowercases_when_configured() {
        let options = ExportOptions {
            category_to_lower: true,
            category_space_replacer: "-".to_string(),
            ..Default::default()
        };
        assert_eq!(category_key("Morning Greetings", &options), "morning-greetings");
    }

    #[test]
    fn test_index_is_first_seen_order_starting_at_one() {
        let options = ExportOptions::default();
        let bindings = vec![
            binding(Some("Farewells"), "a.wav", "bye"),
            binding(Some("Greetings"), "b.wav", "hi"),
            binding(Some("Farewells"), "c.wav", "later"),
            binding(None, "d.wav", "hm"),
        ];

        let indexed = index_categories(&bindings, &options);
        assert_eq!(indexed["Farewells"], 1);
        assert_eq!(indexed["Greetings"], 2);
        assert_eq!(indexed["Uncategorized"], 3);
        assert_eq!(indexed.len(), 3);
    }

    #[test]
    fn test_index_stable_across_repeated_runs() {
        let options = ExportOptions::default();
        let bindings = vec![
            binding(Some("Zeta"), "a.wav", "x"),
            binding(Some("Alpha"), "b.wav", "y"),
        ];
        let first = index_categories(&bindings, &options);
        let second = index_categories(&bindings, &options);
        assert_eq!(first, second);
        assert_eq!(first["Zeta"], 1);
    }
}

use serde::Serialize;

use super::layout::PlannedItem;

/// Node of the dry-run directory tree returned by the preview endpoint.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    File { name: String },
    Directory { name: String, children: Vec<TreeNode> },
}

impl TreeNode {
    pub fn root(name: &str) -> Self {
        TreeNode::Directory {
            name: name.to_string(),
            children: Vec::new(),
        }
    }

    fn name(&self) -> &str {
        match self {
            TreeNode::File { name } => name,
            TreeNode::Directory { name, .. } => name,
        }
    }

    /// Insert a `/`-separated path below this node, creating intermediate
    /// directories as needed. Duplicate paths collapse into one node.
    pub fn insert(&mut self, path: &str) {
        let mut parts = path.splitn(2, '/');
        let head = match parts.next() {
            Some(head) if !head.is_empty() => head,
            _ => return,
        };
        let rest = parts.next();

        let TreeNode::Directory { children, .. } = self else {
            return;
        };

        match rest {
            None => {
                if !children.iter().any(|c| c.name() == head) {
                    children.push(TreeNode::File {
                        name: head.to_string(),
                    });
                }
            }
            Some(rest) => {
                let dir = match children
                    .iter_mut()
                    .find(|c| matches!(c, TreeNode::Directory { name, .. } if name == head))
                {
                    Some(dir) => dir,
                    None => {
                        children.push(TreeNode::Directory {
                            name: head.to_string(),
                            children: Vec::new(),
                        });
                        children.last_mut().expect("just pushed")
                    }
                };
                dir.insert(rest);
            }
        }
    }
}

/// Build the would-be export tree from a layout plan without touching
/// storage. Paths are shown relative to the output prefix.
pub fn preview_tree(plan: &[PlannedItem], output_prefix: &str) -> TreeNode {
    let prefix = format!("{}/", output_prefix.trim_end_matches('/'));
    let mut root = TreeNode::root("files");
    for item in plan {
        for key in [&item.destination, &item.transcript_key] {
            let relative = key.strip_prefix(&prefix).unwrap_or(key);
            root.insert(relative);
        }
    }
    root
}

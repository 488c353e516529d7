//! # Tree Command Implementation
//!
//! This module implements the `tree` subcommand, which resolves an overlay
//! and displays every base it reaches in a hierarchical format.
//!
//! ## Functionality
//!
//! - **Overlay Tree Visualization**: Local bases show their root, remote
//!   bases also show the repository they were cloned from.
//! - **Depth Control**: Supports `--depth` flag to limit tree depth
//! - **Resource Files**: Files read through `load` are listed with their size
//!
//! Clones are removed before the command returns.

use anyhow::{Context, Result};
use clap::Args;
use ptree::{print_tree, TreeItem};

use overlay_loader::filesystem::DiskFs;
use overlay_loader::git::GitExecCloner;
use overlay_loader::overlay::{self, OverlayNode};

use super::LoaderArgs;

/// Display the tree of bases reachable from an overlay
#[derive(Args, Debug)]
pub struct TreeArgs {
    #[command(flatten)]
    pub loader: LoaderArgs,

    /// Maximum depth to display in the tree.
    ///
    /// If not specified, displays the full tree.
    /// Use 0 to show only the root overlay, 1 to show its direct bases, etc.
    #[arg(long, value_name = "NUM")]
    pub depth: Option<usize>,
}

/// Execute the `tree` command.
pub fn execute(args: TreeArgs) -> Result<()> {
    let fs = DiskFs::new();
    let cloner = GitExecCloner::new();
    let validator = args.loader.validator()?;
    let loader = args.loader.origin(validator.as_ref(), &fs, &cloner)?;

    let resolved = overlay::resolve(&loader)
        .with_context(|| format!("Failed to resolve overlay at {}", loader.root().display()))?;

    println!("🌳 Overlay tree for: {}", loader.root().display());
    let tree_root = build_tree_node(&resolved, args.depth.unwrap_or(usize::MAX), 0);
    print_tree(&tree_root).map_err(|e| anyhow::anyhow!("Failed to display tree: {}", e))?;

    Ok(())
}

fn label(node: &OverlayNode) -> String {
    let mut label = node.root.display().to_string();
    if let Some(remote) = &node.remote {
        label.push_str(&format!(" ({})", remote));
    }
    if let Some(namespace) = &node.namespace {
        label.push_str(&format!(" [namespace: {}]", namespace));
    }
    label
}

/// Build a tree node from a resolved overlay
fn build_tree_node(node: &OverlayNode, max_depth: usize, current_depth: usize) -> TreeNode {
    let label = label(node);
    if current_depth >= max_depth {
        return TreeNode {
            label,
            children: vec![],
        };
    }

    let files = node.files.iter().map(|file| TreeNode {
        label: format!("{} ({} bytes)", file.path, file.size),
        children: vec![],
    });
    let bases = node
        .bases
        .iter()
        .map(|base| build_tree_node(base, max_depth, current_depth + 1));

    TreeNode {
        label,
        children: files.chain(bases).collect(),
    }
}

/// Tree node structure for ptree visualization
#[derive(Clone)]
struct TreeNode {
    label: String,
    children: Vec<TreeNode>,
}

impl TreeItem for TreeNode {
    type Child = TreeNode;

    fn write_self<W: std::io::Write>(
        &self,
        f: &mut W,
        _style: &ptree::Style,
    ) -> std::io::Result<()> {
        write!(f, "{}", self.label)
    }

    fn children(&self) -> std::borrow::Cow<'_, [Self::Child]> {
        std::borrow::Cow::Borrowed(&self.children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlay_loader::overlay::LoadedFile;
    use overlay_loader::restrictor::LoadRestrictor;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn args(root: PathBuf, depth: Option<usize>) -> TreeArgs {
        TreeArgs {
            loader: LoaderArgs {
                root,
                load_restrictor: LoadRestrictor::RootOnly,
                strict: false,
            },
            depth,
        }
    }

    fn sample() -> OverlayNode {
        OverlayNode {
            root: PathBuf::from("/app/prod"),
            remote: None,
            namespace: Some("prod".to_string()),
            common_labels: Default::default(),
            files: vec![LoadedFile {
                path: "patch.yaml".to_string(),
                size: 12,
            }],
            bases: vec![OverlayNode {
                root: PathBuf::from("/tmp/clone/base"),
                remote: Some("github.com/org/repo/base".to_string()),
                namespace: None,
                common_labels: Default::default(),
                files: vec![],
                bases: vec![],
            }],
        }
    }

    #[test]
    fn test_build_tree_node_labels() {
        let node = build_tree_node(&sample(), usize::MAX, 0);
        assert_eq!(node.label, "/app/prod [namespace: prod]");
        assert_eq!(node.children.len(), 2);
        assert_eq!(node.children[0].label, "patch.yaml (12 bytes)");
        assert_eq!(
            node.children[1].label,
            "/tmp/clone/base (github.com/org/repo/base)"
        );
    }

    #[test]
    fn test_build_tree_node_depth_zero() {
        let node = build_tree_node(&sample(), 0, 0);
        assert!(node.children.is_empty());
    }

    #[test]
    fn test_execute_missing_root() {
        let result = execute(args(PathBuf::from("/nonexistent/overlay-root"), None));
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Failed to open overlay root"));
    }

    #[test]
    fn test_execute_local_overlay() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        std::fs::create_dir_all(root.join("base")).unwrap();
        std::fs::create_dir_all(root.join("prod")).unwrap();
        std::fs::write(root.join("base/kustomization.yaml"), "resources: [deploy.yaml]").unwrap();
        std::fs::write(root.join("base/deploy.yaml"), "kind: Deployment").unwrap();
        std::fs::write(root.join("prod/kustomization.yaml"), "bases: [../base]").unwrap();

        let result = execute(args(root.join("prod"), Some(1)));
        assert!(result.is_ok(), "{:?}", result);
    }

    #[test]
    fn test_execute_missing_overlay_file() {
        let temp = TempDir::new().unwrap();
        let result = execute(args(temp.path().to_path_buf(), None));
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("no overlay file"), "{}", message);
    }
}

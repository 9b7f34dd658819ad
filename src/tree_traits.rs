/*
Rendering of the identity forest as a terminal tree.

Each line shows the node label followed by its child-index path; shared
instances that are highlighted in the session use the accent style.
 */
use termtree::Tree;
use tracing::instrument;

use crate::application::services::Session;
use crate::cli::output;
use crate::domain::{format_path, NodeId};

pub trait TreeNodeConvert {
    fn to_tree_string(&self) -> Tree<String>;
}

impl TreeNodeConvert for Session {
    #[instrument(level = "debug", skip(self))]
    fn to_tree_string(&self) -> Tree<String> {
        fn build_tree(session: &Session, node_id: NodeId, path: &mut Vec<usize>) -> Tree<String> {
            let model = session.model();
            let mut tree = Tree::new(node_line(session, node_id, path));
            if let Ok(node) = model.node(node_id) {
                for (i, &child) in node.children().iter().enumerate() {
                    path.push(i);
                    tree.push(build_tree(session, child, path));
                    path.pop();
                }
            }
            tree
        }

        let mut root = Tree::new(".".to_string());
        if self.model().is_empty() {
            root.push(Tree::new("(empty)".to_string()));
            return root;
        }
        let mut path = Vec::new();
        for (i, &top) in self.model().roots().iter().enumerate() {
            path.push(i);
            root.push(build_tree(self, top, &mut path));
            path.pop();
        }
        root
    }
}

fn node_line(session: &Session, node_id: NodeId, path: &[usize]) -> String {
    let label = session
        .model()
        .node(node_id)
        .map(|n| n.label().to_string())
        .unwrap_or_default();
    let label = if session.is_highlighted(node_id) {
        output::accent(&label).to_string()
    } else {
        label
    };
    format!("{} [{}]", label, format_path(path))
}

//! Presentation session over an identity-tree model
//!
//! Translates user actions (select, add, instance, delete, rename) into model
//! commands and keeps the selection and the highlighted-instance set current.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt, JsonResultExt};
use crate::domain::{Document, DomainError, IdentityId, IdentityTreeModel, NodeId};
use crate::infrastructure::traits::{FileSystem, Prompt};

/// Label shown when asking for a node name.
pub const NAME_PROMPT: &str = "Enter your name:";

/// Which nodes take part in duplicate-instance highlighting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightScope {
    /// Shared nodes whose identity is held by a selected node
    #[default]
    Selection,
    /// Every shared node in the forest
    Forest,
}

impl std::str::FromStr for HighlightScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "selection" => Ok(Self::Selection),
            "forest" => Ok(Self::Forest),
            other => Err(format!("unknown highlight scope: {}", other)),
        }
    }
}

/// Stateful adapter between a front end and the model.
pub struct Session {
    model: IdentityTreeModel,
    selection: Vec<NodeId>,
    highlighted: HashSet<NodeId>,
    scope: HighlightScope,
    fs: Arc<dyn FileSystem>,
    prompt: Arc<dyn Prompt>,
}

impl Session {
    pub fn with_model(
        model: IdentityTreeModel,
        fs: Arc<dyn FileSystem>,
        prompt: Arc<dyn Prompt>,
    ) -> Self {
        Self {
            model,
            selection: Vec::new(),
            highlighted: HashSet::new(),
            scope: HighlightScope::default(),
            fs,
            prompt,
        }
    }

    pub fn with_scope(mut self, scope: HighlightScope) -> Self {
        self.scope = scope;
        self.refresh_highlights();
        self
    }

    pub fn model(&self) -> &IdentityTreeModel {
        &self.model
    }

    pub fn scope(&self) -> HighlightScope {
        self.scope
    }

    pub fn selection(&self) -> &[NodeId] {
        &self.selection
    }

    pub fn highlighted(&self) -> &HashSet<NodeId> {
        &self.highlighted
    }

    pub fn is_highlighted(&self, node: NodeId) -> bool {
        self.highlighted.contains(&node)
    }

    /// Replace the selection.
    #[instrument(level = "debug", skip(self))]
    pub fn select(&mut self, nodes: &[NodeId]) -> ApplicationResult<()> {
        if let Some(&missing) = nodes.iter().find(|&&n| !self.model.contains(n)) {
            return Err(DomainError::UnknownNode(missing).into());
        }
        self.selection = nodes.to_vec();
        self.refresh_highlights();
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.refresh_highlights();
    }

    /// Recompute the highlighted set from the current forest and selection.
    pub fn refresh_highlights(&mut self) {
        let shared = self.model.shared_identities();
        let wanted: HashSet<IdentityId> = match self.scope {
            HighlightScope::Forest => shared,
            HighlightScope::Selection => self
                .selection
                .iter()
                .filter_map(|&n| self.model.node(n).ok())
                .map(|node| node.identity())
                .filter(|id| shared.contains(id))
                .collect(),
        };
        self.highlighted = self
            .model
            .forest()
            .iter()
            .filter(|(_, node)| wanted.contains(&node.identity()))
            .map(|(id, _)| id)
            .collect();
        debug!("highlighted {} node(s)", self.highlighted.len());
    }

    /// Use `name` if given, otherwise ask the prompt. None means cancelled.
    fn resolve_name(&self, name: Option<&str>) -> ApplicationResult<Option<String>> {
        match name {
            Some(n) => Ok(Some(n.to_string())),
            None => self.prompt.ask(NAME_PROMPT).map_err(ApplicationError::Prompt),
        }
    }

    /// Add a new identity node under every selected node, or one root node
    /// when nothing is selected.
    #[instrument(level = "debug", skip(self))]
    pub fn add(&mut self, name: Option<&str>) -> ApplicationResult<Vec<NodeId>> {
        let Some(name) = self.resolve_name(name)? else {
            debug!("add cancelled");
            return Ok(Vec::new());
        };

        let parents: Vec<Option<NodeId>> = if self.selection.is_empty() {
            vec![None]
        } else {
            self.selection.iter().copied().map(Some).collect()
        };

        let mut added = Vec::with_capacity(parents.len());
        for parent in parents {
            let node = self.model.add_node(parent, &name)?;
            self.model.set_expanded(node, true)?;
            added.push(node);
        }
        self.refresh_highlights();
        info!("added {} node(s) named {:?}", added.len(), name);
        Ok(added)
    }

    /// Instance every selected node as a sibling of itself.
    #[instrument(level = "debug", skip(self))]
    pub fn instance_selected(&mut self) -> ApplicationResult<Vec<NodeId>> {
        let mut created = Vec::with_capacity(self.selection.len());
        for source in self.selection.clone() {
            let parent = self.model.node(source)?.parent();
            let node = self.model.instance_node(source, parent)?;
            self.model.set_expanded(node, true)?;
            created.push(node);
        }
        self.refresh_highlights();
        info!("instanced {} node(s)", created.len());
        Ok(created)
    }

    /// Delete every selected node with its subtree.
    ///
    /// Returns the identities evicted from the registry.
    #[instrument(level = "debug", skip(self))]
    pub fn delete_selected(&mut self) -> ApplicationResult<Vec<IdentityId>> {
        let mut evicted = Vec::new();
        for node in std::mem::take(&mut self.selection) {
            // Already gone with a selected ancestor
            if !self.model.contains(node) {
                continue;
            }
            evicted.extend(self.model.remove_node(node)?);
        }
        self.refresh_highlights();
        info!("deleted selection, evicted {} identities", evicted.len());
        Ok(evicted)
    }

    /// Rename the identity behind `node`; every instance follows.
    ///
    /// Returns the relabelled nodes, empty if the prompt was cancelled.
    #[instrument(level = "debug", skip(self))]
    pub fn rename(&mut self, node: NodeId, name: Option<&str>) -> ApplicationResult<Vec<NodeId>> {
        self.model.node(node)?;
        let Some(name) = self.resolve_name(name)? else {
            debug!("rename cancelled");
            return Ok(Vec::new());
        };
        Ok(self.model.rename_identity(node, &name)?)
    }

    pub fn to_document(&self) -> ApplicationResult<Document> {
        Ok(self.model.to_document()?)
    }

    /// Write the whole model to `path` as JSON.
    #[instrument(level = "debug", skip(self))]
    pub fn save(&self, path: &Path) -> ApplicationResult<()> {
        let json = self.to_document()?.to_json().with_document_context(path)?;
        self.fs
            .ensure_parent(path)
            .with_path_context("create directory for", path)?;
        self.fs
            .write(path, &json)
            .with_path_context("write document", path)?;
        info!("saved {} node(s) to {}", self.model.len(), path.display());
        Ok(())
    }

    /// Replace the model with the document at `path`.
    ///
    /// A missing file yields an empty forest. Selection is cleared.
    #[instrument(level = "debug", skip(self))]
    pub fn load(&mut self, path: &Path) -> ApplicationResult<()> {
        let document = if self.fs.exists(path) {
            let content = self
                .fs
                .read_to_string(path)
                .with_path_context("read document", path)?;
            Document::from_json(&content).with_document_context(path)?
        } else {
            debug!("no document at {}, starting empty", path.display());
            Document::default()
        };

        self.model
            .load_document(&document)
            .map_err(|e| ApplicationError::InvalidDocument {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        self.selection.clear();
        self.refresh_highlights();
        info!("loaded {} node(s) from {}", self.model.len(), path.display());
        Ok(())
    }
}

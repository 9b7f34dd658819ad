//! Identity-tree model: the forest of display nodes plus the identity registry.
//!
//! Reference counts are never stored: counts, duplicate groups and
//! eviction are all derived by walking the forest.

use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, instrument, trace};

use crate::domain::arena::{DisplayNode, Forest, NodeId};
use crate::domain::entities::{IdentityId, Person};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::snapshot::{Document, HierarchyEntry, IdentityRecord};

/// Default upper bound (inclusive) for randomly assigned ages.
pub const DEFAULT_MAX_AGE: u8 = 20;

/// Owns the forest and every identity it references.
#[derive(Debug)]
pub struct IdentityTreeModel {
    forest: Forest,
    registry: HashMap<IdentityId, Person>,
    rng: StdRng,
    max_age: u8,
}

impl Default for IdentityTreeModel {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityTreeModel {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_rng(&mut rand::rng()))
    }

    /// Model with a deterministic age sequence.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            forest: Forest::new(),
            registry: HashMap::new(),
            rng,
            max_age: DEFAULT_MAX_AGE,
        }
    }

    /// Override the upper bound for generated ages.
    pub fn with_max_age(mut self, max_age: u8) -> Self {
        self.max_age = max_age;
        self
    }

    // ------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    pub fn node(&self, id: NodeId) -> DomainResult<&DisplayNode> {
        self.forest.get_node(id).ok_or(DomainError::UnknownNode(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.forest.contains(id)
    }

    pub fn identity(&self, id: IdentityId) -> DomainResult<&Person> {
        self.registry.get(&id).ok_or(DomainError::UnknownIdentity(id))
    }

    /// Identity bound to `node`.
    pub fn person_of(&self, node: NodeId) -> DomainResult<&Person> {
        let identity = self.node(node)?.identity();
        self.identity(identity)
    }

    pub fn roots(&self) -> &[NodeId] {
        self.forest.roots()
    }

    /// Number of display nodes.
    pub fn len(&self) -> usize {
        self.forest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forest.is_empty()
    }

    /// Number of registered identities.
    pub fn identity_count(&self) -> usize {
        self.registry.len()
    }

    pub fn child_count(&self, parent: Option<NodeId>) -> DomainResult<usize> {
        Ok(self.forest.children_of(parent)?.len())
    }

    pub fn child_at(&self, parent: Option<NodeId>, index: usize) -> DomainResult<Option<NodeId>> {
        Ok(self.forest.children_of(parent)?.get(index).copied())
    }

    /// Resolve a child-index path from the virtual root, e.g. `[0, 2, 1]`.
    pub fn resolve_path(&self, path: &[usize]) -> DomainResult<NodeId> {
        let mut current: Option<NodeId> = None;
        for (depth, &index) in path.iter().enumerate() {
            current = Some(self.child_at(current, index)?.ok_or_else(|| {
                DomainError::InvalidPath(format_path(&path[..=depth]))
            })?);
        }
        current.ok_or_else(|| DomainError::InvalidPath(String::new()))
    }

    /// Child-index path of `node` from the virtual root.
    pub fn path_of(&self, node: NodeId) -> DomainResult<Vec<usize>> {
        let mut path = Vec::new();
        let mut current = node;
        loop {
            let parent = self.node(current)?.parent();
            let siblings = self.forest.children_of(parent)?;
            let index = siblings
                .iter()
                .position(|&sibling| sibling == current)
                .ok_or(DomainError::UnknownNode(current))?;
            path.push(index);
            match parent {
                Some(p) => current = p,
                None => break,
            }
        }
        path.reverse();
        Ok(path)
    }

    pub fn set_expanded(&mut self, node: NodeId, expanded: bool) -> DomainResult<()> {
        self.forest
            .get_node_mut(node)
            .ok_or(DomainError::UnknownNode(node))?
            .expanded = expanded;
        Ok(())
    }

    // ------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------

    /// Register a fresh identity with a random age in `[0, max_age]`.
    #[instrument(level = "debug", skip(self))]
    pub fn create_identity(&mut self, name: &str) -> IdentityId {
        let id = IdentityId::new();
        let age = self.rng.random_range(0..=self.max_age);
        self.registry.insert(id, Person::new(id, name, age));
        debug!("created identity {} age={}", id, age);
        id
    }

    /// Add a node bound to a brand-new identity.
    #[instrument(level = "debug", skip(self))]
    pub fn add_node(&mut self, parent: Option<NodeId>, name: &str) -> DomainResult<NodeId> {
        if let Some(p) = parent {
            if !self.forest.contains(p) {
                return Err(DomainError::InvalidParent(p));
            }
        }
        let identity = self.create_identity(name);
        self.forest.insert_node(identity, name, parent)
    }

    /// Add a node under `target_parent` sharing `source`'s identity.
    #[instrument(level = "debug", skip(self))]
    pub fn instance_node(
        &mut self,
        source: NodeId,
        target_parent: Option<NodeId>,
    ) -> DomainResult<NodeId> {
        let identity = self.node(source)?.identity();
        let label = self.identity(identity)?.name.clone();
        let node = self.forest.insert_node(identity, &label, target_parent)?;
        debug!(
            "instanced {} as {}, references={}",
            source,
            node,
            self.reference_count(identity)
        );
        Ok(node)
    }

    /// Rename the identity bound to `node` and relabel every instance.
    ///
    /// Returns the nodes whose label was synchronized.
    #[instrument(level = "debug", skip(self))]
    pub fn rename_identity(&mut self, node: NodeId, new_name: &str) -> DomainResult<Vec<NodeId>> {
        let identity = self.node(node)?.identity();
        self.registry
            .get_mut(&identity)
            .ok_or(DomainError::UnknownIdentity(identity))?
            .name = new_name.to_string();

        let instances = self.find_instances_of(identity)?;
        for &instance in &instances {
            if let Some(display) = self.forest.get_node_mut(instance) {
                display.set_label(new_name);
            }
        }
        debug!("renamed {} on {} node(s)", identity, instances.len());
        Ok(instances)
    }

    /// Remove `node` and its subtree, then evict identities nothing references.
    ///
    /// Returns the evicted identities.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_node(&mut self, node: NodeId) -> DomainResult<Vec<IdentityId>> {
        let removed = self.forest.remove_subtree(node)?;
        trace!("removed {} node(s)", removed.len());
        Ok(self.sweep_identities())
    }

    /// Drop every registered identity that no node references.
    fn sweep_identities(&mut self) -> Vec<IdentityId> {
        let used = self.used_identities();
        let evicted: Vec<IdentityId> = self
            .registry
            .keys()
            .filter(|id| !used.contains(id))
            .copied()
            .collect();
        for id in &evicted {
            self.registry.remove(id);
            debug!("evicted identity {}", id);
        }
        evicted
    }

    // ------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------

    /// Every node bound to `identity`, in pre-order.
    #[instrument(level = "trace", skip(self))]
    pub fn find_instances_of(&self, identity: IdentityId) -> DomainResult<Vec<NodeId>> {
        if !self.registry.contains_key(&identity) {
            return Err(DomainError::UnknownIdentity(identity));
        }
        Ok(self
            .forest
            .iter()
            .filter(|(_, node)| node.identity() == identity)
            .map(|(id, _)| id)
            .collect())
    }

    /// Number of nodes currently bound to `identity`.
    pub fn reference_count(&self, identity: IdentityId) -> usize {
        self.forest
            .iter()
            .filter(|(_, node)| node.identity() == identity)
            .count()
    }

    /// Whether `node`'s identity is referenced by two or more nodes.
    pub fn is_shared(&self, node: NodeId) -> DomainResult<bool> {
        let identity = self.node(node)?.identity();
        Ok(self.reference_count(identity) > 1)
    }

    /// Identities referenced by two or more nodes.
    pub fn shared_identities(&self) -> HashSet<IdentityId> {
        let mut counts: HashMap<IdentityId, usize> = HashMap::new();
        for (_, node) in self.forest.iter() {
            *counts.entry(node.identity()).or_default() += 1;
        }
        counts
            .into_iter()
            .filter(|&(_, count)| count > 1)
            .map(|(id, _)| id)
            .collect()
    }

    /// Identities reachable from the virtual root.
    pub fn used_identities(&self) -> HashSet<IdentityId> {
        self.forest.iter().map(|(_, node)| node.identity()).collect()
    }

    /// Nested id structure below `root` (or the virtual root).
    #[instrument(level = "trace", skip(self))]
    pub fn snapshot_hierarchy(&self, root: Option<NodeId>) -> DomainResult<Vec<HierarchyEntry>> {
        self.forest
            .children_of(root)?
            .iter()
            .map(|&child| self.snapshot_entry(child))
            .collect()
    }

    fn snapshot_entry(&self, id: NodeId) -> DomainResult<HierarchyEntry> {
        let node = self.node(id)?;
        Ok(HierarchyEntry {
            id: node.identity(),
            children: self.snapshot_hierarchy(Some(id))?,
        })
    }

    /// One record per live identity, ordered by first appearance in pre-order.
    pub fn snapshot_identities(&self) -> Vec<IdentityRecord> {
        let mut seen = HashSet::new();
        self.forest
            .iter()
            .map(|(_, node)| node.identity())
            .filter(|id| seen.insert(*id))
            .filter_map(|id| self.registry.get(&id))
            .map(IdentityRecord::from)
            .collect()
    }

    // ------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------

    pub fn to_document(&self) -> DomainResult<Document> {
        Ok(Document {
            nodes: self.snapshot_identities(),
            hierarchy: self.snapshot_hierarchy(None)?,
        })
    }

    /// Rebuild a model from a persisted document.
    ///
    /// Identity records that no hierarchy entry references are dropped.
    #[instrument(level = "debug", skip_all)]
    pub fn from_document(document: &Document) -> DomainResult<Self> {
        let mut model = Self::new();
        model.load_document(document)?;
        Ok(model)
    }

    /// Replace this model's content with `document`, keeping its rng settings.
    ///
    /// On error the model is left untouched.
    pub fn load_document(&mut self, document: &Document) -> DomainResult<()> {
        let registry: HashMap<IdentityId, Person> = document
            .nodes
            .iter()
            .map(|record| (record.id, Person::from(record)))
            .collect();
        let mut forest = Forest::new();
        for entry in &document.hierarchy {
            rebuild_entry(&mut forest, &registry, entry, None)?;
        }

        self.forest = forest;
        self.registry = registry;
        let dropped = self.sweep_identities();
        debug!(
            "loaded {} node(s), {} identities, dropped {} unreferenced",
            self.len(),
            self.identity_count(),
            dropped.len()
        );
        Ok(())
    }
}

fn rebuild_entry(
    forest: &mut Forest,
    registry: &HashMap<IdentityId, Person>,
    entry: &HierarchyEntry,
    parent: Option<NodeId>,
) -> DomainResult<()> {
    let label = registry
        .get(&entry.id)
        .map(|person| person.name.as_str())
        .ok_or_else(|| DomainError::Snapshot {
            message: format!("hierarchy references unknown identity {}", entry.id),
        })?;
    let node = forest.insert_node(entry.id, label, parent)?;
    for child in &entry.children {
        rebuild_entry(forest, registry, child, Some(node))?;
    }
    Ok(())
}

/// Render a child-index path as `0/2/1`.
pub fn format_path(path: &[usize]) -> String {
    path.iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Parse a `0/2/1` style child-index path.
pub fn parse_path(s: &str) -> DomainResult<Vec<usize>> {
    let trimmed = s.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Err(DomainError::InvalidPath(s.to_string()));
    }
    trimmed
        .split('/')
        .map(|part| {
            part.trim()
                .parse::<usize>()
                .map_err(|_| DomainError::InvalidPath(s.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn model() -> IdentityTreeModel {
        IdentityTreeModel::with_seed(7)
    }

    #[rstest]
    fn given_alice_scenario_when_instancing_and_deleting_then_counts_follow(
        mut model: IdentityTreeModel,
    ) {
        let original = model.add_node(None, "Alice").unwrap();
        let alice = model.node(original).unwrap().identity();
        assert_eq!(model.reference_count(alice), 1);

        let survivor = model.instance_node(original, None).unwrap();
        assert_eq!(model.reference_count(alice), 2);
        assert!(model.is_shared(original).unwrap());
        assert!(model.is_shared(survivor).unwrap());

        let evicted = model.remove_node(original).unwrap();
        assert!(evicted.is_empty());
        assert_eq!(model.reference_count(alice), 1);
        assert!(!model.is_shared(survivor).unwrap());
        assert_eq!(model.snapshot_identities().len(), 1);

        let evicted = model.remove_node(survivor).unwrap();
        assert_eq!(evicted, vec![alice]);
        assert!(model.snapshot_identities().is_empty());
        assert_eq!(model.identity(alice).unwrap_err(), DomainError::UnknownIdentity(alice));
    }

    #[rstest]
    fn given_instance_below_source_when_removing_source_then_subtree_goes_too(
        mut model: IdentityTreeModel,
    ) {
        let original = model.add_node(None, "Alice").unwrap();
        let alice = model.node(original).unwrap().identity();
        let nested = model.instance_node(original, Some(original)).unwrap();
        assert_eq!(model.find_instances_of(alice).unwrap(), vec![original, nested]);

        let evicted = model.remove_node(original).unwrap();

        assert_eq!(evicted, vec![alice]);
        assert!(!model.contains(nested));
        assert!(model.is_empty());
    }

    #[rstest]
    fn given_instance_when_renaming_via_second_reference_then_all_labels_change(
        mut model: IdentityTreeModel,
    ) {
        let first = model.add_node(None, "Bob").unwrap();
        let second = model.instance_node(first, None).unwrap();

        let synced = model.rename_identity(second, "Bob2").unwrap();

        assert_eq!(synced, vec![first, second]);
        assert_eq!(model.node(first).unwrap().label(), "Bob2");
        assert_eq!(model.node(second).unwrap().label(), "Bob2");
        assert_eq!(model.person_of(first).unwrap().name, "Bob2");
    }

    #[rstest]
    fn given_missing_parent_when_adding_then_invalid_parent_and_no_identity(
        mut model: IdentityTreeModel,
    ) {
        let gone = model.add_node(None, "x").unwrap();
        model.remove_node(gone).unwrap();

        let result = model.add_node(Some(gone), "y");

        assert_eq!(result, Err(DomainError::InvalidParent(gone)));
        assert_eq!(model.identity_count(), 0);
    }

    #[rstest]
    fn given_document_with_unknown_identity_when_loading_then_model_unchanged(
        mut model: IdentityTreeModel,
    ) {
        let alice = model.add_node(None, "Alice").unwrap();
        model.add_node(Some(alice), "Bob").unwrap();
        let before = model.to_document().unwrap();
        let mut broken = before.clone();
        broken.hierarchy.push(HierarchyEntry {
            id: IdentityId::new(),
            children: vec![],
        });

        let result = model.load_document(&broken);

        assert!(matches!(result, Err(DomainError::Snapshot { .. })));
        assert_eq!(model.to_document().unwrap(), before);
        assert_eq!(model.len(), 2);
        assert_eq!(model.identity_count(), 2);
    }

    #[rstest]
    fn given_many_identities_when_created_then_ages_in_range(mut model: IdentityTreeModel) {
        for i in 0..200 {
            let id = model.create_identity(&format!("p{i}"));
            assert!(model.identity(id).unwrap().age() <= DEFAULT_MAX_AGE);
        }
    }

    #[rstest]
    fn given_nested_nodes_when_resolving_paths_then_round_trips(mut model: IdentityTreeModel) {
        let a = model.add_node(None, "a").unwrap();
        let _b = model.add_node(None, "b").unwrap();
        let _a0 = model.add_node(Some(a), "a0").unwrap();
        let a1 = model.add_node(Some(a), "a1").unwrap();

        assert_eq!(model.path_of(a1).unwrap(), vec![0, 1]);
        assert_eq!(model.resolve_path(&[0, 1]).unwrap(), a1);
        assert_eq!(
            model.resolve_path(&[0, 5]),
            Err(DomainError::InvalidPath("0/5".to_string()))
        );
    }

    #[rstest]
    #[case("0/2/1", vec![0, 2, 1])]
    #[case("/3/", vec![3])]
    #[case(" 4 ", vec![4])]
    fn given_valid_path_string_when_parsing_then_returns_indices(
        #[case] input: &str,
        #[case] expected: Vec<usize>,
    ) {
        assert_eq!(parse_path(input).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("a/b")]
    #[case("0//1")]
    fn given_invalid_path_string_when_parsing_then_error(#[case] input: &str) {
        assert!(matches!(parse_path(input), Err(DomainError::InvalidPath(_))));
    }
}

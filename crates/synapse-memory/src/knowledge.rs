//! Copy-on-write knowledge graph store.
//!
//! Operations read a `Graph` snapshot and build a new one; the input is never
//! touched. Each successful mutation records exactly one GRAPH audit event.
//! No-op outcomes (e.g. a relink with nothing to retarget) record nothing.

use crate::audit::AuditLog;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use synapse_types::audit::AuditDomain;
use synapse_types::error::{SynapseError, SynapseResult};
use synapse_types::graph::{Graph, GraphLink, GraphNode, LinkType, NodeSource, NodeType};
use tracing::{debug, warn};
use uuid::Uuid;

/// Strength of the hierarchical link created for a new child node.
pub const HIERARCHICAL_STRENGTH: f32 = 0.8;
/// Strength of non-hierarchical links when the caller gives none.
pub const DEFAULT_LINK_STRENGTH: f32 = 0.5;
/// Strength of the link from the persona root to an appended insight.
pub const INSIGHT_STRENGTH: f32 = 0.9;

const SLUG_MAX: usize = 24;

/// Input for [`KnowledgeStore::upsert_node`].
///
/// With `id` set the call updates that node; without it the call creates a
/// new node under `parent_id`.
#[derive(Debug, Clone, Default)]
pub struct NodeUpsert {
    /// Existing node to update.
    pub id: Option<String>,
    /// New name (required when creating).
    pub name: Option<String>,
    /// New content.
    pub content: Option<String>,
    /// New type. Creation defaults to `knowledge-concept`.
    pub node_type: Option<NodeType>,
    /// Parent to create under, or to move an updated node to.
    pub parent_id: Option<String>,
    /// VFS path for file references.
    pub linked_file: Option<String>,
    /// Provenance of a created node. Defaults to `agent`.
    pub source: Option<NodeSource>,
}

/// What [`KnowledgeStore::relink`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelinkOutcome {
    /// The hierarchical parent link now starts at `to`.
    Relinked {
        /// Previous parent id.
        from: String,
        /// New parent id.
        to: String,
    },
    /// Already under that parent.
    Unchanged,
    /// The node has no inbound hierarchical link.
    NoHierarchicalParent,
    /// The requested parent does not exist.
    UnknownParent,
    /// The requested parent is the node itself or one of its descendants.
    WouldCycle,
}

impl RelinkOutcome {
    /// Whether the graph changed.
    pub fn changed(&self) -> bool {
        matches!(self, RelinkOutcome::Relinked { .. })
    }
}

impl std::fmt::Display for RelinkOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelinkOutcome::Relinked { from, to } => write!(f, "moved from '{from}' to '{to}'"),
            RelinkOutcome::Unchanged => write!(f, "already under that parent"),
            RelinkOutcome::NoHierarchicalParent => {
                write!(f, "node has no hierarchical parent; nothing to relink")
            }
            RelinkOutcome::UnknownParent => write!(f, "new parent does not exist; relink skipped"),
            RelinkOutcome::WouldCycle => {
                write!(f, "new parent is the node or one of its descendants; relink skipped")
            }
        }
    }
}

/// What [`KnowledgeStore::upsert_node`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A node was created under `parent_id`.
    Created {
        /// The new node id.
        id: String,
        /// Its parent.
        parent_id: String,
    },
    /// An existing node was updated.
    Updated {
        /// The node id.
        id: String,
        /// Result of the parent change, if one was requested.
        relink: Option<RelinkOutcome>,
    },
}

impl UpsertOutcome {
    /// The created or updated node id.
    pub fn id(&self) -> &str {
        match self {
            UpsertOutcome::Created { id, .. } | UpsertOutcome::Updated { id, .. } => id,
        }
    }
}

/// What [`KnowledgeStore::merge_nodes`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Id of the abstract-concept node that replaced the merged ones.
    pub new_id: String,
    /// Its parent.
    pub parent_id: String,
    /// The merged (now removed) ids.
    pub merged: Vec<String>,
    /// Links dropped because they touched a merged node.
    pub removed_links: usize,
    /// Whether the merged nodes had different hierarchical parents.
    pub parent_conflict: bool,
    /// Whether the parent came from the persona-root fallback.
    pub used_fallback: bool,
}

/// Knowledge graph operations with audit emission.
#[derive(Clone)]
pub struct KnowledgeStore {
    audit: Arc<AuditLog>,
}

impl KnowledgeStore {
    /// Create a store that records mutations to `audit`.
    pub fn new(audit: Arc<AuditLog>) -> Self {
        Self { audit }
    }

    /// Create or update a node.
    ///
    /// Update path: `NodeNotFound` if the id is unknown. Create path:
    /// `MissingParent` unless `parent_id` names an existing node.
    pub fn upsert_node(
        &self,
        graph: &Graph,
        upsert: NodeUpsert,
    ) -> SynapseResult<(Graph, UpsertOutcome)> {
        match upsert.id.clone() {
            Some(id) => self.update_node(graph, &id, upsert),
            None => self.create_node(graph, upsert),
        }
    }

    fn update_node(
        &self,
        graph: &Graph,
        id: &str,
        upsert: NodeUpsert,
    ) -> SynapseResult<(Graph, UpsertOutcome)> {
        if !graph.contains(id) {
            return Err(SynapseError::NodeNotFound(id.to_string()));
        }
        let now = Utc::now();
        let nodes = graph
            .nodes
            .iter()
            .map(|n| {
                if n.id != id {
                    return n.clone();
                }
                GraphNode {
                    name: upsert.name.clone().unwrap_or_else(|| n.name.clone()),
                    content: upsert.content.clone().unwrap_or_else(|| n.content.clone()),
                    node_type: upsert.node_type.unwrap_or(n.node_type),
                    linked_file: upsert.linked_file.clone().or_else(|| n.linked_file.clone()),
                    updated_at: now,
                    ..n.clone()
                }
            })
            .collect();

        let (links, relink) = match upsert.parent_id.as_deref() {
            Some(parent) => {
                let (links, outcome) = retarget_parent(graph, id, parent);
                (links, Some(outcome))
            }
            None => (graph.links.clone(), None),
        };

        let detail = match &relink {
            Some(outcome) => format!("updated {id}; parent: {outcome}"),
            None => format!("updated {id}"),
        };
        self.audit.record(AuditDomain::Graph, "upsert_node", detail);
        Ok((
            Graph { nodes, links },
            UpsertOutcome::Updated {
                id: id.to_string(),
                relink,
            },
        ))
    }

    fn create_node(
        &self,
        graph: &Graph,
        upsert: NodeUpsert,
    ) -> SynapseResult<(Graph, UpsertOutcome)> {
        let parent_id = upsert
            .parent_id
            .filter(|p| graph.contains(p))
            .ok_or_else(|| {
                SynapseError::MissingParent("a new node needs an existing parentId".to_string())
            })?;
        let name = upsert
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| SynapseError::InvalidInput("a new node needs a name".to_string()))?;

        let id = generate_node_id(graph, &name);
        let now = Utc::now();
        let mut nodes = graph.nodes.clone();
        nodes.push(GraphNode {
            id: id.clone(),
            name,
            node_type: upsert.node_type.unwrap_or(NodeType::KnowledgeConcept),
            content: upsert.content.unwrap_or_default(),
            source: upsert.source.unwrap_or(NodeSource::Agent),
            created_at: now,
            updated_at: now,
            linked_file: upsert.linked_file,
        });
        let mut links = graph.links.clone();
        links.push(hierarchical(&parent_id, &id, HIERARCHICAL_STRENGTH));

        self.audit.record(
            AuditDomain::Graph,
            "upsert_node",
            format!("created {id} under {parent_id}"),
        );
        Ok((Graph { nodes, links }, UpsertOutcome::Created { id, parent_id }))
    }

    /// Append a link. Parallel links are allowed.
    pub fn create_link(
        &self,
        graph: &Graph,
        source: &str,
        target: &str,
        link_type: LinkType,
        label: Option<String>,
        strength: Option<f32>,
    ) -> SynapseResult<Graph> {
        if !graph.contains(source) || !graph.contains(target) {
            return Err(SynapseError::EndpointNotFound {
                source_id: source.to_string(),
                target_id: target.to_string(),
            });
        }
        let strength = strength
            .unwrap_or(match link_type {
                LinkType::Hierarchical => HIERARCHICAL_STRENGTH,
                _ => DEFAULT_LINK_STRENGTH,
            })
            .clamp(0.0, 1.0);
        if source == target {
            debug!(node_id = %source, "creating self-loop link");
        }

        let mut links = graph.links.clone();
        links.push(GraphLink {
            source: source.to_string(),
            target: target.to_string(),
            link_type,
            strength,
            label,
        });
        self.audit.record(
            AuditDomain::Graph,
            "create_link",
            format!("{source} -[{link_type}]-> {target}"),
        );
        Ok(Graph {
            nodes: graph.nodes.clone(),
            links,
        })
    }

    /// Replace `ids` with one abstract-concept node.
    ///
    /// The parent is the source of the first inbound hierarchical link found
    /// on the targets (in argument order) that does not itself come from a
    /// merged node; `fallback_root` is used when there is none. Every link
    /// touching a merged id is dropped. `fallback_root` itself cannot be
    /// merged.
    pub fn merge_nodes(
        &self,
        graph: &Graph,
        ids: &[String],
        new_name: &str,
        new_content: &str,
        fallback_root: &str,
    ) -> SynapseResult<(Graph, MergeOutcome)> {
        let mut unique: Vec<String> = Vec::new();
        for id in ids {
            if !unique.contains(id) {
                unique.push(id.clone());
            }
        }
        if unique.len() < 2 {
            return Err(SynapseError::InvalidInput(
                "merge needs at least two distinct node ids".to_string(),
            ));
        }
        if let Some(missing) = unique.iter().find(|id| !graph.contains(id)) {
            return Err(SynapseError::NodeNotFound(missing.clone()));
        }
        if unique.iter().any(|id| id == fallback_root) {
            return Err(SynapseError::InvalidInput(
                "the persona root cannot be merged".to_string(),
            ));
        }
        let merged: HashSet<&str> = unique.iter().map(String::as_str).collect();

        let candidates: Vec<&str> = unique
            .iter()
            .filter_map(|id| {
                graph
                    .links
                    .iter()
                    .find(|l| {
                        l.link_type == LinkType::Hierarchical
                            && l.target == *id
                            && !merged.contains(l.source.as_str())
                    })
                    .map(|l| l.source.as_str())
            })
            .collect();
        let parent_conflict = candidates.iter().any(|c| *c != candidates[0]);
        let used_fallback = candidates.is_empty();
        let parent_id = candidates.first().copied().unwrap_or(fallback_root).to_string();
        if parent_conflict {
            warn!(parent = %parent_id, ?candidates, "merge targets disagree on parent; using the first");
        }
        if merged.contains(parent_id.as_str()) || !graph.contains(&parent_id) {
            return Err(SynapseError::MissingParent(parent_id));
        }

        let new_id = generate_node_id(graph, new_name);
        let now = Utc::now();
        let mut nodes: Vec<GraphNode> = graph
            .nodes
            .iter()
            .filter(|n| !merged.contains(n.id.as_str()))
            .cloned()
            .collect();
        nodes.push(GraphNode {
            id: new_id.clone(),
            name: new_name.to_string(),
            node_type: NodeType::AbstractConcept,
            content: new_content.to_string(),
            source: NodeSource::Agent,
            created_at: now,
            updated_at: now,
            linked_file: None,
        });

        let mut links: Vec<GraphLink> = graph
            .links
            .iter()
            .filter(|l| !merged.contains(l.source.as_str()) && !merged.contains(l.target.as_str()))
            .cloned()
            .collect();
        let removed_links = graph.links.len() - links.len();
        links.push(hierarchical(&parent_id, &new_id, HIERARCHICAL_STRENGTH));

        self.audit.record(
            AuditDomain::Graph,
            "merge_nodes",
            format!("merged [{}] into {new_id} under {parent_id}", unique.join(", ")),
        );
        Ok((
            Graph { nodes, links },
            MergeOutcome {
                new_id,
                parent_id,
                merged: unique,
                removed_links,
                parent_conflict,
                used_fallback,
            },
        ))
    }

    /// Move a node under a new hierarchical parent.
    ///
    /// No-op outcomes return the graph unchanged and are not errors.
    pub fn relink(
        &self,
        graph: &Graph,
        node_id: &str,
        new_parent_id: &str,
    ) -> SynapseResult<(Graph, RelinkOutcome)> {
        if !graph.contains(node_id) {
            return Err(SynapseError::NodeNotFound(node_id.to_string()));
        }
        let (links, outcome) = retarget_parent(graph, node_id, new_parent_id);
        if !outcome.changed() {
            debug!(node_id, new_parent_id, %outcome, "relink skipped");
            return Ok((graph.clone(), outcome));
        }
        self.audit.record(
            AuditDomain::Graph,
            "relink_node",
            format!("{node_id}: {outcome}"),
        );
        Ok((
            Graph {
                nodes: graph.nodes.clone(),
                links,
            },
            outcome,
        ))
    }

    /// Append a quantum-insight node under the persona root.
    pub fn insight_append(
        &self,
        graph: &Graph,
        root_id: &str,
        inquiry: &str,
        insight: &str,
    ) -> SynapseResult<(Graph, String)> {
        if !graph.contains(root_id) {
            return Err(SynapseError::MissingParent(root_id.to_string()));
        }
        let name = insight_name(inquiry);
        let id = generate_node_id(graph, &name);
        let now = Utc::now();
        let mut nodes = graph.nodes.clone();
        nodes.push(GraphNode {
            id: id.clone(),
            name,
            node_type: NodeType::QuantumInsight,
            content: insight.to_string(),
            source: NodeSource::Synthesis,
            created_at: now,
            updated_at: now,
            linked_file: None,
        });
        let mut links = graph.links.clone();
        links.push(hierarchical(root_id, &id, INSIGHT_STRENGTH));

        self.audit.record(
            AuditDomain::Graph,
            "insight_append",
            format!("{id} under {root_id}"),
        );
        Ok((Graph { nodes, links }, id))
    }

    /// Remove a node and every link touching it. Returns the number of
    /// links dropped. The persona root cannot be deleted.
    pub fn delete_node(
        &self,
        graph: &Graph,
        node_id: &str,
        root_id: &str,
    ) -> SynapseResult<(Graph, usize)> {
        if node_id == root_id {
            return Err(SynapseError::InvalidInput(
                "the persona root cannot be deleted".to_string(),
            ));
        }
        if !graph.contains(node_id) {
            return Err(SynapseError::NodeNotFound(node_id.to_string()));
        }
        let nodes = graph
            .nodes
            .iter()
            .filter(|n| n.id != node_id)
            .cloned()
            .collect();
        let links: Vec<GraphLink> = graph
            .links
            .iter()
            .filter(|l| !l.touches(node_id))
            .cloned()
            .collect();
        let removed = graph.links.len() - links.len();

        self.audit.record(
            AuditDomain::Graph,
            "delete_node",
            format!("{node_id} ({removed} links)"),
        );
        Ok((Graph { nodes, links }, removed))
    }

    /// Case-insensitive search over names and contents. Name matches rank
    /// ahead of content-only matches. Read-only.
    pub fn search<'a>(
        &self,
        graph: &'a Graph,
        query: &str,
        node_type: Option<NodeType>,
        limit: usize,
    ) -> Vec<&'a GraphNode> {
        let needle = query.trim().to_lowercase();
        let mut hits: Vec<(u8, &GraphNode)> = graph
            .nodes
            .iter()
            .filter(|n| node_type.map_or(true, |t| n.node_type == t))
            .filter_map(|n| {
                if needle.is_empty() {
                    return Some((1, n));
                }
                if n.name.to_lowercase().contains(&needle) {
                    Some((0, n))
                } else if n.content.to_lowercase().contains(&needle) {
                    Some((1, n))
                } else {
                    None
                }
            })
            .collect();
        hits.sort_by_key(|(rank, _)| *rank);
        hits.into_iter().take(limit).map(|(_, n)| n).collect()
    }
}

fn hierarchical(source: &str, target: &str, strength: f32) -> GraphLink {
    GraphLink {
        source: source.to_string(),
        target: target.to_string(),
        link_type: LinkType::Hierarchical,
        strength,
        label: None,
    }
}

/// Compute the links after moving `node_id` under `new_parent`, without
/// recording anything.
fn retarget_parent(graph: &Graph, node_id: &str, new_parent: &str) -> (Vec<GraphLink>, RelinkOutcome) {
    let unchanged = || graph.links.clone();
    if !graph.contains(new_parent) {
        return (unchanged(), RelinkOutcome::UnknownParent);
    }
    let Some(index) = graph
        .links
        .iter()
        .position(|l| l.link_type == LinkType::Hierarchical && l.target == node_id)
    else {
        return (unchanged(), RelinkOutcome::NoHierarchicalParent);
    };
    let from = graph.links[index].source.clone();
    if from == new_parent {
        return (unchanged(), RelinkOutcome::Unchanged);
    }
    if graph.is_descendant_or_self(node_id, new_parent) {
        return (unchanged(), RelinkOutcome::WouldCycle);
    }

    let mut links = graph.links.clone();
    links[index].source = new_parent.to_string();
    (
        links,
        RelinkOutcome::Relinked {
            from,
            to: new_parent.to_string(),
        },
    )
}

/// A node id derived from the name and the current time, with a random
/// suffix so ids minted in the same millisecond still differ.
pub fn generate_node_id(graph: &Graph, name: &str) -> String {
    let slug = slugify(name);
    loop {
        let suffix = Uuid::new_v4().simple().to_string();
        let id = format!(
            "{}-{}-{}",
            slug,
            Utc::now().timestamp_millis(),
            &suffix[..8]
        );
        if !graph.contains(&id) {
            return id;
        }
    }
}

fn slugify(name: &str) -> String {
    let mut slug = String::new();
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
        if slug.len() >= SLUG_MAX {
            break;
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "node".to_string()
    } else {
        slug.to_string()
    }
}

fn insight_name(inquiry: &str) -> String {
    let trimmed = inquiry.trim();
    let short: String = trimmed.chars().take(60).collect();
    if short.len() < trimmed.len() {
        format!("Insight: {short}…")
    } else {
        format!("Insight: {short}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (KnowledgeStore, Arc<AuditLog>) {
        let audit = Arc::new(AuditLog::new());
        (KnowledgeStore::new(audit.clone()), audit)
    }

    fn snapshot(graph: &Graph) -> String {
        serde_json::to_string(graph).unwrap()
    }

    fn create(store: &KnowledgeStore, graph: &Graph, name: &str, parent: &str) -> (Graph, String) {
        let (g, outcome) = store
            .upsert_node(
                graph,
                NodeUpsert {
                    name: Some(name.to_string()),
                    parent_id: Some(parent.to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        let id = outcome.id().to_string();
        (g, id)
    }

    #[test]
    fn test_create_twice_same_name_gives_distinct_ids() {
        let (store, audit) = store();
        let root = Graph::seeded("root", "Persona");
        let (g1, a) = create(&store, &root, "X", "root");
        let (g2, b) = create(&store, &g1, "X", "root");

        assert_ne!(a, b);
        assert_eq!(g2.nodes.len(), 3);
        for id in [&a, &b] {
            let parent = g2.hierarchical_parent(id).unwrap();
            assert_eq!(parent.source, "root");
            assert_eq!(parent.strength, HIERARCHICAL_STRENGTH);
        }
        assert_eq!(audit.len(), 2);
    }

    #[test]
    fn test_ids_unique_in_tight_loop() {
        let (store, _) = store();
        let mut graph = Graph::seeded("root", "Persona");
        let mut ids = HashSet::new();
        for _ in 0..200 {
            let (g, id) = create(&store, &graph, "same", "root");
            graph = g;
            assert!(ids.insert(id));
        }
    }

    #[test]
    fn test_create_requires_parent() {
        let (store, audit) = store();
        let graph = Graph::seeded("root", "Persona");
        let err = store
            .upsert_node(
                &graph,
                NodeUpsert {
                    name: Some("orphan".to_string()),
                    parent_id: Some("ghost".to_string()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, SynapseError::MissingParent(_)));
        let err = store
            .upsert_node(
                &graph,
                NodeUpsert {
                    name: Some("orphan".to_string()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, SynapseError::MissingParent(_)));
        assert!(audit.is_empty());
    }

    #[test]
    fn test_update_fields_and_parent() {
        let (store, _) = store();
        let root = Graph::seeded("root", "Persona");
        let (g, a) = create(&store, &root, "A", "root");
        let (g, b) = create(&store, &g, "B", "root");
        let before = snapshot(&g);

        let (g2, outcome) = store
            .upsert_node(
                &g,
                NodeUpsert {
                    id: Some(b.clone()),
                    content: Some("new".to_string()),
                    node_type: Some(NodeType::Task),
                    parent_id: Some(a.clone()),
                    ..Default::default()
                },
            )
            .unwrap();

        let node = g2.node(&b).unwrap();
        assert_eq!(node.name, "B");
        assert_eq!(node.content, "new");
        assert_eq!(node.node_type, NodeType::Task);
        assert!(node.updated_at >= node.created_at);
        assert_eq!(g2.hierarchical_parent(&b).unwrap().source, a);
        assert!(matches!(
            outcome,
            UpsertOutcome::Updated { relink: Some(RelinkOutcome::Relinked { .. }), .. }
        ));
        assert_eq!(snapshot(&g), before);
    }

    #[test]
    fn test_update_unknown_id() {
        let (store, _) = store();
        let graph = Graph::seeded("root", "Persona");
        let err = store
            .upsert_node(
                &graph,
                NodeUpsert {
                    id: Some("nope".to_string()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, SynapseError::NodeNotFound(_)));
    }

    #[test]
    fn test_create_link_missing_endpoint_leaves_graph() {
        let (store, audit) = store();
        let graph = Graph::seeded("root", "Persona");
        let before = snapshot(&graph);
        let err = store
            .create_link(&graph, "missing", "root", LinkType::Related, None, None)
            .unwrap_err();
        assert!(matches!(err, SynapseError::EndpointNotFound { .. }));
        assert_eq!(snapshot(&graph), before);
        assert!(audit.is_empty());
    }

    #[test]
    fn test_create_link_allows_parallel_and_clamps() {
        let (store, _) = store();
        let root = Graph::seeded("root", "Persona");
        let (g, a) = create(&store, &root, "A", "root");
        let g = store
            .create_link(&g, "root", &a, LinkType::Supports, None, None)
            .unwrap();
        let g = store
            .create_link(&g, "root", &a, LinkType::Supports, Some("again".into()), Some(4.0))
            .unwrap();
        let supports: Vec<_> = g
            .links
            .iter()
            .filter(|l| l.link_type == LinkType::Supports)
            .collect();
        assert_eq!(supports.len(), 2);
        assert_eq!(supports[0].strength, DEFAULT_LINK_STRENGTH);
        assert_eq!(supports[1].strength, 1.0);
    }

    #[test]
    fn test_merge_removes_all_touching_links() {
        let (store, audit) = store();
        let root = Graph::seeded("root", "Persona");
        let (g, m) = create(&store, &root, "Mission", "root");
        let (g, a) = create(&store, &g, "A", &m);
        let (g, b) = create(&store, &g, "B", &m);
        let (g, c) = create(&store, &g, "C", &a);
        let g = store
            .create_link(&g, &a, &b, LinkType::Related, None, None)
            .unwrap();
        let before = snapshot(&g);
        let events = audit.len();

        let ids = vec![a.clone(), b.clone()];
        let (merged, outcome) = store
            .merge_nodes(&g, &ids, "AB", "both", "root")
            .unwrap();

        assert_eq!(outcome.parent_id, m);
        assert!(!outcome.used_fallback);
        assert!(!outcome.parent_conflict);
        for link in &merged.links {
            assert!(!ids.contains(&link.source) && !ids.contains(&link.target));
        }
        assert!(!merged.contains(&a) && !merged.contains(&b));
        let new_node = merged.node(&outcome.new_id).unwrap();
        assert_eq!(new_node.node_type, NodeType::AbstractConcept);
        let parents: Vec<_> = merged
            .links
            .iter()
            .filter(|l| l.target == outcome.new_id)
            .collect();
        assert_eq!(parents.len(), 1);
        assert_eq!(parents[0].source, m);
        // c lost its parent link along with a
        assert!(merged.hierarchical_parent(&c).is_none());
        assert_eq!(merged.nodes.len(), g.nodes.len() - 1);
        assert_eq!(snapshot(&g), before);
        assert_eq!(audit.len(), events + 1);
    }

    #[test]
    fn test_merge_parent_skips_merged_sources_and_flags_conflict() {
        let (store, _) = store();
        let root = Graph::seeded("root", "Persona");
        let (g, p) = create(&store, &root, "P", "root");
        let (g, a) = create(&store, &g, "A", "root");
        let (g, b) = create(&store, &g, "B", &p);
        let (g, child) = create(&store, &g, "Child", &a);

        // a's own child is merged too: its parent link comes from a merged node
        let ids = vec![child.clone(), a.clone(), b.clone()];
        let (_, outcome) = store.merge_nodes(&g, &ids, "X", "", "root").unwrap();
        assert_eq!(outcome.parent_id, "root");
        assert!(outcome.parent_conflict);
    }

    #[test]
    fn test_merge_fallback_and_validation() {
        let (store, _) = store();
        let mut graph = Graph::seeded("root", "Persona");
        let now = Utc::now();
        for id in ["x", "y"] {
            graph.nodes.push(GraphNode {
                id: id.to_string(),
                name: id.to_string(),
                node_type: NodeType::KnowledgeConcept,
                content: String::new(),
                source: NodeSource::User,
                created_at: now,
                updated_at: now,
                linked_file: None,
            });
        }
        let ids = vec!["x".to_string(), "y".to_string()];
        let (_, outcome) = store.merge_nodes(&graph, &ids, "XY", "", "root").unwrap();
        assert!(outcome.used_fallback);
        assert_eq!(outcome.parent_id, "root");

        let err = store
            .merge_nodes(&graph, &ids, "XY", "", "elsewhere")
            .unwrap_err();
        assert!(matches!(err, SynapseError::MissingParent(_)));

        let dup = vec!["x".to_string(), "x".to_string()];
        assert!(matches!(
            store.merge_nodes(&graph, &dup, "X", "", "root"),
            Err(SynapseError::InvalidInput(_))
        ));
        let unknown = vec!["x".to_string(), "zzz".to_string()];
        assert!(matches!(
            store.merge_nodes(&graph, &unknown, "X", "", "root"),
            Err(SynapseError::NodeNotFound(_))
        ));
    }

    #[test]
    fn test_merge_refuses_persona_root() {
        let (store, audit) = store();
        let root = Graph::seeded("root", "Persona");
        let (g, x) = create(&store, &root, "X", "root");
        let events = audit.len();

        let ids = vec!["root".to_string(), x.clone()];
        assert!(matches!(
            store.merge_nodes(&g, &ids, "Everything", "", "root"),
            Err(SynapseError::InvalidInput(_))
        ));
        assert_eq!(audit.len(), events);
        assert!(g.contains("root") && g.contains(&x));
    }

    #[test]
    fn test_relink_outcomes() {
        let (store, audit) = store();
        let root = Graph::seeded("root", "Persona");
        let (g, a) = create(&store, &root, "A", "root");
        let (g, b) = create(&store, &g, "B", &a);
        let events = audit.len();

        let (same, outcome) = store.relink(&g, &b, "ghost").unwrap();
        assert_eq!(outcome, RelinkOutcome::UnknownParent);
        assert_eq!(same, g);

        let (_, outcome) = store.relink(&g, "root", &a).unwrap();
        assert_eq!(outcome, RelinkOutcome::NoHierarchicalParent);

        let (_, outcome) = store.relink(&g, &a, &b).unwrap();
        assert_eq!(outcome, RelinkOutcome::WouldCycle);

        let (_, outcome) = store.relink(&g, &b, &a).unwrap();
        assert_eq!(outcome, RelinkOutcome::Unchanged);
        assert_eq!(audit.len(), events);

        let (moved, outcome) = store.relink(&g, &b, "root").unwrap();
        assert!(outcome.changed());
        assert_eq!(moved.hierarchical_parent(&b).unwrap().source, "root");
        assert_eq!(g.hierarchical_parent(&b).unwrap().source, a);
        assert_eq!(audit.len(), events + 1);
    }

    #[test]
    fn test_insight_append() {
        let (store, _) = store();
        let graph = Graph::seeded("root", "Persona");
        let (g, id) = store
            .insight_append(&graph, "root", "What is time?", "A river.")
            .unwrap();
        let node = g.node(&id).unwrap();
        assert_eq!(node.node_type, NodeType::QuantumInsight);
        assert_eq!(node.name, "Insight: What is time?");
        let link = g.hierarchical_parent(&id).unwrap();
        assert_eq!(link.source, "root");
        assert_eq!(link.strength, INSIGHT_STRENGTH);

        assert!(matches!(
            store.insight_append(&graph, "nobody", "q", "a"),
            Err(SynapseError::MissingParent(_))
        ));
    }

    #[test]
    fn test_delete_node() {
        let (store, _) = store();
        let root = Graph::seeded("root", "Persona");
        let (g, a) = create(&store, &root, "A", "root");
        let (g, _b) = create(&store, &g, "B", &a);
        let (g2, removed) = store.delete_node(&g, &a, "root").unwrap();
        assert_eq!(removed, 2);
        assert!(!g2.contains(&a));
        assert!(g2.links.iter().all(|l| !l.touches(&a)));
        assert!(matches!(
            store.delete_node(&g, "root", "root"),
            Err(SynapseError::InvalidInput(_))
        ));
        assert!(matches!(
            store.delete_node(&g, "nope", "root"),
            Err(SynapseError::NodeNotFound(_))
        ));
    }

    #[test]
    fn test_search_ranks_name_matches_first() {
        let (store, _) = store();
        let root = Graph::seeded("root", "Persona");
        let (g, _) = store
            .upsert_node(
                &root,
                NodeUpsert {
                    name: Some("Notes".to_string()),
                    content: Some("about rust".to_string()),
                    parent_id: Some("root".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        let (g, _) = create(&store, &g, "Rust basics", "root");

        let hits = store.search(&g, "RUST", None, 10);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].name, "Rust basics");
        assert!(store.search(&g, "rust", Some(NodeType::Task), 10).is_empty());
        assert_eq!(store.search(&g, "rust", None, 1).len(), 1);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("***"), "node");
        assert!(slugify(&"a".repeat(100)).len() <= SLUG_MAX);
    }
}

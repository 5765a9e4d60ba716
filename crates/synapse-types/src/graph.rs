//! Knowledge graph types: typed nodes and typed, directed, weighted links.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Categories of knowledge graph nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeType {
    /// The persona root the rest of the mind hangs from.
    CorePersona,
    /// A long-running objective.
    Mission,
    /// A unit of work under a mission.
    Task,
    /// A learned fact or idea.
    KnowledgeConcept,
    /// A pointer to a file in the virtual filesystem.
    FileReference,
    /// Output of a generative inquiry.
    QuantumInsight,
    /// A concept formed by merging or abstraction.
    AbstractConcept,
    /// A defining trait of the persona.
    KeyTrait,
    /// A persona strength.
    Strength,
    /// A persona weakness.
    Weakness,
    /// A psychological facet of the persona.
    PsychologyAspect,
}

impl NodeType {
    /// All node types, in declaration order.
    pub const ALL: [NodeType; 11] = [
        NodeType::CorePersona,
        NodeType::Mission,
        NodeType::Task,
        NodeType::KnowledgeConcept,
        NodeType::FileReference,
        NodeType::QuantumInsight,
        NodeType::AbstractConcept,
        NodeType::KeyTrait,
        NodeType::Strength,
        NodeType::Weakness,
        NodeType::PsychologyAspect,
    ];

    /// The kebab-case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::CorePersona => "core-persona",
            NodeType::Mission => "mission",
            NodeType::Task => "task",
            NodeType::KnowledgeConcept => "knowledge-concept",
            NodeType::FileReference => "file-reference",
            NodeType::QuantumInsight => "quantum-insight",
            NodeType::AbstractConcept => "abstract-concept",
            NodeType::KeyTrait => "key-trait",
            NodeType::Strength => "strength",
            NodeType::Weakness => "weakness",
            NodeType::PsychologyAspect => "psychology-aspect",
        }
    }

    /// Parse a wire name. Accepts snake_case as well as kebab-case.
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        Self::ALL.into_iter().find(|t| t.as_str() == normalized)
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Types of directed links between nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkType {
    /// Parent to child structure.
    Hierarchical,
    /// Source lends evidence to target.
    Supports,
    /// Source conflicts with target.
    Contradicts,
    /// Source leads to target.
    Causes,
    /// Loose association.
    Related,
    /// Source expands on target.
    Elaborates,
    /// Source needs target.
    DependsOn,
}

impl LinkType {
    /// All link types, in declaration order.
    pub const ALL: [LinkType; 7] = [
        LinkType::Hierarchical,
        LinkType::Supports,
        LinkType::Contradicts,
        LinkType::Causes,
        LinkType::Related,
        LinkType::Elaborates,
        LinkType::DependsOn,
    ];

    /// The kebab-case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::Hierarchical => "hierarchical",
            LinkType::Supports => "supports",
            LinkType::Contradicts => "contradicts",
            LinkType::Causes => "causes",
            LinkType::Related => "related",
            LinkType::Elaborates => "elaborates",
            LinkType::DependsOn => "depends-on",
        }
    }

    /// Parse a wire name. Accepts snake_case as well as kebab-case.
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        Self::ALL.into_iter().find(|t| t.as_str() == normalized)
    }
}

impl std::fmt::Display for LinkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a node came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeSource {
    /// Created by the agent through a tool call.
    Agent,
    /// Entered by the user.
    User,
    /// Seeded by the system.
    System,
    /// Produced by a generative call.
    Synthesis,
    /// Created as a side effect of a terminal command.
    Terminal,
}

/// A node in the knowledge graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    /// Globally unique, immutable id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Node category.
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Free-form content.
    pub content: String,
    /// Provenance tag.
    pub source: NodeSource,
    /// When the node was created.
    pub created_at: DateTime<Utc>,
    /// When the node was last updated.
    pub updated_at: DateTime<Utc>,
    /// VFS path this node refers to, for file references.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_file: Option<String>,
}

/// A directed, weighted link between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphLink {
    /// Source node id.
    pub source: String,
    /// Target node id.
    pub target: String,
    /// Link type.
    #[serde(rename = "type")]
    pub link_type: LinkType,
    /// Weight in [0, 1].
    pub strength: f32,
    /// Optional human-readable label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl GraphLink {
    /// Whether either endpoint is `id`.
    pub fn touches(&self, id: &str) -> bool {
        self.source == id || self.target == id
    }
}

/// An immutable snapshot of the knowledge graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    /// All nodes.
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    /// All links.
    #[serde(default)]
    pub links: Vec<GraphLink>,
}

impl Graph {
    /// A graph holding only a core-persona root node with the given id.
    pub fn seeded(root_id: &str, persona_name: &str) -> Self {
        let now = Utc::now();
        Self {
            nodes: vec![GraphNode {
                id: root_id.to_string(),
                name: persona_name.to_string(),
                node_type: NodeType::CorePersona,
                content: String::new(),
                source: NodeSource::System,
                created_at: now,
                updated_at: now,
                linked_file: None,
            }],
            links: Vec::new(),
        }
    }

    /// Look up a node by id.
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Whether a node with this id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// The first inbound hierarchical link of a node, if any.
    pub fn hierarchical_parent(&self, id: &str) -> Option<&GraphLink> {
        self.links
            .iter()
            .find(|l| l.link_type == LinkType::Hierarchical && l.target == id)
    }

    /// Ids of the direct hierarchical children of a node.
    pub fn hierarchical_children(&self, id: &str) -> Vec<&str> {
        self.links
            .iter()
            .filter(|l| l.link_type == LinkType::Hierarchical && l.source == id)
            .map(|l| l.target.as_str())
            .collect()
    }

    /// Whether `candidate` is `ancestor` itself or reachable below it via
    /// hierarchical links.
    pub fn is_descendant_or_self(&self, ancestor: &str, candidate: &str) -> bool {
        let mut stack = vec![ancestor];
        let mut seen = std::collections::HashSet::new();
        while let Some(current) = stack.pop() {
            if current == candidate {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            stack.extend(self.hierarchical_children(current));
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_type_wire_names() {
        let json = serde_json::to_string(&NodeType::KnowledgeConcept).unwrap();
        assert_eq!(json, "\"knowledge-concept\"");
        assert_eq!(NodeType::parse("quantum_insight"), Some(NodeType::QuantumInsight));
        assert_eq!(NodeType::parse("Task"), Some(NodeType::Task));
        assert_eq!(NodeType::parse("planet"), None);
    }

    #[test]
    fn test_link_type_parse() {
        assert_eq!(LinkType::parse("depends_on"), Some(LinkType::DependsOn));
        assert_eq!(LinkType::parse("HIERARCHICAL"), Some(LinkType::Hierarchical));
        assert_eq!(LinkType::parse("loves"), None);
    }

    #[test]
    fn test_node_serializes_camel_case() {
        let graph = Graph::seeded("root", "Persona");
        let json = serde_json::to_value(&graph.nodes[0]).unwrap();
        assert_eq!(json["type"], "core-persona");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("linkedFile").is_none());
    }

    #[test]
    fn test_descendant_walk() {
        let mut graph = Graph::seeded("root", "Persona");
        for (s, t) in [("root", "a"), ("a", "b")] {
            graph.links.push(GraphLink {
                source: s.to_string(),
                target: t.to_string(),
                link_type: LinkType::Hierarchical,
                strength: 1.0,
                label: None,
            });
        }
        assert!(graph.is_descendant_or_self("root", "b"));
        assert!(graph.is_descendant_or_self("a", "a"));
        assert!(!graph.is_descendant_or_self("b", "root"));
        assert_eq!(graph.hierarchical_parent("b").unwrap().source, "a");
    }
}

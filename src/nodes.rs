//! Node arena for files and promoted clusters
//!
//! Every leaf file and every cluster lives in one [`NodeArena`] and is
//! addressed by [`NodeId`]. A cluster stores its children as ids, so
//! "already promoted" is a set lookup and no node is owned twice.

use crate::facts::FileFact;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A cluster promoted to act as one node at the next level up
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterNode {
    /// `path:index`
    pub name: String,
    /// Directory the cluster was formed in; empty at the project root
    pub path: String,
    pub index: usize,
    pub children: Vec<NodeId>,
    pub mean_mq: f64,
}

impl ClusterNode {
    pub fn new(path: &str, index: usize, children: Vec<NodeId>, mean_mq: f64) -> Self {
        Self {
            name: format!("{path}:{index}"),
            path: path.to_string(),
            index,
            children,
            mean_mq,
        }
    }

    /// A header joined with its companions, named `stem:joint`. The name
    /// cannot collide with a numbered cluster promoted from directory `stem/`.
    pub fn joint(stem: &str, children: Vec<NodeId>) -> Self {
        Self {
            name: format!("{stem}:joint"),
            path: stem.to_string(),
            index: 0,
            children,
            mean_mq: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Leaf(FileFact),
    Cluster(ClusterNode),
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Self::Leaf(fact) => &fact.name,
            Self::Cluster(cluster) => &cluster.name,
        }
    }
}

#[derive(Debug, Default)]
pub struct NodeArena {
    nodes: Vec<Node>,
    leaf_by_name: HashMap<String, NodeId>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arena holding one leaf per fact, plus the leaf ids in input order.
    /// A repeated file name keeps its first fact.
    pub fn from_facts(facts: Vec<FileFact>) -> (Self, Vec<NodeId>) {
        let mut arena = Self::new();
        let mut ids = Vec::with_capacity(facts.len());
        for fact in facts {
            if arena.leaf_by_name.contains_key(&fact.name) {
                tracing::warn!(file = %fact.name, "duplicate file fact ignored");
                continue;
            }
            ids.push(arena.add_leaf(fact));
        }
        (arena, ids)
    }

    pub fn add_leaf(&mut self, fact: FileFact) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.leaf_by_name.insert(fact.name.clone(), id);
        self.nodes.push(Node::Leaf(fact));
        id
    }

    pub fn add_cluster(&mut self, cluster: ClusterNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::Cluster(cluster));
        id
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn name(&self, id: NodeId) -> &str {
        self.get(id).name()
    }

    pub fn fact(&self, id: NodeId) -> Option<&FileFact> {
        match self.get(id) {
            Node::Leaf(fact) => Some(fact),
            Node::Cluster(_) => None,
        }
    }

    pub fn cluster(&self, id: NodeId) -> Option<&ClusterNode> {
        match self.get(id) {
            Node::Cluster(cluster) => Some(cluster),
            Node::Leaf(_) => None,
        }
    }

    pub fn leaf_by_name(&self, name: &str) -> Option<NodeId> {
        self.leaf_by_name.get(name).copied()
    }

    /// Direct children of a cluster; a leaf has none.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.cluster(id).map_or(&[], |c| c.children.as_slice())
    }

    /// Leaf files under `id`, depth first in child order. A leaf flattens to itself.
    pub fn leaves(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            match self.get(next) {
                Node::Leaf(_) => out.push(next),
                Node::Cluster(c) => stack.extend(c.children.iter().rev()),
            }
        }
        out
    }

    pub fn leaf_facts(&self, id: NodeId) -> impl Iterator<Item = &FileFact> + '_ {
        self.leaves(id).into_iter().filter_map(move |leaf| self.fact(leaf))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Pre-merge each header `x.h` with its `x.c` and `x.inl` companions
    /// into a cluster named `x:joint`. Headers without a companion, and sources
    /// without a header, stay plain leaves. The joined cluster takes the
    /// header's position in the returned list.
    pub fn join_companion_files(&mut self, items: &[NodeId]) -> Vec<NodeId> {
        let by_name: HashMap<&str, NodeId> = items
            .iter()
            .filter(|&&id| self.fact(id).is_some())
            .map(|&id| (self.name(id), id))
            .collect();

        let mut groups: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        let mut absorbed: Vec<NodeId> = Vec::new();
        for &id in items {
            let Some(stem) = self.name(id).strip_suffix(".h") else {
                continue;
            };
            let companions: Vec<NodeId> = ["c", "inl"]
                .iter()
                .filter_map(|ext| by_name.get(format!("{stem}.{ext}").as_str()).copied())
                .collect();
            if companions.is_empty() {
                continue;
            }
            absorbed.extend(&companions);
            let mut members = vec![id];
            members.extend(companions);
            groups.insert(id, members);
        }

        let mut joined = Vec::with_capacity(items.len());
        for &id in items {
            if let Some(members) = groups.remove(&id) {
                let stem = self.name(id).trim_end_matches(".h").to_string();
                let cluster = self.add_cluster(ClusterNode::joint(&stem, members));
                joined.push(cluster);
            } else if !absorbed.contains(&id) {
                joined.push(id);
            }
        }
        let pairs = items.len() - joined.len();
        tracing::debug!(joined = joined.len(), absorbed = pairs, "joined companion files");
        joined
    }
}

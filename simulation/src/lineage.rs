//! Lineage Registry
//!
//! Append-only forest of lineage nodes addressed by dense integer ids.
//! A split stores one node (parent id + new type); full ancestry is rebuilt
//! on demand by walking parent links, so storage per split stays constant no
//! matter how deep a branch grows.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::components::RpsType;
use crate::error::{Result, SimError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineageId(pub u32);

impl LineageId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for LineageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageNode {
    pub id: LineageId,
    /// `None` for the root of a base type.
    pub parent: Option<LineageId>,
    /// Base type of the root this node descends from.
    pub origin: RpsType,
    /// Type the population split into; `None` on roots.
    pub split_to: Option<RpsType>,
    /// Number of splits between this node and its root.
    pub generation: u32,
}

impl LineageNode {
    /// Gameplay type this node stands for.
    pub fn resolved(&self) -> RpsType {
        self.split_to.unwrap_or(self.origin)
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageRegistry {
    nodes: Vec<LineageNode>,
    roots: [Option<LineageId>; 3],
}

impl LineageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with one root per base type, in `RpsType::ALL` order.
    pub fn with_roots() -> Self {
        let mut registry = Self::new();
        for kind in RpsType::ALL {
            registry.create_root(kind);
        }
        registry
    }

    fn next_id(&self) -> LineageId {
        LineageId(self.nodes.len() as u32)
    }

    /// Register a root node for `base`. The first root created for a type
    /// becomes that type's canonical root.
    pub fn create_root(&mut self, base: RpsType) -> LineageId {
        let id = self.next_id();
        self.nodes.push(LineageNode {
            id,
            parent: None,
            origin: base,
            split_to: None,
            generation: 0,
        });
        self.roots[base.index()].get_or_insert(id);
        id
    }

    /// Append a child of `parent` that split into `new_type`.
    pub fn split(&mut self, parent: LineageId, new_type: RpsType) -> Result<LineageId> {
        let (origin, generation) = {
            let node = self.get(parent)?;
            (node.origin, node.generation + 1)
        };
        let id = self.next_id();
        self.nodes.push(LineageNode {
            id,
            parent: Some(parent),
            origin,
            split_to: Some(new_type),
            generation,
        });
        Ok(id)
    }

    pub fn get(&self, id: LineageId) -> Result<&LineageNode> {
        self.nodes.get(id.index()).ok_or(SimError::InvalidLineage(id))
    }

    pub fn contains(&self, id: LineageId) -> bool {
        id.index() < self.nodes.len()
    }

    /// Types from the root down to `id`, one entry per node on the way.
    pub fn path(&self, id: LineageId) -> Result<Vec<RpsType>> {
        let mut node = self.get(id)?;
        let mut path = Vec::with_capacity(node.generation as usize + 1);
        path.push(node.resolved());
        while let Some(parent) = node.parent {
            node = self.get(parent)?;
            path.push(node.resolved());
        }
        path.reverse();
        Ok(path)
    }

    /// `"rock -> paper -> scissors"`
    pub fn path_string(&self, id: LineageId) -> Result<String> {
        let path = self.path(id)?;
        Ok(path.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(" -> "))
    }

    pub fn resolve_base_type(&self, id: LineageId) -> Result<RpsType> {
        Ok(self.get(id)?.resolved())
    }

    pub fn generation(&self, id: LineageId) -> Result<u32> {
        Ok(self.get(id)?.generation)
    }

    pub fn root_for(&self, kind: RpsType) -> Option<LineageId> {
        self.roots[kind.index()]
    }

    /// Canonical root for `kind`, created if the registry has none yet.
    pub fn ensure_root(&mut self, kind: RpsType) -> LineageId {
        match self.root_for(kind) {
            Some(id) => id,
            None => self.create_root(kind),
        }
    }

    /// All nodes in id order.
    pub fn nodes(&self) -> &[LineageNode] {
        &self.nodes
    }

    /// Nodes whose gameplay type is `kind`.
    pub fn nodes_resolving_to(&self, kind: RpsType) -> impl Iterator<Item = &LineageNode> + '_ {
        self.nodes.iter().filter(move |n| n.resolved() == kind)
    }

    /// Number of split nodes (roots excluded).
    pub fn split_count(&self) -> usize {
        self.nodes.iter().filter(|n| !n.is_root()).count()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Rebuild a registry from exported nodes, checking that ids are dense
    /// and every parent precedes its child.
    pub fn from_nodes(nodes: Vec<LineageNode>) -> Result<Self> {
        let mut registry = Self::new();
        for node in nodes {
            if node.id != registry.next_id() {
                return Err(SimError::Persistence(format!(
                    "lineage node {} out of order",
                    node.id
                )));
            }
            match node.parent {
                Some(parent) if !registry.contains(parent) => {
                    return Err(SimError::InvalidLineage(parent));
                }
                None => {
                    registry.roots[node.origin.index()].get_or_insert(node.id);
                }
                _ => {}
            }
            registry.nodes.push(node);
        }
        Ok(registry)
    }
}

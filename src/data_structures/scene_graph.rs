//! Scene graph and hierarchical scene organization.
//!
//! A [`Scene`] owns a tree of [`Node`]s. Loaded assets append whole subtrees,
//! lights are plain nodes, and animation mixers address their subtree through
//! the [`NodeId`] of its root. Nothing is ever removed from the graph while the
//! viewer runs.

use std::{
    fmt::Display,
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
};

use crate::data_structures::{
    instance::Instance,
    light::Light,
    material::{EnvironmentMap, Material},
    mesh::MeshData,
};

static NEXT_NODE_ID: AtomicU32 = AtomicU32::new(1);

/// Process-wide unique identifier of a scene node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A renderable primitive together with its material slot.
#[derive(Clone, Debug)]
pub struct MeshNode {
    pub mesh: Arc<MeshData>,
    pub material: Material,
}

#[derive(Clone, Debug)]
pub enum NodeKind {
    Group,
    Mesh(MeshNode),
    Light(Light),
}

#[derive(Clone, Debug)]
pub struct Node {
    id: NodeId,
    pub name: Option<String>,
    pub transform: Instance,
    pub kind: NodeKind,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
    /// Index of the glTF node this node was built from; animation channels target it.
    pub source_index: Option<usize>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            id: NodeId::next(),
            name: None,
            transform: Instance::default(),
            kind,
            cast_shadow: false,
            receive_shadow: false,
            source_index: None,
            children: Vec::new(),
        }
    }

    pub fn group() -> Self {
        Self::new(NodeKind::Group)
    }

    pub fn mesh(mesh: Arc<MeshData>, material: Material) -> Self {
        Self::new(NodeKind::Mesh(MeshNode { mesh, material }))
    }

    pub fn light(light: Light) -> Self {
        Self::new(NodeKind::Light(light))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_position(mut self, position: cgmath::Vector3<f32>) -> Self {
        self.transform.position = position;
        self
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn add(&mut self, child: Node) {
        self.children.push(child);
    }

    pub fn as_mesh(&self) -> Option<&MeshNode> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn as_mesh_mut(&mut self) -> Option<&mut MeshNode> {
        match &mut self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    /// Depth-first, parent before children.
    pub fn traverse<'a>(&'a self, f: &mut dyn FnMut(&'a Node)) {
        f(self);
        for child in &self.children {
            child.traverse(f);
        }
    }

    /// Depth-first, parent before children.
    pub fn traverse_mut(&mut self, f: &mut dyn FnMut(&mut Node)) {
        f(self);
        for child in self.children.iter_mut() {
            child.traverse_mut(f);
        }
    }

    pub fn find(&self, id: NodeId) -> Option<&Node> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(id))
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Node> {
        if self.name.as_deref() == Some(name) {
            return Some(self);
        }
        self.children
            .iter()
            .find_map(|child| child.find_by_name(name))
    }

    pub fn mesh_count(&self) -> usize {
        let mut count = 0;
        self.traverse(&mut |node| {
            if node.as_mesh().is_some() {
                count += 1;
            }
        });
        count
    }

    /**
     * Visits every node together with its world transform.
     *
     * `parent` is the world transform of the node this subtree hangs from.
     */
    pub fn visit_world<'a>(&'a self, parent: &Instance, f: &mut dyn FnMut(&'a Node, &Instance)) {
        let world = parent * &self.transform;
        f(self, &world);
        for child in &self.children {
            child.visit_world(&world, f);
        }
    }
}

/// Root of everything that gets rendered.
#[derive(Debug)]
pub struct Scene {
    root: Node,
    /// Shared environment used for lighting and as the reflection source of materials.
    pub environment: Option<Arc<EnvironmentMap>>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            root: Node::group().with_name("root"),
            environment: None,
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn children(&self) -> &[Node] {
        &self.root.children
    }

    /// Appends a subtree and returns the id of its root.
    pub fn add(&mut self, node: Node) -> NodeId {
        let id = node.id();
        self.root.add(node);
        id
    }

    pub fn find(&self, id: NodeId) -> Option<&Node> {
        self.root.find(id)
    }

    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.root.find_mut(id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Node> {
        self.root.find_by_name(name)
    }

    pub fn traverse<'a>(&'a self, f: &mut dyn FnMut(&'a Node)) {
        self.root.traverse(f);
    }

    pub fn traverse_mut(&mut self, f: &mut dyn FnMut(&mut Node)) {
        self.root.traverse_mut(f);
    }

    pub fn visit_world<'a>(&'a self, f: &mut dyn FnMut(&'a Node, &Instance)) {
        self.root.visit_world(&Instance::default(), f);
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

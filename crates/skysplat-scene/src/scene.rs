use glam::{DMat4, DVec3};

/// Handle to a node in a [`Scene`]. Handles are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Positions and colors carried by a single point set node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointSet {
    /// Point positions in the node's local frame
    pub positions: Vec<DVec3>,
    /// Per-point colors
    pub colors: Vec<[u8; 3]>,
}

impl PointSet {
    /// Number of points.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the set holds no points.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Payload of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Pure transform node
    Empty,
    /// Camera placeholder
    Camera,
    /// Point cloud
    Points(PointSet),
}

/// A node of the scene graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Display name
    pub name: String,
    /// Parent node, `None` for top level nodes
    pub parent: Option<NodeId>,
    /// Transform relative to the parent
    pub local: DMat4,
    /// Payload
    pub kind: NodeKind,
}

/// A minimal transform hierarchy standing in for an editor's object graph.
///
/// World placement of a node is the product of the local matrices from the top
/// level down to the node.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    nodes: Vec<Option<Node>>,
}

impl Scene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node and return its handle.
    ///
    /// A parent that no longer exists is ignored and the node becomes top level.
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        parent: Option<NodeId>,
        local: DMat4,
        kind: NodeKind,
    ) -> NodeId {
        let parent = parent.filter(|p| self.contains(*p));
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(Node {
            name: name.into(),
            parent,
            local,
            kind,
        }));
        id
    }

    /// Whether the node is still in the scene.
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Borrow a node.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    /// Mutably borrow a node.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    /// Whether the scene holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live nodes with their handles.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(idx, node)| node.as_ref().map(|n| (NodeId(idx), n)))
    }

    /// Direct children of a node.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.iter()
            .filter(move |(_, node)| node.parent == Some(id))
            .map(|(child, _)| child)
    }

    /// Replace the local transform. Returns `false` if the node does not exist.
    pub fn set_local(&mut self, id: NodeId, local: DMat4) -> bool {
        match self.get_mut(id) {
            Some(node) => {
                node.local = local;
                true
            }
            None => false,
        }
    }

    /// World transform of a node: parent chain composed with the local matrix.
    pub fn world_matrix(&self, id: NodeId) -> Option<DMat4> {
        let mut node = self.get(id)?;
        let mut world = node.local;
        // bounded walk, a parent chain can never be longer than the arena
        for _ in 0..self.nodes.len() {
            match node.parent.and_then(|p| self.get(p)) {
                Some(parent) => {
                    world = parent.local * world;
                    node = parent;
                }
                None => return Some(world),
            }
        }
        None
    }

    /// Remove a node. Children are lifted to the removed node's parent and keep
    /// their world placement.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        let removed_world = self.world_matrix(id)?;
        let parent_world = self
            .get(id)?
            .parent
            .and_then(|p| self.world_matrix(p))
            .unwrap_or(DMat4::IDENTITY);
        let children = self.children(id).collect::<Vec<_>>();
        let removed = self.nodes.get_mut(id.0)?.take()?;

        let lift = parent_world.inverse() * removed_world;
        for child in children {
            if let Some(node) = self.get_mut(child) {
                node.parent = removed.parent;
                node.local = lift * node.local;
            }
        }
        Some(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DQuat;

    #[test]
    fn test_world_matrix_composes_parents() {
        let mut scene = Scene::new();
        let root_m = DMat4::from_scale_rotation_translation(
            DVec3::splat(2.0),
            DQuat::from_rotation_y(0.5),
            DVec3::new(1.0, 0.0, 0.0),
        );
        let child_m = DMat4::from_translation(DVec3::new(0.0, 0.0, 3.0));
        let root = scene.add_node("root", None, root_m, NodeKind::Empty);
        let child = scene.add_node("child", Some(root), child_m, NodeKind::Camera);

        assert_eq!(scene.world_matrix(root), Some(root_m));
        assert_eq!(scene.world_matrix(child), Some(root_m * child_m));
        assert_eq!(scene.children(root).collect::<Vec<_>>(), vec![child]);
    }

    #[test]
    fn test_remove_keeps_child_world_placement() {
        let mut scene = Scene::new();
        let root_m = DMat4::from_scale_rotation_translation(
            DVec3::splat(0.5),
            DQuat::from_rotation_x(-0.2),
            DVec3::new(0.0, 4.0, 0.0),
        );
        let root = scene.add_node("root", None, root_m, NodeKind::Empty);
        let child = scene.add_node(
            "child",
            Some(root),
            DMat4::from_translation(DVec3::X),
            NodeKind::Camera,
        );
        let before = scene.world_matrix(child).unwrap();

        assert!(scene.remove_node(root).is_some());
        assert!(!scene.contains(root));
        assert_eq!(scene.get(child).unwrap().parent, None);
        assert!(scene.world_matrix(child).unwrap().abs_diff_eq(before, 1e-12));
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn test_removed_handles_are_not_reused() {
        let mut scene = Scene::new();
        let a = scene.add_node("a", None, DMat4::IDENTITY, NodeKind::Empty);
        scene.remove_node(a);
        let b = scene.add_node("b", Some(a), DMat4::IDENTITY, NodeKind::Empty);
        assert_ne!(a, b);
        assert_eq!(scene.get(b).unwrap().parent, None);
        assert!(!scene.set_local(a, DMat4::IDENTITY));
    }
}

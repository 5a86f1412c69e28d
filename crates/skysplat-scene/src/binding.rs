use std::collections::BTreeMap;

use glam::{DMat4, DVec3};
use skysplat_colmap::Reconstruction;
use skysplat_geometry::{bridge::CoordinateBridge, pose::Rigid3, similarity::Similarity3};

use crate::{
    scene::{NodeId, NodeKind, PointSet, Scene},
    BindingWarning, SceneError,
};

/// Name of the root node created on bind.
pub const ROOT_NODE_NAME: &str = "colmap_root";

/// Name of the point set node created on bind.
pub const POINTS_NODE_NAME: &str = "colmap_points";

/// What a pose node was created from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseTag {
    /// Originating image id
    pub pose_id: u32,
    /// Camera id of the image
    pub camera_id: u32,
    /// Imported world-to-camera quaternion (`w, x, y, z`)
    pub qvec: [f64; 4],
    /// Imported world-to-camera translation
    pub tvec: [f64; 3],
}

/// Role of a node created by the binding.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeRole {
    /// The single user editable root
    Root,
    /// The point set; ids are parallel to the node's positions
    PointSet {
        /// Point ids in node order
        point_ids: Vec<u64>,
    },
    /// One posed image
    Pose(PoseTag),
}

/// Scene state read back from a binding without mutating it.
#[derive(Debug, Clone, Default)]
pub struct ReadBack {
    /// World matrix of every pose node still in the scene, by pose id
    pub poses: Vec<(u32, DMat4)>,
    /// World matrix of the point set node
    pub point_set: Option<DMat4>,
    /// Decomposed root transform
    pub root: Option<Similarity3>,
    /// Missing or degenerate nodes
    pub warnings: Vec<BindingWarning>,
}

/// A reconstruction bound to a scene graph.
///
/// Holds the scene plus a typed side table from node handles to their role. The
/// scene is handed out for editing; the side table is owned by the binding.
#[derive(Debug, Clone)]
pub struct SceneBinding {
    scene: Scene,
    roles: BTreeMap<NodeId, NodeRole>,
    pose_nodes: BTreeMap<u32, NodeId>,
    root: NodeId,
    point_set: NodeId,
    applied_bridge: bool,
}

impl SceneBinding {
    /// Bind a reconstruction to a fresh scene.
    ///
    /// Every image becomes a camera node placed at its camera-to-world matrix, all
    /// points go into one point set node, and both hang off a root at identity.
    /// With `apply_bridge` every matrix is conjugated and every point mapped through
    /// [`CoordinateBridge`].
    pub fn bind(model: &Reconstruction, apply_bridge: bool) -> Result<Self, SceneError> {
        let mut scene = Scene::new();
        let mut roles = BTreeMap::new();
        let mut pose_nodes = BTreeMap::new();

        let root = scene.add_node(ROOT_NODE_NAME, None, DMat4::IDENTITY, NodeKind::Empty);
        roles.insert(root, NodeRole::Root);

        for image in model.images.values() {
            let world_to_camera = Rigid3::from_colmap(image.rotation, image.translation)
                .map_err(|source| SceneError::InvalidPose {
                    pose_id: image.image_id,
                    source,
                })?;
            let camera_to_world = world_to_camera.inverse().to_matrix();
            let local = if apply_bridge {
                CoordinateBridge::conjugate(&camera_to_world)
            } else {
                camera_to_world
            };

            let node = scene.add_node(image.name.clone(), Some(root), local, NodeKind::Camera);
            roles.insert(
                node,
                NodeRole::Pose(PoseTag {
                    pose_id: image.image_id,
                    camera_id: image.camera_id,
                    qvec: image.rotation,
                    tvec: image.translation,
                }),
            );
            pose_nodes.insert(image.image_id, node);
        }

        let mut point_ids = Vec::with_capacity(model.points3d.len());
        let mut points = PointSet::default();
        for point in model.points3d.values() {
            let position = DVec3::from_array(point.xyz);
            points.positions.push(if apply_bridge {
                CoordinateBridge::point(position)
            } else {
                position
            });
            points.colors.push(point.rgb);
            point_ids.push(point.point3d_id);
        }
        let point_set = scene.add_node(
            POINTS_NODE_NAME,
            Some(root),
            DMat4::IDENTITY,
            NodeKind::Points(points),
        );
        roles.insert(point_set, NodeRole::PointSet { point_ids });

        log::debug!(
            "bound {} poses and {} points (bridge: {})",
            pose_nodes.len(),
            model.points3d.len(),
            apply_bridge
        );

        Ok(Self {
            scene,
            roles,
            pose_nodes,
            root,
            point_set,
            applied_bridge: apply_bridge,
        })
    }

    /// Replace this binding wholesale with a new model.
    pub fn rebind(&mut self, model: &Reconstruction, apply_bridge: bool) -> Result<(), SceneError> {
        *self = Self::bind(model, apply_bridge)?;
        Ok(())
    }

    /// The bound scene.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// The bound scene, for editing.
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// Whether the bridge was applied when binding.
    pub fn applied_bridge(&self) -> bool {
        self.applied_bridge
    }

    /// Handle of the root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Handle of the point set node.
    pub fn point_set_node(&self) -> NodeId {
        self.point_set
    }

    /// Handle of the node bound to a pose, if it is still in the scene.
    pub fn pose_node(&self, pose_id: u32) -> Option<NodeId> {
        self.pose_nodes
            .get(&pose_id)
            .copied()
            .filter(|node| self.scene.contains(*node))
    }

    /// Role of a node created by this binding.
    pub fn role(&self, node: NodeId) -> Option<&NodeRole> {
        self.roles.get(&node)
    }

    /// Bound point ids, parallel to the point set positions.
    pub fn point_ids(&self) -> &[u64] {
        match self.roles.get(&self.point_set) {
            Some(NodeRole::PointSet { point_ids }) => point_ids,
            _ => &[],
        }
    }

    /// Point set payload, if the node still exists.
    pub fn points(&self) -> Option<&PointSet> {
        match &self.scene.get(self.point_set)?.kind {
            NodeKind::Points(points) => Some(points),
            _ => None,
        }
    }

    /// Set the user edit on the root. Returns `false` if the root was deleted.
    pub fn set_root_transform(&mut self, transform: &Similarity3) -> bool {
        self.scene.set_local(self.root, transform.to_matrix())
    }

    /// Read world matrices and the root edit back from the scene.
    pub fn read_back(&self) -> ReadBack {
        let mut out = ReadBack::default();

        match self.scene.world_matrix(self.root) {
            Some(root) => match Similarity3::from_matrix(&root) {
                Ok(sim) => out.root = Some(sim),
                Err(e) => out.warnings.push(BindingWarning::DegenerateRoot(e.to_string())),
            },
            None => out.warnings.push(BindingWarning::MissingRoot),
        }

        for (pose_id, node) in &self.pose_nodes {
            match self.scene.world_matrix(*node) {
                Some(world) => out.poses.push((*pose_id, world)),
                None => {
                    let camera_id = match self.roles.get(node) {
                        Some(NodeRole::Pose(tag)) => tag.camera_id,
                        _ => 0,
                    };
                    out.warnings.push(BindingWarning::MissingPoseNode {
                        pose_id: *pose_id,
                        camera_id,
                    });
                }
            }
        }

        out.point_set = self.scene.world_matrix(self.point_set);
        if out.point_set.is_none() {
            out.warnings.push(BindingWarning::MissingPointSet);
        }

        out
    }
}

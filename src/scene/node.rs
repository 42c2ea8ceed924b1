//! Scene nodes

use super::NodeHandle;
use cgmath::{EuclideanSpace, Matrix4, Point3, Quaternion, SquareMatrix, Vector3};

/// A node in the scene tree.
///
/// The editable properties (name, transform, visibility) are what snapshots
/// capture and restore. Hierarchy links are owned by the [`Scene`](super::Scene)
/// and are only changed through its structural operations.
#[derive(Clone, Debug)]
pub struct Node {
    handle: NodeHandle,
    name: String,

    // Local transform components
    position: Point3<f32>,
    rotation: Quaternion<f32>,
    scale: Vector3<f32>,

    visible: bool,

    // Hierarchy
    parent: Option<NodeHandle>,
    children: Vec<NodeHandle>,

    // Refreshed when a transaction touching this node commits
    world_transform: Matrix4<f32>,
}

impl Node {
    /// Creates a detached node with an identity transform
    pub(crate) fn new(handle: NodeHandle, name: String) -> Self {
        Self {
            handle,
            name,
            position: Point3::new(0.0, 0.0, 0.0),
            rotation: Quaternion::new(1.0, 0.0, 0.0, 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
            visible: true,
            parent: None,
            children: Vec::new(),
            world_transform: Matrix4::identity(),
        }
    }

    pub fn handle(&self) -> NodeHandle {
        self.handle
    }

    pub(crate) fn set_handle(&mut self, handle: NodeHandle) {
        self.handle = handle;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    pub fn set_position(&mut self, position: Point3<f32>) {
        self.position = position;
    }

    pub fn rotation(&self) -> Quaternion<f32> {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: Quaternion<f32>) {
        self.rotation = rotation;
    }

    pub fn scale(&self) -> Vector3<f32> {
        self.scale
    }

    pub fn set_scale(&mut self, scale: Vector3<f32>) {
        self.scale = scale;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<NodeHandle>) {
        self.parent = parent;
    }

    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<NodeHandle> {
        &mut self.children
    }

    /// World transform as of the last committed transaction
    pub fn world_transform(&self) -> Matrix4<f32> {
        self.world_transform
    }

    pub(crate) fn set_world_transform(&mut self, transform: Matrix4<f32>) {
        self.world_transform = transform;
    }

    /// Translation * Rotation * Scale
    pub fn local_transform(&self) -> Matrix4<f32> {
        let translation = Matrix4::from_translation(self.position.to_vec());
        let rotation = Matrix4::from(self.rotation);
        let scale = Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z);

        translation * rotation * scale
    }

    /// Copies the editable properties of `other` into this node.
    ///
    /// Identity and hierarchy are left untouched.
    pub fn copy_from(&mut self, other: &Node) {
        self.name.clone_from(&other.name);
        self.position = other.position;
        self.rotation = other.rotation;
        self.scale = other.scale;
        self.visible = other.visible;
    }

    /// Whether any editable property differs from `other`
    pub fn differs_from(&self, other: &Node) -> bool {
        self.name != other.name
            || self.position != other.position
            || self.rotation != other.rotation
            || self.scale != other.scale
            || self.visible != other.visible
    }
}

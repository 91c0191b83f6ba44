//! Manipulation handle components.

use glam::Vec3;

bitflags::bitflags! {
    /// Axes a handle's drag is allowed to act on.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct AxisMask: u8 {
        const X = 0b0000_0001;
        const Y = 0b0000_0010;
        const Z = 0b0000_0100;
        const XY = Self::X.bits() | Self::Y.bits();
        const YZ = Self::Y.bits() | Self::Z.bits();
        const XZ = Self::X.bits() | Self::Z.bits();
        const XYZ = Self::X.bits() | Self::Y.bits() | Self::Z.bits();
    }
}

impl Default for AxisMask {
    fn default() -> Self {
        Self::empty()
    }
}

impl AxisMask {
    /// Mask of the dominant component of `axis`. Zero vectors give an empty mask.
    pub fn from_axis(axis: Vec3) -> Self {
        let a = axis.abs();
        if a.max_element() <= f32::EPSILON {
            Self::empty()
        } else if a.x >= a.y && a.x >= a.z {
            Self::X
        } else if a.y >= a.z {
            Self::Y
        } else {
            Self::Z
        }
    }

    /// Zero the components of `v` outside the mask.
    pub fn apply(self, v: Vec3) -> Vec3 {
        Vec3::new(
            if self.contains(Self::X) { v.x } else { 0.0 },
            if self.contains(Self::Y) { v.y } else { 0.0 },
            if self.contains(Self::Z) { v.z } else { 0.0 },
        )
    }

    /// Index (0, 1, 2) of the axis, for single-axis masks.
    pub fn index(self) -> Option<usize> {
        [Self::X, Self::Y, Self::Z].iter().position(|&axis| axis == self)
    }

    /// Unit vector of the axis, for single-axis masks.
    pub fn unit(self) -> Option<Vec3> {
        self.index().map(|i| Vec3::AXES[i])
    }
}

/// Opaque material handle owned by the host renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(pub u32);

/// Interaction state shown by a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandleVisual {
    #[default]
    Idle,
    Focused,
    Grabbed,
}

/// Materials for each [`HandleVisual`]. Missing entries fall back to `idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaterialSet {
    pub idle: Option<MaterialId>,
    pub focused: Option<MaterialId>,
    pub grabbed: Option<MaterialId>,
}

impl MaterialSet {
    pub fn uniform(material: MaterialId) -> Self {
        Self {
            idle: Some(material),
            focused: Some(material),
            grabbed: Some(material),
        }
    }

    pub fn for_visual(&self, visual: HandleVisual) -> Option<MaterialId> {
        match visual {
            HandleVisual::Idle => self.idle,
            HandleVisual::Focused => self.focused.or(self.idle),
            HandleVisual::Grabbed => self.grabbed.or(self.focused).or(self.idle),
        }
    }
}

/// What dragging a handle does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleRole {
    /// Free translation.
    Center,
    /// Translation along one axis.
    Axis,
    /// Translation within a plane of two axes.
    Plane,
    /// Uniform scale about the opposite corner.
    ScaleCorner,
    /// Scale along one axis about the opposite face.
    FaceScale,
    /// Rotation about the edge's axis through the box center.
    EdgeRotate,
    /// Wireframe edge, visual only.
    WireframeLink,
}

impl HandleRole {
    /// Roles handled by translation.
    pub fn is_translate(self) -> bool {
        matches!(self, Self::Center | Self::Axis | Self::Plane)
    }

    /// Roles that can be grabbed at all.
    pub fn is_grabbable(self) -> bool {
        self != Self::WireframeLink
    }
}

/// A draggable (or purely visual) part of a manipulation rig.
#[derive(Debug, Clone)]
pub struct ManipulationHandle {
    pub role: HandleRole,
    pub axis: AxisMask,
    /// Position in the owner's local space.
    pub local_position: Vec3,
    /// Pivot kept fixed while scaling, in the owner's local space.
    pub opposite: Vec3,
    /// Size of the visual in the owner's local space (wireframe links only).
    pub extent: Vec3,
    pub materials: MaterialSet,
    pub visible: bool,
    visual: HandleVisual,
    touches: u32,
}

impl ManipulationHandle {
    pub fn new(role: HandleRole, axis: AxisMask) -> Self {
        Self {
            role,
            axis,
            local_position: Vec3::ZERO,
            opposite: Vec3::ZERO,
            extent: Vec3::ZERO,
            materials: MaterialSet::default(),
            visible: true,
            visual: HandleVisual::Idle,
            touches: 0,
        }
    }

    /// A translate handle for [`AxisManipulationHandler`](super::AxisManipulationHandler).
    pub fn translate(axis: AxisMask) -> Self {
        let role = match axis.bits().count_ones() {
            1 => HandleRole::Axis,
            2 => HandleRole::Plane,
            _ => HandleRole::Center,
        };
        Self::new(role, axis)
    }

    pub fn with_materials(mut self, materials: MaterialSet) -> Self {
        self.materials = materials;
        self
    }

    #[inline]
    pub fn visual(&self) -> HandleVisual {
        self.visual
    }

    /// Material the renderer should currently use.
    pub fn material(&self) -> Option<MaterialId> {
        self.materials.for_visual(self.visual)
    }

    pub fn is_touched(&self) -> bool {
        self.touches > 0
    }

    pub(crate) fn touch_enter(&mut self) {
        self.touches += 1;
        if self.visual == HandleVisual::Idle {
            self.visual = HandleVisual::Focused;
        }
    }

    pub(crate) fn touch_exit(&mut self) {
        self.touches = self.touches.saturating_sub(1);
        if self.touches == 0 && self.visual == HandleVisual::Focused {
            self.visual = HandleVisual::Idle;
        }
    }

    pub(crate) fn grab(&mut self) {
        self.visual = HandleVisual::Grabbed;
    }

    pub(crate) fn release(&mut self) {
        self.visual = if self.is_touched() {
            HandleVisual::Focused
        } else {
            HandleVisual::Idle
        };
    }
}

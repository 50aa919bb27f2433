//! Geometry and uniforms drawn by the frame loop.

use std::mem::{offset_of, size_of};

use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use hearth_gpu::{VertexAttribute, VertexBinding};

/// Radians per second the quad turns.
pub const SPIN_RATE: f32 = 0.8;

/// A colored 2D vertex.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub color: [f32; 3],
}

impl Vertex {
    pub const fn new(position: [f32; 2], color: [f32; 3]) -> Self {
        Self { position, color }
    }

    pub fn bindings() -> Vec<VertexBinding> {
        vec![VertexBinding {
            binding: 0,
            stride: size_of::<Self>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }]
    }

    pub fn attributes() -> Vec<VertexAttribute> {
        vec![
            VertexAttribute {
                location: 0,
                binding: 0,
                format: vk::Format::R32G32_SFLOAT,
                offset: offset_of!(Self, position) as u32,
            },
            VertexAttribute {
                location: 1,
                binding: 0,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: offset_of!(Self, color) as u32,
            },
        ]
    }
}

pub const QUAD_VERTICES: [Vertex; 4] = [
    Vertex::new([-0.5, -0.5], [1.0, 0.3, 0.2]),
    Vertex::new([0.5, -0.5], [0.2, 1.0, 0.3]),
    Vertex::new([0.5, 0.5], [0.2, 0.3, 1.0]),
    Vertex::new([-0.5, 0.5], [1.0, 1.0, 0.3]),
];

pub const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 3, 0];

/// Uniform block read by the vertex shader at binding 0.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Uniforms {
    pub transform: [[f32; 4]; 4],
}

impl Default for Uniforms {
    fn default() -> Self {
        Self {
            transform: Mat4::IDENTITY.to_cols_array_2d(),
        }
    }
}

impl Uniforms {
    /// Rotate by `elapsed * SPIN_RATE` and undo the viewport's aspect stretch.
    pub fn spinning(elapsed: f32, extent: vk::Extent2D) -> Self {
        let aspect = if extent.height == 0 {
            1.0
        } else {
            extent.width as f32 / extent.height as f32
        };
        let transform = Mat4::from_scale(Vec3::new(1.0 / aspect, 1.0, 1.0))
            * Mat4::from_rotation_z(elapsed * SPIN_RATE);
        Self {
            transform: transform.to_cols_array_2d(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::Vec4;

    #[test]
    fn vertex_layout_matches_attributes() {
        assert_eq!(size_of::<Vertex>(), 20);
        let attributes = Vertex::attributes();
        assert_eq!(attributes[0].offset, 0);
        assert_eq!(attributes[1].offset, 8);
        assert_eq!(Vertex::bindings()[0].stride, 20);
    }

    #[test]
    fn quad_indices_stay_in_range() {
        assert!(QUAD_INDICES
            .iter()
            .all(|&i| (i as usize) < QUAD_VERTICES.len()));
    }

    #[test]
    fn square_viewport_at_rest_is_identity() {
        let uniforms = Uniforms::spinning(0.0, vk::Extent2D { width: 600, height: 600 });
        assert_eq!(uniforms, Uniforms::default());
    }

    #[test]
    fn wide_viewport_compresses_x() {
        let uniforms = Uniforms::spinning(0.0, vk::Extent2D { width: 1200, height: 600 });
        let m = Mat4::from_cols_array_2d(&uniforms.transform);
        let p = m * Vec4::new(0.5, 0.5, 0.0, 1.0);
        assert_relative_eq!(p.x, 0.25);
        assert_relative_eq!(p.y, 0.5);
    }

    #[test]
    fn quarter_turn_after_enough_time() {
        let t = std::f32::consts::FRAC_PI_2 / SPIN_RATE;
        let uniforms = Uniforms::spinning(t, vk::Extent2D { width: 100, height: 100 });
        let m = Mat4::from_cols_array_2d(&uniforms.transform);
        let p = m * Vec4::new(1.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn uniforms_are_one_mat4() {
        assert_eq!(bytemuck::bytes_of(&Uniforms::default()).len(), 64);
    }
}

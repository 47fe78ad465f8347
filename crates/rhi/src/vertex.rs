//! Mesh vertex layout.
//!
//! [`Vertex`] is the single vertex format consumed by the viewer pipeline:
//!
//! | location | field       | format             | offset |
//! |----------|-------------|--------------------|--------|
//! | 0        | `position`  | `R32G32B32_SFLOAT` | 0      |
//! | 1        | `normal`    | `R32G32B32_SFLOAT` | 12     |
//! | 2        | `tex_coord` | `R32G32_SFLOAT`    | 24     |
//!
//! Equality and hashing compare the raw bytes of every field, so two
//! vertices are equal exactly when all their floats are bit-identical. This
//! is what mesh deduplication keys on.

use std::hash::{Hash, Hasher};
use std::mem::offset_of;

use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tex_coord: Vec2,
}

impl Vertex {
    #[inline]
    pub const fn new(position: Vec3, normal: Vec3, tex_coord: Vec2) -> Self {
        Self {
            position,
            normal,
            tex_coord,
        }
    }

    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding: 0,
            stride: std::mem::size_of::<Self>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 3] {
        [
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 0,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: offset_of!(Vertex, position) as u32,
            },
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 1,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: offset_of!(Vertex, normal) as u32,
            },
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 2,
                format: vk::Format::R32G32_SFLOAT,
                offset: offset_of!(Vertex, tex_coord) as u32,
            },
        ]
    }
}

impl PartialEq for Vertex {
    fn eq(&self, other: &Self) -> bool {
        bytemuck::bytes_of(self) == bytemuck::bytes_of(other)
    }
}

impl Eq for Vertex {}

impl Hash for Vertex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        bytemuck::bytes_of(self).hash(state);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_vertex_size() {
        assert_eq!(std::mem::size_of::<Vertex>(), 32);
    }

    #[test]
    fn test_vertex_binding_description() {
        let binding = Vertex::binding_description();
        assert_eq!(binding.binding, 0);
        assert_eq!(binding.stride, 32);
        assert_eq!(binding.input_rate, vk::VertexInputRate::VERTEX);
    }

    #[test]
    fn test_vertex_attribute_descriptions() {
        let attrs = Vertex::attribute_descriptions();

        assert_eq!(attrs[0].location, 0);
        assert_eq!(attrs[0].format, vk::Format::R32G32B32_SFLOAT);
        assert_eq!(attrs[0].offset, 0);

        assert_eq!(attrs[1].location, 1);
        assert_eq!(attrs[1].format, vk::Format::R32G32B32_SFLOAT);
        assert_eq!(attrs[1].offset, 12);

        assert_eq!(attrs[2].location, 2);
        assert_eq!(attrs[2].format, vk::Format::R32G32_SFLOAT);
        assert_eq!(attrs[2].offset, 24);
    }

    #[test]
    fn test_vertex_equality_is_bitwise() {
        let a = Vertex::new(Vec3::X, Vec3::Y, Vec2::new(0.5, 0.25));
        let b = Vertex::new(Vec3::X, Vec3::Y, Vec2::new(0.5, 0.25));
        assert_eq!(a, b);

        // 0.0 and -0.0 compare equal as floats but differ in bits.
        let pos_zero = Vertex::new(Vec3::ZERO, Vec3::Y, Vec2::ZERO);
        let neg_zero = Vertex::new(Vec3::new(-0.0, 0.0, 0.0), Vec3::Y, Vec2::ZERO);
        assert_ne!(pos_zero, neg_zero);
    }

    #[test]
    fn test_vertex_hash_matches_equality() {
        let a = Vertex::new(Vec3::ONE, Vec3::Z, Vec2::ONE);
        let mut set = HashSet::new();
        set.insert(a);
        set.insert(a);
        set.insert(Vertex::new(Vec3::ONE, Vec3::Z, Vec2::ZERO));
        assert_eq!(set.len(), 2);
    }
}

//! Indexed triangle meshes loaded from Wavefront OBJ.
//!
//! Every face corner becomes a [`Vertex`] built from its position, normal
//! and texture coordinate. Corners whose three attributes are bit-identical
//! share one entry in the vertex array, and the index array refers back to
//! that first occurrence.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use glam::{Vec2, Vec3};
use tracing::{debug, info, warn};
use viewer_rhi::vertex::Vertex;

use crate::error::{ResourceError, ResourceResult};

/// Deduplicated vertex and index arrays.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Loads and deduplicates an OBJ file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be opened or parsed, contains no faces, or
    /// references missing attributes.
    pub fn load_obj(path: &Path) -> ResourceResult<Self> {
        let file = File::open(path).map_err(|source| ResourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mesh = Self::from_obj_reader(&mut BufReader::new(file), path)?;

        info!(
            "Loaded {}: {} unique vertices, {} indices",
            path.display(),
            mesh.vertices.len(),
            mesh.indices.len()
        );

        Ok(mesh)
    }

    /// Parses OBJ text from any buffered reader. `path` is used for errors.
    pub fn from_obj_reader<R: BufRead>(reader: &mut R, path: &Path) -> ResourceResult<Self> {
        let options = tobj::LoadOptions {
            triangulate: true,
            single_index: false,
            ..Default::default()
        };

        // Materials are not used; a missing .mtl is not an error.
        let (models, _materials) = tobj::load_obj_buf(reader, &options, |_| {
            Ok((Vec::new(), Default::default()))
        })
        .map_err(|source| ResourceError::Obj {
            path: path.to_path_buf(),
            source,
        })?;

        let mut builder = MeshBuilder::default();

        for model in &models {
            let mesh = &model.mesh;
            debug!(
                "OBJ object '{}': {} corner(s)",
                model.name,
                mesh.indices.len()
            );

            if mesh.normals.is_empty() {
                warn!("OBJ object '{}' has no normals", model.name);
            }

            for (corner, &position_index) in mesh.indices.iter().enumerate() {
                let position = read_vec3(&mesh.positions, position_index as usize, "position", path)?;

                let normal = match mesh.normal_indices.get(corner) {
                    Some(&i) => read_vec3(&mesh.normals, i as usize, "normal", path)?,
                    None => Vec3::ZERO,
                };

                let tex_coord = match mesh.texcoord_indices.get(corner) {
                    Some(&i) => read_vec2(&mesh.texcoords, i as usize, "texcoord", path)?,
                    None => Vec2::ZERO,
                };

                builder.push(Vertex::new(position, normal, tex_coord), path)?;
            }
        }

        let mesh = builder.finish();
        if mesh.indices.is_empty() {
            return Err(ResourceError::EmptyMesh(path.to_path_buf()));
        }
        Ok(mesh)
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }
}

/// Incremental vertex deduplication.
#[derive(Default)]
pub struct MeshBuilder {
    unique: HashMap<Vertex, u32>,
    mesh: MeshData,
}

impl MeshBuilder {
    /// Appends one face corner, reusing the index of an identical vertex.
    pub fn push(&mut self, vertex: Vertex, path: &Path) -> ResourceResult<u32> {
        let index = match self.unique.get(&vertex) {
            Some(&index) => index,
            None => {
                let index = u32::try_from(self.mesh.vertices.len())
                    .map_err(|_| ResourceError::TooManyVertices(path.to_path_buf()))?;
                self.unique.insert(vertex, index);
                self.mesh.vertices.push(vertex);
                index
            }
        };
        self.mesh.indices.push(index);
        Ok(index)
    }

    pub fn finish(self) -> MeshData {
        self.mesh
    }
}

fn read_vec3(data: &[f32], index: usize, attribute: &'static str, path: &Path) -> ResourceResult<Vec3> {
    data.get(3 * index..3 * index + 3)
        .map(Vec3::from_slice)
        .ok_or(ResourceError::AttributeIndex {
            path: path.to_path_buf(),
            attribute,
            index,
            len: data.len() / 3,
        })
}

fn read_vec2(data: &[f32], index: usize, attribute: &'static str, path: &Path) -> ResourceResult<Vec2> {
    data.get(2 * index..2 * index + 2)
        .map(Vec2::from_slice)
        .ok_or(ResourceError::AttributeIndex {
            path: path.to_path_buf(),
            attribute,
            index,
            len: data.len() / 2,
        })
}

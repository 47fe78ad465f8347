//! The full set of CPU-side assets the viewer needs at startup.

use std::path::Path;

use crate::error::ResourceResult;
use crate::image_data::ImageData;
use crate::mesh::MeshData;

/// Model geometry plus its diffuse and specular maps.
#[derive(Debug)]
pub struct ViewerAssets {
    pub mesh: MeshData,
    pub diffuse: ImageData,
    pub specular: ImageData,
}

impl ViewerAssets {
    pub fn load(model: &Path, diffuse: &Path, specular: &Path) -> ResourceResult<Self> {
        Ok(Self {
            mesh: MeshData::load_obj(model)?,
            diffuse: ImageData::load(diffuse)?,
            specular: ImageData::load(specular)?,
        })
    }
}

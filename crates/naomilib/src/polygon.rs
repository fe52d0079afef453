//! Polygon files: model snapshots plus the texture header table.

use std::path::Path;

use glam::Vec3;
use naomilib_decode::{
    Compression, Mesh, Model, TextureDef, decompress_polygon_buffer, resolve_model_ram_offset,
    scan_models, scan_texture_table,
};

use crate::{Error, Result};

/// A parsed polygon file.
#[derive(Debug, Clone)]
pub struct PolygonFile {
    /// The decompressed file contents every address refers to.
    pub data: Vec<u8>,
    /// How `data` was recovered from the bytes on disk.
    pub compression: Compression,
    /// Runtime address the file was loaded at.
    pub ram_offset: u32,
    pub models: Vec<Model>,
    pub textures: Vec<TextureDef>,
}

impl PolygonFile {
    /// Parse a polygon file, decompressing it first if needed.
    ///
    /// Fails only when the file header cannot be read. Damaged models are
    /// returned partially decoded, and an unreadable texture table leaves
    /// `textures` empty.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let (data, compression) = decompress_polygon_buffer(bytes)?;
        let ram_offset = resolve_model_ram_offset(&data)?;
        let models = scan_models(&data)?;
        let textures = scan_texture_table(&data).unwrap_or_else(|e| {
            tracing::warn!("unreadable texture table: {e}");
            Vec::new()
        });

        tracing::info!(
            models = models.len(),
            textures = textures.len(),
            ?compression,
            "loaded polygon file"
        );

        Ok(Self {
            data,
            compression,
            ram_offset,
            models,
            textures,
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "reading polygon file");
        Self::parse(&std::fs::read(path)?)
    }

    pub fn texture(&self, index: usize) -> Result<&TextureDef> {
        self.textures.get(index).ok_or(Error::UnknownTexture(index))
    }

    /// The texture a mesh samples, if the table has it.
    #[must_use]
    pub fn mesh_texture(&self, mesh: &Mesh) -> Option<&TextureDef> {
        self.textures.get(mesh.texture_index())
    }

    /// Axis-aligned bounds of every decoded vertex, if there are any.
    #[must_use]
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        self.models
            .iter()
            .flat_map(Model::polygons)
            .flat_map(|p| p.vertices.iter())
            .map(|v| v.position)
            .fold(None, |bounds, p| match bounds {
                None => Some((p, p)),
                Some((min, max)) => Some((min.min(p), max.max(p))),
            })
    }
}

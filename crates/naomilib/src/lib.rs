//! Load, edit and re-export NaomiLib polygon and texture files.
//!
//! This crate wraps the pure codecs of [`naomilib_decode`] with file-level
//! handling: detecting compression, decoding textures to images, applying
//! edits and writing the result back in the original container.
//!
//! # Example
//!
//! ```no_run
//! use naomilib::{ExportOptions, PolygonFile, TextureFile, TextureFileKind};
//!
//! # fn main() -> naomilib::Result<()> {
//! let polygons = PolygonFile::from_path("STG00POL.BIN")?;
//! let mut textures =
//!     TextureFile::from_path("STG00TEX.BIN", &polygons.textures, TextureFileKind::Stage)?;
//!
//! let mut image = textures.decode_texture(0)?;
//! image::imageops::flip_horizontal_in_place(&mut image);
//! textures.replace_texture(0, &image, &ExportOptions::default())?;
//! textures.export_to("STG00TEX.BIN", &ExportOptions::default())?;
//! # Ok(())
//! # }
//! ```

mod error;
mod polygon;
mod texture_file;

pub use error::{Error, Result};
pub use polygon::PolygonFile;
pub use texture_file::{EXPORT_MARKER, ExportOptions, TextureFile, exported_file_name};

pub use naomilib_decode as decode;
pub use naomilib_decode::{
    Compression, HslAdjustment, Mesh, Model, Polygon, SectionLayout, TextureDef, TextureFileKind,
    Vertex,
};

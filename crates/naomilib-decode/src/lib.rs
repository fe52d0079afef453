//! Decode and encode NaomiLib model and texture binaries.
//!
//! This crate provides pure synchronous functions over byte slices: scanning
//! the pointer-laden model snapshots of polygon files, the texture header
//! table, the word-oriented LZSS and VQ codecs, packed pixel formats and the
//! twiddled texture layout. Nothing here performs I/O or spawns threads; the
//! caller decides how to parallelize.
//!
//! # Design principles
//!
//! - **Synchronous**: No async, no threading primitives
//! - **Best effort**: Per-record failures yield partial results, not errors
//! - **Checked reads**: Malformed input never panics or reads out of bounds
//!
//! # Key functions
//!
//! - [`scan_models`]: Walk every model listed in a polygon file
//! - [`scan_texture_table`]: Read the texture header table
//! - [`decode_texture`] / [`write_texture_region`]: Texture pixels to and from RGBA8888
//! - [`bitstream::compress`] / [`bitstream::decompress`]: LZSS codec
//! - [`vq::compress`] / [`vq::decompress`]: Vector quantization codec
//! - [`decompress_polygon_buffer`] / [`decompress_texture_buffer`]: Compression probes

mod error;
mod kmeans;

pub mod address;
pub mod bitstream;
pub mod compression;
pub mod export;
pub mod hsl;
pub mod indices;
pub mod morton;
pub mod pixel;
pub mod quantize;
pub mod reader;
pub mod scanner;
pub mod scene;
pub mod sections;
pub mod texture;
pub mod vq;

pub use address::{ModelTable, resolve_model_ram_offset, scan_model_pointer_table, to_file_offset};
pub use compression::{
    Compression, decompress_polygon_buffer, decompress_texture_buffer, probe_polygon_buffer,
    probe_texture_buffer, recompress,
};
pub use error::{DecodeError, DecodeResult};
pub use export::write_texture_region;
pub use hsl::{HslAdjustment, adjust_hsl};
pub use morton::{decode_z_morton_position, encode_z_morton_position, twiddled_index};
pub use pixel::{ColorFormat, Rgba};
pub use quantize::{TextureFileKind, quantize_rgba};
pub use scanner::{ContentMode, ModelScan, classify_content_mode, scan_model, scan_models};
pub use scene::{
    Mesh, Model, Polygon, TextureWrapping, Vertex, VertexAddressing, VertexGroupMode,
    VertexNormal,
};
pub use sections::{DecodedSections, SectionLayout, decode_sections, encode_sections};
pub use texture::{
    MAX_TEXTURE_DIMENSION, TextureDef, decode_texture, scan_texture_headers, scan_texture_table,
};

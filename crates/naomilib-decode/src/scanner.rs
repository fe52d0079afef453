//! Model, mesh, polygon and vertex scanning.
//!
//! Models are walked from their header through a run of variable-length
//! records. There is no explicit mesh count: a zero word where a mesh header
//! or vertex record would start ends the model, and is followed by the
//! model's total vertex count.
//!
//! ```text
//! model header (0x14)
//!   mesh header (0x44)        polygon_data_length bytes of:
//!     polygon header (0x08)
//!       vertex record (0x20 direct | 0x28 reference) × actual count
//!     polygon header ...
//!   mesh header ...
//! 0x00000000, total vertex count
//! ```
//!
//! Scanning never panics on malformed input. A model that fails part-way is
//! returned with everything decoded up to the failure.

use glam::{Vec2, Vec3};

use crate::address::scan_model_pointer_table;
use crate::error::{DecodeError, DecodeResult};
use crate::reader::{Field, Primitive, read_u32};
use crate::scene::{
    Mesh, Model, Polygon, Vertex, VertexAddressing, VertexGroupMode, VertexNormal,
};

pub const MODEL_HEADER_SIZE: usize = 0x14;
pub const MESH_HEADER_SIZE: usize = 0x44;
pub const POLYGON_HEADER_SIZE: usize = 0x08;
pub const DIRECT_VERTEX_SIZE: usize = 0x20;
pub const REFERENCE_HEADER_SIZE: usize = 0x08;
pub const REFERENCE_VERTEX_SIZE: usize = REFERENCE_HEADER_SIZE + DIRECT_VERTEX_SIZE;
pub const MAX_VERTEX_RECORD_SIZE: usize = REFERENCE_VERTEX_SIZE;

mod model_layout {
    use super::{Field, Primitive};

    pub const FLAGS: Field = Field::new(0x00, Primitive::U32);
    pub const POSITION: Field = Field::new(0x04, Primitive::Vec3);
    pub const RADIUS: Field = Field::new(0x10, Primitive::F32);
}

mod mesh_layout {
    use super::{Field, Primitive};

    pub const BASE_PARAMS: Field = Field::new(0x00, Primitive::U32);
    pub const ISP_PARAMS: Field = Field::new(0x04, Primitive::U32);
    pub const TSP_PARAMS: Field = Field::new(0x08, Primitive::U32);
    pub const TEXTURE_CONTROL: Field = Field::new(0x0C, Primitive::U32);
    pub const POSITION: Field = Field::new(0x10, Primitive::Vec3);
    pub const RADIUS: Field = Field::new(0x1C, Primitive::F32);
    pub const BASE_ALPHA: Field = Field::new(0x20, Primitive::F32);
    pub const BASE_COLOR: Field = Field::new(0x24, Primitive::Vec3);
    pub const SPECULAR_ALPHA: Field = Field::new(0x30, Primitive::F32);
    pub const SPECULAR_COLOR: Field = Field::new(0x34, Primitive::Vec3);
    pub const POLYGON_DATA_LENGTH: Field = Field::new(0x40, Primitive::U32);
}

mod polygon_layout {
    use super::{Field, Primitive};

    pub const GROUP_MODE: Field = Field::new(0x00, Primitive::U32);
    pub const VERTEX_COUNT: Field = Field::new(0x04, Primitive::U32);
}

mod vertex_layout {
    use super::{Field, Primitive};

    pub const POSITION: Field = Field::new(0x00, Primitive::Vec3);
    pub const NORMAL: Field = Field::new(0x0C, Primitive::Vec3);
    /// Three signed bytes in place of the float normal.
    pub const PACKED_NORMAL: Field = Field::new(0x0C, Primitive::U32);
    pub const COLOR: Field = Field::new(0x10, Primitive::U32);
    pub const UV: Field = Field::new(0x18, Primitive::Vec2);
    /// Relative to the reference record, not its body.
    pub const REFERENCE_OFFSET: Field = Field::new(0x04, Primitive::I32);
}

/// How a vertex record is encoded, decided from its first word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentMode {
    Direct,
    Reference,
}

/// Classify a vertex record by its content-mode word.
///
/// In a direct record this word is the position's x coordinate. Reference
/// records put a NaN-range marker there instead: a high half of
/// `0x5FFB..=0x5FFF`.
#[must_use]
pub fn classify_content_mode(word: u32) -> ContentMode {
    if (0x5FFB..=0x5FFF).contains(&(word >> 16)) {
        ContentMode::Reference
    } else {
        ContentMode::Direct
    }
}

/// A model scan, including the failure that cut it short, if any.
#[derive(Debug, Clone)]
pub struct ModelScan {
    pub model: Model,
    pub error: Option<DecodeError>,
}

/// Scan every model listed in a polygon file's model table.
///
/// Fails only if the file header itself is unreadable. Models that fail
/// part-way are logged and kept in their partial state.
pub fn scan_models(buf: &[u8]) -> DecodeResult<Vec<Model>> {
    let table = scan_model_pointer_table(buf)?;
    let mut models = Vec::with_capacity(table.offsets.len());

    for (index, &address) in table.offsets.iter().enumerate() {
        let ModelScan { model, error } = scan_model(buf, address);
        if let Some(e) = error {
            tracing::warn!(
                index,
                address = format_args!("{address:#x}"),
                meshes = model.meshes.len(),
                "model scan stopped early: {e}"
            );
        }
        models.push(model);
    }

    tracing::debug!(models = models.len(), "scanned polygon file");
    Ok(models)
}

/// Scan the model whose header starts at file offset `address`.
#[must_use]
pub fn scan_model(buf: &[u8], address: usize) -> ModelScan {
    let mut model = Model {
        address,
        ..Model::default()
    };
    let error = walk_model(buf, &mut model).err();
    ModelScan { model, error }
}

fn walk_model(buf: &[u8], model: &mut Model) -> DecodeResult<()> {
    let base = model.address;
    model.flags = model_layout::FLAGS.read(buf, base)?.as_u32();
    model.position = model_layout::POSITION.read(buf, base)?.as_vec3();
    model.radius = model_layout::RADIUS.read(buf, base)?.as_f32();

    let mut cursor = base + MODEL_HEADER_SIZE;
    loop {
        if read_u32(buf, cursor)? == 0 {
            model.total_vertex_count = Some(read_u32(buf, cursor + 4)?);
            return Ok(());
        }

        let mesh = read_mesh_header(buf, cursor)?;
        cursor += MESH_HEADER_SIZE;
        let mesh_end = cursor.saturating_add(mesh.polygon_data_length as usize);

        model.meshes.push(mesh);
        let index = model.meshes.len() - 1;
        let end = walk_mesh(buf, &mut model.meshes[index], &mut cursor, mesh_end)?;

        if let MeshEnd::Model { total_vertex_count } = end {
            model.total_vertex_count = Some(total_vertex_count);
            return Ok(());
        }
    }
}

/// How a mesh's polygon loop finished.
enum MeshEnd {
    /// The polygon data was used up; another mesh or the model end follows.
    Mesh,
    /// A zero word inside the polygon data ended the whole model.
    Model { total_vertex_count: u32 },
}

fn walk_mesh(
    buf: &[u8],
    mesh: &mut Mesh,
    cursor: &mut usize,
    mesh_end: usize,
) -> DecodeResult<MeshEnd> {
    let vertex_colors = mesh.uses_vertex_colors();

    while *cursor < mesh_end && *cursor + MAX_VERTEX_RECORD_SIZE < buf.len() {
        let raw_mode = polygon_layout::GROUP_MODE.read(buf, *cursor)?.as_u32();
        let vertex_count = polygon_layout::VERTEX_COUNT.read(buf, *cursor)?.as_u32();
        let vertex_group_mode = VertexGroupMode::from_raw(raw_mode);
        let actual_vertex_count = vertex_group_mode.actual_vertex_count(vertex_count);

        mesh.polygons.push(Polygon {
            address: *cursor,
            vertex_group_mode_value: raw_mode,
            vertex_group_mode,
            vertex_count,
            actual_vertex_count,
            vertices: Vec::new(),
        });
        let index = mesh.polygons.len() - 1;
        let polygon = &mut mesh.polygons[index];
        *cursor += POLYGON_HEADER_SIZE;

        for _ in 0..actual_vertex_count {
            if read_u32(buf, *cursor)? == 0 {
                let total_vertex_count = read_u32(buf, *cursor + 4)?;
                *cursor += 8;
                return Ok(MeshEnd::Model { total_vertex_count });
            }

            let (vertex, size) = read_vertex(buf, *cursor, vertex_colors)?;
            polygon.vertices.push(vertex);
            *cursor += size;

            if *cursor >= mesh_end {
                return Ok(MeshEnd::Mesh);
            }
        }
    }

    // The buffer ran out before the declared polygon data did.
    if *cursor < mesh_end {
        return Err(DecodeError::OutOfBounds {
            offset: *cursor,
            len: mesh_end - *cursor,
            buffer_len: buf.len(),
        });
    }
    Ok(MeshEnd::Mesh)
}

fn read_mesh_header(buf: &[u8], at: usize) -> DecodeResult<Mesh> {
    use mesh_layout as l;

    Ok(Mesh {
        address: at,
        base_params: l::BASE_PARAMS.read(buf, at)?.as_u32(),
        isp_params: l::ISP_PARAMS.read(buf, at)?.as_u32(),
        tsp_params: l::TSP_PARAMS.read(buf, at)?.as_u32(),
        texture_control: l::TEXTURE_CONTROL.read(buf, at)?.as_u32(),
        position: l::POSITION.read(buf, at)?.as_vec3(),
        radius: l::RADIUS.read(buf, at)?.as_f32(),
        base_alpha: l::BASE_ALPHA.read(buf, at)?.as_f32(),
        base_color: l::BASE_COLOR.read(buf, at)?.as_vec3(),
        specular_alpha: l::SPECULAR_ALPHA.read(buf, at)?.as_f32(),
        specular_color: l::SPECULAR_COLOR.read(buf, at)?.as_vec3(),
        polygon_data_length: l::POLYGON_DATA_LENGTH.read(buf, at)?.as_u32(),
        polygons: Vec::new(),
    })
}

/// Decode the vertex record at `at`, returning it with its record size.
pub fn read_vertex(buf: &[u8], at: usize, vertex_colors: bool) -> DecodeResult<(Vertex, usize)> {
    match classify_content_mode(read_u32(buf, at)?) {
        ContentMode::Direct => {
            let (position, normal) = read_shared_attributes(buf, at, vertex_colors)?;
            let vertex = Vertex {
                address: at,
                addressing: VertexAddressing::Direct,
                position,
                normal,
                uv: read_uv(buf, at)?,
            };
            Ok((vertex, DIRECT_VERTEX_SIZE))
        }
        ContentMode::Reference => {
            let offset = vertex_layout::REFERENCE_OFFSET.read(buf, at)?.as_i32();
            let target = reference_target(at, offset)?;
            if classify_content_mode(read_u32(buf, target)?) == ContentMode::Reference {
                return Err(DecodeError::invalid(
                    "vertex reference",
                    format!("record at {at:#x} refers to another reference at {target:#x}"),
                ));
            }

            let (position, normal) = read_shared_attributes(buf, target, vertex_colors)?;
            let vertex = Vertex {
                address: at,
                addressing: VertexAddressing::Reference { offset },
                position,
                normal,
                uv: read_uv(buf, at + REFERENCE_HEADER_SIZE)?,
            };
            Ok((vertex, REFERENCE_VERTEX_SIZE))
        }
    }
}

/// Resolve the body a reference record points at.
fn reference_target(at: usize, offset: i32) -> DecodeResult<usize> {
    (offset as isize)
        .checked_add(REFERENCE_HEADER_SIZE as isize)
        .and_then(|delta| at.checked_add_signed(delta))
        .ok_or_else(|| {
            DecodeError::invalid(
                "vertex reference",
                format!("offset {offset} from {at:#x} points before the file"),
            )
        })
}

/// Position and normal of the direct vertex body at `at`.
fn read_shared_attributes(
    buf: &[u8],
    at: usize,
    vertex_colors: bool,
) -> DecodeResult<(Vec3, VertexNormal)> {
    let position = vertex_layout::POSITION.read(buf, at)?.as_vec3();
    let normal = if vertex_colors {
        let [x, y, z, _] = vertex_layout::PACKED_NORMAL.read(buf, at)?.as_u32().to_le_bytes();
        VertexNormal::Packed {
            normal: [x as i8, y as i8, z as i8],
            color: vertex_layout::COLOR.read(buf, at)?.as_u32(),
        }
    } else {
        VertexNormal::Float(vertex_layout::NORMAL.read(buf, at)?.as_vec3())
    };
    Ok((position, normal))
}

fn read_uv(buf: &[u8], body: usize) -> DecodeResult<Vec2> {
    Ok(vertex_layout::UV.read(buf, body)?.as_vec2())
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::compression::decompress_polygon_buffer;
    use proptest::prelude::*;

    #[test]
    fn test_content_mode_boundaries() {
        assert_eq!(classify_content_mode(0x5FFB_0000), ContentMode::Reference);
        assert_eq!(classify_content_mode(0x5FFF_FFFF), ContentMode::Reference);
        assert_eq!(classify_content_mode(0x5FFA_FFFF), ContentMode::Direct);
        assert_eq!(classify_content_mode(0x6000_0000), ContentMode::Direct);
        assert_eq!(classify_content_mode(1.0f32.to_bits()), ContentMode::Direct);
    }

    #[test]
    fn test_scan_single_triangle() {
        let buf = single_triangle_file();
        let models = scan_models(&buf).unwrap();
        assert_eq!(models.len(), 1);

        let model = &models[0];
        assert_eq!(model.address, 0x18);
        assert_eq!(model.position, Vec3::new(0.0, 1.0, 2.0));
        assert_eq!(model.radius, 5.0);
        assert_eq!(model.total_vertex_count, Some(3));
        assert_eq!(model.meshes.len(), 1);

        let mesh = &model.meshes[0];
        assert!(mesh.is_opaque());
        assert_eq!(mesh.texture_index(), 3);
        assert_eq!(mesh.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(mesh.polygons.len(), 1);

        let polygon = &mesh.polygons[0];
        assert_eq!(polygon.vertex_group_mode, VertexGroupMode::Regular);
        assert_eq!(polygon.vertices.len(), 3);
        assert_eq!(polygon.vertices[1].position, Vec3::new(2.0, 2.5, -2.0));
        assert!(polygon.vertices[2].uv.abs_diff_eq(Vec2::new(0.3, 0.7), 1e-6));
        assert_eq!(polygon.vertices[0].normal, VertexNormal::Float(Vec3::Y));
        assert_eq!(polygon.triangle_indices(), vec![0, 1, 2]);
    }

    #[test]
    fn test_scan_reference_vertex() {
        let mut w = Writer::default();
        w.polygon_file_header(1);
        w.u32(RAM_OFFSET + 0x18);
        w.model_header([0.0; 3], 1.0);
        let data_len = (POLYGON_HEADER_SIZE + 2 * DIRECT_VERTEX_SIZE + REFERENCE_VERTEX_SIZE) as u32;
        w.mesh_header(0, 0, data_len);
        w.u32(0).u32(3);
        let first = w.pos();
        w.direct_vertex(4.0).direct_vertex(5.0);
        let reference = w.pos();
        let offset = first as i32 - (reference + REFERENCE_HEADER_SIZE) as i32;
        w.reference_vertex(offset, [0.25, 0.75]);
        w.u32(0).u32(3);

        let models = scan_models(&w.buf).unwrap();
        let vertices = &models[0].meshes[0].polygons[0].vertices;
        assert_eq!(vertices.len(), 3);
        assert_eq!(vertices[2].addressing, VertexAddressing::Reference { offset });
        assert_eq!(vertices[2].position, vertices[0].position);
        assert_eq!(vertices[2].uv, Vec2::new(0.25, 0.75));
        assert_eq!(models[0].total_vertex_count, Some(3));
    }

    #[test]
    fn test_triple_mode_multiplies_count() {
        let mut w = Writer::default();
        w.polygon_file_header(1);
        w.u32(RAM_OFFSET + 0x18);
        w.model_header([0.0; 3], 1.0);
        let data_len = (POLYGON_HEADER_SIZE + 6 * DIRECT_VERTEX_SIZE) as u32;
        w.mesh_header(0, 0, data_len);
        w.u32(0x8).u32(2);
        for i in 0..6 {
            w.direct_vertex(i as f32);
        }
        w.u32(0).u32(6);

        let models = scan_models(&w.buf).unwrap();
        let polygon = &models[0].meshes[0].polygons[0];
        assert_eq!(polygon.vertex_group_mode, VertexGroupMode::Triple);
        assert_eq!(polygon.actual_vertex_count, 6);
        assert_eq!(polygon.vertices.len(), 6);
        assert_eq!(polygon.triangle_indices(), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_zero_word_in_vertex_run_ends_model() {
        // Header claims four vertices but the model ends after two.
        let mut w = Writer::default();
        w.polygon_file_header(1);
        w.u32(RAM_OFFSET + 0x18);
        w.model_header([0.0; 3], 1.0);
        w.mesh_header(0, 0, 0x1000);
        w.u32(0).u32(4);
        w.direct_vertex(1.0).direct_vertex(2.0);
        w.u32(0).u32(2);
        w.buf.extend_from_slice(&[0xAA; 64]);

        let models = scan_models(&w.buf).unwrap();
        assert_eq!(models[0].total_vertex_count, Some(2));
        assert_eq!(models[0].meshes[0].polygons[0].vertices.len(), 2);
    }

    #[test]
    fn test_two_meshes() {
        let mut w = Writer::default();
        w.polygon_file_header(1);
        w.u32(RAM_OFFSET + 0x18);
        w.model_header([0.0; 3], 1.0);
        let data_len = (POLYGON_HEADER_SIZE + 3 * DIRECT_VERTEX_SIZE) as u32;
        for texture in [1, 2] {
            w.mesh_header(0, texture, data_len);
            w.u32(0).u32(3);
            w.direct_vertex(0.0).direct_vertex(1.0).direct_vertex(2.0);
        }
        w.u32(0).u32(6);

        let model = &scan_models(&w.buf).unwrap()[0];
        assert_eq!(model.meshes.len(), 2);
        assert_eq!(model.meshes[1].texture_index(), 2);
        assert_eq!(model.decoded_vertex_count(), 6);
        assert_eq!(model.total_vertex_count, Some(6));
    }

    #[test]
    fn test_truncated_model_keeps_partial_results() {
        let mut buf = single_triangle_file();
        // Cut the file inside the third vertex.
        buf.truncate(buf.len() - 20);

        let scan = scan_model(&buf, 0x18);
        assert!(scan.error.as_ref().is_some_and(DecodeError::is_out_of_bounds));
        assert_eq!(scan.model.meshes.len(), 1);
        assert_eq!(scan.model.meshes[0].polygons[0].vertices.len(), 2);
        assert_eq!(scan.model.total_vertex_count, None);
    }

    #[test]
    fn test_bad_model_does_not_affect_siblings() {
        let mut buf = single_triangle_file();
        // Add a second table entry pointing at garbage past the first model.
        let garbage = buf.len() as u32;
        buf.extend_from_slice(&[0x11; 0x50]);
        let mut w = Writer { buf };
        w.patch_u32(4, 2);
        // The table sits at 0x14; shift models down by inserting the entry.
        w.buf.splice(0x18..0x18, (RAM_OFFSET + garbage + 4).to_le_bytes());
        w.patch_u32(0x14, RAM_OFFSET + 0x1C);

        let models = scan_models(&w.buf).unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].total_vertex_count, Some(3));
        assert_eq!(models[0].meshes[0].polygons[0].vertices.len(), 3);
        assert_eq!(models[1].total_vertex_count, None);
    }

    #[test]
    fn test_self_reference_chain_is_an_error() {
        let mut w = Writer::default();
        w.polygon_file_header(1);
        w.u32(RAM_OFFSET + 0x18);
        w.model_header([0.0; 3], 1.0);
        w.mesh_header(0, 0, 0x100);
        w.u32(0).u32(1);
        // Points at itself.
        w.reference_vertex(-(REFERENCE_HEADER_SIZE as i32), [0.0, 0.0]);
        w.u32(0).u32(1);
        w.buf.extend_from_slice(&[0; 64]);

        let scan = scan_model(&w.buf, 0x18);
        assert!(matches!(scan.error, Some(DecodeError::InvalidFormat { .. })));
    }

    #[test]
    fn test_vertex_color_mode() {
        let mut buf = vec![0u8; DIRECT_VERTEX_SIZE];
        buf[0..4].copy_from_slice(&2.0f32.to_le_bytes());
        buf[0x0C] = 127;
        buf[0x0E] = 0x81; // -127
        buf[0x10..0x14].copy_from_slice(&0xFF10_2030_u32.to_le_bytes());

        let (vertex, size) = read_vertex(&buf, 0, true).unwrap();
        assert_eq!(size, DIRECT_VERTEX_SIZE);
        assert_eq!(vertex.position.x, 2.0);
        assert_eq!(vertex.normal.to_vec3(), Vec3::new(1.0, 0.0, -1.0));
        assert_eq!(vertex.normal.color(), Some([0x10, 0x20, 0x30, 0xFF]));
    }

    #[test]
    fn test_scan_terminates_on_every_truncation() {
        let buf = single_triangle_file();
        for len in 0..buf.len() {
            let scan = scan_model(&buf[..len], 0x18);
            assert!(scan.error.is_some(), "length {len}");
            assert_eq!(scan.model.total_vertex_count, None);
        }
        assert!(scan_model(&buf, 0x18).error.is_none());
    }

    proptest! {
        #[test]
        fn prop_scan_arbitrary_bytes(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
            if let Ok(models) = scan_models(&bytes) {
                prop_assert!(models.len() <= bytes.len() / 4);
            }
            let _ = decompress_polygon_buffer(&bytes);
        }

        #[test]
        fn prop_scan_corrupted_file(
            edits in proptest::collection::vec((any::<prop::sample::Index>(), any::<u8>()), 1..8)
        ) {
            let mut buf = single_triangle_file();
            for (index, value) in edits {
                let at = index.index(buf.len());
                buf[at] = value;
            }
            let scan = scan_model(&buf, 0x18);
            prop_assert!(scan.model.decoded_vertex_count() <= buf.len() / POLYGON_HEADER_SIZE);
            let _ = scan_models(&buf);
            let _ = decompress_polygon_buffer(&buf);
        }
    }
}

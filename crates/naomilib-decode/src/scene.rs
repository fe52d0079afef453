//! Scene graph produced by the polygon scanner.
//!
//! Models own meshes, meshes own polygons, polygons own vertices. Every
//! list is in file order.

use bitflags::bitflags;
use glam::{Vec2, Vec3};

use crate::indices::{strip_to_triangles, triangle_list};

/// A top-level object from the model table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    /// File offset of the model header.
    pub address: usize,
    pub flags: u32,
    pub position: Vec3,
    /// Bounding sphere radius.
    pub radius: f32,
    pub meshes: Vec<Mesh>,
    /// Trailing vertex count. Only set once the end sentinel has been read,
    /// so a model that was cut short keeps `None`.
    pub total_vertex_count: Option<u32>,
}

impl Model {
    /// Iterate over every polygon of every mesh.
    pub fn polygons(&self) -> impl Iterator<Item = &Polygon> {
        self.meshes.iter().flat_map(|m| m.polygons.iter())
    }

    /// Number of vertices actually decoded.
    #[must_use]
    pub fn decoded_vertex_count(&self) -> usize {
        self.meshes.iter().map(Mesh::vertex_count).sum()
    }
}

bitflags! {
    /// How a mesh samples its texture outside 0..1.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct TextureWrapping: u8 {
        /// Mirror horizontally.
        const FLIP_U = 1 << 0;
        /// Mirror vertically.
        const FLIP_V = 1 << 1;
        const REPEAT_U = 1 << 2;
        const REPEAT_V = 1 << 3;
        /// Clamp horizontally.
        const STRETCH_U = 1 << 4;
        /// Clamp vertically.
        const STRETCH_V = 1 << 5;
    }
}

/// TSP instruction word bits used to derive mesh attributes.
pub(crate) mod tsp {
    pub const CLAMP_V: u32 = 0x0000_8000;
    pub const CLAMP_U: u32 = 0x0001_0000;
    pub const FLIP_V: u32 = 0x0002_0000;
    pub const FLIP_U: u32 = 0x0004_0000;
    pub const USE_ALPHA: u32 = 0x0010_0000;

    pub fn dst_alpha_instr(word: u32) -> u32 {
        (word & 0x1C00_0000) >> 26
    }

    pub fn src_alpha_instr(word: u32) -> u32 {
        (word & 0xE000_0000) >> 29
    }
}

/// Parameter control word bits used to derive mesh attributes.
pub(crate) mod pcw {
    pub const GOURAUD: u32 = 0x0000_0002;

    pub fn col_type(word: u32) -> u32 {
        (word & 0x0000_0030) >> 4
    }
}

/// One render batch: shared material state plus its polygons.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// File offset of the mesh header.
    pub address: usize,
    /// Parameter control word.
    pub base_params: u32,
    /// ISP/TSP instruction word.
    pub isp_params: u32,
    /// TSP instruction word.
    pub tsp_params: u32,
    /// Texture control word as stored.
    pub texture_control: u32,
    pub position: Vec3,
    pub radius: f32,
    pub base_alpha: f32,
    pub base_color: Vec3,
    pub specular_alpha: f32,
    pub specular_color: Vec3,
    /// Bytes of polygon data following the header.
    pub polygon_data_length: u32,
    pub polygons: Vec<Polygon>,
}

impl Mesh {
    /// Index into the texture definition table.
    #[must_use]
    pub fn texture_index(&self) -> usize {
        (self.texture_control & 0xFFFF) as usize
    }

    /// Opaque meshes blend `ONE, ZERO` and ignore vertex alpha.
    #[must_use]
    pub fn is_opaque(&self) -> bool {
        tsp::src_alpha_instr(self.tsp_params) == 1
            && tsp::dst_alpha_instr(self.tsp_params) == 0
            && self.tsp_params & tsp::USE_ALPHA == 0
    }

    #[must_use]
    pub fn texture_wrapping(&self) -> TextureWrapping {
        let t = self.tsp_params;
        let mut flags = TextureWrapping::empty();
        flags.set(TextureWrapping::FLIP_U, t & tsp::FLIP_U != 0);
        flags.set(TextureWrapping::FLIP_V, t & tsp::FLIP_V != 0);
        if t & tsp::CLAMP_U != 0 {
            flags |= TextureWrapping::STRETCH_U;
        } else {
            flags |= TextureWrapping::REPEAT_U;
        }
        if t & tsp::CLAMP_V != 0 {
            flags |= TextureWrapping::STRETCH_V;
        } else {
            flags |= TextureWrapping::REPEAT_V;
        }
        flags
    }

    /// Gouraud-shaded packed-colour meshes store a colour in every vertex.
    #[must_use]
    pub fn uses_vertex_colors(&self) -> bool {
        self.base_params & pcw::GOURAUD != 0 && pcw::col_type(self.base_params) == 0
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.polygons.iter().map(|p| p.vertices.len()).sum()
    }
}

/// How a polygon's vertices form triangles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VertexGroupMode {
    /// A triangle strip.
    #[default]
    Regular,
    /// Independent triangles; the stored count is in triangles.
    Triple,
}

impl VertexGroupMode {
    /// Bit 3 of the raw mode value selects triangle lists.
    #[must_use]
    pub fn from_raw(value: u32) -> Self {
        if value & 0x8 != 0 {
            Self::Triple
        } else {
            Self::Regular
        }
    }

    /// Number of vertex records that follow a header with `count`.
    #[must_use]
    pub fn actual_vertex_count(self, count: u32) -> u32 {
        match self {
            Self::Regular => count,
            Self::Triple => count.saturating_mul(3),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polygon {
    /// File offset of the polygon header.
    pub address: usize,
    pub vertex_group_mode_value: u32,
    pub vertex_group_mode: VertexGroupMode,
    /// Count as stored in the header.
    pub vertex_count: u32,
    /// Number of vertex records the header announces.
    pub actual_vertex_count: u32,
    pub vertices: Vec<Vertex>,
}

impl Polygon {
    /// Triangle indices into `vertices`, degenerate triangles removed.
    #[must_use]
    pub fn triangle_indices(&self) -> Vec<u32> {
        let n = self.vertices.len() as u32;
        match self.vertex_group_mode {
            VertexGroupMode::Regular => strip_to_triangles(&(0..n).collect::<Vec<_>>()),
            VertexGroupMode::Triple => triangle_list(n),
        }
    }
}

/// How a vertex record stores its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexAddressing {
    /// Position and normal are stored in the record.
    Direct,
    /// Position and normal are borrowed from an earlier record `offset`
    /// bytes away (measured from the end of the reference header).
    Reference { offset: i32 },
}

/// Normal data, which vertex-colour meshes pack together with a colour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VertexNormal {
    Float(Vec3),
    Packed { normal: [i8; 3], color: u32 },
}

impl VertexNormal {
    /// The normal as a float vector.
    #[must_use]
    pub fn to_vec3(&self) -> Vec3 {
        match *self {
            Self::Float(n) => n,
            Self::Packed { normal, .. } => {
                Vec3::new(f32::from(normal[0]), f32::from(normal[1]), f32::from(normal[2])) / 127.0
            }
        }
    }

    /// The vertex colour as RGBA, if this vertex carries one.
    #[must_use]
    pub fn color(&self) -> Option<[u8; 4]> {
        match *self {
            Self::Float(_) => None,
            Self::Packed { color, .. } => {
                let [b, g, r, a] = color.to_le_bytes();
                Some([r, g, b, a])
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// File offset of the vertex record.
    pub address: usize,
    pub addressing: VertexAddressing,
    pub position: Vec3,
    pub normal: VertexNormal,
    pub uv: Vec2,
}

//! Dump a polygon file (and optionally its texture file) for inspection.
//!
//! Prints a scene summary, writes it as JSON, and decodes every texture to
//! PNG. Textures are decoded in parallel on blocking worker threads.
//!
//! Run: `cargo run -p naomilib --features test-tools --bin dump_scene -- <polygon file> [texture file] [--kind portrait]`

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use naomilib::{PolygonFile, TextureFile, TextureFileKind};

#[derive(Parser)]
#[command(name = "dump_scene", about = "Dump a NaomiLib polygon file and its textures")]
struct Cli {
    /// Polygon (model) file
    polygon: PathBuf,

    /// Texture file addressed by the polygon file's texture table
    texture: Option<PathBuf>,

    /// What the texture file holds; decides how it is decompressed
    #[arg(short, long, value_enum, default_value_t = Kind::Stage)]
    kind: Kind,

    /// Directory to write the summary and PNGs into
    #[arg(short, long, default_value = "scene_dump")]
    output: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Stage,
    Portrait,
    Selection,
}

impl From<Kind> for TextureFileKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Stage => Self::Stage,
            Kind::Portrait => Self::Portrait,
            Kind::Selection => Self::SelectionScreen,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let output_path = cli.output.as_path();
    fs::create_dir_all(output_path)?;

    println!("1. Loading polygon file {}...", cli.polygon.display());
    let polygons = PolygonFile::from_path(&cli.polygon)?;
    print_summary(&polygons);
    save_scene_json(&polygons, output_path)?;

    if let Some(texture_path) = &cli.texture {
        println!("\n2. Loading texture file {}...", texture_path.display());
        let textures = TextureFile::from_path(texture_path, &polygons.textures, cli.kind.into())?;
        println!(
            "   {} bytes, compression: {:?}",
            textures.data().len(),
            textures.compression()
        );
        let written = save_textures(Arc::new(textures), output_path).await?;
        println!("   Wrote {written} textures");
    }

    println!("\nOutput written to '{}/'", output_path.display());
    Ok(())
}

fn print_summary(polygons: &PolygonFile) {
    println!(
        "   ram_offset={:#010x}, compression={:?}",
        polygons.ram_offset, polygons.compression
    );
    println!(
        "   {} models, {} texture definitions",
        polygons.models.len(),
        polygons.textures.len()
    );
    for (i, model) in polygons.models.iter().enumerate() {
        println!(
            "   model {i} @ {:#x}: {} meshes, {} vertices (declared {:?})",
            model.address,
            model.meshes.len(),
            model.decoded_vertex_count(),
            model.total_vertex_count
        );
    }
    if let Some((min, max)) = polygons.bounds() {
        println!("   bounds: {min} .. {max}");
    }
}

fn save_scene_json(polygons: &PolygonFile, output_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let scene_json = serde_json::json!({
        "ram_offset": polygons.ram_offset,
        "compressed": polygons.compression.is_compressed(),
        "models": polygons.models.iter().map(|m| {
            serde_json::json!({
                "address": m.address,
                "position": [m.position.x, m.position.y, m.position.z],
                "radius": m.radius,
                "total_vertex_count": m.total_vertex_count,
                "meshes": m.meshes.iter().map(|mesh| {
                    serde_json::json!({
                        "address": mesh.address,
                        "texture_index": mesh.texture_index(),
                        "opaque": mesh.is_opaque(),
                        "vertex_colors": mesh.uses_vertex_colors(),
                        "wrapping": mesh.texture_wrapping().bits(),
                        "polygon_count": mesh.polygons.len(),
                        "vertex_count": mesh.vertex_count(),
                        "triangle_count": mesh.polygons.iter()
                            .map(|p| p.triangle_indices().len() / 3)
                            .sum::<usize>(),
                    })
                }).collect::<Vec<_>>(),
            })
        }).collect::<Vec<_>>(),
        "textures": polygons.textures.iter().map(|t| {
            serde_json::json!({
                "index": t.index,
                "width": t.width,
                "height": t.height,
                "format": format!("{:?}", t.color_format),
                "type": t.texture_type,
                "base_location": t.base_location,
            })
        }).collect::<Vec<_>>(),
    });

    let json_path = output_path.join("scene.json");
    File::create(&json_path)?.write_all(serde_json::to_string_pretty(&scene_json)?.as_bytes())?;
    println!("   Saved summary to {}", json_path.display());
    Ok(())
}

async fn save_textures(
    textures: Arc<TextureFile>,
    output_path: &Path,
) -> Result<usize, Box<dyn std::error::Error>> {
    let mut tasks = Vec::new();
    for def in textures.textures() {
        let textures = Arc::clone(&textures);
        let index = def.index;
        let path: PathBuf = output_path.join(format!("texture_{index:03}.png"));
        tasks.push(tokio::task::spawn_blocking(move || {
            textures
                .decode_texture(index)
                .map_err(|e| e.to_string())
                .and_then(|image| image.save(&path).map_err(|e| e.to_string()))
        }));
    }

    let mut written = 0;
    for task in tasks {
        match task.await? {
            Ok(()) => written += 1,
            Err(e) => eprintln!("   texture failed: {e}"),
        }
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_defaults_to_stage() {
        let cli = Cli::try_parse_from(["dump_scene", "STG00POL.BIN", "STG00TEX.BIN"]).unwrap();
        assert_eq!(cli.texture, Some(PathBuf::from("STG00TEX.BIN")));
        assert_eq!(TextureFileKind::from(cli.kind), TextureFileKind::Stage);
        assert_eq!(cli.output, PathBuf::from("scene_dump"));
    }

    #[test]
    fn test_kind_is_parsed() {
        let cli = Cli::try_parse_from(["dump_scene", "a", "b", "--kind", "selection"]).unwrap();
        assert_eq!(TextureFileKind::from(cli.kind), TextureFileKind::SelectionScreen);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        assert!(Cli::try_parse_from(["dump_scene", "a", "b", "--kind", "bogus"]).is_err());
        assert!(Cli::try_parse_from(["dump_scene", "a", "b", "portrait"]).is_err());
    }
}

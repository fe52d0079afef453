//! Vector quantization for RGB565 image data.
//!
//! A vector is four consecutive RGB565 words. The stream holds a 256-entry
//! codebook of vectors followed by one index byte per encoded vector.

use crate::error::{DecodeError, DecodeResult};
use crate::kmeans::{DEFAULT_ITERATIONS, kmeans};
use crate::pixel::{rgb565_to_rgba8888, rgba8888_to_rgb565};
use crate::reader::{word_bytes, words};

/// Number of codebook entries.
pub const CODEBOOK_ENTRIES: usize = 256;
/// Words per vector.
pub const VECTOR_WORDS: usize = 4;
/// Bytes per vector.
pub const VECTOR_BYTES: usize = VECTOR_WORDS * 2;
/// Size of the codebook in bytes.
pub const CODEBOOK_BYTES: usize = CODEBOOK_ENTRIES * VECTOR_BYTES;
/// Fill word for unused codebook entries (mid gray).
pub const PAD_WORD: u16 = 0x8410;

/// Expand a VQ stream into RGB565 bytes.
pub fn decompress(data: &[u8]) -> DecodeResult<Vec<u8>> {
    if data.len() < CODEBOOK_BYTES {
        return Err(DecodeError::BufferTooSmall {
            expected: CODEBOOK_BYTES,
            actual: data.len(),
        });
    }

    let codebook = words(&data[..CODEBOOK_BYTES])?;
    let indices = &data[CODEBOOK_BYTES..];

    let mut out = Vec::with_capacity(indices.len() * VECTOR_WORDS);
    for &index in indices {
        let start = usize::from(index) * VECTOR_WORDS;
        out.extend_from_slice(&codebook[start..start + VECTOR_WORDS]);
    }
    Ok(word_bytes(&out))
}

/// Quantize RGB565 bytes into a VQ stream.
///
/// Lossy. When the input has at most 256 distinct vectors the codebook holds
/// them exactly and decompression reproduces the input.
pub fn compress(data: &[u8]) -> DecodeResult<Vec<u8>> {
    if data.len() % VECTOR_BYTES != 0 {
        return Err(DecodeError::invalid(
            "vq input",
            format!(
                "{} bytes is not a whole number of {VECTOR_BYTES}-byte vectors",
                data.len()
            ),
        ));
    }

    let pixels = words(data)?;
    let vectors: Vec<[f32; VECTOR_WORDS * 3]> = pixels
        .chunks_exact(VECTOR_WORDS)
        .map(vector_to_rgb)
        .collect();

    let clustering = kmeans(&vectors, CODEBOOK_ENTRIES, DEFAULT_ITERATIONS);

    let mut codebook: Vec<u16> = clustering
        .centroids
        .iter()
        .flat_map(rgb_to_vector)
        .collect();
    codebook.resize(CODEBOOK_BYTES / 2, PAD_WORD);

    let mut out = word_bytes(&codebook);
    out.extend(clustering.assignments.iter().map(|&i| i as u8));
    Ok(out)
}

fn vector_to_rgb(vector: &[u16]) -> [f32; VECTOR_WORDS * 3] {
    let mut out = [0.0; VECTOR_WORDS * 3];
    for (slot, &word) in out.chunks_exact_mut(3).zip(vector) {
        let [r, g, b, _] = rgb565_to_rgba8888(word);
        slot.copy_from_slice(&[f32::from(r), f32::from(g), f32::from(b)]);
    }
    out
}

fn rgb_to_vector(centroid: &[f32; VECTOR_WORDS * 3]) -> [u16; VECTOR_WORDS] {
    let mut out = [0u16; VECTOR_WORDS];
    for (word, rgb) in out.iter_mut().zip(centroid.chunks_exact(3)) {
        let channel = |v: f32| v.round().clamp(0.0, 255.0) as u8;
        *word = rgba8888_to_rgb565([channel(rgb[0]), channel(rgb[1]), channel(rgb[2]), 0xFF]);
    }
    out
}

//! Z-order (Morton) coordinates and the twiddled texture layout.

/// Spread the low 16 bits of `v` so they occupy the even bit positions.
#[inline]
fn part_1_by_1(v: u32) -> u32 {
    let mut x = v & 0x0000_FFFF;
    x = (x | (x << 8)) & 0x00FF_00FF;
    x = (x | (x << 4)) & 0x0F0F_0F0F;
    x = (x | (x << 2)) & 0x3333_3333;
    x = (x | (x << 1)) & 0x5555_5555;
    x
}

/// Gather the even bit positions of `v` into the low 16 bits.
#[inline]
fn compact_1_by_1(v: u32) -> u32 {
    let mut x = v & 0x5555_5555;
    x = (x | (x >> 1)) & 0x3333_3333;
    x = (x | (x >> 2)) & 0x0F0F_0F0F;
    x = (x | (x >> 4)) & 0x00FF_00FF;
    x = (x | (x >> 8)) & 0x0000_FFFF;
    x
}

/// Interleave `x` (even bits) and `y` (odd bits) into a Z-order index.
#[must_use]
pub fn encode_z_morton_position(x: u16, y: u16) -> u32 {
    part_1_by_1(u32::from(x)) | (part_1_by_1(u32::from(y)) << 1)
}

/// Split a Z-order index back into `(x, y)`.
#[must_use]
pub fn decode_z_morton_position(index: u32) -> (u16, u16) {
    (
        compact_1_by_1(index) as u16,
        compact_1_by_1(index >> 1) as u16,
    )
}

/// Word index of pixel `(x, y)` in a twiddled `width × height` texture.
///
/// The hardware twiddles square blocks whose side is the smaller dimension;
/// rectangular textures are a run of such blocks along the longer side.
/// Within a block the row coordinate occupies the lowest interleaved bit.
#[must_use]
pub fn twiddled_index(x: u32, y: u32, width: u32, height: u32) -> usize {
    let side = width.min(height).max(1);
    let block = if width >= height { x / side } else { y / side };
    let inner = encode_z_morton_position((y % side) as u16, (x % side) as u16);
    (block * side * side + inner) as usize
}

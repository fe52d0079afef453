//! Triangle index expansion.

/// Expand a triangle strip into a triangle list.
///
/// Winding alternates every triangle so all faces keep the orientation of
/// the first. Degenerate triangles (a repeated index) are dropped.
#[must_use]
pub fn strip_to_triangles(strip: &[u32]) -> Vec<u32> {
    let mut triangles = Vec::with_capacity(strip.len().saturating_sub(2) * 3);
    for (i, window) in strip.windows(3).enumerate() {
        let (a, b, c) = (window[0], window[1], window[2]);
        if a == b || b == c || a == c {
            continue;
        }
        if i % 2 == 0 {
            triangles.extend_from_slice(&[a, b, c]);
        } else {
            triangles.extend_from_slice(&[b, a, c]);
        }
    }
    triangles
}

/// Indices for `vertex_count` vertices laid out as independent triangles.
///
/// Trailing vertices that do not complete a triangle are ignored.
#[must_use]
pub fn triangle_list(vertex_count: u32) -> Vec<u32> {
    (0..vertex_count - vertex_count % 3).collect()
}

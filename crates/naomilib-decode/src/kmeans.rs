//! Deterministic k-means clustering shared by VQ and palette reduction.

use std::collections::HashMap;

/// Upper bound on refinement passes.
pub(crate) const DEFAULT_ITERATIONS: usize = 12;

/// Cluster centres and the cluster each input point was assigned to.
#[derive(Debug, Clone)]
pub(crate) struct Clustering<const N: usize> {
    pub centroids: Vec<[f32; N]>,
    pub assignments: Vec<usize>,
}

/// Cluster `points` into at most `k` groups.
///
/// Identical points are merged and weighted before clustering. When there
/// are no more distinct points than `k` every distinct point becomes its own
/// centroid, so the result is exact. Initial centroids are spread evenly
/// over the distinct points in first-seen order, which keeps the output
/// reproducible.
pub(crate) fn kmeans<const N: usize>(
    points: &[[f32; N]],
    k: usize,
    iterations: usize,
) -> Clustering<N> {
    let mut index_of: HashMap<[u32; N], usize> = HashMap::new();
    let mut unique: Vec<[f32; N]> = Vec::new();
    let mut weights: Vec<f32> = Vec::new();
    let mut point_to_unique = Vec::with_capacity(points.len());

    for point in points {
        let key = point.map(f32::to_bits);
        let idx = *index_of.entry(key).or_insert_with(|| {
            unique.push(*point);
            weights.push(0.0);
            unique.len() - 1
        });
        weights[idx] += 1.0;
        point_to_unique.push(idx);
    }

    if k == 0 || unique.is_empty() {
        return Clustering {
            centroids: Vec::new(),
            assignments: vec![0; points.len()],
        };
    }

    if unique.len() <= k {
        return Clustering {
            centroids: unique,
            assignments: point_to_unique,
        };
    }

    let mut centroids: Vec<[f32; N]> = (0..k).map(|i| unique[i * unique.len() / k]).collect();
    let mut labels = vec![usize::MAX; unique.len()];

    for _ in 0..iterations {
        let mut changed = false;
        for (label, point) in labels.iter_mut().zip(&unique) {
            let nearest = nearest(&centroids, point);
            if *label != nearest {
                *label = nearest;
                changed = true;
            }
        }
        if !changed {
            break;
        }

        let mut sums = vec![[0.0f32; N]; k];
        let mut totals = vec![0.0f32; k];
        for ((point, &label), &weight) in unique.iter().zip(&labels).zip(&weights) {
            for (sum, value) in sums[label].iter_mut().zip(point) {
                *sum += value * weight;
            }
            totals[label] += weight;
        }
        for ((centroid, sum), total) in centroids.iter_mut().zip(&sums).zip(&totals) {
            // Empty clusters keep their previous centre.
            if *total > 0.0 {
                *centroid = sum.map(|s| s / total);
            }
        }
    }

    // Final assignment against the settled centroids.
    for (label, point) in labels.iter_mut().zip(&unique) {
        *label = nearest(&centroids, point);
    }

    Clustering {
        centroids,
        assignments: point_to_unique.into_iter().map(|u| labels[u]).collect(),
    }
}

/// Index of the centroid closest to `point` (squared Euclidean distance).
pub(crate) fn nearest<const N: usize>(centroids: &[[f32; N]], point: &[f32; N]) -> usize {
    let mut best = 0;
    let mut best_distance = f32::INFINITY;
    for (i, centroid) in centroids.iter().enumerate() {
        let distance: f32 = centroid
            .iter()
            .zip(point)
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
        if distance < best_distance {
            best_distance = distance;
            best = i;
        }
    }
    best
}

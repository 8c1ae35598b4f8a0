//! Clustering primitives for sprint partitioning.
//!
//! Partitions fixed-length numeric vectors into exactly `k` groups under a
//! configured distance: k-means (k-means++ init, per-feature standardized
//! input) for Euclidean, average-linkage agglomerative merging over a
//! precomputed distance matrix for Jaccard. Both tolerate `k == 1` and
//! `k == n`.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::core::error::{PathError, Result};

const KMEANS_MAX_ITER: usize = 100;

/// Distance metric used to compare activity coverage vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Standardized features, k-means partitioning
    Euclidean,
    /// Set-overlap distance on binary vectors, agglomerative partitioning
    Jaccard,
}

/// Partition `vectors` into exactly `k` labeled groups
pub fn cluster(
    vectors: &[Vec<f64>],
    k: usize,
    metric: DistanceMetric,
    seed: u64,
) -> Result<Vec<usize>> {
    let n = vectors.len();
    if k == 0 || k > n {
        return Err(PathError::Clustering(format!(
            "cluster count {k} out of range for {n} vectors"
        )));
    }
    if vectors.iter().any(|v| v.len() != vectors[0].len()) {
        return Err(PathError::Clustering(
            "vectors must share one fixed length".into(),
        ));
    }
    if k == n {
        return Ok((0..n).collect());
    }
    if k == 1 {
        return Ok(vec![0; n]);
    }

    match metric {
        DistanceMetric::Euclidean => Ok(kmeans(&standardize(vectors), k, seed)),
        DistanceMetric::Jaccard => Ok(agglomerative(vectors, k)),
    }
}

/// Scale each feature to zero mean and unit variance; constant features are
/// left at zero
fn standardize(vectors: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = vectors.len() as f64;
    let dims = vectors[0].len();
    let mut means = vec![0.0; dims];
    for vector in vectors {
        for (mean, &value) in means.iter_mut().zip(vector) {
            *mean += value / n;
        }
    }
    let mut stds = vec![0.0; dims];
    for vector in vectors {
        for (std, (&value, &mean)) in stds.iter_mut().zip(vector.iter().zip(&means)) {
            *std += (value - mean).powi(2) / n;
        }
    }
    for std in stds.iter_mut() {
        *std = std.sqrt();
    }
    vectors
        .iter()
        .map(|vector| {
            vector
                .iter()
                .zip(means.iter().zip(&stds))
                .map(|(&value, (&mean, &std))| {
                    if std > 0.0 {
                        (value - mean) / std
                    } else {
                        0.0
                    }
                })
                .collect()
        })
        .collect()
}

fn distance_squared(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Jaccard distance between binary vectors (1 - overlap / union)
fn jaccard_distance(a: &[f64], b: &[f64]) -> f64 {
    let mut intersection = 0.0;
    let mut union = 0.0;
    for (&x, &y) in a.iter().zip(b) {
        let x = x != 0.0;
        let y = y != 0.0;
        if x && y {
            intersection += 1.0;
        }
        if x || y {
            union += 1.0;
        }
    }
    if union == 0.0 {
        0.0
    } else {
        1.0 - intersection / union
    }
}

fn kmeans(data: &[Vec<f64>], k: usize, seed: u64) -> Vec<usize> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut centroids = init_centroids(data, k, &mut rng);
    let mut assignments = vec![0usize; data.len()];

    for _ in 0..KMEANS_MAX_ITER {
        let previous = assignments.clone();
        for (i, sample) in data.iter().enumerate() {
            assignments[i] = nearest_centroid(sample, &centroids);
        }
        if assignments == previous {
            break;
        }

        let dims = data[0].len();
        centroids = vec![vec![0.0; dims]; k];
        let mut counts = vec![0usize; k];
        for (sample, &label) in data.iter().zip(&assignments) {
            counts[label] += 1;
            for (total, &value) in centroids[label].iter_mut().zip(sample) {
                *total += value;
            }
        }
        for (centroid, &count) in centroids.iter_mut().zip(&counts) {
            if count > 0 {
                for value in centroid.iter_mut() {
                    *value /= count as f64;
                }
            }
        }
    }

    repair_empty_clusters(data, k, &mut assignments);
    assignments
}

/// k-means++ seeding: spread initial centroids proportionally to squared
/// distance from the chosen set
fn init_centroids(data: &[Vec<f64>], k: usize, rng: &mut ChaCha8Rng) -> Vec<Vec<f64>> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(data[rng.gen_range(0..data.len())].clone());

    while centroids.len() < k {
        let distances: Vec<f64> = data
            .iter()
            .map(|sample| {
                centroids
                    .iter()
                    .map(|c| distance_squared(sample, c))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        let total: f64 = distances.iter().sum();
        if total == 0.0 {
            // All remaining points coincide with a centroid
            centroids.push(data[rng.gen_range(0..data.len())].clone());
            continue;
        }
        let target = rng.gen::<f64>() * total;
        let mut cumulative = 0.0;
        let mut chosen = data.len() - 1;
        for (i, &d) in distances.iter().enumerate() {
            cumulative += d;
            if cumulative >= target {
                chosen = i;
                break;
            }
        }
        centroids.push(data[chosen].clone());
    }
    centroids
}

fn nearest_centroid(sample: &[f64], centroids: &[Vec<f64>]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (i, centroid) in centroids.iter().enumerate() {
        let d = distance_squared(sample, centroid);
        if d < best_distance {
            best_distance = d;
            best = i;
        }
    }
    best
}

/// The contract promises exactly `k` groups; reassign points from the
/// largest cluster into any that came out empty
fn repair_empty_clusters(data: &[Vec<f64>], k: usize, assignments: &mut [usize]) {
    loop {
        let mut counts = vec![0usize; k];
        for &label in assignments.iter() {
            counts[label] += 1;
        }
        let Some(empty) = counts.iter().position(|&c| c == 0) else {
            return;
        };
        let largest = counts
            .iter()
            .enumerate()
            .max_by_key(|(_, &c)| c)
            .map(|(i, _)| i)
            .unwrap_or(0);
        // Move the member farthest from its peers
        let members: Vec<usize> = (0..data.len())
            .filter(|&i| assignments[i] == largest)
            .collect();
        let moved = members
            .iter()
            .copied()
            .max_by(|&a, &b| {
                let da: f64 = members.iter().map(|&m| distance_squared(&data[a], &data[m])).sum();
                let db: f64 = members.iter().map(|&m| distance_squared(&data[b], &data[m])).sum();
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(members[0]);
        assignments[moved] = empty;
    }
}

/// Average-linkage agglomerative clustering down to `k` groups
fn agglomerative(vectors: &[Vec<f64>], k: usize) -> Vec<usize> {
    let n = vectors.len();
    let mut distances = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = jaccard_distance(&vectors[i], &vectors[j]);
            distances[i][j] = d;
            distances[j][i] = d;
        }
    }

    // Each point starts as its own cluster; merge the closest pair by mean
    // pairwise distance until k remain
    let mut clusters: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();
    while clusters.len() > k {
        let mut best = (0, 1, f64::INFINITY);
        for a in 0..clusters.len() {
            for b in (a + 1)..clusters.len() {
                let mut total = 0.0;
                for &i in &clusters[a] {
                    for &j in &clusters[b] {
                        total += distances[i][j];
                    }
                }
                let mean = total / (clusters[a].len() * clusters[b].len()) as f64;
                if mean < best.2 {
                    best = (a, b, mean);
                }
            }
        }
        let merged = clusters.swap_remove(best.1);
        clusters[best.0].extend(merged);
    }

    let mut labels = vec![0usize; n];
    for (label, cluster) in clusters.iter().enumerate() {
        for &i in cluster {
            labels[i] = label;
        }
    }
    labels
}

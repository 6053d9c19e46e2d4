//! Centroid clustering over paragraph embeddings.
//!
//! Plain k-means with cosine distance: assign each point to its nearest
//! centroid, recompute centroids as member means, stop on stable
//! assignments or the iteration cap. Initialization is deterministic
//! farthest-point seeding, so the same corpus always partitions the same
//! way.

use hashbrown::HashSet;
use tracing::debug;

use crate::model::Embedding;
use crate::Result;

/// Result of one clustering run.
#[derive(Debug, Clone)]
pub struct KmeansOutcome {
    /// Final centroids; length is the effective cluster count, which may
    /// be below the requested `k` when fewer points exist.
    pub centroids: Vec<Embedding>,
    /// Cluster index per input point, parallel to the input slice.
    pub assignments: Vec<usize>,
    pub iterations: usize,
    /// False when the iteration cap stopped an unstable run.
    pub converged: bool,
}

impl KmeansOutcome {
    fn empty() -> Self {
        Self { centroids: Vec::new(), assignments: Vec::new(), iterations: 0, converged: true }
    }

    /// Member point indices of one cluster.
    pub fn members(&self, cluster: usize) -> Vec<usize> {
        self.assignments
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == cluster)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Cluster `points` into at most `k` groups.
///
/// `k` larger than the point count degrades to one cluster per point
/// rather than erroring; the caller logs the degraded mode.
pub fn cluster(points: &[Embedding], k: usize, max_iterations: usize) -> Result<KmeansOutcome> {
    if points.is_empty() || k == 0 {
        return Ok(KmeansOutcome::empty());
    }
    let k = k.min(points.len());

    let mut centroids = seed_centroids(points, k)?;
    let mut assignments = vec![0usize; points.len()];
    let mut iterations = 0;
    let mut converged = false;

    while iterations < max_iterations {
        iterations += 1;

        // Assign.
        let mut next = Vec::with_capacity(points.len());
        for point in points {
            next.push(nearest_centroid(point, &centroids)?);
        }
        if next == assignments && iterations > 1 {
            converged = true;
            break;
        }
        assignments = next;

        // Recompute.
        for index in 0..centroids.len() {
            let members: Vec<&Embedding> = points
                .iter()
                .zip(&assignments)
                .filter(|(_, a)| **a == index)
                .map(|(p, _)| p)
                .collect();
            match Embedding::mean(members)? {
                Some(mean) => centroids[index] = mean,
                // Empty cluster: reseed with the globally worst-fit point.
                None => {
                    if let Some(outlier) = farthest_from_assigned(points, &assignments, &centroids)?
                    {
                        centroids[index] = points[outlier].clone();
                    }
                }
            }
        }
    }

    debug!(
        clusters = centroids.len(),
        points = points.len(),
        iterations,
        converged,
        "k-means finished"
    );
    Ok(KmeansOutcome { centroids, assignments, iterations, converged })
}

/// Deterministic farthest-point initialization: start from the first
/// point, then repeatedly take the point farthest from every centroid
/// chosen so far.
fn seed_centroids(points: &[Embedding], k: usize) -> Result<Vec<Embedding>> {
    let mut chosen_indices: HashSet<usize> = HashSet::new();
    let mut centroids = vec![points[0].clone()];
    chosen_indices.insert(0);

    while centroids.len() < k {
        let mut best: Option<(usize, f32)> = None;
        for (index, point) in points.iter().enumerate() {
            if chosen_indices.contains(&index) {
                continue;
            }
            let mut nearest = f32::MAX;
            for centroid in &centroids {
                nearest = nearest.min(point.cosine_distance(centroid)?);
            }
            if best.is_none_or(|(_, d)| nearest > d) {
                best = Some((index, nearest));
            }
        }
        match best {
            Some((index, _)) => {
                chosen_indices.insert(index);
                centroids.push(points[index].clone());
            }
            None => break,
        }
    }
    Ok(centroids)
}

fn nearest_centroid(point: &Embedding, centroids: &[Embedding]) -> Result<usize> {
    let mut best = 0;
    let mut best_distance = f32::MAX;
    for (index, centroid) in centroids.iter().enumerate() {
        let distance = point.cosine_distance(centroid)?;
        if distance < best_distance {
            best_distance = distance;
            best = index;
        }
    }
    Ok(best)
}

/// Index of the point farthest from its assigned centroid.
fn farthest_from_assigned(
    points: &[Embedding],
    assignments: &[usize],
    centroids: &[Embedding],
) -> Result<Option<usize>> {
    let mut worst: Option<(usize, f32)> = None;
    for (index, (point, assigned)) in points.iter().zip(assignments).enumerate() {
        let distance = point.cosine_distance(&centroids[*assigned])?;
        if worst.is_none_or(|(_, d)| distance > d) {
            worst = Some((index, distance));
        }
    }
    Ok(worst.map(|(index, _)| index))
}

//! Deterministic k-means for the behavioural clustering sub-score
//!
//! Lloyd's algorithm with random restarts from a fixed-seed RNG. The best of
//! `n_init` runs by inertia wins, so results are reproducible across runs
//! and platforms for identical input.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const MAX_ITERATIONS: usize = 100;

/// Fitted centroids of a k-means run
pub(crate) struct KMeans {
    pub centroids: Vec<Vec<f64>>,
}

impl KMeans {
    /// Fit `k` clusters to the points, restarting `n_init` times
    ///
    /// Callers must pass at least `k` points.
    pub fn fit(points: &[Vec<f64>], k: usize, seed: u64, n_init: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);

        let mut best_centroids: Option<Vec<Vec<f64>>> = None;
        let mut best_inertia = f64::INFINITY;

        for _ in 0..n_init.max(1) {
            let (centroids, inertia) = Self::single_run(points, k, &mut rng);
            if inertia < best_inertia {
                best_inertia = inertia;
                best_centroids = Some(centroids);
            }
        }

        Self {
            centroids: best_centroids.unwrap_or_default(),
        }
    }

    /// Euclidean distance from a point to its nearest centroid
    pub fn nearest_distance(&self, point: &[f64]) -> f64 {
        self.centroids
            .iter()
            .map(|c| euclidean(c, point))
            .fold(f64::INFINITY, f64::min)
    }

    fn single_run(points: &[Vec<f64>], k: usize, rng: &mut StdRng) -> (Vec<Vec<f64>>, f64) {
        // Sample k distinct starting points
        let mut chosen: Vec<usize> = Vec::with_capacity(k);
        while chosen.len() < k {
            let idx = rng.gen_range(0..points.len());
            if !chosen.contains(&idx) {
                chosen.push(idx);
            }
        }
        let mut centroids: Vec<Vec<f64>> = chosen.iter().map(|&i| points[i].clone()).collect();

        let mut assignments = vec![0usize; points.len()];
        for _ in 0..MAX_ITERATIONS {
            let mut changed = false;
            for (i, point) in points.iter().enumerate() {
                let nearest = centroids
                    .iter()
                    .enumerate()
                    .map(|(j, c)| (j, euclidean(c, point)))
                    .min_by(|a, b| a.1.total_cmp(&b.1))
                    .map(|(j, _)| j)
                    .unwrap_or(0);
                if assignments[i] != nearest {
                    assignments[i] = nearest;
                    changed = true;
                }
            }

            for (j, centroid) in centroids.iter_mut().enumerate() {
                let members: Vec<&Vec<f64>> = points
                    .iter()
                    .zip(assignments.iter())
                    .filter(|(_, &a)| a == j)
                    .map(|(p, _)| p)
                    .collect();
                // Empty clusters keep their previous centroid
                if members.is_empty() {
                    continue;
                }
                for (d, value) in centroid.iter_mut().enumerate() {
                    *value = members.iter().map(|p| p[d]).sum::<f64>() / members.len() as f64;
                }
            }

            if !changed {
                break;
            }
        }

        let inertia = points
            .iter()
            .zip(assignments.iter())
            .map(|(p, &a)| {
                let d = euclidean(&centroids[a], p);
                d * d
            })
            .sum();

        (centroids, inertia)
    }
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs() -> Vec<Vec<f64>> {
        let mut points = Vec::new();
        for i in 0..10 {
            points.push(vec![0.0 + i as f64 * 0.01, 0.0]);
            points.push(vec![10.0 + i as f64 * 0.01, 10.0]);
        }
        points
    }

    #[test]
    fn test_separated_blobs_are_found() {
        let points = two_blobs();
        let model = KMeans::fit(&points, 2, 42, 10);

        // Every point sits close to one of the two centroids
        for point in &points {
            assert!(model.nearest_distance(point) < 1.0);
        }
    }

    #[test]
    fn test_fixed_seed_is_deterministic() {
        let points = two_blobs();
        let a = KMeans::fit(&points, 2, 42, 10);
        let b = KMeans::fit(&points, 2, 42, 10);
        assert_eq!(a.centroids, b.centroids);
    }

    #[test]
    fn test_outlier_is_far_from_centroids() {
        let points = two_blobs();
        let model = KMeans::fit(&points, 2, 42, 10);
        assert!(model.nearest_distance(&[50.0, -30.0]) > 10.0);
    }
}

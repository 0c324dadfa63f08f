/*
MIT License

Copyright (c) 2024 Philipp Schuster

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/

//! One-dimensional k-means clustering of onset peak values.

/// Number of clusters: noise, weak onsets and strong onsets.
pub const NUM_CLUSTERS: usize = 3;

/// Upper bound of k-means iterations. Convergence typically takes a handful.
const MAX_ITERATIONS: usize = 100;

/// Distance between the initial centroids.
const INITIAL_CENTROID_SPACING: f64 = 0.1;

/// Indices into the clustered values.
pub type Cluster = Vec<usize>;

/// Initial centroids are spread closely around the mean, in ascending
/// order.
fn get_initial_centroids(values: &[f64]) -> Vec<f64> {
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    (0..NUM_CLUSTERS)
        .map(|k| mean + (k as f64 - (NUM_CLUSTERS - 1) as f64 / 2.0) * INITIAL_CENTROID_SPACING)
        .collect()
}

/// Index of the closest centroid. On a tie, the lower index wins.
fn get_closest_centroid(value: f64, centroids: &[f64]) -> usize {
    centroids
        .iter()
        .enumerate()
        .fold((0, f64::INFINITY), |(best, best_dist), (k, &c)| {
            let dist = (value - c).abs();
            if dist < best_dist {
                (k, dist)
            } else {
                (best, best_dist)
            }
        })
        .0
}

/// Moves every centroid to the mean of its members. Centroids without
/// members stay where they are.
fn update_centroids(values: &[f64], assignments: &[usize], centroids: &mut [f64]) {
    for (k, centroid) in centroids.iter_mut().enumerate() {
        let (sum, count) = values
            .iter()
            .zip(assignments)
            .filter(|(_, &a)| a == k)
            .fold((0.0, 0_u32), |(sum, count), (v, _)| (sum + v, count + 1));
        if count > 0 {
            *centroid = sum / f64::from(count);
        }
    }
}

/// Runs k-means from the given centroids until the assignment is stable or
/// the iteration limit is hit. Returns the centroid index of every value.
/// The centroids are updated in place.
pub(crate) fn run_kmeans(values: &[f64], centroids: &mut [f64]) -> Vec<usize> {
    let mut assignments = values
        .iter()
        .map(|&v| get_closest_centroid(v, centroids))
        .collect::<Vec<_>>();

    for _ in 0..MAX_ITERATIONS {
        update_centroids(values, &assignments, centroids);
        let next = values
            .iter()
            .map(|&v| get_closest_centroid(v, centroids))
            .collect::<Vec<_>>();
        if next == assignments {
            break;
        }
        assignments = next;
    }
    assignments
}

/// Groups the given values into at most [`NUM_CLUSTERS`] clusters.
///
/// Clusters that end up empty are dropped. The clusters are returned in the
/// order of their initial centroids, which usually but not necessarily is
/// the order of their final centroids; use [`get_centroid`] to sort them.
#[must_use]
pub fn get_clusters(values: &[f64]) -> Vec<Cluster> {
    if values.is_empty() {
        return Vec::new();
    }
    let mut centroids = get_initial_centroids(values);
    let assignments = run_kmeans(values, &mut centroids);
    to_clusters(&assignments, centroids.len())
}

fn to_clusters(assignments: &[usize], num_clusters: usize) -> Vec<Cluster> {
    (0..num_clusters)
        .map(|k| {
            assignments
                .iter()
                .enumerate()
                .filter(|(_, &a)| a == k)
                .map(|(i, _)| i)
                .collect::<Cluster>()
        })
        .filter(|cluster| !cluster.is_empty())
        .collect()
}

/// Mean of the values that belong to the cluster.
#[must_use]
pub fn get_centroid(values: &[f64], cluster: &[usize]) -> f64 {
    if cluster.is_empty() {
        return 0.0;
    }
    cluster.iter().map(|&i| values[i]).sum::<f64>() / cluster.len() as f64
}

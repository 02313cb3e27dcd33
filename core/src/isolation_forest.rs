//! Isolation forest outlier model.
//!
//! Points that are easy to isolate with random axis-aligned splits sit far
//! from the bulk of the data. Each tree is grown on a random subsample up
//! to depth ceil(log2(subsample)); a point's anomaly score is derived from
//! its mean path length across trees:
//!
//!   score(x)  = −2^(−E[h(x)] / c(ψ))
//!   offset    = contamination-th percentile of the training scores
//!   confidence = score − offset   (negative ⇒ outlier)
//!
//! RULE: A model is built and fitted per call. Nothing is retained
//! between fits, so two fits with the same seed and data agree exactly.

use crate::rng::ModelRng;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierScore {
    /// Lower = more anomalous. Negative for flagged outliers.
    pub confidence: f64,
    pub is_outlier: bool,
}

/// An unsupervised model that fits and scores a feature matrix in one go.
pub trait OutlierModel {
    /// `rows[i][j]` is feature j of sample i. All rows have equal width.
    fn fit_predict(&self, rows: &[Vec<f64>]) -> Vec<OutlierScore>;
}

#[derive(Debug, Clone)]
pub struct IsolationForest {
    pub n_estimators:  usize,
    pub max_samples:   usize,
    pub contamination: f64,
    pub seed:          u64,
}

enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature:   usize,
        threshold: f64,
        left:      Box<Node>,
        right:     Box<Node>,
    },
}

impl IsolationForest {
    fn build(
        &self,
        data: &[Vec<f64>],
        sample: Vec<usize>,
        depth: usize,
        limit: usize,
        rng: &mut ModelRng,
    ) -> Node {
        if depth >= limit || sample.len() <= 1 {
            return Node::Leaf { size: sample.len() };
        }

        let width = data[sample[0]].len();
        let splittable: Vec<(usize, f64, f64)> = (0..width)
            .filter_map(|j| {
                let (lo, hi) = sample.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
                    (lo.min(data[i][j]), hi.max(data[i][j]))
                });
                (hi > lo).then_some((j, lo, hi))
            })
            .collect();

        if splittable.is_empty() {
            return Node::Leaf { size: sample.len() };
        }

        let (feature, lo, hi) = splittable[rng.next_index(splittable.len())];
        let threshold = rng.uniform(lo, hi);
        let (left, right): (Vec<usize>, Vec<usize>) =
            sample.into_iter().partition(|&i| data[i][feature] <= threshold);

        Node::Split {
            feature,
            threshold,
            left:  Box::new(self.build(data, left, depth + 1, limit, rng)),
            right: Box::new(self.build(data, right, depth + 1, limit, rng)),
        }
    }
}

impl OutlierModel for IsolationForest {
    fn fit_predict(&self, rows: &[Vec<f64>]) -> Vec<OutlierScore> {
        let n = rows.len();
        if n < 2 {
            return vec![OutlierScore { confidence: 0.0, is_outlier: false }; n];
        }

        let data = standardize(rows);
        let psi = self.max_samples.clamp(2, n);
        let limit = (psi as f64).log2().ceil().max(1.0) as usize;

        let trees: Vec<Node> = (0..self.n_estimators.max(1))
            .map(|t| {
                let mut rng = ModelRng::for_stream(self.seed, t as u64);
                let sample = rng.sample_indices(n, psi);
                self.build(&data, sample, 0, limit, &mut rng)
            })
            .collect();

        let norm = average_path_length(psi);
        let scores: Vec<f64> = data
            .iter()
            .map(|x| {
                let total: f64 = trees.iter().map(|tree| path_length(tree, x, 0)).sum();
                let expected = total / trees.len() as f64;
                -(2f64.powf(-expected / norm))
            })
            .collect();

        let offset = percentile(&scores, self.contamination * 100.0);
        log::debug!(
            "Isolation forest fitted: {n} samples, {} trees, subsample {psi}, offset {offset:.4}",
            trees.len()
        );

        scores
            .into_iter()
            .map(|s| {
                let confidence = s - offset;
                OutlierScore { confidence, is_outlier: confidence < 0.0 }
            })
            .collect()
    }
}

fn path_length(node: &Node, x: &[f64], depth: usize) -> f64 {
    match node {
        Node::Leaf { size } => depth as f64 + average_path_length(*size),
        Node::Split { feature, threshold, left, right } => {
            if x[*feature] <= *threshold {
                path_length(left, x, depth + 1)
            } else {
                path_length(right, x, depth + 1)
            }
        }
    }
}

/// Average path length of an unsuccessful BST search over `n` points.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Zero-mean, unit-variance columns. Constant columns are only centred.
fn standardize(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = rows.len() as f64;
    let width = rows.first().map_or(0, Vec::len);
    let stats: Vec<(f64, f64)> = (0..width)
        .map(|j| {
            let mean = rows.iter().map(|r| r[j]).sum::<f64>() / n;
            let var = rows.iter().map(|r| (r[j] - mean).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();
            (mean, if std > 0.0 { std } else { 1.0 })
        })
        .collect();

    rows.iter()
        .map(|r| {
            r.iter()
                .zip(&stats)
                .map(|(v, (mean, std))| (v - mean) / std)
                .collect()
        })
        .collect()
}

/// Linear-interpolated percentile, `q` in [0, 100].
fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forest() -> IsolationForest {
        IsolationForest {
            n_estimators:  100,
            max_samples:   256,
            contamination: 0.1,
            seed:          42,
        }
    }

    fn cluster_with_outlier() -> Vec<Vec<f64>> {
        let mut rows: Vec<Vec<f64>> = (0..19)
            .map(|i| vec![50.0 + (i % 5) as f64, 80.0 - (i % 3) as f64, 10.0 + (i % 4) as f64])
            .collect();
        rows.push(vec![500.0, 5.0, 95.0]);
        rows
    }

    #[test]
    fn isolated_point_scores_lowest() {
        let scores = forest().fit_predict(&cluster_with_outlier());
        let (worst, _) = scores
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.confidence.total_cmp(&b.1.confidence))
            .unwrap();
        assert_eq!(worst, 19);
        assert!(scores[19].is_outlier);
    }

    #[test]
    fn outlier_share_follows_contamination() {
        let scores = forest().fit_predict(&cluster_with_outlier());
        let flagged = scores.iter().filter(|s| s.is_outlier).count();
        assert!((1..=2).contains(&flagged), "flagged {flagged} of 20");
    }

    #[test]
    fn same_seed_same_scores() {
        let rows = cluster_with_outlier();
        assert_eq!(forest().fit_predict(&rows), forest().fit_predict(&rows));
    }

    #[test]
    fn percentile_interpolates() {
        assert_eq!(percentile(&[1.0, 2.0, 3.0, 4.0, 5.0], 50.0), 3.0);
        assert!((percentile(&[0.0, 10.0], 10.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn path_length_normalizer_matches_known_values() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        assert!(average_path_length(256) > average_path_length(16));
    }
}

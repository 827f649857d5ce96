//! 1-D clustering of row/column coordinates.

#[derive(Clone, Copy, Debug, PartialEq)]
struct Cluster {
    sum: f64,
    n: usize,
}

impl Cluster {
    fn mean(&self) -> f64 {
        self.sum / self.n as f64
    }

    fn absorb(&mut self, other: Cluster) {
        self.sum += other.sum;
        self.n += other.n;
    }
}

/// Cluster sorted coordinates by distance to the running cluster mean, then
/// merge the closest adjacent pair while there are more than `expected`
/// clusters and that gap is below `merge_gap_ratio` times the mean gap.
///
/// Returns strictly increasing cluster means.
pub(crate) fn cluster_1d(
    values: &[f32],
    threshold: f32,
    expected: usize,
    merge_gap_ratio: f32,
) -> Vec<f32> {
    let mut sorted: Vec<f64> = values.iter().map(|&v| v as f64).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mut clusters: Vec<Cluster> = Vec::new();
    for v in sorted {
        let single = Cluster { sum: v, n: 1 };
        match clusters.last_mut() {
            Some(c) if (v - c.mean()).abs() <= threshold as f64 => c.absorb(single),
            _ => clusters.push(single),
        }
    }

    while clusters.len() > expected && clusters.len() > 1 {
        let gaps: Vec<f64> = clusters
            .windows(2)
            .map(|w| w[1].mean() - w[0].mean())
            .collect();
        let avg_gap = gaps.iter().sum::<f64>() / gaps.len() as f64;
        let Some((i, &min_gap)) = gaps
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
        else {
            break;
        };
        if min_gap >= merge_gap_ratio as f64 * avg_gap {
            break;
        }
        let right = clusters.remove(i + 1);
        clusters[i].absorb(right);
    }

    let mut means: Vec<f32> = clusters.iter().map(|c| c.mean() as f32).collect();
    means.dedup_by(|b, a| *b <= *a);
    means
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_jittered_rows() {
        let ys = [10.0, 12.0, 11.0, 60.0, 59.0, 111.0, 109.0, 110.0];
        let c = cluster_1d(&ys, 25.0, 3, 0.6);
        assert_eq!(c.len(), 3);
        assert!((c[0] - 11.0).abs() < 1e-4);
        assert!((c[1] - 59.5).abs() < 1e-4);
        assert!((c[2] - 110.0).abs() < 1e-4);
    }

    #[test]
    fn merges_split_cluster_down_to_expected() {
        // Row at ~100 split into two clusters by a tight threshold.
        let ys = [0.0, 1.0, 96.0, 97.0, 108.0, 109.0, 200.0, 201.0];
        let c = cluster_1d(&ys, 5.0, 3, 0.6);
        assert_eq!(c.len(), 3);
        assert!((c[1] - 102.5).abs() < 1e-4);
    }

    #[test]
    fn keeps_extra_cluster_when_gaps_are_regular() {
        let ys = [0.0, 100.0, 200.0, 300.0];
        assert_eq!(cluster_1d(&ys, 20.0, 3, 0.6).len(), 4);
    }
}

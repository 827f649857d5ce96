//! Phase 2 and 3: neighbour resolution and row monotonicity.

use super::Label;
use crate::well::Confidence;

/// Resolve an uncertain well from its left/right phase-1 labels.
///
/// `row_threshold` is the inhibition level the row's drug is read at; rows at
/// 0.9 or above resolve a growth/inhibition transition well to inhibition.
pub(crate) fn resolve_uncertain(
    left: Option<Label>,
    right: Option<Label>,
    score: f32,
    row_threshold: f32,
    growth_threshold: f32,
    fallback_threshold: f32,
) -> (Label, Confidence) {
    use Label::*;

    let growth_left = left == Some(Growth);
    let inhibition_right = right == Some(Inhibition);
    let open_left = matches!(left, None | Some(Uncertain));
    let open_right = matches!(right, None | Some(Uncertain));

    if growth_left && inhibition_right {
        let label = if row_threshold >= 0.9 || score < growth_threshold {
            Inhibition
        } else {
            Growth
        };
        return (label, Confidence::Medium);
    }
    if growth_left && (open_right || right == Some(Growth)) {
        return (Growth, Confidence::Medium);
    }
    if inhibition_right && (open_left || left == Some(Inhibition)) {
        return (Inhibition, Confidence::Medium);
    }

    let label = if score >= fallback_threshold {
        Growth
    } else {
        Inhibition
    };
    (label, Confidence::Low)
}

/// Force every well right of the leftmost inhibition to inhibition.
///
/// `skip` excludes one column (the control well) from both the scan and the
/// rewrite. Returns the number of wells changed.
pub(crate) fn enforce_monotonic(row: &mut [(Label, Confidence)], skip: Option<usize>) -> usize {
    let Some(first) = row
        .iter()
        .enumerate()
        .position(|(c, (l, _))| Some(c) != skip && *l == Label::Inhibition)
    else {
        return 0;
    };

    let mut changed = 0;
    for (c, cell) in row.iter_mut().enumerate().skip(first + 1) {
        if Some(c) == skip || cell.0 == Label::Inhibition {
            continue;
        }
        *cell = (Label::Inhibition, Confidence::Medium);
        changed += 1;
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use Label::*;

    fn resolve(left: Option<Label>, right: Option<Label>, score: f32) -> (Label, Confidence) {
        resolve_uncertain(left, right, score, 0.5, 0.5, 0.4)
    }

    #[test]
    fn transition_well_follows_score_or_row_threshold() {
        assert_eq!(resolve(Some(Growth), Some(Inhibition), 0.5).0, Growth);
        assert_eq!(resolve(Some(Growth), Some(Inhibition), 0.45).0, Inhibition);
        let strict = resolve_uncertain(Some(Growth), Some(Inhibition), 0.5, 0.9, 0.5, 0.4);
        assert_eq!(strict, (Inhibition, Confidence::Medium));
    }

    #[test]
    fn one_sided_neighbours() {
        assert_eq!(resolve(Some(Growth), None, 0.31), (Growth, Confidence::Medium));
        assert_eq!(resolve(Some(Growth), Some(Uncertain), 0.31).0, Growth);
        assert_eq!(resolve(None, Some(Inhibition), 0.49), (Inhibition, Confidence::Medium));
        assert_eq!(resolve(Some(Uncertain), Some(Inhibition), 0.49).0, Inhibition);
        assert_eq!(resolve(Some(Growth), Some(Growth), 0.31), (Growth, Confidence::Medium));
        assert_eq!(resolve(Some(Inhibition), Some(Inhibition), 0.49).0, Inhibition);
    }

    #[test]
    fn fallback_is_low_confidence() {
        assert_eq!(resolve(None, None, 0.42), (Growth, Confidence::Low));
        assert_eq!(resolve(Some(Uncertain), Some(Uncertain), 0.35), (Inhibition, Confidence::Low));
        // Inverted pair carries no information.
        assert_eq!(resolve(Some(Inhibition), Some(Growth), 0.45), (Growth, Confidence::Low));
    }

    #[test]
    fn monotonicity_rewrites_tail() {
        let mut row = vec![(Growth, Confidence::High); 6];
        row[2] = (Inhibition, Confidence::High);
        row[4] = (Growth, Confidence::High);
        assert_eq!(enforce_monotonic(&mut row, None), 3);
        assert_eq!(row[1].0, Growth);
        assert!(row[2..].iter().all(|(l, _)| *l == Inhibition));
        assert_eq!(row[2].1, Confidence::High);
        assert_eq!(row[4].1, Confidence::Medium);
    }

    #[test]
    fn monotonicity_skips_control_column() {
        let mut row = vec![(Inhibition, Confidence::High); 4];
        row[0] = (Growth, Confidence::High);
        row[3] = (Growth, Confidence::High);
        assert_eq!(enforce_monotonic(&mut row, Some(3)), 0);
        assert_eq!(row[3].0, Growth);
    }
}

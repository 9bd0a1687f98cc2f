use std::cmp::Reverse;

use float_ord::FloatOrd;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Upright,
    Rotated180,
}

/// Maps orientation classifier scores to a decision.
///
/// Label 1 means the crop is upside down. Anything below `threshold`, or fewer than two
/// scores, is treated as upright.
pub fn classify(scores: &[f32], threshold: f32) -> Orientation {
    if scores.len() < 2 {
        return Orientation::Upright;
    }

    let Some((label, score)) = argmax(scores.iter().copied()) else {
        return Orientation::Upright;
    };
    if score < threshold {
        log::trace!("Orientation label {label} below threshold ({score} < {threshold})");
        return Orientation::Upright;
    }

    match label {
        1 => Orientation::Rotated180,
        _ => Orientation::Upright,
    }
}

/// Index and value of the largest score; ties go to the lowest index. NaN never wins.
pub(crate) fn argmax(scores: impl IntoIterator<Item = f32>) -> Option<(usize, f32)> {
    scores
        .into_iter()
        .enumerate()
        .filter(|(_, score)| !score.is_nan())
        .max_by_key(|&(i, score)| (FloatOrd(score), Reverse(i)))
}

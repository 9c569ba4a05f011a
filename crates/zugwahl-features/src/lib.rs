#![warn(clippy::unwrap_used, clippy::expect_used)]

//! Dialogue-history featurization.
//!
//! Bridges variable-length, per-turn dialogue features and the fixed-shape
//! matrix a classifier consumes. Histories shorter than the padding window
//! are left-padded with sentinel turns; the three per-turn fields (intent,
//! previous action, slots) are flattened per history and concatenated
//! column-wise into one flat matrix. The whole path is deterministic:
//! identical inputs yield bit-identical output.

pub mod labels;

pub use labels::LabelCodec;

use zugwahl_core::error::{PolicyError, Result};
use zugwahl_core::matrix::FeatureMatrix;
use zugwahl_core::state::TurnFeatures;

/// Value used for every entry of a sentinel (padding) turn vector.
pub const PADDING_VALUE: f32 = -1.0;

/// Left-pad a per-turn vector list to exactly `max_length` entries.
///
/// Sentinel vectors are shaped like the first genuine vector and filled
/// with [`PADDING_VALUE`]; genuine turns keep their order at the tail.
/// A list already at (or above) `max_length` is returned unchanged;
/// truncation is not performed here, an upstream length cap is assumed.
///
/// # Errors
/// `InvalidFeatureShape` if `turns` is empty: the sentinel shape cannot
/// be inferred, and silently returning an empty history would let a
/// malformed example slip into training.
pub fn pad_history(turns: &[Vec<f32>], max_length: usize) -> Result<Vec<Vec<f32>>> {
    let first = turns.first().ok_or_else(|| {
        PolicyError::InvalidFeatureShape("cannot pad an empty turn sequence".to_string())
    })?;
    if turns.len() >= max_length {
        return Ok(turns.to_vec());
    }
    let sentinel = vec![PADDING_VALUE; first.len()];
    let mut padded = vec![sentinel; max_length - turns.len()];
    padded.extend_from_slice(turns);
    Ok(padded)
}

/// Effective padding window for a batch: the configured `max_history`,
/// or else the longest history observed in the batch.
///
/// When `max_history` is unset the window is batch-dependent, so the
/// learned feature width can differ between batches of different
/// lengths. Downstream compatibility depends on this derivation, so it
/// is kept as-is rather than pinned at first use.
#[must_use]
pub fn effective_max_length(
    histories: &[Vec<TurnFeatures>],
    max_history: Option<usize>,
) -> usize {
    max_history.unwrap_or_else(|| histories.iter().map(Vec::len).max().unwrap_or(0))
}

/// Assemble a batch of dialogue histories into one flat feature matrix.
///
/// Per history and per field: pad to the effective window with
/// [`pad_history`], flatten the padded turn vectors into a single row,
/// then concatenate the intent, previous-action and slot rows. Rows are
/// stacked in batch order, so the result has one row per history and
/// `window × (intent + prev_action + slot widths)` columns.
///
/// # Errors
/// `InvalidFeatureShape` if the batch is empty, a history is empty, or
/// per-field widths are inconsistent across the batch.
pub fn assemble_features(
    histories: &[Vec<TurnFeatures>],
    max_history: Option<usize>,
) -> Result<FeatureMatrix> {
    if histories.is_empty() {
        return Err(PolicyError::InvalidFeatureShape(
            "cannot assemble an empty history batch".to_string(),
        ));
    }
    let window = effective_max_length(histories, max_history);

    let mut matrix: Option<FeatureMatrix> = None;
    for history in histories {
        let intents: Vec<Vec<f32>> = history.iter().map(|t| t.intent.clone()).collect();
        let prev_actions: Vec<Vec<f32>> = history.iter().map(|t| t.prev_action.clone()).collect();
        let slots: Vec<Vec<f32>> = history.iter().map(|t| t.slots.clone()).collect();

        let mut row = flatten_field(&intents, window)?;
        row.extend(flatten_field(&prev_actions, window)?);
        row.extend(flatten_field(&slots, window)?);

        let matrix = matrix.get_or_insert_with(|| FeatureMatrix::new(row.len()));
        if row.len() != matrix.cols() {
            return Err(PolicyError::InvalidFeatureShape(format!(
                "history row width {} differs from batch width {}",
                row.len(),
                matrix.cols()
            )));
        }
        matrix.push_row(&row)?;
    }
    matrix.ok_or_else(|| {
        PolicyError::InvalidFeatureShape("cannot assemble an empty history batch".to_string())
    })
}

/// Pad one field's turn vectors and flatten them into a single row.
fn flatten_field(turns: &[Vec<f32>], window: usize) -> Result<Vec<f32>> {
    let padded = pad_history(turns, window)?;
    Ok(padded.into_iter().flatten().collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn turn(intent: &[f32], prev_action: &[f32], slots: &[f32]) -> TurnFeatures {
        TurnFeatures::new(intent.to_vec(), prev_action.to_vec(), slots.to_vec())
    }

    #[test]
    fn padding_prepends_sentinels() {
        let turns = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let padded = pad_history(&turns, 4).unwrap();
        assert_eq!(padded.len(), 4);
        assert_eq!(padded[0], vec![-1.0, -1.0]);
        assert_eq!(padded[1], vec![-1.0, -1.0]);
        assert_eq!(padded[2], vec![1.0, 0.0]);
        assert_eq!(padded[3], vec![0.0, 1.0]);
    }

    #[test]
    fn padding_is_identity_at_max_length() {
        let turns = vec![vec![1.0], vec![2.0], vec![3.0]];
        assert_eq!(pad_history(&turns, 3).unwrap(), turns);
        // longer than the window: no truncation either
        assert_eq!(pad_history(&turns, 2).unwrap(), turns);
    }

    #[test]
    fn padding_is_idempotent() {
        let turns = vec![vec![0.5, 0.5]];
        let once = pad_history(&turns, 3).unwrap();
        let twice = pad_history(&once, 3).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn padding_rejects_empty_turn_list() {
        let err = pad_history(&[], 3).unwrap_err();
        assert!(matches!(err, PolicyError::InvalidFeatureShape(_)));
    }

    #[test]
    fn window_prefers_configured_max_history() {
        let histories = vec![
            vec![turn(&[1.0], &[0.0], &[0.0]); 2],
            vec![turn(&[1.0], &[0.0], &[0.0]); 5],
        ];
        assert_eq!(effective_max_length(&histories, Some(8)), 8);
        assert_eq!(effective_max_length(&histories, None), 5);
    }

    #[test]
    fn assembled_matrix_has_expected_shape() {
        // 3 histories, window 2, each field 2 wide: 3 x (3 fields * 2 * 2)
        let histories = vec![
            vec![turn(&[1.0, 0.0], &[0.0, 1.0], &[0.0, 0.0]); 2],
            vec![turn(&[0.0, 1.0], &[1.0, 0.0], &[1.0, 0.0]); 1],
            vec![turn(&[1.0, 1.0], &[0.0, 0.0], &[0.0, 1.0]); 2],
        ];
        let x = assemble_features(&histories, Some(2)).unwrap();
        assert_eq!(x.rows(), 3);
        assert_eq!(x.cols(), 12);
    }

    #[test]
    fn assembly_left_pads_short_histories() {
        let histories = vec![vec![turn(&[1.0], &[2.0], &[3.0])]];
        let x = assemble_features(&histories, Some(2)).unwrap();
        // [pad, intent | pad, prev_action | pad, slots]
        assert_eq!(x.row(0), &[-1.0, 1.0, -1.0, 2.0, -1.0, 3.0]);
    }

    #[test]
    fn assembly_is_deterministic() {
        let histories = vec![
            vec![turn(&[0.25, 0.75], &[1.0, 0.0], &[0.5, 0.5]); 3],
            vec![turn(&[1.0, 0.0], &[0.0, 1.0], &[0.0, 0.0]); 1],
        ];
        let a = assemble_features(&histories, None).unwrap();
        let b = assemble_features(&histories, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn assembly_rejects_empty_batch_and_empty_history() {
        assert!(matches!(
            assemble_features(&[], Some(2)).unwrap_err(),
            PolicyError::InvalidFeatureShape(_)
        ));
        let histories = vec![vec![]];
        assert!(matches!(
            assemble_features(&histories, Some(2)).unwrap_err(),
            PolicyError::InvalidFeatureShape(_)
        ));
    }

    #[test]
    fn assembly_rejects_inconsistent_widths() {
        let histories = vec![
            vec![turn(&[1.0, 0.0], &[0.0], &[0.0])],
            vec![turn(&[1.0], &[0.0], &[0.0])],
        ];
        let err = assemble_features(&histories, Some(1)).unwrap_err();
        assert!(matches!(err, PolicyError::InvalidFeatureShape(_)));
    }
}

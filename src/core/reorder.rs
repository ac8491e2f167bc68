use crate::utils::error::{Result, SyncError};

/// Moves the element at `source_index` to `target_index`, keeping the
/// relative order of everything else. Equal indices return the input.
pub fn compute_reorder<T: Clone>(
    sequence: &[T],
    source_index: usize,
    target_index: usize,
) -> Result<Vec<T>> {
    let len = sequence.len();
    for index in [source_index, target_index] {
        if index >= len {
            return Err(SyncError::IndexOutOfRange { index, len });
        }
    }

    let mut reordered = sequence.to_vec();
    if source_index == target_index {
        return Ok(reordered);
    }

    let moved = reordered.remove(source_index);
    reordered.insert(target_index, moved);
    Ok(reordered)
}

/// Pairs each element with its dense 1-based position.
pub fn dense_orders<T: Clone>(sequence: &[T]) -> Vec<(T, u32)> {
    sequence
        .iter()
        .cloned()
        .zip(1u32..)
        .collect()
}

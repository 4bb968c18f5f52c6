//! Drag-and-drop style reordering of positioned lists

use crate::error::{KitchenError, Result};

/// Move the item at `from` so it ends up at index `to`, shifting the items
/// in between. Positions of the returned list are its indexes.
pub fn move_to_index<T: Clone>(items: &[T], from: usize, to: usize) -> Result<Vec<T>> {
    let len = items.len();
    if from >= len || to >= len {
        return Err(KitchenError::InvalidMove { from, to, len });
    }

    let mut reordered = items.to_vec();
    let item = reordered.remove(from);
    reordered.insert(to, item);
    Ok(reordered)
}

/// `(index, stored_position)` for every entry not already stored at its index.
pub fn changed_positions(stored: &[usize]) -> Vec<(usize, usize)> {
    stored
        .iter()
        .enumerate()
        .filter(|(index, position)| *index != **position)
        .map(|(index, position)| (index, *position))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_down() {
        let moved = move_to_index(&['a', 'b', 'c', 'd'], 0, 2).unwrap();
        assert_eq!(moved, vec!['b', 'c', 'a', 'd']);
    }

    #[test]
    fn test_move_up() {
        let moved = move_to_index(&['a', 'b', 'c', 'd'], 3, 1).unwrap();
        assert_eq!(moved, vec!['a', 'd', 'b', 'c']);
    }

    #[test]
    fn test_move_in_place() {
        let moved = move_to_index(&[1, 2, 3], 1, 1).unwrap();
        assert_eq!(moved, vec![1, 2, 3]);
    }

    #[test]
    fn test_out_of_range() {
        let err = move_to_index(&[1, 2, 3], 0, 3).unwrap_err();
        assert!(matches!(err, KitchenError::InvalidMove { from: 0, to: 3, len: 3 }));
        assert!(move_to_index::<i32>(&[], 0, 0).is_err());
    }

    #[test]
    fn test_changed_positions() {
        assert!(changed_positions(&[0, 1, 2]).is_empty());
        assert_eq!(changed_positions(&[1, 0, 2]), vec![(0, 1), (1, 0)]);
        assert_eq!(changed_positions(&[0, 2, 5]), vec![(1, 2), (2, 5)]);
    }
}

//! Recipe ingredient list reconciliation
//!
//! Saving a recipe replaces its whole ingredient list. Rather than deleting
//! and recreating every join row, the submitted list is diffed against the
//! stored one so that kept lines retain their identity.

use std::collections::{HashMap, HashSet};

use crate::models::{RecipeLine, ResolvedIngredientLine};

/// A line to create, at `order` in the submitted list.
#[derive(Debug, Clone, PartialEq)]
pub struct LineInsert {
    pub ingredient_id: i64,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub notes: Option<String>,
    pub order: usize,
}

/// New field values and position for an existing line.
#[derive(Debug, Clone, PartialEq)]
pub struct LineUpdate {
    pub line_id: i64,
    pub ingredient_id: i64,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub notes: Option<String>,
    pub order: usize,
}

/// Storage operations needed to turn the stored lines into the submitted ones.
///
/// `to_update`, `to_delete` and `unchanged` partition the stored line ids.
/// Orders are 0-based indexes into the submitted list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconciliationPlan {
    pub to_insert: Vec<LineInsert>,
    pub to_update: Vec<LineUpdate>,
    pub to_delete: Vec<i64>,
    pub unchanged: Vec<i64>,
}

impl ReconciliationPlan {
    pub fn is_noop(&self) -> bool {
        self.to_insert.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }
}

/// Diff `previous` (stored lines) against `submitted`.
///
/// A submitted line keeps its identity only when its `line_id` names a stored
/// line of this recipe that no earlier submitted line already claimed; any
/// other line is inserted. The same ingredient may appear on several lines.
pub fn reconcile(previous: &[RecipeLine], submitted: &[ResolvedIngredientLine]) -> ReconciliationPlan {
    let stored: HashMap<i64, &RecipeLine> = previous.iter().map(|line| (line.id, line)).collect();
    let mut claimed: HashSet<i64> = HashSet::with_capacity(submitted.len());
    let mut plan = ReconciliationPlan::default();

    for (order, line) in submitted.iter().enumerate() {
        let kept = line
            .line_id
            .and_then(|id| stored.get(&id).copied())
            .filter(|old| claimed.insert(old.id));

        match kept {
            Some(old) if !differs(old, line, order) => plan.unchanged.push(old.id),
            Some(old) => plan.to_update.push(LineUpdate {
                line_id: old.id,
                ingredient_id: line.ingredient_id,
                quantity: line.quantity,
                unit: line.unit.clone(),
                notes: line.notes.clone(),
                order,
            }),
            None => plan.to_insert.push(LineInsert {
                ingredient_id: line.ingredient_id,
                quantity: line.quantity,
                unit: line.unit.clone(),
                notes: line.notes.clone(),
                order,
            }),
        }
    }

    plan.to_delete = previous
        .iter()
        .map(|line| line.id)
        .filter(|id| !claimed.contains(id))
        .collect();

    plan
}

fn differs(old: &RecipeLine, new: &ResolvedIngredientLine, order: usize) -> bool {
    old.ingredient_id != new.ingredient_id
        || old.quantity != new.quantity
        || old.unit != new.unit
        || old.notes != new.notes
        || old.position != order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(id: i64, ingredient_id: i64, quantity: Option<f64>, position: usize) -> RecipeLine {
        RecipeLine {
            id,
            recipe_id: 1,
            ingredient_id,
            quantity,
            unit: None,
            notes: None,
            position,
        }
    }

    fn kept(line: &RecipeLine) -> ResolvedIngredientLine {
        ResolvedIngredientLine {
            line_id: Some(line.id),
            ingredient_id: line.ingredient_id,
            quantity: line.quantity,
            unit: line.unit.clone(),
            notes: line.notes.clone(),
        }
    }

    fn fresh(ingredient_id: i64) -> ResolvedIngredientLine {
        ResolvedIngredientLine {
            line_id: None,
            ingredient_id,
            quantity: None,
            unit: None,
            notes: None,
        }
    }

    fn assert_partitions(previous: &[RecipeLine], plan: &ReconciliationPlan) {
        let mut seen: Vec<i64> = plan
            .to_update
            .iter()
            .map(|u| u.line_id)
            .chain(plan.to_delete.iter().copied())
            .chain(plan.unchanged.iter().copied())
            .collect();
        seen.sort_unstable();
        let mut expected: Vec<i64> = previous.iter().map(|l| l.id).collect();
        expected.sort_unstable();
        assert_eq!(seen, expected, "stored lines must be partitioned exactly once");
    }

    #[test]
    fn test_replace_and_append() {
        // previous = [A(qty=2), B(qty=1)], submitted = [B(qty=1), C(new)]
        let a = stored(10, 100, Some(2.0), 0);
        let b = stored(11, 101, Some(1.0), 1);
        let previous = vec![a, b.clone()];
        let submitted = vec![kept(&b), fresh(102)];

        let plan = reconcile(&previous, &submitted);

        assert_eq!(plan.to_delete, vec![10]);
        assert_eq!(plan.to_update.len(), 1);
        assert_eq!(plan.to_update[0].line_id, 11);
        assert_eq!(plan.to_update[0].order, 0);
        assert_eq!(plan.to_insert.len(), 1);
        assert_eq!(plan.to_insert[0].ingredient_id, 102);
        assert_eq!(plan.to_insert[0].order, 1);
        assert_partitions(&previous, &plan);
    }

    #[test]
    fn test_verbatim_resubmission_is_noop() {
        let previous = vec![
            stored(1, 100, Some(2.0), 0),
            stored(2, 101, None, 1),
            stored(3, 102, Some(0.5), 2),
        ];
        let submitted: Vec<_> = previous.iter().map(kept).collect();

        let plan = reconcile(&previous, &submitted);

        assert!(plan.is_noop());
        assert_eq!(plan.unchanged, vec![1, 2, 3]);
        assert_partitions(&previous, &plan);
    }

    #[test]
    fn test_reorder_only_updates_moved_lines() {
        let previous = vec![
            stored(1, 100, None, 0),
            stored(2, 101, None, 1),
            stored(3, 102, None, 2),
        ];
        // Swap the first two, third stays in place.
        let submitted = vec![kept(&previous[1]), kept(&previous[0]), kept(&previous[2])];

        let plan = reconcile(&previous, &submitted);

        let moved: Vec<(i64, usize)> = plan.to_update.iter().map(|u| (u.line_id, u.order)).collect();
        assert_eq!(moved, vec![(2, 0), (1, 1)]);
        assert_eq!(plan.unchanged, vec![3]);
        assert!(plan.to_insert.is_empty());
        assert!(plan.to_delete.is_empty());
    }

    #[test]
    fn test_field_change_updates_in_place() {
        let previous = vec![stored(1, 100, Some(1.0), 0)];
        let mut line = kept(&previous[0]);
        line.notes = Some("finely chopped".to_string());
        line.unit = Some("tbsp".to_string());

        let plan = reconcile(&previous, &[line]);

        assert_eq!(
            plan.to_update,
            vec![LineUpdate {
                line_id: 1,
                ingredient_id: 100,
                quantity: Some(1.0),
                unit: Some("tbsp".to_string()),
                notes: Some("finely chopped".to_string()),
                order: 0,
            }]
        );
    }

    #[test]
    fn test_empty_submission_deletes_everything() {
        let previous = vec![stored(1, 100, None, 0), stored(2, 101, None, 1)];

        let plan = reconcile(&previous, &[]);

        assert_eq!(plan.to_delete, vec![1, 2]);
        assert!(plan.to_insert.is_empty());
        assert!(plan.to_update.is_empty());
    }

    #[test]
    fn test_new_recipe_inserts_everything() {
        let submitted = vec![fresh(5), fresh(6), fresh(7)];

        let plan = reconcile(&[], &submitted);

        let orders: Vec<(i64, usize)> = plan.to_insert.iter().map(|i| (i.ingredient_id, i.order)).collect();
        assert_eq!(orders, vec![(5, 0), (6, 1), (7, 2)]);
        assert!(plan.to_delete.is_empty());
        assert!(plan.to_update.is_empty());
    }

    #[test]
    fn test_duplicate_ingredient_is_not_merged() {
        let mut whole = fresh(100);
        whole.notes = Some("for the sauce".to_string());
        let mut garnish = fresh(100);
        garnish.notes = Some("to garnish".to_string());

        let plan = reconcile(&[], &[whole, garnish]);

        assert_eq!(plan.to_insert.len(), 2);
        assert_eq!(plan.to_insert[0].notes.as_deref(), Some("for the sauce"));
        assert_eq!(plan.to_insert[1].notes.as_deref(), Some("to garnish"));
        assert_eq!(plan.to_insert[1].order, 1);
    }

    #[test]
    fn test_unknown_line_id_becomes_insert() {
        let previous = vec![stored(1, 100, None, 0)];
        let mut foreign = fresh(101);
        foreign.line_id = Some(999);

        let plan = reconcile(&previous, &[foreign]);

        assert_eq!(plan.to_insert.len(), 1);
        assert_eq!(plan.to_delete, vec![1]);
        assert_partitions(&previous, &plan);
    }

    #[test]
    fn test_repeated_line_id_keeps_first_claim() {
        let previous = vec![stored(1, 100, None, 0)];
        let submitted = vec![kept(&previous[0]), kept(&previous[0])];

        let plan = reconcile(&previous, &submitted);

        assert_eq!(plan.unchanged, vec![1]);
        assert_eq!(plan.to_insert.len(), 1);
        assert_eq!(plan.to_insert[0].order, 1);
        assert_partitions(&previous, &plan);
    }
}

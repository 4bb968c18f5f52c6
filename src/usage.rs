//! Usage score with exponential decay
//!
//! Each ingredient stores a `(score, last_used_at)` pair that is only written
//! when the ingredient is used. Ranking code derives a live score from it:
//!
//! ```text
//! live = stored * e^(-DECAY_RATE * days_since_last_use)
//! ```
//!
//! so recently and frequently used ingredients sort first without keeping a
//! log of every usage event.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::models::Ingredient;

/// Days after which a usage contributes half its weight.
pub const HALF_LIFE_DAYS: f64 = 35.0;

/// Decay constant per day, `ln(2) / HALF_LIFE_DAYS`.
pub const DECAY_RATE: f64 = std::f64::consts::LN_2 / HALF_LIFE_DAYS;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Fractional days from `from` to `to`. A `to` earlier than `from` counts as zero.
pub fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let millis = (to - from).num_milliseconds().max(0);
    millis as f64 / MILLIS_PER_DAY
}

/// Decayed score at `now`. Never-used ingredients score 0.
pub fn live_score(
    stored_score: Option<f64>,
    last_used_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> f64 {
    let (Some(score), Some(last_used_at)) = (stored_score, last_used_at) else {
        return 0.0;
    };
    if !score.is_finite() || score <= 0.0 {
        return 0.0;
    }

    score * (-DECAY_RATE * days_between(last_used_at, now)).exp()
}

/// New `(stored_score, last_used_at)` pair after a usage at `now`.
///
/// The prior score is decayed up to `now` and one unit is added on top; the
/// caller persists the returned pair.
pub fn record_usage(
    stored_score: Option<f64>,
    last_used_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> (f64, DateTime<Utc>) {
    (live_score(stored_score, last_used_at, now) + 1.0, now)
}

/// Sort ingredients by descending live score, then by name.
pub fn rank_by_live_score(ingredients: &mut [Ingredient], now: DateTime<Utc>) {
    ingredients.sort_by(|a, b| {
        b.live_score(now)
            .total_cmp(&a.live_score(now))
            .then_with(|| compare_names(&a.name, &b.name))
    });
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn ingredient(name: &str, score: Option<f64>, last_used_at: Option<DateTime<Utc>>) -> Ingredient {
        Ingredient {
            id: 0,
            user_id: "u".to_string(),
            name: name.to_string(),
            category_id: None,
            usage_score: score,
            last_used_at,
            created_at: t0(),
        }
    }

    #[test]
    fn test_never_used_scores_zero() {
        assert_eq!(live_score(None, None, t0()), 0.0);
        assert_eq!(live_score(Some(3.0), None, t0()), 0.0);
        assert_eq!(live_score(None, Some(t0()), t0()), 0.0);
    }

    #[test]
    fn test_decay_is_monotonic() {
        let mut previous = live_score(Some(4.0), Some(t0()), t0());
        for hours in (6..=24 * 120).step_by(6) {
            let score = live_score(Some(4.0), Some(t0()), t0() + Duration::hours(hours));
            assert!(score <= previous, "score rose after {hours}h");
            assert!(score >= 0.0);
            previous = score;
        }
    }

    #[test]
    fn test_half_life() {
        let score = live_score(Some(1.0), Some(t0()), t0() + Duration::days(35));
        assert!((score - 0.5).abs() < 1e-9);

        let score = live_score(Some(1.0), Some(t0()), t0() + Duration::days(70));
        assert!((score - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_record_usage_adds_one() {
        assert_eq!(record_usage(Some(0.0), None, t0()), (1.0, t0()));
        assert_eq!(record_usage(None, None, t0()), (1.0, t0()));

        let later = t0() + Duration::days(10);
        let decayed = live_score(Some(2.5), Some(t0()), later);
        let (score, at) = record_usage(Some(2.5), Some(t0()), later);
        assert!((score - (decayed + 1.0)).abs() < 1e-12);
        assert!(score > decayed);
        assert_eq!(at, later);
    }

    #[test]
    fn test_back_to_back_usage_accumulates() {
        let (s1, t1) = record_usage(None, None, t0());
        let (s2, t2) = record_usage(Some(s1), Some(t1), t0());
        assert_eq!((s2, t2), (2.0, t0()));
    }

    #[test]
    fn test_live_score_is_pure() {
        let now = t0() + Duration::days(3);
        let first = live_score(Some(1.7), Some(t0()), now);
        let second = live_score(Some(1.7), Some(t0()), now);
        assert_eq!(first, second);
    }

    #[test]
    fn test_clock_skew_does_not_inflate() {
        let score = live_score(Some(2.0), Some(t0()), t0() - Duration::days(2));
        assert_eq!(score, 2.0);
    }

    #[test]
    fn test_invalid_stored_scores() {
        assert_eq!(live_score(Some(-3.0), Some(t0()), t0()), 0.0);
        assert_eq!(live_score(Some(f64::NAN), Some(t0()), t0()), 0.0);
        assert_eq!(record_usage(Some(-3.0), Some(t0()), t0()).0, 1.0);
    }

    #[test]
    fn test_ranking_today_over_old_over_never() {
        let now = t0();
        let mut items = vec![
            ingredient("Never", None, None),
            ingredient("Old", Some(1.0), Some(now - Duration::days(70))),
            ingredient("Today", Some(1.0), Some(now)),
        ];

        rank_by_live_score(&mut items, now);

        let names: Vec<_> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["Today", "Old", "Never"]);
        assert!((items[0].live_score(now) - 1.0).abs() < 1e-9);
        assert!((items[1].live_score(now) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_ranking_ties_break_by_name() {
        let mut items = vec![
            ingredient("salt", None, None),
            ingredient("Basil", None, None),
            ingredient("pepper", None, None),
        ];

        rank_by_live_score(&mut items, t0());

        let names: Vec<_> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["Basil", "pepper", "salt"]);
    }
}

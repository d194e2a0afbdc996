//! Stream correlation: link primary pairs with their shadow counterparts.
//!
//! Both streams are arenas of [`Pair`]s owned by the caller. A correlation
//! link is the [`PairId`] (index) of the counterpart in the *other* arena, so
//! the symmetric association needs no shared ownership.
//!
//! Matching is first-fit in scan order: for each timestamped primary, the
//! still-unmatched shadows are scanned in their original order and the first
//! one with an equivalent request and a timestamp no earlier than the
//! primary's wins. Worst case is O(n·m) request comparisons; captures from
//! replayed traffic arrive in roughly the same order on both sides, so most
//! matches are found near the head of the pool.

use tc_common::{Pair, PairId};
use tracing::{debug, info, warn};

/// Fraction of timestamped primaries left unmatched above which a
/// scalability warning is logged.
pub const UNMATCHED_WARNING_RATIO: f64 = 0.10;

/// Counts describing one correlation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorrelationOutcome {
    /// Links established (each links one primary and one shadow).
    pub matched: usize,
    /// Primaries that stayed unlinked, including those without a timestamp.
    pub unmatched_primary: usize,
    /// Shadows that stayed unlinked.
    pub unmatched_shadow: usize,
    /// Primaries that carried a timestamp and were therefore eligible.
    pub timestamped_primary: usize,
}

impl CorrelationOutcome {
    /// Unmatched share of the eligible (timestamped) primaries.
    pub fn unmatched_ratio(&self) -> f64 {
        if self.timestamped_primary == 0 {
            return 0.0;
        }
        let unmatched_eligible = self.timestamped_primary.saturating_sub(self.matched);
        unmatched_eligible as f64 / self.timestamped_primary as f64
    }

    /// Whether enough primaries went unmatched to suggest the captures are
    /// misaligned or too far apart for first-fit matching.
    pub fn exceeds_warning_ratio(&self) -> bool {
        self.unmatched_ratio() > UNMATCHED_WARNING_RATIO
    }
}

/// Establish symmetric correlation links between `primary` and `shadow`.
///
/// Pairs that are already correlated are left untouched and never offered as
/// candidates, so running the pass twice is harmless.
pub fn correlate(primary: &mut [Pair], shadow: &mut [Pair]) -> CorrelationOutcome {
    let mut pool: Vec<usize> = (0..shadow.len())
        .filter(|&i| !shadow[i].is_correlated() && shadow[i].request().timestamp().is_some())
        .collect();
    let mut outcome = CorrelationOutcome::default();

    for (p_idx, p) in primary.iter_mut().enumerate() {
        let Some(p_ts) = p.request().timestamp() else {
            debug!(primary = p_idx, "primary request has no timestamp; not eligible");
            continue;
        };
        outcome.timestamped_primary += 1;
        if p.is_correlated() {
            continue;
        }

        let found = pool.iter().position(|&s_idx| {
            let candidate = &shadow[s_idx];
            candidate
                .request()
                .timestamp()
                .is_some_and(|s_ts| s_ts >= p_ts)
                && candidate.request().equivalent_to(p.request())
        });

        if let Some(pos) = found {
            let s_idx = pool.remove(pos);
            p.correlate_with(PairId(s_idx));
            shadow[s_idx].correlate_with(PairId(p_idx));
            debug!(primary = p_idx, shadow = s_idx, "correlated");
        }
    }

    outcome.matched = primary.iter().filter(|p| p.is_correlated()).count();
    outcome.unmatched_primary = primary.len() - outcome.matched;
    outcome.unmatched_shadow = shadow.iter().filter(|s| !s.is_correlated()).count();

    info!(
        matched = outcome.matched,
        "{} uncorrelated primary, {} uncorrelated shadow",
        outcome.unmatched_primary,
        outcome.unmatched_shadow
    );
    if outcome.exceeds_warning_ratio() {
        warn!(
            unmatched_ratio = outcome.unmatched_ratio(),
            timestamped_primary = outcome.timestamped_primary,
            "many primary requests could not be correlated; correlation is first-fit and O(n*m), \
             check that both captures cover the same traffic window"
        );
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tc_common::{Request, Response, TreeValue};

    fn pair(uri: &str, ts: Option<i64>) -> Pair {
        let mut request = Request::new().with_method("GET").with_uri(uri);
        if let Some(ts) = ts {
            request = request.with_timestamp(ts);
        }
        Pair::new(Arc::new(request), Response::new(Some(200), TreeValue::Absent, "ok"))
    }

    #[test]
    fn links_are_symmetric() {
        let mut primary = vec![pair("/a", Some(1)), pair("/b", Some(2))];
        let mut shadow = vec![pair("/b", Some(3)), pair("/a", Some(2))];
        let outcome = correlate(&mut primary, &mut shadow);

        assert_eq!(outcome.matched, 2);
        assert_eq!(primary[0].correlation(), Some(PairId(1)));
        assert_eq!(primary[1].correlation(), Some(PairId(0)));
        for (i, p) in primary.iter().enumerate() {
            let s = p.correlation().unwrap();
            assert_eq!(shadow[s.index()].correlation(), Some(PairId(i)));
        }
    }

    #[test]
    fn shadow_earlier_than_primary_is_ineligible() {
        let mut primary = vec![pair("/a", Some(10))];
        let mut shadow = vec![pair("/a", Some(9))];
        let outcome = correlate(&mut primary, &mut shadow);
        assert_eq!(outcome.matched, 0);
        assert_eq!(outcome.unmatched_primary, 1);
        assert_eq!(outcome.unmatched_shadow, 1);
    }

    #[test]
    fn equal_timestamps_match() {
        let mut primary = vec![pair("/a", Some(5))];
        let mut shadow = vec![pair("/a", Some(5))];
        assert_eq!(correlate(&mut primary, &mut shadow).matched, 1);
    }

    #[test]
    fn untimestamped_shadow_is_never_a_candidate() {
        let mut primary = vec![pair("/a", Some(1))];
        let mut shadow = vec![pair("/a", None), pair("/a", Some(4))];
        correlate(&mut primary, &mut shadow);
        assert_eq!(primary[0].correlation(), Some(PairId(1)));
        assert!(!shadow[0].is_correlated());
    }

    #[test]
    fn a_shadow_is_consumed_once() {
        let mut primary = vec![pair("/a", Some(1)), pair("/a", Some(1))];
        let mut shadow = vec![pair("/a", Some(2))];
        let outcome = correlate(&mut primary, &mut shadow);
        assert_eq!(outcome.matched, 1);
        assert!(primary[0].is_correlated());
        assert!(!primary[1].is_correlated());
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let mut primary = vec![pair("/a", Some(1)), pair("/b", Some(1))];
        let mut shadow = vec![pair("/a", Some(1))];
        let first = correlate(&mut primary, &mut shadow);
        let second = correlate(&mut primary, &mut shadow);
        assert_eq!(first, second);
        assert_eq!(primary[0].correlation(), Some(PairId(0)));
    }

    #[test]
    fn warning_ratio_counts_only_timestamped_primaries() {
        let outcome = CorrelationOutcome {
            matched: 9,
            unmatched_primary: 6,
            unmatched_shadow: 0,
            timestamped_primary: 10,
        };
        assert!((outcome.unmatched_ratio() - 0.1).abs() < 1e-9);
        assert!(!outcome.exceeds_warning_ratio());

        let worse = CorrelationOutcome {
            matched: 8,
            ..outcome
        };
        assert!(worse.exceeds_warning_ratio());
        assert_eq!(CorrelationOutcome::default().unmatched_ratio(), 0.0);
    }
}

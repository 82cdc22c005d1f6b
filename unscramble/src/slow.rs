//! Matching by rendered shape.
//!
//! Glyphs that the quick matcher could not resolve are rendered and compared
//! pixel by pixel against renderings of every guest character in a reference
//! typeface. Candidates whose ink density differs too much from the test
//! glyph are pruned before any overlap is computed.

use crate::{bitmap::GlyphBitmap, cache::BitmapCache, error::MatchError, guest::GuestRange};

/// Maximum relative difference in black ratio for a candidate to be scored.
pub const DEFAULT_RATIO_TOLERANCE: f64 = 0.2;

/// The winning candidate of a slow match.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct SlowMatch {
    pub character: char,
    /// Fraction of the test glyph's ink covered by the candidate, in `[0, 1]`.
    pub score: f64,
}

/// Fraction of the ink of `test` that is also ink in `reference`.
///
/// A blank test bitmap scores zero against everything.
pub fn overlap_score(test: &GlyphBitmap, reference: &GlyphBitmap) -> Result<f64, MatchError> {
    let overlap = reference.overlap(test)?;
    let ink = test.ink_count();
    if ink == 0 {
        return Ok(0.0);
    }
    Ok(overlap as f64 / ink as f64)
}

/// Returns true if a candidate with black ratio `candidate` is too far from
/// the test ratio to be considered.
///
/// With a test ratio of zero every candidate is pruned.
pub fn is_pruned(test_ratio: f64, candidate: f64, tolerance: f64) -> bool {
    if test_ratio == 0.0 {
        return true;
    }
    (test_ratio - candidate).abs() / test_ratio > tolerance
}

/// Scores every guest character that survives pruning, in guest order.
pub fn score_candidates(
    test: &GlyphBitmap,
    cache: &BitmapCache,
    guest: &GuestRange,
    tolerance: f64,
) -> Result<Vec<SlowMatch>, MatchError> {
    let test_ratio = test.black_ratio();
    let mut scored = Vec::new();
    for ch in guest.iter() {
        let (Some(reference), Some(ratio)) = (cache.get(ch), cache.ratio(ch)) else {
            continue;
        };
        if is_pruned(test_ratio, ratio, tolerance) {
            continue;
        }
        scored.push(SlowMatch {
            character: ch,
            score: overlap_score(test, reference)?,
        });
    }
    Ok(scored)
}

/// Finds the guest character whose reference rendering best covers `test`.
///
/// Ties go to the earliest candidate in guest order. Returns `None` if no
/// candidate survives pruning or none has a positive score.
pub fn match_bitmap(
    test: &GlyphBitmap,
    cache: &BitmapCache,
    guest: &GuestRange,
    tolerance: f64,
) -> Result<Option<SlowMatch>, MatchError> {
    if test.canvas() != cache.canvas() {
        return Err(MatchError::DimensionMismatch {
            expected: cache.canvas(),
            found: test.canvas(),
        });
    }
    let mut best: Option<SlowMatch> = None;
    for candidate in score_candidates(test, cache, guest, tolerance)? {
        let best_score = best.map(|m| m.score).unwrap_or(0.0);
        if candidate.score > best_score {
            best = Some(candidate);
        }
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crate::bitmap::Canvas;

    use super::*;

    const CANVAS: Canvas = Canvas::new(20, 20);

    /// Horizontal bars at the given rows, each 2 px tall and 16 px wide.
    fn bars(rows: &[u32]) -> GlyphBitmap {
        GlyphBitmap::from_fn(CANVAS, |x, y| {
            (2..18).contains(&x) && rows.iter().any(|row| (*row..row + 2).contains(&y))
        })
    }

    fn cache(entries: Vec<(char, GlyphBitmap)>) -> BitmapCache {
        BitmapCache::from_bitmaps(CANVAS, 16.0, entries.into_iter().collect::<BTreeMap<_, _>>())
    }

    #[test]
    fn scenario_three_bars() {
        // one, two and three bars; the test glyph is a slightly shifted three
        let cache = cache(vec![
            ('一', bars(&[9])),
            ('二', bars(&[5, 13])),
            ('三', bars(&[3, 9, 15])),
        ]);
        let guest = GuestRange::new("一二三".chars());
        let test = GlyphBitmap::from_fn(CANVAS, |x, y| {
            (3..19).contains(&x) && [3, 9, 15].iter().any(|row| (*row..row + 2).contains(&y))
        });
        let best = match_bitmap(&test, &cache, &guest, DEFAULT_RATIO_TOLERANCE)
            .unwrap()
            .unwrap();
        assert_eq!(best.character, '三');
        assert_eq!(best.score, 15.0 / 16.0);
    }

    #[test]
    fn identical_rendering_wins_outright() {
        let de = GlyphBitmap::from_fn(CANVAS, |x, y| (x * 7 + y * 3) % 5 == 0 || x == 3);
        let cache = cache(vec![
            ('白', GlyphBitmap::from_fn(CANVAS, |x, y| (x * 7 + y * 3) % 5 == 0)),
            ('的', de.clone()),
            ('勺', GlyphBitmap::from_fn(CANVAS, |x, y| (x * 7 + y * 3) % 5 == 1 || x == 3)),
        ]);
        let guest = GuestRange::new("白的勺".chars());
        let best = match_bitmap(&de, &cache, &guest, DEFAULT_RATIO_TOLERANCE)
            .unwrap()
            .unwrap();
        assert_eq!(best, SlowMatch { character: '的', score: 1.0 });
    }

    #[test]
    fn self_score_is_one() {
        let bitmap = bars(&[4, 10]);
        assert_eq!(overlap_score(&bitmap, &bitmap), Ok(1.0));
    }

    #[test]
    fn scores_are_fractions() {
        let cache = cache(vec![
            ('a', bars(&[2])),
            ('b', bars(&[2, 3])),
            ('c', GlyphBitmap::from_fn(CANVAS, |x, _| x < 2)),
        ]);
        let guest = GuestRange::new("abc".chars());
        let test = bars(&[2]);
        for candidate in score_candidates(&test, &cache, &guest, f64::INFINITY).unwrap() {
            assert!((0.0..=1.0).contains(&candidate.score), "{candidate:?}");
        }
    }

    #[test]
    fn pruned_candidates_are_never_chosen() {
        // 'a' would be a perfect overlap but has far more ink
        let cache = cache(vec![
            ('a', GlyphBitmap::from_fn(CANVAS, |_, _| true)),
            ('b', bars(&[8])),
        ]);
        let guest = GuestRange::new("ab".chars());
        let test = bars(&[7]);
        let scored = score_candidates(&test, &cache, &guest, DEFAULT_RATIO_TOLERANCE).unwrap();
        assert_eq!(scored.iter().map(|m| m.character).collect::<Vec<_>>(), vec!['b']);
        let best = match_bitmap(&test, &cache, &guest, DEFAULT_RATIO_TOLERANCE)
            .unwrap()
            .unwrap();
        assert_eq!(best.character, 'b');
        assert_eq!(best.score, 0.5);
    }

    #[test]
    fn ties_go_to_first_in_guest_order() {
        let cache = cache(vec![('b', bars(&[5])), ('a', bars(&[5]))]);
        let guest = GuestRange::new("ba".chars());
        let best = match_bitmap(&bars(&[5]), &cache, &guest, DEFAULT_RATIO_TOLERANCE)
            .unwrap()
            .unwrap();
        assert_eq!(best.character, 'a');
    }

    #[test]
    fn blank_test_matches_nothing() {
        let cache = cache(vec![('a', GlyphBitmap::new(CANVAS)), ('b', bars(&[5]))]);
        let guest = GuestRange::new("ab".chars());
        let result = match_bitmap(&GlyphBitmap::new(CANVAS), &cache, &guest, DEFAULT_RATIO_TOLERANCE);
        assert_eq!(result, Ok(None));
    }

    #[test]
    fn zero_overlap_is_no_match() {
        let cache = cache(vec![('a', bars(&[2]))]);
        let guest = GuestRange::new("a".chars());
        let result = match_bitmap(&bars(&[12]), &cache, &guest, DEFAULT_RATIO_TOLERANCE);
        assert_eq!(result, Ok(None));
    }

    #[test]
    fn canvas_mismatch_is_an_error() {
        let cache = cache(vec![('a', bars(&[2]))]);
        let guest = GuestRange::new("a".chars());
        let test = GlyphBitmap::new(Canvas::new(10, 10));
        assert_eq!(
            match_bitmap(&test, &cache, &guest, DEFAULT_RATIO_TOLERANCE),
            Err(MatchError::DimensionMismatch {
                expected: CANVAS,
                found: Canvas::new(10, 10)
            })
        );
    }

    #[test]
    fn pruning_rule() {
        assert!(!is_pruned(0.5, 0.6, 0.2));
        assert!(is_pruned(0.5, 0.61, 0.2));
        assert!(is_pruned(0.0, 0.0, 0.2));
    }
}

//! Matching by raw outline coordinates.
//!
//! Fonts produced by the same obfuscation pipeline reuse glyph outlines with
//! at most small perturbations, so most glyphs of a new font can be resolved
//! by comparing their point streams against the coordinate table.

use std::collections::BTreeMap;

use coord_table::{CoordTable, Outline, PLACEHOLDER};

/// Scrambled character to the character its glyph depicts.
pub type ResolvedTable = BTreeMap<char, char>;

/// Result of a quick match.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct QuickMatch {
    pub resolved: ResolvedTable,
    /// Glyphs no fact matched, in ascending order.
    pub unresolved: Vec<char>,
}

impl QuickMatch {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Assigns characters to glyphs by fuzzy outline comparison.
///
/// Facts are visited in table order. Each fact is compared against the
/// glyphs that are still unassigned, in ascending order of their scrambled
/// character, and the first glyph within `fuzz` of the fact takes the fact's
/// character. There is no backtracking: a glyph is assigned at most once and
/// an earlier fact always wins over a later one.
pub fn match_glyphs(glyphs: &BTreeMap<char, Outline>, table: &CoordTable, fuzz: i32) -> QuickMatch {
    let mut pending: Vec<(char, &Outline)> = glyphs
        .iter()
        .filter(|(ch, _)| **ch != PLACEHOLDER)
        .map(|(ch, outline)| (*ch, outline))
        .collect();
    let mut resolved = ResolvedTable::new();
    for fact in table.iter() {
        if pending.is_empty() {
            break;
        }
        if fact.character == PLACEHOLDER {
            continue;
        }
        let hit = pending
            .iter()
            .position(|(_, outline)| outline.fuzzy_eq(&fact.outline, fuzz));
        if let Some(idx) = hit {
            let (scrambled, _) = pending.remove(idx);
            log::debug!("quick match {scrambled:?} -> {:?}", fact.character);
            resolved.insert(scrambled, fact.character);
        }
    }
    QuickMatch {
        resolved,
        unresolved: pending.into_iter().map(|(ch, _)| ch).collect(),
    }
}

#[cfg(test)]
mod tests {
    use coord_table::{CoordFact, Point, DEFAULT_FUZZ};
    use pretty_assertions::assert_eq;

    use super::*;

    fn glyphs(entries: &[(char, &[(i32, i32)])]) -> BTreeMap<char, Outline> {
        entries
            .iter()
            .map(|(ch, points)| {
                let outline: Outline = points.iter().map(|&(x, y)| Point::new(x, y)).collect();
                (*ch, outline)
            })
            .collect()
    }

    #[test]
    fn nearby_points_match() {
        let table = CoordTable::from_facts(vec![CoordFact::new('人', [(0, 0), (10, 10), (20, 0)])]);
        let glyphs = glyphs(&[('\u{e001}', &[(1, 1), (11, 9), (19, 1)])]);
        let result = match_glyphs(&glyphs, &table, DEFAULT_FUZZ);
        assert_eq!(result.resolved, ResolvedTable::from([('\u{e001}', '人')]));
    }

    #[test]
    fn extra_point_is_unresolved() {
        let table = CoordTable::from_facts(vec![CoordFact::new('人', [(0, 0), (10, 10), (20, 0)])]);
        let glyphs = glyphs(&[('\u{e001}', &[(1, 1), (11, 9), (19, 1), (0, 0)])]);
        let result = match_glyphs(&glyphs, &table, DEFAULT_FUZZ);
        assert!(result.resolved.is_empty());
        assert_eq!(result.unresolved, vec!['\u{e001}']);
    }

    #[test]
    fn perturbed_outline_matches() {
        let table = CoordTable::from_facts(vec![CoordFact::new('人', [(0, 0), (100, 200)])]);
        let glyphs = glyphs(&[('\u{e001}', &[(5, -3), (110, 195)])]);
        let result = match_glyphs(&glyphs, &table, DEFAULT_FUZZ);
        assert_eq!(result.resolved, ResolvedTable::from([('\u{e001}', '人')]));
        assert!(result.is_complete());
    }

    #[test]
    fn out_of_tolerance_is_unresolved() {
        let table = CoordTable::from_facts(vec![CoordFact::new('人', [(0, 0), (100, 200)])]);
        let glyphs = glyphs(&[('\u{e002}', &[(0, 0), (125, 200)])]);
        let result = match_glyphs(&glyphs, &table, DEFAULT_FUZZ);
        assert!(result.resolved.is_empty());
        assert_eq!(result.unresolved, vec!['\u{e002}']);
        assert!(!result.is_complete());
    }

    #[test]
    fn first_fact_wins() {
        // both facts match both glyphs; table order then glyph order decide
        let table = CoordTable::from_facts(vec![
            CoordFact::new('a', [(0, 0)]),
            CoordFact::new('b', [(10, 10)]),
        ]);
        let glyphs = glyphs(&[('\u{e002}', &[(5, 5)]), ('\u{e001}', &[(5, 5)])]);
        let result = match_glyphs(&glyphs, &table, DEFAULT_FUZZ);
        assert_eq!(
            result.resolved,
            ResolvedTable::from([('\u{e001}', 'a'), ('\u{e002}', 'b')])
        );
    }

    #[test]
    fn glyph_is_assigned_once() {
        let table = CoordTable::from_facts(vec![
            CoordFact::new('a', [(0, 0)]),
            CoordFact::new('a', [(1, 1)]),
        ]);
        let glyphs = glyphs(&[('\u{e001}', &[(0, 0)]), ('\u{e002}', &[(500, 500)])]);
        let result = match_glyphs(&glyphs, &table, DEFAULT_FUZZ);
        assert_eq!(result.resolved.len(), 1);
        assert_eq!(result.unresolved, vec!['\u{e002}']);
    }

    #[test]
    fn placeholder_is_ignored() {
        let table = CoordTable::from_facts(vec![
            CoordFact::new(PLACEHOLDER, [(0, 0)]),
            CoordFact::new('a', [(0, 0)]),
        ]);
        let glyphs = glyphs(&[(PLACEHOLDER, &[(0, 0)]), ('\u{e001}', &[(0, 0)])]);
        let result = match_glyphs(&glyphs, &table, DEFAULT_FUZZ);
        assert_eq!(result.resolved, ResolvedTable::from([('\u{e001}', 'a')]));
        assert!(result.unresolved.is_empty());
    }

    #[test]
    fn length_mismatch_never_matches() {
        let table = CoordTable::from_facts(vec![CoordFact::new('a', [(0, 0), (1, 1)])]);
        let glyphs = glyphs(&[('\u{e001}', &[(0, 0)])]);
        assert!(match_glyphs(&glyphs, &table, DEFAULT_FUZZ).resolved.is_empty());
    }

    #[test]
    fn deterministic() {
        let table = CoordTable::from_facts(
            (0..20)
                .map(|i| CoordFact::new(char::from(b'a' + i as u8), [(i * 15, 0), (0, i * 15)]))
                .collect(),
        );
        let glyphs: BTreeMap<char, Outline> = (0..20)
            .map(|i| {
                let ch = char::from_u32(0xe000 + i as u32).unwrap();
                (ch, Outline::from([(i * 15 + 3, 1), (2, i * 15 - 4)]))
            })
            .collect();
        let first = match_glyphs(&glyphs, &table, DEFAULT_FUZZ);
        for _ in 0..5 {
            assert_eq!(match_glyphs(&glyphs, &table, DEFAULT_FUZZ), first);
        }
        assert!(first.is_complete());
    }
}

//! Coordinate facts and the table that collects them.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::outline::Outline;

/// Character reserved for blank, decorative glyphs.
///
/// Facts for this character never take part in matching and it is never a
/// candidate in a guest range.
pub const PLACEHOLDER: char = 'x';

/// A previously observed glyph shape along with the character it depicts.
///
/// Serialized as a `[character, outline]` pair.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(from = "(char, Outline)", into = "(char, Outline)")]
pub struct CoordFact {
    pub character: char,
    pub outline: Outline,
}

impl CoordFact {
    pub fn new(character: char, outline: impl Into<Outline>) -> Self {
        Self {
            character,
            outline: outline.into(),
        }
    }

    /// Returns true if both facts name the same character with point for
    /// point identical outlines.
    pub fn is_duplicate_of(&self, other: &CoordFact) -> bool {
        self.character == other.character && self.outline.exact_eq(&other.outline)
    }
}

impl From<(char, Outline)> for CoordFact {
    fn from((character, outline): (char, Outline)) -> Self {
        Self { character, outline }
    }
}

impl From<CoordFact> for (char, Outline) {
    fn from(fact: CoordFact) -> Self {
        (fact.character, fact.outline)
    }
}

/// An ordered list of coordinate facts.
///
/// Tables produced by this crate are stable sorted by character and contain
/// no exact duplicates. The same character may appear in several facts since
/// different fonts draw the same character with different raw outlines.
#[derive(Clone, Default, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoordTable {
    facts: Vec<CoordFact>,
}

impl CoordTable {
    /// Creates a table from facts in the given order.
    ///
    /// No sorting or deduplication is applied.
    pub fn from_facts(facts: Vec<CoordFact>) -> Self {
        Self { facts }
    }

    /// Parses a table from its JSON form, stable sorting by character.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut table: CoordTable = serde_json::from_str(json)?;
        table.sort();
        Ok(table)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn facts(&self) -> &[CoordFact] {
        &self.facts
    }

    pub fn iter(&self) -> impl Iterator<Item = &CoordFact> + '_ {
        self.facts.iter()
    }

    /// Appends a fact at the end of the table, leaving order untouched.
    pub fn push(&mut self, fact: CoordFact) {
        self.facts.push(fact);
    }

    /// Stable sort by character.
    pub fn sort(&mut self) {
        self.facts.sort_by_key(|fact| fact.character);
    }

    /// Returns the set of characters named by the table, minus the
    /// placeholder.
    pub fn characters(&self) -> BTreeSet<char> {
        self.facts
            .iter()
            .map(|fact| fact.character)
            .filter(|ch| *ch != PLACEHOLDER)
            .collect()
    }

    /// Returns true if the table contains an exact duplicate of `fact`.
    pub fn contains(&self, fact: &CoordFact) -> bool {
        self.facts.iter().any(|f| f.is_duplicate_of(fact))
    }
}

impl FromIterator<CoordFact> for CoordTable {
    fn from_iter<T: IntoIterator<Item = CoordFact>>(iter: T) -> Self {
        Self {
            facts: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a CoordTable {
    type Item = &'a CoordFact;
    type IntoIter = std::slice::Iter<'a, CoordFact>;

    fn into_iter(self) -> Self::IntoIter {
        self.facts.iter()
    }
}

/// Merges a baseline table into a local one.
///
/// The local table is authoritative: every local fact survives. Baseline
/// facts that exactly duplicate a local fact are dropped, the remaining ones
/// are appended after the local facts and the result is stable sorted by
/// character.
pub fn merge_table(baseline: &CoordTable, local: &CoordTable) -> CoordTable {
    let known: HashSet<&CoordFact> = local.facts.iter().collect();
    let mut merged = local.clone();
    merged.facts.extend(
        baseline
            .facts
            .iter()
            .filter(|fact| !known.contains(fact))
            .cloned(),
    );
    merged.sort();
    merged
}

/// Removes exact duplicate facts.
///
/// Whenever two facts are exact duplicates the one at the earlier position
/// is dropped, so the most recently appended copy wins. Survivors keep their
/// relative order.
pub fn deduplicate(table: &CoordTable) -> CoordTable {
    // A fact survives iff no later fact duplicates it, so walk backwards
    // keeping first sightings.
    let mut seen = HashSet::with_capacity(table.len());
    let mut kept: Vec<&CoordFact> = table
        .facts
        .iter()
        .rev()
        .filter(|fact| seen.insert(*fact))
        .collect();
    kept.reverse();
    kept.into_iter().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fact(ch: char, points: &[(i32, i32)]) -> CoordFact {
        CoordFact::new(ch, points.iter().copied().map(Into::into).collect::<Outline>())
    }

    #[test]
    fn dedupe_keeps_later_copy() {
        let a1 = fact('a', &[(0, 0), (1, 1)]);
        let b = fact('b', &[(5, 5)]);
        let a2 = fact('a', &[(0, 0), (1, 1)]);
        let c = fact('c', &[(7, 7)]);
        let table = CoordTable::from_facts(vec![a1, b.clone(), a2.clone(), c.clone()]);
        let deduped = deduplicate(&table);
        assert_eq!(deduped.facts(), &[b, a2, c]);
    }

    #[test]
    fn dedupe_keeps_same_character_different_outline() {
        let table = CoordTable::from_facts(vec![
            fact('a', &[(0, 0)]),
            fact('a', &[(0, 1)]),
            fact('b', &[(0, 0)]),
        ]);
        assert_eq!(deduplicate(&table), table);
    }

    #[test]
    fn dedupe_collapses_triples() {
        let table = CoordTable::from_facts(vec![
            fact('a', &[(3, 3)]),
            fact('a', &[(3, 3)]),
            fact('z', &[(9, 9)]),
            fact('a', &[(3, 3)]),
        ]);
        let deduped = deduplicate(&table);
        assert_eq!(
            deduped.facts(),
            &[fact('z', &[(9, 9)]), fact('a', &[(3, 3)])]
        );
    }

    #[test]
    fn dedupe_is_idempotent() {
        let table = CoordTable::from_facts(vec![
            fact('q', &[(1, 2)]),
            fact('a', &[(0, 0)]),
            fact('q', &[(1, 2)]),
            fact('a', &[(0, 0)]),
            fact('a', &[(0, 1)]),
            fact('q', &[(1, 2), (3, 4)]),
        ]);
        let once = deduplicate(&table);
        let twice = deduplicate(&once);
        assert_eq!(once, twice);
        assert_eq!(once.len(), 4);
    }

    #[test]
    fn merge_prefers_local_and_sorts() {
        let local = CoordTable::from_facts(vec![fact('b', &[(1, 1)]), fact('a', &[(2, 2)])]);
        let baseline = CoordTable::from_facts(vec![
            fact('a', &[(2, 2)]),
            fact('a', &[(3, 3)]),
            fact('c', &[(4, 4)]),
        ]);
        let merged = merge_table(&baseline, &local);
        assert_eq!(
            merged.facts(),
            &[
                fact('a', &[(2, 2)]),
                fact('a', &[(3, 3)]),
                fact('b', &[(1, 1)]),
                fact('c', &[(4, 4)]),
            ]
        );
    }

    #[test]
    fn merge_never_shrinks_local() {
        let local = CoordTable::from_facts(vec![
            fact('a', &[(0, 0)]),
            fact('a', &[(0, 0)]),
            fact('b', &[(1, 0)]),
        ]);
        let baseline = CoordTable::from_facts(vec![fact('a', &[(0, 0)])]);
        let merged = merge_table(&baseline, &local);
        assert!(merged.len() >= local.len());
        // the shared fact is not counted twice
        let shared = fact('a', &[(0, 0)]);
        assert_eq!(
            merged.iter().filter(|f| f.is_duplicate_of(&shared)).count(),
            2
        );
    }

    #[test]
    fn merge_with_empty_local_takes_baseline() {
        let baseline = CoordTable::from_facts(vec![fact('b', &[(1, 1)]), fact('a', &[(0, 0)])]);
        let merged = merge_table(&baseline, &CoordTable::default());
        assert_eq!(
            merged.facts(),
            &[fact('a', &[(0, 0)]), fact('b', &[(1, 1)])]
        );
    }

    #[test]
    fn characters_skip_placeholder() {
        let table = CoordTable::from_facts(vec![
            fact(PLACEHOLDER, &[(0, 0)]),
            fact('人', &[(0, 0)]),
            fact('人', &[(1, 0)]),
            fact('的', &[(0, 0)]),
        ]);
        assert_eq!(
            table.characters().into_iter().collect::<Vec<_>>(),
            vec!['人', '的']
        );
    }

    #[test]
    fn json_round_trip_sorts() {
        let json = r#"[["的",[[1,2],[3,4]]],["人",[[0,0],[10,10],[20,0]]]]"#;
        let table = CoordTable::from_json(json).unwrap();
        assert_eq!(
            table.facts(),
            &[
                fact('人', &[(0, 0), (10, 10), (20, 0)]),
                fact('的', &[(1, 2), (3, 4)]),
            ]
        );
        let written = table.to_json().unwrap();
        assert_eq!(
            written,
            r#"[["人",[[0,0],[10,10],[20,0]]],["的",[[1,2],[3,4]]]]"#
        );
    }

    #[test]
    fn rejects_multi_char_keys() {
        assert!(CoordTable::from_json(r#"[["ab",[[0,0]]]]"#).is_err());
    }
}

//! The bounded set of characters a scrambled glyph may turn out to be.

use std::collections::BTreeSet;

use coord_table::{CoordTable, PLACEHOLDER};

/// Candidate characters for slow matching, in ascending codepoint order.
///
/// The order is significant: ties in the slow matcher are broken in favor
/// of the earlier candidate. The placeholder character is never part of
/// the range.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct GuestRange {
    chars: Vec<char>,
}

impl GuestRange {
    pub fn new(chars: impl IntoIterator<Item = char>) -> Self {
        let chars: BTreeSet<char> = chars
            .into_iter()
            .filter(|ch| *ch != PLACEHOLDER)
            .collect();
        Self {
            chars: chars.into_iter().collect(),
        }
    }

    /// Every character known to `table` plus the supplementary characters.
    pub fn from_table(table: &CoordTable, supplementary: impl IntoIterator<Item = char>) -> Self {
        Self::new(table.characters().into_iter().chain(supplementary))
    }

    pub fn iter(&self) -> impl Iterator<Item = char> + '_ {
        self.chars.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn contains(&self, ch: char) -> bool {
        self.chars.binary_search(&ch).is_ok()
    }

    pub fn as_slice(&self) -> &[char] {
        &self.chars
    }
}

impl FromIterator<char> for GuestRange {
    fn from_iter<T: IntoIterator<Item = char>>(iter: T) -> Self {
        Self::new(iter)
    }
}

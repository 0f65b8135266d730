//! Clade identifiers.
//!
//! A clade is a non-empty set of species leaf indices. Its textual form is
//! the numerically sorted concatenation of the indices, each followed by a
//! `*` marker, e.g. the clade of leaves 1 and 2 reads `1*2*`. Comparisons
//! always operate on the decoded sets, never on substrings.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::errors::HidtlError;

const MARKER: char = '*';

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Clade {
    leaves: BTreeSet<usize>,
}

impl Clade {
    pub fn leaf(index: usize) -> Self {
        Self {
            leaves: BTreeSet::from([index]),
        }
    }

    pub fn union(&self, other: &Clade) -> Clade {
        Clade {
            leaves: self.leaves.union(&other.leaves).copied().collect(),
        }
    }

    pub fn is_subset(&self, other: &Clade) -> bool {
        self.leaves.is_subset(&other.leaves)
    }

    pub fn is_superset(&self, other: &Clade) -> bool {
        self.leaves.is_superset(&other.leaves)
    }

    pub fn contains(&self, leaf: usize) -> bool {
        self.leaves.contains(&leaf)
    }

    pub fn is_leaf(&self) -> bool {
        self.leaves.len() == 1
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn leaves(&self) -> impl Iterator<Item = usize> + '_ {
        self.leaves.iter().copied()
    }
}

impl FromIterator<usize> for Clade {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self {
            leaves: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Clade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for leaf in &self.leaves {
            write!(f, "{leaf}{MARKER}")?;
        }
        Ok(())
    }
}

impl FromStr for Clade {
    type Err = HidtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.ends_with(MARKER) {
            return Err(HidtlError::InputError(format!(
                "Clade `{s}` does not end with the leaf marker"
            )));
        }
        let leaves = s
            .trim_end_matches(MARKER)
            .split(MARKER)
            .map(|token| {
                token.parse::<usize>().map_err(|_| {
                    HidtlError::InputError(format!("Invalid leaf token `{token}` in clade `{s}`"))
                })
            })
            .collect::<Result<BTreeSet<usize>, HidtlError>>()?;
        Ok(Self { leaves })
    }
}

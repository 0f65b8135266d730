//! Multi-species coalescent.
//!
//! Lineages are traced backwards in time along every branch of a locus
//! tree. On a branch entered by `k` lineages the waiting time until the next
//! merge is exponential with rate `k` times the mean coalescent rate of the
//! leaves covered by those lineages. Merges stop when a single lineage is
//! left or the branch is exhausted; the remaining lineages enter the parent
//! branch. The root branch is given an explicit length, which may be
//! infinite.

use rand::Rng;
use std::collections::BTreeMap;

use super::clade::Clade;
use super::rates::{RateVector, exponential};
use super::tree_table::TreeTable;

/// A single merge of two lineages.
#[derive(Clone, Debug, PartialEq)]
pub struct MergeRecord {
    /// Lineages immediately before the merge.
    pub from_set: Vec<Clade>,
    /// Lineages immediately after the merge; `merged` replaces two entries of `from_set`.
    pub to_set: Vec<Clade>,
    /// Waiting time since the previous merge on the branch, or since the bottom of the branch.
    pub distance: f64,
    pub merged: Clade,
}

/// Merge records keyed by the species id of the branch they happened on.
/// Records of one branch are kept in chronological order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CoalescentProcess {
    branches: BTreeMap<usize, Vec<MergeRecord>>,
}

impl CoalescentProcess {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self, species_id: usize) -> &[MergeRecord] {
        self.branches
            .get(&species_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn branches(&self) -> impl Iterator<Item = (usize, &[MergeRecord])> {
        self.branches
            .iter()
            .map(|(&species_id, records)| (species_id, records.as_slice()))
    }

    /// Total number of merges.
    pub fn len(&self) -> usize {
        self.branches.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn extend(&mut self, species_id: usize, records: Vec<MergeRecord>) {
        if !records.is_empty() {
            self.branches.entry(species_id).or_default().extend(records);
        }
    }

    /// Keep only the history of `lineage`: merges producing a clade inside
    /// the lineage, with their lineage sets restricted to such clades.
    pub fn restrict(&mut self, lineage: &Clade) {
        for records in self.branches.values_mut() {
            records.retain(|record| record.merged.is_subset(lineage));
            for record in records.iter_mut() {
                record.from_set.retain(|clade| clade.is_subset(lineage));
                record.to_set.retain(|clade| clade.is_subset(lineage));
            }
        }
        self.branches.retain(|_, records| !records.is_empty());
    }
}

/// Run the coalescent bottom-up over `tree`. `distance_above_root` is the
/// length of the branch above the root. Returns the recorded process and
/// the lineages leaving the top of the root branch.
pub fn coalesce<R: Rng + ?Sized>(
    tree: &TreeTable,
    distance_above_root: f64,
    rates: &RateVector,
    rng: &mut R,
) -> (CoalescentProcess, Vec<Clade>) {
    let mut process = CoalescentProcess::new();
    let mut outgoing: Vec<Vec<Clade>> = vec![Vec::new(); tree.len()];
    for id in tree.post_order() {
        let entry = tree.entry(id);
        let mut lineages: Vec<Clade> = if entry.is_leaf() {
            vec![Clade::leaf(entry.fake_id)]
        } else {
            entry
                .children
                .iter()
                .flat_map(|&child| std::mem::take(&mut outgoing[child]))
                .collect()
        };
        let length = entry.distance_to_parent.unwrap_or(distance_above_root);
        let records = coalesce_branch(&mut lineages, length, rates, rng);
        log::trace!(
            "Branch {} ({}): {} merges, {} lineages leave",
            entry.fake_id,
            entry.name,
            records.len(),
            lineages.len()
        );
        process.extend(entry.fake_id, records);
        outgoing[id] = lineages;
    }
    let surviving = std::mem::take(&mut outgoing[tree.root().id]);
    (process, surviving)
}

fn coalesce_branch<R: Rng + ?Sized>(
    lineages: &mut Vec<Clade>,
    length: f64,
    rates: &RateVector,
    rng: &mut R,
) -> Vec<MergeRecord> {
    let mut records = Vec::new();
    let mut remaining = length;
    while lineages.len() > 1 {
        let k = lineages.len();
        let waiting = exponential(k as f64 * rates.mean_over(lineages), rng);
        if waiting.is_infinite() || waiting > remaining {
            break;
        }
        let from_set = lineages.clone();
        let pair = rand::seq::index::sample(rng, k, 2);
        let (i, j) = (pair.index(0), pair.index(1));
        let a = lineages.remove(i.max(j));
        let b = lineages.remove(i.min(j));
        let merged = a.union(&b);
        lineages.push(merged.clone());
        records.push(MergeRecord {
            from_set,
            to_set: lineages.clone(),
            distance: waiting,
            merged,
        });
        remaining -= waiting;
    }
    records
}

/// One step of a lineage's ancestry: the clade it merged into and the
/// height of that merge.
#[derive(Clone, Debug, PartialEq)]
pub struct Ancestor {
    pub clade: Clade,
    pub height: f64,
    /// Species branch on which the merge happened.
    pub species_id: usize,
}

/// Chronological ancestor chains of every leaf of `tree` inside `lineage`,
/// keyed by species leaf id.
pub fn time_sequences(
    process: &CoalescentProcess,
    tree: &TreeTable,
    lineage: &Clade,
) -> BTreeMap<usize, Vec<Ancestor>> {
    let mut sequences: BTreeMap<usize, Vec<Ancestor>> = tree
        .leaves()
        .filter(|leaf| lineage.contains(leaf.fake_id))
        .map(|leaf| (leaf.fake_id, Vec::new()))
        .collect();

    for id in tree.post_order() {
        let entry = tree.entry(id);
        let mut height = tree.height(id);
        for record in process.records(entry.fake_id) {
            height += record.distance;
            for leaf in record.merged.leaves() {
                if let Some(sequence) = sequences.get_mut(&leaf) {
                    sequence.push(Ancestor {
                        clade: record.merged.clone(),
                        height,
                        species_id: entry.fake_id,
                    });
                }
            }
        }
    }
    sequences
}

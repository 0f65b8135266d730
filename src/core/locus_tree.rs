//! Coalescence policies on a locus tree.
//!
//! A locus tree is a clone of (part of) the species tree on which the gene
//! lineages coalesce. The bounded policy insists on a single lineage at the
//! top of the root branch, the incomplete policy accepts any outcome and
//! follows one surviving lineage.

use rand::Rng;
use rand::seq::IndexedRandom;

use super::clade::Clade;
use super::coalescent::{CoalescentProcess, coalesce};
use super::haplotype_tree;
use super::rates::RateVector;
use super::tree_table::TreeTable;
use crate::errors::{HidtlError, Result};

#[derive(Clone, Debug)]
pub struct LocusTree {
    tree: TreeTable,
}

impl LocusTree {
    pub fn new(tree: TreeTable) -> Self {
        Self { tree }
    }

    pub fn tree(&self) -> &TreeTable {
        &self.tree
    }

    /// Run the coalescent once with a window of `distance_above_root`
    /// above the root.
    pub fn coalescent<R: Rng + ?Sized>(
        &self,
        distance_above_root: f64,
        rates: &RateVector,
        rng: &mut R,
    ) -> (CoalescentProcess, Vec<Clade>) {
        coalesce(&self.tree, distance_above_root, rates, rng)
    }

    /// Repeat the coalescent until a single lineage survives. Gives up with
    /// [`HidtlError::NonConvergence`] after `max_retries` attempts.
    pub fn bounded_coalescent<R: Rng + ?Sized>(
        &self,
        distance_above_root: f64,
        rates: &RateVector,
        max_retries: usize,
        rng: &mut R,
    ) -> Result<(CoalescentProcess, Clade)> {
        for attempt in 1..=max_retries {
            let (process, mut surviving) = self.coalescent(distance_above_root, rates, rng);
            if surviving.len() == 1 {
                if attempt > 1 {
                    log::debug!("Bounded coalescence converged after {attempt} attempts");
                }
                if let Some(lineage) = surviving.pop() {
                    return Ok((process, lineage));
                }
            }
        }
        Err(HidtlError::NonConvergence {
            attempts: max_retries,
        })
    }

    /// Run the coalescent once, pick one surviving lineage uniformly and
    /// keep only its history.
    pub fn incomplete_coalescent<R: Rng + ?Sized>(
        &self,
        distance_above_root: f64,
        rates: &RateVector,
        rng: &mut R,
    ) -> Result<(CoalescentProcess, Clade)> {
        let (mut process, surviving) = self.coalescent(distance_above_root, rates, rng);
        let lineage = surviving.choose(rng).cloned().ok_or_else(|| {
            HidtlError::ImplementationError("Coalescence left no lineage".to_string())
        })?;
        log::trace!(
            "Incomplete coalescence: {} surviving lineages, following {}",
            surviving.len(),
            lineage
        );
        process.restrict(&lineage);
        Ok((process, lineage))
    }

    /// Gene tree of `lineage` under `process`.
    pub fn gene_tree(&self, process: &CoalescentProcess, lineage: &Clade) -> Result<TreeTable> {
        haplotype_tree::reconstruct(&self.tree, process, lineage)
    }
}

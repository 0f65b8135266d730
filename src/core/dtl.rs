//! Duplication, transfer and loss along the branches of a gene tree.
//!
//! Branches are walked from the root downwards. On each branch three
//! exponential clocks compete; the earliest one that fires before the end of
//! the branch produces an event. Duplications and transfers keep walking the
//! same branch, a loss ends the lineage, and a branch without further events
//! hands over to the branches of its children.

use rand::Rng;
use rand::seq::IndexedRandom;

use super::clade::Clade;
use super::event::{Event, EventKind};
use super::rates::{RateVector, exponential};
use super::species_tree::SpeciesTree;
use super::tree_table::TreeTable;

/// Per-leaf rates of the three event types.
#[derive(Clone, Debug, PartialEq)]
pub struct DtlRates {
    pub duplication: RateVector,
    pub transfer: RateVector,
    pub loss: RateVector,
}

impl DtlRates {
    /// Pick the earliest of the three clocks. Ties go to duplication, then
    /// transfer.
    fn draw<R: Rng + ?Sized>(&self, clade: &Clade, rng: &mut R) -> (EventKind, f64) {
        let duplication = exponential(self.duplication.mean(clade), rng);
        let transfer = exponential(self.transfer.mean(clade), rng);
        let loss = exponential(self.loss.mean(clade), rng);
        if duplication <= transfer && duplication <= loss {
            (EventKind::Duplication, duplication)
        } else if transfer <= loss {
            (EventKind::Transfer, transfer)
        } else {
            (EventKind::Loss, loss)
        }
    }
}

pub struct DtlSimulator<'a> {
    species: &'a SpeciesTree,
    rates: &'a DtlRates,
}

impl<'a> DtlSimulator<'a> {
    pub fn new(species: &'a SpeciesTree, rates: &'a DtlRates) -> Self {
        Self { species, rates }
    }

    /// Walk `gene` starting `start_distance` above its root and return the
    /// events in the order they fired.
    pub fn simulate<R: Rng + ?Sized>(
        &self,
        gene: &TreeTable,
        start_distance: f64,
        rng: &mut R,
    ) -> Vec<Event> {
        let clades = gene.clades();
        let mut events = Vec::new();
        let mut stack = vec![(gene.root().id, start_distance)];
        while let Some((node, distance)) = stack.pop() {
            let entry = gene.entry(node);
            let clade = &clades[node];
            let bottom = gene.height(node);
            let mut remaining = distance;
            loop {
                let (kind, waiting) = self.rates.draw(clade, rng);
                if waiting >= remaining {
                    for (&child, &length) in entry
                        .children
                        .iter()
                        .zip(entry.distance_to_children.iter())
                        .rev()
                    {
                        stack.push((child, length));
                    }
                    break;
                }
                remaining -= waiting;
                let event_height = bottom + remaining;
                let (species_node_id, distance_to_species_node) =
                    self.species.map_event(clade, event_height);

                let target_species_id = match kind {
                    EventKind::Transfer => {
                        if event_height >= self.species.root_height() {
                            continue;
                        }
                        let candidates =
                            self.species.transfer_candidates(species_node_id, event_height);
                        match candidates.choose(rng) {
                            Some(&target) => Some(target),
                            None => continue,
                        }
                    }
                    _ => None,
                };

                events.push(Event {
                    kind,
                    index: events.len(),
                    gene_node_id: node,
                    gene_node_name: entry.name.clone(),
                    gene_clade: clade.clone(),
                    distance_to_gene_node: remaining,
                    event_height,
                    species_node_id,
                    distance_to_species_node,
                    target_species_id,
                });
                log::trace!(
                    "{kind} on gene node {} at height {event_height} (species {})",
                    entry.name,
                    self.species.name(species_node_id)
                );

                if kind == EventKind::Loss {
                    break;
                }
            }
        }
        events
    }
}

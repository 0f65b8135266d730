//! Recursive subtree grafting.
//!
//! Every duplication or transfer starts a new lineage at the species node
//! where it enters. That lineage is simulated like the top-level gene
//! family: coalescence on a clone of the species subtree, gene tree
//! reconstruction, a DTL walk and grafting of its own events one level
//! deeper. The resulting subtree is spliced into the gene tree at the event.
//!
//! Losses are only collected while the events of a level are grafted. The
//! lost lineages are pruned in one pass once the level is complete, so that
//! every event can still address its gene node by index.

use itertools::Itertools;
use rand::Rng;
use std::collections::HashSet;

use super::dtl::{DtlRates, DtlSimulator};
use super::event::{Event, EventKind, EventLog, LoggedEvent};
use super::locus_tree::LocusTree;
use super::rates::RateVector;
use super::species_tree::SpeciesTree;
use super::tree_table::TreeTable;
use crate::errors::{HidtlError, Result};

/// Switches and limits of the grafting recursion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GraftOptions {
    pub hemiplasy: bool,
    pub recombination: bool,
    pub max_depth: usize,
    pub max_retries: usize,
}

pub struct GraftEngine<'a> {
    species: &'a SpeciesTree,
    coalescent: &'a RateVector,
    dtl: &'a DtlRates,
    options: GraftOptions,
}

impl<'a> GraftEngine<'a> {
    pub fn new(
        species: &'a SpeciesTree,
        coalescent: &'a RateVector,
        dtl: &'a DtlRates,
        options: GraftOptions,
    ) -> Self {
        Self {
            species,
            coalescent,
            dtl,
            options,
        }
    }

    /// Graft the subtrees spawned by `events` into `gene` and prune its
    /// losses. Every processed event is appended to `log`. Returns `None`
    /// when the whole tree is lost.
    pub fn graft<R: Rng + ?Sized>(
        &self,
        gene: TreeTable,
        events: Vec<Event>,
        level: usize,
        log: &mut EventLog,
        rng: &mut R,
    ) -> Result<Option<TreeTable>> {
        if level > self.options.max_depth {
            return Err(HidtlError::DepthExceeded { depth: level });
        }
        log::debug!(
            "Level {level}: grafting {} events into a gene tree of {} nodes",
            events.len(),
            gene.len()
        );

        let mut gene = gene;
        let mut lost: HashSet<usize> = HashSet::new();
        for event in events
            .into_iter()
            .sorted_by(|a, b| b.event_height.total_cmp(&a.event_height))
        {
            log.push(LoggedEvent {
                level,
                event: event.clone(),
            });
            match event.kind {
                EventKind::Loss => {
                    lost.insert(event.gene_node_id);
                }
                EventKind::Duplication | EventKind::Transfer => {
                    let Some((subtree, length)) = self.spawn(&event, level, log, rng)? else {
                        log::trace!(
                            "Lineage spawned by {} event {} was lost",
                            event.kind,
                            event.index
                        );
                        continue;
                    };
                    gene.graft(
                        event.gene_node_id,
                        event.distance_to_gene_node,
                        subtree,
                        length,
                        event.entry_species_id(),
                    )?;
                }
            }
        }

        if !lost.is_empty() {
            log::debug!("Level {level}: pruning {} lost lineages", lost.len());
        }
        Ok(gene.prune(&lost))
    }

    /// Simulate the lineage started by `event`. Returns the grafted subtree
    /// and the length of the branch connecting it to the event.
    fn spawn<R: Rng + ?Sized>(
        &self,
        event: &Event,
        level: usize,
        log: &mut EventLog,
        rng: &mut R,
    ) -> Result<Option<(TreeTable, f64)>> {
        let entry = event.entry_species_id();
        let subtree = self.species.tree().subtree(entry);
        let locus = match event.kind {
            EventKind::Duplication if !self.options.recombination => {
                subtree.restrict(&event.gene_clade).ok_or_else(|| {
                    HidtlError::ImplementationError(format!(
                        "Species {} has no leaves of clade {}",
                        self.species.name(entry),
                        event.gene_clade
                    ))
                })?
            }
            _ => subtree,
        };
        let locus = LocusTree::new(locus);
        let window = (event.event_height - locus.tree().root_height()).max(0.);

        let (process, lineage) = if self.options.hemiplasy {
            locus.incomplete_coalescent(window, self.coalescent, rng)?
        } else {
            locus.bounded_coalescent(window, self.coalescent, self.options.max_retries, rng)?
        };
        let gene = locus.gene_tree(&process, &lineage)?;
        let start = (event.event_height - gene.root_height()).max(0.);
        log::trace!(
            "Level {}: {} at {} enters species {} with lineage {}",
            level + 1,
            event.kind,
            event.event_height,
            self.species.name(entry),
            lineage
        );

        let events = DtlSimulator::new(self.species, self.dtl).simulate(&gene, start, rng);
        let grafted = self.graft(gene, events, level + 1, log, rng)?;
        Ok(grafted.map(|tree| {
            let length = (event.event_height - tree.root_height()).max(0.);
            (tree, length)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clade::Clade;
    use crate::core::tree_table::tests::{assert_post_order, table};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn constant(n: usize, value: f64) -> RateVector {
        RateVector::new(vec![value; n])
    }

    fn dtl(n: usize, duplication: f64, transfer: f64, loss: f64) -> DtlRates {
        DtlRates {
            duplication: constant(n, duplication),
            transfer: constant(n, transfer),
            loss: constant(n, loss),
        }
    }

    fn options() -> GraftOptions {
        GraftOptions {
            hemiplasy: false,
            recombination: true,
            max_depth: 64,
            max_retries: 1000,
        }
    }

    fn duplication(gene: &TreeTable, species: &SpeciesTree, node: usize, distance: f64) -> Event {
        let clade = gene.clade(node);
        let height = gene.height(node) + distance;
        let (species_node_id, distance_to_species_node) = species.map_event(&clade, height);
        Event {
            kind: EventKind::Duplication,
            index: 0,
            gene_node_id: node,
            gene_node_name: gene.entry(node).name.clone(),
            gene_clade: clade,
            distance_to_gene_node: distance,
            event_height: height,
            species_node_id,
            distance_to_species_node,
            target_species_id: None,
        }
    }

    #[test]
    fn duplication_adds_a_copy() {
        let species = SpeciesTree::new(table("(A:1,(B:1,C:1):1):0;"));
        let gene = table("(A:1,(B:1,C:1):1):0;");
        let coalescent = constant(3, 1e4);
        let rates = dtl(3, 0., 0., 0.);
        let engine = GraftEngine::new(&species, &coalescent, &rates, options());
        let mut rng = StdRng::seed_from_u64(1);
        let mut log = EventLog::new();

        let event = duplication(&gene, &species, 3, 0.5);
        let grafted = engine
            .graft(gene, vec![event], 0, &mut log, &mut rng)
            .unwrap()
            .unwrap();

        assert_post_order(&grafted);
        assert_eq!(log.len(), 1);
        let leaves: Vec<&str> = grafted.leaves().map(|leaf| leaf.name.as_str()).collect();
        assert_eq!(leaves.len(), 5);
        assert_eq!(leaves.iter().filter(|&&name| name == "B").count(), 2);
        assert_eq!(leaves.iter().filter(|&&name| name == "C").count(), 2);
        assert_eq!(grafted.root_height(), 2.);
        for leaf in grafted.leaves() {
            assert!((grafted.height(leaf.id) - species.height(leaf.fake_id)).abs() < 1e-9);
        }
        let node = grafted
            .entries()
            .iter()
            .find(|entry| (grafted.height(entry.id) - 1.5).abs() < 1e-9)
            .unwrap();
        assert_eq!(node.fake_id, 3);
        assert_eq!(node.children.len(), 2);
    }

    #[test]
    fn duplication_without_recombination_keeps_the_gene_clade() {
        let species = SpeciesTree::new(table("(A:1,(B:1,C:1):1):0;"));
        let gene = table("(A:2,B:2,C:2);");
        let coalescent = constant(3, 1e4);
        let rates = dtl(3, 0., 0., 0.);
        let options = GraftOptions {
            recombination: false,
            ..options()
        };
        let engine = GraftEngine::new(&species, &coalescent, &rates, options);
        let mut rng = StdRng::seed_from_u64(2);
        let mut log = EventLog::new();

        // B alone duplicates above the B/C split
        let event = duplication(&gene, &species, 1, 1.5);
        assert_eq!(event.species_node_id, 3);
        let grafted = engine
            .graft(gene, vec![event], 0, &mut log, &mut rng)
            .unwrap()
            .unwrap();
        let leaves: Vec<&str> = grafted.leaves().map(|leaf| leaf.name.as_str()).collect();
        assert_eq!(leaves.len(), 4);
        assert_eq!(leaves.iter().filter(|&&name| name == "B").count(), 2);
    }

    #[test]
    fn hemiplasy_grafts_part_of_the_entry_clade() {
        let species = SpeciesTree::new(table("((A:1,B:1):1,(C:1,D:1):1);"));
        let coalescent = constant(4, 1.);
        let rates = dtl(4, 0., 0., 0.);
        let options = GraftOptions {
            hemiplasy: true,
            ..options()
        };
        let engine = GraftEngine::new(&species, &coalescent, &rates, options);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..20 {
            let gene = table("((A:1,B:1):1,(C:1,D:1):1);");
            let event = duplication(&gene, &species, 4, 0.5);
            assert_eq!(event.species_node_id, 4);
            let mut log = EventLog::new();
            let grafted = engine
                .graft(gene, vec![event], 0, &mut log, &mut rng)
                .unwrap()
                .unwrap();

            assert_post_order(&grafted);
            assert_eq!(log.len(), 1);
            for leaf in grafted.leaves() {
                assert!((grafted.height(leaf.id) - species.height(leaf.fake_id)).abs() < 1e-9);
            }

            let original = grafted.entries().iter().find(|e| e.name == "AB").unwrap();
            let inserted = grafted.entry(original.parent.unwrap());
            assert_eq!(inserted.fake_id, 4);
            assert!((grafted.height(inserted.id) - 1.5).abs() < 1e-9);

            let copy = grafted.entry(inserted.children[1]);
            assert!(grafted.clade(copy.id).is_subset(species.clade(4)));
            let length = copy.distance_to_parent.unwrap();
            assert!((length - (1.5 - grafted.height(copy.id))).abs() < 1e-9);
            assert!((4..=6).contains(&grafted.leaves().count()));
        }
    }

    #[test]
    fn losses_are_pruned_after_grafting() {
        let species = SpeciesTree::new(table("(A:1,(B:1,C:1):1):0;"));
        let gene = table("(A:1,(B:1,C:1):1):0;");
        let coalescent = constant(3, 1e4);
        let rates = dtl(3, 0., 0., 0.);
        let engine = GraftEngine::new(&species, &coalescent, &rates, options());
        let mut rng = StdRng::seed_from_u64(3);
        let mut log = EventLog::new();

        let mut loss = duplication(&gene, &species, 0, 0.2);
        loss.kind = EventKind::Loss;
        let copy = duplication(&gene, &species, 0, 0.6);
        let grafted = engine
            .graft(gene, vec![loss, copy], 0, &mut log, &mut rng)
            .unwrap()
            .unwrap();

        // the copy was grafted first, then the original A was pruned
        assert_eq!(log[0].event.kind, EventKind::Duplication);
        assert_eq!(log[1].event.kind, EventKind::Loss);
        assert_post_order(&grafted);
        let leaves: Vec<&str> = grafted.leaves().map(|leaf| leaf.name.as_str()).collect();
        assert_eq!(leaves.len(), 3);
        assert_eq!(leaves.iter().filter(|&&name| name == "A").count(), 1);
        let a = grafted.leaves().find(|leaf| leaf.name == "A").unwrap();
        assert!((a.distance_to_parent.unwrap() - 1.).abs() < 1e-9);
    }

    #[test]
    fn everything_lost() {
        let species = SpeciesTree::new(table("(A:1,B:1);"));
        let gene = table("(A:1,B:1);");
        let coalescent = constant(2, 1.);
        let rates = dtl(2, 0., 0., 0.);
        let engine = GraftEngine::new(&species, &coalescent, &rates, options());
        let mut rng = StdRng::seed_from_u64(4);
        let mut log = EventLog::new();

        let mut first = duplication(&gene, &species, 0, 0.5);
        first.kind = EventKind::Loss;
        let mut second = duplication(&gene, &species, 1, 0.5);
        second.kind = EventKind::Loss;
        let grafted = engine
            .graft(gene, vec![first, second], 0, &mut log, &mut rng)
            .unwrap();
        assert!(grafted.is_none());
        assert_eq!(log.count(EventKind::Loss), 2);
    }

    #[test]
    fn depth_is_bounded() {
        let species = SpeciesTree::new(table("(A:1,B:1);"));
        let gene = table("(A:1,B:1);");
        let coalescent = constant(2, 1e4);
        let rates = dtl(2, 50., 0., 0.);
        let options = GraftOptions {
            max_depth: 2,
            ..options()
        };
        let engine = GraftEngine::new(&species, &coalescent, &rates, options);
        let mut rng = StdRng::seed_from_u64(5);
        let mut log = EventLog::new();

        let event = duplication(&gene, &species, 0, 0.9);
        let result = engine.graft(gene, vec![event], 0, &mut log, &mut rng);
        assert_eq!(result, Err(HidtlError::DepthExceeded { depth: 3 }));
    }

    #[test]
    fn transfer_grafts_the_target_subtree() {
        let species = SpeciesTree::new(table("((A:1,B:1):1,(C:1,D:1):1);"));
        let gene = table("((A:1,B:1):1,(C:1,D:1):1);");
        let coalescent = constant(4, 1e4);
        let rates = dtl(4, 0., 0., 0.);
        let engine = GraftEngine::new(&species, &coalescent, &rates, options());
        let mut rng = StdRng::seed_from_u64(6);
        let mut log = EventLog::new();

        // leaves are 0..4, then AB = 4, CD = 5 and the root
        let mut transfer = duplication(&gene, &species, 4, 0.5);
        transfer.kind = EventKind::Transfer;
        transfer.target_species_id = Some(5);
        let grafted = engine
            .graft(gene, vec![transfer], 0, &mut log, &mut rng)
            .unwrap()
            .unwrap();

        assert_post_order(&grafted);
        assert_eq!(grafted.leaves().count(), 6);
        let inserted = grafted
            .entries()
            .iter()
            .find(|entry| (grafted.height(entry.id) - 1.5).abs() < 1e-9)
            .unwrap();
        assert_eq!(inserted.fake_id, 5);
        let expected: Clade = [0, 1, 2, 3].into_iter().collect();
        assert_eq!(grafted.clade(inserted.id), expected);
        let names: Vec<&str> = grafted
            .descendant_leaves(inserted.id)
            .into_iter()
            .map(|leaf| grafted.entry(leaf).name.as_str())
            .collect();
        assert_eq!(names, vec!["A", "B", "C", "D"]);
    }
}

//! Simulation of a complete gene family inside a species tree.

use rand::Rng;

use super::dtl::{DtlRates, DtlSimulator};
use super::event::{EventKind, EventLog};
use super::graft::{GraftEngine, GraftOptions};
use super::locus_tree::LocusTree;
use super::rates::RateVector;
use super::species_tree::SpeciesTree;
use super::tree_table::TreeTable;
use crate::config::Parameters;
use crate::errors::Result;

/// Rates drawn for one run, indexed by species leaf id.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelRates {
    pub coalescent: RateVector,
    pub dtl: DtlRates,
}

/// Outcome of a run.
#[derive(Clone, Debug, PartialEq)]
pub struct HaplotypeTree {
    /// The gene tree, `None` when every lineage was lost.
    pub tree: Option<TreeTable>,
    pub events: EventLog,
    pub rates: ModelRates,
}

pub struct Model {
    species: SpeciesTree,
    parameters: Parameters,
}

impl Model {
    pub fn new(species: TreeTable, parameters: Parameters) -> Result<Self> {
        parameters.validate()?;
        Ok(Self {
            species: SpeciesTree::new(species),
            parameters,
        })
    }

    pub fn species(&self) -> &SpeciesTree {
        &self.species
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn sample_rates<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<ModelRates> {
        let n = self.species.n_leaves();
        Ok(ModelRates {
            coalescent: RateVector::sample_coalescent(&self.parameters.coalescent, n, rng)?,
            dtl: DtlRates {
                duplication: RateVector::sample(&self.parameters.duplication, n, rng)?,
                transfer: RateVector::sample(&self.parameters.transfer, n, rng)?,
                loss: RateVector::sample(&self.parameters.loss, n, rng)?,
            },
        })
    }

    /// Draw rates and simulate one gene family.
    pub fn run<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<HaplotypeTree> {
        let rates = self.sample_rates(rng)?;
        self.run_with_rates(rates, rng)
    }

    /// Simulate one gene family with fixed rates.
    pub fn run_with_rates<R: Rng + ?Sized>(
        &self,
        rates: ModelRates,
        rng: &mut R,
    ) -> Result<HaplotypeTree> {
        log::debug!("Coalescent rates: {:?}", rates.coalescent);
        log::debug!("DTL rates: {:?}", rates.dtl);

        let locus = LocusTree::new(self.species.tree().clone());
        let (process, lineage) = locus.bounded_coalescent(
            f64::INFINITY,
            &rates.coalescent,
            self.parameters.max_retries,
            rng,
        )?;
        log::trace!("Coalescent process: {:?}", process);
        let gene = locus.gene_tree(&process, &lineage)?;
        log::debug!(
            "Gene tree of {} nodes with root height {}",
            gene.len(),
            gene.root_height()
        );

        let events = DtlSimulator::new(&self.species, &rates.dtl).simulate(&gene, 0., rng);
        log::trace!("Events: {:?}", events);

        let options = GraftOptions {
            hemiplasy: self.parameters.hemiplasy,
            recombination: self.parameters.recombination,
            max_depth: self.parameters.max_depth,
            max_retries: self.parameters.max_retries,
        };
        let engine = GraftEngine::new(&self.species, &rates.coalescent, &rates.dtl, options);
        let mut log = EventLog::new();
        let tree = engine.graft(gene, events, 0, &mut log, rng)?;

        log::info!(
            "Simulated {} duplications, {} transfers and {} losses",
            log.count(EventKind::Duplication),
            log.count(EventKind::Transfer),
            log.count(EventKind::Loss)
        );
        Ok(HaplotypeTree {
            tree,
            events: log,
            rates,
        })
    }
}

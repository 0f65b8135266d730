use anyhow::{Context, Result};

use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fs;
use std::io::{self, Write};

use crate::args::Args;
use crate::config::{Parameters, RateDistribution};
use crate::core::{HaplotypeTree, Model, TreeTable};
use crate::readwrite::{newick, write_events};

pub struct Runner {
    args: Args,
    model: Model,
    rng: StdRng,
}

impl Runner {
    pub fn new(args: Args) -> Result<Runner> {
        Self::setup_logger(&args)?;

        let parameters = Self::load_parameters(&args)?;
        log::info!("Loaded parameters\n{}", parameters);

        let species = Self::load_species_tree(&args.input)?;
        let rng = StdRng::seed_from_u64(parameters.seed);
        let model = Model::new(species, parameters)?;

        Ok(Self { args, model, rng })
    }

    pub fn start(&mut self) -> Result<()> {
        let outcome = self.run()?;
        self.finish(&outcome)
    }

    fn run(&mut self) -> Result<HaplotypeTree> {
        log::info!("Starting simulation...");
        let outcome = self.model.run(&mut self.rng)?;
        log::info!("Finished simulation.");
        Ok(outcome)
    }

    fn finish(&self, outcome: &HaplotypeTree) -> Result<()> {
        log::info!("Storing gene tree...");
        let text = match &outcome.tree {
            Some(tree) => {
                newick::write_with(tree, |entry| entry.is_leaf().then(|| entry.name.clone()))
            }
            None => {
                log::warn!("Every lineage of the gene family was lost.");
                ";".to_string()
            }
        };
        fs::write(&self.args.output, text + "\n")
            .with_context(|| format!("Unable to write gene tree to {}", self.args.output))?;

        if let Some(path) = &self.args.events {
            log::info!("Storing {} events...", outcome.events.len());
            let file = fs::File::create(path)
                .with_context(|| format!("Unable to create event file {path}"))?;
            let mut writer = io::BufWriter::new(file);
            write_events(&mut writer, outcome.events.iter(), self.model.species())
                .and_then(|_| writer.flush())
                .with_context(|| format!("Unable to write events to {path}"))?;
        }
        Ok(())
    }

    /// Setup logging level and file
    fn setup_logger(args: &Args) -> Result<()> {
        let log_level = match args.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };
        match &args.log_file {
            Some(path) => simple_logging::log_to_file(path, log_level)
                .with_context(|| format!("Unable to open log file {path}"))?,
            None => simple_logging::log_to_stderr(log_level),
        }
        Ok(())
    }

    /// Load parameters from the settings file, if any, and apply the
    /// command line overrides.
    fn load_parameters(args: &Args) -> Result<Parameters> {
        let mut parameters = match &args.settings {
            Some(path) => Parameters::read_from_file(path)
                .with_context(|| format!("Unable to load settings from {path}"))?,
            None => Parameters::default(),
        };

        let distributions = [
            (&args.coalescent, &mut parameters.coalescent),
            (&args.duplication, &mut parameters.duplication),
            (&args.transfer, &mut parameters.transfer),
            (&args.loss, &mut parameters.loss),
        ];
        for (flag, distribution) in distributions {
            if let Some(text) = flag {
                *distribution = text.parse::<RateDistribution>()?;
            }
        }
        if let Some(hemiplasy) = args.hemiplasy {
            parameters.hemiplasy = hemiplasy == 1;
        }
        if let Some(recombination) = args.recombination {
            parameters.recombination = recombination == 1;
        }
        if let Some(seed) = args.seed {
            parameters.seed = seed;
        }
        if let Some(max_depth) = args.max_depth {
            parameters.max_depth = max_depth;
        }
        if let Some(max_retries) = args.max_retries {
            parameters.max_retries = max_retries;
        }

        parameters.validate()?;
        Ok(parameters)
    }

    fn load_species_tree(path: &str) -> Result<TreeTable> {
        let tree = newick::read_from_file(path)?;
        log::info!(
            "Loaded species tree with {} leaves and height {}",
            tree.leaves().count(),
            tree.root_height()
        );
        log::debug!("Species tree: {}", newick::write(&tree));
        Ok(tree)
    }
}

use clap::Parser;

#[derive(Parser, Debug)]
#[clap(
    author,
    version,
    about = "Simulate gene trees under coalescence, duplication, transfer and loss",
    long_about = None,
    name = "hidtl",
)]
pub struct Args {
    /// Path to the species tree (newick).
    #[clap(short, long)]
    pub input: String,

    /// Path to the simulated gene tree (newick).
    #[clap(short, long)]
    pub output: String,

    /// Path to simulation parameters (yaml). Flags below take precedence.
    #[clap(long)]
    pub settings: Option<String>,

    /// Distribution of population sizes, as `shape=<k>,scale=<θ>` or `const=<value>`.
    #[clap(short, long)]
    pub coalescent: Option<String>,

    /// Distribution of duplication rates, as `shape=<k>,scale=<θ>` or `const=<value>`.
    #[clap(short, long)]
    pub duplication: Option<String>,

    /// Distribution of transfer rates, as `shape=<k>,scale=<θ>` or `const=<value>`.
    #[clap(short, long)]
    pub transfer: Option<String>,

    /// Distribution of loss rates, as `shape=<k>,scale=<θ>` or `const=<value>`.
    #[clap(short, long)]
    pub loss: Option<String>,

    /// Allow incomplete lineage sorting in sub-simulations (0 or 1).
    #[clap(long, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub hemiplasy: Option<u8>,

    /// Coalesce duplications on the full species subtree (0 or 1).
    #[clap(short, long, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub recombination: Option<u8>,

    /// Seed of the random number generator.
    #[clap(long)]
    pub seed: Option<u64>,

    /// Maximum nesting of sub-simulations.
    #[clap(long)]
    pub max_depth: Option<usize>,

    /// Maximum attempts of bounded coalescence.
    #[clap(long)]
    pub max_retries: Option<usize>,

    /// Path to the event table (csv).
    #[clap(long)]
    pub events: Option<String>,

    /// Path to the log file. Logs to stderr if omitted.
    #[clap(long)]
    pub log_file: Option<String>,

    /// Increase logging verbosity.
    #[clap(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

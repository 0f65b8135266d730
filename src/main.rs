use clap::Parser;

use hidtl::args::Args;
use hidtl::runner::Runner;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut runner = Runner::new(args)?;
    runner.start()
}

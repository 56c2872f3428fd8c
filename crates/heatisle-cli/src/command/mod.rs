use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;
use simple_logger::SimpleLogger;

use self::{aggregate::AggregateArg, keys::KeysArg, predict::PredictArg, train::TrainArg};

mod aggregate;
mod keys;
mod predict;
mod train;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Log more details (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// What mode to run the program in
    #[command(subcommand)]
    mode: Mode,
}

impl CommandArgs {
    fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Error;
        }
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Compute hexagon features around weather stations
    Aggregate(#[clap(flatten)] AggregateArg),
    /// Train and select a temperature model from a hexagon feature table
    Train(#[clap(flatten)] TrainArg),
    /// Predict the temperature at a location with a trained model
    Predict(#[clap(flatten)] PredictArg),
    /// Print the feature keys of a feature set in model input order
    Keys(#[clap(flatten)] KeysArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    SimpleLogger::new().with_level(args.log_level()).init()?;

    match &args.mode {
        Mode::Aggregate(arg) => aggregate::run(arg)?,
        Mode::Train(arg) => train::run(arg)?,
        Mode::Predict(arg) => predict::run(arg)?,
        Mode::Keys(arg) => keys::run(arg),
    }
    Ok(())
}

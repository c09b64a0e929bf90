//! Command line parsing and [`CheckConfig`] construction.

use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use log::LevelFilter;

/// Description of the descriptor list to check and how much to log while doing so.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct CheckConfig {
    /// The path to the descriptor list.
    pub descriptors: PathBuf,
    /// The number of times `--verbose` was passed.
    pub verbosity: u8,
}

impl CheckConfig {
    /// Returns the default [`LevelFilter`] implied by [`CheckConfig::verbosity`].
    pub fn level_filter(&self) -> LevelFilter {
        match self.verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

/// Parses `memmap-check`'s arguments to construct a [`CheckConfig`].
pub fn get_config() -> CheckConfig {
    parse_arguments(&command_parser().get_matches())
}

/// Parses the arguments required to produce a valid [`CheckConfig`].
fn parse_arguments(matches: &ArgMatches) -> CheckConfig {
    let descriptors = matches
        .get_one::<PathBuf>("descriptors")
        .cloned()
        .unwrap_or_else(|| unreachable!("`descriptors` is a required argument"));
    let verbosity = matches.get_count("verbose");

    CheckConfig {
        descriptors,
        verbosity,
    }
}

/// Returns the command parser for `memmap-check`.
fn command_parser() -> Command {
    let descriptors = Arg::new("descriptors")
        .help("Path to the descriptor list")
        .value_parser(value_parser!(PathBuf))
        .env("MEMMAP_DESCRIPTORS")
        .required(true);
    let verbose = Arg::new("verbose")
        .help("Increase logging verbosity (repeatable)")
        .short('v')
        .long("verbose")
        .action(ArgAction::Count);

    Command::new("memmap-check")
        .about("Normalizes a list of memory descriptors and prints the resolved address decoder")
        .arg(descriptors)
        .arg(verbose)
}

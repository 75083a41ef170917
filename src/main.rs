//! # Bramble
//!
//! Tokenize a file with a pattern-based grammar, and print the resulting tokens.
//!
//! Usage:
//!   bramble `<grammar>` `<input>` [--format tokens|json|outline] [--config `<file>`]
//!           [--merge-unmatched] [--leave-open] [--step-limit `<n>`]

mod config;
mod output;

use std::{process::exit, sync::Arc};

use bramble::{Buffer, Lang};
use bramble_grammar::UnterminatedPolicy;
use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::config::{Config, Format};

/// The entry point of Bramble.
fn main() {
    let matches = Command::new("bramble")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Tokenize text according to a pattern-based grammar")
        .arg_required_else_help(true)
        .arg(
            Arg::new("grammar")
                .help("Path to the language file (`.toml`) or grammar (`.json`)")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("input")
                .help("Path to the file to tokenize")
                .required(true)
                .index(2),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .short('f')
                .help("Output format: tokens, json or outline"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Path to a TOML config file"),
        )
        .arg(
            Arg::new("merge-unmatched")
                .long("merge-unmatched")
                .help("Merge runs of unmatched characters into single tokens")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("leave-open")
                .long("leave-open")
                .help("Report unterminated regions instead of closing them at the end of input")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("step-limit")
                .long("step-limit")
                .help("Give up after this many tokenizer steps")
                .value_parser(clap::value_parser!(usize)),
        )
        .get_matches();

    let config = match matches.get_one::<String>("config") {
        Some(path) => Config::load_file(path).unwrap_or_else(|e| fail(e)),
        None => Config::default(),
    };

    // Initialise the logging, preferring `RUST_LOG` over the config file
    let mut logger = pretty_env_logger::formatted_builder();
    logger.filter_level(log::LevelFilter::Warn);
    if let Some(filters) = &config.log {
        logger.parse_filters(filters);
    }
    if let Ok(filters) = std::env::var("RUST_LOG") {
        logger.parse_filters(&filters);
    }
    logger.init();

    if let Err(e) = run(&matches, config) {
        fail(e);
    }
}

fn run(matches: &ArgMatches, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let format = match matches.get_one::<String>("format") {
        Some(s) => s.parse::<Format>()?,
        None => config.format,
    };

    let grammar_path = matches
        .get_one::<String>("grammar")
        .ok_or("No grammar given")?;
    let mut lang = Lang::load_file(grammar_path)?;

    let tokenizer = lang.tokenizer_config_mut();
    if let Some(tokenizer_config) = config.tokenizer {
        *tokenizer = tokenizer_config;
    }
    if matches.get_flag("merge-unmatched") {
        tokenizer.merge_unmatched = true;
    }
    if matches.get_flag("leave-open") {
        tokenizer.unterminated = UnterminatedPolicy::LeaveOpen;
    }
    if let Some(&limit) = matches.get_one::<usize>("step-limit") {
        tokenizer.step_limit = Some(limit);
    }
    log::debug!("Tokenizer config: {:?}", tokenizer);

    let input_path = matches.get_one::<String>("input").ok_or("No input given")?;
    let buffer = Buffer::load_file(input_path, Arc::new(lang))?;
    print!("{}", output::render(&buffer, format));
    Ok(())
}

fn fail(e: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", e);
    exit(1);
}

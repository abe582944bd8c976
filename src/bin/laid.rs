//! Command-line entry point.
//!
//! Examples:
//! - Single rank:
//!   `laid -f dataset.ldc -d train`
//! - Eight ranks with per-round output:
//!   `laid -f dataset.ldc -d train -p 8 -v 2`

use std::process::ExitCode;

use laid::{execute, RunConfigBuilder, Verbosity};

const USAGE: &str = "\
Usage: laid -f <file> [-d <dataset>] [-p <ranks>] [-v <level>]

  -f <file>     dataset container file (required)
  -d <dataset>  dataset name within the container (default: dataset)
  -p <ranks>    number of ranks to run (default: 1)
  -v <level>    verbosity: 0 silent, 1 summary, 2 rounds (default: 1)";

fn parse_args() -> Result<laid::RunConfig, String> {
    let mut filename: Option<String> = None;
    let mut dataset: Option<String> = None;
    let mut ranks = 1usize;
    let mut verbosity = Verbosity::Summary;

    let mut args = std::env::args().skip(1);
    while let Some(flag) = args.next() {
        let mut value = |flag: &str| {
            args.next()
                .ok_or_else(|| format!("missing value for {flag}"))
        };
        match flag.as_str() {
            "-f" => filename = Some(value("-f")?),
            "-d" => dataset = Some(value("-d")?),
            "-p" => {
                ranks = value("-p")?
                    .parse()
                    .map_err(|_| "invalid rank count for -p".to_string())?;
            }
            "-v" => {
                let level: u8 = value("-v")?
                    .parse()
                    .map_err(|_| "invalid verbosity level for -v".to_string())?;
                verbosity = Verbosity::from_level(level);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
    }

    let filename = filename.ok_or_else(|| "missing required -f <file>".to_string())?;

    let mut builder = RunConfigBuilder::default();
    builder.filename(filename).ranks(ranks).verbosity(verbosity);
    if let Some(dataset) = dataset {
        builder.dataset(dataset);
    }
    builder.build().map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    let config = match parse_args() {
        Ok(config) => config,
        Err(message) => {
            eprintln!("laid: {message}");
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    };

    match execute(&config) {
        Ok(outcome) => {
            let selected = outcome.solution.len();
            println!("Solution: {}", outcome.solution);
            println!(
                "Solution has {selected} attributes: {selected} / {} = {:.4}%",
                outcome.n_attributes,
                outcome.solution.coverage_percent()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("laid: {e}");
            ExitCode::FAILURE
        }
    }
}

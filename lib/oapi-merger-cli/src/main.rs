#![allow(missing_docs)]
use std::fs;
use std::io::{self, Write};

use anyhow::{Context, Result};
use oapi_merger_core::Merger;
use tracing::level_filters::LevelFilter;
use tracing::{info, warn};

mod args;

use self::args::{CliArgs, Command, HELP};

fn main() -> Result<()> {
    let (command, remaining) = match Command::parse(pico_args::Arguments::from_env()) {
        Ok(parsed) => parsed,
        Err(err) => {
            io::stderr().lock().write_all(HELP.as_bytes())?;
            return Err(err);
        }
    };

    let args = match command {
        Command::Help => {
            io::stdout().lock().write_all(HELP.as_bytes())?;
            return Ok(());
        }
        Command::Merge(args) => args,
    };

    let level = if args.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(level)
        .init();

    if !remaining.is_empty() {
        warn!(?remaining, "Warning: unused arguments left");
    }

    run(&args)
}

fn run(args: &CliArgs) -> Result<()> {
    let merger = Merger::builder().with_output_format(args.format).build();
    let output = merger.merge_file(&args.input)?;

    match &args.output {
        Some(path) => {
            fs::write(path, output)
                .with_context(|| format!("Error writing output to '{}'", path.display()))?;
            info!(output = %path.display(), "merged document written");
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(output.as_bytes())
                .context("Error writing output")?;
            stdout.flush()?;
        }
    }
    Ok(())
}

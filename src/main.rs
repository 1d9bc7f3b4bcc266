use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use micro8_core::{Machine, Program};
use tracing_subscriber::prelude::*;

/// An educational 8-bit virtual CPU.
#[derive(Debug, Parser)]
#[command(name = "micro8", version, about)]
struct Args {
    /// Program source to run; the built-in demo program when omitted.
    program: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let stderr_format = tracing_subscriber::fmt::layer().with_writer(io::stderr);
    tracing_subscriber::registry().with(stderr_format).init();

    let program = match &args.program {
        Some(path) => Program::from_file(path)?,
        None => Program::demo(),
    };

    tracing::info!("loaded {} byte program", program.len());
    let mut machine = Machine::new(program.bytes()).context("cannot place program in memory")?;
    machine.run()?;
    Ok(())
}

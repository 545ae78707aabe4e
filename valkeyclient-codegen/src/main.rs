//! Offline command-stub generator: reads a command catalogue JSON file and
//! writes a `commands_generated.rs` module of `Command` structs bound to
//! `valkeyclient-core`'s encoder contract.
//!
//! ```text
//! valkeyclient-codegen <catalogue.json> <commands_generated.rs>
//! ```
#[macro_use]
extern crate log;

mod catalogue;
mod error;
mod generate;

use catalogue::Catalogue;
use error::{CodegenError, CodegenResult};
use std::path::PathBuf;

fn main() {
    if let Err(e) = run() {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run() -> CodegenResult<()> {
    let mut args = std::env::args_os().skip(1);
    let catalogue_path = PathBuf::from(args.next().unwrap_or_else(|| {
        eprintln!("usage: valkeyclient-codegen <catalogue.json> <commands_generated.rs>");
        std::process::exit(2);
    }));
    let output_path = PathBuf::from(args.next().unwrap_or_else(|| {
        eprintln!("usage: valkeyclient-codegen <catalogue.json> <commands_generated.rs>");
        std::process::exit(2);
    }));

    info!("reading catalogue from {}", catalogue_path.display());
    let text = std::fs::read_to_string(&catalogue_path).map_err(|source| CodegenError::Read {
        path: catalogue_path.clone(),
        source,
    })?;
    let catalogue = Catalogue::from_json(&text).map_err(|source| CodegenError::Parse {
        path: catalogue_path.clone(),
        source,
    })?;
    info!("parsed {} catalogue entries", catalogue.commands.len());

    let module = generate::generate_module(&catalogue)?;
    std::fs::write(&output_path, module).map_err(|source| CodegenError::Write {
        path: output_path.clone(),
        source,
    })?;
    info!("wrote generated module to {}", output_path.display());
    Ok(())
}

//! `st80` — load a V2 interchange snapshot and interpret it.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use st80_vm::host::HeadlessHost;
use st80_vm::image;
use st80_vm::interpreter::Interpreter;

#[derive(Parser, Debug)]
#[command(name = "st80", version, about = "Smalltalk-80 virtual machine")]
struct Args {
    /// Path to the snapshot (interchange-format `.image` file).
    image: PathBuf,

    /// Increase diagnostic tracing (repeatable).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = match args.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("st80_vm=debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let bytes = match std::fs::read(&args.image) {
        Ok(bytes) => bytes,
        Err(error) => {
            eprintln!("st80: cannot read {}: {error}", args.image.display());
            return ExitCode::from(1);
        }
    };

    let memory = match image::load(&bytes) {
        Ok(memory) => memory,
        Err(error) => {
            eprintln!("st80: cannot load {}: {error}", args.image.display());
            return ExitCode::from(1);
        }
    };

    let mut vm = Interpreter::new(memory, HeadlessHost::new());
    vm.set_image_path(args.image);

    if let Err(error) = vm.initialize().and_then(|_| vm.interpret()) {
        eprintln!("st80: fatal: {error}");
        return ExitCode::from(2);
    }
    ExitCode::SUCCESS
}

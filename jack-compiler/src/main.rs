//! Jack compiler command-line tool.
//!
//! ```bash
//! jack_compiler <input.jack | directory>
//! ```
//!
//! A single `.jack` file compiles to a sibling `.vm` with the same
//! stem; a directory compiles every `.jack` inside (sorted by name),
//! each to its own `.vm`. The first error in any unit removes that
//! unit's partial output and exits 1.

#![warn(clippy::all, clippy::pedantic)]

use std::env;
use std::error::Error;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process;

use colored::Colorize;
use jack_compiler::{CompilationEngine, CompileError};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        eprintln!("Usage: {} <input.jack | directory>", args[0]);
        process::exit(1);
    }

    if let Err(e) = run(Path::new(&args[1])) {
        eprintln!("{} {e}", "error:".red().bold());
        process::exit(1);
    }
}

fn run(input: &Path) -> Result<(), Box<dyn Error>> {
    for jack_file in collect_jack_files(input)? {
        let output = compile_file(&jack_file)?;
        println!("Compiled {} -> {}", jack_file.display(), output.display());
    }
    Ok(())
}

/// Resolves the input to the `.jack` files to compile, sorted for a
/// reproducible compile order.
fn collect_jack_files(input: &Path) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    if input.is_dir() {
        let mut jack_files: Vec<PathBuf> = fs::read_dir(input)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "jack"))
            .collect();
        jack_files.sort();

        if jack_files.is_empty() {
            return Err(format!("no .jack files in directory {}", input.display()).into());
        }
        return Ok(jack_files);
    }

    if input.is_file() && input.extension().is_some_and(|ext| ext == "jack") {
        return Ok(vec![input.to_path_buf()]);
    }

    Err(format!("not a .jack file or directory: {}", input.display()).into())
}

/// Compiles one translation unit to its sibling `.vm` file.
fn compile_file(jack_file: &Path) -> Result<PathBuf, Box<dyn Error>> {
    let source = fs::read_to_string(jack_file)?;
    let output = jack_file.with_extension("vm");
    let file = File::create(&output)?;

    let result = compile_unit(&source, file);
    match result {
        Ok(()) => Ok(output),
        Err(e) => {
            let _ = fs::remove_file(&output);
            Err(format!("{}: {e}", jack_file.display()).into())
        }
    }
}

fn compile_unit(source: &str, file: File) -> Result<(), CompileError> {
    let mut engine = CompilationEngine::new(source, BufWriter::new(file))?;
    engine.compile_class()?;
    engine.flush()
}

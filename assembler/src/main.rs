//! Hack assembler command-line tool.
//!
//! ```bash
//! assembler <input.asm> [output.hack]
//! ```
//!
//! Without an explicit output path the `.hack` file is written next to
//! the input, same stem. On any error the partial output is removed and
//! the process exits 1 with a single diagnostic line.

#![warn(clippy::all, clippy::pedantic)]

use std::env;
use std::error::Error;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use assembler::{SymbolTable, first_pass, second_pass};
use colored::Colorize;

fn main() {
    let args: Vec<String> = env::args().collect();

    if !(2..=3).contains(&args.len()) {
        eprintln!("Usage: {} <input.asm> [output.hack]", args[0]);
        process::exit(1);
    }

    match run(&args[1], args.get(2).map(String::as_str)) {
        Ok(output) => println!("Assembled {} -> {}", args[1], output.display()),
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            process::exit(1);
        }
    }
}

fn run(input: &str, explicit_output: Option<&str>) -> Result<PathBuf, Box<dyn Error>> {
    let lines = read_lines(input)?;

    let mut symbols = SymbolTable::new();
    first_pass(&lines, &mut symbols);

    let output = output_path(input, explicit_output);
    let file = File::create(&output)?;
    let mut writer = BufWriter::new(file);

    let result = second_pass(&lines, &mut symbols, &mut writer)
        .and_then(|()| writer.flush().map_err(Into::into));

    match result {
        Ok(()) => Ok(output),
        Err(e) => {
            // Never leave a truncated .hack behind
            drop(writer);
            let _ = fs::remove_file(&output);
            Err(e.into())
        }
    }
}

fn read_lines(path: &str) -> Result<Vec<String>, std::io::Error> {
    let file = File::open(path)?;
    BufReader::new(file).lines().collect()
}

fn output_path(input: &str, explicit_output: Option<&str>) -> PathBuf {
    explicit_output.map_or_else(|| Path::new(input).with_extension("hack"), PathBuf::from)
}

//! VM-to-assembly translator command-line tool.
//!
//! ```bash
//! vmtranslator <input.vm | directory>
//! ```
//!
//! A single `.vm` file translates to a sibling `.asm` with the same
//! stem. A directory translates every `.vm` inside (sorted by name)
//! into one combined `<dir>/<dir>.asm`; the bootstrap that sets
//! `SP = 256` and calls `Sys.init` is emitted only in directory mode
//! and only when `Sys.vm` is present. On any error the partial output
//! is removed and the process exits 1.

#![warn(clippy::all, clippy::pedantic)]

mod code_writer;
mod parser;

use std::env;
use std::error::Error;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process;

use colored::Colorize;

use code_writer::CodeWriter;
use parser::{CommandType, Parser};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        eprintln!("Usage: {} <input.vm | directory>", args[0]);
        process::exit(1);
    }

    match run(Path::new(&args[1])) {
        Ok(output) => println!("Translated {} -> {}", args[1], output.display()),
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            process::exit(1);
        }
    }
}

fn run(input: &Path) -> Result<PathBuf, Box<dyn Error>> {
    let (vm_files, output) = collect_vm_files(input)?;
    let bootstrap = input.is_dir()
        && vm_files
            .iter()
            .any(|f| f.file_name().is_some_and(|n| n == "Sys.vm"));

    let file = File::create(&output)?;
    let mut writer = CodeWriter::new(BufWriter::new(file));

    let result = translate_all(&mut writer, &vm_files, bootstrap);
    match result {
        Ok(()) => Ok(output),
        Err(e) => {
            drop(writer);
            let _ = fs::remove_file(&output);
            Err(e)
        }
    }
}

fn translate_all(
    writer: &mut CodeWriter<BufWriter<File>>,
    vm_files: &[PathBuf],
    bootstrap: bool,
) -> Result<(), Box<dyn Error>> {
    if bootstrap {
        writer.write_bootstrap()?;
    }
    for vm_file in vm_files {
        translate_file(writer, vm_file)?;
    }
    writer.write_epilogue()?;
    writer.flush()?;
    Ok(())
}

/// Resolves the input to the list of `.vm` files and the output path.
///
/// Directory inputs are iterated in sorted order so the combined output
/// is reproducible across filesystems.
fn collect_vm_files(input: &Path) -> Result<(Vec<PathBuf>, PathBuf), Box<dyn Error>> {
    if input.is_dir() {
        let mut vm_files: Vec<PathBuf> = fs::read_dir(input)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "vm"))
            .collect();
        vm_files.sort();

        if vm_files.is_empty() {
            return Err(format!("no .vm files in directory {}", input.display()).into());
        }

        let dir_name = input
            .file_name()
            .ok_or_else(|| format!("cannot derive output name from {}", input.display()))?;
        let output = input.join(dir_name).with_extension("asm");
        return Ok((vm_files, output));
    }

    if input.is_file() && input.extension().is_some_and(|ext| ext == "vm") {
        let output = input.with_extension("asm");
        return Ok((vec![input.to_path_buf()], output));
    }

    Err(format!("not a .vm file or directory: {}", input.display()).into())
}

fn translate_file(
    writer: &mut CodeWriter<BufWriter<File>>,
    vm_file: &Path,
) -> Result<(), Box<dyn Error>> {
    writer.set_input_file(vm_file);

    let mut parser = Parser::new(vm_file)?;
    while parser.has_more_commands() {
        parser.advance();
        writer.write_comment(parser.current_command())?;

        match parser.command_type()? {
            CommandType::Arithmetic => writer.write_arithmetic(parser.arg1()?)?,
            CommandType::Push => writer.write_push(parser.arg1()?, parser.arg2()?)?,
            CommandType::Pop => writer.write_pop(parser.arg1()?, parser.arg2()?)?,
            CommandType::Label => writer.write_label(parser.arg1()?)?,
            CommandType::Goto => writer.write_goto(parser.arg1()?)?,
            CommandType::If => writer.write_if(parser.arg1()?)?,
            CommandType::Function => writer.write_function(parser.arg1()?, parser.arg2()?)?,
            CommandType::Call => writer.write_call(parser.arg1()?, parser.arg2()?)?,
            CommandType::Return => writer.write_return()?,
        }
    }
    Ok(())
}

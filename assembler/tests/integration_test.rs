//! End-to-end tests driving the `assembler` binary against fixture
//! files in a scratch directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Creates a unique scratch directory for one test.
fn scratch_dir(test_name: &str) -> PathBuf {
    let dir = std::env::temp_dir()
        .join("assembler-tests")
        .join(format!("{}-{}", test_name, std::process::id()));
    if dir.exists() {
        fs::remove_dir_all(&dir).expect("failed to clear scratch dir");
    }
    fs::create_dir_all(&dir).expect("failed to create scratch dir");
    dir
}

fn run_assembler(input: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_assembler"))
        .arg(input)
        .output()
        .expect("failed to spawn assembler")
}

fn assemble_source(test_name: &str, source: &str) -> Vec<String> {
    let dir = scratch_dir(test_name);
    let asm = dir.join("Prog.asm");
    fs::write(&asm, source).unwrap();

    let output = run_assembler(&asm);
    assert!(
        output.status.success(),
        "assembler failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let hack = fs::read_to_string(dir.join("Prog.hack")).expect("missing .hack output");
    hack.lines().map(ToString::to_string).collect()
}

/// Abridged Max.asm from the machine-language project: label symbols
/// must bind to 10, 12 and 14, yielding 16 words of code.
#[test]
fn max_program_binds_labels() {
    let source = "\
@R0
D=M
@R1
D=D-M
@OUTPUT_FIRST
D;JGT
@R1
D=M
@OUTPUT_D
0;JMP
(OUTPUT_FIRST)
@R0
D=M
(OUTPUT_D)
@R2
M=D
(END)
@END
0;JMP
";
    let words = assemble_source("max_program", source);

    assert_eq!(words.len(), 16);
    // @OUTPUT_FIRST resolves to 10, @OUTPUT_D to 12, @END to 14
    assert_eq!(words[4], "0000000000001010");
    assert_eq!(words[8], "0000000000001100");
    assert_eq!(words[14], "0000000000001110");
    // Spot-check a C-instruction: D=D-M
    assert_eq!(words[3], "1111010011010000");
}

/// Fresh variables get RAM slots 16, 17, ... in first-mention order.
#[test]
fn variables_allocate_from_16() {
    let words = assemble_source("variables", "@sum\nM=0\n@i\nM=1\n");

    assert_eq!(words[0], "0000000000010000"); // sum = 16
    assert_eq!(words[2], "0000000000010001"); // i = 17
}

#[test]
fn comments_and_whitespace_are_ignored() {
    let source = "// header comment\n\n   @5   // inline\n\tD=A\n";
    let words = assemble_source("comments", source);

    assert_eq!(words, ["0000000000000101", "1110110000010000"]);
}

#[test]
fn reruns_are_byte_identical() {
    let dir = scratch_dir("idempotent");
    let asm = dir.join("Loop.asm");
    fs::write(&asm, "(LOOP)\n@LOOP\n@counter\nM=M+1\n0;JMP\n").unwrap();

    assert!(run_assembler(&asm).status.success());
    let first = fs::read(dir.join("Loop.hack")).unwrap();
    assert!(run_assembler(&asm).status.success());
    let second = fs::read(dir.join("Loop.hack")).unwrap();

    assert_eq!(first, second);
}

#[test]
fn unknown_mnemonic_fails_and_removes_output() {
    let dir = scratch_dir("bad_mnemonic");
    let asm = dir.join("Bad.asm");
    fs::write(&asm, "@1\nD=A\nD=D*2\n").unwrap();

    let output = run_assembler(&asm);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown comp mnemonic"), "stderr: {stderr}");
    assert!(
        !dir.join("Bad.hack").exists(),
        "partial output must be removed on failure"
    );
}

#[test]
fn oversized_literal_fails() {
    let dir = scratch_dir("oversized_literal");
    let asm = dir.join("Big.asm");
    fs::write(&asm, "@32768\n").unwrap();

    let output = run_assembler(&asm);

    assert!(!output.status.success());
    assert!(!dir.join("Big.hack").exists());
}

#[test]
fn missing_input_fails() {
    let output = run_assembler(Path::new("does-not-exist.asm"));
    assert!(!output.status.success());
}

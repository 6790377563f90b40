//! End-to-end tests driving the `vmtranslator` binary.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn scratch_dir(test_name: &str) -> PathBuf {
    let dir = std::env::temp_dir()
        .join("vmtranslator-tests")
        .join(format!("{}-{}", test_name, std::process::id()));
    if dir.exists() {
        fs::remove_dir_all(&dir).expect("failed to clear scratch dir");
    }
    fs::create_dir_all(&dir).expect("failed to create scratch dir");
    dir
}

fn run_translator(input: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_vmtranslator"))
        .arg(input)
        .output()
        .expect("failed to spawn vmtranslator")
}

fn translate(dir: &Path, file_name: &str, source: &str) -> String {
    let vm = dir.join(file_name);
    fs::write(&vm, source).unwrap();

    let output = run_translator(&vm);
    assert!(
        output.status.success(),
        "translator failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    fs::read_to_string(vm.with_extension("asm")).expect("missing .asm output")
}

#[test]
fn simple_add_emits_stack_arithmetic() {
    let dir = scratch_dir("simple_add");
    let asm = translate(&dir, "SimpleAdd.vm", "push constant 7\npush constant 8\nadd\n");

    // Each command is echoed as a comment above its translation
    assert!(asm.contains("// push constant 7"));
    assert!(asm.contains("// add"));
    // Both constants pushed through D
    assert!(asm.contains("@7\nD=A\n@SP\nA=M\nM=D\n@SP\nM=M+1"));
    assert!(asm.contains("@8\nD=A"));
    // add folds the popped value into the new stack top
    assert!(asm.contains("@SP\nAM=M-1\nD=M\nA=A-1\nM=D+M"));
    // No bootstrap in single-file mode
    assert!(!asm.starts_with("@256"));
    // Spin-loop epilogue
    assert!(asm.trim_end().ends_with("(END)\n@END\n0;JMP"));
}

#[test]
fn static_symbols_use_the_source_file_stem() {
    let dir = scratch_dir("static_naming");
    let asm = translate(&dir, "Widget.vm", "push constant 1\npop static 3\npush static 3\n");

    assert!(asm.contains("@Widget.3\nM=D"));
    assert!(asm.contains("@Widget.3\nD=M"));
}

#[test]
fn labels_scope_to_the_enclosing_function() {
    let dir = scratch_dir("label_scope");
    let source = "\
function Counter.run 1
label LOOP
push local 0
if-goto LOOP
goto DONE
label DONE
return
";
    let asm = translate(&dir, "Counter.vm", source);

    assert!(asm.contains("(Counter.run)"));
    assert!(asm.contains("(Counter.run$LOOP)"));
    assert!(asm.contains("@Counter.run$LOOP\nD;JNE"));
    assert!(asm.contains("@Counter.run$DONE\n0;JMP"));
}

#[test]
fn call_builds_the_callee_frame() {
    let dir = scratch_dir("call_frame");
    let source = "\
function Main.main 0
push constant 3
call Memory.alloc 1
pop local 0
return
";
    let asm = translate(&dir, "Main.vm", source);

    // Saved pointers and the ARG = SP-5-nArgs computation
    assert!(asm.contains("@Memory.alloc$ret.0\nD=A"));
    assert!(asm.contains("@5\nD=D-A\n@1\nD=D-A\n@ARG\nM=D"));
    assert!(asm.contains("@Memory.alloc\n0;JMP\n(Memory.alloc$ret.0)"));
}

#[test]
fn comparison_labels_are_unique_per_unit() {
    let dir = scratch_dir("comparison_labels");
    let asm = translate(&dir, "Cmp.vm", "push constant 1\npush constant 2\nlt\npush constant 3\npush constant 4\ngt\n");

    assert!(asm.contains("(COMP_TRUE_0)"));
    assert!(asm.contains("(COMP_END_0)"));
    assert!(asm.contains("(COMP_TRUE_1)"));
    assert!(asm.contains("(COMP_END_1)"));
    assert!(asm.contains("D;JLT"));
    assert!(asm.contains("D;JGT"));
}

#[test]
fn directory_mode_combines_sorted_files_and_bootstraps() {
    let dir = scratch_dir("directory_mode");
    let program = dir.join("Prog");
    fs::create_dir(&program).unwrap();
    fs::write(program.join("Sys.vm"), "function Sys.init 0\ncall Main.main 0\nlabel HALT\ngoto HALT\n").unwrap();
    fs::write(program.join("Main.vm"), "function Main.main 0\npush constant 1\nreturn\n").unwrap();

    let output = run_translator(&program);
    assert!(
        output.status.success(),
        "translator failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let asm = fs::read_to_string(program.join("Prog.asm")).unwrap();
    // Bootstrap first: SP = 256, then call Sys.init
    assert!(asm.starts_with("@256\nD=A\n@SP\nM=D\n@Sys.init$ret.0"));
    // Sorted order: Main.vm translated before Sys.vm
    let main_pos = asm.find("(Main.main)").unwrap();
    let sys_pos = asm.find("(Sys.init)").unwrap();
    assert!(main_pos < sys_pos);
}

#[test]
fn single_file_sys_vm_does_not_bootstrap() {
    let dir = scratch_dir("no_bootstrap");
    let asm = translate(&dir, "Sys.vm", "function Sys.init 0\nlabel HALT\ngoto HALT\n");

    assert!(asm.starts_with("// function Sys.init 0"));
}

#[test]
fn reruns_are_byte_identical() {
    let dir = scratch_dir("idempotent");
    let vm = dir.join("Loop.vm");
    fs::write(&vm, "push constant 0\npush constant 1\neq\npush constant 2\npush constant 2\neq\n").unwrap();

    assert!(run_translator(&vm).status.success());
    let first = fs::read(vm.with_extension("asm")).unwrap();
    assert!(run_translator(&vm).status.success());
    let second = fs::read(vm.with_extension("asm")).unwrap();

    assert_eq!(first, second);
}

#[test]
fn pop_constant_fails_and_removes_output() {
    let dir = scratch_dir("pop_constant");
    let vm = dir.join("Bad.vm");
    fs::write(&vm, "push constant 1\npop constant 0\n").unwrap();

    let output = run_translator(&vm);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("constant"), "stderr: {stderr}");
    assert!(!vm.with_extension("asm").exists());
}

#[test]
fn unknown_command_fails() {
    let dir = scratch_dir("unknown_command");
    let vm = dir.join("Bad.vm");
    fs::write(&vm, "shove constant 1\n").unwrap();

    let output = run_translator(&vm);
    assert!(!output.status.success());
    assert!(!vm.with_extension("asm").exists());
}

#[test]
fn empty_directory_fails() {
    let dir = scratch_dir("empty_directory");
    let program = dir.join("Empty");
    fs::create_dir(&program).unwrap();

    let output = run_translator(&program);
    assert!(!output.status.success());
}

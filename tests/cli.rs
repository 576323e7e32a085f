use std::{
    env,
    io::Write,
    path::PathBuf,
    process::{Command, Output, Stdio},
};

fn bin_path() -> &'static str {
    env!("CARGO_BIN_EXE_blc")
}

fn program(name: &str) -> PathBuf {
    let mut path =
        PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("manifest dir not set by cargo"));
    path.push("tests");
    path.push("programs");
    path.push(name);
    path
}

fn run_with_stdin(args: &[&str], input: &str) -> Output {
    let mut child = Command::new(bin_path())
        .args(args)
        .env("BLC_LOG", "off")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to run blc");
    child
        .stdin
        .as_mut()
        .expect("child stdin missing")
        .write_all(input.as_bytes())
        .expect("failed to write stdin");
    child.wait_with_output().expect("failed to read blc output")
}

#[test]
fn interprets_file_and_surfaces_results() {
    let output = Command::new(bin_path())
        .arg(program("counter.bl"))
        .env("BLC_LOG", "off")
        .output()
        .expect("failed to run blc");
    assert!(
        output.status.success(),
        "blc failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec!["=> 0", "=> 1", "=> 2", "=> 3", "=> 9", "=> 4", "=> 10", "=> 11"]
    );
}

#[test]
fn reads_stdin_and_runs_jit() {
    let output = run_with_stdin(&["--jit"], "a = 6; a * 7;");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("=> 42"), "{stdout}");
    assert!(stdout.contains("jit => 42"), "{stdout}");
}

#[test]
fn no_interpret_with_llvm_prints_only_ir() {
    let output = run_with_stdin(&["--no-interpret", "--llvm"], "x = 1 + 2;");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("=> "), "{stdout}");
    assert!(stdout.contains("define double @__input-0()"), "{stdout}");
}

#[test]
fn tree_flag_dumps_json() {
    let output = run_with_stdin(&["--no-interpret", "--tree"], "fn id(v) { v; }");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"type\": \"FunctionDef\""), "{stdout}");
    assert!(stdout.contains("\"params\": ["), "{stdout}");
}

#[test]
fn syntax_errors_fail_with_rendered_report() {
    let output = run_with_stdin(&[], "x = (1 + ;");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("<stdin>"), "{stderr}");
    assert!(stderr.contains("syntax error"), "{stderr}");
}

#[test]
fn step_limit_reports_runaway_loop() {
    let output = run_with_stdin(&["--step-limit", "100"], "while (1) { }");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Step limit of 100 exceeded"), "{stderr}");
}

#[test]
fn interactive_mode_keeps_going_after_a_bad_line() {
    let output = run_with_stdin(
        &["--interactive"],
        "x = 2;\nx = (;\nwhile (x < 4) {\n  x = x + 1;\n}\nx * 10;\n",
    );
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines, vec!["=> 2", "=> 3", "=> 4", "=> 40"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("<stdin>:2"), "{stderr}");
}

#[test]
fn emit_ir_writes_a_file() {
    let path = env::temp_dir().join(format!("blc-cli-{}.ll", std::process::id()));
    let output = run_with_stdin(
        &["--no-interpret", "--emit-ir", path.to_str().expect("utf8 temp path")],
        "n = 5; n + 1;",
    );
    assert!(output.status.success());
    let text = std::fs::read_to_string(&path).expect("IR file written");
    std::fs::remove_file(&path).ok();
    assert!(text.contains("define double @__input-1()"), "{text}");
}

use std::io::Write;
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::Duration;

fn pypi_avail() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_pypi-avail"));
    command.env_remove("CLICOLOR_FORCE").env_remove("RUST_LOG");
    command
}

fn run_with_stdin(mut command: Command, input: &[u8]) -> Output {
    command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .and_then(|mut child| {
            if let Some(ref mut stdin) = child.stdin {
                stdin.write_all(input).ok();
            }
            child.wait_with_output()
        })
        .expect("failed to execute")
}

#[test]
fn no_args_exits_with_code_2() {
    let output = pypi_avail().output().expect("failed to execute");
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("no package names provided"),
        "stderr: {stderr}"
    );
}

#[test]
fn invalid_name_exits_with_code_1() {
    let output = pypi_avail()
        .arg("foo+bar")
        .output()
        .expect("failed to execute");
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("invalid"), "stdout: {stdout}");
    assert!(
        stdout.contains("can only contain letters, numbers, hyphens, underscores, and periods"),
        "stdout: {stdout}"
    );
}

#[test]
fn leading_separator_reports_start_end_rule() {
    let output = pypi_avail()
        .args(["--", "-foo"])
        .output()
        .expect("failed to execute");
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("-foo\tinvalid: Package name must start and end with a letter or number"),
        "stdout: {stdout}"
    );
}

#[test]
fn quiet_flag_suppresses_stdout() {
    let output = pypi_avail()
        .args(["--quiet", "bad name"])
        .output()
        .expect("failed to execute");
    assert_eq!(output.status.code(), Some(1));
    assert!(
        output.stdout.is_empty(),
        "stdout should be empty in quiet mode"
    );
}

#[test]
fn available_only_hides_other_names() {
    let output = pypi_avail()
        .args(["--available-only", "bad name"])
        .output()
        .expect("failed to execute");
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
}

#[test]
fn tab_separated_output_format() {
    let output = pypi_avail()
        .arg("bad!")
        .output()
        .expect("failed to execute");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains('\t'),
        "output should be tab-separated: {stdout}"
    );
}

#[test]
fn multiple_names_all_checked() {
    let output = pypi_avail()
        .args(["foo+bar", "trail_", ".dot"])
        .output()
        .expect("failed to execute");
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 3, "stdout: {stdout}");
    for name in ["foo+bar", "trail_", ".dot"] {
        assert!(stdout.contains(name), "should contain {name}: {stdout}");
    }
}

#[test]
fn stdin_piping() {
    let output = run_with_stdin(pypi_avail(), b"bad name\nworse!name\n\n");
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("bad name\tinvalid"),
        "stdin: should contain bad name: {stdout}"
    );
    assert!(
        stdout.contains("worse!name\tinvalid"),
        "stdin: should contain worse!name: {stdout}"
    );
}

#[test]
fn deduplicates_repeated_names() {
    let output = pypi_avail()
        .args(["bad name", "bad name", " bad name "])
        .output()
        .expect("failed to execute");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 1, "should deduplicate: {stdout}");
}

#[test]
#[ignore] // requires network access
fn deduplicates_canonical_names() {
    let output = pypi_avail()
        .args(["Foo_Bar", "foo-bar", "foo.bar"])
        .output()
        .expect("failed to execute");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let foo_lines: Vec<&str> = stdout
        .lines()
        .filter(|l| l.to_lowercase().starts_with("foo"))
        .collect();
    assert_eq!(foo_lines.len(), 1, "should deduplicate: {stdout}");
}

#[test]
fn json_requires_watch() {
    let output = pypi_avail()
        .args(["--json", "requests"])
        .output()
        .expect("failed to execute");
    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--json requires --watch"), "stderr: {stderr}");
}

#[test]
fn watch_repeats_message_after_input_is_cleared() {
    let mut command = pypi_avail();
    command
        .args(["--watch", "--color", "never", "--debounce-ms", "10"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = command.spawn().expect("failed to execute");
    let mut stdin = child.stdin.take().expect("stdin is piped");
    for line in ["bad name\n", "\n", "bad name\n"] {
        stdin.write_all(line.as_bytes()).unwrap();
        stdin.flush().unwrap();
        thread::sleep(Duration::from_millis(300));
    }
    drop(stdin);

    let output = child.wait_with_output().expect("failed to execute");
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let expected =
        "Package name can only contain letters, numbers, hyphens, underscores, and periods";
    assert_eq!(stdout.lines().collect::<Vec<_>>(), [expected, expected]);
}

#[test]
fn watch_reports_invalid_input_without_network() {
    let mut command = pypi_avail();
    command.args(["--watch", "--color", "never", "--debounce-ms", "10"]);
    let output = run_with_stdin(command, b"my package\n");
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim_end(),
        "Package name can only contain letters, numbers, hyphens, underscores, and periods"
    );
}

#[test]
fn watch_json_reports_final_state() {
    let mut command = pypi_avail();
    command.args(["--watch", "--json", "--debounce-ms", "10"]);
    let output = run_with_stdin(command, b"   \n-bad\n");
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let last: serde_json::Value =
        serde_json::from_str(stdout.lines().last().expect("no output")).unwrap();
    assert_eq!(last["phase"], "invalid");
    assert_eq!(last["raw_input"], "-bad");
    assert_eq!(
        last["message"],
        "Package name must start and end with a letter or number"
    );
    assert_eq!(last["resolved_name"], "");
}

#[test]
fn watch_with_only_blank_input_prints_nothing() {
    let mut command = pypi_avail();
    command.arg("--watch");
    let output = run_with_stdin(command, b"  \n\n");
    assert_eq!(output.status.code(), Some(0));
    assert!(output.stdout.is_empty());
}

#[test]
fn cycle_color_persists_preference() {
    let dir = tempfile::tempdir().unwrap();
    let prefs = dir.path().join("prefs.json");

    let mut seen = Vec::new();
    for _ in 0..3 {
        let output = pypi_avail()
            .arg("--cycle-color")
            .arg("--prefs")
            .arg(&prefs)
            .output()
            .expect("failed to execute");
        assert_eq!(output.status.code(), Some(0));
        seen.push(String::from_utf8_lossy(&output.stdout).trim().to_string());
    }

    assert_eq!(seen, ["always", "never", "auto"]);
    let stored = std::fs::read_to_string(&prefs).unwrap();
    assert!(stored.contains("\"pypi-avail.color\""), "{stored}");
}

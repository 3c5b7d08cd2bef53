use std::path::PathBuf;
use std::process::Command;

fn sheet_fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("aldric.json")
}

fn run_cli(args: &[&str]) -> (bool, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_cs-cli"))
        .args(args)
        .output()
        .expect("cli should execute");
    (
        output.status.success(),
        String::from_utf8_lossy(&output.stdout).to_string(),
    )
}

#[test]
fn resolves_scripts_against_a_sheet() {
    let sheet = sheet_fixture();
    let sheet = sheet.to_string_lossy();
    let (ok, stdout) = run_cli(&["--sheet", &sheet, "number", "$st * 2"]);
    assert!(ok, "stdout:\n{}", stdout);
    assert!(stdout.contains("RESULT:OK"));
    assert!(stdout.contains("VALUE_JSON:24.0"), "stdout:\n{}", stdout);

    let (ok, stdout) = run_cli(&["--sheet", &sheet, "text", "Hi <script>entity.name</script>"]);
    assert!(ok);
    assert!(stdout.contains("VALUE_JSON:\"Hi Aldric\""), "stdout:\n{}", stdout);
}

#[test]
fn script_failures_come_back_as_diagnostics() {
    let (ok, stdout) = run_cli(&["--timeout", "0.01", "script", "let x = 0; loop { x += 1; }"]);
    assert!(ok);
    assert!(
        stdout.contains("VALUE_JSON:\"script execution timed out (limited to 0.01 seconds)\""),
        "stdout:\n{}",
        stdout
    );
}

#[test]
fn unreadable_sheet_reports_an_error_code() {
    let (ok, stdout) = run_cli(&["--sheet", "/definitely/not/here.json", "script", "1"]);
    assert!(!ok);
    assert!(stdout.contains("RESULT:ERROR"));
    assert!(stdout.contains("ERROR_CODE:CLI_SHEET_READ"));
    assert!(stdout.contains("ERROR_MSG_JSON:"));
}

use super::*;

use std::path::PathBuf;

fn fixture(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
        .to_string_lossy()
        .to_string()
}

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("cs-cli").chain(args.iter().copied()))
        .expect("arguments should parse")
}

#[test]
fn global_flags_parse_around_the_subcommand() {
    let cli = parse(&["number", "--seed", "3", "1 + 2", "--timeout", "0.2"]);
    assert_eq!(cli.seed, Some(3));
    assert_eq!(cli.timeout, Some(0.2));
    assert!(matches!(cli.command, Mode::Number(ref args) if args.text == "1 + 2"));
}

#[test]
fn scripts_run_without_a_sheet() {
    let value = run(parse(&["script", "40 + 2"])).expect("script should resolve");
    assert_eq!(value, Value::from("42"));
    let value = run(parse(&["number", "if entity.exists { 1 } else { 2 }"])).expect("number should resolve");
    assert_eq!(value, Value::from(2.0));
}

#[test]
fn sheet_values_feed_number_and_weight_modes() {
    let sheet = fixture("aldric.json");
    let value = run(parse(&["--sheet", &sheet, "number", "$st * 2"])).expect("number");
    assert_eq!(value, Value::from(24.0));
    let value = run(parse(&["--sheet", &sheet, "weight", "$st * 2"])).expect("weight");
    assert_eq!(value, Value::from(24.0));
    let value = run(parse(&[
        "--sheet",
        &sheet,
        "script",
        "entity.weaponDamage(\"Broadsword\", \"Swung\")",
    ]))
    .expect("script");
    assert_eq!(value, Value::from("2d+1 cut"));
}

#[test]
fn self_id_binds_the_matching_node() {
    let sheet = fixture("aldric.json");
    let value = run(parse(&["--sheet", &sheet, "--self-id", "armor", "number", "self.value"]))
        .expect("self value");
    assert_eq!(value, Value::from(100.0));
    let value = run(parse(&[
        "--sheet",
        &sheet,
        "--self-id",
        "striking",
        "text",
        "Level <script>self.levels</script>",
    ]))
    .expect("self text");
    assert_eq!(value, Value::from("Level 2"));
}

#[test]
fn input_problems_map_to_cli_error_codes() {
    let missing = run(parse(&["--sheet", "/definitely/not/here.json", "script", "1"]))
        .expect_err("missing sheet should fail");
    assert_eq!(missing.code, "CLI_SHEET_READ");

    let invalid_path = std::env::temp_dir().join(format!("cs-cli-invalid-{}.json", std::process::id()));
    fs::write(&invalid_path, "{ nope").expect("fixture should be written");
    let invalid = run(parse(&["--sheet", invalid_path.to_string_lossy().as_ref(), "script", "1"]))
        .expect_err("invalid sheet should fail");
    assert_eq!(invalid.code, "CLI_SHEET_INVALID");

    let unknown = run(parse(&["--sheet", &fixture("aldric.json"), "--self-id", "ghost", "script", "1"]))
        .expect_err("unknown self should fail");
    assert_eq!(unknown.code, "CLI_SELF_NOT_FOUND");

    let orphan = run(parse(&["--self-id", "st", "script", "1"])).expect_err("self needs a sheet");
    assert_eq!(orphan.code, "CLI_SELF_WITHOUT_SHEET");
}

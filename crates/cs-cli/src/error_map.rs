use std::fmt::Display;

use cs_core::ScriptError;

fn map_error(code: &'static str, error: impl Display) -> ScriptError {
    ScriptError::new(code, error.to_string())
}

pub(crate) fn emit_error(error: ScriptError) -> i32 {
    println!("RESULT:ERROR");
    println!("ERROR_CODE:{}", error.code);
    println!(
        "ERROR_MSG_JSON:{}",
        serde_json::to_string(&error.message).unwrap_or_else(|_| "\"Unknown error\"".to_string())
    );
    1
}

pub(crate) fn map_cli_sheet_read(error: std::io::Error) -> ScriptError {
    map_error("CLI_SHEET_READ", error)
}

pub(crate) fn map_cli_sheet_invalid(error: ScriptError) -> ScriptError {
    map_error("CLI_SHEET_INVALID", error)
}

pub(crate) fn map_cli_self_not_found(id: &str) -> ScriptError {
    map_error("CLI_SELF_NOT_FOUND", format!("no sheet node or attribute with id '{}'", id))
}

pub(crate) fn map_cli_self_without_sheet() -> ScriptError {
    map_error("CLI_SELF_WITHOUT_SHEET", "--self-id needs --sheet")
}

#[cfg(test)]
mod error_map_tests {
    use super::*;

    #[test]
    fn emit_error_returns_non_zero_exit_code() {
        let code = emit_error(ScriptError::new("ERR", "failed"));
        assert_eq!(code, 1);
    }

    #[test]
    fn mapping_helpers_keep_error_codes() {
        assert_eq!(
            map_cli_sheet_read(std::io::Error::other("read")).code,
            "CLI_SHEET_READ"
        );
        let invalid = map_cli_sheet_invalid(ScriptError::parse("bad"));
        assert_eq!(invalid.code, "CLI_SHEET_INVALID");
        assert_eq!(invalid.message, "bad");
        assert_eq!(map_cli_self_not_found("x").code, "CLI_SELF_NOT_FOUND");
        assert_eq!(map_cli_self_without_sheet().code, "CLI_SELF_WITHOUT_SHEET");
    }
}

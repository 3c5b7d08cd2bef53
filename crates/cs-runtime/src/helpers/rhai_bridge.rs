use rhai::{Array, Dynamic, ImmutableString, Map, FLOAT, INT};

use cs_core::{format_number, parse_number};

use crate::object::ScriptObject;

pub(crate) const ATTRIBUTE_SYMBOL_PREFIX: &str = "__attr_";

pub(crate) fn rhai_variable_symbol(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    out
}

/// Maps a binding name to the identifier scripts see. `$st` becomes `__attr_st`.
pub(crate) fn binding_symbol(name: &str) -> String {
    match name.strip_prefix('$') {
        Some(id) => format!("{}{}", ATTRIBUTE_SYMBOL_PREFIX, rhai_variable_symbol(id)),
        None => name.to_string(),
    }
}

pub(crate) fn is_identifier_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanMode {
    Code { braces: usize },
    Quoted(char),
    Template,
}

/// Puts `$` back in messages that name a rewritten attribute symbol.
pub(crate) fn restore_attribute_references(message: &str) -> String {
    message.replace(ATTRIBUTE_SYMBOL_PREFIX, "$")
}

/// Rewrites `$name` attribute references outside string and character literals. Text inside
/// backtick templates is left alone except for `${...}` interpolations.
pub(crate) fn rewrite_attribute_references(source: &str) -> String {
    if !source.contains('$') {
        return source.to_string();
    }

    let chars = source.chars().collect::<Vec<_>>();
    let mut out = String::with_capacity(source.len() + 16);
    let mut modes = vec![ScanMode::Code { braces: 0 }];
    let mut index = 0usize;

    while index < chars.len() {
        let ch = chars[index];
        let next = chars.get(index + 1).copied();
        let mode = *modes.last().unwrap_or(&ScanMode::Code { braces: 0 });

        match mode {
            ScanMode::Quoted(quote) => {
                out.push(ch);
                if ch == '\\' {
                    if let Some(escaped) = next {
                        out.push(escaped);
                        index += 1;
                    }
                } else if ch == quote {
                    modes.pop();
                }
            }
            ScanMode::Template => {
                out.push(ch);
                if ch == '\\' {
                    if let Some(escaped) = next {
                        out.push(escaped);
                        index += 1;
                    }
                } else if ch == '`' {
                    modes.pop();
                } else if ch == '$' && next == Some('{') {
                    out.push('{');
                    index += 1;
                    modes.push(ScanMode::Code { braces: 0 });
                }
            }
            ScanMode::Code { braces } => match ch {
                '"' | '\'' => {
                    out.push(ch);
                    modes.push(ScanMode::Quoted(ch));
                }
                '`' => {
                    out.push(ch);
                    modes.push(ScanMode::Template);
                }
                '/' if next == Some('/') => {
                    while index < chars.len() && chars[index] != '\n' {
                        out.push(chars[index]);
                        index += 1;
                    }
                    continue;
                }
                '{' => {
                    out.push(ch);
                    set_braces(&mut modes, braces + 1);
                }
                '}' => {
                    out.push(ch);
                    if braces == 0 && modes.len() > 1 {
                        modes.pop();
                    } else {
                        set_braces(&mut modes, braces.saturating_sub(1));
                    }
                }
                '$' if next.is_some_and(is_identifier_char)
                    && !index
                        .checked_sub(1)
                        .is_some_and(|prev| is_identifier_char(chars[prev])) =>
                {
                    let start = index + 1;
                    let mut end = start;
                    while end < chars.len() && is_identifier_char(chars[end]) {
                        end += 1;
                    }
                    out.push_str(ATTRIBUTE_SYMBOL_PREFIX);
                    out.extend(chars[start..end].iter());
                    index = end;
                    continue;
                }
                _ => out.push(ch),
            },
        }
        index += 1;
    }

    out
}

fn set_braces(modes: &mut [ScanMode], braces: usize) {
    if let Some(ScanMode::Code { braces: current }) = modes.last_mut() {
        *current = braces;
    }
}

/// Renders a script result the way hosts display it.
pub fn dynamic_to_text(value: &Dynamic) -> String {
    if value.is_unit() {
        return String::new();
    }
    if let Ok(value) = value.as_bool() {
        return value.to_string();
    }
    if let Ok(value) = value.as_int() {
        return value.to_string();
    }
    if let Ok(value) = value.as_float() {
        return format_number(value);
    }
    if value.is_string() || value.is_char() {
        return value.to_string();
    }
    if let Some(object) = value.clone().try_cast::<ScriptObject>() {
        return object.script_text();
    }
    if value.is_array() {
        let items = value.clone().cast::<Array>();
        return format!(
            "[{}]",
            items
                .iter()
                .map(dynamic_to_text)
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    if value.is_map() {
        let map = value.clone().cast::<Map>();
        let entries = map
            .iter()
            .map(|(key, value)| format!("{}: {}", key, dynamic_to_text(value)))
            .collect::<Vec<_>>()
            .join(", ");
        return format!("#{{{}}}", entries);
    }
    value.to_string()
}

pub fn number_to_dynamic(value: f64) -> Dynamic {
    Dynamic::from_float(value as FLOAT)
}

pub fn count_to_dynamic(value: usize) -> Dynamic {
    Dynamic::from_int(value as INT)
}

pub fn text_to_dynamic(value: impl Into<ImmutableString>) -> Dynamic {
    Dynamic::from(value.into())
}

/// Reads a number out of any scalar a script can produce. Objects contribute their numeric value.
pub fn dynamic_to_number(value: &Dynamic) -> Option<f64> {
    if let Ok(value) = value.as_float() {
        return Some(value);
    }
    if let Ok(value) = value.as_int() {
        return Some(value as f64);
    }
    if let Ok(value) = value.as_bool() {
        return Some(if value { 1.0 } else { 0.0 });
    }
    if value.is_string() {
        return parse_number(&value.to_string()).ok();
    }
    value
        .clone()
        .try_cast::<ScriptObject>()
        .and_then(|object| object.numeric_value())
}

pub fn is_truthy(value: &Dynamic) -> bool {
    if value.is_unit() {
        return false;
    }
    if let Ok(value) = value.as_bool() {
        return value;
    }
    if let Ok(value) = value.as_int() {
        return value != 0;
    }
    if let Ok(value) = value.as_float() {
        return value != 0.0 && !value.is_nan();
    }
    if value.is_string() {
        return !value.to_string().is_empty();
    }
    true
}

#[cfg(test)]
mod rhai_bridge_tests {
    use super::*;

    #[test]
    fn binding_symbols_prefix_attribute_names() {
        assert_eq!(binding_symbol("$st"), "__attr_st");
        assert_eq!(binding_symbol("$basic-move"), "__attr_basic_move");
        assert_eq!(binding_symbol("entity"), "entity");
    }

    #[test]
    fn messages_show_attributes_as_written() {
        assert_eq!(
            restore_attribute_references("Variable not found: __attr_st (line 1, position 1)"),
            "Variable not found: $st (line 1, position 1)"
        );
        assert_eq!(restore_attribute_references("no symbols"), "no symbols");
    }

    #[test]
    fn rewrite_skips_literals_and_comments() {
        assert_eq!(rewrite_attribute_references("$st * 2"), "__attr_st * 2");
        assert_eq!(
            rewrite_attribute_references(r#""$st" + $dx"#),
            r#""$st" + __attr_dx"#
        );
        assert_eq!(
            rewrite_attribute_references("$st // cost in $"),
            "__attr_st // cost in $"
        );
        assert_eq!(rewrite_attribute_references("a$b"), "a$b");
        assert_eq!(rewrite_attribute_references("no refs"), "no refs");
    }

    #[test]
    fn rewrite_handles_template_interpolation() {
        assert_eq!(
            rewrite_attribute_references("`cost $5 is ${$st + 1}`"),
            "`cost $5 is ${__attr_st + 1}`"
        );
        assert_eq!(
            rewrite_attribute_references("if $st > 10 { $st } else { 0 }"),
            "if __attr_st > 10 { __attr_st } else { 0 }"
        );
    }

    #[test]
    fn dynamic_text_covers_scalar_shapes() {
        assert_eq!(dynamic_to_text(&Dynamic::UNIT), "");
        assert_eq!(dynamic_to_text(&Dynamic::from_bool(true)), "true");
        assert_eq!(dynamic_to_text(&Dynamic::from_int(12)), "12");
        assert_eq!(dynamic_to_text(&number_to_dynamic(24.0)), "24");
        assert_eq!(dynamic_to_text(&number_to_dynamic(1.0 / 3.0)), "0.3333");
        assert_eq!(dynamic_to_text(&text_to_dynamic("Bob")), "Bob");
        assert_eq!(
            dynamic_to_text(&Dynamic::from_array(vec![
                Dynamic::from_int(1),
                number_to_dynamic(2.5)
            ])),
            "[1, 2.5]"
        );
    }

    #[test]
    fn numbers_and_truthiness() {
        assert_eq!(dynamic_to_number(&text_to_dynamic("1,200")), Some(1200.0));
        assert_eq!(dynamic_to_number(&Dynamic::from_int(3)), Some(3.0));
        assert_eq!(dynamic_to_number(&Dynamic::UNIT), None);
        assert!(is_truthy(&Dynamic::from_int(1)));
        assert!(!is_truthy(&text_to_dynamic("")));
        assert!(!is_truthy(&Dynamic::UNIT));
        assert_eq!(count_to_dynamic(3).as_int(), Ok(3));
    }
}

use std::sync::Arc;

use rhai::{Dynamic, Engine, EvalAltResult, Position, FLOAT, INT};

use cs_core::{
    format_comma, format_comma_signed, format_number, format_signed, Dice, Length, LengthUnit,
    Weight, WeightUnit,
};

use crate::helpers::rhai_bridge::{dynamic_to_number, dynamic_to_text, is_truthy};
use crate::rng::ScriptRng;

pub(crate) const SCRIPT_LOG_TARGET: &str = "script";

/// `console` global. Messages go to `tracing` under the `script` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptConsole;

/// `dice` global.
#[derive(Debug, Clone)]
pub struct ScriptDice {
    rng: Arc<ScriptRng>,
}

/// `measure` global: unit parsing and formatting.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptMeasure;

/// `Math` global.
#[derive(Debug, Clone)]
pub struct ScriptMath {
    rng: Arc<ScriptRng>,
}

/// The fixed globals every environment exposes alongside per-invocation bindings.
pub(crate) fn fixed_globals(rng: &Arc<ScriptRng>) -> Vec<(String, Dynamic)> {
    vec![
        ("console".to_string(), Dynamic::from(ScriptConsole)),
        (
            "dice".to_string(),
            Dynamic::from(ScriptDice {
                rng: Arc::clone(rng),
            }),
        ),
        ("measure".to_string(), Dynamic::from(ScriptMeasure)),
        (
            "Math".to_string(),
            Dynamic::from(ScriptMath {
                rng: Arc::clone(rng),
            }),
        ),
    ]
}

fn runtime_error(message: impl Into<String>) -> Box<EvalAltResult> {
    EvalAltResult::ErrorRuntime(Dynamic::from(message.into()), Position::NONE).into()
}

fn number(value: &Dynamic, what: &str) -> Result<f64, Box<EvalAltResult>> {
    dynamic_to_number(value).ok_or_else(|| runtime_error(format!("{} must be a number", what)))
}

fn parse_dice(spec: &str) -> Result<Dice, Box<EvalAltResult>> {
    Dice::parse(spec).map_err(|error| runtime_error(error.to_string()))
}

fn join_message(parts: &[Dynamic]) -> String {
    parts
        .iter()
        .map(dynamic_to_text)
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Copy)]
enum ConsoleLevel {
    Debug,
    Info,
    Warn,
    Error,
}

fn console_emit(level: ConsoleLevel, parts: &[Dynamic]) {
    let message = join_message(parts);
    match level {
        ConsoleLevel::Debug => tracing::debug!(target: SCRIPT_LOG_TARGET, "{}", message),
        ConsoleLevel::Info => tracing::info!(target: SCRIPT_LOG_TARGET, "{}", message),
        ConsoleLevel::Warn => tracing::warn!(target: SCRIPT_LOG_TARGET, "{}", message),
        ConsoleLevel::Error => tracing::error!(target: SCRIPT_LOG_TARGET, "{}", message),
    }
}

fn register_console(engine: &mut Engine) {
    engine.register_type_with_name::<ScriptConsole>("Console");
    for (name, level) in [
        ("log", ConsoleLevel::Info),
        ("info", ConsoleLevel::Info),
        ("debug", ConsoleLevel::Debug),
        ("warn", ConsoleLevel::Warn),
        ("error", ConsoleLevel::Error),
    ] {
        engine.register_fn(name, move |_console: &mut ScriptConsole, a: Dynamic| {
            console_emit(level, &[a]);
        });
        engine.register_fn(
            name,
            move |_console: &mut ScriptConsole, a: Dynamic, b: Dynamic| {
                console_emit(level, &[a, b]);
            },
        );
        engine.register_fn(
            name,
            move |_console: &mut ScriptConsole, a: Dynamic, b: Dynamic, c: Dynamic| {
                console_emit(level, &[a, b, c]);
            },
        );
    }

    engine.on_print(|text| tracing::info!(target: SCRIPT_LOG_TARGET, "{}", text));
    engine.on_debug(|text, source, position| match source {
        Some(source) => tracing::debug!(target: SCRIPT_LOG_TARGET, %position, source, "{}", text),
        None => tracing::debug!(target: SCRIPT_LOG_TARGET, %position, "{}", text),
    });
}

fn register_dice(engine: &mut Engine) {
    engine.register_type_with_name::<ScriptDice>("Dice");
    engine.register_fn(
        "roll",
        |dice: &mut ScriptDice, spec: &str| -> Result<INT, Box<EvalAltResult>> {
            let parsed = parse_dice(spec)?;
            let rng = Arc::clone(&dice.rng);
            Ok(parsed.roll(&mut |sides| rng.next_bounded(sides)) as INT)
        },
    );
    engine.register_fn(
        "min",
        |_dice: &mut ScriptDice, spec: &str| -> Result<INT, Box<EvalAltResult>> {
            Ok(parse_dice(spec)?.minimum() as INT)
        },
    );
    engine.register_fn(
        "max",
        |_dice: &mut ScriptDice, spec: &str| -> Result<INT, Box<EvalAltResult>> {
            Ok(parse_dice(spec)?.maximum() as INT)
        },
    );
    engine.register_fn(
        "average",
        |_dice: &mut ScriptDice, spec: &str| -> Result<FLOAT, Box<EvalAltResult>> {
            Ok(parse_dice(spec)?.average() as FLOAT)
        },
    );
}

fn register_measure(engine: &mut Engine) {
    engine.register_type_with_name::<ScriptMeasure>("Measure");
    engine.register_fn(
        "weightToPounds",
        |_measure: &mut ScriptMeasure, text: &str| -> Result<FLOAT, Box<EvalAltResult>> {
            Weight::parse(text, WeightUnit::Pound)
                .map(|weight| weight.0 as FLOAT)
                .map_err(|error| runtime_error(error.to_string()))
        },
    );
    engine.register_fn(
        "lengthToInches",
        |_measure: &mut ScriptMeasure, text: &str| -> Result<FLOAT, Box<EvalAltResult>> {
            Length::parse(text, LengthUnit::Inch)
                .map(|length| length.0 as FLOAT)
                .map_err(|error| runtime_error(error.to_string()))
        },
    );
    engine.register_fn(
        "formatWeight",
        |_measure: &mut ScriptMeasure,
         pounds: Dynamic,
         unit: &str|
         -> Result<String, Box<EvalAltResult>> {
            let unit = WeightUnit::from_key(unit)
                .ok_or_else(|| runtime_error(format!("unknown weight unit '{}'", unit)))?;
            Ok(Weight(number(&pounds, "weight")?).format(unit))
        },
    );
    engine.register_fn(
        "formatLength",
        |_measure: &mut ScriptMeasure,
         inches: Dynamic,
         unit: &str|
         -> Result<String, Box<EvalAltResult>> {
            let unit = LengthUnit::from_key(unit)
                .ok_or_else(|| runtime_error(format!("unknown length unit '{}'", unit)))?;
            Ok(Length(number(&inches, "length")?).format(unit))
        },
    );
}

fn register_math(engine: &mut Engine) {
    engine.register_type_with_name::<ScriptMath>("Math");

    let unary: [(&'static str, fn(f64) -> f64); 11] = [
        ("exp2", f64::exp2),
        ("floor", f64::floor),
        ("ceil", f64::ceil),
        ("round", f64::round),
        ("trunc", f64::trunc),
        ("abs", f64::abs),
        ("sqrt", f64::sqrt),
        ("cbrt", f64::cbrt),
        ("log", f64::ln),
        ("log2", f64::log2),
        ("log10", f64::log10),
    ];
    for (name, apply) in unary {
        engine.register_fn(
            name,
            move |_math: &mut ScriptMath, value: Dynamic| -> Result<FLOAT, Box<EvalAltResult>> {
                Ok(apply(number(&value, "argument")?) as FLOAT)
            },
        );
    }

    let binary: [(&'static str, fn(f64, f64) -> f64); 4] = [
        ("pow", f64::powf),
        ("min", f64::min),
        ("max", f64::max),
        ("hypot", f64::hypot),
    ];
    for (name, apply) in binary {
        engine.register_fn(
            name,
            move |_math: &mut ScriptMath,
                  left: Dynamic,
                  right: Dynamic|
                  -> Result<FLOAT, Box<EvalAltResult>> {
                Ok(apply(number(&left, "argument")?, number(&right, "argument")?) as FLOAT)
            },
        );
    }

    engine.register_fn("random", |math: &mut ScriptMath| -> FLOAT {
        math.rng.next_bounded(u32::MAX) as FLOAT / u32::MAX as FLOAT
    });
    engine.register_fn("random", |math: &mut ScriptMath, bound: INT| -> INT {
        if bound <= 0 {
            return 0;
        }
        math.rng.next_bounded(bound.min(u32::MAX as INT) as u32) as INT
    });
}

fn signed_value(value: &Dynamic) -> Result<String, Box<EvalAltResult>> {
    Ok(format_signed(number(value, "value")?))
}

fn format_num(
    value: &Dynamic,
    with_commas: bool,
    with_sign: bool,
) -> Result<String, Box<EvalAltResult>> {
    let value = number(value, "value")?;
    Ok(match (with_commas, with_sign) {
        (true, true) => format_comma_signed(value),
        (true, false) => format_comma(value),
        (false, true) => format_signed(value),
        (false, false) => format_number(value),
    })
}

fn register_functions(engine: &mut Engine) {
    engine.register_fn(
        "iff",
        |condition: Dynamic, when_true: Dynamic, when_false: Dynamic| -> Dynamic {
            if is_truthy(&condition) {
                when_true
            } else {
                when_false
            }
        },
    );
    engine.register_fn("signedValue", |value: Dynamic| signed_value(&value));
    engine.register_fn("formatNum", |value: Dynamic| format_num(&value, false, false));
    engine.register_fn("formatNum", |value: Dynamic, with_commas: bool| {
        format_num(&value, with_commas, false)
    });
    engine.register_fn(
        "formatNum",
        |value: Dynamic, with_commas: bool, with_sign: bool| {
            format_num(&value, with_commas, with_sign)
        },
    );
}

/// Installs every built-in on a freshly created engine.
pub(crate) fn register_builtins(engine: &mut Engine) {
    register_console(engine);
    register_dice(engine);
    register_measure(engine);
    register_math(engine);
    register_functions(engine);
}

#[cfg(test)]
mod builtins_tests {
    use super::*;
    use rhai::Scope;

    fn engine_with_globals(seed: u32) -> (Engine, Scope<'static>) {
        let mut engine = Engine::new();
        register_builtins(&mut engine);
        let rng = Arc::new(ScriptRng::new(Some(seed)));
        let mut scope = Scope::new();
        for (name, value) in fixed_globals(&rng) {
            scope.push_dynamic(name, value);
        }
        (engine, scope)
    }

    fn eval(source: &str) -> Dynamic {
        let (engine, mut scope) = engine_with_globals(11);
        engine
            .eval_with_scope::<Dynamic>(&mut scope, source)
            .expect("script should evaluate")
    }

    #[test]
    fn dice_helpers_follow_the_spec_string() {
        assert_eq!(eval(r#"dice.min("3d6+2")"#).as_int(), Ok(5));
        assert_eq!(eval(r#"dice.max("3d6+2")"#).as_int(), Ok(20));
        assert_eq!(eval(r#"dice.average("2d")"#).as_float(), Ok(7.0));
        let rolled = eval(r#"dice.roll("3d6")"#).as_int().expect("roll is an int");
        assert!((3..=18).contains(&rolled));
    }

    #[test]
    fn iff_uses_truthiness() {
        assert_eq!(eval(r#"iff(1, "yes", "no")"#).to_string(), "yes");
        assert_eq!(eval(r#"iff("", "yes", "no")"#).to_string(), "no");
        assert_eq!(eval("iff(true, 3, 4)").as_int(), Ok(3));
    }

    #[test]
    fn formatting_helpers() {
        assert_eq!(eval("signedValue(3)").to_string(), "+3");
        assert_eq!(eval("signedValue(-1.5)").to_string(), "-1.5");
        assert_eq!(eval("formatNum(1234.5, true, true)").to_string(), "+1,234.5");
        assert_eq!(eval("formatNum(1234.5)").to_string(), "1234.5");
    }

    #[test]
    fn math_and_measure_helpers() {
        assert_eq!(eval("Math.exp2(3)").as_float(), Ok(8.0));
        assert_eq!(eval("Math.max(2, 7.5)").as_float(), Ok(7.5));
        assert_eq!(eval("Math.floor(2.7)").as_float(), Ok(2.0));
        assert_eq!(eval(r#"measure.weightToPounds("2 kg")"#).as_float(), Ok(4.0));
        assert_eq!(eval(r#"measure.lengthToInches("2 ft")"#).as_float(), Ok(24.0));
        assert_eq!(eval(r#"measure.formatWeight(4, "kg")"#).to_string(), "2 kg");
        let random = eval("Math.random(6)").as_int().expect("random is an int");
        assert!((0..6).contains(&random));
    }

    #[test]
    fn bad_dice_spec_is_a_runtime_error() {
        let (engine, mut scope) = engine_with_globals(3);
        assert!(engine
            .eval_with_scope::<Dynamic>(&mut scope, r#"dice.roll("xd")"#)
            .is_err());
    }
}

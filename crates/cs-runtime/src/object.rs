use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use rhai::{Array, Dynamic, Engine, EvalAltResult, ImmutableString, Position, FLOAT, INT};

use crate::helpers::rhai_bridge::{dynamic_to_number, dynamic_to_text, text_to_dynamic};

pub type PropertyFn = Arc<dyn Fn() -> Dynamic + Send + Sync>;
pub type MethodFn = Arc<dyn Fn(&[Dynamic]) -> Result<Dynamic, String> + Send + Sync>;
pub type NumericFn = Arc<dyn Fn() -> Option<f64> + Send + Sync>;

/// Highest method arity dispatched through registered method names.
pub const MAX_METHOD_ARITY: usize = 3;

/// Lowers the first letter and turns `snake_case` into `camelCase`. `id` and `parentID` keep
/// their established spelling.
pub fn normalize_property_name(name: &str) -> String {
    match name {
        "id" | "ID" | "Id" => return "id".to_string(),
        "parentID" | "ParentID" | "parentId" | "parent_id" => return "parentID".to_string(),
        _ => {}
    }

    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for ch in name.chars() {
        if ch == '_' {
            upper_next = !out.is_empty();
            continue;
        }
        if out.is_empty() {
            out.extend(ch.to_lowercase());
        } else if upper_next {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        upper_next = false;
    }
    out
}

struct Property {
    compute: PropertyFn,
    value: OnceLock<Dynamic>,
}

impl Property {
    fn get(&self) -> Dynamic {
        self.value.get_or_init(|| (self.compute)()).clone()
    }
}

struct ObjectData {
    kind: &'static str,
    display: Option<String>,
    properties: BTreeMap<String, Property>,
    methods: BTreeMap<String, MethodFn>,
    numeric: Option<NumericFn>,
}

/// Read-only proxy through which scripts see host data. Property values are computed on first
/// access and kept for the lifetime of the proxy; writes are ignored.
#[derive(Clone)]
pub struct ScriptObject {
    data: Arc<ObjectData>,
}

impl ScriptObject {
    pub fn builder(kind: &'static str) -> ScriptObjectBuilder {
        ScriptObjectBuilder::new(kind)
    }

    /// Stand-in for the `entity` binding when no entity participates.
    pub fn absent_entity() -> Self {
        Self::builder("entity")
            .value("exists", Dynamic::FALSE)
            .display("no entity")
            .build()
    }

    pub fn kind(&self) -> &'static str {
        self.data.kind
    }

    pub fn get(&self, name: &str) -> Dynamic {
        match self.data.properties.get(name) {
            Some(property) => property.get(),
            None => Dynamic::UNIT,
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.data.properties.contains_key(name) || self.data.methods.contains_key(name)
    }

    /// Property and method names, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .data
            .properties
            .keys()
            .chain(self.data.methods.keys())
            .cloned()
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.data.methods.contains_key(name)
    }

    pub fn call(&self, name: &str, args: &[Dynamic]) -> Result<Dynamic, String> {
        match self.data.methods.get(name) {
            Some(method) => method(args),
            None => Err(format!(
                "{} has no method named '{}'",
                self.data.kind, name
            )),
        }
    }

    pub fn numeric_value(&self) -> Option<f64> {
        self.data.numeric.as_ref().and_then(|numeric| numeric())
    }

    pub fn display_text(&self) -> String {
        self.data
            .display
            .clone()
            .unwrap_or_else(|| self.data.kind.to_string())
    }

    /// Text a script gets when the object is printed or joined to a string: the numeric
    /// reading if there is one, the display name otherwise.
    pub fn script_text(&self) -> String {
        match self.numeric_value() {
            Some(number) => cs_core::format_number(number),
            None => self.display_text(),
        }
    }

    pub fn same_object(&self, other: &ScriptObject) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl fmt::Debug for ScriptObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptObject")
            .field("kind", &self.data.kind)
            .field("display", &self.data.display)
            .field("keys", &self.data.properties.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl fmt::Display for ScriptObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_text())
    }
}

pub struct ScriptObjectBuilder {
    kind: &'static str,
    display: Option<String>,
    properties: BTreeMap<String, Property>,
    methods: BTreeMap<String, MethodFn>,
    numeric: Option<NumericFn>,
}

impl ScriptObjectBuilder {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            display: None,
            properties: BTreeMap::new(),
            methods: BTreeMap::new(),
            numeric: None,
        }
    }

    /// Adds a property computed on first read.
    pub fn property<F>(mut self, name: &str, compute: F) -> Self
    where
        F: Fn() -> Dynamic + Send + Sync + 'static,
    {
        self.properties.insert(
            normalize_property_name(name),
            Property {
                compute: Arc::new(compute),
                value: OnceLock::new(),
            },
        );
        self
    }

    /// Adds a property whose value is already known.
    pub fn value(mut self, name: &str, value: Dynamic) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(value);
        self.properties.insert(
            normalize_property_name(name),
            Property {
                compute: Arc::new(|| Dynamic::UNIT),
                value: cell,
            },
        );
        self
    }

    pub fn text(self, name: &str, value: impl Into<ImmutableString>) -> Self {
        self.value(name, text_to_dynamic(value))
    }

    pub fn method<F>(mut self, name: &str, method: F) -> Self
    where
        F: Fn(&[Dynamic]) -> Result<Dynamic, String> + Send + Sync + 'static,
    {
        self.methods
            .insert(normalize_property_name(name), Arc::new(method));
        self
    }

    /// Value used when the object takes part in arithmetic or comparisons.
    pub fn numeric<F>(mut self, numeric: F) -> Self
    where
        F: Fn() -> Option<f64> + Send + Sync + 'static,
    {
        self.numeric = Some(Arc::new(numeric));
        self
    }

    pub fn display(mut self, text: impl Into<String>) -> Self {
        self.display = Some(text.into());
        self
    }

    pub fn build(self) -> ScriptObject {
        ScriptObject {
            data: Arc::new(ObjectData {
                kind: self.kind,
                display: self.display,
                properties: self.properties,
                methods: self.methods,
                numeric: self.numeric,
            }),
        }
    }
}

fn runtime_error(message: impl Into<String>) -> Box<EvalAltResult> {
    EvalAltResult::ErrorRuntime(Dynamic::from(message.into()), Position::NONE).into()
}

fn require_number(object: &ScriptObject) -> Result<f64, Box<EvalAltResult>> {
    object
        .numeric_value()
        .ok_or_else(|| runtime_error(format!("{} has no numeric value", object.kind())))
}

fn arithmetic(op: &str, left: f64, right: f64) -> f64 {
    match op {
        "+" => left + right,
        "-" => left - right,
        "*" => left * right,
        "/" => left / right,
        "%" => left % right,
        _ => left.powf(right),
    }
}

fn compare(op: &str, left: f64, right: f64) -> bool {
    match op {
        "<" => left < right,
        "<=" => left <= right,
        ">" => left > right,
        ">=" => left >= right,
        "==" => left == right,
        _ => left != right,
    }
}

const ARITHMETIC_OPERATORS: [&str; 6] = ["+", "-", "*", "/", "%", "**"];
const COMPARISON_OPERATORS: [&str; 6] = ["<", "<=", ">", ">=", "==", "!="];

fn call_method(
    object: &ScriptObject,
    name: &str,
    args: &[Dynamic],
) -> Result<Dynamic, Box<EvalAltResult>> {
    object.call(name, args).map_err(runtime_error)
}

/// Registers the proxy type: property reads through the string indexer, ignored writes, key
/// enumeration, display, numeric operators, and dispatch shims for the given method names.
pub(crate) fn register_object_api(engine: &mut Engine, method_names: &[String]) {
    engine.register_type_with_name::<ScriptObject>("ScriptObject");
    engine.register_indexer_get(|object: &mut ScriptObject, name: &str| -> Dynamic {
        object.get(name)
    });
    engine.register_indexer_set(|_object: &mut ScriptObject, _name: &str, _value: Dynamic| {});
    engine.register_fn("keys", |object: &mut ScriptObject| -> Array {
        object.keys().into_iter().map(Dynamic::from).collect()
    });
    engine.register_fn("has", |object: &mut ScriptObject, name: &str| -> bool {
        object.has(name)
    });
    engine.register_fn("to_string", |object: &mut ScriptObject| -> String {
        object.script_text()
    });
    engine.register_fn("to_debug", |object: &mut ScriptObject| -> String {
        format!("{:?}", object)
    });
    engine.register_fn("+", |left: ImmutableString, right: ScriptObject| -> String {
        format!("{}{}", left, right.script_text())
    });
    engine.register_fn("+", |left: ScriptObject, right: ImmutableString| -> String {
        format!("{}{}", left.script_text(), right)
    });

    for op in ARITHMETIC_OPERATORS {
        engine.register_fn(
            op,
            move |left: ScriptObject, right: FLOAT| -> Result<FLOAT, Box<EvalAltResult>> {
                Ok(arithmetic(op, require_number(&left)?, right))
            },
        );
        engine.register_fn(
            op,
            move |left: ScriptObject, right: INT| -> Result<FLOAT, Box<EvalAltResult>> {
                Ok(arithmetic(op, require_number(&left)?, right as FLOAT))
            },
        );
        engine.register_fn(
            op,
            move |left: FLOAT, right: ScriptObject| -> Result<FLOAT, Box<EvalAltResult>> {
                Ok(arithmetic(op, left, require_number(&right)?))
            },
        );
        engine.register_fn(
            op,
            move |left: INT, right: ScriptObject| -> Result<FLOAT, Box<EvalAltResult>> {
                Ok(arithmetic(op, left as FLOAT, require_number(&right)?))
            },
        );
        engine.register_fn(
            op,
            move |left: ScriptObject, right: ScriptObject| -> Result<FLOAT, Box<EvalAltResult>> {
                Ok(arithmetic(op, require_number(&left)?, require_number(&right)?))
            },
        );
    }
    engine.register_fn(
        "-",
        |value: ScriptObject| -> Result<FLOAT, Box<EvalAltResult>> { Ok(-require_number(&value)?) },
    );

    for op in COMPARISON_OPERATORS {
        engine.register_fn(op, move |left: ScriptObject, right: FLOAT| -> bool {
            left.numeric_value()
                .is_some_and(|left| compare(op, left, right))
        });
        engine.register_fn(op, move |left: ScriptObject, right: INT| -> bool {
            left.numeric_value()
                .is_some_and(|left| compare(op, left, right as FLOAT))
        });
        engine.register_fn(op, move |left: FLOAT, right: ScriptObject| -> bool {
            right
                .numeric_value()
                .is_some_and(|right| compare(op, left, right))
        });
        engine.register_fn(op, move |left: INT, right: ScriptObject| -> bool {
            right
                .numeric_value()
                .is_some_and(|right| compare(op, left as FLOAT, right))
        });
        engine.register_fn(op, move |left: ScriptObject, right: ScriptObject| -> bool {
            match (left.numeric_value(), right.numeric_value()) {
                (Some(left), Some(right)) => compare(op, left, right),
                _ => match op {
                    "==" => left.same_object(&right),
                    "!=" => !left.same_object(&right),
                    _ => false,
                },
            }
        });
    }

    for name in method_names {
        register_method_shims(engine, name);
    }
}

fn register_method_shims(engine: &mut Engine, name: &str) {
    let method = name.to_string();
    engine.register_fn(
        name,
        move |object: &mut ScriptObject| -> Result<Dynamic, Box<EvalAltResult>> {
            call_method(object, &method, &[])
        },
    );
    let method = name.to_string();
    engine.register_fn(
        name,
        move |object: &mut ScriptObject, a: Dynamic| -> Result<Dynamic, Box<EvalAltResult>> {
            call_method(object, &method, &[a])
        },
    );
    let method = name.to_string();
    engine.register_fn(
        name,
        move |object: &mut ScriptObject,
              a: Dynamic,
              b: Dynamic|
              -> Result<Dynamic, Box<EvalAltResult>> {
            call_method(object, &method, &[a, b])
        },
    );
    let method = name.to_string();
    engine.register_fn(
        name,
        move |object: &mut ScriptObject,
              a: Dynamic,
              b: Dynamic,
              c: Dynamic|
              -> Result<Dynamic, Box<EvalAltResult>> {
            call_method(object, &method, &[a, b, c])
        },
    );
}

/// Reads a numeric method argument, accepting anything with a numeric reading.
pub fn number_arg(args: &[Dynamic], index: usize) -> Result<f64, String> {
    args.get(index)
        .and_then(dynamic_to_number)
        .ok_or_else(|| format!("argument {} must be a number", index + 1))
}

pub fn optional_number_arg(args: &[Dynamic], index: usize) -> Option<f64> {
    args.get(index).and_then(dynamic_to_number)
}

pub fn text_arg(args: &[Dynamic], index: usize) -> String {
    args.get(index).map(dynamic_to_text).unwrap_or_default()
}

#[cfg(test)]
mod object_tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn property_names_are_normalized() {
        assert_eq!(normalize_property_name("Name"), "name");
        assert_eq!(normalize_property_name("player_name"), "playerName");
        assert_eq!(normalize_property_name("isContainer"), "isContainer");
        assert_eq!(normalize_property_name("ID"), "id");
        assert_eq!(normalize_property_name("ParentID"), "parentID");
        assert_eq!(normalize_property_name("base_skill_id"), "baseSkillId");
    }

    #[test]
    fn properties_compute_once_and_unknown_reads_unit() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let object = ScriptObject::builder("attribute")
            .property("Current", move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Dynamic::from_float(12.0)
            })
            .text("id", "st")
            .numeric(|| Some(12.0))
            .display("Strength")
            .build();

        assert_eq!(object.get("current").as_float(), Ok(12.0));
        assert_eq!(object.get("current").as_float(), Ok(12.0));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(object.get("missing").is_unit());
        assert_eq!(object.keys(), vec!["current".to_string(), "id".to_string()]);
        assert_eq!(object.numeric_value(), Some(12.0));
        assert_eq!(object.to_string(), "Strength");
        assert_eq!(object.script_text(), "12");
    }

    #[test]
    fn methods_dispatch_and_report_missing() {
        let object = ScriptObject::builder("skill")
            .method("double", |args| Ok(Dynamic::from_float(number_arg(args, 0)? * 2.0)))
            .build();
        let result = object
            .call("double", &[Dynamic::from_int(4)])
            .expect("method should run");
        assert_eq!(result.as_float(), Ok(8.0));
        assert!(object.call("double", &[]).is_err());
        assert!(object.call("triple", &[]).is_err());
        assert!(object.has("double"));
        assert_eq!(object.keys(), vec!["double".to_string()]);

        let mixed = ScriptObject::builder("entity")
            .text("name", "Bob")
            .method("find_skills", |_args| Ok(Dynamic::UNIT))
            .method("attribute", |_args| Ok(Dynamic::UNIT))
            .build();
        assert_eq!(
            mixed.keys(),
            vec![
                "attribute".to_string(),
                "findSkills".to_string(),
                "name".to_string()
            ]
        );
    }

    #[test]
    fn absent_entity_reports_missing() {
        let entity = ScriptObject::absent_entity();
        assert_eq!(entity.get("exists").as_bool(), Ok(false));
        assert!(entity.get("name").is_unit());
    }
}

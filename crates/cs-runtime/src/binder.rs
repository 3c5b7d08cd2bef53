use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rhai::{Dynamic, Engine};

use crate::helpers::rhai_bridge::binding_symbol;

/// Produces a binding's value the first time a script references it. Receives the engine of
/// the environment running the invocation.
pub type LazyProvider = Arc<dyn Fn(&Engine) -> Dynamic + Send + Sync>;

#[derive(Clone)]
pub enum ArgValue {
    Eager(Dynamic),
    Lazy(LazyProvider),
}

/// One named binding for an invocation. Attribute bindings use `$`-prefixed names.
#[derive(Clone)]
pub struct ScriptArg {
    pub name: String,
    pub value: ArgValue,
}

impl ScriptArg {
    pub fn value(name: impl Into<String>, value: Dynamic) -> Self {
        Self {
            name: name.into(),
            value: ArgValue::Eager(value),
        }
    }

    pub fn lazy<F>(name: impl Into<String>, provider: F) -> Self
    where
        F: Fn(&Engine) -> Dynamic + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            value: ArgValue::Lazy(Arc::new(provider)),
        }
    }

    pub fn from_provider(name: impl Into<String>, provider: LazyProvider) -> Self {
        Self {
            name: name.into(),
            value: ArgValue::Lazy(provider),
        }
    }

    pub fn is_lazy(&self) -> bool {
        matches!(self.value, ArgValue::Lazy(_))
    }
}

impl fmt::Debug for ScriptArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.value {
            ArgValue::Eager(_) => "eager",
            ArgValue::Lazy(_) => "lazy",
        };
        f.debug_struct("ScriptArg")
            .field("name", &self.name)
            .field("kind", &kind)
            .finish()
    }
}

pub(crate) enum Lookup {
    Ready(Dynamic),
    Pending(LazyProvider),
    Missing,
}

/// Variables an environment can materialize: fixed globals plus the bindings of the running
/// invocation, keyed by script-visible symbol.
#[derive(Default)]
pub(crate) struct BindingTable {
    fixed: BTreeMap<String, Dynamic>,
    args: BTreeMap<String, ArgValue>,
    memo: BTreeMap<String, Dynamic>,
}

impl BindingTable {
    pub(crate) fn with_fixed(fixed: Vec<(String, Dynamic)>) -> Self {
        Self {
            fixed: fixed.into_iter().collect(),
            ..Self::default()
        }
    }

    pub(crate) fn bind(&mut self, args: &[ScriptArg]) {
        self.clear_invocation();
        for arg in args {
            self.args.insert(binding_symbol(&arg.name), arg.value.clone());
        }
    }

    pub(crate) fn clear_invocation(&mut self) {
        self.args.clear();
        self.memo.clear();
    }

    pub(crate) fn lookup(&self, symbol: &str) -> Lookup {
        if let Some(value) = self.memo.get(symbol) {
            return Lookup::Ready(value.clone());
        }
        match self.args.get(symbol) {
            Some(ArgValue::Eager(value)) => Lookup::Ready(value.clone()),
            Some(ArgValue::Lazy(provider)) => Lookup::Pending(Arc::clone(provider)),
            None => match self.fixed.get(symbol) {
                Some(value) => Lookup::Ready(value.clone()),
                None => Lookup::Missing,
            },
        }
    }

    /// Records a provider's result; a value stored first wins.
    pub(crate) fn memoize(&mut self, symbol: &str, value: Dynamic) -> Dynamic {
        self.memo
            .entry(symbol.to_string())
            .or_insert(value)
            .clone()
    }

    pub(crate) fn is_bound(&self) -> bool {
        !self.args.is_empty() || !self.memo.is_empty()
    }
}

#[cfg(test)]
mod binder_tests {
    use super::*;

    #[test]
    fn bindings_resolve_by_symbol_and_clear() {
        let mut table = BindingTable::with_fixed(vec![("Math".to_string(), Dynamic::from_int(1))]);
        table.bind(&[
            ScriptArg::value("$st", Dynamic::from_int(12)),
            ScriptArg::lazy("self", |_engine| Dynamic::from_int(3)),
        ]);

        assert!(matches!(table.lookup("__attr_st"), Lookup::Ready(value) if value.as_int() == Ok(12)));
        assert!(matches!(table.lookup("self"), Lookup::Pending(_)));
        assert!(matches!(table.lookup("Math"), Lookup::Ready(_)));
        assert!(matches!(table.lookup("other"), Lookup::Missing));

        let stored = table.memoize("self", Dynamic::from_int(3));
        assert_eq!(stored.as_int(), Ok(3));
        let kept = table.memoize("self", Dynamic::from_int(9));
        assert_eq!(kept.as_int(), Ok(3));
        assert!(matches!(table.lookup("self"), Lookup::Ready(value) if value.as_int() == Ok(3)));

        table.clear_invocation();
        assert!(!table.is_bound());
        assert!(matches!(table.lookup("self"), Lookup::Missing));
        assert!(matches!(table.lookup("Math"), Lookup::Ready(_)));
    }

    #[test]
    fn arg_debug_names_the_binding_kind() {
        let arg = ScriptArg::lazy("entity", |_engine| Dynamic::UNIT);
        assert!(arg.is_lazy());
        assert!(format!("{:?}", arg).contains("lazy"));
    }
}

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use rhai::{Engine, OptimizationLevel, AST};

use cs_core::{ScriptError, ScriptLimits};

use crate::helpers::rhai_bridge::{restore_attribute_references, rewrite_attribute_references};
use crate::pool::apply_limits;

/// Compiled programs keyed by exact source text. Entries live until `clear`.
pub struct ProgramCache {
    compiler: Engine,
    programs: RwLock<HashMap<String, Arc<AST>>>,
    compilations: AtomicUsize,
}

impl Default for ProgramCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramCache {
    pub fn new() -> Self {
        Self::with_limits(ScriptLimits::default())
    }

    /// A cache whose compiler rejects programs nested deeper than `limits` allow.
    pub fn with_limits(limits: ScriptLimits) -> Self {
        let mut compiler = Engine::new_raw();
        compiler.set_optimization_level(OptimizationLevel::Simple);
        apply_limits(&mut compiler, &limits);
        Self {
            compiler,
            programs: RwLock::new(HashMap::new()),
            compilations: AtomicUsize::new(0),
        }
    }

    /// Returns the program for `text`, compiling it on first sight. When two threads race on
    /// the same text, the program stored first is the one both get.
    pub fn compile(&self, text: &str) -> Result<Arc<AST>, ScriptError> {
        if let Some(program) = self
            .programs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(text)
        {
            return Ok(Arc::clone(program));
        }

        let source = rewrite_attribute_references(text);
        let ast = self
            .compiler
            .compile(&source)
            .map_err(|error| {
                ScriptError::compile(format!(
                    "failed to compile script: {}",
                    restore_attribute_references(&error.to_string())
                ))
            })?;
        self.compilations.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(len = text.len(), "compiled script");

        let mut programs = self
            .programs
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(
            programs
                .entry(text.to_string())
                .or_insert_with(|| Arc::new(ast)),
        ))
    }

    pub fn contains(&self, text: &str) -> bool {
        self.programs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(text)
    }

    pub fn len(&self) -> usize {
        self.programs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of successful compilations, including ones that lost an insert race.
    pub fn compilations(&self) -> usize {
        self.compilations.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.programs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod program_cache_tests {
    use super::*;

    #[test]
    fn identical_text_compiles_once() {
        let cache = ProgramCache::new();
        let first = cache.compile("1 + 2").expect("compile should pass");
        let second = cache.compile("1 + 2").expect("compile should pass");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.compilations(), 1);
        assert_eq!(cache.len(), 1);

        cache.compile("1 + 2 ").expect("compile should pass");
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.contains("1 + 2"));
    }

    #[test]
    fn syntax_errors_are_not_cached() {
        let cache = ProgramCache::new();
        let error = cache.compile("let = ;").expect_err("compile should fail");
        assert_eq!(error.code, cs_core::error::CODE_COMPILE);
        assert!(error.message.starts_with("failed to compile script"));
        assert!(cache.is_empty());
    }

    #[test]
    fn attribute_references_compile() {
        let cache = ProgramCache::new();
        assert!(cache.compile("$st * 2").is_ok());
        assert!(cache.contains("$st * 2"));
    }

    #[test]
    fn nesting_beyond_the_expression_depth_is_rejected() {
        let nested = format!("{}1{}", "(".repeat(20), ")".repeat(20));
        assert!(ProgramCache::new().compile(&nested).is_ok());

        let shallow = ProgramCache::with_limits(ScriptLimits {
            max_expr_depth: 8,
            ..ScriptLimits::default()
        });
        let error = shallow.compile(&nested).expect_err("deep nesting should fail");
        assert_eq!(error.code, cs_core::error::CODE_COMPILE);
        assert!(shallow.is_empty());
    }
}

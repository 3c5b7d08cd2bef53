use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rhai::{Dynamic, Engine, EvalAltResult, Scope, AST};

use cs_core::error::CODE_TIMEOUT;
use cs_core::{ScriptError, ScriptLimits};

use crate::binder::{BindingTable, Lookup, ScriptArg};
use crate::builtins::{fixed_globals, register_builtins};
use crate::helpers::rhai_bridge::restore_attribute_references;
use crate::object::register_object_api;
use crate::rng::ScriptRng;

pub const DEFAULT_MAX_IDLE: usize = 8;

pub(crate) fn apply_limits(engine: &mut Engine, limits: &ScriptLimits) {
    engine.set_max_string_size(limits.max_string_size);
    engine.set_max_array_size(limits.max_array_size);
    engine.set_max_map_size(limits.max_map_size);
    engine.set_max_expr_depths(limits.max_expr_depth, limits.max_function_expr_depth);
    engine.set_max_call_levels(limits.max_call_levels);
}

fn lock_bindings(bindings: &Mutex<BindingTable>) -> MutexGuard<'_, BindingTable> {
    bindings.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A configured engine plus the state one invocation needs: the binding table consulted when a
/// script references an unknown variable, and the interrupt flag polled while it runs.
pub struct Environment {
    engine: Engine,
    bindings: Arc<Mutex<BindingTable>>,
    interrupt: Arc<AtomicBool>,
}

impl Environment {
    fn new(rng: &Arc<ScriptRng>, method_names: &[String], limits: &ScriptLimits) -> Self {
        let bindings = Arc::new(Mutex::new(BindingTable::with_fixed(fixed_globals(rng))));
        let interrupt = Arc::new(AtomicBool::new(false));

        let mut engine = Engine::new();
        apply_limits(&mut engine, limits);
        register_builtins(&mut engine);
        register_object_api(&mut engine, method_names);

        let flag = Arc::clone(&interrupt);
        engine.on_progress(move |_operations| {
            if flag.load(Ordering::Relaxed) {
                Some(Dynamic::from("timeout"))
            } else {
                None
            }
        });

        let table = Arc::clone(&bindings);
        engine.on_var(move |name, _index, mut context| {
            if context.scope().contains(name) {
                return Ok(None);
            }
            let lookup = lock_bindings(&table).lookup(name);
            let value = match lookup {
                Lookup::Ready(value) => value,
                Lookup::Pending(provider) => {
                    let value = provider(context.engine());
                    lock_bindings(&table).memoize(name, value)
                }
                Lookup::Missing => return Ok(None),
            };
            context.scope_mut().push_dynamic(name.to_string(), value);
            Ok(None)
        });

        Self {
            engine,
            bindings,
            interrupt,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    /// Evaluates `program` with `args` bound. The bindings are released when evaluation ends.
    pub fn run(&self, program: &AST, args: &[ScriptArg]) -> Result<Dynamic, ScriptError> {
        lock_bindings(&self.bindings).bind(args);
        let mut scope = Scope::new();
        let result = self.engine.eval_ast_with_scope::<Dynamic>(&mut scope, program);
        lock_bindings(&self.bindings).clear_invocation();
        result.map_err(|error| map_eval_error(*error))
    }

    fn reset(&self) {
        self.interrupt.store(false, Ordering::SeqCst);
        lock_bindings(&self.bindings).clear_invocation();
    }

    fn is_clean(&self) -> bool {
        !self.interrupt.load(Ordering::SeqCst) && !lock_bindings(&self.bindings).is_bound()
    }
}

fn map_eval_error(error: EvalAltResult) -> ScriptError {
    match error {
        EvalAltResult::ErrorTerminated(..) => {
            ScriptError::new(CODE_TIMEOUT, "script execution was interrupted")
        }
        EvalAltResult::ErrorRuntime(value, _) => {
            ScriptError::eval(restore_attribute_references(&value.to_string()))
        }
        other => ScriptError::eval(restore_attribute_references(&other.to_string())),
    }
}

/// Idle environments ready for reuse. Acquiring never blocks: an empty pool creates a new
/// environment, and releases beyond `max_idle` drop the environment.
pub struct EnvironmentPool {
    idle: Mutex<Vec<Environment>>,
    max_idle: usize,
    created: AtomicUsize,
    rng: Arc<ScriptRng>,
    method_names: Vec<String>,
    limits: ScriptLimits,
}

impl EnvironmentPool {
    pub fn new(
        max_idle: usize,
        rng: Arc<ScriptRng>,
        method_names: Vec<String>,
        limits: ScriptLimits,
    ) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            max_idle,
            created: AtomicUsize::new(0),
            rng,
            method_names,
            limits,
        }
    }

    pub fn acquire(&self) -> EnvironmentLease<'_> {
        let reused = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        let environment = match reused {
            Some(environment) => environment,
            None => {
                let created = self.created.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::debug!(created, "creating script environment");
                Environment::new(&self.rng, &self.method_names, &self.limits)
            }
        };
        EnvironmentLease {
            pool: self,
            environment: Some(environment),
        }
    }

    fn release(&self, environment: Environment) {
        environment.reset();
        debug_assert!(environment.is_clean());
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < self.max_idle {
            idle.push(environment);
        }
    }

    pub fn idle(&self) -> usize {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Environments created over the pool's lifetime.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    pub fn max_idle(&self) -> usize {
        self.max_idle
    }
}

/// Exclusive use of one environment; returns it to the pool, reset, when dropped.
pub struct EnvironmentLease<'a> {
    pool: &'a EnvironmentPool,
    environment: Option<Environment>,
}

impl Deref for EnvironmentLease<'_> {
    type Target = Environment;

    fn deref(&self) -> &Environment {
        match &self.environment {
            Some(environment) => environment,
            None => unreachable!("environment is present until the lease drops"),
        }
    }
}

impl Drop for EnvironmentLease<'_> {
    fn drop(&mut self) {
        if let Some(environment) = self.environment.take() {
            self.pool.release(environment);
        }
    }
}

#[cfg(test)]
mod pool_tests {
    use super::*;

    fn pool(max_idle: usize) -> EnvironmentPool {
        EnvironmentPool::new(
            max_idle,
            Arc::new(ScriptRng::new(Some(1))),
            Vec::new(),
            ScriptLimits::default(),
        )
    }

    #[test]
    fn leases_are_reused_and_capped() {
        let pool = pool(1);
        {
            let first = pool.acquire();
            let second = pool.acquire();
            assert!(!Arc::ptr_eq(&first.interrupt_flag(), &second.interrupt_flag()));
        }
        assert_eq!(pool.created(), 2);
        assert_eq!(pool.idle(), 1);

        let _again = pool.acquire();
        assert_eq!(pool.created(), 2);
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn run_binds_eager_and_lazy_values() {
        let pool = pool(2);
        let environment = pool.acquire();
        let program = environment
            .engine()
            .compile("base + extra")
            .expect("compile should pass");
        let value = environment
            .run(
                &program,
                &[
                    ScriptArg::value("base", Dynamic::from_int(2)),
                    ScriptArg::lazy("extra", |_engine| Dynamic::from_int(5)),
                ],
            )
            .expect("run should pass");
        assert_eq!(value.as_int(), Ok(7));
    }

    #[test]
    fn released_environment_is_reset() {
        let pool = pool(2);
        {
            let environment = pool.acquire();
            environment.interrupt_flag().store(true, Ordering::SeqCst);
        }
        let environment = pool.acquire();
        assert!(environment.is_clean());
        let program = environment
            .engine()
            .compile("40 + 2")
            .expect("compile should pass");
        let value = environment.run(&program, &[]).expect("run should pass");
        assert_eq!(value.as_int(), Ok(42));
    }

    #[test]
    fn raised_flag_terminates_with_timeout_code() {
        let pool = pool(1);
        let environment = pool.acquire();
        environment.interrupt_flag().store(true, Ordering::SeqCst);
        let program = environment
            .engine()
            .compile("let x = 0; loop { x += 1; }")
            .expect("compile should pass");
        let error = environment.run(&program, &[]).expect_err("run should stop");
        assert!(error.is_timeout());
    }

    #[test]
    fn string_growth_stops_at_the_size_limit() {
        let pool = EnvironmentPool::new(
            1,
            Arc::new(ScriptRng::new(Some(1))),
            Vec::new(),
            ScriptLimits {
                max_string_size: 1_024,
                ..ScriptLimits::default()
            },
        );
        let environment = pool.acquire();
        let program = environment
            .engine()
            .compile(r#"let s = "xxxxxxxx"; loop { s += s; }"#)
            .expect("compile should pass");
        let error = environment.run(&program, &[]).expect_err("growth should stop");
        assert!(!error.is_timeout());
        assert_eq!(error.code, cs_core::error::CODE_EVAL);
    }
}

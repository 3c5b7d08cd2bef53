use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use regex::{Captures, Regex};
use rhai::Dynamic;
use serde::{Deserialize, Serialize};

use cs_core::{
    format_number, parse_number, ScriptError, ScriptLimits, ScriptSettings, Weight, WeightUnit,
};

use crate::binder::{LazyProvider, ScriptArg};
use crate::depth::{DepthGuard, DepthScope, DEFAULT_MAX_DEPTH, DEPTH_EXCEEDED_MESSAGE};
use crate::helpers::rhai_bridge::dynamic_to_text;
use crate::object::ScriptObject;
use crate::pool::{EnvironmentPool, DEFAULT_MAX_IDLE};
use crate::program_cache::ProgramCache;
use crate::result_cache::{ResolveCache, ResolveCacheKey};
use crate::rng::ScriptRng;
use crate::supervisor::TimeoutSupervisor;

/// Host object that scripts reach through the `entity` binding and whose attributes appear as
/// `$id` variables.
pub trait ScriptEntity: Send + Sync {
    /// Per-entity result cache. The owner clears it whenever its data changes.
    fn resolve_cache(&self) -> &ResolveCache;

    fn script_object(self: Arc<Self>) -> ScriptObject;

    /// One lazily materialized `$id` binding per active attribute.
    fn attribute_args(self: Arc<Self>) -> Vec<ScriptArg>;
}

pub type EntityRef = Arc<dyn ScriptEntity>;

pub type AbsentEntityFactory = Arc<dyn Fn() -> ScriptObject + Send + Sync>;

/// The object a script sees as `self`, with the id used to key cached results.
#[derive(Clone, Default)]
pub struct ScriptSelfProvider {
    pub id: String,
    pub provider: Option<LazyProvider>,
}

impl ScriptSelfProvider {
    pub fn new<F>(id: impl Into<String>, provider: F) -> Self
    where
        F: Fn() -> Dynamic + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            provider: Some(Arc::new(move |_engine| provider())),
        }
    }

    /// Cache id: empty when there is nothing to bind.
    pub fn resolve_id(&self) -> &str {
        if self.provider.is_some() {
            &self.id
        } else {
            ""
        }
    }
}

impl fmt::Debug for ScriptSelfProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptSelfProvider")
            .field("id", &self.id)
            .field("bound", &self.provider.is_some())
            .finish()
    }
}

/// Markers around embedded scripts in text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptDelimiters {
    pub start: String,
    pub end: String,
}

impl Default for ScriptDelimiters {
    fn default() -> Self {
        Self {
            start: "<script>".to_string(),
            end: "</script>".to_string(),
        }
    }
}

impl ScriptDelimiters {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    fn pattern(&self) -> Result<Regex, ScriptError> {
        if self.start.is_empty() || self.end.is_empty() {
            return Err(ScriptError::new(
                cs_core::error::CODE_BINDING,
                "script delimiters must not be empty",
            ));
        }
        Regex::new(&format!(
            "(?s){}(.*?){}",
            regex::escape(&self.start),
            regex::escape(&self.end)
        ))
        .map_err(|error| ScriptError::new(cs_core::error::CODE_BINDING, error.to_string()))
    }
}

#[derive(Clone)]
pub struct ResolverOptions {
    pub settings: ScriptSettings,
    /// Engine ceilings for pooled environments and for the program cache built here. An
    /// injected cache keeps its own.
    pub limits: ScriptLimits,
    pub program_cache: Option<Arc<ProgramCache>>,
    pub global_cache: Option<Arc<ResolveCache>>,
    pub max_idle_environments: usize,
    pub max_depth: usize,
    pub depth_scope: DepthScope,
    pub random_seed: Option<u32>,
    pub delimiters: ScriptDelimiters,
    pub absent_entity: Option<AbsentEntityFactory>,
    /// Method names dispatched on bridged objects.
    pub method_names: Vec<String>,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            settings: ScriptSettings::default(),
            limits: ScriptLimits::default(),
            program_cache: None,
            global_cache: None,
            max_idle_environments: DEFAULT_MAX_IDLE,
            max_depth: DEFAULT_MAX_DEPTH,
            depth_scope: DepthScope::default(),
            random_seed: None,
            delimiters: ScriptDelimiters::default(),
            absent_entity: None,
            method_names: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResolverStats {
    pub compilations: usize,
    pub executions: usize,
    pub timeouts: usize,
    pub environments_created: usize,
    pub idle_environments: usize,
}

/// Resolves script text against an optional entity and `self`, caching results and turning
/// every failure into a diagnostic string.
pub struct ScriptResolver {
    settings: RwLock<ScriptSettings>,
    programs: Arc<ProgramCache>,
    global_cache: Arc<ResolveCache>,
    pool: EnvironmentPool,
    supervisor: TimeoutSupervisor,
    depth: DepthGuard,
    embedded: Regex,
    delimiters: ScriptDelimiters,
    absent_entity: Option<AbsentEntityFactory>,
    executions: AtomicUsize,
    timeouts: AtomicUsize,
}

impl ScriptResolver {
    pub fn new(options: ResolverOptions) -> Result<Self, ScriptError> {
        let embedded = options.delimiters.pattern()?;
        let mut settings = options.settings;
        settings.validate();
        let rng = Arc::new(ScriptRng::new(options.random_seed));

        Ok(Self {
            settings: RwLock::new(settings),
            programs: options
                .program_cache
                .unwrap_or_else(|| Arc::new(ProgramCache::with_limits(options.limits))),
            global_cache: options.global_cache.unwrap_or_default(),
            pool: EnvironmentPool::new(
                options.max_idle_environments,
                rng,
                options.method_names,
                options.limits,
            ),
            supervisor: TimeoutSupervisor::new(),
            depth: DepthGuard::new(options.max_depth, options.depth_scope),
            embedded,
            delimiters: options.delimiters,
            absent_entity: options.absent_entity,
            executions: AtomicUsize::new(0),
            timeouts: AtomicUsize::new(0),
        })
    }

    pub fn settings(&self) -> ScriptSettings {
        *self.settings.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the settings; the next top-level invocation picks up the new time limit.
    pub fn set_settings(&self, mut settings: ScriptSettings) {
        settings.validate();
        *self
            .settings
            .write()
            .unwrap_or_else(PoisonError::into_inner) = settings;
    }

    pub fn program_cache(&self) -> &Arc<ProgramCache> {
        &self.programs
    }

    pub fn global_cache(&self) -> &Arc<ResolveCache> {
        &self.global_cache
    }

    pub fn clear_global_cache(&self) {
        self.global_cache.clear();
    }

    pub fn delimiters(&self) -> &ScriptDelimiters {
        &self.delimiters
    }

    pub fn pool(&self) -> &EnvironmentPool {
        &self.pool
    }

    pub fn stats(&self) -> ResolverStats {
        ResolverStats {
            compilations: self.programs.compilations(),
            executions: self.executions.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            environments_created: self.pool.created(),
            idle_environments: self.pool.idle(),
        }
    }

    /// Runs one program in a pooled environment. A zero timeout runs without a deadline.
    pub fn run_script(
        &self,
        timeout: Duration,
        text: &str,
        args: &[ScriptArg],
    ) -> Result<Dynamic, ScriptError> {
        let program = self.programs.compile(text)?;
        let environment = self.pool.acquire();
        let _deadline = self.supervisor.arm(timeout, environment.interrupt_flag());
        self.executions.fetch_add(1, Ordering::Relaxed);
        environment.run(&program, args)
    }

    /// Resolves `text` to its display string. Never fails: errors, timeouts and depth trips come
    /// back as diagnostic strings, and every outcome is cached under (self id, text).
    pub fn resolve_script(
        &self,
        entity: Option<&EntityRef>,
        self_provider: Option<&ScriptSelfProvider>,
        text: &str,
    ) -> String {
        let depth = self.depth.enter();
        if depth.exceeded() {
            tracing::warn!(depth = depth.depth(), script = text, "script resolution depth exceeded");
            return DEPTH_EXCEEDED_MESSAGE.to_string();
        }

        let cache = match entity {
            Some(entity) => entity.resolve_cache(),
            None => self.global_cache.as_ref(),
        };
        let key = ResolveCacheKey::new(
            self_provider.map(ScriptSelfProvider::resolve_id).unwrap_or_default(),
            text,
        );
        if let Some(cached) = cache.get(&key) {
            return cached;
        }
        tracing::debug!(id = %key.id, script = text, "resolving script");

        let settings = self.settings();
        let args = self.standard_args(entity, self_provider);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.run_script(settings.timeout(), text, &args)
        }))
        .unwrap_or_else(|payload| Err(ScriptError::eval(panic_message(payload.as_ref()))));

        let result = match outcome {
            Ok(value) => dynamic_to_text(&value),
            Err(error) if error.is_timeout() => {
                self.timeouts.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    limit = settings.permitted_per_script_exec_time,
                    script = text,
                    "script execution timed out"
                );
                format!(
                    "script execution timed out (limited to {} seconds)",
                    format_number(settings.permitted_per_script_exec_time)
                )
            }
            Err(error) => {
                tracing::debug!(code = %error.code, %error, script = text, "script failed");
                error.to_string()
            }
        };
        cache.insert_if_absent(key, result)
    }

    /// Replaces every delimited span of `text` with its resolved result.
    pub fn resolve_text(
        &self,
        entity: Option<&EntityRef>,
        self_provider: Option<&ScriptSelfProvider>,
        text: &str,
    ) -> String {
        if !text.contains(&self.delimiters.start) {
            return text.to_string();
        }
        self.embedded
            .replace_all(text, |captures: &Captures<'_>| {
                self.resolve_script(entity, self_provider, &captures[1])
            })
            .into_owned()
    }

    /// Resolves `text` to a number: blank is 0, a plain literal is taken as-is, anything else is
    /// run as a script whose result must parse as a number (0 and a logged error otherwise).
    pub fn resolve_to_number(
        &self,
        entity: Option<&EntityRef>,
        self_provider: Option<&ScriptSelfProvider>,
        text: &str,
    ) -> f64 {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return 0.0;
        }
        if let Ok(value) = parse_number(trimmed) {
            return value;
        }
        let result = self.resolve_script(entity, self_provider, text);
        match parse_number(&result) {
            Ok(value) => value,
            Err(_) => {
                tracing::error!(result = %result, script = text, "unable to resolve script result to a number");
                0.0
            }
        }
    }

    pub fn resolve_to_weight(
        &self,
        entity: Option<&EntityRef>,
        self_provider: Option<&ScriptSelfProvider>,
        text: &str,
        default_unit: WeightUnit,
    ) -> Weight {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Weight::default();
        }
        if let Ok(weight) = Weight::parse(trimmed, default_unit) {
            return weight;
        }
        let result = self.resolve_script(entity, self_provider, text);
        match Weight::parse(&result, default_unit) {
            Ok(weight) => weight,
            Err(_) => {
                tracing::error!(result = %result, script = text, "unable to resolve script result to a weight");
                Weight::default()
            }
        }
    }

    fn standard_args(
        &self,
        entity: Option<&EntityRef>,
        self_provider: Option<&ScriptSelfProvider>,
    ) -> Vec<ScriptArg> {
        let mut args = Vec::new();
        match entity {
            Some(entity) => {
                let entity = Arc::clone(entity);
                args.push(ScriptArg::lazy("entity", move |_engine| {
                    Dynamic::from(Arc::clone(&entity).script_object())
                }));
            }
            None => {
                let factory = self.absent_entity.clone();
                args.push(ScriptArg::lazy("entity", move |_engine| {
                    let object = match &factory {
                        Some(factory) => factory(),
                        None => ScriptObject::absent_entity(),
                    };
                    Dynamic::from(object)
                }));
            }
        }
        if let Some(provider) = self_provider.and_then(|provider| provider.provider.clone()) {
            args.push(ScriptArg::from_provider("self", provider));
        }
        if let Some(entity) = entity {
            args.extend(Arc::clone(entity).attribute_args());
        }
        args
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|text| text.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("script panicked: {}", detail)
}

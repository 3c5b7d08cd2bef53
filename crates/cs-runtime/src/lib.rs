//! Script resolution runtime: compiled-program cache, pooled Rhai environments with lazy
//! bindings and a watchdog-enforced time limit, a nesting guard, and the two-tier result cache
//! behind the text/number/weight resolvers.

mod binder;
mod builtins;
mod depth;
mod helpers;
mod object;
mod pool;
mod program_cache;
mod result_cache;
mod resolver;
mod rng;
mod supervisor;

pub use binder::{ArgValue, LazyProvider, ScriptArg};
pub use builtins::{ScriptConsole, ScriptDice, ScriptMath, ScriptMeasure};
pub use depth::{DepthGuard, DepthScope, DepthToken, DEFAULT_MAX_DEPTH, DEPTH_EXCEEDED_MESSAGE};
pub use helpers::rhai_bridge::{
    count_to_dynamic, dynamic_to_number, dynamic_to_text, is_truthy, number_to_dynamic,
    text_to_dynamic,
};
pub use object::{
    normalize_property_name, number_arg, optional_number_arg, text_arg, MethodFn, NumericFn,
    PropertyFn, ScriptObject, ScriptObjectBuilder, MAX_METHOD_ARITY,
};
pub use pool::{Environment, EnvironmentLease, EnvironmentPool, DEFAULT_MAX_IDLE};
pub use program_cache::ProgramCache;
pub use resolver::{
    AbsentEntityFactory, EntityRef, ResolverOptions, ResolverStats, ScriptDelimiters,
    ScriptEntity, ScriptResolver, ScriptSelfProvider,
};
pub use result_cache::{ResolveCache, ResolveCacheKey};
pub use rng::ScriptRng;
pub use supervisor::{TimeoutGuard, TimeoutSupervisor};

pub use rhai;

pub mod bridge;
pub mod damage;
pub mod entity;
pub mod names;
pub mod random;
pub mod sheet;
pub mod tree;

use std::sync::Arc;

use cs_core::ScriptError;
use cs_runtime::{ResolverOptions, ScriptResolver, ScriptRng};

pub use entity::{EquippedWeapon, Entity, SkillLevel};
pub use sheet::{
    AttributeDef, AttributeKind, AttributeState, Difficulty, DifficultyLevel, EquipmentModifierNode,
    EquipmentNode, Feature, ModifierCostType, PoolThreshold, Profile, Sheet, SheetSettings,
    SkillNode, SpellNode, StrengthDamage, StrengthLimitation, TraitModifierNode, TraitNode,
    WeaponData, WeaponDamageData, WeaponKind,
};

/// Resolver options wired for character sheets: the bridge's method names and an absent
/// entity that still offers the random generation helpers.
pub fn resolver_options(random_seed: Option<u32>) -> ResolverOptions {
    let rng = Arc::new(ScriptRng::new(random_seed));
    ResolverOptions {
        random_seed,
        method_names: bridge::method_names(),
        absent_entity: Some(Arc::new(move || bridge::absent_entity_object(&rng))),
        ..ResolverOptions::default()
    }
}

pub fn create_resolver(options: ResolverOptions) -> Result<Arc<ScriptResolver>, ScriptError> {
    ScriptResolver::new(options).map(Arc::new)
}

use std::sync::Arc;

use rhai::Dynamic;

use cs_runtime::{number_to_dynamic, ScriptObject};

use crate::entity::{Entity, ENCUMBRANCE_LEVEL_NAMES, ENCUMBRANCE_MULTIPLIERS};

/// Movement multiplier at an encumbrance level: 1.0, 0.8, 0.6, 0.4, 0.2.
pub fn move_factor(level: usize) -> f64 {
    1.0 - level as f64 * 2.0 / 10.0
}

/// Snapshot of the entity's load, taken when the object is built.
pub fn encumbrance_object(entity: &Arc<Entity>) -> ScriptObject {
    let level = entity.encumbrance_level(false);
    let for_skills = entity.encumbrance_level(true);
    let maximum_carry = (0..ENCUMBRANCE_MULTIPLIERS.len())
        .map(|level| number_to_dynamic(entity.maximum_carry(level)))
        .collect::<rhai::Array>();

    ScriptObject::builder("encumbrance")
        .value("level", Dynamic::from_int(level as rhai::INT))
        .value("level_for_skills", Dynamic::from_int(for_skills as rhai::INT))
        .value("basic_lift", number_to_dynamic(entity.basic_lift()))
        .value("weight_carried", number_to_dynamic(entity.weight_carried(false)))
        .value("maximum_carry", Dynamic::from_array(maximum_carry))
        .value("penalty", Dynamic::from_int(-(for_skills as rhai::INT)))
        .value("move_factor", number_to_dynamic(move_factor(level)))
        .display(ENCUMBRANCE_LEVEL_NAMES[level])
        .build()
}

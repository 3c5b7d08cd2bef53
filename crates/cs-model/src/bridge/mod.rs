//! Script-facing views of the sheet. Every object holds only a weak handle to its entity, so
//! proxies kept alive by a script never keep the entity alive.

mod attribute;
mod encumbrance;
mod entity;
mod nodes;
mod weapon;

use std::sync::{Arc, Weak};

use rhai::{Array, Dynamic};

use cs_runtime::{dynamic_to_text, is_truthy, text_to_dynamic, ScriptObject};

use crate::entity::Entity;
use crate::names::{name_matches, tag_matches};
use crate::tree::{traverse, TreeNode};

pub use attribute::attribute_object;
pub use encumbrance::encumbrance_object;
pub use entity::{absent_entity_object, entity_object};
pub use nodes::{
    equipment_modifier_object, equipment_object, skill_object, spell_object, trait_modifier_object,
    trait_object,
};
pub use weapon::weapon_object;

/// Every method name a bridged object answers to.
pub const METHOD_NAMES: &[&str] = &[
    "attribute",
    "currentEncumbrance",
    "find",
    "findEquipment",
    "findSkills",
    "findSpells",
    "findTraits",
    "findWeapons",
    "hasTrait",
    "randomHeightInInches",
    "randomWeightInPounds",
    "skillLevel",
    "traitLevel",
    "weaponDamage",
];

pub fn method_names() -> Vec<String> {
    METHOD_NAMES.iter().map(|name| name.to_string()).collect()
}

/// Computes a value from the live entity, or falls back to `()` once it is gone.
pub(crate) fn with_entity<F>(entity: &Weak<Entity>, compute: F) -> Dynamic
where
    F: FnOnce(&Arc<Entity>) -> Dynamic,
{
    match entity.upgrade() {
        Some(entity) => compute(&entity),
        None => Dynamic::UNIT,
    }
}

pub(crate) fn text_array(items: &[String]) -> Dynamic {
    Dynamic::from_array(items.iter().map(|item| text_to_dynamic(item.as_str())).collect())
}

pub(crate) fn object_array(objects: impl IntoIterator<Item = ScriptObject>) -> Dynamic {
    Dynamic::from_array(objects.into_iter().map(Dynamic::from).collect::<Array>())
}

pub(crate) fn bool_arg(args: &[Dynamic], index: usize) -> bool {
    args.get(index).map(is_truthy).unwrap_or(false)
}

pub(crate) fn trimmed_arg(args: &[Dynamic], index: usize) -> String {
    args.get(index)
        .map(|value| {
            if value.is_unit() {
                String::new()
            } else {
                dynamic_to_text(value).trim().to_string()
            }
        })
        .unwrap_or_default()
}

/// Nodes anywhere in `nodes` whose name (and optional extra field) and tag match.
pub(crate) fn find_nodes<T: TreeNode>(
    nodes: &[Arc<T>],
    name: &str,
    tag: &str,
    mut extra: impl FnMut(&T) -> bool,
) -> Vec<Arc<T>> {
    let mut found = Vec::new();
    traverse(nodes, false, false, &mut |node| {
        if name_matches(name, &node.name_with_replacements())
            && tag_matches(tag, node.tags())
            && extra(node)
        {
            found.push(Arc::clone(node));
        }
        false
    });
    found
}

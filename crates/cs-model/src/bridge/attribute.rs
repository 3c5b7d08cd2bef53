use std::sync::Arc;

use rhai::Dynamic;

use cs_runtime::{number_to_dynamic, text_to_dynamic, ScriptObject};

use super::with_entity;
use crate::entity::Entity;

/// Script view of attribute `id`. Its numeric reading is the current value, so `$st * 2`
/// works directly.
pub fn attribute_object(entity: &Arc<Entity>, id: &str) -> ScriptObject {
    let sheet = entity.sheet();
    let Some(def) = sheet.attribute_def(id) else {
        return ScriptObject::builder("attribute").display(id).build();
    };
    let me = Arc::downgrade(entity);
    let attr_id = def.id.clone();

    let numeric = {
        let me = me.clone();
        let attr_id = attr_id.clone();
        move || me.upgrade().map(|entity| entity.attribute_current(&attr_id))
    };
    let maximum = {
        let me = me.clone();
        let attr_id = attr_id.clone();
        move || with_entity(&me, |entity| number_to_dynamic(entity.attribute_maximum(&attr_id)))
    };
    let current = {
        let me = me.clone();
        let attr_id = attr_id.clone();
        move || with_entity(&me, |entity| number_to_dynamic(entity.attribute_current(&attr_id)))
    };
    let damage = {
        let me = me.clone();
        let attr_id = attr_id.clone();
        move || with_entity(&me, |entity| number_to_dynamic(entity.attribute_damage(&attr_id)))
    };
    let points = {
        let me = me.clone();
        let attr_id = attr_id.clone();
        move || with_entity(&me, |entity| number_to_dynamic(entity.attribute_points(&attr_id)))
    };
    let threshold = move || {
        with_entity(&me, |entity| match entity.current_threshold(&attr_id) {
            Some(threshold) => text_to_dynamic(threshold.state),
            None => Dynamic::UNIT,
        })
    };

    ScriptObject::builder("attribute")
        .text("id", def.id.as_str())
        .text("name", def.name.as_str())
        .text("full_name", def.display_full_name())
        .text("kind", def.kind.key())
        .value("is_pool", Dynamic::from(def.kind.is_pool()))
        .value("is_decimal", Dynamic::from(def.kind.is_decimal()))
        .property("maximum", maximum)
        .property("current", current)
        .property("damage", damage)
        .property("points", points)
        .property("current_threshold", threshold)
        .numeric(numeric)
        .display(def.name.clone())
        .build()
}

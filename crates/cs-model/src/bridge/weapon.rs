use std::sync::Arc;

use rhai::Dynamic;

use cs_runtime::{text_to_dynamic, ScriptObject};

use super::with_entity;
use crate::entity::{EquippedWeapon, Entity};
use crate::sheet::WeaponKind;

pub fn weapon_object(entity: &Arc<Entity>, equipped: &EquippedWeapon) -> ScriptObject {
    let weapon = &equipped.weapon;
    let damage = {
        let me = Arc::downgrade(entity);
        let data = weapon.damage.clone();
        move || with_entity(&me, |entity| text_to_dynamic(entity.resolved_damage(&data)))
    };

    ScriptObject::builder("weapon")
        .text("id", weapon.id.as_str())
        .text("parentID", equipped.owner_id.as_str())
        .text("name", equipped.owner_name.as_str())
        .text("usage", weapon.usage.as_str())
        .text("usage_notes", weapon.usage_notes.as_str())
        .value("is_melee", Dynamic::from(weapon.kind == WeaponKind::Melee))
        .value("is_ranged", Dynamic::from(weapon.kind == WeaponKind::Ranged))
        .property("damage", damage)
        .text("strength", weapon.strength.as_str())
        .text("reach", weapon.reach.as_str())
        .text("parry", weapon.parry.as_str())
        .text("block", weapon.block.as_str())
        .text("accuracy", weapon.accuracy.as_str())
        .text("range", weapon.range.as_str())
        .text("rate_of_fire", weapon.rate_of_fire.as_str())
        .text("shots", weapon.shots.as_str())
        .text("bulk", weapon.bulk.as_str())
        .text("recoil", weapon.recoil.as_str())
        .display(format!("{} ({})", equipped.owner_name, weapon.usage))
        .build()
}

use std::sync::{Arc, Weak};

use rhai::Dynamic;

use cs_runtime::{
    number_arg, number_to_dynamic, optional_number_arg, text_to_dynamic, ScriptObject, ScriptRng,
};

use super::{
    attribute_object, bool_arg, encumbrance_object, equipment_object, find_nodes, object_array,
    skill_object, spell_object, trait_object, trimmed_arg, weapon_object,
};
use crate::bridge::encumbrance::move_factor;
use crate::entity::Entity;
use crate::names::{apply_replacements, name_matches};
use crate::random::{random_height_in_inches, random_weight_in_pounds, BuildTraits};
use crate::sheet::WeaponKind;

type EntityMethod = fn(&Arc<Entity>, &[Dynamic]) -> Result<Dynamic, String>;

fn bound(
    me: &Weak<Entity>,
    method: EntityMethod,
) -> impl Fn(&[Dynamic]) -> Result<Dynamic, String> + Send + Sync + 'static {
    let me = me.clone();
    move |args: &[Dynamic]| match me.upgrade() {
        Some(entity) => method(&entity, args),
        None => Ok(Dynamic::UNIT),
    }
}

fn computed(
    me: &Weak<Entity>,
    compute: fn(&Arc<Entity>) -> Dynamic,
) -> impl Fn() -> Dynamic + Send + Sync + 'static {
    let me = me.clone();
    move || super::with_entity(&me, compute)
}

fn int(value: f64) -> Dynamic {
    Dynamic::from_int(value as rhai::INT)
}

pub fn entity_object(entity: &Arc<Entity>) -> ScriptObject {
    let sheet = entity.sheet();
    let profile = &sheet.profile;
    let me = Arc::downgrade(entity);

    ScriptObject::builder("entity")
        .value("exists", Dynamic::TRUE)
        .text("player_name", profile.player_name.as_str())
        .text("name", profile.name.as_str())
        .text("title", profile.title.as_str())
        .text("organization", profile.organization.as_str())
        .text("religion", profile.religion.as_str())
        .text("tech_level", profile.tech_level.as_str())
        .text("gender", profile.gender.as_str())
        .text("age", profile.age.as_str())
        .text("birthday", profile.birthday.as_str())
        .text("eyes", profile.eyes.as_str())
        .text("hair", profile.hair.as_str())
        .text("skin", profile.skin.as_str())
        .text("handedness", profile.handedness.as_str())
        .property("height_in_inches", computed(&me, |entity| {
            number_to_dynamic(entity.height_in_inches())
        }))
        .property("weight_in_pounds", computed(&me, |entity| {
            number_to_dynamic(entity.weight_in_pounds())
        }))
        .text("display_height_units", sheet.settings.default_length_units.key())
        .text("display_weight_units", sheet.settings.default_weight_units.key())
        .value(
            "size_modifier",
            Dynamic::from_int(profile.adjusted_size_modifier() as rhai::INT),
        )
        .property("lifting_strength", computed(&me, |entity| int(entity.lifting_strength())))
        .property("striking_strength", computed(&me, |entity| int(entity.striking_strength())))
        .property("throwing_strength", computed(&me, |entity| int(entity.throwing_strength())))
        .value(
            "extra_dice_from_modifiers",
            Dynamic::from(sheet.settings.use_modifying_dice_plus_adds),
        )
        .property("attributes", computed(&me, |entity| {
            let sheet = entity.sheet();
            object_array(
                sheet
                    .attribute_defs
                    .iter()
                    .filter(|def| !def.kind.is_separator())
                    .map(|def| attribute_object(entity, &def.id)),
            )
        }))
        .property("encumbrance", computed(&me, |entity| {
            Dynamic::from(encumbrance_object(entity))
        }))
        .property("equipment", computed(&me, |entity| {
            object_array(
                entity
                    .sheet()
                    .equipment
                    .iter()
                    .filter(|item| item.quantity > 0.0)
                    .map(|item| equipment_object(entity, item)),
            )
        }))
        .property("skills", computed(&me, |entity| {
            object_array(entity.sheet().skills.iter().map(|skill| skill_object(entity, skill)))
        }))
        .property("spells", computed(&me, |entity| {
            object_array(entity.sheet().spells.iter().map(|spell| spell_object(entity, spell)))
        }))
        .property("traits", computed(&me, |entity| {
            object_array(
                entity
                    .sheet()
                    .traits
                    .iter()
                    .filter(|node| !node.disabled)
                    .map(|node| trait_object(entity, node)),
            )
        }))
        .property("weapons", computed(&me, |entity| {
            object_array(
                [WeaponKind::Melee, WeaponKind::Ranged]
                    .into_iter()
                    .flat_map(|kind| entity.equipped_weapons(kind))
                    .map(|weapon| weapon_object(entity, &weapon)),
            )
        }))
        .method("attribute", bound(&me, |entity, args| {
            let id = trimmed_arg(args, 0);
            Ok(match entity.sheet().attribute_def(&id) {
                Some(_) => Dynamic::from(attribute_object(entity, &id)),
                None => Dynamic::UNIT,
            })
        }))
        .method("current_encumbrance", bound(&me, |entity, args| {
            let level = entity.encumbrance_level(bool_arg(args, 0));
            Ok(if bool_arg(args, 1) {
                number_to_dynamic(move_factor(level))
            } else {
                Dynamic::from_int(level as rhai::INT)
            })
        }))
        .method("find_equipment", bound(&me, |entity, args| {
            let sheet = entity.sheet();
            let found = find_nodes(&sheet.equipment, &trimmed_arg(args, 0), &trimmed_arg(args, 1), |item| {
                item.quantity > 0.0
            });
            Ok(object_array(found.iter().map(|item| equipment_object(entity, item))))
        }))
        .method("find_skills", bound(&me, |entity, args| {
            let sheet = entity.sheet();
            let specialization = trimmed_arg(args, 1);
            let found = find_nodes(&sheet.skills, &trimmed_arg(args, 0), &trimmed_arg(args, 2), |skill| {
                name_matches(
                    &specialization,
                    &apply_replacements(&skill.specialization, &skill.replacements),
                )
            });
            Ok(object_array(found.iter().map(|skill| skill_object(entity, skill))))
        }))
        .method("find_spells", bound(&me, |entity, args| {
            let sheet = entity.sheet();
            let found = find_nodes(&sheet.spells, &trimmed_arg(args, 0), &trimmed_arg(args, 1), |_| true);
            Ok(object_array(found.iter().map(|spell| spell_object(entity, spell))))
        }))
        .method("find_traits", bound(&me, |entity, args| {
            let sheet = entity.sheet();
            let found = find_nodes(&sheet.traits, &trimmed_arg(args, 0), &trimmed_arg(args, 1), |_| true);
            Ok(object_array(found.iter().map(|node| trait_object(entity, node))))
        }))
        .method("has_trait", bound(&me, |entity, args| {
            Ok(Dynamic::from(entity.has_trait(&trimmed_arg(args, 0))))
        }))
        .method("skill_level", bound(&me, |entity, args| {
            let level = entity.skill_level_by_name(
                &trimmed_arg(args, 0),
                &trimmed_arg(args, 1),
                bool_arg(args, 2),
            );
            Ok(Dynamic::from_int(level as rhai::INT))
        }))
        .method("trait_level", bound(&me, |entity, args| {
            Ok(number_to_dynamic(entity.trait_level(&trimmed_arg(args, 0))))
        }))
        .method("weapon_damage", bound(&me, |entity, args| {
            Ok(entity
                .weapon_damage(&trimmed_arg(args, 0), &trimmed_arg(args, 1))
                .map(text_to_dynamic)
                .unwrap_or(Dynamic::UNIT))
        }))
        .method("find_weapons", bound(&me, |entity, args| {
            let kind = if bool_arg(args, 0) {
                WeaponKind::Melee
            } else {
                WeaponKind::Ranged
            };
            let name = trimmed_arg(args, 1);
            let usage = trimmed_arg(args, 2);
            Ok(object_array(
                entity
                    .equipped_weapons(kind)
                    .iter()
                    .filter(|equipped| {
                        name_matches(&name, &equipped.owner_name)
                            && name_matches(&usage, &equipped.weapon.usage)
                    })
                    .map(|equipped| weapon_object(entity, equipped)),
            ))
        }))
        .method("random_height_in_inches", bound(&me, |entity, args| {
            let st = number_arg(args, 0)? as i64;
            Ok(Dynamic::from_int(entity.random_height_in_inches(st) as rhai::INT))
        }))
        .method("random_weight_in_pounds", bound(&me, |entity, args| {
            let st = number_arg(args, 0)? as i64;
            let shift = optional_number_arg(args, 1).unwrap_or(0.0) as i64;
            Ok(Dynamic::from_int(
                entity.random_weight_in_pounds(st, shift) as rhai::INT,
            ))
        }))
        .display(profile.name.clone())
        .build()
}

/// What scripts see as `entity` when no sheet takes part: only `exists` and the random
/// generation helpers.
pub fn absent_entity_object(rng: &Arc<ScriptRng>) -> ScriptObject {
    let height_rng = Arc::clone(rng);
    let weight_rng = Arc::clone(rng);
    ScriptObject::builder("entity")
        .value("exists", Dynamic::FALSE)
        .method("random_height_in_inches", move |args| {
            let st = number_arg(args, 0)? as i64;
            Ok(Dynamic::from_int(random_height_in_inches(st, &height_rng) as rhai::INT))
        })
        .method("random_weight_in_pounds", move |args| {
            let st = number_arg(args, 0)? as i64;
            let shift = optional_number_arg(args, 1).unwrap_or(0.0) as i64;
            Ok(Dynamic::from_int(
                random_weight_in_pounds(st, shift, BuildTraits::default(), &weight_rng) as rhai::INT,
            ))
        })
        .display("no entity")
        .build()
}

use std::sync::{Arc, Weak};

use rhai::Dynamic;

use cs_runtime::{number_to_dynamic, text_to_dynamic, ScriptObject, ScriptObjectBuilder};

use super::{find_nodes, object_array, text_array, trimmed_arg, weapon_object, with_entity};
use crate::entity::{EquippedWeapon, Entity};
use crate::names::{apply_replacements, name_matches};
use crate::sheet::{
    EquipmentModifierNode, EquipmentNode, SkillNode, SpellNode, TraitModifierNode, TraitNode,
    WeaponData,
};
use crate::tree::{find_parent, TreeNode};

type Roots<T> = Arc<dyn Fn(&Entity) -> Vec<Arc<T>> + Send + Sync>;
type Bridge<T> = Arc<dyn Fn(&Arc<Entity>, &Arc<T>) -> ScriptObject + Send + Sync>;

/// Where a node lives and how its relatives are bridged.
struct NodeContext<T> {
    entity: Weak<Entity>,
    roots: Roots<T>,
    bridge: Bridge<T>,
}

impl<T> Clone for NodeContext<T> {
    fn clone(&self) -> Self {
        Self {
            entity: self.entity.clone(),
            roots: Arc::clone(&self.roots),
            bridge: Arc::clone(&self.bridge),
        }
    }
}

impl<T: TreeNode + Send + Sync + 'static> NodeContext<T> {
    fn parent(&self, entity: &Entity, id: &str) -> Option<Arc<T>> {
        find_parent(&(self.roots)(entity), id)
    }

    fn objects(&self, nodes: &[Arc<T>]) -> Dynamic {
        with_entity(&self.entity, |entity| {
            object_array(nodes.iter().map(|node| (self.bridge)(entity, node)))
        })
    }

    /// Properties every tree node shares.
    fn builder(&self, kind: &'static str, node: &Arc<T>) -> ScriptObjectBuilder {
        let parent_id = {
            let context = self.clone();
            let id = node.node_id().to_string();
            move || {
                with_entity(&context.entity, |entity| {
                    let parent = context.parent(entity, &id);
                    text_to_dynamic(parent.map(|parent| parent.node_id().to_string()).unwrap_or_default())
                })
            }
        };
        let parent = {
            let context = self.clone();
            let id = node.node_id().to_string();
            move || {
                with_entity(&context.entity, |entity| match context.parent(entity, &id) {
                    Some(parent) => Dynamic::from((context.bridge)(entity, &parent)),
                    None => Dynamic::UNIT,
                })
            }
        };
        let children = {
            let context = self.clone();
            let node = Arc::clone(node);
            move || context.objects(node.children())
        };
        let name = node.name_with_replacements();

        ScriptObject::builder(kind)
            .text("id", node.node_id())
            .property("parentID", parent_id)
            .property("parent", parent)
            .text("kind", if node.is_container() { container_kind(kind) } else { kind })
            .text("name", name.as_str())
            .value("tags", text_array(node.tags()))
            .value("is_container", Dynamic::from(node.is_container()))
            .value("enabled", Dynamic::from(node.is_enabled()))
            .property("children", children)
            .display(name)
    }

    /// `find(name, tag)` over the node's descendants.
    fn find_method(
        &self,
        node: &Arc<T>,
    ) -> impl Fn(&[Dynamic]) -> Result<Dynamic, String> + Send + Sync + 'static {
        let context = self.clone();
        let node = Arc::clone(node);
        move |args: &[Dynamic]| {
            let found = find_nodes(node.children(), &trimmed_arg(args, 0), &trimmed_arg(args, 1), |_| true);
            Ok(context.objects(&found))
        }
    }
}

fn container_kind(kind: &'static str) -> &'static str {
    match kind {
        "trait" => "trait_container",
        "trait_modifier" => "trait_modifier_container",
        "skill" => "skill_container",
        "spell" => "spell_container",
        "equipment" => "equipment_container",
        "equipment_modifier" => "equipment_modifier_container",
        other => other,
    }
}

fn notes_property(
    entity: &Weak<Entity>,
    notes: &str,
    self_for: impl Fn(&Arc<Entity>) -> cs_runtime::ScriptSelfProvider + Send + Sync + 'static,
) -> impl Fn() -> Dynamic + Send + Sync + 'static {
    let entity = entity.clone();
    let notes = notes.to_string();
    move || {
        with_entity(&entity, |entity| {
            text_to_dynamic(entity.resolved_notes(&self_for(entity), &notes))
        })
    }
}

fn owned_weapons(entity: &Weak<Entity>, owner_id: &str, owner_name: &str, weapons: &[WeaponData]) -> Dynamic {
    with_entity(entity, |entity| {
        object_array(weapons.iter().map(|weapon| {
            weapon_object(
                entity,
                &EquippedWeapon {
                    owner_id: owner_id.to_string(),
                    owner_name: owner_name.to_string(),
                    weapon: weapon.clone(),
                },
            )
        }))
    })
}

// Traits

fn trait_context(entity: &Arc<Entity>) -> NodeContext<TraitNode> {
    NodeContext {
        entity: Arc::downgrade(entity),
        roots: Arc::new(|entity: &Entity| entity.sheet().traits.clone()),
        bridge: Arc::new(trait_object),
    }
}

pub fn trait_object(entity: &Arc<Entity>, node: &Arc<TraitNode>) -> ScriptObject {
    let context = trait_context(entity);
    let me = Arc::downgrade(entity);
    let points = {
        let me = me.clone();
        let node = Arc::clone(node);
        move || with_entity(&me, |entity| number_to_dynamic(entity.trait_points(&node)))
    };
    let modifiers = {
        let me = me.clone();
        let owner = Arc::clone(node);
        move || {
            with_entity(&me, |entity| {
                object_array(
                    owner
                        .modifiers
                        .iter()
                        .map(|modifier| trait_modifier_object(entity, &owner, modifier)),
                )
            })
        }
    };
    let notes = {
        let node = Arc::clone(node);
        notes_property(&me, &node.notes.clone(), move |entity| entity.trait_self(&node))
    };
    let weapons = {
        let me = me.clone();
        let node = Arc::clone(node);
        move || owned_weapons(&me, &node.id, &node.name_with_replacements(), &node.weapons)
    };

    context
        .builder("trait", node)
        .property("notes", notes)
        .value("is_leveled", Dynamic::from(node.levels.is_some()))
        .value(
            "levels",
            number_to_dynamic(Entity::trait_current_level(node)),
        )
        .property("points", points)
        .property("modifiers", modifiers)
        .property("weapons", weapons)
        .method("find", context.find_method(node))
        .build()
}

pub fn trait_modifier_object(
    entity: &Arc<Entity>,
    owner: &Arc<TraitNode>,
    node: &Arc<TraitModifierNode>,
) -> ScriptObject {
    let context = {
        let roots_owner = Arc::clone(owner);
        let bridge_owner = Arc::clone(owner);
        NodeContext {
            entity: Arc::downgrade(entity),
            roots: Arc::new(move |_: &Entity| roots_owner.modifiers.clone()),
            bridge: Arc::new(move |entity: &Arc<Entity>, node: &Arc<TraitModifierNode>| {
                trait_modifier_object(entity, &bridge_owner, node)
            }),
        }
    };
    let notes = {
        let owner = Arc::clone(owner);
        let node = Arc::clone(node);
        notes_property(&Arc::downgrade(entity), &node.notes.clone(), move |entity| {
            let owner = Arc::clone(&owner);
            entity.node_self(&node, move |entity, node| trait_modifier_object(entity, &owner, node))
        })
    };

    context
        .builder("trait_modifier", node)
        .property("notes", notes)
        .value("cost", number_to_dynamic(node.cost))
        .text("cost_type", node.cost_type.key())
        .value("levels", node.levels.map(number_to_dynamic).unwrap_or(Dynamic::UNIT))
        .method("find", context.find_method(node))
        .build()
}

// Skills and spells

pub fn skill_object(entity: &Arc<Entity>, node: &Arc<SkillNode>) -> ScriptObject {
    let context = NodeContext {
        entity: Arc::downgrade(entity),
        roots: Arc::new(|entity: &Entity| entity.sheet().skills.clone()),
        bridge: Arc::new(skill_object),
    };
    let me = Arc::downgrade(entity);
    let specialization = apply_replacements(&node.specialization, &node.replacements);
    let level = {
        let me = me.clone();
        let node = Arc::clone(node);
        let specialization = specialization.clone();
        move |relative: bool| {
            let node = Arc::clone(&node);
            let specialization = specialization.clone();
            let me = me.clone();
            move || {
                with_entity(&me, |entity| {
                    let level = entity.skill_level(
                        &node.difficulty,
                        node.points,
                        &node.name_with_replacements(),
                        &specialization,
                    );
                    number_to_dynamic(if relative { level.relative_level } else { level.level })
                })
            }
        }
    };
    let notes = {
        let node = Arc::clone(node);
        notes_property(&me, &node.notes.clone(), move |entity| entity.node_self(&node, skill_object))
    };
    let find = {
        let context = context.clone();
        let node = Arc::clone(node);
        move |args: &[Dynamic]| {
            let specialization = trimmed_arg(args, 1);
            let found = find_nodes(node.children(), &trimmed_arg(args, 0), &trimmed_arg(args, 2), |skill| {
                name_matches(&specialization, &apply_replacements(&skill.specialization, &skill.replacements))
            });
            Ok(context.objects(&found))
        }
    };

    context
        .builder("skill", node)
        .text("specialization", specialization.as_str())
        .property("notes", notes)
        .text("difficulty", node.difficulty.level.key())
        .text("attribute", node.difficulty.attribute.as_str())
        .value("points", number_to_dynamic(node.points))
        .text("tech_level", node.tech_level.clone().unwrap_or_default())
        .property("level", level(false))
        .property("relative_level", level(true))
        .method("find", find)
        .build()
}

pub fn spell_object(entity: &Arc<Entity>, node: &Arc<SpellNode>) -> ScriptObject {
    let context = NodeContext {
        entity: Arc::downgrade(entity),
        roots: Arc::new(|entity: &Entity| entity.sheet().spells.clone()),
        bridge: Arc::new(spell_object),
    };
    let me = Arc::downgrade(entity);
    let level = {
        let me = me.clone();
        let node = Arc::clone(node);
        move |relative: bool| {
            let node = Arc::clone(&node);
            let me = me.clone();
            move || {
                with_entity(&me, |entity| {
                    let level = entity.skill_level(
                        &node.difficulty,
                        node.points,
                        &node.name_with_replacements(),
                        "",
                    );
                    number_to_dynamic(if relative { level.relative_level } else { level.level })
                })
            }
        }
    };
    let notes = {
        let node = Arc::clone(node);
        notes_property(&me, &node.notes.clone(), move |entity| entity.node_self(&node, spell_object))
    };

    context
        .builder("spell", node)
        .property("notes", notes)
        .text("difficulty", node.difficulty.level.key())
        .text("attribute", node.difficulty.attribute.as_str())
        .value("points", number_to_dynamic(node.points))
        .text("tech_level", node.tech_level.clone().unwrap_or_default())
        .property("level", level(false))
        .property("relative_level", level(true))
        .value("college", text_array(&node.college))
        .text("power_source", node.power_source.as_str())
        .text("spell_class", node.spell_class.as_str())
        .text("resist", node.resist.as_str())
        .text("casting_cost", node.casting_cost.as_str())
        .text("maintenance_cost", node.maintenance_cost.as_str())
        .text("casting_time", node.casting_time.as_str())
        .text("duration", node.duration.as_str())
        .method("find", context.find_method(node))
        .build()
}

// Equipment

pub fn equipment_object(entity: &Arc<Entity>, node: &Arc<EquipmentNode>) -> ScriptObject {
    let context = NodeContext {
        entity: Arc::downgrade(entity),
        roots: Arc::new(|entity: &Entity| entity.sheet().equipment.clone()),
        bridge: Arc::new(equipment_object),
    };
    let me = Arc::downgrade(entity);
    let computed = |compute: fn(&Entity, &Arc<EquipmentNode>) -> f64| {
        let me = me.clone();
        let node = Arc::clone(node);
        move || with_entity(&me, |entity| number_to_dynamic(compute(entity, &node)))
    };
    let modifiers = {
        let me = me.clone();
        let owner = Arc::clone(node);
        move || {
            with_entity(&me, |entity| {
                object_array(
                    owner
                        .modifiers
                        .iter()
                        .map(|modifier| equipment_modifier_object(entity, &owner, modifier)),
                )
            })
        }
    };
    let notes = {
        let node = Arc::clone(node);
        notes_property(&me, &node.notes.clone(), move |entity| entity.equipment_self(&node))
    };
    let weapons = {
        let me = me.clone();
        let node = Arc::clone(node);
        move || owned_weapons(&me, &node.id, &node.name_with_replacements(), &node.weapons)
    };

    context
        .builder("equipment", node)
        .property("notes", notes)
        .value("equipped", Dynamic::from(node.equipped))
        .value("quantity", number_to_dynamic(node.quantity))
        .property("value", computed(|entity, node| entity.equipment_value(node)))
        .property("extended_value", computed(|entity, node| entity.equipment_extended_value(node)))
        .property("weight", computed(|entity, node| entity.equipment_weight(node)))
        .property(
            "extended_weight",
            computed(|entity, node| entity.equipment_extended_weight(node, false)),
        )
        .text("tech_level", node.tech_level.as_str())
        .text("legality_class", node.legality_class.as_str())
        .value("uses", Dynamic::from_int(node.uses as rhai::INT))
        .value("max_uses", Dynamic::from_int(node.max_uses as rhai::INT))
        .property("modifiers", modifiers)
        .property("weapons", weapons)
        .method("find", context.find_method(node))
        .build()
}

pub fn equipment_modifier_object(
    entity: &Arc<Entity>,
    owner: &Arc<EquipmentNode>,
    node: &Arc<EquipmentModifierNode>,
) -> ScriptObject {
    let context = {
        let roots_owner = Arc::clone(owner);
        let bridge_owner = Arc::clone(owner);
        NodeContext {
            entity: Arc::downgrade(entity),
            roots: Arc::new(move |_: &Entity| roots_owner.modifiers.clone()),
            bridge: Arc::new(move |entity: &Arc<Entity>, node: &Arc<EquipmentModifierNode>| {
                equipment_modifier_object(entity, &bridge_owner, node)
            }),
        }
    };
    let notes = {
        let owner = Arc::clone(owner);
        let node = Arc::clone(node);
        notes_property(&Arc::downgrade(entity), &node.notes.clone(), move |entity| {
            let owner = Arc::clone(&owner);
            entity.node_self(&node, move |entity, node| {
                equipment_modifier_object(entity, &owner, node)
            })
        })
    };

    context
        .builder("equipment_modifier", node)
        .property("notes", notes)
        .value("cost", number_to_dynamic(node.cost))
        .value("weight", number_to_dynamic(node.weight))
        .text("tech_level", node.tech_level.as_str())
        .method("find", context.find_method(node))
        .build()
}

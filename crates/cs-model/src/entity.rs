use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use rhai::Dynamic;

use cs_core::{parse_number, Dice, Length, Weight};
use cs_runtime::{
    EntityRef, ResolveCache, ScriptArg, ScriptEntity, ScriptObject, ScriptResolver, ScriptRng,
    ScriptSelfProvider,
};

use crate::bridge;
use crate::damage::{combine, convert_modifiers_to_dice, swing_for, thrust_for};
use crate::names::same_name;
use crate::random::{random_height_in_inches, random_weight_in_pounds, BuildTraits};
use crate::sheet::{
    Difficulty, DifficultyLevel, EquipmentNode, Feature, ModifierCostType, PoolThreshold, Sheet,
    StrengthDamage, StrengthLimitation, TraitNode, WeaponDamageData, WeaponData, WeaponKind,
};
use crate::tree::{find_by_id, traverse, TreeNode};

/// Carry multipliers of basic lift for encumbrance levels None through Extra-Heavy.
pub const ENCUMBRANCE_MULTIPLIERS: [f64; 5] = [1.0, 2.0, 3.0, 6.0, 10.0];

pub const ENCUMBRANCE_LEVEL_NAMES: [&str; 5] = ["None", "Light", "Medium", "Heavy", "Extra-Heavy"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkillLevel {
    pub level: f64,
    pub relative_level: f64,
}

impl SkillLevel {
    pub const UNUSABLE: SkillLevel = SkillLevel {
        level: 0.0,
        relative_level: 0.0,
    };

    pub fn is_usable(&self) -> bool {
        *self != Self::UNUSABLE
    }
}

/// A weapon usable right now, with the name of whatever provides it.
#[derive(Debug, Clone, PartialEq)]
pub struct EquippedWeapon {
    pub owner_id: String,
    pub owner_name: String,
    pub weapon: WeaponData,
}

/// Relative level bought by `points` at `difficulty`; `None` when too few points were spent.
pub fn points_bonus(points: f64, difficulty: DifficultyLevel) -> Option<f64> {
    let points = if difficulty == DifficultyLevel::Wildcard {
        points / 3.0
    } else {
        points
    };
    if points < 1.0 {
        None
    } else if points < 2.0 {
        Some(0.0)
    } else if points < 4.0 {
        Some(1.0)
    } else {
        Some(1.0 + (points / 4.0).floor())
    }
}

struct ExclusionGuard<'a> {
    set: &'a Mutex<HashSet<String>>,
    key: String,
}

impl Drop for ExclusionGuard<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

/// A loaded character sheet. Scripts resolved through it share its result cache, which is
/// cleared whenever the sheet is replaced.
pub struct Entity {
    me: Weak<Entity>,
    sheet: RwLock<Arc<Sheet>>,
    cache: ResolveCache,
    resolver: Arc<ScriptResolver>,
    skill_exclusions: Mutex<HashSet<String>>,
    rng: ScriptRng,
}

impl Entity {
    pub fn new(sheet: Sheet, resolver: Arc<ScriptResolver>) -> Arc<Self> {
        Self::with_random_seed(sheet, resolver, None)
    }

    pub fn with_random_seed(
        mut sheet: Sheet,
        resolver: Arc<ScriptResolver>,
        seed: Option<u32>,
    ) -> Arc<Self> {
        sheet.assign_missing_ids();
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            sheet: RwLock::new(Arc::new(sheet)),
            cache: ResolveCache::new(),
            resolver,
            skill_exclusions: Mutex::new(HashSet::new()),
            rng: ScriptRng::new(seed),
        })
    }

    pub fn sheet(&self) -> Arc<Sheet> {
        Arc::clone(&self.sheet.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replaces the sheet data and drops every cached result computed from the old data.
    pub fn update(&self, mut sheet: Sheet) {
        sheet.assign_missing_ids();
        *self.sheet.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(sheet);
        self.cache.clear();
        tracing::debug!("entity updated; script cache cleared");
    }

    pub fn resolver(&self) -> &Arc<ScriptResolver> {
        &self.resolver
    }

    pub fn script_cache(&self) -> &ResolveCache {
        &self.cache
    }

    pub(crate) fn weak(&self) -> Weak<Entity> {
        self.me.clone()
    }

    pub fn handle(&self) -> Option<EntityRef> {
        self.me.upgrade().map(|entity| entity as EntityRef)
    }

    pub fn resolve_script(&self, self_provider: Option<&ScriptSelfProvider>, text: &str) -> String {
        self.resolver
            .resolve_script(self.handle().as_ref(), self_provider, text)
    }

    pub fn resolve_text(&self, self_provider: Option<&ScriptSelfProvider>, text: &str) -> String {
        self.resolver
            .resolve_text(self.handle().as_ref(), self_provider, text)
    }

    pub fn resolve_to_number(&self, self_provider: Option<&ScriptSelfProvider>, text: &str) -> f64 {
        self.resolver
            .resolve_to_number(self.handle().as_ref(), self_provider, text)
    }

    pub fn resolve_to_weight(&self, self_provider: Option<&ScriptSelfProvider>, text: &str) -> Weight {
        let unit = self.sheet().settings.default_weight_units;
        self.resolver
            .resolve_to_weight(self.handle().as_ref(), self_provider, text, unit)
    }

    fn self_provider<F>(&self, id: &str, build: F) -> ScriptSelfProvider
    where
        F: Fn(&Arc<Entity>) -> ScriptObject + Send + Sync + 'static,
    {
        let me = self.weak();
        ScriptSelfProvider::new(id, move || match me.upgrade() {
            Some(entity) => Dynamic::from(build(&entity)),
            None => Dynamic::UNIT,
        })
    }

    /// `self` binding for the attribute or sheet node with `id`.
    pub fn self_provider_for(&self, id: &str) -> Option<ScriptSelfProvider> {
        let sheet = self.sheet();
        if sheet
            .attribute_def(id)
            .is_some_and(|def| !def.kind.is_separator())
        {
            return Some(self.attribute_self(id));
        }
        if let Some(node) = find_by_id(&sheet.traits, id) {
            return Some(self.trait_self(&node));
        }
        if let Some(node) = find_by_id(&sheet.skills, id) {
            return Some(self.node_self(&node, bridge::skill_object));
        }
        if let Some(node) = find_by_id(&sheet.spells, id) {
            return Some(self.node_self(&node, bridge::spell_object));
        }
        find_by_id(&sheet.equipment, id).map(|node| self.equipment_self(&node))
    }

    // Profile

    pub fn height_in_inches(&self) -> f64 {
        let sheet = self.sheet();
        Length::parse(&sheet.profile.height, sheet.settings.default_length_units)
            .map(Length::inches)
            .unwrap_or(0.0)
    }

    pub fn weight_in_pounds(&self) -> f64 {
        let sheet = self.sheet();
        Weight::parse(&sheet.profile.weight, sheet.settings.default_weight_units)
            .map(Weight::pounds)
            .unwrap_or(0.0)
    }

    // Attributes

    pub fn attribute_self(&self, id: &str) -> ScriptSelfProvider {
        let attr_id = id.to_string();
        self.self_provider(id, move |entity| bridge::attribute_object(entity, &attr_id))
    }

    /// Maximum of attribute `id`: its base formula with the attribute as `self`, plus the
    /// sheet's adjustment and any feature bonus. Whole-number kinds round down.
    pub fn attribute_maximum(&self, id: &str) -> f64 {
        let sheet = self.sheet();
        let Some(def) = sheet.attribute_def(id) else {
            return 0.0;
        };
        if def.kind.is_separator() {
            return 0.0;
        }
        let base = self.resolve_to_number(Some(&self.attribute_self(id)), &def.base);
        let value = if def.kind.is_reference() {
            base
        } else {
            let adj = sheet.attribute_state(id).map(|state| state.adj).unwrap_or(0.0);
            base + adj + self.attribute_bonus(id, StrengthLimitation::None)
        };
        if def.kind.is_decimal() {
            value
        } else {
            value.floor()
        }
    }

    /// Current value: pools lose their damage, everything else equals the maximum.
    pub fn attribute_current(&self, id: &str) -> f64 {
        let sheet = self.sheet();
        let maximum = self.attribute_maximum(id);
        match sheet.attribute_def(id) {
            Some(def) if def.kind.is_pool() => {
                maximum - sheet.attribute_state(id).map(|state| state.damage).unwrap_or(0.0)
            }
            _ => maximum,
        }
    }

    pub fn attribute_damage(&self, id: &str) -> f64 {
        self.sheet()
            .attribute_state(id)
            .map(|state| state.damage)
            .unwrap_or(0.0)
    }

    pub fn attribute_points(&self, id: &str) -> f64 {
        let sheet = self.sheet();
        match (sheet.attribute_def(id), sheet.attribute_state(id)) {
            (Some(def), Some(state)) if !def.kind.is_reference() => state.adj * def.cost_per_point,
            _ => 0.0,
        }
    }

    /// Current value of an attribute id, or the number itself when `id` is a literal.
    pub fn resolve_attribute_current(&self, id: &str) -> Option<f64> {
        let sheet = self.sheet();
        match sheet.attribute_def(id) {
            Some(def) if !def.kind.is_separator() => Some(self.attribute_current(id)),
            Some(_) => None,
            None => parse_number(id).ok(),
        }
    }

    pub fn threshold_value(&self, id: &str, threshold: &PoolThreshold) -> f64 {
        self.resolve_to_number(Some(&self.attribute_self(id)), &threshold.value)
    }

    /// The first threshold whose value is at or above the pool's current value.
    pub fn current_threshold(&self, id: &str) -> Option<PoolThreshold> {
        let sheet = self.sheet();
        let def = sheet.attribute_def(id)?;
        if !def.kind.is_pool() {
            return None;
        }
        let current = self.attribute_current(id);
        def.thresholds
            .iter()
            .find(|threshold| current <= self.threshold_value(id, threshold))
            .cloned()
    }

    // Features

    fn for_each_feature(&self, visit: &mut dyn FnMut(&Feature, f64)) {
        let sheet = self.sheet();
        traverse(&sheet.traits, true, false, &mut |node: &Arc<TraitNode>| {
            let levels = node.levels.unwrap_or(0.0);
            for feature in &node.features {
                visit(feature, levels);
            }
            traverse(&node.modifiers, true, false, &mut |modifier| {
                for feature in &modifier.features {
                    visit(feature, levels);
                }
                false
            });
            false
        });
        traverse(&sheet.equipment, true, false, &mut |node: &Arc<EquipmentNode>| {
            if node.quantity > 0.0 {
                for feature in &node.features {
                    visit(feature, 1.0);
                }
                traverse(&node.modifiers, true, false, &mut |modifier| {
                    for feature in &modifier.features {
                        visit(feature, 1.0);
                    }
                    false
                });
            }
            false
        });
    }

    pub fn attribute_bonus(&self, id: &str, limitation: StrengthLimitation) -> f64 {
        let mut total = 0.0;
        self.for_each_feature(&mut |feature, levels| {
            if let Feature::AttributeBonus {
                attribute,
                amount,
                per_level,
                limitation: feature_limitation,
            } = feature
            {
                if attribute == id && *feature_limitation == limitation {
                    total += if *per_level { amount * levels } else { *amount };
                }
            }
        });
        total
    }

    pub fn skill_bonus(&self, name: &str, specialization: &str) -> f64 {
        let mut total = 0.0;
        self.for_each_feature(&mut |feature, levels| {
            if let Feature::SkillBonus {
                name: bonus_name,
                specialization: bonus_specialization,
                amount,
                per_level,
            } = feature
            {
                if same_name(bonus_name, name)
                    && (bonus_specialization.is_empty()
                        || same_name(bonus_specialization, specialization))
                {
                    total += if *per_level { amount * levels } else { *amount };
                }
            }
        });
        total
    }

    // Strength

    fn strength_with(&self, limitation: StrengthLimitation) -> f64 {
        (self.attribute_current("st") + self.attribute_bonus("st", limitation)).floor()
    }

    pub fn lifting_strength(&self) -> f64 {
        self.strength_with(StrengthLimitation::LiftingOnly)
    }

    pub fn striking_strength(&self) -> f64 {
        self.strength_with(StrengthLimitation::StrikingOnly)
    }

    pub fn throwing_strength(&self) -> f64 {
        self.strength_with(StrengthLimitation::ThrowingOnly)
    }

    pub fn thrust(&self) -> Dice {
        thrust_for(self.striking_strength() as i64)
    }

    pub fn swing(&self) -> Dice {
        swing_for(self.striking_strength() as i64)
    }

    // Encumbrance

    /// Basic lift in pounds: ST²/5, whole pounds from 10 lb up.
    pub fn basic_lift(&self) -> f64 {
        let st = self.lifting_strength();
        let lift = st * st / 5.0;
        if lift >= 10.0 {
            lift.round()
        } else {
            lift
        }
    }

    pub fn maximum_carry(&self, level: usize) -> f64 {
        let multiplier = ENCUMBRANCE_MULTIPLIERS[level.min(ENCUMBRANCE_MULTIPLIERS.len() - 1)];
        self.basic_lift() * multiplier
    }

    pub fn weight_carried(&self, for_skills: bool) -> f64 {
        self.sheet()
            .equipment
            .iter()
            .map(|node| self.equipment_extended_weight(node, for_skills))
            .sum()
    }

    pub fn encumbrance_level(&self, for_skills: bool) -> usize {
        let carried = self.weight_carried(for_skills);
        let lift = self.basic_lift();
        ENCUMBRANCE_MULTIPLIERS
            .iter()
            .position(|multiplier| carried <= lift * multiplier)
            .unwrap_or(ENCUMBRANCE_MULTIPLIERS.len() - 1)
    }

    // Traits

    pub fn trait_self(&self, node: &Arc<TraitNode>) -> ScriptSelfProvider {
        let node = Arc::clone(node);
        self.self_provider(&node.id.clone(), move |entity| bridge::trait_object(entity, &node))
    }

    pub fn trait_current_level(node: &TraitNode) -> f64 {
        node.levels.unwrap_or(0.0)
    }

    /// Point cost of a trait after its enabled modifiers; containers sum their children.
    pub fn trait_points(&self, node: &TraitNode) -> f64 {
        if node.disabled {
            return 0.0;
        }
        if node.is_container() {
            return node.children.iter().map(|child| self.trait_points(child)).sum();
        }
        let base = node.base_points + node.levels.unwrap_or(0.0) * node.points_per_level;
        let mut percentage = 0.0;
        let mut points = 0.0;
        let mut multiplier = 1.0;
        traverse(&node.modifiers, true, true, &mut |modifier| {
            let cost = modifier.cost * modifier.levels.unwrap_or(1.0);
            match modifier.cost_type {
                ModifierCostType::Percentage => percentage += cost,
                ModifierCostType::Points => points += cost,
                ModifierCostType::Multiplier => multiplier *= modifier.cost,
            }
            false
        });
        let percentage = percentage.max(-80.0);
        ((base * (1.0 + percentage / 100.0) + points) * multiplier).ceil()
    }

    pub fn has_trait(&self, name: &str) -> bool {
        let name = name.trim();
        traverse(&self.sheet().traits, true, false, &mut |node| {
            same_name(&node.name_with_replacements(), name)
        })
    }

    /// Sum of the levels of every matching leveled trait, or -1 when none match.
    pub fn trait_level(&self, name: &str) -> f64 {
        let name = name.trim();
        let mut level: Option<f64> = None;
        traverse(&self.sheet().traits, true, true, &mut |node| {
            if node.levels.is_some() && same_name(&node.name_with_replacements(), name) {
                *level.get_or_insert(0.0) += Self::trait_current_level(node);
            }
            false
        });
        level.unwrap_or(-1.0)
    }

    pub fn build_traits(&self) -> BuildTraits {
        let mut build = BuildTraits::default();
        traverse(&self.sheet().traits, true, false, &mut |node| {
            match node.name_with_replacements().to_lowercase().as_str() {
                "skinny" => build.skinny = true,
                "overweight" => build.overweight = true,
                "fat" => build.fat = true,
                "very fat" => build.very_fat = true,
                _ => {}
            }
            false
        });
        build
    }

    pub fn random_height_in_inches(&self, st: i64) -> i64 {
        random_height_in_inches(st, &self.rng)
    }

    pub fn random_weight_in_pounds(&self, st: i64, shift: i64) -> i64 {
        random_weight_in_pounds(st, shift, self.build_traits(), &self.rng)
    }

    // Skills and spells

    /// Level for a skill or spell keyed to `difficulty` with `points` spent.
    pub fn skill_level(
        &self,
        difficulty: &Difficulty,
        points: f64,
        name: &str,
        specialization: &str,
    ) -> SkillLevel {
        let Some(bonus) = points_bonus(points, difficulty.level) else {
            return SkillLevel::UNUSABLE;
        };
        let Some(base) = self.resolve_attribute_current(&difficulty.attribute) else {
            return SkillLevel::UNUSABLE;
        };
        let relative_level =
            difficulty.level.base_relative_level() + bonus + self.skill_bonus(name, specialization);
        SkillLevel {
            level: (base + relative_level).floor(),
            relative_level: relative_level.floor(),
        }
    }

    pub fn node_self<T, F>(&self, node: &Arc<T>, build: F) -> ScriptSelfProvider
    where
        T: TreeNode + Send + Sync + 'static,
        F: Fn(&Arc<Entity>, &Arc<T>) -> ScriptObject + Send + Sync + 'static,
    {
        let node = Arc::clone(node);
        self.self_provider(&node.node_id().to_string(), move |entity| build(entity, &node))
    }

    /// Level of the first skill whose name and specialization match. A lookup already in
    /// progress for the same skill reports 0 instead of recursing.
    pub fn skill_level_by_name(&self, name: &str, specialization: &str, relative: bool) -> i64 {
        let name = name.trim();
        let specialization = specialization.trim();
        let key = format!("{}\u{0}{}", name.to_lowercase(), specialization.to_lowercase());
        if !self
            .skill_exclusions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone())
        {
            tracing::debug!(name, specialization, "skill level lookup excluded while in progress");
            return 0;
        }
        let _exclusion = ExclusionGuard {
            set: &self.skill_exclusions,
            key,
        };

        let sheet = self.sheet();
        let mut level = 0i64;
        traverse(&sheet.skills, true, true, &mut |skill| {
            let skill_name = skill.name_with_replacements();
            let skill_specialization =
                crate::names::apply_replacements(&skill.specialization, &skill.replacements);
            if same_name(&skill_name, name) && same_name(&skill_specialization, specialization) {
                let computed =
                    self.skill_level(&skill.difficulty, skill.points, &skill_name, &skill_specialization);
                level = if relative {
                    computed.relative_level as i64
                } else {
                    computed.level as i64
                };
                return true;
            }
            false
        });
        level
    }

    // Equipment

    pub fn equipment_self(&self, node: &Arc<EquipmentNode>) -> ScriptSelfProvider {
        let node = Arc::clone(node);
        self.self_provider(&node.id.clone(), move |entity| bridge::equipment_object(entity, &node))
    }

    /// Value of one unit including enabled modifiers.
    pub fn equipment_value(&self, node: &Arc<EquipmentNode>) -> f64 {
        let base = self.resolve_to_number(Some(&self.equipment_self(node)), &node.value);
        let mut adjustments = 0.0;
        traverse(&node.modifiers, true, true, &mut |modifier| {
            adjustments += modifier.cost;
            false
        });
        (base + adjustments).max(0.0)
    }

    /// Weight of one unit in pounds including enabled modifiers.
    pub fn equipment_weight(&self, node: &Arc<EquipmentNode>) -> f64 {
        let base = self
            .resolve_to_weight(Some(&self.equipment_self(node)), &node.weight)
            .pounds();
        let mut adjustments = 0.0;
        traverse(&node.modifiers, true, true, &mut |modifier| {
            adjustments += modifier.weight;
            false
        });
        (base + adjustments).max(0.0)
    }

    pub fn equipment_extended_value(&self, node: &Arc<EquipmentNode>) -> f64 {
        let own = node.quantity * self.equipment_value(node);
        own + node
            .children
            .iter()
            .map(|child| self.equipment_extended_value(child))
            .sum::<f64>()
    }

    pub fn equipment_extended_weight(&self, node: &Arc<EquipmentNode>, for_skills: bool) -> f64 {
        if for_skills && node.ignore_weight_for_skills {
            return 0.0;
        }
        let own = node.quantity * self.equipment_weight(node);
        own + node
            .children
            .iter()
            .map(|child| self.equipment_extended_weight(child, for_skills))
            .sum::<f64>()
    }

    // Weapons

    /// Weapons of enabled traits and equipped items, in sheet order.
    pub fn equipped_weapons(&self, kind: WeaponKind) -> Vec<EquippedWeapon> {
        let sheet = self.sheet();
        let mut weapons = Vec::new();
        traverse(&sheet.traits, true, false, &mut |node| {
            for weapon in node.weapons.iter().filter(|weapon| weapon.kind == kind) {
                weapons.push(EquippedWeapon {
                    owner_id: node.id.clone(),
                    owner_name: node.name_with_replacements(),
                    weapon: weapon.clone(),
                });
            }
            false
        });
        traverse(&sheet.equipment, true, false, &mut |node| {
            if node.quantity > 0.0 {
                for weapon in node.weapons.iter().filter(|weapon| weapon.kind == kind) {
                    weapons.push(EquippedWeapon {
                        owner_id: node.id.clone(),
                        owner_name: node.name_with_replacements(),
                        weapon: weapon.clone(),
                    });
                }
            }
            false
        });
        weapons
    }

    /// Damage text with strength-based dice worked out, e.g. `2d+1 cut`.
    pub fn resolved_damage(&self, damage: &WeaponDamageData) -> String {
        let extra = if damage.base.trim().is_empty() {
            None
        } else {
            Dice::parse(&damage.base).ok()
        };
        let dice = match (damage.strength, extra) {
            (StrengthDamage::Thrust, extra) => Some(combine(self.thrust(), extra.unwrap_or(Dice::new(0, 0)))),
            (StrengthDamage::Swing, extra) => Some(combine(self.swing(), extra.unwrap_or(Dice::new(0, 0)))),
            (StrengthDamage::None, extra) => extra,
        };
        let dice = match dice {
            Some(dice) if self.sheet().settings.use_modifying_dice_plus_adds => {
                Some(convert_modifiers_to_dice(dice))
            }
            other => other,
        };
        let mut text = dice.map(|dice| dice.to_string()).unwrap_or_default();
        if !damage.damage_type.trim().is_empty() {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(damage.damage_type.trim());
        }
        text
    }

    pub fn weapon_damage(&self, name: &str, usage: &str) -> Option<String> {
        [WeaponKind::Melee, WeaponKind::Ranged]
            .into_iter()
            .flat_map(|kind| self.equipped_weapons(kind))
            .find(|equipped| {
                same_name(&equipped.owner_name, name) && same_name(&equipped.weapon.usage, usage)
            })
            .map(|equipped| self.resolved_damage(&equipped.weapon.damage))
    }

    // Notes

    /// Notes with embedded scripts resolved, `self` being the node the notes belong to.
    pub fn resolved_notes(&self, self_provider: &ScriptSelfProvider, notes: &str) -> String {
        self.resolve_text(Some(self_provider), notes)
    }
}

impl ScriptEntity for Entity {
    fn resolve_cache(&self) -> &ResolveCache {
        &self.cache
    }

    fn script_object(self: Arc<Self>) -> ScriptObject {
        bridge::entity_object(&self)
    }

    fn attribute_args(self: Arc<Self>) -> Vec<ScriptArg> {
        let sheet = self.sheet();
        sheet
            .attribute_defs
            .iter()
            .filter(|def| !def.kind.is_separator())
            .map(|def| {
                let me = self.weak();
                let attr_id = def.id.clone();
                ScriptArg::lazy(format!("${}", def.id), move |_engine| match me.upgrade() {
                    Some(entity) => Dynamic::from(bridge::attribute_object(&entity, &attr_id)),
                    None => Dynamic::UNIT,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod entity_tests {
    use super::*;

    #[test]
    fn points_progression_matches_the_difficulty_table() {
        assert_eq!(points_bonus(0.0, DifficultyLevel::Average), None);
        assert_eq!(points_bonus(1.0, DifficultyLevel::Average), Some(0.0));
        assert_eq!(points_bonus(2.0, DifficultyLevel::Average), Some(1.0));
        assert_eq!(points_bonus(4.0, DifficultyLevel::Average), Some(2.0));
        assert_eq!(points_bonus(8.0, DifficultyLevel::Average), Some(3.0));
        assert_eq!(points_bonus(3.0, DifficultyLevel::Wildcard), Some(0.0));
        assert_eq!(points_bonus(12.0, DifficultyLevel::Wildcard), Some(2.0));
        assert_eq!(points_bonus(2.0, DifficultyLevel::Wildcard), None);
    }
}

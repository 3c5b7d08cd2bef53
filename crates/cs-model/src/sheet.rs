use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use cs_core::{LengthUnit, ScriptError, WeightUnit};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetSettings {
    pub default_length_units: LengthUnit,
    pub default_weight_units: WeightUnit,
    pub use_modifying_dice_plus_adds: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub player_name: String,
    pub name: String,
    pub title: String,
    pub organization: String,
    pub religion: String,
    pub tech_level: String,
    pub gender: String,
    pub age: String,
    pub birthday: String,
    pub eyes: String,
    pub hair: String,
    pub skin: String,
    pub handedness: String,
    /// Height text such as `5'10"` or `178 cm`; bare numbers use the sheet's length units.
    pub height: String,
    /// Weight text such as `150 lb`; bare numbers use the sheet's weight units.
    pub weight: String,
    pub size_modifier: i64,
    pub size_modifier_adjustment: i64,
}

impl Profile {
    pub fn adjusted_size_modifier(&self) -> i64 {
        self.size_modifier + self.size_modifier_adjustment
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    #[default]
    Integer,
    IntegerRef,
    Decimal,
    DecimalRef,
    Pool,
    PoolRef,
    PrimarySeparator,
    SecondarySeparator,
    PoolSeparator,
}

impl AttributeKind {
    pub fn key(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::IntegerRef => "integer_ref",
            Self::Decimal => "decimal",
            Self::DecimalRef => "decimal_ref",
            Self::Pool => "pool",
            Self::PoolRef => "pool_ref",
            Self::PrimarySeparator => "primary_separator",
            Self::SecondarySeparator => "secondary_separator",
            Self::PoolSeparator => "pool_separator",
        }
    }

    pub fn is_separator(self) -> bool {
        matches!(
            self,
            Self::PrimarySeparator | Self::SecondarySeparator | Self::PoolSeparator
        )
    }

    pub fn is_pool(self) -> bool {
        matches!(self, Self::Pool | Self::PoolRef)
    }

    pub fn is_decimal(self) -> bool {
        matches!(self, Self::Decimal | Self::DecimalRef)
    }

    /// Reference kinds take their value from the base formula alone.
    pub fn is_reference(self) -> bool {
        matches!(self, Self::IntegerRef | Self::DecimalRef | Self::PoolRef)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolThreshold {
    pub state: String,
    /// Formula evaluated with the pool attribute as `self`, e.g. `self.maximum - 1`.
    pub value: String,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeDef {
    pub id: String,
    pub kind: AttributeKind,
    pub name: String,
    pub full_name: String,
    /// Formula for the base value; may reference other attributes as `$id`.
    pub base: String,
    pub cost_per_point: f64,
    pub thresholds: Vec<PoolThreshold>,
}

impl AttributeDef {
    fn new(id: &str, kind: AttributeKind, name: &str, full_name: &str, base: &str, cost: f64) -> Self {
        Self {
            id: id.to_string(),
            kind,
            name: name.to_string(),
            full_name: full_name.to_string(),
            base: base.to_string(),
            cost_per_point: cost,
            thresholds: Vec::new(),
        }
    }

    fn with_thresholds(mut self, thresholds: &[(&str, &str, &str)]) -> Self {
        self.thresholds = thresholds
            .iter()
            .map(|(state, value, explanation)| PoolThreshold {
                state: state.to_string(),
                value: value.to_string(),
                explanation: explanation.to_string(),
            })
            .collect();
        self
    }

    pub fn display_full_name(&self) -> &str {
        if self.full_name.is_empty() {
            &self.name
        } else {
            &self.full_name
        }
    }

    /// The usual attribute set of a fresh character sheet.
    pub fn standard_set() -> Vec<AttributeDef> {
        use AttributeKind::*;
        vec![
            Self::new("st", Integer, "ST", "Strength", "10", 10.0),
            Self::new("dx", Integer, "DX", "Dexterity", "10", 20.0),
            Self::new("iq", Integer, "IQ", "Intelligence", "10", 20.0),
            Self::new("ht", Integer, "HT", "Health", "10", 10.0),
            Self::new("will", Integer, "Will", "", "$iq", 5.0),
            Self::new("per", Integer, "Per", "Perception", "$iq", 5.0),
            Self::new("basic_speed", Decimal, "Basic Speed", "", "($dx + $ht) / 4", 20.0),
            Self::new("basic_move", Integer, "Basic Move", "", "Math.floor($basic_speed)", 5.0),
            Self::new("pools", PoolSeparator, "Pools", "", "", 0.0),
            Self::new("fp", Pool, "FP", "Fatigue Points", "$ht", 3.0).with_thresholds(&[
                ("Unconscious", "-1 * self.maximum", "Roll vs. Will to do anything besides rest"),
                ("Collapse", "0", "Roll vs. Will to stay conscious"),
                ("Tired", "Math.ceil(self.maximum / 3) - 1", "Move, Dodge and ST are halved"),
                ("Tiring", "self.maximum - 1", ""),
                ("Rested", "self.maximum", ""),
            ]),
            Self::new("hp", Pool, "HP", "Hit Points", "$st", 2.0).with_thresholds(&[
                ("Dead", "-5 * self.maximum", ""),
                ("Dying #4", "-4 * self.maximum", "Roll vs. HT to avoid death"),
                ("Dying #3", "-3 * self.maximum", "Roll vs. HT to avoid death"),
                ("Dying #2", "-2 * self.maximum", "Roll vs. HT to avoid death"),
                ("Dying #1", "-1 * self.maximum", "Roll vs. HT to avoid death"),
                ("Collapse", "0", "Roll vs. HT every turn to remain conscious"),
                ("Reeling", "Math.ceil(self.maximum / 3) - 1", "Move and Dodge are halved"),
                ("Wounded", "self.maximum - 1", ""),
                ("Healthy", "self.maximum", ""),
            ]),
        ]
    }
}

/// Per-sheet values layered on an attribute definition.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeState {
    pub attr_id: String,
    pub adj: f64,
    pub damage: f64,
}

/// Which strength-derived quantity a strength bonus is limited to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrengthLimitation {
    #[default]
    None,
    StrikingOnly,
    LiftingOnly,
    ThrowingOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Feature {
    AttributeBonus {
        attribute: String,
        amount: f64,
        #[serde(default)]
        per_level: bool,
        #[serde(default)]
        limitation: StrengthLimitation,
    },
    SkillBonus {
        name: String,
        #[serde(default)]
        specialization: String,
        amount: f64,
        #[serde(default)]
        per_level: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierCostType {
    #[default]
    Percentage,
    Points,
    Multiplier,
}

impl ModifierCostType {
    pub fn key(self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::Points => "points",
            Self::Multiplier => "multiplier",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TraitModifierNode {
    pub id: String,
    pub name: String,
    pub notes: String,
    pub tags: Vec<String>,
    pub container: bool,
    pub children: Vec<Arc<TraitModifierNode>>,
    pub disabled: bool,
    pub cost: f64,
    pub cost_type: ModifierCostType,
    pub levels: Option<f64>,
    pub features: Vec<Feature>,
    pub replacements: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TraitNode {
    pub id: String,
    pub name: String,
    pub notes: String,
    pub tags: Vec<String>,
    pub container: bool,
    pub children: Vec<Arc<TraitNode>>,
    pub disabled: bool,
    pub base_points: f64,
    pub points_per_level: f64,
    /// Present when the trait is leveled.
    pub levels: Option<f64>,
    pub modifiers: Vec<Arc<TraitModifierNode>>,
    pub features: Vec<Feature>,
    pub weapons: Vec<WeaponData>,
    pub replacements: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DifficultyLevel {
    #[serde(rename = "e")]
    Easy,
    #[default]
    #[serde(rename = "a")]
    Average,
    #[serde(rename = "h")]
    Hard,
    #[serde(rename = "vh")]
    VeryHard,
    #[serde(rename = "w")]
    Wildcard,
}

impl DifficultyLevel {
    pub fn key(self) -> &'static str {
        match self {
            Self::Easy => "e",
            Self::Average => "a",
            Self::Hard => "h",
            Self::VeryHard => "vh",
            Self::Wildcard => "w",
        }
    }

    /// Relative level of a skill bought with a single point.
    pub fn base_relative_level(self) -> f64 {
        match self {
            Self::Easy => 0.0,
            Self::Average => -1.0,
            Self::Hard => -2.0,
            Self::VeryHard | Self::Wildcard => -3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Difficulty {
    pub attribute: String,
    pub level: DifficultyLevel,
}

impl Default for Difficulty {
    fn default() -> Self {
        Self {
            attribute: "dx".to_string(),
            level: DifficultyLevel::Average,
        }
    }
}

impl Difficulty {
    pub fn key(&self) -> String {
        format!("{}/{}", self.attribute, self.level.key())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillNode {
    pub id: String,
    pub name: String,
    pub specialization: String,
    pub notes: String,
    pub tags: Vec<String>,
    pub container: bool,
    pub children: Vec<Arc<SkillNode>>,
    pub difficulty: Difficulty,
    pub points: f64,
    pub tech_level: Option<String>,
    pub replacements: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpellNode {
    pub id: String,
    pub name: String,
    pub notes: String,
    pub tags: Vec<String>,
    pub container: bool,
    pub children: Vec<Arc<SpellNode>>,
    pub difficulty: Difficulty,
    pub points: f64,
    pub tech_level: Option<String>,
    pub college: Vec<String>,
    pub power_source: String,
    pub spell_class: String,
    pub resist: String,
    pub casting_cost: String,
    pub maintenance_cost: String,
    pub casting_time: String,
    pub duration: String,
    pub replacements: BTreeMap<String, String>,
}

impl Default for SpellNode {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            notes: String::new(),
            tags: Vec::new(),
            container: false,
            children: Vec::new(),
            difficulty: Difficulty {
                attribute: "iq".to_string(),
                level: DifficultyLevel::Hard,
            },
            points: 0.0,
            tech_level: None,
            college: Vec::new(),
            power_source: String::new(),
            spell_class: String::new(),
            resist: String::new(),
            casting_cost: String::new(),
            maintenance_cost: String::new(),
            casting_time: String::new(),
            duration: String::new(),
            replacements: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EquipmentModifierNode {
    pub id: String,
    pub name: String,
    pub notes: String,
    pub tags: Vec<String>,
    pub container: bool,
    pub children: Vec<Arc<EquipmentModifierNode>>,
    pub disabled: bool,
    /// Value added per unit of the owning item.
    pub cost: f64,
    /// Weight in pounds added per unit of the owning item.
    pub weight: f64,
    pub tech_level: String,
    pub features: Vec<Feature>,
    pub replacements: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EquipmentNode {
    pub id: String,
    pub name: String,
    pub notes: String,
    pub tags: Vec<String>,
    pub container: bool,
    pub children: Vec<Arc<EquipmentNode>>,
    pub equipped: bool,
    pub quantity: f64,
    /// Unit value formula, evaluated with the item as `self`.
    pub value: String,
    /// Unit weight formula, evaluated with the item as `self`.
    pub weight: String,
    pub ignore_weight_for_skills: bool,
    pub tech_level: String,
    pub legality_class: String,
    pub uses: i64,
    pub max_uses: i64,
    pub modifiers: Vec<Arc<EquipmentModifierNode>>,
    pub features: Vec<Feature>,
    pub weapons: Vec<WeaponData>,
    pub replacements: BTreeMap<String, String>,
}

impl Default for EquipmentNode {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            notes: String::new(),
            tags: Vec::new(),
            container: false,
            children: Vec::new(),
            equipped: true,
            quantity: 1.0,
            value: String::new(),
            weight: String::new(),
            ignore_weight_for_skills: false,
            tech_level: String::new(),
            legality_class: String::new(),
            uses: 0,
            max_uses: 0,
            modifiers: Vec::new(),
            features: Vec::new(),
            weapons: Vec::new(),
            replacements: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponKind {
    #[default]
    Melee,
    Ranged,
}

/// Strength-based damage a weapon builds on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrengthDamage {
    #[default]
    None,
    Thrust,
    Swing,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponDamageData {
    pub strength: StrengthDamage,
    /// Dice added to (or replacing) the strength damage, e.g. `1d+2` or `+1`.
    pub base: String,
    pub damage_type: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponData {
    pub id: String,
    pub kind: WeaponKind,
    pub usage: String,
    pub usage_notes: String,
    pub damage: WeaponDamageData,
    pub strength: String,
    pub reach: String,
    pub parry: String,
    pub block: String,
    pub accuracy: String,
    pub range: String,
    pub rate_of_fire: String,
    pub shots: String,
    pub bulk: String,
    pub recoil: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sheet {
    pub profile: Profile,
    pub settings: SheetSettings,
    pub attribute_defs: Vec<AttributeDef>,
    pub attributes: Vec<AttributeState>,
    pub traits: Vec<Arc<TraitNode>>,
    pub skills: Vec<Arc<SkillNode>>,
    pub spells: Vec<Arc<SpellNode>>,
    pub equipment: Vec<Arc<EquipmentNode>>,
}

impl Default for Sheet {
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            settings: SheetSettings::default(),
            attribute_defs: AttributeDef::standard_set(),
            attributes: Vec::new(),
            traits: Vec::new(),
            skills: Vec::new(),
            spells: Vec::new(),
            equipment: Vec::new(),
        }
    }
}

impl Sheet {
    pub fn from_json(text: &str) -> Result<Self, ScriptError> {
        serde_json::from_str(text)
            .map_err(|error| ScriptError::parse(format!("invalid sheet data: {}", error)))
    }

    pub fn attribute_def(&self, id: &str) -> Option<&AttributeDef> {
        self.attribute_defs.iter().find(|def| def.id == id)
    }

    pub fn attribute_state(&self, id: &str) -> Option<&AttributeState> {
        self.attributes.iter().find(|state| state.attr_id == id)
    }

    /// Gives every node without an id a unique one so results can be cached per node.
    pub fn assign_missing_ids(&mut self) {
        let mut counter = 0usize;
        let mut next = |prefix: &str| {
            counter += 1;
            format!("{}{}", prefix, counter)
        };
        for node in &mut self.traits {
            assign_trait_ids(node, &mut next);
        }
        for node in &mut self.skills {
            assign_skill_ids(node, &mut next);
        }
        for node in &mut self.spells {
            assign_spell_ids(node, &mut next);
        }
        for node in &mut self.equipment {
            assign_equipment_ids(node, &mut next);
        }
    }
}

fn assign_weapon_ids(weapons: &mut [WeaponData], next: &mut dyn FnMut(&str) -> String) {
    for weapon in weapons.iter_mut().filter(|weapon| weapon.id.is_empty()) {
        weapon.id = next("w");
    }
}

fn assign_trait_ids(node: &mut Arc<TraitNode>, next: &mut dyn FnMut(&str) -> String) {
    let node = Arc::make_mut(node);
    if node.id.is_empty() {
        node.id = next("t");
    }
    for modifier in &mut node.modifiers {
        assign_trait_modifier_ids(modifier, next);
    }
    assign_weapon_ids(&mut node.weapons, next);
    for child in &mut node.children {
        assign_trait_ids(child, next);
    }
}

fn assign_trait_modifier_ids(
    node: &mut Arc<TraitModifierNode>,
    next: &mut dyn FnMut(&str) -> String,
) {
    let node = Arc::make_mut(node);
    if node.id.is_empty() {
        node.id = next("m");
    }
    for child in &mut node.children {
        assign_trait_modifier_ids(child, next);
    }
}

fn assign_skill_ids(node: &mut Arc<SkillNode>, next: &mut dyn FnMut(&str) -> String) {
    let node = Arc::make_mut(node);
    if node.id.is_empty() {
        node.id = next("s");
    }
    for child in &mut node.children {
        assign_skill_ids(child, next);
    }
}

fn assign_spell_ids(node: &mut Arc<SpellNode>, next: &mut dyn FnMut(&str) -> String) {
    let node = Arc::make_mut(node);
    if node.id.is_empty() {
        node.id = next("p");
    }
    for child in &mut node.children {
        assign_spell_ids(child, next);
    }
}

fn assign_equipment_modifier_ids(
    node: &mut Arc<EquipmentModifierNode>,
    next: &mut dyn FnMut(&str) -> String,
) {
    let node = Arc::make_mut(node);
    if node.id.is_empty() {
        node.id = next("f");
    }
    for child in &mut node.children {
        assign_equipment_modifier_ids(child, next);
    }
}

fn assign_equipment_ids(node: &mut Arc<EquipmentNode>, next: &mut dyn FnMut(&str) -> String) {
    let node = Arc::make_mut(node);
    if node.id.is_empty() {
        node.id = next("e");
    }
    for modifier in &mut node.modifiers {
        assign_equipment_modifier_ids(modifier, next);
    }
    assign_weapon_ids(&mut node.weapons, next);
    for child in &mut node.children {
        assign_equipment_ids(child, next);
    }
}

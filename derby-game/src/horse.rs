//! Horse roster and condition assignment
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::constants::{MAX_HORSE_CONDITION, MIN_HORSE_CONDITION};

const DEFAULT_ROSTER_DATA: &str = include_str!("../assets/horses.json");

pub type HorseId = u32;

/// Display color of a horse. Irrelevant to the simulation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct HorseColor {
    pub value: String,
    pub name: String,
}

/// Roster entry before a condition has been rolled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HorseTemplate {
    pub id: HorseId,
    pub name: String,
    #[serde(default)]
    pub color: HorseColor,
}

/// Container for the named horses a roster is rolled from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RosterTemplate {
    pub horses: Vec<HorseTemplate>,
}

impl RosterTemplate {
    /// Load a roster template from a JSON string
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a valid template.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The bundled twenty-horse template.
    #[must_use]
    pub fn load_from_static() -> Self {
        Self::from_json(DEFAULT_ROSTER_DATA).unwrap_or_default()
    }
}

/// A horse with a rolled condition, ready to be drawn into programs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Horse {
    pub id: HorseId,
    pub name: String,
    #[serde(default)]
    pub color: HorseColor,
    /// Innate quality in `[MIN_HORSE_CONDITION, MAX_HORSE_CONDITION]`.
    pub condition: u32,
}

impl Horse {
    #[must_use]
    pub fn new(id: HorseId, name: impl Into<String>, condition: u32) -> Self {
        Self {
            id,
            name: name.into(),
            color: HorseColor::default(),
            condition,
        }
    }

    #[must_use]
    pub fn from_template(template: &HorseTemplate, condition: u32) -> Self {
        Self {
            id: template.id,
            name: template.name.clone(),
            color: template.color.clone(),
            condition,
        }
    }
}

/// Uniform integer condition in the inclusive condition range.
pub fn random_condition<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    rng.gen_range(MIN_HORSE_CONDITION..=MAX_HORSE_CONDITION)
}

/// Errors raised when a roster breaks its boundary invariants.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RosterError {
    #[error(
        "horse {id} has condition {condition}, expected {min}..={max}",
        min = MIN_HORSE_CONDITION,
        max = MAX_HORSE_CONDITION
    )]
    ConditionOutOfRange { id: HorseId, condition: u32 },
    #[error("horse id {id} appears more than once")]
    DuplicateId { id: HorseId },
}

/// Validated pool of horses available for selection into programs.
///
/// Every condition lies inside the condition range, so odds computation
/// never divides by zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "Vec<Horse>", into = "Vec<Horse>")]
pub struct Roster {
    horses: Vec<Horse>,
}

impl Roster {
    /// Build a roster from already-conditioned horses.
    ///
    /// # Errors
    ///
    /// Returns an error if a condition is out of range or an id repeats.
    pub fn new(horses: Vec<Horse>) -> Result<Self, RosterError> {
        let mut seen = HashSet::with_capacity(horses.len());
        for horse in &horses {
            if !(MIN_HORSE_CONDITION..=MAX_HORSE_CONDITION).contains(&horse.condition) {
                return Err(RosterError::ConditionOutOfRange {
                    id: horse.id,
                    condition: horse.condition,
                });
            }
            if !seen.insert(horse.id) {
                return Err(RosterError::DuplicateId { id: horse.id });
            }
        }
        Ok(Self { horses })
    }

    /// Roll a fresh condition for every horse of the template.
    ///
    /// # Errors
    ///
    /// Returns an error if the template repeats an id.
    pub fn generate<R: Rng + ?Sized>(
        template: &RosterTemplate,
        rng: &mut R,
    ) -> Result<Self, RosterError> {
        let horses = template
            .horses
            .iter()
            .map(|t| Horse::from_template(t, random_condition(rng)))
            .collect();
        Self::new(horses)
    }

    #[must_use]
    pub fn horses(&self) -> &[Horse] {
        &self.horses
    }

    #[must_use]
    pub fn get(&self, id: HorseId) -> Option<&Horse> {
        self.horses.iter().find(|horse| horse.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.horses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.horses.is_empty()
    }
}

impl TryFrom<Vec<Horse>> for Roster {
    type Error = RosterError;

    fn try_from(horses: Vec<Horse>) -> Result<Self, Self::Error> {
        Self::new(horses)
    }
}

impl From<Roster> for Vec<Horse> {
    fn from(roster: Roster) -> Self {
        roster.horses
    }
}

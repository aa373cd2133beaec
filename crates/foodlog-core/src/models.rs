//! Data models for foodlog
//!
//! Defines the food log entry as stored locally and pushed to the remote
//! authority, plus the insert input and local id generation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix marking ids generated on this device
pub const LOCAL_ID_PREFIX: &str = "local_";

/// Length of the random suffix in generated ids
const LOCAL_ID_SUFFIX_LEN: usize = 12;

/// A single food log entry
///
/// Serialized in camelCase, which is also the body sent to the remote
/// authority on sync.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FoodEntry {
    /// Unique identifier (caller-assigned or `local_<millis>_<suffix>`)
    pub id: String,
    /// Owning user
    pub owner_id: String,
    /// Food name
    pub name: String,
    /// Energy in kcal
    pub calories: f64,
    /// Protein in grams
    pub protein: f64,
    /// Carbohydrates in grams
    pub carbs: f64,
    /// Fat in grams
    pub fat: f64,
    /// When the food was eaten
    pub occurred_at: DateTime<Utc>,
    /// Whether the remote authority has confirmed this entry
    #[serde(default)]
    pub synced: bool,
}

/// Input for inserting a new entry
///
/// `id` is optional; `synced` is accepted for wire compatibility but is
/// always ignored on insert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewFoodEntry {
    #[serde(default)]
    pub id: Option<String>,
    pub owner_id: String,
    pub name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub occurred_at: DateTime<Utc>,
    #[serde(default)]
    pub synced: Option<bool>,
}

impl NewFoodEntry {
    /// Create an entry with zeroed nutrition values
    pub fn new(
        owner_id: impl Into<String>,
        name: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            owner_id: owner_id.into(),
            name: name.into(),
            calories: 0.0,
            protein: 0.0,
            carbs: 0.0,
            fat: 0.0,
            occurred_at,
            synced: None,
        }
    }

    /// Use an externally assigned id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the four nutrition values
    pub fn with_nutrition(mut self, calories: f64, protein: f64, carbs: f64, fat: f64) -> Self {
        self.calories = calories;
        self.protein = protein;
        self.carbs = carbs;
        self.fat = fat;
        self
    }

    /// Build the stored entry
    ///
    /// Generates an id when none was given and forces `synced = false`.
    /// The timestamp is truncated to millisecond precision, which is what
    /// the store keeps.
    pub fn into_entry(self) -> FoodEntry {
        let id = match self.id {
            Some(id) if !id.is_empty() => id,
            _ => generate_local_id(),
        };

        FoodEntry {
            id,
            owner_id: self.owner_id,
            name: self.name,
            calories: self.calories,
            protein: self.protein,
            carbs: self.carbs,
            fat: self.fat,
            occurred_at: truncate_to_millis(self.occurred_at),
            synced: false,
        }
    }
}

/// Generate an id for an entry created on this device
///
/// Format: `local_<unix millis>_<alphanumeric suffix>`.
pub fn generate_local_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}{}_{}",
        LOCAL_ID_PREFIX,
        Utc::now().timestamp_millis(),
        &suffix[..LOCAL_ID_SUFFIX_LEN]
    )
}

/// Check whether an id was generated locally
pub fn is_local_id(id: &str) -> bool {
    let Some(rest) = id.strip_prefix(LOCAL_ID_PREFIX) else {
        return false;
    };
    let Some((millis, suffix)) = rest.split_once('_') else {
        return false;
    };

    !millis.is_empty()
        && millis.chars().all(|c| c.is_ascii_digit())
        && !suffix.is_empty()
        && suffix.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Drop sub-millisecond precision from a timestamp
pub fn truncate_to_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(at.timestamp_millis()).unwrap_or(at)
}

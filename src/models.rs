//! Data models for users, ingredients, recipes and the shopping list

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result as KitchenResult;
use crate::usage;

/// The caller on whose behalf an operation runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub user_id: String,
}

impl RequestContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub id: i64,
    pub user_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ingredient {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    pub category_id: Option<i64>,
    pub usage_score: Option<f64>, // Stored score, already decayed at write time
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Ingredient {
    /// Decay-adjusted score at `now`; never persisted.
    pub fn live_score(&self, now: DateTime<Utc>) -> f64 {
        usage::live_score(self.usage_score, self.last_used_at, now)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored recipe/ingredient join row. `id` is the line identity.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeLine {
    pub id: i64,
    pub recipe_id: i64,
    pub ingredient_id: i64,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub notes: Option<String>,
    pub position: usize,
}

/// How a submitted line names its ingredient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum IngredientRef {
    Existing { ingredient_id: i64 },
    New { name: String },
}

/// A line as submitted by a recipe form, before placeholders are resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientLine {
    /// Identity of the stored line this was loaded from, if any
    #[serde(default)]
    pub line_id: Option<i64>,
    #[serde(flatten)]
    pub ingredient: IngredientRef,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl IngredientLine {
    pub fn existing(ingredient_id: i64) -> Self {
        Self {
            line_id: None,
            ingredient: IngredientRef::Existing { ingredient_id },
            quantity: None,
            unit: None,
            notes: None,
        }
    }

    pub fn new_ingredient(name: impl Into<String>) -> Self {
        Self {
            line_id: None,
            ingredient: IngredientRef::New { name: name.into() },
            quantity: None,
            unit: None,
            notes: None,
        }
    }

    #[cfg(test)]
    pub fn with_line_id(mut self, line_id: i64) -> Self {
        self.line_id = Some(line_id);
        self
    }

    pub fn with_quantity(mut self, quantity: f64, unit: Option<&str>) -> Self {
        self.quantity = Some(quantity);
        self.unit = unit.map(str::to_string);
        self
    }

    pub fn with_notes(mut self, notes: &str) -> Self {
        self.notes = Some(notes.to_string());
        self
    }

    /// Attach the ingredient id a placeholder resolved to.
    pub fn resolve(self, ingredient_id: i64) -> ResolvedIngredientLine {
        ResolvedIngredientLine {
            line_id: self.line_id,
            ingredient_id,
            quantity: self.quantity,
            unit: self.unit,
            notes: self.notes,
        }
    }
}

/// Parse a JSON array of submitted lines.
pub fn parse_lines(json: &str) -> KitchenResult<Vec<IngredientLine>> {
    Ok(serde_json::from_str(json)?)
}

/// A submitted line whose ingredient is a concrete id.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedIngredientLine {
    pub line_id: Option<i64>,
    pub ingredient_id: i64,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShoppingItem {
    pub id: i64,
    pub user_id: String,
    pub ingredient_id: i64,
    pub recipe_id: Option<i64>, // Recipe the item was pulled from
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub checked: bool,
    pub position: usize,
}

#[derive(Debug, Clone)]
pub struct NewShoppingItem<'a> {
    pub user_id: &'a str,
    pub ingredient_id: i64,
    pub recipe_id: Option<i64>,
    pub quantity: Option<f64>,
    pub unit: Option<&'a str>,
    pub position: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryEvent {
    Created,
    Used,
    UsedInRecipe,
    AddedToShoppingList,
}

impl HistoryEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Used => "used",
            Self::UsedInRecipe => "used_in_recipe",
            Self::AddedToShoppingList => "added_to_shopping_list",
        }
    }
}

impl fmt::Display for HistoryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "used" => Ok(Self::Used),
            "used_in_recipe" => Ok(Self::UsedInRecipe),
            "added_to_shopping_list" => Ok(Self::AddedToShoppingList),
            other => Err(format!("unknown history event '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub id: i64,
    pub ingredient_id: i64,
    pub event: HistoryEvent,
    pub recipe_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

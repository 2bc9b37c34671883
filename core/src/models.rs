use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub steps: Vec<String>,
    pub cooking_time: u32,
    pub servings: u32,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: String,
}

/// Editable fields of a recipe. `id` selects the record to overwrite; a draft
/// without one becomes a new recipe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDraft {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub steps: Vec<String>,
    pub cooking_time: u32,
    pub servings: u32,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl RecipeDraft {
    /// Draft that re-saves `recipe` unchanged.
    #[must_use]
    pub fn from_recipe(recipe: &Recipe) -> Self {
        Self {
            id: Some(recipe.id.clone()),
            title: recipe.title.clone(),
            image: recipe.image.clone(),
            ingredients: recipe.ingredients.clone(),
            steps: recipe.steps.clone(),
            cooking_time: recipe.cooking_time,
            servings: recipe.servings,
            tags: recipe.tags.clone(),
        }
    }

    /// Clean up form input: trim the title, drop blank ingredient and step
    /// lines, trim and de-duplicate tags, and treat an empty image as none.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.image = self
            .image
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty());
        self.ingredients.retain(|i| !i.trim().is_empty());
        self.steps.retain(|s| !s.trim().is_empty());

        let mut tags: Vec<String> = Vec::with_capacity(self.tags.len());
        for tag in self.tags {
            let tag = tag.trim();
            if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }
        self.tags = tags;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if self.cooking_time == 0 {
            return Err(ValidationError::CookingTime);
        }
        if self.servings == 0 {
            return Err(ValidationError::Servings);
        }
        Ok(())
    }
}

/// Input rejected before it reaches a store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Recipe title must not be empty")]
    EmptyTitle,
    #[error("Cooking time must be greater than 0 minutes")]
    CookingTime,
    #[error("Servings must be greater than 0")]
    Servings,
    #[error("Day must be between 0 (Monday) and 6 (Sunday), got {0}")]
    Day(u8),
    #[error("Invalid meal '{0}'. Must be one of: breakfast, lunch, dinner")]
    Meal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealKind {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealKind {
    /// Grid order used by the planner.
    pub const ALL: [MealKind; 3] = [MealKind::Breakfast, MealKind::Lunch, MealKind::Dinner];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MealKind::Breakfast => "breakfast",
            MealKind::Lunch => "lunch",
            MealKind::Dinner => "dinner",
        }
    }
}

impl fmt::Display for MealKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "breakfast" => Ok(MealKind::Breakfast),
            "lunch" => Ok(MealKind::Lunch),
            "dinner" => Ok(MealKind::Dinner),
            _ => Err(ValidationError::Meal(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealSlot {
    pub day: u8,
    pub meal: MealKind,
    pub recipe_id: Option<String>,
}

/// Derived shopping entry; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroceryItem {
    pub ingredient: String,
    pub recipes: Vec<String>,
}

pub const DAYS_PER_WEEK: u8 = 7;

pub const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

pub fn validate_day(day: u8) -> Result<u8, ValidationError> {
    if day < DAYS_PER_WEEK {
        Ok(day)
    } else {
        Err(ValidationError::Day(day))
    }
}

/// Name of a day index; out-of-range indices wrap.
#[must_use]
pub fn day_name(day: u8) -> &'static str {
    DAY_NAMES[usize::from(day % DAYS_PER_WEEK)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> RecipeDraft {
        RecipeDraft {
            id: None,
            title: "Salad".to_string(),
            image: None,
            ingredients: vec!["Lettuce".to_string()],
            steps: vec!["Toss".to_string()],
            cooking_time: 10,
            servings: 2,
            tags: vec!["quick".to_string()],
        }
    }

    #[test]
    fn test_validate_draft_ok() {
        assert!(draft().validate().is_ok());
    }

    #[test]
    fn test_validate_empty_title() {
        let mut d = draft();
        d.title = "   ".to_string();
        assert_eq!(d.validate(), Err(ValidationError::EmptyTitle));
    }

    #[test]
    fn test_validate_zero_cooking_time() {
        let mut d = draft();
        d.cooking_time = 0;
        assert_eq!(d.validate(), Err(ValidationError::CookingTime));
    }

    #[test]
    fn test_validate_zero_servings() {
        let mut d = draft();
        d.servings = 0;
        assert_eq!(d.validate(), Err(ValidationError::Servings));
    }

    #[test]
    fn test_normalized_drops_blank_lines_and_duplicate_tags() {
        let d = RecipeDraft {
            title: "  Soup ".to_string(),
            image: Some("  ".to_string()),
            ingredients: vec!["Carrot".to_string(), " ".to_string(), String::new()],
            steps: vec![String::new(), "Boil".to_string()],
            tags: vec![
                " vegan".to_string(),
                "vegan".to_string(),
                String::new(),
                "winter".to_string(),
            ],
            ..draft()
        }
        .normalized();

        assert_eq!(d.title, "Soup");
        assert!(d.image.is_none());
        assert_eq!(d.ingredients, vec!["Carrot"]);
        assert_eq!(d.steps, vec!["Boil"]);
        assert_eq!(d.tags, vec!["vegan", "winter"]);
    }

    #[test]
    fn test_meal_kind_parse_case_insensitive() {
        assert_eq!("Breakfast".parse::<MealKind>().unwrap(), MealKind::Breakfast);
        assert_eq!(" DINNER ".parse::<MealKind>().unwrap(), MealKind::Dinner);
        assert!("snack".parse::<MealKind>().is_err());
    }

    #[test]
    fn test_validate_day() {
        assert_eq!(validate_day(0).unwrap(), 0);
        assert_eq!(validate_day(6).unwrap(), 6);
        assert_eq!(validate_day(7), Err(ValidationError::Day(7)));
    }

    #[test]
    fn test_day_name() {
        assert_eq!(day_name(0), "Monday");
        assert_eq!(day_name(6), "Sunday");
    }

    #[test]
    fn test_recipe_serializes_camel_case() {
        let recipe = Recipe {
            id: "1".to_string(),
            title: "Salad".to_string(),
            image: None,
            ingredients: vec![],
            steps: vec![],
            cooking_time: 10,
            servings: 2,
            tags: vec![],
            created_at: "2024-01-01T00:00:00.000Z".to_string(),
        };
        let json = serde_json::to_value(&recipe).unwrap();
        assert_eq!(json["cookingTime"], 10);
        assert_eq!(json["createdAt"], "2024-01-01T00:00:00.000Z");
        assert!(json.get("image").is_none());
    }

    #[test]
    fn test_meal_slot_reads_stored_layout() {
        let slot: MealSlot =
            serde_json::from_str(r#"{"day":2,"meal":"lunch","recipeId":null}"#).unwrap();
        assert_eq!(slot.day, 2);
        assert_eq!(slot.meal, MealKind::Lunch);
        assert!(slot.recipe_id.is_none());
    }
}

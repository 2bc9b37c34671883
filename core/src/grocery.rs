//! Grocery list derivation from the recipe collection and the weekly plan.
//!
//! Everything here is a pure function of its inputs; nothing is stored.

use std::collections::HashSet;
use std::fmt::{self, Write};

use serde::Serialize;

use crate::models::{GroceryItem, MealSlot, Recipe};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Category {
    #[serde(rename = "Produce")]
    Produce,
    #[serde(rename = "Dairy")]
    Dairy,
    #[serde(rename = "Meat & Seafood")]
    MeatSeafood,
    #[serde(rename = "Grains & Bakery")]
    GrainsBakery,
    #[serde(rename = "Pantry")]
    Pantry,
}

impl Category {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Category::Produce => "Produce",
            Category::Dairy => "Dairy",
            Category::MeatSeafood => "Meat & Seafood",
            Category::GrainsBakery => "Grains & Bakery",
            Category::Pantry => "Pantry",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Keyword table checked top to bottom; the first category with a keyword
/// contained in the ingredient wins. Anything unmatched is [`Category::Pantry`].
pub const CATEGORY_KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Produce,
        &["lettuce", "tomato", "onion", "pepper", "carrot", "spinach"],
    ),
    (
        Category::Dairy,
        &["milk", "cheese", "yogurt", "butter", "cream"],
    ),
    (
        Category::MeatSeafood,
        &["chicken", "beef", "pork", "fish", "turkey"],
    ),
    (
        Category::GrainsBakery,
        &["bread", "pasta", "rice", "flour", "cereal"],
    ),
];

#[must_use]
pub fn normalize_ingredient(ingredient: &str) -> String {
    ingredient.trim().to_lowercase()
}

#[must_use]
pub fn categorize(ingredient: &str) -> Category {
    let lower = ingredient.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map_or(Category::Pantry, |(category, _)| *category)
}

/// Recipes referenced by at least one filled slot, in collection order.
/// References to recipes that no longer exist are skipped.
#[must_use]
pub fn used_recipes<'a>(recipes: &'a [Recipe], slots: &[MealSlot]) -> Vec<&'a Recipe> {
    let used: HashSet<&str> = slots
        .iter()
        .filter_map(|s| s.recipe_id.as_deref())
        .collect();
    recipes
        .iter()
        .filter(|r| used.contains(r.id.as_str()))
        .collect()
}

/// One item per normalized ingredient, ordered by first appearance. Each
/// item lists the distinct titles of the recipes that need it.
#[must_use]
pub fn aggregate(recipes: &[Recipe], slots: &[MealSlot]) -> Vec<GroceryItem> {
    let mut items: Vec<GroceryItem> = Vec::new();

    for recipe in used_recipes(recipes, slots) {
        for ingredient in &recipe.ingredients {
            let normalized = normalize_ingredient(ingredient);
            let idx = if let Some(idx) = items.iter().position(|i| i.ingredient == normalized) {
                idx
            } else {
                items.push(GroceryItem {
                    ingredient: normalized,
                    recipes: Vec::new(),
                });
                items.len() - 1
            };
            let item = &mut items[idx];
            if !item.recipes.contains(&recipe.title) {
                item.recipes.push(recipe.title.clone());
            }
        }
    }

    items
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryGroup {
    pub category: Category,
    pub items: Vec<GroceryItem>,
}

/// Items bucketed by [`categorize`], groups sorted by category name.
#[must_use]
pub fn group_by_category(items: &[GroceryItem]) -> Vec<CategoryGroup> {
    let mut groups: Vec<CategoryGroup> = Vec::new();
    for item in items {
        let category = categorize(&item.ingredient);
        match groups.iter_mut().find(|g| g.category == category) {
            Some(group) => group.items.push(item.clone()),
            None => groups.push(CategoryGroup {
                category,
                items: vec![item.clone()],
            }),
        }
    }
    groups.sort_by(|a, b| a.category.name().cmp(b.category.name()));
    groups
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeIngredients {
    pub recipe_id: String,
    pub title: String,
    pub ingredients: Vec<String>,
}

/// Raw ingredient lists of the used recipes, as entered.
#[must_use]
pub fn group_by_recipe(recipes: &[Recipe], slots: &[MealSlot]) -> Vec<RecipeIngredients> {
    used_recipes(recipes, slots)
        .into_iter()
        .map(|r| RecipeIngredients {
            recipe_id: r.id.clone(),
            title: r.title.clone(),
            ingredients: r.ingredients.clone(),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroceryGrouping {
    #[default]
    Category,
    Recipe,
}

/// A grocery list ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "group", rename_all = "lowercase")]
pub enum GroceryView {
    Category {
        item_count: usize,
        groups: Vec<CategoryGroup>,
    },
    Recipe {
        item_count: usize,
        recipes: Vec<RecipeIngredients>,
    },
}

impl GroceryView {
    #[must_use]
    pub fn build(recipes: &[Recipe], slots: &[MealSlot], grouping: GroceryGrouping) -> Self {
        let items = aggregate(recipes, slots);
        match grouping {
            GroceryGrouping::Category => GroceryView::Category {
                item_count: items.len(),
                groups: group_by_category(&items),
            },
            GroceryGrouping::Recipe => GroceryView::Recipe {
                item_count: items.len(),
                recipes: group_by_recipe(recipes, slots),
            },
        }
    }

    /// Number of unique normalized ingredients, whatever the grouping.
    #[must_use]
    pub fn item_count(&self) -> usize {
        match self {
            GroceryView::Category { item_count, .. } | GroceryView::Recipe { item_count, .. } => {
                *item_count
            }
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.item_count() == 0
    }
}

/// Plain-text list suitable for pasting elsewhere.
#[must_use]
pub fn render_text(view: &GroceryView) -> String {
    let mut text = String::from("Grocery List\n\n");
    match view {
        GroceryView::Category { groups, .. } => {
            for group in groups {
                let _ = writeln!(text, "{}:", group.category);
                for item in &group.items {
                    let _ = writeln!(text, "  • {}", item.ingredient);
                }
                text.push('\n');
            }
        }
        GroceryView::Recipe { recipes, .. } => {
            for recipe in recipes {
                let _ = writeln!(text, "{}:", recipe.title);
                for ingredient in &recipe.ingredients {
                    let _ = writeln!(text, "  • {ingredient}");
                }
                text.push('\n');
            }
        }
    }
    text
}

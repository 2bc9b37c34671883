use std::path::Path;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};

use crate::chat::{ChatError, ChatMessage, ChatProvider, system_prompt};
use crate::db::{Database, MEAL_PLAN_KEY, RECIPES_KEY};
use crate::grocery::{self, GroceryGrouping, GroceryView};
use crate::models::{GroceryItem, MealKind, MealSlot, Recipe, RecipeDraft};
use crate::plan::{MealPlanStore, WeekPlan};
use crate::recipes::RecipeStore;

/// One planning session: the local database plus the recipe and meal-plan
/// stores loaded from it. Every mutation rewrites the affected blob before
/// returning.
pub struct MealPlanService {
    db: Database,
    recipes: RecipeStore,
    plan: MealPlanStore,
}

impl MealPlanService {
    pub fn new(db_path: &str) -> Result<Self> {
        Self::open(Database::open(Path::new(db_path))?)
    }

    pub fn new_in_memory() -> Result<Self> {
        Self::open(Database::open_in_memory()?)
    }

    pub fn open(db: Database) -> Result<Self> {
        let recipes: Vec<Recipe> = db
            .read_json(RECIPES_KEY)
            .context("Failed to load recipes")?
            .unwrap_or_default();
        let slots: Vec<MealSlot> = db
            .read_json(MEAL_PLAN_KEY)
            .context("Failed to load meal plan")?
            .unwrap_or_default();
        tracing::debug!(
            recipes = recipes.len(),
            slots = slots.len(),
            "loaded planner state"
        );
        Ok(Self {
            db,
            recipes: RecipeStore::new(recipes),
            plan: MealPlanStore::new(slots),
        })
    }

    // --- Recipes ---

    #[must_use]
    pub fn list_recipes(&self) -> &[Recipe] {
        self.recipes.list()
    }

    #[must_use]
    pub fn get_recipe(&self, id: &str) -> Option<&Recipe> {
        self.recipes.get(id)
    }

    #[must_use]
    pub fn find_recipe(&self, id_or_title: &str) -> Option<&Recipe> {
        self.recipes.find(id_or_title)
    }

    #[must_use]
    pub fn search_recipes(&self, query: Option<&str>, tag: Option<&str>) -> Vec<&Recipe> {
        self.recipes.search(query, tag)
    }

    #[must_use]
    pub fn all_tags(&self) -> Vec<&str> {
        self.recipes.all_tags()
    }

    /// Store the draft as-is. Validation is the caller's job.
    pub fn save_recipe(&mut self, draft: RecipeDraft) -> Result<Recipe> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let mut next = self.recipes.clone();
        let recipe = next.save(draft, &now);
        self.db
            .write_json(RECIPES_KEY, next.list())
            .context("Failed to save recipes")?;
        self.recipes = next;
        tracing::info!(id = %recipe.id, title = %recipe.title, "recipe saved");
        Ok(recipe)
    }

    /// Remove a recipe. Meal slots that point at it are left alone and read
    /// as empty from then on.
    pub fn delete_recipe(&mut self, id: &str) -> Result<bool> {
        let mut next = self.recipes.clone();
        if !next.delete(id) {
            return Ok(false);
        }
        self.db
            .write_json(RECIPES_KEY, next.list())
            .context("Failed to save recipes")?;
        self.recipes = next;
        tracing::info!(id, "recipe deleted");
        Ok(true)
    }

    // --- Meal plan ---

    #[must_use]
    pub fn meal_plan(&self) -> &[MealSlot] {
        self.plan.list()
    }

    pub fn assign_meal(&mut self, day: u8, meal: MealKind, recipe_id: &str) -> Result<()> {
        let mut next = self.plan.clone();
        next.assign(day, meal, recipe_id);
        self.persist_plan(next)?;
        tracing::info!(day, %meal, recipe_id, "meal assigned");
        Ok(())
    }

    pub fn clear_meal(&mut self, day: u8, meal: MealKind) -> Result<bool> {
        let mut next = self.plan.clone();
        if !next.clear(day, meal) {
            return Ok(false);
        }
        self.persist_plan(next)?;
        tracing::info!(day, %meal, "meal cleared");
        Ok(true)
    }

    #[must_use]
    pub fn lookup_meal(&self, day: u8, meal: MealKind) -> Option<&str> {
        self.plan.lookup(day, meal)
    }

    #[must_use]
    pub fn recipe_for_slot(&self, day: u8, meal: MealKind) -> Option<&Recipe> {
        self.plan.resolve(day, meal, self.recipes.list())
    }

    #[must_use]
    pub fn week(&self) -> WeekPlan<'_> {
        self.plan.week(self.recipes.list())
    }

    fn persist_plan(&mut self, next: MealPlanStore) -> Result<()> {
        self.db
            .write_json(MEAL_PLAN_KEY, next.list())
            .context("Failed to save meal plan")?;
        self.plan = next;
        Ok(())
    }

    // --- Grocery list ---

    #[must_use]
    pub fn grocery_items(&self) -> Vec<GroceryItem> {
        grocery::aggregate(self.recipes.list(), self.plan.list())
    }

    #[must_use]
    pub fn grocery_view(&self, grouping: GroceryGrouping) -> GroceryView {
        GroceryView::build(self.recipes.list(), self.plan.list(), grouping)
    }

    // --- Chat ---

    /// System instruction describing the saved recipes.
    #[must_use]
    pub fn chat_context(&self) -> String {
        system_prompt(self.recipes.list())
    }

    pub fn chat(
        &self,
        provider: &dyn ChatProvider,
        history: &[ChatMessage],
    ) -> Result<String, ChatError> {
        provider.complete(history, &self.chat_context())
    }
}

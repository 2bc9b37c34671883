use serde::Serialize;

use crate::models::{DAYS_PER_WEEK, MealKind, MealSlot, Recipe, day_name};

/// Weekly (day, meal) → recipe assignments. At most 21 slots exist, so
/// lookups scan linearly.
#[derive(Debug, Clone, Default)]
pub struct MealPlanStore {
    slots: Vec<MealSlot>,
}

impl MealPlanStore {
    #[must_use]
    pub fn new(slots: Vec<MealSlot>) -> Self {
        Self { slots }
    }

    #[must_use]
    pub fn list(&self) -> &[MealSlot] {
        &self.slots
    }

    /// Point (day, meal) at `recipe_id`, creating the slot on first use.
    pub fn assign(&mut self, day: u8, meal: MealKind, recipe_id: &str) {
        if let Some(slot) = self.slot_mut(day, meal) {
            slot.recipe_id = Some(recipe_id.to_string());
        } else {
            self.slots.push(MealSlot {
                day,
                meal,
                recipe_id: Some(recipe_id.to_string()),
            });
        }
    }

    /// Empty the slot without removing it. Returns whether the slot exists.
    pub fn clear(&mut self, day: u8, meal: MealKind) -> bool {
        match self.slot_mut(day, meal) {
            Some(slot) => {
                slot.recipe_id = None;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn lookup(&self, day: u8, meal: MealKind) -> Option<&str> {
        self.slots
            .iter()
            .find(|s| s.day == day && s.meal == meal)
            .and_then(|s| s.recipe_id.as_deref())
    }

    /// The recipe planned for (day, meal). A reference to a deleted recipe
    /// reads as an empty slot.
    #[must_use]
    pub fn resolve<'a>(&self, day: u8, meal: MealKind, recipes: &'a [Recipe]) -> Option<&'a Recipe> {
        let id = self.lookup(day, meal)?;
        recipes.iter().find(|r| r.id == id)
    }

    #[must_use]
    pub fn week<'a>(&self, recipes: &'a [Recipe]) -> WeekPlan<'a> {
        let days = (0..DAYS_PER_WEEK)
            .map(|day| PlannedDay {
                day,
                name: day_name(day),
                breakfast: self.resolve(day, MealKind::Breakfast, recipes),
                lunch: self.resolve(day, MealKind::Lunch, recipes),
                dinner: self.resolve(day, MealKind::Dinner, recipes),
            })
            .collect();
        WeekPlan { days }
    }

    fn slot_mut(&mut self, day: u8, meal: MealKind) -> Option<&mut MealSlot> {
        self.slots
            .iter_mut()
            .find(|s| s.day == day && s.meal == meal)
    }
}

/// Seven days of resolved meals, Monday first.
#[derive(Debug, Clone, Serialize)]
pub struct WeekPlan<'a> {
    pub days: Vec<PlannedDay<'a>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedDay<'a> {
    pub day: u8,
    pub name: &'static str,
    pub breakfast: Option<&'a Recipe>,
    pub lunch: Option<&'a Recipe>,
    pub dinner: Option<&'a Recipe>,
}

impl<'a> PlannedDay<'a> {
    #[must_use]
    pub fn meal(&self, meal: MealKind) -> Option<&'a Recipe> {
        match meal {
            MealKind::Breakfast => self.breakfast,
            MealKind::Lunch => self.lunch,
            MealKind::Dinner => self.dinner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe(id: &str, title: &str) -> Recipe {
        Recipe {
            id: id.to_string(),
            title: title.to_string(),
            image: None,
            ingredients: vec![],
            steps: vec![],
            cooking_time: 15,
            servings: 2,
            tags: vec![],
            created_at: "2024-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn test_assign_creates_slot() {
        let mut plan = MealPlanStore::default();
        plan.assign(0, MealKind::Breakfast, "r1");
        assert_eq!(plan.list().len(), 1);
        assert_eq!(plan.lookup(0, MealKind::Breakfast), Some("r1"));
        assert_eq!(plan.lookup(0, MealKind::Lunch), None);
    }

    #[test]
    fn test_assign_overwrites_same_key() {
        let mut plan = MealPlanStore::default();
        plan.assign(0, MealKind::Breakfast, "r1");
        plan.assign(0, MealKind::Breakfast, "r2");
        assert_eq!(plan.list().len(), 1);
        assert_eq!(plan.lookup(0, MealKind::Breakfast), Some("r2"));
    }

    #[test]
    fn test_clear_keeps_slot_record() {
        let mut plan = MealPlanStore::default();
        plan.assign(2, MealKind::Dinner, "r1");
        assert!(plan.clear(2, MealKind::Dinner));
        assert_eq!(plan.list().len(), 1);
        assert!(plan.list()[0].recipe_id.is_none());
        assert_eq!(plan.lookup(2, MealKind::Dinner), None);
    }

    #[test]
    fn test_clear_missing_slot_is_noop() {
        let mut plan = MealPlanStore::default();
        assert!(!plan.clear(4, MealKind::Lunch));
        assert!(plan.list().is_empty());
    }

    #[test]
    fn test_reassign_after_clear_reuses_slot() {
        let mut plan = MealPlanStore::default();
        plan.assign(1, MealKind::Lunch, "r1");
        plan.clear(1, MealKind::Lunch);
        plan.assign(1, MealKind::Lunch, "r3");
        assert_eq!(plan.list().len(), 1);
        assert_eq!(plan.lookup(1, MealKind::Lunch), Some("r3"));
    }

    #[test]
    fn test_resolve_ignores_dangling_reference() {
        let recipes = vec![recipe("r1", "Salad")];
        let mut plan = MealPlanStore::default();
        plan.assign(0, MealKind::Lunch, "r1");
        plan.assign(0, MealKind::Dinner, "deleted");

        assert_eq!(
            plan.resolve(0, MealKind::Lunch, &recipes).map(|r| r.title.as_str()),
            Some("Salad")
        );
        assert!(plan.resolve(0, MealKind::Dinner, &recipes).is_none());
    }

    #[test]
    fn test_week_grid() {
        let recipes = vec![recipe("r1", "Oats"), recipe("r2", "Curry")];
        let mut plan = MealPlanStore::default();
        plan.assign(0, MealKind::Breakfast, "r1");
        plan.assign(6, MealKind::Dinner, "r2");

        let week = plan.week(&recipes);
        assert_eq!(week.days.len(), 7);
        assert_eq!(week.days[0].name, "Monday");
        assert_eq!(week.days[0].breakfast.unwrap().title, "Oats");
        assert!(week.days[0].dinner.is_none());
        assert_eq!(week.days[6].meal(MealKind::Dinner).unwrap().title, "Curry");
    }
}

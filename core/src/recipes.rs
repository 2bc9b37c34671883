use uuid::Uuid;

use crate::models::{Recipe, RecipeDraft};

/// Flat recipe collection in insertion order.
///
/// The store does not validate drafts; callers run
/// [`RecipeDraft::validate`] first.
#[derive(Debug, Clone, Default)]
pub struct RecipeStore {
    recipes: Vec<Recipe>,
}

impl RecipeStore {
    #[must_use]
    pub fn new(recipes: Vec<Recipe>) -> Self {
        Self { recipes }
    }

    #[must_use]
    pub fn list(&self) -> &[Recipe] {
        &self.recipes
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Recipe> {
        self.recipes.iter().find(|r| r.id == id)
    }

    /// Look a recipe up by id, falling back to a case-insensitive title match.
    #[must_use]
    pub fn find(&self, id_or_title: &str) -> Option<&Recipe> {
        self.get(id_or_title).or_else(|| {
            let wanted = id_or_title.trim().to_lowercase();
            self.recipes
                .iter()
                .find(|r| r.title.to_lowercase() == wanted)
        })
    }

    /// Insert or replace. A draft whose id matches an existing record
    /// overwrites it in place and keeps the original id and `created_at`;
    /// anything else is appended with a fresh id and `now` as its timestamp.
    pub fn save(&mut self, draft: RecipeDraft, now: &str) -> Recipe {
        let RecipeDraft {
            id,
            title,
            image,
            ingredients,
            steps,
            cooking_time,
            servings,
            tags,
        } = draft;

        let existing = id
            .as_deref()
            .and_then(|id| self.recipes.iter().position(|r| r.id == id));

        match existing {
            Some(idx) => {
                let slot = &mut self.recipes[idx];
                *slot = Recipe {
                    id: slot.id.clone(),
                    title,
                    image,
                    ingredients,
                    steps,
                    cooking_time,
                    servings,
                    tags,
                    created_at: slot.created_at.clone(),
                };
                slot.clone()
            }
            None => {
                let recipe = Recipe {
                    id: Uuid::new_v4().to_string(),
                    title,
                    image,
                    ingredients,
                    steps,
                    cooking_time,
                    servings,
                    tags,
                    created_at: now.to_string(),
                };
                self.recipes.push(recipe.clone());
                recipe
            }
        }
    }

    /// Remove by id. Returns whether anything was removed.
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.recipes.len();
        self.recipes.retain(|r| r.id != id);
        self.recipes.len() != before
    }

    /// Filter by a case-insensitive substring of the title or any tag, and/or
    /// by an exact tag.
    #[must_use]
    pub fn search(&self, query: Option<&str>, tag: Option<&str>) -> Vec<&Recipe> {
        let query = query
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty());

        self.recipes
            .iter()
            .filter(|r| {
                query.as_deref().is_none_or(|q| {
                    r.title.to_lowercase().contains(q)
                        || r.tags.iter().any(|t| t.to_lowercase().contains(q))
                })
            })
            .filter(|r| tag.is_none_or(|t| r.tags.iter().any(|rt| rt == t)))
            .collect()
    }

    /// Every tag in use, in first-seen order.
    #[must_use]
    pub fn all_tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = Vec::new();
        for tag in self.recipes.iter().flat_map(|r| r.tags.iter()) {
            if !tags.contains(&tag.as_str()) {
                tags.push(tag);
            }
        }
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: &str = "2024-03-01T12:00:00.000Z";
    const LATER: &str = "2024-03-02T12:00:00.000Z";

    fn draft(title: &str, tags: &[&str]) -> RecipeDraft {
        RecipeDraft {
            id: None,
            title: title.to_string(),
            image: None,
            ingredients: vec!["Tomato".to_string()],
            steps: vec!["Cook".to_string()],
            cooking_time: 20,
            servings: 2,
            tags: tags.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn test_save_new_assigns_id_and_timestamp() {
        let mut store = RecipeStore::default();
        let recipe = store.save(draft("Salad", &[]), NOW);

        assert!(!recipe.id.is_empty());
        assert_eq!(recipe.created_at, NOW);
        assert_eq!(store.list().len(), 1);
        assert_eq!(store.list()[0], recipe);
    }

    #[test]
    fn test_save_new_ids_are_unique() {
        let mut store = RecipeStore::default();
        let a = store.save(draft("A", &[]), NOW);
        let b = store.save(draft("B", &[]), NOW);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_save_existing_replaces_and_keeps_timestamp() {
        let mut store = RecipeStore::default();
        let original = store.save(draft("Salad", &[]), NOW);

        let mut edit = RecipeDraft::from_recipe(&original);
        edit.title = "Green Salad".to_string();
        edit.servings = 4;
        let updated = store.save(edit, LATER);

        assert_eq!(updated.id, original.id);
        assert_eq!(updated.created_at, NOW);
        assert_eq!(updated.title, "Green Salad");
        assert_eq!(store.list().len(), 1);
        assert_eq!(store.get(&original.id).unwrap().servings, 4);
    }

    #[test]
    fn test_save_with_unknown_id_appends() {
        let mut store = RecipeStore::default();
        let mut d = draft("Ghost", &[]);
        d.id = Some("missing".to_string());
        let recipe = store.save(d, NOW);
        assert_ne!(recipe.id, "missing");
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_save_keeps_insertion_order_on_edit() {
        let mut store = RecipeStore::default();
        let a = store.save(draft("A", &[]), NOW);
        store.save(draft("B", &[]), NOW);
        store.save(RecipeDraft::from_recipe(&a), LATER);

        let titles: Vec<&str> = store.list().iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B"]);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let mut store = RecipeStore::default();
        let recipe = store.save(draft("Salad", &[]), NOW);
        assert!(store.delete(&recipe.id));
        assert!(store.list().is_empty());
        assert!(!store.delete(&recipe.id));
    }

    #[test]
    fn test_find_by_id_or_title() {
        let mut store = RecipeStore::default();
        let recipe = store.save(draft("Tomato Soup", &[]), NOW);
        assert_eq!(store.find(&recipe.id).unwrap().id, recipe.id);
        assert_eq!(store.find("tomato soup").unwrap().id, recipe.id);
        assert!(store.find("pizza").is_none());
    }

    #[test]
    fn test_search_by_title_and_tag_text() {
        let mut store = RecipeStore::default();
        store.save(draft("Tomato Soup", &["Winter"]), NOW);
        store.save(draft("Pancakes", &["breakfast"]), NOW);
        store.save(draft("Chili", &["winter", "spicy"]), NOW);

        let hits: Vec<&str> = store
            .search(Some("WINTER"), None)
            .iter()
            .map(|r| r.title.as_str())
            .collect();
        assert_eq!(hits, vec!["Tomato Soup", "Chili"]);

        let hits = store.search(Some("pan"), None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Pancakes");
    }

    #[test]
    fn test_search_by_exact_tag() {
        let mut store = RecipeStore::default();
        store.save(draft("Tomato Soup", &["Winter"]), NOW);
        store.save(draft("Chili", &["winter", "spicy"]), NOW);

        let hits = store.search(None, Some("winter"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Chili");

        assert_eq!(store.search(None, None).len(), 2);
        assert_eq!(store.search(Some("  "), None).len(), 2);
    }

    #[test]
    fn test_all_tags_first_seen_order() {
        let mut store = RecipeStore::default();
        store.save(draft("A", &["quick", "vegan"]), NOW);
        store.save(draft("B", &["vegan", "spicy"]), NOW);
        assert_eq!(store.all_tags(), vec!["quick", "vegan", "spicy"]);
    }
}

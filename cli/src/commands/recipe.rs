use anyhow::{Context, Result, bail};
use std::fmt::Write;
use std::path::Path;
use std::process;

use mealplan_core::models::{Recipe, RecipeDraft};
use mealplan_core::service::MealPlanService;

use super::helpers::{
    exit_not_found, json_error, plural, print_recipe_table, prompt_confirm, short_id,
};

pub(crate) const DEFAULT_COOKING_TIME: u32 = 30;
pub(crate) const DEFAULT_SERVINGS: u32 = 4;

/// Field overrides shared by `recipe edit`. Empty lists leave the stored
/// values alone.
#[derive(Debug, Default)]
pub(crate) struct RecipeEdits {
    pub title: Option<String>,
    pub image: Option<String>,
    pub ingredients: Vec<String>,
    pub steps: Vec<String>,
    pub cooking_time: Option<u32>,
    pub servings: Option<u32>,
    pub tags: Vec<String>,
}

impl RecipeEdits {
    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.image.is_none()
            && self.ingredients.is_empty()
            && self.steps.is_empty()
            && self.cooking_time.is_none()
            && self.servings.is_none()
            && self.tags.is_empty()
    }

    fn apply(self, draft: &mut RecipeDraft) {
        if let Some(title) = self.title {
            draft.title = title;
        }
        if let Some(image) = self.image {
            draft.image = Some(image);
        }
        if !self.ingredients.is_empty() {
            draft.ingredients = self.ingredients;
        }
        if !self.steps.is_empty() {
            draft.steps = self.steps;
        }
        if let Some(t) = self.cooking_time {
            draft.cooking_time = t;
        }
        if let Some(s) = self.servings {
            draft.servings = s;
        }
        if !self.tags.is_empty() {
            draft.tags = self.tags;
        }
    }
}

/// Normalize, validate and store a draft.
fn save_draft(svc: &mut MealPlanService, draft: RecipeDraft) -> Result<Recipe> {
    let draft = draft.normalized();
    draft.validate()?;
    svc.save_recipe(draft)
}

fn print_saved(verb: &str, recipe: &Recipe, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(recipe)?);
    } else {
        println!(
            "{verb} recipe: {} (id: {}, {}, {} min, {} servings)",
            recipe.title,
            short_id(&recipe.id),
            plural(recipe.ingredients.len(), "ingredient"),
            recipe.cooking_time,
            recipe.servings
        );
    }
    Ok(())
}

pub(crate) fn cmd_recipe_add(
    svc: &mut MealPlanService,
    draft: RecipeDraft,
    json: bool,
) -> Result<()> {
    let recipe = save_draft(svc, RecipeDraft { id: None, ..draft })?;
    print_saved("Created", &recipe, json)
}

pub(crate) fn cmd_recipe_edit(
    svc: &mut MealPlanService,
    recipe_ref: &str,
    edits: RecipeEdits,
    json: bool,
) -> Result<()> {
    if edits.is_empty() {
        bail!(
            "Nothing to update. Provide at least one of --title, --image, --ingredient, --step, --time, --servings, or --tag"
        );
    }
    let Some(existing) = svc.find_recipe(recipe_ref) else {
        exit_not_found(&format!("Recipe '{recipe_ref}' not found"), json);
    };
    let mut draft = RecipeDraft::from_recipe(existing);
    edits.apply(&mut draft);
    let recipe = save_draft(svc, draft)?;
    print_saved("Updated", &recipe, json)
}

pub(crate) fn cmd_recipe_show(svc: &MealPlanService, recipe_ref: &str, json: bool) -> Result<()> {
    let Some(recipe) = svc.find_recipe(recipe_ref) else {
        exit_not_found(&format!("Recipe '{recipe_ref}' not found"), json);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(recipe)?);
        return Ok(());
    }

    print!("{}", render_recipe(recipe));
    Ok(())
}

fn render_recipe(recipe: &Recipe) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {} ===", recipe.title);
    let _ = writeln!(
        out,
        "  {} min  |  {} servings  |  id: {}",
        recipe.cooking_time, recipe.servings, recipe.id
    );
    if !recipe.tags.is_empty() {
        let _ = writeln!(out, "  Tags: {}", recipe.tags.join(", "));
    }
    if let Some(image) = &recipe.image {
        let _ = writeln!(out, "  Image: {image}");
    }

    out.push_str("\n  INGREDIENTS:\n");
    for ingredient in &recipe.ingredients {
        let _ = writeln!(out, "    • {ingredient}");
    }

    out.push_str("\n  STEPS:\n");
    for (i, step) in recipe.steps.iter().enumerate() {
        let _ = writeln!(out, "    {}. {step}", i + 1);
    }
    out
}

pub(crate) fn cmd_recipe_list(
    svc: &MealPlanService,
    query: Option<&str>,
    tag: Option<&str>,
    json: bool,
) -> Result<()> {
    let recipes = svc.search_recipes(query, tag);
    if recipes.is_empty() {
        if json {
            println!("[]");
        } else if svc.list_recipes().is_empty() {
            eprintln!("No recipes yet. Add one with: mealplan recipe add \"<title>\"");
        } else {
            eprintln!("No recipes match your search");
        }
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&recipes)?);
        return Ok(());
    }

    print_recipe_table(&recipes);
    Ok(())
}

pub(crate) fn cmd_recipe_delete(
    svc: &mut MealPlanService,
    recipe_ref: &str,
    yes: bool,
    json: bool,
) -> Result<()> {
    let Some(recipe) = svc.find_recipe(recipe_ref) else {
        exit_not_found(&format!("Recipe '{recipe_ref}' not found"), json);
    };
    let (id, title) = (recipe.id.clone(), recipe.title.clone());

    if !yes && !prompt_confirm(&format!("Delete recipe '{title}'?"))? {
        if json {
            println!("{}", json_error("Deletion cancelled"));
        } else {
            eprintln!("Cancelled");
        }
        return Ok(());
    }

    svc.delete_recipe(&id)?;
    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted recipe: {title}");
    }
    Ok(())
}

pub(crate) fn cmd_recipe_tags(svc: &MealPlanService, json: bool) -> Result<()> {
    let tags = svc.all_tags();
    if json {
        println!("{}", serde_json::to_string_pretty(&tags)?);
        return Ok(());
    }
    if tags.is_empty() {
        eprintln!("No tags yet");
        process::exit(2);
    }
    for tag in tags {
        println!("{tag}");
    }
    Ok(())
}

pub(crate) fn cmd_recipe_import(
    svc: &mut MealPlanService,
    file: &Path,
    overrides: RecipeEdits,
    json: bool,
) -> Result<()> {
    let input = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;
    let fallback_title = overrides
        .title
        .as_deref()
        .or_else(|| file.file_stem().and_then(|s| s.to_str()));

    let mut draft = draft_from_cooklang(&input, fallback_title.map(String::from))?;
    overrides.apply(&mut draft);
    let recipe = save_draft(svc, draft)?;
    print_saved("Imported", &recipe, json)
}

/// Build a draft from Cooklang source. Metadata supplies the title and
/// servings when present; the title otherwise falls back to `fallback_title`.
fn draft_from_cooklang(input: &str, fallback_title: Option<String>) -> Result<RecipeDraft> {
    let (recipe, _report) = cooklang::parse(input)
        .into_result()
        .map_err(|e| anyhow::anyhow!("Failed to parse Cooklang file: {e}"))?;

    let title = recipe
        .metadata
        .title()
        .map(String::from)
        .or(fallback_title)
        .context("Could not determine recipe title. Use --title to specify one")?;

    let servings = recipe
        .metadata
        .servings()
        .and_then(|s| s.as_number())
        .and_then(|n| u32::try_from(n).ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_SERVINGS);

    let converter = cooklang::Converter::default();
    let ingredients: Vec<String> = recipe
        .group_ingredients(&converter)
        .iter()
        .map(|gi| {
            let name = gi.ingredient.display_name();
            match gi.quantity.iter().next() {
                Some(qty) => format!("{} {name}", quantity_text(qty)),
                None => name.to_string(),
            }
        })
        .collect();

    if ingredients.is_empty() {
        bail!("No ingredients found in recipe");
    }

    let mut steps = Vec::new();
    for section in &recipe.sections {
        for content in &section.content {
            if let cooklang::Content::Step(step) = content {
                let mut text = String::new();
                for item in &step.items {
                    match item {
                        cooklang::Item::Text { value } => text.push_str(value),
                        cooklang::Item::Ingredient { index } => {
                            text.push_str(&recipe.ingredients[*index].display_name());
                        }
                        cooklang::Item::Cookware { index } => {
                            text.push_str(&recipe.cookware[*index].display_name());
                        }
                        cooklang::Item::Timer { index } => {
                            let timer = &recipe.timers[*index];
                            if let Some(qty) = &timer.quantity {
                                text.push_str(&quantity_text(qty));
                            } else if let Some(name) = &timer.name {
                                text.push_str(name);
                            }
                        }
                        _ => {}
                    }
                }
                steps.push(text.trim().to_string());
            } else if let cooklang::Content::Text(text) = content {
                steps.push(text.trim().to_string());
            }
        }
    }

    Ok(RecipeDraft {
        id: None,
        title,
        image: None,
        ingredients,
        steps,
        cooking_time: DEFAULT_COOKING_TIME,
        servings,
        tags: Vec::new(),
    })
}

fn quantity_text(qty: &cooklang::Quantity) -> String {
    let value = match qty.value() {
        cooklang::Value::Number(n) => format_number(n.value()),
        cooklang::Value::Range { start, end } => {
            format!("{}-{}", format_number(start.value()), format_number(end.value()))
        }
        cooklang::Value::Text(t) => t.clone(),
    };
    match qty.unit() {
        Some(unit) => format!("{value} {unit}"),
        None => value,
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{n:.0}")
    } else {
        format!("{n}")
    }
}

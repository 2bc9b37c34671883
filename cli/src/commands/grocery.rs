use anyhow::Result;
use std::fmt::Write;
use std::process;

use mealplan_core::grocery::{GroceryGrouping, GroceryView, render_text};
use mealplan_core::service::MealPlanService;

use super::helpers::plural;

pub(crate) fn cmd_grocery(
    svc: &MealPlanService,
    by_recipe: bool,
    text: bool,
    json: bool,
) -> Result<()> {
    let grouping = if by_recipe {
        GroceryGrouping::Recipe
    } else {
        GroceryGrouping::Category
    };
    let view = svc.grocery_view(grouping);

    if view.is_empty() {
        if json {
            println!("{}", serde_json::to_string_pretty(&view)?);
        } else {
            eprintln!("No ingredients found. Plan some meals first with: mealplan plan assign");
        }
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else if text {
        print!("{}", render_text(&view));
    } else {
        print!("{}", render_view(&view));
    }
    Ok(())
}

fn render_view(view: &GroceryView) -> String {
    let mut out = format!("Grocery list ({})\n\n", plural(view.item_count(), "item"));
    match view {
        GroceryView::Category { groups, .. } => {
            for group in groups {
                let _ = writeln!(out, "  {} ({})", group.category, group.items.len());
                for item in &group.items {
                    let _ = writeln!(
                        out,
                        "    ☐ {}  [{}]",
                        item.ingredient,
                        item.recipes.join(", ")
                    );
                }
                out.push('\n');
            }
        }
        GroceryView::Recipe { recipes, .. } => {
            for recipe in recipes {
                let _ = writeln!(out, "  {}", recipe.title);
                for ingredient in &recipe.ingredients {
                    let _ = writeln!(out, "    ☐ {ingredient}");
                }
                out.push('\n');
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use mealplan_core::models::{MealKind, RecipeDraft};

    fn planned_service() -> MealPlanService {
        let mut svc = MealPlanService::new_in_memory().unwrap();
        let chili = svc
            .save_recipe(RecipeDraft {
                title: "Chili".to_string(),
                ingredients: vec!["Onion".to_string(), "Ground beef".to_string()],
                cooking_time: 40,
                servings: 4,
                ..RecipeDraft::default()
            })
            .unwrap();
        svc.assign_meal(0, MealKind::Dinner, &chili.id).unwrap();
        svc
    }

    #[test]
    fn test_render_by_category() {
        let svc = planned_service();
        let out = render_view(&svc.grocery_view(GroceryGrouping::Category));
        assert!(out.starts_with("Grocery list (2 items)"));
        assert!(out.contains("  Meat & Seafood (1)\n"));
        assert!(out.contains("    ☐ ground beef  [Chili]\n"));
        assert!(out.contains("  Produce (1)\n"));
    }

    #[test]
    fn test_render_by_recipe_keeps_original_text() {
        let svc = planned_service();
        let out = render_view(&svc.grocery_view(GroceryGrouping::Recipe));
        assert!(out.contains("  Chili\n"));
        assert!(out.contains("    ☐ Ground beef\n"));
    }
}

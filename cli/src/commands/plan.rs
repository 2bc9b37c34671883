use anyhow::Result;
use chrono::Datelike;
use tabled::{Table, Tabled, settings::Style};

use mealplan_core::models::{MealKind, day_name};
use mealplan_core::plan::WeekPlan;
use mealplan_core::service::MealPlanService;

use super::helpers::{exit_not_found, parse_day, parse_meal, truncate};

pub(crate) fn cmd_plan_show(svc: &MealPlanService, json: bool) -> Result<()> {
    let week = svc.week();
    if json {
        println!("{}", serde_json::to_string_pretty(&week)?);
        return Ok(());
    }
    let today = chrono::Local::now().weekday().num_days_from_monday();
    println!("{}", render_week(&week, u8::try_from(today).ok()));
    Ok(())
}

/// Grid of the week; `today` gets a marker next to its name.
fn render_week(week: &WeekPlan<'_>, today: Option<u8>) -> String {
    #[derive(Tabled)]
    struct DayRow {
        #[tabled(rename = "Day")]
        day: String,
        #[tabled(rename = "Breakfast")]
        breakfast: String,
        #[tabled(rename = "Lunch")]
        lunch: String,
        #[tabled(rename = "Dinner")]
        dinner: String,
    }

    let cell = |title: Option<&str>| title.map_or_else(|| "-".to_string(), |t| truncate(t, 24));
    let rows: Vec<DayRow> = week
        .days
        .iter()
        .map(|d| DayRow {
            day: if Some(d.day) == today {
                format!("▸ {}", d.name)
            } else {
                d.name.to_string()
            },
            breakfast: cell(d.meal(MealKind::Breakfast).map(|r| r.title.as_str())),
            lunch: cell(d.meal(MealKind::Lunch).map(|r| r.title.as_str())),
            dinner: cell(d.meal(MealKind::Dinner).map(|r| r.title.as_str())),
        })
        .collect();

    Table::new(&rows).with(Style::rounded()).to_string()
}

pub(crate) fn cmd_plan_assign(
    svc: &mut MealPlanService,
    day: &str,
    meal: &str,
    recipe_ref: &str,
    json: bool,
) -> Result<()> {
    let day = parse_day(day)?;
    let meal = parse_meal(meal)?;
    let Some(recipe) = svc.find_recipe(recipe_ref) else {
        exit_not_found(&format!("Recipe '{recipe_ref}' not found"), json);
    };
    let (id, title) = (recipe.id.clone(), recipe.title.clone());

    svc.assign_meal(day, meal, &id)?;
    if json {
        println!(
            "{}",
            serde_json::json!({ "day": day, "meal": meal, "recipeId": id })
        );
    } else {
        println!("Planned {title} for {} {meal}", day_name(day));
    }
    Ok(())
}

pub(crate) fn cmd_plan_clear(
    svc: &mut MealPlanService,
    day: &str,
    meal: &str,
    json: bool,
) -> Result<()> {
    let day = parse_day(day)?;
    let meal = parse_meal(meal)?;

    if svc.lookup_meal(day, meal).is_none() {
        exit_not_found(&format!("Nothing planned for {} {meal}", day_name(day)), json);
    }
    svc.clear_meal(day, meal)?;
    if json {
        println!("{}", serde_json::json!({ "cleared": { "day": day, "meal": meal } }));
    } else {
        println!("Cleared {} {meal}", day_name(day));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mealplan_core::models::RecipeDraft;

    #[test]
    fn test_render_week_grid() {
        let mut svc = MealPlanService::new_in_memory().unwrap();
        let oats = svc
            .save_recipe(RecipeDraft {
                title: "Overnight Oats".to_string(),
                ingredients: vec!["Oats".to_string()],
                cooking_time: 5,
                servings: 1,
                ..RecipeDraft::default()
            })
            .unwrap();
        svc.assign_meal(2, MealKind::Breakfast, &oats.id).unwrap();

        let grid = render_week(&svc.week(), Some(4));
        assert!(grid.contains("Breakfast"));
        assert!(grid.contains("Monday"));
        assert!(grid.contains("Sunday"));
        let wednesday = grid.lines().find(|l| l.contains("Wednesday")).unwrap();
        assert!(wednesday.contains("Overnight Oats"));
        let thursday = grid.lines().find(|l| l.contains("Thursday")).unwrap();
        assert!(!thursday.contains("Overnight Oats"));
        assert!(grid.contains("▸ Friday"));
        assert!(!render_week(&svc.week(), None).contains('▸'));
    }
}

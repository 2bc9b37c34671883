use anyhow::{Context, Result};
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use mealplan_core::models::{MealKind, Recipe, validate_day};

/// Parse a day: full or short English name (Monday first) or an index 0-6.
pub(crate) fn parse_day(day: &str) -> Result<u8> {
    match day.trim().to_lowercase().as_str() {
        "monday" | "mon" => Ok(0),
        "tuesday" | "tue" => Ok(1),
        "wednesday" | "wed" => Ok(2),
        "thursday" | "thu" => Ok(3),
        "friday" | "fri" => Ok(4),
        "saturday" | "sat" => Ok(5),
        "sunday" | "sun" => Ok(6),
        other => {
            let n: u8 = other.parse().with_context(|| {
                format!("Invalid day: {day}. Use monday-sunday, mon-sun, or 0-6")
            })?;
            Ok(validate_day(n)?)
        }
    }
}

pub(crate) fn parse_meal(meal: &str) -> Result<MealKind> {
    Ok(meal.parse::<MealKind>()?)
}

/// Ask a yes/no question on stderr; anything but y/yes is a no.
pub(crate) fn prompt_confirm(question: &str) -> Result<bool> {
    eprint!("{question} [y/N]: ");
    io::stderr().flush()?;
    let stdin = io::stdin();
    let Some(line) = stdin.lock().lines().next() else {
        return Ok(false);
    };
    Ok(is_yes(&line?))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

pub(crate) fn print_recipe_table(recipes: &[&Recipe]) {
    #[derive(Tabled)]
    struct RecipeRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Title")]
        title: String,
        #[tabled(rename = "Time")]
        time: String,
        #[tabled(rename = "Servings")]
        servings: u32,
        #[tabled(rename = "Tags")]
        tags: String,
        #[tabled(rename = "Ingredients")]
        ingredients: String,
    }

    let rows: Vec<RecipeRow> = recipes
        .iter()
        .map(|r| RecipeRow {
            id: short_id(&r.id).to_string(),
            title: truncate(&r.title, 30),
            time: format!("{}m", r.cooking_time),
            servings: r.servings,
            tags: truncate(&r.tags.join(", "), 25),
            ingredients: ingredient_preview(&r.ingredients),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..4)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

/// First three ingredients, with an ellipsis when there are more.
pub(crate) fn ingredient_preview(ingredients: &[String]) -> String {
    let mut preview = ingredients
        .iter()
        .take(3)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if ingredients.len() > 3 {
        preview.push_str("...");
    }
    preview
}

/// Leading part of a UUID, enough to tell recipes apart in a table.
pub(crate) fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

pub(crate) fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{count} {word}")
    } else {
        format!("{count} {word}s")
    }
}

/// Report a missing record the way every command does and exit with status 2.
pub(crate) fn exit_not_found(message: &str, json: bool) -> ! {
    if json {
        println!("{}", json_error(message));
    } else {
        eprintln!("{message}");
    }
    process::exit(2);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_day_names() {
        assert_eq!(parse_day("Monday").unwrap(), 0);
        assert_eq!(parse_day("wed").unwrap(), 2);
        assert_eq!(parse_day("SUN").unwrap(), 6);
    }

    #[test]
    fn test_parse_day_index() {
        assert_eq!(parse_day("0").unwrap(), 0);
        assert_eq!(parse_day("6").unwrap(), 6);
        assert!(parse_day("7").is_err());
    }

    #[test]
    fn test_parse_day_invalid() {
        assert!(parse_day("someday").is_err());
        assert!(parse_day("-1").is_err());
    }

    #[test]
    fn test_parse_meal() {
        assert_eq!(parse_meal("Lunch").unwrap(), MealKind::Lunch);
        assert!(parse_meal("snack").is_err());
    }

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y"));
        assert!(is_yes(" YES\n"));
        assert!(!is_yes(""));
        assert!(!is_yes("nope"));
    }

    #[test]
    fn test_ingredient_preview() {
        let few = vec!["a".to_string(), "b".to_string()];
        assert_eq!(ingredient_preview(&few), "a, b");
        let many: Vec<String> = ["a", "b", "c", "d"].iter().map(ToString::to_string).collect();
        assert_eq!(ingredient_preview(&many), "a, b, c...");
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0123456789abcdef"), "01234567");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world this is long", 10), "hello w...");
    }

    #[test]
    fn test_truncate_utf8() {
        // Should not panic on multi-byte characters
        assert_eq!(truncate("Crème fraîche", 10), "Crème f...");
        assert_eq!(truncate("日清カップヌードル", 8), "日清カップ...");
    }

    #[test]
    fn test_plural() {
        assert_eq!(plural(1, "recipe"), "1 recipe");
        assert_eq!(plural(2, "recipe"), "2 recipes");
    }

    #[test]
    fn test_json_error() {
        assert_eq!(json_error("nope"), r#"{"error":"nope"}"#);
    }
}

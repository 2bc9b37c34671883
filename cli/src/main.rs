mod commands;
mod config;
mod openai;
mod server;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{
    DEFAULT_COOKING_TIME, DEFAULT_SERVINGS, RecipeEdits, cmd_chat, cmd_grocery, cmd_plan_assign,
    cmd_plan_clear, cmd_plan_show, cmd_recipe_add, cmd_recipe_delete, cmd_recipe_edit,
    cmd_recipe_import, cmd_recipe_list, cmd_recipe_show, cmd_recipe_tags,
};
use crate::config::Config;
use crate::openai::OpenAiClient;
use mealplan_core::db::Database;
use mealplan_core::models::RecipeDraft;
use mealplan_core::service::MealPlanService;

#[derive(Parser)]
#[command(
    name = "mealplan",
    version,
    about = "Plan a week of meals, keep a recipe library, and build the grocery list"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the recipe library
    Recipe {
        #[command(subcommand)]
        command: RecipeCommands,
    },
    /// View and edit the weekly meal plan
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Show the grocery list for every planned meal
    Grocery {
        /// Group ingredients by recipe instead of by store section
        #[arg(long)]
        by_recipe: bool,
        /// Print a plain-text list for copying elsewhere
        #[arg(long, conflicts_with = "json")]
        text: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Ask the cooking assistant (interactive when no prompt is given)
    Chat {
        /// A single question; omit to start a conversation
        prompt: Option<String>,
        /// Output replies as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Disable API key authentication (for development/testing)
        #[arg(long)]
        no_auth: bool,
    },
}

/// Recipe fields given on the command line.
#[derive(Args)]
struct RecipeFieldArgs {
    /// Image URL
    #[arg(long)]
    image: Option<String>,
    /// Ingredient line (repeat for each ingredient)
    #[arg(short, long = "ingredient", value_name = "TEXT")]
    ingredients: Vec<String>,
    /// Instruction step (repeat for each step, in order)
    #[arg(short, long = "step", value_name = "TEXT")]
    steps: Vec<String>,
    /// Tag (repeat for several)
    #[arg(long = "tag", value_name = "TAG")]
    tags: Vec<String>,
}

#[derive(Subcommand)]
enum RecipeCommands {
    /// Add a recipe
    Add {
        /// Recipe title
        title: String,
        #[command(flatten)]
        fields: RecipeFieldArgs,
        /// Cooking time in minutes
        #[arg(short, long, default_value_t = DEFAULT_COOKING_TIME)]
        time: u32,
        /// Number of servings
        #[arg(long, default_value_t = DEFAULT_SERVINGS)]
        servings: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change an existing recipe (lists given here replace the stored ones)
    Edit {
        /// Recipe ID or title
        recipe: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        fields: RecipeFieldArgs,
        /// Cooking time in minutes
        #[arg(short, long)]
        time: Option<u32>,
        /// Number of servings
        #[arg(long)]
        servings: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a recipe with its ingredients and steps
    Show {
        /// Recipe ID or title
        recipe: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List recipes, optionally filtered
    List {
        /// Case-insensitive match against title and tags
        #[arg(short, long)]
        search: Option<String>,
        /// Only recipes carrying this tag
        #[arg(long)]
        tag: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a recipe
    Delete {
        /// Recipe ID or title
        recipe: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List every tag in use
    Tags {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import a recipe from a Cooklang (.cook) file
    Import {
        /// Path to the .cook file
        file: std::path::PathBuf,
        /// Title override (defaults to metadata title or filename)
        #[arg(long)]
        title: Option<String>,
        /// Cooking time in minutes
        #[arg(short, long)]
        time: Option<u32>,
        /// Servings override (defaults to metadata servings)
        #[arg(long)]
        servings: Option<u32>,
        /// Tag (repeat for several)
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PlanCommands {
    /// Show the week as a grid
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Put a recipe in a meal slot, replacing whatever was there
    Assign {
        /// Day: monday-sunday, mon-sun, or 0-6 (0 = Monday)
        day: String,
        /// Meal: breakfast, lunch, dinner
        meal: String,
        /// Recipe ID or title
        recipe: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Empty a meal slot
    Clear {
        /// Day: monday-sunday, mon-sun, or 0-6 (0 = Monday)
        day: String,
        /// Meal: breakfast, lunch, dinner
        meal: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if matches!(cli.command, Commands::Serve { .. }) {
        "mealplan=info,mealplan_core=info,tower_http=info"
    } else {
        "warn"
    };
    init_tracing(default_filter);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let mut svc = MealPlanService::open(Database::open(&config.db_path)?)?;

    match cli.command {
        Commands::Recipe { command } => run_recipe(&mut svc, command),
        Commands::Plan { command } => match command {
            PlanCommands::Show { json } => cmd_plan_show(&svc, json),
            PlanCommands::Assign {
                day,
                meal,
                recipe,
                json,
            } => cmd_plan_assign(&mut svc, &day, &meal, &recipe, json),
            PlanCommands::Clear { day, meal, json } => cmd_plan_clear(&mut svc, &day, &meal, json),
        },
        Commands::Grocery {
            by_recipe,
            text,
            json,
        } => cmd_grocery(&svc, by_recipe, text, json),
        Commands::Chat { prompt, json } => {
            let client = OpenAiClient::new(config.chat.clone())?;
            cmd_chat(&svc, &client, prompt.as_deref(), json)
        }
        Commands::Serve {
            port,
            bind,
            no_auth,
        } => {
            let (api_key, new_api_key) = if no_auth {
                (None, false)
            } else {
                let (key, new) = config.load_or_create_api_key()?;
                (Some(key), new)
            };
            let client = OpenAiClient::new(config.chat.clone())?;
            if !client.is_configured() {
                eprintln!(
                    "Warning: {} is not set. /api/chat will answer 503 until it is.",
                    config::OPENAI_API_KEY_VAR
                );
            }
            server::start_server(svc, client, port, &bind, api_key, new_api_key).await
        }
    }
}

fn run_recipe(svc: &mut MealPlanService, command: RecipeCommands) -> Result<()> {
    match command {
        RecipeCommands::Add {
            title,
            fields,
            time,
            servings,
            json,
        } => {
            let draft = RecipeDraft {
                id: None,
                title,
                image: fields.image,
                ingredients: fields.ingredients,
                steps: fields.steps,
                cooking_time: time,
                servings,
                tags: fields.tags,
            };
            cmd_recipe_add(svc, draft, json)
        }
        RecipeCommands::Edit {
            recipe,
            title,
            fields,
            time,
            servings,
            json,
        } => {
            let edits = RecipeEdits {
                title,
                image: fields.image,
                ingredients: fields.ingredients,
                steps: fields.steps,
                cooking_time: time,
                servings,
                tags: fields.tags,
            };
            cmd_recipe_edit(svc, &recipe, edits, json)
        }
        RecipeCommands::Show { recipe, json } => cmd_recipe_show(svc, &recipe, json),
        RecipeCommands::List { search, tag, json } => {
            cmd_recipe_list(svc, search.as_deref(), tag.as_deref(), json)
        }
        RecipeCommands::Delete { recipe, yes, json } => cmd_recipe_delete(svc, &recipe, yes, json),
        RecipeCommands::Tags { json } => cmd_recipe_tags(svc, json),
        RecipeCommands::Import {
            file,
            title,
            time,
            servings,
            tags,
            json,
        } => {
            let overrides = RecipeEdits {
                title,
                cooking_time: time,
                servings,
                tags,
                ..RecipeEdits::default()
            };
            cmd_recipe_import(svc, &file, overrides, json)
        }
    }
}

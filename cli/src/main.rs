mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{
    Nutrition, cmd_food_add, cmd_food_delete, cmd_food_list, cmd_food_show, cmd_food_update,
    cmd_fridge_add, cmd_fridge_list, cmd_fridge_set, cmd_plan_add_meal, cmd_plan_create,
    cmd_plan_delete, cmd_plan_list, cmd_plan_remove_meal, cmd_plan_show,
    cmd_recipe_add_ingredient, cmd_recipe_add_step, cmd_recipe_create, cmd_recipe_delete,
    cmd_recipe_list, cmd_recipe_remove_ingredient, cmd_recipe_show, cmd_shopping,
};
use crate::config::Config;
use mealplanner_core::db::Database;

#[derive(Parser)]
#[command(
    name = "mealplanner",
    version,
    about = "Plan weekly meals from your recipes and shop for what the fridge is missing"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the food catalogue
    Food {
        #[command(subcommand)]
        command: FoodCommands,
    },
    /// Track what is in the fridge
    Fridge {
        #[command(subcommand)]
        command: FridgeCommands,
    },
    /// Manage recipes, their ingredients and instructions
    Recipe {
        #[command(subcommand)]
        command: RecipeCommands,
    },
    /// Manage weekly meal plans
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Show what to buy for all planned meals, minus fridge stock
    Shopping {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args)]
struct NutritionArgs {
    /// Calories per unit
    #[arg(long)]
    calories: Option<f64>,
    /// Fat per unit, in milligrams
    #[arg(long)]
    fat: Option<f64>,
    /// Cholesterol per unit, in milligrams
    #[arg(long)]
    cholesterol: Option<f64>,
    /// Sodium per unit, in milligrams
    #[arg(long)]
    sodium: Option<f64>,
    /// Carbohydrates per unit, in milligrams
    #[arg(long)]
    carbohydrates: Option<f64>,
    /// Dietary fiber per unit, in milligrams
    #[arg(long)]
    fiber: Option<f64>,
    /// Sugars per unit, in milligrams
    #[arg(long)]
    sugars: Option<f64>,
    /// Protein per unit, in milligrams
    #[arg(long)]
    protein: Option<f64>,
}

impl From<NutritionArgs> for Nutrition {
    fn from(args: NutritionArgs) -> Self {
        Nutrition {
            calories: args.calories,
            fat: args.fat,
            cholesterol: args.cholesterol,
            sodium: args.sodium,
            carbohydrates: args.carbohydrates,
            dietary_fiber: args.fiber,
            sugars: args.sugars,
            protein: args.protein,
        }
    }
}

#[derive(Subcommand)]
enum FoodCommands {
    /// Add a food
    Add {
        /// Food name
        name: String,
        /// Unit the nutrition values refer to (e.g. "slice", "cup")
        #[arg(short, long)]
        unit: String,
        /// Food group: fruit, vegetable, grains, protein, dairy
        #[arg(short, long)]
        group: Option<String>,
        #[command(flatten)]
        nutrition: NutritionArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change fields of a food
    Update {
        /// Food ID
        id: i64,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New unit
        #[arg(short, long)]
        unit: Option<String>,
        /// New food group
        #[arg(short, long)]
        group: Option<String>,
        #[command(flatten)]
        nutrition: NutritionArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List foods, optionally filtered by name
    List {
        /// Only foods whose name contains this text
        #[arg(short, long)]
        search: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show nutrition details of a food
    Show {
        /// Food ID
        id: i64,
        /// Scale the values to this many units
        #[arg(short, long)]
        quantity: Option<f64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a food (also removes it from recipes and the fridge)
    Delete {
        /// Food ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum FridgeCommands {
    /// Put a food in the fridge
    Add {
        /// Food ID
        food_id: i64,
        /// Quantity, in the food's unit
        quantity: f64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List fridge contents
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set the quantity of a fridge item (0 removes it)
    Set {
        /// Fridge item ID
        id: i64,
        /// New quantity
        quantity: f64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum RecipeCommands {
    /// Create a new recipe
    Create {
        /// Recipe name
        name: String,
        /// Category (e.g. "breakfast", "dessert")
        #[arg(short, long)]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add an ingredient to a recipe, or change its quantity
    AddIngredient {
        /// Recipe ID
        recipe_id: i64,
        /// Food ID
        food_id: i64,
        /// Quantity, in the food's unit
        quantity: f64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove an ingredient from a recipe
    RemoveIngredient {
        /// Recipe ID
        recipe_id: i64,
        /// Food ID
        food_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add an instruction step to a recipe
    AddStep {
        /// Recipe ID
        recipe_id: i64,
        /// Instruction text
        instruction: String,
        /// Position of the step (default: after the last one)
        #[arg(long)]
        step: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a recipe with its ingredients and instructions
    Show {
        /// Recipe ID
        recipe_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List all recipes
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a recipe along with its planned meals
    Delete {
        /// Recipe ID
        recipe_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PlanCommands {
    /// Create a meal plan for one week
    Create {
        /// Plan name
        name: String,
        /// First day of the week (YYYY-MM-DD, today, tomorrow or next-monday; default: today)
        #[arg(short, long)]
        week_start: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Schedule a recipe for a meal
    AddMeal {
        /// Plan ID
        plan_id: i64,
        /// Day of the plan's week, 1 to 7
        day: i64,
        /// Meal type: breakfast, lunch, dinner
        meal_type: String,
        /// Recipe ID
        recipe_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a planned meal
    RemoveMeal {
        /// Meal ID
        meal_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the meals of a plan
    Show {
        /// Plan ID
        plan_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List all meal plans
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a meal plan and its meals
    Delete {
        /// Plan ID
        plan_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

#[allow(clippy::too_many_lines)]
fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    tracing::debug!(data_dir = %config.data_dir.display(), "loaded configuration");
    let db = Database::connect(&config.database)?;

    let result = match cli.command {
        Commands::Food { command } => match command {
            FoodCommands::Add {
                name,
                unit,
                group,
                nutrition,
                json,
            } => cmd_food_add(&db, &name, &unit, group, &nutrition.into(), json),
            FoodCommands::Update {
                id,
                name,
                unit,
                group,
                nutrition,
                json,
            } => cmd_food_update(&db, id, name, unit, group, &nutrition.into(), json),
            FoodCommands::List { search, json } => cmd_food_list(&db, search.as_deref(), json),
            FoodCommands::Show { id, quantity, json } => cmd_food_show(&db, id, quantity, json),
            FoodCommands::Delete { id, json } => cmd_food_delete(&db, id, json),
        },
        Commands::Fridge { command } => match command {
            FridgeCommands::Add {
                food_id,
                quantity,
                json,
            } => cmd_fridge_add(&db, food_id, quantity, json),
            FridgeCommands::List { json } => cmd_fridge_list(&db, json),
            FridgeCommands::Set { id, quantity, json } => cmd_fridge_set(&db, id, quantity, json),
        },
        Commands::Recipe { command } => match command {
            RecipeCommands::Create {
                name,
                category,
                json,
            } => cmd_recipe_create(&db, &name, category, json),
            RecipeCommands::AddIngredient {
                recipe_id,
                food_id,
                quantity,
                json,
            } => cmd_recipe_add_ingredient(&db, recipe_id, food_id, quantity, json),
            RecipeCommands::RemoveIngredient {
                recipe_id,
                food_id,
                json,
            } => cmd_recipe_remove_ingredient(&db, recipe_id, food_id, json),
            RecipeCommands::AddStep {
                recipe_id,
                instruction,
                step,
                json,
            } => cmd_recipe_add_step(&db, recipe_id, &instruction, step, json),
            RecipeCommands::Show { recipe_id, json } => cmd_recipe_show(&db, recipe_id, json),
            RecipeCommands::List { json } => cmd_recipe_list(&db, json),
            RecipeCommands::Delete { recipe_id, json } => cmd_recipe_delete(&db, recipe_id, json),
        },
        Commands::Plan { command } => match command {
            PlanCommands::Create {
                name,
                week_start,
                json,
            } => cmd_plan_create(&db, &name, week_start.as_deref(), json),
            PlanCommands::AddMeal {
                plan_id,
                day,
                meal_type,
                recipe_id,
                json,
            } => cmd_plan_add_meal(&db, plan_id, day, &meal_type, recipe_id, json),
            PlanCommands::RemoveMeal { meal_id, json } => cmd_plan_remove_meal(&db, meal_id, json),
            PlanCommands::Show { plan_id, json } => cmd_plan_show(&db, plan_id, json),
            PlanCommands::List { json } => cmd_plan_list(&db, json),
            PlanCommands::Delete { plan_id, json } => cmd_plan_delete(&db, plan_id, json),
        },
        Commands::Shopping { json } => cmd_shopping(&db, json),
    };

    finish(result, db.close())
}

/// A command failure wins over a failure to close the database.
fn finish(result: Result<()>, closed: Result<()>) -> Result<()> {
    result?;
    closed
}

//! Kitchen Planner
//!
//! Ingredients, recipes and a shopping list, with ingredients ranked by how
//! recently and often they were used.

mod categorize;
mod config;
mod db;
mod error;
mod kitchen;
mod logging;
mod models;
mod reconcile;
mod reorder;
mod usage;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::categorize::Categorizer;
use crate::config::Config;
use crate::kitchen::SaveRecipe;
use crate::models::{IngredientLine, RequestContext};

#[derive(Parser)]
#[command(name = "kitchen-planner")]
#[command(about = "Ingredients, recipes and shopping list with usage-ranked ingredients")]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize empty database with schema
    Init,

    /// Manage ingredient categories
    #[command(subcommand)]
    Category(CategoryCommand),

    /// Manage ingredients
    #[command(subcommand)]
    Ingredient(IngredientCommand),

    /// Manage recipes
    #[command(subcommand)]
    Recipe(RecipeCommand),

    /// Manage the shopping list
    #[command(subcommand)]
    Shop(ShopCommand),

    /// Load sample data for trying things out
    LoadSample,
}

#[derive(Subcommand)]
enum CategoryCommand {
    /// Create a category
    Add { name: String },
    /// List categories
    List,
}

#[derive(Subcommand)]
enum IngredientCommand {
    /// Create an ingredient (categorized automatically unless --category is given)
    Add {
        name: String,
        #[arg(short, long)]
        category: Option<i64>,
    },
    /// List ingredients, most used first
    List {
        /// Only show names containing this text
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Record a usage of an ingredient
    Use { id: i64 },
    /// Move an ingredient to another category
    Categorize { id: i64, category: i64 },
    /// Delete an ingredient that no recipe uses
    Delete { id: i64 },
    /// Show the usage history of an ingredient
    History { id: i64 },
}

#[derive(Subcommand)]
enum RecipeCommand {
    /// Create or update a recipe from a JSON file of ingredient lines
    Save {
        /// Existing recipe to update
        #[arg(long)]
        id: Option<i64>,
        #[arg(short, long)]
        name: String,
        /// JSON array of lines, each tagged "kind": "existing" or "new"
        #[arg(short, long)]
        lines: PathBuf,
    },
    /// List recipes
    List,
    /// Show a recipe with its ingredient lines
    Show { id: i64 },
    /// Delete a recipe
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum ShopCommand {
    /// Add an ingredient to the shopping list
    Add {
        ingredient: i64,
        #[arg(short, long)]
        quantity: Option<f64>,
        #[arg(long)]
        unit: Option<String>,
    },
    /// Add every ingredient of a recipe
    AddRecipe { recipe: i64 },
    /// Show the shopping list
    List,
    /// Tick an item off (or back on with --undo)
    Check {
        id: i64,
        #[arg(long)]
        undo: bool,
    },
    /// Move an item to a 0-based position
    Move { id: i64, to: usize },
    /// Remove an item
    Remove { id: i64 },
    /// Remove all checked items
    Clear,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.config.log_level)?;

    let mut conn = Connection::open(&cli.config.database)
        .with_context(|| format!("Failed to open {}", cli.config.database.display()))?;
    db::init_schema(&conn)?;

    let ctx = cli.config.request_context();
    let categorizer = cli.config.categorizer();
    let now = Utc::now();

    match cli.command {
        Commands::Init => {
            println!("Database initialized at: {}", cli.config.database.display());
        }
        Commands::Category(command) => run_category(&mut conn, &ctx, command, now)?,
        Commands::Ingredient(command) => run_ingredient(&mut conn, &ctx, &categorizer, command, now)?,
        Commands::Recipe(command) => run_recipe(&mut conn, &ctx, &categorizer, command, now)?,
        Commands::Shop(command) => run_shop(&mut conn, &ctx, command, now)?,
        Commands::LoadSample => {
            load_sample_data(&mut conn, &ctx, now)?;
            println!("Sample data loaded successfully!");
        }
    }

    Ok(())
}

fn run_category(
    conn: &mut Connection,
    ctx: &RequestContext,
    command: CategoryCommand,
    now: DateTime<Utc>,
) -> Result<()> {
    match command {
        CategoryCommand::Add { name } => {
            let category = kitchen::create_category(conn, ctx, &name, now)?;
            println!("Category {} ({})", category.name, category.id);
        }
        CategoryCommand::List => {
            let categories = kitchen::list_categories(conn, ctx)?;
            if categories.is_empty() {
                println!("No categories yet.");
            }
            for c in categories {
                println!("{:>5}  {}", c.id, c.name);
            }
        }
    }
    Ok(())
}

fn run_ingredient(
    conn: &mut Connection,
    ctx: &RequestContext,
    categorizer: &Categorizer,
    command: IngredientCommand,
    now: DateTime<Utc>,
) -> Result<()> {
    match command {
        IngredientCommand::Add { name, category } => {
            let ingredient = kitchen::create_ingredient(conn, ctx, categorizer, &name, category, now)?;
            println!("Ingredient {} ({})", ingredient.name, ingredient.id);
        }
        IngredientCommand::List { search } => {
            let ingredients = kitchen::list_ingredients(conn, ctx, search.as_deref(), now)?;
            if ingredients.is_empty() {
                println!("No ingredients found.");
            } else {
                println!("{:>5}  {:<30} {:>8}", "ID", "Ingredient", "Score");
                println!("{}", "-".repeat(45));
                for i in ingredients {
                    println!("{:>5}  {:<30} {:>8.3}", i.id, i.name, i.live_score(now));
                }
            }
        }
        IngredientCommand::Use { id } => {
            let ingredient = kitchen::record_ingredient_usage(conn, ctx, id, now)?;
            println!("{} score now {:.3}", ingredient.name, ingredient.live_score(now));
        }
        IngredientCommand::Categorize { id, category } => {
            let ingredient = kitchen::set_ingredient_category(conn, ctx, id, category)?;
            println!("{} moved to category {}", ingredient.name, category);
        }
        IngredientCommand::Delete { id } => {
            kitchen::delete_ingredient(conn, ctx, id)?;
            println!("Deleted ingredient {}", id);
        }
        IngredientCommand::History { id } => {
            for entry in kitchen::ingredient_history(conn, ctx, id)? {
                match entry.recipe_id {
                    Some(recipe) => println!("{}  {} (recipe {})", entry.created_at, entry.event, recipe),
                    None => println!("{}  {}", entry.created_at, entry.event),
                }
            }
        }
    }
    Ok(())
}

fn run_recipe(
    conn: &mut Connection,
    ctx: &RequestContext,
    categorizer: &Categorizer,
    command: RecipeCommand,
    now: DateTime<Utc>,
) -> Result<()> {
    match command {
        RecipeCommand::Save { id, name, lines: path } => {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let lines = models::parse_lines(&content)
                .with_context(|| format!("Failed to parse ingredient lines in {}", path.display()))?;

            let request = SaveRecipe {
                recipe_id: id,
                name,
                lines,
            };
            let saved = kitchen::save_recipe(conn, ctx, categorizer, request, now)?;
            if saved.plan.is_noop() {
                println!("Recipe {} ({}): ingredients unchanged", saved.recipe.name, saved.recipe.id);
                return Ok(());
            }
            println!(
                "Saved recipe {} ({}): {} inserted, {} updated, {} removed, {} unchanged",
                saved.recipe.name,
                saved.recipe.id,
                saved.plan.to_insert.len(),
                saved.plan.to_update.len(),
                saved.plan.to_delete.len(),
                saved.plan.unchanged.len(),
            );
        }
        RecipeCommand::List => {
            let recipes = kitchen::list_recipes(conn, ctx)?;
            if recipes.is_empty() {
                println!("No recipes yet.");
            }
            for r in recipes {
                println!("{:>5}  {}", r.id, r.name);
            }
        }
        RecipeCommand::Show { id } => {
            let (recipe, lines) = kitchen::get_recipe(conn, ctx, id)?;
            println!("Recipe: {}", recipe.name);
            println!("  ID: {}", recipe.id);
            println!("  Updated: {}", recipe.updated_at);
            if !lines.is_empty() {
                println!("  Ingredients:");
                for (line, name) in lines {
                    println!("    [{}] {}{}", line.id, format_amount(line.quantity, line.unit.as_deref()), name);
                    if let Some(notes) = line.notes {
                        println!("        {}", notes);
                    }
                }
            }
        }
        RecipeCommand::Delete { id } => {
            kitchen::delete_recipe(conn, ctx, id)?;
            println!("Deleted recipe {}", id);
        }
    }
    Ok(())
}

fn run_shop(conn: &mut Connection, ctx: &RequestContext, command: ShopCommand, now: DateTime<Utc>) -> Result<()> {
    match command {
        ShopCommand::Add {
            ingredient,
            quantity,
            unit,
        } => {
            let item = kitchen::add_to_shopping_list(conn, ctx, ingredient, quantity, unit.as_deref(), now)?;
            println!("Added item {} at position {}", item.id, item.position);
        }
        ShopCommand::AddRecipe { recipe } => {
            let items = kitchen::add_recipe_to_shopping_list(conn, ctx, recipe, now)?;
            println!("Added {} items", items.len());
        }
        ShopCommand::List => {
            let items = kitchen::list_shopping_list(conn, ctx)?;
            if items.is_empty() {
                println!("Shopping list is empty.");
            }
            for item in items {
                let name = db::get_ingredient(conn, item.ingredient_id)?
                    .map(|i| i.name)
                    .unwrap_or_default();
                let mark = if item.checked { "x" } else { " " };
                println!(
                    "{:>3}. [{}] {}{}  (#{})",
                    item.position,
                    mark,
                    format_amount(item.quantity, item.unit.as_deref()),
                    name,
                    item.id
                );
            }
        }
        ShopCommand::Check { id, undo } => {
            let item = kitchen::check_shopping_item(conn, ctx, id, !undo)?;
            println!("Item {} {}", item.id, if item.checked { "checked" } else { "unchecked" });
        }
        ShopCommand::Move { id, to } => {
            kitchen::move_shopping_item(conn, ctx, id, to)?;
            println!("Moved item {} to position {}", id, to);
        }
        ShopCommand::Remove { id } => {
            kitchen::remove_shopping_item(conn, ctx, id)?;
            println!("Removed item {}", id);
        }
        ShopCommand::Clear => {
            let removed = kitchen::clear_checked_items(conn, ctx)?;
            println!("Removed {} checked items", removed);
        }
    }
    Ok(())
}

fn format_amount(quantity: Option<f64>, unit: Option<&str>) -> String {
    match (quantity, unit) {
        (Some(q), Some(u)) => format!("{} {} ", q, u),
        (Some(q), None) => format!("{} ", q),
        (None, Some(u)) => format!("{} ", u),
        (None, None) => String::new(),
    }
}

/// Load a small pantry, one recipe and a shopping list for the current user
fn load_sample_data(conn: &mut Connection, ctx: &RequestContext, now: DateTime<Utc>) -> Result<()> {
    let categorizer = Categorizer::disabled();

    let produce = kitchen::create_category(conn, ctx, "Produce", now)?;
    let dairy = kitchen::create_category(conn, ctx, "Dairy", now)?;
    let pantry = kitchen::create_category(conn, ctx, "Pantry", now)?;

    let sample = [
        ("Tomato", produce.id),
        ("Basil", produce.id),
        ("Garlic", produce.id),
        ("Mozzarella", dairy.id),
        ("Parmesan", dairy.id),
        ("Olive oil", pantry.id),
        ("Spaghetti", pantry.id),
        ("Salt", pantry.id),
    ];
    let mut ids = Vec::with_capacity(sample.len());
    for (name, category) in sample {
        let ingredient = kitchen::create_ingredient(conn, ctx, &categorizer, name, Some(category), now)?;
        ids.push(ingredient.id);
    }

    let recipe = kitchen::save_recipe(
        conn,
        ctx,
        &categorizer,
        SaveRecipe {
            recipe_id: None,
            name: "Spaghetti al pomodoro".to_string(),
            lines: vec![
                IngredientLine::existing(ids[6]).with_quantity(400.0, Some("g")),
                IngredientLine::existing(ids[0]).with_quantity(6.0, None),
                IngredientLine::existing(ids[2]).with_quantity(2.0, Some("cloves")),
                IngredientLine::existing(ids[5]).with_quantity(3.0, Some("tbsp")),
                IngredientLine::existing(ids[1]).with_notes("torn, to finish"),
                IngredientLine::existing(ids[4]).with_notes("grated, to serve"),
                IngredientLine::existing(ids[7]).with_notes("to taste"),
            ],
        },
        now,
    )?;

    kitchen::add_recipe_to_shopping_list(conn, ctx, recipe.recipe.id, now)?;
    kitchen::add_to_shopping_list(conn, ctx, ids[3], Some(125.0), Some("g"), now)?;

    println!("Loaded {} sample ingredients and 1 recipe", ids.len());
    Ok(())
}

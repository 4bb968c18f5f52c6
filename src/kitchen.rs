//! Request handlers for categories, ingredients, recipes and the shopping list
//!
//! Every handler takes the caller's [`RequestContext`] explicitly and checks
//! ownership of each row it touches. Mutations run inside one SQLite
//! transaction and commit all-or-nothing.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::{debug, info};

use crate::categorize::{CategoryChoice, Categorizer, FALLBACK_CATEGORY};
use crate::db;
use crate::error::{KitchenError, Result};
use crate::models::{
    Category, HistoryEntry, HistoryEvent, Ingredient, IngredientLine, IngredientRef,
    NewShoppingItem, Recipe, RecipeLine, RequestContext, ResolvedIngredientLine, ShoppingItem,
};
use crate::reconcile::{self, ReconciliationPlan};
use crate::reorder;
use crate::usage;

/// A recipe form submission
#[derive(Debug, Clone)]
pub struct SaveRecipe {
    /// `None` creates a new recipe
    pub recipe_id: Option<i64>,
    pub name: String,
    pub lines: Vec<IngredientLine>,
}

#[derive(Debug, Clone)]
pub struct SavedRecipe {
    pub recipe: Recipe,
    pub lines: Vec<RecipeLine>,
    pub plan: ReconciliationPlan,
}

fn ensure_owner(ctx: &RequestContext, owner: &str, kind: &'static str, id: i64) -> Result<()> {
    if owner == ctx.user_id {
        Ok(())
    } else {
        Err(KitchenError::Unauthorized { kind, id })
    }
}

fn owned_category(conn: &Connection, ctx: &RequestContext, id: i64) -> Result<Category> {
    let category = db::get_category(conn, id)?.ok_or(KitchenError::NotFound { kind: "category", id })?;
    ensure_owner(ctx, &category.user_id, "category", id)?;
    Ok(category)
}

fn owned_ingredient(conn: &Connection, ctx: &RequestContext, id: i64) -> Result<Ingredient> {
    let ingredient =
        db::get_ingredient(conn, id)?.ok_or(KitchenError::NotFound { kind: "ingredient", id })?;
    ensure_owner(ctx, &ingredient.user_id, "ingredient", id)?;
    Ok(ingredient)
}

fn owned_recipe(conn: &Connection, ctx: &RequestContext, id: i64) -> Result<Recipe> {
    let recipe = db::get_recipe(conn, id)?.ok_or(KitchenError::NotFound { kind: "recipe", id })?;
    ensure_owner(ctx, &recipe.user_id, "recipe", id)?;
    Ok(recipe)
}

fn owned_shopping_item(conn: &Connection, ctx: &RequestContext, id: i64) -> Result<ShoppingItem> {
    let item = db::get_shopping_item(conn, id)?
        .ok_or(KitchenError::NotFound { kind: "shopping item", id })?;
    ensure_owner(ctx, &item.user_id, "shopping item", id)?;
    Ok(item)
}

fn required_name<'a>(what: &str, name: &'a str) -> Result<&'a str> {
    let name = name.trim();
    if name.is_empty() {
        Err(KitchenError::Validation(format!("{what} name must not be blank")))
    } else {
        Ok(name)
    }
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// Create a category, or return the existing one with the same name
pub fn create_category(
    conn: &mut Connection,
    ctx: &RequestContext,
    name: &str,
    now: DateTime<Utc>,
) -> Result<Category> {
    let name = required_name("category", name)?;
    let tx = conn.transaction()?;
    db::ensure_user(&tx, &ctx.user_id, now)?;

    let category = match db::find_category_by_name(&tx, &ctx.user_id, name)? {
        Some(existing) => existing,
        None => {
            let created = db::insert_category(&tx, &ctx.user_id, name)?;
            info!(user = %ctx.user_id, category = %created.name, "created category");
            created
        }
    };

    tx.commit()?;
    Ok(category)
}

pub fn list_categories(conn: &Connection, ctx: &RequestContext) -> Result<Vec<Category>> {
    db::list_categories(conn, &ctx.user_id)
}

fn category_for_choice(conn: &Connection, ctx: &RequestContext, choice: CategoryChoice) -> Result<i64> {
    let name = match choice {
        CategoryChoice::Existing(id) => return Ok(owned_category(conn, ctx, id)?.id),
        CategoryChoice::New(name) => name,
        CategoryChoice::Fallback => FALLBACK_CATEGORY.to_string(),
    };

    match db::find_category_by_name(conn, &ctx.user_id, &name)? {
        Some(existing) => Ok(existing.id),
        None => {
            let created = db::insert_category(conn, &ctx.user_id, &name)?;
            info!(user = %ctx.user_id, category = %created.name, "created category for new ingredient");
            Ok(created.id)
        }
    }
}

// ---------------------------------------------------------------------------
// Ingredients
// ---------------------------------------------------------------------------

/// Look an ingredient up by name or create it, categorizing new ones.
fn find_or_create_ingredient(
    conn: &Connection,
    ctx: &RequestContext,
    categorizer: &Categorizer,
    name: &str,
    category_id: Option<i64>,
    now: DateTime<Utc>,
) -> Result<Ingredient> {
    let name = required_name("ingredient", name)?;
    let explicit = category_id
        .map(|id| owned_category(conn, ctx, id).map(|category| category.id))
        .transpose()?;

    if let Some(existing) = db::find_ingredient_by_name(conn, &ctx.user_id, name)? {
        if explicit.is_some() && existing.category_id != explicit {
            return Err(KitchenError::Validation(format!(
                "ingredient '{}' already exists in another category",
                existing.name
            )));
        }
        return Ok(existing);
    }

    let category_id = match explicit {
        Some(id) => id,
        None => {
            let categories = db::list_categories(conn, &ctx.user_id)?;
            let choice = categorizer.categorize(name, &categories);
            category_for_choice(conn, ctx, choice)?
        }
    };

    let ingredient = db::insert_ingredient(conn, &ctx.user_id, name, Some(category_id), now)?;
    db::insert_history(conn, ingredient.id, HistoryEvent::Created, None, now)?;
    info!(user = %ctx.user_id, ingredient = %ingredient.name, category_id, "created ingredient");
    Ok(ingredient)
}

pub fn create_ingredient(
    conn: &mut Connection,
    ctx: &RequestContext,
    categorizer: &Categorizer,
    name: &str,
    category_id: Option<i64>,
    now: DateTime<Utc>,
) -> Result<Ingredient> {
    let tx = conn.transaction()?;
    db::ensure_user(&tx, &ctx.user_id, now)?;
    let ingredient = find_or_create_ingredient(&tx, ctx, categorizer, name, category_id, now)?;
    tx.commit()?;
    Ok(ingredient)
}

/// The user's ingredients, most used first.
///
/// A non-blank `search` keeps only names containing it, ignoring case.
pub fn list_ingredients(
    conn: &Connection,
    ctx: &RequestContext,
    search: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Vec<Ingredient>> {
    let mut ingredients = db::list_ingredients(conn, &ctx.user_id)?;

    if let Some(needle) = search.map(str::trim).filter(|s| !s.is_empty()) {
        let needle = needle.to_lowercase();
        ingredients.retain(|i| i.name.to_lowercase().contains(&needle));
    }

    usage::rank_by_live_score(&mut ingredients, now);
    Ok(ingredients)
}

pub fn set_ingredient_category(
    conn: &mut Connection,
    ctx: &RequestContext,
    ingredient_id: i64,
    category_id: i64,
) -> Result<Ingredient> {
    let tx = conn.transaction()?;
    let mut ingredient = owned_ingredient(&tx, ctx, ingredient_id)?;
    owned_category(&tx, ctx, category_id)?;
    db::set_ingredient_category(&tx, ingredient_id, Some(category_id))?;
    tx.commit()?;

    ingredient.category_id = Some(category_id);
    Ok(ingredient)
}

/// Delete an ingredient no recipe refers to; its shopping items go with it.
pub fn delete_ingredient(conn: &mut Connection, ctx: &RequestContext, ingredient_id: i64) -> Result<()> {
    let tx = conn.transaction()?;
    let ingredient = owned_ingredient(&tx, ctx, ingredient_id)?;

    let count = db::count_recipe_lines_for_ingredient(&tx, ingredient_id)?;
    if count > 0 {
        return Err(KitchenError::InUse {
            id: ingredient_id,
            count,
        });
    }

    db::delete_ingredient(&tx, ingredient_id)?;
    renumber_shopping_list(&tx, ctx)?;
    tx.commit()?;
    info!(user = %ctx.user_id, ingredient = %ingredient.name, "deleted ingredient");
    Ok(())
}

fn touch_ingredient(
    conn: &Connection,
    ingredient: &mut Ingredient,
    event: HistoryEvent,
    recipe_id: Option<i64>,
    now: DateTime<Utc>,
) -> Result<()> {
    let (score, at) = usage::record_usage(ingredient.usage_score, ingredient.last_used_at, now);
    db::update_ingredient_usage(conn, ingredient.id, score, at)?;
    db::insert_history(conn, ingredient.id, event, recipe_id, now)?;
    debug!(ingredient = %ingredient.name, score, %event, "recorded usage");

    ingredient.usage_score = Some(score);
    ingredient.last_used_at = Some(at);
    Ok(())
}

/// Record a usage of an ingredient outside recipes and the shopping list.
pub fn record_ingredient_usage(
    conn: &mut Connection,
    ctx: &RequestContext,
    ingredient_id: i64,
    now: DateTime<Utc>,
) -> Result<Ingredient> {
    let tx = conn.transaction()?;
    let mut ingredient = owned_ingredient(&tx, ctx, ingredient_id)?;
    touch_ingredient(&tx, &mut ingredient, HistoryEvent::Used, None, now)?;
    tx.commit()?;
    Ok(ingredient)
}

pub fn ingredient_history(
    conn: &Connection,
    ctx: &RequestContext,
    ingredient_id: i64,
) -> Result<Vec<HistoryEntry>> {
    owned_ingredient(conn, ctx, ingredient_id)?;
    db::list_history(conn, ingredient_id)
}

// ---------------------------------------------------------------------------
// Recipes
// ---------------------------------------------------------------------------

/// Turn every submitted line into one with a concrete ingredient id.
fn resolve_lines(
    conn: &Connection,
    ctx: &RequestContext,
    categorizer: &Categorizer,
    lines: Vec<IngredientLine>,
    now: DateTime<Utc>,
) -> Result<Vec<ResolvedIngredientLine>> {
    let mut resolved = Vec::with_capacity(lines.len());

    for line in lines {
        let ingredient_id = match &line.ingredient {
            IngredientRef::Existing { ingredient_id } => owned_ingredient(conn, ctx, *ingredient_id)?.id,
            IngredientRef::New { name } => {
                find_or_create_ingredient(conn, ctx, categorizer, name, None, now)?.id
            }
        };
        resolved.push(line.resolve(ingredient_id));
    }

    Ok(resolved)
}

fn validate_lines(lines: &[IngredientLine]) -> Result<()> {
    for (index, line) in lines.iter().enumerate() {
        if let IngredientRef::New { name } = &line.ingredient {
            if name.trim().is_empty() {
                return Err(KitchenError::Validation(format!(
                    "line {index}: new ingredient name must not be blank"
                )));
            }
        }
        if let Some(quantity) = line.quantity {
            if !quantity.is_finite() || quantity < 0.0 {
                return Err(KitchenError::Validation(format!(
                    "line {index}: quantity must be a non-negative number"
                )));
            }
        }
    }
    Ok(())
}

fn apply_plan(conn: &Connection, recipe_id: i64, plan: &ReconciliationPlan) -> Result<()> {
    for line_id in &plan.to_delete {
        db::delete_recipe_line(conn, *line_id)?;
    }
    for update in &plan.to_update {
        db::update_recipe_line(conn, update)?;
    }
    for insert in &plan.to_insert {
        db::insert_recipe_line(conn, recipe_id, insert)?;
    }
    Ok(())
}

/// Create or update a recipe and replace its ingredient list.
///
/// Ingredients newly attached to the recipe (inserted lines, or lines whose
/// ingredient changed) get one usage recorded each. Editing the quantity,
/// unit or notes of a kept line, or moving it, records nothing.
pub fn save_recipe(
    conn: &mut Connection,
    ctx: &RequestContext,
    categorizer: &Categorizer,
    request: SaveRecipe,
    now: DateTime<Utc>,
) -> Result<SavedRecipe> {
    let name = required_name("recipe", &request.name)?.to_string();
    validate_lines(&request.lines)?;

    let tx = conn.transaction()?;
    db::ensure_user(&tx, &ctx.user_id, now)?;

    let recipe = match request.recipe_id {
        Some(id) => {
            let mut recipe = owned_recipe(&tx, ctx, id)?;
            db::rename_recipe(&tx, id, &name, now)?;
            recipe.name = name;
            recipe.updated_at = now;
            recipe
        }
        None => db::insert_recipe(&tx, &ctx.user_id, &name, now)?,
    };

    let previous = db::list_recipe_lines(&tx, recipe.id)?;
    let submitted = resolve_lines(&tx, ctx, categorizer, request.lines, now)?;
    let plan = reconcile::reconcile(&previous, &submitted);
    debug!(
        recipe_id = recipe.id,
        inserts = plan.to_insert.len(),
        updates = plan.to_update.len(),
        deletes = plan.to_delete.len(),
        unchanged = plan.unchanged.len(),
        "reconciled ingredient lines"
    );

    apply_plan(&tx, recipe.id, &plan)?;

    let previous_ingredient: HashMap<i64, i64> =
        previous.iter().map(|line| (line.id, line.ingredient_id)).collect();
    let newly_used: Vec<i64> = plan
        .to_insert
        .iter()
        .map(|insert| insert.ingredient_id)
        .chain(
            plan.to_update
                .iter()
                .filter(|update| previous_ingredient.get(&update.line_id) != Some(&update.ingredient_id))
                .map(|update| update.ingredient_id),
        )
        .collect();

    let mut seen = HashSet::new();
    for ingredient_id in newly_used {
        if seen.insert(ingredient_id) {
            let mut ingredient = owned_ingredient(&tx, ctx, ingredient_id)?;
            touch_ingredient(&tx, &mut ingredient, HistoryEvent::UsedInRecipe, Some(recipe.id), now)?;
        }
    }

    let lines = db::list_recipe_lines(&tx, recipe.id)?;
    tx.commit()?;

    info!(user = %ctx.user_id, recipe = %recipe.name, lines = lines.len(), "saved recipe");
    Ok(SavedRecipe { recipe, lines, plan })
}

/// A recipe with its lines and their ingredient names, in display order.
pub fn get_recipe(
    conn: &Connection,
    ctx: &RequestContext,
    recipe_id: i64,
) -> Result<(Recipe, Vec<(RecipeLine, String)>)> {
    let recipe = owned_recipe(conn, ctx, recipe_id)?;
    let lines = db::list_recipe_lines_named(conn, recipe_id)?;
    Ok((recipe, lines))
}

pub fn list_recipes(conn: &Connection, ctx: &RequestContext) -> Result<Vec<Recipe>> {
    db::list_recipes(conn, &ctx.user_id)
}

pub fn delete_recipe(conn: &mut Connection, ctx: &RequestContext, recipe_id: i64) -> Result<()> {
    let tx = conn.transaction()?;
    let recipe = owned_recipe(&tx, ctx, recipe_id)?;
    db::delete_recipe(&tx, recipe_id)?;
    tx.commit()?;
    info!(user = %ctx.user_id, recipe = %recipe.name, "deleted recipe");
    Ok(())
}

// ---------------------------------------------------------------------------
// Shopping list
// ---------------------------------------------------------------------------

/// Rewrite positions of a user's list to 0..n in current order.
fn renumber_shopping_list(conn: &Connection, ctx: &RequestContext) -> Result<()> {
    let items = db::list_shopping_items(conn, &ctx.user_id)?;
    let positions: Vec<usize> = items.iter().map(|item| item.position).collect();
    for (index, _) in reorder::changed_positions(&positions) {
        db::set_shopping_item_position(conn, items[index].id, index)?;
    }
    Ok(())
}

/// Append an ingredient to the end of the shopping list.
pub fn add_to_shopping_list(
    conn: &mut Connection,
    ctx: &RequestContext,
    ingredient_id: i64,
    quantity: Option<f64>,
    unit: Option<&str>,
    now: DateTime<Utc>,
) -> Result<ShoppingItem> {
    let tx = conn.transaction()?;
    let mut ingredient = owned_ingredient(&tx, ctx, ingredient_id)?;

    let position = db::next_shopping_position(&tx, &ctx.user_id)?;
    let item = db::insert_shopping_item(
        &tx,
        &NewShoppingItem {
            user_id: &ctx.user_id,
            ingredient_id,
            recipe_id: None,
            quantity,
            unit,
            position,
        },
    )?;
    touch_ingredient(&tx, &mut ingredient, HistoryEvent::AddedToShoppingList, None, now)?;

    tx.commit()?;
    info!(user = %ctx.user_id, ingredient = %ingredient.name, "added to shopping list");
    Ok(item)
}

/// Append every line of a recipe to the shopping list.
pub fn add_recipe_to_shopping_list(
    conn: &mut Connection,
    ctx: &RequestContext,
    recipe_id: i64,
    now: DateTime<Utc>,
) -> Result<Vec<ShoppingItem>> {
    let tx = conn.transaction()?;
    let recipe = owned_recipe(&tx, ctx, recipe_id)?;
    let lines = db::list_recipe_lines(&tx, recipe_id)?;

    let mut position = db::next_shopping_position(&tx, &ctx.user_id)?;
    let mut items = Vec::with_capacity(lines.len());
    let mut touched = HashSet::new();

    for line in &lines {
        let item = db::insert_shopping_item(
            &tx,
            &NewShoppingItem {
                user_id: &ctx.user_id,
                ingredient_id: line.ingredient_id,
                recipe_id: Some(recipe_id),
                quantity: line.quantity,
                unit: line.unit.as_deref(),
                position,
            },
        )?;
        items.push(item);
        position += 1;

        if touched.insert(line.ingredient_id) {
            let mut ingredient = owned_ingredient(&tx, ctx, line.ingredient_id)?;
            touch_ingredient(
                &tx,
                &mut ingredient,
                HistoryEvent::AddedToShoppingList,
                Some(recipe_id),
                now,
            )?;
        }
    }

    tx.commit()?;
    info!(user = %ctx.user_id, recipe = %recipe.name, items = items.len(), "added recipe to shopping list");
    Ok(items)
}

pub fn list_shopping_list(conn: &Connection, ctx: &RequestContext) -> Result<Vec<ShoppingItem>> {
    db::list_shopping_items(conn, &ctx.user_id)
}

pub fn check_shopping_item(
    conn: &mut Connection,
    ctx: &RequestContext,
    item_id: i64,
    checked: bool,
) -> Result<ShoppingItem> {
    let tx = conn.transaction()?;
    let mut item = owned_shopping_item(&tx, ctx, item_id)?;
    db::set_shopping_item_checked(&tx, item_id, checked)?;
    tx.commit()?;

    item.checked = checked;
    Ok(item)
}

/// Move an item to `to_index` in the list, renumbering the rest.
pub fn move_shopping_item(
    conn: &mut Connection,
    ctx: &RequestContext,
    item_id: i64,
    to_index: usize,
) -> Result<Vec<ShoppingItem>> {
    let tx = conn.transaction()?;
    owned_shopping_item(&tx, ctx, item_id)?;

    let items = db::list_shopping_items(&tx, &ctx.user_id)?;
    let from_index = items
        .iter()
        .position(|item| item.id == item_id)
        .ok_or(KitchenError::NotFound {
            kind: "shopping item",
            id: item_id,
        })?;

    let mut reordered = reorder::move_to_index(&items, from_index, to_index)?;
    for (index, item) in reordered.iter_mut().enumerate() {
        if item.position != index {
            db::set_shopping_item_position(&tx, item.id, index)?;
            item.position = index;
        }
    }

    tx.commit()?;
    Ok(reordered)
}

pub fn remove_shopping_item(conn: &mut Connection, ctx: &RequestContext, item_id: i64) -> Result<()> {
    let tx = conn.transaction()?;
    owned_shopping_item(&tx, ctx, item_id)?;
    db::delete_shopping_item(&tx, item_id)?;
    renumber_shopping_list(&tx, ctx)?;
    tx.commit()?;
    Ok(())
}

/// Drop every checked item, returning how many were removed.
pub fn clear_checked_items(conn: &mut Connection, ctx: &RequestContext) -> Result<usize> {
    let tx = conn.transaction()?;
    let removed = db::delete_checked_shopping_items(&tx, &ctx.user_id)?;
    renumber_shopping_list(&tx, ctx)?;
    tx.commit()?;
    Ok(removed)
}

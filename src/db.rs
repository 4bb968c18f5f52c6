//! Database schema and operations

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row, ToSql, params};

use crate::error::Result;
use crate::models::{
    Category, HistoryEntry, HistoryEvent, Ingredient, NewShoppingItem, Recipe, RecipeLine,
    ShoppingItem,
};
use crate::reconcile::{LineInsert, LineUpdate};

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL REFERENCES users(id),
            name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS ingredients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL REFERENCES users(id),
            name TEXT NOT NULL,
            category_id INTEGER REFERENCES categories(id) ON DELETE SET NULL,
            usage_score REAL,
            last_used_at TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS recipes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL REFERENCES users(id),
            name TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- One row per ingredient line of a recipe; position is 0-based and dense
        CREATE TABLE IF NOT EXISTS recipe_ingredients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
            ingredient_id INTEGER NOT NULL REFERENCES ingredients(id),
            quantity REAL,
            unit TEXT,
            notes TEXT,
            position INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS shopping_list_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL REFERENCES users(id),
            ingredient_id INTEGER NOT NULL REFERENCES ingredients(id) ON DELETE CASCADE,
            recipe_id INTEGER REFERENCES recipes(id) ON DELETE SET NULL,
            quantity REAL,
            unit TEXT,
            checked INTEGER NOT NULL DEFAULT 0,
            position INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS ingredient_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ingredient_id INTEGER NOT NULL REFERENCES ingredients(id) ON DELETE CASCADE,
            event TEXT NOT NULL,
            recipe_id INTEGER REFERENCES recipes(id) ON DELETE SET NULL,
            created_at TEXT NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_categories_user_name
            ON categories(user_id, name COLLATE NOCASE);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_ingredients_user_name
            ON ingredients(user_id, name COLLATE NOCASE);
        CREATE INDEX IF NOT EXISTS idx_recipe_ingredients_recipe ON recipe_ingredients(recipe_id);
        CREATE INDEX IF NOT EXISTS idx_recipe_ingredients_ingredient ON recipe_ingredients(ingredient_id);
        CREATE INDEX IF NOT EXISTS idx_shopping_list_user ON shopping_list_items(user_id);
        CREATE INDEX IF NOT EXISTS idx_history_ingredient ON ingredient_history(ingredient_id);
        "#,
    )?;
    Ok(())
}

impl ToSql for HistoryEvent {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for HistoryEvent {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

/// Register a user if not already known
pub fn ensure_user(conn: &Connection, user_id: &str, now: DateTime<Utc>) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO users (id, created_at) VALUES (?1, ?2)",
        params![user_id, now],
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
    })
}

pub fn insert_category(conn: &Connection, user_id: &str, name: &str) -> Result<Category> {
    conn.execute(
        "INSERT INTO categories (user_id, name) VALUES (?1, ?2)",
        params![user_id, name],
    )?;
    Ok(Category {
        id: conn.last_insert_rowid(),
        user_id: user_id.to_string(),
        name: name.to_string(),
    })
}

pub fn get_category(conn: &Connection, id: i64) -> Result<Option<Category>> {
    let category = conn
        .query_row(
            "SELECT id, user_id, name FROM categories WHERE id = ?1",
            [id],
            category_from_row,
        )
        .optional()?;
    Ok(category)
}

/// Whether two names are equal ignoring case, for any script.
///
/// SQLite's `NOCASE` only folds ASCII, so name lookups compare in Rust.
fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Case-insensitive lookup within one user's categories
pub fn find_category_by_name(conn: &Connection, user_id: &str, name: &str) -> Result<Option<Category>> {
    let categories = list_categories(conn, user_id)?;
    Ok(categories.into_iter().find(|c| same_name(&c.name, name)))
}

pub fn list_categories(conn: &Connection, user_id: &str) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, name FROM categories WHERE user_id = ?1 ORDER BY name COLLATE NOCASE",
    )?;

    let rows = stmt.query_map([user_id], category_from_row)?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

// ---------------------------------------------------------------------------
// Ingredients
// ---------------------------------------------------------------------------

const INGREDIENT_COLUMNS: &str =
    "id, user_id, name, category_id, usage_score, last_used_at, created_at";

fn ingredient_from_row(row: &Row<'_>) -> rusqlite::Result<Ingredient> {
    Ok(Ingredient {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        category_id: row.get(3)?,
        usage_score: row.get(4)?,
        last_used_at: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub fn insert_ingredient(
    conn: &Connection,
    user_id: &str,
    name: &str,
    category_id: Option<i64>,
    now: DateTime<Utc>,
) -> Result<Ingredient> {
    conn.execute(
        "INSERT INTO ingredients (user_id, name, category_id, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![user_id, name, category_id, now],
    )?;
    Ok(Ingredient {
        id: conn.last_insert_rowid(),
        user_id: user_id.to_string(),
        name: name.to_string(),
        category_id,
        usage_score: None,
        last_used_at: None,
        created_at: now,
    })
}

pub fn get_ingredient(conn: &Connection, id: i64) -> Result<Option<Ingredient>> {
    let ingredient = conn
        .query_row(
            &format!("SELECT {INGREDIENT_COLUMNS} FROM ingredients WHERE id = ?1"),
            [id],
            ingredient_from_row,
        )
        .optional()?;
    Ok(ingredient)
}

/// Case-insensitive lookup within one user's ingredients
pub fn find_ingredient_by_name(conn: &Connection, user_id: &str, name: &str) -> Result<Option<Ingredient>> {
    let ingredients = list_ingredients(conn, user_id)?;
    Ok(ingredients.into_iter().find(|i| same_name(&i.name, name)))
}

pub fn list_ingredients(conn: &Connection, user_id: &str) -> Result<Vec<Ingredient>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {INGREDIENT_COLUMNS} FROM ingredients WHERE user_id = ?1 ORDER BY name COLLATE NOCASE"
    ))?;

    let rows = stmt.query_map([user_id], ingredient_from_row)?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// Persist a new `(usage_score, last_used_at)` pair
pub fn update_ingredient_usage(
    conn: &Connection,
    id: i64,
    usage_score: f64,
    last_used_at: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "UPDATE ingredients SET usage_score = ?2, last_used_at = ?3 WHERE id = ?1",
        params![id, usage_score, last_used_at],
    )?;
    Ok(())
}

pub fn set_ingredient_category(conn: &Connection, id: i64, category_id: Option<i64>) -> Result<()> {
    conn.execute(
        "UPDATE ingredients SET category_id = ?2 WHERE id = ?1",
        params![id, category_id],
    )?;
    Ok(())
}

pub fn delete_ingredient(conn: &Connection, id: i64) -> Result<()> {
    conn.execute("DELETE FROM ingredients WHERE id = ?1", [id])?;
    Ok(())
}

/// Number of recipe lines referencing an ingredient
pub fn count_recipe_lines_for_ingredient(conn: &Connection, ingredient_id: i64) -> Result<usize> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM recipe_ingredients WHERE ingredient_id = ?1",
        [ingredient_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

// ---------------------------------------------------------------------------
// Recipes
// ---------------------------------------------------------------------------

fn recipe_from_row(row: &Row<'_>) -> rusqlite::Result<Recipe> {
    Ok(Recipe {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

pub fn insert_recipe(conn: &Connection, user_id: &str, name: &str, now: DateTime<Utc>) -> Result<Recipe> {
    conn.execute(
        "INSERT INTO recipes (user_id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
        params![user_id, name, now],
    )?;
    Ok(Recipe {
        id: conn.last_insert_rowid(),
        user_id: user_id.to_string(),
        name: name.to_string(),
        created_at: now,
        updated_at: now,
    })
}

pub fn get_recipe(conn: &Connection, id: i64) -> Result<Option<Recipe>> {
    let recipe = conn
        .query_row(
            "SELECT id, user_id, name, created_at, updated_at FROM recipes WHERE id = ?1",
            [id],
            recipe_from_row,
        )
        .optional()?;
    Ok(recipe)
}

pub fn list_recipes(conn: &Connection, user_id: &str) -> Result<Vec<Recipe>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, name, created_at, updated_at FROM recipes
         WHERE user_id = ?1 ORDER BY name COLLATE NOCASE",
    )?;

    let rows = stmt.query_map([user_id], recipe_from_row)?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

pub fn rename_recipe(conn: &Connection, id: i64, name: &str, now: DateTime<Utc>) -> Result<()> {
    conn.execute(
        "UPDATE recipes SET name = ?2, updated_at = ?3 WHERE id = ?1",
        params![id, name, now],
    )?;
    Ok(())
}

pub fn delete_recipe(conn: &Connection, id: i64) -> Result<()> {
    conn.execute("DELETE FROM recipes WHERE id = ?1", [id])?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Recipe lines
// ---------------------------------------------------------------------------

fn recipe_line_from_row(row: &Row<'_>) -> rusqlite::Result<RecipeLine> {
    Ok(RecipeLine {
        id: row.get(0)?,
        recipe_id: row.get(1)?,
        ingredient_id: row.get(2)?,
        quantity: row.get(3)?,
        unit: row.get(4)?,
        notes: row.get(5)?,
        position: row.get(6)?,
    })
}

/// Lines of a recipe in display order
pub fn list_recipe_lines(conn: &Connection, recipe_id: i64) -> Result<Vec<RecipeLine>> {
    let mut stmt = conn.prepare(
        "SELECT id, recipe_id, ingredient_id, quantity, unit, notes, position
         FROM recipe_ingredients
         WHERE recipe_id = ?1
         ORDER BY position, id",
    )?;

    let rows = stmt.query_map([recipe_id], recipe_line_from_row)?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// Lines of a recipe in display order, each with its ingredient name
pub fn list_recipe_lines_named(conn: &Connection, recipe_id: i64) -> Result<Vec<(RecipeLine, String)>> {
    let mut stmt = conn.prepare(
        "SELECT ri.id, ri.recipe_id, ri.ingredient_id, ri.quantity, ri.unit, ri.notes, ri.position, i.name
         FROM recipe_ingredients ri
         JOIN ingredients i ON i.id = ri.ingredient_id
         WHERE ri.recipe_id = ?1
         ORDER BY ri.position, ri.id",
    )?;

    let rows = stmt.query_map([recipe_id], |row| {
        Ok((recipe_line_from_row(row)?, row.get::<_, String>(7)?))
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

pub fn insert_recipe_line(conn: &Connection, recipe_id: i64, line: &LineInsert) -> Result<i64> {
    conn.execute(
        "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, quantity, unit, notes, position)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            recipe_id,
            line.ingredient_id,
            line.quantity,
            line.unit,
            line.notes,
            line.order,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_recipe_line(conn: &Connection, line: &LineUpdate) -> Result<()> {
    conn.execute(
        "UPDATE recipe_ingredients
         SET ingredient_id = ?2, quantity = ?3, unit = ?4, notes = ?5, position = ?6
         WHERE id = ?1",
        params![
            line.line_id,
            line.ingredient_id,
            line.quantity,
            line.unit,
            line.notes,
            line.order,
        ],
    )?;
    Ok(())
}

pub fn delete_recipe_line(conn: &Connection, line_id: i64) -> Result<()> {
    conn.execute("DELETE FROM recipe_ingredients WHERE id = ?1", [line_id])?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Shopping list
// ---------------------------------------------------------------------------

const SHOPPING_COLUMNS: &str =
    "id, user_id, ingredient_id, recipe_id, quantity, unit, checked, position";

fn shopping_item_from_row(row: &Row<'_>) -> rusqlite::Result<ShoppingItem> {
    Ok(ShoppingItem {
        id: row.get(0)?,
        user_id: row.get(1)?,
        ingredient_id: row.get(2)?,
        recipe_id: row.get(3)?,
        quantity: row.get(4)?,
        unit: row.get(5)?,
        checked: row.get(6)?,
        position: row.get(7)?,
    })
}

pub fn insert_shopping_item(conn: &Connection, item: &NewShoppingItem<'_>) -> Result<ShoppingItem> {
    conn.execute(
        "INSERT INTO shopping_list_items (user_id, ingredient_id, recipe_id, quantity, unit, position)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            item.user_id,
            item.ingredient_id,
            item.recipe_id,
            item.quantity,
            item.unit,
            item.position,
        ],
    )?;
    Ok(ShoppingItem {
        id: conn.last_insert_rowid(),
        user_id: item.user_id.to_string(),
        ingredient_id: item.ingredient_id,
        recipe_id: item.recipe_id,
        quantity: item.quantity,
        unit: item.unit.map(str::to_string),
        checked: false,
        position: item.position,
    })
}

/// Position just past the end of a user's list
pub fn next_shopping_position(conn: &Connection, user_id: &str) -> Result<usize> {
    let next = conn.query_row(
        "SELECT COALESCE(MAX(position) + 1, 0) FROM shopping_list_items WHERE user_id = ?1",
        [user_id],
        |row| row.get(0),
    )?;
    Ok(next)
}

pub fn get_shopping_item(conn: &Connection, id: i64) -> Result<Option<ShoppingItem>> {
    let item = conn
        .query_row(
            &format!("SELECT {SHOPPING_COLUMNS} FROM shopping_list_items WHERE id = ?1"),
            [id],
            shopping_item_from_row,
        )
        .optional()?;
    Ok(item)
}

pub fn list_shopping_items(conn: &Connection, user_id: &str) -> Result<Vec<ShoppingItem>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SHOPPING_COLUMNS} FROM shopping_list_items WHERE user_id = ?1 ORDER BY position, id"
    ))?;

    let rows = stmt.query_map([user_id], shopping_item_from_row)?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

pub fn set_shopping_item_checked(conn: &Connection, id: i64, checked: bool) -> Result<()> {
    conn.execute(
        "UPDATE shopping_list_items SET checked = ?2 WHERE id = ?1",
        params![id, checked],
    )?;
    Ok(())
}

pub fn set_shopping_item_position(conn: &Connection, id: i64, position: usize) -> Result<()> {
    conn.execute(
        "UPDATE shopping_list_items SET position = ?2 WHERE id = ?1",
        params![id, position],
    )?;
    Ok(())
}

pub fn delete_shopping_item(conn: &Connection, id: i64) -> Result<()> {
    conn.execute("DELETE FROM shopping_list_items WHERE id = ?1", [id])?;
    Ok(())
}

/// Remove every checked item of a user, returning how many went
pub fn delete_checked_shopping_items(conn: &Connection, user_id: &str) -> Result<usize> {
    let removed = conn.execute(
        "DELETE FROM shopping_list_items WHERE user_id = ?1 AND checked = 1",
        [user_id],
    )?;
    Ok(removed)
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

pub fn insert_history(
    conn: &Connection,
    ingredient_id: i64,
    event: HistoryEvent,
    recipe_id: Option<i64>,
    now: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO ingredient_history (ingredient_id, event, recipe_id, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![ingredient_id, event, recipe_id, now],
    )?;
    Ok(())
}

pub fn list_history(conn: &Connection, ingredient_id: i64) -> Result<Vec<HistoryEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, ingredient_id, event, recipe_id, created_at
         FROM ingredient_history
         WHERE ingredient_id = ?1
         ORDER BY created_at, id",
    )?;

    let rows = stmt.query_map([ingredient_id], |row| {
        Ok(HistoryEntry {
            id: row.get(0)?,
            ingredient_id: row.get(1)?,
            event: row.get(2)?,
            recipe_id: row.get(3)?,
            created_at: row.get(4)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 4, 9, 30, 0).unwrap()
    }

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        ensure_user(&conn, "alice", now()).unwrap();
        conn
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = setup();
        init_schema(&conn).unwrap();
        ensure_user(&conn, "alice", now()).unwrap();
    }

    #[test]
    fn test_category_names_are_case_insensitive() {
        let conn = setup();
        let dairy = insert_category(&conn, "alice", "Dairy").unwrap();

        let found = find_category_by_name(&conn, "alice", "dAIRY").unwrap();
        assert_eq!(found, Some(dairy));
        assert!(insert_category(&conn, "alice", "DAIRY").is_err());
        assert!(find_category_by_name(&conn, "bob", "Dairy").unwrap().is_none());
    }

    #[test]
    fn test_name_lookup_folds_non_ascii_case() {
        let conn = setup();
        let eclair = insert_ingredient(&conn, "alice", "Éclair", None, now()).unwrap();

        let found = find_ingredient_by_name(&conn, "alice", "ÉCLAIR").unwrap();
        assert_eq!(found.map(|i| i.id), Some(eclair.id));
        assert!(find_ingredient_by_name(&conn, "alice", "eclair").unwrap().is_none());

        let creme = insert_category(&conn, "alice", "Crème").unwrap();
        assert_eq!(find_category_by_name(&conn, "alice", "CRÈME").unwrap(), Some(creme));
    }

    #[test]
    fn test_ingredient_usage_round_trips_timestamps() {
        let conn = setup();
        let flour = insert_ingredient(&conn, "alice", "Flour", None, now()).unwrap();

        update_ingredient_usage(&conn, flour.id, 1.5, now()).unwrap();

        let stored = get_ingredient(&conn, flour.id).unwrap().unwrap();
        assert_eq!(stored.usage_score, Some(1.5));
        assert_eq!(stored.last_used_at, Some(now()));
        assert_eq!(stored.created_at, now());
    }

    #[test]
    fn test_recipe_lines_follow_position() {
        let conn = setup();
        let recipe = insert_recipe(&conn, "alice", "Pancakes", now()).unwrap();
        let flour = insert_ingredient(&conn, "alice", "Flour", None, now()).unwrap();
        let milk = insert_ingredient(&conn, "alice", "Milk", None, now()).unwrap();

        for (ingredient_id, order) in [(milk.id, 1), (flour.id, 0)] {
            let line = LineInsert {
                ingredient_id,
                quantity: Some(1.0),
                unit: None,
                notes: None,
                order,
            };
            insert_recipe_line(&conn, recipe.id, &line).unwrap();
        }

        let named = list_recipe_lines_named(&conn, recipe.id).unwrap();
        let names: Vec<_> = named.iter().map(|(_, name)| name.as_str()).collect();
        assert_eq!(names, ["Flour", "Milk"]);
        assert_eq!(count_recipe_lines_for_ingredient(&conn, milk.id).unwrap(), 1);
    }

    #[test]
    fn test_deleting_recipe_cascades_lines_and_detaches_items() {
        let conn = setup();
        let recipe = insert_recipe(&conn, "alice", "Toast", now()).unwrap();
        let bread = insert_ingredient(&conn, "alice", "Bread", None, now()).unwrap();
        let line = LineInsert {
            ingredient_id: bread.id,
            quantity: None,
            unit: None,
            notes: None,
            order: 0,
        };
        insert_recipe_line(&conn, recipe.id, &line).unwrap();
        let item = insert_shopping_item(
            &conn,
            &NewShoppingItem {
                user_id: "alice",
                ingredient_id: bread.id,
                recipe_id: Some(recipe.id),
                quantity: None,
                unit: None,
                position: 0,
            },
        )
        .unwrap();

        delete_recipe(&conn, recipe.id).unwrap();

        assert!(list_recipe_lines(&conn, recipe.id).unwrap().is_empty());
        let item = get_shopping_item(&conn, item.id).unwrap().unwrap();
        assert_eq!(item.recipe_id, None);
    }

    #[test]
    fn test_next_shopping_position() {
        let conn = setup();
        assert_eq!(next_shopping_position(&conn, "alice").unwrap(), 0);

        let eggs = insert_ingredient(&conn, "alice", "Eggs", None, now()).unwrap();
        let mut item = NewShoppingItem {
            user_id: "alice",
            ingredient_id: eggs.id,
            recipe_id: None,
            quantity: Some(12.0),
            unit: None,
            position: 0,
        };
        insert_shopping_item(&conn, &item).unwrap();
        item.position = 4;
        insert_shopping_item(&conn, &item).unwrap();

        assert_eq!(next_shopping_position(&conn, "alice").unwrap(), 5);
    }

    #[test]
    fn test_history_event_column() {
        let conn = setup();
        let salt = insert_ingredient(&conn, "alice", "Salt", None, now()).unwrap();
        insert_history(&conn, salt.id, HistoryEvent::Created, None, now()).unwrap();
        insert_history(&conn, salt.id, HistoryEvent::AddedToShoppingList, None, now()).unwrap();

        let events: Vec<_> = list_history(&conn, salt.id)
            .unwrap()
            .into_iter()
            .map(|entry| entry.event)
            .collect();
        assert_eq!(events, [HistoryEvent::Created, HistoryEvent::AddedToShoppingList]);
    }
}

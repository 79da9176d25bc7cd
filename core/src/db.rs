use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use rusqlite::{Connection, params_from_iter};
use serde::Deserialize;
use tracing::{debug, info};

use crate::session::{Executed, Row, Session, flatten};
use crate::value::Value;

const LOGIN_TIMEOUT: Duration = Duration::from_secs(3);

const SETUP_SQL: &str = include_str!("setup.sql");

/// Tables and views that must exist before the mapper is used.
pub const REQUIRED_TABLES: &[&str] = &[
    "food_item",
    "fridge_item",
    "meal",
    "meal_plan",
    "recipe",
    "recipe_ingredient",
    "recipe_instruction",
    "shopping_list_item",
];

/// Connection parameters as stored in the local configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectionSettings {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl ConnectionSettings {
    /// Resolve the url to a file path, or `None` for an in-memory database.
    #[must_use]
    pub fn path(&self) -> Option<PathBuf> {
        let url = self.url.trim();
        let raw = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url);
        if raw.is_empty() || raw == ":memory:" {
            None
        } else {
            Some(PathBuf::from(raw))
        }
    }
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        Self::configure(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure(conn)
    }

    /// Open the database named by `settings` and make sure its schema exists.
    pub fn connect(settings: &ConnectionSettings) -> Result<Self> {
        if settings.username.is_some() || settings.password.is_some() {
            // SQLite has no authentication.
            debug!("ignoring database credentials");
        }
        let db = match settings.path() {
            Some(path) => Self::open(&path)?,
            None => Self::open_in_memory()?,
        };
        db.setup()?;
        Ok(db)
    }

    fn configure(conn: Connection) -> Result<Self> {
        conn.busy_timeout(LOGIN_TIMEOUT)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Database { conn })
    }

    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| e)
            .context("Failed to close database")
    }

    fn existing_tables(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type IN ('table', 'view')")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    /// Names from [`REQUIRED_TABLES`] that do not exist yet.
    pub fn missing_tables(&self) -> Result<Vec<&'static str>> {
        let existing = self.existing_tables()?;
        Ok(REQUIRED_TABLES
            .iter()
            .copied()
            .filter(|table| !existing.iter().any(|name| name.eq_ignore_ascii_case(table)))
            .collect())
    }

    /// Run the setup script when any required table is missing.
    ///
    /// Returns `true` when the script ran.
    pub fn setup(&self) -> Result<bool> {
        let missing = self.missing_tables()?;
        if missing.is_empty() {
            return Ok(false);
        }
        info!(missing = ?missing, "creating database schema");
        self.conn
            .execute_batch(SETUP_SQL)
            .context("Encountered an error while setting up the database")?;
        Ok(true)
    }
}

impl Session for Database {
    fn query(&self, sql: &str, params: &[&[Value]]) -> rusqlite::Result<Vec<Row>> {
        debug!(sql, "query");
        let mut stmt = self.conn.prepare(sql)?;
        let names: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();
        let rows = stmt
            .query_map(params_from_iter(flatten(params)), |row| {
                names
                    .iter()
                    .enumerate()
                    .map(|(idx, name)| Ok((name.clone(), row.get::<_, Value>(idx)?)))
                    .collect::<rusqlite::Result<Vec<_>>>()
                    .map(Row::new)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn execute(
        &self,
        sql: &str,
        returning: &[&str],
        params: &[&[Value]],
    ) -> rusqlite::Result<Executed> {
        if returning.is_empty() {
            debug!(sql, "execute");
            let affected = self.conn.execute(sql, params_from_iter(flatten(params)))?;
            return Ok(Executed {
                affected,
                generated: None,
            });
        }

        let sql = format!("{sql} RETURNING {}", returning.join(", "));
        debug!(sql, "execute");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(flatten(params)))?;
        let mut executed = Executed::default();
        while let Some(row) = rows.next()? {
            if executed.generated.is_none() {
                let keys = (0..returning.len())
                    .map(|idx| row.get::<_, Value>(idx))
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                executed.generated = Some(keys);
            }
            executed.affected += 1;
        }
        Ok(executed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.setup().unwrap();
        db
    }

    #[test]
    fn test_setup_creates_all_tables() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.missing_tables().unwrap().len(), REQUIRED_TABLES.len());
        assert!(db.setup().unwrap());
        assert!(db.missing_tables().unwrap().is_empty());
    }

    #[test]
    fn test_setup_is_skipped_when_schema_exists() {
        let db = setup_db();
        assert!(!db.setup().unwrap());
    }

    #[test]
    fn test_setup_reruns_when_a_table_is_missing() {
        let db = setup_db();
        db.conn.execute_batch("DROP VIEW shopping_list_item").unwrap();
        assert_eq!(db.missing_tables().unwrap(), vec!["shopping_list_item"]);
        assert!(db.setup().unwrap());
        assert!(db.missing_tables().unwrap().is_empty());
    }

    #[test]
    fn test_settings_path() {
        let settings = |url: &str| ConnectionSettings {
            url: url.to_string(),
            ..ConnectionSettings::default()
        };
        assert_eq!(settings("").path(), None);
        assert_eq!(settings("sqlite::memory:").path(), None);
        assert_eq!(
            settings("sqlite:///tmp/plan.db").path(),
            Some(PathBuf::from("/tmp/plan.db"))
        );
        assert_eq!(
            settings("data/plan.db").path(),
            Some(PathBuf::from("data/plan.db"))
        );
    }

    #[test]
    fn test_connect_in_memory_runs_setup() {
        let db = Database::connect(&ConnectionSettings {
            url: ":memory:".to_string(),
            username: Some("planner".to_string()),
            password: Some("secret".to_string()),
        })
        .unwrap();
        assert!(db.missing_tables().unwrap().is_empty());
        db.close().unwrap();
    }

    #[test]
    fn test_execute_returns_generated_keys() {
        let db = setup_db();
        let params = [
            Value::Text("Rice".to_string()),
            Value::Text("cup".to_string()),
        ];
        let executed = db
            .execute(
                "INSERT INTO food_item (name, unit) VALUES (?, ?)",
                &["id"],
                &[&params],
            )
            .unwrap();
        assert_eq!(executed.affected, 1);
        assert_eq!(executed.generated, Some(vec![Value::Integer(1)]));
    }

    #[test]
    fn test_execute_without_returning() {
        let db = setup_db();
        let executed = db
            .execute(
                "DELETE FROM food_item WHERE id = ?",
                &[],
                &[&[Value::Integer(99)]],
            )
            .unwrap();
        assert_eq!(executed.affected, 0);
        assert_eq!(executed.generated, None);
    }

    #[test]
    fn test_query_returns_named_columns() {
        let db = setup_db();
        db.conn
            .execute_batch(
                "INSERT INTO meal_plan (name, week_start) VALUES ('Week 1', '2025-03-10');",
            )
            .unwrap();
        let rows = db
            .query(
                "SELECT * FROM meal_plan WHERE name = ?",
                &[&[Value::Text("Week 1".to_string())]],
            )
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("id"), Some(&Value::Integer(1)));
        assert_eq!(
            rows[0].get("week_start"),
            Some(&Value::Text("2025-03-10".to_string()))
        );
    }

    #[test]
    fn test_foreign_keys_enforced() {
        let db = setup_db();
        let err = db
            .execute(
                "INSERT INTO fridge_item (food_id, quantity) VALUES (?, ?)",
                &["id"],
                &[&[Value::Integer(42), Value::Decimal(1.0)]],
            )
            .unwrap_err();
        assert!(err.to_string().contains("FOREIGN KEY"));
    }

    #[test]
    fn test_shopping_list_view_subtracts_fridge_stock() {
        let db = setup_db();
        db.conn
            .execute_batch(
                "INSERT INTO food_item (name, unit) VALUES ('Egg', 'each'), ('Milk', 'cup');
                 INSERT INTO recipe (name) VALUES ('Omelette');
                 INSERT INTO recipe_ingredient (recipe_id, food_id, quantity) VALUES (1, 1, 3), (1, 2, 0.5);
                 INSERT INTO meal_plan (name, week_start) VALUES ('Week', '2025-03-10');
                 INSERT INTO meal (plan_id, day, type, recipe_id) VALUES (1, 1, 'breakfast', 1), (1, 2, 'breakfast', 1);
                 INSERT INTO fridge_item (food_id, quantity) VALUES (1, 2), (2, 4);",
            )
            .unwrap();
        let rows = db
            .query("SELECT * FROM shopping_list_item ORDER BY food_id", &[])
            .unwrap();
        // 2 meals x 3 eggs = 6, minus 2 in the fridge; milk is fully stocked
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("food_id"), Some(&Value::Integer(1)));
        assert_eq!(rows[0].get("quantity"), Some(&Value::Decimal(4.0)));
    }
}

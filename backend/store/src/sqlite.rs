//! SQLite-backed subscriber store.
//!
//! One row per subscriber in the `subscribers` table. Every preference column
//! is nullable; NULL reads as the documented default, so rows written before a
//! column existed load unchanged. Opening a database adds any missing columns
//! and copies in rows from a legacy `users` table when one is present.
//!
//! Preference columns decode leniently: a value of the wrong type or out of
//! range reads as NULL. A row whose ids do not decode is skipped by `all`.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use wird_core::{
    ChatTarget, FeatureFlag, Location, PreferenceChange, Subscriber, SubscriberId,
    SubscriberStore, WirdError, WirdResult,
};

/// Columns added on open when absent, with their SQL types.
const COLUMNS: &[(&str, &str)] = &[
    ("daily_pages", "INTEGER"),
    ("current_page", "INTEGER"),
    ("quran_time", "TEXT"),
    ("baqarah_enabled", "INTEGER"),
    ("morning_azkar_enabled", "INTEGER"),
    ("evening_azkar_enabled", "INTEGER"),
    ("kahf_enabled", "INTEGER"),
    ("mulk_enabled", "INTEGER"),
    ("white_days_reminder", "INTEGER"),
    ("timezone_offset", "INTEGER"),
    ("city", "TEXT"),
    ("country", "TEXT"),
];

/// Legacy `users` columns and the `subscribers` columns they load into.
const LEGACY_COLUMNS: &[(&str, &str)] = &[
    ("daily_pages", "daily_pages"),
    ("current_page", "current_page"),
    ("quran_time", "quran_time"),
    ("bakarah_enabled", "baqarah_enabled"),
    ("morning_azkar_enabled", "morning_azkar_enabled"),
    ("evening_azkar_enabled", "evening_azkar_enabled"),
    ("kahf_enabled", "kahf_enabled"),
    ("mulk_enabled", "mulk_enabled"),
    ("white_days_reminder", "white_days_reminder"),
    ("timezone_offset", "timezone_offset"),
    ("created_at", "created_at"),
];

fn flag_column(flag: FeatureFlag) -> &'static str {
    match flag {
        FeatureFlag::Baqarah => "baqarah_enabled",
        FeatureFlag::MorningAzkar => "morning_azkar_enabled",
        FeatureFlag::EveningAzkar => "evening_azkar_enabled",
        FeatureFlag::Kahf => "kahf_enabled",
        FeatureFlag::Mulk => "mulk_enabled",
        FeatureFlag::WhiteDays => "white_days_reminder",
    }
}

pub struct SqliteSubscriberStore {
    conn: Mutex<Connection>,
}

impl SqliteSubscriberStore {
    /// Create or open a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .context("Failed to open SQLite subscriber database")?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .context("Failed to enable WAL journal")?;
        init_schema(&conn)?;
        info!("SqliteSubscriberStore opened at {:?}", path.as_ref());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for tests).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS subscribers (
             user_id    INTEGER PRIMARY KEY,
             chat_id    INTEGER NOT NULL,
             created_at TEXT DEFAULT CURRENT_TIMESTAMP
         );",
    )
    .context("Failed to initialize subscribers schema")?;

    let existing = table_columns(conn, "subscribers")?;
    for (name, sql_type) in COLUMNS {
        if existing.iter().any(|c| c == name) {
            continue;
        }
        conn.execute(
            &format!("ALTER TABLE subscribers ADD COLUMN {name} {sql_type}"),
            [],
        )
        .with_context(|| format!("Failed to add column {name}"))?;
        info!(column = name, "Upgraded subscribers table");
    }

    import_legacy_users(conn)
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}

/// Copy rows from the older `users` table. Rows already in `subscribers` win,
/// so running this on every open is harmless.
fn import_legacy_users(conn: &Connection) -> Result<()> {
    let present: bool = conn
        .query_row(
            "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'users')",
            [],
            |row| row.get(0),
        )
        .context("Failed to look for legacy users table")?;
    if !present {
        return Ok(());
    }

    let legacy = table_columns(conn, "users")?;
    if !legacy.iter().any(|c| c == "user_id") {
        warn!("Legacy users table has no user_id column, not importing");
        return Ok(());
    }
    let has_chat_id = legacy.iter().any(|c| c == "chat_id");

    let mut targets = vec!["user_id", "chat_id"];
    let mut sources = vec![
        "user_id".to_string(),
        if has_chat_id {
            "COALESCE(chat_id, user_id)".to_string()
        } else {
            "user_id".to_string()
        },
    ];
    for (from, to) in LEGACY_COLUMNS {
        if legacy.iter().any(|c| c == from) {
            targets.push(*to);
            sources.push((*from).to_string());
        }
    }

    let sql = format!(
        "INSERT OR IGNORE INTO subscribers ({}) SELECT {} FROM users WHERE user_id IS NOT NULL",
        targets.join(", "),
        sources.join(", ")
    );
    let imported = conn
        .execute(&sql, [])
        .context("Failed to import legacy users")?;
    if imported > 0 {
        info!(rows = imported, "Imported subscribers from legacy users table");
    }
    Ok(())
}

fn storage_err(e: rusqlite::Error) -> WirdError {
    WirdError::Storage(e.to_string())
}

fn as_integer(value: ValueRef<'_>) -> Option<i64> {
    match value {
        ValueRef::Integer(i) => Some(i),
        ValueRef::Real(f) if f.fract() == 0.0 => Some(f as i64),
        ValueRef::Text(t) => std::str::from_utf8(t).ok()?.trim().parse().ok(),
        _ => None,
    }
}

fn as_bool(value: ValueRef<'_>) -> Option<bool> {
    if let ValueRef::Text(t) = value {
        match std::str::from_utf8(t).ok()?.trim() {
            "true" | "TRUE" | "True" => return Some(true),
            "false" | "FALSE" | "False" => return Some(false),
            _ => {}
        }
    }
    as_integer(value).map(|i| i != 0)
}

fn as_text(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Text(t) => Some(String::from_utf8_lossy(t).into_owned()),
        _ => None,
    }
}

/// Read one preference column; anything undecodable reads as NULL.
fn lenient<T>(
    row: &Row<'_>,
    id: SubscriberId,
    column: &str,
    decode: impl Fn(ValueRef<'_>) -> Option<T>,
) -> Option<T> {
    let value = row.get_ref(column).ok()?;
    if matches!(value, ValueRef::Null) {
        return None;
    }
    let decoded = decode(value);
    if decoded.is_none() {
        warn!(subscriber_id = id, column, "Ignoring undecodable stored value");
    }
    decoded
}

fn row_to_subscriber(row: &Row<'_>) -> rusqlite::Result<Subscriber> {
    let id: SubscriberId = row.get("user_id")?;
    let mut subscriber = Subscriber::new(id, row.get("chat_id")?);
    subscriber.daily_pages = lenient(row, id, "daily_pages", |v| {
        as_integer(v).and_then(|n| u32::try_from(n).ok())
    });
    subscriber.current_page = lenient(row, id, "current_page", |v| {
        as_integer(v).and_then(|n| u32::try_from(n).ok())
    });
    subscriber.quran_time = lenient(row, id, "quran_time", as_text);
    subscriber.utc_offset = lenient(row, id, "timezone_offset", |v| {
        as_integer(v).and_then(|n| i32::try_from(n).ok())
    });

    for flag in FeatureFlag::ALL {
        if let Some(on) = lenient(row, id, flag_column(flag), as_bool) {
            subscriber.flags.insert(flag, on);
        }
    }

    let city = lenient(row, id, "city", as_text);
    let country = lenient(row, id, "country", as_text);
    subscriber.location = match (city, country) {
        (Some(city), Some(country)) => Some(Location::new(city, country)),
        _ => None,
    };
    Ok(subscriber)
}

/// Column assignments for one preference change.
fn assignments(change: &PreferenceChange) -> Vec<(&'static str, Value)> {
    match change {
        PreferenceChange::DailyPages(n) => vec![("daily_pages", Value::Integer(i64::from(*n)))],
        PreferenceChange::QuranTime(t) => vec![("quran_time", Value::Text(t.to_string()))],
        PreferenceChange::UtcOffset(h) => {
            vec![("timezone_offset", Value::Integer(i64::from(*h)))]
        }
        PreferenceChange::Flag(flag, on) => {
            vec![(flag_column(*flag), Value::Integer(i64::from(*on)))]
        }
        PreferenceChange::Location(Some(loc)) => vec![
            ("city", Value::Text(loc.city.clone())),
            ("country", Value::Text(loc.country.clone())),
        ],
        PreferenceChange::Location(None) => vec![("city", Value::Null), ("country", Value::Null)],
        PreferenceChange::Cursor(page) => {
            vec![("current_page", Value::Integer(i64::from(*page)))]
        }
    }
}

#[async_trait]
impl SubscriberStore for SqliteSubscriberStore {
    async fn upsert(&self, id: SubscriberId, target: ChatTarget) -> WirdResult<bool> {
        let conn = self.conn.lock().await;
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO subscribers (user_id, chat_id) VALUES (?1, ?2)",
                params![id, target],
            )
            .map_err(storage_err)?;
        if inserted > 0 {
            debug!(subscriber_id = id, "Registered subscriber");
        }
        Ok(inserted > 0)
    }

    async fn get(&self, id: SubscriberId) -> WirdResult<Option<Subscriber>> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT * FROM subscribers WHERE user_id = ?1",
            params![id],
            row_to_subscriber,
        )
        .optional()
        .map_err(storage_err)
    }

    async fn set_field(&self, id: SubscriberId, change: &PreferenceChange) -> WirdResult<()> {
        let assignments = assignments(change);
        let set_clause = assignments
            .iter()
            .enumerate()
            .map(|(i, (col, _))| format!("{col} = ?{}", i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE subscribers SET {set_clause} WHERE user_id = ?{}",
            assignments.len() + 1
        );
        let values = assignments
            .into_iter()
            .map(|(_, v)| v)
            .chain(std::iter::once(Value::Integer(id)));

        let conn = self.conn.lock().await;
        let updated = conn
            .execute(&sql, params_from_iter(values))
            .map_err(storage_err)?;
        if updated == 0 {
            return Err(WirdError::UnknownSubscriber(id));
        }
        debug!(subscriber_id = id, field = change.field(), "Updated preference");
        Ok(())
    }

    async fn all(&self) -> WirdResult<Vec<Subscriber>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT * FROM subscribers ORDER BY user_id")
            .map_err(storage_err)?;
        let mut rows = stmt.query([]).map_err(storage_err)?;
        let mut subscribers = Vec::new();
        while let Some(row) = rows.next().map_err(storage_err)? {
            match row_to_subscriber(row) {
                Ok(subscriber) => subscribers.push(subscriber),
                Err(e) => warn!(error = %e, "Skipping undecodable subscriber row"),
            }
        }
        Ok(subscribers)
    }
}

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Transaction};
use rusqlite_migration::{Migrations, M};
use tokio::sync::broadcast;
use tracing::debug;

use crate::app::error::{NewsstandError, Result};
use crate::domain::{Image, Item};
use crate::store::{ItemFilter, ItemStore, StoreEvent};

const EVENT_CHANNEL_CAPACITY: usize = 64;

pub struct SqliteStore {
    conn: Mutex<Connection>,
    events: broadcast::Sender<StoreEvent>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let store = Self {
            conn: Mutex::new(conn),
            events,
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.conn()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrations
            .to_latest(&mut conn)
            .map_err(|e| NewsstandError::Config(format!("Migration failed: {e}")))?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| NewsstandError::Config("Store mutex poisoned".into()))
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }

    fn row_to_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<Item> {
        Ok(Item {
            key: row.get(0)?,
            title: row.get(1)?,
            link: row.get(2)?,
            source: row.get(3)?,
            category: row.get(4)?,
            body: row.get(5)?,
            images: Vec::new(),
            published_at: row
                .get::<_, Option<String>>(6)?
                .and_then(|s| Self::parse_datetime(&s)),
            fetched_at: row
                .get::<_, String>(7)
                .ok()
                .and_then(|s| Self::parse_datetime(&s))
                .unwrap_or_else(Utc::now),
            fully_hydrated: row.get::<_, i32>(8)? != 0,
            bookmarked: row.get::<_, i32>(9)? != 0,
            last_accessed: row
                .get::<_, Option<String>>(10)?
                .and_then(|s| Self::parse_datetime(&s)),
        })
    }

    const ITEM_COLUMNS: &'static str = "key, title, link, source, category, body, published_at, \
         fetched_at, fully_hydrated, bookmarked, last_accessed";

    fn load_images(conn: &Connection, key: &str) -> Result<Vec<Image>> {
        let mut stmt = conn.prepare(
            "SELECT url, caption FROM images WHERE item_key = ?1 ORDER BY position",
        )?;
        let images = stmt
            .query_map(params![key], |row| {
                Ok(Image {
                    url: row.get(0)?,
                    caption: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(images)
    }

    fn get_with_conn(conn: &Connection, key: &str) -> Result<Option<Item>> {
        let item = conn
            .query_row(
                &format!("SELECT {} FROM items WHERE key = ?1", Self::ITEM_COLUMNS),
                params![key],
                Self::row_to_item,
            )
            .optional()?;

        match item {
            Some(mut item) => {
                item.images = Self::load_images(conn, &item.key)?;
                Ok(Some(item))
            }
            None => Ok(None),
        }
    }

    fn write_item(tx: &Transaction<'_>, item: &Item, replace_images: bool) -> Result<()> {
        tx.execute(
            "INSERT INTO items (key, title, link, source, category, body, published_at, \
             fetched_at, fully_hydrated, bookmarked, last_accessed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(key) DO UPDATE SET
               title = ?2, link = ?3, source = ?4, category = ?5, body = ?6,
               published_at = ?7, fetched_at = ?8, fully_hydrated = ?9,
               bookmarked = ?10, last_accessed = ?11",
            params![
                item.key,
                item.title,
                item.link,
                item.source,
                item.category,
                item.body,
                item.published_at.map(|dt| dt.to_rfc3339()),
                item.fetched_at.to_rfc3339(),
                item.fully_hydrated as i32,
                item.bookmarked as i32,
                item.last_accessed.map(|dt| dt.to_rfc3339()),
            ],
        )?;

        if replace_images {
            tx.execute("DELETE FROM images WHERE item_key = ?1", params![item.key])?;
            for (position, image) in item.images.iter().enumerate() {
                tx.execute(
                    "INSERT INTO images (item_key, position, url, caption) VALUES (?1, ?2, ?3, ?4)",
                    params![item.key, position as i64, image.url, image.caption],
                )?;
            }
        }

        Ok(())
    }

    fn notify(&self, keys: Vec<String>) {
        if keys.is_empty() {
            return;
        }
        // No receivers is fine; consumers subscribe when they care.
        let _ = self.events.send(StoreEvent::ItemsChanged(keys));
    }
}

/// Escape the LIKE metacharacters so the search text matches literally.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Field-level reconciliation of an incoming item with its stored record.
/// The stored record wins wherever the incoming item is empty, and the
/// consumer-owned flags (`bookmarked`, `last_accessed`) always survive a
/// refresh.
fn reconcile(existing: Item, incoming: &Item) -> Item {
    Item {
        key: existing.key,
        link: existing.link,
        title: if incoming.title.is_empty() {
            existing.title
        } else {
            incoming.title.clone()
        },
        source: existing.source,
        category: incoming.category.clone().or(existing.category),
        body: match &incoming.body {
            Some(body) if !body.is_empty() => Some(body.clone()),
            _ => existing.body,
        },
        images: if incoming.images.is_empty() {
            existing.images
        } else {
            incoming.images.clone()
        },
        published_at: incoming.published_at.or(existing.published_at),
        fetched_at: incoming.fetched_at,
        fully_hydrated: existing.fully_hydrated || incoming.fully_hydrated,
        bookmarked: existing.bookmarked,
        last_accessed: existing.last_accessed,
    }
}

impl ItemStore for SqliteStore {
    fn merge(&self, items: &[Item]) -> Result<Vec<Item>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut merged = Vec::with_capacity(items.len());

        for incoming in items {
            let result = match Self::get_with_conn(&tx, &incoming.key)? {
                Some(existing) => {
                    let reconciled = reconcile(existing, incoming);
                    Self::write_item(&tx, &reconciled, !incoming.images.is_empty())?;
                    reconciled
                }
                None => {
                    Self::write_item(&tx, incoming, true)?;
                    incoming.clone()
                }
            };
            merged.push(result);
        }

        tx.commit()?;
        debug!(count = merged.len(), "Merged items");

        self.notify(merged.iter().map(|i| i.key.clone()).collect());
        Ok(merged)
    }

    fn get(&self, key: &str) -> Result<Option<Item>> {
        let conn = self.conn()?;
        Self::get_with_conn(&conn, key)
    }

    fn query(&self, filter: &ItemFilter) -> Result<Vec<Item>> {
        let conn = self.conn()?;

        let mut clauses: Vec<String> = Vec::new();
        let mut args: Vec<String> = Vec::new();

        // An explicitly empty set matches nothing.
        for (column, values) in [
            ("category", &filter.categories),
            ("source", &filter.sources),
        ] {
            let Some(values) = values else { continue };
            if values.is_empty() {
                clauses.push("0".into());
                continue;
            }
            let placeholders = (args.len() + 1..=args.len() + values.len())
                .map(|i| format!("?{i}"))
                .collect::<Vec<_>>()
                .join(", ");
            clauses.push(format!("{column} IN ({placeholders})"));
            args.extend(values.iter().cloned());
        }

        if let Some(text) = &filter.text {
            clauses.push(format!(
                "LOWER(title) LIKE '%' || ?{} || '%' ESCAPE '\\'",
                args.len() + 1
            ));
            args.push(escape_like(&text.to_lowercase()));
        }

        let mut sql = format!("SELECT {} FROM items", Self::ITEM_COLUMNS);
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY published_at DESC, fetched_at DESC");

        let mut stmt = conn.prepare(&sql)?;
        let mut items = stmt
            .query_map(params_from_iter(args.iter()), Self::row_to_item)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for item in &mut items {
            item.images = Self::load_images(&conn, &item.key)?;
        }

        Ok(items)
    }

    fn set_bookmarked(&self, key: &str, bookmarked: bool) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE items SET bookmarked = ?1 WHERE key = ?2",
            params![bookmarked as i32, key],
        )?;
        drop(conn);

        if updated == 0 {
            return Err(NewsstandError::ItemNotFound(key.to_string()));
        }

        self.notify(vec![key.to_string()]);
        Ok(())
    }

    fn touch_last_accessed(&self, key: &str) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE items SET last_accessed = ?1 WHERE key = ?2",
            params![Utc::now().to_rfc3339(), key],
        )?;
        drop(conn);

        if updated == 0 {
            return Err(NewsstandError::ItemNotFound(key.to_string()));
        }

        self.notify(vec![key.to_string()]);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}

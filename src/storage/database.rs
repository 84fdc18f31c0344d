//! SQLite-backed card catalog

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::catalog::{CardCatalog, CatalogError, CatalogMatch};

/// Card catalog stored in a SQLite database.
///
/// Searches run on the blocking thread pool.
pub struct SqliteCatalog {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCatalog {
    /// Open or create a catalog database at path
    pub fn open(path: &Path) -> Result<Self, CatalogError> {
        let conn = Connection::open(path)?;
        let catalog = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        catalog.init_schema()?;
        info!("Opened card catalog at {:?}", path);
        Ok(catalog)
    }

    /// Open a throwaway in-memory catalog
    pub fn open_in_memory() -> Result<Self, CatalogError> {
        let catalog = Self {
            conn: Arc::new(Mutex::new(Connection::open_in_memory()?)),
        };
        catalog.init_schema()?;
        Ok(catalog)
    }

    /// Create tables if they do not exist
    pub fn init_schema(&self) -> Result<(), CatalogError> {
        self.conn.lock().execute_batch(
            "CREATE TABLE IF NOT EXISTS cards (
                 id      TEXT PRIMARY KEY,
                 name    TEXT NOT NULL,
                 set_id  TEXT NOT NULL,
                 number  TEXT NOT NULL,
                 variant TEXT
             );
             CREATE INDEX IF NOT EXISTS idx_cards_number ON cards (number);
             CREATE INDEX IF NOT EXISTS idx_cards_set ON cards (set_id);",
        )?;
        Ok(())
    }

    /// Insert or replace cards in a single transaction
    pub fn insert_cards(&self, cards: &[CatalogMatch]) -> Result<usize, CatalogError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO cards (id, name, set_id, number, variant)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for card in cards {
                stmt.execute(params![card.id, card.name, card.set_id, card.number, card.variant])?;
            }
        }
        tx.commit()?;

        info!("Imported {} cards into catalog", cards.len());
        Ok(cards.len())
    }

    /// Number of cards in the catalog
    pub fn card_count(&self) -> Result<usize, CatalogError> {
        let count: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM cards", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Distinct card names, sorted
    pub fn card_names(&self) -> Result<Vec<String>, CatalogError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT DISTINCT name FROM cards ORDER BY name ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut names = Vec::new();
        for name in rows {
            names.push(name?);
        }
        Ok(names)
    }

    fn row_to_match(row: &Row) -> rusqlite::Result<CatalogMatch> {
        Ok(CatalogMatch {
            id: row.get(0)?,
            name: row.get(1)?,
            set_id: row.get(2)?,
            number: row.get(3)?,
            variant: row.get(4)?,
        })
    }

    fn search_sync(
        conn: &Connection,
        name: Option<&str>,
        number: Option<&str>,
        limit: usize,
    ) -> Result<Vec<CatalogMatch>, CatalogError> {
        // Name: case-insensitive substring. Number: leading zeros ignored.
        let mut stmt = conn.prepare(
            "SELECT id, name, set_id, number, variant FROM cards
             WHERE (?1 IS NULL OR instr(lower(name), lower(?1)) > 0)
               AND (?2 IS NULL OR ltrim(lower(trim(number)), '0') = ltrim(lower(trim(?2)), '0'))
             ORDER BY rowid ASC
             LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![name, number, limit as i64], Self::row_to_match)?;

        let mut matches = Vec::new();
        for card in rows {
            matches.push(card?);
        }
        Ok(matches)
    }
}

#[async_trait]
impl CardCatalog for SqliteCatalog {
    async fn is_ready(&self) -> bool {
        match self.card_count() {
            Ok(count) => count > 0,
            Err(e) => {
                debug!("Catalog readiness check failed: {}", e);
                false
            }
        }
    }

    async fn search(
        &self,
        name: Option<&str>,
        number: Option<&str>,
        limit: usize,
    ) -> Result<Vec<CatalogMatch>, CatalogError> {
        let conn = Arc::clone(&self.conn);
        let name_owned = name.map(str::to_string);
        let number_owned = number.map(str::to_string);

        let matches = tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            Self::search_sync(&conn, name_owned.as_deref(), number_owned.as_deref(), limit)
        })
        .await
        .map_err(|e| CatalogError::Unavailable(format!("Catalog search task failed: {}", e)))??;

        debug!(?name, ?number, limit, found = matches.len(), "Catalog search");
        Ok(matches)
    }
}

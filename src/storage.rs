use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection};
use tracing::info;

use crate::models::{AuctionPriceObservation, AuctionRecord, PriceObservation, PropertyRecord};

/// The standard (non-auction) sources, in scrape order. Also the
/// whitelist for table-name construction — table names are built from
/// these keys and never from caller input.
pub const STANDARD_SOURCES: [&str; 3] = ["chaves_na_mao", "viva_real", "zap_imoveis"];

pub const AUCTION_SOURCE: &str = "leilao_imovel";

/// Embedded SQLite store, one file per process, logically partitioned
/// per source into a `<source>_register` table (merge-by-id) and a
/// `<source>_history` table (append-only).
///
/// Field typing is enforced upstream by the record structs; anything
/// optional that failed extraction arrives here as `None` and is
/// stored as NULL rather than aborting the record.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create database directory {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        let storage = Self { conn };
        storage.init_schema()?;
        info!(path = %path.display(), "storage ready");
        Ok(storage)
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let storage = Self { conn };
        storage.init_schema()?;
        Ok(storage)
    }

    fn init_schema(&self) -> Result<()> {
        for source in STANDARD_SOURCES {
            self.conn.execute_batch(&format!(
                "
                CREATE TABLE IF NOT EXISTS {source}_register (
                    id          TEXT PRIMARY KEY,
                    captured_at TEXT NOT NULL,
                    price       REAL,
                    size_m2     REAL,
                    bedrooms    INTEGER NOT NULL DEFAULT 0,
                    bathrooms   INTEGER NOT NULL DEFAULT 0,
                    parking     INTEGER NOT NULL DEFAULT 0,
                    street      TEXT NOT NULL,
                    neighborhood TEXT,
                    city        TEXT,
                    latitude    REAL,
                    longitude   REAL
                );
                CREATE TABLE IF NOT EXISTS {source}_history (
                    id          TEXT NOT NULL,
                    captured_at TEXT NOT NULL,
                    price       REAL
                );
                CREATE INDEX IF NOT EXISTS idx_{source}_history_id ON {source}_history(id);
                "
            ))?;
        }

        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS leilao_imovel_register (
                id                 TEXT PRIMARY KEY,
                captured_at        TEXT NOT NULL,
                first_round_price  REAL,
                first_round_at     TEXT,
                second_round_price REAL,
                second_round_at    TEXT,
                current_price      REAL,
                usable_area        REAL,
                lot_area           REAL,
                street             TEXT NOT NULL,
                neighborhood       TEXT,
                city               TEXT,
                latitude           REAL,
                longitude          REAL,
                detail_url         TEXT,
                accepts_financing  INTEGER,
                accepts_fgts       INTEGER,
                parking            INTEGER,
                bedrooms           INTEGER
            );
            CREATE TABLE IF NOT EXISTS leilao_imovel_history (
                id                 TEXT NOT NULL,
                captured_at        TEXT NOT NULL,
                first_round_price  REAL,
                second_round_price REAL,
                current_price      REAL
            );
            CREATE INDEX IF NOT EXISTS idx_leilao_imovel_history_id ON leilao_imovel_history(id);
            ",
        )?;
        Ok(())
    }

    fn check_standard_source(source: &str) -> Result<()> {
        if !STANDARD_SOURCES.contains(&source) {
            bail!("unknown standard source '{source}'");
        }
        Ok(())
    }

    /// Merge-by-id: insert if absent, replace every column if present.
    /// Repeated scrapes keep the register current without growing it.
    pub fn upsert_register(&self, source: &str, record: &PropertyRecord) -> Result<()> {
        Self::check_standard_source(source)?;
        self.conn
            .execute(
                &format!(
                    "INSERT INTO {source}_register
                     (id, captured_at, price, size_m2, bedrooms, bathrooms, parking,
                      street, neighborhood, city, latitude, longitude)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                     ON CONFLICT(id) DO UPDATE SET
                        captured_at = excluded.captured_at,
                        price       = excluded.price,
                        size_m2     = excluded.size_m2,
                        bedrooms    = excluded.bedrooms,
                        bathrooms   = excluded.bathrooms,
                        parking     = excluded.parking,
                        street      = excluded.street,
                        neighborhood = excluded.neighborhood,
                        city        = excluded.city,
                        latitude    = excluded.latitude,
                        longitude   = excluded.longitude"
                ),
                params![
                    record.id,
                    record.captured_at,
                    record.price,
                    record.size_m2,
                    record.bedrooms,
                    record.bathrooms,
                    record.parking,
                    record.street,
                    record.neighborhood,
                    record.city,
                    record.latitude,
                    record.longitude,
                ],
            )
            .with_context(|| format!("register write failed for source '{source}'"))?;
        Ok(())
    }

    /// Pure append: a listing scraped on two days yields two rows.
    pub fn append_history(&self, source: &str, observation: &PriceObservation) -> Result<()> {
        Self::check_standard_source(source)?;
        self.conn
            .execute(
                &format!(
                    "INSERT INTO {source}_history (id, captured_at, price) VALUES (?1, ?2, ?3)"
                ),
                params![observation.id, observation.captured_at, observation.price],
            )
            .with_context(|| format!("history write failed for source '{source}'"))?;
        Ok(())
    }

    pub fn upsert_auction(&self, record: &AuctionRecord) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO leilao_imovel_register
                 (id, captured_at, first_round_price, first_round_at, second_round_price,
                  second_round_at, current_price, usable_area, lot_area, street, neighborhood,
                  city, latitude, longitude, detail_url, accepts_financing, accepts_fgts,
                  parking, bedrooms)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                         ?16, ?17, ?18, ?19)
                 ON CONFLICT(id) DO UPDATE SET
                    captured_at        = excluded.captured_at,
                    first_round_price  = excluded.first_round_price,
                    first_round_at     = excluded.first_round_at,
                    second_round_price = excluded.second_round_price,
                    second_round_at    = excluded.second_round_at,
                    current_price      = excluded.current_price,
                    usable_area        = excluded.usable_area,
                    lot_area           = excluded.lot_area,
                    street             = excluded.street,
                    neighborhood       = excluded.neighborhood,
                    city               = excluded.city,
                    latitude           = excluded.latitude,
                    longitude          = excluded.longitude,
                    detail_url         = excluded.detail_url,
                    accepts_financing  = excluded.accepts_financing,
                    accepts_fgts       = excluded.accepts_fgts,
                    parking            = excluded.parking,
                    bedrooms           = excluded.bedrooms",
                params![
                    record.id,
                    record.captured_at,
                    record.first_round_price,
                    record.first_round_at,
                    record.second_round_price,
                    record.second_round_at,
                    record.current_price,
                    record.usable_area,
                    record.lot_area,
                    record.street,
                    record.neighborhood,
                    record.city,
                    record.latitude,
                    record.longitude,
                    record.detail_url,
                    record.accepts_financing,
                    record.accepts_fgts,
                    record.parking,
                    record.bedrooms,
                ],
            )
            .context("auction register write failed")?;
        Ok(())
    }

    pub fn append_auction_history(&self, observation: &AuctionPriceObservation) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO leilao_imovel_history
                 (id, captured_at, first_round_price, second_round_price, current_price)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    observation.id,
                    observation.captured_at,
                    observation.first_round_price,
                    observation.second_round_price,
                    observation.current_price,
                ],
            )
            .context("auction history write failed")?;
        Ok(())
    }

    pub fn has_table(&self, name: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn count_rows(&self, table: &str) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(count)
    }

    pub(crate) fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    #[cfg(test)]
    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }
}

// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of SkyWatch.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, params};

use crate::error::StoreError;
use crate::model::{Reading, ReadingFilter, StoredReading, encode_timestamp};

/// Append-only reading log shared by the collection and query paths.
pub trait ReadingStore: Send + Sync + std::fmt::Debug {
    /// Persists one reading and returns its row id.
    fn append(&self, reading: &Reading) -> Result<i64, StoreError>;

    /// Every reading matching `filter`, exactly once, in no particular order.
    fn query(&self, filter: &ReadingFilter) -> Result<Vec<StoredReading>, StoreError>;

    fn reading_count(&self, city: Option<&str>) -> Result<u64, StoreError>;
}

#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &str) -> Result<Self, StoreError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS readings (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                city            TEXT NOT NULL,
                captured_at     TEXT NOT NULL,
                temperature_c   REAL NOT NULL,
                feels_like_c    REAL NOT NULL,
                condition       TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_readings_city_time
                ON readings(city, captured_at);",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("database mutex poisoned".to_owned()))
    }

    /// Inserts a row verbatim, bypassing `Reading` validation. Used to seed
    /// imported history and to reproduce corrupt rows.
    pub fn insert_raw(
        &self,
        city: &str,
        captured_at: &str,
        temperature_c: f64,
        feels_like_c: f64,
        condition: &str,
    ) -> Result<i64, StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO readings (city, captured_at, temperature_c, feels_like_c, condition)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![city, captured_at, temperature_c, feels_like_c, condition],
        )?;
        Ok(conn.last_insert_rowid())
    }
}

impl ReadingStore for Database {
    fn append(&self, reading: &Reading) -> Result<i64, StoreError> {
        self.insert_raw(
            &reading.city,
            &encode_timestamp(reading.captured_at),
            reading.temperature_c,
            reading.feels_like_c,
            &reading.condition,
        )
    }

    fn query(&self, filter: &ReadingFilter) -> Result<Vec<StoredReading>, StoreError> {
        if filter.range.is_empty() {
            return Ok(Vec::new());
        }

        let start = filter.range.start.map(encode_timestamp);
        let end = filter.range.end.map(encode_timestamp);

        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, city, captured_at, temperature_c, feels_like_c, condition
             FROM readings
             WHERE (?1 IS NULL OR city = ?1)
               AND (?2 IS NULL OR captured_at >= ?2)
               AND (?3 IS NULL OR captured_at < ?3)",
        )?;

        let rows = stmt
            .query_map(params![filter.city.as_deref(), start, end], |row| {
                Ok(StoredReading {
                    id: row.get(0)?,
                    city: row.get(1)?,
                    captured_at: row.get(2)?,
                    temperature_c: row.get(3)?,
                    feels_like_c: row.get(4)?,
                    condition: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    fn reading_count(&self, city: Option<&str>) -> Result<u64, StoreError> {
        let conn = self.conn()?;
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM readings WHERE (?1 IS NULL OR city = ?1)",
            params![city],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

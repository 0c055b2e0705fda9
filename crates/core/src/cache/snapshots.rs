//! Snapshot storage operations.
//!
//! Provides single-snapshot upsert and lookup for fetch interception, and
//! the all-or-nothing bulk store used during install.

use super::connection::CacheDb;
use super::hash::compute_snapshot_key;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A captured HTTP exchange stored under a cache generation.
///
/// The body is an owned byte buffer, so the stored copy and the copy served
/// to the caller are independent readers of the same bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub key: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub headers_json: Option<String>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl Snapshot {
    /// Build a snapshot for a response, keyed by request method + URL.
    pub fn new(method: &str, url: &str, status: u16, content_type: Option<String>, headers_json: Option<String>, body: Vec<u8>) -> Self {
        Self {
            key: compute_snapshot_key(method, url),
            method: method.to_uppercase(),
            url: url.to_string(),
            status,
            content_type,
            headers_json,
            body,
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl CacheDb {
    /// Insert or update a snapshot under a generation.
    ///
    /// Uses UPSERT semantics: inserts if the (generation, key) pair doesn't
    /// exist, overwrites the stored exchange if it does. Storing twice for
    /// the same key therefore leaves exactly one row.
    pub async fn put_snapshot(&self, generation: &str, snapshot: &Snapshot) -> Result<(), Error> {
        let generation = generation.to_string();
        let snapshot = snapshot.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let inserted = conn.execute(
                    "INSERT INTO snapshots (
                        generation, key, method, url, status,
                        content_type, headers_json, body, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    ON CONFLICT(generation, key) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status = excluded.status,
                        content_type = excluded.content_type,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![
                        &generation,
                        &snapshot.key,
                        &snapshot.method,
                        &snapshot.url,
                        snapshot.status as i64,
                        &snapshot.content_type,
                        &snapshot.headers_json,
                        &snapshot.body,
                        &snapshot.stored_at,
                    ],
                );
                match inserted {
                    Ok(_) => Ok(()),
                    Err(rusqlite::Error::SqliteFailure(e, _))
                        if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                    {
                        Err(Error::GenerationMissing(generation.clone()))
                    }
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a snapshot by exact key under a generation.
    ///
    /// Returns None on a cache miss.
    pub async fn match_snapshot(&self, generation: &str, key: &str) -> Result<Option<Snapshot>, Error> {
        let generation = generation.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Snapshot>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key, method, url, status, content_type, headers_json, body, stored_at
                     FROM snapshots WHERE generation = ?1 AND key = ?2",
                )?;

                let result = stmt.query_row(params![generation, key], |row| {
                    Ok(Snapshot {
                        key: row.get(0)?,
                        method: row.get(1)?,
                        url: row.get(2)?,
                        status: row.get::<_, i64>(3)? as u16,
                        content_type: row.get(4)?,
                        headers_json: row.get(5)?,
                        body: row.get(6)?,
                        stored_at: row.get(7)?,
                    })
                });

                match result {
                    Ok(s) => Ok(Some(s)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Bulk-store precached snapshots and mark the generation installed.
    ///
    /// Runs in a single transaction: either every snapshot lands and the
    /// generation's completed_at is set, or nothing changes. There is no
    /// partial-success contract.
    pub async fn store_all(&self, generation: &str, snapshots: Vec<Snapshot>) -> Result<(), Error> {
        let generation = generation.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;

                let exists: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM generations WHERE name = ?1)",
                    params![generation],
                    |row| row.get(0),
                )?;
                if !exists {
                    return Err(Error::GenerationMissing(generation.clone()));
                }

                for snapshot in &snapshots {
                    tx.execute(
                        "INSERT INTO snapshots (
                            generation, key, method, url, status,
                            content_type, headers_json, body, stored_at
                        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                        ON CONFLICT(generation, key) DO UPDATE SET
                            method = excluded.method,
                            url = excluded.url,
                            status = excluded.status,
                            content_type = excluded.content_type,
                            headers_json = excluded.headers_json,
                            body = excluded.body,
                            stored_at = excluded.stored_at",
                        params![
                            &generation,
                            &snapshot.key,
                            &snapshot.method,
                            &snapshot.url,
                            snapshot.status as i64,
                            &snapshot.content_type,
                            &snapshot.headers_json,
                            &snapshot.body,
                            &snapshot.stored_at,
                        ],
                    )?;
                }

                tx.execute(
                    "UPDATE generations SET completed_at = ?1 WHERE name = ?2",
                    params![now, generation],
                )?;

                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Number of snapshots stored under a generation.
    pub async fn count_snapshots(&self, generation: &str) -> Result<u64, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM snapshots WHERE generation = ?1",
                    params![generation],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_snapshot(url: &str) -> Snapshot {
        Snapshot::new(
            "GET",
            url,
            200,
            Some("text/html".to_string()),
            None,
            b"<html>ok</html>".to_vec(),
        )
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_generation("v1").await.unwrap();
        let snapshot = make_test_snapshot("http://localhost:8080/index.html");

        db.put_snapshot("v1", &snapshot).await.unwrap();

        let retrieved = db.match_snapshot("v1", &snapshot.key).await.unwrap().unwrap();
        assert_eq!(retrieved.url, snapshot.url);
        assert_eq!(retrieved.status, 200);
        assert_eq!(retrieved.body, snapshot.body);
    }

    #[tokio::test]
    async fn test_match_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_generation("v1").await.unwrap();
        let result = db.match_snapshot("v1", "nonexistent").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_put_requires_generation() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let snapshot = make_test_snapshot("http://localhost:8080/index.html");
        let result = db.put_snapshot("no-such-generation", &snapshot).await;
        assert!(matches!(result, Err(Error::GenerationMissing(_))));
    }

    #[tokio::test]
    async fn test_put_overwrites_not_duplicates() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_generation("v1").await.unwrap();

        let first = make_test_snapshot("http://localhost:8080/app.js");
        db.put_snapshot("v1", &first).await.unwrap();

        let mut second = make_test_snapshot("http://localhost:8080/app.js");
        second.body = b"console.log('updated')".to_vec();
        db.put_snapshot("v1", &second).await.unwrap();

        assert_eq!(db.count_snapshots("v1").await.unwrap(), 1);
        let stored = db.match_snapshot("v1", &second.key).await.unwrap().unwrap();
        assert_eq!(stored.body, second.body);
    }

    #[tokio::test]
    async fn test_store_all_marks_installed() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_generation("v1").await.unwrap();

        let snapshots = vec![
            make_test_snapshot("http://localhost:8080/index.html"),
            make_test_snapshot("http://localhost:8080/manifest.json"),
        ];
        db.store_all("v1", snapshots.clone()).await.unwrap();

        assert!(db.generation_installed("v1").await.unwrap());
        assert_eq!(db.count_snapshots("v1").await.unwrap(), 2);
        for snapshot in &snapshots {
            assert!(db.match_snapshot("v1", &snapshot.key).await.unwrap().is_some());
        }
    }

    #[tokio::test]
    async fn test_store_all_missing_generation_stores_nothing() {
        let db = CacheDb::open_in_memory().await.unwrap();

        let snapshots = vec![make_test_snapshot("http://localhost:8080/index.html")];
        let result = db.store_all("missing", snapshots).await;

        assert!(matches!(result, Err(Error::GenerationMissing(_))));
        assert_eq!(db.count_snapshots("missing").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_generation_cascades_to_snapshots() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_generation("v1").await.unwrap();
        db.put_snapshot("v1", &make_test_snapshot("http://localhost:8080/index.html"))
            .await
            .unwrap();

        db.delete_generation("v1").await.unwrap();
        assert_eq!(db.count_snapshots("v1").await.unwrap(), 0);
    }
}

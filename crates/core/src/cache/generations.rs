//! Cache generation lifecycle operations.
//!
//! A generation is a named collection of snapshots, created during install
//! under the current version tag and deleted wholesale during activation
//! once its tag is stale.

use super::connection::CacheDb;
use crate::Error;
use tokio_rusqlite::params;

impl CacheDb {
    /// Open a generation by name, creating it if absent.
    ///
    /// Opening an existing generation is a no-op; its snapshots and
    /// installation status are preserved.
    pub async fn open_generation(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// List all generation names, oldest first.
    pub async fn list_generations(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM generations ORDER BY created_at ASC")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a generation and all snapshots stored under it.
    ///
    /// Returns true if a generation row was deleted. The snapshots go with
    /// it via ON DELETE CASCADE.
    pub async fn delete_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM generations WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Whether a generation exists and has completed installation.
    ///
    /// A generation only claims completed installation status once a bulk
    /// precache has committed for it.
    pub async fn generation_installed(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let installed: bool = conn.query_row(
                    "SELECT EXISTS(
                        SELECT 1 FROM generations
                        WHERE name = ?1 AND completed_at IS NOT NULL
                    )",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(installed)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_generation_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_generation("app-shell-v1").await.unwrap();
        db.open_generation("app-shell-v1").await.unwrap();

        let names = db.list_generations().await.unwrap();
        assert_eq!(names, vec!["app-shell-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_list_generations_empty() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(db.list_generations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_generation() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_generation("app-shell-v1").await.unwrap();
        db.open_generation("app-shell-v2").await.unwrap();

        assert!(db.delete_generation("app-shell-v1").await.unwrap());
        assert!(!db.delete_generation("app-shell-v1").await.unwrap());

        let names = db.list_generations().await.unwrap();
        assert_eq!(names, vec!["app-shell-v2".to_string()]);
    }

    #[tokio::test]
    async fn test_fresh_generation_not_installed() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_generation("app-shell-v1").await.unwrap();
        assert!(!db.generation_installed("app-shell-v1").await.unwrap());
        assert!(!db.generation_installed("no-such-generation").await.unwrap());
    }
}

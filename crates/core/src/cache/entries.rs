//! Response entries within a named store.
//!
//! Provides lookup, insert, bulk insert, delete and listing of cached
//! responses keyed by request identity.

use super::connection::CacheDb;
use super::hash::request_key;
use crate::Error;
use crate::http::{Request, Response};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Request identity of a stored entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CacheKey {
    pub method: String,
    pub url: String,
}

/// Handle to one named store.
#[derive(Clone, Debug)]
pub struct CacheStore {
    db: CacheDb,
    name: String,
}

/// Owned row data moved onto the connection thread.
struct EntryRow {
    key_hash: String,
    method: String,
    url: String,
    status: u16,
    headers_json: String,
    body: Vec<u8>,
}

impl EntryRow {
    fn new(request: &Request, response: &Response) -> Result<Self, Error> {
        let headers_json = serde_json::to_string(&response.headers)
            .map_err(|e| Error::CorruptEntry(format!("failed to encode headers: {e}")))?;
        Ok(Self {
            key_hash: request_key(request),
            method: request.method().to_string(),
            url: request.url().to_string(),
            status: response.status,
            headers_json,
            body: response.body.to_vec(),
        })
    }
}

fn insert_row(conn: &rusqlite::Connection, store: &str, row: &EntryRow, stored_at: &str) -> Result<(), Error> {
    conn.execute(
        "INSERT INTO cache_entries (store, key_hash, method, url, status, headers_json, body, stored_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(store, key_hash) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status = excluded.status,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![store, row.key_hash, row.method, row.url, row.status, row.headers_json, row.body, stored_at],
    )?;
    Ok(())
}

fn store_exists(conn: &rusqlite::Connection, store: &str) -> Result<bool, Error> {
    Ok(conn.query_row("SELECT EXISTS(SELECT 1 FROM cache_stores WHERE name = ?1)", params![store], |row| row.get(0))?)
}

fn ensure_store(conn: &rusqlite::Connection, store: &str, now: &str) -> Result<(), Error> {
    conn.execute(
        "INSERT OR IGNORE INTO cache_stores (name, created_at) VALUES (?1, ?2)",
        params![store, now],
    )?;
    Ok(())
}

impl CacheStore {
    pub(crate) fn new(db: CacheDb, name: &str) -> Self {
        Self { db, name: name.to_string() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up the stored response for `request`.
    ///
    /// Returns None if the store or the entry doesn't exist.
    pub async fn match_request(&self, request: &Request) -> Result<Option<Response>, Error> {
        let store = self.name.clone();
        let key_hash = request_key(request);
        self.db
            .conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let mut stmt =
                    conn.prepare("SELECT status, headers_json, body FROM cache_entries WHERE store = ?1 AND key_hash = ?2")?;

                let result = stmt.query_row(params![store, key_hash], |row| {
                    Ok((row.get::<_, u16>(0)?, row.get::<_, String>(1)?, row.get::<_, Vec<u8>>(2)?))
                });

                match result {
                    Ok((status, headers_json, body)) => {
                        let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)
                            .map_err(|e| Error::CorruptEntry(format!("failed to decode headers: {e}")))?;
                        Ok(Some(Response::new(status, headers, body)))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Store `response` under `request`, replacing any previous entry.
    ///
    /// The store must exist: a store deleted by a sweep stays deleted, and a
    /// late write to it fails with `StoreMissing`.
    pub async fn put(&self, request: &Request, response: &Response) -> Result<(), Error> {
        let store = self.name.clone();
        let row = EntryRow::new(request, response)?;
        let now = chrono::Utc::now().to_rfc3339();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                if !store_exists(&tx, &store)? {
                    return Err(Error::StoreMissing(store));
                }
                insert_row(&tx, &store, &row, &now)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Store every pair in one transaction: either all entries land or none do.
    ///
    /// Creates the store if it does not exist yet.
    pub async fn put_all(&self, entries: &[(Request, Response)]) -> Result<usize, Error> {
        let store = self.name.clone();
        let rows = entries
            .iter()
            .map(|(req, resp)| EntryRow::new(req, resp))
            .collect::<Result<Vec<_>, _>>()?;
        let now = chrono::Utc::now().to_rfc3339();
        self.db
            .conn
            .call(move |conn| -> Result<usize, Error> {
                let tx = conn.transaction()?;
                ensure_store(&tx, &store, &now)?;
                for row in &rows {
                    insert_row(&tx, &store, row, &now)?;
                }
                tx.commit()?;
                Ok(rows.len())
            })
            .await
            .map_err(Error::from)
    }

    /// Remove the entry for `request`. Returns false if there was none.
    pub async fn delete(&self, request: &Request) -> Result<bool, Error> {
        let store = self.name.clone();
        let key_hash = request_key(request);
        self.db
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute(
                    "DELETE FROM cache_entries WHERE store = ?1 AND key_hash = ?2",
                    params![store, key_hash],
                )?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Request identities of all entries, in URL order.
    pub async fn keys(&self) -> Result<Vec<CacheKey>, Error> {
        let store = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<Vec<CacheKey>, Error> {
                let mut stmt =
                    conn.prepare("SELECT method, url FROM cache_entries WHERE store = ?1 ORDER BY url ASC, method ASC")?;
                let keys = stmt
                    .query_map(params![store], |row| Ok(CacheKey { method: row.get(0)?, url: row.get(1)? }))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in the store.
    pub async fn len(&self) -> Result<usize, Error> {
        let store = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<usize, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM cache_entries WHERE store = ?1", params![store], |row| {
                        row.get(0)
                    })?;
                Ok(count as usize)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len().await? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn get(path: &str) -> Request {
        Request::get(Url::parse("http://localhost:8080/").unwrap().join(path).unwrap())
    }

    fn html(body: &str) -> Response {
        Response::new(200, vec![("content-type".into(), "text/html".into())], body.to_string())
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("dxquiz-v1").await.unwrap();

        store.put(&get("index.html"), &html("<h1>Dx</h1>")).await.unwrap();

        let hit = store.match_request(&get("index.html")).await.unwrap().unwrap();
        assert_eq!(hit.status, 200);
        assert_eq!(hit.content_type(), Some("text/html"));
        assert_eq!(&hit.body[..], b"<h1>Dx</h1>");
        assert!(db.has_store("dxquiz-v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_match_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.store("dxquiz-v1");
        assert!(store.match_request(&get("index.html")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("dxquiz-v1").await.unwrap();

        store.put(&get("game.js"), &html("old")).await.unwrap();
        store.put(&get("game.js"), &html("new")).await.unwrap();

        let hit = store.match_request(&get("game.js")).await.unwrap().unwrap();
        assert_eq!(&hit.body[..], b"new");
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_stores_are_isolated() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_store("dxquiz-v1").await.unwrap().put(&get("index.html"), &html("v1")).await.unwrap();

        let other = db.store("dxquiz-v2");
        assert!(other.match_request(&get("index.html")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_all_and_keys() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("dxquiz-v1").await.unwrap();
        let entries = vec![(get("index.html"), html("index")), (get("styles.css"), html("css"))];

        assert_eq!(store.put_all(&entries).await.unwrap(), 2);

        let keys = store.keys().await.unwrap();
        assert_eq!(
            keys,
            vec![
                CacheKey { method: "GET".into(), url: "http://localhost:8080/index.html".into() },
                CacheKey { method: "GET".into(), url: "http://localhost:8080/styles.css".into() },
            ]
        );
    }

    #[tokio::test]
    async fn test_delete_entry() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("dxquiz-v1").await.unwrap();
        store.put(&get("index.html"), &html("index")).await.unwrap();

        assert!(store.delete(&get("index.html")).await.unwrap());
        assert!(!store.delete(&get("index.html")).await.unwrap());
        assert!(store.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_store_cascades_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("dxquiz-v1").await.unwrap();
        store.put(&get("index.html"), &html("index")).await.unwrap();

        db.delete_store("dxquiz-v1").await.unwrap();

        assert!(store.match_request(&get("index.html")).await.unwrap().is_none());
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_binary_body_round_trips_exactly() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("dxquiz-v1").await.unwrap();
        let png = Response::new(200, vec![("content-type".into(), "image/png".into())], vec![0x89u8, b'P', b'N', b'G', 0, 255]);

        store.put(&get("img/heart.png"), &png).await.unwrap();

        let hit = store.match_request(&get("img/heart.png")).await.unwrap().unwrap();
        assert_eq!(hit, png);
    }

    #[tokio::test]
    async fn test_put_does_not_recreate_deleted_store() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("dxquiz-v1").await.unwrap();
        store.put(&get("index.html"), &html("index")).await.unwrap();
        db.delete_store("dxquiz-v1").await.unwrap();

        let result = store.put(&get("img/heart.png"), &html("late")).await;

        assert!(matches!(result, Err(Error::StoreMissing(name)) if name == "dxquiz-v1"));
        assert!(!db.has_store("dxquiz-v1").await.unwrap());
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_put_all_creates_store() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.store("dxquiz-v1");

        store.put_all(&[(get("index.html"), html("index"))]).await.unwrap();

        assert!(db.has_store("dxquiz-v1").await.unwrap());
        assert_eq!(store.len().await.unwrap(), 1);
    }
}

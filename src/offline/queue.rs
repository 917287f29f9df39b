//! Durable storage for requests made while the API cannot be reached.

use std::{path::Path, sync::Mutex};

use rusqlite::{Connection, OptionalExtension, Row, types::Type};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    Error,
    db::{lock_connection, sql_text_enum},
};

/// The HTTP methods the API client uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Read a resource.
    Get,
    /// Create a resource.
    Post,
    /// Replace a resource.
    Put,
    /// Remove a resource.
    Delete,
}

sql_text_enum!(Method {
    Get => "GET",
    Post => "POST",
    Put => "PUT",
    Delete => "DELETE",
});

impl Method {
    /// Whether requests with this method change data on the server.
    pub fn is_write(&self) -> bool {
        !matches!(self, Method::Get)
    }

    /// The equivalent method for the HTTP client.
    pub fn as_http(&self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A write request waiting to be sent to the API.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedRequest {
    /// The position of the request in the queue.
    pub id: i64,
    /// Sent as the idempotency key so the server applies the request at most once.
    pub request_id: Uuid,
    /// The HTTP method.
    pub method: Method,
    /// The API path, e.g. `/api/transactions`.
    pub endpoint: String,
    /// The JSON body, if any.
    pub payload: Option<Value>,
    /// When the request was queued.
    pub created_at: OffsetDateTime,
}

/// A local SQLite database with the queue of pending requests and the last
/// known responses to read requests.
#[derive(Debug)]
pub struct OfflineStore {
    connection: Mutex<Connection>,
}

impl OfflineStore {
    /// Open the store in the SQLite database at `path`, creating it if needed.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or the tables cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Open a store that lives only as long as the returned value.
    ///
    /// # Errors
    /// Returns an error if the tables cannot be created.
    pub fn open_in_memory() -> Result<Self, Error> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> Result<Self, Error> {
        create_offline_tables(&connection)?;

        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    /// Add a write request to the end of the queue with a new request ID.
    ///
    /// # Errors
    /// Returns [Error::Validation] for `GET` requests, they are never queued.
    pub fn enqueue(
        &self,
        method: Method,
        endpoint: &str,
        payload: Option<Value>,
    ) -> Result<QueuedRequest, Error> {
        self.enqueue_with_request_id(method, endpoint, payload, Uuid::new_v4())
    }

    /// Add a write request to the end of the queue.
    ///
    /// Use this over [OfflineStore::enqueue] when the request may already have reached the
    /// server under `request_id`, so that replaying it is not applied twice.
    ///
    /// # Errors
    /// Returns [Error::Validation] for `GET` requests, they are never queued.
    pub fn enqueue_with_request_id(
        &self,
        method: Method,
        endpoint: &str,
        payload: Option<Value>,
        request_id: Uuid,
    ) -> Result<QueuedRequest, Error> {
        if !method.is_write() {
            return Err(Error::Validation(format!(
                "{} requests cannot be queued",
                method.as_str()
            )));
        }

        let payload_text = payload.as_ref().map(serde_json::to_string).transpose()?;
        let connection = lock_connection(&self.connection)?;

        connection
            .prepare(
                "INSERT INTO pending_request (request_id, method, endpoint, payload, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5) \
                 RETURNING id, request_id, method, endpoint, payload, created_at",
            )?
            .query_row(
                (
                    request_id.to_string(),
                    method,
                    endpoint,
                    payload_text,
                    OffsetDateTime::now_utc(),
                ),
                map_queued_request_row,
            )
            .map_err(Error::from)
    }

    /// The queued requests, oldest first.
    pub fn pending(&self) -> Result<Vec<QueuedRequest>, Error> {
        let connection = lock_connection(&self.connection)?;

        connection
            .prepare(
                "SELECT id, request_id, method, endpoint, payload, created_at \
                 FROM pending_request ORDER BY id ASC",
            )?
            .query_map([], map_queued_request_row)?
            .map(|maybe_request| maybe_request.map_err(Error::from))
            .collect()
    }

    /// Remove a request from the queue.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if no queued request has the ID `id`.
    pub fn remove(&self, id: i64) -> Result<(), Error> {
        let connection = lock_connection(&self.connection)?;
        let rows_affected = connection.execute("DELETE FROM pending_request WHERE id = ?1", [id])?;

        if rows_affected == 0 {
            return Err(Error::NotFound);
        }

        Ok(())
    }

    /// The number of queued requests.
    pub fn count(&self) -> Result<usize, Error> {
        let connection = lock_connection(&self.connection)?;

        connection
            .query_row("SELECT COUNT(*) FROM pending_request", [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|count| count as usize)
            .map_err(Error::from)
    }

    /// Keep `body` as the latest known response for `endpoint`.
    pub fn cache_response(&self, endpoint: &str, body: &Value) -> Result<(), Error> {
        let body = serde_json::to_string(body)?;
        let connection = lock_connection(&self.connection)?;

        connection.execute(
            "INSERT INTO offline_data (endpoint, body, updated_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT (endpoint) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
            (endpoint, body, OffsetDateTime::now_utc()),
        )?;

        Ok(())
    }

    /// The latest known response for `endpoint`, if there is one.
    pub fn cached_response(&self, endpoint: &str) -> Result<Option<Value>, Error> {
        let body: Option<String> = {
            let connection = lock_connection(&self.connection)?;
            connection
                .query_row(
                    "SELECT body FROM offline_data WHERE endpoint = ?1",
                    [endpoint],
                    |row| row.get(0),
                )
                .optional()?
        };

        body.map(|body| serde_json::from_str(&body).map_err(Error::from))
            .transpose()
    }
}

fn create_offline_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS pending_request (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            request_id TEXT NOT NULL UNIQUE,
            method TEXT NOT NULL,
            endpoint TEXT NOT NULL,
            payload TEXT,
            created_at TEXT NOT NULL
        )",
        (),
    )?;

    connection.execute(
        "CREATE TABLE IF NOT EXISTS offline_data (
            endpoint TEXT PRIMARY KEY,
            body TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

fn map_queued_request_row(row: &Row) -> Result<QueuedRequest, rusqlite::Error> {
    let request_id: String = row.get(1)?;
    let request_id = Uuid::parse_str(&request_id)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(error)))?;

    let payload: Option<String> = row.get(4)?;
    let payload = payload
        .map(|text| serde_json::from_str(&text))
        .transpose()
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(error)))?;

    Ok(QueuedRequest {
        id: row.get(0)?,
        request_id,
        method: row.get(2)?,
        endpoint: row.get(3)?,
        payload,
        created_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use uuid::Uuid;

    use crate::Error;

    use super::{Method, OfflineStore};

    #[test]
    fn enqueue_keeps_order_and_payload() {
        let store = OfflineStore::open_in_memory().unwrap();

        let first = store
            .enqueue(Method::Post, "/api/accounts", Some(json!({ "name": "Giro" })))
            .unwrap();
        let second = store
            .enqueue(Method::Delete, "/api/goals/3", None)
            .unwrap();

        let pending = store.pending().unwrap();
        assert_eq!(pending, vec![first.clone(), second]);
        assert_eq!(first.payload, Some(json!({ "name": "Giro" })));
        assert_eq!(pending[1].payload, None);
    }

    #[test]
    fn each_entry_gets_a_fresh_request_id() {
        let store = OfflineStore::open_in_memory().unwrap();

        let first = store.enqueue(Method::Post, "/api/goals", None).unwrap();
        let second = store.enqueue(Method::Post, "/api/goals", None).unwrap();

        assert_ne!(first.request_id, second.request_id);
    }

    #[test]
    fn explicit_request_id_is_kept() {
        let store = OfflineStore::open_in_memory().unwrap();
        let request_id = Uuid::new_v4();

        let queued = store
            .enqueue_with_request_id(Method::Put, "/api/goals/1", None, request_id)
            .unwrap();

        assert_eq!(queued.request_id, request_id);
    }

    #[test]
    fn get_requests_are_rejected() {
        let store = OfflineStore::open_in_memory().unwrap();

        let result = store.enqueue(Method::Get, "/api/accounts", None);

        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn remove_deletes_entry() {
        let store = OfflineStore::open_in_memory().unwrap();
        let queued = store.enqueue(Method::Post, "/api/goals", None).unwrap();

        store.remove(queued.id).unwrap();

        assert_eq!(store.count().unwrap(), 0);
        assert_eq!(store.remove(queued.id), Err(Error::NotFound));
    }

    #[test]
    fn cached_response_is_replaced() {
        let store = OfflineStore::open_in_memory().unwrap();

        assert_eq!(store.cached_response("/api/accounts").unwrap(), None);

        store.cache_response("/api/accounts", &json!([1])).unwrap();
        store.cache_response("/api/accounts", &json!([1, 2])).unwrap();

        assert_eq!(
            store.cached_response("/api/accounts").unwrap(),
            Some(json!([1, 2]))
        );
    }

    #[test]
    fn queue_survives_reopening_file() {
        let path = std::env::temp_dir().join(format!("offline-queue-{}.db", Uuid::new_v4()));

        let queued = {
            let store = OfflineStore::open(&path).unwrap();
            store.enqueue(Method::Post, "/api/goals", None).unwrap()
        };

        let store = OfflineStore::open(&path).unwrap();
        assert_eq!(store.pending().unwrap(), vec![queued]);

        drop(store);
        let _ = std::fs::remove_file(&path);
    }
}

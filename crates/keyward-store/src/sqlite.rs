//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend for keyward. It uses rusqlite with
//! bundled SQLite, wrapped in async via tokio::spawn_blocking.
//!
//! Identities live twice: as a canonical CBOR blob on the `acl` row (for
//! decoding) and exploded into `acl_attrs` (for predicate lookups). Result
//! ordering by resource portion happens after decoding, since it depends on
//! which attribute names belong to the entity.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use keyward_core::{Identity, IdentityKey, Level, PermissionRecord, Predicate, Scalar};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{BulkWriteResult, Query, Store, WriteOp};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Unavailable(format!("mutex poisoned: {}", e)))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("spawn_blocking failed: {}", e)))?
    }
}

/// SQL value for a scalar attribute.
fn scalar_value(scalar: &Scalar) -> Value {
    match scalar {
        Scalar::Null => Value::Null,
        Scalar::Bool(b) => Value::Integer(i64::from(*b)),
        Scalar::Int(i) => Value::Integer(*i),
        Scalar::Text(s) => Value::Text(s.clone()),
    }
}

/// Compile predicates into a WHERE clause and its bound parameters.
fn where_clause(predicates: &[Predicate]) -> (String, Vec<Value>) {
    let mut clauses = Vec::with_capacity(predicates.len());
    let mut values = Vec::new();

    for predicate in predicates {
        match predicate {
            Predicate::Equals { key, value } => {
                clauses.push(
                    "EXISTS (SELECT 1 FROM acl_attrs a WHERE a.identity_key = acl.identity_key \
                     AND a.name = ? AND a.kind = ? AND a.value IS ?)",
                );
                values.push(Value::Text(key.clone()));
                values.push(Value::Integer(i64::from(value.kind())));
                values.push(scalar_value(value));
            }
            Predicate::Exists { key } => {
                clauses.push(
                    "EXISTS (SELECT 1 FROM acl_attrs a WHERE a.identity_key = acl.identity_key \
                     AND a.name = ?)",
                );
                values.push(Value::Text(key.clone()));
            }
            Predicate::LevelAtLeast(level) => {
                clauses.push("acl.level >= ?");
                values.push(Value::Integer(level.value()));
            }
            Predicate::LevelAtMost(level) => {
                clauses.push("acl.level <= ?");
                values.push(Value::Integer(level.value()));
            }
        }
    }

    if clauses.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), values)
    }
}

/// Raw row before the identity blob is decoded.
type RawRow = (Vec<u8>, i64, i64, i64);

fn decode_row((identity, level, created_at, modified_at): RawRow) -> Result<PermissionRecord> {
    Ok(PermissionRecord {
        id: Identity::from_canonical_bytes(&identity)?,
        level: Level(level),
        created_at,
        modified_at,
    })
}

fn select_records(conn: &Connection, predicates: &[Predicate], limit: Option<usize>) -> Result<Vec<RawRow>> {
    let (clause, values) = where_clause(predicates);
    let mut sql = format!(
        "SELECT identity, level, created_at, modified_at FROM acl{} ORDER BY identity_key",
        clause
    );
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(values), |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?
        .collect::<std::result::Result<Vec<RawRow>, _>>()?;
    Ok(rows)
}

fn delete_key(conn: &Connection, key: &IdentityKey) -> Result<bool> {
    conn.execute(
        "DELETE FROM acl_attrs WHERE identity_key = ?1",
        params![key.as_bytes().as_slice()],
    )?;
    let removed = conn.execute(
        "DELETE FROM acl WHERE identity_key = ?1",
        params![key.as_bytes().as_slice()],
    )?;
    Ok(removed > 0)
}

/// Apply one write op, updating the running result.
fn apply_op(conn: &Connection, op: &WriteOp, result: &mut BulkWriteResult) -> Result<()> {
    let key = op.identity().key()?;

    match op {
        WriteOp::Upsert { id, level, now } => {
            if !level.is_storable() {
                return Err(StoreError::InvalidData(format!(
                    "refusing to store negative level {}",
                    level
                )));
            }

            let exists = conn
                .query_row(
                    "SELECT 1 FROM acl WHERE identity_key = ?1",
                    params![key.as_bytes().as_slice()],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();

            if exists {
                conn.execute(
                    "UPDATE acl SET level = ?2, modified_at = MAX(created_at, ?3) WHERE identity_key = ?1",
                    params![key.as_bytes().as_slice(), level.value(), now],
                )?;
                result.updated += 1;
            } else {
                conn.execute(
                    "INSERT INTO acl (identity_key, identity, level, created_at, modified_at)
                     VALUES (?1, ?2, ?3, ?4, ?4)",
                    params![
                        key.as_bytes().as_slice(),
                        id.canonical_bytes()?,
                        level.value(),
                        now
                    ],
                )?;
                for (name, value) in id.iter() {
                    conn.execute(
                        "INSERT INTO acl_attrs (identity_key, name, kind, value) VALUES (?1, ?2, ?3, ?4)",
                        params![
                            key.as_bytes().as_slice(),
                            name,
                            value.kind(),
                            scalar_value(value)
                        ],
                    )?;
                }
                result.inserted += 1;
            }
        }
        WriteOp::Delete { .. } => {
            if delete_key(conn, &key)? {
                result.deleted += 1;
            }
        }
    }

    Ok(())
}

#[async_trait]
impl Store for SqliteStore {
    async fn find_one(&self, predicates: &[Predicate]) -> Result<Option<PermissionRecord>> {
        let predicates = predicates.to_vec();
        let rows = self
            .run(move |conn| select_records(conn, &predicates, Some(1)))
            .await?;
        rows.into_iter().next().map(decode_row).transpose()
    }

    async fn find(&self, query: &Query) -> Result<Vec<PermissionRecord>> {
        let predicates = query.predicates.clone();
        let rows = self
            .run(move |conn| select_records(conn, &predicates, None))
            .await?;

        let mut records = rows
            .into_iter()
            .map(decode_row)
            .collect::<Result<Vec<_>>>()?;
        query.sort.apply(&mut records);
        Ok(records)
    }

    async fn bulk_write(&self, ops: Vec<WriteOp>) -> Result<BulkWriteResult> {
        self.run(move |conn| {
            let mut tx = conn.transaction()?;
            let mut result = BulkWriteResult::default();

            for (index, op) in ops.iter().enumerate() {
                // Each op runs in its own savepoint so a failure leaves no half-written rows.
                let outcome = {
                    let sp = tx.savepoint()?;
                    let applied = apply_op(&sp, op, &mut result);
                    match applied {
                        Ok(()) => sp.commit().map_err(StoreError::from),
                        Err(e) => Err(e),
                    }
                };

                if let Err(e) = outcome {
                    tx.commit()?;
                    tracing::warn!("bulk write stopped at op {}: {}", index, e);
                    return Err(StoreError::BulkWrite {
                        index,
                        committed: index,
                        message: e.to_string(),
                    });
                }
            }

            tx.commit()?;
            tracing::debug!(
                inserted = result.inserted,
                updated = result.updated,
                deleted = result.deleted,
                "bulk write applied"
            );
            Ok(result)
        })
        .await
    }

    async fn delete_one(&self, id: &Identity) -> Result<bool> {
        let key = id.key()?;
        self.run(move |conn| {
            let tx = conn.transaction()?;
            let removed = delete_key(&tx, &key)?;
            tx.commit()?;
            Ok(removed)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use keyward_core::Descriptor;

    use crate::traits::Sort;

    fn id(account: &str, resource: Descriptor) -> Identity {
        Identity::merge(&Descriptor::single("account", account), &resource)
    }

    fn doc(name: &str) -> Descriptor {
        Descriptor::single("doc", name)
    }

    #[tokio::test]
    async fn test_upsert_and_find_one() {
        let store = SqliteStore::open_memory().unwrap();

        let result = store
            .bulk_write(vec![WriteOp::upsert(id("a1", doc("d1")), Level::WRITE, 1000)])
            .await
            .unwrap();
        assert_eq!(result.inserted, 1);

        let found = store
            .find_one(&[Predicate::equals("account", "a1"), Predicate::equals("doc", "d1")])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.level, Level::WRITE);
        assert_eq!(found.id, id("a1", doc("d1")));
        assert_eq!(found.created_at, 1000);
    }

    #[tokio::test]
    async fn test_upsert_preserves_created_at() {
        let store = SqliteStore::open_memory().unwrap();
        store
            .bulk_write(vec![WriteOp::upsert(id("a1", doc("d1")), Level::READ, 1000)])
            .await
            .unwrap();
        let result = store
            .bulk_write(vec![WriteOp::upsert(id("a1", doc("d1")), Level::OWNER, 3000)])
            .await
            .unwrap();
        assert_eq!(result.updated, 1);

        let records = store.find(&Query::default()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level, Level::OWNER);
        assert_eq!(records[0].created_at, 1000);
        assert_eq!(records[0].modified_at, 3000);
    }

    #[tokio::test]
    async fn test_typed_attribute_matching() {
        let store = SqliteStore::open_memory().unwrap();
        store
            .bulk_write(vec![
                WriteOp::upsert(id("a1", Descriptor::single("doc", 1i64)), Level::READ, 1),
                WriteOp::upsert(id("a1", Descriptor::single("doc", true)), Level::WRITE, 1),
                WriteOp::upsert(id("a1", Descriptor::single("doc", Scalar::Null)), Level::OWNER, 1),
            ])
            .await
            .unwrap();

        let by_int = store.find_one(&[Predicate::equals("doc", 1i64)]).await.unwrap();
        assert_eq!(by_int.map(|r| r.level), Some(Level::READ));

        let by_bool = store.find_one(&[Predicate::equals("doc", true)]).await.unwrap();
        assert_eq!(by_bool.map(|r| r.level), Some(Level::WRITE));

        let by_null = store
            .find_one(&[Predicate::equals("doc", Scalar::Null)])
            .await
            .unwrap();
        assert_eq!(by_null.map(|r| r.level), Some(Level::OWNER));

        let by_text = store.find_one(&[Predicate::equals("doc", "1")]).await.unwrap();
        assert!(by_text.is_none());
    }

    #[tokio::test]
    async fn test_find_with_level_and_exists() {
        let store = SqliteStore::open_memory().unwrap();
        store
            .bulk_write(vec![
                WriteOp::upsert(id("a1", doc("c")), Level::NONE, 1),
                WriteOp::upsert(id("a1", doc("a")), Level::WRITE, 1),
                WriteOp::upsert(id("a1", doc("b")), Level::OWNER, 1),
                WriteOp::upsert(id("a1", Descriptor::single("group", "g")), Level::OWNER, 1),
                WriteOp::upsert(id("a2", doc("z")), Level::OWNER, 1),
            ])
            .await
            .unwrap();

        let query = Query::new(vec![
            Predicate::equals("account", "a1"),
            Predicate::exists("doc"),
            Predicate::LevelAtLeast(Level::WRITE),
        ])
        .sorted(Sort::ResourceAscending {
            entity_keys: BTreeSet::from(["account".to_string()]),
        });

        let records = store.find(&query).await.unwrap();
        let docs: Vec<_> = records.iter().map(|r| r.id.get("doc").cloned()).collect();
        assert_eq!(docs, vec![Some(Scalar::from("a")), Some(Scalar::from("b"))]);
    }

    #[tokio::test]
    async fn test_bulk_write_failure_commits_prefix() {
        let store = SqliteStore::open_memory().unwrap();
        let err = store
            .bulk_write(vec![
                WriteOp::upsert(id("a1", doc("d1")), Level::READ, 1),
                WriteOp::upsert(id("a1", doc("d2")), Level(-3), 1),
                WriteOp::upsert(id("a1", doc("d3")), Level::READ, 1),
            ])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StoreError::BulkWrite {
                index: 1,
                committed: 1,
                ..
            }
        ));

        let records = store.find(&Query::default()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, id("a1", doc("d1")));
    }

    #[tokio::test]
    async fn test_delete_one_and_batch_delete() {
        let store = SqliteStore::open_memory().unwrap();
        store
            .bulk_write(vec![
                WriteOp::upsert(id("a1", doc("d1")), Level::READ, 1),
                WriteOp::upsert(id("a1", doc("d2")), Level::READ, 1),
            ])
            .await
            .unwrap();

        assert!(store.delete_one(&id("a1", doc("d1"))).await.unwrap());
        assert!(!store.delete_one(&id("a1", doc("d1"))).await.unwrap());

        let result = store
            .bulk_write(vec![WriteOp::delete(id("a1", doc("d2")))])
            .await
            .unwrap();
        assert_eq!(result.deleted, 1);

        // Attribute rows go with the record.
        let found = store.find_one(&[Predicate::exists("doc")]).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_reopen_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("acl.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .bulk_write(vec![WriteOp::upsert(id("a1", doc("d1")), Level::OWNER, 7)])
                .await
                .unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let found = store
            .find_one(&[Predicate::equals("account", "a1")])
            .await
            .unwrap();
        assert_eq!(found.map(|r| r.level), Some(Level::OWNER));
    }

    fn op_strategy() -> impl proptest::strategy::Strategy<Value = WriteOp> {
        use proptest::prelude::*;

        (0u8..3, 0u8..4, -1i64..=3, 0i64..100).prop_map(|(account, resource, level, now)| {
            let id = id(&format!("a{}", account), doc(&format!("d{}", resource)));
            if level < 0 {
                WriteOp::delete(id)
            } else {
                WriteOp::upsert(id, Level(level), now)
            }
        })
    }

    proptest::proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn test_backends_agree_on_op_sequence(
            batches in proptest::collection::vec(proptest::collection::vec(op_strategy(), 0..6), 1..5)
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let memory = crate::memory::MemoryStore::new();
                let sqlite = SqliteStore::open_memory().unwrap();

                for batch in batches {
                    let m = memory.bulk_write(batch.clone()).await.unwrap();
                    let s = sqlite.bulk_write(batch).await.unwrap();
                    assert_eq!(m, s);
                }

                let mut expected = memory.snapshot().unwrap();
                let mut actual = sqlite.find(&Query::default()).await.unwrap();
                expected.sort_by(|a, b| a.id.cmp(&b.id));
                actual.sort_by(|a, b| a.id.cmp(&b.id));
                assert_eq!(actual, expected);
                assert!(actual.iter().all(|r| r.created_at <= r.modified_at));
            });
        }
    }
}

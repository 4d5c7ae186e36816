//! Whole-table snapshot cache.
//!
//! The cache holds the full contents of every registered table as of the
//! last (re)build. It is not kept in step with writes made through the
//! [`Executor`]; callers that need fresh data after a mutation call
//! [`TableCache::refresh`].
//!
//! Rebuilds assemble a complete new snapshot before swapping it in under a
//! write lock, so concurrent readers observe either the previous snapshot or
//! the new one and never a partially loaded table.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{info, warn};

use crate::error::{DbError, Result};
use crate::record::Record;
use crate::sqlite::Executor;

type Loader = fn(&Executor, &str) -> Result<CacheEntry>;

struct Registration {
    table: &'static str,
    type_name: &'static str,
    load: Loader,
}

/// The closed set of record types the cache loads.
#[derive(Default)]
pub struct TableRegistry {
    registrations: Vec<Registration>,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Record>(mut self) -> Self {
        self.registrations.push(Registration {
            table: T::TABLE_NAME,
            type_name: type_name::<T>(),
            load: load_table::<T>,
        });
        self
    }

    /// Table names of the registered types, in registration order.
    pub fn tables(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.registrations.iter().map(|r| r.table)
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

fn load_table<T: Record>(executor: &Executor, table: &str) -> Result<CacheEntry> {
    let records: Vec<T> = executor.get_all(table)?;
    Ok(CacheEntry {
        type_name: type_name::<T>(),
        len: records.len(),
        records: Arc::new(records),
    })
}

/// One table's rows, type-erased; `records` always holds a `Vec<T>` for the
/// type named by `type_name`.
#[derive(Clone)]
struct CacheEntry {
    type_name: &'static str,
    len: usize,
    records: Arc<dyn Any + Send + Sync>,
}

type Snapshot = Arc<HashMap<String, CacheEntry>>;

pub struct TableCache {
    registry: TableRegistry,
    // None until the first successful populate
    snapshot: RwLock<Option<Snapshot>>,
}

impl TableCache {
    pub fn new(registry: TableRegistry) -> Self {
        Self {
            registry,
            snapshot: RwLock::new(None),
        }
    }

    pub fn registry(&self) -> &TableRegistry {
        &self.registry
    }

    /// Loads every registered table and replaces the cached snapshot.
    ///
    /// Types with an empty table name are skipped. The first table that
    /// fails to load aborts the whole build and the previous snapshot stays
    /// in place.
    pub fn populate(&self, executor: &Executor) -> Result<()> {
        let mut tables = HashMap::with_capacity(self.registry.len());

        for registration in &self.registry.registrations {
            if registration.table.is_empty() {
                warn!(
                    record = registration.type_name,
                    "record type has no table name, not caching"
                );
                continue;
            }
            let entry = (registration.load)(executor, registration.table)?;
            tables.insert(registration.table.to_string(), entry);
        }

        let rows: usize = tables.values().map(|e| e.len).sum();
        info!(tables = tables.len(), rows, "cached {} tables with {} entries", tables.len(), rows);

        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(tables));
        Ok(())
    }

    /// Discards the cached snapshot in favour of a freshly loaded one.
    pub fn refresh(&self, executor: &Executor) -> Result<()> {
        self.populate(executor)
    }

    /// Cached rows of `table` as `T`.
    ///
    /// Returns `Ok(None)` when the table is not cached and
    /// [`DbError::CacheTypeMismatch`] when it was cached as another type.
    pub fn get<T: Record>(&self, table: &str) -> Result<Option<Arc<Vec<T>>>> {
        let entry = self
            .current()
            .and_then(|snapshot| snapshot.get(table).cloned());

        let Some(entry) = entry else {
            warn!(table, "table not found in cache");
            return Ok(None);
        };

        entry
            .records
            .downcast::<Vec<T>>()
            .map(Some)
            .map_err(|_| DbError::CacheTypeMismatch {
                table: table.to_string(),
                expected: type_name::<T>(),
            })
    }

    pub fn is_populated(&self) -> bool {
        self.current().is_some()
    }

    /// Cached table names, sorted.
    pub fn tables(&self) -> Vec<String> {
        let mut tables: Vec<_> = self
            .current()
            .map(|snapshot| snapshot.keys().cloned().collect())
            .unwrap_or_default();
        tables.sort();
        tables
    }

    pub fn table_count(&self) -> usize {
        self.current().map_or(0, |snapshot| snapshot.len())
    }

    /// Total number of cached rows across all tables.
    pub fn row_count(&self) -> usize {
        self.current()
            .map_or(0, |snapshot| snapshot.values().map(|e| e.len).sum())
    }

    /// Name of the record type `table` was cached as.
    pub fn cached_type(&self, table: &str) -> Option<&'static str> {
        self.current()
            .and_then(|snapshot| snapshot.get(table).map(|e| e.type_name))
    }

    fn current(&self) -> Option<Snapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

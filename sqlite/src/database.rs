use std::path::Path;
use std::sync::Arc;

use relq_core::query::write;
use relq_core::{
    Compiler, Config, Dialect, Hub, Model, Operation, Query, QueryError, QueryHandle, Registry,
    SelectBuilder, Topic, Value, Where,
};
use rusqlite::Connection;

use crate::error::{Result, SqliteError};
use crate::preload::{fetch, query, strip};
use crate::values::JsonParam;

/// One result row, column name → value, with eager-loads attached by relation name.
pub type Record = serde_json::Map<String, Value>;

/// Runs compiled query descriptions against a SQLite connection.
#[derive(Debug)]
pub struct Database {
    conn: Option<Connection>,
    registry: Arc<Registry>,
    table_prefix: String,
    hub: Option<Arc<Hub>>,
}

impl Database {
    pub fn new(conn: Connection, registry: Arc<Registry>) -> Self {
        Self {
            conn: Some(conn),
            registry,
            table_prefix: String::new(),
            hub: None,
        }
    }

    /// Opens (or creates) a database file
    pub fn open(path: impl AsRef<Path>, registry: Arc<Registry>) -> Result<Self> {
        Ok(Self::new(Connection::open(path)?, registry))
    }

    pub fn open_in_memory(registry: Arc<Registry>) -> Result<Self> {
        Ok(Self::new(Connection::open_in_memory()?, registry))
    }

    /// Uses the registry and table prefix declared in `config`
    pub fn from_config(conn: Connection, config: &Config) -> Self {
        Self::new(conn, Arc::new(config.registry())).with_table_prefix(config.table_prefix.clone())
    }

    /// Opens a database file using the registry and table prefix declared in `config`
    pub fn open_with_config(path: impl AsRef<Path>, config: &Config) -> Result<Self> {
        Ok(Self::from_config(Connection::open(path)?, config))
    }

    pub fn with_table_prefix(mut self, table_prefix: impl Into<String>) -> Self {
        self.table_prefix = table_prefix.into();
        self
    }

    /// Publishes `<entity>:<operation>` events for reads and writes to `hub`
    pub fn with_hub(mut self, hub: Arc<Hub>) -> Self {
        self.hub = Some(hub);
        self
    }

    /// Closes the connection. Later calls fail with [`QueryError::NilConnection`].
    pub fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, e)| e)?;
        }
        Ok(())
    }

    /// Gets a reference to the underlying connection
    pub fn connection(&self) -> Result<&Connection> {
        self.conn
            .as_ref()
            .ok_or(SqliteError::Query(QueryError::NilConnection))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn compiler(&self) -> Compiler<'_> {
        Compiler::new(&self.registry).with_table_prefix(&self.table_prefix)
    }

    /// Runs a batch of statements, e.g. a schema bootstrap
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.connection()?.execute_batch(sql)?;
        Ok(())
    }

    /// Compiles `query` for `entity` into a SQLite statement builder.
    pub fn prepare(&self, entity: &str, query: &Query) -> Result<SelectBuilder> {
        let compiler = self.compiler();
        let handle = self
            .conn
            .as_ref()
            .map(|_| SelectBuilder::new(Dialect::SQLite, compiler.table_name(entity)));
        Ok(compiler.apply(query, entity, handle)?)
    }

    /// Rows of `entity` matching `query`, with eager-loads attached
    pub fn find(&self, entity: &str, query: &Query) -> Result<Vec<Record>> {
        let conn = self.connection()?;
        let handle = self.prepare(entity, query)?;
        let omitted = handle.omitted().to_vec();

        let mut records = fetch(conn, handle, &self.table_prefix)?;
        strip(&mut records, &omitted);
        Ok(records)
    }

    /// Like [`find`](Self::find) but decodes each row into `T`
    pub fn find_as<T: Model>(&self, query: &Query) -> Result<Vec<T>> {
        self.find(T::ENTITY, query)?
            .into_iter()
            .map(|record| serde_json::from_value(Value::Object(record)).map_err(SqliteError::from))
            .collect()
    }

    /// Number of rows matching `query`, ignoring ordering and pagination
    pub fn count(&self, entity: &str, query: &Query) -> Result<u64> {
        let conn = self.connection()?;
        let statement = self.prepare(entity, query)?.to_count_statement();
        relq_core::relq_trace_query!(&statement.sql, statement.params.len());

        let count: i64 = conn.query_row(
            &statement.sql,
            rusqlite::params_from_iter(statement.params.iter().map(JsonParam)),
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Runs [`find`](Self::find) and [`count`](Self::count) and publishes
    /// the rows on `<entity>:query`.
    pub fn find_and_count(&self, entity: &str, query: &Query) -> Result<(Vec<Record>, u64)> {
        let records = self.find(entity, query)?;
        let count = self.count(entity, query)?;
        self.publish(entity, Operation::Query, &records);
        Ok((records, count))
    }

    /// Deletes the rows of `entity` matching `filter` and returns them.
    ///
    /// Field paths are used as written (no table qualifier). An empty filter
    /// is refused rather than deleting every row. Publishes `<entity>:delete`.
    pub fn delete(&self, entity: &str, filter: &Where) -> Result<Vec<Record>> {
        let conn = self.connection()?;
        let condition = filter.compile("")?;

        let handle = SelectBuilder::new(Dialect::SQLite, self.compiler().table(entity)?)
            .filter(condition);
        let mut statement = handle
            .to_delete_statement()
            .ok_or_else(|| SqliteError::MissingWhereClause(entity.to_owned()))?;
        statement.sql.push_str(" RETURNING *");

        let records = query(conn, &statement)?;
        self.publish(entity, Operation::Delete, &records);
        Ok(records)
    }

    /// Inserts `records` into `entity` in one transaction and returns the stored rows.
    ///
    /// A failing record rolls the whole batch back and is reported as
    /// [`SqliteError::Record`] with its position. Publishes `<entity>:create`.
    pub fn create(&self, entity: &str, records: &[Record]) -> Result<Vec<Record>> {
        let table = self.compiler().table(entity)?;
        let created = self.write_batch(records, |conn, record| {
            let statement = write::insert(Dialect::SQLite, &table, record)?;
            Ok(returning(conn, statement)?.unwrap_or_else(|| record.clone()))
        })?;
        self.publish(entity, Operation::Create, &created);
        Ok(created)
    }

    /// Updates each record's row of `entity`, matched by its `key` column,
    /// in one transaction and returns the rows as stored.
    ///
    /// A record without `key`, or one that matches no row, rolls the batch
    /// back. Publishes `<entity>:update`.
    pub fn update(&self, entity: &str, key: &str, records: &[Record]) -> Result<Vec<Record>> {
        let table = self.compiler().table(entity)?;
        let updated = self.write_batch(records, |conn, record| {
            let statement = write::update(Dialect::SQLite, &table, key, record)?;
            returning(conn, statement)?.ok_or_else(|| SqliteError::NoMatchingRow {
                entity: entity.to_owned(),
                column: key.to_owned(),
                key: record.get(key).cloned().unwrap_or_default(),
            })
        })?;
        self.publish(entity, Operation::Update, &updated);
        Ok(updated)
    }

    fn write_batch<F>(&self, records: &[Record], mut write: F) -> Result<Vec<Record>>
    where
        F: FnMut(&Connection, &Record) -> Result<Record>,
    {
        let conn = self.connection()?;
        let tx = conn.unchecked_transaction()?;

        let mut stored = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            let row = write(&*tx, record).map_err(|source| SqliteError::Record {
                index,
                source: Box::new(source),
            })?;
            stored.push(row);
        }

        tx.commit()?;
        Ok(stored)
    }

    fn publish(&self, entity: &str, operation: Operation, records: &[Record]) {
        if let Some(hub) = &self.hub {
            let data = Value::Array(records.iter().cloned().map(Value::Object).collect());
            hub.publish(&Topic::new(entity, operation), data);
        }
    }
}

/// First row of `statement` with `RETURNING *` appended
fn returning(conn: &Connection, mut statement: relq_core::Statement) -> Result<Option<Record>> {
    statement.sql.push_str(" RETURNING *");
    Ok(query(conn, &statement)?.into_iter().next())
}

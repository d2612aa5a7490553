//! Single-table statement builder.
//!
//! [`TableSql`] renders the DDL and CRUD statements of one record type for one
//! dialect. It is pure: statements come back as SQL text plus bindings, ready to be
//! handed to whatever executes them.
//!
//! ```ignore
//! use recorm::{Dialect, TableSql};
//! use recorm::predicate::row;
//!
//! let sql = TableSql::for_record::<Item>(&Dialect::SQL_SERVER)?;
//! let stmt = sql.select_where(&row("Value").gt(2))?;
//! assert_eq!(stmt.sql, "SELECT [ID], [Key], [Value] FROM [Item] WHERE ([Value] > 2);");
//! ```

use crate::compile::{Binding, CompiledFragment, Compiler, DeferredParam};
use crate::config::SqlLogConfig;
use crate::dialect::{Dialect, InsertedRow};
use crate::error::{OrmError, OrmResult};
use crate::ident::Ident;
use crate::meta::{Column, TableMeta};
use crate::predicate::Predicate;
use crate::record::{FieldValues, Record};
use crate::value::Value;
use std::sync::Arc;

/// What a statement does; reported on the `recorm.sql` target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    CreateTable,
    DropTable,
    Select,
    Insert,
    Update,
    Delete,
    CreateDatabase,
    DropDatabase,
}

/// A complete SQL statement and its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    /// SQL text, terminated by `;`.
    pub sql: String,
    /// Placeholder values known at build time.
    pub bindings: Vec<Binding>,
    /// Placeholders the caller binds from its own values at execution time.
    pub deferred: Vec<DeferredParam>,
}

impl Statement {
    pub fn binding(&self, name: &str) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.name == name)
    }

    /// Whether every placeholder already has a value.
    pub fn is_fully_bound(&self) -> bool {
        self.deferred.is_empty()
    }
}

/// Statement builder for one table and one dialect.
#[derive(Debug, Clone)]
pub struct TableSql<'d> {
    meta: Arc<TableMeta>,
    dialect: &'d Dialect,
    log: SqlLogConfig,
}

impl<'d> TableSql<'d> {
    pub fn new(meta: Arc<TableMeta>, dialect: &'d Dialect) -> Self {
        Self {
            meta,
            dialect,
            log: SqlLogConfig::default(),
        }
    }

    /// Builder over `R`'s cached metadata.
    pub fn for_record<R: Record>(dialect: &'d Dialect) -> OrmResult<Self> {
        Ok(Self::new(R::meta()?, dialect))
    }

    pub fn with_log_config(mut self, log: SqlLogConfig) -> Self {
        self.log = log;
        self
    }

    pub fn meta(&self) -> &TableMeta {
        &self.meta
    }

    pub fn dialect(&self) -> &'d Dialect {
        self.dialect
    }

    // ==================== DDL ====================

    /// `CREATE TABLE`: identity column first with the dialect's identity syntax,
    /// then every other column with its handler's storage type.
    pub fn create_table(&self) -> Statement {
        let identity = self.meta.identity();
        let mut lines = vec![format!(
            "{} {}{}",
            self.dialect.ident(identity.name()),
            identity.storage_type(self.dialect),
            self.dialect.identity_suffix
        )];
        lines.extend(self.meta.non_identity().map(|c| {
            format!(
                "{} {}",
                self.dialect.ident(c.name()),
                c.storage_type(self.dialect)
            )
        }));
        let sql = format!(
            "CREATE TABLE {} (\n    {}\n);",
            self.table(),
            lines.join(",\n    ")
        );
        self.finish(StatementKind::CreateTable, sql, Vec::new(), Vec::new())
    }

    pub fn drop_table(&self) -> Statement {
        let sql = format!("DROP TABLE {};", self.table());
        self.finish(StatementKind::DropTable, sql, Vec::new(), Vec::new())
    }

    /// Create the database `name` if the dialect hosts several databases per server.
    pub fn create_database(&self, name: &str) -> OrmResult<Statement> {
        let name = Ident::parse(name)?;
        let scripts = self.database_scripts("CREATE DATABASE")?;
        Ok(self.finish(
            StatementKind::CreateDatabase,
            (scripts.create)(&name),
            Vec::new(),
            Vec::new(),
        ))
    }

    /// Drop the database `name`, closing its open sessions first where the dialect
    /// requires it.
    pub fn drop_database(&self, name: &str) -> OrmResult<Statement> {
        let name = Ident::parse(name)?;
        let scripts = self.database_scripts("DROP DATABASE")?;
        Ok(self.finish(
            StatementKind::DropDatabase,
            (scripts.drop)(&name),
            Vec::new(),
            Vec::new(),
        ))
    }

    // ==================== SELECT ====================

    pub fn select_all(&self) -> Statement {
        let sql = format!("{};", self.select_prefix());
        self.finish(StatementKind::Select, sql, Vec::new(), Vec::new())
    }

    pub fn select_by_id(&self, id: i64) -> OrmResult<Statement> {
        let (clause, binding) = self.identity_clause(id)?;
        let sql = format!("{} {clause};", self.select_prefix());
        Ok(self.finish(StatementKind::Select, sql, vec![binding], Vec::new()))
    }

    pub fn select_where(&self, predicate: &Predicate) -> OrmResult<Statement> {
        let fragment = self.where_clause(predicate)?;
        Ok(self.filtered(StatementKind::Select, self.select_prefix(), fragment))
    }

    /// Like [`TableSql::select_where`], resolving `param.*` against `param`.
    pub fn select_where_with(
        &self,
        predicate: &Predicate,
        param: &dyn FieldValues,
    ) -> OrmResult<Statement> {
        let fragment = self.where_clause_with(predicate, param)?;
        Ok(self.filtered(StatementKind::Select, self.select_prefix(), fragment))
    }

    /// Rows equal to `example` on each of its non-default, non-identity fields.
    pub fn select_matching<R: Record>(&self, example: &R) -> OrmResult<Statement> {
        let predicate = Predicate::matching(example)?;
        self.select_where_with(&predicate, example)
    }

    // ==================== INSERT ====================

    /// `INSERT` with every non-identity column deferred, plus the dialect's way of
    /// returning the inserted row.
    pub fn insert_sql(&self) -> Statement {
        let deferred = self
            .meta
            .non_identity()
            .map(|c| DeferredParam {
                placeholder: c.name().to_string(),
                field: c.field().to_string(),
            })
            .collect();
        let sql = self.render_insert();
        self.finish(StatementKind::Insert, sql, Vec::new(), deferred)
    }

    /// `INSERT` bound to `record`'s values.
    pub fn insert(&self, record: &dyn FieldValues) -> OrmResult<Statement> {
        let bindings = self
            .meta
            .non_identity()
            .map(|c| self.bind_field(c, record))
            .collect::<OrmResult<Vec<_>>>()?;
        let sql = self.render_insert();
        Ok(self.finish(StatementKind::Insert, sql, bindings, Vec::new()))
    }

    fn render_insert(&self) -> String {
        let table = self.table();
        let columns: Vec<&Column> = self.meta.non_identity().collect();

        let mut sql = format!("INSERT INTO {table}");
        if !columns.is_empty() {
            sql.push_str(" (");
            sql.push_str(&self.column_list(columns.iter().copied()));
            sql.push(')');
        }
        if let InsertedRow::Output(clause) = self.dialect.inserted_row {
            sql.push(' ');
            sql.push_str(clause);
        }
        if columns.is_empty() {
            sql.push_str(" DEFAULT VALUES");
        } else {
            sql.push_str(" VALUES (");
            for (i, c) in columns.iter().enumerate() {
                if i > 0 {
                    sql.push_str(", ");
                }
                self.dialect.write_placeholder(c.name().as_str(), &mut sql);
            }
            sql.push(')');
        }
        match self.dialect.inserted_row {
            InsertedRow::Output(_) => sql.push(';'),
            InsertedRow::Returning(clause) => {
                sql.push(' ');
                sql.push_str(clause);
                sql.push(';');
            }
            InsertedRow::FollowUpSelect(last_id) => {
                sql.push_str(&format!(
                    "; {} WHERE {} = {last_id};",
                    self.select_prefix(),
                    self.identity_expr()
                ));
            }
        }
        sql
    }

    // ==================== UPDATE ====================

    /// `UPDATE` by id assigning the columns declared by payload type `P`, all
    /// deferred.
    pub fn update_sql<P: Record>(&self) -> OrmResult<Statement> {
        let payload = P::schema();
        let columns: Vec<&Column> = self
            .meta
            .non_identity()
            .filter(|c| payload.fields.iter().any(|f| f.name == c.field()))
            .collect();
        let mut deferred: Vec<DeferredParam> = columns
            .iter()
            .map(|c| DeferredParam {
                placeholder: c.name().to_string(),
                field: c.field().to_string(),
            })
            .collect();
        let identity = self.meta.identity();
        deferred.push(DeferredParam {
            placeholder: identity.name().to_string(),
            field: identity.field().to_string(),
        });
        let sql = self.render_update(&columns)?;
        Ok(self.finish(StatementKind::Update, sql, Vec::new(), deferred))
    }

    /// `UPDATE` of row `id` assigning every non-identity field `payload` has.
    ///
    /// Fields the payload does not know are left untouched, so a partial map
    /// updates only its own keys.
    pub fn update(&self, payload: &dyn FieldValues, id: i64) -> OrmResult<Statement> {
        let mut columns = Vec::new();
        let mut bindings = Vec::new();
        for column in self.meta.non_identity() {
            if let Some(value) = payload.field_value(column.field()) {
                bindings.push(Binding::new(
                    column.name().as_str(),
                    column.serialize(&value)?,
                ));
                columns.push(column);
            }
        }
        let (_, id_binding) = self.identity_clause(id)?;
        bindings.push(id_binding);
        let sql = self.render_update(&columns)?;
        Ok(self.finish(StatementKind::Update, sql, bindings, Vec::new()))
    }

    fn render_update(&self, columns: &[&Column]) -> OrmResult<String> {
        if columns.is_empty() {
            return Err(OrmError::validation(format!(
                "update of '{}' assigns no columns",
                self.meta.record()
            )));
        }
        let table = self.table();
        let mut sql = format!("UPDATE {table} SET ");
        for (i, c) in columns.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            self.dialect.write_ident(c.name(), &mut sql);
            sql.push_str(" = ");
            self.dialect.write_placeholder(c.name().as_str(), &mut sql);
        }
        // Updates address the identity column itself, even where lookups use a
        // row-identity pseudo-column.
        sql.push_str(" WHERE ");
        self.dialect.write_ident(self.meta.identity().name(), &mut sql);
        sql.push_str(" = ");
        self.dialect
            .write_placeholder(self.meta.identity().name().as_str(), &mut sql);
        if let Some(returning) = self.dialect.update_returning {
            sql.push(' ');
            sql.push_str(&returning.replace("{table}", &table));
        }
        sql.push(';');
        Ok(sql)
    }

    // ==================== DELETE ====================

    pub fn delete_by_id(&self, id: i64) -> OrmResult<Statement> {
        let (clause, binding) = self.identity_clause(id)?;
        let sql = format!("{} {clause};", self.delete_prefix());
        Ok(self.finish(StatementKind::Delete, sql, vec![binding], Vec::new()))
    }

    pub fn delete_where(&self, predicate: &Predicate) -> OrmResult<Statement> {
        let fragment = self.where_clause(predicate)?;
        Ok(self.filtered(StatementKind::Delete, self.delete_prefix(), fragment))
    }

    pub fn delete_where_with(
        &self,
        predicate: &Predicate,
        param: &dyn FieldValues,
    ) -> OrmResult<Statement> {
        let fragment = self.where_clause_with(predicate, param)?;
        Ok(self.filtered(StatementKind::Delete, self.delete_prefix(), fragment))
    }

    pub fn delete_matching<R: Record>(&self, example: &R) -> OrmResult<Statement> {
        let predicate = Predicate::matching(example)?;
        self.delete_where_with(&predicate, example)
    }

    // ==================== WHERE ====================

    /// Compile `predicate`; render with [`CompiledFragment::where_clause`].
    /// `param.*` accesses stay deferred.
    pub fn where_clause(&self, predicate: &Predicate) -> OrmResult<CompiledFragment> {
        Compiler::new(&self.meta, self.dialect).compile(predicate)
    }

    pub fn where_clause_with(
        &self,
        predicate: &Predicate,
        param: &dyn FieldValues,
    ) -> OrmResult<CompiledFragment> {
        Compiler::new(&self.meta, self.dialect)
            .with_param(param)
            .compile(predicate)
    }

    // ==================== helpers ====================

    fn table(&self) -> String {
        self.dialect.ident(self.meta.table())
    }

    fn identity_expr(&self) -> String {
        self.dialect.identity_expr(self.meta.identity().name())
    }

    /// `WHERE <identity> = @<identity>`
    fn identity_where(&self) -> String {
        let mut clause = format!("WHERE {} = ", self.identity_expr());
        self.dialect
            .write_placeholder(self.meta.identity().name().as_str(), &mut clause);
        clause
    }

    fn identity_clause(&self, id: i64) -> OrmResult<(String, Binding)> {
        let identity = self.meta.identity();
        let binding = Binding::new(
            identity.name().as_str(),
            identity.serialize(&Value::Int(id))?,
        );
        Ok((self.identity_where(), binding))
    }

    fn column_list<'c>(&self, columns: impl Iterator<Item = &'c Column>) -> String {
        columns
            .map(|c| self.dialect.ident(c.name()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Select list; backends with a row-identity pseudo-column read it in place of
    /// the identity column.
    fn select_prefix(&self) -> String {
        let columns = match self.dialect.row_identity {
            Some(pseudo) => {
                let mut cols = vec![format!(
                    "{pseudo} AS {}",
                    self.dialect.ident(self.meta.identity().name())
                )];
                cols.extend(self.meta.non_identity().map(|c| self.dialect.ident(c.name())));
                cols.join(", ")
            }
            None => self.column_list(self.meta.columns().iter()),
        };
        format!("SELECT {columns} FROM {}", self.table())
    }

    fn delete_prefix(&self) -> String {
        format!("DELETE FROM {}", self.table())
    }

    fn bind_field(&self, column: &Column, record: &dyn FieldValues) -> OrmResult<Binding> {
        let value = record
            .field_value(column.field())
            .ok_or_else(|| OrmError::unknown_field(self.meta.record(), column.field()))?;
        Ok(Binding::new(
            column.name().as_str(),
            column.serialize(&value)?,
        ))
    }

    fn database_scripts(&self, what: &str) -> OrmResult<crate::dialect::DatabaseScripts> {
        self.dialect.database_scripts.ok_or_else(|| {
            OrmError::Unsupported(format!("{what} is not supported by {}", self.dialect.name))
        })
    }

    fn filtered(&self, kind: StatementKind, prefix: String, fragment: CompiledFragment) -> Statement {
        let sql = format!("{prefix} {};", fragment.where_clause());
        self.finish(kind, sql, fragment.bindings, fragment.deferred)
    }

    fn finish(
        &self,
        kind: StatementKind,
        sql: String,
        bindings: Vec<Binding>,
        deferred: Vec<DeferredParam>,
    ) -> Statement {
        self.log
            .emit(kind, self.meta.table().as_str(), &sql, bindings.len());
        Statement {
            kind,
            sql,
            bindings,
            deferred,
        }
    }
}

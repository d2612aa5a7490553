//! Backend syntax profiles.
//!
//! A [`Dialect`] is a read-only bag of syntax tokens consumed by the compiler and
//! the statement builder. Two profiles ship with the crate; another backend is just
//! another `Dialect` value.
//!
//! ```ignore
//! use recorm::{Dialect, InsertedRow, QuoteStyle};
//!
//! const DUCK: Dialect = Dialect::SQLITE
//!     .with_name("duckdb")
//!     .with_quote(QuoteStyle::DoubleQuote)
//!     .with_inserted_row(InsertedRow::Returning("RETURNING *"));
//! ```

use crate::ident::{Ident, QuoteStyle};

/// Column type names per comparison family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeNames {
    pub boolean: &'static str,
    pub integer: &'static str,
    pub real: &'static str,
    pub text: &'static str,
    pub uuid: &'static str,
    pub timestamp: &'static str,
    pub json: &'static str,
}

/// How an INSERT hands back the inserted row including its new identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertedRow {
    /// Clause between the column list and `VALUES`, e.g. `OUTPUT INSERTED.*`.
    Output(&'static str),
    /// Clause after `VALUES (...)`, e.g. `RETURNING *`.
    Returning(&'static str),
    /// A second statement selecting the row whose identity equals this expression,
    /// e.g. `last_insert_rowid()`.
    FollowUpSelect(&'static str),
}

/// Scripts creating / dropping a whole database, for servers that host several.
#[derive(Debug, Clone, Copy)]
pub struct DatabaseScripts {
    pub create: fn(&Ident) -> String,
    pub drop: fn(&Ident) -> String,
}

/// Backend-specific syntax tokens.
#[derive(Debug, Clone, Copy)]
pub struct Dialect {
    pub name: &'static str,
    pub quote: QuoteStyle,
    /// Prefix of named placeholders (`@` gives `@Key`).
    pub placeholder_prefix: char,
    /// Appended to the identity column's type in CREATE TABLE.
    pub identity_suffix: &'static str,
    pub inserted_row: InsertedRow,
    /// Implicit row-identity pseudo-column used instead of the identity column
    /// in lookups and select lists.
    pub row_identity: Option<&'static str>,
    /// Clause appended to UPDATE statements; `{table}` expands to the quoted table.
    pub update_returning: Option<&'static str>,
    pub database_scripts: Option<DatabaseScripts>,
    pub types: TypeNames,
}

fn sql_server_create_database(name: &Ident) -> String {
    format!("USE MASTER; IF db_id('{name}') is null CREATE DATABASE [{name}];")
}

fn sql_server_drop_database(name: &Ident) -> String {
    format!(
        "USE [master];\n\
         IF db_id('{name}') is not null\n\
         BEGIN\n\
         DECLARE @kill varchar(8000) = '';\n\
         SELECT @kill = @kill + 'kill ' + CONVERT(varchar(5), session_id) + ';'\n\
         FROM sys.dm_exec_sessions\n\
         WHERE database_id = db_id('{name}')\n\
         EXEC(@kill);\n\
         EXEC('DROP DATABASE [{name}]');\n\
         END;"
    )
}

impl Dialect {
    /// Server engine: autoincrement identity, inserted row returned by `OUTPUT`.
    pub const SQL_SERVER: Dialect = Dialect {
        name: "sqlserver",
        quote: QuoteStyle::Bracket,
        placeholder_prefix: '@',
        identity_suffix: " IDENTITY(1,1) PRIMARY KEY",
        inserted_row: InsertedRow::Output("OUTPUT INSERTED.*"),
        row_identity: None,
        update_returning: None,
        database_scripts: Some(DatabaseScripts {
            create: sql_server_create_database,
            drop: sql_server_drop_database,
        }),
        types: TypeNames {
            boolean: "BIT",
            integer: "BIGINT",
            real: "REAL",
            text: "NVARCHAR(MAX)",
            uuid: "UNIQUEIDENTIFIER",
            timestamp: "DATETIME2",
            json: "NVARCHAR(MAX)",
        },
    };

    /// Embedded engine: identity is the implicit `ROWID`, inserted row fetched by
    /// a follow-up select on `last_insert_rowid()`.
    pub const SQLITE: Dialect = Dialect {
        name: "sqlite",
        quote: QuoteStyle::Bracket,
        placeholder_prefix: '@',
        identity_suffix: " PRIMARY KEY",
        inserted_row: InsertedRow::FollowUpSelect("last_insert_rowid()"),
        row_identity: Some("ROWID"),
        update_returning: Some("RETURNING {table}.*"),
        database_scripts: None,
        types: TypeNames {
            boolean: "INTEGER",
            integer: "INTEGER",
            real: "REAL",
            text: "TEXT",
            uuid: "TEXT",
            timestamp: "TEXT",
            json: "TEXT",
        },
    };

    pub const fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub const fn with_quote(mut self, quote: QuoteStyle) -> Self {
        self.quote = quote;
        self
    }

    pub const fn with_placeholder_prefix(mut self, prefix: char) -> Self {
        self.placeholder_prefix = prefix;
        self
    }

    pub const fn with_identity_suffix(mut self, suffix: &'static str) -> Self {
        self.identity_suffix = suffix;
        self
    }

    pub const fn with_inserted_row(mut self, inserted_row: InsertedRow) -> Self {
        self.inserted_row = inserted_row;
        self
    }

    pub const fn with_row_identity(mut self, row_identity: Option<&'static str>) -> Self {
        self.row_identity = row_identity;
        self
    }

    pub const fn with_update_returning(mut self, clause: Option<&'static str>) -> Self {
        self.update_returning = clause;
        self
    }

    pub const fn with_types(mut self, types: TypeNames) -> Self {
        self.types = types;
        self
    }

    /// Append a quoted identifier.
    pub fn write_ident(&self, ident: &Ident, out: &mut String) {
        self.quote.write(ident.as_str(), out);
    }

    /// A quoted identifier.
    pub fn ident(&self, ident: &Ident) -> String {
        ident.quoted(self.quote)
    }

    /// Append a named placeholder.
    pub fn write_placeholder(&self, name: &str, out: &mut String) {
        out.push(self.placeholder_prefix);
        out.push_str(name);
    }

    /// Append a quoted, escaped string literal.
    pub fn write_text_literal(&self, text: &str, out: &mut String) {
        out.push('\'');
        for ch in text.chars() {
            if ch == '\'' {
                out.push('\'');
            }
            out.push(ch);
        }
        out.push('\'');
    }

    /// Expression addressing a row's identity: the pseudo-column if the backend has
    /// one, otherwise the quoted identity column.
    pub fn identity_expr(&self, identity: &Ident) -> String {
        match self.row_identity {
            Some(pseudo) => pseudo.to_string(),
            None => self.ident(identity),
        }
    }
}

//! Column metadata: record schema descriptions and their resolved, cached form.
//!
//! A [`RecordSchema`] is what a record declares about itself (usually generated by
//! `#[derive(Record)]`). [`resolve_schema`] validates it against a
//! [`TypeRegistry`] and produces a [`TableMeta`]: the ordered columns with their
//! handlers attached and the single identity column.

use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::ident::Ident;
use crate::record::Record;
use crate::types::{Modifiers, Precision, SemanticType, TypeFamily, TypeHandler, TypeRegistry};
use crate::value::Value;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// Declaration of one record field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// Declared field name, used by predicates and payloads.
    pub name: String,
    pub ty: SemanticType,
    /// Storage name override; defaults to `name`.
    pub column: Option<String>,
    pub is_id: bool,
    pub modifiers: Modifiers,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: SemanticType) -> Self {
        Self {
            name: name.into(),
            ty,
            column: None,
            is_id: false,
            modifiers: Modifiers::default(),
        }
    }

    /// Override the storage name.
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    /// Mark this field as the identity field.
    pub fn id(mut self) -> Self {
        self.is_id = true;
        self
    }

    pub fn modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.modifiers.nullable = Some(nullable);
        self
    }

    pub fn precision(mut self, total: u8, fractional: u8) -> Self {
        self.modifiers.precision = Some(Precision::new(total, fractional));
        self
    }

    pub fn currency(mut self) -> Self {
        self.modifiers.currency = Some(Precision::CURRENCY);
        self
    }

    /// The storage name this field resolves to.
    pub fn storage_name(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.name)
    }
}

/// Declaration of a record type.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    /// Record type name; also the default table name.
    pub name: String,
    pub table: Option<String>,
    pub fields: Vec<FieldDef>,
}

impl RecordSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            fields: Vec::new(),
        }
    }

    /// Override the table name.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Append a field; declaration order is column order.
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }
}

/// A resolved column.
#[derive(Clone)]
pub struct Column {
    field: String,
    name: Ident,
    ty: SemanticType,
    modifiers: Modifiers,
    is_identity: bool,
    handler: Arc<dyn TypeHandler>,
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("field", &self.field)
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("modifiers", &self.modifiers)
            .field("is_identity", &self.is_identity)
            .finish()
    }
}

impl Column {
    /// Declared field name.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Storage name.
    pub fn name(&self) -> &Ident {
        &self.name
    }

    pub fn semantic_type(&self) -> SemanticType {
        self.ty
    }

    pub fn family(&self) -> TypeFamily {
        self.handler.family()
    }

    pub fn modifiers(&self) -> &Modifiers {
        &self.modifiers
    }

    pub fn is_identity(&self) -> bool {
        self.is_identity
    }

    pub fn handler(&self) -> &Arc<dyn TypeHandler> {
        &self.handler
    }

    /// Full column type declaration including nullability.
    pub fn storage_type(&self, dialect: &Dialect) -> String {
        let mut ty = self.handler.storage_type(dialect, &self.modifiers);
        match self.modifiers.nullable {
            Some(true) => ty.push_str(" NULL"),
            Some(false) => ty.push_str(" NOT NULL"),
            None => {}
        }
        ty
    }

    /// Logical value to wire value.
    pub fn serialize(&self, value: &Value) -> OrmResult<Value> {
        self.handler
            .serialize(value)
            .map_err(|e| OrmError::conversion(&self.field, e.to_string()))
    }

    /// Stored form of a value compared against this column.
    ///
    /// A real compared with an integer-valued numeric column keeps its value, so
    /// `[n] > 2.5` binds and evaluates as written instead of failing conversion.
    pub fn serialize_operand(&self, value: &Value) -> OrmResult<Value> {
        match value {
            Value::Real(r) if self.family() == TypeFamily::Numeric && self.ty != SemanticType::Real => {
                if r.is_finite() {
                    Ok(value.clone())
                } else {
                    Err(OrmError::validation(format!(
                        "non-finite real {r} cannot be compared with field '{}'",
                        self.field
                    )))
                }
            }
            _ => self.serialize(value),
        }
    }

    /// Wire value to logical value.
    pub fn deserialize(&self, value: &Value) -> OrmResult<Value> {
        self.handler
            .deserialize(value)
            .map_err(|e| OrmError::conversion(&self.field, e.to_string()))
    }
}

/// Resolved metadata of a record type.
#[derive(Debug, Clone)]
pub struct TableMeta {
    record: String,
    table: Ident,
    columns: Vec<Column>,
    identity: usize,
}

impl TableMeta {
    /// Record type name.
    pub fn record(&self) -> &str {
        &self.record
    }

    pub fn table(&self) -> &Ident {
        &self.table
    }

    /// All columns in declaration order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn identity(&self) -> &Column {
        &self.columns[self.identity]
    }

    /// Columns other than the identity, in declaration order.
    pub fn non_identity(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| !c.is_identity)
    }

    /// Look a column up by declared field name.
    pub fn find(&self, field: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.field == field)
    }

    /// Look a column up by declared field name, or `UnknownField`.
    pub fn column(&self, field: &str) -> OrmResult<&Column> {
        self.find(field)
            .ok_or_else(|| OrmError::unknown_field(&self.record, field))
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.find(field).is_some()
    }
}

/// Validate `schema` and attach handlers from `registry`. Uncached.
pub fn resolve_schema(schema: &RecordSchema, registry: &TypeRegistry) -> OrmResult<TableMeta> {
    let table = Ident::parse(schema.table.as_deref().unwrap_or(&schema.name))
        .map_err(|e| OrmError::schema(format!("record '{}': {e}", schema.name)))?;

    let mut columns = Vec::with_capacity(schema.fields.len());
    let mut identity = None;
    for (idx, def) in schema.fields.iter().enumerate() {
        let name = Ident::parse(def.storage_name())
            .map_err(|e| OrmError::schema(format!("record '{}': {e}", schema.name)))?;

        if let Some(prev) = columns.iter().find(|c: &&Column| {
            c.name.as_str().eq_ignore_ascii_case(name.as_str()) || c.field == def.name
        }) {
            return Err(OrmError::schema(format!(
                "record '{}': field '{}' collides with field '{}' (storage name '{}')",
                schema.name, def.name, prev.field, name
            )));
        }

        if def.is_id {
            if let Some(first) = identity {
                let first: &FieldDef = &schema.fields[first];
                return Err(OrmError::schema(format!(
                    "record '{}' declares more than one identity field ('{}' and '{}')",
                    schema.name, first.name, def.name
                )));
            }
            identity = Some(idx);
        }

        let handler = registry.handler_for(def.ty).map_err(|_| {
            OrmError::UnsupportedType(format!(
                "record '{}', field '{}': no handler registered for {}",
                schema.name, def.name, def.ty
            ))
        })?;

        columns.push(Column {
            field: def.name.clone(),
            name,
            ty: def.ty,
            modifiers: def.modifiers,
            is_identity: def.is_id,
            handler,
        });
    }

    let Some(identity) = identity else {
        return Err(OrmError::schema(format!(
            "record '{}' declares no identity field",
            schema.name
        )));
    };

    Ok(TableMeta {
        record: schema.name.clone(),
        table,
        columns,
        identity,
    })
}

type MetaCache = RwLock<HashMap<TypeId, Arc<TableMeta>>>;

static META_CACHE: OnceLock<MetaCache> = OnceLock::new();

/// Resolved metadata for `R`, computed once per process.
///
/// Resolution runs under the cache's write lock after a second lookup, so
/// concurrent first calls resolve the schema exactly once. Failures are not cached.
pub fn meta<R: Record>() -> OrmResult<Arc<TableMeta>> {
    let cache = META_CACHE.get_or_init(MetaCache::default);
    let key = TypeId::of::<R>();

    if let Some(meta) = cache
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
    {
        tracing::trace!(target: "recorm.meta", record = meta.record(), "metadata cache hit");
        return Ok(Arc::clone(meta));
    }

    let mut map = cache.write().unwrap_or_else(PoisonError::into_inner);
    if let Some(meta) = map.get(&key) {
        return Ok(Arc::clone(meta));
    }

    let meta = Arc::new(resolve_schema(&R::schema(), TypeRegistry::global())?);
    tracing::debug!(
        target: "recorm.meta",
        record = meta.record(),
        table = %meta.table(),
        columns = meta.columns().len(),
        "resolved record metadata"
    );
    map.insert(key, Arc::clone(&meta));
    Ok(meta)
}

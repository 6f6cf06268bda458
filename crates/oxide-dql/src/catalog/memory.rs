//! In-memory catalog, loadable from JSON.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::{
    Catalog, ColumnDescriptor, RoutineDescriptor, SequenceDescriptor, TableDescriptor,
    ViewDefinition,
};
use crate::ast::DataType;

/// Errors raised while building a [`MemoryCatalog`].
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog document is not valid JSON for the expected layout.
    #[error("Invalid catalog document: {0}")]
    Json(#[from] serde_json::Error),

    /// An object was declared twice in the same schema.
    #[error("Duplicate object {schema}.{name}")]
    DuplicateObject {
        /// Schema holding the object.
        schema: String,
        /// Object name.
        name: String,
    },

    /// An object was added to a schema that does not exist.
    #[error("Unknown schema: {0}")]
    UnknownSchema(String),
}

#[derive(Debug, Default)]
struct SchemaObjects {
    tables: HashMap<String, Arc<TableDescriptor>>,
    sequences: HashMap<String, Arc<SequenceDescriptor>>,
    routines: HashMap<String, Arc<RoutineDescriptor>>,
    domains: HashMap<String, DataType>,
}

#[derive(Debug)]
struct CatalogState {
    schemas: HashMap<String, SchemaObjects>,
    current_schema: String,
    views_declared: usize,
}

/// A [`Catalog`] held entirely in memory.
///
/// Lookups take a read lock; DDL-style mutations take a write lock, so a
/// catalog can be shared between threads compiling statements while it is
/// being changed.
#[derive(Debug)]
pub struct MemoryCatalog {
    default_catalog: String,
    state: RwLock<CatalogState>,
}

impl MemoryCatalog {
    /// Creates a catalog containing one empty schema, which is also the
    /// current schema.
    #[must_use]
    pub fn new(default_catalog: impl Into<String>, current_schema: impl Into<String>) -> Self {
        let current_schema = current_schema.into();
        let mut schemas = HashMap::new();
        schemas.insert(current_schema.clone(), SchemaObjects::default());
        Self {
            default_catalog: default_catalog.into(),
            state: RwLock::new(CatalogState {
                schemas,
                current_schema,
                views_declared: 0,
            }),
        }
    }

    /// Parses a JSON catalog document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or declares an object
    /// twice.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        let catalog = Self::new(file.default_catalog, file.current_schema);
        for schema in file.schemas {
            catalog.create_schema(&schema.name);
            for table in schema.tables {
                catalog.add_table(TableDescriptor::new(
                    schema.name.clone(),
                    table.name,
                    table.columns,
                ))?;
            }
            for view in schema.views {
                catalog.add_view(&schema.name, &view.name, view.columns, view.query)?;
            }
            for sequence in schema.sequences {
                catalog.add_sequence(SequenceDescriptor {
                    schema: schema.name.clone(),
                    name: sequence.name,
                    data_type: sequence.data_type.unwrap_or(DataType::Bigint),
                })?;
            }
            for routine in schema.routines {
                catalog.add_routine(RoutineDescriptor {
                    schema: schema.name.clone(),
                    name: routine.name,
                    parameter_count: routine.parameter_count,
                    return_type: routine.return_type,
                })?;
            }
            for domain in schema.domains {
                catalog.add_domain(&schema.name, &domain.name, domain.base)?;
            }
        }
        Ok(catalog)
    }

    /// Creates an empty schema if it does not exist yet.
    pub fn create_schema(&self, name: &str) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.schemas.entry(name.to_string()).or_default();
    }

    /// Adds a base table.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema is unknown or the name is taken.
    pub fn add_table(&self, table: TableDescriptor) -> Result<(), CatalogError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let objects = state
            .schemas
            .get_mut(&table.schema)
            .ok_or_else(|| CatalogError::UnknownSchema(table.schema.clone()))?;
        if objects.tables.contains_key(&table.name) {
            return Err(CatalogError::DuplicateObject {
                schema: table.schema,
                name: table.name,
            });
        }
        debug!(table = %table.qualified_name(), "Registered table");
        objects.tables.insert(table.name.clone(), Arc::new(table));
        Ok(())
    }

    /// Adds a view. Views are numbered in the order they are added.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema is unknown or the name is taken.
    pub fn add_view(
        &self,
        schema: &str,
        name: &str,
        columns: Vec<ColumnDescriptor>,
        query: impl Into<String>,
    ) -> Result<(), CatalogError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let declaration_order = state.views_declared;
        let objects = state
            .schemas
            .get_mut(schema)
            .ok_or_else(|| CatalogError::UnknownSchema(schema.to_string()))?;
        if objects.tables.contains_key(name) {
            return Err(duplicate(schema, name));
        }
        let view = TableDescriptor {
            schema: schema.to_string(),
            name: name.to_string(),
            columns,
            view: Some(ViewDefinition {
                declaration_order,
                query: query.into(),
            }),
        };
        objects.tables.insert(name.to_string(), Arc::new(view));
        state.views_declared += 1;
        Ok(())
    }

    /// Adds a sequence.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema is unknown or the name is taken.
    pub fn add_sequence(&self, sequence: SequenceDescriptor) -> Result<(), CatalogError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let objects = state
            .schemas
            .get_mut(&sequence.schema)
            .ok_or_else(|| CatalogError::UnknownSchema(sequence.schema.clone()))?;
        if objects.sequences.contains_key(&sequence.name) {
            return Err(duplicate(&sequence.schema, &sequence.name));
        }
        objects
            .sequences
            .insert(sequence.name.clone(), Arc::new(sequence));
        Ok(())
    }

    /// Adds a routine.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema is unknown or the name is taken.
    pub fn add_routine(&self, routine: RoutineDescriptor) -> Result<(), CatalogError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let objects = state
            .schemas
            .get_mut(&routine.schema)
            .ok_or_else(|| CatalogError::UnknownSchema(routine.schema.clone()))?;
        if objects.routines.contains_key(&routine.name) {
            return Err(duplicate(&routine.schema, &routine.name));
        }
        objects
            .routines
            .insert(routine.name.clone(), Arc::new(routine));
        Ok(())
    }

    /// Adds a domain over `base`.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema is unknown or the name is taken.
    pub fn add_domain(&self, schema: &str, name: &str, base: DataType) -> Result<(), CatalogError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let objects = state
            .schemas
            .get_mut(schema)
            .ok_or_else(|| CatalogError::UnknownSchema(schema.to_string()))?;
        if objects.domains.contains_key(name) {
            return Err(duplicate(schema, name));
        }
        objects.domains.insert(
            name.to_string(),
            DataType::Domain {
                name: format!("{schema}.{name}"),
                base: Box::new(base),
            },
        );
        Ok(())
    }

    /// Drops a table or view. Returns true if it existed.
    pub fn drop_table(&self, schema: &str, name: &str) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state
            .schemas
            .get_mut(schema)
            .is_some_and(|objects| objects.tables.remove(name).is_some())
    }

    /// Changes the session's current schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema does not exist.
    pub fn set_current_schema(&self, schema: &str) -> Result<(), CatalogError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if !state.schemas.contains_key(schema) {
            return Err(CatalogError::UnknownSchema(schema.to_string()));
        }
        state.current_schema = schema.to_string();
        Ok(())
    }
}

fn duplicate(schema: &str, name: &str) -> CatalogError {
    CatalogError::DuplicateObject {
        schema: schema.to_string(),
        name: name.to_string(),
    }
}

impl Catalog for MemoryCatalog {
    fn lookup_table(&self, name: &str, schema: &str) -> Option<Arc<TableDescriptor>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.schemas.get(schema)?.tables.get(name).cloned()
    }

    fn lookup_type(&self, name: &str, schema: &str) -> Option<DataType> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.schemas.get(schema)?.domains.get(name).cloned()
    }

    fn lookup_sequence(&self, name: &str, schema: &str) -> Option<Arc<SequenceDescriptor>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.schemas.get(schema)?.sequences.get(name).cloned()
    }

    fn lookup_routine(&self, name: &str, schema: &str) -> Option<Arc<RoutineDescriptor>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.schemas.get(schema)?.routines.get(name).cloned()
    }

    fn current_schema_name(&self, prefix: Option<&str>) -> Option<String> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        match prefix {
            None => Some(state.current_schema.clone()),
            Some(schema) if state.schemas.contains_key(schema) => Some(schema.to_string()),
            Some(_) => None,
        }
    }

    fn default_catalog_name(&self) -> &str {
        &self.default_catalog
    }
}

// JSON layout

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default = "default_catalog_name")]
    default_catalog: String,
    #[serde(default = "default_schema_name")]
    current_schema: String,
    #[serde(default)]
    schemas: Vec<SchemaFile>,
}

fn default_catalog_name() -> String {
    String::from("PUBLIC")
}

fn default_schema_name() -> String {
    String::from("PUBLIC")
}

#[derive(Debug, Deserialize)]
struct SchemaFile {
    name: String,
    #[serde(default)]
    tables: Vec<TableFile>,
    #[serde(default)]
    views: Vec<ViewFile>,
    #[serde(default)]
    sequences: Vec<SequenceFile>,
    #[serde(default)]
    routines: Vec<RoutineFile>,
    #[serde(default)]
    domains: Vec<DomainFile>,
}

#[derive(Debug, Deserialize)]
struct TableFile {
    name: String,
    columns: Vec<ColumnDescriptor>,
}

#[derive(Debug, Deserialize)]
struct ViewFile {
    name: String,
    columns: Vec<ColumnDescriptor>,
    #[serde(default)]
    query: String,
}

#[derive(Debug, Deserialize)]
struct SequenceFile {
    name: String,
    #[serde(default)]
    data_type: Option<DataType>,
}

#[derive(Debug, Deserialize)]
struct RoutineFile {
    name: String,
    #[serde(default)]
    parameter_count: Option<usize>,
    #[serde(default)]
    return_type: Option<DataType>,
}

#[derive(Debug, Deserialize)]
struct DomainFile {
    name: String,
    base: DataType,
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"{
        "default_catalog": "SHOP",
        "current_schema": "PUBLIC",
        "schemas": [
            {
                "name": "PUBLIC",
                "tables": [
                    {"name": "ORDERS", "columns": [
                        {"name": "ID", "data_type": "Integer", "nullable": false},
                        {"name": "TOTAL", "data_type": {"Decimal": {"precision": 10, "scale": 2}}}
                    ]}
                ],
                "views": [
                    {"name": "BIG_ORDERS", "columns": [{"name": "ID", "data_type": "Integer"}],
                     "query": "SELECT id FROM orders WHERE total > 100"}
                ],
                "sequences": [{"name": "ORDER_SEQ"}],
                "routines": [{"name": "TAX", "parameter_count": 1}],
                "domains": [{"name": "MONEY", "base": {"Decimal": {"precision": 12, "scale": 2}}}]
            },
            {"name": "ARCHIVE"}
        ]
    }"#;

    #[test]
    fn test_from_json() {
        let catalog = MemoryCatalog::from_json(DOCUMENT).unwrap();
        assert_eq!(catalog.default_catalog_name(), "SHOP");

        let orders = catalog.lookup_table("ORDERS", "PUBLIC").unwrap();
        assert_eq!(orders.column_names(), vec!["ID", "TOTAL"]);
        assert!(!orders.columns[0].nullable);

        let view = catalog.lookup_table("BIG_ORDERS", "PUBLIC").unwrap();
        assert_eq!(view.view.as_ref().unwrap().declaration_order, 0);

        let sequence = catalog.lookup_sequence("ORDER_SEQ", "PUBLIC").unwrap();
        assert_eq!(sequence.data_type, DataType::Bigint);
        assert!(catalog.lookup_routine("TAX", "PUBLIC").is_some());
        assert!(matches!(
            catalog.lookup_type("MONEY", "PUBLIC"),
            Some(DataType::Domain { .. })
        ));
    }

    #[test]
    fn test_schema_resolution() {
        let catalog = MemoryCatalog::from_json(DOCUMENT).unwrap();
        assert_eq!(catalog.current_schema_name(None).as_deref(), Some("PUBLIC"));
        assert_eq!(
            catalog.current_schema_name(Some("ARCHIVE")).as_deref(),
            Some("ARCHIVE")
        );
        assert_eq!(catalog.current_schema_name(Some("NOPE")), None);
    }

    #[test]
    fn test_duplicate_table_rejected() {
        let catalog = MemoryCatalog::new("PUBLIC", "PUBLIC");
        let table = TableDescriptor::new("PUBLIC", "T", vec![]);
        catalog.add_table(table.clone()).unwrap();
        assert!(matches!(
            catalog.add_table(table),
            Err(CatalogError::DuplicateObject { .. })
        ));
    }

    #[test]
    fn test_drop_table_makes_lookup_miss() {
        let catalog = MemoryCatalog::new("PUBLIC", "PUBLIC");
        catalog
            .add_table(TableDescriptor::new("PUBLIC", "T", vec![]))
            .unwrap();
        assert!(catalog.drop_table("PUBLIC", "T"));
        assert!(catalog.lookup_table("T", "PUBLIC").is_none());
        assert!(!catalog.drop_table("PUBLIC", "T"));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            MemoryCatalog::from_json("{not json"),
            Err(CatalogError::Json(_))
        ));
    }
}

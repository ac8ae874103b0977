use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::catalog::{ColumnInfo, ColumnType};
use crate::config::SchemaCacheConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
}

/// Columns of one table in ordinal order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSchema {
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    /// Client-facing metadata; introspected columns are labelled with their own name.
    pub fn column_infos(&self) -> Vec<ColumnInfo> {
        self.columns
            .iter()
            .map(|c| ColumnInfo::new(&c.name, ColumnType::from_data_type(&c.data_type), &c.name))
            .collect()
    }
}

/// Cache entry with timestamp for TTL tracking.
#[derive(Debug, Clone)]
struct CacheEntry {
    schema: TableSchema,
    inserted_at: Instant,
}

/// Introspected schema cache with TTL and size limits.
#[derive(Debug)]
pub struct SchemaCache {
    schemas: HashMap<String, CacheEntry>,
    ttl: Duration,
    max_size: usize,
}

impl Default for SchemaCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::with_config(&SchemaCacheConfig::default())
    }

    pub fn with_config(config: &SchemaCacheConfig) -> Self {
        Self {
            schemas: HashMap::new(),
            ttl: Duration::from_secs(config.ttl_secs),
            max_size: config.max_size.max(1),
        }
    }

    pub fn insert(&mut self, table: String, schema: TableSchema) {
        if self.schemas.len() >= self.max_size && !self.schemas.contains_key(&table) {
            self.evict_oldest();
        }

        self.schemas.insert(
            table,
            CacheEntry {
                schema,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn get(&self, table: &str) -> Option<&TableSchema> {
        self.schemas.get(table).and_then(|entry| {
            if entry.inserted_at.elapsed() < self.ttl {
                Some(&entry.schema)
            } else {
                // Expired - treat as cache miss
                None
            }
        })
    }

    pub fn contains(&self, table: &str) -> bool {
        self.get(table).is_some()
    }

    /// Remove expired entries from the cache.
    pub fn evict_expired(&mut self) {
        self.schemas
            .retain(|_, entry| entry.inserted_at.elapsed() < self.ttl);
    }

    fn evict_oldest(&mut self) {
        if let Some(oldest_key) = self
            .schemas
            .iter()
            .min_by_key(|(_, entry)| entry.inserted_at)
            .map(|(k, _)| k.clone())
        {
            tracing::debug!(table = %oldest_key, "evicting oldest schema from cache");
            self.schemas.remove(&oldest_key);
        }
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(column: &str, data_type: &str) -> TableSchema {
        TableSchema {
            columns: vec![ColumnSchema {
                name: column.to_string(),
                data_type: data_type.to_string(),
                nullable: true,
            }],
        }
    }

    #[test]
    fn evicts_oldest_at_capacity() {
        let mut cache = SchemaCache::with_config(&SchemaCacheConfig {
            ttl_secs: 60,
            max_size: 2,
        });
        cache.insert("a".into(), schema("x", "int"));
        cache.insert("b".into(), schema("y", "int"));
        cache.insert("c".into(), schema("z", "int"));
        assert_eq!(cache.len(), 2);
        assert!(cache.contains("c"));
    }

    #[test]
    fn zero_ttl_never_hits() {
        let mut cache = SchemaCache::with_config(&SchemaCacheConfig {
            ttl_secs: 0,
            max_size: 4,
        });
        cache.insert("padron".into(), schema("AYN", "varchar"));
        assert!(cache.get("padron").is_none());
        cache.evict_expired();
        assert!(cache.is_empty());
    }

    #[test]
    fn maps_introspected_types() {
        let infos = schema("FECHA", "datetime").column_infos();
        assert_eq!(infos[0].column_type, ColumnType::Date);
        assert_eq!(infos[0].label, "FECHA");
    }
}

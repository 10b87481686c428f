//! Reference Cache
//!
//! Immutable lookup tables for the coded columns of the vehicle dataset:
//! `category -> id -> entry`. Built once at startup and shared read-only.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;

/// One reference row: a description plus category-specific attributes
/// (`uf`, `fk_marca`, `fk_segmento_veiculo`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub descricao: String,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl ReferenceEntry {
    pub fn new(descricao: impl Into<String>) -> Self {
        Self {
            descricao: descricao.into(),
            attributes: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    /// An attribute as a lookup key; empty values count as absent.
    pub fn key_attr(&self, key: &str) -> Option<String> {
        self.attributes.get(key).and_then(lookup_key)
    }
}

pub type ReferenceTable = HashMap<String, ReferenceEntry>;

#[derive(Debug, Clone, Default)]
pub struct ReferenceCache {
    tables: HashMap<String, ReferenceTable>,
}

impl ReferenceCache {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_tables(tables: HashMap<String, ReferenceTable>) -> Self {
        let cache = Self { tables };
        for (category, table) in &cache.tables {
            tracing::info!("Loaded {} reference entries for {}", table.len(), category);
        }
        cache
    }

    /// Loads a JSON snapshot shaped `{ "category": { "id": { "descricao": ..., ... } } }`.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading reference file {}", path.display()))?;
        let tables: HashMap<String, ReferenceTable> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing reference file {}", path.display()))?;
        Ok(Self::from_tables(tables))
    }

    pub fn is_empty(&self) -> bool {
        self.tables.values().all(|table| table.is_empty())
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.tables.contains_key(category)
    }

    pub fn get(&self, category: &str, id: &str) -> Option<&ReferenceEntry> {
        self.tables.get(category).and_then(|table| table.get(id))
    }

    /// `{id, descricao}` for `id` in `category`, if both exist.
    pub fn describe(&self, category: &str, id: &str) -> Option<Value> {
        self.get(category, id).map(|entry| {
            let mut out = Map::new();
            out.insert("id".to_string(), Value::String(id.to_string()));
            out.insert("descricao".to_string(), Value::String(entry.descricao.clone()));
            Value::Object(out)
        })
    }

    /// Expands a coded value into its reference object.
    ///
    /// Unknown ids (and unknown categories) come back as `{ "id": <raw> }`.
    /// `modelo` resolves its brand, model group and segments;
    /// `sub_segmento_veiculo` resolves its parent segment.
    pub fn enriched(&self, category: &str, raw: &Value) -> Value {
        let mut out = Map::new();
        out.insert("id".to_string(), raw.clone());

        let Some(entry) = lookup_key(raw).and_then(|id| self.get(category, &id)) else {
            return Value::Object(out);
        };

        out.insert("descricao".to_string(), Value::String(entry.descricao.clone()));

        match category {
            "modelo" => {
                for (attr, parent, field) in [
                    ("fk_marca", "marca", "marca"),
                    ("fk_grupo_modelo_veiculo", "grupo_modelo", "grupo_modelo"),
                    ("fk_segmento", "segmento_veiculo", "segmento_veiculo"),
                    ("fk_sub_segmento", "sub_segmento_veiculo", "sub_segmento_veiculo"),
                ] {
                    if let Some(parent_value) = entry
                        .key_attr(attr)
                        .and_then(|id| self.describe(parent, &id))
                    {
                        out.insert(field.to_string(), parent_value);
                    }
                }
            }
            "sub_segmento_veiculo" => {
                if let Some(segment) = entry
                    .key_attr("fk_segmento_veiculo")
                    .and_then(|id| self.describe("segmento_veiculo", &id))
                {
                    out.insert("segmento_veiculo".to_string(), segment);
                }
            }
            _ => {
                for (key, value) in &entry.attributes {
                    out.insert(key.clone(), value.clone());
                }
            }
        }

        Value::Object(out)
    }
}

/// Reference ids are strings; numeric codes are looked up by their text.
/// Null, empty, zero and `false` count as "no code".
pub fn lookup_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}

use super::cache::{ReferenceCache, lookup_key};
use crate::executor::types::Record;

use serde_json::{Map, Value};

/// Vehicle columns expanded directly from one reference category.
const DIRECT_FIELDS: [(&str, &str); 9] = [
    ("municipio", "municipio"),
    ("marca_modelo", "modelo"),
    ("combustivel", "combustivel"),
    ("cor_veiculo", "cor"),
    ("tipo_veiculo", "tipo_veiculo"),
    ("carroceria", "carroceria"),
    ("especie_veiculo", "especie_veiculo"),
    ("nacionalidade", "nacionalidade"),
    ("restricao_1", "restricoes"),
];

/// Columns that use their own code when present and otherwise inherit the
/// value resolved through `marca_modelo`.
const MODEL_DERIVED_FIELDS: [(&str, &str, &str); 3] = [
    ("segmento_veiculo", "segmento_veiculo", "segmento_veiculo"),
    ("sub_segmento_veiculo", "sub_segmento_veiculo", "sub_segmento_veiculo"),
    ("grupo_modelo_veiculo", "grupo_modelo", "grupo_modelo"),
];

/// IBGE macro-region of each federative unit: (UF, region code, region name).
const UF_REGIONS: [(&str, &str, &str); 27] = [
    ("AC", "1", "Norte"),
    ("AM", "1", "Norte"),
    ("AP", "1", "Norte"),
    ("PA", "1", "Norte"),
    ("RO", "1", "Norte"),
    ("RR", "1", "Norte"),
    ("TO", "1", "Norte"),
    ("AL", "2", "Nordeste"),
    ("BA", "2", "Nordeste"),
    ("CE", "2", "Nordeste"),
    ("MA", "2", "Nordeste"),
    ("PB", "2", "Nordeste"),
    ("PE", "2", "Nordeste"),
    ("PI", "2", "Nordeste"),
    ("RN", "2", "Nordeste"),
    ("SE", "2", "Nordeste"),
    ("ES", "3", "Sudeste"),
    ("MG", "3", "Sudeste"),
    ("RJ", "3", "Sudeste"),
    ("SP", "3", "Sudeste"),
    ("PR", "4", "Sul"),
    ("RS", "4", "Sul"),
    ("SC", "4", "Sul"),
    ("DF", "5", "Centro-Oeste"),
    ("GO", "5", "Centro-Oeste"),
    ("MS", "5", "Centro-Oeste"),
    ("MT", "5", "Centro-Oeste"),
];

/// Region object for a UF. The `regiao` reference table, when loaded, wins
/// over the built-in names; an unknown UF maps to itself.
pub fn region_for_uf(cache: &ReferenceCache, uf: &str) -> Value {
    let uf = uf.trim().to_uppercase();
    let Some((_, code, name)) = UF_REGIONS.iter().find(|(known, _, _)| *known == uf) else {
        return region_value(&uf, &uf);
    };

    match cache.get("regiao", code) {
        Some(entry) => region_value(code, &entry.descricao),
        None => region_value(code, name),
    }
}

fn region_value(id: &str, descricao: &str) -> Value {
    let mut out = Map::new();
    out.insert("id".to_string(), Value::String(id.to_string()));
    out.insert("descricao".to_string(), Value::String(descricao.to_string()));
    Value::Object(out)
}

/// Replaces coded vehicle columns with reference objects.
///
/// Columns with no code (null, empty, zero) are left as they are. The record
/// is returned unchanged when the cache holds no data at all.
pub fn enrich_vehicle(cache: &ReferenceCache, mut record: Record) -> Record {
    if cache.is_empty() {
        return record;
    }

    for (field, category) in DIRECT_FIELDS {
        let Some(raw) = record.get(field) else {
            continue;
        };
        if lookup_key(raw).is_none() {
            continue;
        }
        let enriched = cache.enriched(category, raw);
        record.insert(field.to_string(), enriched);
    }

    for (field, category, model_key) in MODEL_DERIVED_FIELDS {
        let own = record.get(field).filter(|raw| lookup_key(raw).is_some());
        let value = match own {
            Some(raw) => Some(cache.enriched(category, raw)),
            None => record
                .get("marca_modelo")
                .and_then(|modelo| modelo.get(model_key))
                .cloned(),
        };
        if let Some(value) = value {
            record.insert(field.to_string(), value);
        }
    }

    if let Some(Value::Object(municipio)) = record.get_mut("municipio") {
        let uf = municipio
            .get("uf")
            .and_then(Value::as_str)
            .map(str::to_string);
        if let Some(uf) = uf.filter(|uf| !uf.trim().is_empty()) {
            municipio.insert("regiao".to_string(), region_for_uf(cache, &uf));
        }
    }

    record
}

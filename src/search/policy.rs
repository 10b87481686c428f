//! Access-level field filtering.
//!
//! Each dataset has a fixed list of fields for `basic` and for `medium`;
//! `advanced` returns records untouched. The lists only ever grow from
//! `basic` to `medium`.

use super::types::SearchError;
use crate::datasets::DatasetId;
use crate::executor::types::Record;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    #[default]
    Basic,
    Medium,
    Advanced,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Basic => "basic",
            AccessLevel::Medium => "medium",
            AccessLevel::Advanced => "advanced",
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessLevel {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic" => Ok(AccessLevel::Basic),
            "medium" => Ok(AccessLevel::Medium),
            "advanced" => Ok(AccessLevel::Advanced),
            other => Err(SearchError::validation(format!(
                "unknown access level: {}",
                other
            ))),
        }
    }
}

/// Field lists of one dataset.
#[derive(Debug, Clone, Copy)]
pub struct FieldMapping {
    pub basic: &'static [&'static str],
    pub medium: &'static [&'static str],
}

const CONTATOS: FieldMapping = FieldMapping {
    basic: &["cpf", "nome", "ddd", "fone"],
    medium: &["cpf", "nome", "pessoa", "ddd", "fone"],
};

const SCORES: FieldMapping = FieldMapping {
    basic: &["cpf_consulta", "score_risco_csb"],
    medium: &["cpf_consulta", "score_risco_csb", "nivel_risco_descricao"],
};

const CADSUS: FieldMapping = FieldMapping {
    basic: &["cpf", "mae", "telefone"],
    medium: &[
        "cpf", "pai", "mae", "municipio", "telefone", "cep", "logradouro",
    ],
};

const FOTORJ: FieldMapping = FieldMapping {
    basic: &["cpf", "nome", "data_nascimento"],
    medium: &[
        "cpf",
        "nome",
        "data_nascimento",
        "nome_mae",
        "rg",
        "foto_base64",
    ],
};

const VEICULOS: FieldMapping = FieldMapping {
    basic: &[
        "placa",
        "marca_modelo",
        "ano_fabricacao",
        "ano_modelo",
        "cor_veiculo",
        "municipio",
        "uf_placa",
    ],
    medium: &[
        "placa",
        "chassi",
        "marca_modelo",
        "ano_fabricacao",
        "ano_modelo",
        "cor_veiculo",
        "municipio",
        "uf_placa",
        "combustivel",
        "potencia",
        "cilindradas",
        "motor",
        "situacao_veiculo",
        "restricao_1",
    ],
};

const TELEFONETIM: FieldMapping = FieldMapping {
    basic: &["DOC", "NOME", "DDD", "TEL"],
    medium: &[
        "DOC", "NOME", "DDD", "TEL", "LOGRAD", "NUM", "BAIRRO", "CIDADE", "UF", "CEP",
    ],
};

const CREDILINK: FieldMapping = FieldMapping {
    basic: &["CPF", "NOME", "CEP", "CIDADE"],
    medium: &[
        "CPF",
        "NOME",
        "LOGRADOURO",
        "NUMERO",
        "BAIRRO",
        "CIDADE",
        "UF",
        "CEP",
        "DT_NASCIMENTO",
        "NOME_MAE",
        "TELEFONES",
    ],
};

const DBCPFSIMPLES: FieldMapping = FieldMapping {
    basic: &["cpf", "nome_completo"],
    medium: &["cpf", "nome_completo", "sexo_genero", "data_nascimento"],
};

pub fn mapping(dataset: DatasetId) -> FieldMapping {
    match dataset {
        DatasetId::Contatos | DatasetId::Telefoneclaro => CONTATOS,
        DatasetId::Scores => SCORES,
        DatasetId::Cadsus => CADSUS,
        DatasetId::Fotorj => FOTORJ,
        DatasetId::Veiculos => VEICULOS,
        DatasetId::Telefonetim => TELEFONETIM,
        DatasetId::Credilink => CREDILINK,
        DatasetId::Dbcpfsimples => DBCPFSIMPLES,
    }
}

/// Fields `level` may see, or `None` for everything.
pub fn allowed_fields(dataset: DatasetId, level: AccessLevel) -> Option<&'static [&'static str]> {
    let mapping = mapping(dataset);
    match level {
        AccessLevel::Basic => Some(mapping.basic),
        AccessLevel::Medium => Some(mapping.medium),
        AccessLevel::Advanced => None,
    }
}

/// Projects `record` onto the fields `level` may see. Returns `None` when
/// nothing survives.
pub fn filter_record(dataset: DatasetId, level: AccessLevel, record: Record) -> Option<Record> {
    let filtered = match allowed_fields(dataset, level) {
        None => record,
        Some(fields) => {
            let mut record = record;
            fields
                .iter()
                .filter_map(|field| record.remove(*field).map(|value| (field.to_string(), value)))
                .collect()
        }
    };

    if filtered.is_empty() {
        None
    } else {
        Some(filtered)
    }
}

/// Filters every record; records left empty are dropped.
pub fn filter_records(dataset: DatasetId, level: AccessLevel, records: Vec<Record>) -> Vec<Record> {
    records
        .into_iter()
        .filter_map(|record| filter_record(dataset, level, record))
        .collect()
}

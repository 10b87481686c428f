use crate::executor::types::{PoolError, Record};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Dataset name to its surviving records, in dataset order.
pub type SearchResults = BTreeMap<String, Vec<Record>>;

/// The lookups the orchestrator offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchKind {
    NameOrCpf,
    Cpf,
    Phone,
    Cep,
    Placa,
    PlacaAntiga,
    PlacaNova,
    Chassi,
    Mae,
    FamiliaresIrmaos,
    Rg,
    PhotoByCpf,
    ScoreByCpf,
}

impl SearchKind {
    pub const ALL: [SearchKind; 13] = [
        SearchKind::NameOrCpf,
        SearchKind::Cpf,
        SearchKind::Phone,
        SearchKind::Cep,
        SearchKind::Placa,
        SearchKind::PlacaAntiga,
        SearchKind::PlacaNova,
        SearchKind::Chassi,
        SearchKind::Mae,
        SearchKind::FamiliaresIrmaos,
        SearchKind::Rg,
        SearchKind::PhotoByCpf,
        SearchKind::ScoreByCpf,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchKind::NameOrCpf => "name_or_cpf",
            SearchKind::Cpf => "cpf",
            SearchKind::Phone => "phone",
            SearchKind::Cep => "cep",
            SearchKind::Placa => "placa",
            SearchKind::PlacaAntiga => "placa_antiga",
            SearchKind::PlacaNova => "placa_nova",
            SearchKind::Chassi => "chassi",
            SearchKind::Mae => "mae",
            SearchKind::FamiliaresIrmaos => "familiares_irmaos",
            SearchKind::Rg => "rg",
            SearchKind::PhotoByCpf => "photo_by_cpf",
            SearchKind::ScoreByCpf => "score_by_cpf",
        }
    }
}

impl fmt::Display for SearchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchKind {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        SearchKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| SearchError::Validation(format!("unknown search type: {}", s)))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The input or the access level is malformed. Nothing was dispatched.
    #[error("invalid search: {0}")]
    Validation(String),
    #[error(transparent)]
    Pool(#[from] PoolError),
}

impl SearchError {
    pub fn validation(message: impl Into<String>) -> Self {
        SearchError::Validation(message.into())
    }

    /// HTTP status the excluded web layer maps this error to.
    pub fn status_code(&self) -> u16 {
        match self {
            SearchError::Validation(_) => 400,
            SearchError::Pool(_) => 500,
        }
    }
}

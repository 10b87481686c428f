use super::{DatasetClient, contains_pattern};
use crate::executor::types::{BindValues, PoolError, Record};

const FIND_BY_CPF: &str = "SELECT * FROM ${mainTable} WHERE cpf = ?";
const FIND_BY_MAE: &str = "SELECT * FROM ${mainTable} WHERE mae LIKE ? COLLATE NOCASE";
const FIND_BY_RG: &str = "SELECT * FROM ${mainTable} WHERE rgNumero = ?";
// Stored phones carry separators; compare on digits only.
const FIND_BY_PHONE: &str = "SELECT * FROM ${mainTable} WHERE \
     REPLACE(REPLACE(REPLACE(telefone, ':', ''), '-', ''), ' ', '') = ? \
     OR REPLACE(REPLACE(REPLACE(telefoneSecundario, ':', ''), '-', ''), ' ', '') = ?";

/// Civil health registry (CADSUS).
#[derive(Clone)]
pub struct CadsusDb {
    client: DatasetClient,
}

impl CadsusDb {
    pub fn new(client: DatasetClient) -> Self {
        Self { client }
    }

    pub async fn find_by_cpf(&self, cpf: &str) -> Result<Vec<Record>, PoolError> {
        self.client
            .query(FIND_BY_CPF, BindValues::positional([cpf]))
            .await
    }

    pub async fn find_by_mae(&self, mae: &str) -> Result<Vec<Record>, PoolError> {
        self.client
            .query(FIND_BY_MAE, BindValues::positional([contains_pattern(mae)]))
            .await
    }

    pub async fn find_by_rg(&self, rg: &str) -> Result<Vec<Record>, PoolError> {
        self.client
            .query(FIND_BY_RG, BindValues::positional([rg]))
            .await
    }

    /// `phone` is the full number, digits only, DDD included.
    pub async fn find_by_phone(&self, phone: &str) -> Result<Vec<Record>, PoolError> {
        self.client
            .query(FIND_BY_PHONE, BindValues::positional([phone, phone]))
            .await
    }
}

use super::{DatasetClient, fts};
use crate::executor::types::{BindValues, PoolError, Record};

const FIND_BY_CPF: &str =
    "SELECT cpf, nome, data_nascimento, nome_mae, rg FROM ${mainTable} WHERE cpf = ?";
const FIND_BY_CPF_WITH_PHOTO: &str = "SELECT cpf, nome, data_nascimento, nome_mae, rg, foto_base64 \
     FROM ${mainTable} WHERE cpf = ?";
const FIND_BY_NAME: &str = "SELECT f.* FROM ${mainTable} f \
     JOIN ${ftsTable} fts ON f.rowid = fts.rowid WHERE fts.nome MATCH ?";
const FIND_BY_MAE: &str = "SELECT f.* FROM ${mainTable} f \
     JOIN ${ftsTable} fts ON f.rowid = fts.rowid WHERE fts.nome_mae MATCH ?";
const FIND_BY_RG: &str =
    "SELECT cpf, nome, data_nascimento, nome_mae, rg FROM ${mainTable} WHERE rg = ?";

/// Identity photo registry. Photos are only returned by
/// [`FotorjDb::find_by_cpf_with_photo`].
#[derive(Clone)]
pub struct FotorjDb {
    client: DatasetClient,
}

impl FotorjDb {
    pub fn new(client: DatasetClient) -> Self {
        Self { client }
    }

    pub async fn find_by_cpf(&self, cpf: &str) -> Result<Vec<Record>, PoolError> {
        self.client
            .query(FIND_BY_CPF, BindValues::positional([cpf]))
            .await
    }

    pub async fn find_by_cpf_with_photo(&self, cpf: &str) -> Result<Option<Record>, PoolError> {
        self.client
            .query_one(FIND_BY_CPF_WITH_PHOTO, BindValues::positional([cpf]))
            .await
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Vec<Record>, PoolError> {
        let Some(expr) = fts::prefix_match(name) else {
            return Ok(Vec::new());
        };
        self.client
            .query(FIND_BY_NAME, BindValues::positional([expr]))
            .await
    }

    pub async fn find_by_mae(&self, mae: &str) -> Result<Vec<Record>, PoolError> {
        let Some(expr) = fts::prefix_match(mae) else {
            return Ok(Vec::new());
        };
        self.client
            .query(FIND_BY_MAE, BindValues::positional([expr]))
            .await
    }

    pub async fn find_by_rg(&self, rg: &str) -> Result<Vec<Record>, PoolError> {
        self.client
            .query(FIND_BY_RG, BindValues::positional([rg]))
            .await
    }
}

use super::{DatasetClient, fts};
use crate::executor::types::{BindValues, PoolError, Record};

const FIND_BY_CPF: &str = "SELECT * FROM ${mainTable} WHERE cpf = ?";
const FIND_BY_NAME: &str = "SELECT t.* FROM ${mainTable} t \
     JOIN ${ftsTable} fts ON t.rowid = fts.rowid WHERE fts.nome MATCH ?";
const FIND_BY_PHONE: &str = "SELECT * FROM ${mainTable} WHERE ddd = ? AND fone = ?";

/// Claro carrier subscribers.
#[derive(Clone)]
pub struct TelefoneClaroDb {
    client: DatasetClient,
}

impl TelefoneClaroDb {
    pub fn new(client: DatasetClient) -> Self {
        Self { client }
    }

    pub async fn find_by_cpf(&self, cpf: &str) -> Result<Vec<Record>, PoolError> {
        self.client
            .query(FIND_BY_CPF, BindValues::positional([cpf]))
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

    pub async fn find_by_phone(&self, ddd: &str, fone: &str) -> Result<Vec<Record>, PoolError> {
        self.client
            .query(FIND_BY_PHONE, BindValues::positional([ddd, fone]))
            .await
    }
}

use super::{DatasetClient, contains_pattern};
use crate::executor::types::{BindValues, PoolError, Record};

const FIND_BY_CPF: &str = "SELECT * FROM ${mainTable} WHERE cpf = ?";
const FIND_BY_NAME: &str =
    "SELECT * FROM ${mainTable} WHERE nome_completo LIKE ? COLLATE NOCASE";

#[derive(Clone)]
pub struct DbCpfSimplesDb {
    client: DatasetClient,
}

impl DbCpfSimplesDb {
    pub fn new(client: DatasetClient) -> Self {
        Self { client }
    }

    pub async fn find_by_cpf(&self, cpf: &str) -> Result<Vec<Record>, PoolError> {
        self.client
            .query(FIND_BY_CPF, BindValues::positional([cpf]))
            .await
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Vec<Record>, PoolError> {
        self.client
            .query(FIND_BY_NAME, BindValues::positional([contains_pattern(name)]))
            .await
    }
}

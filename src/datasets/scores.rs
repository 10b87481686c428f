use super::DatasetClient;
use crate::executor::types::{BindValues, PoolError, Record};

const FIND_BY_CPF: &str = "SELECT * FROM ${mainTable} WHERE cpf_consulta = ?";

#[derive(Clone)]
pub struct ScoresDb {
    client: DatasetClient,
}

impl ScoresDb {
    pub fn new(client: DatasetClient) -> Self {
        Self { client }
    }

    pub async fn find_by_cpf(&self, cpf: &str) -> Result<Vec<Record>, PoolError> {
        self.client
            .query(FIND_BY_CPF, BindValues::positional([cpf]))
            .await
    }
}

use super::{DatasetClient, fts};
use crate::executor::types::{BindValues, PoolError, Record};

const FIND_BY_CPF: &str = "SELECT * FROM ${mainTable} WHERE DOC = ?";
const FIND_BY_NAME: &str = "SELECT t.* FROM ${mainTable} t \
     JOIN ${ftsTable} fts ON t.rowid = fts.rowid WHERE fts.NOME MATCH ?";
const FIND_BY_PHONE: &str = "SELECT * FROM ${mainTable} WHERE DDD = ? AND TEL = ?";
const FIND_BY_CEP: &str = "SELECT * FROM ${mainTable} WHERE CEP = ?";

/// TIM carrier subscribers. Columns are upper case.
#[derive(Clone)]
pub struct TelefoneTimDb {
    client: DatasetClient,
}

impl TelefoneTimDb {
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

    pub async fn find_by_phone(&self, ddd: &str, tel: &str) -> Result<Vec<Record>, PoolError> {
        self.client
            .query(FIND_BY_PHONE, BindValues::positional([ddd, tel]))
            .await
    }

    pub async fn find_by_cep(&self, cep: &str) -> Result<Vec<Record>, PoolError> {
        self.client
            .query(FIND_BY_CEP, BindValues::positional([cep]))
            .await
    }
}

use super::{DatasetClient, contains_pattern, fts};
use crate::executor::types::{BindValues, PoolError, Record};

// The file also holds a `telefone` side table, so the main table is named
// explicitly instead of discovered.
const FIND_BY_CPF: &str = "SELECT b.*, \
     (SELECT GROUP_CONCAT(t.TELEFONES, ', ') FROM telefone t WHERE t.CPF = b.CPF) AS TELEFONES \
     FROM credilink_basic b WHERE b.CPF = ?";
const FIND_BY_NAME: &str = "SELECT main.* FROM credilink_basic main \
     JOIN ${ftsTable} fts ON main.rowid = fts.rowid \
     WHERE fts.NOME MATCH ? LIMIT 50";
const FIND_BY_MAE: &str = "SELECT * FROM credilink_basic WHERE NOME_MAE LIKE ? COLLATE NOCASE";
const FIND_BY_CEP: &str = "SELECT * FROM credilink_basic WHERE CEP = ?";
const FIND_BY_PHONE: &str = "SELECT CPF, TELEFONES FROM telefone WHERE TELEFONES = ?";

/// Credit bureau records plus their phone side table.
#[derive(Clone)]
pub struct CredilinkDb {
    client: DatasetClient,
}

impl CredilinkDb {
    pub fn new(client: DatasetClient) -> Self {
        Self { client }
    }

    /// Person rows with every known phone joined into `TELEFONES`.
    pub async fn find_by_cpf(&self, cpf: &str) -> Result<Vec<Record>, PoolError> {
        self.client
            .query(FIND_BY_CPF, BindValues::positional([cpf]))
            .await
    }

    /// At most 50 rows.
    pub async fn find_by_name(&self, name: &str) -> Result<Vec<Record>, PoolError> {
        let Some(expr) = fts::prefix_match(name) else {
            return Ok(Vec::new());
        };
        self.client
            .query(FIND_BY_NAME, BindValues::positional([expr]))
            .await
    }

    pub async fn find_by_mae(&self, mae: &str) -> Result<Vec<Record>, PoolError> {
        self.client
            .query(FIND_BY_MAE, BindValues::positional([contains_pattern(mae)]))
            .await
    }

    pub async fn find_by_cep(&self, cep: &str) -> Result<Vec<Record>, PoolError> {
        self.client
            .query(FIND_BY_CEP, BindValues::positional([cep]))
            .await
    }

    /// `CPF`/`TELEFONES` pairs from the phone side table.
    pub async fn find_by_phone(&self, phone: &str) -> Result<Vec<Record>, PoolError> {
        self.client
            .query(FIND_BY_PHONE, BindValues::positional([phone]))
            .await
    }
}

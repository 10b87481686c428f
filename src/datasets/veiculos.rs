use super::DatasetClient;
use crate::executor::types::{BindValues, PoolError, Record};

const FIND_BY_PLACA: &str = "SELECT * FROM ${mainTable} WHERE placa = ?";
const FIND_BY_PLACA_ANTIGA: &str = "SELECT * FROM ${mainTable} WHERE placa_modelo_antigo = ?";
const FIND_BY_PLACA_NOVA: &str = "SELECT * FROM ${mainTable} WHERE placa_modelo_novo = ?";
const FIND_BY_CHASSI: &str = "SELECT * FROM ${mainTable} WHERE chassi = ?";

/// Vehicle registry. Coded columns (`marca_modelo`, `cor_veiculo`, ...) come
/// back raw; see [`crate::reference::enrich`].
#[derive(Clone)]
pub struct VeiculosDb {
    client: DatasetClient,
}

impl VeiculosDb {
    pub fn new(client: DatasetClient) -> Self {
        Self { client }
    }

    pub async fn find_by_placa(&self, placa: &str) -> Result<Vec<Record>, PoolError> {
        self.client
            .query(FIND_BY_PLACA, BindValues::positional([placa]))
            .await
    }

    pub async fn find_by_placa_antiga(&self, placa: &str) -> Result<Vec<Record>, PoolError> {
        self.client
            .query(FIND_BY_PLACA_ANTIGA, BindValues::positional([placa]))
            .await
    }

    pub async fn find_by_placa_nova(&self, placa: &str) -> Result<Vec<Record>, PoolError> {
        self.client
            .query(FIND_BY_PLACA_NOVA, BindValues::positional([placa]))
            .await
    }

    pub async fn find_by_chassi(&self, chassi: &str) -> Result<Vec<Record>, PoolError> {
        self.client
            .query(FIND_BY_CHASSI, BindValues::positional([chassi]))
            .await
    }
}

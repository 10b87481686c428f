use super::{DatasetClient, contains_pattern, fts};
use crate::executor::types::{BindValues, PoolError, Record, TaskError, TaskErrorKind};

const FIND_BY_CPF: &str = "SELECT * FROM ${mainTable} WHERE cpf = ?";
const FIND_BY_NAME: &str = "SELECT c.* FROM ${mainTable} c \
     JOIN ${ftsTable} fts ON c.rowid = fts.rowid WHERE fts.nome MATCH ?";
const FIND_BY_PHONE: &str = "SELECT * FROM ${mainTable} WHERE ddd = ? AND fone = ?";

const SEARCH_BY_CPF: &str = "SELECT * FROM ${mainTable} WHERE cpf LIKE ?";
const SEARCH_BY_NOME: &str = "SELECT * FROM ${mainTable} WHERE nome LIKE ? COLLATE NOCASE";
const SEARCH_BY_PESSOA: &str = "SELECT * FROM ${mainTable} WHERE pessoa LIKE ? COLLATE NOCASE";
const SEARCH_BY_DDD: &str = "SELECT * FROM ${mainTable} WHERE ddd LIKE ?";
const SEARCH_BY_FONE: &str = "SELECT * FROM ${mainTable} WHERE fone LIKE ?";

/// Columns [`ContatosDb::search_column`] accepts, with their statements.
pub const SEARCHABLE_COLUMNS: [(&str, &str); 5] = [
    ("cpf", SEARCH_BY_CPF),
    ("nome", SEARCH_BY_NOME),
    ("pessoa", SEARCH_BY_PESSOA),
    ("ddd", SEARCH_BY_DDD),
    ("fone", SEARCH_BY_FONE),
];

#[derive(Clone)]
pub struct ContatosDb {
    client: DatasetClient,
}

impl ContatosDb {
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

    /// Substring search on one of the [`SEARCHABLE_COLUMNS`].
    pub async fn search_column(&self, column: &str, value: &str) -> Result<Vec<Record>, PoolError> {
        let template = SEARCHABLE_COLUMNS
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, template)| *template)
            .ok_or_else(|| {
                TaskError::new(
                    TaskErrorKind::InvalidRequest,
                    format!("column {:?} is not searchable", column),
                )
            })?;

        self.client
            .query(template, BindValues::positional([contains_pattern(value)]))
            .await
    }
}

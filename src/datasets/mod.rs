//! Dataset Access Adapters
//!
//! One adapter per on-disk dataset. Each adapter knows its file name, its
//! full-text table (if any) and a closed set of statement templates; every
//! lookup is a single task submitted to the [`WorkerPool`]. Adapters never
//! open connections themselves and never retry.
//!
//! ## Submodules
//! - **`fts`**: Builds FTS5 prefix match expressions from free text.
//! - one module per dataset (`contatos`, `scores`, `cadsus`, ...).

pub mod cadsus;
pub mod contatos;
pub mod credilink;
pub mod dbcpfsimples;
pub mod fotorj;
pub mod fts;
pub mod scores;
pub mod telefoneclaro;
pub mod telefonetim;
pub mod veiculos;


use crate::executor::pool::WorkerPool;
use crate::executor::types::{BindValues, PoolError, QueryRequest, Record};

use serde::Serialize;
use std::fmt;

/// The datasets the engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetId {
    Contatos,
    Scores,
    Cadsus,
    Fotorj,
    Veiculos,
    Telefonetim,
    Credilink,
    Telefoneclaro,
    Dbcpfsimples,
}

impl DatasetId {
    pub const ALL: [DatasetId; 9] = [
        DatasetId::Contatos,
        DatasetId::Scores,
        DatasetId::Cadsus,
        DatasetId::Fotorj,
        DatasetId::Veiculos,
        DatasetId::Telefonetim,
        DatasetId::Credilink,
        DatasetId::Telefoneclaro,
        DatasetId::Dbcpfsimples,
    ];

    /// Key used for this dataset in search results.
    pub fn name(&self) -> &'static str {
        match self {
            DatasetId::Contatos => "contatos",
            DatasetId::Scores => "scores",
            DatasetId::Cadsus => "cadsus",
            DatasetId::Fotorj => "fotorj",
            DatasetId::Veiculos => "veiculos",
            DatasetId::Telefonetim => "telefonetim",
            DatasetId::Credilink => "credilink",
            DatasetId::Telefoneclaro => "telefoneclaro",
            DatasetId::Dbcpfsimples => "dbcpfsimples",
        }
    }

    /// File name inside the data directory.
    pub fn file(&self) -> &'static str {
        match self {
            DatasetId::Contatos => "contatos.db",
            DatasetId::Scores => "scores.db",
            DatasetId::Cadsus => "cadsus.sqlite",
            DatasetId::Fotorj => "fotorj.db",
            DatasetId::Veiculos => "veiculos.db",
            DatasetId::Telefonetim => "telefonetim.db",
            DatasetId::Credilink => "credilink.db",
            DatasetId::Telefoneclaro => "telefoneclaro.db",
            DatasetId::Dbcpfsimples => "dbcpfsimples.db",
        }
    }

    pub fn fts_table(&self) -> Option<&'static str> {
        match self {
            DatasetId::Contatos => Some("contatos_fts"),
            DatasetId::Fotorj => Some("fotorj_fts"),
            DatasetId::Telefonetim => Some("telefonetim_fts"),
            DatasetId::Credilink => Some("credilink_basic_fts"),
            DatasetId::Telefoneclaro => Some("telefoneclaro_fts"),
            _ => None,
        }
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shared plumbing for the adapters: turns a template plus binds into a
/// pool task for one dataset.
#[derive(Clone)]
pub struct DatasetClient {
    pool: WorkerPool,
    id: DatasetId,
}

impl DatasetClient {
    pub fn new(pool: WorkerPool, id: DatasetId) -> Self {
        Self { pool, id }
    }

    fn request(&self, request: QueryRequest) -> QueryRequest {
        match self.id.fts_table() {
            Some(fts) => request.with_fts(fts),
            None => request,
        }
    }

    /// Every matching row.
    pub async fn query(
        &self,
        template: &'static str,
        binds: BindValues,
    ) -> Result<Vec<Record>, PoolError> {
        let request = self.request(QueryRequest::all(self.id.file(), template, binds));
        Ok(self.pool.submit(request).await?.into_rows())
    }

    /// The first matching row, if any.
    pub async fn query_one(
        &self,
        template: &'static str,
        binds: BindValues,
    ) -> Result<Option<Record>, PoolError> {
        let request = self.request(QueryRequest::one(self.id.file(), template, binds));
        Ok(self.pool.submit(request).await?.into_rows().into_iter().next())
    }
}

/// Wraps `value` for a substring `LIKE` match.
pub(crate) fn contains_pattern(value: &str) -> String {
    format!("%{}%", value)
}

/// All adapters, sharing one pool.
#[derive(Clone)]
pub struct DatasetCatalog {
    pub contatos: contatos::ContatosDb,
    pub scores: scores::ScoresDb,
    pub cadsus: cadsus::CadsusDb,
    pub fotorj: fotorj::FotorjDb,
    pub veiculos: veiculos::VeiculosDb,
    pub telefonetim: telefonetim::TelefoneTimDb,
    pub credilink: credilink::CredilinkDb,
    pub telefoneclaro: telefoneclaro::TelefoneClaroDb,
    pub dbcpfsimples: dbcpfsimples::DbCpfSimplesDb,
}

impl DatasetCatalog {
    pub fn new(pool: &WorkerPool) -> Self {
        let client = |id| DatasetClient::new(pool.clone(), id);
        Self {
            contatos: contatos::ContatosDb::new(client(DatasetId::Contatos)),
            scores: scores::ScoresDb::new(client(DatasetId::Scores)),
            cadsus: cadsus::CadsusDb::new(client(DatasetId::Cadsus)),
            fotorj: fotorj::FotorjDb::new(client(DatasetId::Fotorj)),
            veiculos: veiculos::VeiculosDb::new(client(DatasetId::Veiculos)),
            telefonetim: telefonetim::TelefoneTimDb::new(client(DatasetId::Telefonetim)),
            credilink: credilink::CredilinkDb::new(client(DatasetId::Credilink)),
            telefoneclaro: telefoneclaro::TelefoneClaroDb::new(client(DatasetId::Telefoneclaro)),
            dbcpfsimples: dbcpfsimples::DbCpfSimplesDb::new(client(DatasetId::Dbcpfsimples)),
        }
    }
}

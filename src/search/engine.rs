//! Search Orchestrator
//!
//! Turns one logical search into concurrent dataset lookups and shapes the
//! merged result.
//!
//! ## Pipeline
//! 1. **Normalize/validate** the input. A malformed input fails before any
//!    lookup is submitted.
//! 2. **Fan out** one lookup per dataset, all running concurrently.
//! 3. **Shape** each dataset's rows: enrich vehicles, filter by access level,
//!    drop empty records, omit datasets with nothing left.
//!
//! A failing dataset is logged and left out; it never fails the search.

use super::normalizer::{self, PhoneNumber};
use super::policy::{self, AccessLevel};
use super::types::{SearchError, SearchKind, SearchResults};
use crate::datasets::{DatasetCatalog, DatasetId};
use crate::executor::types::{PoolError, Record};
use crate::reference::cache::ReferenceCache;
use crate::reference::enrich::enrich_vehicle;

use serde_json::Value;
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::task::JoinSet;

pub const DEFAULT_MAX_PHONE_SUBJECTS: usize = 20;

type LookupFuture = Pin<Box<dyn Future<Output = Result<Vec<Record>, PoolError>> + Send>>;

/// One pending dataset lookup of a fan-out.
struct Lookup {
    dataset: DatasetId,
    future: LookupFuture,
}

fn lookup<F>(dataset: DatasetId, future: F) -> Lookup
where
    F: Future<Output = Result<Vec<Record>, PoolError>> + Send + 'static,
{
    Lookup {
        dataset,
        future: Box::pin(future),
    }
}

#[derive(Clone)]
pub struct SearchService {
    datasets: DatasetCatalog,
    references: Arc<ReferenceCache>,
    max_phone_subjects: usize,
}

impl SearchService {
    pub fn new(datasets: DatasetCatalog, references: Arc<ReferenceCache>) -> Self {
        Self {
            datasets,
            references,
            max_phone_subjects: DEFAULT_MAX_PHONE_SUBJECTS,
        }
    }

    /// Caps how many subjects a credit-bureau phone match is expanded to.
    pub fn with_max_phone_subjects(mut self, max: usize) -> Self {
        self.max_phone_subjects = max.max(1);
        self
    }

    /// Runs `kind` on `input`.
    pub async fn search(
        &self,
        kind: SearchKind,
        input: &str,
        level: AccessLevel,
    ) -> Result<SearchResults, SearchError> {
        match kind {
            SearchKind::NameOrCpf => self.search_by_name_or_cpf(input, level).await,
            SearchKind::Cpf => self.search_by_cpf(input, level).await,
            SearchKind::Phone => self.search_by_phone(input, level).await,
            SearchKind::Cep => self.search_by_cep(input, level).await,
            SearchKind::Placa => self.search_by_placa(input, level).await,
            SearchKind::PlacaAntiga => self.search_by_placa_antiga(input, level).await,
            SearchKind::PlacaNova => self.search_by_placa_nova(input, level).await,
            SearchKind::Chassi => self.search_by_chassi(input, level).await,
            SearchKind::Mae => self.search_by_mae(input, level).await,
            SearchKind::FamiliaresIrmaos => self.search_familiares_irmaos(input, level).await,
            SearchKind::Rg => self.search_by_rg(input, level).await,
            SearchKind::PhotoByCpf => self.search_photo_by_cpf(input, level).await,
            SearchKind::ScoreByCpf => self.search_score_by_cpf(input, level).await,
        }
    }

    /// CPF fan-out (with photo) for an 11-digit input, name search otherwise.
    pub async fn search_by_name_or_cpf(
        &self,
        input: &str,
        level: AccessLevel,
    ) -> Result<SearchResults, SearchError> {
        if normalizer::is_cpf(input) {
            let cpf = normalizer::normalize_cpf(input)?;
            let lookups = self.cpf_lookups(&cpf, true);
            return self.fan_out(lookups, level).await;
        }

        let name = normalizer::normalize_name(input)?;
        let db = &self.datasets;

        let credilink = db.credilink.clone();
        let contatos = db.contatos.clone();
        let fotorj = db.fotorj.clone();
        let tim = db.telefonetim.clone();
        let claro = db.telefoneclaro.clone();
        let simples = db.dbcpfsimples.clone();

        let lookups = vec![
            lookup(DatasetId::Credilink, {
                let name = name.clone();
                async move { credilink.find_by_name(&name).await }
            }),
            lookup(DatasetId::Contatos, {
                let name = name.clone();
                async move { contatos.find_by_name(&name).await }
            }),
            lookup(DatasetId::Fotorj, {
                let name = name.clone();
                async move { fotorj.find_by_name(&name).await }
            }),
            lookup(DatasetId::Telefonetim, {
                let name = name.clone();
                async move { tim.find_by_name(&name).await }
            }),
            lookup(DatasetId::Telefoneclaro, {
                let name = name.clone();
                async move { claro.find_by_name(&name).await }
            }),
            lookup(DatasetId::Dbcpfsimples, async move {
                simples.find_by_name(&name).await
            }),
        ];

        self.fan_out(lookups, level).await
    }

    pub async fn search_by_cpf(
        &self,
        input: &str,
        level: AccessLevel,
    ) -> Result<SearchResults, SearchError> {
        let cpf = normalizer::normalize_cpf(input)?;
        let lookups = self.cpf_lookups(&cpf, false);
        self.fan_out(lookups, level).await
    }

    fn cpf_lookups(&self, cpf: &str, with_photo: bool) -> Vec<Lookup> {
        let db = &self.datasets;
        let cpf = cpf.to_string();

        let contatos = db.contatos.clone();
        let credilink = db.credilink.clone();
        let tim = db.telefonetim.clone();
        let claro = db.telefoneclaro.clone();
        let simples = db.dbcpfsimples.clone();
        let cadsus = db.cadsus.clone();
        let fotorj = db.fotorj.clone();
        let scores = db.scores.clone();

        vec![
            lookup(DatasetId::Contatos, {
                let cpf = cpf.clone();
                async move { contatos.find_by_cpf(&cpf).await }
            }),
            lookup(DatasetId::Credilink, {
                let cpf = cpf.clone();
                async move { credilink.find_by_cpf(&cpf).await }
            }),
            lookup(DatasetId::Telefonetim, {
                let cpf = cpf.clone();
                async move { tim.find_by_cpf(&cpf).await }
            }),
            lookup(DatasetId::Telefoneclaro, {
                let cpf = cpf.clone();
                async move { claro.find_by_cpf(&cpf).await }
            }),
            lookup(DatasetId::Dbcpfsimples, {
                let cpf = cpf.clone();
                async move { simples.find_by_cpf(&cpf).await }
            }),
            lookup(DatasetId::Cadsus, {
                let cpf = cpf.clone();
                async move { cadsus.find_by_cpf(&cpf).await }
            }),
            lookup(DatasetId::Fotorj, {
                let cpf = cpf.clone();
                async move {
                    if with_photo {
                        let row = fotorj.find_by_cpf_with_photo(&cpf).await?;
                        Ok::<Vec<Record>, PoolError>(row.into_iter().collect())
                    } else {
                        fotorj.find_by_cpf(&cpf).await
                    }
                }
            }),
            lookup(DatasetId::Scores, async move { scores.find_by_cpf(&cpf).await }),
        ]
    }

    pub async fn search_by_phone(
        &self,
        input: &str,
        level: AccessLevel,
    ) -> Result<SearchResults, SearchError> {
        let phone = normalizer::normalize_phone(input)?;
        let db = &self.datasets;

        let tim = db.telefonetim.clone();
        let claro = db.telefoneclaro.clone();
        let contatos = db.contatos.clone();
        let cadsus = db.cadsus.clone();

        let lookups = vec![
            lookup(DatasetId::Telefonetim, {
                let PhoneNumber { ddd, number, .. } = phone.clone();
                async move { tim.find_by_phone(&ddd, &number).await }
            }),
            lookup(DatasetId::Telefoneclaro, {
                let PhoneNumber { ddd, number, .. } = phone.clone();
                async move { claro.find_by_phone(&ddd, &number).await }
            }),
            lookup(DatasetId::Contatos, {
                let PhoneNumber { ddd, number, .. } = phone.clone();
                async move { contatos.find_by_phone(&ddd, &number).await }
            }),
            lookup(DatasetId::Cadsus, {
                let full = phone.full.clone();
                async move { cadsus.find_by_phone(&full).await }
            }),
            lookup(DatasetId::Credilink, self.credilink_by_phone(phone.full)),
        ];

        self.fan_out(lookups, level).await
    }

    /// Phone to subject CPFs, then each CPF to its full record, tagged with
    /// the matched phone.
    fn credilink_by_phone(
        &self,
        phone: String,
    ) -> impl Future<Output = Result<Vec<Record>, PoolError>> + Send + 'static {
        let credilink = self.datasets.credilink.clone();
        let max_subjects = self.max_phone_subjects;

        async move {
            let hits = credilink.find_by_phone(&phone).await?;

            let mut seen = HashSet::new();
            let mut subjects: Vec<(String, Value)> = Vec::new();
            for hit in hits {
                let Some(cpf) = hit.get("CPF").and_then(value_as_key) else {
                    continue;
                };
                if seen.insert(cpf.clone()) {
                    let phones = hit.get("TELEFONES").cloned().unwrap_or(Value::Null);
                    subjects.push((cpf, phones));
                }
            }

            if subjects.len() > max_subjects {
                tracing::warn!(
                    "Phone {} matches {} credilink subjects, keeping the first {}",
                    phone,
                    subjects.len(),
                    max_subjects
                );
                subjects.truncate(max_subjects);
            }

            let mut set = JoinSet::new();
            for (idx, (cpf, phones)) in subjects.into_iter().enumerate() {
                let credilink = credilink.clone();
                set.spawn(async move {
                    let rows = credilink.find_by_cpf(&cpf).await;
                    (idx, phones, rows)
                });
            }

            let mut expanded: Vec<(usize, Vec<Record>)> = Vec::new();
            while let Some(joined) = set.join_next().await {
                let Ok((idx, phones, rows)) = joined else {
                    tracing::warn!("Credilink subject lookup aborted");
                    continue;
                };
                let mut rows = rows?;
                for row in &mut rows {
                    row.insert("TELEFONES".to_string(), phones.clone());
                }
                expanded.push((idx, rows));
            }

            // Keep the order in which the phone table listed the subjects.
            expanded.sort_by_key(|(idx, _)| *idx);
            Ok::<Vec<Record>, PoolError>(expanded.into_iter().flat_map(|(_, rows)| rows).collect())
        }
    }

    pub async fn search_by_cep(
        &self,
        input: &str,
        level: AccessLevel,
    ) -> Result<SearchResults, SearchError> {
        let cep = normalizer::normalize_cep(input)?;
        let credilink = self.datasets.credilink.clone();
        let tim = self.datasets.telefonetim.clone();

        let lookups = vec![
            lookup(DatasetId::Credilink, {
                let cep = cep.clone();
                async move { credilink.find_by_cep(&cep).await }
            }),
            lookup(DatasetId::Telefonetim, async move {
                tim.find_by_cep(&cep).await
            }),
        ];

        self.fan_out(lookups, level).await
    }

    pub async fn search_by_placa(
        &self,
        input: &str,
        level: AccessLevel,
    ) -> Result<SearchResults, SearchError> {
        let placa = normalizer::normalize_plate(input)?;
        let veiculos = self.datasets.veiculos.clone();
        let lookups = vec![lookup(DatasetId::Veiculos, async move {
            veiculos.find_by_placa(&placa).await
        })];
        self.fan_out(lookups, level).await
    }

    pub async fn search_by_placa_antiga(
        &self,
        input: &str,
        level: AccessLevel,
    ) -> Result<SearchResults, SearchError> {
        let placa = normalizer::normalize_plate(input)?;
        let veiculos = self.datasets.veiculos.clone();
        let lookups = vec![lookup(DatasetId::Veiculos, async move {
            veiculos.find_by_placa_antiga(&placa).await
        })];
        self.fan_out(lookups, level).await
    }

    pub async fn search_by_placa_nova(
        &self,
        input: &str,
        level: AccessLevel,
    ) -> Result<SearchResults, SearchError> {
        let placa = normalizer::normalize_plate(input)?;
        let veiculos = self.datasets.veiculos.clone();
        let lookups = vec![lookup(DatasetId::Veiculos, async move {
            veiculos.find_by_placa_nova(&placa).await
        })];
        self.fan_out(lookups, level).await
    }

    pub async fn search_by_chassi(
        &self,
        input: &str,
        level: AccessLevel,
    ) -> Result<SearchResults, SearchError> {
        let chassi = normalizer::normalize_plate(input)?;
        let veiculos = self.datasets.veiculos.clone();
        let lookups = vec![lookup(DatasetId::Veiculos, async move {
            veiculos.find_by_chassi(&chassi).await
        })];
        self.fan_out(lookups, level).await
    }

    pub async fn search_by_mae(
        &self,
        input: &str,
        level: AccessLevel,
    ) -> Result<SearchResults, SearchError> {
        let mae = normalizer::normalize_name(input)?;
        let lookups = self.mae_lookups(mae);
        self.fan_out(lookups, level).await
    }

    /// Siblings share a mother; same lookups as [`Self::search_by_mae`].
    pub async fn search_familiares_irmaos(
        &self,
        input: &str,
        level: AccessLevel,
    ) -> Result<SearchResults, SearchError> {
        self.search_by_mae(input, level).await
    }

    fn mae_lookups(&self, mae: String) -> Vec<Lookup> {
        let cadsus = self.datasets.cadsus.clone();
        let fotorj = self.datasets.fotorj.clone();
        let credilink = self.datasets.credilink.clone();

        vec![
            lookup(DatasetId::Cadsus, {
                let mae = mae.clone();
                async move { cadsus.find_by_mae(&mae).await }
            }),
            lookup(DatasetId::Fotorj, {
                let mae = mae.clone();
                async move { fotorj.find_by_mae(&mae).await }
            }),
            lookup(DatasetId::Credilink, async move {
                credilink.find_by_mae(&mae).await
            }),
        ]
    }

    pub async fn search_by_rg(
        &self,
        input: &str,
        level: AccessLevel,
    ) -> Result<SearchResults, SearchError> {
        let rg = normalizer::normalize_rg(input)?;
        let cadsus = self.datasets.cadsus.clone();
        let fotorj = self.datasets.fotorj.clone();

        let lookups = vec![
            lookup(DatasetId::Cadsus, {
                let rg = rg.clone();
                async move { cadsus.find_by_rg(&rg).await }
            }),
            lookup(DatasetId::Fotorj, async move { fotorj.find_by_rg(&rg).await }),
        ];

        self.fan_out(lookups, level).await
    }

    pub async fn search_photo_by_cpf(
        &self,
        input: &str,
        level: AccessLevel,
    ) -> Result<SearchResults, SearchError> {
        let cpf = normalizer::normalize_cpf(input)?;
        let fotorj = self.datasets.fotorj.clone();
        let lookups = vec![lookup(DatasetId::Fotorj, async move {
            let row = fotorj.find_by_cpf_with_photo(&cpf).await?;
            Ok::<Vec<Record>, PoolError>(row.into_iter().collect())
        })];
        self.fan_out(lookups, level).await
    }

    pub async fn search_score_by_cpf(
        &self,
        input: &str,
        level: AccessLevel,
    ) -> Result<SearchResults, SearchError> {
        let cpf = normalizer::normalize_cpf(input)?;
        let scores = self.datasets.scores.clone();
        let lookups = vec![lookup(DatasetId::Scores, async move {
            scores.find_by_cpf(&cpf).await
        })];
        self.fan_out(lookups, level).await
    }

    /// Runs every lookup concurrently and shapes what comes back.
    ///
    /// A dataset whose lookup fails is left out, except when the pool is
    /// shutting down: then the whole search fails.
    async fn fan_out(
        &self,
        lookups: Vec<Lookup>,
        level: AccessLevel,
    ) -> Result<SearchResults, SearchError> {
        let mut set = JoinSet::new();
        for Lookup { dataset, future } in lookups {
            set.spawn(async move { (dataset, future.await) });
        }

        let mut results = SearchResults::new();
        while let Some(joined) = set.join_next().await {
            let (dataset, outcome) = match joined {
                Ok(done) => done,
                Err(e) => {
                    tracing::warn!("Dataset lookup task failed: {}", e);
                    continue;
                }
            };

            let rows = match outcome {
                Ok(rows) => rows,
                Err(PoolError::ShuttingDown) => return Err(PoolError::ShuttingDown.into()),
                Err(e) => {
                    tracing::warn!("Lookup on {} failed, omitting it: {}", dataset, e);
                    continue;
                }
            };

            let records = self.shape(dataset, level, rows);
            if !records.is_empty() {
                results.insert(dataset.name().to_string(), records);
            }
        }

        Ok(results)
    }

    fn shape(&self, dataset: DatasetId, level: AccessLevel, rows: Vec<Record>) -> Vec<Record> {
        let rows = if dataset == DatasetId::Veiculos {
            rows.into_iter()
                .map(|row| enrich_vehicle(&self.references, row))
                .collect()
        } else {
            rows
        };
        policy::filter_records(dataset, level, rows)
    }
}

fn value_as_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

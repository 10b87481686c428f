//! Shared test fixtures: small SQLite copies of every dataset in a temp
//! directory, and a matching reference cache.

use crate::context::LookupContext;
use crate::executor::pool::WorkerPool;
use crate::reference::cache::{ReferenceCache, ReferenceEntry, ReferenceTable};

use rusqlite::Connection;
use std::collections::HashMap;
use std::path::Path;
use tempfile::TempDir;

pub const KNOWN_CPF: &str = "11122233344";
pub const KNOWN_PLACA: &str = "ABC1D23";

pub const CONTATOS_FIXTURE: &str = "
    CREATE TABLE contatos (cpf TEXT, nome TEXT, pessoa TEXT, ddd TEXT, fone TEXT);
    INSERT INTO contatos VALUES ('11122233344', 'NOME SILVA', 'F', '21', '999998888');
    INSERT INTO contatos VALUES ('55566677788', 'ROGERIO CASSOL', 'F', '11', '988887777');
    INSERT INTO contatos VALUES ('66677788899', 'ANA OR NOT SOUZA', 'F', '31', '911112222');
    CREATE VIRTUAL TABLE contatos_fts USING fts5(nome);
    INSERT INTO contatos_fts (rowid, nome) SELECT rowid, nome FROM contatos;
";

const SCORES: &str = "
    CREATE TABLE scores (cpf_consulta TEXT, score_risco_csb INTEGER, nivel_risco_descricao TEXT, modelo TEXT);
    INSERT INTO scores VALUES ('11122233344', 750, 'BAIXO', 'CSB8');
";

const CADSUS: &str = "
    CREATE TABLE datasus (
        cpf TEXT, nome TEXT, pai TEXT, mae TEXT, municipio TEXT, telefone TEXT,
        telefoneSecundario TEXT, cep TEXT, logradouro TEXT, rgNumero TEXT
    );
    INSERT INTO datasus VALUES (
        '11122233344', 'NOME SILVA', 'JOSE SILVA', 'MARIA DA CONCEICAO SILVA', 'RIO DE JANEIRO',
        '21 99999-8888', NULL, '20000000', 'RUA A', '123456789'
    );
";

const FOTORJ: &str = "
    CREATE TABLE pessoas (cpf TEXT, nome TEXT, data_nascimento TEXT, nome_mae TEXT, rg TEXT, foto_base64 TEXT);
    INSERT INTO pessoas VALUES ('11122233344', 'NOME SILVA', '1980-01-01', 'MARIA DA CONCEICAO SILVA', '123456789', 'aGVsbG8=');
    CREATE VIRTUAL TABLE fotorj_fts USING fts5(nome, nome_mae);
    INSERT INTO fotorj_fts (rowid, nome, nome_mae) SELECT rowid, nome, nome_mae FROM pessoas;
";

const VEICULOS: &str = "
    CREATE TABLE vehicles (
        placa TEXT, placa_modelo_antigo TEXT, placa_modelo_novo TEXT, chassi TEXT,
        marca_modelo INTEGER, ano_fabricacao INTEGER, ano_modelo INTEGER, cor_veiculo INTEGER,
        municipio INTEGER, uf_placa TEXT, combustivel INTEGER, potencia INTEGER,
        restricao_1 INTEGER, proprietario TEXT
    );
    INSERT INTO vehicles VALUES (
        'ABC1D23', 'ABC1234', 'ABC1D23', '9BWZZZ377VT004251',
        1001, 2014, 2015, 4, 7107, 'RJ', 1, 76, 0, 'NOME SILVA'
    );
";

const TELEFONETIM: &str = "
    CREATE TABLE dados (
        DOC TEXT, NOME TEXT, DDD TEXT, TEL TEXT, LOGRAD TEXT, NUM TEXT,
        BAIRRO TEXT, CIDADE TEXT, UF TEXT, CEP TEXT
    );
    INSERT INTO dados VALUES ('11122233344', 'NOME SILVA', '21', '999998888', 'RUA A', '10', 'CENTRO', 'RIO DE JANEIRO', 'RJ', '20000000');
    CREATE VIRTUAL TABLE telefonetim_fts USING fts5(NOME);
    INSERT INTO telefonetim_fts (rowid, NOME) SELECT rowid, NOME FROM dados;
";

const CREDILINK: &str = "
    CREATE TABLE credilink_basic (
        CPF TEXT, NOME TEXT, NOME_MAE TEXT, LOGRADOURO TEXT, NUMERO TEXT, BAIRRO TEXT,
        CIDADE TEXT, UF TEXT, CEP TEXT, DT_NASCIMENTO TEXT
    );
    INSERT INTO credilink_basic VALUES ('11122233344', 'NOME SILVA', 'MARIA DA CONCEICAO SILVA', 'RUA A', '10', 'CENTRO', 'RIO DE JANEIRO', 'RJ', '20000000', '1980-01-01');
    INSERT INTO credilink_basic VALUES ('22233344455', 'ANA SILVA', 'MARIA DA CONCEICAO SILVA', 'RUA B', '20', 'CENTRO', 'RIO DE JANEIRO', 'RJ', '20000001', '1985-05-05');
    CREATE TABLE telefone (CPF TEXT, TELEFONES TEXT);
    INSERT INTO telefone VALUES ('11122233344', '21999998888');
    INSERT INTO telefone VALUES ('11122233344', '2133334444');
    INSERT INTO telefone VALUES ('22233344455', '21999998888');
    CREATE VIRTUAL TABLE credilink_basic_fts USING fts5(NOME);
    INSERT INTO credilink_basic_fts (rowid, NOME) SELECT rowid, NOME FROM credilink_basic;
";

const TELEFONECLARO: &str = "
    CREATE TABLE claro (cpf TEXT, nome TEXT, pessoa TEXT, ddd TEXT, fone TEXT);
    INSERT INTO claro VALUES ('99988877766', 'OUTRA PESSOA', 'F', '31', '977776666');
    CREATE VIRTUAL TABLE telefoneclaro_fts USING fts5(nome);
    INSERT INTO telefoneclaro_fts (rowid, nome) SELECT rowid, nome FROM claro;
";

const DBCPFSIMPLES: &str = "
    CREATE TABLE pessoas (cpf TEXT, nome_completo TEXT, sexo_genero TEXT, data_nascimento TEXT);
    INSERT INTO pessoas VALUES ('11122233344', 'NOME SILVA', 'M', '1980-01-01');
";

pub const DATASET_FIXTURES: [(&str, &str); 9] = [
    ("contatos.db", CONTATOS_FIXTURE),
    ("scores.db", SCORES),
    ("cadsus.sqlite", CADSUS),
    ("fotorj.db", FOTORJ),
    ("veiculos.db", VEICULOS),
    ("telefonetim.db", TELEFONETIM),
    ("credilink.db", CREDILINK),
    ("telefoneclaro.db", TELEFONECLARO),
    ("dbcpfsimples.db", DBCPFSIMPLES),
];

pub fn create_db(dir: &Path, file: &str, sql: &str) {
    let conn = Connection::open(dir.join(file)).unwrap();
    conn.execute_batch(sql).unwrap();
}

/// A temp directory with every dataset file.
pub fn dataset_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (file, sql) in DATASET_FIXTURES {
        create_db(dir.path(), file, sql);
    }
    dir
}

fn table(entries: &[(&str, ReferenceEntry)]) -> ReferenceTable {
    entries
        .iter()
        .map(|(id, entry)| (id.to_string(), entry.clone()))
        .collect()
}

/// Reference data matching the vehicle in [`dataset_dir`].
pub fn reference_cache() -> ReferenceCache {
    let mut tables: HashMap<String, ReferenceTable> = HashMap::new();
    tables.insert(
        "modelo".into(),
        table(&[(
            "1001",
            ReferenceEntry::new("VW/GOL 1.0")
                .with("fk_marca", "10")
                .with("fk_segmento", "2")
                .with("fk_sub_segmento", "21")
                .with("fk_grupo_modelo_veiculo", "300"),
        )]),
    );
    tables.insert(
        "marca".into(),
        table(&[("10", ReferenceEntry::new("VOLKSWAGEN"))]),
    );
    tables.insert("cor".into(), table(&[("4", ReferenceEntry::new("PRATA"))]));
    tables.insert(
        "combustivel".into(),
        table(&[("1", ReferenceEntry::new("GASOLINA"))]),
    );
    tables.insert(
        "municipio".into(),
        table(&[("7107", ReferenceEntry::new("RIO DE JANEIRO").with("uf", "RJ"))]),
    );
    tables.insert(
        "segmento_veiculo".into(),
        table(&[("2", ReferenceEntry::new("AUTOMOVEL"))]),
    );
    tables.insert(
        "sub_segmento_veiculo".into(),
        table(&[(
            "21",
            ReferenceEntry::new("HATCH PEQUENO").with("fk_segmento_veiculo", "2"),
        )]),
    );
    tables.insert(
        "grupo_modelo".into(),
        table(&[("300", ReferenceEntry::new("GOL"))]),
    );
    ReferenceCache::from_tables(tables)
}

/// A full context over [`dataset_dir`]. Keep the `TempDir` alive for the
/// duration of the test.
pub fn lookup_context(pool_size: usize) -> (TempDir, LookupContext) {
    let dir = dataset_dir();
    let pool = WorkerPool::for_datasets(pool_size, dir.path()).unwrap();
    let context = LookupContext::with_parts(pool, reference_cache(), 20);
    (dir, context)
}

//! Executor Module Tests
//!
//! This module contains unit and integration tests for the worker pool.
//!
//! ## Test Scopes
//! - **Worker Executor**: Template resolution, fetch modes, row conversion and error envelopes.
//! - **Registry**: Lazy connection opening and one-time main table discovery.
//! - **Dispatcher**: FIFO order and one-task-per-worker affinity.
//! - **Pool**: Concurrency bound, crash recovery and shutdown semantics.

#[cfg(test)]
mod tests {
    use crate::executor::executor::{
        DatasetExecutor, HandlerFactory, TaskHandler, resolve_template, validate_identifier,
        value_to_json,
    };
    use crate::executor::registry::ConnectionRegistry;
    use crate::executor::pool::WorkerPool;
    use crate::executor::protocol::{ErrorEnvelope, TaskResponse};
    use crate::executor::queue::Dispatcher;
    use crate::executor::types::*;
    use crate::test_support::{create_db, dataset_dir};
    use rusqlite::types::ValueRef;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::{mpsc, oneshot};

    /// Handler that records what it ran and can be told to misbehave.
    struct FakeHandler {
        log: Arc<Mutex<Vec<&'static str>>>,
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        dropped: Arc<AtomicUsize>,
        delay: Duration,
    }

    impl Drop for FakeHandler {
        fn drop(&mut self) {
            self.dropped.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl TaskHandler for FakeHandler {
        fn execute(&mut self, request: &QueryRequest) -> Result<QueryOutput, TaskError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            self.log.lock().unwrap().push(request.template);
            std::thread::sleep(self.delay);
            if request.template == "slow" {
                std::thread::sleep(Duration::from_millis(300));
            }

            self.active.fetch_sub(1, Ordering::SeqCst);

            match request.template {
                "panic" => panic!("injected worker crash"),
                "fail" => Err(TaskError::new(TaskErrorKind::Query, "no such column: x")),
                _ => Ok(QueryOutput::Rows(vec![])),
            }
        }
    }

    struct FakeSetup {
        factory: HandlerFactory,
        log: Arc<Mutex<Vec<&'static str>>>,
        peak: Arc<AtomicUsize>,
        /// Handlers released by exited workers.
        dropped: Arc<AtomicUsize>,
    }

    fn fake_factory(delay: Duration) -> FakeSetup {
        let log = Arc::new(Mutex::new(Vec::new()));
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let dropped = Arc::new(AtomicUsize::new(0));

        let (log_c, active_c, peak_c, dropped_c) =
            (log.clone(), active.clone(), peak.clone(), dropped.clone());
        let factory: HandlerFactory = Arc::new(move |_slot: WorkerSlot| {
            Box::new(FakeHandler {
                log: log_c.clone(),
                active: active_c.clone(),
                peak: peak_c.clone(),
                dropped: dropped_c.clone(),
                delay,
            }) as Box<dyn TaskHandler>
        });

        FakeSetup {
            factory,
            log,
            peak,
            dropped,
        }
    }

    /// Waits for `counter` to reach `expected`, giving up after two seconds.
    async fn wait_for(counter: &AtomicUsize, expected: usize) -> bool {
        for _ in 0..200 {
            if counter.load(Ordering::SeqCst) >= expected {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    fn request(template: &'static str) -> QueryRequest {
        QueryRequest::all("fake.db", template, BindValues::none())
    }

    // ============================================================
    // TEST 1: Template resolution
    // ============================================================

    #[test]
    fn test_resolve_template_fills_both_placeholders() {
        let sql = resolve_template(
            "SELECT m.* FROM ${mainTable} m JOIN ${ftsTable} f ON m.rowid = f.rowid",
            Some("contatos"),
            Some("contatos_fts"),
        )
        .unwrap();

        assert_eq!(
            sql,
            "SELECT m.* FROM contatos m JOIN contatos_fts f ON m.rowid = f.rowid"
        );
    }

    #[test]
    fn test_resolve_template_missing_fts_table_is_schema_error() {
        let err = resolve_template(
            "SELECT * FROM ${ftsTable} WHERE nome MATCH ?",
            Some("contatos"),
            None,
        )
        .unwrap_err();

        assert_eq!(err.kind, TaskErrorKind::SchemaResolution);
    }

    #[test]
    fn test_resolve_template_missing_main_table_is_schema_error() {
        let err = resolve_template("SELECT * FROM ${mainTable}", None, None).unwrap_err();
        assert_eq!(err.kind, TaskErrorKind::SchemaResolution);
    }

    #[test]
    fn test_resolve_template_rejects_unsafe_identifier() {
        let err = resolve_template(
            "SELECT * FROM ${mainTable}",
            Some("pessoas; DROP TABLE pessoas"),
            None,
        )
        .unwrap_err();

        assert_eq!(err.kind, TaskErrorKind::SchemaResolution);
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("credilink_basic").is_ok());
        assert!(validate_identifier("Dados2024").is_ok());

        for bad in ["", "main.table", "t-1", "x y", "nome\""] {
            let err = validate_identifier(bad).unwrap_err();
            assert_eq!(err.kind, TaskErrorKind::SchemaResolution, "{:?}", bad);
        }
    }

    #[test]
    fn test_resolve_template_without_placeholders_ignores_values() {
        let sql = resolve_template("SELECT CPF FROM telefone", None, Some("bad name!")).unwrap();
        assert_eq!(sql, "SELECT CPF FROM telefone");
    }

    // ============================================================
    // TEST 2: Fetch modes and error envelopes
    // ============================================================

    #[test]
    fn test_fetch_mode_parsing() {
        assert_eq!("get".parse::<FetchMode>().unwrap(), FetchMode::One);
        assert_eq!("one".parse::<FetchMode>().unwrap(), FetchMode::One);
        assert_eq!("all".parse::<FetchMode>().unwrap(), FetchMode::All);

        let err = "many".parse::<FetchMode>().unwrap_err();
        assert_eq!(err.kind, TaskErrorKind::InvalidRequest);
    }

    #[test]
    fn test_error_envelope_keeps_kind_across_the_boundary() {
        // ARRANGE
        let original = TaskError::new(TaskErrorKind::SchemaResolution, "no main table")
            .with_code("Unknown");

        // ACT: serialize as a worker would, parse back as the coordinator would
        let json = serde_json::to_value(ErrorEnvelope::from(original.clone())).unwrap();
        let envelope: ErrorEnvelope = serde_json::from_value(json.clone()).unwrap();
        let rebuilt = TaskError::from(envelope);

        // ASSERT
        assert_eq!(json["name"], "SchemaResolutionError");
        assert_eq!(json["message"], "no main table");
        assert_eq!(json["code"], "Unknown");
        assert_eq!(rebuilt, original);
    }

    #[test]
    fn test_task_response_prefers_error() {
        let response = TaskResponse {
            task_id: TaskId(7),
            result: Some(QueryOutput::Rows(vec![])),
            error: Some(TaskError::new(TaskErrorKind::Query, "boom").into()),
        };

        let err = response.into_result().unwrap_err();
        assert_eq!(err.kind, TaskErrorKind::Query);
    }

    #[test]
    fn test_value_to_json_conversions() {
        assert_eq!(value_to_json(ValueRef::Null), serde_json::Value::Null);
        assert_eq!(value_to_json(ValueRef::Integer(42)), serde_json::json!(42));
        assert_eq!(value_to_json(ValueRef::Real(1.5)), serde_json::json!(1.5));
        assert_eq!(value_to_json(ValueRef::Real(f64::NAN)), serde_json::Value::Null);
        assert_eq!(value_to_json(ValueRef::Text(b"SILVA")), serde_json::json!("SILVA"));
        assert_eq!(value_to_json(ValueRef::Blob(b"hello")), serde_json::json!("aGVsbG8="));
    }

    // ============================================================
    // TEST 3: DatasetExecutor against real files
    // ============================================================

    #[test]
    fn test_executor_opens_each_dataset_once_and_discovers_main_table() {
        // ARRANGE
        let dir = dataset_dir();
        let mut executor = DatasetExecutor::new(dir.path());
        let by_cpf = QueryRequest::all(
            "contatos.db",
            "SELECT * FROM ${mainTable} WHERE cpf = ?",
            BindValues::positional(["11122233344"]),
        );

        // ACT
        let first = executor.execute(&by_cpf).unwrap().into_rows();
        let second = executor.execute(&by_cpf).unwrap().into_rows();

        // ASSERT
        assert_eq!(first.len(), 1);
        assert_eq!(first, second);
        assert_eq!(first[0]["nome"], "NOME SILVA");
        assert_eq!(executor.registry().len(), 1);
        assert!(executor.registry().is_open("contatos.db"));
    }

    #[test]
    fn test_executor_fetch_one_and_named_binds() {
        let dir = dataset_dir();
        let mut executor = DatasetExecutor::new(dir.path());

        let request = QueryRequest::one(
            "scores.db",
            "SELECT * FROM ${mainTable} WHERE cpf_consulta = :cpf",
            BindValues::Named(vec![(":cpf".to_string(), "11122233344".into())]),
        );

        let output = executor.execute(&request).unwrap();
        match output {
            QueryOutput::Row(Some(row)) => {
                assert_eq!(row["score_risco_csb"], 750);
                assert_eq!(row["nivel_risco_descricao"], "BAIXO");
            }
            other => panic!("expected one row, got {:?}", other),
        }

        let miss = QueryRequest::one(
            "scores.db",
            "SELECT * FROM ${mainTable} WHERE cpf_consulta = ?",
            BindValues::positional(["00000000000"]),
        );
        assert_eq!(executor.execute(&miss).unwrap(), QueryOutput::Row(None));
    }

    #[test]
    fn test_executor_fts_query_uses_supplied_table() {
        let dir = dataset_dir();
        let mut executor = DatasetExecutor::new(dir.path());

        let request = QueryRequest::all(
            "contatos.db",
            "SELECT c.* FROM ${mainTable} c JOIN ${ftsTable} fts ON c.rowid = fts.rowid WHERE fts.nome MATCH ?",
            BindValues::positional(["ROG* AND CASS*"]),
        )
        .with_fts("contatos_fts");

        let rows = executor.execute(&request).unwrap().into_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["cpf"], "55566677788");
    }

    #[test]
    fn test_executor_missing_file_is_dataset_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let mut executor = DatasetExecutor::new(dir.path());

        let err = executor
            .execute(&QueryRequest::all("ghost.db", "SELECT 1", BindValues::none()))
            .unwrap_err();

        assert_eq!(err.kind, TaskErrorKind::DatasetUnavailable);
        assert!(executor.registry().is_empty());
    }

    #[test]
    fn test_executor_rejects_path_like_dataset_names() {
        let dir = dataset_dir();
        let mut executor = DatasetExecutor::new(dir.path());

        let err = executor
            .execute(&QueryRequest::all("../contatos.db", "SELECT 1", BindValues::none()))
            .unwrap_err();

        assert_eq!(err.kind, TaskErrorKind::InvalidRequest);
    }

    #[test]
    fn test_executor_sql_error_is_query_error_and_connection_survives() {
        let dir = dataset_dir();
        let mut executor = DatasetExecutor::new(dir.path());

        let bad = QueryRequest::all(
            "contatos.db",
            "SELECT no_such_column FROM ${mainTable}",
            BindValues::none(),
        );
        let err = executor.execute(&bad).unwrap_err();
        assert_eq!(err.kind, TaskErrorKind::Query);

        let good = QueryRequest::all(
            "contatos.db",
            "SELECT cpf FROM ${mainTable}",
            BindValues::none(),
        );
        assert_eq!(executor.execute(&good).unwrap().into_rows().len(), 2);
        assert_eq!(executor.registry().len(), 1);
    }

    #[test]
    fn test_executor_connections_are_read_only() {
        let dir = dataset_dir();
        let mut executor = DatasetExecutor::new(dir.path());

        let write = QueryRequest::all(
            "scores.db",
            "DELETE FROM ${mainTable}",
            BindValues::none(),
        );
        let err = executor.execute(&write).unwrap_err();

        assert_eq!(err.kind, TaskErrorKind::Query);
    }

    #[test]
    fn test_executor_empty_template_is_invalid_request() {
        let dir = dataset_dir();
        let mut executor = DatasetExecutor::new(dir.path());

        let err = executor
            .execute(&QueryRequest::all("scores.db", "  ", BindValues::none()))
            .unwrap_err();
        assert_eq!(err.kind, TaskErrorKind::InvalidRequest);
    }

    #[test]
    fn test_executor_blob_columns_come_back_as_base64() {
        let dir = tempfile::tempdir().unwrap();
        create_db(
            dir.path(),
            "blobs.db",
            "CREATE TABLE fotos (cpf TEXT, foto BLOB);
             INSERT INTO fotos VALUES ('1', X'68656C6C6F');",
        );
        let mut executor = DatasetExecutor::new(dir.path());

        let rows = executor
            .execute(&QueryRequest::all(
                "blobs.db",
                "SELECT foto FROM ${mainTable}",
                BindValues::none(),
            ))
            .unwrap()
            .into_rows();

        assert_eq!(rows[0]["foto"], "aGVsbG8=");
    }

    // ============================================================
    // TEST 4: Dispatcher ordering and affinity
    // ============================================================

    #[tokio::test]
    async fn test_dispatcher_runs_tasks_in_submission_order() {
        // ARRANGE: one worker, so order is fully determined by the queue
        let setup = fake_factory(Duration::from_millis(5));
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let mut dispatcher = Dispatcher::start(1, setup.factory.clone(), event_tx).unwrap();

        let templates = ["t0", "t1", "t2", "t3", "t4"];
        let mut replies = Vec::new();

        // ACT
        for template in templates {
            let (tx, rx) = oneshot::channel();
            dispatcher.submit(request(template), tx);
            replies.push(rx);
        }

        // ASSERT: one in flight, the rest queued
        let snapshot = dispatcher.snapshot();
        assert_eq!(snapshot.workers[0].in_flight, 1);
        assert_eq!(snapshot.queued, 4);
        assert_eq!(snapshot.pending, 5);

        let mut completed = 0;
        while completed < templates.len() {
            let event = event_rx.recv().await.unwrap();
            if matches!(event, crate::executor::protocol::WorkerEvent::Completed { .. }) {
                completed += 1;
            }
            dispatcher.handle_event(event);
        }

        for rx in replies {
            assert!(rx.await.unwrap().is_ok());
        }
        assert_eq!(*setup.log.lock().unwrap(), templates.to_vec());
        assert_eq!(dispatcher.snapshot().pending, 0);

        dispatcher.shutdown();
    }

    // ============================================================
    // TEST 5: WorkerPool
    // ============================================================

    #[tokio::test]
    async fn test_pool_never_exceeds_worker_count() {
        // ARRANGE
        let size = 3;
        let setup = fake_factory(Duration::from_millis(10));
        let pool = WorkerPool::with_handler(size, setup.factory.clone()).unwrap();

        // ACT: far more concurrent tasks than workers
        let mut handles = Vec::new();
        for _ in 0..(size * 8) {
            let pool = pool.clone();
            handles.push(tokio::spawn(async move { pool.submit(request("ok")).await }));
        }

        let view = pool.snapshot().await.unwrap();
        for worker in &view.workers {
            assert!(worker.in_flight <= 1);
        }

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        // ASSERT
        assert!(setup.peak.load(Ordering::SeqCst) <= size);
        assert_eq!(setup.log.lock().unwrap().len(), size * 8);

        let snapshot = pool.snapshot().await.unwrap();
        assert_eq!(snapshot.submitted, (size * 8) as u64);
        assert_eq!(snapshot.pending, 0);
        assert_eq!(snapshot.queued, 0);

        pool.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_pool_task_error_does_not_kill_worker() {
        let setup = fake_factory(Duration::ZERO);
        let pool = WorkerPool::with_handler(1, setup.factory.clone()).unwrap();

        let err = pool.submit(request("fail")).await.unwrap_err();
        match err {
            PoolError::Task(task) => assert_eq!(task.kind, TaskErrorKind::Query),
            other => panic!("expected task error, got {:?}", other),
        }

        assert!(pool.submit(request("ok")).await.is_ok());
        let snapshot = pool.snapshot().await.unwrap();
        assert_eq!(snapshot.workers[0].generation, 0);

        pool.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_pool_replaces_crashed_worker() {
        // ARRANGE
        let setup = fake_factory(Duration::ZERO);
        let pool = WorkerPool::with_handler(2, setup.factory.clone()).unwrap();

        // ACT: crash whichever worker picks this up
        let err = pool.submit(request("panic")).await.unwrap_err();

        // ASSERT: the call fails with WorkerFailure and the slot is refilled
        let crashed_slot = match err {
            PoolError::WorkerFailure { slot, .. } => slot,
            other => panic!("expected worker failure, got {:?}", other),
        };

        let snapshot = pool.snapshot().await.unwrap();
        assert_eq!(snapshot.workers.len(), 2);
        let replaced = &snapshot.workers[crashed_slot.0];
        assert_eq!(replaced.generation, 1);
        assert!(replaced.alive);
        assert_eq!(snapshot.pending, 0);

        // Later tasks still succeed
        for _ in 0..4 {
            assert!(pool.submit(request("ok")).await.is_ok());
        }

        pool.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_pool_crash_leaves_other_workers_alone() {
        // ARRANGE: a long task occupies one worker
        let setup = fake_factory(Duration::ZERO);
        let pool = WorkerPool::with_handler(2, setup.factory.clone()).unwrap();
        assert_eq!(pool.size(), 2);

        let slow = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.submit(request("slow")).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        let busy = pool.snapshot().await.unwrap();
        assert_eq!(busy.workers.iter().map(|w| w.in_flight).sum::<usize>(), 1);

        // ACT: crash the other worker while the long task is still running
        let err = pool.submit(request("panic")).await.unwrap_err();
        let crashed_slot = match err {
            PoolError::WorkerFailure { slot, .. } => slot,
            other => panic!("expected worker failure, got {:?}", other),
        };

        // ASSERT: the long task completes normally on its own worker
        assert!(slow.await.unwrap().is_ok());

        let snapshot = pool.snapshot().await.unwrap();
        for worker in &snapshot.workers {
            let expected = if worker.slot == crashed_slot.0 { 1 } else { 0 };
            assert_eq!(worker.generation, expected, "slot {}", worker.slot);
            assert!(worker.alive);
        }
        assert_eq!(snapshot.pending, 0);

        pool.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_worker_releases_handler_on_exit() {
        // ARRANGE
        let setup = fake_factory(Duration::ZERO);
        let pool = WorkerPool::with_handler(1, setup.factory.clone()).unwrap();
        assert!(pool.submit(request("ok")).await.is_ok());
        assert_eq!(setup.dropped.load(Ordering::SeqCst), 0);

        // ACT: a crash releases the old handler before the failure is reported
        let err = pool.submit(request("panic")).await.unwrap_err();
        assert!(matches!(err, PoolError::WorkerFailure { .. }));
        assert_eq!(setup.dropped.load(Ordering::SeqCst), 1);

        // ACT: shutdown releases the replacement
        pool.shutdown().await.unwrap();

        // ASSERT
        assert!(wait_for(&setup.dropped, 2).await);
    }

    #[test]
    fn test_registry_closes_connections() {
        let dir = dataset_dir();
        let mut registry = ConnectionRegistry::new(dir.path());

        registry.handle("contatos.db").unwrap();
        registry.handle("scores.db").unwrap();
        assert_eq!(registry.len(), 2);

        registry.close_all();
        assert!(registry.is_empty());
        assert!(!registry.is_open("contatos.db"));

        // Reopened on the next use
        let handle = registry.handle("contatos.db").unwrap();
        assert_eq!(handle.main_table.as_deref(), Some("contatos"));
    }

    #[tokio::test]
    async fn test_pool_shutdown_rejects_queued_and_in_flight() {
        // ARRANGE: one slow worker so tasks pile up
        let setup = fake_factory(Duration::from_millis(300));
        let pool = WorkerPool::with_handler(1, setup.factory.clone()).unwrap();

        let mut handles = Vec::new();
        for _ in 0..3 {
            let pool = pool.clone();
            handles.push(tokio::spawn(async move { pool.submit(request("ok")).await }));
        }
        tokio::time::sleep(Duration::from_millis(50)).await;

        // ACT
        pool.shutdown().await.unwrap();

        // ASSERT
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap_err(), PoolError::ShuttingDown);
        }
        assert_eq!(
            pool.submit(request("ok")).await.unwrap_err(),
            PoolError::ShuttingDown
        );

        // Idempotent
        pool.shutdown().await.unwrap();
        assert!(pool.snapshot().await.unwrap().shutting_down);
    }

    #[tokio::test]
    async fn test_pool_runs_real_dataset_queries() {
        let dir = dataset_dir();
        let pool = WorkerPool::for_datasets(2, dir.path()).unwrap();

        let rows = pool
            .submit(QueryRequest::all(
                "credilink.db",
                "SELECT CPF, TELEFONES FROM telefone WHERE TELEFONES = ?",
                BindValues::positional(["21999998888"]),
            ))
            .await
            .unwrap()
            .into_rows();

        assert_eq!(rows.len(), 2);
        pool.shutdown().await.unwrap();
    }
}

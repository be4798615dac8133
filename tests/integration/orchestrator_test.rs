//! Fallback orchestration tests.
//!
//! Drive the orchestrator end to end against the scripted compute service. Time is
//! paused, so poll intervals elapse instantly and sleeps can be counted exactly.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dbx_runner::auth::{Credential, FailingTokenProvider, StaticTokenProvider, TokenProvider};
use dbx_runner::poll::PollPolicy;
use dbx_runner::remote::{
    ApiCall, ClusterInfo, CommandStatusResponse, ComputeApi, CreateContextRequest,
    DestroyContextRequest, ExecuteCommandRequest, MockComputeApi, RunResponse, StatementRequest,
    StatementResponse, SubmitRunRequest,
};
use dbx_runner::request::{ExecutionRequest, Target};
use dbx_runner::result::Value;
use dbx_runner::strategy::{ExecutionStrategy, StrategyKind};
use dbx_runner::{AttemptOutcome, Orchestrator, RunnerError};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const INTERVAL: Duration = Duration::from_secs(1);

fn strategies(kinds: &[StrategyKind], max_attempts: u32) -> Vec<Box<dyn ExecutionStrategy>> {
    kinds
        .iter()
        .map(|kind| kind.build(PollPolicy::new(max_attempts, INTERVAL)))
        .collect()
}

fn orchestrator(api: &Arc<MockComputeApi>) -> Orchestrator {
    Orchestrator::new(Arc::new(StaticTokenProvider::new("tok")), api.clone())
}

fn cluster_request() -> ExecutionRequest {
    ExecutionRequest::new("SHOW TABLES", Target::Cluster("c1".into()))
}

fn running_cluster() -> ClusterInfo {
    ClusterInfo::with_state("c1", "RUNNING")
}

fn context_destroys(api: &MockComputeApi, context_id: &str) -> usize {
    api.count(|c| matches!(c, ApiCall::DestroyContext { context_id: id } if id == context_id))
}

/// Delegates to the scripted fake, but holds `commands/execute` for `delay` first.
struct SlowExecute {
    inner: Arc<MockComputeApi>,
    delay: Duration,
}

#[async_trait]
impl ComputeApi for SlowExecute {
    async fn create_statement(
        &self,
        credential: &Credential,
        request: &StatementRequest,
    ) -> dbx_runner::Result<StatementResponse> {
        self.inner.create_statement(credential, request).await
    }

    async fn get_statement(
        &self,
        credential: &Credential,
        statement_id: &str,
    ) -> dbx_runner::Result<StatementResponse> {
        self.inner.get_statement(credential, statement_id).await
    }

    async fn create_context(
        &self,
        credential: &Credential,
        request: &CreateContextRequest,
    ) -> dbx_runner::Result<String> {
        self.inner.create_context(credential, request).await
    }

    async fn execute_command(
        &self,
        credential: &Credential,
        request: &ExecuteCommandRequest,
    ) -> dbx_runner::Result<String> {
        tokio::time::sleep(self.delay).await;
        self.inner.execute_command(credential, request).await
    }

    async fn command_status(
        &self,
        credential: &Credential,
        cluster_id: &str,
        context_id: &str,
        command_id: &str,
    ) -> dbx_runner::Result<CommandStatusResponse> {
        self.inner
            .command_status(credential, cluster_id, context_id, command_id)
            .await
    }

    async fn destroy_context(
        &self,
        credential: &Credential,
        request: &DestroyContextRequest,
    ) -> dbx_runner::Result<()> {
        self.inner.destroy_context(credential, request).await
    }

    async fn submit_run(
        &self,
        credential: &Credential,
        request: &SubmitRunRequest,
    ) -> dbx_runner::Result<i64> {
        self.inner.submit_run(credential, request).await
    }

    async fn get_run(
        &self,
        credential: &Credential,
        run_id: i64,
    ) -> dbx_runner::Result<RunResponse> {
        self.inner.get_run(credential, run_id).await
    }

    async fn get_run_output(
        &self,
        credential: &Credential,
        run_id: i64,
    ) -> dbx_runner::Result<serde_json::Value> {
        self.inner.get_run_output(credential, run_id).await
    }

    async fn get_cluster(
        &self,
        credential: &Credential,
        cluster_id: &str,
    ) -> dbx_runner::Result<ClusterInfo> {
        self.inner.get_cluster(credential, cluster_id).await
    }

    async fn list_clusters(&self, credential: &Credential) -> dbx_runner::Result<Vec<ClusterInfo>> {
        self.inner.list_clusters(credential).await
    }
}

#[tokio::test(start_paused = true)]
async fn test_statement_succeeds_on_second_poll() {
    let api = Arc::new(
        MockComputeApi::new()
            .on_statement_submit(Ok(StatementResponse::with_state("42", "PENDING")))
            .on_statement_poll(Ok(StatementResponse::with_state("42", "RUNNING")))
            .on_statement_poll(Ok(StatementResponse::succeeded(
                "42",
                json!([["db1", "t1"]]),
            ))),
    );
    let request = ExecutionRequest::new("SHOW TABLES", Target::Warehouse("w1".into()));

    let report = orchestrator(&api)
        .run(
            &request,
            &strategies(&StrategyKind::ALL, 5),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(report.strategy, StrategyKind::Statement);
    assert_eq!(
        report.result.rows,
        vec![vec![Value::from("db1"), Value::from("t1")]]
    );
    assert_eq!(api.count(ApiCall::is_poll), 2);
    assert_eq!(
        api.calls()[1..],
        [
            ApiCall::GetStatement("42".into()),
            ApiCall::GetStatement("42".into()),
        ]
    );
    assert_eq!(report.attempts.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_statement_timeout_falls_back_to_command() {
    let api = Arc::new(
        MockComputeApi::new()
            .on_cluster(Ok(running_cluster()))
            .on_statement_submit(Ok(StatementResponse::with_state("42", "PENDING")))
            .on_statement_poll(Ok(StatementResponse::with_state("42", "RUNNING")))
            .on_context_create(Ok("ctx-1".into()))
            .on_command_execute(Ok("cmd-1".into()))
            .on_command_poll(Ok(CommandStatusResponse::new(
                "Finished",
                Some(json!({"resultType": "table", "data": [["db2", "t2"]]})),
            ))),
    );
    let start = Instant::now();

    let report = orchestrator(&api)
        .run(
            &cluster_request(),
            &strategies(&StrategyKind::ALL, 3),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(report.strategy, StrategyKind::Command);
    assert_eq!(
        report.result.rows,
        vec![vec![Value::from("db2"), Value::from("t2")]]
    );

    let outcomes: Vec<_> = report.attempts.iter().map(|a| a.outcome).collect();
    assert_eq!(outcomes, vec![AttemptOutcome::TimedOut, AttemptOutcome::Succeeded]);

    assert_eq!(api.count(|c| matches!(c, ApiCall::GetStatement(_))), 3);
    assert_eq!(context_destroys(&api, "ctx-1"), 1);
    assert_eq!(api.count(|c| matches!(c, ApiCall::SubmitRun { .. })), 0);

    // Three statement polls sleep twice; the command succeeds on its first poll.
    assert_eq!(start.elapsed(), INTERVAL * 2);
}

#[tokio::test(start_paused = true)]
async fn test_all_strategies_failed() {
    let failed_statement: StatementResponse = serde_json::from_value(json!({
        "statement_id": "42",
        "status": {"state": "FAILED", "error": {"message": "statement error"}}
    }))
    .unwrap();
    let api = Arc::new(
        MockComputeApi::new()
            .on_cluster(Ok(running_cluster()))
            .on_statement_submit(Ok(StatementResponse::with_state("42", "PENDING")))
            .on_statement_poll(Ok(failed_statement))
            .on_context_create(Ok("ctx-1".into()))
            .on_command_execute(Ok("cmd-1".into()))
            .on_command_poll(Ok(CommandStatusResponse::new(
                "Finished",
                Some(json!({"resultType": "error", "cause": "command error"})),
            )))
            .on_run_submit(Ok(7))
            .on_run_poll(Ok(RunResponse::new(
                "TERMINATED",
                Some("FAILED"),
                Some("job error"),
            ))),
    );

    let err = orchestrator(&api)
        .run(
            &cluster_request(),
            &strategies(&StrategyKind::ALL, 3),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    let RunnerError::Exhausted { attempts } = err else {
        panic!("Expected exhaustion, got {err:?}");
    };
    let trail: Vec<_> = attempts
        .iter()
        .map(|a| (a.strategy.as_str(), a.outcome, a.detail.as_deref()))
        .collect();
    assert_eq!(
        trail,
        vec![
            ("statement", AttemptOutcome::Failed, Some("statement error")),
            ("command", AttemptOutcome::Failed, Some("command error")),
            ("job", AttemptOutcome::Failed, Some("job error")),
        ]
    );
    assert_eq!(context_destroys(&api, "ctx-1"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_client_aborts_before_any_call() {
    let api = Arc::new(MockComputeApi::new());
    let tokens = Arc::new(FailingTokenProvider::invalid_client());
    let orchestrator = Orchestrator::new(tokens, api.clone());

    let err = orchestrator
        .run(
            &cluster_request(),
            &strategies(&StrategyKind::ALL, 3),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(&err, RunnerError::Auth { code, .. } if code == "invalid_client"));
    assert!(api.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_authority_is_fatal() {
    let api = Arc::new(MockComputeApi::new());
    let tokens = Arc::new(FailingTokenProvider::unreachable());
    let orchestrator = Orchestrator::new(tokens, api.clone());

    let err = orchestrator
        .run(
            &cluster_request(),
            &strategies(&StrategyKind::ALL, 3),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RunnerError::Network(_)));
    assert!(api.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_token_obtained_once_and_sent_everywhere() {
    let tokens = Arc::new(StaticTokenProvider::new("tok-123"));
    let api = Arc::new(
        MockComputeApi::new()
            .on_cluster(Ok(running_cluster()))
            .on_statement_submit(Err(RunnerError::Submit {
                status: 400,
                body: "cluster targets not supported".into(),
            }))
            .on_context_create(Ok("ctx-1".into()))
            .on_command_execute(Ok("cmd-1".into()))
            .on_command_poll(Ok(CommandStatusResponse::new(
                "Finished",
                Some(json!({"data": []})),
            ))),
    );
    let provider: Arc<dyn TokenProvider> = tokens.clone();

    Orchestrator::new(provider, api.clone())
        .run(
            &cluster_request(),
            &strategies(&StrategyKind::ALL, 3),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(tokens.calls(), 1);
    assert!(!api.tokens().is_empty());
    assert!(api.tokens().iter().all(|t| t == "tok-123"));
}

#[tokio::test(start_paused = true)]
async fn test_stopped_cluster_makes_no_submit_calls() {
    let mut cluster = ClusterInfo::with_state("c1", "TERMINATED");
    cluster.state_message = Some("Inactive cluster terminated".into());
    let api = Arc::new(MockComputeApi::new().on_cluster(Ok(cluster)));

    let err = orchestrator(&api)
        .run(
            &cluster_request(),
            &strategies(&StrategyKind::ALL, 3),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    let RunnerError::Exhausted { attempts } = err else {
        panic!("Expected exhaustion, got {err:?}");
    };
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].outcome, AttemptOutcome::PreconditionFailed);
    assert_eq!(
        attempts[0].detail.as_deref(),
        Some("cluster c1 is TERMINATED: Inactive cluster terminated")
    );
    assert_eq!(api.count(ApiCall::is_submit), 0);
    assert_eq!(api.calls(), vec![ApiCall::GetCluster("c1".into())]);
}

#[tokio::test(start_paused = true)]
async fn test_unreadable_cluster_is_precondition_failure() {
    let api = Arc::new(MockComputeApi::new().on_cluster(Err(RunnerError::Poll {
        status: 403,
        body: "forbidden".into(),
    })));

    let err = orchestrator(&api)
        .run(
            &cluster_request(),
            &strategies(&StrategyKind::ALL, 3),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    let RunnerError::Exhausted { attempts } = err else {
        panic!("Expected exhaustion, got {err:?}");
    };
    assert_eq!(attempts[0].outcome, AttemptOutcome::PreconditionFailed);
    assert_eq!(api.count(ApiCall::is_submit), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cluster_check_can_be_disabled() {
    let api = Arc::new(
        MockComputeApi::new()
            .on_statement_submit(Ok(StatementResponse::with_state("1", "PENDING")))
            .on_statement_poll(Ok(StatementResponse::succeeded("1", json!([])))),
    );

    orchestrator(&api)
        .with_cluster_check(false)
        .run(
            &cluster_request(),
            &strategies(&[StrategyKind::Statement], 3),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(api.count(|c| matches!(c, ApiCall::GetCluster(_))), 0);
}

#[tokio::test(start_paused = true)]
async fn test_warehouse_target_skips_cluster_check() {
    let api = Arc::new(
        MockComputeApi::new()
            .on_statement_submit(Ok(StatementResponse::with_state("1", "PENDING")))
            .on_statement_poll(Ok(StatementResponse::succeeded("1", json!([["x"]])))),
    );
    let request = ExecutionRequest::new("SHOW TABLES", Target::Warehouse("w1".into()));

    orchestrator(&api)
        .run(
            &request,
            &strategies(&[StrategyKind::Statement], 3),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(api.count(|c| matches!(c, ApiCall::GetCluster(_))), 0);
}

#[tokio::test(start_paused = true)]
async fn test_warehouse_target_records_unsupported_strategies() {
    let api = Arc::new(
        MockComputeApi::new()
            .on_statement_submit(Ok(StatementResponse::with_state("1", "PENDING")))
            .on_statement_poll(Ok(StatementResponse::with_state("1", "RUNNING"))),
    );
    let request = ExecutionRequest::new("SHOW TABLES", Target::Warehouse("w1".into()));

    let err = orchestrator(&api)
        .run(
            &request,
            &strategies(&StrategyKind::ALL, 2),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    let RunnerError::Exhausted { attempts } = err else {
        panic!("Expected exhaustion, got {err:?}");
    };
    let outcomes: Vec<_> = attempts.iter().map(|a| a.outcome).collect();
    assert_eq!(
        outcomes,
        vec![
            AttemptOutcome::TimedOut,
            AttemptOutcome::Failed,
            AttemptOutcome::Failed,
        ]
    );
    assert!(attempts[1]
        .detail
        .as_deref()
        .is_some_and(|d| d.contains("cluster target")));
    assert_eq!(api.count(ApiCall::is_submit), 1);
}

#[tokio::test(start_paused = true)]
async fn test_context_destroyed_before_next_strategy() {
    let api = Arc::new(
        MockComputeApi::new()
            .on_context_create(Ok("ctx-1".into()))
            .on_command_execute(Ok("cmd-1".into()))
            .on_command_poll(Ok(CommandStatusResponse::new("Running", None)))
            .on_run_submit(Ok(7))
            .on_run_poll(Ok(RunResponse::new("TERMINATED", Some("SUCCESS"), None)))
            .on_run_output(Ok(json!({"sql_output": {"data_array": [["db3", "t3"]]}}))),
    );

    let report = orchestrator(&api)
        .with_cluster_check(false)
        .run(
            &cluster_request(),
            &strategies(&[StrategyKind::Command, StrategyKind::Job], 2),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(report.strategy, StrategyKind::Job);

    let calls = api.calls();
    let destroy = calls
        .iter()
        .position(|c| matches!(c, ApiCall::DestroyContext { .. }))
        .unwrap();
    let submit_run = calls
        .iter()
        .position(|c| matches!(c, ApiCall::SubmitRun { .. }))
        .unwrap();
    assert!(destroy < submit_run, "calls out of order: {calls:?}");
}

/// Runs a command-only orchestration whose poll ends in the given way and returns the fake.
async fn run_command_ending_with(
    poll: dbx_runner::Result<CommandStatusResponse>,
) -> Arc<MockComputeApi> {
    let api = Arc::new(
        MockComputeApi::new()
            .on_context_create(Ok("ctx-1".into()))
            .on_command_execute(Ok("cmd-1".into()))
            .on_command_poll(Ok(CommandStatusResponse::new("Running", None)))
            .on_command_poll(poll),
    );
    let _ = orchestrator(&api)
        .with_cluster_check(false)
        .run(
            &cluster_request(),
            &strategies(&[StrategyKind::Command], 3),
            &CancellationToken::new(),
        )
        .await;
    api
}

#[tokio::test(start_paused = true)]
async fn test_context_destroyed_once_on_every_outcome() {
    let endings = [
        Ok(CommandStatusResponse::new("Finished", Some(json!({"data": [[1]]})))),
        Ok(CommandStatusResponse::new("Error", None)),
        Ok(CommandStatusResponse::new("Running", None)),
        Err(RunnerError::network("connection reset by peer")),
    ];

    for ending in endings {
        let label = format!("{ending:?}");
        let api = run_command_ending_with(ending).await;
        assert_eq!(context_destroys(&api, "ctx-1"), 1, "ending {label}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_mid_loop_network_error_is_failed_attempt() {
    let api = Arc::new(
        MockComputeApi::new()
            .on_context_create(Ok("ctx-1".into()))
            .on_command_execute(Ok("cmd-1".into()))
            .on_command_poll(Ok(CommandStatusResponse::new("Running", None)))
            .on_command_poll(Err(RunnerError::network("connection reset by peer")))
            .on_run_submit(Ok(7))
            .on_run_poll(Ok(RunResponse::new("TERMINATED", Some("SUCCESS"), None)))
            .on_run_output(Ok(json!({"data_array": [["x"]]}))),
    );

    let report = orchestrator(&api)
        .with_cluster_check(false)
        .run(
            &cluster_request(),
            &strategies(&[StrategyKind::Command, StrategyKind::Job], 5),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(report.attempts[0].outcome, AttemptOutcome::Failed);
    assert!(report.attempts[0]
        .detail
        .as_deref()
        .is_some_and(|d| d.contains("connection reset")));
    assert_eq!(report.strategy, StrategyKind::Job);
}

#[tokio::test(start_paused = true)]
async fn test_cleanup_failure_is_swallowed() {
    let api = Arc::new(
        MockComputeApi::new()
            .on_context_create(Ok("ctx-1".into()))
            .on_command_execute(Ok("cmd-1".into()))
            .on_command_poll(Ok(CommandStatusResponse::new(
                "Finished",
                Some(json!({"data": [["ok"]]})),
            )))
            .on_context_destroy(Err(RunnerError::Cleanup {
                status: 500,
                body: "internal".into(),
            })),
    );

    let report = orchestrator(&api)
        .with_cluster_check(false)
        .run(
            &cluster_request(),
            &strategies(&[StrategyKind::Command], 3),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(report.result.row_count(), 1);
    assert_eq!(context_destroys(&api, "ctx-1"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_malformed_result_falls_back() {
    let api = Arc::new(
        MockComputeApi::new()
            .on_statement_submit(Ok(StatementResponse::with_state("1", "PENDING")))
            .on_statement_poll(Ok(StatementResponse::with_state("1", "SUCCEEDED")))
            .on_context_create(Ok("ctx-1".into()))
            .on_command_execute(Ok("cmd-1".into()))
            .on_command_poll(Ok(CommandStatusResponse::new(
                "Finished",
                Some(json!({"data": [["ok"]]})),
            ))),
    );

    let report = orchestrator(&api)
        .with_cluster_check(false)
        .run(
            &cluster_request(),
            &strategies(&[StrategyKind::Statement, StrategyKind::Command], 3),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(report.attempts[0].outcome, AttemptOutcome::Failed);
    assert_eq!(report.strategy, StrategyKind::Command);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_before_start() {
    let api = Arc::new(MockComputeApi::new());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = orchestrator(&api)
        .run(&cluster_request(), &strategies(&StrategyKind::ALL, 3), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, RunnerError::Cancelled));
    assert!(api.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_while_polling_still_destroys_context() {
    let api = Arc::new(
        MockComputeApi::new()
            .on_context_create(Ok("ctx-1".into()))
            .on_command_execute(Ok("cmd-1".into()))
            .on_command_poll(Ok(CommandStatusResponse::new("Running", None))),
    );
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(2500)).await;
        trigger.cancel();
    });

    let err = orchestrator(&api)
        .with_cluster_check(false)
        .run(
            &cluster_request(),
            &strategies(&[StrategyKind::Command, StrategyKind::Job], 30),
            &cancel,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RunnerError::Cancelled));
    assert_eq!(context_destroys(&api, "ctx-1"), 1);
    assert_eq!(api.count(|c| matches!(c, ApiCall::SubmitRun { .. })), 0);
    assert_eq!(api.count(ApiCall::is_poll), 3);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_between_context_and_command_destroys_context() {
    let mock = Arc::new(
        MockComputeApi::new()
            .on_context_create(Ok("ctx-1".into()))
            .on_command_execute(Ok("cmd-1".into())),
    );
    let api = Arc::new(SlowExecute {
        inner: mock.clone(),
        delay: Duration::from_secs(5),
    });
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });

    let err = Orchestrator::new(Arc::new(StaticTokenProvider::new("tok")), api)
        .with_cluster_check(false)
        .run(
            &cluster_request(),
            &strategies(&[StrategyKind::Command, StrategyKind::Job], 3),
            &cancel,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RunnerError::Cancelled));
    assert_eq!(
        mock.calls(),
        vec![
            ApiCall::CreateContext {
                cluster_id: "c1".into()
            },
            ApiCall::DestroyContext {
                context_id: "ctx-1".into()
            },
        ]
    );
}

#[tokio::test]
async fn test_list_clusters_with_run_token() {
    let api = Arc::new(MockComputeApi::new().on_cluster_list(Ok(vec![
        running_cluster(),
        ClusterInfo::with_state("c2", "TERMINATED"),
    ])));

    let clusters = orchestrator(&api)
        .list_clusters(&CancellationToken::new())
        .await
        .unwrap();

    let states: Vec<_> = clusters
        .iter()
        .map(|c| (c.cluster_id.as_str(), c.state.as_str()))
        .collect();
    assert_eq!(states, vec![("c1", "RUNNING"), ("c2", "TERMINATED")]);
    assert_eq!(api.calls(), vec![ApiCall::ListClusters]);
    assert_eq!(api.tokens(), vec!["tok"]);
}

#[tokio::test]
async fn test_list_clusters_auth_failure() {
    let api = Arc::new(MockComputeApi::new());
    let tokens = Arc::new(FailingTokenProvider::invalid_client());

    let err = Orchestrator::new(tokens, api.clone())
        .list_clusters(&CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, RunnerError::Auth { .. }));
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn test_empty_strategy_list_is_config_error() {
    let api = Arc::new(MockComputeApi::new());
    let err = orchestrator(&api)
        .run(&cluster_request(), &[], &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RunnerError::Config(_)));
}

//! Statement protocol integration tests.
//!
//! Runs whole submit/poll/paginate cycles through `StatementExecutor`.

use futures::{StreamExt, TryStreamExt};
use pretty_assertions::assert_eq;
use redshift_source::config::{ConnectionIdentity, ConnectorOptions};
use redshift_source::data_api::{Field, MockCall, MockDataApi, StatementScript, StatementStatus};
use redshift_source::error::ConnectorError;
use redshift_source::statement::{PollConfig, StatementExecutor, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn workgroup_identity() -> Arc<ConnectionIdentity> {
    let options = ConnectorOptions::from_pairs(&[
        ("region", "us-east-1"),
        ("database", "dev"),
        ("workgroup_name", "analytics"),
    ]);
    Arc::new(ConnectionIdentity::from_options(&options).unwrap())
}

fn executor(api: &Arc<MockDataApi>, poll: PollConfig) -> StatementExecutor {
    StatementExecutor::new(api.clone(), workgroup_identity(), poll)
}

fn fast_poll() -> PollConfig {
    PollConfig {
        interval: Duration::ZERO,
        max_attempts: 10,
    }
}

#[tokio::test]
async fn test_pages_are_streamed_in_order() {
    let api = Arc::new(MockDataApi::new().with_statement(
        "select",
        StatementScript::pages(
            &["id"],
            vec![
                vec![vec![Field::Long(1)], vec![Field::Long(2)]],
                vec![],
                vec![vec![Field::Long(3)]],
            ],
        ),
    ));

    let records = executor(&api, fast_poll())
        .fetch_all("SELECT id FROM t")
        .await
        .unwrap();

    let ids: Vec<_> = records.iter().map(|r| r.get("id").cloned()).collect();
    assert_eq!(
        ids,
        vec![Some(Value::Int(1)), Some(Value::Int(2)), Some(Value::Int(3))]
    );
    assert_eq!(api.result_fetch_count(), 3);

    let tokens: Vec<_> = api
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            MockCall::GetResult { next_token, .. } => Some(next_token),
            _ => None,
        })
        .collect();
    assert_eq!(
        tokens,
        vec![
            None,
            Some("stmt-1/page-1".to_string()),
            Some("stmt-1/page-2".to_string())
        ]
    );
}

#[tokio::test]
async fn test_cells_are_decoded() {
    let api = Arc::new(MockDataApi::new().with_statement(
        "select",
        StatementScript::rows(
            &["a", "b", "c", "d", "e"],
            vec![vec![
                Field::Null,
                Field::Boolean(true),
                Field::Double(1.5),
                Field::String("x".to_string()),
                Field::Blob("aGk=".to_string()),
            ]],
        ),
    ));

    let records = executor(&api, fast_poll())
        .fetch_all("SELECT *")
        .await
        .unwrap();

    assert_eq!(
        records[0].values(),
        &[
            Value::Null,
            Value::Bool(true),
            Value::Float(1.5),
            Value::String("x".to_string()),
            Value::Bytes(b"hi".to_vec()),
        ]
    );
    assert_eq!(
        serde_json::to_value(&records[0]).unwrap(),
        serde_json::json!({"a": null, "b": true, "c": 1.5, "d": "x", "e": "aGk="})
    );
}

#[tokio::test]
async fn test_page_failure_ends_stream_with_error() {
    let api = Arc::new(MockDataApi::new().with_statement(
        "select",
        StatementScript::pages(
            &["id"],
            vec![
                vec![vec![Field::Long(1)], vec![Field::Long(2)]],
                vec![vec![Field::Long(3)]],
            ],
        )
        .with_page_failure(1, "ThrottlingException: Rate exceeded"),
    ));

    let mut stream = executor(&api, fast_poll())
        .execute("SELECT id FROM t")
        .await
        .unwrap();

    assert!(stream.next().await.unwrap().is_ok());
    assert!(stream.next().await.unwrap().is_ok());
    match stream.next().await {
        Some(Err(ConnectorError::Api(msg))) => assert!(msg.contains("Rate exceeded")),
        other => panic!("expected api error, got {other:?}"),
    }
    assert!(stream.next().await.is_none());
    assert_eq!(api.result_fetch_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_poll_budget_exhaustion_times_out() {
    let api = Arc::new(MockDataApi::new().with_statement(
        "select",
        StatementScript::rows(&["id"], vec![]).with_statuses(vec![StatementStatus::Started]),
    ));
    let poll = PollConfig {
        interval: Duration::from_secs(2),
        max_attempts: 3,
    };

    let start = Instant::now();
    let err = executor(&api, poll).execute("SELECT 1").await.err().unwrap();

    assert!(matches!(
        err,
        ConnectorError::QueryTimeout { ref statement_id, attempts: 3 } if statement_id == "stmt-1"
    ));
    assert_eq!(start.elapsed(), Duration::from_secs(4));
    assert_eq!(api.describe_count(), 3);
    assert_eq!(api.result_fetch_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_queued_statement_eventually_finishes() {
    let api = Arc::new(MockDataApi::new().with_statement(
        "select",
        StatementScript::rows(&["id"], vec![vec![Field::Long(7)]]).with_statuses(vec![
            StatementStatus::Submitted,
            StatementStatus::Queued,
            StatementStatus::Started,
            StatementStatus::Finished,
        ]),
    ));

    let start = Instant::now();
    let records = executor(&api, PollConfig::default())
        .fetch_all("SELECT 7")
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(start.elapsed(), Duration::from_secs(6));
    assert_eq!(api.describe_count(), 4);
}

#[tokio::test]
async fn test_failed_statement_reports_detail() {
    let api = Arc::new(
        MockDataApi::new().with_statement(
            "select",
            StatementScript::rows(&[], vec![])
                .with_statuses(vec![StatementStatus::Failed])
                .with_error("relation \"nope\" does not exist"),
        ),
    );

    let err = executor(&api, fast_poll())
        .execute("SELECT * FROM nope")
        .await
        .err()
        .unwrap();

    assert_eq!(
        err.to_string(),
        "SQL statement failed: relation \"nope\" does not exist"
    );
    assert_eq!(api.result_fetch_count(), 0);
}

#[tokio::test]
async fn test_rejected_submission_never_polls() {
    let api = Arc::new(
        MockDataApi::new()
            .with_statement("select", StatementScript::rejected("ValidationException: bad SQL")),
    );

    let err = executor(&api, fast_poll())
        .execute("SELECT")
        .await
        .err()
        .unwrap();

    assert!(matches!(err, ConnectorError::Submission(_)));
    assert_eq!(api.describe_count(), 0);
}

#[tokio::test]
async fn test_cluster_submission_prefers_secret() {
    let options = ConnectorOptions::from_pairs(&[
        ("region", "us-east-1"),
        ("database", "dev"),
        ("cluster_identifier", "main"),
        ("db_user", "admin"),
        ("secret_arn", "arn:aws:secretsmanager:us-east-1:1:secret:db"),
    ]);
    let identity = Arc::new(ConnectionIdentity::from_options(&options).unwrap());
    let api = Arc::new(
        MockDataApi::new().with_statement("select", StatementScript::rows(&["id"], vec![])),
    );

    let stream = StatementExecutor::new(api.clone(), identity, fast_poll())
        .execute("SELECT 1")
        .await
        .unwrap();
    let rows: Vec<_> = stream.try_collect().await.unwrap();
    assert!(rows.is_empty());

    match &api.calls()[0] {
        MockCall::Execute(input) => {
            assert_eq!(input.database, "dev");
            assert_eq!(input.cluster_identifier.as_deref(), Some("main"));
            assert_eq!(input.workgroup_name, None);
            assert_eq!(
                input.secret_arn.as_deref(),
                Some("arn:aws:secretsmanager:us-east-1:1:secret:db")
            );
            assert_eq!(input.db_user, None);
        }
        other => panic!("expected execute call, got {other:?}"),
    }
}

//! Data API client integration tests.
//!
//! Runs the SDK-backed client against a local stand-in for the Data API.

use futures::TryStreamExt;
use pretty_assertions::assert_eq;
use redshift_source::config::{ConnectorOptions, ConnectorSettings, TableOptions};
use redshift_source::data_api::{
    Credentials, DataApi, ExecuteStatementInput, SdkDataApi, SdkDataApiConfig,
};
use redshift_source::error::ConnectorError;
use redshift_source::source::{Offset, RedshiftConnector, SourceConnector};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

type Responder = fn(&str, &str) -> (u16, String);

/// A request as seen by the stand-in.
#[derive(Debug, Clone)]
struct Received {
    target: String,
    authorization: String,
    body: String,
}

struct StandIn {
    endpoint: String,
    received: Arc<Mutex<Vec<Received>>>,
}

impl StandIn {
    async fn start(respond: Responder) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}/", listener.local_addr().unwrap());
        let received = Arc::new(Mutex::new(Vec::new()));

        let log = received.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(serve(socket, respond, log.clone()));
            }
        });

        Self { endpoint, received }
    }

    fn targets(&self) -> Vec<String> {
        self.received
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.target.clone())
            .collect()
    }

    fn received(&self) -> Vec<Received> {
        self.received.lock().unwrap().clone()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

async fn read_more(socket: &mut TcpStream, buf: &mut Vec<u8>) -> bool {
    let mut chunk = [0u8; 4096];
    match socket.read(&mut chunk).await {
        Ok(0) | Err(_) => false,
        Ok(n) => {
            buf.extend_from_slice(&chunk[..n]);
            true
        }
    }
}

/// Serves keep-alive requests on one connection until the client hangs up.
async fn serve(mut socket: TcpStream, respond: Responder, log: Arc<Mutex<Vec<Received>>>) {
    let mut buf = Vec::new();
    loop {
        let header_end = loop {
            if let Some(pos) = find(&buf, b"\r\n\r\n") {
                break pos + 4;
            }
            if !read_more(&mut socket, &mut buf).await {
                return;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let header = |name: &str| {
            head.lines().find_map(|line| {
                let (key, value) = line.split_once(':')?;
                key.trim()
                    .eq_ignore_ascii_case(name)
                    .then(|| value.trim().to_string())
            })
        };
        let length: usize = header("content-length")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        while buf.len() < header_end + length {
            if !read_more(&mut socket, &mut buf).await {
                return;
            }
        }
        let body = String::from_utf8_lossy(&buf[header_end..header_end + length]).to_string();
        buf.drain(..header_end + length);

        let target = header("x-amz-target").unwrap_or_default();
        log.lock().unwrap().push(Received {
            target: target.clone(),
            authorization: header("authorization").unwrap_or_default(),
            body: body.clone(),
        });

        let (status, payload) = respond(&target, &body);
        let reason = if status == 200 { "OK" } else { "Bad Request" };
        let response = format!(
            "HTTP/1.1 {status} {reason}\r\n\
             content-type: application/x-amz-json-1.1\r\n\
             content-length: {}\r\n\r\n{payload}",
            payload.len()
        );
        if socket.write_all(response.as_bytes()).await.is_err() {
            return;
        }
    }
}

/// Two statements: table discovery ("list") and the snapshot read ("read"),
/// the latter over two pages.
fn redshift(target: &str, body: &str) -> (u16, String) {
    let payload = match target {
        "RedshiftData.ExecuteStatement" if body.contains("information_schema.tables") => {
            json!({"Id": "list"})
        }
        "RedshiftData.ExecuteStatement" => json!({"Id": "read"}),
        "RedshiftData.DescribeStatement" => {
            let id = if body.contains("\"list\"") { "list" } else { "read" };
            json!({"Id": id, "Status": "FINISHED", "HasResultSet": true})
        }
        "RedshiftData.GetStatementResult" if body.contains("\"list\"") => json!({
            "ColumnMetadata": [{"name": "table_schema"}, {"name": "table_name"}],
            "Records": [[{"stringValue": "public"}, {"stringValue": "users"}]],
        }),
        "RedshiftData.GetStatementResult" if body.contains("page-2") => json!({
            "ColumnMetadata": [
                {"name": "id", "typeName": "int4"},
                {"name": "name", "typeName": "varchar"}
            ],
            "Records": [[{"longValue": 2}, {"isNull": true}]],
        }),
        "RedshiftData.GetStatementResult" => json!({
            "ColumnMetadata": [
                {"name": "id", "typeName": "int4"},
                {"name": "name", "typeName": "varchar"}
            ],
            "Records": [[{"longValue": 1}, {"stringValue": "John"}]],
            "NextToken": "page-2",
        }),
        _ => return (400, json!({"message": "unknown target"}).to_string()),
    };
    (200, payload.to_string())
}

fn rejecting(target: &str, _body: &str) -> (u16, String) {
    let payload = json!({
        "__type": "com.amazonaws.redshiftdata#ValidationException",
        "message": format!("{target} is not allowed"),
    });
    (400, payload.to_string())
}

fn settings(endpoint: &str) -> ConnectorSettings {
    let options = ConnectorOptions::from_pairs(&[
        ("region", "us-east-1"),
        ("database", "dev"),
        ("workgroup_name", "analytics"),
        ("access_key_id", "AKIDEXAMPLE"),
        ("secret_access_key", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY"),
        ("poll_interval", "0"),
        ("endpoint", endpoint),
    ]);
    ConnectorSettings::from_options(&options).unwrap()
}

async fn client(endpoint: &str) -> SdkDataApi {
    SdkDataApi::connect(
        SdkDataApiConfig::new("us-east-1")
            .with_credentials(Credentials::new("AKID", "secret"))
            .with_endpoint(endpoint)
            .with_max_attempts(1),
    )
    .await
    .unwrap()
}

fn body(request: &Received) -> Value {
    serde_json::from_str(&request.body).unwrap()
}

#[tokio::test]
async fn test_snapshot_over_http() {
    let stand_in = StandIn::start(redshift).await;
    let connector = RedshiftConnector::connect(settings(&stand_in.endpoint))
        .await
        .unwrap();

    let (stream, offset) = connector
        .read_table("users", &Offset::new(), &TableOptions::default())
        .await
        .unwrap();
    let rows: Vec<_> = stream.try_collect().await.unwrap();

    assert!(offset.is_empty());
    assert_eq!(
        serde_json::to_value(&rows).unwrap(),
        json!([{"id": 1, "name": "John"}, {"id": 2, "name": null}])
    );
    assert_eq!(
        stand_in.targets(),
        vec![
            "RedshiftData.ExecuteStatement",
            "RedshiftData.DescribeStatement",
            "RedshiftData.GetStatementResult",
            "RedshiftData.ExecuteStatement",
            "RedshiftData.DescribeStatement",
            "RedshiftData.GetStatementResult",
            "RedshiftData.GetStatementResult",
        ]
    );

    let received = stand_in.received();
    let read = body(&received[3]);
    assert_eq!(read["Database"], json!("dev"));
    assert_eq!(read["Sql"], json!("SELECT * FROM \"public\".\"users\""));
    assert_eq!(read["WorkgroupName"], json!("analytics"));
    assert_eq!(read.get("ClusterIdentifier"), None);
    assert_eq!(read.get("DbUser"), None);
    assert_eq!(body(&received[6]), json!({"Id": "read", "NextToken": "page-2"}));

    for request in &received {
        assert!(request
            .authorization
            .starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/"));
        assert!(request
            .authorization
            .contains("/us-east-1/redshift-data/aws4_request"));
    }
}

#[tokio::test]
async fn test_cluster_target_forwards_secret_arn() {
    let stand_in = StandIn::start(redshift).await;
    let api = client(&stand_in.endpoint).await;

    let output = api
        .execute_statement(ExecuteStatementInput {
            database: "dev".to_string(),
            sql: "SELECT 1".to_string(),
            cluster_identifier: Some("prod".to_string()),
            secret_arn: Some("arn:aws:secretsmanager:us-east-1:1:secret:x".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(output.id, "read");
    let sent = body(&stand_in.received()[0]);
    assert_eq!(sent["ClusterIdentifier"], json!("prod"));
    assert_eq!(
        sent["SecretArn"],
        json!("arn:aws:secretsmanager:us-east-1:1:secret:x")
    );
    assert_eq!(sent.get("WorkgroupName"), None);
}

#[tokio::test]
async fn test_rejected_execute_is_submission_error() {
    let stand_in = StandIn::start(rejecting).await;
    let api = client(&stand_in.endpoint).await;

    let err = api
        .execute_statement(ExecuteStatementInput {
            database: "dev".to_string(),
            sql: "SELECT 1".to_string(),
            workgroup_name: Some("analytics".to_string()),
            ..Default::default()
        })
        .await
        .unwrap_err();

    match err {
        ConnectorError::Submission(msg) => assert_eq!(
            msg,
            "ValidationException: RedshiftData.ExecuteStatement is not allowed"
        ),
        other => panic!("expected submission error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rejected_describe_is_api_error() {
    let stand_in = StandIn::start(rejecting).await;
    let api = client(&stand_in.endpoint).await;

    let err = api.describe_statement("stmt-1").await.unwrap_err();

    assert!(matches!(err, ConnectorError::Api(_)));
    assert!(err.to_string().contains("Failed to describe statement"));
    assert!(err.to_string().contains("ValidationException"));
    assert_eq!(body(&stand_in.received()[0]), json!({"Id": "stmt-1"}));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_submission_error() {
    // Bind then drop to get a port nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}/", listener.local_addr().unwrap());
    drop(listener);

    let connector = RedshiftConnector::connect(settings(&endpoint))
        .await
        .unwrap();
    let err = connector.list_tables().await.unwrap_err();

    assert!(matches!(err, ConnectorError::Submission(_)));
}

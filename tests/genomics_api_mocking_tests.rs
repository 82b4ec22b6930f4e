//! Workflow repository and poller tests against a mocked genomics service
//!
//! wiremock stands in for the REST API so the tests are deterministic and
//! never leave the machine.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use msgenctl::config::{
    InputConfig, OptionalArgsConfig, OutputConfig, ProcessConfig, StorageConfig, SubmitConfig,
};
use msgenctl::workflows::ReferenceConfidenceMode;
use msgenctl::{
    MsgenError, Poller, RetryConfig, ServiceClient, ServiceConfig, StorageCredential, WaitOptions,
    WorkflowId, WorkflowRepository, WorkflowStatus, WorkflowsClient,
};
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const ACCESS_KEY: &str = "mock-access-key";

/// Genomics API mock server
struct GenomicsApiMock {
    server: MockServer,
}

impl GenomicsApiMock {
    async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    fn repository(&self) -> WorkflowsClient {
        let retry = RetryConfig {
            max_retries: 2,
            min_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
        };
        let config = ServiceConfig::new(self.server.uri(), ACCESS_KEY).with_retry(retry);
        WorkflowsClient::new(ServiceClient::new(&config).unwrap())
    }
}

fn workflow_json(id: u64, status: WorkflowStatus) -> Value {
    json!({
        "Id": id,
        "TenantId": 144,
        "Status": status.code(),
        "CreatedDate": "2024-03-01T12:00:00Z",
        "EndDate": null,
        "FailureCode": 0,
        "Message": null,
        "Description": "sample",
        "Process": "snapgatk-20190409_1",
        "BasesProcessed": 0
    })
}

fn submit_config() -> SubmitConfig {
    let storage = |account: &str, secret: &str, container: &str| StorageConfig {
        credential: StorageCredential::new(account, &STANDARD.encode(secret)).unwrap(),
        container_name: container.to_string(),
    };

    SubmitConfig {
        input: InputConfig {
            storage: storage("input", "input-secret", "data"),
            blob_name: "sample.bam".to_string(),
        },
        process: ProcessConfig {
            name: "snapgatk-20190409_1".to_string(),
            args: "R=hg38m1x".to_string(),
        },
        description: "sample".to_string(),
        output: OutputConfig {
            storage: storage("output", "output-secret", "results"),
            basename: "sample".to_string(),
            overwrite: true,
            include_log: true,
        },
        optional_args: OptionalArgsConfig {
            emit_ref_confidence: ReferenceConfidenceMode::Gvcf,
            bgzip_output: true,
        },
        ignore_azure_region: false,
    }
}

#[tokio::test]
async fn test_submit_posts_signed_workflow() {
    let mock = GenomicsApiMock::new().await;

    Mock::given(method("POST"))
        .and(path("/api/workflows"))
        .and(header("Ocp-Apim-Subscription-Key", ACCESS_KEY))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({
            "WorkflowClass": "",
            "Process": "snapgatk-20190409_1",
            "ProcessArgs": "R=hg38m1x",
            "InputStorageType": "AZURE_BLOCK_BLOB",
            "InputArgs": {
                "ACCOUNT": "input",
                "CONTAINER": "data",
                "BLOBNAMES": "sample.bam"
            },
            "OutputStorageType": "AZURE_BLOCK_BLOB",
            "OutputArgs": {
                "ACCOUNT": "output",
                "CONTAINER": "results",
                "OUTPUT_FILENAME_BASE": "sample",
                "OVERWRITE": true,
                "OUTPUT_INCLUDE_LOGFILES": true
            },
            "OptionalArgs": {
                "GatkEmitRefConfidence": "GVCF",
                "BgzipOutput": true
            },
            "IgnoreAzureRegion": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(workflow_json(
            1597,
            WorkflowStatus::Queued,
        )))
        .expect(1)
        .mount(&mock.server)
        .await;

    let workflow = mock.repository().submit(&submit_config()).await.unwrap();

    assert_eq!(workflow.id, WorkflowId(1597));
    assert_eq!(workflow.status, WorkflowStatus::Queued);
    assert_eq!(workflow.message, "");

    let requests = mock.server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let blob = body["InputArgs"]["BLOBNAMES_WITH_SAS"].as_str().unwrap();
    let container_sas = body["OutputArgs"]["CONTAINER_SAS"].as_str().unwrap();

    assert!(blob.starts_with("sample.bam?sv=2021-12-02&"));
    assert!(blob.contains("sp=r&sr=b&"));
    assert!(container_sas.starts_with("sv=2021-12-02&"));
    assert!(container_sas.contains("sp=rwd&sr=c&"));
}

#[tokio::test]
async fn test_fetch_workflow() {
    let mock = GenomicsApiMock::new().await;

    Mock::given(method("GET"))
        .and(path("/api/workflows/1597"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(workflow_json(1597, WorkflowStatus::Working)),
        )
        .expect(1)
        .mount(&mock.server)
        .await;

    let workflow = mock.repository().fetch(WorkflowId(1597)).await.unwrap();

    assert_eq!(workflow.status, WorkflowStatus::Working);
    assert_eq!(workflow.tenant_id, 144);
    assert_eq!(workflow.end_date, None);
}

#[tokio::test]
async fn test_fetch_all_orders_by_created_date() {
    let mock = GenomicsApiMock::new().await;

    Mock::given(method("GET"))
        .and(path("/api/workflows"))
        .and(query_param("$orderby", "CreatedDate asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            workflow_json(1, WorkflowStatus::Success),
            workflow_json(2, WorkflowStatus::Working),
        ])))
        .expect(1)
        .mount(&mock.server)
        .await;

    let workflows = mock.repository().fetch_all().await.unwrap();
    let ids: Vec<_> = workflows.iter().map(|workflow| workflow.id).collect();

    assert_eq!(ids, vec![WorkflowId(1), WorkflowId(2)]);
}

#[tokio::test]
async fn test_fetch_all_empty() {
    let mock = GenomicsApiMock::new().await;

    Mock::given(method("GET"))
        .and(path("/api/workflows"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock.server)
        .await;

    assert!(mock.repository().fetch_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cancel_uses_delete() {
    let mock = GenomicsApiMock::new().await;

    Mock::given(method("DELETE"))
        .and(path("/api/workflows/42"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(workflow_json(42, WorkflowStatus::Cancelling)),
        )
        .expect(1)
        .mount(&mock.server)
        .await;

    let workflow = mock.repository().cancel(WorkflowId(42)).await.unwrap();
    assert_eq!(workflow.status, WorkflowStatus::Cancelling);
}

#[tokio::test]
async fn test_unknown_status_code_is_a_decode_error() {
    let mock = GenomicsApiMock::new().await;

    let mut body = workflow_json(7, WorkflowStatus::Working);
    body["Status"] = json!(12345);

    Mock::given(method("GET"))
        .and(path("/api/workflows/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&mock.server)
        .await;

    let err = mock.repository().fetch(WorkflowId(7)).await.unwrap_err();
    assert!(matches!(err, MsgenError::Decode { .. }));
    assert!(err.to_string().contains("12345"));
}

#[tokio::test]
async fn test_fetch_retries_transient_server_errors() {
    let mock = GenomicsApiMock::new().await;

    Mock::given(method("GET"))
        .and(path("/api/workflows/7"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/workflows/7"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(workflow_json(7, WorkflowStatus::Success)),
        )
        .expect(1)
        .mount(&mock.server)
        .await;

    let workflow = mock.repository().fetch(WorkflowId(7)).await.unwrap();
    assert_eq!(workflow.status, WorkflowStatus::Success);
}

#[tokio::test]
async fn test_poller_fetches_until_success() {
    let mock = GenomicsApiMock::new().await;

    Mock::given(method("GET"))
        .and(path("/api/workflows/1597"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(workflow_json(1597, WorkflowStatus::Working)),
        )
        .up_to_n_times(3)
        .expect(3)
        .mount(&mock.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/workflows/1597"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(workflow_json(1597, WorkflowStatus::Success)),
        )
        .expect(1)
        .mount(&mock.server)
        .await;

    let repository = mock.repository();
    let workflow = Poller::new(&repository, WaitOptions::new(Duration::from_millis(5)))
        .wait_until_done(WorkflowId(1597))
        .await
        .unwrap();

    assert_eq!(workflow.status, WorkflowStatus::Success);
    assert_eq!(mock.server.received_requests().await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_poller_reports_failed_workflow() {
    let mock = GenomicsApiMock::new().await;

    Mock::given(method("GET"))
        .and(path("/api/workflows/7"))
        .respond_with(|_: &Request| {
            let mut body = workflow_json(7, WorkflowStatus::Failed);
            body["Message"] = json!("Reference genome not found");
            ResponseTemplate::new(200).set_body_json(body)
        })
        .expect(1)
        .mount(&mock.server)
        .await;

    let repository = mock.repository();
    let err = Poller::new(&repository, WaitOptions::new(Duration::from_millis(5)))
        .wait_until_done(WorkflowId(7))
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Workflow 7 unsuccessful: 50000: Reference genome not found"
    );
}

//! Tests of the workflow service client against a mock server.

use bespin::api::ApiError;
use bespin::api::BespinApi;
use bespin::api::JobRequest;
use bespin::api::ServiceApi;
use bespin::api::StagedFileRequest;
use bespin::config::ServiceConfig;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::body_json;
use wiremock::matchers::header;
use wiremock::matchers::method;
use wiremock::matchers::path;
use wiremock::matchers::query_param;

/// Creates a client pointing at the mock server.
fn client_for_server(server: &MockServer) -> BespinApi {
    let config = ServiceConfig {
        url: format!("{}/api", server.uri()),
        token: String::from("secret"),
        ..Default::default()
    };
    BespinApi::new(&config, "bespin-test").expect("client creation should succeed")
}

#[tokio::test]
async fn sends_token_and_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/dds-user-credentials/"))
        .and(header("authorization", "Token secret"))
        .and(header("user-agent", "bespin-test"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "id": 5, "dds_id": "user-1" }])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let credentials = client_for_server(&server)
        .list_credentials()
        .await
        .expect("credentials should be listed");
    assert_eq!(credentials.len(), 1);
    assert_eq!(credentials[0].id, 5);
    assert_eq!(credentials[0].external_id, "user-1");
}

#[tokio::test]
async fn resolves_template_by_slug() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/job-questionnaires/"))
        .and(query_param("slug", "exomeseq/v1/human"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 9,
            "name": "Human exome",
            "slug": "exomeseq/v1/human",
            "user_fields_json": "[{\"name\": \"reads\", \"type\": \"File\"}]"
        }])))
        .mount(&server)
        .await;

    let questionnaire = client_for_server(&server)
        .resolve_workflow_template("exomeseq/v1/human")
        .await
        .expect("questionnaire should resolve");
    assert_eq!(questionnaire.id, 9);
    assert_eq!(questionnaire.slug, "exomeseq/v1/human");
}

#[tokio::test]
async fn unknown_tag_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/job-questionnaires/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let err = client_for_server(&server)
        .resolve_workflow_template("missing/v1/human")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)), "unexpected error {err:?}");
}

#[tokio::test]
async fn registers_staged_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/dds-job-input-files/"))
        .and(body_json(json!({
            "project_id": "project-1",
            "file_id": "file-1",
            "destination_path": "dds_project_reads.fastq",
            "sequence_group": 1,
            "sequence": 0,
            "dds_user_credentials": 5,
            "stage_group": 7,
            "size": 1024
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 1 })))
        .expect(1)
        .mount(&server)
        .await;

    client_for_server(&server)
        .register_staged_file(&StagedFileRequest {
            project_id: String::from("project-1"),
            file_id: String::from("file-1"),
            destination_path: String::from("dds_project_reads.fastq"),
            sequence_group: 1,
            sequence: 0,
            credential_id: 5,
            stage_group_id: 7,
            size: 1024,
        })
        .await
        .expect("file should be registered");
}

#[tokio::test]
async fn creates_job_from_answer_set() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/job-answer-sets/"))
        .and(body_json(json!({
            "job_name": "exome run",
            "fund_code": "001",
            "user_job_order_json": "{\"count\":3}",
            "questionnaire": 9,
            "stage_group": 7
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 11 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/job-answer-sets/11/create-job/"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "id": 42, "name": "exome run" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let job = client_for_server(&server)
        .create_job(&JobRequest {
            name: String::from("exome run"),
            fund_code: String::from("001"),
            parameters: String::from("{\"count\":3}"),
            template_id: 9,
            stage_group_id: 7,
        })
        .await
        .expect("job should be created");
    assert_eq!(job.id, 42);
    assert_eq!(job.name, "exome run");
}

#[tokio::test]
async fn authorizes_and_starts_job() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/jobs/42/authorize/"))
        .and(body_json(json!({ "token": "run-token" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/jobs/42/start/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let api = client_for_server(&server);
    api.authorize_job(42, "run-token")
        .await
        .expect("job should be authorized");
    api.start_job(42).await.expect("job should start");
}

#[tokio::test]
async fn missing_job_is_reported_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/jobs/404/cancel/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "detail": "Not found." })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/jobs/404/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let api = client_for_server(&server);
    let err = api.cancel_job(404).await.unwrap_err();
    assert_eq!(err.to_string(), "no job found for id: 404");

    let err = api.delete_job(404).await.unwrap_err();
    assert!(matches!(err, ApiError::JobNotFound(404)), "unexpected error {err:?}");
}

#[tokio::test]
async fn reports_error_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/jobs/3/restart/"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({ "detail": "Job is already running." })),
        )
        .mount(&server)
        .await;

    let err = client_for_server(&server).restart_job(3).await.unwrap_err();
    match err {
        ApiError::Status { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Job is already running.");
        }
        err => panic!("unexpected error {err:?}"),
    }
}

#[tokio::test]
async fn finds_workflow_by_tag() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/workflows/"))
        .and(query_param("tag", "exomeseq"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 1,
            "name": "Exome Seq",
            "tag": "exomeseq",
            "versions": [3, 4]
        }])))
        .mount(&server)
        .await;

    let workflow = client_for_server(&server)
        .workflow_for_tag("exomeseq")
        .await
        .expect("workflow should be found");
    assert_eq!(workflow.id, 1);
    assert_eq!(workflow.versions, vec![3, 4]);
}

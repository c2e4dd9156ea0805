//! Request/response mapping against a mock server

use mig_http::{AwxSource, ControllerTarget, Endpoint};
use mig_model::{ClientError, EntityId, EntityKind, Relation, Scope, SourceReader, TargetClient};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn endpoint(server: &MockServer) -> Endpoint {
    Endpoint::new(format!("{}/", server.uri()), "tok-123")
}

#[tokio::test]
async fn listing_follows_relative_next_links() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/projects/"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "next": null,
            "results": [{ "id": 3, "name": "web" }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/projects/"))
        .and(query_param("page_size", "200"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "next": "/api/v2/projects/?page=2",
            "results": [{ "id": 1, "name": "infra" }, { "id": 2, "name": "db" }]
        })))
        .mount(&server)
        .await;

    let source = AwxSource::new(&endpoint(&server)).unwrap();
    let projects = source.list(EntityKind::Project).await.unwrap();

    let names: Vec<_> = projects.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["infra", "db", "web"]);
}

#[tokio::test]
async fn related_listing_reads_data_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/job_templates/7/credentials/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "id": 11, "name": "deploy-key" }]
        })))
        .mount(&server)
        .await;

    let source = AwxSource::new(&endpoint(&server)).unwrap();
    let credentials = source
        .related(EntityKind::JobTemplate, EntityId(7), Relation::Credentials)
        .await
        .unwrap();

    assert_eq!(credentials.len(), 1);
    assert_eq!(credentials[0].kind, EntityKind::Credential);
    assert_eq!(credentials[0].id, EntityId(11));
}

#[tokio::test]
async fn missing_record_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/projects/99/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "detail": "Not found." })))
        .mount(&server)
        .await;

    let source = AwxSource::new(&endpoint(&server)).unwrap();
    let err = source.get(EntityKind::Project, EntityId(99)).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn find_by_name_sends_name_and_scope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/controller/v2/inventories/"))
        .and(query_param("name", "Prod Inv"))
        .and(query_param("organization", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{ "id": 40, "name": "Prod Inv", "organization": 2 }]
        })))
        .mount(&server)
        .await;

    let target = ControllerTarget::new(&endpoint(&server)).unwrap();
    let found = target
        .find_by_name(EntityKind::Inventory, " Prod Inv ", Scope::Organization(EntityId(2)))
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].organization, Some(EntityId(2)));
}

#[tokio::test]
async fn bad_request_is_validation_with_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/controller/v2/schedules/"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_string(r#"{"unified_job_template":["Invalid pk"]}"#),
        )
        .mount(&server)
        .await;

    let target = ControllerTarget::new(&endpoint(&server)).unwrap();
    let err = target
        .create(EntityKind::Schedule, json!({ "name": "nightly" }))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ClientError::validation(400, r#"{"unified_job_template":["Invalid pk"]}"#)
    );
}

#[tokio::test]
async fn create_decodes_the_created_record() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/controller/v2/projects/"))
        .and(body_json(json!({ "name": "infra", "organization": 2 })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 90, "name": "infra", "organization": 2
        })))
        .mount(&server)
        .await;

    let target = ControllerTarget::new(&endpoint(&server)).unwrap();
    let created = target
        .create(EntityKind::Project, json!({ "name": "infra", "organization": 2 }))
        .await
        .unwrap();
    assert_eq!(created.id, EntityId(90));
}

#[tokio::test]
async fn attach_posts_child_id_and_accepts_empty_ack() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/controller/v2/job_templates/5/notification_templates_error/"))
        .and(body_json(json!({ "id": 9 })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let target = ControllerTarget::new(&endpoint(&server)).unwrap();
    target
        .attach(
            EntityKind::JobTemplate,
            EntityId(5),
            Relation::NotificationsError,
            EntityId(9),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn ping_reports_rejected_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/controller/v2/ping/"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Authentication credentials were not provided."))
        .mount(&server)
        .await;

    let target = ControllerTarget::new(&endpoint(&server)).unwrap();
    let err = target.ping().await.unwrap_err();
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn server_error_is_transport_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/controller/v2/job_templates/5/"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let target = ControllerTarget::new(&endpoint(&server)).unwrap();
    let err = target
        .patch(EntityKind::JobTemplate, EntityId(5), json!({ "execution_environment": 3 }))
        .await
        .unwrap_err();

    let ClientError::Transport { status, message } = err else {
        panic!("expected transport error");
    };
    assert_eq!(status, Some(503));
    assert!(message.contains("maintenance"));
}

#[test]
fn owner_urls_are_api_paths() {
    let target = ControllerTarget::new(&Endpoint::new("https://aap.example.com", "t")).unwrap();
    assert_eq!(
        target.resource_url(EntityKind::JobTemplate, EntityId(40)),
        "/api/controller/v2/job_templates/40/"
    );
}

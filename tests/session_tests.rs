//! Integration tests using wiremock to simulate a test-management server.

use alm_connector::{Entity, Error, Session, TestRunBuilder};
use serde_json::{json, Value};
use wiremock::matchers::{
    body_string, body_string_contains, header, method, path, query_param, query_param_is_missing,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BASE: &str = "/qcbin";
const COLLECTION: &str = "/qcbin/rest/domains/DEFAULT/projects/Demo";
const SSO_COOKIE: &str = "LWSSO_COOKIE_KEY=sso-token";
const ALL_COOKIES: &str = "LWSSO_COOKIE_KEY=sso-token; QCSession=qc-session";

fn entity_json(entity_type: &str, id: i64, name: &str) -> Value {
    json!({
        "Type": entity_type,
        "Fields": [
            {"Name": "id", "values": [{"value": id.to_string()}]},
            {"Name": "name", "values": [{"value": name}]}
        ]
    })
}

fn page_json(ids: std::ops::RangeInclusive<i64>, total: usize) -> Value {
    let entities: Vec<Value> = ids
        .map(|id| entity_json("test", id, &format!("test {}", id)))
        .collect();
    json!({"entities": entities, "TotalResults": total})
}

async fn mount_challenge(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("{}/rest/is-authenticated", BASE)))
        .respond_with(ResponseTemplate::new(401).insert_header(
            "WWW-Authenticate",
            format!("LWSSO realm=\"{}{}/authentication-point\"", server.uri(), BASE).as_str(),
        ))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_credentials(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(format!("{}/authentication-point/alm-authenticate", BASE)))
        .and(body_string_contains("<user>tester</user>"))
        .and(body_string_contains("<password>s&amp;cret</password>"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("Set-Cookie", "LWSSO_COOKIE_KEY=sso-token; Path=/; HttpOnly"),
        )
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_auth(server: &MockServer) {
    mount_challenge(server).await;
    mount_credentials(server).await;

    Mock::given(method("POST"))
        .and(path(format!("{}/rest/site-session", BASE)))
        .and(header("cookie", SSO_COOKIE))
        .and(body_string(
            "<session-parameters><time-out>5</time-out></session-parameters>",
        ))
        .respond_with(
            ResponseTemplate::new(200).insert_header("Set-Cookie", "QCSession=qc-session; Path=/"),
        )
        .expect(1)
        .mount(server)
        .await;
}

async fn connect_with_page_size(server: &MockServer, page_size: Option<u32>) -> Session {
    let mut builder = Session::builder()
        .server_url(format!("{}{}", server.uri(), BASE))
        .unwrap()
        .project("Demo")
        .credentials("tester", "s&cret");
    if let Some(page_size) = page_size {
        builder = builder.page_size(page_size);
    }
    builder.connect().await.unwrap()
}

async fn connect(server: &MockServer) -> Session {
    connect_with_page_size(server, None).await
}

#[tokio::test]
async fn test_handshake_yields_usable_session() {
    let server = MockServer::start().await;
    mount_auth(&server).await;

    let session = connect(&server).await;

    assert_eq!(session.user(), "tester");
    assert_eq!(session.domain(), "DEFAULT");
    assert_eq!(session.project(), "Demo");
    assert_eq!(
        session.connector().cookie("QCSession").as_deref(),
        Some("qc-session")
    );
    server.verify().await;
}

#[tokio::test]
async fn test_missing_session_cookie_fails_construction() {
    let server = MockServer::start().await;
    mount_challenge(&server).await;
    mount_credentials(&server).await;

    Mock::given(method("POST"))
        .and(path(format!("{}/rest/site-session", BASE)))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let result = Session::builder()
        .server_url(format!("{}{}", server.uri(), BASE))
        .unwrap()
        .project("Demo")
        .credentials("tester", "s&cret")
        .connect()
        .await;

    match result {
        Err(Error::MissingCookie(name)) => assert_eq!(name, "QCSession"),
        other => panic!("Expected MissingCookie, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_sso_cookie_fails_construction() {
    let server = MockServer::start().await;
    mount_challenge(&server).await;

    Mock::given(method("POST"))
        .and(path(format!("{}/authentication-point/alm-authenticate", BASE)))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}/rest/site-session", BASE)))
        .respond_with(
            ResponseTemplate::new(200).insert_header("Set-Cookie", "QCSession=qc-session; Path=/"),
        )
        .expect(0)
        .mount(&server)
        .await;

    let result = Session::builder()
        .server_url(format!("{}{}", server.uri(), BASE))
        .unwrap()
        .project("Demo")
        .credentials("tester", "s&cret")
        .connect()
        .await;

    match result {
        Err(Error::MissingCookie(name)) => assert_eq!(name, "LWSSO_COOKIE_KEY"),
        other => panic!("Expected MissingCookie, got {:?}", other),
    }
    server.verify().await;
}

#[tokio::test]
async fn test_probe_must_answer_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{}/rest/is-authenticated", BASE)))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = Session::builder()
        .server_url(format!("{}{}", server.uri(), BASE))
        .unwrap()
        .project("Demo")
        .credentials("tester", "pw")
        .connect()
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UnexpectedAuthStatus(status) if status.as_u16() == 200));
    assert!(err.is_authentication());
}

#[tokio::test]
async fn test_missing_or_foreign_challenge_fails() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{}/rest/is-authenticated", BASE)))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/rest/is-authenticated", BASE)))
        .respond_with(
            ResponseTemplate::new(401).insert_header("WWW-Authenticate", "Basic realm=\"x\""),
        )
        .mount(&server)
        .await;

    let builder = || {
        Session::builder()
            .server_url(format!("{}{}", server.uri(), BASE))
            .unwrap()
            .project("Demo")
            .credentials("tester", "pw")
    };

    let err = builder().connect().await.unwrap_err();
    assert!(matches!(err, Error::MissingAuthChallenge));

    let err = builder().connect().await.unwrap_err();
    assert!(matches!(err, Error::UnsupportedRealm(ref realm) if realm == "Basic realm=\"x\""));
}

#[tokio::test]
async fn test_invalid_credentials() {
    let server = MockServer::start().await;
    mount_challenge(&server).await;

    Mock::given(method("POST"))
        .and(path(format!("{}/authentication-point/alm-authenticate", BASE)))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = Session::builder()
        .server_url(format!("{}{}", server.uri(), BASE))
        .unwrap()
        .project("Demo")
        .credentials("tester", "wrong")
        .connect()
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidCredentials));
}

#[tokio::test]
async fn test_site_session_rejected() {
    let server = MockServer::start().await;
    mount_challenge(&server).await;
    mount_credentials(&server).await;

    Mock::given(method("POST"))
        .and(path(format!("{}/rest/site-session", BASE)))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = Session::builder()
        .server_url(format!("{}{}", server.uri(), BASE))
        .unwrap()
        .project("Demo")
        .credentials("tester", "s&cret")
        .connect()
        .await
        .unwrap_err();

    match err {
        Error::SessionRejected { user, status } => {
            assert_eq!(user, "tester");
            assert_eq!(status.as_u16(), 403);
        }
        other => panic!("Expected SessionRejected, got {:?}", other),
    }
}

#[tokio::test]
async fn test_create_entity_returns_server_entity() {
    let server = MockServer::start().await;
    mount_auth(&server).await;

    Mock::given(method("POST"))
        .and(path(format!("{}/runs", COLLECTION)))
        .and(header("cookie", ALL_COOKIES))
        .and(header("content-type", "application/json"))
        .and(body_string_contains("\"Type\":\"run\""))
        .and(body_string_contains("\"Name\":\"name\""))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "Type": "run",
            "Fields": [
                {"Name": "id", "values": [{"value": "1017"}]},
                {"Name": "name", "values": [{"value": "nightly"}]},
                {"Name": "status", "values": [{"value": "No Run"}]}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = connect(&server).await;
    let run = TestRunBuilder::new().name("nightly").create();
    let created = session.create_entity(&run).await.unwrap();

    assert_eq!(created.id().unwrap(), 1017);
    assert_eq!(created.string_value("status").unwrap(), "No Run");
    assert!(run.first_value("id").is_none());
}

#[tokio::test]
async fn test_create_failure_carries_title_and_code() {
    let server = MockServer::start().await;
    mount_auth(&server).await;

    Mock::given(method("POST"))
        .and(path(format!("{}/runs", COLLECTION)))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"Id": "QCIL00001", "Title": "Foo"})),
        )
        .mount(&server)
        .await;

    let session = connect(&server).await;
    let err = session
        .create_entity(&TestRunBuilder::new().create())
        .await
        .unwrap_err();

    match err {
        Error::Server {
            status,
            title,
            code,
        } => {
            assert_eq!(status.as_u16(), 400);
            assert_eq!(title.as_deref(), Some("Foo"));
            assert_eq!(code.as_deref(), Some("QCIL00001"));
        }
        other => panic!("Expected Server error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_failure_without_body_reports_status() {
    let server = MockServer::start().await;
    mount_auth(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("{}/tests/9", COLLECTION)))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>boom</html>"))
        .mount(&server)
        .await;

    let session = connect(&server).await;
    let err = session.get_entity("test", 9).await.unwrap_err();

    match err {
        Error::HttpError {
            status,
            raw_response,
        } => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(raw_response, "<html>boom</html>");
        }
        other => panic!("Expected HttpError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_update_get_and_delete() {
    let server = MockServer::start().await;
    mount_auth(&server).await;

    Mock::given(method("PUT"))
        .and(path(format!("{}/tests/42", COLLECTION)))
        .and(body_string_contains("renamed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(entity_json("test", 42, "renamed")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/tests/42", COLLECTION)))
        .and(header("cookie", ALL_COOKIES))
        .respond_with(ResponseTemplate::new(200).set_body_json(entity_json("test", 42, "renamed")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("{}/tests/42", COLLECTION)))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let session = connect(&server).await;

    let mut values = Entity::new("test");
    values.set_value("name", "renamed");
    let updated = session.update_entity(42, &values).await.unwrap();
    assert_eq!(updated.string_value("name").unwrap(), "renamed");

    let fetched = session.test(42).await.unwrap();
    assert_eq!(fetched.id().unwrap(), 42);

    session.delete_entity("test", 42).await.unwrap();
    session.delete(&fetched).await.unwrap();
    server.verify().await;
}

#[tokio::test]
async fn test_create_attachment_sends_slug() {
    let server = MockServer::start().await;
    mount_auth(&server).await;

    Mock::given(method("POST"))
        .and(path(format!("{}/runs/1017/attachments", COLLECTION)))
        .and(header("slug", "report.txt"))
        .and(header("content-type", "application/octet-stream"))
        .and(body_string("all green"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(entity_json("attachment", 5, "report.txt")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let session = connect(&server).await;
    let mut run = Entity::new("run");
    run.set_value("id", "1017");

    let attachment = session
        .create_attachment(&run, "report.txt", b"all green".to_vec())
        .await
        .unwrap();
    assert_eq!(attachment.entity_type(), "attachment");
    assert_eq!(attachment.string_value("name").unwrap(), "report.txt");
}

#[tokio::test]
async fn test_paging_fetches_each_page_once() {
    let server = MockServer::start().await;
    mount_auth(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("{}/tests", COLLECTION)))
        .and(query_param("query", "{name['test*']}"))
        .and(query_param("page-size", "2"))
        .and(query_param_is_missing("start-index"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(1..=2, 5)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/tests", COLLECTION)))
        .and(query_param("page-size", "2"))
        .and(query_param("start-index", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(3..=4, 5)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/tests", COLLECTION)))
        .and(query_param("page-size", "2"))
        .and(query_param("start-index", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(5..=5, 5)))
        .expect(1)
        .mount(&server)
        .await;

    let session = connect_with_page_size(&server, Some(2)).await;
    let tests = session
        .query_entities("test", Some("name['test*']"))
        .await
        .unwrap();
    assert_eq!(tests.total_count(), 5);

    let mut cursor = tests.cursor();
    let mut ids = Vec::new();
    while let Some(test) = cursor.try_next().await.unwrap() {
        ids.push(test.id().unwrap());
    }
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);

    assert!(!cursor.has_next());
    assert!(cursor.try_next().await.unwrap().is_none());
    assert!(matches!(
        cursor.next_entity().await,
        Err(Error::PageExhausted { total: 5, .. })
    ));
    server.verify().await;
}

#[tokio::test]
async fn test_each_cursor_refetches_independently() {
    let server = MockServer::start().await;
    mount_auth(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("{}/tests", COLLECTION)))
        .and(query_param_is_missing("start-index"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(1..=2, 3)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/tests", COLLECTION)))
        .and(query_param("start-index", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(3..=3, 3)))
        .expect(2)
        .mount(&server)
        .await;

    let session = connect(&server).await;
    let tests = session.tests().await.unwrap();

    let first = tests.collect_all().await.unwrap();
    let second = tests.collect_all().await.unwrap();
    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
    server.verify().await;
}

#[tokio::test]
async fn test_single_page_result_is_served_from_memory() {
    let server = MockServer::start().await;
    mount_auth(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("{}/test-sets", COLLECTION)))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(1..=3, 3)))
        .expect(1)
        .mount(&server)
        .await;

    let session = connect(&server).await;
    let sets = session.query_entities("test-set", None).await.unwrap();

    let all = sets.collect_all().await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(sets.first_page().len(), 3);
    server.verify().await;
}

#[tokio::test]
async fn test_empty_result_yields_nothing() {
    let server = MockServer::start().await;
    mount_auth(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("{}/tests", COLLECTION)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"TotalResults": 0})))
        .expect(1)
        .mount(&server)
        .await;

    let session = connect(&server).await;
    let tests = session
        .query_entities("test", Some("id[>0]"))
        .await
        .unwrap();
    assert_eq!(tests.total_count(), 0);
    assert!(tests.cursor().try_next().await.unwrap().is_none());
}

#[tokio::test]
async fn test_empty_first_page_with_declared_total_is_fatal() {
    let server = MockServer::start().await;
    mount_auth(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("{}/tests", COLLECTION)))
        .and(query_param_is_missing("start-index"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"entities": [], "TotalResults": 5})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/tests", COLLECTION)))
        .and(query_param("start-index", "1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"entities": [], "TotalResults": 5})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let session = connect(&server).await;
    let tests = session.tests().await.unwrap();
    assert_eq!(tests.total_count(), 5);

    match tests.collect_all().await {
        Err(Error::UnexpectedEmptyPage { start_index, total }) => {
            assert_eq!(start_index, 1);
            assert_eq!(total, 5);
        }
        other => panic!("Expected UnexpectedEmptyPage, got {:?}", other),
    }
    server.verify().await;
}

#[tokio::test]
async fn test_empty_page_before_declared_total_is_fatal() {
    let server = MockServer::start().await;
    mount_auth(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("{}/tests", COLLECTION)))
        .and(query_param_is_missing("start-index"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(1..=2, 4)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/tests", COLLECTION)))
        .and(query_param("start-index", "3"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"entities": [], "TotalResults": 4})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let session = connect(&server).await;
    let tests = session.tests().await.unwrap();
    let mut cursor = tests.cursor();

    assert_eq!(cursor.try_next().await.unwrap().unwrap().id().unwrap(), 1);
    assert_eq!(cursor.try_next().await.unwrap().unwrap().id().unwrap(), 2);
    match cursor.try_next().await {
        Err(Error::UnexpectedEmptyPage { start_index, total }) => {
            assert_eq!(start_index, 3);
            assert_eq!(total, 4);
        }
        other => panic!("Expected UnexpectedEmptyPage, got {:?}", other),
    }
    assert!(cursor.try_next().await.unwrap().is_none());
    server.verify().await;
}

#[tokio::test]
async fn test_server_time_zone() {
    let server = MockServer::start().await;
    mount_auth(&server).await;

    // 2015-01-01 00:00:00 UTC, wall clock 5h45m ahead
    Mock::given(method("GET"))
        .and(path(format!("{}/rest/server/time", BASE)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "TimeInMillis": "1420070400000",
            "DateTime": "2015-01-01 05:45:00"
        })))
        .mount(&server)
        .await;

    let session = connect(&server).await;
    let time = session.server_time().await.unwrap();
    assert_eq!(time.time_in_millis, "1420070400000");

    let zone = session.determine_server_time_zone().await.unwrap();
    assert_eq!(zone.local_minus_utc(), 5 * 3600 + 45 * 60);
    assert_eq!(alm_connector::format::format_offset(&zone), "GMT+5:45");
}

#[tokio::test]
async fn test_extend_timeout_reports_rejection() {
    let server = MockServer::start().await;
    mount_auth(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("{}/rest/site-session", BASE)))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "Id": "qccore.session-has-timed-out",
            "Title": "Session timed out"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = connect(&server).await;
    let err = session.extend_timeout().await.unwrap_err();

    assert_eq!(err.status().map(|s| s.as_u16()), Some(401));
    assert_eq!(err.server_code(), Some("qccore.session-has-timed-out"));
    assert_eq!(err.server_title(), Some("Session timed out"));
}

#[tokio::test]
async fn test_extend_timeout_and_logout() {
    let server = MockServer::start().await;
    mount_auth(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("{}/rest/site-session", BASE)))
        .and(header("cookie", ALL_COOKIES))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/authentication-point/logout", BASE)))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let session = connect(&server).await;
    session.extend_timeout().await.unwrap();
    session.extend_timeout().await.unwrap();

    // best-effort: a failing logout status is not an error
    session.logout().await.unwrap();
    server.verify().await;
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    let err = Session::builder()
        .server_url("http://127.0.0.1:1/qcbin")
        .unwrap()
        .project("Demo")
        .credentials("tester", "pw")
        .connect()
        .await
        .unwrap_err();

    assert!(err.is_transport(), "Expected transport error, got {:?}", err);
}

fn instance_json(id: i64, order: i64) -> Value {
    json!({
        "Type": "test-instance",
        "Fields": [
            {"Name": "id", "values": [{"value": id.to_string()}]},
            {"Name": "test-order", "values": [{"value": order.to_string()}]}
        ]
    })
}

#[tokio::test]
async fn test_create_or_get_test_instance_orders_after_siblings() {
    let server = MockServer::start().await;
    mount_auth(&server).await;

    // First lookup finds nothing, the lookup after creating finds the instance
    Mock::given(method("GET"))
        .and(path(format!("{}/test-instances", COLLECTION)))
        .and(query_param("query", "{cycle-id[7]; test-id[3]}"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"TotalResults": 0})))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/test-instances", COLLECTION)))
        .and(query_param("query", "{cycle-id[7]; test-id[3]}"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entities": [instance_json(99, 3)],
            "TotalResults": 1
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/test-instances", COLLECTION)))
        .and(query_param("query", "{cycle-id[7]}"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entities": [instance_json(10, 1), instance_json(11, 2)],
            "TotalResults": 2
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}/test-instances", COLLECTION)))
        .and(body_string_contains(r#"{"Name":"test-order","values":[{"value":"3"}]}"#))
        .respond_with(ResponseTemplate::new(201).set_body_json(instance_json(98, 3)))
        .expect(1)
        .mount(&server)
        .await;

    let session = connect(&server).await;
    let instance = alm_connector::helpers::create_or_get_test_instance(&session, 7, 3, None)
        .await
        .unwrap();

    assert_eq!(instance.id().unwrap(), 99);
    server.verify().await;
}

#[tokio::test]
async fn test_create_or_get_test_set_reuses_existing() {
    let server = MockServer::start().await;
    mount_auth(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("{}/test-sets", COLLECTION)))
        .and(query_param("query", "{parent-id[4]; name['Nightly']}"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entities": [entity_json("test-set", 12, "Nightly")],
            "TotalResults": 1
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let session = connect(&server).await;
    let set = alm_connector::helpers::create_or_get_test_set(&session, 4, "Nightly")
        .await
        .unwrap();
    assert_eq!(set.id().unwrap(), 12);
}

#[tokio::test]
async fn test_create_test_set_folder_path_creates_missing_folders() {
    let server = MockServer::start().await;
    mount_auth(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("{}/test-set-folders", COLLECTION)))
        .and(query_param("query", "{name['Root']}"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entities": [entity_json("test-set-folder", 1, "Root")],
            "TotalResults": 1
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/test-set-folders", COLLECTION)))
        .and(query_param("query", "{name['UI']; parent-id[1]}"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"TotalResults": 0})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}/test-set-folders", COLLECTION)))
        .and(body_string_contains(r#"{"Name":"parent-id","values":[{"value":"1"}]}"#))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(entity_json("test-set-folder", 2, "UI")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let session = connect(&server).await;
    let folder = alm_connector::helpers::create_test_set_folder_path(&session, "Root/UI")
        .await
        .unwrap();
    assert_eq!(folder.id().unwrap(), 2);

    let err = alm_connector::helpers::create_test_set_folder_path(&session, "Root//UI")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidPath(_)));
    server.verify().await;
}

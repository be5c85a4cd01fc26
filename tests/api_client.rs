use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::json;
use tiny_http::{Header, Response, Server};

use vidtube_tui::api::{self, ApiError};

struct Recorded {
    method: String,
    url: String,
    cookie: Option<String>,
}

struct Canned {
    status: u16,
    body: String,
    headers: Vec<(&'static str, String)>,
}

struct Stub {
    base_url: String,
    seen: Arc<Mutex<Vec<Recorded>>>,
}

fn ok(body: serde_json::Value) -> Canned {
    Canned {
        status: 200,
        body: body.to_string(),
        headers: Vec::new(),
    }
}

/// Responses are served in order; the server exits once the script is done.
fn serve(mut responses: Vec<Canned>) -> Stub {
    let server = Server::http("127.0.0.1:0").expect("bind stub server");
    let base_url = format!("http://{}/backend/", server.server_addr());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    thread::spawn(move || {
        for request in server.incoming_requests() {
            let cookie = request
                .headers()
                .iter()
                .find(|h| h.field.equiv("Cookie"))
                .map(|h| h.value.as_str().to_string());
            log.lock().push(Recorded {
                method: request.method().to_string(),
                url: request.url().to_string(),
                cookie,
            });
            let canned = if responses.is_empty() {
                Canned {
                    status: 500,
                    body: "unexpected request".into(),
                    headers: Vec::new(),
                }
            } else {
                responses.remove(0)
            };
            let mut response = Response::from_string(canned.body).with_status_code(canned.status);
            for (name, value) in canned.headers {
                response = response.with_header(
                    Header::from_bytes(name.as_bytes(), value.as_bytes()).expect("stub header"),
                );
            }
            let _ = request.respond(response);
            if responses.is_empty() {
                break;
            }
        }
    });
    Stub { base_url, seen }
}

fn client(base_url: &str) -> api::Client {
    api::Client::new(api::ClientConfig {
        user_agent: "vidtube-tui-tests/0.1".into(),
        base_url: Some(base_url.to_string()),
        path_prefix: Some("/api".to_string()),
        timeout: Some(Duration::from_secs(5)),
    })
    .expect("build client")
}

#[test]
fn path_prefix_is_rewritten_onto_the_base_url() {
    let stub = serve(vec![ok(json!({
        "success": true,
        "message": "ok",
        "data": {
            "videos": [{"_id": "v1", "title": "Desert ride"}],
            "currentPage": 2,
            "totalPages": 5,
        },
    }))]);
    let client = client(&stub.base_url);

    let page = client.videos(2).expect("videos");
    assert_eq!(page.page, 2);
    assert_eq!(page.total_pages, 5);
    assert_eq!(page.videos.len(), 1);
    assert_eq!(page.videos[0].title, "Desert ride");

    let seen = stub.seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].method, "GET");
    assert_eq!(seen[0].url, "/backend/v1/videos/getAll?page=2");
}

#[test]
fn login_cookie_is_replayed_on_later_requests() {
    let stub = serve(vec![
        Canned {
            status: 200,
            body: json!({"success": true, "message": "ok", "data": {}}).to_string(),
            headers: vec![("Set-Cookie", "accessToken=abc123; Path=/".to_string())],
        },
        ok(json!({
            "success": true,
            "message": "ok",
            "data": {"_id": "u1", "username": "chai"},
        })),
    ]);
    let client = client(&stub.base_url);

    client
        .login(&api::LoginCredentials {
            email: "chai@example.com".into(),
            username: "chai".into(),
            password: "hunter2".into(),
        })
        .expect("login");
    let user = client.current_user().expect("current user");
    assert_eq!(user.username, "chai");

    let seen = stub.seen.lock();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].method, "POST");
    assert_eq!(seen[0].url, "/backend/v1/users/login");
    assert_eq!(seen[1].url, "/backend/v1/users/current-user");
    let cookie = seen[1].cookie.as_deref().unwrap_or("");
    assert!(
        cookie.contains("accessToken=abc123"),
        "cookie was: {cookie}"
    );
}

#[test]
fn error_envelope_message_is_surfaced() {
    let stub = serve(vec![Canned {
        status: 404,
        body: json!({"success": false, "message": "video not found"}).to_string(),
        headers: Vec::new(),
    }]);
    let client = client(&stub.base_url);

    let err = client.delete_video("missing").expect_err("delete should fail");
    match err {
        ApiError::Api { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "video not found");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let seen = stub.seen.lock();
    assert_eq!(seen[0].method, "DELETE");
    assert_eq!(seen[0].url, "/backend/v1/videos/delete/missing");
}

#[test]
fn non_json_error_body_falls_back_to_the_status() {
    let stub = serve(vec![Canned {
        status: 500,
        body: "boom".into(),
        headers: Vec::new(),
    }]);
    let client = client(&stub.base_url);

    let err = client.delete_video("v1").expect_err("delete should fail");
    match err {
        ApiError::Api { status, message } => {
            assert_eq!(status, 500);
            assert!(message.contains("500"), "message was: {message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn unauthorized_maps_to_its_own_variant() {
    let stub = serve(vec![Canned {
        status: 401,
        body: json!({"success": false, "message": "jwt expired"}).to_string(),
        headers: Vec::new(),
    }]);
    let client = client(&stub.base_url);

    let err = client.channel_stats().expect_err("stats should fail");
    assert!(matches!(err, ApiError::Unauthorized), "got: {err:?}");
}

#[test]
fn success_false_in_an_ok_body_is_an_api_error() {
    let stub = serve(vec![ok(json!({
        "success": false,
        "message": "token expired",
    }))]);
    let client = client(&stub.base_url);

    let err = client.current_user().expect_err("current user should fail");
    match err {
        ApiError::Api { status, message } => {
            assert_eq!(status, 200);
            assert_eq!(message, "token expired");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn missing_data_is_a_decode_error() {
    let stub = serve(vec![ok(json!({"success": true, "message": "ok"}))]);
    let client = client(&stub.base_url);

    let err = client.current_user().expect_err("current user should fail");
    match err {
        ApiError::Decode(message) => {
            assert!(message.contains("data missing"), "message was: {message}")
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

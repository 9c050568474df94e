//! Console REST client against a local HTTP server

use std::io::Read;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use logdeck_client::{ConsoleApi, ServiceRecord, DEFAULT_TIMEOUT};
use logdeck_core::{Credential, Error, LogTarget, SessionKey};
use url::Url;

/// What the server saw for one request
#[derive(Debug)]
struct Recorded {
    url: String,
    authorization: Option<String>,
    body: serde_json::Value,
}

/// Serve `responses` in order, one per request, then stop.
fn serve(responses: Vec<(u16, String)>) -> (Url, mpsc::Receiver<Recorded>) {
    let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        for (status, body) in responses {
            let mut request = match server.recv_timeout(Duration::from_secs(5)) {
                Ok(Some(request)) => request,
                _ => return,
            };
            let mut raw = String::new();
            let _ = request.as_reader().read_to_string(&mut raw);
            let authorization = request
                .headers()
                .iter()
                .find(|h| h.field.equiv("Authorization"))
                .map(|h| h.value.as_str().to_string());
            let _ = tx.send(Recorded {
                url: request.url().to_string(),
                authorization,
                body: serde_json::from_str(&raw).unwrap_or(serde_json::Value::Null),
            });
            let header =
                tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                    .unwrap();
            let response = tiny_http::Response::from_string(body)
                .with_status_code(status)
                .with_header(header);
            let _ = request.respond(response);
        }
    });

    let base = Url::parse(&format!("http://{addr}/api")).unwrap();
    (base, rx)
}

fn credential() -> Credential {
    Credential::new("tok", "Bearer")
}

#[test]
fn test_login_returns_credential_without_auth_header() {
    let (base, seen) = serve(vec![(
        200,
        r#"{"code":0,"message":"ok","data":{"access_token":"abc","token_type":"Bearer","expires_in":null}}"#
            .to_string(),
    )]);
    let api = ConsoleApi::new(base, DEFAULT_TIMEOUT);

    let cred = api.login("devops", "secret").unwrap();
    assert_eq!(cred.access_token, "abc");
    assert_eq!(cred.token_type, "Bearer");

    let req = seen.recv().unwrap();
    assert_eq!(req.url, "/api/auth/login");
    assert!(req.authorization.is_none());
    assert_eq!(req.body["username"], "devops");
    assert_eq!(req.body["password"], "secret");
}

#[test]
fn test_app_list_sends_authorization() {
    let (base, seen) = serve(vec![(
        200,
        r#"{"code":0,"data":[{"id":1,"name":"orders","ip":"10.0.0.5","port":"8080","path":"/srv/orders","status":1}]}"#
            .to_string(),
    )]);
    let api = ConsoleApi::new(base, DEFAULT_TIMEOUT);

    let apps = api.app_list(&credential()).unwrap();
    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0].name, "orders");
    assert_eq!(apps[0].path.as_deref(), Some("/srv/orders"));

    let req = seen.recv().unwrap();
    assert_eq!(req.url, "/api/logs/getAppList");
    assert_eq!(req.authorization.as_deref(), Some("Bearer tok"));
}

#[test]
fn test_login_required_code_maps_to_unauthenticated() {
    let (base, _seen) = serve(vec![(200, r#"{"code":401,"message":"expired"}"#.to_string())]);
    let api = ConsoleApi::new(base, DEFAULT_TIMEOUT);

    let err = api.app_list(&credential()).unwrap_err();
    assert!(matches!(err, Error::Unauthenticated));
}

#[test]
fn test_server_error_status() {
    let (base, _seen) = serve(vec![(500, "oops".to_string())]);
    let api = ConsoleApi::new(base, DEFAULT_TIMEOUT);

    let err = api.app_list(&credential()).unwrap_err();
    assert!(matches!(err, Error::Http { .. }));
    assert!(err.to_string().contains("server error"));
}

#[test]
fn test_start_incremental_log_payload_and_ack() {
    let (base, seen) = serve(vec![
        (200, r#"{"code":0,"data":true}"#.to_string()),
        (200, r#"{"code":0,"data":false}"#.to_string()),
    ]);
    let api = ConsoleApi::new(base, DEFAULT_TIMEOUT);
    let target = LogTarget::new("10.0.0.5", "8080", "app.log").with_name("orders");
    let key = SessionKey::from("key-1");

    assert!(api
        .start_incremental_log(&target, &key, Some("ERROR"), &credential())
        .unwrap());
    let req = seen.recv().unwrap();
    assert_eq!(req.url, "/api/logs/startIncrLog");
    assert_eq!(req.body["code"], "key-1");
    assert_eq!(req.body["search"], "ERROR");
    assert_eq!(req.body["ip"], "10.0.0.5");
    assert_eq!(req.body["logName"], "app.log");

    assert!(!api
        .start_incremental_log(&target, &key, None, &credential())
        .unwrap());
    let req = seen.recv().unwrap();
    assert!(req.body["search"].is_null());
}

#[test]
fn test_api_error_uses_data_message() {
    let (base, _seen) = serve(vec![(
        200,
        r#"{"code":1,"message":"failed","data":"service unreachable"}"#.to_string(),
    )]);
    let api = ConsoleApi::new(base, DEFAULT_TIMEOUT);
    let target = LogTarget::new("10.0.0.5", "8080", "");

    let err = api.log_list(&target, &credential()).unwrap_err();
    match err {
        Error::Api { code, message } => {
            assert_eq!(code, 1);
            assert_eq!(message, "service unreachable");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_download_writes_file() {
    let (base, _seen) = serve(vec![(200, "line one\nline two\n".to_string())]);
    let api = ConsoleApi::new(base.clone(), DEFAULT_TIMEOUT);
    let dir = tempfile::tempdir().unwrap();

    let url = format!("{}/files/app.log", base.as_str().trim_end_matches('/'));
    let path = api.download(&url, dir.path()).unwrap();

    assert_eq!(path.file_name().unwrap(), "app.log");
    let content = std::fs::read_to_string(path).unwrap();
    assert_eq!(content, "line one\nline two\n");
}

#[test]
fn test_registry_add_update_delete() {
    let (base, seen) = serve(vec![
        (200, r#"{"code":0,"data":null}"#.to_string()),
        (200, r#"{"code":0,"data":null}"#.to_string()),
        (200, r#"{"code":0,"data":null}"#.to_string()),
    ]);
    let api = ConsoleApi::new(base, DEFAULT_TIMEOUT);
    let mut record = ServiceRecord {
        id: None,
        name: "orders".to_string(),
        ip: "10.0.0.5".to_string(),
        port: "8080".to_string(),
        path: None,
    };

    api.add_app(&record, &credential()).unwrap();
    let req = seen.recv().unwrap();
    assert_eq!(req.url, "/api/logs/addApp");
    assert_eq!(req.authorization.as_deref(), Some("Bearer tok"));
    assert_eq!(req.body["name"], "orders");
    assert!(req.body["path"].is_null());
    assert!(req.body.get("id").is_none());

    record.id = Some("12".to_string());
    record.path = Some("/srv/orders".to_string());
    api.update_app(&record, &credential()).unwrap();
    let req = seen.recv().unwrap();
    assert_eq!(req.url, "/api/logs/updateApp");
    assert_eq!(req.body["id"], 12);
    assert_eq!(req.body["path"], "/srv/orders");

    api.delete_apps(&["12".to_string(), "13".to_string()], &credential())
        .unwrap();
    let req = seen.recv().unwrap();
    assert_eq!(req.url, "/api/logs/delApp");
    assert_eq!(req.body["ids"], serde_json::json!([12, 13]));
}

#[test]
fn test_update_without_id_is_rejected_before_io() {
    let (base, seen) = serve(vec![]);
    let api = ConsoleApi::new(base, DEFAULT_TIMEOUT);
    let record = ServiceRecord {
        id: None,
        name: "orders".to_string(),
        ip: "10.0.0.5".to_string(),
        port: "8080".to_string(),
        path: None,
    };

    let err = api.update_app(&record, &credential()).unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
    assert!(api.delete_apps(&[], &credential()).is_ok());
    assert!(seen.try_recv().is_err());
}

#[test]
fn test_registry_error_is_reported() {
    let (base, _seen) = serve(vec![(
        200,
        r#"{"code":1,"message":"failed","data":"duplicate service"}"#.to_string(),
    )]);
    let api = ConsoleApi::new(base, DEFAULT_TIMEOUT);
    let record = ServiceRecord {
        id: None,
        name: "orders".to_string(),
        ip: "10.0.0.5".to_string(),
        port: "8080".to_string(),
        path: None,
    };

    let err = api.add_app(&record, &credential()).unwrap_err();
    assert!(err.to_string().contains("duplicate service"));
}

#[test]
fn test_log_list_sends_name_filter() {
    let (base, seen) = serve(vec![
        (200, r#"{"code":0,"data":[{"logName":"error.log"}]}"#.to_string()),
        (200, r#"{"code":0,"data":[]}"#.to_string()),
    ]);
    let api = ConsoleApi::new(base, DEFAULT_TIMEOUT);

    let filtered = LogTarget::new("10.0.0.5", "8080", "error");
    let files = api.log_list(&filtered, &credential()).unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].log_name, "error.log");
    let req = seen.recv().unwrap();
    assert_eq!(req.url, "/api/logs/getLogList");
    assert_eq!(req.body["logName"], "error");

    let unfiltered = LogTarget::new("10.0.0.5", "8080", "");
    assert!(api.log_list(&unfiltered, &credential()).unwrap().is_empty());
    let req = seen.recv().unwrap();
    assert!(req.body["logName"].is_null());
}

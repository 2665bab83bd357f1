//! Wire-level tests for `OrientClient` against a minimal in-process HTTP server.

use graphload_client::sql::content_of;
use graphload_client::{
    BatchBuffer, BatchOptions, ClientError, ConnectionConfig, GraphStore, Identifier,
    OrientClient, PropertyType, RecordId, Select, UpdateMode,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Clone)]
struct Recorded {
    method: String,
    target: String,
    headers: HashMap<String, String>,
    body: String,
}

type Responder = dyn Fn(&Recorded) -> (u16, String) + Send + Sync;

struct FakeStore {
    port: u16,
    log: Arc<Mutex<Vec<Recorded>>>,
}

impl FakeStore {
    fn start(responder: Box<Responder>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let log = Arc::new(Mutex::new(Vec::new()));
        let thread_log = Arc::clone(&log);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                if let Some(req) = read_request(&stream) {
                    let (status, body) = responder(&req);
                    thread_log.lock().unwrap().push(req);
                    write_response(stream, status, &body);
                }
            }
        });
        Self { port, log }
    }

    fn config(&self) -> ConnectionConfig {
        ConnectionConfig::new("kb")
            .with_address("http://127.0.0.1", self.port)
            .with_credentials("root", "pw")
    }

    fn requests(&self) -> Vec<Recorded> {
        self.log.lock().unwrap().clone()
    }
}

fn read_request(stream: &TcpStream) -> Option<Recorded> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let target = parts.next()?.to_string();

    let mut headers = HashMap::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).ok()?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    let length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).ok()?;

    Some(Recorded {
        method,
        target,
        headers,
        body: String::from_utf8_lossy(&body).to_string(),
    })
}

fn write_response(mut stream: TcpStream, status: u16, body: &str) {
    let reason = if status < 300 { "OK" } else { "Error" };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nSet-Cookie: OSESSIONID=abc; Path=/\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

fn ok_connect(req: &Recorded) -> Option<(u16, String)> {
    if req.target == "/connect/kb" {
        Some((204, String::new()))
    } else {
        None
    }
}

fn ident(s: &str) -> Identifier {
    Identifier::new(s).unwrap()
}

#[test]
fn connect_sends_basic_auth() {
    let store = FakeStore::start(Box::new(|_| (204, String::new())));
    OrientClient::connect(&store.config()).expect("connect");

    let requests = store.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].target, "/connect/kb");
    assert_eq!(
        requests[0].headers.get("authorization").map(String::as_str),
        Some("Basic cm9vdDpwdw==")
    );
}

#[test]
fn rejected_connect_is_an_authentication_failure() {
    let store = FakeStore::start(Box::new(|_| (401, "{}".to_string())));
    let err = OrientClient::connect(&store.config())
        .err()
        .expect("should fail");
    assert!(matches!(err, ClientError::Authentication { .. }));
    assert!(err.is_fatal());
}

#[test]
fn select_pages_until_an_empty_result() {
    let store = FakeStore::start(Box::new(|req| {
        if let Some(resp) = ok_connect(req) {
            return resp;
        }
        let body = if req.target.ends_with("SKIP%200") {
            json!({"result": [{"@rid": "#9:0"}, {"@rid": "#9:1"}]})
        } else if req.target.ends_with("SKIP%202") {
            json!({"result": [{"@rid": "#9:2"}]})
        } else {
            json!({"result": []})
        };
        (200, body.to_string())
    }));
    let client = OrientClient::connect(&store.config()).unwrap();

    let select = Select::from(ident("article")).filter_eq(ident("uri"), "it's");
    let rows: Vec<Value> = client.select(&select).collect::<Result<_, _>>().unwrap();
    assert_eq!(rows.len(), 3);

    let targets: Vec<String> = store
        .requests()
        .into_iter()
        .skip(1)
        .map(|r| r.target)
        .collect();
    assert_eq!(
        targets,
        vec![
            "/query/kb/sql/SELECT%20FROM%20article%20WHERE%20uri%20%3D%20%27it%5C%27s%27%20SKIP%200",
            "/query/kb/sql/SELECT%20FROM%20article%20WHERE%20uri%20%3D%20%27it%5C%27s%27%20SKIP%202",
            "/query/kb/sql/SELECT%20FROM%20article%20WHERE%20uri%20%3D%20%27it%5C%27s%27%20SKIP%203",
        ]
    );
}

#[test]
fn create_vertex_posts_a_command_and_reads_the_rid() {
    let store = FakeStore::start(Box::new(|req| {
        if let Some(resp) = ok_connect(req) {
            return resp;
        }
        (200, json!({"result": [{"@rid": "#9:42", "uri": "A"}]}).to_string())
    }));
    let mut client = OrientClient::connect(&store.config()).unwrap();

    let rid = client
        .create_vertex(&ident("article"), &content_of([("uri", "A")]))
        .unwrap();
    assert_eq!(rid, RecordId::new(9, 42));

    let last = store.requests().pop().unwrap();
    assert_eq!(last.method, "POST");
    assert_eq!(
        last.target,
        "/command/kb/sql/CREATE%20VERTEX%20article%20CONTENT%20%7B%22uri%22%3A%22A%22%7D"
    );
}

#[test]
fn non_2xx_command_is_a_response_error() {
    let store = FakeStore::start(Box::new(|req| {
        if let Some(resp) = ok_connect(req) {
            return resp;
        }
        (500, "Class 'article' already exists".to_string())
    }));
    let mut client = OrientClient::connect(&store.config()).unwrap();

    let err = client.create_vertex_class(&ident("article")).unwrap_err();
    assert!(matches!(err, ClientError::Response { .. }));
    assert!(err.is_already_exists());
    assert!(!err.is_fatal());
}

#[test]
fn property_batch_and_document_endpoints() {
    let store = FakeStore::start(Box::new(|req| {
        if let Some(resp) = ok_connect(req) {
            return resp;
        }
        (200, json!({"result": []}).to_string())
    }));
    let mut client = OrientClient::connect(&store.config()).unwrap();

    client
        .create_property(&ident("article"), &ident("uri"), PropertyType::String)
        .unwrap();

    let mut buffer = BatchBuffer::new("sql", BatchOptions::default());
    buffer.push("CREATE CLASS a EXTENDS V");
    buffer.push("CREATE CLASS b EXTENDS V");
    client.submit_batch(&buffer.take_request().unwrap()).unwrap();

    client
        .update_document(RecordId::new(9, 806), &content_of([("name", "x")]), UpdateMode::Partial)
        .unwrap();

    let requests = store.requests();
    assert_eq!(requests[1].method, "POST");
    assert_eq!(requests[1].target, "/property/kb/article/uri/STRING");

    assert_eq!(requests[2].method, "POST");
    assert_eq!(requests[2].target, "/batch/kb");
    let body: Value = serde_json::from_str(&requests[2].body).unwrap();
    assert_eq!(
        body,
        json!({
            "transaction": true,
            "operations": [{
                "type": "script",
                "language": "sql",
                "script": ["CREATE CLASS a EXTENDS V", "CREATE CLASS b EXTENDS V"]
            }]
        })
    );

    assert_eq!(requests[3].method, "PUT");
    assert_eq!(requests[3].target, "/document/kb/9%3A806?updateMode=partial");
    let body: Value = serde_json::from_str(&requests[3].body).unwrap();
    assert_eq!(body, json!({"name": "x"}));
}

#[test]
fn list_databases_reads_the_names() {
    let store = FakeStore::start(Box::new(|req| {
        if req.target == "/listDatabases" {
            (200, json!({"databases": ["kb", "GratefulDeadConcerts"]}).to_string())
        } else {
            (204, String::new())
        }
    }));
    let client = OrientClient::connect(&store.config()).unwrap();
    assert_eq!(
        client.list_databases().unwrap(),
        vec!["kb".to_string(), "GratefulDeadConcerts".to_string()]
    );
}

use crate::{Command, CommandService};
use revkv_core::Engine;
use revkv_store::VersionStore;
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use thiserror::Error;
use tracing::{debug, error, info};

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

pub const ROUTES: &[&str] = &[
    "/healthz",
    "/set?name=<name>&value=<value>",
    "/get?name=<name>",
    "/unset?name=<name>",
    "/numequalto?value=<value>",
    "/undo",
    "/redo",
    "/end",
];

#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    pub bind: SocketAddr,
}

#[derive(Debug, Error)]
pub enum HttpServeError {
    #[error("bind failed: {0}")]
    Bind(std::io::Error),
    #[error("accept failed: {0}")]
    Accept(std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct HttpResponse {
    status: u16,
    body: String,
}

impl HttpResponse {
    fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    fn error(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Route {
    Index,
    Healthz,
    Command(Command),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
enum RouteError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
}

impl RouteError {
    fn into_response(self) -> HttpResponse {
        match self {
            Self::BadRequest(msg) => HttpResponse::error(400, msg),
            Self::NotFound(msg) => HttpResponse::error(404, msg),
        }
    }
}

/// Serve commands until the listener fails.
pub fn serve_commands<S: VersionStore>(
    config: HttpServerConfig,
    engine: &Engine<S>,
) -> Result<(), HttpServeError> {
    let listener = TcpListener::bind(config.bind).map_err(HttpServeError::Bind)?;
    info!(bind = %config.bind, "serving revkv commands");
    serve_with_limit(&listener, engine, None)
}

fn serve_with_limit<S: VersionStore>(
    listener: &TcpListener,
    engine: &Engine<S>,
    max_requests: Option<usize>,
) -> Result<(), HttpServeError> {
    let mut served = 0usize;

    for stream in listener.incoming() {
        match stream {
            Ok(mut stream) => {
                if let Err(err) = handle_connection(&mut stream, engine) {
                    debug!(%err, "connection dropped");
                }
                served += 1;
            }
            Err(err) => return Err(HttpServeError::Accept(err)),
        }

        if let Some(limit) = max_requests
            && served >= limit
        {
            break;
        }
    }

    Ok(())
}

fn handle_connection<S: VersionStore>(
    stream: &mut TcpStream,
    engine: &Engine<S>,
) -> std::io::Result<()> {
    let response = match read_request_line(stream) {
        Ok((method, target)) => {
            let response = respond(engine, &method, &target);
            debug!(%method, %target, status = response.status, "request");
            response
        }
        Err(err) => err.into_response(),
    };
    write_text_response(stream, response)
}

fn respond<S: VersionStore>(engine: &Engine<S>, method: &str, target: &str) -> HttpResponse {
    if method != "GET" {
        return HttpResponse::error(405, "method not allowed; use GET");
    }
    match parse_route_target(target) {
        Ok(route) => execute_route(engine, route),
        Err(err) => err.into_response(),
    }
}

fn read_request_line(stream: &mut TcpStream) -> Result<(String, String), RouteError> {
    let mut buf = [0u8; 8192];
    let n = stream
        .read(&mut buf)
        .map_err(|e| RouteError::BadRequest(format!("failed to read request: {e}")))?;
    if n == 0 {
        return Err(RouteError::BadRequest("empty request".to_string()));
    }
    let head = &buf[..n];
    let end = head.iter().position(|&b| b == b'\n').unwrap_or(head.len());
    let line = std::str::from_utf8(&head[..end])
        .map_err(|_| RouteError::BadRequest("request line is not valid UTF-8".to_string()))?;
    parse_request_line(line.trim_end_matches('\r'))
}

fn parse_request_line(line: &str) -> Result<(String, String), RouteError> {
    let mut parts = line.split_whitespace();
    let method = parts
        .next()
        .ok_or_else(|| RouteError::BadRequest("missing method".to_string()))?;
    let target = parts
        .next()
        .ok_or_else(|| RouteError::BadRequest("missing target".to_string()))?;
    Ok((method.to_string(), target.to_string()))
}

fn parse_route_target(target: &str) -> Result<Route, RouteError> {
    let (path, query) = split_target(target);
    let mut params = parse_query_params(query)?;
    let mut required = |key: &str, what: &str| {
        params
            .remove(key)
            .ok_or_else(|| RouteError::BadRequest(format!("missing {what} for the variable")))
    };

    let command = match path {
        "/" => return Ok(Route::Index),
        "/healthz" => return Ok(Route::Healthz),
        "/set" => {
            let name = required("name", "name")?;
            let value = required("value", "value")?;
            Command::Set { name, value }
        }
        "/get" => Command::Get {
            name: required("name", "name")?,
        },
        "/unset" => Command::Unset {
            name: required("name", "name")?,
        },
        "/numequalto" => Command::NumEqualTo {
            value: required("value", "value")?,
        },
        "/undo" => Command::Undo,
        "/redo" => Command::Redo,
        "/end" => Command::End,
        _ => return Err(RouteError::NotFound(format!("unknown route: {path}"))),
    };
    Ok(Route::Command(command))
}

fn split_target(target: &str) -> (&str, &str) {
    match target.split_once('?') {
        Some((path, query)) => (path, query),
        None => (target, ""),
    }
}

fn parse_query_params(query: &str) -> Result<BTreeMap<String, String>, RouteError> {
    let mut out = BTreeMap::new();
    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (k, v) = match pair.split_once('=') {
            Some((k, v)) => (k, v),
            None => (pair, ""),
        };
        let key = percent_decode(k)?;
        if key.is_empty() {
            continue;
        }
        out.insert(key, percent_decode(v)?);
    }
    Ok(out)
}

/// Decode `+` and `%XX` escapes; the decoded bytes must be UTF-8.
fn percent_decode(input: &str) -> Result<String, RouteError> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                if let (Some(h), Some(l)) = (hex_val(bytes[i + 1]), hex_val(bytes[i + 2])) {
                    out.push(h * 16 + l);
                    i += 3;
                } else {
                    out.push(b'%');
                    i += 1;
                }
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }
    String::from_utf8(out)
        .map_err(|_| RouteError::BadRequest(format!("query is not valid UTF-8: {input}")))
}

fn hex_val(ch: u8) -> Option<u8> {
    match ch {
        b'0'..=b'9' => Some(ch - b'0'),
        b'a'..=b'f' => Some(ch - b'a' + 10),
        b'A'..=b'F' => Some(ch - b'A' + 10),
        _ => None,
    }
}

fn execute_route<S: VersionStore>(engine: &Engine<S>, route: Route) -> HttpResponse {
    match route {
        Route::Index => HttpResponse::ok(""),
        Route::Healthz => HttpResponse::ok("ok"),
        Route::Command(command) => match CommandService::new(engine).execute(command) {
            Ok(body) => HttpResponse::ok(body),
            Err(err) => {
                error!(%err, "command failed");
                HttpResponse::error(500, format!("internal server error: {err}"))
            }
        },
    }
}

fn write_text_response(stream: &mut TcpStream, response: HttpResponse) -> std::io::Result<()> {
    let status_text = reason_phrase(response.status);
    let header = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status,
        status_text,
        response.body.len()
    );
    stream.write_all(header.as_bytes())?;
    stream.write_all(response.body.as_bytes())?;
    stream.flush()
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revkv_store::{Filter, MemoryStore, StoreError, VersionId, VersionRecord, WriteBatch};
    use std::thread;

    fn transcript(engine: &Engine<MemoryStore>, targets: &[&str]) -> String {
        targets
            .iter()
            .map(|target| {
                let response = respond(engine, "GET", target);
                format!("{} {target} -> {}", response.status, response.body)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn route_parsing_handles_query_params() {
        let route = parse_route_target("/set?name=x&value=10").expect("route should parse");
        assert_eq!(
            route,
            Route::Command(Command::Set {
                name: "x".to_string(),
                value: "10".to_string(),
            })
        );

        let route = parse_route_target("/numequalto?value=a+b").expect("route should parse");
        assert_eq!(
            route,
            Route::Command(Command::NumEqualTo {
                value: "a b".to_string(),
            })
        );
    }

    #[test]
    fn route_parsing_reports_missing_params() {
        let err = parse_route_target("/set?name=x").expect_err("route should fail");
        assert_eq!(
            err,
            RouteError::BadRequest("missing value for the variable".to_string())
        );

        let err = parse_route_target("/get").expect_err("route should fail");
        assert_eq!(
            err,
            RouteError::BadRequest("missing name for the variable".to_string())
        );
    }

    #[test]
    fn unknown_route_and_method_are_rejected() {
        let engine = Engine::new(MemoryStore::new());
        assert_eq!(respond(&engine, "GET", "/nope").status, 404);
        assert_eq!(respond(&engine, "POST", "/undo").status, 405);
        assert_eq!(respond(&engine, "GET", "/").body, "");
    }

    #[test]
    fn empty_value_is_accepted() {
        let engine = Engine::new(MemoryStore::new());
        assert_eq!(respond(&engine, "GET", "/set?name=x&value=").body, "x = ");
        assert_eq!(respond(&engine, "GET", "/undo").body, "x = None");
    }

    #[test]
    fn command_session_transcript() {
        let engine = Engine::new(MemoryStore::new());
        let text = transcript(
            &engine,
            &[
                "/set?name=ex&value=10",
                "/get?name=ex",
                "/unset?name=ex",
                "/get?name=ex",
                "/undo",
                "/redo",
                "/set?name=a&value=5",
                "/set?name=b&value=5",
                "/numequalto?value=5",
                "/end",
                "/undo",
            ],
        );
        insta::assert_snapshot!(text, @r"
        200 /set?name=ex&value=10 -> ex = 10
        200 /get?name=ex -> 10
        200 /unset?name=ex -> ex = None
        200 /get?name=ex -> None
        200 /undo -> ex = 10
        200 /redo -> ex = None
        200 /set?name=a&value=5 -> a = 5
        200 /set?name=b&value=5 -> b = 5
        200 /numequalto?value=5 -> 2
        200 /end -> CLEANED
        200 /undo -> no commands
        ");
    }

    #[test]
    fn percent_decode_works_for_common_forms() {
        let decode = |input: &str| percent_decode(input).expect("input should decode");
        assert_eq!(decode("a%2Db"), "a-b");
        assert_eq!(decode("i1+test"), "i1 test");
        assert_eq!(decode("caf%C3%A9"), "café");
        assert_eq!(decode("100%"), "100%");
    }

    #[test]
    fn invalid_utf8_value_is_rejected_without_writing() {
        let engine = Engine::new(MemoryStore::new());
        let response = respond(&engine, "GET", "/set?name=x&value=%FF");
        assert_eq!(response.status, 400);
        assert!(response.body.contains("not valid UTF-8"));

        assert_eq!(respond(&engine, "GET", "/get?name=x").body, "None");
        assert_eq!(respond(&engine, "GET", "/undo").body, "no commands");
    }

    struct FailingStore;

    impl VersionStore for FailingStore {
        fn get(&self, _id: VersionId) -> Result<Option<VersionRecord>, StoreError> {
            Err(StoreError::Poisoned)
        }

        fn query(
            &self,
            _filters: &[Filter],
            _limit: Option<usize>,
        ) -> Result<Vec<VersionRecord>, StoreError> {
            Err(StoreError::Poisoned)
        }

        fn put_batch(&self, _batch: WriteBatch) -> Result<Vec<VersionId>, StoreError> {
            Err(StoreError::Poisoned)
        }

        fn delete(&self, _id: VersionId) -> Result<bool, StoreError> {
            Err(StoreError::Poisoned)
        }
    }

    #[test]
    fn store_failure_maps_to_500() {
        let engine = Engine::new(FailingStore);
        let response = respond(&engine, "GET", "/get?name=x");
        assert_eq!(response.status, 500);
        assert!(response.body.starts_with("internal server error:"));
    }

    #[test]
    fn serves_requests_over_tcp() {
        let engine = Engine::new(MemoryStore::new());
        let listener = TcpListener::bind("127.0.0.1:0").expect("listener should bind");
        let addr = listener.local_addr().expect("listener has an address");

        thread::scope(|scope| {
            let server = scope.spawn(|| serve_with_limit(&listener, &engine, Some(2)));

            let first = http_get(addr, "/set?name=x&value=1");
            assert!(first.starts_with("HTTP/1.1 200 OK"));
            assert!(first.ends_with("x = 1"));

            let second = http_get(addr, "/get?name=x");
            assert!(second.ends_with("\r\n\r\n1"));

            server
                .join()
                .expect("server thread should not panic")
                .expect("server should stop after two requests");
        });
    }

    fn http_get(addr: SocketAddr, target: &str) -> String {
        let mut stream = TcpStream::connect(addr).expect("client should connect");
        write!(stream, "GET {target} HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .expect("request should write");
        let mut response = String::new();
        stream
            .read_to_string(&mut response)
            .expect("response should read");
        response
    }
}

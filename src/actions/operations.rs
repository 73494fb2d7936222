//! The WebDAV operations a test script issues.
//!
//! `WebDavClient` owns the instrumented executor; each operation builds the
//! request (Depth/Destination headers, Basic authorization) and runs it
//! through the interceptor, so every operation yields exactly one performance
//! record regardless of how its own post-check turns out. Response parsing
//! beyond the status line is left to the caller.

use std::sync::Arc;

use crate::configuration::{Credentials, WebDavConfig};
use crate::error_handling::types::ActionError;
use crate::instrumentation::sink::DataSink;
use crate::transport::executor::{RequestExecutor, TcpRequestExecutor};
use crate::transport::interceptor::InstrumentedExecutor;
use crate::transport::types::{HttpRequest, HttpResponse, Method};

use super::action::ActionState;

/// WebDAV protocol client for one session. Successive actions of the session
/// share the client through the action chain; it is never shared between
/// sessions.
pub struct WebDavClient {
    executor: InstrumentedExecutor,
}

impl WebDavClient {
    /// Creates a client with the default TCP executor configured from
    /// `config`.
    pub fn new(config: &WebDavConfig, sink: Arc<dyn DataSink>) -> Self {
        Self::with_executor(Box::new(TcpRequestExecutor::from_config(config)), sink)
    }

    /// Creates a client around an injected low-level executor. This is the
    /// seam tests and alternative transports plug into.
    pub fn with_executor(inner: Box<dyn RequestExecutor>, sink: Arc<dyn DataSink>) -> Self {
        Self {
            executor: InstrumentedExecutor::new(inner, sink),
        }
    }

    pub(crate) fn executor(&self) -> &InstrumentedExecutor {
        &self.executor
    }

    /// Checks whether a resource exists. 2xx answers (including 207) mean it
    /// does, 404 means it does not; anything else is unexpected.
    pub async fn exists(&self, action: &ActionState, relative: &str) -> Result<bool, ActionError> {
        let request = self
            .base_request(action, Method::Propfind, relative)
            .header("Depth", "0");
        let response = self.executor.execute(&request, action).await?;
        match response.status {
            200..=299 => Ok(true),
            404 => Ok(false),
            actual => Err(ActionError::UnexpectedStatus {
                expected: &[207, 404],
                actual,
            }),
        }
    }

    /// Downloads a resource and returns the buffered response.
    pub async fn get(&self, action: &ActionState, relative: &str) -> Result<HttpResponse, ActionError> {
        let request = self.base_request(action, Method::Get, relative);
        let response = self.executor.execute(&request, action).await?;
        expect_status(&response, &[200])?;
        Ok(response)
    }

    /// Uploads `body` to a resource.
    pub async fn put(
        &self,
        action: &ActionState,
        relative: &str,
        body: Vec<u8>,
    ) -> Result<(), ActionError> {
        let request = self.base_request(action, Method::Put, relative).body(body);
        let response = self.executor.execute(&request, action).await?;
        expect_status(&response, &[201, 204])
    }

    /// Deletes a resource or collection.
    pub async fn delete(&self, action: &ActionState, relative: &str) -> Result<(), ActionError> {
        let request = self.base_request(action, Method::Delete, relative);
        let response = self.executor.execute(&request, action).await?;
        expect_status(&response, &[204])
    }

    /// Creates a collection (directory).
    pub async fn mkcol(&self, action: &ActionState, relative: &str) -> Result<(), ActionError> {
        let request = self.base_request(action, Method::Mkcol, relative);
        let response = self.executor.execute(&request, action).await?;
        expect_status(&response, &[201])
    }

    /// Copies a resource to `dst_relative`, overwriting an existing target.
    pub async fn copy(
        &self,
        action: &ActionState,
        src_relative: &str,
        dst_relative: &str,
    ) -> Result<(), ActionError> {
        let request = self
            .base_request(action, Method::Copy, src_relative)
            .header("Destination", destination_url(action, dst_relative))
            .header("Overwrite", "T");
        let response = self.executor.execute(&request, action).await?;
        expect_status(&response, &[201, 204, 207])
    }

    /// Moves a resource to `dst_relative`, overwriting an existing target.
    pub async fn move_to(
        &self,
        action: &ActionState,
        src_relative: &str,
        dst_relative: &str,
    ) -> Result<(), ActionError> {
        let request = self
            .base_request(action, Method::Move, src_relative)
            .header("Destination", destination_url(action, dst_relative))
            .header("Overwrite", "T");
        let response = self.executor.execute(&request, action).await?;
        expect_status(&response, &[201, 204, 207])
    }

    /// Lists a collection with the given Depth. Returns the raw 207
    /// multistatus response; parsing it is up to the caller.
    pub async fn list(
        &self,
        action: &ActionState,
        relative: &str,
        depth: u32,
    ) -> Result<HttpResponse, ActionError> {
        let request = self
            .base_request(action, Method::Propfind, relative)
            .header("Depth", depth.to_string());
        let response = self.executor.execute(&request, action).await?;
        expect_status(&response, &[207])?;
        Ok(response)
    }

    fn base_request(&self, action: &ActionState, method: Method, relative: &str) -> HttpRequest {
        let mut request = HttpRequest::new(
            method,
            action.host(),
            action.port(),
            action.resource_path(relative),
        );
        if let Some(creds) = action.credentials() {
            request = request.header("Authorization", basic_auth_value(&creds));
        }
        request
    }
}

/// Post-check against the operation's explicit set of acceptable codes; does
/// not affect record emission, which already happened inside the interceptor.
fn expect_status(response: &HttpResponse, expected: &'static [u16]) -> Result<(), ActionError> {
    if expected.contains(&response.status) {
        Ok(())
    } else {
        Err(ActionError::UnexpectedStatus {
            expected,
            actual: response.status,
        })
    }
}

fn destination_url(action: &ActionState, relative: &str) -> String {
    let path = action.resource_path(relative);
    if action.port() == 80 {
        format!("http://{}{}", action.host(), path)
    } else {
        format!("http://{}:{}{}", action.host(), action.port(), path)
    }
}

fn basic_auth_value(creds: &Credentials) -> String {
    format!(
        "Basic {}",
        base64(format!("{}:{}", creds.username, creds.password).as_bytes())
    )
}

fn base64(input: &[u8]) -> String {
    const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut out = String::with_capacity(input.len().div_ceil(3) * 4);
    for chunk in input.chunks(3) {
        let bytes = [chunk[0], *chunk.get(1).unwrap_or(&0), *chunk.get(2).unwrap_or(&0)];
        let n = ((bytes[0] as u32) << 16) | ((bytes[1] as u32) << 8) | bytes[2] as u32;
        out.push(ALPHABET[(n >> 18 & 63) as usize] as char);
        out.push(ALPHABET[(n >> 12 & 63) as usize] as char);
        out.push(if chunk.len() > 1 {
            ALPHABET[(n >> 6 & 63) as usize] as char
        } else {
            '='
        });
        out.push(if chunk.len() > 2 {
            ALPHABET[(n & 63) as usize] as char
        } else {
            '='
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrumentation::sink::MemorySink;
    use crate::session_context::WebDavContext;
    use std::net::{Ipv4Addr, SocketAddr};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Minimal WebDAV-ish server: routes on "METHOD /path" prefixes, one
    /// connection per request (the client sends Connection: close).
    async fn spawn_webdav_server() -> SocketAddr {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut tmp = [0u8; 4096];
                    loop {
                        let n = stream.read(&mut tmp).await.unwrap_or(0);
                        if n == 0 {
                            break;
                        }
                        buf.extend_from_slice(&tmp[..n]);
                        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                            break;
                        }
                    }
                    let head = String::from_utf8_lossy(&buf);
                    let request_line = head.lines().next().unwrap_or("").to_string();
                    let authorized = head.to_ascii_lowercase().contains("authorization: basic");

                    let response: &[u8] = if request_line.starts_with("GET /webdav/missing") {
                        b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n"
                    } else if request_line.starts_with("PROPFIND /webdav/missing") {
                        b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n"
                    } else if request_line.starts_with("DELETE /webdav/broken") {
                        b"HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\n\r\n"
                    } else if request_line.starts_with("DELETE /webdav/odd") {
                        // 2xx, but not the code DELETE is defined to answer
                        b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n"
                    } else if request_line.starts_with("GET ") {
                        b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 10\r\n\r\n0123456789"
                    } else if request_line.starts_with("PROPFIND ") {
                        b"HTTP/1.1 207 Multi-Status\r\nContent-Type: application/xml\r\nContent-Length: 27\r\n\r\n<multistatus></multistatus>"
                    } else if request_line.starts_with("PUT ")
                        || request_line.starts_with("MKCOL ")
                        || request_line.starts_with("COPY ")
                        || request_line.starts_with("MOVE ")
                    {
                        if authorized {
                            b"HTTP/1.1 201 Created\r\nContent-Length: 0\r\n\r\n"
                        } else {
                            b"HTTP/1.1 401 Unauthorized\r\nContent-Length: 0\r\n\r\n"
                        }
                    } else if request_line.starts_with("DELETE ") {
                        b"HTTP/1.1 204 No Content\r\nContent-Length: 0\r\n\r\n"
                    } else {
                        b"HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\n\r\n"
                    };
                    stream.write_all(response).await.ok();
                    stream.shutdown().await.ok();
                });
            }
        });
        addr
    }

    async fn harness() -> (Arc<MemorySink>, WebDavContext, WebDavConfig) {
        let _ = env_logger::builder().is_test(true).try_init();
        let addr = spawn_webdav_server().await;
        let mut config = WebDavConfig::new(addr.ip().to_string(), addr.port());
        config.dav_path = "webdav/".to_string();
        config.credentials = Some(Credentials {
            username: "tester".to_string(),
            password: "secret".to_string(),
        });
        (Arc::new(MemorySink::new()), WebDavContext::new(), config)
    }

    #[tokio::test]
    async fn get_returns_body_and_emits_record() {
        let (sink, context, config) = harness().await;
        let client = Arc::new(WebDavClient::new(&config, sink.clone()));
        let action = ActionState::open(&context, "user-0", "WebDavGet", &config, client);
        assert_eq!(action.status_code(), None);

        let response = action.client().get(&action, "file.txt").await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"0123456789");

        assert_eq!(action.status_code(), Some(200));
        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert!(!records[0].failed);
        assert_eq!(records[0].status_code, Some(200));
        assert!(records[0].bytes_received >= 10);
        assert!(records[0].url.ends_with("/webdav/file.txt"));
    }

    #[tokio::test]
    async fn put_sends_basic_auth_inherited_from_config() {
        let (sink, context, config) = harness().await;
        let client = Arc::new(WebDavClient::new(&config, sink.clone()));
        let action = ActionState::open(&context, "user-0", "WebDavPut", &config, client);

        // the server answers 401 unless the Authorization header is present
        action
            .client()
            .put(&action, "file.txt", b"payload".to_vec())
            .await
            .unwrap();
        assert_eq!(action.status_code(), Some(201));
    }

    #[tokio::test]
    async fn exists_maps_404_to_false() {
        let (sink, context, config) = harness().await;
        let client = Arc::new(WebDavClient::new(&config, sink.clone()));
        let action = ActionState::open(&context, "user-0", "WebDavExists", &config, client);

        assert!(!action.client().exists(&action, "missing.txt").await.unwrap());

        let next = ActionState::continue_active(&context, "user-0", "WebDavExists2").unwrap();
        assert!(next.client().exists(&next, "file.txt").await.unwrap());

        // one record per attempt, both unfailed (404 is not a failure)
        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| !r.failed));
    }

    #[tokio::test]
    async fn delete_on_503_is_an_unexpected_status_not_a_transport_error() {
        let (sink, context, config) = harness().await;
        let client = Arc::new(WebDavClient::new(&config, sink.clone()));
        let action = ActionState::open(&context, "user-0", "WebDavDelete", &config, client);

        let err = action.client().delete(&action, "broken.txt").await.unwrap_err();
        match err {
            ActionError::UnexpectedStatus { actual: 503, .. } => {}
            other => panic!("expected UnexpectedStatus 503, got {:?}", other),
        }

        // the record was still emitted and marked failed
        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert!(records[0].failed);
        assert_eq!(records[0].status_code, Some(503));
        assert_eq!(action.status_code(), Some(503));
    }

    #[tokio::test]
    async fn copy_and_move_carry_destination_headers() {
        let (sink, context, config) = harness().await;
        let client = Arc::new(WebDavClient::new(&config, sink.clone()));
        let action = ActionState::open(&context, "user-0", "WebDavCopy", &config, client);

        action.client().copy(&action, "a.txt", "b.txt").await.unwrap();
        let next = ActionState::continue_active(&context, "user-0", "WebDavMove").unwrap();
        next.client().move_to(&next, "b.txt", "c.txt").await.unwrap();

        assert_eq!(sink.records().len(), 2);
    }

    #[tokio::test]
    async fn action_chain_inherits_state() {
        let (sink, context, config) = harness().await;
        let client = Arc::new(WebDavClient::new(&config, sink.clone()));
        let first = ActionState::open(&context, "user-0", "First", &config, client);
        first.set_credentials("other", "pair");

        let second = ActionState::continue_active(&context, "user-0", "Second").unwrap();
        assert_eq!(second.host(), first.host());
        assert_eq!(second.credentials().unwrap().username, "other");
        assert!(Arc::ptr_eq(second.previous().unwrap(), &first));
        assert!(Arc::ptr_eq(second.client(), first.client()));

        // the chain replaced the active action
        let active = context.get_active("user-0").unwrap();
        assert!(Arc::ptr_eq(&active, &second));
    }

    #[tokio::test]
    async fn wrong_2xx_code_is_rejected_per_operation() {
        let (sink, context, config) = harness().await;
        let client = Arc::new(WebDavClient::new(&config, sink.clone()));
        let action = ActionState::open(&context, "user-0", "WebDavDelete", &config, client);

        // the server answers 200, DELETE only accepts 204
        let err = action.client().delete(&action, "odd.txt").await.unwrap_err();
        match err {
            ActionError::UnexpectedStatus { expected, actual } => {
                assert_eq!(actual, 200);
                assert_eq!(expected, &[204]);
            }
            other => panic!("expected UnexpectedStatus, got {:?}", other),
        }

        // a wrong-but-2xx answer is not a server failure
        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert!(!records[0].failed);
    }

    #[tokio::test]
    async fn continue_without_open_fails_fast() {
        let (_sink, context, _config) = harness().await;
        assert!(matches!(
            ActionState::continue_active(&context, "ghost", "Op"),
            Err(ActionError::NoActiveSession(_))
        ));
    }

    #[test]
    fn base64_matches_known_vectors() {
        assert_eq!(base64(b""), "");
        assert_eq!(base64(b"f"), "Zg==");
        assert_eq!(base64(b"fo"), "Zm8=");
        assert_eq!(base64(b"foo"), "Zm9v");
        assert_eq!(base64(b"tester:secret"), "dGVzdGVyOnNlY3JldA==");
    }
}

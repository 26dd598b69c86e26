// # Local HTTP fixture
//
// A one-shot HTTP/1.1 server on `127.0.0.1:0` for the client crates' tests.
// It accepts a single connection, captures the raw request and answers with a
// canned status and body.
//
// ```rust,ignore
// let (base, server) = routerwatch_test_http::serve_once("200 OK", "application/json", "{}").await;
// let client = routerwatch_test_http::local_client();
// client.post(format!("{}/v2/pushes", base)).send().await.unwrap();
// let request = server.await.unwrap();
// ```
//
// Test-only crate: failures panic.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Accept one connection, capture the request, answer with `status` and `body`
///
/// Returns the base URL (`http://127.0.0.1:<port>`) and a handle that yields
/// the raw request text once the reply has been written.
pub async fn serve_once(
    status: &'static str,
    content_type: &'static str,
    body: &'static str,
) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind local listener");
    let addr = listener.local_addr().expect("local listener address");

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept connection");
        let request = read_request(&mut stream).await;
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            content_type,
            body.len(),
            body
        );
        stream
            .write_all(response.as_bytes())
            .await
            .expect("write response");
        let _ = stream.shutdown().await;
        request
    });

    (format!("http://{}", addr), handle)
}

/// Read one request: the head plus `Content-Length` bytes of body
pub async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await.expect("read request");
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Body of a captured request
pub fn request_body(request: &str) -> &str {
    request
        .find("\r\n\r\n")
        .map_or("", |end| &request[end + 4..])
}

/// HTTP client that ignores proxy settings from the environment
pub fn local_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("build local client")
}

//! End-to-end ICY probes against a local TCP server speaking just enough
//! HTTP to carry a metadata block.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use volnabot_core::icy::IcyTitleFetcher;

async fn serve_once(payload: Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut request = [0u8; 2048];
            let _ = socket.read(&mut request).await;
            let _ = socket.write_all(&payload).await;
            let _ = socket.shutdown().await;
        }
    });
    format!("http://{addr}/stream")
}

fn icy_response(metaint: usize, title: &str) -> Vec<u8> {
    let head = format!(
        "HTTP/1.1 200 OK\r\nicy-metaint: {metaint}\r\nContent-Type: audio/aacp\r\nConnection: close\r\n\r\n"
    );
    let mut body = vec![0u8; metaint];
    let meta = format!("StreamTitle='{title}';");
    let blocks = meta.len().div_ceil(16);
    body.push(blocks as u8);
    let mut block = meta.into_bytes();
    block.resize(blocks * 16, 0);
    body.extend(block);
    [head.into_bytes(), body].concat()
}

#[tokio::test]
async fn fetches_a_title_over_http() {
    let url = serve_once(icy_response(4096, "Artist - Song")).await;
    let fetcher = IcyTitleFetcher::new();
    assert_eq!(
        fetcher.fetch_title(&url).await,
        Some("Artist - Song".to_string())
    );
}

#[tokio::test]
async fn missing_metaint_header_yields_none() {
    let payload =
        b"HTTP/1.1 200 OK\r\nContent-Type: audio/aacp\r\nConnection: close\r\n\r\naudio".to_vec();
    let url = serve_once(payload).await;
    let fetcher = IcyTitleFetcher::new();
    assert_eq!(fetcher.fetch_title(&url).await, None);
}

#[tokio::test]
async fn zero_length_metadata_yields_none() {
    let metaint = 256;
    let head = format!(
        "HTTP/1.1 200 OK\r\nicy-metaint: {metaint}\r\nConnection: close\r\n\r\n"
    );
    let mut body = vec![0u8; metaint];
    body.push(0);
    let url = serve_once([head.into_bytes(), body].concat()).await;
    let fetcher = IcyTitleFetcher::new();
    assert_eq!(fetcher.fetch_title(&url).await, None);
}

#[tokio::test]
async fn truncated_stream_yields_none() {
    let head = "HTTP/1.1 200 OK\r\nicy-metaint: 4096\r\nConnection: close\r\n\r\n".to_string();
    let mut payload = head.into_bytes();
    payload.extend(vec![0u8; 100]);
    let url = serve_once(payload).await;
    let fetcher = IcyTitleFetcher::new();
    assert_eq!(fetcher.fetch_title(&url).await, None);
}

//! End-to-end relay tests over loopback TCP

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use filecast::client::{publish, send_file, ClientConfig, FileReceiver};
use filecast::{ChannelRegistry, Envelope, FileServer, ServerConfig};

struct TestServer {
    addr: SocketAddr,
    registry: Arc<ChannelRegistry>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<filecast::Result<()>>,
}

impl TestServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = Arc::new(FileServer::new(ServerConfig::default().disable_api()));
        let registry = Arc::clone(server.registry());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            server
                .serve(listener, async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        Self {
            addr,
            registry,
            shutdown: Some(shutdown_tx),
            handle,
        }
    }

    async fn subscribe(&self, channel: &str) -> BufReader<TcpStream> {
        let mut stream = TcpStream::connect(self.addr).await.unwrap();
        stream
            .write_all(format!("subscribe {} {{}}\n", channel).as_bytes())
            .await
            .unwrap();
        BufReader::new(stream)
    }

    /// Write one request line and wait for the server to drop the connection
    async fn send_raw(&self, line: &str) {
        let mut stream = TcpStream::connect(self.addr).await.unwrap();
        stream.write_all(line.as_bytes()).await.unwrap();
        stream.shutdown().await.unwrap();

        let mut rest = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut rest))
            .await
            .expect("server kept the connection open")
            .unwrap();
        assert!(rest.is_empty());
    }

    async fn wait_for_subscribers(&self, channel: &str, count: u32) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let current = self
                    .registry
                    .channel_info(channel)
                    .await
                    .map(|info| info.clients_connected);
                if current == Some(count) {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("subscriber count never reached");
    }

    async fn wait_for_files_sent(&self, channel: &str, count: u64) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let current = self
                    .registry
                    .channel_info(channel)
                    .await
                    .map(|info| info.files_sent);
                if current == Some(count) {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("files_sent never reached");
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.await.unwrap().unwrap();
    }
}

async fn next_line(reader: &mut BufReader<TcpStream>) -> String {
    let mut line = String::new();
    tokio::time::timeout(Duration::from_secs(5), reader.read_line(&mut line))
        .await
        .expect("no frame received")
        .unwrap();
    line
}

const HELLO: &str = r#"{"name":"a","extension":".txt","content":"aGVsbG8="}"#;

#[tokio::test]
async fn test_send_reaches_every_subscriber() {
    let server = TestServer::start().await;

    let mut first = server.subscribe("docs").await;
    let mut second = server.subscribe("docs").await;
    server.wait_for_subscribers("docs", 2).await;

    server.send_raw(&format!("send docs {}\n", HELLO)).await;

    let expected = format!("file {}\n", HELLO);
    assert_eq!(next_line(&mut first).await, expected);
    assert_eq!(next_line(&mut second).await, expected);

    server.wait_for_files_sent("docs", 1).await;
    let stats = server.registry.stats().await;
    assert_eq!(stats.files_sent, 1);
    assert_eq!(stats.clients_connected, 2);
    assert_eq!(stats.channels_available, 1);

    server.stop().await;
}

#[tokio::test]
async fn test_send_to_unknown_channel_creates_nothing() {
    let server = TestServer::start().await;

    let mut subscriber = server.subscribe("docs").await;
    server.wait_for_subscribers("docs", 1).await;

    server.send_raw(&format!("send ghost {}\n", HELLO)).await;
    assert!(!server.registry.channel_exists("ghost").await);

    server.send_raw(&format!("send docs {}\n", HELLO)).await;
    assert_eq!(next_line(&mut subscriber).await, format!("file {}\n", HELLO));

    assert!(!server.registry.channel_exists("ghost").await);
    assert_eq!(server.registry.channel_count().await, 1);

    server.stop().await;
}

#[tokio::test]
async fn test_closed_subscriber_is_removed() {
    let server = TestServer::start().await;

    let mut alive = server.subscribe("docs").await;
    let gone = server.subscribe("docs").await;
    server.wait_for_subscribers("docs", 2).await;

    drop(gone);
    server.wait_for_subscribers("docs", 1).await;

    server.send_raw(&format!("send docs {}\n", HELLO)).await;
    assert_eq!(next_line(&mut alive).await, format!("file {}\n", HELLO));

    server.wait_for_files_sent("docs", 1).await;
    assert!(server.registry.channel_exists("docs").await);

    server.stop().await;
}

#[tokio::test]
async fn test_malformed_request_is_ignored() {
    let server = TestServer::start().await;

    server.send_raw("hello world\n").await;
    server.send_raw("send docs not-json\n").await;

    let mut subscriber = server.subscribe("docs").await;
    server.wait_for_subscribers("docs", 1).await;
    server.send_raw(&format!("send docs {}\n", HELLO)).await;
    assert_eq!(next_line(&mut subscriber).await, format!("file {}\n", HELLO));

    assert_eq!(server.registry.channel_count().await, 1);

    server.stop().await;
}

#[tokio::test]
async fn test_client_roundtrip_saves_file() {
    let server = TestServer::start().await;
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("report.csv");
    tokio::fs::write(&source, b"a,b\n1,2\n").await.unwrap();

    let receive_dir = dir.path().join("received");
    let config = ClientConfig::new(server.addr).files_dir(&receive_dir);
    let receiver = FileReceiver::new(config.clone(), "reports");
    let receiving = tokio::spawn(async move { receiver.run().await });
    server.wait_for_subscribers("reports", 1).await;

    let envelope = send_file(&config, "reports", &source).await.unwrap();
    assert_eq!(envelope.file_name(), "report.csv");
    publish(&config, "reports", &Envelope::from_bytes("notes", ".txt", b"hi"))
        .await
        .unwrap();
    server.wait_for_files_sent("reports", 2).await;

    // Stopping the server closes the subscriber stream and ends the receiver
    server.stop().await;
    let summary = tokio::time::timeout(Duration::from_secs(5), receiving)
        .await
        .expect("receiver did not finish")
        .unwrap()
        .unwrap();

    assert_eq!(summary.saved, 2);
    let saved = receive_dir.join("reports");
    assert_eq!(
        tokio::fs::read(saved.join("report.csv")).await.unwrap(),
        b"a,b\n1,2\n"
    );
    assert_eq!(tokio::fs::read(saved.join("notes.txt")).await.unwrap(), b"hi");
}

//! Shared utilities for integration and load testing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use wiki_dispatch::config::ListenerConfig;
use wiki_dispatch::dispatch::Application;
use wiki_dispatch::http::HttpServer;
use wiki_dispatch::lifecycle::Shutdown;
use wiki_dispatch::resource::{MemoryStore, Page};

/// A server running on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: Shutdown,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for the server to drain.
    pub async fn stop(self) {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server did not stop")
            .expect("server task panicked");
    }
}

/// Serve `app` on 127.0.0.1 with an OS-assigned port.
pub async fn start_server(app: Application) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    let server = HttpServer::new(Arc::new(app), &ListenerConfig::default());

    let handle = tokio::spawn(async move {
        server.run(listener, receiver).await.unwrap();
    });

    TestServer { addr, shutdown, handle }
}

/// Store with a few pages of each kind.
#[allow(dead_code)]
pub fn seeded_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::with_pages([
        Page::new("Home", "Welcome home"),
        Page::new("docs/setup.md", "# Setup"),
        Page::new("src/main.rs", "fn main() {}"),
        Page::binary("pics/cat.png"),
    ]))
}

/// Client that reports redirects instead of following them.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

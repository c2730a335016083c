//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use user_service::domain::AppError;
use user_service::http::ServerError;
use user_service::observability::{CorrelationId, ExceptionSink};
use user_service::{HttpServer, Shutdown};

/// A running server on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), ServerError>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for the server task to exit.
    pub async fn stop(self) {
        self.shutdown.trigger();
        self.handle.await.unwrap().unwrap();
    }
}

/// Bind `127.0.0.1:0` and run `server` in the background.
pub async fn start_server(server: HttpServer) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    TestServer {
        addr,
        shutdown,
        handle,
    }
}

/// Client that never pools connections, so shutdown is not held open by
/// idle keep-alives.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Exception sink recording `(correlation id, message)` pairs.
#[derive(Default)]
pub struct RecordingSink {
    pub reports: Mutex<Vec<(String, String)>>,
}

impl ExceptionSink for RecordingSink {
    fn capture(&self, correlation_id: &CorrelationId, error: &AppError) {
        self.reports
            .lock()
            .unwrap()
            .push((correlation_id.to_string(), error.message().to_string()));
    }
}

#[allow(dead_code)]
pub fn recording_sink() -> Arc<RecordingSink> {
    Arc::new(RecordingSink::default())
}

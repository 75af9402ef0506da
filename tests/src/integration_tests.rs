//! Protocol conformance checks against a running status daemon.
//!
//! Only read-only commands are exercised; `update`, `pause` and `restart`
//! would act on the real agent.

use anyhow::{Context, Result, anyhow, ensure};
use common::{DaemonApi, DaemonClient, DaemonEndpoint};
use futures::{SinkExt, StreamExt};
use protocol::{Command, LineCodec, Response};
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::{error, info};

const READ_DEADLINE: Duration = Duration::from_secs(5);
const CONCURRENT_CLIENTS: usize = 16;

pub struct IntegrationTestResults {
    pub total_tests: usize,
    pub passed: usize,
    pub failed: usize,
    pub test_details: Vec<TestResult>,
}

pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub error: Option<String>,
    pub duration_ms: u128,
}

/// Run all integration tests
pub async fn run_all_tests(daemon_addr: &str) -> Result<IntegrationTestResults> {
    info!("=== Starting Integration Tests ===");

    let mut results = IntegrationTestResults {
        total_tests: 0,
        passed: 0,
        failed: 0,
        test_details: Vec::new(),
    };

    results.add_test(timed("Status response", test_status(daemon_addr)).await);
    results.add_test(timed("Update status response", test_update_status(daemon_addr)).await);
    results.add_test(timed("Version check response", test_check_version(daemon_addr)).await);
    results.add_test(timed("Unknown command echo", test_unknown_command(daemon_addr)).await);
    results.add_test(timed("Pipelined requests", test_pipelined(daemon_addr)).await);
    results.add_test(timed("Concurrent clients", test_concurrent(daemon_addr)).await);
    results.add_test(timed("Trailing fragment ignored", test_trailing_fragment(daemon_addr)).await);

    info!("=== Integration Tests Complete ===");
    info!(
        "Total: {}, Passed: {}, Failed: {}",
        results.total_tests, results.passed, results.failed
    );

    Ok(results)
}

impl IntegrationTestResults {
    fn add_test(&mut self, result: TestResult) {
        self.total_tests += 1;
        if result.passed {
            self.passed += 1;
            info!("✓ {} - PASSED ({} ms)", result.name, result.duration_ms);
        } else {
            self.failed += 1;
            error!(
                "✗ {} - FAILED: {}",
                result.name,
                result.error.as_deref().unwrap_or("Unknown error")
            );
        }
        self.test_details.push(result);
    }
}

async fn timed(name: &str, check: impl Future<Output = Result<()>>) -> TestResult {
    let start = Instant::now();
    let outcome = check.await;
    TestResult {
        name: name.to_string(),
        passed: outcome.is_ok(),
        error: outcome.err().map(|e| format!("{:#}", e)),
        duration_ms: start.elapsed().as_millis(),
    }
}

fn client(daemon_addr: &str) -> DaemonClient<DaemonEndpoint> {
    DaemonClient::new(DaemonEndpoint::new(daemon_addr))
}

async fn test_status(daemon_addr: &str) -> Result<()> {
    match client(daemon_addr).request(Command::Status).await? {
        Response::Status { .. } => Ok(()),
        other => Err(anyhow!("unexpected reply `{}`", other)),
    }
}

async fn test_update_status(daemon_addr: &str) -> Result<()> {
    match client(daemon_addr).request(Command::UpdateStatus).await? {
        Response::UpdateStatus(_) => Ok(()),
        other => Err(anyhow!("unexpected reply `{}`", other)),
    }
}

async fn test_check_version(daemon_addr: &str) -> Result<()> {
    match client(daemon_addr).request(Command::CheckVersion).await? {
        Response::VersionCheck(_) => Ok(()),
        other => Err(anyhow!("unexpected reply `{}`", other)),
    }
}

async fn test_unknown_command(daemon_addr: &str) -> Result<()> {
    let replies = exchange_lines(daemon_addr, &["  frobnicate "]).await?;
    let expected = Response::UnknownCommand("frobnicate".to_string()).to_string();
    ensure!(replies == [expected.clone()], "expected `{}`, got {:?}", expected, replies);
    Ok(())
}

/// Several commands written back to back on one connection are answered in
/// order.
async fn test_pipelined(daemon_addr: &str) -> Result<()> {
    let commands = [Command::Status, Command::CheckVersion, Command::UpdateStatus];
    let lines: Vec<&str> = commands.iter().map(Command::as_str).collect();
    let replies = exchange_lines(daemon_addr, &lines).await?;

    ensure!(
        replies.len() == commands.len(),
        "expected {} replies, got {}",
        commands.len(),
        replies.len()
    );
    for (command, reply) in commands.iter().zip(&replies) {
        Response::parse(*command, reply)
            .with_context(|| format!("reply to `{}` out of order", command))?;
    }
    Ok(())
}

async fn test_concurrent(daemon_addr: &str) -> Result<()> {
    let requests = (0..CONCURRENT_CLIENTS).map(|_| {
        let client = client(daemon_addr);
        async move { client.request(Command::Status).await }
    });

    let replies = futures::future::join_all(requests).await;
    let failures = replies
        .iter()
        .filter(|reply| !matches!(reply, Ok(Response::Status { .. })))
        .count();
    ensure!(
        failures == 0,
        "{} of {} concurrent status requests failed",
        failures,
        CONCURRENT_CLIENTS
    );
    Ok(())
}

/// Bytes after the last newline at end of stream are not a request.
async fn test_trailing_fragment(daemon_addr: &str) -> Result<()> {
    let mut stream = TcpStream::connect(daemon_addr).await?;
    stream.write_all(b"status\nstat").await?;
    stream.shutdown().await?;

    let mut received = String::new();
    timeout(READ_DEADLINE, stream.read_to_string(&mut received))
        .await
        .context("daemon kept the connection open after end of input")??;

    let replies: Vec<&str> = received.lines().collect();
    ensure!(replies.len() == 1, "expected one reply, got {:?}", replies);
    Response::parse(Command::Status, replies[0])?;
    Ok(())
}

/// Writes `lines` on one connection, then reads as many reply lines.
async fn exchange_lines(daemon_addr: &str, lines: &[&str]) -> Result<Vec<String>> {
    let stream = TcpStream::connect(daemon_addr).await?;
    let mut framed = Framed::new(stream, LineCodec::new());

    for line in lines {
        framed.feed(*line).await?;
    }
    SinkExt::<&str>::flush(&mut framed).await?;

    let mut replies = Vec::with_capacity(lines.len());
    while replies.len() < lines.len() {
        match timeout(READ_DEADLINE, framed.next()).await {
            Ok(Some(reply)) => replies.push(reply?),
            Ok(None) => break,
            Err(_) => return Err(anyhow!("no reply after {} lines", replies.len())),
        }
    }
    Ok(replies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_daemon::MockDaemon;
    use std::sync::Arc;
    use tokio::net::TcpListener;

    #[test]
    fn test_integration_results() {
        let mut results = IntegrationTestResults {
            total_tests: 0,
            passed: 0,
            failed: 0,
            test_details: Vec::new(),
        };

        results.add_test(TestResult {
            name: "Test 1".to_string(),
            passed: true,
            error: None,
            duration_ms: 100,
        });
        results.add_test(TestResult {
            name: "Test 2".to_string(),
            passed: false,
            error: Some("boom".to_string()),
            duration_ms: 5,
        });

        assert_eq!(results.total_tests, 2);
        assert_eq!(results.passed, 1);
        assert_eq!(results.failed, 1);
    }

    #[tokio::test]
    async fn suite_passes_against_mock_daemon() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let daemon = Arc::new(MockDaemon::new(
            "4.7.0".to_string(),
            "4.7.0".to_string(),
            Duration::from_secs(1),
        ));
        let server = tokio::spawn(daemon.serve(listener));

        let results = run_all_tests(&addr).await.unwrap();
        server.abort();

        let failures: Vec<_> = results
            .test_details
            .iter()
            .filter(|t| !t.passed)
            .map(|t| format!("{}: {:?}", t.name, t.error))
            .collect();
        assert!(failures.is_empty(), "{:?}", failures);
        assert_eq!(results.total_tests, 7);
    }

    #[tokio::test]
    async fn unreachable_daemon_fails_every_check() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let results = run_all_tests(&addr).await.unwrap();
        assert_eq!(results.passed, 0);
        assert_eq!(results.failed, results.total_tests);
    }
}

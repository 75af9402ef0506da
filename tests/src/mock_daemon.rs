use anyhow::Result;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use protocol::{
    Command, ConnectionState, Line, Response, ServerCodec, ServiceState, UpdateProgress,
    VersionCheck,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;
use tracing::{debug, error, info};

/// Stand-in for the status daemon with scripted agent behaviour, for driving
/// the client without a real agent installed.
///
/// `update` pretends to run for `update_duration` and then reports the
/// published version as installed.
pub struct MockDaemon {
    local_version: Mutex<String>,
    remote_version: String,
    update_duration: Duration,
    active: AtomicBool,
    updating: AtomicBool,
}

impl MockDaemon {
    pub fn new(local_version: String, remote_version: String, update_duration: Duration) -> Self {
        Self {
            local_version: Mutex::new(local_version),
            remote_version,
            update_duration,
            active: AtomicBool::new(true),
            updating: AtomicBool::new(false),
        }
    }

    pub async fn run(self: Arc<Self>, port: u16) -> Result<()> {
        let addr: SocketAddr = format!("127.0.0.1:{}", port).parse()?;
        let listener = TcpListener::bind(addr).await?;
        info!("Mock daemon listening on {}", addr);
        self.serve(listener).await;
        Ok(())
    }

    pub async fn serve(self: Arc<Self>, listener: TcpListener) {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    debug!("Mock daemon connection from {}", addr);
                    let daemon = self.clone();
                    tokio::spawn(async move {
                        if let Err(e) = daemon.handle_connection(stream).await {
                            error!("Mock daemon connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }

    async fn handle_connection(self: Arc<Self>, stream: TcpStream) -> Result<()> {
        let mut framed = Framed::new(stream, ServerCodec::new());
        while let Some(line) = framed.next().await {
            let response = match line? {
                Line::Text(text) => self.respond(&text),
                Line::TooLong(excerpt) => Response::UnknownCommand(format!("{}...", excerpt.trim())),
            };
            framed.send(response).await?;
        }
        Ok(())
    }

    fn respond(self: &Arc<Self>, line: &str) -> Response {
        let Ok(command) = line.parse::<Command>() else {
            return Response::UnknownCommand(line.trim().to_string());
        };

        match command {
            Command::Status => {
                let (service, connection) = if self.active.load(Ordering::Acquire) {
                    (ServiceState::Active, ConnectionState::Connected)
                } else {
                    (ServiceState::Inactive, ConnectionState::Disconnected)
                };
                Response::Status {
                    service,
                    connection,
                }
            }
            Command::Update => {
                if self
                    .updating
                    .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    info!("Mock update started");
                    let daemon = self.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(daemon.update_duration).await;
                        *daemon.local_version.lock() = daemon.remote_version.clone();
                        daemon.updating.store(false, Ordering::Release);
                        info!("Mock update finished");
                    });
                }
                Response::update_ack()
            }
            Command::UpdateStatus => {
                if self.updating.load(Ordering::Acquire) {
                    Response::UpdateStatus(UpdateProgress::Progressing)
                } else {
                    Response::UpdateStatus(UpdateProgress::Disable)
                }
            }
            Command::CheckVersion => {
                let local = self.local_version.lock().clone();
                if local == self.remote_version {
                    Response::VersionCheck(VersionCheck::UpToDate(local))
                } else {
                    Response::VersionCheck(VersionCheck::Outdated(local))
                }
            }
            Command::Pause => {
                self.active.store(false, Ordering::Release);
                Response::pause_ack()
            }
            Command::Restart => {
                self.active.store(true, Ordering::Release);
                Response::restart_ack()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn update_converges_to_published_version() {
        let daemon = Arc::new(MockDaemon::new(
            "4.6.0".to_string(),
            "4.7.0".to_string(),
            Duration::from_millis(50),
        ));

        assert_eq!(
            daemon.respond("check-version").to_string(),
            "VersionCheck: Outdated, v4.6.0"
        );
        assert_eq!(daemon.respond("update").to_string(), "Update command received");
        assert_eq!(daemon.respond("update-status").to_string(), "Update: Progressing");

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(daemon.respond("update-status").to_string(), "Update: Disable");
        assert_eq!(
            daemon.respond("check-version").to_string(),
            "VersionCheck: Up to date, v4.7.0"
        );
    }

    #[tokio::test]
    async fn pause_and_restart_toggle_status() {
        let daemon = Arc::new(MockDaemon::new(
            "4.7.0".to_string(),
            "4.7.0".to_string(),
            Duration::from_secs(1),
        ));

        daemon.respond("pause");
        assert_eq!(
            daemon.respond("status").to_string(),
            "Status: Inactive, Connection: Disconnected"
        );
        daemon.respond("restart");
        assert_eq!(
            daemon.respond("status").to_string(),
            "Status: Active, Connection: Connected"
        );
    }
}

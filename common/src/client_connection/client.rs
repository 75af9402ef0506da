use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use protocol::{ClientCodec, Command, Response};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::debug;

use super::config::ClientConnectionConfig;
use crate::error::{CommonError, Result};

/// Request/response access to the status daemon.
///
/// Implemented by [`DaemonClient`]; tests substitute scripted fakes.
#[async_trait]
pub trait DaemonApi: Send + Sync {
    async fn request(&self, command: Command) -> Result<Response>;
}

/// One short-lived TCP connection per command, bounded by dial and I/O
/// deadlines so a stalled daemon can never hang the caller.
#[derive(Debug, Clone)]
pub struct DaemonClient<C> {
    config: C,
}

impl<C> DaemonClient<C>
where
    C: ClientConnectionConfig,
{
    pub fn new(config: C) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    /// Sends `command` and returns the raw response line, newline stripped.
    pub async fn request_line(&self, command: Command) -> Result<String> {
        let addr = self.config.daemon_addr();

        let stream = match timeout(self.config.dial_timeout(), TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                return Err(CommonError::Timeout(format!("connect to {}", addr)));
            }
        };

        let mut framed = Framed::new(stream, ClientCodec::new());
        let exchange = exchange(&mut framed, command);

        let line = match timeout(self.config.io_timeout(), exchange).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(CommonError::Timeout(format!("response to `{}`", command)));
            }
        };

        debug!("{} -> {}", command, line);
        Ok(line)
    }
}

async fn exchange(framed: &mut Framed<TcpStream, ClientCodec>, command: Command) -> Result<String> {
    framed.send(command).await?;
    match framed.next().await {
        Some(Ok(line)) => Ok(line),
        Some(Err(e)) => Err(CommonError::Io(e)),
        None => Err(CommonError::Connection(format!(
            "daemon closed the connection before answering `{}`",
            command
        ))),
    }
}

#[async_trait]
impl<C> DaemonApi for DaemonClient<C>
where
    C: ClientConnectionConfig,
{
    async fn request(&self, command: Command) -> Result<Response> {
        let line = self.request_line(command).await?;
        Ok(Response::parse(command, &line)?)
    }
}

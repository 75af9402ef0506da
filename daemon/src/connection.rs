use crate::error::{DaemonError, Result};
use crate::orchestrator::{TriggerOutcome, UpdateOrchestrator};
use crate::platform::AgentControl;
use crate::status_cache::StatusReader;
use crate::version::VersionChecker;
use futures::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use protocol::{Command, Line, MAX_LINE_LENGTH, Response, ServerCodec, UpdateProgress};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::{debug, error, info, warn};

type FramedWriter<S> = SplitSink<Framed<S, ServerCodec>, Response>;
type FramedReader<S> = SplitStream<Framed<S, ServerCodec>>;

/// Everything a command handler may touch. Cloned into every connection task.
#[derive(Clone)]
pub struct CommandContext {
    pub status: StatusReader,
    pub control: Arc<dyn AgentControl>,
    pub versions: Arc<VersionChecker>,
    pub orchestrator: Arc<UpdateOrchestrator>,
}

impl CommandContext {
    /// Turns one request line into exactly one response.
    pub async fn dispatch(&self, line: &str) -> Response {
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(_) => {
                debug!("Unknown command: {:?}", line);
                return Response::UnknownCommand(line.trim().to_string());
            }
        };

        match command {
            Command::Status => {
                let snapshot = self.status.snapshot();
                Response::Status {
                    service: snapshot.service,
                    connection: snapshot.connection,
                }
            }
            Command::Update => {
                if self.orchestrator.trigger() == TriggerOutcome::Disabled {
                    warn!("Update command ignored: updates are disabled");
                }
                Response::update_ack()
            }
            Command::UpdateStatus => {
                Response::UpdateStatus(UpdateProgress::from(self.orchestrator.state()))
            }
            Command::CheckVersion => Response::VersionCheck(self.versions.check().await.to_check()),
            Command::Pause => {
                info!("Pausing agent");
                if let Err(e) = self.control.pause().await {
                    error!("Failed to pause agent: {}", e);
                }
                Response::pause_ack()
            }
            Command::Restart => {
                if self.orchestrator.is_running() {
                    warn!("Restart requested while an agent update is running");
                }
                info!("Restarting agent");
                if let Err(e) = self.control.restart().await {
                    error!("Failed to restart agent: {}", e);
                }
                Response::restart_ack()
            }
        }
    }

    /// Answers a framed request. An oversized line is an unknown command,
    /// echoed by its first bytes.
    pub async fn dispatch_line(&self, line: &Line) -> Response {
        match line {
            Line::Text(text) => self.dispatch(text).await,
            Line::TooLong(excerpt) => {
                warn!("Request line longer than {} bytes", MAX_LINE_LENGTH);
                Response::UnknownCommand(format!("{}...", excerpt.trim()))
            }
        }
    }
}

/// One client connection. Requests are served strictly in order.
pub struct ServerConnection<S> {
    writer: FramedWriter<S>,
    reader: FramedReader<S>,
    context: CommandContext,
    idle_timeout: Duration,
    write_timeout: Duration,
}

impl<S> ServerConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        stream: S,
        context: CommandContext,
        idle_timeout: Duration,
        write_timeout: Duration,
    ) -> Self {
        let (writer, reader) = Framed::new(stream, ServerCodec::new()).split();
        Self {
            writer,
            reader,
            context,
            idle_timeout,
            write_timeout,
        }
    }

    /// Next request line; `None` once the peer has closed (a trailing
    /// unterminated fragment is dropped) or gone idle.
    async fn read_request(&mut self) -> Result<Option<Line>> {
        match timeout(self.idle_timeout, self.reader.next()).await {
            Ok(Some(Ok(line))) => Ok(Some(line)),
            Ok(Some(Err(e))) => Err(DaemonError::Io(e)),
            Ok(None) => Ok(None),
            Err(_) => {
                debug!("Closing connection idle for {:?}", self.idle_timeout);
                Ok(None)
            }
        }
    }

    async fn send_response(&mut self, response: Response) -> Result<()> {
        timeout(self.write_timeout, self.writer.send(response))
            .await
            .map_err(|_| DaemonError::Timeout("response write".to_string()))??;
        Ok(())
    }

    pub async fn run(mut self) -> Result<()> {
        while let Some(line) = self.read_request().await? {
            let response = self.context.dispatch_line(&line).await;
            debug!("{:?} -> {}", line, response);
            self.send_response(response).await?;
        }
        Ok(())
    }
}

/// WebSocket client for the voice backend.
///
/// One task owns the connection for its whole life: connect with a handshake
/// timeout, pump frames into the dispatcher, ping on every heartbeat, and
/// reconnect with exponential backoff when the link drops.  Stopping is an
/// abort of that task.
use futures_util::{SinkExt, StreamExt};
use rdf_proto::config::BackendConfig;
use rdf_proto::dispatch::Dispatcher;
use rdf_proto::host::ChannelHost;
use rdf_proto::protocol::BackendCommand;
use rdf_proto::{RdfError, NOTICE_TARGET};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, timeout, Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const OUTBOUND_QUEUE: usize = 16;
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

pub struct BackendHandle {
    outbound: mpsc::Sender<String>,
    task: JoinHandle<()>,
}

impl BackendHandle {
    /// Queue a command for the live connection.  Commands queued while
    /// disconnected are dropped when the next connection opens.
    pub fn send(&self, cmd: &BackendCommand) -> rdf_proto::Result<()> {
        let text = cmd.encode()?;
        self.outbound
            .try_send(text)
            .map_err(|e| RdfError::Transport(format!("outbound queue: {e}")))
    }

    pub fn stop(self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Reconnect delay after `current`: doubled, capped at two heartbeats.
pub fn next_backoff(current: Duration, heartbeat: Duration) -> Duration {
    (current * 2).min(heartbeat * 2).max(INITIAL_BACKOFF)
}

pub fn start<H>(config: BackendConfig, dispatcher: Arc<Dispatcher<H>>) -> BackendHandle
where
    H: ChannelHost + 'static,
{
    let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE);
    let task = tokio::spawn(run(config, dispatcher, outbound_rx));
    BackendHandle { outbound, task }
}

enum SessionEnd {
    Closed(Option<u16>, String),
    Failed(String),
    /// The handle and its sender are gone.
    Stopped,
}

async fn run<H: ChannelHost + 'static>(
    config: BackendConfig,
    dispatcher: Arc<Dispatcher<H>>,
    mut outbound_rx: mpsc::Receiver<String>,
) {
    let url = config.ws_url();
    let handshake = Duration::from_secs(config.timeout_secs);
    let heartbeat = Duration::from_secs(config.heartbeat_secs);
    let mut backoff = INITIAL_BACKOFF;

    loop {
        dispatcher.on_connecting();
        debug!("connecting to {}", url);

        match timeout(handshake, connect_async(url.as_str())).await {
            Ok(Ok((ws, _response))) => {
                backoff = INITIAL_BACKOFF;
                dispatcher.on_open(&config.address);
                tokio::spawn(probe_version(config.version_url(), config.address.clone(), handshake));

                let mut dropped = 0;
                while outbound_rx.try_recv().is_ok() {
                    dropped += 1;
                }
                if dropped > 0 {
                    debug!("dropped {} commands queued while offline", dropped);
                }

                match session(ws, &dispatcher, &mut outbound_rx, heartbeat).await {
                    SessionEnd::Closed(code, reason) => dispatcher.on_close(code, &reason),
                    SessionEnd::Failed(reason) => {
                        dispatcher.on_error(&reason);
                        dispatcher.on_close(None, &reason);
                    }
                    SessionEnd::Stopped => {
                        dispatcher.on_disconnected();
                        return;
                    }
                }
            }
            Ok(Err(e)) => dispatcher.on_error(&e.to_string()),
            Err(_) => dispatcher.on_error(&format!("handshake timed out after {:?}", handshake)),
        }

        dispatcher.on_disconnected();
        debug!("reconnecting in {:?}", backoff);
        sleep(backoff).await;
        backoff = next_backoff(backoff, heartbeat);
    }
}

async fn session<H: ChannelHost>(
    mut ws: WsStream,
    dispatcher: &Dispatcher<H>,
    outbound_rx: &mut mpsc::Receiver<String>,
    heartbeat: Duration,
) -> SessionEnd {
    let mut ping = interval(heartbeat);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ping.tick().await;
    let mut last_inbound = Instant::now();

    loop {
        tokio::select! {
            frame = ws.next() => {
                let msg = match frame {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => return SessionEnd::Failed(e.to_string()),
                    None => return SessionEnd::Closed(None, "stream ended".to_string()),
                };
                last_inbound = Instant::now();
                match msg {
                    Message::Text(text) => {
                        dispatcher.on_message(&text);
                    }
                    Message::Close(frame) => {
                        let (code, reason) = frame
                            .map(|f| (Some(u16::from(f.code)), f.reason.into_owned()))
                            .unwrap_or((None, String::new()));
                        return SessionEnd::Closed(code, reason);
                    }
                    Message::Ping(_) | Message::Pong(_) => trace!("heartbeat from backend"),
                    other => trace!("ignoring non-text frame ({} bytes)", other.len()),
                }
            }

            out = outbound_rx.recv() => {
                let Some(text) = out else {
                    let _ = ws.close(None).await;
                    return SessionEnd::Stopped;
                };
                debug!("sending {}", text);
                if let Err(e) = ws.send(Message::Text(text)).await {
                    return SessionEnd::Failed(e.to_string());
                }
            }

            _ = ping.tick() => {
                if last_inbound.elapsed() > heartbeat * 2 {
                    warn!("no traffic from backend for {:?}, dropping connection", last_inbound.elapsed());
                    return SessionEnd::Failed("heartbeat timeout".to_string());
                }
                if let Err(e) = ws.send(Message::Ping(Vec::new())).await {
                    return SessionEnd::Failed(e.to_string());
                }
            }
        }
    }
}

/// `GET <version_url>`; a 200 with a non-empty body is announced as a notice.
async fn probe_version(url: String, address: String, limit: Duration) {
    match fetch_version(&url, limit).await {
        Ok(Some(version)) => info!(target: NOTICE_TARGET, "Connected to {} on {}.", version, address),
        Ok(None) => debug!("version probe {}: empty answer", url),
        Err(e) => debug!("version probe {} failed: {}", url, e),
    }
}

async fn fetch_version(url: &str, limit: Duration) -> anyhow::Result<Option<String>> {
    let client = reqwest::Client::builder().timeout(limit).build()?;
    let resp = client.get(url).send().await?;
    if resp.status() != reqwest::StatusCode::OK {
        return Ok(None);
    }
    let body = resp.text().await?;
    let body = body.trim();
    Ok((!body.is_empty()).then(|| body.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;
    use rdf_proto::dispatch::ConnectionState;
    use rdf_proto::draw::DrawPositionGenerator;
    use rdf_proto::settings::SettingsStore;
    use rdf_proto::sync::ChannelSync;
    use rdf_proto::tracker::TransmissionTracker;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let hb = Duration::from_secs(3);
        let mut b = INITIAL_BACKOFF;
        let mut seen = Vec::new();
        for _ in 0..5 {
            b = next_backoff(b, hb);
            seen.push(b.as_secs());
        }
        assert_eq!(seen, vec![2, 4, 6, 6, 6]);
    }

    #[tokio::test]
    async fn test_unreachable_backend_keeps_retrying() {
        let host = MemoryHost::default();
        let tracker = TransmissionTracker::new(
            Arc::new(host.clone()),
            Arc::new(SettingsStore::new()),
            DrawPositionGenerator::seeded(0),
        );
        let dispatcher = Arc::new(Dispatcher::new(Arc::new(tracker), ChannelSync::new(Arc::new(host)), 1));

        // nothing listens on port 9 of localhost
        let config = BackendConfig {
            address: "127.0.0.1:9".into(),
            timeout_secs: 1,
            heartbeat_secs: 1,
            ..BackendConfig::default()
        };
        let handle = start(config, dispatcher.clone());
        sleep(Duration::from_millis(300)).await;
        assert_ne!(dispatcher.connection_state(), ConnectionState::Open);
        assert!(!handle.is_finished());
        assert!(handle.send(&BackendCommand::GetStationStates).is_ok());
        handle.stop();
    }
}

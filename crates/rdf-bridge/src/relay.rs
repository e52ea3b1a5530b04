use futures_util::StreamExt;
use rdf_proto::dispatch::Dispatcher;
use rdf_proto::host::ChannelHost;
use rdf_proto::relay::RelayChannel;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{FramedRead, LinesCodec};
use tracing::{debug, error, info, warn};

/// Longest relay line accepted; presence lists of a busy sector stay well below.
const MAX_LINE: usize = 64 * 1024;

/// Accept connections on `bind_address:port` and feed every line into the
/// dispatcher as a `channel` message.
pub fn start_listener<H>(
    bind_address: String,
    port: u16,
    channel: RelayChannel,
    dispatcher: Arc<Dispatcher<H>>,
) -> tokio::task::JoinHandle<()>
where
    H: ChannelHost + 'static,
{
    tokio::spawn(async move {
        let addr = format!("{}:{}", bind_address, port);

        let listener = match TcpListener::bind(&addr).await {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to bind relay socket {}: {}", addr, e);
                return;
            }
        };

        info!("{:?} relay listening at {}", channel, addr);

        let mut client_id = 0usize;
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    client_id += 1;
                    let id = client_id;
                    debug!("relay client {} connected from {}", id, peer);
                    let dispatcher = dispatcher.clone();
                    tokio::spawn(async move {
                        handle_client(stream, id, channel, &dispatcher).await;
                        debug!("relay client {} disconnected", id);
                    });
                }
                Err(e) => {
                    error!("Failed to accept relay connection: {}", e);
                }
            }
        }
    })
}

async fn handle_client<H: ChannelHost>(
    stream: TcpStream,
    client_id: usize,
    channel: RelayChannel,
    dispatcher: &Dispatcher<H>,
) {
    let mut lines = FramedRead::new(stream, LinesCodec::new_with_max_length(MAX_LINE));
    while let Some(line) = lines.next().await {
        match line {
            Ok(line) => deliver(channel, dispatcher, &line),
            Err(e) => {
                warn!("relay client {}: {}", client_id, e);
                break;
            }
        }
    }
}

pub fn deliver<H: ChannelHost>(channel: RelayChannel, dispatcher: &Dispatcher<H>, line: &str) {
    match channel {
        RelayChannel::Presence => dispatcher.on_presence(line),
        RelayChannel::FrequencyState => {
            dispatcher.on_frequency_state(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MemoryHost, TargetUpdate};
    use rdf_proto::draw::DrawPositionGenerator;
    use rdf_proto::settings::SettingsStore;
    use rdf_proto::sync::ChannelSync;
    use rdf_proto::tracker::TransmissionTracker;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_presence_over_tcp() {
        let host = MemoryHost::default();
        for cs in ["DLH1", "BAW2"] {
            host.put_target(cs, TargetUpdate { lat: 51.0, lon: 7.0, altitude: 3000 });
        }
        let tracker = TransmissionTracker::new(
            Arc::new(host.clone()),
            Arc::new(SettingsStore::new()),
            DrawPositionGenerator::seeded(5),
        );
        let dispatcher = Arc::new(Dispatcher::new(Arc::new(tracker), ChannelSync::new(Arc::new(host)), 1));

        // grab a free port, then hand it to the listener
        let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = probe.local_addr().unwrap().port();
        drop(probe);

        let server = start_listener("127.0.0.1".into(), port, RelayChannel::Presence, dispatcher.clone());
        let mut stream = None;
        for _ in 0..50 {
            if let Ok(s) = TcpStream::connect(("127.0.0.1", port)).await {
                stream = Some(s);
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        let mut stream = stream.expect("relay listener up");
        stream.write_all(b"DLH1:BAW2\r\n").await.unwrap();
        stream.flush().await.unwrap();

        let mut seen = 0;
        for _ in 0..50 {
            seen = dispatcher.tracker().query(false).len();
            if seen == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(seen, 2);
        server.abort();
    }
}

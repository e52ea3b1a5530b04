mod backend;
mod core;
mod host;
mod http;
mod notices;
mod relay;

use notices::{Notice, NoticeLog};
use rdf_proto::config::Config;
use rdf_proto::relay::RelayChannel;
use rdf_proto::NOTICE_TARGET;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_FILTER: &str = "info,rdf_bridge=debug,rdf_proto=debug";

/// A custom tracing layer that forwards user-facing notices to the broadcast
/// channel: anything on the notice target, plus every WARN and ERROR.
struct NoticeLayer {
    sender: broadcast::Sender<Notice>,
}

impl NoticeLayer {
    fn new(sender: broadcast::Sender<Notice>) -> Self {
        Self { sender }
    }
}

impl<S> tracing_subscriber::Layer<S> for NoticeLayer
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let meta = event.metadata();
        let level = meta.level();
        let is_notice = meta.target() == NOTICE_TARGET && *level <= tracing::Level::INFO;
        if !is_notice && !matches!(*level, tracing::Level::WARN | tracing::Level::ERROR) {
            return;
        }

        let mut message = String::new();
        let mut visitor = MessageVisitor(&mut message);
        event.record(&mut visitor);

        // no receivers is fine
        let _ = self.sender.send(Notice {
            time: chrono::Local::now().format("%H:%M:%S").to_string(),
            level: level.to_string(),
            message,
        });
    }
}

struct MessageVisitor<'a>(&'a mut String);

impl<'a> tracing::field::Visit for MessageVisitor<'a> {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0.push_str(&format!("{:?}", value));
        } else {
            self.0.push_str(&format!(" {}={:?}", field.name(), value));
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = Config::config_path();
    let config = Config::load_from(&config_path)?;

    // Notice channel first so logging can feed it
    let (notice_tx, notice_rx) = broadcast::channel::<Notice>(100);
    let notices = Arc::new(NoticeLog::default());
    {
        let notices = notices.clone();
        tokio::spawn(async move { notices.collect(notice_rx).await });
    }

    let data_dir = rdf_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = rdf_proto::platform::log_file();

    let log_file = std::fs::OpenOptions::new().create(true).append(true).open(&log_path)?;

    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(log_file).with_ansi(false);
    let notice_layer = NoticeLayer::new(notice_tx.clone());
    let fallback = config.log_level.clone().unwrap_or_else(|| DEFAULT_FILTER.to_string());

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(notice_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(&fallback))
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_FILTER)),
        )
        .init();

    info!("Log file: {:?}", log_path);
    info!("Config loaded from: {:?}", config_path);

    // Event channel: commands funnel into BridgeCore
    let (event_tx, event_rx) = tokio::sync::mpsc::channel::<core::BridgeEvent>(64);

    let mut bridge_core = core::BridgeCore::new(config_path, config.clone(), notices)?;
    bridge_core.start();
    let shared = bridge_core.shared();

    if config.relay.enabled {
        let _presence_handle = relay::start_listener(
            config.relay.bind_address.clone(),
            config.relay.presence_port,
            RelayChannel::Presence,
            shared.dispatcher.clone(),
        );
        let _frequency_handle = relay::start_listener(
            config.relay.bind_address.clone(),
            config.relay.frequency_port,
            RelayChannel::FrequencyState,
            shared.dispatcher.clone(),
        );
    }

    if config.http.enabled {
        let _http_handle = http::start_server(
            config.http.bind_address.clone(),
            config.http.port,
            shared.clone(),
            event_tx.clone(),
        );
    }

    {
        let event_tx = event_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = event_tx.send(core::BridgeEvent::Shutdown).await;
            }
        });
    }

    info!("Bridge initialised, running event loop");
    bridge_core.run(event_rx).await?;

    Ok(())
}

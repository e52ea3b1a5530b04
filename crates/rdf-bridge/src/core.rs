/// BridgeCore: single owner of everything a RELOAD replaces.
///
/// The backend connection handle, the style set and the settings file belong
/// to the core loop.  The pieces that HTTP handlers and the connection tasks
/// read concurrently (host tables, settings store, dispatcher and tracker)
/// live in `Shared` and are internally synchronised.
use std::path::PathBuf;
use std::sync::Arc;

use rdf_proto::command::{Command, CommandTarget};
use rdf_proto::config::{Config, MODE_DISABLED};
use rdf_proto::dispatch::Dispatcher;
use rdf_proto::draw::DrawPositionGenerator;
use rdf_proto::protocol::BackendCommand;
use rdf_proto::settings::{
    FileSettings, SettingsSource, SettingsStore, GLOBAL_SURFACE, SETTING_ENDPOINT, SETTING_HELPER_MODE,
};
use rdf_proto::style::StyleManager;
use rdf_proto::sync::ChannelSync;
use rdf_proto::tracker::TransmissionTracker;
use rdf_proto::NOTICE_TARGET;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::backend::{self, BackendHandle};
use crate::host::MemoryHost;
use crate::notices::NoticeLog;

// ── BridgeEvent ───────────────────────────────────────────────────────────────

/// All inputs into the BridgeCore loop.
#[derive(Debug)]
pub enum BridgeEvent {
    /// A `.RDF` command line; `reply` receives whether it was handled.
    Command {
        line: String,
        surface: i32,
        reply: oneshot::Sender<bool>,
    },
    /// Shutdown requested.
    Shutdown,
}

// ── Shared ────────────────────────────────────────────────────────────────────

pub struct Shared {
    pub host: MemoryHost,
    pub settings: Arc<SettingsStore>,
    pub dispatcher: Arc<Dispatcher<MemoryHost>>,
    pub notices: Arc<NoticeLog>,
}

impl Shared {
    pub fn tracker(&self) -> &Arc<TransmissionTracker> {
        self.dispatcher.tracker()
    }
}

// ── BridgeCore ────────────────────────────────────────────────────────────────

pub struct BridgeCore {
    config_path: PathBuf,
    config: Config,
    shared: Arc<Shared>,
    settings_file: Arc<FileSettings>,
    styles: StyleManager,
    backend: Option<BackendHandle>,
}

impl BridgeCore {
    pub fn new(config_path: PathBuf, config: Config, notices: Arc<NoticeLog>) -> anyhow::Result<Self> {
        let host = MemoryHost::new(&config.channels);
        let settings = Arc::new(SettingsStore::new());
        let tracker = TransmissionTracker::new(
            Arc::new(host.clone()),
            Arc::clone(&settings),
            DrawPositionGenerator::from_entropy(),
        );
        let dispatcher = Dispatcher::new(
            Arc::new(tracker),
            ChannelSync::new(Arc::new(host.clone())),
            config.backend.mode,
        );
        let settings_file = FileSettings::open(&config.paths.settings_file)?;
        let styles = StyleManager::new(&config.paths.styles_file);

        Ok(Self {
            config_path,
            config,
            shared: Arc::new(Shared {
                host,
                settings,
                dispatcher: Arc::new(dispatcher),
                notices,
            }),
            settings_file,
            styles,
            backend: None,
        })
    }

    /// Borrow the shared state (for the HTTP server and relay listeners).
    pub fn shared(&self) -> Arc<Shared> {
        Arc::clone(&self.shared)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Bring everything up from the config already loaded.
    pub fn start(&mut self) {
        self.apply_config();
    }

    /// Run the core event loop.  Returns on `Shutdown` or when every sender
    /// is gone.
    pub async fn run(mut self, mut event_rx: mpsc::Receiver<BridgeEvent>) -> anyhow::Result<()> {
        info!("BridgeCore: starting event loop");
        loop {
            match event_rx.recv().await {
                None => {
                    info!("BridgeCore: event channel closed, shutting down");
                    break;
                }
                Some(BridgeEvent::Shutdown) => {
                    info!("BridgeCore: shutdown requested");
                    break;
                }
                Some(BridgeEvent::Command { line, surface, reply }) => {
                    let handled = self.handle_command(&line, surface);
                    if reply.send(handled).is_err() {
                        debug!("BridgeCore: command caller went away");
                    }
                }
            }
        }
        self.stop_backend();
        Ok(())
    }

    // ── commands ──────────────────────────────────────────────────────────

    pub fn handle_command(&mut self, line: &str, surface: i32) -> bool {
        debug!("command: {} (surface {})", line, surface);
        let Some(cmd) = Command::parse(line) else {
            return false;
        };
        match cmd {
            Command::Reload => {
                self.reload();
                true
            }
            Command::Refresh => {
                self.refresh();
                true
            }
            cmd => {
                let source = self.settings_file.scope(surface);
                let target = CommandTarget {
                    store: &self.shared.settings,
                    surface,
                    source: &source,
                    styles: &self.styles,
                };
                target.apply(&cmd)
            }
        }
    }

    /// Re-read the config file, then rebuild everything from it.
    pub fn reload(&mut self) {
        match Config::load_from(&self.config_path) {
            Ok(config) => self.config = config,
            Err(e) => warn!("keeping previous config, reload failed: {}", e),
        }
        match FileSettings::open(&self.config.paths.settings_file) {
            Ok(file) => self.settings_file = file,
            Err(e) => warn!("keeping previous settings, reload failed: {}", e),
        }
        if self.styles.path() != self.config.paths.styles_file.as_path() {
            self.styles = StyleManager::new(&self.config.paths.styles_file);
        } else {
            self.styles.load();
        }
        self.apply_config();
    }

    /// Drop all transmissions, switch every channel off and ask the backend
    /// for a fresh station list.
    pub fn refresh(&self) {
        debug!("refreshing RDF records and station states");
        self.shared.tracker().clear();
        self.shared.dispatcher.channel_sync().update_channel(None, None);
        match &self.backend {
            Some(handle) => match handle.send(&BackendCommand::GetStationStates) {
                Ok(()) => debug!("kGetStationStates is sent via WS"),
                Err(e) => warn!("failed to request station states: {}", e),
            },
            None => debug!("no backend connection, station states not requested"),
        }
    }

    fn apply_config(&mut self) {
        let global = self.settings_file.scope(GLOBAL_SURFACE);
        self.apply_backend_overrides(&global);
        self.shared.dispatcher.set_mode(self.config.backend.mode);
        debug!(
            "TrackAudio address: {}, mode: {}",
            self.config.backend.address, self.config.backend.mode
        );

        self.stop_backend();
        debug!("clearing records");
        self.shared.tracker().clear();

        self.reload_draw_settings(&global);

        if self.config.backend.mode != MODE_DISABLED {
            self.shared.dispatcher.channel_sync().update_channel(None, None);
            self.backend = Some(backend::start(
                self.config.backend.clone(),
                Arc::clone(&self.shared.dispatcher),
            ));
            debug!("TrackAudio WebSocket started");
        }
    }

    /// Endpoint and mode stored in the global settings win over the file.
    fn apply_backend_overrides(&mut self, global: &dyn SettingsSource) {
        if let Some(address) = global.get(SETTING_ENDPOINT).filter(|a| !a.trim().is_empty()) {
            self.config.backend.address = address.trim().to_string();
        }
        if let Some(raw) = global.get(SETTING_HELPER_MODE) {
            match raw.trim().parse::<i32>() {
                Ok(mode) if (-1..=2).contains(&mode) => self.config.backend.mode = mode,
                _ => warn!("ignoring {} = {:?}", SETTING_HELPER_MODE, raw),
            }
        }
    }

    fn reload_draw_settings(&self, global: &dyn SettingsSource) {
        let store = &self.shared.settings;
        // surfaces seen this session plus those saved by earlier ones
        let mut known: Vec<i32> = store
            .surfaces()
            .into_iter()
            .chain(self.settings_file.surfaces())
            .filter(|s| *s != GLOBAL_SURFACE)
            .collect();
        known.sort_unstable();
        known.dedup();
        store.reset();

        if let Some(style) = self.styles.default_style() {
            for fault in store.update(GLOBAL_SURFACE, |ds| style.apply_to(ds)) {
                warn!("{}", fault);
            }
            info!(target: NOTICE_TARGET, "RDF Style changed to {} (default)", style.name);
        }

        store.load(GLOBAL_SURFACE, None, global);
        for surface in known {
            let scoped = self.settings_file.scope(surface);
            store.load(surface, Some(&scoped), global);
        }
    }

    fn stop_backend(&mut self) {
        if let Some(handle) = self.backend.take() {
            debug!("stopping TrackAudio WebSocket");
            handle.stop();
            self.shared.dispatcher.on_disconnected();
        }
    }
}

impl Drop for BridgeCore {
    fn drop(&mut self) {
        self.stop_backend();
    }
}

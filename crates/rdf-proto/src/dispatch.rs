/// Routes backend and relay traffic into the tracker and the channel sync.
///
/// Everything entering here is untrusted text.  Parse failures are logged and
/// the message is dropped; nothing propagates back to the transport.
use serde::Serialize;
use std::sync::atomic::{AtomicI32, AtomicU8, Ordering};
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

use crate::config::MODE_DISABLED;
use crate::host::ChannelHost;
use crate::protocol::{BackendMessage, Envelope, StationStateValue, MSG_STATION_STATE_UPDATE};
use crate::relay::parse_frequency_state;
use crate::sync::{ChannelSync, Toggle};
use crate::tracker::TransmissionTracker;
use crate::NOTICE_TARGET;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Open = 2,
    Closed = 3,
}

impl ConnectionState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Open,
            3 => ConnectionState::Closed,
            _ => ConnectionState::Disconnected,
        }
    }
}

pub struct Dispatcher<H> {
    tracker: Arc<TransmissionTracker>,
    sync: ChannelSync<H>,
    mode: AtomicI32,
    state: AtomicU8,
}

impl<H: ChannelHost> Dispatcher<H> {
    pub fn new(tracker: Arc<TransmissionTracker>, sync: ChannelSync<H>, mode: i32) -> Self {
        Self {
            tracker,
            sync,
            mode: AtomicI32::new(mode),
            state: AtomicU8::new(ConnectionState::Disconnected as u8),
        }
    }

    pub fn tracker(&self) -> &Arc<TransmissionTracker> {
        &self.tracker
    }

    pub fn channel_sync(&self) -> &ChannelSync<H> {
        &self.sync
    }

    pub fn mode(&self) -> i32 {
        self.mode.load(Ordering::Relaxed)
    }

    pub fn set_mode(&self, mode: i32) {
        self.mode.store(mode, Ordering::Relaxed);
    }

    /// Channel sync runs in modes 1 and 2 only.
    pub fn sync_enabled(&self) -> bool {
        self.mode() > 0
    }

    pub fn is_disabled(&self) -> bool {
        self.mode() == MODE_DISABLED
    }

    pub fn connection_state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Relaxed))
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::Relaxed);
    }

    // ── connection lifecycle ──────────────────────────────────────────────

    pub fn on_connecting(&self) {
        self.set_state(ConnectionState::Connecting);
    }

    pub fn on_open(&self, address: &str) {
        self.set_state(ConnectionState::Open);
        debug!(target: NOTICE_TARGET, "TrackAudio WebSocket connected to {}", address);
    }

    /// Transport errors are observations only; tracked state is left alone.
    pub fn on_error(&self, reason: &str) {
        debug!(target: NOTICE_TARGET, "TrackAudio WebSocket error: {}", reason);
    }

    pub fn on_close(&self, code: Option<u16>, reason: &str) {
        self.set_state(ConnectionState::Closed);
        debug!(target: NOTICE_TARGET, "TrackAudio WebSocket closed, code: {:?}, reason: {}", code, reason);
        warn!("TrackAudio WebSocket disconnected!");
    }

    pub fn on_disconnected(&self) {
        self.set_state(ConnectionState::Disconnected);
    }

    // ── backend messages ──────────────────────────────────────────────────

    /// Handle one text frame.  Returns the toggles it caused.
    pub fn on_message(&self, text: &str) -> Vec<Toggle> {
        let envelope = match Envelope::parse(text) {
            Ok(env) => env,
            Err(e) => {
                error!("failed to parse backend message: {} ({:?})", e, text);
                return Vec::new();
            }
        };
        match envelope.decode() {
            Ok(Some(msg)) => self.handle(msg),
            Ok(None) => {
                trace!("unhandled message type {}: {}", envelope.msg_type, envelope.value);
                Vec::new()
            }
            Err(e) => {
                error!("failed to decode {}: {}", envelope.msg_type, e);
                Vec::new()
            }
        }
    }

    fn handle(&self, msg: BackendMessage) -> Vec<Toggle> {
        match msg {
            BackendMessage::RxBegin(v) => {
                self.tracker.on_begin(&v.callsign);
                Vec::new()
            }
            BackendMessage::RxEnd(v) => {
                self.tracker.on_end(&v.callsign);
                Vec::new()
            }
            BackendMessage::StationStateUpdate(v) => {
                if !self.sync_enabled() {
                    return Vec::new();
                }
                self.station_state(&v)
            }
            BackendMessage::StationStates(v) => {
                if !self.sync_enabled() {
                    return Vec::new();
                }
                let mut done = Vec::new();
                for station in v.stations.iter().filter(|s| s.msg_type == MSG_STATION_STATE_UPDATE) {
                    match serde_json::from_value::<StationStateValue>(station.value.clone()) {
                        Ok(value) => done.extend(self.station_state(&value)),
                        Err(e) => error!("bad station entry: {}", e),
                    }
                }
                done
            }
        }
    }

    fn station_state(&self, value: &StationStateValue) -> Vec<Toggle> {
        self.sync.update_channel(value.callsign(), Some(value.channel_state()))
    }

    // ── local relay ───────────────────────────────────────────────────────

    /// `CS1:CS2:...` presence list.
    pub fn on_presence(&self, raw: &str) {
        trace!("presence: {:?}", raw);
        self.tracker.on_bulk_update(raw);
    }

    /// `freqMHz:rx:tx` channel state.
    pub fn on_frequency_state(&self, raw: &str) -> Vec<Toggle> {
        match parse_frequency_state(raw) {
            Ok(state) => self.sync.update_channel(None, Some(state)),
            Err(e) => {
                error!("failed to parse relay message: {}", e);
                Vec::new()
            }
        }
    }
}

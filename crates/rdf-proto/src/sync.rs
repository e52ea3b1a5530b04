/// Apply remote rx/tx state to host channels.
///
/// Primary and ATIS channels belong to the controller and are never toggled
/// remotely.  Toggles are change-driven: a channel already in the desired state
/// is left alone.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::frequency::Frequency;
use crate::host::{ChannelHost, GroundToAirChannel};
use crate::resolver::select_channel;
use crate::NOTICE_TARGET;

/// Channel state from a backend update, a relay message or a live channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelState {
    pub frequency: Frequency,
    pub rx: bool,
    pub tx: bool,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub is_atis: bool,
}

impl ChannelState {
    pub fn new(frequency: Frequency, rx: bool, tx: bool) -> Self {
        Self {
            frequency,
            rx,
            tx,
            is_primary: false,
            is_atis: false,
        }
    }

    pub fn from_channel(channel: &impl GroundToAirChannel) -> Self {
        Self {
            frequency: channel.frequency(),
            rx: channel.is_receive_on(),
            tx: channel.is_transmit_on(),
            is_primary: channel.is_primary(),
            is_atis: channel.is_atis(),
        }
    }

    pub fn is_protected(&self) -> bool {
        self.is_primary || self.is_atis
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleKind {
    Rx,
    Tx,
}

impl fmt::Display for ToggleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToggleKind::Rx => write!(f, "RX"),
            ToggleKind::Tx => write!(f, "TX"),
        }
    }
}

/// One toggle that was actually performed.
#[derive(Debug, Clone, PartialEq)]
pub struct Toggle {
    pub kind: ToggleKind,
    pub name: String,
    pub frequency_mhz: f64,
    /// State after the toggle.
    pub enabled: bool,
}

/// Bring `channel` to the desired rx/tx state.  `None` leaves that side alone.
pub fn toggle_channel(channel: &impl GroundToAirChannel, rx: Option<bool>, tx: Option<bool>) -> Vec<Toggle> {
    let mut done = Vec::new();
    if channel.is_atis() || channel.is_primary() {
        return done;
    }

    if let Some(want) = rx {
        if want != channel.is_receive_on() {
            channel.toggle_receive();
            done.push(notify(channel, ToggleKind::Rx, want));
        }
    }
    if let Some(want) = tx {
        if want != channel.is_transmit_on() {
            channel.toggle_transmit();
            done.push(notify(channel, ToggleKind::Tx, want));
        }
    }
    done
}

fn notify(channel: &impl GroundToAirChannel, kind: ToggleKind, enabled: bool) -> Toggle {
    let toggle = Toggle {
        kind,
        name: channel.name(),
        frequency_mhz: channel.frequency_mhz(),
        enabled,
    };
    debug!(target: NOTICE_TARGET, "{} toggle: {} frequency: {}", kind, toggle.name, toggle.frequency_mhz);
    toggle
}

/// Update orchestration over one host channel collection.
pub struct ChannelSync<H> {
    host: Arc<H>,
}

impl<H> Clone for ChannelSync<H> {
    fn clone(&self) -> Self {
        Self {
            host: Arc::clone(&self.host),
        }
    }
}

impl<H: ChannelHost> ChannelSync<H> {
    pub fn new(host: Arc<H>) -> Self {
        Self { host }
    }

    pub fn host(&self) -> &Arc<H> {
        &self.host
    }

    /// * `state == None`: switch rx/tx off everywhere (protected channels excepted).
    /// * primary/ATIS state: ignored.
    /// * otherwise: resolve by (callsign, frequency) and apply rx/tx.
    pub fn update_channel(&self, callsign: Option<&str>, state: Option<ChannelState>) -> Vec<Toggle> {
        let Some(state) = state else {
            debug!("deactivating all");
            return self
                .host
                .channels()
                .iter()
                .flat_map(|c| toggle_channel(c, Some(false), Some(false)))
                .collect();
        };

        if state.is_protected() {
            debug!("prim: {} atis: {}", state.is_primary, state.is_atis);
            return Vec::new();
        }

        debug!("{} - {}", callsign.unwrap_or("NULL"), state.frequency);
        match select_channel(self.host.as_ref(), callsign, Some(state.frequency)) {
            Some(chnl) => toggle_channel(&chnl, Some(state.rx), Some(state.tx)),
            None => Vec::new(),
        }
    }
}

/// Resolve a (callsign, frequency) pair to one live ground-to-air channel.
///
/// Channel names are not unique in the host, only name + frequency is, so
/// resolution goes through tiers, first hit wins:
///
/// 1. exact: name and frequency
/// 2. name only
/// 3. frequency, preferring the channel listed closest to the primary channel
///    (or the first match when there is no primary)
use std::collections::BTreeMap;
use tracing::{debug, trace};

use crate::frequency::Frequency;
use crate::host::{ChannelHost, GroundToAirChannel};
use crate::sync::ChannelState;

pub fn select_channel<H: ChannelHost>(
    host: &H,
    callsign: Option<&str>,
    frequency: Option<Frequency>,
) -> Option<H::Channel> {
    if let (Some(cs), Some(freq)) = (callsign, frequency) {
        if let Some(chnl) = host
            .channels()
            .into_iter()
            .find(|c| c.name() == cs && c.frequency().is_same(freq))
        {
            debug!("precise match is found: {} - {}", cs, freq);
            return Some(chnl);
        }
    }

    if let Some(cs) = callsign {
        if let Some(chnl) = host.channels().into_iter().find(|c| c.name() == cs) {
            debug!("callsign match is found: {} - {}", cs, chnl.frequency());
            return Some(chnl);
        }
    }

    if let Some(freq) = frequency {
        return select_by_frequency(host, freq);
    }

    trace!("no channel for {:?} / {:?}", callsign, frequency);
    None
}

fn select_by_frequency<H: ChannelHost>(host: &H, frequency: Frequency) -> Option<H::Channel> {
    // name-sorted snapshot; duplicate names collapse to the last one listed
    let snapshot: BTreeMap<String, ChannelState> = host
        .channels()
        .iter()
        .map(|c| (c.name(), ChannelState::from_channel(c)))
        .collect();

    let Some(prim_index) = snapshot.values().position(|s| s.is_primary) else {
        let found = host
            .channels()
            .into_iter()
            .find(|c| c.frequency().is_same(frequency));
        if let Some(ref chnl) = found {
            debug!("frequency match is found without primary, callsign: {}", chnl.name());
        }
        return found;
    };

    let nearest = snapshot
        .iter()
        .enumerate()
        .filter(|(_, (_, state))| state.frequency.is_same(frequency))
        .min_by_key(|(idx, _)| idx.abs_diff(prim_index))
        .map(|(_, (name, _))| name.clone())?;

    let found = host
        .channels()
        .into_iter()
        .find(|c| c.name() == nearest && c.frequency().is_same(frequency));
    if found.is_some() {
        debug!("frequency match is found nearest prim, callsign: {}", nearest);
    }
    found
}

//! Text formats spoken by the co-located bridge process.
//!
//! * presence list: `CS1:CS2:...` (possibly empty), handed to the tracker as is
//! * frequency state: `118.500:True:False` (MHz, receive, transmit)

use crate::error::{RdfError, Result};
use crate::frequency::Frequency;
use crate::sync::ChannelState;

/// Which local channel a relay message arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayChannel {
    Presence,
    FrequencyState,
}

/// Parse a `freqMHz:rx:tx` message.  Only the literal `True` counts as true.
pub fn parse_frequency_state(message: &str) -> Result<ChannelState> {
    let fields: Vec<&str> = message.split(':').collect();
    let [freq, rx, tx] = fields.as_slice() else {
        return Err(RdfError::parse(format!(
            "expected 3 fields, got {}: {:?}",
            fields.len(),
            message
        )));
    };
    let mhz: f64 = freq.trim().parse()?;
    let frequency = Frequency::from_mhz(mhz);
    if frequency.is_redundant() {
        return Err(RdfError::parse(format!("unusable frequency: {freq:?}")));
    }
    Ok(ChannelState::new(frequency, rx.trim() == "True", tx.trim() == "True"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frequency_state() {
        let s = parse_frequency_state("118.500:True:False").unwrap();
        assert_eq!(s.frequency, Frequency::from_khz(118_500));
        assert!(s.rx);
        assert!(!s.tx);
        assert!(!s.is_protected());
    }

    #[test]
    fn test_only_literal_true() {
        let s = parse_frequency_state("121.800:true:TRUE").unwrap();
        assert!(!s.rx && !s.tx);
    }

    #[test]
    fn test_wrong_field_count() {
        assert!(parse_frequency_state("118.500:True").is_err());
        assert!(parse_frequency_state("118.500:True:False:x").is_err());
        assert!(parse_frequency_state("").is_err());
    }

    #[test]
    fn test_bad_number() {
        assert!(matches!(parse_frequency_state("abc:True:True"), Err(RdfError::Parse(_))));
        assert!(parse_frequency_state("inf:True:True").is_err());
    }
}

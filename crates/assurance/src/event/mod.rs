//! Event parsing: SNMP trap and syslog decoding plus normalization onto
//! the common envelope consumed by the alarm engine.

pub mod normalize;
pub mod snmp;
pub mod syslog;

pub use normalize::{
    extract_event_patterns, EventDetails, EventNormalizer, EventPatterns, EventSource,
    NormalizedEvent,
};
pub use snmp::{SnmpTrap, SnmpTrapParser};
pub use syslog::{SyslogEvent, SyslogParser};

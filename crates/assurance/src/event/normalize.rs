use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::snmp::{trap_name, SnmpTrap, SnmpTrapParser};
use super::syslog::{severity_name, SyslogEvent, SyslogParser};
use crate::types::{AlarmSeverity, EventType};

/// Where an event came from.
#[derive(Debug, Clone, Serialize)]
pub struct EventSource {
    pub device: String,
    pub ip: String,
    pub kind: &'static str,
}

/// Parsed payload of a normalized event, tagged by origin.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventDetails {
    SnmpTrap(SnmpTrap),
    Syslog(SyslogEvent),
}

/// Common envelope every event is projected onto before rule evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedEvent {
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub source: EventSource,
    pub severity: AlarmSeverity,
    pub category: &'static str,
    pub title: String,
    pub description: String,
    pub details: EventDetails,
    pub raw_data: Option<String>,
    pub parsing_errors: Vec<String>,
}

impl NormalizedEvent {
    /// Resolve a rule-criteria key against this event.
    ///
    /// Envelope fields are checked first, then the payload: trap varbinds
    /// by OID, syslog structured data by key.
    pub fn field(&self, key: &str) -> Option<String> {
        match key {
            "device" => return Some(self.source.device.clone()),
            "ip" | "source_ip" => return Some(self.source.ip.clone()),
            "severity" => return Some(self.severity.as_str().to_string()),
            "category" => return Some(self.category.to_string()),
            "title" => return Some(self.title.clone()),
            "description" => return Some(self.description.clone()),
            _ => {}
        }

        match &self.details {
            EventDetails::SnmpTrap(trap) => match key {
                "trap_oid" => trap.trap_oid.clone(),
                "trap_name" => trap.trap_name.clone(),
                "enterprise" | "enterprise_name" => trap.enterprise_name.clone(),
                "enterprise_oid" => trap.enterprise_oid.clone(),
                "agent_addr" => trap.agent_addr.clone(),
                "generic_trap" => trap.generic_trap.map(|v| v.to_string()),
                "specific_trap" => trap.specific_trap.map(|v| v.to_string()),
                _ => trap.varbinds.get(key).cloned(),
            },
            EventDetails::Syslog(syslog) => match key {
                "message" => Some(syslog.message.clone()),
                "program" => syslog.program.clone(),
                "hostname" => syslog.hostname.clone(),
                "pid" => syslog.pid.map(|v| v.to_string()),
                "facility" => Some(syslog.facility_name.clone()),
                "facility_code" => Some(syslog.facility.to_string()),
                "severity_code" => Some(syslog.severity.to_string()),
                "security_event" => Some(syslog.potential_security_event.to_string()),
                _ => syslog.structured_data.get(key).cloned(),
            },
        }
    }
}

/// Normalizes raw or pre-decoded trap/syslog inputs onto the common
/// envelope consumed by the alarm engine.
#[derive(Debug, Default)]
pub struct EventNormalizer {
    snmp_parser: SnmpTrapParser,
    syslog_parser: SyslogParser,
}

impl EventNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize an SNMP trap from its raw multi-line text form.
    pub fn snmp_trap_from_raw(
        &self,
        raw_trap: &str,
        source_ip: &str,
        source_device: Option<&str>,
    ) -> NormalizedEvent {
        let trap = self.snmp_parser.parse(raw_trap);
        self.envelope_trap(trap, source_ip, source_device, Some(raw_trap.to_string()))
    }

    /// Normalize an SNMP trap from pre-decoded fields, as delivered by an
    /// external receiver.
    pub fn snmp_trap_from_fields(
        &self,
        source_device: &str,
        source_ip: &str,
        trap_oid: &str,
        varbinds: &HashMap<String, String>,
        raw_data: Option<String>,
    ) -> NormalizedEvent {
        let mut trap = SnmpTrap {
            trap_oid: Some(trap_oid.to_string()),
            trap_name: Some(trap_name(trap_oid)),
            varbinds: varbinds
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<BTreeMap<_, _>>(),
            ..SnmpTrap::default()
        };
        // Re-run the severity analysis over the synthesized record
        let analyzed = self
            .snmp_parser
            .parse(&render_trap_text(trap_oid, &trap.varbinds));
        trap.severity = analyzed.severity;
        trap.description = analyzed.description;

        self.envelope_trap(trap, source_ip, Some(source_device), raw_data)
    }

    fn envelope_trap(
        &self,
        trap: SnmpTrap,
        source_ip: &str,
        source_device: Option<&str>,
        raw_data: Option<String>,
    ) -> NormalizedEvent {
        let device = source_device.unwrap_or(source_ip).to_string();
        NormalizedEvent {
            event_type: EventType::SnmpTrap,
            timestamp: Utc::now(),
            source: EventSource {
                device,
                ip: source_ip.to_string(),
                kind: "network_device",
            },
            severity: trap.severity,
            category: "network",
            title: format!(
                "SNMP Trap: {}",
                trap.trap_name.as_deref().unwrap_or("unknown")
            ),
            description: trap.description.clone(),
            parsing_errors: trap.parsing_errors.clone(),
            details: EventDetails::SnmpTrap(trap),
            raw_data,
        }
    }

    /// Normalize a syslog message. `facility`/`severity` act as defaults
    /// when the message itself carries no `<N>` priority.
    pub fn syslog_from_fields(
        &self,
        source_device: &str,
        source_ip: &str,
        message: &str,
        facility: u8,
        severity: u8,
        raw_data: Option<String>,
    ) -> NormalizedEvent {
        let mut syslog = self.syslog_parser.parse(message);
        if !message.trim_start().starts_with('<') {
            syslog.facility = facility;
            syslog.severity = severity;
            syslog.facility_name = super::syslog::facility_name(facility).to_string();
            syslog.severity_name = severity_name(severity).to_string();
        }

        let device = if !source_device.is_empty() {
            source_device.to_string()
        } else {
            syslog
                .hostname
                .clone()
                .unwrap_or_else(|| source_ip.to_string())
        };

        NormalizedEvent {
            event_type: EventType::Syslog,
            timestamp: Utc::now(),
            source: EventSource {
                device,
                ip: source_ip.to_string(),
                kind: "system",
            },
            severity: syslog_alarm_severity(syslog.severity),
            category: "system",
            title: format!(
                "Syslog: {} message",
                syslog.program.as_deref().unwrap_or("system")
            ),
            description: syslog.message.clone(),
            parsing_errors: syslog.parsing_errors.clone(),
            details: EventDetails::Syslog(syslog),
            raw_data,
        }
    }
}

/// Map an RFC 3164 numeric severity onto the alarm severity scale.
fn syslog_alarm_severity(code: u8) -> AlarmSeverity {
    match code {
        0 | 1 | 2 => AlarmSeverity::Critical,
        3 => AlarmSeverity::Major,
        4 => AlarmSeverity::Warning,
        5 | 6 => AlarmSeverity::Info,
        _ => AlarmSeverity::Info,
    }
}

fn render_trap_text(trap_oid: &str, varbinds: &BTreeMap<String, String>) -> String {
    let mut text = format!("Trap OID: {}\n", trap_oid);
    for (oid, value) in varbinds {
        text.push_str(&format!("{} = {}\n", oid, value));
    }
    text
}

/// Aggregate view over a batch of events, used by alarm statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EventPatterns {
    pub common_sources: Vec<(String, usize)>,
    pub frequent_errors: Vec<(String, usize)>,
    pub severity_distribution: BTreeMap<String, usize>,
}

/// Count sources, error descriptions, and severities over a batch,
/// most frequent first.
pub fn extract_event_patterns(events: &[NormalizedEvent]) -> EventPatterns {
    let mut sources: HashMap<String, usize> = HashMap::new();
    let mut errors: HashMap<String, usize> = HashMap::new();
    let mut severities: BTreeMap<String, usize> = BTreeMap::new();

    for event in events {
        *sources.entry(event.source.device.clone()).or_default() += 1;
        *severities
            .entry(event.severity.as_str().to_string())
            .or_default() += 1;

        let description = event.description.to_ascii_lowercase();
        if ["error", "fail", "exception", "timeout"]
            .iter()
            .any(|term| description.contains(term))
        {
            let key: String = description.chars().take(50).collect();
            *errors.entry(key).or_default() += 1;
        }
    }

    let mut common_sources: Vec<_> = sources.into_iter().collect();
    common_sources.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let mut frequent_errors: Vec<_> = errors.into_iter().collect();
    frequent_errors.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    EventPatterns {
        common_sources,
        frequent_errors,
        severity_distribution: severities,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trap_from_fields_carries_name_and_severity() {
        let normalizer = EventNormalizer::new();
        let mut varbinds = HashMap::new();
        varbinds.insert("1.3.6.1.2.1.2.2.1.1.2".to_string(), "2".to_string());

        let event = normalizer.snmp_trap_from_fields(
            "sw-01",
            "10.0.0.1",
            "1.3.6.1.6.3.1.1.5.3",
            &varbinds,
            None,
        );

        assert_eq!(event.event_type, EventType::SnmpTrap);
        assert_eq!(event.source.device, "sw-01");
        assert_eq!(event.severity, AlarmSeverity::Major);
        assert_eq!(event.title, "SNMP Trap: linkDown");
        assert_eq!(event.field("trap_oid").as_deref(), Some("1.3.6.1.6.3.1.1.5.3"));
        assert_eq!(event.field("1.3.6.1.2.1.2.2.1.1.2").as_deref(), Some("2"));
    }

    #[test]
    fn syslog_field_lookup_reaches_structured_data() {
        let normalizer = EventNormalizer::new();
        let event = normalizer.syslog_from_fields(
            "fw-01",
            "10.0.0.2",
            "<11>auth: login denied user=eve",
            16,
            6,
            None,
        );

        assert_eq!(event.event_type, EventType::Syslog);
        // priority from the message wins over the passed-in defaults
        assert_eq!(event.severity, AlarmSeverity::Major);
        assert_eq!(event.field("user").as_deref(), Some("eve"));
        assert_eq!(event.field("device").as_deref(), Some("fw-01"));
    }

    #[test]
    fn syslog_defaults_used_without_priority_tag() {
        let normalizer = EventNormalizer::new();
        let event =
            normalizer.syslog_from_fields("host-a", "10.0.0.3", "plain message", 4, 3, None);
        assert_eq!(event.severity, AlarmSeverity::Major);
        assert_eq!(event.field("facility").as_deref(), Some("security"));
    }

    #[test]
    fn pattern_extraction_counts_sources_and_severities() {
        let normalizer = EventNormalizer::new();
        let events: Vec<_> = (0..3)
            .map(|_| {
                normalizer.syslog_from_fields("dev-a", "10.0.0.9", "<11>d: link error", 16, 6, None)
            })
            .chain(std::iter::once(normalizer.syslog_from_fields(
                "dev-b",
                "10.0.0.10",
                "<14>d: all good",
                16,
                6,
                None,
            )))
            .collect();

        let patterns = extract_event_patterns(&events);
        assert_eq!(patterns.common_sources[0], ("dev-a".to_string(), 3));
        assert_eq!(patterns.severity_distribution.get("major"), Some(&3));
        assert_eq!(patterns.frequent_errors.len(), 1);
    }
}

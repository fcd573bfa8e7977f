use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::AlarmSeverity;

/// Well-known SNMPv2 generic trap OIDs.
const STANDARD_TRAPS: &[(&str, &str)] = &[
    ("1.3.6.1.6.3.1.1.5.1", "coldStart"),
    ("1.3.6.1.6.3.1.1.5.2", "warmStart"),
    ("1.3.6.1.6.3.1.1.5.3", "linkDown"),
    ("1.3.6.1.6.3.1.1.5.4", "linkUp"),
    ("1.3.6.1.6.3.1.1.5.5", "authenticationFailure"),
    ("1.3.6.1.6.3.1.1.5.6", "egpNeighborLoss"),
];

/// Enterprise OID prefixes mapped to vendor names.
const ENTERPRISE_PREFIXES: &[(&str, &str)] = &[
    ("1.3.6.1.4.1.9", "cisco"),
    ("1.3.6.1.4.1.2636", "juniper"),
    ("1.3.6.1.4.1.1916", "extreme"),
    ("1.3.6.1.4.1.2544", "adva"),
    ("1.3.6.1.4.1.6527", "alcatel"),
    ("1.3.6.1.4.1.11", "hp"),
    ("1.3.6.1.4.1.171", "dlink"),
];

static TRAP_OID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Trap OID:\s*([0-9.]+)").unwrap());
static AGENT_ADDR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Agent Address:\s*(\S+)").unwrap());
static ENTERPRISE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Enterprise:\s*([0-9.]+)").unwrap());
static GENERIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Generic Trap:\s*(\d+)").unwrap());
static SPECIFIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Specific Trap:\s*(\d+)").unwrap());
static TIMESTAMP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Timestamp:\s*(.+)").unwrap());

/// A parsed SNMP trap. Ingest never fails: malformed input produces a
/// record with `parse_error=true` and the problems listed in
/// `parsing_errors`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnmpTrap {
    pub parse_error: bool,
    pub trap_oid: Option<String>,
    pub trap_name: Option<String>,
    pub enterprise_oid: Option<String>,
    pub enterprise_name: Option<String>,
    pub agent_addr: Option<String>,
    pub generic_trap: Option<i32>,
    pub specific_trap: Option<i32>,
    pub timestamp: Option<String>,
    pub varbinds: BTreeMap<String, String>,
    pub severity: AlarmSeverity,
    pub description: String,
    pub parsing_errors: Vec<String>,
}

impl Default for SnmpTrap {
    fn default() -> Self {
        Self {
            parse_error: false,
            trap_oid: None,
            trap_name: None,
            enterprise_oid: None,
            enterprise_name: None,
            agent_addr: None,
            generic_trap: None,
            specific_trap: None,
            timestamp: None,
            varbinds: BTreeMap::new(),
            severity: AlarmSeverity::Info,
            description: String::new(),
            parsing_errors: Vec::new(),
        }
    }
}

/// Parser for SNMP trap text blobs of the form emitted by trap receivers:
/// `Key: value` header lines followed by `OID = [type:] value` varbinds.
#[derive(Debug, Default)]
pub struct SnmpTrapParser;

impl SnmpTrapParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, raw_trap: &str) -> SnmpTrap {
        let mut trap = SnmpTrap::default();

        for line in raw_trap.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if line.contains("Trap OID:") {
                if let Some(caps) = TRAP_OID_RE.captures(line) {
                    let oid = caps[1].to_string();
                    trap.trap_name = Some(trap_name(&oid));
                    trap.trap_oid = Some(oid);
                }
            } else if line.contains("Agent Address:") {
                if let Some(caps) = AGENT_ADDR_RE.captures(line) {
                    trap.agent_addr = Some(caps[1].to_string());
                }
            } else if line.contains("Enterprise:") {
                if let Some(caps) = ENTERPRISE_RE.captures(line) {
                    let oid = caps[1].to_string();
                    trap.enterprise_name = Some(enterprise_name(&oid).to_string());
                    trap.enterprise_oid = Some(oid);
                }
            } else if line.contains("Generic Trap:") {
                if let Some(caps) = GENERIC_RE.captures(line) {
                    match caps[1].parse() {
                        Ok(n) => trap.generic_trap = Some(n),
                        Err(_) => trap
                            .parsing_errors
                            .push(format!("unparseable generic trap: {}", line)),
                    }
                }
            } else if line.contains("Specific Trap:") {
                if let Some(caps) = SPECIFIC_RE.captures(line) {
                    match caps[1].parse() {
                        Ok(n) => trap.specific_trap = Some(n),
                        Err(_) => trap
                            .parsing_errors
                            .push(format!("unparseable specific trap: {}", line)),
                    }
                }
            } else if line.contains("Timestamp:") {
                if let Some(caps) = TIMESTAMP_RE.captures(line) {
                    trap.timestamp = Some(caps[1].trim().to_string());
                }
            } else if line.contains('=') || line.contains(": ") {
                match parse_varbind(line) {
                    Some((oid, value)) => {
                        trap.varbinds.insert(oid, value);
                    }
                    None => trap
                        .parsing_errors
                        .push(format!("unrecognized varbind line: {}", line)),
                }
            }
        }

        if trap.trap_oid.is_none() && trap.varbinds.is_empty() {
            trap.parse_error = true;
            trap.parsing_errors
                .push("no trap OID or varbinds found in input".to_string());
        }

        let (severity, description) = analyze_severity(&trap);
        trap.severity = severity;
        trap.description = description;
        trap
    }
}

/// Human-readable trap name for an OID.
pub fn trap_name(trap_oid: &str) -> String {
    STANDARD_TRAPS
        .iter()
        .find(|(oid, _)| *oid == trap_oid)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| format!("trap_{}", trap_oid.replace('.', "_")))
}

/// Vendor name for an enterprise OID prefix.
pub fn enterprise_name(enterprise_oid: &str) -> &'static str {
    ENTERPRISE_PREFIXES
        .iter()
        .find(|(prefix, _)| enterprise_oid.starts_with(prefix))
        .map(|(_, name)| *name)
        .unwrap_or("unknown")
}

/// Split one varbind line: `OID = Type: Value`, `OID = Value`, or `OID: Value`.
fn parse_varbind(line: &str) -> Option<(String, String)> {
    if let Some((oid, value_part)) = line.split_once(" = ") {
        let value = match value_part.split_once(": ") {
            Some((_type, value)) => value.trim(),
            None => value_part.trim(),
        };
        return Some((oid.trim().to_string(), value.to_string()));
    }
    if let Some((oid, value)) = line.split_once(": ") {
        return Some((oid.trim().to_string(), value.trim().to_string()));
    }
    None
}

/// Severity and description from the trap OID plus varbind content.
/// Varbind hints only ever escalate, never downgrade.
fn analyze_severity(trap: &SnmpTrap) -> (AlarmSeverity, String) {
    let mut severity = AlarmSeverity::Info;
    let mut description = String::new();

    match trap.trap_oid.as_deref() {
        Some("1.3.6.1.6.3.1.1.5.3") => {
            severity = AlarmSeverity::Major;
            description = "Network interface went down".to_string();
        }
        Some("1.3.6.1.6.3.1.1.5.4") => {
            severity = AlarmSeverity::Info;
            description = "Network interface came up".to_string();
        }
        Some("1.3.6.1.6.3.1.1.5.1") | Some("1.3.6.1.6.3.1.1.5.2") => {
            severity = AlarmSeverity::Warning;
            description = "Device restarted".to_string();
        }
        Some("1.3.6.1.6.3.1.1.5.5") => {
            severity = AlarmSeverity::Warning;
            description = "SNMP authentication failure".to_string();
        }
        _ => {}
    }

    for value in trap.varbinds.values() {
        let value = value.to_ascii_lowercase();
        if value.contains("critical") {
            severity = severity.escalate(AlarmSeverity::Critical);
        } else if value.contains("fail") {
            severity = severity.escalate(AlarmSeverity::Major);
        } else if value.contains("error") {
            severity = severity.escalate(AlarmSeverity::Warning);
        }
    }

    if description.is_empty() {
        let enterprise = trap.enterprise_name.as_deref().unwrap_or("unknown");
        let name = trap.trap_name.as_deref().unwrap_or("unknown");
        description = format!("{} {} trap", enterprise, name);
    }

    (severity, description)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINK_DOWN_TRAP: &str = "\
Trap OID: 1.3.6.1.6.3.1.1.5.3
Agent Address: 10.0.0.1
Enterprise: 1.3.6.1.4.1.9.1.516
Generic Trap: 2
Specific Trap: 0
Timestamp: 12345600
1.3.6.1.2.1.2.2.1.1.2 = INTEGER: 2
1.3.6.1.2.1.2.2.1.7.2 = INTEGER: 1";

    #[test]
    fn parses_link_down_trap() {
        let trap = SnmpTrapParser::new().parse(LINK_DOWN_TRAP);

        assert!(!trap.parse_error);
        assert_eq!(trap.trap_oid.as_deref(), Some("1.3.6.1.6.3.1.1.5.3"));
        assert_eq!(trap.trap_name.as_deref(), Some("linkDown"));
        assert_eq!(trap.enterprise_name.as_deref(), Some("cisco"));
        assert_eq!(trap.agent_addr.as_deref(), Some("10.0.0.1"));
        assert_eq!(trap.generic_trap, Some(2));
        assert_eq!(trap.specific_trap, Some(0));
        assert_eq!(trap.severity, AlarmSeverity::Major);
        assert_eq!(trap.description, "Network interface went down");
        assert_eq!(
            trap.varbinds.get("1.3.6.1.2.1.2.2.1.1.2").map(String::as_str),
            Some("2")
        );
    }

    #[test]
    fn varbind_content_escalates_severity() {
        let raw = "\
Trap OID: 1.3.6.1.6.3.1.1.5.1
1.3.6.1.4.1.9.9.1.1 = STRING: power supply critical";
        let trap = SnmpTrapParser::new().parse(raw);
        assert_eq!(trap.severity, AlarmSeverity::Critical);
    }

    #[test]
    fn escalation_never_downgrades() {
        let raw = "\
Trap OID: 1.3.6.1.6.3.1.1.5.3
1.3.6.1.4.1.9.9.1.1 = STRING: minor error";
        let trap = SnmpTrapParser::new().parse(raw);
        // linkDown is major; an "error" hint (warning) must not lower it
        assert_eq!(trap.severity, AlarmSeverity::Major);
    }

    #[test]
    fn unknown_oid_gets_synthetic_name_and_default_description() {
        let trap = SnmpTrapParser::new().parse("Trap OID: 1.3.6.1.4.1.9.9.41.2.0.1");
        assert_eq!(
            trap.trap_name.as_deref(),
            Some("trap_1_3_6_1_4_1_9_9_41_2_0_1")
        );
        assert_eq!(trap.description, "unknown trap_1_3_6_1_4_1_9_9_41_2_0_1 trap");
    }

    #[test]
    fn garbage_input_yields_parse_error_record() {
        let trap = SnmpTrapParser::new().parse("not a trap at all");
        assert!(trap.parse_error);
        assert!(!trap.parsing_errors.is_empty());
        assert_eq!(trap.severity, AlarmSeverity::Info);
    }

    #[test]
    fn enterprise_prefix_lookup() {
        assert_eq!(enterprise_name("1.3.6.1.4.1.2636.3.1"), "juniper");
        assert_eq!(enterprise_name("1.3.6.1.4.1.99999"), "unknown");
    }
}

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::IpAddr;

/// RFC 3164 facility codes.
const FACILITIES: &[(u8, &str)] = &[
    (0, "kernel"),
    (1, "user"),
    (2, "mail"),
    (3, "daemon"),
    (4, "security"),
    (5, "syslogd"),
    (6, "lpr"),
    (7, "news"),
    (8, "uucp"),
    (9, "cron"),
    (10, "authpriv"),
    (11, "ftp"),
    (16, "local0"),
    (17, "local1"),
    (18, "local2"),
    (19, "local3"),
    (20, "local4"),
    (21, "local5"),
    (22, "local6"),
    (23, "local7"),
];

/// RFC 3164 severity codes.
const SEVERITIES: &[(u8, &str)] = &[
    (0, "emergency"),
    (1, "alert"),
    (2, "critical"),
    (3, "error"),
    (4, "warning"),
    (5, "notice"),
    (6, "info"),
    (7, "debug"),
];

const SECURITY_KEYWORDS: &[&str] = &[
    "failed",
    "failure",
    "error",
    "denied",
    "unauthorized",
    "attack",
    "intrusion",
    "malware",
    "virus",
    "breach",
    "compromise",
    "exploit",
];

static PRIORITY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<(\d+)>").unwrap());
// Timestamp patterns tried in order: RFC 3164, RFC 3339, MM/DD/YYYY.
static TIMESTAMP_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"^(\w{3}\s+\d{1,2}\s+\d{2}:\d{2}:\d{2})").unwrap(),
        Regex::new(r"^(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d{3})?(?:Z|[+-]\d{2}:\d{2})?)")
            .unwrap(),
        Regex::new(r"^(\d{2}/\d{2}/\d{4}\s+\d{2}:\d{2}:\d{2})").unwrap(),
    ]
});
static HOSTNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\S+)\s+").unwrap());
static PROGRAM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\w+)(?:\[(\d+)\])?:\s*").unwrap());
static VALID_HOSTNAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9]([a-zA-Z0-9\-]{0,61}[a-zA-Z0-9])?(\.[a-zA-Z0-9]([a-zA-Z0-9\-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .unwrap()
});
static KV_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(\w+)=(["']?)([^"'\s]+)\2"#).unwrap());
static IPV4_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b").unwrap());
static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"https?://[^\s]+|www\.[^\s]+|[a-zA-Z0-9][a-zA-Z0-9-]{0,61}[a-zA-Z0-9]?\.(?:com|org|net|edu|gov|mil|int|arpa)\b",
    )
    .unwrap()
});

/// A parsed syslog message. Ingest never fails: whatever cannot be decoded
/// is left at its default and noted in `parsing_errors`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyslogEvent {
    pub facility: u8,
    pub severity: u8,
    pub facility_name: String,
    pub severity_name: String,
    pub timestamp: Option<String>,
    pub hostname: Option<String>,
    pub program: Option<String>,
    pub pid: Option<u32>,
    pub message: String,
    pub structured_data: BTreeMap<String, String>,
    pub keywords: Vec<String>,
    pub severity_indicators: Vec<String>,
    pub ip_addresses: Vec<String>,
    pub urls: Vec<String>,
    pub potential_security_event: bool,
    pub parsing_errors: Vec<String>,
}

impl Default for SyslogEvent {
    fn default() -> Self {
        Self {
            facility: 16,
            severity: 6,
            facility_name: "local0".to_string(),
            severity_name: "info".to_string(),
            timestamp: None,
            hostname: None,
            program: None,
            pid: None,
            message: String::new(),
            structured_data: BTreeMap::new(),
            keywords: Vec::new(),
            severity_indicators: Vec::new(),
            ip_addresses: Vec::new(),
            urls: Vec::new(),
            potential_security_event: false,
            parsing_errors: Vec::new(),
        }
    }
}

/// Parser for RFC 3164-style syslog lines with tolerant fallbacks for the
/// RFC 3339 and `MM/DD/YYYY` timestamp variants seen from network gear.
#[derive(Debug, Default)]
pub struct SyslogParser;

impl SyslogParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, raw_message: &str) -> SyslogEvent {
        let mut event = SyslogEvent::default();
        let mut rest = raw_message.trim();

        // Priority: <N> where facility = N >> 3, severity = N & 7
        if let Some(caps) = PRIORITY_RE.captures(rest) {
            match caps[1].parse::<u16>() {
                Ok(priority) => {
                    event.facility = (priority >> 3) as u8;
                    event.severity = (priority & 7) as u8;
                    event.facility_name = facility_name(event.facility).to_string();
                    event.severity_name = severity_name(event.severity).to_string();
                }
                Err(_) => event
                    .parsing_errors
                    .push(format!("unparseable priority: {}", &caps[0])),
            }
            rest = rest[caps.get(0).unwrap().end()..].trim_start();
        }

        for pattern in TIMESTAMP_RES.iter() {
            if let Some(caps) = pattern.captures(rest) {
                event.timestamp = Some(caps[1].to_string());
                rest = rest[caps.get(0).unwrap().end()..].trim_start();
                break;
            }
        }

        if let Some(caps) = HOSTNAME_RE.captures(rest) {
            let candidate = &caps[1];
            if is_valid_hostname_or_ip(candidate) {
                event.hostname = Some(candidate.to_string());
                rest = rest[caps.get(0).unwrap().end()..].trim_start();
            }
        }

        if let Some(caps) = PROGRAM_RE.captures(rest) {
            event.program = Some(caps[1].to_string());
            if let Some(pid) = caps.get(2) {
                event.pid = pid.as_str().parse().ok();
            }
            rest = rest[caps.get(0).unwrap().end()..].trim_start();
        }

        event.message = rest.to_string();

        for caps in KV_RE.captures_iter(rest) {
            event
                .structured_data
                .insert(caps[1].to_string(), caps[3].to_string());
        }

        analyze_content(&mut event);
        event
    }
}

pub fn facility_name(code: u8) -> &'static str {
    FACILITIES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
        .unwrap_or("unknown")
}

pub fn severity_name(code: u8) -> &'static str {
    SEVERITIES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
        .unwrap_or("unknown")
}

fn is_valid_hostname_or_ip(text: &str) -> bool {
    if text.parse::<IpAddr>().is_ok() {
        return true;
    }
    text.len() <= 253 && VALID_HOSTNAME_RE.is_match(text)
}

/// Scan the message body for security keywords, severity hints, embedded
/// IPv4 addresses, and URLs.
fn analyze_content(event: &mut SyslogEvent) {
    let lower = event.message.to_ascii_lowercase();

    for keyword in SECURITY_KEYWORDS {
        if lower.contains(keyword) {
            event.keywords.push(keyword.to_string());
            event.potential_security_event = true;
        }
    }

    let indicator_sets: &[(&str, &[&str])] = &[
        ("critical", &["critical", "fatal", "emergency"]),
        ("error", &["error", "err", "failed", "failure"]),
        ("warning", &["warning", "warn", "deprecated"]),
        ("info", &["info", "information", "notice"]),
    ];
    for (level, indicators) in indicator_sets {
        if indicators.iter().any(|i| lower.contains(i)) {
            event.severity_indicators.push(level.to_string());
        }
    }

    event.ip_addresses = IPV4_RE
        .find_iter(&event.message)
        .map(|m| m.as_str().to_string())
        .collect();
    event.urls = URL_RE
        .find_iter(&event.message)
        .map(|m| m.as_str().to_string())
        .collect();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_rfc3164_line() {
        let event = SyslogParser::new()
            .parse("<34>Oct 11 22:14:15 edge-rtr-01 sshd[4721]: Failed password for root from 203.0.113.9 port 22");

        assert_eq!(event.facility, 4);
        assert_eq!(event.severity, 2);
        assert_eq!(event.facility_name, "security");
        assert_eq!(event.severity_name, "critical");
        assert_eq!(event.timestamp.as_deref(), Some("Oct 11 22:14:15"));
        assert_eq!(event.hostname.as_deref(), Some("edge-rtr-01"));
        assert_eq!(event.program.as_deref(), Some("sshd"));
        assert_eq!(event.pid, Some(4721));
        assert!(event.message.starts_with("Failed password"));
        assert!(event.potential_security_event);
        assert!(event.keywords.contains(&"failed".to_string()));
        assert_eq!(event.ip_addresses, vec!["203.0.113.9".to_string()]);
    }

    #[test]
    fn defaults_apply_without_priority() {
        let event = SyslogParser::new().parse("just a bare message");
        assert_eq!(event.facility, 16);
        assert_eq!(event.severity, 6);
        assert_eq!(event.facility_name, "local0");
        assert_eq!(event.severity_name, "info");
        assert!(event.timestamp.is_none());
    }

    #[test]
    fn rfc3339_timestamp_variant() {
        let event =
            SyslogParser::new().parse("<13>2026-07-01T10:30:00Z core-sw-2 chassisd: fan tray removed");
        assert_eq!(event.timestamp.as_deref(), Some("2026-07-01T10:30:00Z"));
        assert_eq!(event.hostname.as_deref(), Some("core-sw-2"));
        assert_eq!(event.program.as_deref(), Some("chassisd"));
    }

    #[test]
    fn structured_data_key_values() {
        let event = SyslogParser::new().parse("<14>audit: user=admin action=login result=ok");
        assert_eq!(event.structured_data.get("user").map(String::as_str), Some("admin"));
        assert_eq!(event.structured_data.get("result").map(String::as_str), Some("ok"));
    }

    #[test]
    fn hostname_rejected_when_invalid() {
        let event = SyslogParser::new().parse("<14>Oct 11 22:14:15 %%bogus%% kernel: oops");
        assert!(event.hostname.is_none());
        // the bogus token stays part of the message
        assert!(event.message.contains("%%bogus%%"));
    }

    #[test]
    fn priority_decode_examples() {
        // <190> = facility 23 (local7), severity 6 (info)
        let event = SyslogParser::new().parse("<190>device: hello");
        assert_eq!(event.facility, 23);
        assert_eq!(event.severity, 6);
        assert_eq!(event.facility_name, "local7");
    }
}

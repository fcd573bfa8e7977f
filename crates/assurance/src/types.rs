use serde::{Deserialize, Serialize};

/// Active measurement kind. The meaning of `Probe::target` depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeType {
    Icmp,
    Dns,
    Http,
    Https,
    Tcp,
    Udp,
    Snmp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    Enabled,
    Disabled,
    Suspended,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlarmSeverity {
    Critical,
    Major,
    Minor,
    Warning,
    Info,
    Clear,
}

impl AlarmSeverity {
    /// Escalation rank; higher means more severe. Used for monotone
    /// severity escalation during trap analysis.
    pub fn rank(self) -> u8 {
        match self {
            AlarmSeverity::Clear => 0,
            AlarmSeverity::Info => 1,
            AlarmSeverity::Warning => 2,
            AlarmSeverity::Minor => 3,
            AlarmSeverity::Major => 4,
            AlarmSeverity::Critical => 5,
        }
    }

    /// The more severe of the two.
    pub fn escalate(self, other: AlarmSeverity) -> AlarmSeverity {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }

    pub fn parse(s: &str) -> Option<AlarmSeverity> {
        match s.to_ascii_lowercase().as_str() {
            "critical" => Some(AlarmSeverity::Critical),
            "major" => Some(AlarmSeverity::Major),
            "minor" => Some(AlarmSeverity::Minor),
            "warning" => Some(AlarmSeverity::Warning),
            "info" => Some(AlarmSeverity::Info),
            "clear" => Some(AlarmSeverity::Clear),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AlarmSeverity::Critical => "critical",
            AlarmSeverity::Major => "major",
            AlarmSeverity::Minor => "minor",
            AlarmSeverity::Warning => "warning",
            AlarmSeverity::Info => "info",
            AlarmSeverity::Clear => "clear",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlarmStatus {
    Active,
    Acknowledged,
    Cleared,
    Suppressed,
}

impl AlarmStatus {
    pub fn is_cleared(self) -> bool {
        matches!(self, AlarmStatus::Cleared)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlarmType {
    Equipment,
    System,
    Service,
    Performance,
    Security,
    Environment,
}

impl AlarmType {
    pub fn as_str(self) -> &'static str {
        match self {
            AlarmType::Equipment => "equipment",
            AlarmType::System => "system",
            AlarmType::Service => "service",
            AlarmType::Performance => "performance",
            AlarmType::Security => "security",
            AlarmType::Environment => "environment",
        }
    }
}

/// Source category of a normalized event, matched by alarm rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    SnmpTrap,
    Syslog,
    Probe,
    Threshold,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowType {
    Netflow,
    Sflow,
    Ipfix,
    Jflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectorStatus {
    Active,
    Inactive,
    Error,
    Maintenance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaComplianceStatus {
    Compliant,
    Violation,
    InsufficientData,
    NoPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressionStatus {
    Active,
    Expired,
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_escalation_is_monotone() {
        assert_eq!(
            AlarmSeverity::Warning.escalate(AlarmSeverity::Major),
            AlarmSeverity::Major
        );
        assert_eq!(
            AlarmSeverity::Critical.escalate(AlarmSeverity::Info),
            AlarmSeverity::Critical
        );
        assert_eq!(
            AlarmSeverity::Info.escalate(AlarmSeverity::Info),
            AlarmSeverity::Info
        );
    }

    #[test]
    fn severity_parses_case_insensitively() {
        assert_eq!(AlarmSeverity::parse("MAJOR"), Some(AlarmSeverity::Major));
        assert_eq!(AlarmSeverity::parse("unknown"), None);
    }
}

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, LogNormal};
use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::net::{lookup_host, TcpStream};
use tokio::time::timeout;
use tracing::debug;
use trust_dns_resolver::config::{NameServerConfig, Protocol, ResolverConfig, ResolverOpts};
use trust_dns_resolver::proto::rr::RecordType;
use trust_dns_resolver::TokioAsyncResolver;

use crate::error::{AssuranceError, Result};
use crate::probe::model::{Probe, ProbeParameters};
use crate::types::ProbeType;

/// Outcome of one probe execution, before persistence.
///
/// Probe failures (timeouts, refused connections, wrong status codes) are
/// outcomes, never errors; the executor only returns `Err` for internal
/// faults that should quarantine the probe.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub success: bool,
    pub response_time_ms: Option<f64>,
    pub status_code: Option<u16>,
    pub error_message: Option<String>,
    pub metrics: BTreeMap<String, f64>,
}

impl ProbeOutcome {
    pub fn succeeded(response_time_ms: f64) -> Self {
        Self {
            success: true,
            response_time_ms: Some(response_time_ms),
            status_code: None,
            error_message: None,
            metrics: BTreeMap::new(),
        }
    }

    pub fn failed(error_message: impl Into<String>) -> Self {
        Self {
            success: false,
            response_time_ms: None,
            status_code: None,
            error_message: Some(error_message.into()),
            metrics: BTreeMap::new(),
        }
    }

    pub fn timed_out() -> Self {
        Self::failed("timeout")
    }

    pub fn with_metric(mut self, key: &str, value: f64) -> Self {
        self.metrics.insert(key.to_string(), value);
        self
    }

    pub fn with_status_code(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }
}

/// Executes a single probe against its target within its timeout.
#[async_trait]
pub trait ProbeExecutor: Send + Sync {
    async fn execute(&self, probe: &Probe) -> Result<ProbeOutcome>;
}

/// Executor performing real network I/O.
///
/// Every probe returns within `timeout_seconds`: in-flight I/O past the
/// deadline is abandoned and reported as a timeout outcome.
pub struct NetworkProbeExecutor {
    http_client: reqwest::Client,
}

impl NetworkProbeExecutor {
    pub fn new() -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent("assurance-probe/0.1")
            .build()
            .map_err(|e| AssuranceError::internal(format!("http client init failed: {}", e)))?;
        Ok(Self { http_client })
    }

    async fn run(&self, probe: &Probe) -> ProbeOutcome {
        match probe.probe_type {
            ProbeType::Icmp => self.run_icmp(probe).await,
            ProbeType::Dns => self.run_dns(probe).await,
            ProbeType::Http | ProbeType::Https => self.run_http(probe).await,
            ProbeType::Tcp => self.run_tcp(probe).await,
            ProbeType::Udp | ProbeType::Snmp => ProbeOutcome::failed(format!(
                "{:?} probes are not supported by the network executor",
                probe.probe_type
            )),
        }
    }

    async fn run_icmp(&self, probe: &Probe) -> ProbeOutcome {
        let addr = match resolve_host(&probe.target).await {
            Ok(addr) => addr,
            Err(message) => return ProbeOutcome::failed(message),
        };

        let started = Instant::now();
        match surge_ping::ping(addr, &[0u8; 56]).await {
            Ok((_packet, rtt)) => {
                let rtt_ms = rtt.as_secs_f64() * 1000.0;
                ProbeOutcome::succeeded(rtt_ms).with_metric("round_trip_ms", rtt_ms)
            }
            Err(e) => {
                debug!(target = %probe.target, elapsed_ms = started.elapsed().as_millis() as u64,
                       "icmp echo failed: {}", e);
                ProbeOutcome::failed(format!("icmp: {}", e))
            }
        }
    }

    async fn run_dns(&self, probe: &Probe) -> ProbeOutcome {
        let (dns_server, record_type) = match &probe.parameters {
            ProbeParameters::Dns {
                dns_server,
                record_type,
            } => (dns_server.clone(), record_type.clone()),
            _ => ("8.8.8.8".to_string(), "A".to_string()),
        };

        let server_ip: IpAddr = match dns_server.parse() {
            Ok(ip) => ip,
            Err(_) => return ProbeOutcome::failed(format!("invalid dns server: {}", dns_server)),
        };
        let record_type = match RecordType::from_str(&record_type.to_ascii_uppercase()) {
            Ok(rt) => rt,
            Err(_) => return ProbeOutcome::failed(format!("invalid record type: {}", record_type)),
        };

        let mut config = ResolverConfig::new();
        config.add_name_server(NameServerConfig::new(
            SocketAddr::new(server_ip, 53),
            Protocol::Udp,
        ));
        let resolver = TokioAsyncResolver::tokio(config, ResolverOpts::default());

        let started = Instant::now();
        match resolver.lookup(probe.target.clone(), record_type).await {
            Ok(lookup) => {
                let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
                if lookup.records().is_empty() {
                    ProbeOutcome::failed("dns: empty answer")
                } else {
                    ProbeOutcome::succeeded(elapsed_ms)
                        .with_metric("resolution_time_ms", elapsed_ms)
                        .with_metric("answer_count", lookup.records().len() as f64)
                }
            }
            Err(e) => ProbeOutcome::failed(format!("dns: {}", e)),
        }
    }

    async fn run_http(&self, probe: &Probe) -> ProbeOutcome {
        let (method, expected_status, accept_statuses, headers) = match &probe.parameters {
            ProbeParameters::Http {
                method,
                expected_status,
                accept_statuses,
                headers,
            } => (
                method.clone(),
                *expected_status,
                accept_statuses.clone(),
                headers.clone(),
            ),
            _ => ("GET".to_string(), 200, Vec::new(), BTreeMap::new()),
        };

        let method = match reqwest::Method::from_bytes(method.to_ascii_uppercase().as_bytes()) {
            Ok(m) => m,
            Err(_) => return ProbeOutcome::failed(format!("invalid http method: {}", method)),
        };

        let mut request = self.http_client.request(method, &probe.target);
        for (name, value) in &headers {
            request = request.header(name, value);
        }

        let started = Instant::now();
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return ProbeOutcome::failed(format!("http: {}", e)),
        };
        let ttfb_ms = started.elapsed().as_secs_f64() * 1000.0;

        let status = response.status().as_u16();
        // Drain the body so total time covers the full transfer
        let _ = response.bytes().await;
        let total_ms = started.elapsed().as_secs_f64() * 1000.0;

        let accepted = status == expected_status || accept_statuses.contains(&status);
        let outcome = if accepted {
            ProbeOutcome::succeeded(total_ms)
        } else {
            ProbeOutcome::failed(format!(
                "http: status {} (expected {})",
                status, expected_status
            ))
        };
        outcome
            .with_status_code(status)
            .with_metric("time_to_first_byte_ms", ttfb_ms)
            .with_metric("total_time_ms", total_ms)
    }

    async fn run_tcp(&self, probe: &Probe) -> ProbeOutcome {
        let target = match &probe.parameters {
            ProbeParameters::Tcp { port } if !probe.target.contains(':') => {
                format!("{}:{}", probe.target, port)
            }
            _ => probe.target.clone(),
        };

        let started = Instant::now();
        match TcpStream::connect(&target).await {
            Ok(_stream) => {
                let connect_ms = started.elapsed().as_secs_f64() * 1000.0;
                ProbeOutcome::succeeded(connect_ms).with_metric("connect_time_ms", connect_ms)
            }
            Err(e) => ProbeOutcome::failed(format!("tcp: {}", e)),
        }
    }
}

#[async_trait]
impl ProbeExecutor for NetworkProbeExecutor {
    async fn execute(&self, probe: &Probe) -> Result<ProbeOutcome> {
        let deadline = Duration::from_secs(u64::from(probe.timeout_seconds));
        match timeout(deadline, self.run(probe)).await {
            Ok(outcome) => Ok(outcome),
            Err(_) => Ok(ProbeOutcome::timed_out()),
        }
    }
}

async fn resolve_host(target: &str) -> std::result::Result<IpAddr, String> {
    if let Ok(ip) = target.parse::<IpAddr>() {
        return Ok(ip);
    }
    match lookup_host((target, 0u16)).await {
        Ok(mut addrs) => addrs
            .next()
            .map(|a| a.ip())
            .ok_or_else(|| format!("no address for {}", target)),
        Err(e) => Err(format!("resolve {}: {}", target, e)),
    }
}

/// Deterministic executor for tests and demo deployments: success is a
/// Bernoulli draw, latency a log-normal sample around the configured
/// median. No network I/O, returns immediately.
pub struct SimulatedProbeExecutor {
    success_rate: f64,
    latency: LogNormal<f64>,
    rng: Mutex<StdRng>,
}

impl SimulatedProbeExecutor {
    pub fn new(success_rate: f64, latency_median_ms: f64, latency_sigma: f64) -> Self {
        Self::with_seed(success_rate, latency_median_ms, latency_sigma, 0x5eed)
    }

    pub fn with_seed(
        success_rate: f64,
        latency_median_ms: f64,
        latency_sigma: f64,
        seed: u64,
    ) -> Self {
        let mu = latency_median_ms.max(f64::MIN_POSITIVE).ln();
        let latency = LogNormal::new(mu, latency_sigma.max(0.0))
            .unwrap_or_else(|_| LogNormal::new(mu, 0.0).expect("zero sigma is valid"));
        Self {
            success_rate: success_rate.clamp(0.0, 1.0),
            latency,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

#[async_trait]
impl ProbeExecutor for SimulatedProbeExecutor {
    async fn execute(&self, probe: &Probe) -> Result<ProbeOutcome> {
        let (success, latency_ms) = {
            let mut rng = self
                .rng
                .lock()
                .map_err(|_| AssuranceError::internal("simulator rng poisoned"))?;
            let success = rng.gen_bool(self.success_rate);
            let latency_ms = self.latency.sample(&mut *rng);
            (success, latency_ms)
        };

        // A sample past the deadline reports as a timeout, like real I/O would
        let deadline_ms = f64::from(probe.timeout_seconds) * 1000.0;
        if latency_ms > deadline_ms {
            return Ok(ProbeOutcome::timed_out());
        }

        let outcome = if success {
            let outcome = ProbeOutcome::succeeded(latency_ms);
            match probe.probe_type {
                ProbeType::Http | ProbeType::Https => outcome.with_status_code(200),
                _ => outcome,
            }
        } else {
            ProbeOutcome::failed("simulated failure")
        };
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::model::CreateProbeRequest;
    use assurance_core::TenantId;
    use chrono::Utc;
    use uuid::Uuid;

    fn probe(probe_type: ProbeType, timeout_seconds: u32) -> Probe {
        let request = CreateProbeRequest::new("p", probe_type, "192.0.2.1");
        Probe {
            probe_id: Uuid::new_v4(),
            tenant_id: TenantId::new("t1"),
            name: request.name,
            description: None,
            probe_type,
            target: request.target,
            interval_seconds: 30,
            timeout_seconds,
            parameters: ProbeParameters::None,
            sla_policy_id: None,
            status: crate::types::ProbeStatus::Enabled,
            last_run: None,
            last_success: None,
            consecutive_failures: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn simulator_always_succeeds_at_rate_one() {
        let executor = SimulatedProbeExecutor::new(1.0, 10.0, 0.1);
        for _ in 0..50 {
            let outcome = executor.execute(&probe(ProbeType::Icmp, 2)).await.unwrap();
            assert!(outcome.success);
            assert!(outcome.response_time_ms.unwrap() > 0.0);
        }
    }

    #[tokio::test]
    async fn simulator_always_fails_at_rate_zero() {
        let executor = SimulatedProbeExecutor::new(0.0, 10.0, 0.1);
        let outcome = executor.execute(&probe(ProbeType::Icmp, 2)).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.error_message.as_deref(), Some("simulated failure"));
    }

    #[tokio::test]
    async fn simulator_latency_centers_on_median() {
        let executor = SimulatedProbeExecutor::new(1.0, 10.0, 0.25);
        let mut total = 0.0;
        let runs = 200;
        for _ in 0..runs {
            let outcome = executor.execute(&probe(ProbeType::Http, 5)).await.unwrap();
            total += outcome.response_time_ms.unwrap();
        }
        let average = total / runs as f64;
        assert!((average - 10.0).abs() < 3.0, "average {} off median", average);
    }

    #[tokio::test]
    async fn simulator_is_deterministic_for_a_seed() {
        let a = SimulatedProbeExecutor::with_seed(0.8, 10.0, 0.25, 42);
        let b = SimulatedProbeExecutor::with_seed(0.8, 10.0, 0.25, 42);
        for _ in 0..20 {
            let oa = a.execute(&probe(ProbeType::Tcp, 2)).await.unwrap();
            let ob = b.execute(&probe(ProbeType::Tcp, 2)).await.unwrap();
            assert_eq!(oa.success, ob.success);
            assert_eq!(oa.response_time_ms, ob.response_time_ms);
        }
    }

    #[tokio::test]
    async fn unsupported_types_fail_without_error() {
        let executor = NetworkProbeExecutor::new().unwrap();
        let outcome = executor.execute(&probe(ProbeType::Snmp, 2)).await.unwrap();
        assert!(!outcome.success);
        assert!(outcome.error_message.unwrap().contains("not supported"));
    }
}

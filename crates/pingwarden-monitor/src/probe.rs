//! Liveness probe logic.
//!
//! A probe sends exactly one ICMP echo request to the target and reports
//! whether a reply arrived within the timeout. Network trouble is encoded
//! in the returned [`ProbeOutcome`]; only building the prober can fail.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use surge_ping::{Client, Config, ICMP, PingIdentifier, PingSequence, Pinger};
use tracing::debug;

use crate::error::ProbeError;

/// Echo payload carried by every request.
const PAYLOAD: [u8; 56] = [0; 56];

/// Result of a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// A reply was received within the timeout.
    pub success: bool,
    /// Echo requests sent by this probe.
    pub packets_sent: u32,
    /// Echo replies received by this probe.
    pub packets_received: u32,
    /// Round-trip time of the reply, if any.
    pub rtt: Option<Duration>,
    /// Why the probe failed.
    pub error: Option<String>,
}

impl ProbeOutcome {
    /// One request sent, one reply received.
    pub fn reply(rtt: Duration) -> Self {
        Self {
            success: true,
            packets_sent: 1,
            packets_received: 1,
            rtt: Some(rtt),
            error: None,
        }
    }

    /// One request sent, no reply.
    pub fn lost(error: impl Into<String>) -> Self {
        Self {
            success: false,
            packets_sent: 1,
            packets_received: 0,
            rtt: None,
            error: Some(error.into()),
        }
    }
}

/// A single liveness check against a fixed target.
#[async_trait]
pub trait Prober: Send {
    /// Human-readable target, for logs.
    fn target(&self) -> &str;

    /// Run one check bounded by `timeout`. Never fails outright.
    async fn probe(&mut self, timeout: Duration) -> ProbeOutcome;
}

/// ICMP echo prober.
pub struct IcmpProber {
    host: String,
    pinger: Pinger,
    sequence: u16,
}

impl IcmpProber {
    /// Resolve `host` and open an ICMP socket for it.
    ///
    /// With `unprivileged` set, a datagram ICMP socket is requested instead
    /// of a raw one (Linux `net.ipv4.ping_group_range`).
    pub async fn new(host: &str, unprivileged: bool) -> Result<Self, ProbeError> {
        let addr = resolve(host).await?;
        let kind = match addr {
            IpAddr::V4(_) => ICMP::V4,
            IpAddr::V6(_) => ICMP::V6,
        };
        let sock_type = if unprivileged {
            socket2::Type::DGRAM
        } else {
            socket2::Type::RAW
        };
        let config = Config::builder().kind(kind).sock_type_hint(sock_type).build();
        let client = Client::new(&config)?;
        let identifier = PingIdentifier(std::process::id() as u16);
        let pinger = client.pinger(addr, identifier).await;

        debug!(%host, %addr, unprivileged, "icmp prober ready");

        Ok(Self {
            host: host.to_string(),
            pinger,
            sequence: 0,
        })
    }
}

#[async_trait]
impl Prober for IcmpProber {
    fn target(&self) -> &str {
        &self.host
    }

    async fn probe(&mut self, timeout: Duration) -> ProbeOutcome {
        let sequence = PingSequence(self.sequence);
        self.sequence = self.sequence.wrapping_add(1);

        self.pinger.timeout(timeout);
        match self.pinger.ping(sequence, &PAYLOAD).await {
            Ok((_packet, rtt)) => ProbeOutcome::reply(rtt),
            Err(e) => {
                debug!(host = %self.host, error = %e, "echo request failed");
                ProbeOutcome::lost(e.to_string())
            }
        }
    }
}

/// Resolve a host name or IP literal to a single address.
pub async fn resolve(host: &str) -> Result<IpAddr, ProbeError> {
    if let Ok(addr) = host.parse::<IpAddr>() {
        return Ok(addr);
    }

    let mut addrs = tokio::net::lookup_host((host, 0))
        .await
        .map_err(|e| ProbeError::Resolve {
            host: host.to_string(),
            reason: e.to_string(),
        })?;

    addrs
        .next()
        .map(|sa| sa.ip())
        .ok_or_else(|| ProbeError::Resolve {
            host: host.to_string(),
            reason: "no addresses returned".to_string(),
        })
}

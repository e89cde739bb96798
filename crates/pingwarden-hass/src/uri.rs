//! Broker URI parsing.
//!
//! Accepts `tcp://` and `mqtt://` URIs. Credentials come from the userinfo
//! part. A path is treated as a RabbitMQ virtual host and folded into the
//! username as `vhost:user`, which is how the RabbitMQ MQTT plugin selects
//! a vhost.

use percent_encoding::percent_decode_str;
use url::Url;

use crate::error::{HassError, HassResult};

/// Default plain MQTT port.
pub const DEFAULT_PORT: u16 = 1883;

/// Where and how to connect to the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttEndpoint {
    pub host: String,
    pub port: u16,
    /// Username as sent to the broker, vhost prefix included.
    pub username: Option<String>,
    pub password: Option<String>,
    /// Virtual host taken from the URI path, if any.
    pub vhost: Option<String>,
}

impl MqttEndpoint {
    pub fn parse(uri: &str) -> HassResult<Self> {
        let url = Url::parse(uri).map_err(|e| HassError::InvalidUri(format!("{uri}: {e}")))?;

        match url.scheme() {
            "tcp" | "mqtt" => {}
            other => return Err(HassError::UnsupportedScheme(other.to_string())),
        }

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| HassError::InvalidUri(format!("{uri}: missing host")))?
            .to_string();
        let port = url.port().unwrap_or(DEFAULT_PORT);

        let vhost = Some(url.path().trim_matches('/'))
            .filter(|p| !p.is_empty())
            .map(|p| decode(uri, p))
            .transpose()?;

        let user = Some(url.username())
            .filter(|u| !u.is_empty())
            .map(|u| decode(uri, u))
            .transpose()?;
        let username = match (&vhost, user) {
            (Some(vhost), Some(user)) => Some(format!("{vhost}:{user}")),
            (None, Some(user)) => Some(user),
            (_, None) => None,
        };

        Ok(Self {
            host,
            port,
            username,
            password: url.password().map(|p| decode(uri, p)).transpose()?,
            vhost,
        })
    }
}

/// Undo the percent-encoding `url` leaves in userinfo and path components.
fn decode(uri: &str, component: &str) -> HassResult<String> {
    percent_decode_str(component)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|e| HassError::InvalidUri(format!("{uri}: {e}")))
}

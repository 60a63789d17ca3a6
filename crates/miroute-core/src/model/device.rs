use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use super::mac::MacAddress;

// ── Connection type ──────────────────────────────────────────────────

/// How a client is attached to the network.
///
/// The numeric codes are the firmware's own; the device list `type`
/// field and the wireless client `wifiIndex` field share them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Connection {
    #[default]
    Lan,
    Wifi2_4,
    Wifi5,
    Guest,
    Wifi5Game,
}

impl Connection {
    /// Band phrase as the router UI prints it.
    pub fn phrase(self) -> &'static str {
        match self {
            Self::Lan => "Lan",
            Self::Wifi2_4 => "2.4G",
            Self::Wifi5 => "5G",
            Self::Guest => "Guest",
            Self::Wifi5Game => "5G Game",
        }
    }

    pub fn is_wireless(self) -> bool {
        !matches!(self, Self::Lan)
    }
}

impl From<i64> for Connection {
    fn from(code: i64) -> Self {
        match code {
            1 => Self::Wifi2_4,
            2 => Self::Wifi5,
            3 => Self::Guest,
            4 => Self::Wifi5Game,
            _ => Self::Lan,
        }
    }
}

impl From<Connection> for i64 {
    fn from(connection: Connection) -> Self {
        match connection {
            Connection::Lan => 0,
            Connection::Wifi2_4 => 1,
            Connection::Wifi5 => 2,
            Connection::Guest => 3,
            Connection::Wifi5Game => 4,
        }
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.phrase())
    }
}

impl Serialize for Connection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64((*self).into())
    }
}

// Cached state may predate the current schema, so anything that is not
// a known numeric code falls back to `Lan` instead of failing the
// whole restore.
impl<'de> Deserialize<'de> for Connection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(value.as_i64().map_or_else(Self::default, Self::from))
    }
}

// ── Device record ────────────────────────────────────────────────────

/// One tracked client, keyed by MAC in the router state's device map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub mac: MacAddress,
    /// Display name; the MAC string when the router reports none.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ip: Option<IpAddr>,
    #[serde(default)]
    pub connection: Connection,
    /// MAC of the router or mesh node the client hangs off.
    #[serde(default)]
    pub router_mac: Option<MacAddress>,
    /// Wireless signal quality; absent for wired clients.
    #[serde(default)]
    pub signal: Option<i64>,
    /// Seconds the client has been connected.
    #[serde(default)]
    pub online_secs: u64,
    /// Link speeds in bytes per second.
    #[serde(default)]
    pub down_speed: f64,
    #[serde(default)]
    pub up_speed: f64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    #[serde(default)]
    pub is_online: bool,
    /// Set for the one cycle in which the MAC was first sighted.
    /// Never persisted, so a restart cannot re-announce old devices.
    #[serde(default, skip_serializing)]
    pub is_new: bool,
}

impl DeviceRecord {
    /// Connection time in the `h:mm:ss` form the router UI uses.
    pub fn online_text(&self) -> String {
        crate::convert::format_duration_hms(self.online_secs)
    }
}

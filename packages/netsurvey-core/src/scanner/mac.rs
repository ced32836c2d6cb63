//! Hardware address type and extraction from free-form tool output.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A 48-bit hardware address, displayed as `AA:BB:CC:DD:EE:FF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// All-zero addresses mark incomplete neighbor entries on some platforms.
    pub fn is_zero(&self) -> bool {
        self.0 == [0; 6]
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid hardware address '{0}'")]
pub struct ParseMacError(String);

impl FromStr for MacAddress {
    type Err = ParseMacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match parse_at(s.trim().as_bytes()) {
            Some(mac) if s.trim().len() == MAC_TEXT_LEN => Ok(mac),
            _ => Err(ParseMacError(s.to_string())),
        }
    }
}

impl Serialize for MacAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Length of `xx:xx:xx:xx:xx:xx`.
const MAC_TEXT_LEN: usize = 17;

/// Find the first hardware-address-shaped run of text: six hex byte pairs
/// joined by `:` or `-`. Incomplete (all-zero) entries are skipped.
pub fn find_mac_address(text: &str) -> Option<MacAddress> {
    let bytes = text.as_bytes();
    if bytes.len() < MAC_TEXT_LEN {
        return None;
    }

    (0..=bytes.len() - MAC_TEXT_LEN)
        .filter_map(|start| parse_at(&bytes[start..]))
        .find(|mac| !mac.is_zero())
}

/// Parse a hardware address from the first 17 bytes of `bytes`.
fn parse_at(bytes: &[u8]) -> Option<MacAddress> {
    if bytes.len() < MAC_TEXT_LEN {
        return None;
    }

    let mut octets = [0u8; 6];
    for (i, octet) in octets.iter_mut().enumerate() {
        let offset = i * 3;
        if i > 0 && !matches!(bytes[offset - 1], b':' | b'-') {
            return None;
        }
        let hi = hex_value(bytes[offset])?;
        let lo = hex_value(bytes[offset + 1])?;
        *octet = (hi << 4) | lo;
    }
    Some(MacAddress(octets))
}

fn hex_value(byte: u8) -> Option<u8> {
    (byte as char).to_digit(16).map(|d| d as u8)
}

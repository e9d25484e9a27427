//! MAC address type with safe parsing, formatting and generation.

use crate::ParseError;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 48-bit Ethernet MAC address.
///
/// Endpoint MACs are generated up front during topology resolution so
/// that the wiring engine can assign a stable address when it moves an
/// interface into its target namespace.
///
/// # Examples
///
/// ```
/// use wirelab_types::MacAddress;
///
/// let mac: MacAddress = "aa:c1:ab:00:11:22".parse().unwrap();
/// assert_eq!(mac.to_string(), "aa:c1:ab:00:11:22");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// Creates a new MAC address from raw bytes.
    pub const fn new(bytes: [u8; 6]) -> Self {
        MacAddress(bytes)
    }

    /// Generates a random MAC address under the given OUI.
    ///
    /// The three low bytes are random; the OUI stays fixed so that lab
    /// interfaces are recognizable on the host.
    pub fn random_with_oui(oui: [u8; 3]) -> Self {
        let mut low = [0u8; 3];
        rand::thread_rng().fill_bytes(&mut low);
        MacAddress([oui[0], oui[1], oui[2], low[0], low[1], low[2]])
    }

    /// Returns the raw bytes of the MAC address.
    pub const fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    /// Returns true if this is a multicast address.
    pub const fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl FromStr for MacAddress {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 6 {
            return Err(ParseError::InvalidMacAddress(s.to_string()));
        }

        let mut bytes = [0u8; 6];
        for (i, part) in parts.iter().enumerate() {
            bytes[i] = u8::from_str_radix(part, 16)
                .map_err(|_| ParseError::InvalidMacAddress(s.to_string()))?;
        }

        Ok(MacAddress(bytes))
    }
}

impl TryFrom<String> for MacAddress {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> String {
        mac.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WIRELAB_OUI;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_and_display() {
        let mac: MacAddress = "aa:c1:ab:12:34:56".parse().unwrap();
        assert_eq!(mac.as_bytes(), &[0xaa, 0xc1, 0xab, 0x12, 0x34, 0x56]);
        assert_eq!(mac.to_string(), "aa:c1:ab:12:34:56");
    }

    #[test]
    fn test_random_keeps_oui() {
        let mac = MacAddress::random_with_oui(WIRELAB_OUI);
        assert_eq!(&mac.as_bytes()[..3], &WIRELAB_OUI);
        // the wirelab OUI is unicast
        assert!(!mac.is_multicast());
    }

    #[test]
    fn test_invalid_format() {
        assert!("invalid".parse::<MacAddress>().is_err());
        assert!("aa:c1:ab:00:11".parse::<MacAddress>().is_err());
        assert!("gg:c1:ab:00:11:22".parse::<MacAddress>().is_err());
    }
}

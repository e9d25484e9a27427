//! Interface name validation and staging-name generation.
//!
//! The kernel limits interface names to 15 characters (`IFNAMSIZ - 1`).
//! `eth0` is reserved because the container runtime assigns it as the
//! management interface of every node.

use crate::ParseError;
use uuid::Uuid;

/// Maximum length of a Linux interface name.
pub const MAX_IFACE_NAME_LEN: usize = 15;

/// Prefix used for staging interface names in the root namespace.
pub const STAGING_PREFIX: &str = "wl-";

/// Validates a logical interface name from the topology file.
///
/// Rejects empty names and names longer than [`MAX_IFACE_NAME_LEN`].
/// The `eth0` reservation is checked separately by [`check_not_reserved`]
/// since pseudo-node endpoints never carry it.
pub fn validate(name: &str) -> Result<(), ParseError> {
    if name.is_empty() {
        return Err(ParseError::IfaceNameEmpty);
    }
    if name.len() > MAX_IFACE_NAME_LEN {
        return Err(ParseError::IfaceNameTooLong(name.to_string()));
    }
    Ok(())
}

/// Rejects the reserved management interface name.
pub fn check_not_reserved(name: &str) -> Result<(), ParseError> {
    if name == "eth0" {
        return Err(ParseError::IfaceNameReserved(name.to_string()));
    }
    Ok(())
}

/// Generates a random staging name for an interface created in the root
/// namespace, e.g. `wl-1a2b3c4d`.
///
/// Random names avoid collisions between concurrently created veth pairs
/// before each end is moved and renamed into its target namespace.
pub fn gen_staging_name() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{}{}", STAGING_PREFIX, &id[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_length_boundary() {
        // 15 characters is accepted, 16 is not
        assert!(validate("abcdefghijklmno").is_ok());
        assert!(matches!(
            validate("abcdefghijklmnop"),
            Err(ParseError::IfaceNameTooLong(_))
        ));
    }

    #[test]
    fn test_validate_empty() {
        assert_eq!(validate(""), Err(ParseError::IfaceNameEmpty));
    }

    #[test]
    fn test_reserved_eth0() {
        assert!(check_not_reserved("eth1").is_ok());
        assert!(matches!(
            check_not_reserved("eth0"),
            Err(ParseError::IfaceNameReserved(_))
        ));
    }

    #[test]
    fn test_staging_name_shape() {
        let name = gen_staging_name();
        assert!(name.starts_with(STAGING_PREFIX));
        assert!(name.len() <= MAX_IFACE_NAME_LEN);

        // two generations must not collide
        assert_ne!(name, gen_staging_name());
    }
}

//! Capacity Planning
//!
//! Maps a requested number of peers to the smallest standard subnet that
//! holds them.
//!
//! | Usable | Prefix |
//! |--------|--------|
//! | 6      | /29    |
//! | 14     | /28    |
//! | 30     | /27    |
//! | 62     | /26    |
//! | 126    | /25    |
//! | 254    | /24    |
//! | 510    | /23    |
//! | 1022   | /22    |
//!
//! Requests above the last tier are clamped to /22.

use crate::subnet::{parse_ipv4, FormatError};

/// Ascending `(usable addresses, prefix length)` tiers
pub const CAPACITY_LADDER: [(u64, u8); 8] = [
    (6, 29),
    (14, 28),
    (30, 27),
    (62, 26),
    (126, 25),
    (254, 24),
    (510, 23),
    (1022, 22),
];

/// Result of capacity planning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetPlan {
    /// `<base>/<prefix>`, with the base echoed as given
    pub cidr: String,
    /// Chosen prefix length
    pub prefix_length: u8,
    /// Usable addresses in the chosen tier
    pub usable_address_count: u64,
}

/// Pick the smallest tier whose usable count covers `desired_peer_count`.
///
/// Never fails: counts beyond the largest tier clamp to it.
pub fn plan_subnet(base_address: &str, desired_peer_count: usize) -> SubnetPlan {
    let desired = desired_peer_count as u64;
    let (usable, prefix) = CAPACITY_LADDER
        .iter()
        .copied()
        .find(|(usable, _)| desired <= *usable)
        .unwrap_or(CAPACITY_LADDER[CAPACITY_LADDER.len() - 1]);

    SubnetPlan {
        cidr: format!("{}/{}", base_address, prefix),
        prefix_length: prefix,
        usable_address_count: usable,
    }
}

/// Like [`plan_subnet`], but rejects a malformed base address up front
pub fn plan_subnet_checked(base_address: &str, desired_peer_count: usize) -> Result<SubnetPlan, FormatError> {
    parse_ipv4(base_address)?;
    Ok(plan_subnet(base_address, desired_peer_count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_thirty_peers() {
        let plan = plan_subnet("10.50.0.0", 30);
        assert_eq!(plan.prefix_length, 27);
        assert_eq!(plan.usable_address_count, 30);
        assert_eq!(plan.cidr, "10.50.0.0/27");
    }

    #[test]
    fn test_plan_tier_boundaries() {
        assert_eq!(plan_subnet("10.0.0.0", 0).prefix_length, 29);
        assert_eq!(plan_subnet("10.0.0.0", 6).prefix_length, 29);
        assert_eq!(plan_subnet("10.0.0.0", 7).prefix_length, 28);
        assert_eq!(plan_subnet("10.0.0.0", 254).prefix_length, 24);
        assert_eq!(plan_subnet("10.0.0.0", 255).prefix_length, 23);
        assert_eq!(plan_subnet("10.0.0.0", 1022).prefix_length, 22);
    }

    #[test]
    fn test_plan_clamps_to_largest_tier() {
        let plan = plan_subnet("10.0.0.0", 5000);
        assert_eq!(plan.prefix_length, 22);
        assert_eq!(plan.usable_address_count, 1022);
    }

    #[test]
    fn test_plan_checked() {
        assert!(plan_subnet_checked("10.50.0.0", 10).is_ok());
        assert!(matches!(
            plan_subnet_checked("10.50.0", 10),
            Err(FormatError::InvalidAddress(_))
        ));
    }
}

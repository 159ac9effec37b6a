//! Address Pool
//!
//! Hands out and reclaims host addresses from a single subnet.
//!
//! # Policy
//!
//! - Every usable address of the subnet is allocatable, in ascending order
//! - The first usable address is reserved for the server and never handed out
//! - [`AddressPool::allocate`] returns the lowest available address
//! - Exhaustion is reported as `None`, never as an error
//!
//! The pool is owned by a single writer. Changing the base network or the
//! target size means building a new pool.

use crate::subnet::{parse_cidr, FormatError, Subnet, MIN_POOL_PREFIX};
use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use tracing::{debug, info, warn};

/// Snapshot of pool usage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Utilization {
    /// Addresses that can ever be handed to peers (`allocatable - reserved`)
    pub total: usize,
    /// Addresses currently assigned
    pub used: usize,
    /// Addresses still free
    pub available: usize,
    /// `used / total`, rounded to the nearest percent
    pub percent_used: u8,
}

/// Allocator over the usable addresses of one subnet
#[derive(Debug, Clone)]
pub struct AddressPool {
    subnet: Subnet,
    allocatable: Vec<Ipv4Addr>,
    reserved: BTreeSet<Ipv4Addr>,
    assigned: BTreeSet<Ipv4Addr>,
}

impl AddressPool {
    /// Build a pool from CIDR text such as `10.50.0.0/27`
    pub fn create(cidr: &str) -> Result<Self, FormatError> {
        let subnet = parse_cidr(cidr)?;
        Self::from_subnet(subnet)
    }

    /// Build a pool over an already parsed subnet
    pub fn from_subnet(subnet: Subnet) -> Result<Self, FormatError> {
        if subnet.prefix_length() < MIN_POOL_PREFIX {
            return Err(FormatError::PoolTooLarge(subnet.prefix_length()));
        }

        let allocatable: Vec<Ipv4Addr> = subnet.usable_addresses().collect();
        let reserved: BTreeSet<Ipv4Addr> = allocatable.first().copied().into_iter().collect();

        info!(
            "Created address pool {}: {} usable, {} reserved",
            subnet,
            allocatable.len(),
            reserved.len()
        );

        Ok(Self {
            subnet,
            allocatable,
            reserved,
            assigned: BTreeSet::new(),
        })
    }

    /// Hand out the lowest available address
    pub fn allocate(&mut self) -> Option<Ipv4Addr> {
        let next = self
            .allocatable
            .iter()
            .copied()
            .find(|addr| !self.reserved.contains(addr) && !self.assigned.contains(addr));

        match next {
            Some(addr) => {
                self.assigned.insert(addr);
                debug!("Allocated {} from {}", addr, self.subnet);
                Some(addr)
            }
            None => {
                warn!("Address pool {} exhausted", self.subnet);
                None
            }
        }
    }

    /// Return an address to the pool.
    ///
    /// Returns `true` if it was assigned. Reserved or unknown addresses are
    /// left alone and report `false`.
    pub fn release(&mut self, address: Ipv4Addr) -> bool {
        let removed = self.assigned.remove(&address);
        if removed {
            debug!("Released {} back to {}", address, self.subnet);
        }
        removed
    }

    /// Mark a specific available address as assigned.
    ///
    /// Used when peers that already carry an address are loaded back into a
    /// fresh pool. Returns `false` (and changes nothing) if the address is
    /// outside the pool, reserved, or already assigned.
    pub fn claim(&mut self, address: Ipv4Addr) -> bool {
        if !self.is_available(address) {
            warn!("Cannot claim {} in {}: not available", address, self.subnet);
            return false;
        }
        self.assigned.insert(address);
        debug!("Claimed {} in {}", address, self.subnet);
        true
    }

    /// Check whether `address` could be handed out right now
    pub fn is_available(&self, address: Ipv4Addr) -> bool {
        self.subnet.is_usable(address)
            && !self.reserved.contains(&address)
            && !self.assigned.contains(&address)
    }

    /// Check whether `address` is currently assigned
    pub fn is_assigned(&self, address: Ipv4Addr) -> bool {
        self.assigned.contains(&address)
    }

    /// Current usage figures
    pub fn utilization(&self) -> Utilization {
        let total = self.allocatable.len().saturating_sub(self.reserved.len());
        let used = self.assigned.len();
        let percent_used = if total == 0 {
            0
        } else {
            ((used * 200 + total) / (total * 2)) as u8
        };

        Utilization {
            total,
            used,
            available: total.saturating_sub(used),
            percent_used,
        }
    }

    /// The subnet this pool covers
    pub fn subnet(&self) -> &Subnet {
        &self.subnet
    }

    /// Canonical `network/prefix` of the pool
    pub fn cidr(&self) -> String {
        self.subnet.cidr()
    }

    /// The address reserved for the server, if the subnet has any usable host
    pub fn server_address(&self) -> Option<Ipv4Addr> {
        self.reserved.first().copied()
    }

    /// All usable addresses, ascending
    pub fn allocatable(&self) -> &[Ipv4Addr] {
        &self.allocatable
    }

    /// Reserved addresses, ascending
    pub fn reserved(&self) -> impl Iterator<Item = Ipv4Addr> + '_ {
        self.reserved.iter().copied()
    }

    /// Assigned addresses, ascending
    pub fn assigned(&self) -> impl Iterator<Item = Ipv4Addr> + '_ {
        self.assigned.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(last: u8) -> Ipv4Addr {
        Ipv4Addr::new(10, 50, 0, last)
    }

    #[test]
    fn test_create_29() {
        let pool = AddressPool::create("10.50.0.0/29").unwrap();

        assert_eq!(pool.allocatable().len(), 6);
        assert_eq!(pool.allocatable().first(), Some(&addr(1)));
        assert_eq!(pool.allocatable().last(), Some(&addr(6)));
        assert_eq!(pool.reserved().collect::<Vec<_>>(), vec![addr(1)]);
        assert_eq!(pool.server_address(), Some(addr(1)));
    }

    #[test]
    fn test_first_allocation_skips_reserved() {
        let mut pool = AddressPool::create("10.50.0.0/29").unwrap();
        assert_eq!(pool.allocate(), Some(addr(2)));
        assert_eq!(pool.allocate(), Some(addr(3)));
    }

    #[test]
    fn test_exhaustion() {
        let mut pool = AddressPool::create("10.50.0.0/29").unwrap();
        for expected in 2..=6 {
            assert_eq!(pool.allocate(), Some(addr(expected)));
        }
        assert_eq!(pool.allocate(), None);
        assert_eq!(pool.allocate(), None);
        assert_eq!(pool.utilization().available, 0);
    }

    #[test]
    fn test_release_reuses_lowest() {
        let mut pool = AddressPool::create("10.50.0.0/29").unwrap();
        pool.allocate();
        pool.allocate();
        pool.allocate();

        assert!(pool.release(addr(3)));
        assert!(pool.is_available(addr(3)));
        assert_eq!(pool.allocate(), Some(addr(3)));
    }

    #[test]
    fn test_release_twice() {
        let mut pool = AddressPool::create("10.50.0.0/29").unwrap();
        let ip = pool.allocate().unwrap();

        assert!(pool.release(ip));
        assert!(!pool.release(ip));
        assert_eq!(pool.utilization().used, 0);
    }

    #[test]
    fn test_release_reserved_is_noop() {
        let mut pool = AddressPool::create("10.50.0.0/29").unwrap();
        assert!(!pool.release(addr(1)));
        assert!(!pool.is_available(addr(1)));
        assert_eq!(pool.reserved().count(), 1);
    }

    #[test]
    fn test_claim() {
        let mut pool = AddressPool::create("10.50.0.0/29").unwrap();

        assert!(pool.claim(addr(4)));
        assert!(!pool.claim(addr(4)));
        assert!(!pool.claim(addr(1)));
        assert!(!pool.claim(addr(7)));
        assert!(!pool.claim(Ipv4Addr::new(10, 51, 0, 2)));

        assert_eq!(pool.allocate(), Some(addr(2)));
        assert_eq!(pool.allocate(), Some(addr(3)));
        assert_eq!(pool.allocate(), Some(addr(5)));
    }

    #[test]
    fn test_utilization() {
        let mut pool = AddressPool::create("10.50.0.0/27").unwrap();
        let empty = pool.utilization();
        assert_eq!(empty.total, 29);
        assert_eq!(empty.used, 0);
        assert_eq!(empty.percent_used, 0);

        for _ in 0..10 {
            pool.allocate();
        }
        let util = pool.utilization();
        assert_eq!(util.used, 10);
        assert_eq!(util.available, 19);
        assert_eq!(util.percent_used, 34);
    }

    #[test]
    fn test_host_bits_are_masked() {
        let mut pool = AddressPool::create("10.50.0.77/29").unwrap();
        assert_eq!(pool.cidr(), "10.50.0.72/29");
        assert_eq!(pool.allocate(), Some(addr(74)));
    }

    #[test]
    fn test_empty_pool() {
        let mut pool = AddressPool::create("10.50.0.0/31").unwrap();
        assert!(pool.allocatable().is_empty());
        assert_eq!(pool.server_address(), None);
        assert_eq!(pool.allocate(), None);
        assert_eq!(pool.utilization().percent_used, 0);
    }

    #[test]
    fn test_rejects_oversized_and_malformed() {
        assert!(matches!(AddressPool::create("10.0.0.0/8"), Err(FormatError::PoolTooLarge(8))));
        assert!(AddressPool::create("10.0.0.0").is_err());
    }
}

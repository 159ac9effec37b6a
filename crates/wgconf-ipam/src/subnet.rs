//! IPv4 Subnet Arithmetic
//!
//! Parsing and integer math over dotted-quad addresses and CIDR prefixes.
//!
//! All math is done on `u32`. A prefix of 0 (the whole address space) is
//! handled explicitly so no shift ever reaches the width of the integer.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;

/// Longest valid IPv4 prefix
pub const MAX_PREFIX: u8 = 32;

/// Shortest prefix an address pool will enumerate (65534 usable addresses)
pub const MIN_POOL_PREFIX: u8 = 16;

/// Errors raised while parsing addresses and CIDR blocks
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("Invalid CIDR notation (expected A.B.C.D/N): {0}")]
    InvalidCidr(String),

    #[error("Invalid IPv4 address: {0}")]
    InvalidAddress(String),

    #[error("Invalid prefix length (must be 0-32): {0}")]
    InvalidPrefix(String),

    #[error("Prefix /{0} is too large for an address pool (minimum /16)")]
    PoolTooLarge(u8),
}

/// Parse a dotted-quad IPv4 address.
///
/// Exactly four octets are required, each written as canonical decimal in
/// `0..=255`: no leading zeros, signs, whitespace or empty tokens.
pub fn parse_ipv4(text: &str) -> Result<Ipv4Addr, FormatError> {
    let invalid = || FormatError::InvalidAddress(text.to_string());

    let mut octets = [0u8; 4];
    let mut count = 0;

    for token in text.split('.') {
        if count == octets.len() {
            return Err(invalid());
        }
        let value = parse_canonical_decimal(token, 255).ok_or_else(invalid)?;
        octets[count] = value as u8;
        count += 1;
    }

    if count != octets.len() {
        return Err(invalid());
    }

    Ok(Ipv4Addr::from(octets))
}

/// Check whether `text` is a valid dotted-quad address
pub fn is_valid_ipv4(text: &str) -> bool {
    parse_ipv4(text).is_ok()
}

/// Parse a prefix length written as canonical decimal in `0..=32`
pub fn parse_prefix(text: &str) -> Result<u8, FormatError> {
    parse_canonical_decimal(text, MAX_PREFIX as u32)
        .map(|p| p as u8)
        .ok_or_else(|| FormatError::InvalidPrefix(text.to_string()))
}

/// Parse `A.B.C.D/N` into the subnet containing that address
pub fn parse_cidr(text: &str) -> Result<Subnet, FormatError> {
    let mut parts = text.split('/');
    let (Some(address), Some(prefix), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(FormatError::InvalidCidr(text.to_string()));
    };

    let address = parse_ipv4(address)?;
    let prefix = parse_prefix(prefix)?;
    compute_subnet_info(address, prefix)
}

/// Check whether `text` is valid IPv4 CIDR notation
pub fn is_valid_cidr(text: &str) -> bool {
    parse_cidr(text).is_ok()
}

fn parse_canonical_decimal(token: &str, max: u32) -> Option<u32> {
    if token.is_empty() || token.len() > 3 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if token.len() > 1 && token.starts_with('0') {
        return None;
    }
    let value: u32 = token.parse().ok()?;
    (value <= max).then_some(value)
}

/// Convert an address to its big-endian integer value
pub fn address_to_integer(address: Ipv4Addr) -> u32 {
    u32::from(address)
}

/// Convert an integer back to an address
pub fn integer_to_address(value: u32) -> Ipv4Addr {
    Ipv4Addr::from(value)
}

/// Network mask for a prefix length, as an integer
pub fn prefix_mask(prefix_length: u8) -> u32 {
    match prefix_length {
        0 => 0,
        p if p >= MAX_PREFIX => u32::MAX,
        p => !((1u32 << (MAX_PREFIX - p)) - 1),
    }
}

/// Derive the subnet that contains `address` under `prefix_length`
pub fn compute_subnet_info(address: Ipv4Addr, prefix_length: u8) -> Result<Subnet, FormatError> {
    if prefix_length > MAX_PREFIX {
        return Err(FormatError::InvalidPrefix(prefix_length.to_string()));
    }

    let mask = prefix_mask(prefix_length);
    let network = address_to_integer(address) & mask;
    let broadcast = network | !mask;
    let total = 1u64 << (MAX_PREFIX - prefix_length);

    Ok(Subnet {
        network,
        prefix_length,
        broadcast,
        first_usable: network.saturating_add(1),
        last_usable: broadcast.saturating_sub(1),
        total_address_count: total,
        usable_address_count: total.saturating_sub(2),
    })
}

/// An IPv4 subnet with its derived bounds.
///
/// Immutable once computed; build one with [`parse_cidr`] or
/// [`compute_subnet_info`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subnet {
    network: u32,
    prefix_length: u8,
    broadcast: u32,
    first_usable: u32,
    last_usable: u32,
    total_address_count: u64,
    usable_address_count: u64,
}

impl Subnet {
    pub fn network_address(&self) -> Ipv4Addr {
        integer_to_address(self.network)
    }

    pub fn prefix_length(&self) -> u8 {
        self.prefix_length
    }

    pub fn broadcast_address(&self) -> Ipv4Addr {
        integer_to_address(self.broadcast)
    }

    pub fn first_usable(&self) -> Ipv4Addr {
        integer_to_address(self.first_usable)
    }

    pub fn last_usable(&self) -> Ipv4Addr {
        integer_to_address(self.last_usable)
    }

    /// Every address in the block, network and broadcast included
    pub fn total_address_count(&self) -> u64 {
        self.total_address_count
    }

    /// Addresses a host may use (`total - 2`, never negative)
    pub fn usable_address_count(&self) -> u64 {
        self.usable_address_count
    }

    /// Dotted-quad netmask, e.g. `255.255.255.224` for /27
    pub fn netmask(&self) -> Ipv4Addr {
        integer_to_address(prefix_mask(self.prefix_length))
    }

    /// Check whether `address` falls inside this block
    pub fn contains(&self, address: Ipv4Addr) -> bool {
        address_to_integer(address) & prefix_mask(self.prefix_length) == self.network
    }

    /// Check whether `address` is a usable host address of this block
    pub fn is_usable(&self, address: Ipv4Addr) -> bool {
        let value = address_to_integer(address);
        self.usable_address_count > 0 && value >= self.first_usable && value <= self.last_usable
    }

    /// Usable host addresses in ascending order
    pub fn usable_addresses(&self) -> impl Iterator<Item = Ipv4Addr> + use<> {
        let first = self.first_usable;
        (0..self.usable_address_count).map(move |offset| integer_to_address(first + offset as u32))
    }

    /// Canonical `network/prefix` text
    pub fn cidr(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network_address(), self.prefix_length)
    }
}

impl FromStr for Subnet {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_cidr(s)
    }
}

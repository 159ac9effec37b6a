//! wgconf IPAM - Subnet planning and address allocation
//!
//! Address management for a WireGuard tunnel network.
//!
//! # Flow
//!
//! ```text
//! base network + peer count
//!         │
//!         ▼
//!   plan_subnet()  ──▶  "10.50.0.0/27"
//!         │
//!         ▼
//!   AddressPool::create()
//!         │   reserved: 10.50.0.1 (server)
//!         ▼
//!   allocate() ──▶ 10.50.0.2, 10.50.0.3, ...
//!   release()  ◀── peer removed
//! ```
//!
//! Everything here is synchronous and free of I/O. A pool has exactly one
//! owner; callers that share one must serialize access themselves.

mod planner;
mod pool;
mod subnet;

pub use planner::{plan_subnet, plan_subnet_checked, SubnetPlan, CAPACITY_LADDER};
pub use pool::{AddressPool, Utilization};
pub use subnet::{
    address_to_integer, compute_subnet_info, integer_to_address, is_valid_cidr, is_valid_ipv4,
    parse_cidr, parse_ipv4, parse_prefix, prefix_mask, FormatError, Subnet, MAX_PREFIX,
    MIN_POOL_PREFIX,
};

//! Property-based tests for subnet math and the address pool
//!
//! Uses proptest to drive random addresses and allocate/release sequences

use proptest::prelude::*;
use std::collections::HashSet;
use std::net::Ipv4Addr;
use wgconf_ipam::{
    address_to_integer, integer_to_address, parse_cidr, parse_ipv4, plan_subnet, AddressPool,
};

#[derive(Debug, Clone)]
enum PoolOp {
    Allocate,
    Release(u8),
}

fn pool_op() -> impl Strategy<Value = PoolOp> {
    prop_oneof![
        3 => Just(PoolOp::Allocate),
        2 => (0u8..32).prop_map(PoolOp::Release),
    ]
}

proptest! {
    #[test]
    fn test_integer_round_trip(value in any::<u32>()) {
        prop_assert_eq!(address_to_integer(integer_to_address(value)), value);
    }

    #[test]
    fn test_text_round_trip(octets in prop::array::uniform4(any::<u8>())) {
        let text = Ipv4Addr::from(octets).to_string();
        let parsed = parse_ipv4(&text).unwrap();
        prop_assert_eq!(integer_to_address(address_to_integer(parsed)).to_string(), text);
    }

    #[test]
    fn test_subnet_bounds(value in any::<u32>(), prefix in 0u8..=32) {
        let cidr = format!("{}/{}", Ipv4Addr::from(value), prefix);
        let subnet = parse_cidr(&cidr).unwrap();

        prop_assert!(subnet.contains(Ipv4Addr::from(value)));
        prop_assert_eq!(subnet.usable_address_count(), subnet.total_address_count().saturating_sub(2));
        if prefix <= 30 {
            prop_assert_eq!(
                address_to_integer(subnet.first_usable()),
                address_to_integer(subnet.network_address()) + 1
            );
            prop_assert_eq!(
                address_to_integer(subnet.last_usable()),
                address_to_integer(subnet.broadcast_address()) - 1
            );
        }
    }

    #[test]
    fn test_capacity_monotonic(a in 0usize..3000, b in 0usize..3000) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let small = plan_subnet("10.50.0.0", low);
        let large = plan_subnet("10.50.0.0", high);
        prop_assert!(small.usable_address_count <= large.usable_address_count);
        if high <= 1022 {
            prop_assert!(large.usable_address_count >= high as u64);
        }
    }

    #[test]
    fn test_pool_exclusivity(ops in prop::collection::vec(pool_op(), 0..120)) {
        let mut pool = AddressPool::create("10.50.0.0/27").unwrap();
        let reserved: HashSet<Ipv4Addr> = pool.reserved().collect();
        let mut handed_out: HashSet<Ipv4Addr> = HashSet::new();

        for op in ops {
            match op {
                PoolOp::Allocate => {
                    if let Some(addr) = pool.allocate() {
                        prop_assert!(!reserved.contains(&addr));
                        prop_assert!(handed_out.insert(addr), "{} handed out twice", addr);
                    } else {
                        prop_assert_eq!(handed_out.len(), 29);
                    }
                }
                PoolOp::Release(last) => {
                    let addr = Ipv4Addr::new(10, 50, 0, last);
                    let was_assigned = handed_out.remove(&addr);
                    prop_assert_eq!(pool.release(addr), was_assigned);
                }
            }

            let assigned: Vec<Ipv4Addr> = pool.assigned().collect();
            let unique: HashSet<Ipv4Addr> = assigned.iter().copied().collect();
            prop_assert_eq!(assigned.len(), unique.len());
            prop_assert!(unique.is_disjoint(&reserved));
            prop_assert_eq!(&unique, &handed_out);
        }
    }

    #[test]
    fn test_exhaustion_never_panics(prefix in 24u8..=30, extra in 1usize..10) {
        let mut pool = AddressPool::create(&format!("172.16.0.0/{}", prefix)).unwrap();
        let capacity = pool.allocatable().len() - 1;

        for _ in 0..capacity {
            prop_assert!(pool.allocate().is_some());
        }
        for _ in 0..extra {
            prop_assert_eq!(pool.allocate(), None);
        }
    }

    #[test]
    fn test_release_idempotent(count in 1usize..20, pick in 0usize..20) {
        let mut pool = AddressPool::create("10.50.0.0/27").unwrap();
        let addrs: Vec<Ipv4Addr> = (0..count).filter_map(|_| pool.allocate()).collect();
        let target = addrs[pick % addrs.len()];

        prop_assert!(pool.release(target));
        let after_once: Vec<Ipv4Addr> = pool.assigned().collect();
        prop_assert!(!pool.release(target));
        let after_twice: Vec<Ipv4Addr> = pool.assigned().collect();
        prop_assert_eq!(after_once, after_twice);
    }

    #[test]
    fn test_fresh_pool_allocates_lowest(value in any::<u32>(), prefix in 16u8..=30) {
        let cidr = format!("{}/{}", Ipv4Addr::from(value), prefix);
        let mut pool = AddressPool::create(&cidr).unwrap();
        let network = address_to_integer(pool.subnet().network_address());

        prop_assert_eq!(pool.server_address(), Some(integer_to_address(network + 1)));
        prop_assert_eq!(pool.allocate(), Some(integer_to_address(network + 2)));
    }
}

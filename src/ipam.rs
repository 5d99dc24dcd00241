//! Address pool validation and descriptors.
//!
//! Everything the NSX manager needs to know about an IP pool is validated
//! here before any request is serialized: the CIDR mask, the gateway, the
//! DNS servers, and the inclusive start-end address ranges with their
//! minimum-size policy.

use std::net::Ipv4Addr;

use crate::error::ValidationError;

/// Fixed name of the pool that VTEP interfaces draw addresses from.
pub const VTEP_POOL_NAME: &str = "VTEP-Pool";

/// Fixed name of the pool that controller nodes draw addresses from.
pub const CONTROLLER_POOL_NAME: &str = "Controller-Pool";

/// Controllers deploy as a three-node cluster, so their pool needs at
/// least three addresses.
pub const MIN_CONTROLLER_ADDRESSES: u64 = 3;

/// Multi-VTEP preparation puts two VTEP interfaces on every hypervisor
/// host, so the VTEP pool needs two addresses per host being prepared.
pub const VTEPS_PER_HOST: u64 = 2;

/// An inclusive IPv4 address range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpRange {
    pub start: Ipv4Addr,
    pub end: Ipv4Addr,
}

impl IpRange {
    /// Parse a single `start-end` range.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidRange {
            range: input.to_string(),
        };
        let (start, end) = input.split_once('-').ok_or_else(invalid)?;
        let start: Ipv4Addr = start.trim().parse().map_err(|_| invalid())?;
        let end: Ipv4Addr = end.trim().parse().map_err(|_| invalid())?;
        if u32::from(end) < u32::from(start) {
            return Err(invalid());
        }
        Ok(IpRange { start, end })
    }

    /// Number of addresses in the range, both ends inclusive.
    pub fn address_count(&self) -> u64 {
        u64::from(u32::from(self.end) - u32::from(self.start)) + 1
    }
}

/// Validate a CIDR mask of the form `/NN` and return the prefix length.
///
/// Accepts `/` followed by one or two digits, nothing else.
pub fn parse_mask(mask: &str) -> Result<u8, ValidationError> {
    let invalid = || ValidationError::InvalidMask {
        mask: mask.to_string(),
    };
    let digits = mask.strip_prefix('/').ok_or_else(invalid)?;
    if digits.is_empty() || digits.len() > 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    digits.parse().map_err(|_| invalid())
}

/// Validate a dotted-decimal IPv4 address string.
pub fn parse_address(address: &str) -> Result<Ipv4Addr, ValidationError> {
    address
        .parse()
        .map_err(|_| ValidationError::InvalidAddress {
            address: address.to_string(),
        })
}

/// Validate a comma-separated DNS server list, rejecting on the first
/// malformed entry.
pub fn parse_dns_servers(list: &str) -> Result<Vec<Ipv4Addr>, ValidationError> {
    list.split(',')
        .map(|entry| {
            let entry = entry.trim();
            entry
                .parse()
                .map_err(|_| ValidationError::InvalidDnsServer {
                    address: entry.to_string(),
                })
        })
        .collect()
}

/// Parse a comma-separated list of `start-end` ranges.
pub fn parse_ranges(list: &str) -> Result<Vec<IpRange>, ValidationError> {
    list.split(',').map(|r| IpRange::parse(r.trim())).collect()
}

/// A validated IP pool, ready to serialize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpPoolSpec {
    pub name: String,
    pub prefix_length: u8,
    pub gateway: Ipv4Addr,
    pub dns_servers: Vec<Ipv4Addr>,
    pub dns_suffix: String,
    pub ranges: Vec<IpRange>,
}

impl IpPoolSpec {
    /// Validate raw pool parameters into a spec.
    ///
    /// Checks run in a fixed order: DNS servers, ranges, total address
    /// count against `min_addresses`, mask, gateway. The first failure
    /// wins and nothing is serialized or sent.
    pub fn build(
        name: &str,
        ranges: &str,
        mask: &str,
        gateway: &str,
        dns_servers: &str,
        dns_suffix: &str,
        min_addresses: u64,
    ) -> Result<Self, ValidationError> {
        let dns_servers = parse_dns_servers(dns_servers)?;
        let ranges = parse_ranges(ranges)?;

        let available: u64 = ranges.iter().map(IpRange::address_count).sum();
        if available < min_addresses {
            return Err(ValidationError::InsufficientAddresses {
                pool: name.to_string(),
                available,
                required: min_addresses,
            });
        }

        let prefix_length = parse_mask(mask)?;
        let gateway = parse_address(gateway)?;

        Ok(IpPoolSpec {
            name: name.to_string(),
            prefix_length,
            gateway,
            dns_servers,
            dns_suffix: dns_suffix.to_string(),
            ranges,
        })
    }

    /// Total number of addresses across all ranges.
    pub fn total_addresses(&self) -> u64 {
        self.ranges.iter().map(IpRange::address_count).sum()
    }
}

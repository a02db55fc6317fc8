//! Poll groups: one batched read request each
//!
//! A group holds address ranges, individual addresses, or both. The order in
//! which the controller returns values is the flattened order of the group
//! (ranges first, in declaration order, then individual addresses), so the
//! same flattening is used to map a response back onto addresses.

use crate::codec::{build_read_ranges, build_read_registers, RegisterRange};
use crate::constants::MAX_REGISTERS_PER_REQUEST;
use crate::error::{ModbusError, ModbusResult};

/// A named read request, validated at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollGroup {
    name: &'static str,
    ranges: Vec<RegisterRange>,
    individual: Vec<u16>,
}

impl PollGroup {
    /// Build a group, rejecting empty groups and groups that flatten to more
    /// than [`MAX_REGISTERS_PER_REQUEST`] addresses.
    pub fn new(
        name: &'static str,
        ranges: Vec<RegisterRange>,
        individual: Vec<u16>,
    ) -> ModbusResult<Self> {
        let group = Self {
            name,
            ranges,
            individual,
        };
        let total = group.address_count();
        if total == 0 {
            return Err(ModbusError::configuration(format!(
                "poll group '{}' has no addresses",
                name
            )));
        }
        if total > MAX_REGISTERS_PER_REQUEST {
            return Err(ModbusError::configuration(format!(
                "poll group '{}' covers {} addresses (max {})",
                name, total, MAX_REGISTERS_PER_REQUEST
            )));
        }
        Ok(group)
    }

    /// Group made only of address ranges.
    pub fn from_ranges(name: &'static str, ranges: &[RegisterRange]) -> ModbusResult<Self> {
        Self::new(name, ranges.to_vec(), Vec::new())
    }

    /// Group made only of individual addresses.
    pub fn from_addresses(name: &'static str, addresses: &[u16]) -> ModbusResult<Self> {
        Self::new(name, Vec::new(), addresses.to_vec())
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn ranges(&self) -> &[RegisterRange] {
        &self.ranges
    }

    #[inline]
    pub fn individual(&self) -> &[u16] {
        &self.individual
    }

    /// Number of values a response to this group carries.
    pub fn address_count(&self) -> usize {
        self.ranges
            .iter()
            .map(|r| usize::from(r.count))
            .sum::<usize>()
            + self.individual.len()
    }

    /// Addresses in response order.
    pub fn expected_addresses(&self) -> Vec<u16> {
        let mut addresses = Vec::with_capacity(self.address_count());
        for range in &self.ranges {
            addresses.extend(range.addresses());
        }
        addresses.extend_from_slice(&self.individual);
        addresses
    }

    /// Encode the read request for this group.
    ///
    /// Ranges alone use FC65, individual addresses alone use FC66, and a
    /// mixed group is flattened into a single FC66 request.
    pub fn build_request(&self) -> Vec<u8> {
        if self.individual.is_empty() {
            build_read_ranges(&self.ranges)
        } else if self.ranges.is_empty() {
            build_read_registers(&self.individual)
        } else {
            build_read_registers(&self.expected_addresses())
        }
    }
}

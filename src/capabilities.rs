//! Installed-hardware flags and the poll plan derived from them
//!
//! Computed once from the component-detection read. Which poll groups exist
//! depends entirely on these flags.

use tracing::info;

use crate::error::ModbusResult;
use crate::poll_group::PollGroup;
use crate::registers::{
    component_present, iz2_ranges, AWL_AXB_MIN_VERSION, AWL_IZ2_MIN_VERSION,
    AWL_THERMOSTAT_MIN_VERSION, AXB_RANGES, MAX_IZ2_ZONES, POWER_RANGES, REG_AOC_STATUS,
    REG_AWL_STATUS, REG_AXB_STATUS, REG_AXB_VERSION, REG_EEV2_STATUS, REG_IZ2_STATUS,
    REG_IZ2_VERSION, REG_IZ2_ZONE_COUNT, REG_MOC_STATUS, REG_THERMOSTAT_STATUS,
    REG_THERMOSTAT_VERSION, THERMOSTAT_CONFIG_REGISTERS, THERMOSTAT_RANGES, VS_DRIVE_RANGES,
};

/// Hardware detected on the controller.
///
/// Versions are firmware versions in hundredths (`300` is 3.00).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub has_thermostat: bool,
    pub has_axb: bool,
    pub has_iz2: bool,
    pub has_aoc: bool,
    pub has_moc: bool,
    pub has_eev2: bool,
    pub has_awl: bool,
    pub has_vs_drive: bool,
    pub has_energy_monitoring: bool,
    pub awl_thermostat: bool,
    pub awl_axb: bool,
    pub awl_iz2: bool,
    pub iz2_zone_count: u8,
    pub thermostat_version: u16,
    pub axb_version: u16,
    pub iz2_version: u16,
}

impl Capabilities {
    /// Derive every flag from cached detection registers.
    ///
    /// `has_vs_drive` comes from the program name decoded during the
    /// identity read. Registers `lookup` does not know count as absent.
    pub fn detect<F>(lookup: F, has_vs_drive: bool) -> Self
    where
        F: Fn(u16) -> Option<u16>,
    {
        let present = |status_reg: u16| lookup(status_reg).is_some_and(component_present);
        let version = |version_reg: u16| lookup(version_reg).unwrap_or(0);

        let has_thermostat = present(REG_THERMOSTAT_STATUS);
        let has_axb = present(REG_AXB_STATUS);
        let has_iz2 = present(REG_IZ2_STATUS);
        let thermostat_version = version(REG_THERMOSTAT_VERSION);
        let axb_version = version(REG_AXB_VERSION);
        let iz2_version = version(REG_IZ2_VERSION);

        let awl_thermostat = has_thermostat && thermostat_version >= AWL_THERMOSTAT_MIN_VERSION;
        let awl_axb = has_axb && axb_version >= AWL_AXB_MIN_VERSION;
        let awl_iz2 = has_iz2 && iz2_version >= AWL_IZ2_MIN_VERSION;

        let iz2_zone_count = if awl_iz2 {
            match lookup(REG_IZ2_ZONE_COUNT) {
                Some(count) if (1..=MAX_IZ2_ZONES).contains(&count) => count as u8,
                _ => 0,
            }
        } else {
            0
        };

        Self {
            has_thermostat,
            has_axb,
            has_iz2,
            has_aoc: present(REG_AOC_STATUS),
            has_moc: present(REG_MOC_STATUS),
            has_eev2: present(REG_EEV2_STATUS),
            has_awl: present(REG_AWL_STATUS),
            has_vs_drive,
            has_energy_monitoring: has_axb,
            awl_thermostat,
            awl_axb,
            awl_iz2,
            iz2_zone_count,
            thermostat_version,
            axb_version,
            iz2_version,
        }
    }

    /// Emit a one-line summary at info level.
    pub fn log_summary(&self) {
        info!(
            "Components detected: thermostat={}(v{:.2}, awl={}) axb={}(v{:.2}, awl={}) \
             iz2={}(v{:.2}, {} zones) vs={} energy={}",
            self.has_thermostat,
            f64::from(self.thermostat_version) / 100.0,
            self.awl_thermostat,
            self.has_axb,
            f64::from(self.axb_version) / 100.0,
            self.awl_axb,
            self.has_iz2,
            f64::from(self.iz2_version) / 100.0,
            self.iz2_zone_count,
            self.has_vs_drive,
            self.has_energy_monitoring
        );
    }
}

/// Poll groups for the detected hardware, in polling order.
///
/// 1. thermostat and status (always)
/// 2. thermostat configuration (AWL thermostat without IZ2)
/// 3. AXB performance
/// 4. power and energy
/// 5. variable-speed drive
/// 6. IZ2 zones
pub fn plan_poll_groups(caps: &Capabilities) -> ModbusResult<Vec<PollGroup>> {
    let mut groups = vec![PollGroup::from_ranges("thermostat", &THERMOSTAT_RANGES)?];

    // 12005-12006 sit apart from every other block, so they get their own request
    if caps.awl_thermostat && !caps.has_iz2 {
        groups.push(PollGroup::from_addresses(
            "thermostat_config",
            &THERMOSTAT_CONFIG_REGISTERS,
        )?);
    }
    if caps.has_axb {
        groups.push(PollGroup::from_ranges("axb", &AXB_RANGES)?);
    }
    if caps.has_energy_monitoring {
        groups.push(PollGroup::from_ranges("power", &POWER_RANGES)?);
    }
    if caps.has_vs_drive {
        groups.push(PollGroup::from_ranges("vs_drive", &VS_DRIVE_RANGES)?);
    }
    if caps.awl_iz2 && caps.iz2_zone_count > 0 {
        groups.push(PollGroup::from_ranges(
            "iz2_zones",
            &iz2_ranges(caps.iz2_zone_count),
        )?);
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(u16, u16)]) -> impl Fn(u16) -> Option<u16> {
        let map: HashMap<u16, u16> = pairs.iter().copied().collect();
        move |a| map.get(&a).copied()
    }

    fn names(groups: &[PollGroup]) -> Vec<&'static str> {
        groups.iter().map(|g| g.name()).collect()
    }

    #[test]
    fn test_awl_thresholds() {
        let caps = Capabilities::detect(lookup(&[(800, 1), (801, 300), (806, 1), (807, 200)]), false);
        assert!(caps.has_thermostat && caps.awl_thermostat);
        assert!(caps.has_axb && caps.awl_axb);
        assert!(caps.has_energy_monitoring);

        let caps = Capabilities::detect(lookup(&[(800, 1), (801, 299), (806, 1), (807, 199)]), false);
        assert!(caps.has_thermostat && !caps.awl_thermostat);
        assert!(caps.has_axb && !caps.awl_axb);
    }

    #[test]
    fn test_absent_components() {
        let caps = Capabilities::detect(
            lookup(&[(800, 3), (801, 400), (806, 0xFFFF), (812, 0), (815, 2), (827, 1)]),
            false,
        );
        assert!(!caps.has_thermostat);
        assert!(!caps.awl_thermostat);
        assert!(!caps.has_axb);
        assert!(!caps.has_iz2);
        assert!(caps.has_aoc);
        assert!(!caps.has_moc);
        assert!(caps.has_awl);
        assert!(!caps.has_energy_monitoring);
    }

    #[test]
    fn test_zone_count_requires_awl_iz2_and_range() {
        let caps = Capabilities::detect(lookup(&[(812, 1), (813, 200), (483, 4)]), false);
        assert_eq!(caps.iz2_zone_count, 4);

        let caps = Capabilities::detect(lookup(&[(812, 1), (813, 200), (483, 7)]), false);
        assert_eq!(caps.iz2_zone_count, 0);

        let caps = Capabilities::detect(lookup(&[(812, 1), (813, 150), (483, 4)]), false);
        assert!(caps.has_iz2 && !caps.awl_iz2);
        assert_eq!(caps.iz2_zone_count, 0);
    }

    #[test]
    fn test_plan_minimal() {
        let groups = plan_poll_groups(&Capabilities::default()).unwrap();
        assert_eq!(names(&groups), vec!["thermostat"]);
    }

    #[test]
    fn test_plan_full_single_zone() {
        let caps = Capabilities {
            has_thermostat: true,
            awl_thermostat: true,
            has_axb: true,
            has_energy_monitoring: true,
            has_vs_drive: true,
            ..Default::default()
        };
        let groups = plan_poll_groups(&caps).unwrap();
        assert_eq!(
            names(&groups),
            vec!["thermostat", "thermostat_config", "axb", "power", "vs_drive"]
        );
    }

    #[test]
    fn test_plan_iz2_replaces_thermostat_config() {
        let caps = Capabilities {
            has_thermostat: true,
            awl_thermostat: true,
            has_iz2: true,
            awl_iz2: true,
            iz2_zone_count: 3,
            ..Default::default()
        };
        let groups = plan_poll_groups(&caps).unwrap();
        assert_eq!(names(&groups), vec!["thermostat", "iz2_zones"]);
        assert_eq!(groups[1].address_count(), 18);
    }
}

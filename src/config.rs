//! Slave configuration and user callbacks. Configuration is frozen at
//! `init` and validated once, centralizing every precondition from the
//! wire-level and memory-area invariants instead of scattering `assert!`s
//! through the engine.

use crate::error::Error;
use crate::net::is_netmask_valid;
use crate::types::{ErrorMessage, MasterRunningState};

/// Compile-time cap on a single slave's occupied-station count.
pub const CLS_MAX_OCCUPIED_STATIONS: u16 = 4;

pub const CL_IEFB_PORT: u16 = 61450;
pub const CL_SLMP_PORT: u16 = 61451;

/// User-supplied hooks. Each is optional; a struct of boxed closures is
/// used instead of a trait so a caller can wire up only the events they
/// care about without implementing a full trait.
#[derive(Default)]
pub struct SlaveCallbacks {
    pub state: Option<Box<dyn FnMut(crate::types::SlaveState)>>,
    pub error: Option<Box<dyn FnMut(ErrorMessage, u32, u16)>>,
    pub connect: Option<Box<dyn FnMut(u8, u16, u32)>>,
    pub disconnect: Option<Box<dyn FnMut(u32)>>,
    pub master_running: Option<Box<dyn FnMut(MasterRunningState)>>,
    pub node_search: Option<Box<dyn FnMut(u32)>>,
    pub set_ip: Option<Box<dyn FnMut(bool, bool)>>,
}

impl SlaveCallbacks {
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for SlaveCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlaveCallbacks").finish_non_exhaustive()
    }
}

/// Frozen-at-init slave identity and configuration.
#[derive(Debug, Clone)]
pub struct SlaveConfig {
    pub vendor_code: u16,
    pub model_code: u32,
    pub equipment_ver: u16,
    pub num_occupied_stations: u16,
    pub ip_setting_allowed: bool,
    /// 0 means "bind to 0.0.0.0"; otherwise must be a valid unicast
    /// address.
    pub iefb_ip_addr: u32,
    pub use_slmp_directed_broadcast: bool,
}

impl SlaveConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.num_occupied_stations < 1 || self.num_occupied_stations > CLS_MAX_OCCUPIED_STATIONS {
            return Err(Error::InvalidStationCount {
                got: self.num_occupied_stations,
                max: CLS_MAX_OCCUPIED_STATIONS,
            });
        }
        if self.iefb_ip_addr != 0 && (self.iefb_ip_addr == 0xFFFF_FFFF) {
            return Err(Error::InvalidIpAddress {
                field: "iefb_ip_addr",
                addr: self.iefb_ip_addr,
            });
        }
        Ok(())
    }
}

/// Validate a netmask supplied out-of-band (e.g. via SLMP set-IP),
/// separate from `SlaveConfig::validate` since it is not part of the
/// frozen init-time config.
pub fn validate_netmask(mask: u32) -> Result<(), Error> {
    if !is_netmask_valid(mask) {
        return Err(Error::InvalidNetmask { addr: mask });
    }
    Ok(())
}

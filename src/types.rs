//! Shared sum types: protocol state machine, wire-code enums and the
//! master connection record. Wire-code enums follow a `FromPrimitive`
//! + documented-fallback pattern: unknown codes never panic, they fall
//! back to a named `Unknown`-style arm.

use num_derive::FromPrimitive;
use num_traits::cast::FromPrimitive;

/// States of the CCIEFB slave connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlaveState {
    SlaveDown,
    MasterNone,
    MasterControl,
    WaitDisablingSlave,
    SlaveDisabled,
    /// Terminal sentinel, reachable only by explicit test forcing.
    Last,
}

/// Events that drive the state machine, derived from `tick()` or a
/// classified incoming frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlaveEvent {
    Startup,
    CyclicNewMaster,
    CyclicCorrectMaster,
    CyclicWrongMaster,
    CyclicWrongStationCount,
    StationDuplication,
    CyclicIncomingWhenDisabled,
    TimeoutMaster,
    DisableSlave,
    DisableSlaveWaitEnded,
    ReenableSlave,
    IpUpdated,
}

/// Diagnostic classes surfaced through `error_cb`, and used as the log
/// limiter's first-class key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorMessage {
    SlaveStationDuplication,
    MasterStationDuplication,
    WrongNumberOccupied,
    /// Limiter-only key for the frame-sequence-reset log line; never handed
    /// to `error_cb`.
    FrameSequenceReset,
}

/// 16-bit status code carried in the CCIEFB response common header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u16)]
pub enum EndCode {
    Success = 0x0000,
    CcIefbSlaveError = 0xCFF0,
    CcIefbSlaveRequestsDisconnect = 0xCFFF,
    CcIefbWrongNumberOccupiedStations = 0xCFE0,
    CcIefbMasterDuplication = 0xCFE1,
    CommandRequestMsg = 0xC059,
}

impl From<u16> for EndCode {
    fn from(code: u16) -> Self {
        Self::from_u16(code).unwrap_or(EndCode::CcIefbSlaveError)
    }
}

/// SLMP command codes (subcommand is always 0 for both).
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u16)]
pub enum SlmpCommand {
    NodeSearch = 0x0E30,
    SetIpAddress = 0x0E31,
    /// Anything else: dropped silently by the SLMP engine.
    Unknown = 0xFFFF,
}

impl From<u16> for SlmpCommand {
    fn from(code: u16) -> Self {
        Self::from_u16(code).unwrap_or(SlmpCommand::Unknown)
    }
}

/// Application running/stopped status, exposed to the user and carried
/// in CCIEFB requests/responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplOperationStatus {
    Stopped,
    Operating,
}

impl Default for ApplOperationStatus {
    fn default() -> Self {
        ApplOperationStatus::Operating
    }
}

/// Sticky endcode remembered while transitioning through
/// `WaitDisablingSlave` -> `SlaveDisabled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisableReason {
    SlaveRequestsDisconnect,
    SlaveError,
}

impl DisableReason {
    pub fn endcode(self) -> EndCode {
        match self {
            DisableReason::SlaveRequestsDisconnect => EndCode::CcIefbSlaveRequestsDisconnect,
            DisableReason::SlaveError => EndCode::CcIefbSlaveError,
        }
    }
}

/// Connection record, valid only while `state ∈ {MasterControl,
/// WaitDisablingSlave}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MasterConnection {
    pub master_ip: u32,
    pub protocol_ver: u16,
    pub group_no: u8,
    pub slave_station_no: u16,
    pub total_occupied_in_group: u16,
    pub parameter_no: u16,
    pub timeout_ms: u16,
    pub parallel_off_timeout_count: u16,
    /// Unix-millisecond clock snapshot from the master, 0 if invalid.
    pub clock_info: u64,
    /// `now_micros()` timestamp of the last validated frame; drives the
    /// watchdog.
    pub last_seen_us: u32,
    pub master_local_unit_info: u16,
}

impl MasterConnection {
    pub fn is_valid(&self) -> bool {
        self.master_ip != 0
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// `timeout_ms * parallel_off_timeout_count`, in microseconds.
    pub fn watchdog_period_us(&self) -> u32 {
        (self.timeout_ms as u32).saturating_mul(self.parallel_off_timeout_count as u32) * 1_000
    }
}

/// Normalized view of the master's running/stopped status as delivered to
/// `master_running_cb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MasterRunningState {
    pub connected: bool,
    pub running: bool,
    pub stopped_by_user: bool,
    pub protocol_ver: u16,
    pub raw_status: u16,
}

/// Translate `(connected, protocol_ver, raw_status)` into the normalized
/// tuple the user callback sees. `protocol_ver == 0` is tolerated the same
/// as `1`; codec validation rejects a wire `protocol_ver` of `0` before a
/// frame ever reaches this function, so this tolerant branch is only
/// exercised by callers constructing the filter input directly.
pub fn filter_master_state(connected: bool, protocol_ver: u16, raw_status: u16) -> MasterRunningState {
    if !connected {
        return MasterRunningState::default();
    }
    if protocol_ver <= 1 {
        MasterRunningState {
            connected: true,
            running: raw_status & 1 != 0,
            stopped_by_user: false,
            protocol_ver,
            raw_status,
        }
    } else {
        let running = raw_status == 1 || raw_status == 0x03;
        let stopped_by_user = raw_status == 2;
        MasterRunningState {
            connected: true,
            running,
            stopped_by_user,
            protocol_ver,
            raw_status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endcode_unknown_falls_back() {
        assert_eq!(EndCode::from(0x1234), EndCode::CcIefbSlaveError);
        assert_eq!(EndCode::from(0xCFE1), EndCode::CcIefbMasterDuplication);
    }

    #[test]
    fn slmp_command_unknown_falls_back() {
        assert_eq!(SlmpCommand::from(0x1234), SlmpCommand::Unknown);
        assert_eq!(SlmpCommand::from(0x0E30), SlmpCommand::NodeSearch);
    }

    #[test]
    fn filter_disconnected_is_all_zero() {
        let s = filter_master_state(false, 2, 1);
        assert_eq!(s, MasterRunningState::default());
    }

    #[test]
    fn filter_protocol_v1_ignores_stopped_bit() {
        let s = filter_master_state(true, 1, 0x03);
        assert!(s.running);
        assert!(!s.stopped_by_user);
    }

    #[test]
    fn filter_protocol_v0_tolerated_like_v1() {
        let s = filter_master_state(true, 0, 1);
        assert!(s.running);
        assert!(!s.stopped_by_user);
    }

    #[test]
    fn filter_protocol_v2_distinguishes_stopped() {
        let running = filter_master_state(true, 2, 1);
        assert!(running.running);
        assert!(!running.stopped_by_user);

        let stopped = filter_master_state(true, 2, 2);
        assert!(!stopped.running);
        assert!(stopped.stopped_by_user);

        let bit0 = filter_master_state(true, 2, 0x03);
        assert!(bit0.running);
        assert!(!bit0.stopped_by_user);
    }

    #[test]
    fn master_connection_invariants() {
        let mut c = MasterConnection::default();
        assert!(!c.is_valid());
        c.master_ip = 0xC0A8_00FA;
        assert!(c.is_valid());
        c.clear();
        assert!(!c.is_valid());
    }
}

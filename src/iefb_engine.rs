//! CCIEFB slave engine: owns the state machine, the watchdog, response
//! emission and callback dispatch. The transition table is expressed as
//! a pure function so it is unit-testable without a live network
//! interface; `Engine::tick` is the impure shell that drives I/O, the
//! cyclic store and the user callbacks around it.

use crate::config::{SlaveCallbacks, SlaveConfig, CL_IEFB_PORT};
use crate::iefb_codec::{self, CcIefbRequest, CcIefbResponse};
use crate::iefb_store::CyclicStore;
use crate::iface::{NetworkInterface, SocketHandle};
use crate::timer::Limiter;
use crate::types::{
    filter_master_state, ApplOperationStatus, DisableReason, EndCode, ErrorMessage, MasterConnection,
    MasterRunningState, SlaveEvent, SlaveState,
};

const LIMITER_PERIOD_US: u32 = 5_000_000;

/// Side effects a transition wants performed; execution happens in
/// `Engine::tick`, which has access to the network interface, the cyclic
/// store and the callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    None,
    SendNormalResponseAndConnectCb,
    SendNormalResponse,
    SendErrorToSender(EndCode, ErrorMessage),
    SendErrorToIntruder(EndCode, ErrorMessage),
    DisconnectSequence,
    NoResponseStationDuplication,
}

/// Pure state transition. Returns the next state plus the action the
/// caller should carry out.
fn transition(state: SlaveState, event: SlaveEvent) -> (SlaveState, Action) {
    use SlaveEvent::*;
    use SlaveState::*;
    match (state, event) {
        (SlaveDown, Startup) => (MasterNone, Action::None),

        (MasterNone, CyclicNewMaster) => (MasterControl, Action::SendNormalResponseAndConnectCb),
        (MasterNone, CyclicWrongStationCount) => (
            MasterNone,
            Action::SendErrorToSender(EndCode::CcIefbWrongNumberOccupiedStations, ErrorMessage::WrongNumberOccupied),
        ),
        (MasterNone, DisableSlave) => (SlaveDisabled, Action::None),

        (MasterControl, CyclicCorrectMaster) => (MasterControl, Action::SendNormalResponse),
        (MasterControl, CyclicNewMaster) => (MasterControl, Action::SendNormalResponseAndConnectCb),
        (MasterControl, CyclicWrongMaster) => (
            MasterControl,
            Action::SendErrorToIntruder(EndCode::CcIefbMasterDuplication, ErrorMessage::MasterStationDuplication),
        ),
        (MasterControl, CyclicWrongStationCount) => (
            MasterNone,
            Action::SendErrorToSender(EndCode::CcIefbWrongNumberOccupiedStations, ErrorMessage::WrongNumberOccupied),
        ),
        (MasterControl, TimeoutMaster) => (MasterNone, Action::DisconnectSequence),
        (MasterControl, IpUpdated) => (MasterNone, Action::DisconnectSequence),
        (MasterControl, DisableSlave) => (WaitDisablingSlave, Action::DisconnectSequence),

        (WaitDisablingSlave, CyclicCorrectMaster)
        | (WaitDisablingSlave, CyclicNewMaster)
        | (WaitDisablingSlave, CyclicWrongMaster) => (WaitDisablingSlave, Action::None), // sticky error sent by caller
        (WaitDisablingSlave, DisableSlaveWaitEnded) => (SlaveDisabled, Action::None),
        (WaitDisablingSlave, IpUpdated) => (SlaveDisabled, Action::None),
        (WaitDisablingSlave, ReenableSlave) => (MasterNone, Action::None),

        (SlaveDisabled, ReenableSlave) => (MasterNone, Action::None),

        // Master flagged our own station as a duplicate: stay put, send
        // nothing, only raise the diagnostic.
        (s, StationDuplication) => (s, Action::NoResponseStationDuplication),

        // Every other (state, event) pair is a no-op.
        (s, _) => (s, Action::None),
    }
}

pub struct Engine {
    state: SlaveState,
    connection: MasterConnection,
    disable_reason: Option<DisableReason>,
    socket: Option<SocketHandle>,
    limiter: Limiter<(ErrorMessage, u32)>,
    last_master_running: Option<MasterRunningState>,
    slave_application_status: ApplOperationStatus,
    local_management_info: u32,
    slave_err_code: u16,
}

impl Engine {
    pub fn new() -> Self {
        Self {
            state: SlaveState::SlaveDown,
            connection: MasterConnection::default(),
            disable_reason: None,
            socket: None,
            limiter: Limiter::new(LIMITER_PERIOD_US),
            last_master_running: None,
            slave_application_status: ApplOperationStatus::Operating,
            local_management_info: 0,
            slave_err_code: 0,
        }
    }

    pub fn state(&self) -> SlaveState {
        self.state
    }

    pub fn master_connection(&self) -> Option<MasterConnection> {
        if self.connection.is_valid() {
            Some(self.connection)
        } else {
            None
        }
    }

    pub fn slave_application_status(&self) -> ApplOperationStatus {
        self.slave_application_status
    }

    pub fn set_slave_application_status(&mut self, status: ApplOperationStatus) {
        self.slave_application_status = status;
    }

    pub fn local_management_info(&self) -> u32 {
        self.local_management_info
    }

    pub fn set_local_management_info(&mut self, v: u32) {
        self.local_management_info = v;
    }

    pub fn slave_error_code(&self) -> u16 {
        self.slave_err_code
    }

    pub fn set_slave_error_code(&mut self, v: u16) {
        self.slave_err_code = v;
    }

    pub fn init(&mut self, net: &mut dyn NetworkInterface, cfg: &SlaveConfig) -> std::io::Result<()> {
        let handle = net.udp_open(cfg.iefb_ip_addr, CL_IEFB_PORT)?;
        self.socket = Some(handle);
        self.connection.clear();
        self.state = SlaveState::MasterNone;
        Ok(())
    }

    pub fn exit(&mut self, net: &mut dyn NetworkInterface) {
        if let Some(h) = self.socket.take() {
            net.udp_close(h);
        }
    }

    /// User-facing: disable cyclic data exchange.
    pub fn stop_cyclic(&mut self, is_error: bool) {
        self.disable_reason = Some(if is_error {
            DisableReason::SlaveError
        } else {
            DisableReason::SlaveRequestsDisconnect
        });
        if self.state == SlaveState::MasterControl {
            self.state = SlaveState::WaitDisablingSlave;
        } else if self.state == SlaveState::MasterNone {
            self.state = SlaveState::SlaveDisabled;
        }
    }

    pub fn restart_cyclic(&mut self) {
        if matches!(self.state, SlaveState::SlaveDisabled | SlaveState::WaitDisablingSlave) {
            self.state = SlaveState::MasterNone;
            self.disable_reason = None;
        }
    }

    pub fn tick(
        &mut self,
        now: u32,
        net: &mut dyn NetworkInterface,
        store: &mut CyclicStore,
        cfg: &SlaveConfig,
        callbacks: &mut SlaveCallbacks,
    ) {
        self.check_watchdog(now, callbacks);

        let Some(handle) = self.socket else { return };
        let dgram = match net.udp_recv(handle) {
            Ok(Some(d)) => d,
            Ok(None) => return,
            Err(e) => {
                log::warn!("ccie fb recv failed: {}", e);
                return;
            }
        };

        if self.state == SlaveState::SlaveDisabled {
            log::debug!("dropping cyclic frame while disabled, peer {:#010x}", dgram.src_ip);
            return;
        }

        let Some(req) = iefb_codec::parse_request(&dgram.bytes) else {
            log::debug!("dropped malformed/invalid cciefb request from {:#010x}", dgram.src_ip);
            return;
        };

        let own_ip = if cfg.iefb_ip_addr != 0 { cfg.iefb_ip_addr } else { dgram.dst_ip };

        if self.state == SlaveState::WaitDisablingSlave {
            self.send_error(net, req.master_id, &req, cfg, store, self.disable_reason.unwrap().endcode());
            return;
        }

        let Some((event, station_index)) = self.classify(&req, cfg, own_ip, now) else {
            return;
        };

        let (next_state, action) = transition(self.state, event);
        let prev_state = self.state;
        self.state = next_state;

        match action {
            Action::None => {}
            Action::SendNormalResponseAndConnectCb => {
                self.connection = MasterConnection {
                    master_ip: req.master_id,
                    protocol_ver: req.protocol_ver,
                    group_no: req.group_no,
                    slave_station_no: station_index as u16 + 1,
                    total_occupied_in_group: req.slave_total_occupied_count,
                    parameter_no: req.parameter_no,
                    timeout_ms: req.timeout_value_ms,
                    parallel_off_timeout_count: req.parallel_off_count,
                    clock_info: req.clock_info,
                    last_seen_us: now,
                    master_local_unit_info: req.master_local_unit_info,
                };
                store.copy_cyclic_data_from_request(&req, self.connection.slave_station_no, req.cyclic_transmission_state & (1 << station_index) == 0);
                self.send_normal(net, &req, cfg, store, own_ip);
                if let Some(cb) = callbacks.connect.as_mut() {
                    cb(req.group_no, self.connection.slave_station_no, req.master_id);
                }
                self.emit_master_running(callbacks, true);
            }
            Action::SendNormalResponse => {
                self.connection.last_seen_us = now;
                self.connection.master_local_unit_info = req.master_local_unit_info;
                let transmission_bit = req.cyclic_transmission_state & (1 << station_index) == 0;
                store.copy_cyclic_data_from_request(&req, self.connection.slave_station_no, transmission_bit);
                self.send_normal(net, &req, cfg, store, own_ip);
                self.emit_master_running(callbacks, true);
            }
            Action::SendErrorToSender(endcode, msg) => {
                self.send_error(net, req.master_id, &req, cfg, store, endcode);
                if self.limiter.should_run_now((msg, req.master_id), now) {
                    if let Some(cb) = callbacks.error.as_mut() {
                        cb(msg, req.master_id, req.slave_total_occupied_count);
                    }
                }
                if prev_state == SlaveState::MasterControl {
                    self.connection.clear();
                    self.emit_master_running(callbacks, false);
                    if let Some(cb) = callbacks.disconnect.as_mut() {
                        cb(req.master_id);
                    }
                }
            }
            Action::SendErrorToIntruder(endcode, msg) => {
                self.send_error(net, req.master_id, &req, cfg, store, endcode);
                if self.limiter.should_run_now((msg, req.master_id), now) {
                    if let Some(cb) = callbacks.error.as_mut() {
                        cb(msg, req.master_id, 0);
                    }
                }
            }
            Action::DisconnectSequence => {
                let old_master = self.connection.master_ip;
                self.connection.clear();
                self.emit_master_running(callbacks, false);
                if let Some(cb) = callbacks.disconnect.as_mut() {
                    cb(old_master);
                }
            }
            Action::NoResponseStationDuplication => {
                log::warn!("slave station duplication reported by master {:#010x}", req.master_id);
                if self.limiter.should_run_now((ErrorMessage::SlaveStationDuplication, req.master_id), now) {
                    if let Some(cb) = callbacks.error.as_mut() {
                        cb(ErrorMessage::SlaveStationDuplication, 0, 0);
                    }
                }
            }
        }
    }

    fn check_watchdog(&mut self, now: u32, callbacks: &mut SlaveCallbacks) {
        if self.state != SlaveState::MasterControl {
            return;
        }
        let period = self.connection.watchdog_period_us();
        let elapsed = now.wrapping_sub(self.connection.last_seen_us);
        if (elapsed as i32) >= period as i32 && period > 0 {
            log::warn!("master {:#010x} timed out", self.connection.master_ip);
            let old_master = self.connection.master_ip;
            self.connection.clear();
            self.state = SlaveState::MasterNone;
            self.emit_master_running(callbacks, false);
            if let Some(cb) = callbacks.disconnect.as_mut() {
                cb(old_master);
            }
        }
    }

    /// Classify an incoming, codec-validated request into an event plus
    /// the (0-based) index of our station slot. Returns `None` for a
    /// silent drop (no matching slot, or a frame-sequence reset to 0
    /// while already connected to the current master — warn and drop,
    /// let the watchdog recover if the condition persists).
    fn classify(&mut self, req: &CcIefbRequest, cfg: &SlaveConfig, own_ip: u32, now: u32) -> Option<(SlaveEvent, usize)> {
        if self.connection.is_valid() && req.master_id != self.connection.master_ip {
            // still need a station index to report a sensible response size; reuse 0
            return Some((SlaveEvent::CyclicWrongMaster, 0));
        }

        let station_index = req.stations.iter().position(|s| s.slave_id == own_ip)?;

        if req.cyclic_transmission_state & (1 << station_index) != 0 {
            return Some((SlaveEvent::StationDuplication, station_index));
        }

        if self.state == SlaveState::MasterControl
            && self.connection.is_valid()
            && req.master_id == self.connection.master_ip
            && req.frame_sequence_no == 0
        {
            if self.limiter.should_run_now((ErrorMessage::FrameSequenceReset, req.master_id), now) {
                log::warn!("frame_sequence_no reset while connected to {:#010x}, dropping", req.master_id);
            }
            return None;
        }

        let n = cfg.num_occupied_stations;
        let fits = (station_index as u16 + n) <= req.slave_total_occupied_count;
        if !fits || req.slave_total_occupied_count > crate::iefb_codec::MAX_STATIONS {
            return Some((SlaveEvent::CyclicWrongStationCount, station_index));
        }

        if !self.connection.is_valid() || req.parameter_no != self.connection.parameter_no {
            return Some((SlaveEvent::CyclicNewMaster, station_index));
        }

        Some((SlaveEvent::CyclicCorrectMaster, station_index))
    }

    fn emit_master_running(&mut self, callbacks: &mut SlaveCallbacks, connected: bool) {
        let protocol_ver = if connected { self.connection.protocol_ver } else { 0 };
        let raw_status = if connected { self.connection.master_local_unit_info } else { 0 };
        let normalized = filter_master_state(connected, protocol_ver, raw_status);
        if Some(normalized) != self.last_master_running {
            self.last_master_running = Some(normalized);
            if let Some(cb) = callbacks.master_running.as_mut() {
                cb(normalized);
            }
        }
    }

    fn build_response_common(&self, req: &CcIefbRequest, cfg: &SlaveConfig, store: &CyclicStore, own_ip: u32, endcode: EndCode) -> CcIefbResponse {
        CcIefbResponse {
            serial: req.serial,
            endcode: endcode as u16,
            vendor_code: cfg.vendor_code,
            model_code: cfg.model_code,
            equipment_ver: cfg.equipment_ver,
            slave_protocol_ver: req.protocol_ver,
            slave_local_unit_info: self.slave_application_status as u16,
            slave_err_code: self.slave_err_code,
            local_management_info: self.local_management_info,
            slave_id: own_ip,
            group_no: req.group_no,
            frame_sequence_no: req.frame_sequence_no,
            rx: store.rx_areas(),
            rwr: store.rwr_areas(),
        }
    }

    fn send_normal(&mut self, net: &mut dyn NetworkInterface, req: &CcIefbRequest, cfg: &SlaveConfig, store: &CyclicStore, own_ip: u32) {
        let resp = self.build_response_common(req, cfg, store, own_ip, EndCode::Success);
        let buf = iefb_codec::build_response(&resp);
        self.send_to(net, req.master_id, &buf);
    }

    fn send_error(&mut self, net: &mut dyn NetworkInterface, dst_ip: u32, req: &CcIefbRequest, cfg: &SlaveConfig, store: &CyclicStore, endcode: EndCode) {
        let own_ip = if cfg.iefb_ip_addr != 0 { cfg.iefb_ip_addr } else { dst_ip };
        let resp = self.build_response_common(req, cfg, store, own_ip, endcode);
        let buf = iefb_codec::build_response(&resp);
        self.send_to(net, dst_ip, &buf);
    }

    fn send_to(&mut self, net: &mut dyn NetworkInterface, dst_ip: u32, buf: &[u8]) {
        let Some(handle) = self.socket else { return };
        match net.udp_send(handle, dst_ip, CL_IEFB_PORT, buf) {
            Ok(n) if n == buf.len() => {}
            Ok(_) => log::warn!("short write sending cciefb response to {:#010x}", dst_ip),
            Err(e) => log::warn!("failed to send cciefb response to {:#010x}: {}", dst_ip, e),
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

//! SLMP slave engine: dispatches node-search and set-IP requests on the
//! persistent SLMP socket, and fires the scheduled node-search response
//! when its randomized delay elapses.

use crate::config::{SlaveCallbacks, SlaveConfig, CL_SLMP_PORT};
use crate::iface::{NetworkInterface, SocketHandle};
use crate::net::{directed_broadcast, node_search_delay_us};
use crate::slmp_codec::{self, MacAddr, SlmpErrorResponse, SlmpRequestKind};
use crate::types::EndCode;

const LOCAL_BROADCAST: u32 = 0xFFFF_FFFF;

/// A scheduled node-search response, recorded on receipt of a node-search
/// request and fired once its randomized delay elapses.
#[derive(Debug, Clone)]
struct NodeSearchPending {
    master_mac: MacAddr,
    master_ip: u32,
    master_port: u16,
    serial: u16,
    slave_mac: MacAddr,
    slave_ip: u32,
    slave_netmask: u32,
    fire_at_us: u32,
}

pub struct SlmpEngine {
    socket: Option<SocketHandle>,
    pending: Option<NodeSearchPending>,
}

impl SlmpEngine {
    pub fn new() -> Self {
        Self { socket: None, pending: None }
    }

    pub fn init(&mut self, net: &mut dyn NetworkInterface) -> std::io::Result<()> {
        let handle = net.udp_open(0, CL_SLMP_PORT)?;
        self.socket = Some(handle);
        self.pending = None;
        Ok(())
    }

    pub fn exit(&mut self, net: &mut dyn NetworkInterface) {
        if let Some(h) = self.socket.take() {
            net.udp_close(h);
        }
        self.pending = None;
    }

    pub fn periodic(&mut self, now: u32, net: &mut dyn NetworkInterface, cfg: &SlaveConfig, callbacks: &mut SlaveCallbacks) {
        self.fire_pending_node_search_response(now, net, cfg);

        let Some(handle) = self.socket else { return };
        let dgram = match net.udp_recv(handle) {
            Ok(Some(d)) => d,
            Ok(None) => return,
            Err(e) => {
                log::warn!("slmp recv failed: {}", e);
                return;
            }
        };

        let Some(kind) = slmp_codec::peek_request(&dgram.bytes) else {
            log::debug!("dropped malformed slmp frame from {:#010x}", dgram.src_ip);
            return;
        };

        match (kind.command, kind.sub_command) {
            (slmp_codec::SLMP_COMMAND_NODE_SEARCH, 0) => {
                self.handle_node_search(now, net, &dgram, kind, callbacks);
            }
            (slmp_codec::SLMP_COMMAND_NODE_IPADDRESS_SET, 0) => {
                self.handle_set_ip(net, &dgram, kind, cfg, callbacks);
            }
            _ => {
                log::debug!("dropped slmp frame with unknown command {:#06x}", kind.command);
            }
        }
    }

    fn handle_node_search(
        &mut self,
        now: u32,
        net: &mut dyn NetworkInterface,
        dgram: &crate::iface::RecvDatagram,
        kind: SlmpRequestKind,
        callbacks: &mut SlaveCallbacks,
    ) {
        let Some(req) = slmp_codec::parse_node_search_request(&dgram.bytes) else {
            log::debug!("invalid node search request from {:#010x}", dgram.src_ip);
            return;
        };
        if req.master_ip != dgram.src_ip {
            log::warn!(
                "node search master_ip {:#010x} does not match source address {:#010x}",
                req.master_ip,
                dgram.src_ip
            );
            return;
        }

        let Ok(slave_mac) = net.get_mac(dgram.ifindex) else {
            log::warn!("failed to read local MAC for ifindex {}", dgram.ifindex);
            return;
        };
        let Ok(slave_netmask) = net.get_netmask(dgram.ifindex) else {
            log::warn!("failed to read local netmask for ifindex {}", dgram.ifindex);
            return;
        };

        let delay_us = node_search_delay_us(slave_mac);
        self.pending = Some(NodeSearchPending {
            master_mac: req.master_mac,
            master_ip: req.master_ip,
            master_port: dgram.src_port,
            serial: kind.serial,
            slave_mac,
            slave_ip: dgram.dst_ip,
            slave_netmask,
            fire_at_us: now.wrapping_add(delay_us),
        });

        if let Some(cb) = callbacks.node_search.as_mut() {
            cb(req.master_ip);
        }
    }

    fn fire_pending_node_search_response(&mut self, now: u32, net: &mut dyn NetworkInterface, cfg: &SlaveConfig) {
        let Some(pending) = &self.pending else { return };
        if (now.wrapping_sub(pending.fire_at_us) as i32) < 0 {
            return;
        }
        let pending = self.pending.take().unwrap();

        let resp = slmp_codec::NodeSearchResponse {
            serial: pending.serial,
            master_mac: pending.master_mac,
            master_ip: pending.master_ip,
            slave_mac: pending.slave_mac,
            slave_ip: pending.slave_ip,
            slave_netmask: pending.slave_netmask,
            slave_status: 0,
            vendor_code: cfg.vendor_code,
            model_code: cfg.model_code,
            equipment_ver: cfg.equipment_ver,
            slave_port: CL_SLMP_PORT,
        };
        let buf = slmp_codec::build_node_search_response(&resp);

        let broadcast = if cfg.use_slmp_directed_broadcast {
            directed_broadcast(pending.slave_ip, pending.slave_netmask)
        } else {
            LOCAL_BROADCAST
        };

        self.send_one_shot(net, pending.slave_ip, broadcast, pending.master_port, &buf);
    }

    fn handle_set_ip(
        &mut self,
        net: &mut dyn NetworkInterface,
        dgram: &crate::iface::RecvDatagram,
        kind: SlmpRequestKind,
        cfg: &SlaveConfig,
        callbacks: &mut SlaveCallbacks,
    ) {
        let Some(req) = slmp_codec::parse_set_ip_request(&dgram.bytes) else {
            log::debug!("invalid set-ip request from {:#010x}", dgram.src_ip);
            return;
        };

        let Ok(my_mac) = net.get_mac(dgram.ifindex) else {
            log::warn!("failed to read local MAC for ifindex {}", dgram.ifindex);
            return;
        };
        if req.slave_mac != my_mac {
            log::debug!("set-ip request addressed to a different slave MAC, ignoring");
            return;
        }
        if req.master_ip != dgram.src_ip {
            log::warn!(
                "set-ip master_ip {:#010x} does not match source address {:#010x}",
                req.master_ip,
                dgram.src_ip
            );
            return;
        }

        let mut successful = cfg.ip_setting_allowed;
        if cfg.ip_setting_allowed {
            if let Err(e) = net.set_network_settings(dgram.ifindex, req.new_ip, req.new_netmask) {
                log::warn!("failed to apply new network settings: {}", e);
                successful = false;
            }
        } else {
            log::warn!("set-ip request denied by configuration");
        }

        let resulting_local_ip = if successful { req.new_ip } else { dgram.dst_ip };
        let broadcast = if cfg.use_slmp_directed_broadcast {
            directed_broadcast(req.new_ip, req.new_netmask)
        } else {
            LOCAL_BROADCAST
        };

        let buf = if successful {
            slmp_codec::build_set_ip_response(&slmp_codec::SetIpResponse {
                serial: kind.serial,
                master_mac: req.master_mac,
            })
        } else {
            slmp_codec::build_error_response(&SlmpErrorResponse {
                serial: kind.serial,
                endcode: EndCode::CommandRequestMsg as u16,
                command: slmp_codec::SLMP_COMMAND_NODE_IPADDRESS_SET,
                sub_command: 0,
            })
        };

        self.send_one_shot(net, resulting_local_ip, broadcast, dgram.src_port, &buf);

        if let Some(cb) = callbacks.set_ip.as_mut() {
            cb(cfg.ip_setting_allowed, cfg.ip_setting_allowed && successful);
        }
    }

    /// Open a transient send socket bound to `local_ip`, send, close.
    fn send_one_shot(&mut self, net: &mut dyn NetworkInterface, local_ip: u32, dst_ip: u32, dst_port: u16, buf: &[u8]) {
        let handle = match net.udp_open(local_ip, CL_SLMP_PORT) {
            Ok(h) => h,
            Err(e) => {
                log::warn!("failed to open transient slmp send socket on {:#010x}: {}", local_ip, e);
                return;
            }
        };
        match net.udp_send(handle, dst_ip, dst_port, buf) {
            Ok(n) if n == buf.len() => {}
            Ok(_) => log::warn!("short write sending slmp response to {:#010x}", dst_ip),
            Err(e) => log::warn!("failed to send slmp response to {:#010x}: {}", dst_ip, e),
        }
        net.udp_close(handle);
    }
}

impl Default for SlmpEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeNetwork;

    fn base_config() -> SlaveConfig {
        SlaveConfig {
            vendor_code: 0x1067,
            model_code: 0x8765_4321,
            equipment_ver: 2,
            num_occupied_stations: 2,
            ip_setting_allowed: true,
            iefb_ip_addr: 0xC0A8_00C9,
            use_slmp_directed_broadcast: false,
        }
    }

    #[test]
    fn node_search_schedules_delayed_response_and_fires_callback() {
        use std::cell::Cell;
        use std::rc::Rc;

        let mut net = FakeNetwork::new();
        net.set_local_mac([0x28, 0xE9, 0x8E, 0x2F, 0xE4, 0xB7]);
        net.set_local_netmask(0xFFFF_FF00);
        let mut engine = SlmpEngine::new();
        engine.init(&mut net).unwrap();
        let cfg = base_config();
        let mut callbacks = SlaveCallbacks::new();
        let seen_master_ip = Rc::new(Cell::new(0u32));
        let seen_master_ip_cb = seen_master_ip.clone();
        callbacks.node_search = Some(Box::new(move |ip| seen_master_ip_cb.set(ip)));

        let buf = slmp_codec::build_node_search_request(&slmp_codec::NodeSearchRequest {
            serial: 1,
            master_mac: [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xF0],
            master_ip: 0xC0A8_00FA,
        });
        net.push_recv(0xC0A8_00FA, 34576, 0xC0A8_00C9, crate::config::CL_SLMP_PORT, 1, buf);

        engine.periodic(0, &mut net, &cfg, &mut callbacks);
        assert!(engine.pending.is_some());
        assert_eq!(seen_master_ip.get(), 0xC0A8_00FA);

        // Not yet due: MAC E4:B7 derives a 948 ms delay.
        engine.periodic(947_999, &mut net, &cfg, &mut callbacks);
        assert!(net.sent.is_empty());

        engine.periodic(948_000, &mut net, &cfg, &mut callbacks);
        assert_eq!(net.sent.len(), 1);
        let (_, dst_ip, dst_port, sent) = &net.sent[0];
        assert_eq!(*dst_ip, 0xFFFF_FFFF);
        assert_eq!(*dst_port, 34576);
        assert_eq!(sent.len(), slmp_codec::NODE_SEARCH_RESPONSE_LEN);
        let resp = slmp_codec::parse_node_search_response(sent).expect("parses");
        assert_eq!(resp.slave_ip, 0xC0A8_00C9);
        assert_eq!(resp.vendor_code, cfg.vendor_code);
    }

    #[test]
    fn set_ip_denied_sends_error_response() {
        let mut net = FakeNetwork::new();
        let my_mac = [0x28, 0xE9, 0x8E, 0x2F, 0xE4, 0xB7];
        net.set_local_mac(my_mac);
        let mut engine = SlmpEngine::new();
        engine.init(&mut net).unwrap();
        let mut cfg = base_config();
        cfg.ip_setting_allowed = false;
        let mut allowed_arg = None;
        let mut succeeded_arg = None;
        let mut callbacks = SlaveCallbacks::new();

        let req = slmp_codec::SetIpRequest {
            serial: 9,
            master_mac: [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xF0],
            master_ip: 0xC0A8_00FA,
            slave_mac: my_mac,
            new_ip: 0x0A00_0005,
            new_netmask: 0xFF00_0000,
        };
        let buf = slmp_codec::build_set_ip_request(&req);
        net.push_recv(0xC0A8_00FA, 2000, 0xC0A8_00C9, crate::config::CL_SLMP_PORT, 1, buf);

        callbacks.set_ip = Some(Box::new(move |allowed, succeeded| {
            allowed_arg.replace(allowed);
            succeeded_arg.replace(succeeded);
        }));

        engine.periodic(0, &mut net, &cfg, &mut callbacks);

        assert_eq!(net.sent.len(), 1);
        let (_, _, _, sent) = &net.sent[0];
        assert_eq!(sent.len(), slmp_codec::ERROR_RESPONSE_LEN);
        let parsed = slmp_codec::parse_error_response(sent).expect("parses");
        assert_eq!(parsed.endcode, 0xC059);
        assert!(!net.network_settings_applied);
    }
}

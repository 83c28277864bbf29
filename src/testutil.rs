//! In-memory `NetworkInterface` for unit and integration tests. Not part
//! of the public API; every socket is just a per-port FIFO queue so
//! tests can push a datagram then drive `periodic`/`tick` and inspect
//! what got sent back.

use std::collections::{HashMap, VecDeque};

use crate::iface::{NetworkInterface, RecvDatagram, SocketHandle};

pub struct FakeNetwork {
    mac: [u8; 6],
    netmask: u32,
    next_handle: SocketHandle,
    bound_port: HashMap<SocketHandle, u16>,
    inbox: HashMap<u16, VecDeque<RecvDatagram>>,
    pub sent: Vec<(SocketHandle, u32, u16, Vec<u8>)>,
    pub network_settings_applied: bool,
    pub last_network_settings: Option<(u32, u32, u32)>,
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self {
            mac: [0; 6],
            netmask: 0xFFFF_FF00,
            next_handle: 0,
            bound_port: HashMap::new(),
            inbox: HashMap::new(),
            sent: Vec::new(),
            network_settings_applied: false,
            last_network_settings: None,
        }
    }

    pub fn set_local_mac(&mut self, mac: [u8; 6]) {
        self.mac = mac;
    }

    pub fn set_local_netmask(&mut self, mask: u32) {
        self.netmask = mask;
    }

    /// Queue a datagram for delivery to whichever socket is bound to
    /// `dst_port`.
    pub fn push_recv(&mut self, src_ip: u32, src_port: u16, dst_ip: u32, dst_port: u16, ifindex: u32, bytes: Vec<u8>) {
        self.inbox.entry(dst_port).or_default().push_back(RecvDatagram {
            src_ip,
            src_port,
            dst_ip,
            ifindex,
            bytes,
        });
    }
}

impl Default for FakeNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkInterface for FakeNetwork {
    fn udp_open(&mut self, _bind_ip: u32, port: u16) -> std::io::Result<SocketHandle> {
        let handle = self.next_handle;
        self.next_handle += 1;
        self.bound_port.insert(handle, port);
        self.inbox.entry(port).or_default();
        Ok(handle)
    }

    fn udp_recv(&mut self, handle: SocketHandle) -> std::io::Result<Option<RecvDatagram>> {
        let Some(port) = self.bound_port.get(&handle) else {
            return Ok(None);
        };
        Ok(self.inbox.get_mut(port).and_then(|q| q.pop_front()))
    }

    fn udp_send(&mut self, handle: SocketHandle, dst_ip: u32, dst_port: u16, bytes: &[u8]) -> std::io::Result<usize> {
        self.sent.push((handle, dst_ip, dst_port, bytes.to_vec()));
        Ok(bytes.len())
    }

    fn udp_close(&mut self, handle: SocketHandle) {
        self.bound_port.remove(&handle);
    }

    fn get_mac(&self, _ifindex: u32) -> std::io::Result<[u8; 6]> {
        Ok(self.mac)
    }

    fn get_netmask(&self, _ifindex: u32) -> std::io::Result<u32> {
        Ok(self.netmask)
    }

    fn set_network_settings(&mut self, ifindex: u32, ip: u32, netmask: u32) -> std::io::Result<()> {
        self.network_settings_applied = true;
        self.last_network_settings = Some((ifindex, ip, netmask));
        self.netmask = netmask;
        Ok(())
    }

    fn now_micros(&self) -> u32 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recv_is_scoped_to_the_bound_port() {
        let mut net = FakeNetwork::new();
        let iefb = net.udp_open(0, 61450).unwrap();
        let slmp = net.udp_open(0, 61451).unwrap();

        net.push_recv(1, 2, 3, 61451, 0, vec![9, 9]);
        assert!(net.udp_recv(iefb).unwrap().is_none());
        let d = net.udp_recv(slmp).unwrap().expect("queued for slmp port");
        assert_eq!(d.bytes, vec![9, 9]);
    }

    #[test]
    fn send_is_recorded() {
        let mut net = FakeNetwork::new();
        let h = net.udp_open(0, 61450).unwrap();
        net.udp_send(h, 0xC0A8_0001, 61450, &[1, 2, 3]).unwrap();
        assert_eq!(net.sent.len(), 1);
        assert_eq!(net.sent[0].3, vec![1, 2, 3]);
    }
}

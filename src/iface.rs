//! The only OS coupling point the core requires. A host implements this
//! trait over whatever socket/timer primitives its platform offers; the
//! core never touches a raw file descriptor directly.

/// Opaque handle to an open, non-blocking UDP socket.
pub type SocketHandle = u32;

/// One received datagram, plus the local delivery context the CCIEFB and
/// SLMP engines need (the interface index drives MAC/netmask lookups, and
/// the local IP the datagram was delivered to may differ from the bind
/// address when bound to `0.0.0.0`).
#[derive(Debug, Clone)]
pub struct RecvDatagram {
    pub src_ip: u32,
    pub src_port: u16,
    pub dst_ip: u32,
    pub ifindex: u32,
    pub bytes: Vec<u8>,
}

/// The thin network/OS abstraction the core consumes. Every method is
/// expected to be non-blocking and allocation-free on the hot path except
/// `udp_recv`'s returned buffer.
pub trait NetworkInterface {
    /// Open a non-blocking UDP socket bound to `bind_ip:port`.
    fn udp_open(&mut self, bind_ip: u32, port: u16) -> std::io::Result<SocketHandle>;

    /// Non-blocking receive. `Ok(None)` means "no datagram pending", not
    /// an error.
    fn udp_recv(&mut self, handle: SocketHandle) -> std::io::Result<Option<RecvDatagram>>;

    /// Send `bytes` to `dst_ip:dst_port`. Returns the number of bytes
    /// actually written; a short write is treated by the core as a
    /// failure (logged, non-fatal, no state change).
    fn udp_send(&mut self, handle: SocketHandle, dst_ip: u32, dst_port: u16, bytes: &[u8]) -> std::io::Result<usize>;

    /// Idempotent.
    fn udp_close(&mut self, handle: SocketHandle);

    fn get_mac(&self, ifindex: u32) -> std::io::Result<[u8; 6]>;

    fn get_netmask(&self, ifindex: u32) -> std::io::Result<u32>;

    fn set_network_settings(&mut self, ifindex: u32, ip: u32, netmask: u32) -> std::io::Result<()>;

    /// Free-running monotonic microsecond counter.
    fn now_micros(&self) -> u32;
}

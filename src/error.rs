use std::net::Ipv4Addr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("num_occupied_stations {got} out of range 1..={max}")]
    InvalidStationCount { got: u16, max: u16 },
    #[error("invalid {field} address: {}", Ipv4Addr::from(*addr))]
    InvalidIpAddress { field: &'static str, addr: u32 },
    #[error("invalid netmask: {}", Ipv4Addr::from(*addr))]
    InvalidNetmask { addr: u32 },
    #[error("could not open socket on port {port}")]
    SocketOpen {
        port: u16,
        #[source]
        source: std::io::Error,
    },
}

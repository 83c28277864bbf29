#[macro_use]
extern crate num_derive;

mod config;
mod error;
mod iefb_codec;
mod iefb_engine;
mod iefb_store;
mod iface;
mod net;
mod slave;
mod slmp_codec;
mod slmp_engine;
mod timer;
mod types;

#[cfg(test)]
mod testutil;

pub use self::{
    config::{SlaveCallbacks, SlaveConfig, CLS_MAX_OCCUPIED_STATIONS, CL_IEFB_PORT, CL_SLMP_PORT},
    error::Error,
    iface::{NetworkInterface, RecvDatagram, SocketHandle},
    slave::Slave,
    types::{
        ApplOperationStatus, DisableReason, EndCode, ErrorMessage, MasterConnection, MasterRunningState,
        SlaveEvent, SlaveState, SlmpCommand,
    },
};

pub type Result<T> = std::result::Result<T, Error>;

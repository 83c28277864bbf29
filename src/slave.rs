//! Slave façade: the single type a host embeds. Owns both engines and
//! the cyclic store, drives them from one `periodic(now)` call with
//! SLMP dispatched ahead of CCIEFB so a pending IP change lands before
//! the next cyclic exchange, and exposes the memory-area and status
//! accessors a CCIEFB application needs between ticks.

use crate::config::{SlaveCallbacks, SlaveConfig};
use crate::error::Error;
use crate::iefb_engine::Engine as IefbEngine;
use crate::iefb_store::CyclicStore;
use crate::iface::NetworkInterface;
use crate::slmp_engine::SlmpEngine;
use crate::types::{ApplOperationStatus, MasterConnection, MasterRunningState};

pub type Result<T> = std::result::Result<T, Error>;

/// Owns the CCIEFB + SLMP engines and the cyclic memory areas for one
/// slave station group. Created with [`Slave::init`], driven with
/// [`Slave::periodic`], torn down with [`Slave::exit`].
pub struct Slave {
    cfg: SlaveConfig,
    iefb: IefbEngine,
    slmp: SlmpEngine,
    store: CyclicStore,
}

impl Slave {
    /// Validate `cfg`, open both sockets and start the state machine at
    /// `MasterNone`.
    pub fn init(cfg: SlaveConfig, net: &mut dyn NetworkInterface) -> Result<Self> {
        cfg.validate()?;

        let mut iefb = IefbEngine::new();
        iefb.init(net, &cfg).map_err(|source| Error::SocketOpen {
            port: crate::config::CL_IEFB_PORT,
            source,
        })?;

        let mut slmp = SlmpEngine::new();
        if let Err(source) = slmp.init(net) {
            iefb.exit(net);
            return Err(Error::SocketOpen {
                port: crate::config::CL_SLMP_PORT,
                source,
            });
        }

        let store = CyclicStore::new(cfg.num_occupied_stations);
        Ok(Self { cfg, iefb, slmp, store })
    }

    /// Drive one tick: SLMP dispatch first, then CCIEFB cyclic
    /// processing.
    pub fn periodic(&mut self, now: u32, net: &mut dyn NetworkInterface, callbacks: &mut SlaveCallbacks) {
        self.slmp.periodic(now, net, &self.cfg, callbacks);
        self.iefb.tick(now, net, &mut self.store, &self.cfg, callbacks);
    }

    pub fn exit(&mut self, net: &mut dyn NetworkInterface) {
        self.slmp.exit(net);
        self.iefb.exit(net);
    }

    pub fn stop_cyclic(&mut self, is_error: bool) {
        self.iefb.stop_cyclic(is_error);
    }

    pub fn restart_cyclic(&mut self) {
        self.iefb.restart_cyclic();
    }

    pub fn get_master_connection_details(&self) -> Option<MasterConnection> {
        self.iefb.master_connection()
    }

    /// The master's own clock snapshot from the last validated frame,
    /// or `None` if no master is currently connected.
    pub fn get_master_timestamp(&self) -> Option<u64> {
        self.iefb.master_connection().map(|c| c.clock_info)
    }

    pub fn master_running_state(&self) -> Option<MasterRunningState> {
        self.iefb.master_connection().map(|c| {
            crate::types::filter_master_state(true, c.protocol_ver, c.master_local_unit_info)
        })
    }

    pub fn slave_application_status(&self) -> ApplOperationStatus {
        self.iefb.slave_application_status()
    }

    pub fn set_slave_application_status(&mut self, status: ApplOperationStatus) {
        self.iefb.set_slave_application_status(status);
    }

    pub fn local_management_info(&self) -> u32 {
        self.iefb.local_management_info()
    }

    pub fn set_local_management_info(&mut self, v: u32) {
        self.iefb.set_local_management_info(v);
    }

    pub fn slave_error_code(&self) -> u16 {
        self.iefb.slave_error_code()
    }

    pub fn set_slave_error_code(&mut self, v: u16) {
        self.iefb.set_slave_error_code(v);
    }

    pub fn get_rx_bit(&self, n: usize) -> bool {
        self.store.get_rx_bit(n)
    }

    pub fn set_rx_bit(&mut self, n: usize, value: bool) {
        self.store.set_rx_bit(n, value);
    }

    pub fn get_ry_bit(&self, n: usize) -> bool {
        self.store.get_ry_bit(n)
    }

    pub fn get_rwr_word(&self, n: usize) -> u16 {
        self.store.get_rwr_word(n)
    }

    pub fn set_rwr_word(&mut self, n: usize, value: u16) {
        self.store.set_rwr_word(n, value);
    }

    pub fn get_rww_word(&self, n: usize) -> u16 {
        self.store.get_rww_word(n)
    }
}

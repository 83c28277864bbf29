//! SLMP frame codec: node-search request/response, set-IP request/
//! response and the generic error response. Shares its 19-byte request
//! / 15-byte response common headers with `iefb_codec` (both protocols
//! are carried by the same preamble), but keeps its own header
//! parse/build since the two codecs otherwise diverge immediately after
//! the header. MAC fields in the payload are always byte-reversed
//! relative to Ethernet order; every crossing goes through
//! `crate::net::reverse_mac` exactly once.

use crate::net::{
    read_u16_be, read_u16_le, read_u32_le, reverse_mac, write_u16_be, write_u16_le, write_u32_le,
    LENGTH_FIELD_OFFSET,
};

pub type MacAddr = [u8; 6];

const SUB1_REQUEST: u16 = 0x5400;
const SUB1_RESPONSE: u16 = 0xD400;

const HEADER_NETWORK_NUMBER: u8 = 0x00;
const HEADER_UNIT_NUMBER: u8 = 0xFF;
const HEADER_IO_NUMBER: u16 = 0x03FF;
const HEADER_EXTENSION: u8 = 0x00;
const REQ_HEADER_TIMER: u16 = 0;

const REQ_HEADER_LEN: usize = 19;
const RESP_HEADER_LEN: usize = 15;

pub const SLMP_COMMAND_NODE_SEARCH: u16 = 0x0E30;
pub const SLMP_COMMAND_NODE_IPADDRESS_SET: u16 = 0x0E31;
const SUBCOMMAND: u16 = 0x0000;

const ADDRSIZE_IPV4: u8 = 4;
const PROTOCOL_IDENTIFIER_UDP: u8 = 1;
const SLAVE_HOSTNAME_SIZE: u8 = 0;
const DEFAULT_GATEWAY: u32 = 0xFFFF_FFFF;
const TARGET_IP_ADDR: u32 = 0xFFFF_FFFF;
const TARGET_PORT: u16 = 0xFFFF;

pub const NODE_SEARCH_REQUEST_LEN: usize = 30;
pub const NODE_SEARCH_RESPONSE_LEN: usize = 66;
pub const SET_IP_REQUEST_LEN: usize = 58;
pub const SET_IP_RESPONSE_LEN: usize = 21;
pub const ERROR_RESPONSE_LEN: usize = 24;

fn read_mac(buf: &[u8], at: usize) -> MacAddr {
    let mut mac = [0u8; 6];
    mac.copy_from_slice(&buf[at..at + 6]);
    reverse_mac(mac)
}

fn write_mac(buf: &mut [u8], at: usize, mac: MacAddr) {
    buf[at..at + 6].copy_from_slice(&reverse_mac(mac));
}

struct ReqHeader {
    serial: u16,
    command: u16,
    sub_command: u16,
}

/// Parse and validate the shared 19-byte SLMP request header. Does not
/// check `command`/`sub_command` against a known value — the caller
/// dispatches on those.
fn parse_req_header(buf: &[u8]) -> Option<ReqHeader> {
    if buf.len() < REQ_HEADER_LEN {
        return None;
    }
    if read_u16_be(buf, 0) != SUB1_REQUEST {
        return None;
    }
    let serial = read_u16_le(buf, 2);
    if read_u16_le(buf, 4) != 0 {
        return None;
    }
    if buf[6] != HEADER_NETWORK_NUMBER || buf[7] != HEADER_UNIT_NUMBER {
        return None;
    }
    if read_u16_le(buf, 8) != HEADER_IO_NUMBER || buf[10] != HEADER_EXTENSION {
        return None;
    }
    if read_u16_le(buf, 13) != REQ_HEADER_TIMER {
        return None;
    }
    let length = read_u16_le(buf, 11);
    if length as usize + LENGTH_FIELD_OFFSET as usize != buf.len() {
        return None;
    }
    let command = read_u16_le(buf, 15);
    let sub_command = read_u16_le(buf, 17);
    Some(ReqHeader { serial, command, sub_command })
}

fn build_req_header(buf: &mut [u8], serial: u16, command: u16, sub_command: u16, total_len: usize) {
    write_u16_be(buf, 0, SUB1_REQUEST);
    write_u16_le(buf, 2, serial);
    write_u16_le(buf, 4, 0);
    buf[6] = HEADER_NETWORK_NUMBER;
    buf[7] = HEADER_UNIT_NUMBER;
    write_u16_le(buf, 8, HEADER_IO_NUMBER);
    buf[10] = HEADER_EXTENSION;
    write_u16_le(buf, 11, (total_len - LENGTH_FIELD_OFFSET as usize) as u16);
    write_u16_le(buf, 13, REQ_HEADER_TIMER);
    write_u16_le(buf, 15, command);
    write_u16_le(buf, 17, sub_command);
}

fn parse_resp_header(buf: &[u8]) -> Option<(u16, u16)> {
    if buf.len() < RESP_HEADER_LEN {
        return None;
    }
    if read_u16_be(buf, 0) != SUB1_RESPONSE {
        return None;
    }
    let serial = read_u16_le(buf, 2);
    if read_u16_le(buf, 4) != 0 {
        return None;
    }
    if buf[6] != HEADER_NETWORK_NUMBER || buf[7] != HEADER_UNIT_NUMBER {
        return None;
    }
    if read_u16_le(buf, 8) != HEADER_IO_NUMBER || buf[10] != HEADER_EXTENSION {
        return None;
    }
    let length = read_u16_le(buf, 11);
    if length as usize + LENGTH_FIELD_OFFSET as usize != buf.len() {
        return None;
    }
    let endcode = read_u16_le(buf, 13);
    Some((serial, endcode))
}

fn build_resp_header(buf: &mut [u8], serial: u16, endcode: u16, total_len: usize) {
    write_u16_be(buf, 0, SUB1_RESPONSE);
    write_u16_le(buf, 2, serial);
    write_u16_le(buf, 4, 0);
    buf[6] = HEADER_NETWORK_NUMBER;
    buf[7] = HEADER_UNIT_NUMBER;
    write_u16_le(buf, 8, HEADER_IO_NUMBER);
    buf[10] = HEADER_EXTENSION;
    write_u16_le(buf, 11, (total_len - LENGTH_FIELD_OFFSET as usize) as u16);
    write_u16_le(buf, 13, endcode);
}

/// Dispatch-only view of an incoming SLMP request: just enough to route
/// to the right frame-specific parser.
#[derive(Debug, Clone, Copy)]
pub struct SlmpRequestKind {
    pub serial: u16,
    pub command: u16,
    pub sub_command: u16,
}

pub fn peek_request(buf: &[u8]) -> Option<SlmpRequestKind> {
    let h = parse_req_header(buf)?;
    Some(SlmpRequestKind {
        serial: h.serial,
        command: h.command,
        sub_command: h.sub_command,
    })
}

#[derive(Debug, Clone)]
pub struct NodeSearchRequest {
    pub serial: u16,
    pub master_mac: MacAddr,
    pub master_ip: u32,
}

/// Build a node-search request. Exists for tests and for a master-side
/// consumer of this codec; this crate's own engine only parses these.
pub fn build_node_search_request(r: &NodeSearchRequest) -> Vec<u8> {
    let mut buf = vec![0u8; NODE_SEARCH_REQUEST_LEN];
    build_req_header(&mut buf, r.serial, SLMP_COMMAND_NODE_SEARCH, SUBCOMMAND, NODE_SEARCH_REQUEST_LEN);
    write_mac(&mut buf, REQ_HEADER_LEN, r.master_mac);
    buf[REQ_HEADER_LEN + 6] = ADDRSIZE_IPV4;
    write_u32_le(&mut buf, REQ_HEADER_LEN + 7, r.master_ip);
    buf
}

pub fn parse_node_search_request(buf: &[u8]) -> Option<NodeSearchRequest> {
    if buf.len() != NODE_SEARCH_REQUEST_LEN {
        return None;
    }
    let h = parse_req_header(buf)?;
    if h.command != SLMP_COMMAND_NODE_SEARCH || h.sub_command != SUBCOMMAND {
        return None;
    }
    let master_mac = read_mac(buf, REQ_HEADER_LEN);
    let master_ip_addr_size = buf[REQ_HEADER_LEN + 6];
    if master_ip_addr_size != ADDRSIZE_IPV4 {
        return None;
    }
    let master_ip = read_u32_le(buf, REQ_HEADER_LEN + 7);
    if master_ip == 0 {
        return None;
    }
    Some(NodeSearchRequest {
        serial: h.serial,
        master_mac,
        master_ip,
    })
}

#[derive(Debug, Clone)]
pub struct NodeSearchResponse {
    pub serial: u16,
    pub master_mac: MacAddr,
    pub master_ip: u32,
    pub slave_mac: MacAddr,
    pub slave_ip: u32,
    pub slave_netmask: u32,
    pub slave_status: u16,
    pub vendor_code: u16,
    pub model_code: u32,
    pub equipment_ver: u16,
    pub slave_port: u16,
}

pub fn build_node_search_response(r: &NodeSearchResponse) -> Vec<u8> {
    let mut buf = vec![0u8; NODE_SEARCH_RESPONSE_LEN];
    build_resp_header(&mut buf, r.serial, 0, NODE_SEARCH_RESPONSE_LEN);

    let mut at = RESP_HEADER_LEN;
    write_mac(&mut buf, at, r.master_mac);
    at += 6;
    buf[at] = ADDRSIZE_IPV4;
    at += 1;
    write_u32_le(&mut buf, at, r.master_ip);
    at += 4;
    write_mac(&mut buf, at, r.slave_mac);
    at += 6;
    buf[at] = ADDRSIZE_IPV4;
    at += 1;
    write_u32_le(&mut buf, at, r.slave_ip);
    at += 4;
    write_u32_le(&mut buf, at, r.slave_netmask);
    at += 4;
    write_u32_le(&mut buf, at, DEFAULT_GATEWAY);
    at += 4;
    buf[at] = SLAVE_HOSTNAME_SIZE;
    at += 1;
    write_u16_le(&mut buf, at, r.vendor_code);
    at += 2;
    write_u32_le(&mut buf, at, r.model_code);
    at += 4;
    write_u16_le(&mut buf, at, r.equipment_ver);
    at += 2;
    buf[at] = ADDRSIZE_IPV4;
    at += 1;
    write_u32_le(&mut buf, at, TARGET_IP_ADDR);
    at += 4;
    write_u16_le(&mut buf, at, TARGET_PORT);
    at += 2;
    write_u16_le(&mut buf, at, r.slave_status);
    at += 2;
    write_u16_le(&mut buf, at, r.slave_port);
    at += 2;
    buf[at] = PROTOCOL_IDENTIFIER_UDP;
    at += 1;
    debug_assert_eq!(at, NODE_SEARCH_RESPONSE_LEN);

    buf
}

pub fn parse_node_search_response(buf: &[u8]) -> Option<NodeSearchResponse> {
    if buf.len() != NODE_SEARCH_RESPONSE_LEN {
        return None;
    }
    let (serial, _endcode) = parse_resp_header(buf)?;

    let mut at = RESP_HEADER_LEN;
    let master_mac = read_mac(buf, at);
    at += 6;
    if buf[at] != ADDRSIZE_IPV4 {
        return None;
    }
    at += 1;
    let master_ip = read_u32_le(buf, at);
    at += 4;
    let slave_mac = read_mac(buf, at);
    at += 6;
    if buf[at] != ADDRSIZE_IPV4 {
        return None;
    }
    at += 1;
    let slave_ip = read_u32_le(buf, at);
    at += 4;
    let slave_netmask = read_u32_le(buf, at);
    at += 4;
    let _gateway = read_u32_le(buf, at);
    at += 4;
    let _hostname_size = buf[at];
    at += 1;
    let vendor_code = read_u16_le(buf, at);
    at += 2;
    let model_code = read_u32_le(buf, at);
    at += 4;
    let equipment_ver = read_u16_le(buf, at);
    at += 2;
    if buf[at] != ADDRSIZE_IPV4 {
        return None;
    }
    at += 1;
    let target_ip = read_u32_le(buf, at);
    at += 4;
    let target_port = read_u16_le(buf, at);
    at += 2;
    let slave_status = read_u16_le(buf, at);
    at += 2;
    let slave_port = read_u16_le(buf, at);
    at += 2;
    let protocol_settings = buf[at];
    at += 1;
    debug_assert_eq!(at, NODE_SEARCH_RESPONSE_LEN);

    if slave_ip == 0
        || !crate::net::is_netmask_valid(slave_netmask)
        || master_ip == 0
        || target_ip != TARGET_IP_ADDR
        || target_port != TARGET_PORT
        || protocol_settings != PROTOCOL_IDENTIFIER_UDP
    {
        return None;
    }

    Some(NodeSearchResponse {
        serial,
        master_mac,
        master_ip,
        slave_mac,
        slave_ip,
        slave_netmask,
        slave_status,
        vendor_code,
        model_code,
        equipment_ver,
        slave_port,
    })
}

#[derive(Debug, Clone)]
pub struct SetIpRequest {
    pub serial: u16,
    pub master_mac: MacAddr,
    pub master_ip: u32,
    pub slave_mac: MacAddr,
    pub new_ip: u32,
    pub new_netmask: u32,
}

pub fn parse_set_ip_request(buf: &[u8]) -> Option<SetIpRequest> {
    if buf.len() != SET_IP_REQUEST_LEN {
        return None;
    }
    let h = parse_req_header(buf)?;
    if h.command != SLMP_COMMAND_NODE_IPADDRESS_SET || h.sub_command != SUBCOMMAND {
        return None;
    }

    let mut at = REQ_HEADER_LEN;
    let master_mac = read_mac(buf, at);
    at += 6;
    if buf[at] != ADDRSIZE_IPV4 {
        return None;
    }
    at += 1;
    let master_ip = read_u32_le(buf, at);
    at += 4;
    let slave_mac = read_mac(buf, at);
    at += 6;
    if buf[at] != ADDRSIZE_IPV4 {
        return None;
    }
    at += 1;
    let new_ip = read_u32_le(buf, at);
    at += 4;
    let new_netmask = read_u32_le(buf, at);
    at += 4;
    let gateway = read_u32_le(buf, at);
    at += 4;
    let hostname_size = buf[at];
    at += 1;
    if buf[at] != ADDRSIZE_IPV4 {
        return None;
    }
    at += 1;
    let target_ip = read_u32_le(buf, at);
    at += 4;
    let target_port = read_u16_le(buf, at);
    at += 2;
    let protocol_settings = buf[at];
    at += 1;
    debug_assert_eq!(at, SET_IP_REQUEST_LEN);

    if master_ip == 0
        || new_ip == 0
        || !crate::net::is_netmask_valid(new_netmask)
        || gateway != DEFAULT_GATEWAY
        || hostname_size != SLAVE_HOSTNAME_SIZE
        || target_ip != TARGET_IP_ADDR
        || target_port != TARGET_PORT
        || protocol_settings != PROTOCOL_IDENTIFIER_UDP
    {
        return None;
    }

    Some(SetIpRequest {
        serial: h.serial,
        master_mac,
        master_ip,
        slave_mac,
        new_ip,
        new_netmask,
    })
}

pub fn build_set_ip_request(r: &SetIpRequest) -> Vec<u8> {
    let mut buf = vec![0u8; SET_IP_REQUEST_LEN];
    build_req_header(&mut buf, r.serial, SLMP_COMMAND_NODE_IPADDRESS_SET, SUBCOMMAND, SET_IP_REQUEST_LEN);

    let mut at = REQ_HEADER_LEN;
    write_mac(&mut buf, at, r.master_mac);
    at += 6;
    buf[at] = ADDRSIZE_IPV4;
    at += 1;
    write_u32_le(&mut buf, at, r.master_ip);
    at += 4;
    write_mac(&mut buf, at, r.slave_mac);
    at += 6;
    buf[at] = ADDRSIZE_IPV4;
    at += 1;
    write_u32_le(&mut buf, at, r.new_ip);
    at += 4;
    write_u32_le(&mut buf, at, r.new_netmask);
    at += 4;
    write_u32_le(&mut buf, at, DEFAULT_GATEWAY);
    at += 4;
    buf[at] = SLAVE_HOSTNAME_SIZE;
    at += 1;
    buf[at] = ADDRSIZE_IPV4;
    at += 1;
    write_u32_le(&mut buf, at, TARGET_IP_ADDR);
    at += 4;
    write_u16_le(&mut buf, at, TARGET_PORT);
    at += 2;
    buf[at] = PROTOCOL_IDENTIFIER_UDP;
    at += 1;
    debug_assert_eq!(at, SET_IP_REQUEST_LEN);

    buf
}

#[derive(Debug, Clone)]
pub struct SetIpResponse {
    pub serial: u16,
    pub master_mac: MacAddr,
}

pub fn build_set_ip_response(r: &SetIpResponse) -> Vec<u8> {
    let mut buf = vec![0u8; SET_IP_RESPONSE_LEN];
    build_resp_header(&mut buf, r.serial, 0, SET_IP_RESPONSE_LEN);
    write_mac(&mut buf, RESP_HEADER_LEN, r.master_mac);
    buf
}

pub fn parse_set_ip_response(buf: &[u8]) -> Option<SetIpResponse> {
    if buf.len() != SET_IP_RESPONSE_LEN {
        return None;
    }
    let (serial, _endcode) = parse_resp_header(buf)?;
    let master_mac = read_mac(buf, RESP_HEADER_LEN);
    Some(SetIpResponse { serial, master_mac })
}

#[derive(Debug, Clone)]
pub struct SlmpErrorResponse {
    pub serial: u16,
    pub endcode: u16,
    pub command: u16,
    pub sub_command: u16,
}

pub fn build_error_response(r: &SlmpErrorResponse) -> Vec<u8> {
    let mut buf = vec![0u8; ERROR_RESPONSE_LEN];
    build_resp_header(&mut buf, r.serial, r.endcode, ERROR_RESPONSE_LEN);

    let mut at = RESP_HEADER_LEN;
    buf[at] = HEADER_NETWORK_NUMBER;
    at += 1;
    buf[at] = HEADER_UNIT_NUMBER;
    at += 1;
    write_u16_le(&mut buf, at, HEADER_IO_NUMBER);
    at += 2;
    buf[at] = HEADER_EXTENSION;
    at += 1;
    write_u16_le(&mut buf, at, r.command);
    at += 2;
    write_u16_le(&mut buf, at, r.sub_command);
    at += 2;
    debug_assert_eq!(at, ERROR_RESPONSE_LEN);

    buf
}

pub fn parse_error_response(buf: &[u8]) -> Option<SlmpErrorResponse> {
    if buf.len() != ERROR_RESPONSE_LEN {
        return None;
    }
    let (serial, endcode) = parse_resp_header(buf)?;

    let mut at = RESP_HEADER_LEN;
    if buf[at] != HEADER_NETWORK_NUMBER {
        return None;
    }
    at += 1;
    if buf[at] != HEADER_UNIT_NUMBER {
        return None;
    }
    at += 1;
    if read_u16_le(buf, at) != HEADER_IO_NUMBER {
        return None;
    }
    at += 2;
    if buf[at] != HEADER_EXTENSION {
        return None;
    }
    at += 1;
    let command = read_u16_le(buf, at);
    at += 2;
    let sub_command = read_u16_le(buf, at);
    at += 2;
    debug_assert_eq!(at, ERROR_RESPONSE_LEN);

    Some(SlmpErrorResponse {
        serial,
        endcode,
        command,
        sub_command,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER_MAC: MacAddr = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xF0];
    const SLAVE_MAC: MacAddr = [0x28, 0xE9, 0x8E, 0x2F, 0xE4, 0xB7];

    fn sample_node_search_request(serial: u16, master_mac: MacAddr, master_ip: u32) -> Vec<u8> {
        build_node_search_request(&NodeSearchRequest { serial, master_mac, master_ip })
    }

    #[test]
    fn node_search_request_round_trips_and_has_exact_len() {
        let buf = sample_node_search_request(42, MASTER_MAC, 0xC0A8_00FA);
        assert_eq!(buf.len(), NODE_SEARCH_REQUEST_LEN);
        let parsed = parse_node_search_request(&buf).expect("parses");
        assert_eq!(parsed.master_mac, MASTER_MAC);
        assert_eq!(parsed.master_ip, 0xC0A8_00FA);
        assert_eq!(parsed.serial, 42);
    }

    #[test]
    fn node_search_request_rejects_zero_master_ip() {
        let buf = sample_node_search_request(1, MASTER_MAC, 0);
        assert!(parse_node_search_request(&buf).is_none());
    }

    #[test]
    fn node_search_response_round_trips_and_has_exact_len() {
        let resp = NodeSearchResponse {
            serial: 7,
            master_mac: MASTER_MAC,
            master_ip: 0xC0A8_00FA,
            slave_mac: SLAVE_MAC,
            slave_ip: 0xC0A8_00C9,
            slave_netmask: 0xFFFF_FF00,
            slave_status: 0,
            vendor_code: 0x1067,
            model_code: 0x8765_4321,
            equipment_ver: 2,
            slave_port: 61451,
        };
        let buf = build_node_search_response(&resp);
        assert_eq!(buf.len(), NODE_SEARCH_RESPONSE_LEN);
        assert_eq!(buf.len(), 66);
        let parsed = parse_node_search_response(&buf).expect("parses");
        assert_eq!(parsed.slave_mac, SLAVE_MAC);
        assert_eq!(parsed.slave_ip, 0xC0A8_00C9);
        assert_eq!(parsed.vendor_code, 0x1067);
    }

    #[test]
    fn node_search_response_rejects_bad_netmask() {
        let resp_buf = build_node_search_response(&NodeSearchResponse {
            serial: 1,
            master_mac: MASTER_MAC,
            master_ip: 1,
            slave_mac: SLAVE_MAC,
            slave_ip: 1,
            slave_netmask: 0xFFFF_FFFF,
            slave_status: 0,
            vendor_code: 0,
            model_code: 0,
            equipment_ver: 0,
            slave_port: 61451,
        });
        assert!(parse_node_search_response(&resp_buf).is_none());
    }

    #[test]
    fn set_ip_request_round_trips_and_has_exact_len() {
        let req = SetIpRequest {
            serial: 3,
            master_mac: MASTER_MAC,
            master_ip: 0xC0A8_00FA,
            slave_mac: SLAVE_MAC,
            new_ip: 0x0A00_0005,
            new_netmask: 0xFF00_0000,
        };
        let buf = build_set_ip_request(&req);
        assert_eq!(buf.len(), SET_IP_REQUEST_LEN);
        assert_eq!(buf.len(), 58);
        let parsed = parse_set_ip_request(&buf).expect("parses");
        assert_eq!(parsed.slave_mac, SLAVE_MAC);
        assert_eq!(parsed.new_ip, 0x0A00_0005);
        assert_eq!(parsed.new_netmask, 0xFF00_0000);
    }

    #[test]
    fn set_ip_request_rejects_invalid_netmask() {
        let req = SetIpRequest {
            serial: 3,
            master_mac: MASTER_MAC,
            master_ip: 0xC0A8_00FA,
            slave_mac: SLAVE_MAC,
            new_ip: 0x0A00_0005,
            new_netmask: 0xFFFF_FFFF,
        };
        let buf = build_set_ip_request(&req);
        assert!(parse_set_ip_request(&buf).is_none());
    }

    #[test]
    fn set_ip_response_round_trips_and_has_exact_len() {
        let resp = SetIpResponse { serial: 9, master_mac: MASTER_MAC };
        let buf = build_set_ip_response(&resp);
        assert_eq!(buf.len(), SET_IP_RESPONSE_LEN);
        assert_eq!(buf.len(), 21);
        let parsed = parse_set_ip_response(&buf).expect("parses");
        assert_eq!(parsed.master_mac, MASTER_MAC);
    }

    #[test]
    fn error_response_round_trips_and_has_exact_len() {
        let resp = SlmpErrorResponse {
            serial: 5,
            endcode: 0xC059,
            command: SLMP_COMMAND_NODE_IPADDRESS_SET,
            sub_command: SUBCOMMAND,
        };
        let buf = build_error_response(&resp);
        assert_eq!(buf.len(), ERROR_RESPONSE_LEN);
        assert_eq!(buf.len(), 24);
        let parsed = parse_error_response(&buf).expect("parses");
        assert_eq!(parsed.endcode, 0xC059);
        assert_eq!(parsed.command, SLMP_COMMAND_NODE_IPADDRESS_SET);
    }

    #[test]
    fn mac_fields_are_reversed_on_wire() {
        let buf = sample_node_search_request(1, SLAVE_MAC, 1);
        let wire_mac = &buf[REQ_HEADER_LEN..REQ_HEADER_LEN + 6];
        let mut expected = SLAVE_MAC;
        expected.reverse();
        assert_eq!(wire_mac, expected);
    }

    #[test]
    fn peek_request_identifies_command() {
        let buf = sample_node_search_request(1, MASTER_MAC, 1);
        let kind = peek_request(&buf).expect("parses");
        assert_eq!(kind.command, SLMP_COMMAND_NODE_SEARCH);
        assert_eq!(kind.sub_command, SUBCOMMAND);
    }
}

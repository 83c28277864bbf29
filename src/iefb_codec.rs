//! CCIEFB frame codec: parse/validate/build cyclic request and response
//! frames. Endianness goes exclusively through `crate::net`.

use crate::net::{
    read_u16_be, read_u16_le, read_u32_le, read_u64_le, write_u16_be, write_u16_le, write_u32_le,
    write_u64_le, LENGTH_FIELD_OFFSET,
};

pub const SUB1_REQUEST: u16 = 0x5400;
pub const SUB1_RESPONSE: u16 = 0xD400;
pub const CCIEFB_COMMAND: u16 = 0x0010;
pub const CCIEFB_SUB_COMMAND: u16 = 0x0000;

const COMMON_REQUEST_HEADER_LEN: usize = 19;
const COMMON_RESPONSE_HEADER_LEN: usize = 15;
const CYCLIC_REQUEST_HEADER_LEN: usize = 36;
const CYCLIC_RESPONSE_HEADER_LEN: usize = 56;
const STATION_REQUEST_LEN: usize = 4 + 8 + 64; // slave_id + RY + RWw

pub const MAX_STATIONS: u16 = 16;
pub const MAX_GROUPS: u8 = 64;

/// One station's payload block inside a request.
#[derive(Debug, Clone, Copy)]
pub struct StationSlot {
    pub slave_id: u32,
    pub ry: [u8; 8],
    pub rww: [u16; 32],
}

impl Default for StationSlot {
    fn default() -> Self {
        Self {
            slave_id: 0,
            ry: [0; 8],
            rww: [0; 32],
        }
    }
}

#[derive(Debug, Clone)]
pub struct CcIefbRequest {
    pub serial: u16,
    pub protocol_ver: u16,
    pub master_local_unit_info: u16,
    pub clock_info: u64,
    pub master_id: u32,
    pub group_no: u8,
    pub frame_sequence_no: u16,
    pub timeout_value_ms: u16,
    pub parallel_off_count: u16,
    pub parameter_no: u16,
    pub slave_total_occupied_count: u16,
    pub cyclic_transmission_state: u16,
    pub stations: Vec<StationSlot>,
}

/// Parse and fully validate a CCIEFB request. Any validation failure is a
/// silent drop (`None`).
pub fn parse_request(buf: &[u8]) -> Option<CcIefbRequest> {
    if buf.len() < COMMON_REQUEST_HEADER_LEN + CYCLIC_REQUEST_HEADER_LEN {
        return None;
    }
    if read_u16_be(buf, 0) != SUB1_REQUEST {
        return None;
    }
    let serial = read_u16_le(buf, 2);
    let sub2 = read_u16_le(buf, 4);
    let network_number = buf[6];
    let unit_number = buf[7];
    let io_number = read_u16_le(buf, 8);
    let extension = buf[10];
    let length = read_u16_le(buf, 11);
    let timer = read_u16_le(buf, 13);
    let command = read_u16_le(buf, 15);
    let sub_command = read_u16_le(buf, 17);

    if sub2 != 0 || network_number != 0x00 || unit_number != 0xFF || io_number != 0x03FF || extension != 0x00 || timer != 0 {
        return None;
    }
    if command != CCIEFB_COMMAND || sub_command != CCIEFB_SUB_COMMAND {
        return None;
    }
    if length as usize + LENGTH_FIELD_OFFSET as usize != buf.len() {
        return None;
    }

    let c = COMMON_REQUEST_HEADER_LEN;
    let protocol_ver = read_u16_le(buf, c);
    if protocol_ver != 1 && protocol_ver != 2 {
        return None;
    }
    let master_local_unit_info = read_u16_le(buf, c + 6);
    if protocol_ver == 1 && master_local_unit_info > 1 {
        return None;
    }
    let clock_info = read_u64_le(buf, c + 8);
    let master_id = read_u32_le(buf, c + 16);
    if master_id == 0 {
        return None;
    }
    let group_no = buf[c + 20];
    if group_no < 1 || group_no > MAX_GROUPS {
        return None;
    }
    let frame_sequence_no = read_u16_le(buf, c + 22);
    let timeout_value_ms = read_u16_le(buf, c + 24);
    let parallel_off_count = read_u16_le(buf, c + 26);
    let parameter_no = read_u16_le(buf, c + 28);
    let slave_total_occupied_count = read_u16_le(buf, c + 30);
    if slave_total_occupied_count < 1 || slave_total_occupied_count > MAX_STATIONS {
        return None;
    }
    let cyclic_transmission_state = read_u16_le(buf, c + 32);

    let payload_start = c + CYCLIC_REQUEST_HEADER_LEN;
    let needed = payload_start + STATION_REQUEST_LEN * slave_total_occupied_count as usize;
    if buf.len() < needed {
        return None;
    }

    let mut stations = Vec::with_capacity(slave_total_occupied_count as usize);
    for i in 0..slave_total_occupied_count as usize {
        let base = payload_start + i * STATION_REQUEST_LEN;
        let slave_id = read_u32_le(buf, base);
        let mut ry = [0u8; 8];
        ry.copy_from_slice(&buf[base + 4..base + 12]);
        let mut rww = [0u16; 32];
        for (w, word) in rww.iter_mut().enumerate() {
            *word = read_u16_le(buf, base + 12 + w * 2);
        }
        stations.push(StationSlot { slave_id, ry, rww });
    }

    Some(CcIefbRequest {
        serial,
        protocol_ver,
        master_local_unit_info,
        clock_info,
        master_id,
        group_no,
        frame_sequence_no,
        timeout_value_ms,
        parallel_off_count,
        parameter_no,
        slave_total_occupied_count,
        cyclic_transmission_state,
        stations,
    })
}

/// Build a CCIEFB request. Exists primarily for tests: a real master
/// builds the wire request, this crate only needs to parse it, but
/// having a matching encoder lets tests exercise the engine with
/// self-consistent frames instead of hand-assembled byte literals.
pub fn build_request(req: &CcIefbRequest) -> Vec<u8> {
    let payload_len = STATION_REQUEST_LEN * req.stations.len();
    let total_len = COMMON_REQUEST_HEADER_LEN + CYCLIC_REQUEST_HEADER_LEN + payload_len;
    let mut buf = vec![0u8; total_len];

    write_u16_be(&mut buf, 0, SUB1_REQUEST);
    write_u16_le(&mut buf, 2, req.serial);
    write_u16_le(&mut buf, 4, 0);
    buf[6] = 0x00;
    buf[7] = 0xFF;
    write_u16_le(&mut buf, 8, 0x03FF);
    buf[10] = 0x00;
    write_u16_le(&mut buf, 11, (total_len - LENGTH_FIELD_OFFSET as usize) as u16);
    write_u16_le(&mut buf, 13, 0); // timer
    write_u16_le(&mut buf, 15, CCIEFB_COMMAND);
    write_u16_le(&mut buf, 17, CCIEFB_SUB_COMMAND);

    let c = COMMON_REQUEST_HEADER_LEN;
    write_u16_le(&mut buf, c, req.protocol_ver);
    write_u16_le(&mut buf, c + 2, 0); // reserved
    write_u16_le(&mut buf, c + 4, (CYCLIC_REQUEST_HEADER_LEN) as u16); // cyclic_info_offset
    write_u16_le(&mut buf, c + 6, req.master_local_unit_info);
    write_u64_le(&mut buf, c + 8, req.clock_info);
    write_u32_le(&mut buf, c + 16, req.master_id);
    buf[c + 20] = req.group_no;
    buf[c + 21] = 0;
    write_u16_le(&mut buf, c + 22, req.frame_sequence_no);
    write_u16_le(&mut buf, c + 24, req.timeout_value_ms);
    write_u16_le(&mut buf, c + 26, req.parallel_off_count);
    write_u16_le(&mut buf, c + 28, req.parameter_no);
    write_u16_le(&mut buf, c + 30, req.slave_total_occupied_count);
    write_u16_le(&mut buf, c + 32, req.cyclic_transmission_state);
    write_u16_le(&mut buf, c + 34, 0); // padding

    let payload_start = c + CYCLIC_REQUEST_HEADER_LEN;
    for (i, st) in req.stations.iter().enumerate() {
        let base = payload_start + i * STATION_REQUEST_LEN;
        write_u32_le(&mut buf, base, st.slave_id);
        buf[base + 4..base + 12].copy_from_slice(&st.ry);
        for (w, word) in st.rww.iter().enumerate() {
            write_u16_le(&mut buf, base + 12 + w * 2, *word);
        }
    }

    buf
}

#[derive(Debug, Clone)]
pub struct CcIefbResponse {
    pub serial: u16,
    pub endcode: u16,
    pub vendor_code: u16,
    pub model_code: u32,
    pub equipment_ver: u16,
    pub slave_protocol_ver: u16,
    pub slave_local_unit_info: u16,
    pub slave_err_code: u16,
    pub local_management_info: u32,
    pub slave_id: u32,
    pub group_no: u8,
    pub frame_sequence_no: u16,
    pub rx: Vec<[u8; 8]>,
    pub rwr: Vec<[u16; 32]>,
}

pub fn build_response(resp: &CcIefbResponse) -> Vec<u8> {
    let n = resp.rx.len();
    let payload_len = n * 8 + n * 64;
    let total_len = COMMON_RESPONSE_HEADER_LEN + CYCLIC_RESPONSE_HEADER_LEN + payload_len;
    let mut buf = vec![0u8; total_len];

    write_u16_be(&mut buf, 0, SUB1_RESPONSE);
    write_u16_le(&mut buf, 2, resp.serial);
    write_u16_le(&mut buf, 4, 0);
    buf[6] = 0x00;
    buf[7] = 0xFF;
    write_u16_le(&mut buf, 8, 0x03FF);
    buf[10] = 0x00;
    write_u16_le(&mut buf, 11, (total_len - LENGTH_FIELD_OFFSET as usize) as u16);
    write_u16_le(&mut buf, 13, resp.endcode);

    let c = COMMON_RESPONSE_HEADER_LEN;
    write_u16_le(&mut buf, c, resp.vendor_code);
    write_u32_le(&mut buf, c + 2, resp.model_code);
    write_u16_le(&mut buf, c + 6, resp.equipment_ver);
    write_u16_le(&mut buf, c + 8, resp.slave_protocol_ver);
    write_u16_le(&mut buf, c + 10, resp.slave_local_unit_info);
    write_u16_le(&mut buf, c + 12, resp.slave_err_code);
    write_u32_le(&mut buf, c + 14, resp.local_management_info);
    write_u32_le(&mut buf, c + 18, resp.slave_id);
    buf[c + 22] = resp.group_no;
    write_u16_le(&mut buf, c + 23, resp.frame_sequence_no);
    // bytes [c+25 .. c+56) stay zeroed (reserved padding)

    let payload_start = c + CYCLIC_RESPONSE_HEADER_LEN;
    for (i, area) in resp.rx.iter().enumerate() {
        buf[payload_start + i * 8..payload_start + i * 8 + 8].copy_from_slice(area);
    }
    let rwr_start = payload_start + n * 8;
    for (i, area) in resp.rwr.iter().enumerate() {
        let base = rwr_start + i * 64;
        for (w, word) in area.iter().enumerate() {
            write_u16_le(&mut buf, base + w * 2, *word);
        }
    }

    buf
}

pub fn parse_response(buf: &[u8]) -> Option<CcIefbResponse> {
    if buf.len() < COMMON_RESPONSE_HEADER_LEN + CYCLIC_RESPONSE_HEADER_LEN {
        return None;
    }
    if read_u16_be(buf, 0) != SUB1_RESPONSE {
        return None;
    }
    let serial = read_u16_le(buf, 2);
    let length = read_u16_le(buf, 11);
    if length as usize + LENGTH_FIELD_OFFSET as usize != buf.len() {
        return None;
    }
    let endcode = read_u16_le(buf, 13);

    let c = COMMON_RESPONSE_HEADER_LEN;
    let vendor_code = read_u16_le(buf, c);
    let model_code = read_u32_le(buf, c + 2);
    let equipment_ver = read_u16_le(buf, c + 6);
    let slave_protocol_ver = read_u16_le(buf, c + 8);
    let slave_local_unit_info = read_u16_le(buf, c + 10);
    let slave_err_code = read_u16_le(buf, c + 12);
    let local_management_info = read_u32_le(buf, c + 14);
    let slave_id = read_u32_le(buf, c + 18);
    let group_no = buf[c + 22];
    let frame_sequence_no = read_u16_le(buf, c + 23);

    let payload_start = c + CYCLIC_RESPONSE_HEADER_LEN;
    let remaining = buf.len() - payload_start;
    if remaining % 72 != 0 {
        return None;
    }
    let n = remaining / 72;

    let mut rx = Vec::with_capacity(n);
    for i in 0..n {
        let base = payload_start + i * 8;
        let mut area = [0u8; 8];
        area.copy_from_slice(&buf[base..base + 8]);
        rx.push(area);
    }
    let rwr_start = payload_start + n * 8;
    let mut rwr = Vec::with_capacity(n);
    for i in 0..n {
        let base = rwr_start + i * 64;
        let mut area = [0u16; 32];
        for (w, word) in area.iter_mut().enumerate() {
            *word = read_u16_le(buf, base + w * 2);
        }
        rwr.push(area);
    }

    Some(CcIefbResponse {
        serial,
        endcode,
        vendor_code,
        model_code,
        equipment_ver,
        slave_protocol_ver,
        slave_local_unit_info,
        slave_err_code,
        local_management_info,
        slave_id,
        group_no,
        frame_sequence_no,
        rx,
        rwr,
    })
}

/// Exact response length for `n` occupied stations: `71 + 72n`.
pub fn response_len(n: usize) -> usize {
    COMMON_RESPONSE_HEADER_LEN + CYCLIC_RESPONSE_HEADER_LEN + n * 72
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request(n_stations: u16, my_ip: u32, my_index: usize) -> CcIefbRequest {
        let mut stations = vec![StationSlot::default(); n_stations as usize];
        stations[my_index].slave_id = my_ip;
        CcIefbRequest {
            serial: 1,
            protocol_ver: 2,
            master_local_unit_info: 1,
            clock_info: 0,
            master_id: 0xC0A8_00FA,
            group_no: 1,
            frame_sequence_no: 1,
            timeout_value_ms: 500,
            parallel_off_count: 3,
            parameter_no: 1,
            slave_total_occupied_count: n_stations,
            cyclic_transmission_state: 0,
            stations,
        }
    }

    #[test]
    fn request_round_trips() {
        let req = sample_request(3, 0xC0A8_00C9, 1);
        let buf = build_request(&req);
        let parsed = parse_request(&buf).expect("parses");
        assert_eq!(parsed.master_id, req.master_id);
        assert_eq!(parsed.slave_total_occupied_count, 3);
        assert_eq!(parsed.stations[1].slave_id, 0xC0A8_00C9);
    }

    #[test]
    fn request_length_field_matches() {
        let req = sample_request(2, 0xC0A8_00C9, 0);
        let buf = build_request(&req);
        let length = read_u16_le(&buf, 11);
        assert_eq!(length as usize + LENGTH_FIELD_OFFSET as usize, buf.len());
    }

    #[test]
    fn request_rejects_bad_protocol_ver() {
        let mut req = sample_request(1, 0xC0A8_00C9, 0);
        req.protocol_ver = 0;
        let mut buf = build_request(&req);
        // protocol_ver lives right after the common request header
        write_u16_le(&mut buf, COMMON_REQUEST_HEADER_LEN, 0);
        assert!(parse_request(&buf).is_none());
    }

    #[test]
    fn request_rejects_master_id_zero() {
        let mut req = sample_request(1, 0xC0A8_00C9, 0);
        req.master_id = 0;
        let buf = build_request(&req);
        assert!(parse_request(&buf).is_none());
    }

    #[test]
    fn response_round_trips_and_matches_exact_len() {
        let resp = CcIefbResponse {
            serial: 1,
            endcode: 0,
            vendor_code: 0x1067,
            model_code: 0x8765_4321,
            equipment_ver: 2,
            slave_protocol_ver: 2,
            slave_local_unit_info: 1,
            slave_err_code: 0,
            local_management_info: 0,
            slave_id: 0xC0A8_00C9,
            group_no: 1,
            frame_sequence_no: 1,
            rx: vec![[0; 8]; 2],
            rwr: vec![[0; 32]; 2],
        };
        let buf = build_response(&resp);
        assert_eq!(buf.len(), response_len(2));
        assert_eq!(buf.len(), 215);
        let parsed = parse_response(&buf).expect("parses");
        assert_eq!(parsed.slave_id, resp.slave_id);
        assert_eq!(parsed.rx.len(), 2);
        assert_eq!(parsed.rwr.len(), 2);
    }
}

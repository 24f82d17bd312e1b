// Writers producing the same bit layout the Bitreader consumes, used to build synthetic demos.

pub struct BitWriter {
    bytes: Vec<u8>,
    bit_pos: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        BitWriter {
            bytes: vec![],
            bit_pos: 0,
        }
    }
    pub fn write_bits(&mut self, value: u64, n: u32) {
        for i in 0..n {
            if self.bit_pos % 8 == 0 {
                self.bytes.push(0);
            }
            let bit = ((value >> i) & 1) as u8;
            let last = self.bytes.len() - 1;
            self.bytes[last] |= bit << (self.bit_pos % 8);
            self.bit_pos += 1;
        }
    }
    pub fn write_bool(&mut self, b: bool) {
        self.write_bits(b as u64, 1);
    }
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        for b in bytes {
            self.write_bits(*b as u64, 8);
        }
    }
    pub fn write_string(&mut self, s: &str) {
        self.write_bytes(s.as_bytes());
        self.write_bits(0, 8);
    }
    pub fn write_varint(&mut self, mut v: u32) {
        loop {
            let b = (v & 0x7f) as u8;
            v >>= 7;
            if v == 0 {
                self.write_bits(b as u64, 8);
                break;
            }
            self.write_bits((b | 0x80) as u64, 8);
        }
    }
    pub fn write_u_bit_var(&mut self, v: u32) {
        let low = (v & 0b1111) as u64;
        if v < 16 {
            self.write_bits(v as u64, 6);
        } else if v < 256 {
            self.write_bits(low | 0b010000, 6);
            self.write_bits((v >> 4) as u64, 4);
        } else if v < 4096 {
            self.write_bits(low | 0b100000, 6);
            self.write_bits((v >> 4) as u64, 8);
        } else {
            self.write_bits(low | 0b110000, 6);
            self.write_bits((v >> 4) as u64, 28);
        }
    }
    /// Writes prop indices the way entity updates encode them, including the end marker.
    pub fn write_field_indices(&mut self, indices: &[u32]) {
        self.write_bool(true);
        let mut last: i64 = -1;
        for idx in indices {
            let delta = *idx as i64 - last - 1;
            if delta == 0 {
                self.write_bool(true);
            } else {
                self.write_bool(false);
                self.write_field_delta(delta as u32);
            }
            last = *idx as i64;
        }
        self.write_bool(false);
        self.write_field_delta(0xFFF);
    }
    fn write_field_delta(&mut self, delta: u32) {
        if delta < 8 {
            self.write_bool(true);
            self.write_bits(delta as u64, 3);
            return;
        }
        self.write_bool(false);
        let low = (delta & 31) as u64;
        if delta < 32 {
            self.write_bits(low, 7);
        } else if delta < 128 {
            self.write_bits(low | 32, 7);
            self.write_bits((delta >> 5) as u64, 2);
        } else if delta < 512 {
            self.write_bits(low | 64, 7);
            self.write_bits((delta >> 5) as u64, 4);
        } else {
            self.write_bits(low | 96, 7);
            self.write_bits((delta >> 5) as u64, 7);
        }
    }
    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }
}

pub fn write_varint(out: &mut Vec<u8>, mut v: u32) {
    loop {
        let b = (v & 0x7f) as u8;
        v >>= 7;
        if v == 0 {
            out.push(b);
            break;
        }
        out.push(b | 0x80);
    }
}

/// Net message framing used inside packets and data tables: varint id, varint size, payload.
pub fn frame_message(out: &mut Vec<u8>, msg_id: u32, payload: &[u8]) {
    write_varint(out, msg_id);
    write_varint(out, payload.len() as u32);
    out.extend_from_slice(payload);
}

pub fn padded_string(s: &str, len: usize) -> Vec<u8> {
    let mut v = s.as_bytes().to_vec();
    v.resize(len, 0);
    v
}

pub fn demo_header_bytes(map_name: &str, time: f32, ticks: i32, frames: i32) -> Vec<u8> {
    let mut out = padded_string("HL2DEMO", 8);
    out.extend_from_slice(&4_i32.to_le_bytes());
    out.extend_from_slice(&13765_i32.to_le_bytes());
    out.extend(padded_string("GOTV server", 260));
    out.extend(padded_string("GOTV Demo", 260));
    out.extend(padded_string(map_name, 260));
    out.extend(padded_string("csgo", 260));
    out.extend_from_slice(&time.to_le_bytes());
    out.extend_from_slice(&ticks.to_le_bytes());
    out.extend_from_slice(&frames.to_le_bytes());
    out.extend_from_slice(&0_i32.to_le_bytes());
    out
}

pub fn command_frame(out: &mut Vec<u8>, cmd: u8, tick: i32) {
    out.push(cmd);
    out.extend_from_slice(&tick.to_le_bytes());
    out.push(0);
}

pub fn scoped_block(out: &mut Vec<u8>, payload: &[u8]) {
    out.extend_from_slice(&(payload.len() as i32).to_le_bytes());
    out.extend_from_slice(payload);
}

/// Signon/packet command: command info, two sequence numbers and the message block.
pub fn packet_command(out: &mut Vec<u8>, tick: i32, messages: &[u8]) {
    command_frame(out, 2, tick);
    out.extend(vec![0_u8; 152]);
    out.extend_from_slice(&1_i32.to_le_bytes());
    out.extend_from_slice(&1_i32.to_le_bytes());
    scoped_block(out, messages);
}

use crate::read_bits::DemoParserError;
use crate::read_bytes::ByteReader;
use serde::Serialize;

pub const DEMO_STAMP: &str = "HL2DEMO";
pub const DEMO_PROTOCOL: i32 = 4;
pub const MAX_OSPATH: usize = 260;
pub const HEADER_SIZE: usize = 8 + 4 + 4 + 4 * MAX_OSPATH + 4 + 4 + 4 + 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemoHeader {
    pub filestamp: String,
    pub protocol: i32,
    pub network_protocol: i32,
    pub server_name: String,
    pub client_name: String,
    pub map_name: String,
    pub game_directory: String,
    pub playback_time: f32,
    pub playback_ticks: i32,
    pub playback_frames: i32,
    pub signon_length: i32,
}

impl DemoHeader {
    pub fn parse(reader: &mut ByteReader) -> Result<DemoHeader, DemoParserError> {
        if reader.bytes_left() < HEADER_SIZE {
            return Err(DemoParserError::DemoEndsEarly(format!(
                "header needs {} bytes, got {}",
                HEADER_SIZE,
                reader.bytes_left()
            )));
        }
        let filestamp = reader.read_fixed_string(8)?;
        if filestamp != DEMO_STAMP {
            return Err(DemoParserError::InvalidFileStamp(filestamp));
        }
        let protocol = reader.read_i32()?;
        if protocol != DEMO_PROTOCOL {
            return Err(DemoParserError::UnsupportedDemoProtocol(protocol));
        }
        Ok(DemoHeader {
            filestamp,
            protocol,
            network_protocol: reader.read_i32()?,
            server_name: reader.read_fixed_string(MAX_OSPATH)?,
            client_name: reader.read_fixed_string(MAX_OSPATH)?,
            map_name: reader.read_fixed_string(MAX_OSPATH)?,
            game_directory: reader.read_fixed_string(MAX_OSPATH)?,
            playback_time: reader.read_f32()?,
            playback_ticks: reader.read_i32()?,
            playback_frames: reader.read_i32()?,
            signon_length: reader.read_i32()?,
        })
    }
    /// Frames per second of recording. 0 for an empty demo.
    pub fn tick_rate(&self) -> f32 {
        if self.playback_time == 0.0 {
            return 0.0;
        }
        self.playback_frames as f32 / self.playback_time
    }
    pub fn tick_time(&self) -> f32 {
        if self.playback_frames == 0 {
            return 0.0;
        }
        self.playback_time / self.playback_frames as f32
    }
}

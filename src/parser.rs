use crate::events::HeaderParsedEvent;
use crate::events::TickDoneEvent;
use crate::header::DemoHeader;
use crate::netmessages::NetmessageType;
use crate::parser_settings::DemoParser;
use crate::read_bits::DemoParserError;
use crate::read_bytes::ByteReader;
use crate::sendtables::parse_datatables;
use serde::Serialize;
use tracing::debug;
use tracing::trace;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoCmd {
    Signon,
    Packet,
    SyncTick,
    ConsoleCmd,
    UserCmd,
    DataTables,
    Stop,
    CustomData,
    StringTables,
}

impl DemoCmd {
    pub fn from_byte(cmd: u8) -> Option<DemoCmd> {
        match cmd {
            1 => Some(DemoCmd::Signon),
            2 => Some(DemoCmd::Packet),
            3 => Some(DemoCmd::SyncTick),
            4 => Some(DemoCmd::ConsoleCmd),
            5 => Some(DemoCmd::UserCmd),
            6 => Some(DemoCmd::DataTables),
            7 => Some(DemoCmd::Stop),
            8 => Some(DemoCmd::CustomData),
            9 => Some(DemoCmd::StringTables),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Split {
    pub flags: i32,
    pub view_origin: [f32; 3],
    pub view_angles: [f32; 3],
    pub local_view_angles: [f32; 3],
    pub view_origin2: [f32; 3],
    pub view_angles2: [f32; 3],
    pub local_view_angles2: [f32; 3],
}

/// View state of the recording client, written in front of every signon/packet command.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CommandInfo {
    pub splits: [Split; 2],
}

impl CommandInfo {
    pub fn parse(reader: &mut ByteReader) -> Result<CommandInfo, DemoParserError> {
        Ok(CommandInfo {
            splits: [Split::parse(reader)?, Split::parse(reader)?],
        })
    }
}

impl Split {
    fn parse(reader: &mut ByteReader) -> Result<Split, DemoParserError> {
        Ok(Split {
            flags: reader.read_i32()?,
            view_origin: reader.read_vector()?,
            view_angles: reader.read_vector()?,
            local_view_angles: reader.read_vector()?,
            view_origin2: reader.read_vector()?,
            view_angles2: reader.read_vector()?,
            local_view_angles2: reader.read_vector()?,
        })
    }
}

impl<'a> DemoParser<'a> {
    /// Parses and validates the header. Raises `header_parsed` the first time only.
    pub fn parse_header(&mut self) -> Result<&DemoHeader, DemoParserError> {
        if self.header.is_none() {
            let header = DemoHeader::parse(&mut self.reader)?;
            debug!(
                "demo of {} on {}, {} ticks in {}s",
                header.client_name, header.map_name, header.playback_ticks, header.playback_time
            );
            self.events
                .header_parsed
                .raise(&HeaderParsedEvent { header: header.clone() });
            self.header = Some(header);
        }
        match &self.header {
            Some(header) => Ok(header),
            None => Err(DemoParserError::MalformedMessage),
        }
    }
    /// Consumes one command. Returns false once the demo has stopped.
    pub fn parse_next_tick(&mut self) -> Result<bool, DemoParserError> {
        self.parse_header()?;
        if self.finished {
            return Ok(false);
        }
        let more = self.parse_tick()?;
        self.game_state.reconcile_players();
        if self.settings.attribute_weapons {
            self.attribute_weapons();
        }
        if more {
            self.events.tick_done.raise(&TickDoneEvent { tick: self.current_tick });
        } else {
            self.finished = true;
        }
        Ok(more)
    }
    pub fn parse_to_end(&mut self) -> Result<(), DemoParserError> {
        while self.parse_next_tick()? {}
        Ok(())
    }
    fn parse_tick(&mut self) -> Result<bool, DemoParserError> {
        let frame_starts_at = self.reader.ptr;
        if self.reader.is_empty() {
            return Err(DemoParserError::DemoEndsEarly(format!(
                "no stop command before end of demo at offset {}",
                frame_starts_at
            )));
        }
        let cmd_byte = self.reader.read_u8()?;
        self.ingame_tick = self.reader.read_i32()?;
        let _player_slot = self.reader.read_u8()?;
        self.current_tick += 1;

        let cmd = match DemoCmd::from_byte(cmd_byte) {
            Some(DemoCmd::CustomData) | None => {
                return Err(DemoParserError::UnknownDemoCmd(format!(
                    "command {} at offset {}",
                    cmd_byte, frame_starts_at
                )))
            }
            Some(cmd) => cmd,
        };
        match cmd {
            DemoCmd::SyncTick => {}
            DemoCmd::Stop => return Ok(false),
            DemoCmd::ConsoleCmd => {
                self.reader.read_packet()?;
            }
            DemoCmd::DataTables => {
                let block = self.reader.read_packet()?;
                self.handle_datatables(block)?;
            }
            DemoCmd::StringTables => {
                let block = self.reader.read_packet()?;
                self.parse_stringtables_snapshot(block)?;
            }
            DemoCmd::UserCmd => {
                let _outgoing_sequence = self.reader.read_i32()?;
                self.reader.read_packet()?;
            }
            DemoCmd::Signon | DemoCmd::Packet => {
                self.last_command_info = Some(CommandInfo::parse(&mut self.reader)?);
                let _seq_in = self.reader.read_i32()?;
                let _seq_out = self.reader.read_i32()?;
                let block = self.reader.read_packet()?;
                self.parse_demo_packet(block)?;
            }
            DemoCmd::CustomData => {}
        }
        Ok(true)
    }
    fn handle_datatables(&mut self, block: &[u8]) -> Result<(), DemoParserError> {
        // The schema is fixed for the whole demo.
        if self.entities_bound {
            warn!("ignoring repeated data tables at tick {}", self.current_tick);
            return Ok(());
        }
        self.server_classes = parse_datatables(block)?;
        self.bind_entities();
        Ok(())
    }
    /// Resolves everything keyed by class/prop name against the freshly parsed schema.
    pub(crate) fn bind_entities(&mut self) {
        self.game_state.bind(&self.server_classes);
        self.prop_events.resolve_pending(&self.server_classes);
        self.baseline_cache.clear();
        self.entities_bound = true;
    }
    pub fn parse_demo_packet(&mut self, bytes: &[u8]) -> Result<(), DemoParserError> {
        let mut reader = ByteReader::new(bytes);
        while !reader.is_empty() {
            let msg_id = reader.read_varint()?;
            let size = reader.read_varint()?;
            let msg_bytes = reader.read_n_bytes(size as usize)?;
            let ok = match NetmessageType::from_id(msg_id) {
                Some(NetmessageType::SvcPacketEntities) => self.parse_packet_ents(msg_bytes),
                Some(NetmessageType::SvcCreateStringTable) => self.parse_create_stringtable(msg_bytes),
                Some(NetmessageType::SvcUpdateStringTable) => self.parse_update_stringtable(msg_bytes),
                Some(NetmessageType::SvcGameEventList) => self.parse_game_event_list(msg_bytes),
                Some(NetmessageType::SvcGameEvent) => self.parse_game_event(msg_bytes),
                _ => {
                    trace!("skipping net message {} ({} bytes)", msg_id, size);
                    Ok(())
                }
            };
            ok?
        }
        Ok(())
    }
    // Hook for guessing weapon ownership after each tick, nothing is attributed yet.
    fn attribute_weapons(&mut self) {
        trace!("attribute weapons at tick {}", self.current_tick);
    }
}

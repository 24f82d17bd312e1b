use crate::netmessages::CsvcMsgPacketEntities;
use crate::parser_settings::DemoParser;
use crate::prop_events::PropertyUpdate;
use crate::read_bits::Bitreader;
use crate::read_bits::DemoParserError;
use crate::sendtables::ServerClass;
use crate::variants::Variant;
use ahash::AHashMap;
use prost::Message;
use serde::Serialize;
use tracing::trace;
use tracing::warn;

pub const MAX_ENTITIES: usize = 2048;
const NSERIALBITS: u32 = 10;
const FIELD_INDEX_END: u32 = 0xFFF;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    pub entity_id: i32,
    pub cls_id: u32,
    pub serial: u32,
    /// Current value per flattened prop index.
    pub props: AHashMap<u32, Variant>,
}

impl Entity {
    #[inline]
    pub fn prop(&self, prop_idx: u32) -> Option<&Variant> {
        self.props.get(&prop_idx)
    }
}

enum EntityCmd {
    Update,
    CreateAndUpdate,
    Leave,
    Delete,
}

impl<'a> DemoParser<'a> {
    pub fn parse_packet_ents(&mut self, bytes: &[u8]) -> Result<(), DemoParserError> {
        if !self.settings.parse_entities {
            return Ok(());
        }
        let msg = match CsvcMsgPacketEntities::decode(bytes) {
            Err(_) => return Err(DemoParserError::MalformedMessage),
            Ok(msg) => msg,
        };
        if !self.entities_bound {
            warn!("packet entities before data tables, skipping {} updates", msg.updated_entries());
            return Ok(());
        }
        let mut bitreader = Bitreader::new(msg.entity_data());
        let mut last_id: i64 = -1;
        for _ in 0..msg.updated_entries() {
            last_id += 1 + bitreader.read_u_bit_var()? as i64;
            if last_id as usize >= MAX_ENTITIES {
                return Err(DemoParserError::EntityIdOutOfBounds(last_id.min(i32::MAX as i64) as i32));
            }
            let entity_id = last_id as i32;
            // Bit 0: leaves the PVS, bit 1: enters the PVS (or is deleted when leaving).
            let cmd = match bitreader.read_nbits(2)? {
                0b00 => EntityCmd::Update,
                0b10 => EntityCmd::CreateAndUpdate,
                0b01 => EntityCmd::Leave,
                _ => EntityCmd::Delete,
            };
            match cmd {
                EntityCmd::Update => self.update_entity(&mut bitreader, entity_id)?,
                EntityCmd::CreateAndUpdate => {
                    self.create_new_entity(&mut bitreader, entity_id)?;
                    self.update_entity(&mut bitreader, entity_id)?;
                }
                EntityCmd::Leave | EntityCmd::Delete => {
                    if let Some(entry) = self.entities.get_mut(entity_id as usize) {
                        *entry = None;
                    }
                }
            }
        }
        Ok(())
    }
    fn create_new_entity(&mut self, bitreader: &mut Bitreader, entity_id: i32) -> Result<(), DemoParserError> {
        let cls_id = bitreader.read_nbits(self.server_classes.class_bits)?;
        let serial = bitreader.read_nbits(NSERIALBITS)?;
        if self.server_classes.get(cls_id).is_none() {
            return Err(DemoParserError::ClsIdOutOfBounds(cls_id));
        }
        let entity = Entity {
            entity_id,
            cls_id,
            serial,
            props: AHashMap::default(),
        };
        trace!("entity {} created as class {}", entity_id, cls_id);
        self.game_state.on_entity_created(entity_id, cls_id);
        self.prop_events.fire_created(&entity);
        // Replaces any previous occupant of the slot
        self.entities[entity_id as usize] = Some(entity);

        if let Some(baseline) = self.instance_baseline(cls_id)? {
            self.apply_decoded(entity_id, baseline)?;
        }
        Ok(())
    }
    /// Decoded instance baseline of a class, decoding and caching it on first use.
    fn instance_baseline(&mut self, cls_id: u32) -> Result<Option<Vec<(u32, Variant)>>, DemoParserError> {
        if let Some(values) = self.baseline_cache.get(&cls_id) {
            return Ok(Some(values.clone()));
        }
        let bytes = match self.instance_baselines.get(&cls_id) {
            Some(bytes) => bytes,
            None => return Ok(None),
        };
        let class = match self.server_classes.get(cls_id) {
            Some(class) => class,
            None => return Err(DemoParserError::ClsIdOutOfBounds(cls_id)),
        };
        let values = read_entity_update(&mut Bitreader::new(bytes), class)?;
        self.baseline_cache.insert(cls_id, values.clone());
        Ok(Some(values))
    }
    fn update_entity(&mut self, bitreader: &mut Bitreader, entity_id: i32) -> Result<(), DemoParserError> {
        let cls_id = match self.entities.get(entity_id as usize) {
            Some(Some(entity)) => entity.cls_id,
            _ => return Err(DemoParserError::EntityNotFound(entity_id)),
        };
        let class = match self.server_classes.get(cls_id) {
            Some(class) => class,
            None => return Err(DemoParserError::ClsIdOutOfBounds(cls_id)),
        };
        let values = read_entity_update(bitreader, class)?;
        self.apply_decoded(entity_id, values)
    }
    /// Writes decoded values into the entity in decode order. Player/team bookkeeping sees
    /// each value before external subscribers do.
    fn apply_decoded(&mut self, entity_id: i32, values: Vec<(u32, Variant)>) -> Result<(), DemoParserError> {
        let entity = match self.entities.get_mut(entity_id as usize) {
            Some(Some(entity)) => entity,
            _ => return Err(DemoParserError::EntityNotFound(entity_id)),
        };
        let class = match self.server_classes.get(entity.cls_id) {
            Some(class) => class,
            None => return Err(DemoParserError::ClsIdOutOfBounds(entity.cls_id)),
        };
        for (prop_idx, value) in values {
            if let Some(binding) = self.game_state.binding(class.id, prop_idx) {
                self.game_state.apply(binding, entity_id, &value);
            }
            if !self.prop_events.has_prop_callbacks(class.id, prop_idx) {
                entity.props.insert(prop_idx, value);
                continue;
            }
            let prop = match class.props.get(prop_idx as usize) {
                Some(prop) => prop,
                None => return Err(DemoParserError::PropIndexOutOfBounds(prop_idx)),
            };
            entity.props.insert(prop_idx, value.clone());
            self.prop_events.fire_prop(&PropertyUpdate {
                entity,
                class,
                prop_idx,
                prop,
                value: &value,
            });
        }
        Ok(())
    }
}

/// Reads the changed prop indices of one entity followed by their values.
pub fn read_entity_update(bitreader: &mut Bitreader, class: &ServerClass) -> Result<Vec<(u32, Variant)>, DemoParserError> {
    let indices = read_field_indices(bitreader)?;
    let mut values = Vec::with_capacity(indices.len());
    for idx in indices {
        let prop = match class.props.get(idx as usize) {
            Some(prop) => prop,
            None => return Err(DemoParserError::PropIndexOutOfBounds(idx)),
        };
        values.push((idx, bitreader.decode(prop)?));
    }
    Ok(values)
}

pub fn read_field_indices(bitreader: &mut Bitreader) -> Result<Vec<u32>, DemoParserError> {
    let new_way = bitreader.read_boolean()?;
    let mut indices = vec![];
    let mut last: i64 = -1;
    while let Some(idx) = read_field_index(bitreader, last, new_way)? {
        indices.push(idx);
        last = idx as i64;
    }
    Ok(indices)
}

#[inline]
fn read_field_index(bitreader: &mut Bitreader, last: i64, new_way: bool) -> Result<Option<u32>, DemoParserError> {
    if new_way && bitreader.read_boolean()? {
        return Ok(Some((last + 1) as u32));
    }
    let delta = if new_way && bitreader.read_boolean()? {
        bitreader.read_nbits(3)?
    } else {
        let low = bitreader.read_nbits(7)?;
        match low & (32 | 64) {
            32 => (low & !96) | (bitreader.read_nbits(2)? << 5),
            64 => (low & !96) | (bitreader.read_nbits(4)? << 5),
            96 => (low & !96) | (bitreader.read_nbits(7)? << 5),
            _ => low,
        }
    };
    if delta == FIELD_INDEX_END {
        return Ok(None);
    }
    Ok(Some((last + 1 + delta as i64) as u32))
}

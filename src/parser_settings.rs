use crate::entities::Entity;
use crate::entities::MAX_ENTITIES;
use crate::equipment::EquipmentElement;
use crate::events::DemoEvents;
use crate::game_events::GameEventDescriptor;
use crate::game_state::GameState;
use crate::game_state::Player;
use crate::game_state::TeamInfo;
use crate::header::DemoHeader;
use crate::parser::CommandInfo;
use crate::prop_events::PropertyEventBus;
use crate::prop_events::PropertyUpdate;
use crate::read_bits::DemoParserError;
use crate::read_bytes::ByteReader;
use crate::sendtables::ServerClass;
use crate::sendtables::ServerClasses;
use crate::stringtables::StringTable;
use crate::stringtables::StringTables;
use crate::variants::Variant;
use ahash::AHashMap;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParserSettings {
    /// Runs the weapon attribution step after every tick. Currently does nothing.
    pub attribute_weapons: bool,
    /// When false, packet entities are skipped entirely.
    pub parse_entities: bool,
}

impl Default for ParserSettings {
    fn default() -> Self {
        ParserSettings {
            attribute_weapons: false,
            parse_entities: true,
        }
    }
}

pub struct DemoParser<'a> {
    pub reader: ByteReader<'a>,
    pub settings: ParserSettings,
    pub header: Option<DemoHeader>,
    /// Number of commands consumed, not the tick number written in the demo.
    pub current_tick: i32,
    /// Tick number of the last command frame as written in the demo.
    pub ingame_tick: i32,
    pub finished: bool,
    pub last_command_info: Option<CommandInfo>,
    pub server_classes: ServerClasses,
    pub entities_bound: bool,
    pub entities: Vec<Option<Entity>>,
    // instancebaseline rows by class id, and their decoded values
    pub instance_baselines: AHashMap<u32, Vec<u8>>,
    pub baseline_cache: AHashMap<u32, Vec<(u32, Variant)>>,
    pub string_tables: StringTables,
    pub game_state: GameState,
    pub prop_events: PropertyEventBus,
    pub events: Rc<DemoEvents>,
    pub ge_list: AHashMap<i32, GameEventDescriptor>,
}

impl<'a> DemoParser<'a> {
    pub fn new(demo_bytes: &'a [u8], settings: ParserSettings) -> Self {
        DemoParser {
            reader: ByteReader::new(demo_bytes),
            settings,
            header: None,
            current_tick: 0,
            ingame_tick: 0,
            finished: false,
            last_command_info: None,
            server_classes: ServerClasses::default(),
            entities_bound: false,
            entities: vec![None; MAX_ENTITIES],
            instance_baselines: AHashMap::default(),
            baseline_cache: AHashMap::default(),
            string_tables: StringTables::default(),
            game_state: GameState::default(),
            prop_events: PropertyEventBus::default(),
            events: Rc::new(DemoEvents::default()),
            ge_list: AHashMap::default(),
        }
    }
    /// Calls `callback` every time `prop_name` of any entity of `class_name` is decoded.
    ///
    /// Before the data tables are parsed the subscription is kept by name and resolved when
    /// they arrive (unresolvable ones are then dropped with a warning). Afterwards unknown
    /// names are an error.
    pub fn subscribe_prop(
        &mut self,
        class_name: &str,
        prop_name: &str,
        callback: impl FnMut(&PropertyUpdate<'_>) + 'static,
    ) -> Result<(), DemoParserError> {
        let classes = self.entities_bound.then_some(&self.server_classes);
        self.prop_events.subscribe_prop(classes, class_name, prop_name, Box::new(callback))
    }
    pub fn on_entity_created(&mut self, class_name: &str, callback: impl FnMut(&Entity) + 'static) -> Result<(), DemoParserError> {
        let classes = self.entities_bound.then_some(&self.server_classes);
        self.prop_events.subscribe_created(classes, class_name, Box::new(callback))
    }
    pub fn events(&self) -> Rc<DemoEvents> {
        self.events.clone()
    }
    pub fn header(&self) -> Option<&DemoHeader> {
        self.header.as_ref()
    }
    pub fn last_command_info(&self) -> Option<&CommandInfo> {
        self.last_command_info.as_ref()
    }
    pub fn string_table(&self, name: &str) -> Option<&StringTable> {
        self.string_tables.by_name(name)
    }
    pub fn tick_rate(&self) -> f32 {
        self.header.as_ref().map(|h| h.tick_rate()).unwrap_or(0.0)
    }
    pub fn tick_time(&self) -> f32 {
        self.header.as_ref().map(|h| h.tick_time()).unwrap_or(0.0)
    }
    /// Seconds into the demo, counted in consumed commands.
    pub fn current_time(&self) -> f32 {
        self.current_tick as f32 * self.tick_time()
    }
    pub fn entity(&self, entity_id: i32) -> Option<&Entity> {
        if entity_id < 0 {
            return None;
        }
        self.entities.get(entity_id as usize).and_then(|e| e.as_ref())
    }
    pub fn server_class(&self, class_name: &str) -> Option<&ServerClass> {
        self.server_classes.find_by_name(class_name)
    }
    /// Current value of a prop looked up by name.
    pub fn entity_prop(&self, entity_id: i32, prop_name: &str) -> Option<&Variant> {
        let entity = self.entity(entity_id)?;
        let class = self.server_classes.get(entity.cls_id)?;
        entity.prop(class.prop_index(prop_name)?)
    }
    pub fn players(&self) -> &BTreeMap<i32, Player> {
        &self.game_state.players
    }
    /// Player state by entity id, available before userinfo arrives.
    pub fn player_by_entity_id(&self, entity_id: i32) -> Option<&Player> {
        if entity_id < 1 {
            return None;
        }
        self.game_state
            .player_slots
            .get(entity_id as usize - 1)
            .and_then(|p| p.as_ref())
    }
    pub fn teams(&self) -> &AHashMap<i32, TeamInfo> {
        &self.game_state.teams
    }
    pub fn ct_score(&self) -> i32 {
        self.game_state.ct_score
    }
    pub fn t_score(&self) -> i32 {
        self.game_state.t_score
    }
    pub fn equipment_mapping(&self) -> &AHashMap<u32, EquipmentElement> {
        &self.server_classes.equipment_mapping
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = ParserSettings::default();
        assert!(!settings.attribute_weapons);
        assert!(settings.parse_entities);
    }
    #[test]
    fn test_fresh_parser() {
        let bytes = vec![];
        let parser = DemoParser::new(&bytes, ParserSettings::default());
        assert_eq!(parser.entities.len(), MAX_ENTITIES);
        assert_eq!(parser.tick_rate(), 0.0);
        assert_eq!(parser.current_time(), 0.0);
        assert!(parser.entity(-1).is_none());
        assert!(parser.player_by_entity_id(0).is_none());
        assert!(parser.players().is_empty());
    }
}

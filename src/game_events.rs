use crate::equipment::Equipment;
use crate::equipment::EquipmentElement;
use crate::events::BombDefuseEvent;
use crate::events::BombEvent;
use crate::events::EventBus;
use crate::events::MatchStartedEvent;
use crate::events::NadeEvent;
use crate::events::PlayerKilledEvent;
use crate::events::RoundStartedEvent;
use crate::events::WeaponFiredEvent;
use crate::game_state::Player;
use crate::netmessages::csvc_msg_game_event::KeyT;
use crate::netmessages::CsvcMsgGameEvent;
use crate::netmessages::CsvcMsgGameEventList;
use crate::parser_settings::DemoParser;
use crate::read_bits::DemoParserError;
use crate::variants::Variant;
use prost::Message;
use serde::Serialize;
use tracing::debug;
use tracing::trace;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct GameEventDescriptor {
    pub name: String,
    /// Key names with their declared value type, in wire order.
    pub keys: Vec<(String, i32)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventField {
    pub name: String,
    pub data: Option<Variant>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameEvent {
    pub name: String,
    pub tick: i32,
    pub fields: Vec<EventField>,
}

impl GameEvent {
    pub fn get(&self, name: &str) -> Option<&Variant> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .and_then(|f| f.data.as_ref())
    }
    pub fn get_i32(&self, name: &str) -> Option<i32> {
        self.get(name).and_then(|v| v.as_i32())
    }
    pub fn get_f32(&self, name: &str) -> Option<f32> {
        self.get(name).and_then(|v| v.as_f32())
    }
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| v.as_str())
    }
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(|v| v.as_bool())
    }
    fn position(&self) -> [f32; 3] {
        [
            self.get_f32("x").unwrap_or(0.0),
            self.get_f32("y").unwrap_or(0.0),
            self.get_f32("z").unwrap_or(0.0),
        ]
    }
}

fn parse_key(key: &KeyT) -> Option<Variant> {
    match key.r#type() {
        1 => Some(Variant::String(key.val_string().to_owned())),
        2 => Some(Variant::F32(key.val_float())),
        // long, short and byte all arrive widened to i32
        3 => Some(Variant::I32(key.val_long())),
        4 => Some(Variant::I32(key.val_short())),
        5 => Some(Variant::I32(key.val_byte())),
        6 => Some(Variant::Bool(key.val_bool())),
        7 => Some(Variant::U64(key.val_uint64())),
        8 => Some(Variant::String(String::from_utf8_lossy(key.val_wstring()).to_string())),
        _ => None,
    }
}

impl<'a> DemoParser<'a> {
    pub fn parse_game_event_list(&mut self, bytes: &[u8]) -> Result<(), DemoParserError> {
        let msg = match CsvcMsgGameEventList::decode(bytes) {
            Err(_) => return Err(DemoParserError::MalformedMessage),
            Ok(msg) => msg,
        };
        for desc in msg.descriptors {
            let keys = desc
                .keys
                .iter()
                .map(|k| (k.name().to_string(), k.r#type()))
                .collect();
            self.ge_list.insert(
                desc.eventid(),
                GameEventDescriptor {
                    name: desc.name().to_string(),
                    keys,
                },
            );
        }
        debug!("game event list with {} descriptors", self.ge_list.len());
        Ok(())
    }
    pub fn parse_game_event(&mut self, bytes: &[u8]) -> Result<(), DemoParserError> {
        let msg = match CsvcMsgGameEvent::decode(bytes) {
            Err(_) => return Err(DemoParserError::MalformedMessage),
            Ok(msg) => msg,
        };
        let desc = match self.ge_list.get(&msg.eventid()) {
            Some(desc) => desc,
            None => {
                warn!("game event with unknown id {}", msg.eventid());
                return Ok(());
            }
        };
        let fields = desc
            .keys
            .iter()
            .zip(msg.keys.iter())
            .map(|((name, _), key)| EventField {
                name: name.clone(),
                data: parse_key(key),
            })
            .collect();
        let event = GameEvent {
            name: desc.name.clone(),
            tick: self.current_tick,
            fields,
        };
        trace!("game event {} at tick {}", event.name, event.tick);
        self.events.game_event.raise(&event);
        self.raise_typed_event(&event);
        Ok(())
    }
    fn player_from_event(&self, event: &GameEvent, key: &str) -> Option<Player> {
        event
            .get_i32(key)
            .and_then(|user_id| self.game_state.player_by_user_id(user_id))
            .cloned()
    }
    fn nade_event(&self, event: &GameEvent, nade_type: EquipmentElement) -> NadeEvent {
        NadeEvent {
            tick: event.tick,
            nade_type,
            position: event.position(),
            thrower: self.player_from_event(event, "userid"),
        }
    }
    fn bomb_event(&self, event: &GameEvent) -> BombEvent {
        BombEvent {
            tick: event.tick,
            player: self.player_from_event(event, "userid"),
            site: event.get_i32("site"),
        }
    }
    // bomb_abortdefuse carries no "haskit" key, so has_kit stays false there.
    fn defuse_event(&self, event: &GameEvent) -> BombDefuseEvent {
        BombDefuseEvent {
            tick: event.tick,
            player: self.player_from_event(event, "userid"),
            has_kit: event.get_bool("haskit").unwrap_or(false),
        }
    }
    /// Maps the game events we know about onto the typed buses.
    fn raise_typed_event(&self, event: &GameEvent) {
        let events = &self.events;
        match event.name.as_str() {
            "round_announce_match_started" => events.match_started.raise(&MatchStartedEvent { tick: event.tick }),
            "round_start" => events.round_started.raise(&RoundStartedEvent {
                tick: event.tick,
                time_limit: event.get_i32("timelimit").unwrap_or(0),
                frag_limit: event.get_i32("fraglimit").unwrap_or(0),
                objective: event.get_str("objective").unwrap_or_default().to_string(),
            }),
            "player_death" => events.player_killed.raise(&PlayerKilledEvent {
                tick: event.tick,
                victim: self.player_from_event(event, "userid"),
                killer: self.player_from_event(event, "attacker"),
                assister: self.player_from_event(event, "assister"),
                weapon: Equipment::from_name(event.get_str("weapon").unwrap_or_default()),
                headshot: event.get_bool("headshot").unwrap_or(false),
                penetrated_objects: event.get_i32("penetrated").unwrap_or(0),
            }),
            "weapon_fire" => events.weapon_fired.raise(&WeaponFiredEvent {
                tick: event.tick,
                shooter: self.player_from_event(event, "userid"),
                weapon: Equipment::from_name(event.get_str("weapon").unwrap_or_default()),
            }),
            "smokegrenade_detonate" => self.raise_nade(&events.smoke_nade_started, event, EquipmentElement::Smoke),
            "smokegrenade_expired" => self.raise_nade(&events.smoke_nade_ended, event, EquipmentElement::Smoke),
            "decoy_started" => self.raise_nade(&events.decoy_nade_started, event, EquipmentElement::Decoy),
            "decoy_detonate" => self.raise_nade(&events.decoy_nade_ended, event, EquipmentElement::Decoy),
            "inferno_startburn" => self.raise_nade(&events.fire_nade_started, event, EquipmentElement::Incendiary),
            "inferno_expire" => self.raise_nade(&events.fire_nade_ended, event, EquipmentElement::Incendiary),
            "flashbang_detonate" => self.raise_nade(&events.flash_nade_exploded, event, EquipmentElement::Flash),
            "hegrenade_detonate" => self.raise_nade(&events.explosive_nade_exploded, event, EquipmentElement::HE),
            "bomb_beginplant" => events.bomb_begin_plant.raise(&self.bomb_event(event)),
            "bomb_abortplant" => events.bomb_abort_plant.raise(&self.bomb_event(event)),
            "bomb_planted" => events.bomb_planted.raise(&self.bomb_event(event)),
            "bomb_defused" => events.bomb_defused.raise(&self.bomb_event(event)),
            "bomb_exploded" => events.bomb_exploded.raise(&self.bomb_event(event)),
            "bomb_begindefuse" => events.bomb_begin_defuse.raise(&self.defuse_event(event)),
            "bomb_abortdefuse" => events.bomb_abort_defuse.raise(&self.defuse_event(event)),
            _ => {}
        }
    }
    // Every grenade event is followed by the generic "reached target" notification.
    fn raise_nade(&self, bus: &EventBus<NadeEvent>, event: &GameEvent, nade_type: EquipmentElement) {
        let nade = self.nade_event(event, nade_type);
        bus.raise(&nade);
        self.events.nade_reached_target.raise(&nade);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netmessages::csvc_msg_game_event_list::DescriptorT;
    use crate::netmessages::csvc_msg_game_event_list::KeyT as DescKeyT;
    use crate::parser_settings::ParserSettings;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn descriptor(id: i32, name: &str, keys: &[(&str, i32)]) -> DescriptorT {
        DescriptorT {
            eventid: Some(id),
            name: Some(name.to_string()),
            keys: keys
                .iter()
                .map(|(name, t)| DescKeyT {
                    r#type: Some(*t),
                    name: Some(name.to_string()),
                })
                .collect(),
        }
    }
    fn event_list() -> Vec<u8> {
        CsvcMsgGameEventList {
            descriptors: vec![
                descriptor(
                    1,
                    "player_death",
                    &[("userid", 4), ("attacker", 4), ("assister", 4), ("weapon", 1), ("headshot", 6), ("penetrated", 4)],
                ),
                descriptor(2, "smokegrenade_detonate", &[("userid", 4), ("entityid", 4), ("x", 2), ("y", 2), ("z", 2)]),
                descriptor(3, "bomb_begindefuse", &[("userid", 4), ("haskit", 6)]),
                descriptor(4, "bomb_abortdefuse", &[("userid", 4), ("site", 4)]),
            ],
        }
        .encode_to_vec()
    }
    fn short(v: i32) -> KeyT {
        KeyT {
            r#type: Some(4),
            val_short: Some(v),
            ..Default::default()
        }
    }
    fn float(v: f32) -> KeyT {
        KeyT {
            r#type: Some(2),
            val_float: Some(v),
            ..Default::default()
        }
    }
    fn boolean(v: bool) -> KeyT {
        KeyT {
            r#type: Some(6),
            val_bool: Some(v),
            ..Default::default()
        }
    }
    fn parser_with_player(bytes: &[u8]) -> DemoParser<'_> {
        let mut parser = DemoParser::new(bytes, ParserSettings::default());
        parser.parse_game_event_list(&event_list()).unwrap();
        let mut player = Player::new(2);
        player.name = "flusha".to_string();
        player.user_id = 4;
        parser.game_state.players.insert(4, player);
        parser
    }

    #[test]
    fn test_parse_key_types() {
        assert_eq!(parse_key(&short(7)), Some(Variant::I32(7)));
        assert_eq!(parse_key(&boolean(true)), Some(Variant::Bool(true)));
        let wide = KeyT {
            r#type: Some(8),
            val_wstring: Some(b"de_inferno".to_vec()),
            ..Default::default()
        };
        assert_eq!(parse_key(&wide), Some(Variant::String("de_inferno".to_string())));
        assert_eq!(parse_key(&KeyT { r#type: Some(42), ..Default::default() }), None);
    }
    #[test]
    fn test_player_death() {
        let bytes = vec![];
        let mut parser = parser_with_player(&bytes);
        let killed = Rc::new(RefCell::new(vec![]));
        let k = killed.clone();
        parser
            .events
            .player_killed
            .subscribe(move |e: &PlayerKilledEvent| k.borrow_mut().push(e.clone()));
        let msg = CsvcMsgGameEvent {
            eventid: Some(1),
            keys: vec![
                short(9),
                short(4),
                short(0),
                KeyT {
                    r#type: Some(1),
                    val_string: Some("ak47".to_string()),
                    ..Default::default()
                },
                boolean(true),
                short(1),
            ],
            ..Default::default()
        };
        parser.parse_game_event(&msg.encode_to_vec()).unwrap();
        let killed = killed.borrow();
        assert_eq!(killed.len(), 1);
        assert!(killed[0].victim.is_none());
        assert_eq!(killed[0].killer.as_ref().map(|p| p.name.as_str()), Some("flusha"));
        assert_eq!(killed[0].weapon.weapon, EquipmentElement::AK47);
        assert!(killed[0].headshot);
        assert_eq!(killed[0].penetrated_objects, 1);
    }
    #[test]
    fn test_nade_fan_out_order() {
        let bytes = vec![];
        let mut parser = parser_with_player(&bytes);
        let log = Rc::new(RefCell::new(vec![]));
        let l = log.clone();
        parser.events.game_event.subscribe(move |e: &GameEvent| l.borrow_mut().push(e.name.clone()));
        let l = log.clone();
        parser
            .events
            .nade_reached_target
            .subscribe(move |e: &NadeEvent| l.borrow_mut().push(format!("reached {:?}", e.nade_type)));
        let l = log.clone();
        parser
            .events
            .smoke_nade_started
            .subscribe(move |e: &NadeEvent| l.borrow_mut().push(format!("smoke at {:?}", e.position)));
        let msg = CsvcMsgGameEvent {
            eventid: Some(2),
            keys: vec![short(4), short(120), float(1.0), float(2.0), float(3.0)],
            ..Default::default()
        };
        parser.parse_game_event(&msg.encode_to_vec()).unwrap();
        assert_eq!(
            *log.borrow(),
            vec![
                "smokegrenade_detonate".to_string(),
                "smoke at [1.0, 2.0, 3.0]".to_string(),
                "reached Smoke".to_string(),
            ]
        );
    }
    #[test]
    fn test_bomb_defuse_with_kit() {
        let bytes = vec![];
        let mut parser = parser_with_player(&bytes);
        let seen = Rc::new(RefCell::new(None));
        let s = seen.clone();
        parser
            .events
            .bomb_begin_defuse
            .subscribe(move |e: &BombDefuseEvent| *s.borrow_mut() = Some((e.player.clone().map(|p| p.user_id), e.has_kit)));
        let msg = CsvcMsgGameEvent {
            eventid: Some(3),
            keys: vec![short(4), boolean(true)],
            ..Default::default()
        };
        parser.parse_game_event(&msg.encode_to_vec()).unwrap();
        assert_eq!(*seen.borrow(), Some((Some(4), true)));
    }
    #[test]
    fn test_bomb_abort_defuse() {
        let bytes = vec![];
        let mut parser = parser_with_player(&bytes);
        let seen = Rc::new(RefCell::new(None));
        let s = seen.clone();
        parser
            .events
            .bomb_abort_defuse
            .subscribe(move |e: &BombDefuseEvent| *s.borrow_mut() = Some((e.player.clone().map(|p| p.user_id), e.has_kit)));
        let msg = CsvcMsgGameEvent {
            eventid: Some(4),
            keys: vec![short(4), short(1)],
            ..Default::default()
        };
        parser.parse_game_event(&msg.encode_to_vec()).unwrap();
        assert_eq!(*seen.borrow(), Some((Some(4), false)));
    }
    #[test]
    fn test_unknown_event_id_is_skipped() {
        let bytes = vec![];
        let mut parser = parser_with_player(&bytes);
        let msg = CsvcMsgGameEvent {
            eventid: Some(77),
            ..Default::default()
        };
        assert_eq!(parser.parse_game_event(&msg.encode_to_vec()), Ok(()));
    }
}

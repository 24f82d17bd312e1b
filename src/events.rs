use crate::equipment::Equipment;
use crate::equipment::EquipmentElement;
use crate::game_events::GameEvent;
use crate::game_state::Player;
use crate::header::DemoHeader;
use serde::Serialize;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

type Listener<E> = Rc<dyn Fn(&E)>;

/// Ordered listener list for one event kind.
///
/// Listeners run synchronously in registration order. Raising from inside a listener
/// (including for the same event kind) is allowed: each raise works on the listener list as
/// it was when the raise started. A panicking listener is not caught.
pub struct EventBus<E> {
    listeners: RefCell<Vec<Listener<E>>>,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        EventBus {
            listeners: RefCell::new(vec![]),
        }
    }
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl<E> EventBus<E> {
    pub fn subscribe(&self, listener: impl Fn(&E) + 'static) {
        self.listeners.borrow_mut().push(Rc::new(listener));
    }
    pub fn raise(&self, event: &E) {
        let snapshot: Vec<Listener<E>> = self.listeners.borrow().clone();
        for listener in snapshot {
            listener(event);
        }
    }
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HeaderParsedEvent {
    pub header: DemoHeader,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchStartedEvent {
    pub tick: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundStartedEvent {
    pub tick: i32,
    pub time_limit: i32,
    pub frag_limit: i32,
    pub objective: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TickDoneEvent {
    pub tick: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerKilledEvent {
    pub tick: i32,
    pub victim: Option<Player>,
    pub killer: Option<Player>,
    pub assister: Option<Player>,
    pub weapon: Equipment,
    pub headshot: bool,
    pub penetrated_objects: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeaponFiredEvent {
    pub tick: i32,
    pub shooter: Option<Player>,
    pub weapon: Equipment,
}

/// Grenade start, end and detonation events.
#[derive(Debug, Clone, Serialize)]
pub struct NadeEvent {
    pub tick: i32,
    pub nade_type: EquipmentElement,
    pub position: [f32; 3],
    pub thrower: Option<Player>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BombEvent {
    pub tick: i32,
    pub player: Option<Player>,
    pub site: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BombDefuseEvent {
    pub tick: i32,
    pub player: Option<Player>,
    pub has_kit: bool,
}

/// Every typed notification a parse can raise. Shared with consumers through an `Rc` so
/// listeners can be added while the parser is borrowed.
#[derive(Debug, Default)]
pub struct DemoEvents {
    pub header_parsed: EventBus<HeaderParsedEvent>,
    pub match_started: EventBus<MatchStartedEvent>,
    pub round_started: EventBus<RoundStartedEvent>,
    pub tick_done: EventBus<TickDoneEvent>,
    pub player_killed: EventBus<PlayerKilledEvent>,
    pub weapon_fired: EventBus<WeaponFiredEvent>,
    pub smoke_nade_started: EventBus<NadeEvent>,
    pub smoke_nade_ended: EventBus<NadeEvent>,
    pub decoy_nade_started: EventBus<NadeEvent>,
    pub decoy_nade_ended: EventBus<NadeEvent>,
    pub fire_nade_started: EventBus<NadeEvent>,
    pub fire_nade_ended: EventBus<NadeEvent>,
    pub flash_nade_exploded: EventBus<NadeEvent>,
    pub explosive_nade_exploded: EventBus<NadeEvent>,
    pub nade_reached_target: EventBus<NadeEvent>,
    pub bomb_begin_plant: EventBus<BombEvent>,
    pub bomb_abort_plant: EventBus<BombEvent>,
    pub bomb_planted: EventBus<BombEvent>,
    pub bomb_defused: EventBus<BombEvent>,
    pub bomb_exploded: EventBus<BombEvent>,
    pub bomb_begin_defuse: EventBus<BombDefuseEvent>,
    pub bomb_abort_defuse: EventBus<BombDefuseEvent>,
    /// Every decoded game event, raised before its typed counterpart.
    pub game_event: EventBus<GameEvent>,
}

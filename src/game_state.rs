use crate::sendtables::ServerClasses;
use crate::stringtables::UserInfo;
use crate::variants::Variant;
use ahash::AHashMap;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;
use tracing::warn;

pub const MAX_PLAYERS: usize = 64;
pub const PLAYER_CLASS: &str = "CCSPlayer";
pub const TEAM_CLASS: &str = "CCSTeam";
const CT_TEAM_NAME: &str = "CT";
const T_TEAM_NAME: &str = "TERRORIST";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Team {
    Spectate,
    Terrorist,
    CounterTerrorist,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Player {
    pub name: String,
    pub steamid: i64,
    pub user_id: i32,
    pub entity_id: i32,
    pub position: [f32; 3],
    pub last_alive_position: [f32; 3],
    pub velocity: [f32; 3],
    pub view_direction_x: f32,
    pub view_direction_y: f32,
    pub hp: i32,
    pub armor: i32,
    pub money: i32,
    pub has_defuse_kit: bool,
    pub has_helmet: bool,
    pub team_id: i32,
    pub team: Team,
}

impl Player {
    pub fn new(entity_id: i32) -> Player {
        Player {
            name: "unconnected".to_string(),
            steamid: -1,
            user_id: -1,
            entity_id,
            position: [0.0; 3],
            last_alive_position: [0.0; 3],
            velocity: [0.0; 3],
            view_direction_x: 0.0,
            view_direction_y: 0.0,
            hp: 0,
            armor: 0,
            money: 0,
            has_defuse_kit: false,
            has_helmet: false,
            team_id: -1,
            team: Team::Spectate,
        }
    }
    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamInfo {
    pub name: String,
    pub team_num: i32,
    pub score: i32,
}

impl Default for TeamInfo {
    fn default() -> Self {
        TeamInfo {
            name: String::new(),
            team_num: -1,
            score: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerField {
    OriginXY,
    OriginZ,
    TeamNum,
    Health,
    Armor,
    HasDefuser,
    HasHelmet,
    Money,
    ViewX,
    ViewY,
    VelocityX,
    VelocityY,
    VelocityZ,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamField {
    Name,
    TeamNum,
    Score,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Player(PlayerField),
    Team(TeamField),
}

static PLAYER_PROPS: &[(&str, PlayerField)] = &[
    ("cslocaldata.m_vecOrigin", PlayerField::OriginXY),
    ("cslocaldata.m_vecOrigin[2]", PlayerField::OriginZ),
    ("csnonlocaldata.m_vecOrigin", PlayerField::OriginXY),
    ("csnonlocaldata.m_vecOrigin[2]", PlayerField::OriginZ),
    ("m_iTeamNum", PlayerField::TeamNum),
    ("m_iHealth", PlayerField::Health),
    ("m_ArmorValue", PlayerField::Armor),
    ("m_bHasDefuser", PlayerField::HasDefuser),
    ("m_bHasHelmet", PlayerField::HasHelmet),
    ("m_iAccount", PlayerField::Money),
    ("m_angEyeAngles[1]", PlayerField::ViewX),
    ("m_angEyeAngles[0]", PlayerField::ViewY),
    ("localdata.m_vecVelocity[0]", PlayerField::VelocityX),
    ("localdata.m_vecVelocity[1]", PlayerField::VelocityY),
    ("localdata.m_vecVelocity[2]", PlayerField::VelocityZ),
];

static TEAM_PROPS: &[(&str, TeamField)] = &[
    ("m_szTeamname", TeamField::Name),
    ("m_iTeamNum", TeamField::TeamNum),
    ("m_scoreTotal", TeamField::Score),
];

/// Players and teams projected from CCSPlayer / CCSTeam entities. Updated as a pure reaction
/// to decoded property values in decode order.
#[derive(Debug, Clone)]
pub struct GameState {
    /// Indexed by entity id - 1.
    pub player_slots: Vec<Option<Player>>,
    /// Indexed by userinfo string table row.
    pub raw_players: Vec<Option<UserInfo>>,
    /// Reconciled players keyed by user id.
    pub players: BTreeMap<i32, Player>,
    pub teams: AHashMap<i32, TeamInfo>,
    pub ct_id: i32,
    pub t_id: i32,
    pub ct_score: i32,
    pub t_score: i32,
    bindings: AHashMap<(u32, u32), Binding>,
    player_cls: Option<u32>,
    team_cls: Option<u32>,
}

impl Default for GameState {
    fn default() -> Self {
        GameState {
            player_slots: vec![None; MAX_PLAYERS],
            raw_players: vec![None; MAX_PLAYERS],
            players: BTreeMap::new(),
            teams: AHashMap::default(),
            ct_id: -1,
            t_id: -1,
            ct_score: 0,
            t_score: 0,
            bindings: AHashMap::default(),
            player_cls: None,
            team_cls: None,
        }
    }
}

impl GameState {
    /// Resolves the tracked prop names against the schema once it is known.
    pub fn bind(&mut self, classes: &ServerClasses) {
        if let Some(cls) = classes.find_by_name(PLAYER_CLASS) {
            self.player_cls = Some(cls.id);
            for (name, field) in PLAYER_PROPS {
                if let Some(idx) = cls.prop_index(name) {
                    self.bindings.insert((cls.id, idx), Binding::Player(*field));
                }
            }
        }
        if let Some(cls) = classes.find_by_name(TEAM_CLASS) {
            self.team_cls = Some(cls.id);
            for (name, field) in TEAM_PROPS {
                if let Some(idx) = cls.prop_index(name) {
                    self.bindings.insert((cls.id, idx), Binding::Team(*field));
                }
            }
        }
        debug!("bound {} player/team props", self.bindings.len());
    }
    #[inline]
    pub fn binding(&self, cls_id: u32, prop_idx: u32) -> Option<Binding> {
        self.bindings.get(&(cls_id, prop_idx)).copied()
    }
    pub fn on_entity_created(&mut self, entity_id: i32, cls_id: u32) {
        if Some(cls_id) == self.player_cls {
            match player_slot(entity_id) {
                Some(slot) => self.player_slots[slot] = Some(Player::new(entity_id)),
                None => warn!("player entity {} outside of player slots", entity_id),
            }
        } else if Some(cls_id) == self.team_cls {
            self.teams.insert(entity_id, TeamInfo::default());
        }
    }
    pub fn apply(&mut self, binding: Binding, entity_id: i32, value: &Variant) {
        match binding {
            Binding::Player(field) => self.apply_player(field, entity_id, value),
            Binding::Team(field) => self.apply_team(field, entity_id, value),
        }
    }
    fn apply_player(&mut self, field: PlayerField, entity_id: i32, value: &Variant) {
        let team = value.as_i32().map(|team_id| self.classify(team_id));
        let player = match player_slot(entity_id).and_then(|slot| self.player_slots[slot].as_mut()) {
            Some(player) => player,
            None => return,
        };
        match field {
            PlayerField::OriginXY => {
                if let Some([x, y]) = value.as_vec_xy() {
                    player.position[0] = x;
                    player.position[1] = y;
                }
            }
            PlayerField::OriginZ => player.position[2] = value.as_f32().unwrap_or(player.position[2]),
            PlayerField::TeamNum => {
                if let (Some(team_id), Some(team)) = (value.as_i32(), team) {
                    player.team_id = team_id;
                    player.team = team;
                }
            }
            PlayerField::Health => player.hp = value.as_i32().unwrap_or(player.hp),
            PlayerField::Armor => player.armor = value.as_i32().unwrap_or(player.armor),
            PlayerField::HasDefuser => player.has_defuse_kit = value.as_bool().unwrap_or(player.has_defuse_kit),
            PlayerField::HasHelmet => player.has_helmet = value.as_bool().unwrap_or(player.has_helmet),
            PlayerField::Money => player.money = value.as_i32().unwrap_or(player.money),
            PlayerField::ViewX => player.view_direction_x = value.as_f32().unwrap_or(player.view_direction_x),
            PlayerField::ViewY => player.view_direction_y = value.as_f32().unwrap_or(player.view_direction_y),
            PlayerField::VelocityX => player.velocity[0] = value.as_f32().unwrap_or(player.velocity[0]),
            PlayerField::VelocityY => player.velocity[1] = value.as_f32().unwrap_or(player.velocity[1]),
            PlayerField::VelocityZ => player.velocity[2] = value.as_f32().unwrap_or(player.velocity[2]),
        }
    }
    fn apply_team(&mut self, field: TeamField, entity_id: i32, value: &Variant) {
        let team = self.teams.entry(entity_id).or_default();
        match field {
            TeamField::Name => {
                if let Some(name) = value.as_str() {
                    team.name = name.to_string();
                }
            }
            TeamField::TeamNum => team.team_num = value.as_i32().unwrap_or(team.team_num),
            TeamField::Score => team.score = value.as_i32().unwrap_or(team.score),
        }
        let team = team.clone();
        match team.name.as_str() {
            CT_TEAM_NAME => {
                if team.team_num >= 0 {
                    self.ct_id = team.team_num;
                }
                self.ct_score = team.score;
            }
            T_TEAM_NAME => {
                if team.team_num >= 0 {
                    self.t_id = team.team_num;
                }
                self.t_score = team.score;
            }
            _ => return,
        }
        self.reclassify_players();
    }
    /// Negative ids mean "not known yet" on both sides and never match.
    pub fn classify(&self, team_id: i32) -> Team {
        if team_id < 0 {
            Team::Spectate
        } else if team_id == self.ct_id {
            Team::CounterTerrorist
        } else if team_id == self.t_id {
            Team::Terrorist
        } else {
            Team::Spectate
        }
    }
    /// Team ids can become known after players already reported theirs.
    fn reclassify_players(&mut self) {
        let mut slots = std::mem::take(&mut self.player_slots);
        for player in slots.iter_mut().flatten() {
            player.team = self.classify(player.team_id);
        }
        self.player_slots = slots;
    }
    /// Copies userinfo identity onto the tracked player of the same slot and publishes it by
    /// user id.
    pub fn reconcile_players(&mut self) {
        for (slot, raw) in self.raw_players.iter().enumerate() {
            let raw = match raw {
                Some(raw) => raw,
                None => continue,
            };
            let player = match self.player_slots.get_mut(slot).and_then(|p| p.as_mut()) {
                Some(player) => player,
                None => continue,
            };
            player.name = raw.name.clone();
            player.steamid = raw.xuid;
            player.user_id = raw.user_id;
            if player.is_alive() {
                player.last_alive_position = player.position;
            }
            self.players.insert(raw.user_id, player.clone());
        }
    }
    pub fn player_by_user_id(&self, user_id: i32) -> Option<&Player> {
        self.players.get(&user_id)
    }
}

fn player_slot(entity_id: i32) -> Option<usize> {
    let slot = entity_id.checked_sub(1)?;
    if slot < 0 || slot as usize >= MAX_PLAYERS {
        return None;
    }
    Some(slot as usize)
}

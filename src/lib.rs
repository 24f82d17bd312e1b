//! Decoder for Source engine "HL2DEMO" recordings (CS:GO).
//!
//! ```no_run
//! use sourcedemo::{DemoParser, ParserSettings};
//!
//! let bytes = std::fs::read("match.dem").unwrap();
//! let mut parser = DemoParser::new(&bytes, ParserSettings::default());
//! parser.events().player_killed.subscribe(|e| println!("{:?} killed {:?}", e.killer, e.victim));
//! parser.parse_to_end().unwrap();
//! ```
pub mod decoder;
pub mod entities;
pub mod equipment;
pub mod events;
pub mod game_events;
pub mod game_state;
pub mod header;
pub mod netmessages;
pub mod parser;
pub mod parser_settings;
pub mod prop_events;
pub mod read_bits;
pub mod read_bytes;
pub mod sendtables;
pub mod stringtables;
pub mod variants;

#[cfg(test)]
mod test_utils;

pub use entities::Entity;
pub use events::DemoEvents;
pub use game_events::GameEvent;
pub use game_state::Player;
pub use game_state::Team;
pub use header::DemoHeader;
pub use parser_settings::DemoParser;
pub use parser_settings::ParserSettings;
pub use prop_events::PropertyUpdate;
pub use read_bits::DemoParserError;
pub use variants::Variant;

use crate::game_state::MAX_PLAYERS;
use crate::netmessages::CsvcMsgCreateStringTable;
use crate::netmessages::CsvcMsgUpdateStringTable;
use crate::parser_settings::DemoParser;
use crate::read_bits::Bitreader;
use crate::read_bits::DemoParserError;
use ahash::AHashMap;
use prost::Message;
use serde::Serialize;
use tracing::debug;
use tracing::warn;

pub const USERINFO_TABLE: &str = "userinfo";
pub const INSTANCE_BASELINE_TABLE: &str = "instancebaseline";
const USER_DATA_LENGTH_BITS: u32 = 14;
const KEY_HISTORY_SIZE: usize = 32;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StringTableEntry {
    pub key: String,
    pub value: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StringTable {
    pub name: String,
    pub max_entries: i32,
    pub user_data_fixed_size: bool,
    pub user_data_size: i32,
    pub user_data_size_bits: i32,
    pub entries: Vec<StringTableEntry>,
}

impl StringTable {
    pub fn new(name: &str, max_entries: i32) -> StringTable {
        StringTable {
            name: name.to_string(),
            max_entries,
            user_data_fixed_size: false,
            user_data_size: 0,
            user_data_size_bits: 0,
            entries: vec![],
        }
    }
    pub fn from_message(msg: &CsvcMsgCreateStringTable) -> StringTable {
        StringTable {
            name: msg.name().to_string(),
            max_entries: msg.max_entries(),
            user_data_fixed_size: msg.user_data_fixed_size(),
            user_data_size: msg.user_data_size(),
            user_data_size_bits: msg.user_data_size_bits(),
            entries: vec![],
        }
    }
    /// floor(log2(max_entries))
    pub fn entry_bits(&self) -> u32 {
        if self.max_entries <= 1 {
            return 0;
        }
        31 - (self.max_entries as u32).leading_zeros()
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    pub fn get(&self, idx: usize) -> Option<&StringTableEntry> {
        self.entries.get(idx)
    }
    pub fn find(&self, key: &str) -> Option<&StringTableEntry> {
        self.entries.iter().find(|e| e.key == key)
    }
    /// Writing past the end appends (filling any gap with empty rows), otherwise the row is
    /// updated in place. A missing key or value keeps what the row had.
    pub fn set_entry(&mut self, idx: usize, key: Option<String>, value: Option<Vec<u8>>) {
        if idx >= self.entries.len() {
            self.entries.resize_with(idx + 1, StringTableEntry::default);
        }
        let entry = &mut self.entries[idx];
        if let Some(key) = key {
            entry.key = key;
        }
        if let Some(value) = value {
            entry.value = value;
        }
    }
    /// Drops a row. Rows keep their index: the last row is popped, any other row is emptied.
    pub fn remove_entry(&mut self, idx: usize) -> Option<StringTableEntry> {
        if idx >= self.entries.len() {
            return None;
        }
        if idx == self.entries.len() - 1 {
            return self.entries.pop();
        }
        Some(std::mem::take(&mut self.entries[idx]))
    }
    /// Applies n bit packed entry operations, returns the indices of touched rows.
    pub fn parse_update(&mut self, bitreader: &mut Bitreader, n_updates: i32) -> Result<Vec<usize>, DemoParserError> {
        if bitreader.read_boolean()? {
            return Err(DemoParserError::DictionaryEncodedStringTable(self.name.clone()));
        }
        let entry_bits = self.entry_bits();
        let mut idx: i32 = -1;
        let mut keys: Vec<String> = vec![];
        let mut changed = vec![];

        for _upd in 0..n_updates {
            match bitreader.read_boolean()? {
                true => idx += 1,
                false => idx = bitreader.read_nbits(entry_bits)? as i32,
            };
            if idx < 0 || idx >= self.max_entries {
                return Err(DemoParserError::StringTableIndexOutOfBounds(idx));
            }
            let mut key = None;
            if bitreader.read_boolean()? {
                key = match bitreader.read_boolean()? {
                    false => Some(bitreader.read_string()?),
                    // Prefix copied from a recent key
                    true => {
                        let position = bitreader.read_nbits(5)?;
                        let length = bitreader.read_nbits(5)? as usize;
                        let suffix = bitreader.read_string()?;
                        match keys.get(position as usize) {
                            Some(s) => {
                                let prefix = s.get(0..length.min(s.len())).unwrap_or("");
                                Some(prefix.to_owned() + &suffix)
                            }
                            None => Some(suffix),
                        }
                    }
                };
            }
            if keys.len() >= KEY_HISTORY_SIZE {
                keys.remove(0);
            }
            keys.push(key.clone().unwrap_or_default());

            let mut value = None;
            if bitreader.read_boolean()? {
                value = match self.user_data_fixed_size {
                    true => Some(bitreader.read_bits_to_bytes(self.user_data_size_bits.max(0) as u32)?),
                    false => {
                        let n_bytes = bitreader.read_nbits(USER_DATA_LENGTH_BITS)?;
                        Some(bitreader.read_n_bytes(n_bytes as usize)?)
                    }
                };
            }
            self.set_entry(idx as usize, key, value);
            changed.push(idx as usize);
        }
        Ok(changed)
    }
}

/// Every string table of a demo indexed by creation order, plus the snapshot rows cached by
/// table name that newly created tables are seeded from.
#[derive(Clone, Debug, Default)]
pub struct StringTables {
    pub tables: Vec<StringTable>,
    pub baselines: AHashMap<String, Vec<StringTableEntry>>,
}

impl StringTables {
    pub fn create(&mut self, mut table: StringTable, use_baseline: bool) -> usize {
        if use_baseline {
            if let Some(baseline) = self.baselines.get(&table.name) {
                table.entries = baseline.clone();
            }
        }
        self.tables.push(table);
        self.tables.len() - 1
    }
    pub fn get(&self, table_id: usize) -> Option<&StringTable> {
        self.tables.get(table_id)
    }
    pub fn find_id(&self, name: &str) -> Option<usize> {
        self.tables.iter().position(|t| t.name == name)
    }
    pub fn by_name(&self, name: &str) -> Option<&StringTable> {
        self.find_id(name).and_then(|id| self.tables.get(id))
    }
    pub fn has_baseline(&self, name: &str) -> bool {
        self.baselines.contains_key(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserInfo {
    pub version: i64,
    pub xuid: i64,
    pub name: String,
    pub user_id: i32,
    pub guid: String,
    pub friends_id: i32,
    pub friends_name: String,
    pub is_fake_player: bool,
    pub is_hltv: bool,
    pub custom_files: [i32; 4],
    pub files_downloaded: u8,
}

// player_info_t, big endian with the struct padding of the game.
pub const USERINFO_SIZE: usize = 340;

impl UserInfo {
    pub fn parse(bytes: &[u8]) -> Result<UserInfo, DemoParserError> {
        if bytes.len() < 337 {
            return Err(DemoParserError::OutOfBytesError);
        }
        Ok(UserInfo {
            version: be_i64(bytes, 0),
            xuid: be_i64(bytes, 8),
            name: c_string(&bytes[16..144]),
            user_id: be_i32(bytes, 144),
            guid: c_string(&bytes[148..181]),
            friends_id: be_i32(bytes, 184),
            friends_name: c_string(&bytes[188..316]),
            is_fake_player: bytes[316] != 0,
            is_hltv: bytes[317] != 0,
            custom_files: [be_i32(bytes, 320), be_i32(bytes, 324), be_i32(bytes, 328), be_i32(bytes, 332)],
            files_downloaded: bytes[336],
        })
    }
}

fn be_i64(bytes: &[u8], offset: usize) -> i64 {
    let mut arr = [0_u8; 8];
    arr.copy_from_slice(&bytes[offset..offset + 8]);
    i64::from_be_bytes(arr)
}
fn be_i32(bytes: &[u8], offset: usize) -> i32 {
    let mut arr = [0_u8; 4];
    arr.copy_from_slice(&bytes[offset..offset + 4]);
    i32::from_be_bytes(arr)
}
fn c_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).to_string()
}

fn read_snapshot_entries(bitreader: &mut Bitreader) -> Result<Vec<StringTableEntry>, DemoParserError> {
    let n_entries = bitreader.read_nbits(16)?;
    let mut entries = Vec::with_capacity(n_entries as usize);
    for _ in 0..n_entries {
        let key = bitreader.read_string()?;
        let mut value = vec![];
        if bitreader.read_boolean()? {
            let n_bytes = bitreader.read_nbits(16)?;
            value = bitreader.read_n_bytes(n_bytes as usize)?;
        }
        entries.push(StringTableEntry { key, value });
    }
    Ok(entries)
}

impl<'a> DemoParser<'a> {
    pub fn parse_create_stringtable(&mut self, bytes: &[u8]) -> Result<(), DemoParserError> {
        let msg = CsvcMsgCreateStringTable::decode(bytes).map_err(|_| DemoParserError::MalformedMessage)?;
        let use_baseline = self.string_tables.has_baseline(msg.name());
        let table_id = self.string_tables.create(StringTable::from_message(&msg), use_baseline);

        let mut bitreader = Bitreader::new(msg.string_data());
        let table = &mut self.string_tables.tables[table_id];
        let mut changed = table.parse_update(&mut bitreader, msg.num_entries())?;
        if use_baseline {
            changed = (0..table.len()).collect();
        }
        debug!(
            "created string table {} ({}) with {} entries, baseline: {}",
            msg.name(),
            table_id,
            table.len(),
            use_baseline
        );
        self.handle_string_table_rows(table_id, &changed);
        Ok(())
    }
    pub fn parse_update_stringtable(&mut self, bytes: &[u8]) -> Result<(), DemoParserError> {
        let msg = CsvcMsgUpdateStringTable::decode(bytes).map_err(|_| DemoParserError::MalformedMessage)?;
        let table_id = msg.table_id();
        let table = match self.string_tables.tables.get_mut(table_id.max(0) as usize) {
            Some(table) if table_id >= 0 => table,
            _ => return Err(DemoParserError::StringTableNotFound(table_id)),
        };
        let mut bitreader = Bitreader::new(msg.string_data());
        let changed = table.parse_update(&mut bitreader, msg.num_changed_entries())?;
        self.handle_string_table_rows(table_id as usize, &changed);
        Ok(())
    }
    /// Full string table snapshot. Rows are cached as baselines by table name and also
    /// written into an already existing table of that name.
    pub fn parse_stringtables_snapshot(&mut self, bytes: &[u8]) -> Result<(), DemoParserError> {
        let mut bitreader = Bitreader::new(bytes);
        let n_tables = bitreader.read_nbits(8)?;
        for _ in 0..n_tables {
            let name = bitreader.read_string()?;
            let entries = read_snapshot_entries(&mut bitreader)?;
            // Client side rows, not networked to anything we track
            if bitreader.read_boolean()? {
                read_snapshot_entries(&mut bitreader)?;
            }
            if let Some(table_id) = self.string_tables.find_id(&name) {
                let table = &mut self.string_tables.tables[table_id];
                for (idx, entry) in entries.iter().enumerate() {
                    let value = match entry.value.is_empty() {
                        true => None,
                        false => Some(entry.value.clone()),
                    };
                    table.set_entry(idx, Some(entry.key.clone()), value);
                }
                let rows: Vec<usize> = (0..entries.len()).collect();
                self.handle_string_table_rows(table_id, &rows);
            }
            self.string_tables.baselines.insert(name, entries);
        }
        Ok(())
    }
    fn handle_string_table_rows(&mut self, table_id: usize, rows: &[usize]) {
        let table = match self.string_tables.tables.get(table_id) {
            Some(table) => table,
            None => return,
        };
        match table.name.as_str() {
            USERINFO_TABLE => {
                for row in rows {
                    let entry = match table.entries.get(*row) {
                        Some(entry) if !entry.value.is_empty() => entry,
                        _ => continue,
                    };
                    if *row >= MAX_PLAYERS {
                        warn!("userinfo row {} beyond player slots", row);
                        continue;
                    }
                    match UserInfo::parse(&entry.value) {
                        Ok(info) => self.game_state.raw_players[*row] = Some(info),
                        Err(e) => warn!("could not parse userinfo row {}: {}", row, e),
                    }
                }
            }
            INSTANCE_BASELINE_TABLE => {
                for row in rows {
                    let entry = match table.entries.get(*row) {
                        Some(entry) if !entry.value.is_empty() => entry,
                        _ => continue,
                    };
                    match entry.key.parse::<u32>() {
                        Ok(cls_id) => {
                            self.instance_baselines.insert(cls_id, entry.value.clone());
                            self.baseline_cache.remove(&cls_id);
                        }
                        Err(_) => warn!("instancebaseline key {:?} is not a class id", entry.key),
                    }
                }
            }
            _ => {}
        }
    }
}

use crate::equipment::equipment_from_dt_name;
use crate::equipment::EquipmentElement;
use crate::netmessages::CsvcMsgSendTable;
use crate::netmessages::NetmessageType;
use crate::read_bits::DemoParserError;
use crate::read_bytes::ByteReader;
use ahash::AHashMap;
use itertools::Itertools;
use prost::Message;
use tracing::debug;

pub const PROP_FLAG_UNSIGNED: u32 = 1 << 0;
pub const PROP_FLAG_COORD: u32 = 1 << 1;
pub const PROP_FLAG_NOSCALE: u32 = 1 << 2;
pub const PROP_FLAG_ROUNDDOWN: u32 = 1 << 3;
pub const PROP_FLAG_ROUNDUP: u32 = 1 << 4;
pub const PROP_FLAG_NORMAL: u32 = 1 << 5;
pub const PROP_FLAG_EXCLUDE: u32 = 1 << 6;
pub const PROP_FLAG_XYZE: u32 = 1 << 7;
pub const PROP_FLAG_INSIDEARRAY: u32 = 1 << 8;
pub const PROP_FLAG_PROXY_ALWAYS_YES: u32 = 1 << 9;
pub const PROP_FLAG_IS_A_VECTOR_ELEM: u32 = 1 << 10;
pub const PROP_FLAG_COLLAPSIBLE: u32 = 1 << 11;
pub const PROP_FLAG_COORD_MP: u32 = 1 << 12;
pub const PROP_FLAG_COORD_MP_LOWPRECISION: u32 = 1 << 13;
pub const PROP_FLAG_COORD_MP_INTEGRAL: u32 = 1 << 14;
pub const PROP_FLAG_CELL_COORD: u32 = 1 << 15;
pub const PROP_FLAG_CELL_COORD_LOWPRECISION: u32 = 1 << 16;
pub const PROP_FLAG_CELL_COORD_INTEGRAL: u32 = 1 << 17;
pub const PROP_FLAG_CHANGES_OFTEN: u32 = 1 << 18;
pub const PROP_FLAG_VARINT: u32 = 1 << 19;

// Props flagged CHANGES_OFTEN are sorted together with this priority.
const CHANGES_OFTEN_PRIORITY: i32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendPropType {
    Int,
    Float,
    Vector,
    VectorXY,
    String,
    Array,
    DataTable,
    Int64,
}

impl SendPropType {
    pub fn from_raw(raw: i32) -> Result<SendPropType, DemoParserError> {
        match raw {
            0 => Ok(SendPropType::Int),
            1 => Ok(SendPropType::Float),
            2 => Ok(SendPropType::Vector),
            3 => Ok(SendPropType::VectorXY),
            4 => Ok(SendPropType::String),
            5 => Ok(SendPropType::Array),
            6 => Ok(SendPropType::DataTable),
            7 => Ok(SendPropType::Int64),
            _ => Err(DemoParserError::UnknownPropType(raw)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SendProp {
    pub prop_type: SendPropType,
    pub name: String,
    pub flags: u32,
    pub priority: i32,
    pub dt_name: String,
    pub num_elements: i32,
    pub low_value: f32,
    pub high_value: f32,
    pub num_bits: u32,
}

impl SendProp {
    #[inline(always)]
    pub fn has_flag(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SendTable {
    pub name: String,
    pub needs_decoder: bool,
    pub props: Vec<SendProp>,
}

impl SendTable {
    pub fn from_message(msg: &CsvcMsgSendTable) -> Result<SendTable, DemoParserError> {
        let mut props = Vec::with_capacity(msg.props.len());
        for p in &msg.props {
            props.push(SendProp {
                prop_type: SendPropType::from_raw(p.r#type())?,
                name: p.var_name().to_string(),
                flags: p.flags() as u32,
                priority: p.priority(),
                dt_name: p.dt_name().to_string(),
                num_elements: p.num_elements(),
                low_value: p.low_value(),
                high_value: p.high_value(),
                num_bits: p.num_bits().max(0) as u32,
            });
        }
        Ok(SendTable {
            name: msg.net_table_name().to_string(),
            needs_decoder: msg.needs_decoder(),
            props,
        })
    }
}

/// One entry of a class's flattened property list. Its position in that list is the
/// index used on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct FlattenedProp {
    pub name: String,
    pub prop: SendProp,
    pub array_element_prop: Option<SendProp>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerClass {
    pub id: u32,
    pub name: String,
    pub dt_name: String,
    pub props: Vec<FlattenedProp>,
}

impl ServerClass {
    pub fn prop_index(&self, name: &str) -> Option<u32> {
        self.props.iter().position(|p| p.name == name).map(|i| i as u32)
    }
}

/// Registry of every networked class of a demo, indexed by class id.
#[derive(Debug, Clone, Default)]
pub struct ServerClasses {
    pub classes: Vec<ServerClass>,
    pub send_tables: Vec<SendTable>,
    pub class_bits: u32,
    pub equipment_mapping: AHashMap<u32, EquipmentElement>,
    by_name: AHashMap<String, u32>,
}

impl ServerClasses {
    pub fn build(send_tables: Vec<SendTable>, class_infos: Vec<(u32, String, String)>) -> Result<ServerClasses, DemoParserError> {
        let table_indices: AHashMap<String, usize> = send_tables
            .iter()
            .enumerate()
            .map(|(idx, table)| (table.name.clone(), idx))
            .collect();
        let mut classes = Vec::with_capacity(class_infos.len());
        for (id, name, dt_name) in class_infos.into_iter().sorted_by_key(|info| info.0) {
            if id as usize != classes.len() {
                return Err(DemoParserError::ClsIdOutOfBounds(id));
            }
            let mut flattener = Flattener {
                tables: &send_tables,
                table_indices: &table_indices,
                stack: vec![],
                excludes: vec![],
            };
            let props = flattener.flatten(&dt_name)?;
            classes.push(ServerClass { id, name, dt_name, props });
        }
        let by_name = classes.iter().map(|cls| (cls.name.clone(), cls.id)).collect();
        let equipment_mapping = classes
            .iter()
            .filter_map(|cls| equipment_from_dt_name(&cls.dt_name).map(|eq| (cls.id, eq)))
            .collect();
        Ok(ServerClasses {
            class_bits: class_bits(classes.len()),
            classes,
            send_tables,
            equipment_mapping,
            by_name,
        })
    }
    #[inline]
    pub fn get(&self, cls_id: u32) -> Option<&ServerClass> {
        self.classes.get(cls_id as usize)
    }
    pub fn find_by_name(&self, name: &str) -> Option<&ServerClass> {
        self.by_name.get(name).and_then(|id| self.get(*id))
    }
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
    pub fn len(&self) -> usize {
        self.classes.len()
    }
}

pub fn class_bits(n_classes: usize) -> u32 {
    if n_classes <= 1 {
        return 0;
    }
    (n_classes as f64).log2().ceil() as u32
}

/// Decodes the block of a data tables command: send tables until the end marker, then the
/// class list.
pub fn parse_datatables(bytes: &[u8]) -> Result<ServerClasses, DemoParserError> {
    let mut reader = ByteReader::new(bytes);
    let mut send_tables = vec![];
    loop {
        let msg_type = reader.read_varint()?;
        if msg_type != NetmessageType::SvcSendTable.id() {
            return Err(DemoParserError::ExpectedSendTable(msg_type));
        }
        let size = reader.read_varint()?;
        let msg_bytes = reader.read_n_bytes(size as usize)?;
        let msg = match CsvcMsgSendTable::decode(msg_bytes) {
            Err(_) => return Err(DemoParserError::MalformedMessage),
            Ok(msg) => msg,
        };
        if msg.is_end() {
            break;
        }
        send_tables.push(SendTable::from_message(&msg)?);
    }
    let n_classes = reader.read_u16()?;
    let mut class_infos = Vec::with_capacity(n_classes as usize);
    for _ in 0..n_classes {
        let id = reader.read_u16()? as u32;
        if id >= n_classes as u32 {
            return Err(DemoParserError::ClsIdOutOfBounds(id));
        }
        let name = reader.read_null_terminated_string()?;
        let dt_name = reader.read_null_terminated_string()?;
        class_infos.push((id, name, dt_name));
    }
    let classes = ServerClasses::build(send_tables, class_infos)?;
    debug!(
        "parsed {} send tables and {} server classes ({} class bits)",
        classes.send_tables.len(),
        classes.len(),
        classes.class_bits
    );
    Ok(classes)
}

#[derive(Debug, Clone, PartialEq)]
struct ExcludeEntry {
    var_name: String,
    dt_name: String,
    excluding_table: String,
}

struct Flattener<'a> {
    tables: &'a [SendTable],
    table_indices: &'a AHashMap<String, usize>,
    // Tables currently being walked, a table showing up twice here is a cycle.
    stack: Vec<usize>,
    excludes: Vec<ExcludeEntry>,
}

impl<'a> Flattener<'a> {
    fn flatten(&mut self, dt_name: &str) -> Result<Vec<FlattenedProp>, DemoParserError> {
        let root = self.table_index(dt_name)?;
        self.gather_excludes(root)?;
        let mut out = vec![];
        self.gather_props(root, "", &mut out)?;
        sort_by_priority(&mut out);
        Ok(out)
    }
    fn table_index(&self, name: &str) -> Result<usize, DemoParserError> {
        match self.table_indices.get(name) {
            Some(idx) => Ok(*idx),
            None => Err(DemoParserError::SendTableNotFound(name.to_string())),
        }
    }
    fn enter(&mut self, table_idx: usize) -> Result<(), DemoParserError> {
        if self.stack.contains(&table_idx) {
            return Err(DemoParserError::CyclicSendTable(self.tables[table_idx].name.clone()));
        }
        self.stack.push(table_idx);
        Ok(())
    }
    fn leave(&mut self) {
        self.stack.pop();
    }
    fn gather_excludes(&mut self, table_idx: usize) -> Result<(), DemoParserError> {
        self.enter(table_idx)?;
        let tables = self.tables;
        let table = &tables[table_idx];
        for prop in &table.props {
            if prop.has_flag(PROP_FLAG_EXCLUDE) {
                self.excludes.push(ExcludeEntry {
                    var_name: prop.name.clone(),
                    dt_name: prop.dt_name.clone(),
                    excluding_table: table.name.clone(),
                });
            }
            if prop.prop_type == SendPropType::DataTable {
                let sub = self.table_index(&prop.dt_name)?;
                self.gather_excludes(sub)?;
            }
        }
        self.leave();
        Ok(())
    }
    fn is_excluded(&self, table: &SendTable, prop: &SendProp) -> bool {
        self.excludes
            .iter()
            .any(|e| e.dt_name == table.name && e.var_name == prop.name)
    }
    fn gather_props(&mut self, table_idx: usize, prefix: &str, out: &mut Vec<FlattenedProp>) -> Result<(), DemoParserError> {
        let mut tmp = vec![];
        self.iterate_props(table_idx, prefix, &mut tmp, out)?;
        out.extend(tmp);
        Ok(())
    }
    fn iterate_props(
        &mut self,
        table_idx: usize,
        prefix: &str,
        tmp: &mut Vec<FlattenedProp>,
        out: &mut Vec<FlattenedProp>,
    ) -> Result<(), DemoParserError> {
        self.enter(table_idx)?;
        let tables = self.tables;
        let table = &tables[table_idx];
        for (i, prop) in table.props.iter().enumerate() {
            if prop.has_flag(PROP_FLAG_INSIDEARRAY) || prop.has_flag(PROP_FLAG_EXCLUDE) || self.is_excluded(table, prop) {
                continue;
            }
            match prop.prop_type {
                SendPropType::DataTable => {
                    let sub = self.table_index(&prop.dt_name)?;
                    if prop.has_flag(PROP_FLAG_COLLAPSIBLE) {
                        self.iterate_props(sub, prefix, tmp, out)?;
                    } else {
                        let sub_prefix = match prop.name.is_empty() {
                            true => prefix.to_string(),
                            false => format!("{}{}.", prefix, prop.name),
                        };
                        // Sub tables land in the class list before the current level's own props
                        self.gather_props(sub, &sub_prefix, out)?;
                    }
                }
                SendPropType::Array => {
                    let element = match i.checked_sub(1).and_then(|prev| table.props.get(prev)) {
                        Some(element) => element.clone(),
                        None => return Err(DemoParserError::MissingArrayElement(prop.name.clone())),
                    };
                    tmp.push(FlattenedProp {
                        name: format!("{}{}", prefix, prop.name),
                        prop: prop.clone(),
                        array_element_prop: Some(element),
                    });
                }
                _ => {
                    tmp.push(FlattenedProp {
                        name: format!("{}{}", prefix, prop.name),
                        prop: prop.clone(),
                        array_element_prop: None,
                    });
                }
            }
        }
        self.leave();
        Ok(())
    }
}

fn sort_by_priority(props: &mut [FlattenedProp]) {
    let priorities: Vec<i32> = std::iter::once(CHANGES_OFTEN_PRIORITY)
        .chain(props.iter().map(|p| p.prop.priority))
        .unique()
        .sorted()
        .collect();
    let mut start = 0;
    for priority in priorities {
        loop {
            let mut current = start;
            while current < props.len() {
                let prop = &props[current].prop;
                if prop.priority == priority
                    || (priority == CHANGES_OFTEN_PRIORITY && prop.has_flag(PROP_FLAG_CHANGES_OFTEN))
                {
                    props.swap(start, current);
                    start += 1;
                    break;
                }
                current += 1;
            }
            if current == props.len() {
                break;
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::netmessages::csvc_msg_send_table::SendpropT;
    use crate::test_utils::frame_message;

    pub fn prop(name: &str, prop_type: SendPropType, num_bits: u32) -> SendProp {
        SendProp {
            prop_type,
            name: name.to_string(),
            flags: 0,
            priority: 128,
            dt_name: String::new(),
            num_elements: 0,
            low_value: 0.0,
            high_value: 0.0,
            num_bits,
        }
    }
    pub fn table_prop(name: &str, dt_name: &str, flags: u32) -> SendProp {
        SendProp {
            dt_name: dt_name.to_string(),
            flags,
            ..prop(name, SendPropType::DataTable, 0)
        }
    }
    fn exclude(name: &str, dt_name: &str) -> SendProp {
        SendProp {
            dt_name: dt_name.to_string(),
            flags: PROP_FLAG_EXCLUDE,
            ..prop(name, SendPropType::Int, 0)
        }
    }
    fn table(name: &str, props: Vec<SendProp>) -> SendTable {
        SendTable {
            name: name.to_string(),
            needs_decoder: true,
            props,
        }
    }
    fn names(cls: &ServerClass) -> Vec<&str> {
        cls.props.iter().map(|p| p.name.as_str()).collect()
    }
    fn player_tables() -> Vec<SendTable> {
        vec![
            table(
                "DT_BaseEntity",
                vec![prop("m_iTeamNum", SendPropType::Int, 6), prop("m_flSimulationTime", SendPropType::Int, 8)],
            ),
            table("DT_LocalData", vec![prop("m_vecOrigin", SendPropType::VectorXY, 0)]),
            table(
                "DT_CSPlayer",
                vec![
                    table_prop("baseclass", "DT_BaseEntity", PROP_FLAG_COLLAPSIBLE),
                    exclude("m_flSimulationTime", "DT_BaseEntity"),
                    prop("m_iHealth", SendPropType::Int, 8),
                    table_prop("cslocaldata", "DT_LocalData", 0),
                ],
            ),
        ]
    }

    #[test]
    fn test_flatten_prefix_and_collapsible() {
        let classes = ServerClasses::build(player_tables(), vec![(0, "CCSPlayer".to_string(), "DT_CSPlayer".to_string())]).unwrap();
        let cls = classes.find_by_name("CCSPlayer").unwrap();
        // Non collapsible sub tables are emitted before the level that includes them.
        assert_eq!(names(cls), vec!["cslocaldata.m_vecOrigin", "m_iTeamNum", "m_iHealth"]);
        assert_eq!(cls.prop_index("m_iHealth"), Some(2));
    }
    #[test]
    fn test_flatten_is_deterministic() {
        let infos = vec![(0, "CCSPlayer".to_string(), "DT_CSPlayer".to_string())];
        let a = ServerClasses::build(player_tables(), infos.clone()).unwrap();
        let b = ServerClasses::build(player_tables(), infos).unwrap();
        assert_eq!(a.classes, b.classes);
    }
    #[test]
    fn test_exclude_deep_in_chain() {
        let tables = vec![
            table("DT_A", vec![prop("m_x", SendPropType::Int, 4), prop("m_y", SendPropType::Int, 4)]),
            table("DT_Mid", vec![table_prop("baseclass", "DT_A", PROP_FLAG_COLLAPSIBLE)]),
            table("DT_Mid2", vec![table_prop("inner", "DT_Mid", 0)]),
            table(
                "DT_B",
                vec![table_prop("baseclass", "DT_Mid2", PROP_FLAG_COLLAPSIBLE), exclude("m_x", "DT_A")],
            ),
        ];
        let classes = ServerClasses::build(tables, vec![(0, "CB".to_string(), "DT_B".to_string())]).unwrap();
        let cls = classes.get(0).unwrap();
        assert_eq!(names(cls), vec!["inner.m_y"]);
    }
    #[test]
    fn test_exclude_matches_table_and_prop() {
        // Same prop name in another table is not excluded.
        let tables = vec![
            table("DT_A", vec![prop("m_x", SendPropType::Int, 4)]),
            table("DT_C", vec![prop("m_x", SendPropType::Int, 4)]),
            table(
                "DT_B",
                vec![
                    table_prop("a", "DT_A", 0),
                    table_prop("c", "DT_C", 0),
                    exclude("m_x", "DT_A"),
                ],
            ),
        ];
        let classes = ServerClasses::build(tables, vec![(0, "CB".to_string(), "DT_B".to_string())]).unwrap();
        assert_eq!(names(classes.get(0).unwrap()), vec!["c.m_x"]);
    }
    #[test]
    fn test_diamond_keeps_duplicates() {
        let tables = vec![
            table("DT_Shared", vec![prop("m_v", SendPropType::Int, 4)]),
            table("DT_L", vec![table_prop("s", "DT_Shared", 0)]),
            table("DT_R", vec![table_prop("s", "DT_Shared", 0)]),
            table("DT_Top", vec![table_prop("l", "DT_L", 0), table_prop("r", "DT_R", 0)]),
        ];
        let classes = ServerClasses::build(tables, vec![(0, "CTop".to_string(), "DT_Top".to_string())]).unwrap();
        assert_eq!(names(classes.get(0).unwrap()), vec!["l.s.m_v", "r.s.m_v"]);
    }
    #[test]
    fn test_array_takes_previous_prop_as_element() {
        let element = SendProp {
            flags: PROP_FLAG_INSIDEARRAY,
            ..prop("000", SendPropType::Int, 8)
        };
        let array = SendProp {
            num_elements: 5,
            ..prop("m_iAmmo", SendPropType::Array, 0)
        };
        let tables = vec![table("DT_Ammo", vec![element.clone(), array])];
        let classes = ServerClasses::build(tables, vec![(0, "CAmmo".to_string(), "DT_Ammo".to_string())]).unwrap();
        let cls = classes.get(0).unwrap();
        assert_eq!(names(cls), vec!["m_iAmmo"]);
        assert_eq!(cls.props[0].array_element_prop, Some(element));
    }
    #[test]
    fn test_priority_sort() {
        let mut a = prop("a", SendPropType::Int, 1);
        a.priority = 128;
        let mut b = prop("b", SendPropType::Int, 1);
        b.priority = 0;
        let mut c = prop("c", SendPropType::Int, 1);
        c.flags = PROP_FLAG_CHANGES_OFTEN;
        let tables = vec![table("DT_P", vec![a, b, c])];
        let classes = ServerClasses::build(tables, vec![(0, "CP".to_string(), "DT_P".to_string())]).unwrap();
        assert_eq!(names(classes.get(0).unwrap()), vec!["b", "c", "a"]);
    }
    #[test]
    fn test_missing_table_is_fatal() {
        let tables = vec![table("DT_B", vec![table_prop("baseclass", "DT_Nope", PROP_FLAG_COLLAPSIBLE)])];
        let res = ServerClasses::build(tables, vec![(0, "CB".to_string(), "DT_B".to_string())]);
        assert_eq!(res.unwrap_err(), DemoParserError::SendTableNotFound("DT_Nope".to_string()));
    }
    #[test]
    fn test_cycle_is_fatal() {
        let tables = vec![
            table("DT_A", vec![table_prop("b", "DT_B", 0)]),
            table("DT_B", vec![table_prop("a", "DT_A", 0)]),
        ];
        let res = ServerClasses::build(tables, vec![(0, "CA".to_string(), "DT_A".to_string())]);
        assert!(matches!(res, Err(DemoParserError::CyclicSendTable(_))));
    }
    #[test]
    fn test_class_bits() {
        assert_eq!(class_bits(1), 0);
        assert_eq!(class_bits(2), 1);
        assert_eq!(class_bits(284), 9);
        assert_eq!(class_bits(256), 8);
    }
    #[test]
    fn test_equipment_mapping_side_effect() {
        let tables = vec![table("DT_WeaponAK47", vec![]), table("DT_SmokeGrenade", vec![]), table("DT_Fish", vec![])];
        let infos = vec![
            (0, "CAK47".to_string(), "DT_WeaponAK47".to_string()),
            (1, "CSmokeGrenade".to_string(), "DT_SmokeGrenade".to_string()),
            (2, "CFish".to_string(), "DT_Fish".to_string()),
        ];
        let classes = ServerClasses::build(tables, infos).unwrap();
        assert_eq!(classes.equipment_mapping.get(&0), Some(&EquipmentElement::AK47));
        assert_eq!(classes.equipment_mapping.get(&1), Some(&EquipmentElement::Smoke));
        assert_eq!(classes.equipment_mapping.get(&2), None);
    }
    #[test]
    fn test_parse_datatables_block() {
        let health = SendpropT {
            r#type: Some(0),
            var_name: Some("m_iHealth".to_string()),
            num_bits: Some(8),
            priority: Some(128),
            flags: Some(PROP_FLAG_UNSIGNED as i32),
            ..Default::default()
        };
        let player = CsvcMsgSendTable {
            net_table_name: Some("DT_CSPlayer".to_string()),
            props: vec![health],
            ..Default::default()
        };
        let end = CsvcMsgSendTable {
            is_end: Some(true),
            ..Default::default()
        };
        let mut bytes = vec![];
        frame_message(&mut bytes, 9, &player.encode_to_vec());
        frame_message(&mut bytes, 9, &end.encode_to_vec());
        bytes.extend_from_slice(&1_u16.to_le_bytes());
        bytes.extend_from_slice(&0_u16.to_le_bytes());
        bytes.extend_from_slice(b"CCSPlayer\0DT_CSPlayer\0");
        let classes = parse_datatables(&bytes).unwrap();
        assert_eq!(classes.len(), 1);
        let cls = classes.find_by_name("CCSPlayer").unwrap();
        assert_eq!(cls.props[0].prop.num_bits, 8);
        assert!(cls.props[0].prop.has_flag(PROP_FLAG_UNSIGNED));
    }
    #[test]
    fn test_parse_datatables_rejects_other_messages() {
        let mut bytes = vec![];
        frame_message(&mut bytes, 12, &[]);
        assert_eq!(parse_datatables(&bytes).unwrap_err(), DemoParserError::ExpectedSendTable(12));
    }
    #[test]
    fn test_unknown_prop_type() {
        let msg = CsvcMsgSendTable {
            net_table_name: Some("DT_X".to_string()),
            props: vec![SendpropT {
                r#type: Some(42),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert_eq!(SendTable::from_message(&msg).unwrap_err(), DemoParserError::UnknownPropType(42));
    }
}

// Subset of the CS:GO netmessages.proto needed to decode demos, declared with prost derive.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CsvcMsgSendTable {
    #[prost(bool, optional, tag = "1")]
    pub is_end: Option<bool>,
    #[prost(string, optional, tag = "2")]
    pub net_table_name: Option<String>,
    #[prost(bool, optional, tag = "3")]
    pub needs_decoder: Option<bool>,
    #[prost(message, repeated, tag = "4")]
    pub props: Vec<csvc_msg_send_table::SendpropT>,
}

pub mod csvc_msg_send_table {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct SendpropT {
        #[prost(int32, optional, tag = "1")]
        pub r#type: Option<i32>,
        #[prost(string, optional, tag = "2")]
        pub var_name: Option<String>,
        #[prost(int32, optional, tag = "3")]
        pub flags: Option<i32>,
        #[prost(int32, optional, tag = "4")]
        pub priority: Option<i32>,
        #[prost(string, optional, tag = "5")]
        pub dt_name: Option<String>,
        #[prost(int32, optional, tag = "6")]
        pub num_elements: Option<i32>,
        #[prost(float, optional, tag = "7")]
        pub low_value: Option<f32>,
        #[prost(float, optional, tag = "8")]
        pub high_value: Option<f32>,
        #[prost(int32, optional, tag = "9")]
        pub num_bits: Option<i32>,
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CsvcMsgPacketEntities {
    #[prost(int32, optional, tag = "1")]
    pub max_entries: Option<i32>,
    #[prost(int32, optional, tag = "2")]
    pub updated_entries: Option<i32>,
    #[prost(bool, optional, tag = "3")]
    pub is_delta: Option<bool>,
    #[prost(bool, optional, tag = "4")]
    pub update_baseline: Option<bool>,
    #[prost(int32, optional, tag = "5")]
    pub baseline: Option<i32>,
    #[prost(int32, optional, tag = "6")]
    pub delta_from: Option<i32>,
    #[prost(bytes = "vec", optional, tag = "7")]
    pub entity_data: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CsvcMsgCreateStringTable {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(int32, optional, tag = "2")]
    pub max_entries: Option<i32>,
    #[prost(int32, optional, tag = "3")]
    pub num_entries: Option<i32>,
    #[prost(bool, optional, tag = "4")]
    pub user_data_fixed_size: Option<bool>,
    #[prost(int32, optional, tag = "5")]
    pub user_data_size: Option<i32>,
    #[prost(int32, optional, tag = "6")]
    pub user_data_size_bits: Option<i32>,
    #[prost(int32, optional, tag = "7")]
    pub flags: Option<i32>,
    #[prost(bytes = "vec", optional, tag = "8")]
    pub string_data: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CsvcMsgUpdateStringTable {
    #[prost(int32, optional, tag = "1")]
    pub table_id: Option<i32>,
    #[prost(int32, optional, tag = "2")]
    pub num_changed_entries: Option<i32>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub string_data: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CsvcMsgGameEventList {
    #[prost(message, repeated, tag = "1")]
    pub descriptors: Vec<csvc_msg_game_event_list::DescriptorT>,
}

pub mod csvc_msg_game_event_list {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct KeyT {
        #[prost(int32, optional, tag = "1")]
        pub r#type: Option<i32>,
        #[prost(string, optional, tag = "2")]
        pub name: Option<String>,
    }
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct DescriptorT {
        #[prost(int32, optional, tag = "1")]
        pub eventid: Option<i32>,
        #[prost(string, optional, tag = "2")]
        pub name: Option<String>,
        #[prost(message, repeated, tag = "3")]
        pub keys: Vec<KeyT>,
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CsvcMsgGameEvent {
    #[prost(string, optional, tag = "1")]
    pub event_name: Option<String>,
    #[prost(int32, optional, tag = "2")]
    pub eventid: Option<i32>,
    #[prost(message, repeated, tag = "3")]
    pub keys: Vec<csvc_msg_game_event::KeyT>,
}

pub mod csvc_msg_game_event {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct KeyT {
        #[prost(int32, optional, tag = "1")]
        pub r#type: Option<i32>,
        #[prost(string, optional, tag = "2")]
        pub val_string: Option<String>,
        #[prost(float, optional, tag = "3")]
        pub val_float: Option<f32>,
        #[prost(int32, optional, tag = "4")]
        pub val_long: Option<i32>,
        #[prost(int32, optional, tag = "5")]
        pub val_short: Option<i32>,
        #[prost(int32, optional, tag = "6")]
        pub val_byte: Option<i32>,
        #[prost(bool, optional, tag = "7")]
        pub val_bool: Option<bool>,
        #[prost(uint64, optional, tag = "8")]
        pub val_uint64: Option<u64>,
        #[prost(bytes = "vec", optional, tag = "9")]
        pub val_wstring: Option<Vec<u8>>,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NetmessageType {
    SvcSendTable,
    SvcClassInfo,
    SvcCreateStringTable,
    SvcUpdateStringTable,
    SvcGameEvent,
    SvcPacketEntities,
    SvcGameEventList,
}

impl NetmessageType {
    pub fn from_id(id: u32) -> Option<NetmessageType> {
        match id {
            9 => Some(NetmessageType::SvcSendTable),
            10 => Some(NetmessageType::SvcClassInfo),
            12 => Some(NetmessageType::SvcCreateStringTable),
            13 => Some(NetmessageType::SvcUpdateStringTable),
            25 => Some(NetmessageType::SvcGameEvent),
            26 => Some(NetmessageType::SvcPacketEntities),
            30 => Some(NetmessageType::SvcGameEventList),
            _ => None,
        }
    }
    pub fn id(&self) -> u32 {
        match self {
            NetmessageType::SvcSendTable => 9,
            NetmessageType::SvcClassInfo => 10,
            NetmessageType::SvcCreateStringTable => 12,
            NetmessageType::SvcUpdateStringTable => 13,
            NetmessageType::SvcGameEvent => 25,
            NetmessageType::SvcPacketEntities => 26,
            NetmessageType::SvcGameEventList => 30,
        }
    }
}

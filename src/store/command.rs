//! Command definitions
//!
//! The minimal command surface the entry protocol depends on: existence
//! checks, get/set/delete for flat keys, the hash-map variants, plus key
//! enumeration, kind probing, ping and publish.

/// Command tags on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    Exists = 0x01,
    Get = 0x02,
    Set = 0x03,
    Delete = 0x04,
    HExists = 0x05,
    HGet = 0x06,
    HSet = 0x07,
    HDel = 0x08,
    HKeys = 0x09,
    HGetAll = 0x0A,
    Keys = 0x0B,
    Kind = 0x0C,
    Ping = 0x0D,
    Publish = 0x0E,
}

/// A store command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Does a flat key exist?
    Exists { key: String },

    /// Fetch a flat key's value
    Get { key: String },

    /// Set a flat key to raw bytes
    Set { key: String, value: Vec<u8> },

    /// Delete a flat key
    Delete { key: String },

    /// Does a field exist within a hash-map?
    HExists { key: String, field: String },

    /// Fetch one hash-map field
    HGet { key: String, field: String },

    /// Set one hash-map field to raw bytes
    HSet {
        key: String,
        field: String,
        value: Vec<u8>,
    },

    /// Delete one hash-map field
    HDel { key: String, field: String },

    /// Enumerate the field names of a hash-map
    HKeys { key: String },

    /// Fetch every field of a hash-map
    HGetAll { key: String },

    /// Enumerate flat and hash-map keys matching a glob pattern
    Keys { pattern: String },

    /// Probe whether a key holds a flat value or a hash-map
    Kind { key: String },

    /// Health check
    Ping,

    /// Publish a payload to a channel (best-effort fan-out)
    Publish { channel: String, payload: Vec<u8> },
}

impl Command {
    /// Get the command type tag
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Exists { .. } => CommandType::Exists,
            Command::Get { .. } => CommandType::Get,
            Command::Set { .. } => CommandType::Set,
            Command::Delete { .. } => CommandType::Delete,
            Command::HExists { .. } => CommandType::HExists,
            Command::HGet { .. } => CommandType::HGet,
            Command::HSet { .. } => CommandType::HSet,
            Command::HDel { .. } => CommandType::HDel,
            Command::HKeys { .. } => CommandType::HKeys,
            Command::HGetAll { .. } => CommandType::HGetAll,
            Command::Keys { .. } => CommandType::Keys,
            Command::Kind { .. } => CommandType::Kind,
            Command::Ping => CommandType::Ping,
            Command::Publish { .. } => CommandType::Publish,
        }
    }
}

/// Response status codes on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    Bulk = 0x01,
    Int = 0x02,
    List = 0x03,
    Map = 0x04,
    Nil = 0x05,
    Error = 0x06,
}

/// A store response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Command succeeded with nothing to return
    Ok,

    /// Raw byte payload (GET / HGET)
    Bulk(Vec<u8>),

    /// Numeric result (EXISTS / DELETE / HSET / PUBLISH counts)
    Int(u64),

    /// List of strings (KEYS / HKEYS)
    List(Vec<String>),

    /// Field-name to raw bytes (HGETALL)
    Map(Vec<(String, Vec<u8>)>),

    /// Key or field absent
    Nil,

    /// The store rejected the command
    Error(String),
}

impl Response {
    /// Status tag for this response
    pub fn status(&self) -> Status {
        match self {
            Response::Ok => Status::Ok,
            Response::Bulk(_) => Status::Bulk,
            Response::Int(_) => Status::Int,
            Response::List(_) => Status::List,
            Response::Map(_) => Status::Map,
            Response::Nil => Status::Nil,
            Response::Error(_) => Status::Error,
        }
    }

    /// Convenience for the kind probe responses
    pub fn kind(name: &str) -> Self {
        Response::Bulk(name.as_bytes().to_vec())
    }
}

/// Key kind names returned by the `Kind` command
pub mod kind {
    pub const FLAT: &str = "flat";
    pub const HASH: &str = "hash";
}

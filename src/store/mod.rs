//! Store client surface
//!
//! Wire-level command and response types, the binary codec, glob pattern
//! matching, and the in-process backend.

pub mod codec;
pub mod command;
pub mod memory;
pub mod pattern;

pub use codec::{
    decode_command, decode_response, encode_command, encode_response, read_command,
    read_response, read_response_async, write_command, write_command_async, write_response,
    HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
pub use command::{kind, Command, CommandType, Response, Status};
pub use memory::{MemoryConnection, MemoryStore};

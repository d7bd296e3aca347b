//! Wire codec
//!
//! Encoding and decoding for the store's command protocol.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! The payload is a sequence of u32-length-prefixed fields in command
//! declaration order (key, then field, then value where applicable).
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! Bulk and Error payloads are raw bytes; Int is 8 big-endian bytes; List
//! and Map payloads carry a u32 count followed by length-prefixed items.

use std::io::{Read, Write};

use bytes::{Buf, BufMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Result, StowError};

use super::command::{Command, CommandType, Response, Status};

/// Header size: 1 tag byte + 4 length bytes
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
pub fn encode_command(command: &Command) -> Vec<u8> {
    let mut payload = Vec::new();

    match command {
        Command::Exists { key }
        | Command::Get { key }
        | Command::Delete { key }
        | Command::HKeys { key }
        | Command::HGetAll { key }
        | Command::Kind { key } => {
            put_field(&mut payload, key.as_bytes());
        }
        Command::Set { key, value } => {
            put_field(&mut payload, key.as_bytes());
            put_field(&mut payload, value);
        }
        Command::HExists { key, field } | Command::HDel { key, field } => {
            put_field(&mut payload, key.as_bytes());
            put_field(&mut payload, field.as_bytes());
        }
        Command::HGet { key, field } => {
            put_field(&mut payload, key.as_bytes());
            put_field(&mut payload, field.as_bytes());
        }
        Command::HSet { key, field, value } => {
            put_field(&mut payload, key.as_bytes());
            put_field(&mut payload, field.as_bytes());
            put_field(&mut payload, value);
        }
        Command::Keys { pattern } => {
            put_field(&mut payload, pattern.as_bytes());
        }
        Command::Ping => {}
        Command::Publish { channel, payload: data } => {
            put_field(&mut payload, channel.as_bytes());
            put_field(&mut payload, data);
        }
    }

    frame(command.command_type() as u8, &payload)
}

/// Decode a command from a complete frame
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let (tag, mut payload) = split_frame(bytes)?;

    let command = match tag {
        t if t == CommandType::Exists as u8 => Command::Exists {
            key: take_string(&mut payload)?,
        },
        t if t == CommandType::Get as u8 => Command::Get {
            key: take_string(&mut payload)?,
        },
        t if t == CommandType::Set as u8 => Command::Set {
            key: take_string(&mut payload)?,
            value: take_field(&mut payload)?.to_vec(),
        },
        t if t == CommandType::Delete as u8 => Command::Delete {
            key: take_string(&mut payload)?,
        },
        t if t == CommandType::HExists as u8 => Command::HExists {
            key: take_string(&mut payload)?,
            field: take_string(&mut payload)?,
        },
        t if t == CommandType::HGet as u8 => Command::HGet {
            key: take_string(&mut payload)?,
            field: take_string(&mut payload)?,
        },
        t if t == CommandType::HSet as u8 => Command::HSet {
            key: take_string(&mut payload)?,
            field: take_string(&mut payload)?,
            value: take_field(&mut payload)?.to_vec(),
        },
        t if t == CommandType::HDel as u8 => Command::HDel {
            key: take_string(&mut payload)?,
            field: take_string(&mut payload)?,
        },
        t if t == CommandType::HKeys as u8 => Command::HKeys {
            key: take_string(&mut payload)?,
        },
        t if t == CommandType::HGetAll as u8 => Command::HGetAll {
            key: take_string(&mut payload)?,
        },
        t if t == CommandType::Keys as u8 => Command::Keys {
            pattern: take_string(&mut payload)?,
        },
        t if t == CommandType::Kind as u8 => Command::Kind {
            key: take_string(&mut payload)?,
        },
        t if t == CommandType::Ping as u8 => Command::Ping,
        t if t == CommandType::Publish as u8 => Command::Publish {
            channel: take_string(&mut payload)?,
            payload: take_field(&mut payload)?.to_vec(),
        },
        other => {
            return Err(StowError::Protocol(format!(
                "Unknown command type: 0x{other:02x}"
            )))
        }
    };

    if !payload.is_empty() {
        return Err(StowError::Protocol(format!(
            "Trailing {} bytes after {:?} command",
            payload.len(),
            command.command_type()
        )));
    }

    Ok(command)
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
pub fn encode_response(response: &Response) -> Vec<u8> {
    let mut payload = Vec::new();

    match response {
        Response::Ok | Response::Nil => {}
        Response::Bulk(data) => payload.extend_from_slice(data),
        Response::Int(value) => payload.put_u64(*value),
        Response::List(items) => {
            payload.put_u32(items.len() as u32);
            for item in items {
                put_field(&mut payload, item.as_bytes());
            }
        }
        Response::Map(pairs) => {
            payload.put_u32(pairs.len() as u32);
            for (name, value) in pairs {
                put_field(&mut payload, name.as_bytes());
                put_field(&mut payload, value);
            }
        }
        Response::Error(message) => payload.extend_from_slice(message.as_bytes()),
    }

    frame(response.status() as u8, &payload)
}

/// Decode a response from a complete frame
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let (tag, mut payload) = split_frame(bytes)?;

    match tag {
        t if t == Status::Ok as u8 => Ok(Response::Ok),
        t if t == Status::Bulk as u8 => Ok(Response::Bulk(payload.to_vec())),
        t if t == Status::Int as u8 => {
            if payload.len() != 8 {
                return Err(StowError::Protocol(format!(
                    "Int response expects 8 payload bytes, got {}",
                    payload.len()
                )));
            }
            Ok(Response::Int(payload.get_u64()))
        }
        t if t == Status::List as u8 => {
            let count = take_count(&mut payload)?;
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(take_string(&mut payload)?);
            }
            Ok(Response::List(items))
        }
        t if t == Status::Map as u8 => {
            let count = take_count(&mut payload)?;
            let mut pairs = Vec::with_capacity(count);
            for _ in 0..count {
                let name = take_string(&mut payload)?;
                let value = take_field(&mut payload)?.to_vec();
                pairs.push((name, value));
            }
            Ok(Response::Map(pairs))
        }
        t if t == Status::Nil as u8 => Ok(Response::Nil),
        t if t == Status::Error as u8 => Ok(Response::Error(
            String::from_utf8_lossy(payload).into_owned(),
        )),
        other => Err(StowError::Protocol(format!(
            "Unknown response status: 0x{other:02x}"
        ))),
    }
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete command frame from a blocking stream
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    let frame = read_frame(reader)?;
    decode_command(&frame)
}

/// Write a command to a blocking stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    writer.write_all(&encode_command(command))?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response frame from a blocking stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    let frame = read_frame(reader)?;
    decode_response(&frame)
}

/// Write a response to a blocking stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    writer.write_all(&encode_response(response))?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response frame from an async stream
pub async fn read_response_async<R>(reader: &mut R) -> Result<Response>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header).await?;

    let payload_len = check_payload_len(&header)?;
    let mut frame = Vec::with_capacity(HEADER_SIZE + payload_len);
    frame.extend_from_slice(&header);
    frame.resize(HEADER_SIZE + payload_len, 0);
    if payload_len > 0 {
        reader.read_exact(&mut frame[HEADER_SIZE..]).await?;
    }

    decode_response(&frame)
}

/// Write a command to an async stream
pub async fn write_command_async<W>(writer: &mut W, command: &Command) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&encode_command(command)).await?;
    writer.flush().await?;
    Ok(())
}

// =============================================================================
// Internal framing helpers
// =============================================================================

fn frame(tag: u8, payload: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(HEADER_SIZE + payload.len());
    message.push(tag);
    message.put_u32(payload.len() as u32);
    message.extend_from_slice(payload);
    message
}

fn split_frame(bytes: &[u8]) -> Result<(u8, &[u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(StowError::Protocol(format!(
            "Incomplete header: expected {} bytes, got {}",
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let tag = bytes[0];
    let payload_len = check_payload_len(&bytes[..HEADER_SIZE])?;

    let total = HEADER_SIZE + payload_len;
    if bytes.len() < total {
        return Err(StowError::Protocol(format!(
            "Incomplete payload: expected {} bytes, got {}",
            total,
            bytes.len()
        )));
    }

    Ok((tag, &bytes[HEADER_SIZE..total]))
}

fn check_payload_len(header: &[u8]) -> Result<usize> {
    let payload_len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
    if payload_len > MAX_PAYLOAD_SIZE {
        return Err(StowError::Protocol(format!(
            "Payload too large: {payload_len} bytes (max {MAX_PAYLOAD_SIZE})"
        )));
    }
    Ok(payload_len as usize)
}

fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = check_payload_len(&header)?;
    let mut frame = Vec::with_capacity(HEADER_SIZE + payload_len);
    frame.extend_from_slice(&header);
    frame.resize(HEADER_SIZE + payload_len, 0);
    if payload_len > 0 {
        reader.read_exact(&mut frame[HEADER_SIZE..])?;
    }

    Ok(frame)
}

fn put_field(buf: &mut Vec<u8>, data: &[u8]) {
    buf.put_u32(data.len() as u32);
    buf.extend_from_slice(data);
}

fn take_count(payload: &mut &[u8]) -> Result<usize> {
    if payload.len() < 4 {
        return Err(StowError::Protocol(
            "Missing item count in response payload".to_string(),
        ));
    }
    Ok(payload.get_u32() as usize)
}

fn take_field<'a>(payload: &mut &'a [u8]) -> Result<&'a [u8]> {
    if payload.len() < 4 {
        return Err(StowError::Protocol(
            "Missing field length prefix".to_string(),
        ));
    }
    let len = payload.get_u32() as usize;
    if payload.len() < len {
        return Err(StowError::Protocol(format!(
            "Incomplete field: expected {} bytes, got {}",
            len,
            payload.len()
        )));
    }
    let (field, rest) = payload.split_at(len);
    *payload = rest;
    Ok(field)
}

fn take_string(payload: &mut &[u8]) -> Result<String> {
    let field = take_field(payload)?;
    String::from_utf8(field.to_vec())
        .map_err(|_| StowError::Protocol("Field is not valid UTF-8".to_string()))
}

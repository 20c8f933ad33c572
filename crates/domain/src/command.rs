// Rust guideline compliant 2026-02-23

//! Wire protocol: tagged commands and their fixed binary payload layouts.
//!
//! All multi-byte integers are big-endian. Strings and variable-length
//! byte fields are `u32` length-prefixed. Commands are delivered
//! at-least-once in program order per sender; no cross-sender ordering is
//! guaranteed.

use crate::{DataPayload, LoadFinishedSignal, ProtocolError, QueryType, VersionReport};

/// Command byte tags.
pub mod codes {
    /// Controller broadcast: producers may start generating version 0.
    pub const PRODUCER_START: u8 = 1;
    /// A producer has fully terminated.
    pub const PRODUCER_TERMINATED: u8 = 2;
    /// The system under test has fully terminated.
    pub const SYSTEM_TERMINATED: u8 = 3;
    /// Producer report: one version's data fully generated and delivered.
    pub const VERSION_DATA_SENT: u8 = 45;
    /// System signal: the current version finished bulk loading.
    pub const BULK_LOADING_FINISHED: u8 = 150;
    /// Controller signal: all producers finished sending the current version.
    pub const BULK_LOAD_SENDING_FINISHED: u8 = 151;
}

/// A tagged command message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command tag; see [`codes`].
    pub code: u8,
    /// Fixed-layout binary payload; empty for pure signals.
    pub payload: Vec<u8>,
}

impl Command {
    /// Build a command with a payload.
    #[must_use]
    pub fn new(code: u8, payload: Vec<u8>) -> Self {
        Self { code, payload }
    }

    /// Build a payload-less signal command.
    #[must_use]
    pub fn signal(code: u8) -> Self {
        Self {
            code,
            payload: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Payload cursor
// ---------------------------------------------------------------------------

/// Read cursor over a command payload.
#[derive(Debug)]
struct PayloadReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ProtocolError> {
        let remaining = self.buf.len() - self.pos;
        if remaining < len {
            return Err(ProtocolError::Truncated {
                needed: len - remaining,
                offset: self.pos,
            });
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32, ProtocolError> {
        let bytes = self.take(4)?;
        // take(4) guarantees exactly four bytes.
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_len_prefixed(&mut self) -> Result<&'a [u8], ProtocolError> {
        let len = self.read_u32()? as usize;
        self.take(len)
    }

    fn read_string(&mut self) -> Result<String, ProtocolError> {
        let bytes = self.read_len_prefixed()?;
        let Ok(text) = std::str::from_utf8(bytes) else {
            return Err(ProtocolError::InvalidUtf8);
        };
        Ok(text.to_owned())
    }

    fn rest(&mut self) -> &'a [u8] {
        let slice = &self.buf[self.pos..];
        self.pos = self.buf.len();
        slice
    }
}

fn put_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_be_bytes());
}

fn put_len_prefixed(buf: &mut Vec<u8>, bytes: &[u8]) {
    put_u32(buf, u32::try_from(bytes.len()).unwrap_or(u32::MAX));
    buf.extend_from_slice(bytes);
}

// ---------------------------------------------------------------------------
// Fixed layouts
// ---------------------------------------------------------------------------

impl VersionReport {
    /// Wire size: five 32-bit integers.
    pub const WIRE_SIZE: usize = 20;

    /// Encode as the `VERSION_DATA_SENT` payload:
    /// added, deleted, loaded, producer id, message count.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::WIRE_SIZE);
        put_u32(&mut buf, self.triples_added);
        put_u32(&mut buf, self.triples_deleted);
        put_u32(&mut buf, self.triples_loaded);
        put_u32(&mut buf, self.producer_id);
        put_u32(&mut buf, self.message_count);
        buf
    }

    /// Decode a `VERSION_DATA_SENT` payload.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Truncated`] on short input.
    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = PayloadReader::new(payload);
        Ok(Self {
            triples_added: reader.read_u32()?,
            triples_deleted: reader.read_u32()?,
            triples_loaded: reader.read_u32()?,
            producer_id: reader.read_u32()?,
            message_count: reader.read_u32()?,
        })
    }
}

impl LoadFinishedSignal {
    /// Encode as the `BULK_LOAD_SENDING_FINISHED` payload:
    /// message count plus a one-byte last-version flag.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(5);
        put_u32(&mut buf, self.message_count);
        buf.push(u8::from(self.last_version));
        buf
    }

    /// Decode a `BULK_LOAD_SENDING_FINISHED` payload.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Truncated`] on short input.
    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = PayloadReader::new(payload);
        let message_count = reader.read_u32()?;
        let last_version = reader.read_u8()? != 0;
        Ok(Self {
            message_count,
            last_version,
        })
    }
}

impl DataPayload {
    /// Encode as a bulk data unit: length-prefixed graph URI followed by
    /// the raw content bytes.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + self.graph_uri.len() + self.content.len());
        put_len_prefixed(&mut buf, self.graph_uri.as_bytes());
        buf.extend_from_slice(&self.content);
        buf
    }

    /// Decode a bulk data unit.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Truncated`] or [`ProtocolError::InvalidUtf8`].
    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = PayloadReader::new(payload);
        let graph_uri = reader.read_string()?;
        let content = reader.rest().to_vec();
        Ok(Self { graph_uri, content })
    }
}

/// Encode a task payload: length-prefixed query text.
#[must_use]
pub fn encode_task_payload(query_text: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + query_text.len());
    put_len_prefixed(&mut buf, query_text.as_bytes());
    buf
}

/// Decode a task payload back into the query text.
///
/// # Errors
///
/// Returns [`ProtocolError::Truncated`] or [`ProtocolError::InvalidUtf8`].
pub fn decode_task_payload(payload: &[u8]) -> Result<String, ProtocolError> {
    PayloadReader::new(payload).read_string()
}

/// Encode an expected-answer payload: 12-byte
/// `(query_type, query_sub_type, substitution_param)` header followed by
/// the length-prefixed result bytes.
#[must_use]
pub fn encode_expected_answer(
    query_type: QueryType,
    query_sub_type: u32,
    substitution_param: u32,
    result: &[u8],
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(16 + result.len());
    put_u32(&mut buf, u32::from(query_type.get()));
    put_u32(&mut buf, query_sub_type);
    put_u32(&mut buf, substitution_param);
    put_len_prefixed(&mut buf, result);
    buf
}

/// Decoded expected-answer payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedAnswer {
    /// Query class the answer belongs to.
    pub query_type: QueryType,
    /// Sub-type within the query class.
    pub query_sub_type: u32,
    /// Substitution parameter of the originating task.
    pub substitution_param: u32,
    /// Serialized expected result set.
    pub result: Vec<u8>,
}

impl ExpectedAnswer {
    /// Decode an expected-answer payload.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Truncated`] on short input or
    /// [`ProtocolError::InvalidQueryType`] when the header carries a type
    /// outside `1..=8`.
    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = PayloadReader::new(payload);
        let raw_type = reader.read_u32()?;
        let Ok(narrowed) = u8::try_from(raw_type) else {
            return Err(ProtocolError::InvalidQueryType { raw: u8::MAX });
        };
        let query_type = QueryType::new(narrowed)?;
        let query_sub_type = reader.read_u32()?;
        let substitution_param = reader.read_u32()?;
        let result = reader.read_len_prefixed()?.to_vec();
        Ok(Self {
            query_type,
            query_sub_type,
            substitution_param,
            result,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

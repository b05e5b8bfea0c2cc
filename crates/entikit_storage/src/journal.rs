//! Journal frames for the file store.
//!
//! Every mutation is appended as one frame:
//!
//! ```text
//! | magic "EKJ1" (4) | body len u32 LE (4) | crc32 of body u32 LE (4) | body |
//! ```
//!
//! Body layout:
//!
//! ```text
//! | op u8 | collection (u16 len + utf8) | id u64 LE | [group (u16 len + utf8)] | [payload (u32 len + bytes)] |
//! ```
//!
//! The id reservation op, written at the head of a compacted journal, is
//! only `| op u8 | next id u64 LE |`.

use crate::backend::DocumentId;
use crate::error::{StorageError, StorageResult};

/// Magic bytes opening every journal frame.
pub const FRAME_MAGIC: [u8; 4] = *b"EKJ1";

/// Size of the fixed frame header.
pub const FRAME_HEADER_SIZE: usize = 12;

const OP_INSERT: u8 = 1;
const OP_REPLACE: u8 = 2;
const OP_REMOVE: u8 = 3;
const OP_PUT_GROUP: u8 = 4;
const OP_REMOVE_GROUP: u8 = 5;
const OP_RESERVE_IDS: u8 = 6;

/// One logged store mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum JournalOp {
    Insert {
        collection: String,
        id: DocumentId,
        payload: Vec<u8>,
    },
    Replace {
        collection: String,
        id: DocumentId,
        payload: Vec<u8>,
    },
    Remove {
        collection: String,
        id: DocumentId,
    },
    PutGroup {
        collection: String,
        id: DocumentId,
        group: String,
        payload: Vec<u8>,
    },
    RemoveGroup {
        collection: String,
        id: DocumentId,
        group: String,
    },
    /// Ids below `next_id` are spent even if no live document holds them.
    ReserveIds {
        next_id: DocumentId,
    },
}

impl JournalOp {
    /// Encodes this operation as a complete frame.
    pub(crate) fn encode_frame(&self) -> StorageResult<Vec<u8>> {
        let body = self.encode_body()?;
        let len = u32::try_from(body.len()).map_err(|_| StorageError::InvalidName {
            name: self.collection().unwrap_or_default().to_string(),
            reason: "journal frame exceeds 4 GiB",
        })?;

        let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + body.len());
        frame.extend_from_slice(&FRAME_MAGIC);
        frame.extend_from_slice(&len.to_le_bytes());
        frame.extend_from_slice(&compute_crc32(&body).to_le_bytes());
        frame.extend_from_slice(&body);
        Ok(frame)
    }

    fn collection(&self) -> Option<&str> {
        match self {
            Self::Insert { collection, .. }
            | Self::Replace { collection, .. }
            | Self::Remove { collection, .. }
            | Self::PutGroup { collection, .. }
            | Self::RemoveGroup { collection, .. } => Some(collection),
            Self::ReserveIds { .. } => None,
        }
    }

    fn encode_body(&self) -> StorageResult<Vec<u8>> {
        let mut buf = Vec::new();
        match self {
            Self::Insert {
                collection,
                id,
                payload,
            } => {
                buf.push(OP_INSERT);
                put_name(&mut buf, collection)?;
                buf.extend_from_slice(&id.as_u64().to_le_bytes());
                put_payload(&mut buf, payload);
            }
            Self::Replace {
                collection,
                id,
                payload,
            } => {
                buf.push(OP_REPLACE);
                put_name(&mut buf, collection)?;
                buf.extend_from_slice(&id.as_u64().to_le_bytes());
                put_payload(&mut buf, payload);
            }
            Self::Remove { collection, id } => {
                buf.push(OP_REMOVE);
                put_name(&mut buf, collection)?;
                buf.extend_from_slice(&id.as_u64().to_le_bytes());
            }
            Self::PutGroup {
                collection,
                id,
                group,
                payload,
            } => {
                buf.push(OP_PUT_GROUP);
                put_name(&mut buf, collection)?;
                buf.extend_from_slice(&id.as_u64().to_le_bytes());
                put_name(&mut buf, group)?;
                put_payload(&mut buf, payload);
            }
            Self::RemoveGroup {
                collection,
                id,
                group,
            } => {
                buf.push(OP_REMOVE_GROUP);
                put_name(&mut buf, collection)?;
                buf.extend_from_slice(&id.as_u64().to_le_bytes());
                put_name(&mut buf, group)?;
            }
            Self::ReserveIds { next_id } => {
                buf.push(OP_RESERVE_IDS);
                buf.extend_from_slice(&next_id.as_u64().to_le_bytes());
            }
        }
        Ok(buf)
    }

    /// Decodes a frame body. `offset` is only used for error reporting.
    pub(crate) fn decode_body(body: &[u8], offset: u64) -> StorageResult<Self> {
        let mut cursor = Cursor { buf: body, pos: 0, offset };
        let op = cursor.u8()?;
        if op == OP_RESERVE_IDS {
            let next_id = DocumentId::new(cursor.u64()?);
            cursor.finish()?;
            return Ok(Self::ReserveIds { next_id });
        }
        let collection = cursor.name()?;
        let id = DocumentId::new(cursor.u64()?);

        let decoded = match op {
            OP_INSERT => Self::Insert {
                collection,
                id,
                payload: cursor.payload()?,
            },
            OP_REPLACE => Self::Replace {
                collection,
                id,
                payload: cursor.payload()?,
            },
            OP_REMOVE => Self::Remove { collection, id },
            OP_PUT_GROUP => {
                let group = cursor.name()?;
                Self::PutGroup {
                    collection,
                    id,
                    group,
                    payload: cursor.payload()?,
                }
            }
            OP_REMOVE_GROUP => Self::RemoveGroup {
                collection,
                id,
                group: cursor.name()?,
            },
            other => {
                return Err(StorageError::corrupted(
                    offset,
                    format!("unknown journal op {other}"),
                ))
            }
        };

        cursor.finish()?;
        Ok(decoded)
    }
}

/// Outcome of reading one frame from a journal buffer.
#[derive(Debug)]
pub(crate) enum FrameRead {
    /// A complete, checksummed frame and the offset just past it.
    Frame { op: JournalOp, next: usize },
    /// The buffer ends with an incomplete or unverifiable frame.
    TornTail,
    /// Clean end of buffer.
    End,
}

/// Reads the frame starting at `start`.
///
/// A bad checksum on the *last* frame counts as a torn write; anywhere
/// else it is corruption.
pub(crate) fn read_frame(data: &[u8], start: usize) -> StorageResult<FrameRead> {
    if start == data.len() {
        return Ok(FrameRead::End);
    }
    if data.len() - start < FRAME_HEADER_SIZE {
        return Ok(FrameRead::TornTail);
    }

    let header = &data[start..start + FRAME_HEADER_SIZE];
    if header[0..4] != FRAME_MAGIC {
        return Err(StorageError::corrupted(start as u64, "bad frame magic"));
    }
    let len = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;
    let crc = u32::from_le_bytes([header[8], header[9], header[10], header[11]]);

    let body_start = start + FRAME_HEADER_SIZE;
    let Some(body_end) = body_start.checked_add(len).filter(|end| *end <= data.len()) else {
        return Ok(FrameRead::TornTail);
    };

    let body = &data[body_start..body_end];
    if compute_crc32(body) != crc {
        if body_end == data.len() {
            return Ok(FrameRead::TornTail);
        }
        return Err(StorageError::corrupted(start as u64, "checksum mismatch"));
    }

    let op = JournalOp::decode_body(body, start as u64)?;
    Ok(FrameRead::Frame { op, next: body_end })
}

fn put_name(buf: &mut Vec<u8>, name: &str) -> StorageResult<()> {
    if name.is_empty() {
        return Err(StorageError::InvalidName {
            name: name.to_string(),
            reason: "names must not be empty",
        });
    }
    let len = u16::try_from(name.len()).map_err(|_| StorageError::InvalidName {
        name: name.to_string(),
        reason: "names are limited to 65535 bytes",
    })?;
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(name.as_bytes());
    Ok(())
}

fn put_payload(buf: &mut Vec<u8>, payload: &[u8]) {
    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(payload);
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
    offset: u64,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> StorageResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.buf.len())
            .ok_or_else(|| StorageError::corrupted(self.offset, "frame body truncated"))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> StorageResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn u64(&mut self) -> StorageResult<u64> {
        let bytes = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(raw))
    }

    fn name(&mut self) -> StorageResult<String> {
        let len = self.take(2)?;
        let len = u16::from_le_bytes([len[0], len[1]]) as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| StorageError::corrupted(self.offset, "name is not valid UTF-8"))
    }

    fn finish(&self) -> StorageResult<()> {
        if self.pos != self.buf.len() {
            return Err(StorageError::corrupted(
                self.offset,
                format!(
                    "trailing bytes in frame: expected {} bytes, got {}",
                    self.pos,
                    self.buf.len()
                ),
            ));
        }
        Ok(())
    }

    fn payload(&mut self) -> StorageResult<Vec<u8>> {
        let len = self.take(4)?;
        let len = u32::from_le_bytes([len[0], len[1], len[2], len[3]]) as usize;
        Ok(self.take(len)?.to_vec())
    }
}

/// Computes CRC32 checksum for data.
pub fn compute_crc32(data: &[u8]) -> u32 {
    // IEEE polynomial, table built at compile time
    const CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0xEDB8_8320;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        let index = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }
    !crc
}

//! Record log framing.
//!
//! Each frame is laid out as:
//!
//! ```text
//! magic (4) | kind (1) | length (4, LE) | payload | crc32 (4, LE)
//! ```
//!
//! The CRC covers `kind`, `length` and `payload`. A `Put` payload is the
//! job's JSON record; a `Remove` payload is the 16 raw bytes of the job id.

use crate::error::{StoreError, StoreResult};
use crate::job::{Job, JobId};
use uuid::Uuid;

/// Magic bytes at the start of every frame.
pub const LOG_MAGIC: [u8; 4] = *b"TJOB";

const KIND_PUT: u8 = 1;
const KIND_REMOVE: u8 = 2;

/// magic (4) + kind (1) + length (4)
const HEADER_SIZE: usize = 9;
const CRC_SIZE: usize = 4;

/// A single entry in the record log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRecord {
    /// The full current record of a job.
    Put(Job),
    /// The job was removed.
    Remove(JobId),
}

impl LogRecord {
    /// Encodes the record as a framed byte sequence.
    ///
    /// # Errors
    ///
    /// Returns an error if the job cannot be serialized.
    pub fn encode(&self) -> StoreResult<Vec<u8>> {
        let (kind, payload) = match self {
            LogRecord::Put(job) => (KIND_PUT, serde_json::to_vec(job)?),
            LogRecord::Remove(id) => (KIND_REMOVE, id.as_bytes().to_vec()),
        };

        let len = u32::try_from(payload.len())
            .map_err(|_| StoreError::corrupted("record payload exceeds 4 GiB"))?;

        let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
        frame.extend_from_slice(&LOG_MAGIC);
        frame.push(kind);
        frame.extend_from_slice(&len.to_le_bytes());
        frame.extend_from_slice(&payload);

        let crc = compute_crc32(&frame[LOG_MAGIC.len()..]);
        frame.extend_from_slice(&crc.to_le_bytes());
        Ok(frame)
    }

    /// Decodes every complete frame in `bytes`.
    ///
    /// A truncated trailing frame (a crash mid-append) ends the log and is
    /// ignored. Returns the records and the number of bytes consumed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupted`] on bad magic, unknown kinds or CRC
    /// mismatches.
    pub fn decode_all(bytes: &[u8]) -> StoreResult<(Vec<LogRecord>, usize)> {
        let mut records = Vec::new();
        let mut offset = 0usize;

        while offset < bytes.len() {
            let rest = &bytes[offset..];
            if rest.len() < HEADER_SIZE {
                tracing::warn!(offset, "ignoring truncated record header at log tail");
                break;
            }

            if rest[..4] != LOG_MAGIC {
                return Err(StoreError::corrupted(format!(
                    "bad frame magic at offset {offset}"
                )));
            }

            let kind = rest[4];
            let len = u32::from_le_bytes([rest[5], rest[6], rest[7], rest[8]]) as usize;
            let frame_len = HEADER_SIZE + len + CRC_SIZE;
            if rest.len() < frame_len {
                tracing::warn!(offset, "ignoring truncated record at log tail");
                break;
            }

            let body_end = HEADER_SIZE + len;
            let stored_crc = u32::from_le_bytes([
                rest[body_end],
                rest[body_end + 1],
                rest[body_end + 2],
                rest[body_end + 3],
            ]);
            let actual_crc = compute_crc32(&rest[4..body_end]);
            if stored_crc != actual_crc {
                return Err(StoreError::corrupted(format!(
                    "checksum mismatch at offset {offset}: expected {stored_crc:08x}, got {actual_crc:08x}"
                )));
            }

            let payload = &rest[HEADER_SIZE..body_end];
            let record = match kind {
                KIND_PUT => LogRecord::Put(serde_json::from_slice(payload)?),
                KIND_REMOVE => {
                    let uuid = Uuid::from_slice(payload).map_err(|_| {
                        StoreError::corrupted(format!("bad job id in remove record at {offset}"))
                    })?;
                    LogRecord::Remove(JobId::from_uuid(uuid))
                }
                other => {
                    return Err(StoreError::corrupted(format!(
                        "unknown record kind {other} at offset {offset}"
                    )))
                }
            };

            records.push(record);
            offset += frame_len;
        }

        Ok((records, offset))
    }
}

/// Computes CRC32 checksum for data.
pub fn compute_crc32(data: &[u8]) -> u32 {
    // IEEE polynomial
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

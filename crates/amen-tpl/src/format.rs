//! .tpl file format structures
//!
//! Layout (all integers little-endian):
//!
//! | offset | size | field            |
//! |--------|------|------------------|
//! | 0      | 4    | magic "ACHR"     |
//! | 4      | 2    | version          |
//! | 6      | 2    | flags            |
//! | 8      | 4    | rows             |
//! | 12     | 4    | cols             |
//! | 16     | 4    | hop_length       |
//! | 20     | 4    | sample_rate      |
//! | 24     | 4    | metadata_size    |
//! | 28     | 4    | reserved         |
//! | 32     | 8    | payload_size     |
//! | 40     | 8    | CRC-64 checksum  |
//!
//! The header is followed by `metadata_size` bytes of JSON metadata and then
//! `rows * cols` `f32` values in row-major order.

use crate::error::TplError;
use crc::{Crc, CRC_64_ECMA_182};
use serde::{Deserialize, Serialize};

/// Magic bytes for .tpl files: "ACHR"
pub const MAGIC: [u8; 4] = [0x41, 0x43, 0x48, 0x52];

/// Current format version
pub const VERSION: u16 = 1;

/// Fixed header size in bytes
pub const HEADER_SIZE: usize = 48;

const CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_ECMA_182);

/// File header (48 bytes fixed size)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TplHeader {
    pub magic: [u8; 4],
    pub version: u16,
    /// Reserved for future use, always 0
    pub flags: u16,
    /// Matrix rows (pitch classes)
    pub rows: u32,
    /// Matrix columns (analysis frames)
    pub cols: u32,
    /// Samples between successive frames
    pub hop_length: u32,
    /// Sample rate of the analysed audio (Hz)
    pub sample_rate: u32,
    /// Size of the JSON metadata section
    pub metadata_size: u32,
    pub reserved: u32,
    /// Size of the matrix payload in bytes
    pub payload_size: u64,
    /// CRC-64/ECMA-182 over the payload bytes
    pub checksum: u64,
}

impl TplHeader {
    pub fn new(rows: u32, cols: u32, hop_length: u32, sample_rate: u32) -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            flags: 0,
            rows,
            cols,
            hop_length,
            sample_rate,
            metadata_size: 0,
            reserved: 0,
            payload_size: payload_bytes(rows, cols).unwrap_or(u64::MAX),
            checksum: 0,
        }
    }

    /// Expected payload size for the declared matrix shape, `None` if it
    /// does not fit in a `u64`
    pub fn expected_payload_size(&self) -> Option<u64> {
        payload_bytes(self.rows, self.cols)
    }
}

fn payload_bytes(rows: u32, cols: u32) -> Option<u64> {
    (rows as u64).checked_mul(cols as u64)?.checked_mul(4)
}

/// Metadata section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TplMetadata {
    /// Feature algorithm ID (e.g. "CHROMA-STFT")
    pub algorithm_id: String,
    /// Analysis parameters (JSON)
    pub algorithm_params: String,
    /// Source the clip was taken from
    pub source_filename: String,
    /// Clip start within the source (seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip_start_s: Option<f64>,
    /// Clip end within the source (seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip_end_s: Option<f64>,
    /// RFC 3339 creation time
    pub created_at: String,
}

impl TplMetadata {
    pub fn new(algorithm_id: &str, algorithm_params: String, source_filename: String) -> Self {
        Self {
            algorithm_id: algorithm_id.to_string(),
            algorithm_params,
            source_filename,
            clip_start_s: None,
            clip_end_s: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Record where in the source the clip was cut
    pub fn with_clip(mut self, start_s: f64, end_s: f64) -> Self {
        self.clip_start_s = Some(start_s);
        self.clip_end_s = Some(end_s);
        self
    }
}

/// Complete .tpl file structure
#[derive(Debug, Clone, PartialEq)]
pub struct TplFile {
    pub header: TplHeader,
    pub metadata: TplMetadata,
    /// Matrix values, row-major
    pub values: Vec<f32>,
}

impl TplFile {
    /// Assemble a file from a row-major matrix, filling in the section sizes
    /// and the payload checksum.
    pub fn new(
        rows: u32,
        cols: u32,
        hop_length: u32,
        sample_rate: u32,
        metadata: TplMetadata,
        values: Vec<f32>,
    ) -> Result<Self, TplError> {
        let mut header = TplHeader::new(rows, cols, hop_length, sample_rate);
        if values.len() as u64 * 4 != header.payload_size {
            return Err(TplError::PayloadSize {
                rows,
                cols,
                actual: values.len() as u64 * 4,
            });
        }
        header.metadata_size = serde_json::to_vec(&metadata)?.len() as u32;
        header.checksum = payload_checksum(&values);
        Ok(Self {
            header,
            metadata,
            values,
        })
    }
}

/// Encode matrix values as the little-endian payload
pub(crate) fn encode_payload(values: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(values.len() * 4);
    for v in values {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// CRC-64 of the encoded payload
pub fn payload_checksum(values: &[f32]) -> u64 {
    CRC64.checksum(&encode_payload(values))
}

pub(crate) fn checksum_bytes(bytes: &[u8]) -> u64 {
    CRC64.checksum(bytes)
}

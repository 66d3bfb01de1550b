//! .tpl file reader

use crate::error::TplError;
use crate::format::{checksum_bytes, TplFile, TplHeader, MAGIC, VERSION};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

pub struct TplReader;

impl TplReader {
    /// Read a .tpl file
    pub fn read(path: &Path) -> Result<TplFile, TplError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    /// Parse a .tpl file from any reader
    pub fn read_from<R: Read>(reader: &mut R) -> Result<TplFile, TplError> {
        let header = Self::read_header(reader)?;

        if header.magic != MAGIC {
            return Err(TplError::BadMagic);
        }
        if header.version != VERSION {
            return Err(TplError::UnsupportedVersion(header.version));
        }
        if header.expected_payload_size() != Some(header.payload_size) {
            return Err(TplError::PayloadSize {
                rows: header.rows,
                cols: header.cols,
                actual: header.payload_size,
            });
        }

        let metadata_bytes = Self::read_section(reader, header.metadata_size as u64)?;
        let metadata = serde_json::from_slice(&metadata_bytes)?;

        let payload = Self::read_section(reader, header.payload_size)?;

        let actual = checksum_bytes(&payload);
        if actual != header.checksum {
            return Err(TplError::Checksum {
                expected: header.checksum,
                actual,
            });
        }

        let values = payload
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        Ok(TplFile {
            header,
            metadata,
            values,
        })
    }

    fn read_header<R: Read>(reader: &mut R) -> Result<TplHeader, TplError> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;

        Ok(TplHeader {
            magic,
            version: Self::read_u16(reader)?,
            flags: Self::read_u16(reader)?,
            rows: Self::read_u32(reader)?,
            cols: Self::read_u32(reader)?,
            hop_length: Self::read_u32(reader)?,
            sample_rate: Self::read_u32(reader)?,
            metadata_size: Self::read_u32(reader)?,
            reserved: Self::read_u32(reader)?,
            payload_size: Self::read_u64(reader)?,
            checksum: Self::read_u64(reader)?,
        })
    }

    /// Read exactly `len` bytes, growing the buffer only as data arrives
    fn read_section<R: Read>(reader: &mut R, len: u64) -> Result<Vec<u8>, TplError> {
        let mut buf = Vec::new();
        reader.by_ref().take(len).read_to_end(&mut buf)?;
        if (buf.len() as u64) < len {
            return Err(TplError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("section truncated: expected {} bytes, got {}", len, buf.len()),
            )));
        }
        Ok(buf)
    }

    fn read_u16<R: Read>(reader: &mut R) -> Result<u16, TplError> {
        let mut buf = [0u8; 2];
        reader.read_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn read_u32<R: Read>(reader: &mut R) -> Result<u32, TplError> {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_u64<R: Read>(reader: &mut R) -> Result<u64, TplError> {
        let mut buf = [0u8; 8];
        reader.read_exact(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{TplHeader, TplMetadata, HEADER_SIZE};
    use crate::writer::TplWriter;
    use std::io::Cursor;

    fn sample_file() -> TplFile {
        let values: Vec<f32> = (0..12 * 5)
            .map(|i| (i as f32 * 0.37).sin().abs() + f32::EPSILON * i as f32)
            .collect();
        let metadata = TplMetadata::new("CHROMA-STFT", "{\"hop_length\":512}".to_string(), "clip.wav".to_string())
            .with_clip(6844.0, 6862.0);
        TplFile::new(12, 5, 512, 22050, metadata, values).unwrap()
    }

    #[test]
    fn test_round_trip_is_bit_exact() {
        let original = sample_file();

        let mut bytes = Vec::new();
        TplWriter::write_to(&mut bytes, &original).unwrap();
        let decoded = TplReader::read_from(&mut Cursor::new(&bytes)).unwrap();

        assert_eq!(decoded.header, original.header);
        assert_eq!(decoded.metadata, original.metadata);
        let original_bits: Vec<u32> = original.values.iter().map(|v| v.to_bits()).collect();
        let decoded_bits: Vec<u32> = decoded.values.iter().map(|v| v.to_bits()).collect();
        assert_eq!(decoded_bits, original_bits);
    }

    #[test]
    fn test_header_is_fixed_size() {
        let original = sample_file();
        let mut bytes = Vec::new();
        TplWriter::write_to(&mut bytes, &original).unwrap();

        let expected = HEADER_SIZE + original.header.metadata_size as usize + 12 * 5 * 4;
        assert_eq!(bytes.len(), expected);
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut bytes = Vec::new();
        TplWriter::write_to(&mut bytes, &sample_file()).unwrap();
        bytes[0] = b'X';

        let err = TplReader::read_from(&mut Cursor::new(&bytes)).unwrap_err();
        assert!(matches!(err, TplError::BadMagic));
    }

    #[test]
    fn test_detects_payload_corruption() {
        let mut bytes = Vec::new();
        TplWriter::write_to(&mut bytes, &sample_file()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;

        let err = TplReader::read_from(&mut Cursor::new(&bytes)).unwrap_err();
        assert!(matches!(err, TplError::Checksum { .. }));
    }

    #[test]
    fn test_truncated_file_is_io_error() {
        let mut bytes = Vec::new();
        TplWriter::write_to(&mut bytes, &sample_file()).unwrap();
        bytes.truncate(bytes.len() - 8);

        let err = TplReader::read_from(&mut Cursor::new(&bytes)).unwrap_err();
        assert!(matches!(err, TplError::Io(_)));
    }

    #[test]
    fn test_oversized_shape_is_rejected() {
        let mut header = TplHeader::new(u32::MAX, u32::MAX, 512, 22050);
        header.payload_size = 16;
        let file = TplFile {
            header,
            metadata: TplMetadata::new("CHROMA-STFT", String::new(), String::new()),
            values: vec![0.0; 4],
        };
        let mut bytes = Vec::new();
        TplWriter::write_to(&mut bytes, &file).unwrap();

        let err = TplReader::read_from(&mut Cursor::new(&bytes)).unwrap_err();
        assert!(matches!(err, TplError::PayloadSize { rows: u32::MAX, cols: u32::MAX, .. }));
    }

    #[test]
    fn test_oversized_metadata_is_truncation() {
        let mut bytes = Vec::new();
        TplWriter::write_to(&mut bytes, &sample_file()).unwrap();
        bytes[24..28].copy_from_slice(&u32::MAX.to_le_bytes());

        let err = TplReader::read_from(&mut Cursor::new(&bytes)).unwrap_err();
        assert!(matches!(err, TplError::Io(ref e) if e.kind() == io::ErrorKind::UnexpectedEof));
    }

    #[test]
    fn test_shape_mismatch_rejected_on_build() {
        let metadata = TplMetadata::new("CHROMA-STFT", String::new(), String::new());
        let err = TplFile::new(12, 3, 512, 22050, metadata, vec![0.0; 10]).unwrap_err();
        assert!(matches!(err, TplError::PayloadSize { .. }));
    }
}

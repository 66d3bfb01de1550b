//! .tpl file writer

use crate::error::TplError;
use crate::format::{encode_payload, TplFile, TplHeader};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub struct TplWriter;

impl TplWriter {
    /// Write a .tpl file, replacing any existing file at `path`
    pub fn write(path: &Path, tpl: &TplFile) -> Result<(), TplError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(&mut writer, tpl)?;
        writer.flush()?;
        Ok(())
    }

    /// Serialize a .tpl file into any writer
    pub fn write_to<W: Write>(writer: &mut W, tpl: &TplFile) -> Result<(), TplError> {
        let metadata = serde_json::to_vec(&tpl.metadata)?;

        let mut header = tpl.header.clone();
        header.metadata_size = metadata.len() as u32;

        Self::write_header(writer, &header)?;
        writer.write_all(&metadata)?;
        writer.write_all(&encode_payload(&tpl.values))?;

        Ok(())
    }

    fn write_header<W: Write>(writer: &mut W, header: &TplHeader) -> Result<(), TplError> {
        writer.write_all(&header.magic)?;
        writer.write_all(&header.version.to_le_bytes())?;
        writer.write_all(&header.flags.to_le_bytes())?;
        writer.write_all(&header.rows.to_le_bytes())?;
        writer.write_all(&header.cols.to_le_bytes())?;
        writer.write_all(&header.hop_length.to_le_bytes())?;
        writer.write_all(&header.sample_rate.to_le_bytes())?;
        writer.write_all(&header.metadata_size.to_le_bytes())?;
        writer.write_all(&header.reserved.to_le_bytes())?;
        writer.write_all(&header.payload_size.to_le_bytes())?;
        writer.write_all(&header.checksum.to_le_bytes())?;

        Ok(())
    }
}

//! Binary snapshot writer

use crate::error::Result;
use crate::format::{IndexSnapshot, SnapshotHeader, SnapshotPayload};
use crate::CHECKSUM;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// zstd level used for snapshot payloads
const COMPRESSION_LEVEL: i32 = 3;

pub struct SnapshotWriter {
    compress: bool,
}

impl SnapshotWriter {
    pub fn new() -> Self {
        Self { compress: true }
    }

    /// Write payloads without zstd compression
    pub fn uncompressed() -> Self {
        Self { compress: false }
    }

    /// Write a binary snapshot to disk
    pub fn write_file(&self, path: &Path, snapshot: &IndexSnapshot) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write(&mut writer, snapshot)?;
        writer.flush()?;
        Ok(())
    }

    /// Write a binary snapshot to any sink
    pub fn write<W: Write>(&self, writer: &mut W, snapshot: &IndexSnapshot) -> Result<()> {
        let payload = SnapshotPayload {
            created_at: snapshot.created_at,
            next_song_id: snapshot.next_song_id,
            songs: snapshot.songs.clone(),
            entries: snapshot.entries.clone(),
        };
        let mut bytes = bincode::serialize(&payload)?;
        if self.compress {
            bytes = zstd::encode_all(bytes.as_slice(), COMPRESSION_LEVEL)?;
        }

        let mut header = SnapshotHeader::new(
            snapshot.layout,
            snapshot.songs.len() as u32,
            snapshot.entries.len() as u64,
        );
        header.set_compressed(self.compress);
        header.payload_size = bytes.len() as u64;
        header.checksum = CHECKSUM.checksum(&bytes);

        write_header(writer, &header)?;
        writer.write_all(&bytes)?;
        Ok(())
    }
}

impl Default for SnapshotWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn write_header<W: Write>(writer: &mut W, header: &SnapshotHeader) -> Result<()> {
    writer.write_all(&header.magic)?;
    writer.write_all(&header.version.to_le_bytes())?;
    writer.write_all(&header.flags.to_le_bytes())?;
    writer.write_all(&[header.freq_bits, header.time_bits])?;
    writer.write_all(&header.reserved.to_le_bytes())?;
    writer.write_all(&header.num_songs.to_le_bytes())?;
    writer.write_all(&header.num_entries.to_le_bytes())?;
    writer.write_all(&header.payload_size.to_le_bytes())?;
    writer.write_all(&header.checksum.to_le_bytes())?;
    Ok(())
}

//! Binary snapshot reader

use crate::error::{FpError, Result};
use crate::format::{IndexSnapshot, SnapshotHeader, SnapshotPayload, JSON_VERSION, MAGIC, VERSION};
use crate::CHECKSUM;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

pub struct SnapshotReader;

impl SnapshotReader {
    /// Read a binary snapshot from disk
    pub fn read_file(path: &Path) -> Result<IndexSnapshot> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read(&mut reader)
    }

    /// Read a binary snapshot from any source
    pub fn read<R: Read>(reader: &mut R) -> Result<IndexSnapshot> {
        let header = Self::read_header(reader)?;

        if header.magic != MAGIC {
            return Err(FpError::InvalidMagic);
        }
        if header.version != VERSION {
            return Err(FpError::UnsupportedVersion(header.version));
        }

        // Bounded by what the source actually holds, not by the declared size
        let mut bytes = Vec::new();
        reader
            .by_ref()
            .take(header.payload_size)
            .read_to_end(&mut bytes)?;
        if bytes.len() as u64 != header.payload_size {
            return Err(FpError::TruncatedPayload {
                declared: header.payload_size,
                actual: bytes.len() as u64,
            });
        }

        let actual = CHECKSUM.checksum(&bytes);
        if actual != header.checksum {
            return Err(FpError::ChecksumMismatch {
                expected: header.checksum,
                actual,
            });
        }

        if header.is_compressed() {
            bytes = zstd::decode_all(bytes.as_slice())?;
        }
        let payload: SnapshotPayload = bincode::deserialize(&bytes)?;

        if payload.songs.len() as u64 != header.num_songs as u64 {
            return Err(FpError::CountMismatch {
                what: "songs",
                declared: header.num_songs as u64,
                actual: payload.songs.len() as u64,
            });
        }
        if payload.entries.len() as u64 != header.num_entries {
            return Err(FpError::CountMismatch {
                what: "entries",
                declared: header.num_entries,
                actual: payload.entries.len() as u64,
            });
        }

        Ok(IndexSnapshot {
            version: JSON_VERSION.to_string(),
            created_at: payload.created_at,
            layout: header.layout(),
            next_song_id: payload.next_song_id,
            songs: payload.songs,
            entries: payload.entries,
        })
    }

    fn read_header<R: Read>(reader: &mut R) -> Result<SnapshotHeader> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;

        let version = Self::read_u16(reader)?;
        let flags = Self::read_u16(reader)?;
        let mut widths = [0u8; 2];
        reader.read_exact(&mut widths)?;
        let reserved = Self::read_u16(reader)?;
        let num_songs = Self::read_u32(reader)?;
        let num_entries = Self::read_u64(reader)?;
        let payload_size = Self::read_u64(reader)?;
        let checksum = Self::read_u64(reader)?;

        Ok(SnapshotHeader {
            magic,
            version,
            flags,
            freq_bits: widths[0],
            time_bits: widths[1],
            reserved,
            num_songs,
            num_entries,
            payload_size,
            checksum,
        })
    }

    fn read_u16<R: Read>(reader: &mut R) -> Result<u16> {
        let mut buf = [0u8; 2];
        reader.read_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_u64<R: Read>(reader: &mut R) -> Result<u64> {
        let mut buf = [0u8; 8];
        reader.read_exact(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }
}

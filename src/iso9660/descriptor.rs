//! Volume descriptors.
//!
//! The volume descriptor set starts at sector 16 and runs until a terminator
//! descriptor. Only the primary volume descriptor matters here: it carries
//! the root directory record.

use super::directory::DirectoryRecord;
use super::{both_endian_u16, both_endian_u32, SECTOR_SIZE};
use crate::error::{Error, Result};

/// Standard identifier carried by every volume descriptor.
pub const STANDARD_IDENTIFIER: &[u8] = b"CD001";

/// Byte range of the root directory record inside the primary descriptor.
const ROOT_RECORD: std::ops::Range<usize> = 156..190;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorType {
    BootRecord,
    Primary,
    Supplementary,
    Partition,
    Terminator,
    Other(u8),
}

impl From<u8> for DescriptorType {
    fn from(code: u8) -> Self {
        match code {
            0 => DescriptorType::BootRecord,
            1 => DescriptorType::Primary,
            2 => DescriptorType::Supplementary,
            3 => DescriptorType::Partition,
            255 => DescriptorType::Terminator,
            other => DescriptorType::Other(other),
        }
    }
}

/// Validate the common descriptor header and return the descriptor type.
pub fn check_header(block: &[u8]) -> Result<DescriptorType> {
    if block.len() != SECTOR_SIZE {
        return Err(Error::format(format!(
            "truncated volume descriptor: {} bytes",
            block.len()
        )));
    }
    if &block[1..6] != STANDARD_IDENTIFIER {
        return Err(Error::format(format!(
            "bad volume descriptor identifier: {:?}",
            String::from_utf8_lossy(&block[1..6])
        )));
    }
    if block[6] != 1 {
        return Err(Error::format(format!(
            "bad volume descriptor version: {}",
            block[6]
        )));
    }
    Ok(DescriptorType::from(block[0]))
}

/// The fields of the primary volume descriptor this crate uses.
#[derive(Debug, Clone)]
pub struct PrimaryVolumeDescriptor {
    pub system_identifier: String,
    pub volume_identifier: String,
    pub sector_count: u32,
    pub path_table_length: u32,
    pub root: DirectoryRecord,
}

impl PrimaryVolumeDescriptor {
    /// Parse and validate a primary volume descriptor sector.
    pub fn parse(block: &[u8]) -> Result<Self> {
        if check_header(block)? != DescriptorType::Primary {
            return Err(Error::format("not a primary volume descriptor"));
        }
        if block[7] != 0 {
            return Err(Error::format(format!("bad reserved field: {}", block[7])));
        }

        let sector_count = both_endian_u32(block, 80, "number_of_sectors")?;
        let volume_set_size = both_endian_u16(block, 120, "volume_set_size")?;
        let volume_sequence_number = both_endian_u16(block, 124, "volume_sequence_number")?;
        let sector_size = both_endian_u16(block, 128, "sector_size")?;
        let path_table_length = both_endian_u32(block, 132, "path_table_length")?;

        if volume_set_size != 1 {
            return Err(Error::format(format!("bad volume set size: {}", volume_set_size)));
        }
        if volume_sequence_number != 1 {
            return Err(Error::format(format!(
                "bad volume sequence number: {}",
                volume_sequence_number
            )));
        }
        if sector_size as usize != SECTOR_SIZE {
            return Err(Error::format(format!("bad sector size: {}", sector_size)));
        }
        // File structure version, then a reserved zero byte.
        if block[881] != 1 {
            return Err(Error::format(format!("bad file structure version: {}", block[881])));
        }
        if block[882] != 0 {
            return Err(Error::format(format!("bad reserved byte after file structure version: {}", block[882])));
        }

        let root = DirectoryRecord::parse(&block[ROOT_RECORD])?;
        if !root.is_dir() {
            return Err(Error::format("root directory record is not a directory"));
        }

        Ok(Self {
            system_identifier: a_characters(&block[8..40]),
            volume_identifier: a_characters(&block[40..72]),
            sector_count,
            path_table_length,
            root,
        })
    }
}

/// Space-padded identifier field to a trimmed string.
fn a_characters(field: &[u8]) -> String {
    String::from_utf8_lossy(field).trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(kind: u8) -> Vec<u8> {
        let mut block = vec![0u8; SECTOR_SIZE];
        block[0] = kind;
        block[1..6].copy_from_slice(STANDARD_IDENTIFIER);
        block[6] = 1;
        block
    }

    #[test]
    fn test_terminator_header() {
        assert_eq!(check_header(&header(255)).unwrap(), DescriptorType::Terminator);
    }

    #[test]
    fn test_unknown_type_is_not_an_error() {
        assert_eq!(check_header(&header(42)).unwrap(), DescriptorType::Other(42));
    }

    #[test]
    fn test_bad_identifier() {
        let mut block = header(1);
        block[1..6].copy_from_slice(b"NSR02");
        let err = check_header(&block).unwrap_err();
        assert!(err.is_format());
        assert!(err.to_string().contains("identifier"));
    }

    #[test]
    fn test_short_block() {
        assert!(check_header(&[0u8; 100]).unwrap_err().is_format());
    }

    #[test]
    fn test_primary_rejects_mismatched_byte_order() {
        let mut block = header(1);
        // little-endian sector size 2048, big-endian copy left at zero
        block[128..130].copy_from_slice(&2048u16.to_le_bytes());
        let err = PrimaryVolumeDescriptor::parse(&block).unwrap_err();
        assert!(err.to_string().contains("mismatch"), "{}", err);
    }
}

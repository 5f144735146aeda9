//! Directory records.

use super::{both_endian_u16, both_endian_u32, SECTOR_SIZE};
use crate::error::{Error, Result};

const FLAG_DIRECTORY: u8 = 1 << 1;
const FLAG_MULTI_EXTENT: u8 = 1 << 7;

/// Fixed part of a directory record, before the identifier.
const FIXED_LEN: usize = 33;

/// One entry of an ISO9660 directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryRecord {
    /// Raw identifier, e.g. `GRUB.CFG;1`. `.` and `..` for the special entries.
    pub name: String,
    /// First logical sector of the data.
    pub extent: u32,
    /// Data length in bytes.
    pub size: u32,
    pub flags: u8,
}

impl DirectoryRecord {
    /// Parse a single record. `buf` must be exactly the record's length.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < FIXED_LEN + 1 {
            return Err(Error::format(format!(
                "directory record too short: {} bytes",
                buf.len()
            )));
        }
        if buf[0] as usize != buf.len() {
            return Err(Error::format(format!(
                "directory record size mismatch: {} != {}",
                buf[0],
                buf.len()
            )));
        }
        if buf[1] != 0 {
            return Err(Error::format(format!(
                "bad extended attribute record size: {}",
                buf[1]
            )));
        }

        let extent = both_endian_u32(buf, 2, "first_sector")?;
        let size = both_endian_u32(buf, 10, "file_size")?;
        both_endian_u16(buf, 28, "volume_sequence_number")?;
        let flags = buf[25];

        let id_len = buf[32] as usize;
        if FIXED_LEN + id_len > buf.len() {
            return Err(Error::format(format!(
                "directory record identifier overruns record: {} bytes",
                id_len
            )));
        }
        let identifier = &buf[FIXED_LEN..FIXED_LEN + id_len];
        let name = match identifier {
            [0] => ".".to_string(),
            [1] => "..".to_string(),
            other => String::from_utf8_lossy(other).into_owned(),
        };

        Ok(Self {
            name,
            extent,
            size,
            flags,
        })
    }

    pub fn is_dir(&self) -> bool {
        self.flags & FLAG_DIRECTORY != 0
    }

    /// The file continues in a following record. Not supported for reads.
    pub fn is_multi_extent(&self) -> bool {
        self.flags & FLAG_MULTI_EXTENT != 0
    }

    pub fn is_self_or_parent(&self) -> bool {
        self.name == "." || self.name == ".."
    }

    /// Name without the `;N` version suffix and the trailing `.` that
    /// extension-less file identifiers carry.
    pub fn display_name(&self) -> &str {
        if self.is_dir() || self.is_self_or_parent() {
            return &self.name;
        }
        let name = match self.name.split_once(';') {
            Some((base, _version)) => base,
            None => &self.name,
        };
        name.strip_suffix('.').unwrap_or(name)
    }

    /// Name as shown in a directory listing: `name/` for directories.
    pub fn listing_name(&self) -> String {
        if self.is_dir() {
            format!("{}/", self.display_name())
        } else {
            self.display_name().to_string()
        }
    }

    /// Case-insensitive match of one path component.
    pub fn matches(&self, component: &str) -> bool {
        self.name.eq_ignore_ascii_case(component)
            || self.display_name().eq_ignore_ascii_case(component)
    }
}

/// Parse all records of a directory extent.
///
/// Records never straddle a sector boundary; a zero length byte pads the
/// rest of the sector.
pub fn parse_directory(data: &[u8]) -> Result<Vec<DirectoryRecord>> {
    let mut records = Vec::new();
    let mut offset = 0;
    while offset < data.len() {
        let len = data[offset] as usize;
        if len == 0 {
            offset = (offset / SECTOR_SIZE + 1) * SECTOR_SIZE;
            continue;
        }
        let end = offset + len;
        if end > data.len() {
            return Err(Error::format("directory record overruns its extent"));
        }
        records.push(DirectoryRecord::parse(&data[offset..end])?);
        offset = end;
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &[u8], extent: u32, size: u32, flags: u8) -> Vec<u8> {
        let pad = if name.len() % 2 == 0 { 1 } else { 0 };
        let len = FIXED_LEN + name.len() + pad;
        let mut buf = vec![0u8; len];
        buf[0] = len as u8;
        buf[2..6].copy_from_slice(&extent.to_le_bytes());
        buf[6..10].copy_from_slice(&extent.to_be_bytes());
        buf[10..14].copy_from_slice(&size.to_le_bytes());
        buf[14..18].copy_from_slice(&size.to_be_bytes());
        buf[25] = flags;
        buf[28..30].copy_from_slice(&1u16.to_le_bytes());
        buf[30..32].copy_from_slice(&1u16.to_be_bytes());
        buf[32] = name.len() as u8;
        buf[FIXED_LEN..FIXED_LEN + name.len()].copy_from_slice(name);
        buf
    }

    #[test]
    fn test_parse_file_record() {
        let rec = DirectoryRecord::parse(&record(b"GRUB.CFG;1", 30, 512, 0)).unwrap();
        assert_eq!(rec.name, "GRUB.CFG;1");
        assert_eq!(rec.extent, 30);
        assert_eq!(rec.size, 512);
        assert!(!rec.is_dir());
        assert_eq!(rec.display_name(), "GRUB.CFG");
    }

    #[test]
    fn test_special_identifiers() {
        let dot = DirectoryRecord::parse(&record(&[0], 20, 2048, FLAG_DIRECTORY)).unwrap();
        let dotdot = DirectoryRecord::parse(&record(&[1], 18, 2048, FLAG_DIRECTORY)).unwrap();
        assert_eq!(dot.name, ".");
        assert_eq!(dotdot.name, "..");
        assert!(dot.is_self_or_parent() && dotdot.is_self_or_parent());
    }

    #[test]
    fn test_matches_is_case_and_version_insensitive() {
        let rec = DirectoryRecord::parse(&record(b"LOOPBACK.CFG;1", 30, 10, 0)).unwrap();
        assert!(rec.matches("loopback.cfg"));
        assert!(rec.matches("LOOPBACK.CFG;1"));
        assert!(!rec.matches("loopback"));

        let bare = DirectoryRecord::parse(&record(b"README.;1", 31, 10, 0)).unwrap();
        assert!(bare.matches("readme"));

        let dir = DirectoryRecord::parse(&record(b"BOOT", 32, 2048, FLAG_DIRECTORY)).unwrap();
        assert!(dir.matches("boot"));
    }

    #[test]
    fn test_listing_name() {
        let file = DirectoryRecord::parse(&record(b"VMLINUZ.;1", 30, 10, 0)).unwrap();
        let dir = DirectoryRecord::parse(&record(b"CASPER", 31, 2048, FLAG_DIRECTORY)).unwrap();
        assert_eq!(file.listing_name(), "VMLINUZ");
        assert_eq!(dir.listing_name(), "CASPER/");
    }

    #[test]
    fn test_rejects_extended_attributes() {
        let mut buf = record(b"A;1", 1, 1, 0);
        buf[1] = 4;
        assert!(DirectoryRecord::parse(&buf).unwrap_err().is_format());
    }

    #[test]
    fn test_rejects_byte_order_mismatch() {
        let mut buf = record(b"A;1", 1, 1, 0);
        buf[14..18].copy_from_slice(&7u32.to_be_bytes());
        let err = DirectoryRecord::parse(&buf).unwrap_err();
        assert!(err.to_string().contains("file_size"), "{}", err);
    }

    #[test]
    fn test_parse_directory_skips_sector_padding() {
        let mut data = vec![0u8; SECTOR_SIZE * 2];
        let first = record(&[0], 20, 4096, FLAG_DIRECTORY);
        data[..first.len()].copy_from_slice(&first);
        let second = record(b"ISOLINUX", 40, 2048, FLAG_DIRECTORY);
        data[SECTOR_SIZE..SECTOR_SIZE + second.len()].copy_from_slice(&second);

        let records = parse_directory(&data).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].name, "ISOLINUX");
    }

    #[test]
    fn test_parse_directory_overrun() {
        let mut data = record(b"A;1", 1, 1, 0);
        data[0] = 200;
        assert!(parse_directory(&data).unwrap_err().is_format());
    }
}

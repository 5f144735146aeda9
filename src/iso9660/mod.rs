//! Read-only ISO9660 filesystem access.
//!
//! Just enough of ECMA-119 to find and read a file by path: volume
//! descriptors, the primary volume descriptor, and directory records.
//! Rock Ridge and Joliet extensions are ignored; lookups match the plain
//! ISO9660 identifiers case-insensitively instead.

mod descriptor;
mod directory;

pub use descriptor::{DescriptorType, PrimaryVolumeDescriptor};
pub use directory::{parse_directory, DirectoryRecord};

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{truncated, Error, Result};

/// Logical sector size. Also the only logical block size accepted.
pub const SECTOR_SIZE: usize = 2048;

/// The first 16 sectors are the system area; descriptors follow.
pub const FIRST_DESCRIPTOR_SECTOR: u64 = 16;

/// Upper bound on the volume descriptor set.
pub const MAX_DESCRIPTORS: u64 = 64;

/// Upper bound on path components in a lookup.
pub const MAX_PATH_DEPTH: usize = 32;

/// Upper bound on a single directory extent.
pub const MAX_DIRECTORY_SIZE: u32 = 16 * 1024 * 1024;

/// An opened ISO9660 volume.
pub struct IsoFs<R> {
    reader: R,
    primary: PrimaryVolumeDescriptor,
}

impl IsoFs<File> {
    /// Open an image file and validate its volume descriptors.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::new(file)
    }
}

impl<R: Read + Seek> IsoFs<R> {
    /// Read the volume descriptor set and keep the primary descriptor.
    pub fn new(mut reader: R) -> Result<Self> {
        let mut primary = None;
        let mut terminated = false;

        for index in 0..MAX_DESCRIPTORS {
            let block = read_sector(&mut reader, FIRST_DESCRIPTOR_SECTOR + index)
                .map_err(|e| truncated(e, "volume descriptor"))?;
            match descriptor::check_header(&block)? {
                DescriptorType::Terminator => {
                    terminated = true;
                    break;
                }
                DescriptorType::Primary if primary.is_none() => {
                    primary = Some(PrimaryVolumeDescriptor::parse(&block)?);
                }
                _ => {}
            }
        }

        let primary =
            primary.ok_or_else(|| Error::format("primary volume descriptor not found"))?;
        if !terminated {
            return Err(Error::format(format!(
                "no volume descriptor set terminator within {} sectors",
                MAX_DESCRIPTORS
            )));
        }

        Ok(Self { reader, primary })
    }

    pub fn primary(&self) -> &PrimaryVolumeDescriptor {
        &self.primary
    }

    pub fn root(&self) -> &DirectoryRecord {
        &self.primary.root
    }

    /// Look up an absolute or relative path, e.g. `/boot/grub/grub.cfg`.
    ///
    /// Each component matches case-insensitively and ignores `;N` versions.
    pub fn get_path(&mut self, path: &str) -> Result<DirectoryRecord> {
        let components: Vec<&str> = path
            .split('/')
            .filter(|c| !c.is_empty() && *c != ".")
            .collect();
        if components.len() > MAX_PATH_DEPTH {
            return Err(Error::not_found(format!("path too deep: {}", path)));
        }

        let mut current = self.primary.root.clone();
        for component in components {
            if !current.is_dir() {
                return Err(Error::not_found(format!("not a directory: {}", path)));
            }
            current = self
                .list_dir(&current)?
                .into_iter()
                .find(|entry| entry.matches(component))
                .ok_or_else(|| Error::not_found(format!("no such file or directory: {}", path)))?;
        }
        Ok(current)
    }

    /// All records of a directory, including `.` and `..`.
    pub fn list_dir(&mut self, dir: &DirectoryRecord) -> Result<Vec<DirectoryRecord>> {
        if !dir.is_dir() {
            return Err(Error::not_found(format!("not a directory: {}", dir.name)));
        }
        if dir.size > MAX_DIRECTORY_SIZE {
            return Err(Error::format(format!(
                "directory {} is implausibly large: {} bytes",
                dir.name, dir.size
            )));
        }
        let data = self.read_extent(dir)?;
        parse_directory(&data)
    }

    /// Read a whole regular file into memory.
    pub fn read_file(&mut self, file: &DirectoryRecord) -> Result<Vec<u8>> {
        check_regular(file)?;
        self.read_extent(file)
    }

    /// Stream a regular file to `out`, returning the number of bytes written.
    pub fn copy_file<W: Write>(&mut self, file: &DirectoryRecord, out: &mut W) -> Result<u64> {
        check_regular(file)?;
        self.seek_to(file.extent)?;
        let copied = io::copy(&mut (&mut self.reader).take(file.size as u64), out)?;
        if copied != file.size as u64 {
            return Err(Error::format(format!("{} truncated", file.name)));
        }
        Ok(copied)
    }

    fn read_extent(&mut self, record: &DirectoryRecord) -> Result<Vec<u8>> {
        if record.size == 0 {
            return Ok(Vec::new());
        }
        self.seek_to(record.extent)?;
        let mut data = vec![0u8; record.size as usize];
        self.reader
            .read_exact(&mut data)
            .map_err(|e| truncated(e, &record.name))?;
        Ok(data)
    }

    fn seek_to(&mut self, sector: u32) -> Result<()> {
        self.reader
            .seek(SeekFrom::Start(sector as u64 * SECTOR_SIZE as u64))?;
        Ok(())
    }
}

fn check_regular(file: &DirectoryRecord) -> Result<()> {
    if file.is_dir() {
        return Err(Error::not_found(format!("not a regular file: {}", file.name)));
    }
    if file.is_multi_extent() {
        return Err(Error::format(format!(
            "{} has multiple extents, which is not supported",
            file.name
        )));
    }
    Ok(())
}

fn read_sector<R: Read + Seek>(reader: &mut R, sector: u64) -> io::Result<Vec<u8>> {
    reader.seek(SeekFrom::Start(sector * SECTOR_SIZE as u64))?;
    let mut block = vec![0u8; SECTOR_SIZE];
    reader.read_exact(&mut block)?;
    Ok(block)
}

/// Read a both-endian u32 (little-endian copy, then big-endian copy).
pub(crate) fn both_endian_u32(buf: &[u8], offset: usize, field: &str) -> Result<u32> {
    let le = u32::from_le_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]]);
    let be = u32::from_be_bytes([
        buf[offset + 4],
        buf[offset + 5],
        buf[offset + 6],
        buf[offset + 7],
    ]);
    if le != be {
        return Err(Error::format(format!("{} mismatch: {} != {}", field, le, be)));
    }
    Ok(le)
}

/// Read a both-endian u16.
pub(crate) fn both_endian_u16(buf: &[u8], offset: usize, field: &str) -> Result<u16> {
    let le = u16::from_le_bytes([buf[offset], buf[offset + 1]]);
    let be = u16::from_be_bytes([buf[offset + 2], buf[offset + 3]]);
    if le != be {
        return Err(Error::format(format!("{} mismatch: {} != {}", field, le, be)));
    }
    Ok(le)
}

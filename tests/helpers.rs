//! Shared test utilities for isomenu tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use isomenu::config::Config;

const SECTOR: usize = 2048;
const FIRST_FREE_SECTOR: u32 = 18;

/// Test environment laid out like a boot stick: `ubuntu/` with the images,
/// `overrides.json`, and `boot/grub/` for the generated menu.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    /// Base directory (stick root simulation)
    pub base_dir: PathBuf,
    pub images_dir: PathBuf,
    pub overrides: PathBuf,
    pub output: PathBuf,
}

impl TestEnv {
    /// Create a new test environment with an empty images directory.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base_dir = temp_dir.path().to_path_buf();
        let images_dir = base_dir.join("ubuntu");
        fs::create_dir_all(&images_dir).expect("Failed to create images dir");

        Self {
            overrides: base_dir.join("overrides.json"),
            output: base_dir.join("boot/grub/grub.cfg"),
            images_dir,
            base_dir,
            _temp_dir: temp_dir,
        }
    }

    /// Configuration pointing at this environment, ignoring the process
    /// environment.
    pub fn config(&self) -> Config {
        let mut config = Config::from_lookup(&self.base_dir, |_| None);
        config.output = Some(self.output.clone());
        config
    }

    /// Write an image into the images directory.
    pub fn add_image(&self, filename: &str, data: &[u8]) -> PathBuf {
        let path = self.images_dir.join(filename);
        fs::write(&path, data).expect("Failed to write image");
        path
    }

    pub fn write_overrides(&self, json: &str) {
        fs::write(&self.overrides, json).expect("Failed to write overrides");
    }
}

/// A GRUB config in the style Ubuntu ships on its live images.
pub fn ubuntu_grub_cfg(args: &str) -> String {
    format!(
        "if loadfont /boot/grub/font.pf2 ; then\n\
         \tset gfxmode=auto\n\
         fi\n\
         set timeout=5\n\
         menuentry \"Try or Install Ubuntu\" {{\n\
         \tset gfxpayload=keep\n\
         \tlinux\t/casper/vmlinuz {}\n\
         \tinitrd\t/casper/initrd\n\
         }}\n\
         menuentry \"Ubuntu (safe graphics)\" {{\n\
         \tlinux\t/casper/vmlinuz nomodeset {}\n\
         \tinitrd\t/casper/initrd\n\
         }}\n",
        args, args
    )
}

enum Node {
    File(Vec<u8>),
    Dir(BTreeMap<String, Node>),
}

/// Builds a minimal ISO9660 image in memory.
///
/// Names are stored upper-case, files with a `;1` version suffix, the way
/// mastering tools without Rock Ridge write them.
#[derive(Default)]
pub struct IsoBuilder {
    root: BTreeMap<String, Node>,
}

impl IsoBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file at an absolute path, creating parent directories.
    pub fn file(mut self, path: &str, content: impl AsRef<[u8]>) -> Self {
        let mut components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        let name = components.pop().expect("file path needs a name");
        let mut dir = &mut self.root;
        for component in components {
            let node = dir
                .entry(component.to_ascii_uppercase())
                .or_insert_with(|| Node::Dir(BTreeMap::new()));
            dir = match node {
                Node::Dir(children) => children,
                Node::File(_) => panic!("{} is a file", component),
            };
        }
        dir.insert(
            format!("{};1", name.to_ascii_uppercase()),
            Node::File(content.as_ref().to_vec()),
        );
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut layout = Layout {
            next: FIRST_FREE_SECTOR,
            dirs: Vec::new(),
            files: Vec::new(),
        };
        let root_sector = layout.place_dir(&self.root);
        let total = layout.next;

        let mut image = vec![0u8; total as usize * SECTOR];
        let root = record(&[0], root_sector, SECTOR as u32, true);
        write_sector(&mut image, 16, &primary_descriptor(&root, total));
        write_sector(&mut image, 17, &terminator());

        for (sector, parent, children) in &layout.dirs {
            let mut data = Vec::new();
            data.extend(record(&[0], *sector, SECTOR as u32, true));
            data.extend(record(&[1], *parent, SECTOR as u32, true));
            for (name, extent, size, is_dir) in children {
                data.extend(record(name.as_bytes(), *extent, *size, *is_dir));
            }
            assert!(data.len() <= SECTOR, "test directory does not fit one sector");
            write_sector(&mut image, *sector, &data);
        }
        for (sector, content) in &layout.files {
            let start = *sector as usize * SECTOR;
            image[start..start + content.len()].copy_from_slice(content);
        }
        image
    }
}

struct Layout<'a> {
    next: u32,
    /// (sector, parent sector, children as (name, extent, size, is_dir))
    dirs: Vec<(u32, u32, Vec<(String, u32, u32, bool)>)>,
    files: Vec<(u32, &'a [u8])>,
}

impl<'a> Layout<'a> {
    fn place_dir(&mut self, children: &'a BTreeMap<String, Node>) -> u32 {
        let sector = self.alloc(SECTOR);
        self.place_children(sector, sector, children);
        sector
    }

    fn place_children(&mut self, sector: u32, parent: u32, children: &'a BTreeMap<String, Node>) {
        let index = self.dirs.len();
        self.dirs.push((sector, parent, Vec::new()));
        for (name, node) in children {
            let entry = match node {
                Node::File(content) => {
                    let extent = self.alloc(content.len());
                    self.files.push((extent, content.as_slice()));
                    (name.clone(), extent, content.len() as u32, false)
                }
                Node::Dir(grandchildren) => {
                    let child = self.alloc(SECTOR);
                    self.place_children(child, sector, grandchildren);
                    (name.clone(), child, SECTOR as u32, true)
                }
            };
            self.dirs[index].2.push(entry);
        }
    }

    fn alloc(&mut self, len: usize) -> u32 {
        let sector = self.next;
        self.next += len.div_ceil(SECTOR).max(1) as u32;
        sector
    }
}

fn write_sector(image: &mut [u8], sector: u32, data: &[u8]) {
    let start = sector as usize * SECTOR;
    image[start..start + data.len()].copy_from_slice(data);
}

fn both_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    buf[offset + 4..offset + 8].copy_from_slice(&value.to_be_bytes());
}

fn both_u16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    buf[offset + 2..offset + 4].copy_from_slice(&value.to_be_bytes());
}

/// Encode one directory record.
pub fn record(name: &[u8], extent: u32, size: u32, is_dir: bool) -> Vec<u8> {
    let pad = if name.len() % 2 == 0 { 1 } else { 0 };
    let len = 33 + name.len() + pad;
    let mut buf = vec![0u8; len];
    buf[0] = len as u8;
    both_u32(&mut buf, 2, extent);
    both_u32(&mut buf, 10, size);
    buf[25] = if is_dir { 0x02 } else { 0 };
    both_u16(&mut buf, 28, 1);
    buf[32] = name.len() as u8;
    buf[33..33 + name.len()].copy_from_slice(name);
    buf
}

fn descriptor_header(kind: u8) -> Vec<u8> {
    let mut block = vec![0u8; SECTOR];
    block[0] = kind;
    block[1..6].copy_from_slice(b"CD001");
    block[6] = 1;
    block
}

fn primary_descriptor(root: &[u8], total_sectors: u32) -> Vec<u8> {
    let mut block = descriptor_header(1);
    block[8..40].fill(b' ');
    block[8..13].copy_from_slice(b"LINUX");
    block[40..72].fill(b' ');
    block[40..50].copy_from_slice(b"TEST_IMAGE");
    both_u32(&mut block, 80, total_sectors);
    both_u16(&mut block, 120, 1);
    both_u16(&mut block, 124, 1);
    both_u16(&mut block, 128, SECTOR as u16);
    both_u32(&mut block, 132, 10);
    block[156..156 + root.len()].copy_from_slice(root);
    block[881] = 1;
    block
}

fn terminator() -> Vec<u8> {
    descriptor_header(255)
}

/// An ISO whose only boot config is `/boot/grub/grub.cfg` with `args`.
pub fn ubuntu_iso(args: &str) -> Vec<u8> {
    IsoBuilder::new()
        .file("/boot/grub/grub.cfg", ubuntu_grub_cfg(args))
        .file("/casper/vmlinuz", b"kernel")
        .file("/casper/initrd", b"initrd")
        .build()
}

/// A valid ISO without any boot configuration.
pub fn plain_iso() -> Vec<u8> {
    IsoBuilder::new().file("/README.diskdefines", "#define DISKNAME test\n").build()
}

/// Read a generated file, panicking with the path on failure.
pub fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| panic!("read {}: {}", path.display(), e))
}

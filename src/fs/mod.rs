//! our tree filesystem
//!
//! On-disk layout, one 512-byte sector per unit:
//! - sector 0: superblock
//! - sectors 1..=99: inode table, two 256-byte inodes per sector
//! - sectors 100..500: data blocks, one per non-empty file
pub mod disk_inode;
pub mod error;
pub mod filekind;
pub mod fs_layout;
pub mod node;
pub mod superblock;
mod fs_api_impl;
mod serializer;
pub use disk_inode::*;
pub use error::*;
pub use filekind::*;
pub use fs_api_impl::{DirEntry, DiskInfo, MemStats};
pub use fs_layout::*;
pub use node::{FileNode, NodeAllocator, NodeRef, Payload};
pub use superblock::*;

/// bytes per sector, the unit of all disk I/O
pub const SECTOR_SIZE: usize = 512;
/// one sector worth of bytes
pub type Sector = [u8; SECTOR_SIZE];

pub const FS_MAGIC: u32 = 0x5452_4653;
pub const INODE_MAGIC: u32 = 0x494e_4f44;

pub const SUPERBLOCK_SECTOR: u32 = 0;
pub const INODE_TABLE_START: u32 = 1;
/// last sector of the inode table, inclusive
pub const INODE_TABLE_END: u32 = 99;
pub const DATA_BLOCK_START: u32 = 100;

/// advertised inode capacity, the table itself only addresses 198 slots
pub const INODE_COUNT: u32 = 512;
pub const DATA_BLOCK_COUNT: u32 = 400;
pub const TOTAL_SECTORS: u32 = DATA_BLOCK_START + DATA_BLOCK_COUNT;

/// "no inode"
pub const NO_INODE: u32 = 0;
pub const ROOT_INODE: u32 = 1;

pub const INODE_SIZE: usize = 256;
pub const INODES_PER_SECTOR: usize = SECTOR_SIZE / INODE_SIZE;
const DIRECT_POINTERS: usize = 12;
/// children of a folder that survive a save
pub const MAX_CHILDREN_ON_DISK: usize = 16;
const DISK_NAME_LEN: usize = 64;
const BITMAP_BYTES: usize = 64;

/// file bytes that survive a save, the last byte of the block is never used
pub const MAX_CONTENT_ON_DISK: usize = SECTOR_SIZE - 1;
/// longest name accepted by `make_file` / `make_dir`
pub const MAX_NAME_LEN: usize = 126;
/// longest name a node can carry
pub const NODE_NAME_CAPACITY: usize = 127;
const CHILD_ARRAY_INITIAL_CAPACITY: usize = 4;

//! what does our filesystem look like in the memory, and how it maps onto
//! the sectors of a drive

use std::rc::Rc;

use log::{debug, info, warn};

use crate::{
    device::SectorDevice,
    utils::fs_size_calculator::{data_block_index, inode_in_table, inode_location},
};

use super::{
    DiskInode, FileKind, FsError, NodeAllocator, NodeRef, Result, Sector, SuperBlock,
    INODE_SIZE, INODE_TABLE_END, INODE_TABLE_START, MAX_CONTENT_ON_DISK, NO_INODE, ROOT_INODE,
    SECTOR_SIZE, SUPERBLOCK_SECTOR, TOTAL_SECTORS,
};

/// knobs of a [FileSystem] session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsOptions {
    /// run sync, save and flush after every successful change while mounted
    pub auto_save: bool,
    /// maximum number of live in-memory nodes, `None` for no limit
    pub node_limit: Option<usize>,
}

impl Default for FsOptions {
    fn default() -> Self {
        FsOptions {
            auto_save: true,
            node_limit: None,
        }
    }
}

/// a filesystem session: the in-memory tree plus the drive it is saved to
///
/// It starts unmounted, [FileSystem::format] or [FileSystem::mount] attach
/// it to a drive.
#[derive(Debug)]
pub struct FileSystem<D> {
    device: D,
    /// the drive we are mounted on
    drive: Option<u8>,
    /// cached copy of sector 0
    superblock: SuperBlock,
    /// staging buffer shared by every sector transfer
    staging: Sector,
    pub(super) nodes: NodeAllocator,
    pub(super) root: NodeRef,
    pub(super) cwd: NodeRef,
    pub(super) options: FsOptions,
}

impl<D: SectorDevice> FileSystem<D> {
    pub fn new(device: D) -> Result<Self> {
        Self::with_options(device, FsOptions::default())
    }

    pub fn with_options(device: D, options: FsOptions) -> Result<Self> {
        let nodes = NodeAllocator::new(options.node_limit);
        let root = nodes
            .allocate(FileKind::Folder)
            .ok_or(FsError::OutOfMemory)?;
        root.borrow_mut().set_name("/")?;
        Ok(FileSystem {
            device,
            drive: None,
            superblock: SuperBlock::default(),
            staging: [0u8; SECTOR_SIZE],
            nodes,
            cwd: Rc::clone(&root),
            root,
            options,
        })
    }
}

/// get the pieces of this filesystem
impl<D> FileSystem<D> {
    #[inline]
    pub fn superblock(&self) -> &SuperBlock {
        &self.superblock
    }

    #[inline]
    pub fn device(&self) -> &D {
        &self.device
    }

    #[inline]
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn into_device(self) -> D {
        self.device
    }

    #[inline]
    pub fn is_mounted(&self) -> bool {
        self.drive.is_some()
    }

    /// the drive we are mounted on
    #[inline]
    pub fn drive(&self) -> Option<u8> {
        self.drive
    }

    pub fn root(&self) -> NodeRef {
        Rc::clone(&self.root)
    }

    pub fn current_dir(&self) -> NodeRef {
        Rc::clone(&self.cwd)
    }

    pub fn options(&self) -> &FsOptions {
        &self.options
    }

    pub(super) fn mounted_drive(&self) -> Result<u8> {
        self.drive.ok_or(FsError::NotMounted)
    }
}

/// format, mount and sync
impl<D: SectorDevice> FileSystem<D> {
    /// lay down an empty filesystem on `drive` and mount it
    pub fn format(&mut self, drive: u8) -> Result<()> {
        info!("format() called with drive: {drive}");
        let superblock = SuperBlock::new(TOTAL_SECTORS);
        let encoded = superblock.encode()?;
        self.device
            .write_sector(drive, SUPERBLOCK_SECTOR, &encoded)?;

        let zeros = [0u8; SECTOR_SIZE];
        for lba in INODE_TABLE_START..=INODE_TABLE_END {
            self.device.write_sector(drive, lba, &zeros)?;
        }

        let mut root = DiskInode::new(ROOT_INODE, FileKind::Folder, NO_INODE);
        root.set_name(self.root.borrow().name());
        self.superblock = superblock;
        self.drive = Some(drive);
        if let Err(err) = self.write_inode(&root) {
            self.drive = None;
            return Err(err);
        }
        info!("drive {drive} formatted and mounted");
        Ok(())
    }

    /// read the superblock of `drive` and mount it
    pub fn mount(&mut self, drive: u8) -> Result<()> {
        info!("mount() called with drive: {drive}");
        self.device
            .read_sector(drive, SUPERBLOCK_SECTOR, &mut self.staging)?;
        let superblock = SuperBlock::decode(&self.staging);
        if !superblock.has_valid_signature() {
            warn!(
                "drive {drive} has signature {:#010x}, refusing to mount",
                superblock.signature
            );
            return Err(FsError::BadSignature {
                found: superblock.signature,
            });
        }
        self.superblock = superblock;
        self.drive = Some(drive);
        Ok(())
    }

    /// write the cached superblock back to sector 0
    pub fn sync(&mut self) -> Result<()> {
        let drive = self.mounted_drive()?;
        debug!("sync() called on drive {drive}");
        let encoded = self.superblock.encode()?;
        self.device
            .write_sector(drive, SUPERBLOCK_SECTOR, &encoded)?;
        Ok(())
    }
}

/// inode and data block allocation
impl<D> FileSystem<D> {
    /// lowest free inode, [NO_INODE] when exhausted
    pub fn allocate_inode(&mut self) -> u32 {
        self.superblock.allocate_inode()
    }

    /// sector of the lowest free data block, 0 when exhausted
    pub fn allocate_data_block(&mut self) -> u32 {
        self.superblock.allocate_data_block()
    }

    pub fn free_inode(&mut self, inode_number: u32) {
        self.superblock.free_inode(inode_number);
    }

    pub fn free_data_block(&mut self, sector: u32) {
        self.superblock.free_data_block(sector);
    }

    /// release every inode but the root, and every data block
    pub(super) fn free_all_but_root(&mut self) {
        let inodes: Vec<u32> = self
            .superblock
            .used_inodes()
            .filter(|n| *n != ROOT_INODE)
            .collect();
        for inode_number in inodes {
            self.free_inode(inode_number);
        }
        let blocks: Vec<u32> = self.superblock.used_data_blocks().collect();
        for sector in blocks {
            self.free_data_block(sector);
        }
    }
}

/// [DiskInode] and data block I/O
impl<D: SectorDevice> FileSystem<D> {
    pub fn read_inode(&mut self, inode_number: u32) -> Result<DiskInode> {
        let drive = self.mounted_drive()?;
        let (lba, offset) = inode_location(inode_number);
        self.device.read_sector(drive, lba, &mut self.staging)?;
        DiskInode::decode(&self.staging[offset..offset + INODE_SIZE])
    }

    /// read-modify-write the sector holding `inode`
    pub fn write_inode(&mut self, inode: &DiskInode) -> Result<()> {
        let drive = self.mounted_drive()?;
        let inode_number = inode.inode_number;
        let (lba, offset) = inode_location(inode_number);
        if !inode_in_table(inode_number) {
            warn!("inode {inode_number} lies past the inode table, in sector {lba}");
        }
        debug!("writing inode {inode_number} to sector {lba} at offset {offset}");
        self.device.read_sector(drive, lba, &mut self.staging)?;
        inode.encode_into(&mut self.staging[offset..])?;
        self.device.write_sector(drive, lba, &self.staging)?;
        Ok(())
    }

    /// write up to 511 bytes of `data` into the block at `sector`, zero padded
    pub fn write_data_block(&mut self, sector: u32, data: &[u8]) -> Result<()> {
        let drive = self.mounted_drive()?;
        let len = data.len().min(MAX_CONTENT_ON_DISK);
        if data.len() > len {
            debug!("truncating {} bytes to {len} for sector {sector}", data.len());
        }
        self.staging.fill(0);
        self.staging[..len].copy_from_slice(&data[..len]);
        self.device.write_sector(drive, sector, &self.staging)?;
        Ok(())
    }

    /// read the first `len` bytes of the block at `sector`, at most 511
    pub fn read_data_block(&mut self, sector: u32, len: usize) -> Result<Vec<u8>> {
        let drive = self.mounted_drive()?;
        if data_block_index(sector).is_none() {
            warn!("sector {sector} is not in the data area");
        }
        self.device.read_sector(drive, sector, &mut self.staging)?;
        let len = len.min(MAX_CONTENT_ON_DISK);
        let mut data = Vec::new();
        data.try_reserve_exact(len)?;
        data.extend_from_slice(&self.staging[..len]);
        Ok(data)
    }

    /// raw sector access for the cache flush cycles
    pub(super) fn rewrite_superblock_sector(&mut self, drive: u8) -> Result<()> {
        self.device
            .read_sector(drive, SUPERBLOCK_SECTOR, &mut self.staging)?;
        self.device
            .write_sector(drive, SUPERBLOCK_SECTOR, &self.staging)?;
        Ok(())
    }

    pub(super) fn flush_device(&mut self, drive: u8) -> Result<()> {
        Ok(self.device.flush_cache(drive)?)
    }
}

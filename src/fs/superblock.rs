use bitvec::prelude::*;
use log::debug;

use crate::utils::{
    fs_size_calculator::{data_block_index, data_block_sector},
    le_bytes::{read_u32, write_u32},
};

use super::{
    FsError, Result, Sector, BITMAP_BYTES, DATA_BLOCK_COUNT, FS_MAGIC, INODE_COUNT, NO_INODE,
    ROOT_INODE, SECTOR_SIZE,
};

/// one bit per inode or data block, 512 bits
pub type Bitmap = BitArr!(for BITMAP_BYTES * 8, in u8, Lsb0);

const SIGNATURE_OFFSET: usize = 0;
const TOTAL_SECTORS_OFFSET: usize = 4;
const INODE_COUNT_OFFSET: usize = 8;
const FREE_INODES_OFFSET: usize = 12;
const DATA_BLOCK_COUNT_OFFSET: usize = 16;
const FREE_BLOCKS_OFFSET: usize = 20;
const ROOT_INODE_OFFSET: usize = 24;
const INODE_BITMAP_OFFSET: usize = 28;
const BLOCK_BITMAP_OFFSET: usize = INODE_BITMAP_OFFSET + BITMAP_BYTES;

/// The superblock of this filesystem, kept in sector 0
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuperBlock {
    /// magic number
    pub signature: u32,
    pub total_sectors: u32,
    pub inode_count: u32,
    pub free_inode_count: u32,
    pub data_block_count: u32,
    pub free_block_count: u32,
    pub root_inode: u32,
    pub inode_bitmap: Bitmap,
    /// bit `i` covers the data block in sector `100 + i`
    pub block_bitmap: Bitmap,
}

impl Default for SuperBlock {
    fn default() -> Self {
        SuperBlock {
            signature: 0,
            total_sectors: 0,
            inode_count: 0,
            free_inode_count: 0,
            data_block_count: 0,
            free_block_count: 0,
            root_inode: NO_INODE,
            inode_bitmap: Bitmap::ZERO,
            block_bitmap: Bitmap::ZERO,
        }
    }
}

impl SuperBlock {
    /// bytes used by the encoded superblock, the rest of the sector is padding
    pub const ENCODED_LEN: usize = BLOCK_BITMAP_OFFSET + BITMAP_BYTES;

    /// a freshly formatted superblock with only the root inode in use
    pub fn new(total_sectors: u32) -> Self {
        let mut inode_bitmap = Bitmap::ZERO;
        inode_bitmap.set(ROOT_INODE as usize, true);
        SuperBlock {
            signature: FS_MAGIC,
            total_sectors,
            inode_count: INODE_COUNT,
            free_inode_count: INODE_COUNT - 1,
            data_block_count: DATA_BLOCK_COUNT,
            free_block_count: DATA_BLOCK_COUNT,
            root_inode: ROOT_INODE,
            inode_bitmap,
            block_bitmap: Bitmap::ZERO,
        }
    }

    pub fn has_valid_signature(&self) -> bool {
        self.signature == FS_MAGIC
    }
}

/// encode and decode
impl SuperBlock {
    pub fn encode(&self) -> Result<Sector> {
        if Self::ENCODED_LEN > SECTOR_SIZE {
            return Err(FsError::SuperblockTooLarge(Self::ENCODED_LEN));
        }
        let mut sector = [0u8; SECTOR_SIZE];
        write_u32(&mut sector, SIGNATURE_OFFSET, self.signature);
        write_u32(&mut sector, TOTAL_SECTORS_OFFSET, self.total_sectors);
        write_u32(&mut sector, INODE_COUNT_OFFSET, self.inode_count);
        write_u32(&mut sector, FREE_INODES_OFFSET, self.free_inode_count);
        write_u32(&mut sector, DATA_BLOCK_COUNT_OFFSET, self.data_block_count);
        write_u32(&mut sector, FREE_BLOCKS_OFFSET, self.free_block_count);
        write_u32(&mut sector, ROOT_INODE_OFFSET, self.root_inode);
        sector[INODE_BITMAP_OFFSET..BLOCK_BITMAP_OFFSET]
            .copy_from_slice(self.inode_bitmap.as_raw_slice());
        sector[BLOCK_BITMAP_OFFSET..Self::ENCODED_LEN]
            .copy_from_slice(self.block_bitmap.as_raw_slice());
        Ok(sector)
    }

    /// decode without validating, callers check [SuperBlock::has_valid_signature]
    pub fn decode(sector: &Sector) -> Self {
        let mut inode_bits = [0u8; BITMAP_BYTES];
        inode_bits.copy_from_slice(&sector[INODE_BITMAP_OFFSET..BLOCK_BITMAP_OFFSET]);
        let mut block_bits = [0u8; BITMAP_BYTES];
        block_bits.copy_from_slice(&sector[BLOCK_BITMAP_OFFSET..Self::ENCODED_LEN]);
        SuperBlock {
            signature: read_u32(sector, SIGNATURE_OFFSET),
            total_sectors: read_u32(sector, TOTAL_SECTORS_OFFSET),
            inode_count: read_u32(sector, INODE_COUNT_OFFSET),
            free_inode_count: read_u32(sector, FREE_INODES_OFFSET),
            data_block_count: read_u32(sector, DATA_BLOCK_COUNT_OFFSET),
            free_block_count: read_u32(sector, FREE_BLOCKS_OFFSET),
            root_inode: read_u32(sector, ROOT_INODE_OFFSET),
            inode_bitmap: Bitmap::new(inode_bits),
            block_bitmap: Bitmap::new(block_bits),
        }
    }
}

/// for inode and data block allocation
impl SuperBlock {
    // bits of each bitmap that may be handed out
    fn inode_bits(&self) -> usize {
        (self.inode_count as usize).min(self.inode_bitmap.len())
    }

    fn block_bits(&self) -> usize {
        (self.data_block_count as usize).min(self.block_bitmap.len())
    }

    /// check if an inode is allocated
    pub fn has_inode(&self, inode_number: u32) -> bool {
        self.inode_bitmap
            .get(inode_number as usize)
            .as_deref()
            .copied()
            .unwrap_or(false)
    }

    /// check if the data block in `sector` is allocated
    pub fn has_data_block(&self, sector: u32) -> bool {
        data_block_index(sector).is_some_and(|index| {
            self.block_bitmap
                .get(index as usize)
                .as_deref()
                .copied()
                .unwrap_or(false)
        })
    }

    /// allocate the lowest free inode, [NO_INODE] when none is left
    pub fn allocate_inode(&mut self) -> u32 {
        let bits = self.inode_bits();
        if bits <= 1 {
            return NO_INODE;
        }
        let Some(index) = self.inode_bitmap[1..bits].first_zero().map(|p| p + 1) else {
            return NO_INODE;
        };
        self.inode_bitmap.set(index, true);
        self.free_inode_count = self.free_inode_count.saturating_sub(1);
        debug!("allocated inode {index}");
        index as u32
    }

    /// allocate the lowest free data block and return its sector,
    /// 0 when none is left
    pub fn allocate_data_block(&mut self) -> u32 {
        let bits = self.block_bits();
        let Some(index) = self.block_bitmap[..bits].first_zero() else {
            return 0;
        };
        self.block_bitmap.set(index, true);
        self.free_block_count = self.free_block_count.saturating_sub(1);
        let sector = data_block_sector(index as u32);
        debug!("allocated data block {index} at sector {sector}");
        sector
    }

    /// release an inode, out of range or already free numbers are ignored
    pub fn free_inode(&mut self, inode_number: u32) {
        let index = inode_number as usize;
        if inode_number == NO_INODE || index >= self.inode_bits() || !self.inode_bitmap[index] {
            return;
        }
        self.inode_bitmap.set(index, false);
        self.free_inode_count += 1;
    }

    /// release the data block in `sector`
    pub fn free_data_block(&mut self, sector: u32) {
        let Some(index) = data_block_index(sector).map(|i| i as usize) else {
            return;
        };
        if index >= self.block_bits() || !self.block_bitmap[index] {
            return;
        }
        self.block_bitmap.set(index, false);
        self.free_block_count += 1;
    }

    /// allocated inodes, the root included
    pub fn used_inodes(&self) -> impl Iterator<Item = u32> + '_ {
        self.inode_bitmap[..self.inode_bits()]
            .iter_ones()
            .map(|index| index as u32)
    }

    /// sectors of the allocated data blocks
    pub fn used_data_blocks(&self) -> impl Iterator<Item = u32> + '_ {
        self.block_bitmap[..self.block_bits()]
            .iter_ones()
            .map(|index| data_block_sector(index as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::TOTAL_SECTORS;

    #[test]
    fn test_new_superblock() {
        let sb = SuperBlock::new(TOTAL_SECTORS);
        assert!(sb.has_valid_signature());
        assert_eq!(sb.root_inode, ROOT_INODE);
        assert_eq!(sb.inode_count, 512);
        assert_eq!(sb.data_block_count, 400);
        assert_eq!(sb.free_inode_count, 511);
        assert_eq!(sb.free_block_count, 400);
        assert!(sb.has_inode(ROOT_INODE));
        assert!(!sb.has_inode(NO_INODE));
        assert_eq!(sb.used_inodes().collect::<Vec<_>>(), [1]);
        assert_eq!(sb.used_data_blocks().count(), 0);
    }

    #[test]
    fn test_encoded_layout() -> anyhow::Result<()> {
        assert_eq!(SuperBlock::ENCODED_LEN, 156);
        let mut sb = SuperBlock::new(TOTAL_SECTORS);
        sb.allocate_data_block();
        let sector = sb.encode()?;
        assert_eq!(&sector[0..4], &FS_MAGIC.to_le_bytes());
        assert_eq!(&sector[4..8], &500u32.to_le_bytes());
        assert_eq!(&sector[24..28], &1u32.to_le_bytes());
        // inode 1 is bit 1 of the first bitmap byte
        assert_eq!(sector[28], 0b0000_0010);
        assert_eq!(sector[92], 0b0000_0001);
        assert!(sector[156..].iter().all(|b| *b == 0));

        let decoded = SuperBlock::decode(&sector);
        assert_eq!(decoded, sb);
        Ok(())
    }

    #[test]
    fn test_decode_garbage_has_bad_signature() {
        let sector = [0xffu8; SECTOR_SIZE];
        assert!(!SuperBlock::decode(&sector).has_valid_signature());
    }

    #[test]
    fn test_allocate_inode_first_fit_until_exhausted() {
        let mut sb = SuperBlock::new(TOTAL_SECTORS);
        for expected in 2..INODE_COUNT {
            assert_eq!(sb.allocate_inode(), expected);
        }
        assert_eq!(sb.allocate_inode(), NO_INODE);
        assert!(!sb.has_inode(NO_INODE));

        sb.free_inode(37);
        assert_eq!(sb.allocate_inode(), 37);
    }

    #[test]
    fn test_free_inode_counts() {
        let mut sb = SuperBlock::new(TOTAL_SECTORS);
        let n = sb.allocate_inode();
        assert_eq!(sb.free_inode_count, 510);
        sb.free_inode(n);
        assert_eq!(sb.free_inode_count, 511);
        // double free and out of range do nothing
        sb.free_inode(n);
        sb.free_inode(INODE_COUNT + 3);
        sb.free_inode(NO_INODE);
        assert_eq!(sb.free_inode_count, 511);
    }

    #[test]
    fn test_allocate_data_block_returns_sectors() {
        let mut sb = SuperBlock::new(TOTAL_SECTORS);
        assert_eq!(sb.allocate_data_block(), 100);
        assert_eq!(sb.allocate_data_block(), 101);
        assert!(sb.has_data_block(101));
        sb.free_data_block(100);
        assert!(!sb.has_data_block(100));
        assert_eq!(sb.allocate_data_block(), 100);
        assert_eq!(sb.free_block_count, 398);

        for _ in 2..DATA_BLOCK_COUNT {
            assert_ne!(sb.allocate_data_block(), 0);
        }
        assert_eq!(sb.free_block_count, 0);
        assert_eq!(sb.allocate_data_block(), 0);
        // sectors outside the data area are ignored
        sb.free_data_block(5);
        sb.free_data_block(600);
        assert_eq!(sb.free_block_count, 0);
    }
}

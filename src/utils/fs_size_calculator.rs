//! This module contains functions to locate the different fs components on disk

use crate::fs::{
    DATA_BLOCK_COUNT, DATA_BLOCK_START, INODES_PER_SECTOR, INODE_SIZE, INODE_TABLE_END,
    INODE_TABLE_START, SECTOR_SIZE, TOTAL_SECTORS,
};

/// locate an inode in the inode table
/// # Arguments
/// - `inode_number`: the inode number
/// # Return
/// a `(sector, byte offset in that sector)` pair
/// # Example
/// ```
/// use treefs::utils::fs_size_calculator::inode_location;
/// assert_eq!(inode_location(1), (1, 256));
/// assert_eq!(inode_location(2), (2, 0));
/// assert_eq!(inode_location(197), (99, 256));
/// ```
pub const fn inode_location(inode_number: u32) -> (u32, usize) {
    let per_sector = INODES_PER_SECTOR as u32;
    (
        INODE_TABLE_START + inode_number / per_sector,
        (inode_number % per_sector) as usize * INODE_SIZE,
    )
}

/// how many inode slots the inode table can address
/// # Example
/// ```
/// use treefs::utils::fs_size_calculator::addressable_inodes;
/// assert_eq!(addressable_inodes(), 198);
/// ```
pub const fn addressable_inodes() -> u32 {
    (INODE_TABLE_END - INODE_TABLE_START + 1) * INODES_PER_SECTOR as u32
}

/// does this inode live inside the inode table sectors
pub const fn inode_in_table(inode_number: u32) -> bool {
    inode_number < addressable_inodes()
}

/// convert a data block index to its sector
/// # Example
/// ```
/// use treefs::utils::fs_size_calculator::data_block_sector;
/// assert_eq!(data_block_sector(0), 100);
/// ```
pub const fn data_block_sector(index: u32) -> u32 {
    DATA_BLOCK_START + index
}

/// convert a sector back to its data block index,
/// `None` if the sector is not a data block
pub const fn data_block_index(sector: u32) -> Option<u32> {
    if sector >= DATA_BLOCK_START && sector < DATA_BLOCK_START + DATA_BLOCK_COUNT {
        Some(sector - DATA_BLOCK_START)
    } else {
        None
    }
}

/// calculate the size of a whole disk image
/// # Example
/// ```
/// use treefs::utils::fs_size_calculator::image_size;
/// assert_eq!(image_size(), 500 * 512);
/// ```
pub const fn image_size() -> u64 {
    TOTAL_SECTORS as u64 * SECTOR_SIZE as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inode_location() {
        assert_eq!(inode_location(0), (1, 0));
        assert_eq!(inode_location(3), (2, 256));
        // past the table the formula runs into the data area
        assert_eq!(inode_location(198), (100, 0));
        assert!(inode_in_table(197));
        assert!(!inode_in_table(198));
    }

    #[test]
    fn test_data_block_index() {
        assert_eq!(data_block_index(99), None);
        assert_eq!(data_block_index(100), Some(0));
        assert_eq!(data_block_index(499), Some(399));
        assert_eq!(data_block_index(500), None);
        assert_eq!(data_block_index(data_block_sector(42)), Some(42));
    }
}

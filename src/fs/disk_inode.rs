use crate::utils::le_bytes::{read_u32, read_u32_array, write_u32, write_u32_slice};

use super::{
    FileKind, FsError, Result, DIRECT_POINTERS, DISK_NAME_LEN, INODE_MAGIC, INODE_SIZE,
    MAX_CHILDREN_ON_DISK,
};

const SIGNATURE_OFFSET: usize = 0;
const NUMBER_OFFSET: usize = 4;
const TYPE_OFFSET: usize = 8;
const SIZE_OFFSET: usize = 12;
const PARENT_OFFSET: usize = 16;
const DATA_BLOCKS_OFFSET: usize = 20;
const INDIRECT_OFFSET: usize = DATA_BLOCKS_OFFSET + DIRECT_POINTERS * 4;
const CREATED_OFFSET: usize = INDIRECT_OFFSET + 4;
const MODIFIED_OFFSET: usize = CREATED_OFFSET + 4;
const CHILD_COUNT_OFFSET: usize = MODIFIED_OFFSET + 4;
const CHILDREN_OFFSET: usize = CHILD_COUNT_OFFSET + 4;
const NAME_OFFSET: usize = CHILDREN_OFFSET + MAX_CHILDREN_ON_DISK * 4;
const RESERVED_OFFSET: usize = NAME_OFFSET + DISK_NAME_LEN;
const RESERVED_LEN: usize = 32;

/// one record of the inode table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskInode {
    pub signature: u32,
    pub inode_number: u32,
    /// see [FileKind::to_disk]
    pub kind: u32,
    /// content length for a file, in-memory child count for a folder
    pub size: u32,
    pub parent_inode: u32,
    /// sectors of the data blocks, only the first one is ever used
    pub data_blocks: [u32; DIRECT_POINTERS],
    pub indirect_block: u32,
    pub created_time: u32,
    pub modified_time: u32,
    pub child_count: u32,
    pub child_inodes: [u32; MAX_CHILDREN_ON_DISK],
    /// NUL padded
    pub name: [u8; DISK_NAME_LEN],
    pub reserved: [u8; RESERVED_LEN],
}

impl Default for DiskInode {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl DiskInode {
    /// bytes used by the encoded fields, the record is padded to [INODE_SIZE]
    pub const ENCODED_LEN: usize = RESERVED_OFFSET + RESERVED_LEN;

    pub const fn zeroed() -> Self {
        DiskInode {
            signature: 0,
            inode_number: 0,
            kind: 0,
            size: 0,
            parent_inode: 0,
            data_blocks: [0; DIRECT_POINTERS],
            indirect_block: 0,
            created_time: 0,
            modified_time: 0,
            child_count: 0,
            child_inodes: [0; MAX_CHILDREN_ON_DISK],
            name: [0; DISK_NAME_LEN],
            reserved: [0; RESERVED_LEN],
        }
    }

    /// a signed record for a node of `kind`
    pub fn new(inode_number: u32, kind: FileKind, parent_inode: u32) -> Self {
        DiskInode {
            signature: INODE_MAGIC,
            inode_number,
            kind: kind.to_disk(),
            parent_inode,
            ..Self::zeroed()
        }
    }

    pub fn has_valid_signature(&self) -> bool {
        self.signature == INODE_MAGIC
    }

    pub fn file_kind(&self) -> Option<FileKind> {
        FileKind::from_disk(self.kind)
    }
}

/// name and children
impl DiskInode {
    /// store `name`, cut to 63 bytes at a character boundary
    pub fn set_name(&mut self, name: &str) {
        let mut len = name.len().min(DISK_NAME_LEN - 1);
        while !name.is_char_boundary(len) {
            len -= 1;
        }
        self.name = [0; DISK_NAME_LEN];
        self.name[..len].copy_from_slice(&name.as_bytes()[..len]);
    }

    pub fn name(&self) -> String {
        let len = self
            .name
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(DISK_NAME_LEN);
        String::from_utf8_lossy(&self.name[..len]).into_owned()
    }

    /// recorded child inodes
    pub fn children(&self) -> &[u32] {
        let count = (self.child_count as usize).min(MAX_CHILDREN_ON_DISK);
        &self.child_inodes[..count]
    }

    /// replace the child list, anything past the 16th entry is dropped
    pub fn set_children(&mut self, children: &[u32]) {
        let count = children.len().min(MAX_CHILDREN_ON_DISK);
        self.child_inodes = [0; MAX_CHILDREN_ON_DISK];
        self.child_inodes[..count].copy_from_slice(&children[..count]);
        self.child_count = count as u32;
    }
}

/// encode and decode
impl DiskInode {
    /// write this record into the first [INODE_SIZE] bytes of `buf`
    pub fn encode_into(&self, buf: &mut [u8]) -> Result<()> {
        if buf.len() < INODE_SIZE || Self::ENCODED_LEN > INODE_SIZE {
            return Err(FsError::RecordTooLarge {
                len: INODE_SIZE,
                space: buf.len(),
            });
        }
        let record = &mut buf[..INODE_SIZE];
        record.fill(0);
        write_u32(record, SIGNATURE_OFFSET, self.signature);
        write_u32(record, NUMBER_OFFSET, self.inode_number);
        write_u32(record, TYPE_OFFSET, self.kind);
        write_u32(record, SIZE_OFFSET, self.size);
        write_u32(record, PARENT_OFFSET, self.parent_inode);
        write_u32_slice(record, DATA_BLOCKS_OFFSET, &self.data_blocks);
        write_u32(record, INDIRECT_OFFSET, self.indirect_block);
        write_u32(record, CREATED_OFFSET, self.created_time);
        write_u32(record, MODIFIED_OFFSET, self.modified_time);
        write_u32(record, CHILD_COUNT_OFFSET, self.child_count);
        write_u32_slice(record, CHILDREN_OFFSET, &self.child_inodes);
        record[NAME_OFFSET..RESERVED_OFFSET].copy_from_slice(&self.name);
        record[RESERVED_OFFSET..Self::ENCODED_LEN].copy_from_slice(&self.reserved);
        Ok(())
    }

    /// read a record from the first [INODE_SIZE] bytes of `buf`
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < INODE_SIZE {
            return Err(FsError::RecordTooLarge {
                len: INODE_SIZE,
                space: buf.len(),
            });
        }
        let mut name = [0u8; DISK_NAME_LEN];
        name.copy_from_slice(&buf[NAME_OFFSET..RESERVED_OFFSET]);
        let mut reserved = [0u8; RESERVED_LEN];
        reserved.copy_from_slice(&buf[RESERVED_OFFSET..Self::ENCODED_LEN]);
        Ok(DiskInode {
            signature: read_u32(buf, SIGNATURE_OFFSET),
            inode_number: read_u32(buf, NUMBER_OFFSET),
            kind: read_u32(buf, TYPE_OFFSET),
            size: read_u32(buf, SIZE_OFFSET),
            parent_inode: read_u32(buf, PARENT_OFFSET),
            data_blocks: read_u32_array(buf, DATA_BLOCKS_OFFSET),
            indirect_block: read_u32(buf, INDIRECT_OFFSET),
            created_time: read_u32(buf, CREATED_OFFSET),
            modified_time: read_u32(buf, MODIFIED_OFFSET),
            child_count: read_u32(buf, CHILD_COUNT_OFFSET),
            child_inodes: read_u32_array(buf, CHILDREN_OFFSET),
            name,
            reserved,
        })
    }
}

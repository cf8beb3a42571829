//! conversion between tree nodes and inode records, and the recursive
//! whole-tree save and load
use std::rc::Rc;

use log::{debug, info, warn};
use smallvec::SmallVec;

use crate::device::SectorDevice;

use super::{
    node::{add_child, FileNode, NodeRef, Payload},
    DiskInode, FileKind, FileSystem, FsError, Result, INODE_COUNT, MAX_CHILDREN_ON_DISK,
    MAX_CONTENT_ON_DISK, NO_INODE, ROOT_INODE,
};

type ChildInodes = SmallVec<[u32; MAX_CHILDREN_ON_DISK]>;

/// node to inode
impl<D: SectorDevice> FileSystem<D> {
    /// build the inode record of `node`
    ///
    /// A non-empty file gets a fresh data block holding its first 511 bytes.
    /// If that block can't be written it is given back and the record points
    /// at no block, while `size` still reports the full length.
    pub(crate) fn node_to_inode(
        &mut self,
        node: &FileNode,
        inode_number: u32,
        parent_inode: u32,
    ) -> DiskInode {
        let mut inode = DiskInode::new(inode_number, node.kind(), parent_inode);
        inode.set_name(node.name());
        match node.payload() {
            Payload::File(content) => {
                inode.size = content.len() as u32;
                if !content.is_empty() {
                    let block = self.allocate_data_block();
                    if block == 0 {
                        warn!("no data block left for {:?}, content dropped", node.name());
                    } else if let Err(err) = self.write_data_block(block, content) {
                        warn!("writing content of {:?} failed: {err}", node.name());
                        self.free_data_block(block);
                    } else {
                        inode.data_blocks[0] = block;
                    }
                }
            }
            Payload::Folder(_) => {
                inode.size = node.child_count() as u32;
                inode.child_count = 0;
            }
        }
        inode
    }

    /// write `node` and everything below it, `node` taking `inode_number`
    ///
    /// Only the first 16 children of a folder are saved. A child that gets
    /// no inode is skipped.
    pub(crate) fn save_tree(
        &mut self,
        node: &NodeRef,
        inode_number: u32,
        parent_inode: u32,
    ) -> Result<()> {
        let mut inode = {
            let node = node.borrow();
            self.node_to_inode(&node, inode_number, parent_inode)
        };
        self.write_inode(&inode)?;
        if inode.file_kind() != Some(FileKind::Folder) {
            return Ok(());
        }

        let children: SmallVec<[NodeRef; MAX_CHILDREN_ON_DISK]> = {
            let node = node.borrow();
            if node.child_count() > MAX_CHILDREN_ON_DISK {
                warn!(
                    "{:?} has {} children, only the first {MAX_CHILDREN_ON_DISK} are saved",
                    node.name(),
                    node.child_count()
                );
            }
            node.children()
                .iter()
                .take(MAX_CHILDREN_ON_DISK)
                .cloned()
                .collect()
        };

        let mut child_inodes = ChildInodes::new();
        for child in &children {
            let child_number = self.allocate_inode();
            if child_number == NO_INODE {
                warn!("no inode left for {:?}, skipped", child.borrow().name());
                continue;
            }
            if child.borrow().is_folder() {
                self.save_tree(child, child_number, inode_number)?;
            } else {
                let child_inode = self.node_to_inode(&child.borrow(), child_number, inode_number);
                self.write_inode(&child_inode)?;
            }
            child_inodes.push(child_number);
        }

        inode.set_children(&child_inodes);
        self.write_inode(&inode)
    }

    /// free every non-root inode, then write the whole tree from the root
    pub fn save_to_disk(&mut self) -> Result<()> {
        let drive = self.mounted_drive()?;
        info!("save_to_disk() called on drive {drive}");
        self.free_all_but_root();
        let root = Rc::clone(&self.root);
        let root_inode = self.superblock().root_inode;
        self.save_tree(&root, root_inode, NO_INODE)?;
        self.sync()
    }
}

/// inode to node
impl<D: SectorDevice> FileSystem<D> {
    /// build a detached node from an inode record
    pub(crate) fn inode_to_node(&mut self, inode: &DiskInode) -> Result<NodeRef> {
        if !inode.has_valid_signature() {
            return Err(FsError::CorruptInode(inode.inode_number));
        }
        let kind = inode
            .file_kind()
            .ok_or(FsError::CorruptInode(inode.inode_number))?;
        let node = self.nodes.allocate(kind).ok_or(FsError::OutOfMemory)?;
        node.borrow_mut().set_name(&inode.name())?;

        let block = inode.data_blocks[0];
        if kind == FileKind::File && block != 0 {
            let len = (inode.size as usize).min(MAX_CONTENT_ON_DISK);
            let content = self.read_data_block(block, len)?;
            node.borrow_mut().set_content(&content)?;
        }
        Ok(node)
    }

    /// read inode `inode_number` and link it, with its subtree, under `parent`
    pub(crate) fn load_tree(
        &mut self,
        inode_number: u32,
        parent: &NodeRef,
        depth: u32,
    ) -> Result<()> {
        // a tree can't be deeper than the number of inodes, anything more is a cycle
        if depth > INODE_COUNT {
            return Err(FsError::CorruptInode(inode_number));
        }
        let inode = self.read_inode(inode_number)?;
        let node = self.inode_to_node(&inode)?;
        debug!(
            "loaded inode {inode_number} as {} {:?}",
            node.borrow().kind(),
            node.borrow().name()
        );
        add_child(parent, Rc::clone(&node))?;
        if node.borrow().is_folder() {
            for &child in inode.children() {
                self.load_tree(child, &node, depth + 1)?;
            }
        }
        Ok(())
    }

    /// drop the in-memory tree and rebuild it from the drive
    ///
    /// The current directory moves back to the root.
    pub fn load_from_disk(&mut self) -> Result<()> {
        let drive = self.mounted_drive()?;
        info!("load_from_disk() called on drive {drive}");
        let root_number = self.superblock().root_inode;
        let root_inode = self.read_inode(root_number)?;
        if !root_inode.has_valid_signature() {
            return Err(FsError::CorruptInode(root_number));
        }

        self.cwd = Rc::clone(&self.root);
        let old_children = self.root.borrow_mut().take_children();
        for child in old_children {
            self.nodes.release(Some(child));
        }

        let root = Rc::clone(&self.root);
        for &child in root_inode.children() {
            self.load_tree(child, &root, 1)?;
        }
        info!(
            "loaded {} nodes from drive {drive}",
            self.nodes.live_nodes()
        );
        Ok(())
    }
}

use std::{fmt, rc::Rc};

use byte_unit::Byte;
use log::{info, warn};

use crate::device::SectorDevice;

use super::{
    node::{add_child, exists_in, find_child, remove_child, NodeRef},
    FileKind, FileSystem, FsError, Result, MAX_NAME_LEN, SECTOR_SIZE,
};

/// blind read-modify-write passes over sector 0 after a cache flush
const FLUSH_REWRITE_CYCLES: usize = 3;

/// one line of a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: FileKind,
    /// content length of a file, child count of a folder
    pub size: usize,
}

/// what the cached superblock says about the drive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskInfo {
    pub drive: u8,
    pub total_sectors: u32,
    pub inode_count: u32,
    pub free_inodes: u32,
    pub used_inodes: usize,
    pub data_block_count: u32,
    pub free_blocks: u32,
    pub used_blocks: usize,
}

impl fmt::Display for DiskInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = Byte::from_bytes(self.total_sectors as u128 * SECTOR_SIZE as u128)
            .get_appropriate_unit(true);
        writeln!(f, "drive {}: {} sectors ({size})", self.drive, self.total_sectors)?;
        writeln!(
            f,
            "inodes: {} used, {} free of {}",
            self.used_inodes, self.free_inodes, self.inode_count
        )?;
        write!(
            f,
            "data blocks: {} used, {} free of {}",
            self.used_blocks, self.free_blocks, self.data_block_count
        )
    }
}

/// how much the in-memory tree is holding on to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemStats {
    pub live_nodes: usize,
    pub content_bytes: usize,
    pub content_capacity: usize,
}

impl fmt::Display for MemStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let capacity = Byte::from_bytes(self.content_capacity as u128).get_appropriate_unit(true);
        write!(
            f,
            "{} live nodes, {} content bytes in {capacity} of buffers",
            self.live_nodes, self.content_bytes
        )
    }
}

// `.` and `..` are taken by navigation, `/` by paths
fn validate_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name.len() > MAX_NAME_LEN
        || matches!(name, "." | "..")
        || name.contains('/')
    {
        return Err(FsError::InvalidName(name.to_owned()));
    }
    Ok(())
}

/// making and removing nodes in the current directory
impl<D: SectorDevice> FileSystem<D> {
    pub fn make_file(&mut self, name: &str, content: &[u8]) -> Result<()> {
        info!(
            "make_file() called with name: {name:?} and {} bytes",
            content.len()
        );
        self.make_node(name, FileKind::File, Some(content))
    }

    pub fn make_dir(&mut self, name: &str) -> Result<()> {
        info!("make_dir() called with name: {name:?}");
        self.make_node(name, FileKind::Folder, None)
    }

    fn make_node(&mut self, name: &str, kind: FileKind, content: Option<&[u8]>) -> Result<()> {
        validate_name(name)?;
        if exists_in(&self.cwd, name, kind) {
            return Err(FsError::DuplicateName {
                name: name.to_owned(),
                kind,
            });
        }
        let node = self.nodes.allocate(kind).ok_or(FsError::OutOfMemory)?;
        {
            let mut node = node.borrow_mut();
            node.set_name(name)?;
            if let Some(content) = content {
                node.set_content(content)?;
            }
        }
        add_child(&self.cwd, node)?;
        self.auto_save()
    }

    /// remove a file of the current directory
    pub fn remove(&mut self, name: &str) -> Result<()> {
        info!("remove() called with name: {name:?}");
        let node = self.lookup(name, FileKind::File)?;
        let removed = remove_child(&self.cwd, &node)?;
        drop(node);
        self.nodes.release(Some(removed));
        self.auto_save()
    }

    /// remove an empty folder of the current directory
    pub fn remove_dir(&mut self, name: &str) -> Result<()> {
        info!("remove_dir() called with name: {name:?}");
        let node = self.lookup(name, FileKind::Folder)?;
        if node.borrow().child_count() != 0 {
            return Err(FsError::DirectoryNotEmpty(name.to_owned()));
        }
        let removed = remove_child(&self.cwd, &node)?;
        drop(node);
        self.nodes.release(Some(removed));
        self.auto_save()
    }

    /// replace the content of a file of the current directory
    pub fn edit_file(&mut self, name: &str, content: &[u8]) -> Result<()> {
        info!(
            "edit_file() called with name: {name:?} and {} bytes",
            content.len()
        );
        let node = find_child(&self.cwd, name, FileKind::File)
            .ok_or_else(|| FsError::NotFound(name.to_owned()))?;
        node.borrow_mut().set_content(content)?;
        self.auto_save()
    }

    // a child of the current directory, reporting a kind mismatch over "not found"
    fn lookup(&self, name: &str, kind: FileKind) -> Result<NodeRef> {
        if let Some(node) = find_child(&self.cwd, name, kind) {
            return Ok(node);
        }
        let other = match kind {
            FileKind::File => FileKind::Folder,
            FileKind::Folder => FileKind::File,
        };
        match (exists_in(&self.cwd, name, other), kind) {
            (true, FileKind::File) => Err(FsError::NotAFile),
            (true, FileKind::Folder) => Err(FsError::NotAFolder),
            (false, _) => Err(FsError::NotFound(name.to_owned())),
        }
    }
}

/// navigation and reading
impl<D> FileSystem<D> {
    /// enter a folder of the current directory, `..` goes up
    pub fn change_dir(&mut self, name: &str) -> Result<()> {
        info!("change_dir() called with name: {name:?}");
        if name == ".." {
            let parent = self.cwd.borrow().parent();
            if let Some(parent) = parent {
                self.cwd = parent;
            }
            return Ok(());
        }
        let dir = find_child(&self.cwd, name, FileKind::Folder)
            .ok_or_else(|| FsError::NotFound(name.to_owned()))?;
        self.cwd = dir;
        Ok(())
    }

    pub fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        let node = find_child(&self.cwd, name, FileKind::File)
            .ok_or_else(|| FsError::NotFound(name.to_owned()))?;
        let node = node.borrow();
        Ok(node.content().unwrap_or_default().to_vec())
    }

    /// the children of the current directory, in insertion order
    pub fn list(&self) -> Vec<DirEntry> {
        self.cwd
            .borrow()
            .children()
            .iter()
            .map(|child| {
                let child = child.borrow();
                let size = match child.content() {
                    Some(content) => content.len(),
                    None => child.child_count(),
                };
                DirEntry {
                    name: child.name().to_owned(),
                    kind: child.kind(),
                    size,
                }
            })
            .collect()
    }

    /// absolute path of the current directory
    pub fn pwd(&self) -> String {
        let mut names = Vec::new();
        let mut node = Rc::clone(&self.cwd);
        loop {
            let parent = node.borrow().parent();
            match parent {
                Some(parent) => {
                    names.push(node.borrow().name().to_owned());
                    node = parent;
                }
                None => break,
            }
        }
        names.reverse();
        format!("/{}", names.join("/"))
    }

    pub fn mem_stats(&self) -> MemStats {
        fn walk(node: &NodeRef, stats: &mut MemStats) {
            let node = node.borrow();
            if let Some(content) = node.content() {
                stats.content_bytes += content.len();
                stats.content_capacity += node.content_capacity();
            }
            for child in node.children() {
                walk(child, stats);
            }
        }
        let mut stats = MemStats {
            live_nodes: self.nodes.live_nodes(),
            content_bytes: 0,
            content_capacity: 0,
        };
        walk(&self.root, &mut stats);
        stats
    }

    pub fn disk_info(&self) -> Result<DiskInfo> {
        let drive = self.mounted_drive()?;
        let sb = self.superblock();
        Ok(DiskInfo {
            drive,
            total_sectors: sb.total_sectors,
            inode_count: sb.inode_count,
            free_inodes: sb.free_inode_count,
            used_inodes: sb.used_inodes().count(),
            data_block_count: sb.data_block_count,
            free_blocks: sb.free_block_count,
            used_blocks: sb.used_data_blocks().count(),
        })
    }
}

/// persistence policy
impl<D: SectorDevice> FileSystem<D> {
    /// sync, save the whole tree again, then flush the drive cache
    ///
    /// The flush is followed by three read-modify-write passes over sector 0
    /// whose failures are only logged.
    pub fn flush_cache(&mut self) -> Result<()> {
        let drive = self.mounted_drive()?;
        info!("flush_cache() called on drive {drive}");
        self.sync()?;
        self.save_to_disk()?;
        self.flush_device(drive)?;
        for cycle in 0..FLUSH_REWRITE_CYCLES {
            if let Err(err) = self.rewrite_superblock_sector(drive) {
                warn!("rewrite {cycle} of sector 0 after flush failed: {err}");
            }
        }
        Ok(())
    }

    // runs after every successful change
    fn auto_save(&mut self) -> Result<()> {
        if !self.options.auto_save || !self.is_mounted() {
            return Ok(());
        }
        self.sync()?;
        self.save_to_disk()?;
        self.flush_cache()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        device::RamDisk,
        fs::{code, FsOptions, MAX_CONTENT_ON_DISK, ROOT_INODE},
    };

    fn manual_save() -> FsOptions {
        FsOptions {
            auto_save: false,
            ..FsOptions::default()
        }
    }

    fn formatted(options: FsOptions) -> FileSystem<RamDisk> {
        let mut fs = FileSystem::with_options(RamDisk::new(), options).unwrap();
        fs.format(0).unwrap();
        fs
    }

    /// reopen the drive of `fs` in a brand new session
    fn reopen(fs: FileSystem<RamDisk>) -> anyhow::Result<FileSystem<RamDisk>> {
        let mut fs = FileSystem::with_options(fs.into_device(), manual_save())?;
        fs.mount(0)?;
        fs.load_from_disk()?;
        Ok(fs)
    }

    #[test]
    fn test_scenario_docs_and_hello() -> anyhow::Result<()> {
        let mut fs = FileSystem::new(RamDisk::new())?;
        fs.format(0)?;
        fs.mount(0)?;
        fs.make_dir("docs")?;
        fs.make_file("a.txt", b"hello")?;
        fs.save_to_disk()?;
        fs.load_from_disk()?;

        assert_eq!(
            fs.list(),
            [
                DirEntry {
                    name: "docs".into(),
                    kind: FileKind::Folder,
                    size: 0
                },
                DirEntry {
                    name: "a.txt".into(),
                    kind: FileKind::File,
                    size: 5
                },
            ]
        );
        assert_eq!(fs.read_file("a.txt")?, b"hello");
        // root plus two children
        assert_eq!(fs.mem_stats().live_nodes, 3);
        Ok(())
    }

    #[test]
    fn test_content_round_trip_and_truncation() -> anyhow::Result<()> {
        let mut fs = formatted(manual_save());
        let short = b"short content".to_vec();
        let exact = vec![b'e'; MAX_CONTENT_ON_DISK];
        let long: Vec<u8> = (0..2000u32).map(|i| (i % 251) as u8).collect();
        fs.make_file("short", &short)?;
        fs.make_file("exact", &exact)?;
        fs.make_file("long", b"placeholder")?;
        fs.edit_file("long", &long)?;
        // in memory nothing is cut
        assert_eq!(fs.read_file("long")?, long);

        fs.save_to_disk()?;
        let fs = reopen(fs)?;
        assert_eq!(fs.read_file("short")?, short);
        assert_eq!(fs.read_file("exact")?, exact);
        assert_eq!(fs.read_file("long")?, &long[..MAX_CONTENT_ON_DISK]);
        Ok(())
    }

    #[test]
    fn test_nested_tree_round_trip() -> anyhow::Result<()> {
        let mut fs = formatted(manual_save());
        fs.make_dir("a")?;
        fs.make_file("top.txt", b"top")?;
        fs.change_dir("a")?;
        fs.make_dir("b")?;
        fs.make_file("in_a.txt", b"in a")?;
        fs.change_dir("b")?;
        fs.make_file("deep.txt", b"deep")?;
        fs.make_dir("empty")?;
        assert_eq!(fs.pwd(), "/a/b");
        fs.save_to_disk()?;

        let mut fs = reopen(fs)?;
        assert_eq!(fs.pwd(), "/");
        let names: Vec<_> = fs.list().into_iter().map(|e| e.name).collect();
        assert_eq!(names, ["a", "top.txt"]);
        fs.change_dir("a")?;
        let names: Vec<_> = fs.list().into_iter().map(|e| e.name).collect();
        assert_eq!(names, ["b", "in_a.txt"]);
        assert_eq!(fs.read_file("in_a.txt")?, b"in a");
        fs.change_dir("b")?;
        assert_eq!(fs.read_file("deep.txt")?, b"deep");
        fs.change_dir("empty")?;
        assert!(fs.list().is_empty());
        fs.change_dir("..")?;
        fs.change_dir("..")?;
        fs.change_dir("..")?;
        assert_eq!(fs.pwd(), "/");
        Ok(())
    }

    #[test]
    fn test_name_validation() -> anyhow::Result<()> {
        let mut fs = formatted(manual_save());
        let err = fs.make_file("", b"x").unwrap_err();
        assert_eq!(err.code(), code::INVALID_NAME);
        assert!(fs.make_dir(&"d".repeat(127)).is_err());
        fs.make_dir(&"d".repeat(126))?;
        assert_eq!(fs.list().len(), 1);

        for name in [".", "..", "a/b", "/"] {
            assert!(matches!(fs.make_dir(name), Err(FsError::InvalidName(_))));
            assert!(matches!(fs.make_file(name, b""), Err(FsError::InvalidName(_))));
        }
        assert_eq!(fs.list().len(), 1);
        fs.make_file("...", b"dots are fine otherwise")?;
        Ok(())
    }

    #[test]
    fn test_duplicates_are_per_kind() -> anyhow::Result<()> {
        let mut fs = formatted(manual_save());
        fs.make_file("x", b"1")?;
        let err = fs.make_file("x", b"2").unwrap_err();
        assert_eq!(err.code(), code::DUPLICATE_NAME);
        // a folder may share the name of a file
        fs.make_dir("x")?;
        assert!(matches!(
            fs.make_dir("x"),
            Err(FsError::DuplicateName {
                kind: FileKind::Folder,
                ..
            })
        ));
        assert_eq!(fs.list().len(), 2);
        assert_eq!(fs.read_file("x")?, b"1");
        fs.change_dir("x")?;
        assert_eq!(fs.pwd(), "/x");
        Ok(())
    }

    #[test]
    fn test_remove_dir_refuses_non_empty() -> anyhow::Result<()> {
        let mut fs = formatted(manual_save());
        fs.make_dir("docs")?;
        fs.change_dir("docs")?;
        fs.make_file("keep.txt", b"keep")?;
        fs.change_dir("..")?;

        let err = fs.remove_dir("docs").unwrap_err();
        assert_eq!(err.code(), code::DIRECTORY_NOT_EMPTY);
        assert_eq!(fs.list()[0].name, "docs");
        fs.change_dir("docs")?;
        assert_eq!(fs.read_file("keep.txt")?, b"keep");

        fs.remove("keep.txt")?;
        fs.change_dir("..")?;
        fs.remove_dir("docs")?;
        assert!(fs.list().is_empty());
        assert_eq!(fs.mem_stats().live_nodes, 1);
        Ok(())
    }

    #[test]
    fn test_remove_checks_kind() -> anyhow::Result<()> {
        let mut fs = formatted(manual_save());
        fs.make_dir("d")?;
        fs.make_file("f", b"")?;
        assert!(matches!(fs.remove("d"), Err(FsError::NotAFile)));
        assert!(matches!(fs.remove_dir("f"), Err(FsError::NotAFolder)));
        assert!(matches!(fs.remove("nope"), Err(FsError::NotFound(_))));
        assert!(matches!(fs.edit_file("d", b"x"), Err(FsError::NotFound(_))));
        Ok(())
    }

    #[test]
    fn test_change_dir() -> anyhow::Result<()> {
        let mut fs = formatted(manual_save());
        // going up from the root stays at the root
        fs.change_dir("..")?;
        assert!(Rc::ptr_eq(&fs.current_dir(), &fs.root()));
        fs.make_file("f", b"")?;
        assert!(matches!(fs.change_dir("f"), Err(FsError::NotFound(_))));
        assert!(matches!(fs.change_dir("missing"), Err(FsError::NotFound(_))));
        Ok(())
    }

    #[test]
    fn test_tree_works_unmounted() -> anyhow::Result<()> {
        let mut fs = FileSystem::new(RamDisk::new())?;
        fs.make_dir("d")?;
        fs.make_file("f", b"data")?;
        assert_eq!(fs.device().writes(), 0);
        assert!(matches!(fs.disk_info(), Err(FsError::NotMounted)));
        assert!(matches!(fs.flush_cache(), Err(FsError::NotMounted)));
        Ok(())
    }

    #[test]
    fn test_node_limit() -> anyhow::Result<()> {
        let options = FsOptions {
            auto_save: false,
            node_limit: Some(3),
        };
        let mut fs = formatted(options);
        fs.make_file("a", b"")?;
        fs.make_file("b", b"")?;
        assert!(matches!(fs.make_file("c", b""), Err(FsError::OutOfMemory)));
        fs.remove("a")?;
        fs.make_file("c", b"")?;
        Ok(())
    }

    #[test]
    fn test_auto_save_persists_every_change() -> anyhow::Result<()> {
        let mut fs = formatted(FsOptions::default());
        fs.make_dir("docs")?;
        fs.change_dir("docs")?;
        fs.make_file("note", b"first")?;
        fs.edit_file("note", b"second")?;

        let mut fs = reopen(fs)?;
        fs.change_dir("docs")?;
        assert_eq!(fs.read_file("note")?, b"second");
        Ok(())
    }

    #[test]
    fn test_auto_save_cost_grows_with_tree() -> anyhow::Result<()> {
        let mut fs = formatted(FsOptions::default());
        fs.device_mut().reset_counters();
        fs.make_file("f0", b"x")?;
        let small_tree_writes = fs.device().writes();
        assert_eq!(fs.device().flushes(), 1);

        for i in 1..12 {
            fs.make_file(&format!("f{i}"), b"x")?;
        }
        fs.device_mut().reset_counters();
        fs.make_file("f12", b"x")?;
        let large_tree_writes = fs.device().writes();
        // two saves per change, each writing an inode and a block per file
        assert_eq!(large_tree_writes - small_tree_writes, 12 * 4);
        Ok(())
    }

    #[test]
    fn test_flush_cache_rewrites_sector_zero() -> anyhow::Result<()> {
        let mut fs = formatted(manual_save());
        fs.device_mut().reset_counters();
        fs.flush_cache()?;
        // sync, save (root inode twice plus the superblock), three rewrites
        assert_eq!(fs.device().writes(), 1 + 3 + FLUSH_REWRITE_CYCLES);
        assert_eq!(fs.device().flushes(), 1);
        Ok(())
    }

    #[test]
    fn test_failed_save_keeps_memory_change() -> anyhow::Result<()> {
        let mut fs = formatted(FsOptions::default());
        fs.device_mut().fail_writes_to(0);
        assert!(matches!(fs.make_file("f", b"x"), Err(FsError::Io(_))));
        assert_eq!(fs.read_file("f")?, b"x");
        Ok(())
    }

    #[test]
    fn test_disk_info_and_mem_stats() -> anyhow::Result<()> {
        let mut fs = formatted(FsOptions::default());
        fs.make_dir("d")?;
        fs.make_file("f", b"hello")?;
        let info = fs.disk_info()?;
        assert_eq!(info.drive, 0);
        assert_eq!(info.total_sectors, 500);
        // root, "d" and "f"
        assert_eq!(info.used_inodes, 3);
        assert_eq!(info.used_blocks, 1);
        assert_eq!(info.free_blocks, 399);
        assert!(info.to_string().contains("data blocks: 1 used, 399 free of 400"));

        let stats = fs.mem_stats();
        assert_eq!(stats.live_nodes, 3);
        assert_eq!(stats.content_bytes, 5);
        assert!(stats.content_capacity >= 6);
        assert!(fs.superblock().has_inode(ROOT_INODE));
        Ok(())
    }

    #[test]
    fn test_load_discards_unsaved_changes() -> anyhow::Result<()> {
        let mut fs = formatted(manual_save());
        fs.make_file("saved", b"1")?;
        fs.save_to_disk()?;
        fs.make_dir("unsaved")?;
        fs.change_dir("unsaved")?;
        fs.load_from_disk()?;
        assert_eq!(fs.pwd(), "/");
        let names: Vec<_> = fs.list().into_iter().map(|e| e.name).collect();
        assert_eq!(names, ["saved"]);
        assert_eq!(fs.mem_stats().live_nodes, 2);
        Ok(())
    }
}

//! the in-memory directory tree
//!
//! Every folder owns its children, so dropping a node releases its whole
//! subtree. The parent link is weak and only used to walk upwards.
use std::{
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
};

use log::debug;

use super::{FileKind, FsError, Result, CHILD_ARRAY_INITIAL_CAPACITY, NODE_NAME_CAPACITY};

pub type NodeRef = Rc<RefCell<FileNode>>;

#[derive(Debug)]
pub enum Payload {
    /// file content
    File(Vec<u8>),
    /// child nodes, `None` until the first child is linked
    Folder(Option<Vec<NodeRef>>),
}

#[derive(Debug)]
pub struct FileNode {
    name: String,
    parent: Weak<RefCell<FileNode>>,
    payload: Payload,
    _live: LiveNode,
}

// keeps the allocator's live-node count in step with the nodes in existence
#[derive(Debug)]
struct LiveNode(Rc<Cell<usize>>);

impl Drop for LiveNode {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

/// hands out tree nodes and counts the live ones
#[derive(Debug, Default)]
pub struct NodeAllocator {
    live: Rc<Cell<usize>>,
    limit: Option<usize>,
}

impl NodeAllocator {
    /// `limit` caps the number of live nodes, `None` means unlimited
    pub fn new(limit: Option<usize>) -> Self {
        NodeAllocator {
            live: Rc::new(Cell::new(0)),
            limit,
        }
    }

    /// allocate an empty, unnamed node of the given kind,
    /// `None` when the node budget is used up
    pub fn allocate(&self, kind: FileKind) -> Option<NodeRef> {
        if self.limit.is_some_and(|limit| self.live.get() >= limit) {
            debug!("node allocation refused, {} nodes live", self.live.get());
            return None;
        }
        let payload = match kind {
            FileKind::File => Payload::File(Vec::new()),
            FileKind::Folder => Payload::Folder(None),
        };
        self.live.set(self.live.get() + 1);
        Some(Rc::new(RefCell::new(FileNode {
            name: String::new(),
            parent: Weak::new(),
            payload,
            _live: LiveNode(Rc::clone(&self.live)),
        })))
    }

    /// release a node and, for a folder, everything below it
    pub fn release(&self, node: Option<NodeRef>) {
        if let Some(node) = node {
            debug!("releasing node {:?}", node.borrow().name());
            drop(node);
        }
    }

    pub fn live_nodes(&self) -> usize {
        self.live.get()
    }
}

/// accessors
impl FileNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FileKind {
        match self.payload {
            Payload::File(_) => FileKind::File,
            Payload::Folder(_) => FileKind::Folder,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind() == FileKind::Folder
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn parent(&self) -> Option<NodeRef> {
        self.parent.upgrade()
    }

    /// file content, `None` for a folder
    pub fn content(&self) -> Option<&[u8]> {
        match &self.payload {
            Payload::File(content) => Some(content),
            Payload::Folder(_) => None,
        }
    }

    pub fn content_capacity(&self) -> usize {
        match &self.payload {
            Payload::File(content) => content.capacity(),
            Payload::Folder(_) => 0,
        }
    }

    /// children of a folder, empty for a file
    pub fn children(&self) -> &[NodeRef] {
        match &self.payload {
            Payload::Folder(Some(children)) => children,
            _ => &[],
        }
    }

    pub fn child_count(&self) -> usize {
        self.children().len()
    }

    pub fn child_capacity(&self) -> usize {
        match &self.payload {
            Payload::Folder(Some(children)) => children.capacity(),
            _ => 0,
        }
    }
}

/// mutation
impl FileNode {
    pub fn set_name(&mut self, name: &str) -> Result<()> {
        if name.len() > NODE_NAME_CAPACITY {
            return Err(FsError::InvalidName(name.to_owned()));
        }
        self.name.clear();
        self.name.push_str(name);
        Ok(())
    }

    /// replace the whole content of a file
    ///
    /// On failure the content is left empty.
    pub fn set_content(&mut self, bytes: &[u8]) -> Result<()> {
        self.reserve_content(bytes.len())?.extend_from_slice(bytes);
        Ok(())
    }

    // empty the file, then make room for `len` bytes plus a terminator
    fn reserve_content(&mut self, len: usize) -> Result<&mut Vec<u8>> {
        let Payload::File(content) = &mut self.payload else {
            return Err(FsError::NotAFile);
        };
        // the old buffer is freed before reserving, so a failure leaves the file empty
        *content = Vec::new();
        content.try_reserve_exact(len.saturating_add(1))?;
        Ok(content)
    }

    /// unlink every child at once, used before a reload
    pub fn take_children(&mut self) -> Vec<NodeRef> {
        match &mut self.payload {
            Payload::Folder(children) => children.take().unwrap_or_default(),
            Payload::File(_) => Vec::new(),
        }
    }
}

/// does `dir` hold a child with exactly this name and kind
pub fn exists_in(dir: &NodeRef, name: &str, kind: FileKind) -> bool {
    find_child(dir, name, kind).is_some()
}

pub fn find_child(dir: &NodeRef, name: &str, kind: FileKind) -> Option<NodeRef> {
    dir.borrow()
        .children()
        .iter()
        .find(|child| {
            let child = child.borrow();
            child.name == name && child.kind() == kind
        })
        .cloned()
}

/// append `child` to `dir`, growing the child array by doubling
pub fn add_child(dir: &NodeRef, child: NodeRef) -> Result<()> {
    let mut parent = dir.borrow_mut();
    let Payload::Folder(slot) = &mut parent.payload else {
        return Err(FsError::NotAFolder);
    };
    if slot.is_none() {
        let mut fresh = Vec::new();
        fresh.try_reserve_exact(CHILD_ARRAY_INITIAL_CAPACITY)?;
        *slot = Some(fresh);
    }
    let children = slot.get_or_insert_with(Vec::new);
    if children.len() == children.capacity() {
        children.try_reserve_exact(children.capacity().max(CHILD_ARRAY_INITIAL_CAPACITY))?;
    }
    child.borrow_mut().parent = Rc::downgrade(dir);
    children.push(child);
    Ok(())
}

/// unlink `child` from `dir`, matched by identity, and hand it back
pub fn remove_child(dir: &NodeRef, child: &NodeRef) -> Result<NodeRef> {
    let mut parent = dir.borrow_mut();
    let Payload::Folder(Some(children)) = &mut parent.payload else {
        return Err(FsError::NotFound(child.borrow().name.clone()));
    };
    let Some(position) = children.iter().position(|c| Rc::ptr_eq(c, child)) else {
        return Err(FsError::NotFound(child.borrow().name.clone()));
    };
    Ok(children.remove(position))
}

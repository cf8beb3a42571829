use std::fmt;

/// an enum to describe the type of a node
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FileKind {
    /// a regular file
    File,
    /// a directory
    Folder,
}

const DISK_TYPE_FILE: u32 = 1;
const DISK_TYPE_FOLDER: u32 = 2;

impl FileKind {
    /// the `type` field stored in a [DiskInode](super::DiskInode)
    pub const fn to_disk(self) -> u32 {
        match self {
            FileKind::File => DISK_TYPE_FILE,
            FileKind::Folder => DISK_TYPE_FOLDER,
        }
    }

    pub const fn from_disk(raw: u32) -> Option<Self> {
        match raw {
            DISK_TYPE_FILE => Some(FileKind::File),
            DISK_TYPE_FOLDER => Some(FileKind::Folder),
            _ => None,
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::File => f.write_str("file"),
            FileKind::Folder => f.write_str("folder"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disk_type_codes() {
        assert_eq!(FileKind::from_disk(FileKind::File.to_disk()), Some(FileKind::File));
        assert_eq!(FileKind::from_disk(FileKind::Folder.to_disk()), Some(FileKind::Folder));
        assert_eq!(FileKind::from_disk(0), None);
        assert_eq!(FileKind::from_disk(7), None);
    }
}

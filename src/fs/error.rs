use std::collections::TryReserveError;

use thiserror::Error;

use super::FileKind;

pub type Result<T> = std::result::Result<T, FsError>;

/// numeric codes reported to callers that only understand integers
pub mod code {
    pub const GENERIC: i32 = -1;
    pub const INVALID_NAME: i32 = -2;
    /// kept for callers, `&[u8]` content can't be null
    pub const NULL_CONTENT: i32 = -3;
    pub const DUPLICATE_NAME: i32 = -4;
    pub const DIRECTORY_NOT_EMPTY: i32 = -5;
    pub const RECORD_TOO_LARGE: i32 = -6;
    pub const SUPERBLOCK_TOO_LARGE: i32 = -7;
    pub const BAD_SIGNATURE: i32 = -8;
}

#[derive(Debug, Error)]
pub enum FsError {
    #[error("invalid name {0:?}")]
    InvalidName(String),
    #[error("a {kind} named {name:?} already exists")]
    DuplicateName { name: String, kind: FileKind },
    #[error("no such entry: {0:?}")]
    NotFound(String),
    #[error("not a folder")]
    NotAFolder,
    #[error("not a file")]
    NotAFile,
    #[error("directory {0:?} is not empty")]
    DirectoryNotEmpty(String),
    #[error("record of {len} bytes does not fit in {space} bytes")]
    RecordTooLarge { len: usize, space: usize },
    #[error("superblock of {0} bytes does not fit in a sector")]
    SuperblockTooLarge(usize),
    #[error("bad filesystem signature {found:#010x}")]
    BadSignature { found: u32 },
    #[error("inode {0} is corrupt")]
    CorruptInode(u32),
    #[error("filesystem is not mounted")]
    NotMounted,
    #[error("out of memory")]
    OutOfMemory,
    #[error("sector I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl From<TryReserveError> for FsError {
    fn from(_: TryReserveError) -> Self {
        FsError::OutOfMemory
    }
}

impl FsError {
    /// the negative code of this error
    pub fn code(&self) -> i32 {
        match self {
            FsError::InvalidName(_) => code::INVALID_NAME,
            FsError::DuplicateName { .. } => code::DUPLICATE_NAME,
            FsError::DirectoryNotEmpty(_) => code::DIRECTORY_NOT_EMPTY,
            FsError::RecordTooLarge { .. } => code::RECORD_TOO_LARGE,
            FsError::SuperblockTooLarge(_) => code::SUPERBLOCK_TOO_LARGE,
            FsError::BadSignature { .. } => code::BAD_SIGNATURE,
            _ => code::GENERIC,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(FsError::InvalidName(String::new()).code(), -2);
        assert_eq!(
            FsError::DuplicateName {
                name: "a".into(),
                kind: FileKind::File
            }
            .code(),
            -4
        );
        assert_eq!(FsError::DirectoryNotEmpty("docs".into()).code(), -5);
        assert_eq!(FsError::BadSignature { found: 0 }.code(), -8);
        assert_eq!(FsError::NotFound("x".into()).code(), code::GENERIC);
        assert_eq!(FsError::OutOfMemory.code(), code::GENERIC);
    }

    #[test]
    fn test_error_messages() {
        let err = FsError::DuplicateName {
            name: "a.txt".into(),
            kind: FileKind::File,
        };
        assert_eq!(err.to_string(), "a file named \"a.txt\" already exists");
        assert_eq!(
            FsError::BadSignature { found: 0x1234 }.to_string(),
            "bad filesystem signature 0x00001234"
        );
    }
}

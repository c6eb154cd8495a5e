use core::fmt;

use block_dev::DiskError;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// 卷本身出错，启动时遇到即为致命错误
    Volume(VolumeError),
    /// 没有空闲的 inode 或数据块
    AllocationExhausted,
    NotFound,
    AlreadyExists,
    NotADirectory,
    IsADirectory,
    DirectoryNotEmpty,
    RootProtected,
    BufferTooSmall { required: usize },
    TooManyOpenFiles,
    FileInUse,
    InvalidHandle,
    /// 非绝对路径，或含有空项、`.`、`..`
    InvalidPath,
    NameTooLong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeError {
    Disk(DiskError),
    BadMagic(u32),
    IndexOutOfRange(usize),
    UnknownInodeKind(u32),
}

impl From<DiskError> for Error {
    #[inline]
    fn from(err: DiskError) -> Self {
        Self::Volume(VolumeError::Disk(err))
    }
}

impl From<VolumeError> for Error {
    #[inline]
    fn from(err: VolumeError) -> Self {
        Self::Volume(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Volume(err) => write!(f, "volume error: {err}"),
            Self::AllocationExhausted => f.write_str("no free inode or data block"),
            Self::NotFound => f.write_str("path not found"),
            Self::AlreadyExists => f.write_str("name already exists"),
            Self::NotADirectory => f.write_str("not a directory"),
            Self::IsADirectory => f.write_str("is a directory"),
            Self::DirectoryNotEmpty => f.write_str("directory not empty"),
            Self::RootProtected => f.write_str("the root directory cannot be removed"),
            Self::BufferTooSmall { required } => {
                write!(f, "buffer too small, {required} bytes required")
            }
            Self::TooManyOpenFiles => f.write_str("too many open files"),
            Self::FileInUse => f.write_str("file is open"),
            Self::InvalidHandle => f.write_str("invalid file handle"),
            Self::InvalidPath => f.write_str("invalid path"),
            Self::NameTooLong => f.write_str("name too long"),
        }
    }
}

impl fmt::Display for VolumeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disk(err) => write!(f, "{err}"),
            Self::BadMagic(magic) => write!(f, "unknown magic number {magic:#x}"),
            Self::IndexOutOfRange(index) => write!(f, "index {index} out of range"),
            Self::UnknownInodeKind(kind) => write!(f, "unknown inode kind {kind}"),
        }
    }
}

impl core::error::Error for Error {}
impl core::error::Error for VolumeError {}

//! # 打开文件表
//!
//! 进程内的短期状态，不落盘。同一 inode 可被多个句柄同时打开，
//! 每个句柄有各自的读写游标。

use crate::{Error, MAX_OPEN_FILES, Result};

/// 文件句柄：打开文件表内的下标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Fd(usize);

#[derive(Debug, Clone, Copy)]
pub struct OpenFile {
    pub inode_id: u32,
    /// **文件**内的偏移量
    pub offset: usize,
}

#[derive(Debug)]
pub struct FdTable {
    files: [Option<OpenFile>; MAX_OPEN_FILES],
}

impl FdTable {
    #[inline]
    pub const fn new() -> Self {
        Self {
            files: [None; MAX_OPEN_FILES],
        }
    }

    /// 占用编号最小的空闲句柄，游标置零
    pub fn open(&mut self, inode_id: u32) -> Result<Fd> {
        let Some((index, file)) = self
            .files
            .iter_mut()
            .enumerate()
            .find(|(_, file)| file.is_none())
        else {
            log::warn!("open file table is full");
            return Err(Error::TooManyOpenFiles);
        };

        *file = Some(OpenFile {
            inode_id,
            offset: 0,
        });
        Ok(Fd(index))
    }

    pub fn close(&mut self, fd: Fd) -> Result<()> {
        self.get(fd)?;
        self.files[fd.0] = None;
        Ok(())
    }

    pub fn get(&self, fd: Fd) -> Result<&OpenFile> {
        self.files
            .get(fd.0)
            .and_then(Option::as_ref)
            .ok_or(Error::InvalidHandle)
    }

    pub fn get_mut(&mut self, fd: Fd) -> Result<&mut OpenFile> {
        self.files
            .get_mut(fd.0)
            .and_then(Option::as_mut)
            .ok_or(Error::InvalidHandle)
    }

    /// 是否有句柄引用了该 inode
    pub fn is_open(&self, inode_id: u32) -> bool {
        self.files
            .iter()
            .flatten()
            .any(|file| file.inode_id == inode_id)
    }

    /// 关闭全部句柄
    #[inline]
    pub fn clear(&mut self) {
        self.files.fill(None);
    }
}

impl Default for FdTable {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_and_reuse() {
        let mut table = FdTable::new();
        for expected in 0..MAX_OPEN_FILES {
            assert_eq!(table.open(1), Ok(Fd(expected)));
        }
        assert_eq!(table.open(1), Err(Error::TooManyOpenFiles));

        table.close(Fd(42)).unwrap();
        assert_eq!(table.open(2), Ok(Fd(42)));
    }

    #[test]
    fn closed_handles_are_invalid() {
        let mut table = FdTable::new();
        let fd = table.open(5).unwrap();
        assert!(table.is_open(5));

        table.get_mut(fd).unwrap().offset = 77;
        assert_eq!(table.get(fd).unwrap().offset, 77);

        table.close(fd).unwrap();
        assert!(!table.is_open(5));
        assert_eq!(table.close(fd), Err(Error::InvalidHandle));
        assert_eq!(table.get(Fd(MAX_OPEN_FILES)).err(), Some(Error::InvalidHandle));
    }
}

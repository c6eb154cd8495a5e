//! # 目录编解码
//!
//! 目录与文件一样通过数据块存放内容，内容被视作紧密排列的 [`DirEntry`] 数组。
//! 这里操作的是目录全部已分配块的内存副本；改动由调用者按槽位写回。
//!
//! 删除只留下墓碑，从不压缩；下一次追加时优先复用墓碑。

use alloc::vec::Vec;

use crate::layout::DirEntry;
use crate::{Error, Result, SECTOR_SIZE};

#[derive(Debug)]
pub struct Directory {
    content: Vec<u8>,
}

impl Directory {
    #[inline]
    pub fn new(content: Vec<u8>) -> Self {
        Self { content }
    }

    /// 完整的槽位数，跨越块边界的槽位也算在内
    #[inline]
    pub fn slots(&self) -> usize {
        self.content.len() / DirEntry::SIZE
    }

    pub fn entry(&self, slot: usize) -> DirEntry {
        DirEntry::from_bytes(self.slot_bytes(slot))
    }

    #[inline]
    pub fn slot_bytes(&self, slot: usize) -> &[u8] {
        &self.content[slot * DirEntry::SIZE..(slot + 1) * DirEntry::SIZE]
    }

    /// 按槽位顺序列出存活的目录项
    pub fn entries(&self) -> impl Iterator<Item = (usize, DirEntry)> + '_ {
        (0..self.slots())
            .map(|slot| (slot, self.entry(slot)))
            .filter(|(_, dir_entry)| !dir_entry.is_free())
    }

    /// 在目录下通过名字获取目录项的inode ID
    pub fn lookup(&self, name: &str) -> Option<u32> {
        self.entries().find_map(|(_, dir_entry)| {
            (dir_entry.name() == name).then_some(dir_entry.inode_id())
        })
    }

    /// 第一个墓碑或从未使用过的槽位
    pub fn free_slot(&self) -> Option<usize> {
        (0..self.slots()).find(|&slot| self.entry(slot).is_free())
    }

    /// 所有槽位都被占用，追加前须先为目录挂上新块
    #[inline]
    pub fn is_full(&self) -> bool {
        self.free_slot().is_none()
    }

    /// 目录新挂上一个(已清零的)块
    #[inline]
    pub fn grow(&mut self) {
        self.content.resize(self.content.len() + SECTOR_SIZE, 0);
    }

    /// 写入新目录项，返回所用槽位
    pub fn append(&mut self, name: &str, inode_id: u32) -> Result<usize> {
        if self.lookup(name).is_some() {
            return Err(Error::AlreadyExists);
        }
        let slot = self.free_slot().ok_or(Error::AllocationExhausted)?;
        let dir_entry = DirEntry::new(name, inode_id);
        self.content[slot * DirEntry::SIZE..(slot + 1) * DirEntry::SIZE]
            .copy_from_slice(dir_entry.as_bytes());
        Ok(slot)
    }

    /// 通过名字删除目录项，返回 (槽位, inode ID)
    pub fn remove(&mut self, name: &str) -> Option<(usize, u32)> {
        let (slot, dir_entry) = self
            .entries()
            .find(|(_, dir_entry)| dir_entry.name() == name)?;
        self.content[slot * DirEntry::SIZE..(slot + 1) * DirEntry::SIZE].fill(0);
        Some((slot, dir_entry.inode_id()))
    }
}

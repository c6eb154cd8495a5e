//! 只有直接索引的 inode
//!
//! 目录的空间用于存放子项的元信息；
//! 文件的空间用于存放它的数据。
//!
//! 已分配的块总是占据 `direct` 的前缀，其余槽位为 [`UNUSED`]。

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::{mem, ptr, slice};

use block_dev::BlockDevice;

use crate::{
    DATA_AREA_START, DIRECT_COUNT, DataBlock, Error, Result, SECTOR_SIZE, VolumeError,
};

pub const INODE_SIZE: usize = mem::size_of::<DiskInode>();
pub const INODES_PER_SECTOR: usize = SECTOR_SIZE / INODE_SIZE;

/// 未使用的直接索引
const UNUSED: u32 = u32::MAX;

#[derive(Debug, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct DiskInode {
    /// 类型，见 [`DiskInodeKind`]
    kind: u32,
    // 不用usize是为了严控布局
    pub size: u32,
    /// 直接索引块，存放数据区内的块编号，
    /// 存储容量：DIRECT_COUNT * SECTOR_SIZE 字节
    direct: [u32; DIRECT_COUNT],
}

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub enum DiskInodeKind {
    #[default]
    File,
    Directory,
}

impl DiskInode {
    #[inline]
    pub fn new(kind: DiskInodeKind) -> Self {
        Self {
            kind: kind.into(),
            size: 0,
            direct: [UNUSED; DIRECT_COUNT],
        }
    }

    pub fn kind(&self) -> Result<DiskInodeKind> {
        DiskInodeKind::try_from(self.kind)
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind == u32::from(DiskInodeKind::Directory)
    }

    /// 已分配的数据块
    pub fn blocks(&self) -> &[u32] {
        &self.direct[..self.block_count()]
    }

    #[inline]
    pub fn block_count(&self) -> usize {
        self.direct
            .iter()
            .position(|&block| block == UNUSED)
            .unwrap_or(DIRECT_COUNT)
    }

    /// 已分配的块所能容纳的字节数
    #[inline]
    pub fn capacity(&self) -> usize {
        self.block_count() * SECTOR_SIZE
    }

    /// 在块列表末尾挂上一个新块，直接索引用尽则失败
    pub fn push_block(&mut self, block: u32) -> Result<()> {
        let index = self.block_count();
        let slot = self
            .direct
            .get_mut(index)
            .ok_or(Error::AllocationExhausted)?;
        *slot = block;
        Ok(())
    }

    /// 清空 inode，返回其原先占用的数据块
    pub fn clear(&mut self) -> Vec<u32> {
        let blocks = self.blocks().to_vec();
        self.size = 0;
        self.direct.fill(UNUSED);
        blocks
    }

    /// 从指定位置(字节偏移)读出数据填充`buf`，不越过文件末尾
    pub fn read_at(
        &self,
        offset: usize,
        buf: &mut [u8],
        block_device: &Arc<dyn BlockDevice>,
    ) -> Result<usize> {
        self.read_range(offset, buf, self.size as usize, block_device)
    }

    /// 与 [`DiskInode::read_at`] 相同，但以已分配块的末尾为界
    pub fn read_extent(
        &self,
        offset: usize,
        buf: &mut [u8],
        block_device: &Arc<dyn BlockDevice>,
    ) -> Result<usize> {
        self.read_range(offset, buf, self.capacity(), block_device)
    }

    /// 写入已分配的块中，不改变 `size`；需要的块须事先挂上
    pub fn write_at(
        &self,
        offset: usize,
        buf: &[u8],
        block_device: &Arc<dyn BlockDevice>,
    ) -> Result<usize> {
        let mut start = offset;
        let end = start.saturating_add(buf.len()).min(self.capacity());

        if start >= end {
            return Ok(0);
        }

        let mut data_block: DataBlock = [0; SECTOR_SIZE];
        let mut written_size = 0;
        loop {
            let block_index = start / SECTOR_SIZE;
            let current_block_end = ((block_index + 1) * SECTOR_SIZE).min(end);
            let block_write_size = current_block_end - start;
            let sector = self.sector(block_index);

            // 不足整块时须保留块内的其余字节
            if block_write_size < SECTOR_SIZE {
                block_device.read_block(sector, &mut data_block)?;
            }
            let inoffset = start % SECTOR_SIZE;
            data_block[inoffset..inoffset + block_write_size]
                .copy_from_slice(&buf[written_size..written_size + block_write_size]);
            block_device.write_block(sector, &data_block)?;

            written_size += block_write_size;

            if current_block_end == end {
                break;
            }

            start = current_block_end;
        }

        Ok(written_size)
    }

    /// 计算容纳指定数据量需要多少个**数据块**
    #[inline]
    pub fn count_data_block(size: usize) -> usize {
        size.div_ceil(SECTOR_SIZE)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(ptr::from_ref(self).cast(), INODE_SIZE) }
    }

    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        unsafe { slice::from_raw_parts_mut(ptr::from_mut(self).cast(), INODE_SIZE) }
    }
}

impl DiskInode {
    /// 逻辑块索引 -> 扇区号
    #[inline]
    fn sector(&self, block_index: usize) -> usize {
        DATA_AREA_START + self.direct[block_index] as usize
    }

    fn read_range(
        &self,
        offset: usize,
        buf: &mut [u8],
        limit: usize,
        block_device: &Arc<dyn BlockDevice>,
    ) -> Result<usize> {
        let mut start = offset;
        let end = start.saturating_add(buf.len()).min(limit);

        if start >= end {
            return Ok(0);
        }

        let mut data_block: DataBlock = [0; SECTOR_SIZE];
        // 已读取多少字节
        let mut read_size = 0;
        loop {
            let block_index = start / SECTOR_SIZE;
            // 当前块的末地址(字节)
            let current_block_end = ((block_index + 1) * SECTOR_SIZE).min(end);
            let block_read_size = current_block_end - start;

            block_device.read_block(self.sector(block_index), &mut data_block)?;
            // 绝对地址 % 块大小 = 块内偏移
            let inoffset = start % SECTOR_SIZE;
            buf[read_size..read_size + block_read_size]
                .copy_from_slice(&data_block[inoffset..inoffset + block_read_size]);

            read_size += block_read_size;

            if current_block_end == end {
                break;
            }

            start = current_block_end;
        }

        Ok(read_size)
    }
}

impl Default for DiskInode {
    #[inline]
    fn default() -> Self {
        Self::new(DiskInodeKind::File)
    }
}

impl From<DiskInodeKind> for u32 {
    #[inline]
    fn from(kind: DiskInodeKind) -> Self {
        match kind {
            DiskInodeKind::File => 0,
            DiskInodeKind::Directory => 1,
        }
    }
}

impl TryFrom<u32> for DiskInodeKind {
    type Error = Error;

    fn try_from(raw: u32) -> Result<Self> {
        match raw {
            0 => Ok(Self::File),
            1 => Ok(Self::Directory),
            raw => Err(VolumeError::UnknownInodeKind(raw).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_records_per_sector() {
        assert_eq!(INODE_SIZE, 128);
        assert_eq!(INODES_PER_SECTOR, 4);
    }

    #[test]
    fn fresh_inode_has_no_blocks() {
        let disk_inode = DiskInode::new(DiskInodeKind::Directory);
        assert!(disk_inode.is_dir());
        assert_eq!(disk_inode.size, 0);
        assert_eq!(disk_inode.block_count(), 0);
        assert_eq!(disk_inode.kind(), Ok(DiskInodeKind::Directory));
    }

    #[test]
    fn block_list_is_bounded() {
        let mut disk_inode = DiskInode::new(DiskInodeKind::File);
        for block in 0..DIRECT_COUNT as u32 {
            disk_inode.push_block(block + 100).unwrap();
        }
        assert_eq!(disk_inode.push_block(7), Err(Error::AllocationExhausted));
        assert_eq!(disk_inode.capacity(), DIRECT_COUNT * SECTOR_SIZE);

        disk_inode.size = 1000;
        let blocks = disk_inode.clear();
        assert_eq!(blocks.len(), DIRECT_COUNT);
        assert_eq!(blocks[0], 100);
        assert_eq!(disk_inode.size, 0);
        assert!(disk_inode.blocks().is_empty());
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let mut disk_inode = DiskInode::default();
        disk_inode.as_bytes_mut()[..4].copy_from_slice(&7u32.to_ne_bytes());
        assert_eq!(
            disk_inode.kind(),
            Err(Error::Volume(VolumeError::UnknownInodeKind(7)))
        );
    }

    #[test]
    fn count_data_block_rounds_up() {
        assert_eq!(DiskInode::count_data_block(0), 0);
        assert_eq!(DiskInode::count_data_block(1), 1);
        assert_eq!(DiskInode::count_data_block(SECTOR_SIZE), 1);
        assert_eq!(DiskInode::count_data_block(SECTOR_SIZE + 1), 2);
    }
}

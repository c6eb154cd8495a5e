//! # 卷管理层
//!
//! 构建出磁盘的布局并使用：格式化、启动、同步，
//! 以及 inode 与数据块的分配、inode 表的读写。
//!
//! 两张位图常驻内存，只有同步时才写回磁盘；
//! 其余读写都直接落到块设备上，没有缓存。

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use block_dev::{BlockDevice, Image};

use crate::fd_table::FdTable;
use crate::layout::*;
use crate::{
    DATA_AREA_START, DATA_BITMAP_START, DATA_BLOCKS, DataBlock, Error, INODE_AREA_START,
    INODE_BITMAP_START, MAX_INODES, ROOT_INODE, Result, SECTOR_SIZE, VolumeError,
};

#[derive(Debug)]
pub struct MiniFileSystem {
    pub(crate) block_device: Arc<dyn BlockDevice>,
    inode_bitmap: Bitmap,
    data_bitmap: Bitmap,
    pub(crate) fd_table: FdTable,
    /// 同步时镜像写回的位置
    image_path: String,
}

/// 卷的占用情况
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub inodes_used: usize,
    pub inodes_total: usize,
    pub blocks_used: usize,
    pub blocks_total: usize,
}

/// 一次操作中已占用的位，操作失败时归还
#[derive(Debug, Default)]
pub(crate) struct Reservation {
    inodes: Vec<u32>,
    blocks: Vec<u32>,
}

impl MiniFileSystem {
    /// 载入 `path` 处的镜像；镜像不存在时就地格式化。
    ///
    /// 超级块魔数不符是致命错误，卷无法挂载。
    pub fn boot(block_device: Arc<dyn BlockDevice>, path: &str) -> Result<Self> {
        log::info!("booting volume {path:?}");
        block_device.init()?;

        let mut mfs = Self {
            block_device,
            inode_bitmap: Bitmap::new(INODE_BITMAP_START, MAX_INODES),
            data_bitmap: Bitmap::new(DATA_BITMAP_START, DATA_BLOCKS),
            fd_table: FdTable::new(),
            image_path: String::from(path),
        };

        if mfs.block_device.load(path)? == Image::NotFound {
            log::info!("no image at {path:?}, formatting a new volume");
            mfs.mkfs()?;
            mfs.save_bitmaps()?;
        }

        let mut super_block = SuperBlock::zeroed();
        mfs.block_device.read_block(0, super_block.as_bytes_mut())?;
        if !super_block.is_valid() {
            log::error!("bad magic number {:#x} in {path:?}", super_block.magic());
            return Err(VolumeError::BadMagic(super_block.magic()).into());
        }

        mfs.inode_bitmap.load(&mfs.block_device)?;
        mfs.data_bitmap.load(&mfs.block_device)?;
        mfs.sync()?;

        Ok(mfs)
    }

    /// 重新格式化已挂载的卷，所有句柄随之关闭
    pub fn format(&mut self) -> Result<()> {
        log::info!("formatting volume {:?}", self.image_path);
        self.fd_table.clear();
        self.mkfs()?;
        self.save_bitmaps()
    }

    /// 写回位图并保存整个镜像：唯一的持久化时机
    pub fn sync(&mut self) -> Result<()> {
        log::info!("syncing volume {:?}", self.image_path);
        self.save_bitmaps()?;
        self.block_device.save(&self.image_path)?;
        Ok(())
    }

    pub fn usage(&self) -> Usage {
        Usage {
            inodes_used: self.inode_bitmap.count(),
            inodes_total: self.inode_bitmap.capacity(),
            blocks_used: self.data_bitmap.count(),
            blocks_total: self.data_bitmap.capacity(),
        }
    }
}

impl MiniFileSystem {
    /// 写入超级块，清空位图并建立根目录
    fn mkfs(&mut self) -> Result<()> {
        self.block_device
            .write_block(0, SuperBlock::new().as_bytes())?;

        self.inode_bitmap.clear();
        self.data_bitmap.clear();

        let root_inode_id = self.alloc_inode()?;
        debug_assert_eq!(root_inode_id, ROOT_INODE);
        let mut root_inode = DiskInode::new(DiskInodeKind::Directory);
        root_inode.push_block(self.alloc_data()?)?;
        self.write_inode(ROOT_INODE, &root_inode)
    }

    fn save_bitmaps(&self) -> Result<()> {
        self.inode_bitmap.save(&self.block_device)?;
        self.data_bitmap.save(&self.block_device)
    }

    /// 分配新的 inode 并返回其ID
    pub(crate) fn alloc_inode(&mut self) -> Result<u32> {
        let inode_id = self.inode_bitmap.alloc().inspect_err(|_| {
            log::warn!("out of inodes");
        })?;
        log::debug!("allocated inode {inode_id}");
        Ok(inode_id)
    }

    pub(crate) fn dealloc_inode(&mut self, inode_id: u32) -> Result<()> {
        if inode_id == ROOT_INODE {
            return Err(Error::RootProtected);
        }
        log::debug!("freed inode {inode_id}");
        self.inode_bitmap.dealloc(inode_id)
    }

    /// 分配新的数据块并返回其ID(数据区内的编号)，块内容被清零
    pub(crate) fn alloc_data(&mut self) -> Result<u32> {
        let block = self.data_bitmap.alloc().inspect_err(|_| {
            log::warn!("out of data blocks");
        })?;
        if let Err(err) = self.zero_block(block) {
            self.data_bitmap.set(block as usize, false)?;
            return Err(err);
        }
        log::debug!("allocated data block {block}");
        Ok(block)
    }

    pub(crate) fn dealloc_data(&mut self, block: u32) -> Result<()> {
        self.zero_block(block)?;
        log::debug!("freed data block {block}");
        self.data_bitmap.dealloc(block)
    }

    /// 释放 inode 及其全部数据块，并把清空后的记录写回
    pub(crate) fn release_inode(&mut self, inode_id: u32, disk_inode: &mut DiskInode) -> Result<()> {
        if inode_id == ROOT_INODE {
            return Err(Error::RootProtected);
        }
        for block in disk_inode.clear() {
            self.dealloc_data(block)?;
        }
        self.write_inode(inode_id, disk_inode)?;
        self.dealloc_inode(inode_id)
    }

    pub(crate) fn reserve_inode(&mut self, reservation: &mut Reservation) -> Result<u32> {
        let inode_id = self.alloc_inode()?;
        reservation.inodes.push(inode_id);
        Ok(inode_id)
    }

    pub(crate) fn reserve_data(&mut self, reservation: &mut Reservation) -> Result<u32> {
        let block = self.alloc_data()?;
        reservation.blocks.push(block);
        Ok(block)
    }

    /// 归还失败操作占用的位
    pub(crate) fn rollback(&mut self, reservation: Reservation) {
        log::debug!("rolling back {reservation:?}");
        for inode_id in reservation.inodes {
            if let Err(err) = self.inode_bitmap.set(inode_id as usize, false) {
                log::error!("failed to release inode {inode_id}: {err}");
            }
        }
        for block in reservation.blocks {
            if let Err(err) = self.data_bitmap.set(block as usize, false) {
                log::error!("failed to release data block {block}: {err}");
            }
        }
    }

    /// 通过ID获取 inode 在磁盘上的位置：**扇区号**以及**扇区内偏移**
    pub(crate) fn disk_inode_pos(inode_id: u32) -> Result<(usize, usize)> {
        let index = inode_id as usize;
        if index >= MAX_INODES {
            return Err(VolumeError::IndexOutOfRange(index).into());
        }
        let sector = INODE_AREA_START + index / INODES_PER_SECTOR;
        let inoffset = index % INODES_PER_SECTOR * INODE_SIZE;

        Ok((sector, inoffset))
    }

    pub(crate) fn read_inode(&self, inode_id: u32) -> Result<DiskInode> {
        let (sector_id, inoffset) = Self::disk_inode_pos(inode_id)?;
        let mut sector: DataBlock = [0; SECTOR_SIZE];
        self.block_device.read_block(sector_id, &mut sector)?;

        let mut disk_inode = DiskInode::default();
        disk_inode
            .as_bytes_mut()
            .copy_from_slice(&sector[inoffset..inoffset + INODE_SIZE]);
        Ok(disk_inode)
    }

    /// 读出整个扇区，只改动目标记录后写回，同一扇区内的其它 inode 保持不变
    pub(crate) fn write_inode(&self, inode_id: u32, disk_inode: &DiskInode) -> Result<()> {
        let (sector_id, inoffset) = Self::disk_inode_pos(inode_id)?;
        let mut sector: DataBlock = [0; SECTOR_SIZE];
        self.block_device.read_block(sector_id, &mut sector)?;

        sector[inoffset..inoffset + INODE_SIZE].copy_from_slice(disk_inode.as_bytes());
        self.block_device.write_block(sector_id, &sector)?;
        Ok(())
    }
}

impl MiniFileSystem {
    fn zero_block(&self, block: u32) -> Result<()> {
        self.block_device
            .write_block(DATA_AREA_START + block as usize, &[0; SECTOR_SIZE])?;
        Ok(())
    }
}

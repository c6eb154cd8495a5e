//! # 文件操作层
//!
//! 以绝对路径为参数的目录与文件操作，确立了文件系统的操作逻辑：
//! 从根目录(0号 inode)出发，经由目录项形成文件树。

use alloc::vec;
use alloc::vec::Vec;

use enumflags2::bitflags;

use crate::directory::Directory;
use crate::fd_table::Fd;
use crate::layout::{DirEntry, DiskInode, DiskInodeKind};
use crate::mfs::Reservation;
use crate::{Error, MAX_FILE_SIZE, MiniFileSystem, ROOT_INODE, Result, path};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stat {
    pub inode: u32,
    pub kind: StatKind,
    /// 文件为字节数；目录为存活目录项的总字节数
    pub size: usize,
    /// 占用的数据块数
    pub blocks: usize,
}

#[allow(clippy::upper_case_acronyms)]
#[bitflags]
#[repr(u32)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatKind {
    DIR = 0o040000,
    #[default]
    FILE = 0o100000,
}

impl MiniFileSystem {
    /// 路径 -> inode 编号
    ///
    /// 根目录直接得到 0 号 inode；其余各级名字须在当前**目录**中查到。
    pub fn resolve(&self, path: &str) -> Result<u32> {
        let mut inode_id = ROOT_INODE;
        for cmp in path::components(path)? {
            let disk_inode = self.read_inode(inode_id)?;
            if disk_inode.kind()? != DiskInodeKind::Directory {
                log::debug!("{cmp:?} looked up under a file in {path:?}");
                return Err(Error::NotADirectory);
            }
            inode_id = self.load_dir(&disk_inode)?.lookup(cmp).ok_or_else(|| {
                log::debug!("{cmp:?} of {path:?} not found");
                Error::NotFound
            })?;
        }

        log::debug!("resolved {path:?} to inode {inode_id}");
        Ok(inode_id)
    }

    pub fn mkdir(&mut self, path: &str) -> Result<u32> {
        self.create(path, DiskInodeKind::Directory)
    }

    pub fn create_file(&mut self, path: &str) -> Result<u32> {
        self.create(path, DiskInodeKind::File)
    }

    /// 目录大小：存活目录项的总字节数
    pub fn dir_size(&self, path: &str) -> Result<usize> {
        let (_, disk_inode) = self.dir_inode(path)?;
        Ok(disk_inode.size as usize)
    }

    /// 把目录的存活目录项按槽位顺序紧密复制到`buf`，返回目录项个数。
    ///
    /// `buf` 容不下整个目录时失败，不做截断。
    pub fn dir_read(&self, path: &str, buf: &mut [u8]) -> Result<usize> {
        let (_, disk_inode) = self.dir_inode(path)?;
        let size = disk_inode.size as usize;
        if buf.len() < size {
            return Err(Error::BufferTooSmall { required: size });
        }

        let dir = self.load_dir(&disk_inode)?;
        let mut count = 0;
        for ((_, dir_entry), dest) in dir
            .entries()
            .zip(buf[..size].chunks_exact_mut(DirEntry::SIZE))
        {
            dest.copy_from_slice(dir_entry.as_bytes());
            count += 1;
        }

        Ok(count)
    }

    /// 与 [`MiniFileSystem::dir_read`] 顺序相同的目录项列表
    pub fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let (_, disk_inode) = self.dir_inode(path)?;
        let dir = self.load_dir(&disk_inode)?;
        Ok(dir.entries().map(|(_, dir_entry)| dir_entry).collect())
    }

    /// 删除空目录
    pub fn rmdir(&mut self, path: &str) -> Result<()> {
        if path::is_root(path)? {
            log::warn!("refusing to remove the root directory");
            return Err(Error::RootProtected);
        }

        let (parent, name) = path::parent_file(path)?;
        let (parent_id, mut parent_inode, mut dir) = self.parent_dir(parent)?;
        let inode_id = dir.lookup(name).ok_or(Error::NotFound)?;
        let mut disk_inode = self.read_inode(inode_id)?;

        if disk_inode.kind()? != DiskInodeKind::Directory {
            return Err(Error::NotADirectory);
        }
        if disk_inode.size != 0 {
            return Err(Error::DirectoryNotEmpty);
        }

        self.release_inode(inode_id, &mut disk_inode)?;
        self.remove_entry(parent_id, &mut parent_inode, &mut dir, name)
    }

    /// 删除文件；仍被句柄引用的文件不可删除
    pub fn unlink(&mut self, path: &str) -> Result<()> {
        if path::is_root(path)? {
            return Err(Error::RootProtected);
        }

        let (parent, name) = path::parent_file(path)?;
        let (parent_id, mut parent_inode, mut dir) = self.parent_dir(parent)?;
        let inode_id = dir.lookup(name).ok_or(Error::NotFound)?;
        let mut disk_inode = self.read_inode(inode_id)?;

        if disk_inode.kind()? == DiskInodeKind::Directory {
            return Err(Error::IsADirectory);
        }
        if self.fd_table.is_open(inode_id) {
            log::warn!("{path:?} is still open");
            return Err(Error::FileInUse);
        }

        self.release_inode(inode_id, &mut disk_inode)?;
        self.remove_entry(parent_id, &mut parent_inode, &mut dir, name)
    }

    pub fn open(&mut self, path: &str) -> Result<Fd> {
        let inode_id = self.resolve(path)?;
        if self.read_inode(inode_id)?.kind()? == DiskInodeKind::Directory {
            return Err(Error::IsADirectory);
        }

        let fd = self.fd_table.open(inode_id)?;
        log::debug!("opened {path:?} as {fd:?}");
        Ok(fd)
    }

    #[inline]
    pub fn close(&mut self, fd: Fd) -> Result<()> {
        self.fd_table.close(fd)
    }

    /// 从游标处读出至多`buf.len()`字节，游标前进实际读出的字节数。
    ///
    /// 在文件末尾或之后读，得到 0 字节。
    pub fn read(&mut self, fd: Fd, buf: &mut [u8]) -> Result<usize> {
        let file = *self.fd_table.get(fd)?;
        let disk_inode = self.read_inode(file.inode_id)?;
        let read_size = disk_inode.read_at(file.offset, buf, &self.block_device)?;

        self.fd_table.get_mut(fd)?.offset += read_size;
        Ok(read_size)
    }

    /// 从游标处写入`buf`，必要时扩大文件并分配新块。
    ///
    /// 写入超出单个文件的容量，或数据块耗尽时整体失败，文件保持原样。
    pub fn write(&mut self, fd: Fd, buf: &[u8]) -> Result<usize> {
        let file = *self.fd_table.get(fd)?;
        if buf.is_empty() {
            return Ok(0);
        }

        let end = file
            .offset
            .checked_add(buf.len())
            .filter(|&end| end <= MAX_FILE_SIZE)
            .ok_or_else(|| {
                log::warn!("write beyond the {MAX_FILE_SIZE} bytes a file can hold");
                Error::AllocationExhausted
            })?;

        let mut disk_inode = self.read_inode(file.inode_id)?;
        let mut reservation = Reservation::default();
        let written_size = match self
            .expand_to(end, &mut disk_inode, &mut reservation)
            .and_then(|()| disk_inode.write_at(file.offset, buf, &self.block_device))
        {
            Ok(written_size) => written_size,
            Err(err) => {
                self.rollback(reservation);
                return Err(err);
            }
        };
        disk_inode.size = disk_inode.size.max(end as u32);
        self.write_inode(file.inode_id, &disk_inode)?;

        self.fd_table.get_mut(fd)?.offset = end;
        Ok(written_size)
    }

    /// 游标可越过文件末尾，之后的写入会扩大文件，空洞读出为 0
    pub fn seek(&mut self, fd: Fd, offset: usize) -> Result<()> {
        self.fd_table.get_mut(fd)?.offset = offset;
        Ok(())
    }

    pub fn stat(&self, path: &str) -> Result<Stat> {
        let inode_id = self.resolve(path)?;
        let disk_inode = self.read_inode(inode_id)?;
        let kind = match disk_inode.kind()? {
            DiskInodeKind::Directory => StatKind::DIR,
            DiskInodeKind::File => StatKind::FILE,
        };

        Ok(Stat {
            inode: inode_id,
            kind,
            size: disk_inode.size as usize,
            blocks: disk_inode.block_count(),
        })
    }
}

impl MiniFileSystem {
    /// 读出目录全部已分配块的内容
    fn load_dir(&self, disk_inode: &DiskInode) -> Result<Directory> {
        let mut content = vec![0; disk_inode.capacity()];
        disk_inode.read_extent(0, &mut content, &self.block_device)?;
        Ok(Directory::new(content))
    }

    fn dir_inode(&self, path: &str) -> Result<(u32, DiskInode)> {
        let inode_id = self.resolve(path)?;
        let disk_inode = self.read_inode(inode_id)?;
        if disk_inode.kind()? != DiskInodeKind::Directory {
            return Err(Error::NotADirectory);
        }
        Ok((inode_id, disk_inode))
    }

    fn parent_dir(&self, parent: &str) -> Result<(u32, DiskInode, Directory)> {
        let (parent_id, parent_inode) = self.dir_inode(parent)?;
        let dir = self.load_dir(&parent_inode)?;
        Ok((parent_id, parent_inode, dir))
    }

    /// 在父目录下创建子 inode
    fn create(&mut self, path: &str, kind: DiskInodeKind) -> Result<u32> {
        if path::is_root(path)? {
            return Err(Error::AlreadyExists);
        }

        let (parent, name) = path::parent_file(path)?;
        path::check_name(name)?;
        let (parent_id, mut parent_inode, mut dir) = self.parent_dir(parent)?;

        // 确认没有已创建的同名项
        if dir.lookup(name).is_some() {
            log::warn!("{path:?} already exists");
            return Err(Error::AlreadyExists);
        }

        let mut reservation = Reservation::default();
        match self.link(
            parent_id,
            &mut parent_inode,
            &mut dir,
            name,
            kind,
            &mut reservation,
        ) {
            Ok(inode_id) => {
                log::debug!("created {kind:?} {path:?} as inode {inode_id}");
                Ok(inode_id)
            }
            Err(err) => {
                self.rollback(reservation);
                Err(err)
            }
        }
    }

    fn link(
        &mut self,
        parent_id: u32,
        parent_inode: &mut DiskInode,
        dir: &mut Directory,
        name: &str,
        kind: DiskInodeKind,
        reservation: &mut Reservation,
    ) -> Result<u32> {
        let inode_id = self.reserve_inode(reservation)?;
        let mut disk_inode = DiskInode::new(kind);
        if kind == DiskInodeKind::Directory {
            disk_inode.push_block(self.reserve_data(reservation)?)?;
        }

        // 没有空槽位，就为父目录挂上新块
        if dir.is_full() {
            parent_inode.push_block(self.reserve_data(reservation)?)?;
            dir.grow();
        }
        let slot = dir.append(name, inode_id)?;
        log::debug!("entry {name:?} goes to slot {slot} of inode {parent_id}");

        self.write_inode(inode_id, &disk_inode)?;
        parent_inode.write_at(
            slot * DirEntry::SIZE,
            dir.slot_bytes(slot),
            &self.block_device,
        )?;
        parent_inode.size += DirEntry::SIZE as u32;
        self.write_inode(parent_id, parent_inode)?;

        Ok(inode_id)
    }

    /// 在父目录中留下墓碑，父目录大小减少一个目录项
    fn remove_entry(
        &mut self,
        parent_id: u32,
        parent_inode: &mut DiskInode,
        dir: &mut Directory,
        name: &str,
    ) -> Result<()> {
        let (slot, _) = dir.remove(name).ok_or(Error::NotFound)?;
        parent_inode.write_at(
            slot * DirEntry::SIZE,
            dir.slot_bytes(slot),
            &self.block_device,
        )?;
        parent_inode.size = parent_inode.size.saturating_sub(DirEntry::SIZE as u32);
        self.write_inode(parent_id, parent_inode)
    }

    /// 为写到`larger_size`挂上缺少的数据块
    fn expand_to(
        &mut self,
        larger_size: usize,
        disk_inode: &mut DiskInode,
        reservation: &mut Reservation,
    ) -> Result<()> {
        let new_blocks =
            DiskInode::count_data_block(larger_size).saturating_sub(disk_inode.block_count());
        for _ in 0..new_blocks {
            disk_inode.push_block(self.reserve_data(reservation)?)?;
        }
        Ok(())
    }
}

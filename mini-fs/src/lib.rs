#![no_std]

extern crate alloc;

/* mini-fs 的整体架构，自上而下 */

// 文件操作层：路径上的创建、删除、读写
mod vfs;

// 打开文件表：句柄与读写游标
mod fd_table;

// 路径解析
mod path;

// 目录编解码：把目录内容视作目录项数组
mod directory;

// 卷管理层：位图、索引节点表与卷的生命周期
mod mfs;

// 磁盘数据结构层
pub mod layout;

mod error;

pub use block_dev::{SECTOR_SIZE, TOTAL_SECTORS};

pub use self::{
    error::{Error, Result, VolumeError},
    fd_table::Fd,
    layout::DirEntry,
    mfs::{MiniFileSystem, Usage},
    vfs::{Stat, StatKind},
};

pub const MAGIC: u32 = 0xCAFEBAFE;

/// 根目录的 inode 编号，永不释放
pub const ROOT_INODE: u32 = 0;

pub const MAX_INODES: usize = 8192;
/// 每个 inode 的直接索引块数
pub const DIRECT_COUNT: usize = 30;
pub const MAX_FILE_SIZE: usize = DIRECT_COUNT * SECTOR_SIZE;
pub const MAX_OPEN_FILES: usize = 255;

const INODE_BITMAP_START: usize = 1;
const DATA_BITMAP_START: usize = 3;
const BITMAP_SECTORS: usize = 2;
const BITMAP_BITS: usize = BITMAP_SECTORS * SECTOR_SIZE * 8;

const INODE_AREA_START: usize = DATA_BITMAP_START + BITMAP_SECTORS;
const INODE_AREA_SECTORS: usize = MAX_INODES / layout::INODES_PER_SECTOR;

pub const DATA_AREA_START: usize = INODE_AREA_START + INODE_AREA_SECTORS;
pub const DATA_BLOCKS: usize = TOTAL_SECTORS - DATA_AREA_START;

const _: () = assert!(MAX_INODES <= BITMAP_BITS && DATA_BLOCKS <= BITMAP_BITS);

type DataBlock = [u8; SECTOR_SIZE];

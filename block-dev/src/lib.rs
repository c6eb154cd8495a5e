//! # 块设备接口层
//!
//! 虚拟磁盘是一个定长的镜像，被切分为 [`TOTAL_SECTORS`] 个大小均为
//! [`SECTOR_SIZE`] 的**扇区**；[`BlockDevice`] 就是对它的抽象，
//! 实现了此特质的类型称为**块设备驱动**。
//!
//! 除了按扇区读写，驱动还负责镜像的生命周期：清零、从宿主文件载入、
//! 保存回宿主文件。文件系统只调用这些接口，从不直接接触宿主文件。

#![no_std]

use core::any::Any;
use core::fmt::{self, Debug};

/// 扇区大小(字节)
pub const SECTOR_SIZE: usize = 512;
/// 镜像所含扇区总数
pub const TOTAL_SECTORS: usize = 10000;

pub type Sector = [u8; SECTOR_SIZE];

/// 载入镜像的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Image {
    /// 宿主文件存在，扇区内容已替换为文件内容
    Found,
    /// 宿主文件不存在，设备保持清零状态
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskError {
    /// 扇区号越界
    SectorOutOfRange(usize),
    /// 缓冲区不是整扇区
    BadBuffer(usize),
    /// 宿主文件大小与镜像不符
    BadImage(u64),
    /// 宿主文件读写失败
    Io,
}

/// 块设备驱动特质
pub trait BlockDevice: Debug + Send + Sync + Any {
    /// 清零所有扇区
    fn init(&self) -> Result<(), DiskError>;
    fn load(&self, path: &str) -> Result<Image, DiskError>;
    fn save(&self, path: &str) -> Result<(), DiskError>;
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), DiskError>;
    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<(), DiskError>;
}

impl fmt::Display for DiskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SectorOutOfRange(id) => write!(f, "sector {id} out of range"),
            Self::BadBuffer(len) => write!(f, "buffer of {len} bytes is not one sector"),
            Self::BadImage(len) => write!(f, "image of {len} bytes has the wrong size"),
            Self::Io => f.write_str("host file I/O failed"),
        }
    }
}

impl core::error::Error for DiskError {}

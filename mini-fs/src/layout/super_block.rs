use core::{ptr, slice};

use crate::{MAGIC, SECTOR_SIZE};

/// 超级块：整整一个扇区，只在末尾存放魔数，用于校验文件系统合法性。
///
/// 格式化时写入一次，启动时读出一次，此后不再改写。
#[derive(Debug)]
#[repr(C)]
pub struct SuperBlock {
    unused: [u8; SECTOR_SIZE - 4],
    magic: u32,
}

impl SuperBlock {
    pub const SIZE: usize = SECTOR_SIZE;

    #[inline]
    pub fn new() -> Self {
        Self {
            unused: [0; SECTOR_SIZE - 4],
            magic: MAGIC,
        }
    }

    /// 全零的超级块，用来接收磁盘上的内容
    #[inline]
    pub fn zeroed() -> Self {
        Self {
            unused: [0; SECTOR_SIZE - 4],
            magic: 0,
        }
    }

    #[inline]
    pub fn magic(&self) -> u32 {
        self.magic
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.magic == MAGIC
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(ptr::from_ref(self).cast(), Self::SIZE) }
    }

    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        unsafe { slice::from_raw_parts_mut(ptr::from_mut(self).cast(), Self::SIZE) }
    }
}

impl Default for SuperBlock {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

use core::{ptr, slice};

/// 文件名最长字节数
pub const NAME_MAX_LEN: usize = 15;

/// 文件系统项的元信息
///
/// inode 编号为 0 或名字为空的目录项是墓碑(空槽位)：
/// 0 号 inode 是根目录，不可能作为子项出现。
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct DirEntry {
    // 最后一字节留给 \0
    name: [u8; NAME_MAX_LEN + 1],
    inode_id: u32,
}

impl DirEntry {
    /// 元信息大小恒为20字节
    pub const SIZE: usize = 20;

    /// `name` 须不长于 [`NAME_MAX_LEN`]，由调用者保证
    #[inline]
    pub fn new(name: &str, inode_id: u32) -> Self {
        let bytes = name.as_bytes();
        let mut name = [0; NAME_MAX_LEN + 1];
        name[..bytes.len()].copy_from_slice(bytes);

        Self { name, inode_id }
    }

    /// 从目录内容中解码一项，`bytes` 至少 [`DirEntry::SIZE`] 字节
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut dir_entry = Self::default();
        dir_entry
            .as_bytes_mut()
            .copy_from_slice(&bytes[..Self::SIZE]);
        dir_entry
    }

    pub fn name(&self) -> &str {
        let len = self
            .name
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(self.name.len());
        core::str::from_utf8(&self.name[..len]).unwrap_or_default()
    }

    #[inline]
    pub fn inode_id(&self) -> u32 {
        self.inode_id
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        self.inode_id == 0 || self.name[0] == 0
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

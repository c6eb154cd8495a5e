use alloc::sync::Arc;

use block_dev::BlockDevice;

use crate::{BITMAP_SECTORS, Error, Result, SECTOR_SIZE, VolumeError};

const BITMAP_BYTES: usize = BITMAP_SECTORS * SECTOR_SIZE;

/// 位图区域，记录其指示区域(inode 或数据块)的分配情况。
///
/// 位图常驻内存，只在启动时载入、同步时写回。
/// 第 `i` 位位于第 `i / 8` 字节，从高位数起第 `i % 8` 位。
#[derive(Debug)]
pub struct Bitmap {
    /// 位图的起始扇区
    start_sector: usize,
    /// 可用位数，之后的位永远不会被分配
    capacity: usize,
    bits: [u8; BITMAP_BYTES],
}

impl Bitmap {
    #[inline]
    pub const fn new(start_sector: usize, capacity: usize) -> Self {
        assert!(capacity <= BITMAP_BYTES * 8);
        Self {
            start_sector,
            capacity,
            bits: [0; BITMAP_BYTES],
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, index: usize) -> Result<bool> {
        let (byte, mask) = self.locate(index)?;
        Ok(self.bits[byte] & mask != 0)
    }

    pub fn set(&mut self, index: usize, value: bool) -> Result<()> {
        let (byte, mask) = self.locate(index)?;
        if value {
            self.bits[byte] |= mask;
        } else {
            self.bits[byte] &= !mask;
        }
        Ok(())
    }

    /// 首次适配：返回编号最小的空闲位
    pub fn find_first_free(&self) -> Result<usize> {
        self.bits
            .iter()
            .enumerate()
            .find_map(|(byte, &bits)| {
                (bits != u8::MAX).then_some(byte * 8 + bits.leading_ones() as usize)
            })
            // 容量之后的位不可分配
            .filter(|&index| index < self.capacity)
            .ok_or(Error::AllocationExhausted)
    }

    /// 分配新的位并返回其编号
    pub fn alloc(&mut self) -> Result<u32> {
        let index = self.find_first_free()?;
        self.set(index, true)?;
        Ok(index as u32)
    }

    pub fn dealloc(&mut self, index: u32) -> Result<()> {
        // 编号一定得有对应的位
        debug_assert!(self.get(index as usize)?, "double free of bit {index}");
        self.set(index as usize, false)
    }

    /// 已分配的位数
    pub fn count(&self) -> usize {
        self.bits.iter().map(|bits| bits.count_ones() as usize).sum()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.bits.fill(0);
    }

    pub fn load(&mut self, block_device: &Arc<dyn BlockDevice>) -> Result<()> {
        for (sector_index, sector) in self.bits.chunks_mut(SECTOR_SIZE).enumerate() {
            block_device.read_block(self.start_sector + sector_index, sector)?;
        }
        Ok(())
    }

    pub fn save(&self, block_device: &Arc<dyn BlockDevice>) -> Result<()> {
        for (sector_index, sector) in self.bits.chunks(SECTOR_SIZE).enumerate() {
            block_device.write_block(self.start_sector + sector_index, sector)?;
        }
        Ok(())
    }
}

impl Bitmap {
    /// 位编号 -> (字节下标, 掩码)
    fn locate(&self, index: usize) -> Result<(usize, u8)> {
        if index >= self.capacity {
            return Err(VolumeError::IndexOutOfRange(index).into());
        }
        Ok((index / 8, 0x80 >> (index % 8)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_are_msb_first() {
        let mut bitmap = Bitmap::new(1, 16);
        bitmap.set(0, true).unwrap();
        bitmap.set(9, true).unwrap();
        assert_eq!(bitmap.bits[0], 0x80);
        assert_eq!(bitmap.bits[1], 0x40);
        assert!(bitmap.get(9).unwrap());
        assert!(!bitmap.get(8).unwrap());
    }

    #[test]
    fn first_fit_until_exhausted() {
        let mut bitmap = Bitmap::new(1, 20);
        for expected in 0..20 {
            assert_eq!(bitmap.alloc().unwrap(), expected);
        }
        assert_eq!(bitmap.alloc(), Err(Error::AllocationExhausted));
        assert_eq!(bitmap.count(), 20);

        bitmap.dealloc(7).unwrap();
        assert_eq!(bitmap.find_first_free().unwrap(), 7);
        assert_eq!(bitmap.alloc().unwrap(), 7);
        assert_eq!(bitmap.alloc(), Err(Error::AllocationExhausted));
    }

    #[test]
    fn out_of_range_is_an_error() {
        let mut bitmap = Bitmap::new(3, 10);
        let err = Error::Volume(VolumeError::IndexOutOfRange(10));
        assert_eq!(bitmap.get(10), Err(err));
        assert_eq!(bitmap.set(10, true), Err(err));
    }

    #[test]
    fn clear_releases_everything() {
        let mut bitmap = Bitmap::new(1, 64);
        (0..40).for_each(|_| {
            bitmap.alloc().unwrap();
        });
        bitmap.clear();
        assert_eq!(bitmap.count(), 0);
        assert_eq!(bitmap.find_first_free().unwrap(), 0);
    }
}

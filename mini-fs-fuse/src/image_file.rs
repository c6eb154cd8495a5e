use std::fmt;
use std::fs;
use std::io::ErrorKind;

use block_dev::{BlockDevice, DiskError, Image, SECTOR_SIZE, Sector, TOTAL_SECTORS};
use spin::Mutex;

/// 整个镜像常驻内存，只在载入和保存时接触宿主文件
pub struct ImageFile {
    sectors: Mutex<Vec<Sector>>,
}

impl ImageFile {
    pub fn new() -> Self {
        Self {
            sectors: Mutex::new(vec![[0; SECTOR_SIZE]; TOTAL_SECTORS]),
        }
    }
}

impl Default for ImageFile {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ImageFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageFile")
            .field("sectors", &self.sectors.lock().len())
            .finish()
    }
}

impl BlockDevice for ImageFile {
    fn init(&self) -> Result<(), DiskError> {
        self.sectors.lock().fill([0; SECTOR_SIZE]);
        Ok(())
    }

    fn load(&self, path: &str) -> Result<Image, DiskError> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Image::NotFound),
            Err(err) => {
                log::error!("failed to read image {path:?}: {err}");
                return Err(DiskError::Io);
            }
        };

        let mut sectors = self.sectors.lock();
        let flat = sectors.as_flattened_mut();
        if data.len() != flat.len() {
            log::error!("image {path:?} has {} bytes", data.len());
            return Err(DiskError::BadImage(data.len() as u64));
        }
        flat.copy_from_slice(&data);

        log::debug!("loaded image {path:?}");
        Ok(Image::Found)
    }

    fn save(&self, path: &str) -> Result<(), DiskError> {
        let sectors = self.sectors.lock();
        fs::write(path, sectors.as_flattened()).map_err(|err| {
            log::error!("failed to write image {path:?}: {err}");
            DiskError::Io
        })
    }

    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), DiskError> {
        if buf.len() != SECTOR_SIZE {
            return Err(DiskError::BadBuffer(buf.len()));
        }
        let sectors = self.sectors.lock();
        let sector = sectors
            .get(block_id)
            .ok_or(DiskError::SectorOutOfRange(block_id))?;
        buf.copy_from_slice(sector);
        Ok(())
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<(), DiskError> {
        if buf.len() != SECTOR_SIZE {
            return Err(DiskError::BadBuffer(buf.len()));
        }
        let mut sectors = self.sectors.lock();
        let sector = sectors
            .get_mut(block_id)
            .ok_or(DiskError::SectorOutOfRange(block_id))?;
        sector.copy_from_slice(buf);
        Ok(())
    }
}

use std::{fs::OpenOptions, io, path::Path};

use memmap2::MmapMut;

use super::{check_drive, sector_out_of_range, SectorDevice};
use crate::{
    fs::{Sector, SECTOR_SIZE},
    utils::fs_size_calculator::image_size,
};

/// a disk image file mapped into memory, standing in for drive 0
#[derive(Debug)]
pub struct ImageFile {
    mmap: MmapMut,
}

impl ImageFile {
    /// create a new zero-filled image, fails if `path` already exists
    pub fn create<P>(path: P) -> io::Result<Self>
    where
        P: AsRef<Path>,
    {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path.as_ref())?;
        // all other region are set to zero by `set_len`
        file.set_len(image_size())?;
        Self::map(&file)
    }

    /// open an existing image for read and write
    pub fn open<P>(path: P) -> io::Result<Self>
    where
        P: AsRef<Path>,
    {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path.as_ref())?;
        let len = file.metadata()?.len();
        if len < image_size() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("image is {len} bytes, at least {} needed", image_size()),
            ));
        }
        Self::map(&file)
    }

    fn map(file: &std::fs::File) -> io::Result<Self> {
        // Safety
        // the mapping is only used through this struct; other processes
        // changing the image file underneath us is not supported
        let mmap = unsafe { MmapMut::map_mut(file)? };
        Ok(ImageFile { mmap })
    }

    fn range(&self, lba: u32) -> io::Result<std::ops::Range<usize>> {
        let start = lba as usize * SECTOR_SIZE;
        let end = start + SECTOR_SIZE;
        if end > self.mmap.len() {
            return Err(sector_out_of_range(
                lba,
                (self.mmap.len() / SECTOR_SIZE) as u64,
            ));
        }
        Ok(start..end)
    }
}

impl SectorDevice for ImageFile {
    fn read_sector(&mut self, drive: u8, lba: u32, buf: &mut Sector) -> io::Result<()> {
        check_drive(drive)?;
        let range = self.range(lba)?;
        buf.copy_from_slice(&self.mmap[range]);
        Ok(())
    }

    fn write_sector(&mut self, drive: u8, lba: u32, buf: &Sector) -> io::Result<()> {
        check_drive(drive)?;
        let range = self.range(lba)?;
        self.mmap[range].copy_from_slice(buf);
        Ok(())
    }

    fn flush_cache(&mut self, drive: u8) -> io::Result<()> {
        check_drive(drive)?;
        self.mmap.flush()
    }
}

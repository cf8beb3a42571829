//! the sector I/O interface the filesystem is built on
use std::io;

use crate::fs::Sector;

mod image_file;
mod ram_disk;
pub use image_file::ImageFile;
pub use ram_disk::RamDisk;

/// a drive that reads and writes whole 512-byte sectors
pub trait SectorDevice {
    fn read_sector(&mut self, drive: u8, lba: u32, buf: &mut Sector) -> io::Result<()>;

    fn write_sector(&mut self, drive: u8, lba: u32, buf: &Sector) -> io::Result<()>;

    /// flush the drive's write cache
    fn flush_cache(&mut self, _drive: u8) -> io::Result<()> {
        Ok(())
    }
}

impl<T: SectorDevice + ?Sized> SectorDevice for &mut T {
    fn read_sector(&mut self, drive: u8, lba: u32, buf: &mut Sector) -> io::Result<()> {
        (**self).read_sector(drive, lba, buf)
    }

    fn write_sector(&mut self, drive: u8, lba: u32, buf: &Sector) -> io::Result<()> {
        (**self).write_sector(drive, lba, buf)
    }

    fn flush_cache(&mut self, drive: u8) -> io::Result<()> {
        (**self).flush_cache(drive)
    }
}

impl<T: SectorDevice + ?Sized> SectorDevice for Box<T> {
    fn read_sector(&mut self, drive: u8, lba: u32, buf: &mut Sector) -> io::Result<()> {
        (**self).read_sector(drive, lba, buf)
    }

    fn write_sector(&mut self, drive: u8, lba: u32, buf: &Sector) -> io::Result<()> {
        (**self).write_sector(drive, lba, buf)
    }

    fn flush_cache(&mut self, drive: u8) -> io::Result<()> {
        (**self).flush_cache(drive)
    }
}

/// both devices expose a single drive
pub(crate) fn check_drive(drive: u8) -> io::Result<()> {
    if drive == 0 {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no drive {drive}"),
        ))
    }
}

pub(crate) fn sector_out_of_range(lba: u32, sectors: u64) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("sector {lba} is past the end of a {sectors}-sector drive"),
    )
}

use std::{collections::BTreeSet, io};

use log::debug;

use super::{check_drive, sector_out_of_range, SectorDevice};
use crate::fs::{Sector, SECTOR_SIZE, TOTAL_SECTORS};

/// an in-memory drive that counts its I/O and can be told to fail writes
#[derive(Debug, Clone)]
pub struct RamDisk {
    sectors: Vec<Sector>,
    reads: usize,
    writes: usize,
    flushes: usize,
    failing_writes: BTreeSet<u32>,
}

impl Default for RamDisk {
    fn default() -> Self {
        Self::new()
    }
}

impl RamDisk {
    /// a zeroed drive large enough for the whole layout
    pub fn new() -> Self {
        Self::with_sectors(TOTAL_SECTORS)
    }

    pub fn with_sectors(count: u32) -> Self {
        RamDisk {
            sectors: vec![[0u8; SECTOR_SIZE]; count as usize],
            reads: 0,
            writes: 0,
            flushes: 0,
            failing_writes: BTreeSet::new(),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads
    }

    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn flushes(&self) -> usize {
        self.flushes
    }

    pub fn reset_counters(&mut self) {
        self.reads = 0;
        self.writes = 0;
        self.flushes = 0;
    }

    /// make every later write to `lba` fail
    pub fn fail_writes_to(&mut self, lba: u32) {
        self.failing_writes.insert(lba);
    }

    pub fn clear_faults(&mut self) {
        self.failing_writes.clear();
    }

    pub fn sector(&self, lba: u32) -> Option<&Sector> {
        self.sectors.get(lba as usize)
    }

    pub fn sector_mut(&mut self, lba: u32) -> Option<&mut Sector> {
        self.sectors.get_mut(lba as usize)
    }
}

impl SectorDevice for RamDisk {
    fn read_sector(&mut self, drive: u8, lba: u32, buf: &mut Sector) -> io::Result<()> {
        check_drive(drive)?;
        let sector = self
            .sectors
            .get(lba as usize)
            .ok_or_else(|| sector_out_of_range(lba, self.sectors.len() as u64))?;
        buf.copy_from_slice(sector);
        self.reads += 1;
        Ok(())
    }

    fn write_sector(&mut self, drive: u8, lba: u32, buf: &Sector) -> io::Result<()> {
        check_drive(drive)?;
        if self.failing_writes.contains(&lba) {
            debug!("injected write fault on sector {lba}");
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("write to sector {lba} failed"),
            ));
        }
        let sectors = self.sectors.len() as u64;
        let sector = self
            .sectors
            .get_mut(lba as usize)
            .ok_or_else(|| sector_out_of_range(lba, sectors))?;
        sector.copy_from_slice(buf);
        self.writes += 1;
        Ok(())
    }

    fn flush_cache(&mut self, drive: u8) -> io::Result<()> {
        check_drive(drive)?;
        self.flushes += 1;
        Ok(())
    }
}

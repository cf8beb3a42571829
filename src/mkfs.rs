//! create our filesystem
use std::path::Path;

use anyhow::Context;
use byte_unit::Byte;
use log::info;

use crate::{device::ImageFile, utils::fs_size_calculator::image_size, FileSystem};

/// create a new image file at `image_file_path` holding an empty filesystem
///
/// # Params
/// - `image_file_path`: the path of the image file, it must not exist yet
///
/// # Return
/// an [anyhow::Result] type to indicate whether the operation is successful
pub fn mkfs<P>(image_file_path: P) -> anyhow::Result<()>
where
    P: AsRef<Path>,
{
    let path = image_file_path.as_ref();
    let image = ImageFile::create(path)
        .with_context(|| format!("creating image file {}", path.display()))?;
    let mut fs = FileSystem::new(image)?;
    fs.format(0)?;
    fs.flush_cache()?;
    info!(
        "{} formatted, {}",
        path.display(),
        Byte::from_bytes(image_size() as _).get_appropriate_unit(true)
    );
    Ok(())
}

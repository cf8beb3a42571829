pub mod fs_size_calculator;
pub(crate) mod le_bytes;

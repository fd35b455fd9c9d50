//! GPU buffer management

pub mod alloc;
pub mod readback;

pub use alloc::{create_checked_buffer, check_buffer_size};
pub use readback::read_buffer;

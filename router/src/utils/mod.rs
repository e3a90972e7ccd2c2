pub mod conversion;
pub mod guide;

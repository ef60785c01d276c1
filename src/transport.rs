/// Filesystem transport.
pub mod fs;

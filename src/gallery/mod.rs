/// Gallery browsing
///
/// - `cursor.rs` - position within one album directory, with wraparound
/// - `scan.rs` - album directories under the gallery root

pub mod cursor;
pub mod scan;

pub use cursor::{GalleryCursor, SelectError};
pub use scan::list_galleries;

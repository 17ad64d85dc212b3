//! Media file probing.

mod mediainfo;
mod types;

pub use mediainfo::{inspect_with_mediainfo, parse_mediainfo_json, MEDIAINFO};
pub use types::*;

/// Deep links
///
/// - `request.rs` - the typed requests a link can carry
/// - `decoder.rs` - scheme/path/query decoding into those requests

pub mod decoder;
pub mod request;

pub use decoder::{decode_base64, DecodeError, LinkDecoder, LinkKind, VIEW_ACTION};
pub use request::{
    ControlIntent, DownloadIntent, KeyImportIntent, MonitorIntent, ParsedRequest,
    UNSPECIFIED_NAME,
};

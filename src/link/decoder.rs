/// Deep-link decoder
///
/// Turns `scheme://authority/<kind>?<query>` into a [`ParsedRequest`].
/// Decoding is pure and may run on any thread.
///
/// Failure semantics:
/// - wrong action, wrong scheme, missing path or unknown kind => `NoOp`
/// - missing `src` on a download => `NoOp`
/// - malformed optional string, boolean or base64 fields => defaults
/// - malformed `size` => `DecodeError::InvalidNumber`

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use percent_encoding::percent_decode_str;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use super::request::{
    ControlIntent, DownloadIntent, KeyImportIntent, MonitorIntent, ParsedRequest,
};

/// The only activation action that carries a deep link
pub const VIEW_ACTION: &str = "view";

/// Download query parameters
const PARAM_SOURCE: &str = "src";
const PARAM_DESTINATION: &str = "dest";
const PARAM_ENCRYPTED: &str = "enc";
const PARAM_IV: &str = "iv";
const PARAM_ZIPPED: &str = "zipped";
const PARAM_SIZE: &str = "size";
/// Shared by download and import links
const PARAM_KEY_ID: &str = "keyid";
const PARAM_NAME: &str = "name";
/// Import query parameters
const PARAM_KEY: &str = "key";
/// Monitor query parameters
const PARAM_BEACON: &str = "beacon";
/// Control query parameters
const PARAM_COMMAND: &str = "cmd";

const PAD_INDIFFERENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const B64_STANDARD: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, PAD_INDIFFERENT);
const B64_URL_SAFE: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, PAD_INDIFFERENT);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("parameter {name:?} is not a base-10 integer: {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

/// Intent kind selected by the last path segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Download,
    Import,
    Monitor,
    Control,
}

impl LinkKind {
    /// Case-insensitive match on the last path segment
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment.to_ascii_lowercase().as_str() {
            "download" => Some(LinkKind::Download),
            "import" => Some(LinkKind::Import),
            "monitor" => Some(LinkKind::Monitor),
            "control" => Some(LinkKind::Control),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LinkDecoder {
    scheme: String,
    allow_control: bool,
}

impl LinkDecoder {
    /// `allow_control` enables the development-only `control` link
    pub fn new(scheme: impl Into<String>, allow_control: bool) -> Self {
        Self {
            scheme: scheme.into(),
            allow_control,
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Decode one link activation
    pub fn decode(&self, action: &str, uri: &str) -> Result<ParsedRequest, DecodeError> {
        if !action.eq_ignore_ascii_case(VIEW_ACTION) {
            debug!(action, "ignoring non-view activation");
            return Ok(ParsedRequest::NoOp);
        }

        let url = match Url::parse(uri) {
            Ok(url) => url,
            Err(err) => {
                debug!(uri, error = %err, "ignoring unparseable link");
                return Ok(ParsedRequest::NoOp);
            }
        };

        if !url.scheme().eq_ignore_ascii_case(&self.scheme) {
            debug!(scheme = url.scheme(), "ignoring link with foreign scheme");
            return Ok(ParsedRequest::NoOp);
        }

        let Some(segment) = last_segment(&url) else {
            debug!(uri, "ignoring link without a path");
            return Ok(ParsedRequest::NoOp);
        };

        let params = query_params(&url);
        match LinkKind::from_segment(&segment) {
            Some(LinkKind::Download) => decode_download(&params),
            Some(LinkKind::Import) => Ok(decode_import(&params)),
            Some(LinkKind::Monitor) => Ok(decode_monitor(&params)),
            Some(LinkKind::Control) if self.allow_control => Ok(decode_control(&params)),
            Some(LinkKind::Control) => {
                warn!("control link received outside development mode");
                Ok(ParsedRequest::NoOp)
            }
            None => {
                debug!(segment, "ignoring unknown link kind");
                Ok(ParsedRequest::NoOp)
            }
        }
    }
}

/// The last non-empty path segment, so `.../import/` still reads `import`
fn last_segment(url: &Url) -> Option<String> {
    let last = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
    Some(percent_decode_str(last).decode_utf8_lossy().into_owned())
}

/// Query parameters, percent-decoded; the last occurrence of a key wins
fn query_params(url: &Url) -> HashMap<String, String> {
    url.query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

fn decode_download(params: &HashMap<String, String>) -> Result<ParsedRequest, DecodeError> {
    let Some(raw_source) = params.get(PARAM_SOURCE) else {
        debug!("download link without a source");
        return Ok(ParsedRequest::NoOp);
    };

    // The source is itself an encoded URI inside the query value
    let source = percent_decode_str(raw_source).decode_utf8_lossy();
    let location = match Url::parse(&source) {
        Ok(url) => url,
        Err(err) => {
            warn!(source = %source, error = %err, "download source is not an absolute URI");
            return Ok(ParsedRequest::NoOp);
        }
    };

    let mut intent = DownloadIntent::new(location);
    intent.destination = params
        .get(PARAM_DESTINATION)
        .filter(|d| !d.is_empty())
        .cloned();
    intent.is_encrypted = flag(params, PARAM_ENCRYPTED);
    intent.is_zipped = flag(params, PARAM_ZIPPED);
    intent.initialization_vector = params.get(PARAM_IV).and_then(|v| match decode_base64(v) {
        Ok(bytes) if !bytes.is_empty() => Some(bytes),
        Ok(_) => None,
        Err(err) => {
            warn!(error = %err, "ignoring malformed iv");
            None
        }
    });
    if let Some(size) = params.get(PARAM_SIZE) {
        intent.expected_size = size.trim().parse().map_err(|_| DecodeError::InvalidNumber {
            name: PARAM_SIZE,
            value: size.clone(),
        })?;
    }
    if let Some(key_id) = params.get(PARAM_KEY_ID) {
        intent.key_id = key_id.clone();
    }
    if let Some(name) = params.get(PARAM_NAME).filter(|n| !n.is_empty()) {
        intent.display_name = name.clone();
    }

    if intent.is_encrypted && intent.initialization_vector.is_none() {
        warn!("encrypted download link without a usable iv");
        return Ok(ParsedRequest::NoOp);
    }

    Ok(ParsedRequest::Download(intent))
}

fn decode_import(params: &HashMap<String, String>) -> ParsedRequest {
    ParsedRequest::KeyImport(KeyImportIntent {
        secret_material: text(params, PARAM_KEY),
        key_id: text(params, PARAM_KEY_ID),
        display_name: text(params, PARAM_NAME),
    })
}

fn decode_monitor(params: &HashMap<String, String>) -> ParsedRequest {
    ParsedRequest::Monitor(MonitorIntent {
        beacon_uri: text(params, PARAM_BEACON),
    })
}

fn decode_control(params: &HashMap<String, String>) -> ParsedRequest {
    ParsedRequest::Control(ControlIntent {
        command: text(params, PARAM_COMMAND),
    })
}

fn text(params: &HashMap<String, String>, name: &str) -> String {
    params.get(name).cloned().unwrap_or_default()
}

/// `y` or `t`, any case
fn flag(params: &HashMap<String, String>, name: &str) -> bool {
    params
        .get(name)
        .map(|v| {
            let v = v.trim();
            v.eq_ignore_ascii_case("y") || v.eq_ignore_ascii_case("t")
        })
        .unwrap_or(false)
}

/// Decode base64 in either the standard or the URL-safe alphabet, with or
/// without padding.
///
/// Query decoding turns `+` into a space, so spaces are read back as `+`.
pub fn decode_base64(value: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let cleaned = value.trim().replace(' ', "+");
    B64_STANDARD
        .decode(&cleaned)
        .or_else(|_| B64_URL_SAFE.decode(&cleaned))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn decoder() -> LinkDecoder {
        LinkDecoder::new("photoviewer", false)
    }

    fn decode(uri: &str) -> ParsedRequest {
        decoder().decode(VIEW_ACTION, uri).unwrap()
    }

    fn download(uri: &str) -> DownloadIntent {
        match decode(uri) {
            ParsedRequest::Download(intent) => intent,
            other => panic!("expected download, got {other:?}"),
        }
    }

    #[test]
    fn test_download_with_encoded_source() {
        let intent = download(
            "photoviewer://gallery/download?src=http%3A%2F%2Fx%2Fy.zip&zipped=y&size=100",
        );
        assert_eq!(intent.location.as_str(), "http://x/y.zip");
        assert!(intent.is_zipped);
        assert_eq!(intent.expected_size, 100);
        assert!(!intent.is_encrypted);
        assert_eq!(intent.display_name, "unspecified");
        assert_eq!(intent.key_id, "");
        assert_eq!(intent.destination, None);
    }

    #[test]
    fn test_download_without_source_is_noop() {
        assert_eq!(decode("photoviewer://gallery/download"), ParsedRequest::NoOp);
        assert_eq!(
            decode("photoviewer://gallery/download?zipped=y&size=3"),
            ParsedRequest::NoOp
        );
    }

    #[test]
    fn test_download_with_relative_source_is_noop() {
        assert_eq!(
            decode("photoviewer://gallery/download?src=just%2Fa%2Fpath"),
            ParsedRequest::NoOp
        );
    }

    #[test]
    fn test_encrypted_download_carries_iv() {
        let intent = download(
            "photoviewer://gallery/download?src=https%3A%2F%2Fcdn%2Fp.bin\
             &enc=T&iv=AAECAwQFBgcICQoLDA0ODw%3D%3D&keyid=k1&name=Trip&dest=trips%2F2024",
        );
        assert!(intent.is_encrypted);
        assert_eq!(
            intent.initialization_vector,
            Some((0u8..16).collect::<Vec<_>>())
        );
        assert_eq!(intent.key_id, "k1");
        assert_eq!(intent.display_name, "Trip");
        assert_eq!(intent.destination.as_deref(), Some("trips/2024"));
    }

    #[test]
    fn test_encrypted_download_without_iv_is_noop() {
        assert_eq!(
            decode("photoviewer://gallery/download?src=https%3A%2F%2Fcdn%2Fp.bin&enc=y"),
            ParsedRequest::NoOp
        );
        assert_eq!(
            decode("photoviewer://gallery/download?src=https%3A%2F%2Fcdn%2Fp.bin&enc=y&iv=%%%"),
            ParsedRequest::NoOp
        );
    }

    #[test]
    fn test_malformed_iv_on_plain_download_is_ignored() {
        let intent = download("photoviewer://gallery/download?src=http%3A%2F%2Fx%2Fa.jpg&iv=***");
        assert_eq!(intent.initialization_vector, None);
    }

    #[rstest]
    #[case("12x")]
    #[case("-5")]
    #[case("")]
    fn test_malformed_size_is_an_error(#[case] size: &str) {
        let uri = format!("photoviewer://gallery/download?src=http%3A%2F%2Fx%2Fy.zip&size={size}");
        let err = decoder().decode(VIEW_ACTION, &uri).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidNumber { name: "size", .. }));
    }

    #[rstest]
    #[case("y", true)]
    #[case("Y", true)]
    #[case("t", true)]
    #[case("T", true)]
    #[case("yes", false)]
    #[case("true", false)]
    #[case("n", false)]
    #[case("", false)]
    fn test_boolean_flags(#[case] value: &str, #[case] expected: bool) {
        let uri = format!("photoviewer://gallery/download?src=http%3A%2F%2Fx%2Fy.zip&zipped={value}");
        assert_eq!(download(&uri).is_zipped, expected);
    }

    #[test]
    fn test_import_with_all_fields() {
        let request = decode("photoviewer://gallery/import?key=c2VjcmV0&name=Test&keyid=abc");
        assert_eq!(
            request,
            ParsedRequest::KeyImport(KeyImportIntent {
                secret_material: "c2VjcmV0".to_string(),
                key_id: "abc".to_string(),
                display_name: "Test".to_string(),
            })
        );
    }

    #[test]
    fn test_import_fields_are_percent_decoded() {
        let request = decode("photoviewer://gallery/import?key=YQ%3D%3D&name=My%20Key&keyid=a%2Fb");
        let ParsedRequest::KeyImport(intent) = request else {
            panic!("expected import");
        };
        assert_eq!(intent.secret_material, "YQ==");
        assert_eq!(intent.display_name, "My Key");
        assert_eq!(intent.key_id, "a/b");
    }

    #[test]
    fn test_import_missing_fields_are_empty() {
        assert_eq!(
            decode("photoviewer://gallery/import"),
            ParsedRequest::KeyImport(KeyImportIntent::default())
        );
    }

    #[test]
    fn test_monitor() {
        assert_eq!(
            decode("photoviewer://gallery/monitor?beacon=https%3A%2F%2Fb%2Fping"),
            ParsedRequest::Monitor(MonitorIntent {
                beacon_uri: "https://b/ping".to_string()
            })
        );
        assert_eq!(
            decode("photoviewer://gallery/MONITOR"),
            ParsedRequest::Monitor(MonitorIntent::default())
        );
    }

    #[test]
    fn test_kind_is_case_insensitive() {
        assert!(matches!(
            decode("photoviewer://gallery/DownLoad?src=http%3A%2F%2Fx%2Fy.zip"),
            ParsedRequest::Download(_)
        ));
    }

    #[rstest]
    #[case("otherscheme://gallery/import?key=a&name=b&keyid=c")]
    #[case("https://gallery/download?src=http%3A%2F%2Fx%2Fy.zip")]
    #[case("photoviewer://gallery?key=a&name=b&keyid=c")]
    #[case("photoviewer://gallery/?key=a&name=b&keyid=c")]
    #[case("photoviewer:import?key=a")]
    #[case("photoviewer://gallery/unknown?key=a")]
    #[case("not a uri")]
    fn test_mismatched_links_are_noop(#[case] uri: &str) {
        assert_eq!(decode(uri), ParsedRequest::NoOp);
    }

    #[test]
    fn test_non_view_action_is_noop() {
        let request = decoder()
            .decode("edit", "photoviewer://gallery/import?key=a")
            .unwrap();
        assert_eq!(request, ParsedRequest::NoOp);
    }

    #[test]
    fn test_control_requires_development_mode() {
        let uri = "photoviewer://gallery/control?cmd=dump";
        assert_eq!(decode(uri), ParsedRequest::NoOp);

        let dev = LinkDecoder::new("photoviewer", true);
        assert_eq!(
            dev.decode(VIEW_ACTION, uri).unwrap(),
            ParsedRequest::Control(ControlIntent {
                command: "dump".to_string()
            })
        );
    }

    #[test]
    fn test_last_path_segment_selects_kind() {
        let request = decode("photoviewer://gallery/v2/links/import?keyid=z");
        assert!(matches!(request, ParsedRequest::KeyImport(ref i) if i.key_id == "z"));
    }

    #[rstest]
    #[case("photoviewer://gallery/import/?keyid=abc")]
    #[case("photoviewer://gallery/import//?keyid=abc")]
    fn test_trailing_slash_keeps_kind(#[case] uri: &str) {
        let request = decode(uri);
        assert!(matches!(request, ParsedRequest::KeyImport(ref i) if i.key_id == "abc"));
    }

    #[test]
    fn test_base64_alphabets() {
        assert_eq!(decode_base64("+/8=").unwrap(), vec![0xfb, 0xff]);
        assert_eq!(decode_base64("-_8").unwrap(), vec![0xfb, 0xff]);
        assert_eq!(decode_base64("ab c").unwrap(), decode_base64("ab+c").unwrap());
        assert!(decode_base64("!!").is_err());
    }
}

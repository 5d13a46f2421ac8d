//! Decoders from profile files to [`ProfileData`].

pub mod collapsed;
pub mod json;

use flamecanvas_protocol::ProfileData;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("json: {0}")]
    Json(#[from] json::JsonParseError),
    #[error("collapsed: {0}")]
    Collapsed(#[from] collapsed::CollapsedParseError),
    #[error("unable to detect format")]
    UnknownFormat,
}

/// Auto-detect the profile format and parse it.
///
/// A JSON object with a `rows` key is the native format. Anything that is
/// not JSON is tried as collapsed stacks.
pub fn parse_auto(data: &[u8]) -> Result<ProfileData, ParseError> {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) {
        if value.as_object().is_some_and(|obj| obj.contains_key("rows")) {
            return Ok(json::parse_json(data)?);
        }
        return Err(ParseError::UnknownFormat);
    }

    let text = std::str::from_utf8(data).map_err(|_| ParseError::UnknownFormat)?;
    if text.trim().is_empty() {
        return Err(ParseError::UnknownFormat);
    }
    Ok(collapsed::parse_collapsed(data)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_json() {
        let profile = parse_auto(br#"{"rows": [], "stringTable": []}"#).unwrap();
        assert_eq!(profile.frames_count(), 0);
    }

    #[test]
    fn falls_back_to_collapsed() {
        let profile = parse_auto(b"main;foo 3\n").unwrap();
        assert_eq!(profile.frames_count(), 3);
    }

    #[test]
    fn unknown_json_and_binary_are_rejected() {
        assert!(matches!(parse_auto(br#"{"traceEvents": []}"#), Err(ParseError::UnknownFormat)));
        assert!(matches!(parse_auto(&[0xff, 0xfe, 0x00]), Err(ParseError::UnknownFormat)));
        assert!(matches!(parse_auto(b"   \n"), Err(ParseError::UnknownFormat)));
    }

    #[test]
    fn collapsed_errors_surface() {
        assert!(matches!(parse_auto(b"main;foo many\n"), Err(ParseError::Collapsed(_))));
    }
}

use flamecanvas_protocol::ProfileData;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JsonParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse the `{ "rows": [...], "stringTable": [...] }` document.
///
/// `null` rows are dropped. Layout problems (bad string indices, overlapping
/// or orphaned frames) are logged but do not fail the parse; the engine
/// tolerates them.
pub fn parse_json(data: &[u8]) -> Result<ProfileData, JsonParseError> {
    let profile: ProfileData = serde_json::from_slice(data)?;
    for issue in profile.integrity_issues() {
        tracing::warn!(%issue, "profile integrity issue");
    }
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flamecanvas_protocol::FrameCoords;

    #[test]
    fn parses_rows_and_strings() {
        let input = br#"{
            "rows": [
                [{"offset": 0, "eventCount": 100, "textId": 0}],
                null,
                [{"offset": 0, "eventCount": 60, "selfEventCount": 60, "textId": 1, "fileId": 2, "inlined": true}]
            ],
            "stringTable": ["all", "main", "main.rs"]
        }"#;
        let profile = parse_json(input).unwrap();
        assert_eq!(profile.rows.len(), 2);
        assert_eq!(profile.frames_count(), 2);
        let main = profile.frame(FrameCoords::new(1, 0)).unwrap();
        assert_eq!(main.file_id, Some(2));
        assert!(main.inlined);
        assert_eq!(profile.string(main.text_id).unwrap().as_str(), "main");
    }

    #[test]
    fn tolerates_bad_string_indices() {
        let input = br#"{"rows": [[{"offset": 0, "eventCount": 1, "textId": 9}]], "stringTable": []}"#;
        let profile = parse_json(input).unwrap();
        assert_eq!(profile.integrity_issues().len(), 1);
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(parse_json(b"{\"rows\": 3}").is_err());
        assert!(parse_json(b"main;foo 1").is_err());
    }
}

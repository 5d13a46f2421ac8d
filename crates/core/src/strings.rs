//! String-table resolution for frame records.

use flamecanvas_protocol::{FrameCoords, ProfileData, SharedStr};
use serde::Serialize;

/// A string-table lookup result.
///
/// Malformed upstream data must not take the paint loop down, so a bad
/// index is carried along as a value instead of an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Label {
    Resolved(SharedStr),
    Unresolved(u32),
}

impl Label {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Resolved(s) => Some(s),
            Self::Unresolved(_) => None,
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resolved(s) => f.write_str(s),
            Self::Unresolved(index) => write!(f, "<unresolved #{index}>"),
        }
    }
}

/// Everything a tooltip or context menu shows about one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStrings {
    pub coords: FrameCoords,
    pub name: Label,
    pub file: Option<Label>,
    pub kind: Option<Label>,
    pub inlined: bool,
    pub event_count: f64,
    pub self_event_count: f64,
    pub base_event_count: Option<f64>,
    pub base_self_event_count: Option<f64>,
}

pub fn resolve(profile: &ProfileData, index: u32) -> Label {
    match profile.string(index) {
        Some(s) => Label::Resolved(s.clone()),
        None => Label::Unresolved(index),
    }
}

/// The frame's display name.
pub fn frame_name(profile: &ProfileData, coords: FrameCoords) -> Option<Label> {
    profile
        .frame(coords)
        .map(|frame| resolve(profile, frame.text_id))
}

/// Resolve every string reference of the frame at `coords`.
/// `None` when there is no frame there.
pub fn read_node_strings(profile: &ProfileData, coords: FrameCoords) -> Option<NodeStrings> {
    let frame = profile.frame(coords)?;
    Some(NodeStrings {
        coords,
        name: resolve(profile, frame.text_id),
        file: frame.file_id.map(|id| resolve(profile, id)),
        kind: frame.kind_id.map(|id| resolve(profile, id)),
        inlined: frame.inlined,
        event_count: frame.event_count,
        self_event_count: frame.self_event_count,
        base_event_count: frame.base_event_count,
        base_self_event_count: frame.base_self_event_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flamecanvas_protocol::FrameRecord;

    fn profile() -> ProfileData {
        let mut leaf = FrameRecord::new(1, 0.0, 5.0);
        leaf.file_id = Some(2);
        leaf.kind_id = Some(9);
        ProfileData::new(
            vec![vec![FrameRecord::new(0, 0.0, 5.0)], vec![leaf]],
            vec!["all".into(), "read_config".into(), "src/config.rs".into()],
        )
    }

    #[test]
    fn resolves_name_and_file() {
        let node = read_node_strings(&profile(), FrameCoords::new(1, 0)).expect("frame");
        assert_eq!(node.name.to_string(), "read_config");
        assert_eq!(node.file.as_ref().and_then(Label::as_str), Some("src/config.rs"));
    }

    #[test]
    fn bad_index_is_marked_not_fatal() {
        let node = read_node_strings(&profile(), FrameCoords::new(1, 0)).expect("frame");
        assert_eq!(node.kind, Some(Label::Unresolved(9)));
        assert_eq!(node.kind.map(|k| k.to_string()).as_deref(), Some("<unresolved #9>"));
    }

    #[test]
    fn missing_frame() {
        assert!(read_node_strings(&profile(), FrameCoords::new(5, 0)).is_none());
        assert!(frame_name(&profile(), FrameCoords::new(0, 3)).is_none());
    }
}

//! Regex search over frame names.

use flamecanvas_protocol::{FrameCoords, ProfileData};
use regex::Regex;

/// Which frames match the active pattern.
///
/// Without a pattern every frame counts as matched and nothing is dimmed.
#[derive(Debug, Clone)]
pub struct SearchState {
    pattern: Option<Regex>,
    matched: Vec<Vec<bool>>,
    matched_count: usize,
    frames_count: usize,
}

impl SearchState {
    /// Match `pattern` against the display name of every frame.
    ///
    /// Each distinct name is tested once, so the pass is linear in the
    /// number of frames plus the size of the string table. An empty pattern
    /// is the same as no pattern. Names that fail to resolve never match.
    pub fn new(profile: &ProfileData, pattern: Option<&Regex>) -> Self {
        let frames_count = profile.frames_count();
        let Some(pattern) = pattern.filter(|p| !p.as_str().is_empty()) else {
            return Self {
                pattern: None,
                matched: profile.rows.iter().map(|row| vec![true; row.len()]).collect(),
                matched_count: frames_count,
                frames_count,
            };
        };

        let mut by_name: Vec<Option<bool>> = vec![None; profile.string_table.len()];
        let mut matched_count = 0;
        let matched = profile
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|frame| {
                        let hit = match by_name.get_mut(frame.text_id as usize) {
                            Some(slot) => *slot.get_or_insert_with(|| {
                                profile
                                    .string(frame.text_id)
                                    .is_some_and(|name| pattern.is_match(name))
                            }),
                            None => false,
                        };
                        matched_count += usize::from(hit);
                        hit
                    })
                    .collect()
            })
            .collect();

        Self {
            pattern: Some(pattern.clone()),
            matched,
            matched_count,
            frames_count,
        }
    }

    /// Whether a pattern is applied (and unmatched frames are dimmed).
    pub fn is_active(&self) -> bool {
        self.pattern.is_some()
    }

    pub fn is_matched(&self, coords: FrameCoords) -> bool {
        self.matched
            .get(coords.row)
            .and_then(|row| row.get(coords.index))
            .copied()
            .unwrap_or(false)
    }

    pub fn matched_count(&self) -> usize {
        self.matched_count
    }

    pub fn frames_count(&self) -> usize {
        self.frames_count
    }

    /// All matched frames, row by row.
    pub fn matched_frames(&self) -> impl Iterator<Item = FrameCoords> + '_ {
        self.matched.iter().enumerate().flat_map(|(row, hits)| {
            hits.iter()
                .enumerate()
                .filter(|(_, hit)| **hit)
                .map(move |(index, _)| FrameCoords::new(row, index))
        })
    }
}

/// Compile user search text.
///
/// Blank text means "no search". An invalid pattern is logged and treated
/// as no search, so a typo never blanks the graph.
pub fn compile_pattern(text: &str) -> Option<Regex> {
    if text.is_empty() {
        return None;
    }
    match Regex::new(text) {
        Ok(regex) => Some(regex),
        Err(err) => {
            tracing::warn!(pattern = text, error = %err, "ignoring invalid search pattern");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flamecanvas_protocol::{FrameRecord, SharedStr};

    fn profile() -> ProfileData {
        let mut leaf = FrameRecord::new(3, 0.0, 10.0);
        leaf.file_id = Some(4);
        ProfileData::new(
            vec![
                vec![FrameRecord::new(0, 0.0, 100.0)],
                vec![FrameRecord::new(1, 0.0, 60.0), FrameRecord::new(2, 60.0, 40.0)],
                vec![leaf, FrameRecord::new(1, 60.0, 20.0), FrameRecord::new(9, 80.0, 5.0)],
            ],
            ["all", "std::io::read", "Parser::parse", "memcpy", "io/copy.c"]
                .into_iter()
                .map(SharedStr::from)
                .collect(),
        )
    }

    #[test]
    fn no_pattern_matches_everything() {
        let p = profile();
        let state = SearchState::new(&p, None);
        assert!(!state.is_active());
        assert_eq!(state.matched_count(), p.frames_count());
        assert!(state.is_matched(FrameCoords::new(2, 2)));
    }

    #[test]
    fn empty_pattern_matches_everything() {
        let p = profile();
        let empty = Regex::new("").expect("regex");
        let state = SearchState::new(&p, Some(&empty));
        assert!(!state.is_active());
        assert_eq!(state.matched_count(), 6);
    }

    #[test]
    fn counts_every_occurrence() {
        let re = Regex::new("read").expect("regex");
        let state = SearchState::new(&profile(), Some(&re));
        assert_eq!(state.matched_count(), 2);
        let hits: Vec<_> = state.matched_frames().collect();
        assert_eq!(hits, vec![FrameCoords::new(1, 0), FrameCoords::new(2, 1)]);
    }

    #[test]
    fn case_sensitive_unless_the_pattern_says_otherwise() {
        let p = profile();
        let strict = Regex::new("parser").expect("regex");
        assert_eq!(SearchState::new(&p, Some(&strict)).matched_count(), 0);
        let loose = Regex::new("(?i)parser").expect("regex");
        assert_eq!(SearchState::new(&p, Some(&loose)).matched_count(), 1);
    }

    #[test]
    fn file_names_are_not_searched() {
        let re = Regex::new("copy").expect("regex");
        let state = SearchState::new(&profile(), Some(&re));
        assert_eq!(state.matched_count(), 0);
        assert!(!state.is_matched(FrameCoords::new(2, 0)));
    }

    #[test]
    fn unresolved_names_and_missing_frames_never_match() {
        let re = Regex::new(".*").expect("regex");
        let state = SearchState::new(&profile(), Some(&re));
        assert!(!state.is_matched(FrameCoords::new(2, 2)));
        assert!(!state.is_matched(FrameCoords::new(7, 0)));
        assert_eq!(state.matched_count(), 5);
    }

    #[test]
    fn compile_rejects_bad_patterns_quietly() {
        assert!(compile_pattern("").is_none());
        assert!(compile_pattern("(unclosed").is_none());
        assert!(compile_pattern("^main$").is_some());
    }
}

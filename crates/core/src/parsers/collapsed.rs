use std::collections::{BTreeMap, HashMap};

use flamecanvas_protocol::{FrameRecord, ProfileData, SharedStr};
use thiserror::Error;

/// Name of the synthesized frame every stack hangs from.
pub const ROOT_NAME: &str = "all";

#[derive(Debug, Error)]
pub enum CollapsedParseError {
    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("line {line}: invalid sample count `{count}`")]
    Count { line: usize, count: String },
    #[error("no valid stack lines found")]
    Empty,
}

/// Parse Brendan Gregg's collapsed/folded stack format.
///
/// Each line is `frame;frame;... count`. A line ending in two counts,
/// `frame;... base new`, is a differential stack (as written by
/// `difffolded.pl`); any such line puts the whole profile in diff mode, with
/// the first count as the baseline.
///
/// Identical paths are merged, siblings are ordered alphabetically and every
/// stack hangs from a synthesized root frame named `all` at row 0.
pub fn parse_collapsed(data: &[u8]) -> Result<ProfileData, CollapsedParseError> {
    let text = std::str::from_utf8(data)?;
    let mut tree = Tree::default();

    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((stack, counts)) = split_counts(line, number + 1)? else {
            continue;
        };
        let frames: Vec<&str> = stack
            .split(';')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .collect();
        if frames.is_empty() {
            continue;
        }
        tree.add(&frames, counts);
    }

    if tree.nodes[0].children.is_empty() {
        return Err(CollapsedParseError::Empty);
    }
    Ok(tree.into_profile())
}

#[derive(Debug, Clone, Copy)]
struct Counts {
    base: Option<f64>,
    value: f64,
}

/// Split `stack count` or `stack base new`. Lines without a count are
/// skipped; a count that is present but not a number is an error.
fn split_counts(line: &str, number: usize) -> Result<Option<(&str, Counts)>, CollapsedParseError> {
    let Some((rest, last)) = line.rsplit_once(char::is_whitespace) else {
        return Ok(None);
    };
    let value = parse_count(last, number)?;
    let rest = rest.trim_end();
    if let Some((stack, maybe_base)) = rest.rsplit_once(char::is_whitespace)
        && let Ok(base) = maybe_base.parse::<f64>()
        && base >= 0.0
        && base.is_finite()
    {
        return Ok(Some((
            stack.trim_end(),
            Counts {
                base: Some(base),
                value,
            },
        )));
    }
    Ok(Some((rest, Counts { base: None, value })))
}

fn parse_count(token: &str, line: usize) -> Result<f64, CollapsedParseError> {
    match token.parse::<f64>() {
        Ok(count) if count >= 0.0 && count.is_finite() => Ok(count),
        _ => Err(CollapsedParseError::Count {
            line,
            count: token.to_string(),
        }),
    }
}

struct Node {
    name: u32,
    value: f64,
    base: f64,
    children: BTreeMap<String, usize>,
}

impl Node {
    fn new(name: u32) -> Self {
        Self {
            name,
            value: 0.0,
            base: 0.0,
            children: BTreeMap::new(),
        }
    }
}

struct Tree {
    nodes: Vec<Node>,
    strings: Vec<SharedStr>,
    interned: HashMap<String, u32>,
    diff: bool,
}

impl Default for Tree {
    fn default() -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            strings: Vec::new(),
            interned: HashMap::new(),
            diff: false,
        };
        let root = tree.intern(ROOT_NAME);
        tree.nodes.push(Node::new(root));
        tree
    }
}

impl Tree {
    fn intern(&mut self, name: &str) -> u32 {
        if let Some(&id) = self.interned.get(name) {
            return id;
        }
        let id = self.strings.len() as u32;
        self.strings.push(SharedStr::from(name));
        self.interned.insert(name.to_string(), id);
        id
    }

    fn add(&mut self, frames: &[&str], counts: Counts) {
        self.diff |= counts.base.is_some();
        let base = counts.base.unwrap_or(0.0);
        let mut node = 0;
        self.nodes[node].value += counts.value;
        self.nodes[node].base += base;
        for name in frames {
            let child = match self.nodes[node].children.get(*name) {
                Some(&child) => child,
                None => {
                    let id = self.intern(name);
                    let child = self.nodes.len();
                    self.nodes.push(Node::new(id));
                    self.nodes[node].children.insert((*name).to_string(), child);
                    child
                }
            };
            self.nodes[child].value += counts.value;
            self.nodes[child].base += base;
            node = child;
        }
    }

    fn into_profile(self) -> ProfileData {
        let mut rows: Vec<Vec<FrameRecord>> = Vec::new();
        // Depth-first, children in name order, so each row comes out sorted
        // by offset.
        let mut pending = vec![(0usize, 0usize, 0.0f64)];
        while let Some((index, depth, offset)) = pending.pop() {
            let node = &self.nodes[index];
            let children: Vec<usize> = node.children.values().copied().collect();
            let child_value: f64 = children.iter().map(|&c| self.nodes[c].value).sum();
            let child_base: f64 = children.iter().map(|&c| self.nodes[c].base).sum();

            let mut frame = FrameRecord::new(node.name, offset, node.value);
            frame.self_event_count = (node.value - child_value).max(0.0);
            if self.diff {
                frame.base_event_count = Some(node.base);
                frame.base_self_event_count = Some((node.base - child_base).max(0.0));
            }
            if rows.len() <= depth {
                rows.resize_with(depth + 1, Vec::new);
            }
            rows[depth].push(frame);

            let mut child_offset = offset;
            let mut placed = Vec::with_capacity(children.len());
            for child in children {
                placed.push((child, depth + 1, child_offset));
                child_offset += self.nodes[child].value;
            }
            pending.extend(placed.into_iter().rev());
        }
        ProfileData::new(rows, self.strings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flamecanvas_protocol::FrameCoords;

    fn names(profile: &ProfileData, row: usize) -> Vec<&str> {
        profile.rows[row]
            .iter()
            .map(|f| profile.string(f.text_id).unwrap().as_str())
            .collect()
    }

    #[test]
    fn parse_basic_collapsed() {
        let input = b"main;foo;bar 10\nmain;foo;baz 20\nmain;qux 5\n";
        let profile = parse_collapsed(input).unwrap();

        assert_eq!(profile.rows.len(), 4);
        assert_eq!(names(&profile, 0), vec!["all"]);
        assert_eq!(names(&profile, 1), vec!["main"]);
        assert_eq!(names(&profile, 2), vec!["foo", "qux"]);
        assert_eq!(names(&profile, 3), vec!["bar", "baz"]);
        assert_eq!(profile.total_weight(), 35.0);

        let baz = &profile.rows[3][1];
        assert_eq!(baz.offset, 10.0);
        assert_eq!(baz.event_count, 20.0);
        let qux = &profile.rows[2][1];
        assert_eq!(qux.offset, 30.0);
        assert_eq!(qux.self_event_count, 5.0);
        assert_eq!(profile.rows[1][0].self_event_count, 0.0);
        assert!(profile.integrity_issues().is_empty());
        assert!(!profile.is_diff());
    }

    #[test]
    fn merges_identical_stacks_and_sorts_siblings() {
        let input = b"main;zeta 1\nmain;alpha 2\nmain;zeta 3\n";
        let profile = parse_collapsed(input).unwrap();
        assert_eq!(names(&profile, 2), vec!["alpha", "zeta"]);
        assert_eq!(profile.rows[2][1].event_count, 4.0);
        assert_eq!(profile.parent_of(FrameCoords::new(2, 1)), Some(FrameCoords::new(1, 0)));
    }

    #[test]
    fn differential_stacks() {
        let input = b"main;old 8 2\nmain;new 0 6\n";
        let profile = parse_collapsed(input).unwrap();
        assert!(profile.is_diff());
        assert_eq!(profile.total_weight(), 8.0);
        assert_eq!(profile.base_total_weight(), 8.0);
        let new = &profile.rows[2][0];
        assert_eq!(profile.string(new.text_id).unwrap().as_str(), "new");
        assert_eq!(new.base_event_count, Some(0.0));
        assert_eq!(new.event_count, 6.0);
    }

    #[test]
    fn frame_names_may_contain_spaces() {
        let profile = parse_collapsed(b"main;operator new 3\n").unwrap();
        assert_eq!(names(&profile, 2), vec!["operator new"]);
        assert!(!profile.is_diff());
    }

    #[test]
    fn skips_comments_and_empty_lines() {
        let input = b"# comment\n\nmain;foo 5\n";
        let profile = parse_collapsed(input).unwrap();
        assert_eq!(profile.frames_count(), 3);
    }

    #[test]
    fn bad_count_reports_the_line() {
        let err = parse_collapsed(b"main 1\nmain;foo lots\n").unwrap_err();
        assert!(matches!(err, CollapsedParseError::Count { line: 2, .. }), "{err}");
    }

    #[test]
    fn empty_input_errors() {
        assert!(matches!(parse_collapsed(b""), Err(CollapsedParseError::Empty)));
    }
}

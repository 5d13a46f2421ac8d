use serde::{Deserialize, Deserializer, Serialize};

use crate::shared_str::SharedStr;

/// A profile, already aggregated into flame graph rows.
///
/// ```text
///   row 0   [all.......................................]
///   row 1   [main.....................][gc.......]
///   row 2   [parse.........][eval..]
/// ```
///
/// # Layout invariants
///
/// 1. **Depth is the row index.** A frame's stack depth is never stored.
/// 2. **Rows are sorted.** Frames inside a row are left-to-right and never
///    overlap: `frame[i].end() <= frame[i + 1].offset`.
/// 3. **Containment is the tree.** There are no parent pointers; a frame's
///    parent is the frame in the previous row whose span contains it. The
///    relation is derived on demand with [`ProfileData::parent_of`] and
///    [`ProfileData::children_of`].
/// 4. **Strings are interned.** Every name/file/kind is an index into
///    `string_table`; a bad index is a data error the consumers tolerate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileData {
    #[serde(deserialize_with = "rows_skipping_null")]
    pub rows: Vec<Vec<FrameRecord>>,
    pub string_table: Vec<SharedStr>,
}

/// One frame: a function at one stack position, sized by its sample weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameRecord {
    /// Left edge, in weight units from the left edge of the graph.
    pub offset: f64,
    /// Total weight (self + children). This is the frame's width.
    pub event_count: f64,
    /// Weight spent in the frame itself.
    #[serde(default)]
    pub self_event_count: f64,
    /// Total weight in the baseline profile (diff mode only).
    #[serde(default)]
    pub base_event_count: Option<f64>,
    /// Self weight in the baseline profile (diff mode only).
    #[serde(default)]
    pub base_self_event_count: Option<f64>,
    /// String-table index of the function name.
    pub text_id: u32,
    /// String-table index of the source file, if known.
    #[serde(default)]
    pub file_id: Option<u32>,
    /// String-table index of the frame kind ("native", "python", "kernel", ...).
    #[serde(default)]
    pub kind_id: Option<u32>,
    #[serde(default)]
    pub inlined: bool,
}

impl FrameRecord {
    /// A non-diff frame with no file/kind metadata. Self weight defaults to
    /// the full weight; callers that know better overwrite it.
    pub fn new(text_id: u32, offset: f64, event_count: f64) -> Self {
        Self {
            offset,
            event_count,
            self_event_count: event_count,
            base_event_count: None,
            base_self_event_count: None,
            text_id,
            file_id: None,
            kind_id: None,
            inlined: false,
        }
    }

    /// Attach a baseline weight, turning this into a diff frame.
    pub fn with_base(mut self, base_event_count: f64) -> Self {
        self.base_event_count = Some(base_event_count);
        self
    }

    /// Right edge, in weight units.
    pub fn end(&self) -> f64 {
        self.offset + self.event_count
    }
}

/// Positional identity of a frame: its row (depth) and index within the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FrameCoords {
    pub row: usize,
    pub index: usize,
}

impl FrameCoords {
    pub fn new(row: usize, index: usize) -> Self {
        Self { row, index }
    }
}

impl std::fmt::Display for FrameCoords {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.row, self.index)
    }
}

impl std::str::FromStr for FrameCoords {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (row, index) = s
            .split_once(':')
            .ok_or_else(|| format!("expected `row:index`, got `{s}`"))?;
        let row = row.trim().parse().map_err(|_| format!("bad row in `{s}`"))?;
        let index = index
            .trim()
            .parse()
            .map_err(|_| format!("bad index in `{s}`"))?;
        Ok(Self { row, index })
    }
}

/// A violation of the layout invariants, found by
/// [`ProfileData::integrity_issues`].
#[derive(Debug, Clone, PartialEq)]
pub enum IntegrityIssue {
    UnknownString { frame: FrameCoords, index: u32 },
    NegativeWeight { frame: FrameCoords },
    Overlap { frame: FrameCoords },
    Orphan { frame: FrameCoords },
}

impl std::fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownString { frame, index } => {
                write!(f, "frame {frame} references missing string #{index}")
            }
            Self::NegativeWeight { frame } => write!(f, "frame {frame} has a negative weight"),
            Self::Overlap { frame } => write!(f, "frame {frame} overlaps its left neighbour"),
            Self::Orphan { frame } => {
                write!(f, "frame {frame} is not contained in any frame of the previous row")
            }
        }
    }
}

// Tolerance for containment checks on accumulated float offsets.
const EPSILON: f64 = 1e-9;

impl ProfileData {
    pub fn new(rows: Vec<Vec<FrameRecord>>, string_table: Vec<SharedStr>) -> Self {
        Self { rows, string_table }
    }

    pub fn frame(&self, coords: FrameCoords) -> Option<&FrameRecord> {
        self.rows.get(coords.row)?.get(coords.index)
    }

    pub fn string(&self, index: u32) -> Option<&SharedStr> {
        self.string_table.get(index as usize)
    }

    /// Total number of frames across all rows.
    pub fn frames_count(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    /// Weight of the whole graph: the sum of the top row.
    pub fn total_weight(&self) -> f64 {
        self.rows
            .first()
            .map_or(0.0, |row| row.iter().map(|f| f.event_count).sum())
    }

    /// Baseline weight of the whole graph (diff mode).
    pub fn base_total_weight(&self) -> f64 {
        self.rows.first().map_or(0.0, |row| {
            row.iter().filter_map(|f| f.base_event_count).sum()
        })
    }

    /// Whether any frame carries a baseline weight.
    pub fn is_diff(&self) -> bool {
        self.rows
            .iter()
            .flatten()
            .any(|f| f.base_event_count.is_some())
    }

    /// The frame in the previous row whose span contains `coords`.
    pub fn parent_of(&self, coords: FrameCoords) -> Option<FrameCoords> {
        let frame = self.frame(coords)?;
        let row = coords.row.checked_sub(1)?;
        let parents = self.rows.get(row)?;
        // Last parent starting at or before the child.
        let index = parents
            .partition_point(|p| p.offset <= frame.offset + EPSILON)
            .checked_sub(1)?;
        let parent = &parents[index];
        (frame.end() <= parent.end() + EPSILON).then_some(FrameCoords::new(row, index))
    }

    /// Frames in the next row contained in `coords`, left to right.
    pub fn children_of(&self, coords: FrameCoords) -> impl Iterator<Item = FrameCoords> {
        let row = coords.row + 1;
        let range = match (self.frame(coords), self.rows.get(row)) {
            (Some(parent), Some(children)) => {
                let start = children.partition_point(|c| c.offset < parent.offset - EPSILON);
                let end = children.partition_point(|c| c.offset < parent.end() - EPSILON);
                start..end.max(start)
            }
            _ => 0..0,
        };
        range.map(move |index| FrameCoords::new(row, index))
    }

    /// Check the layout invariants. Problems are reported, never fixed.
    pub fn integrity_issues(&self) -> Vec<IntegrityIssue> {
        let mut issues = Vec::new();
        let strings = self.string_table.len();
        for (row, frames) in self.rows.iter().enumerate() {
            for (index, frame) in frames.iter().enumerate() {
                let coords = FrameCoords::new(row, index);
                for id in [Some(frame.text_id), frame.file_id, frame.kind_id]
                    .into_iter()
                    .flatten()
                {
                    if id as usize >= strings {
                        issues.push(IntegrityIssue::UnknownString {
                            frame: coords,
                            index: id,
                        });
                    }
                }
                if frame.event_count < 0.0 || frame.self_event_count < 0.0 {
                    issues.push(IntegrityIssue::NegativeWeight { frame: coords });
                }
                if index > 0 && frames[index - 1].end() > frame.offset + EPSILON {
                    issues.push(IntegrityIssue::Overlap { frame: coords });
                }
                if row > 0 && self.parent_of(coords).is_none() {
                    issues.push(IntegrityIssue::Orphan { frame: coords });
                }
            }
        }
        issues
    }
}

fn rows_skipping_null<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<Vec<FrameRecord>>, D::Error> {
    let rows = Vec::<Option<Vec<FrameRecord>>>::deserialize(deserializer)?;
    Ok(rows.into_iter().flatten().collect())
}

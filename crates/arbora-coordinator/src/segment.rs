//! Segmentation parser
//!
//! Splits one utterance into an ordered list of (section, payload) segments
//! using explicit scope markers ("targets: ..."), with the record cursor as
//! fallback scope for unscoped text. Segment order is preserved exactly as
//! encountered; later segments may override values set by earlier ones in
//! the same turn.

use arbora_domain::Section;

/// One (section, payload) slice of an utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Resolved scope
    pub section: Section,
    /// Payload text, trimmed; may be empty
    pub payload: String,
    /// True when the scope came from an explicit marker rather than the cursor
    pub explicit: bool,
}

impl Segment {
    /// A marker with no payload: inert, never sent to extraction
    pub fn is_navigation_only(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Result of segmenting one utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segmentation {
    /// Segments in parse order
    pub segments: Vec<Segment>,
    /// Leading text dropped because no cursor was set
    pub discarded: Option<String>,
    /// Cursor after this turn: the last explicitly-scoped segment's section,
    /// or the incoming cursor when no marker appeared
    pub next_cursor: Option<Section>,
}

/// Spoken labels that open a scope when followed by a colon, longest first
/// so "tree description:" wins over a bare "tree:"
const MARKER_LABELS: [(&str, Section); 12] = [
    ("area description", Section::AreaDescription),
    ("area_description", Section::AreaDescription),
    ("tree description", Section::TreeDescription),
    ("tree_description", Section::TreeDescription),
    ("recommendations", Section::Recommendations),
    ("recommendation", Section::Recommendations),
    ("targets", Section::Targets),
    ("target", Section::Targets),
    ("risks", Section::Risks),
    ("risk", Section::Risks),
    ("tree", Section::TreeDescription),
    ("area", Section::AreaDescription),
];

#[derive(Debug, Clone, Copy)]
struct Marker {
    start: usize,
    payload_start: usize,
    section: Section,
}

fn label_matches(text: &str, at: usize, label: &str) -> bool {
    text.as_bytes()
        .get(at..at + label.len())
        .is_some_and(|slice| slice.eq_ignore_ascii_case(label.as_bytes()))
}

/// Does `label` at byte `at` continue with optional spaces then a colon?
/// Returns the byte index just past the colon.
fn colon_after(text: &str, at: usize, label: &str) -> Option<usize> {
    let mut idx = at + label.len();
    let bytes = text.as_bytes();
    while idx < bytes.len() && bytes[idx] == b' ' {
        idx += 1;
    }
    if idx < bytes.len() && bytes[idx] == b':' {
        Some(idx + 1)
    } else {
        None
    }
}

fn find_markers(text: &str) -> Vec<Marker> {
    let mut markers = Vec::new();
    let mut prev: Option<char> = None;
    let mut skip_until = 0;

    for (i, c) in text.char_indices() {
        if i >= skip_until {
            let at_boundary = prev.map_or(true, |p| !p.is_alphanumeric() && p != '_');
            if at_boundary {
                for (label, section) in MARKER_LABELS {
                    if label_matches(text, i, label) {
                        if let Some(payload_start) = colon_after(text, i, label) {
                            markers.push(Marker {
                                start: i,
                                payload_start,
                                section,
                            });
                            skip_until = payload_start;
                            break;
                        }
                    }
                }
            }
        }
        prev = Some(c);
    }
    markers
}

/// Segment one utterance against the current cursor
pub fn segment(utterance: &str, cursor: Option<Section>) -> Segmentation {
    let markers = find_markers(utterance);

    if markers.is_empty() {
        // cursor-first fallback: the whole utterance is one segment
        let trimmed = utterance.trim();
        let segments = match cursor {
            Some(section) if !trimmed.is_empty() => vec![Segment {
                section,
                payload: trimmed.to_string(),
                explicit: false,
            }],
            _ => Vec::new(),
        };
        let discarded = if cursor.is_none() && !trimmed.is_empty() {
            Some(trimmed.to_string())
        } else {
            None
        };
        return Segmentation {
            segments,
            discarded,
            next_cursor: cursor,
        };
    }

    let mut segments = Vec::new();
    let mut discarded = None;

    let leading = utterance[..markers[0].start].trim();
    if !leading.is_empty() {
        match cursor {
            Some(section) => segments.push(Segment {
                section,
                payload: leading.to_string(),
                explicit: false,
            }),
            None => discarded = Some(leading.to_string()),
        }
    }

    for (idx, marker) in markers.iter().enumerate() {
        let end = markers
            .get(idx + 1)
            .map(|m| m.start)
            .unwrap_or(utterance.len());
        segments.push(Segment {
            section: marker.section,
            payload: utterance[marker.payload_start..end].trim().to_string(),
            explicit: true,
        });
    }

    let next_cursor = segments
        .iter()
        .rev()
        .find(|s| s.explicit)
        .map(|s| s.section)
        .or(cursor);

    Segmentation {
        segments,
        discarded,
        next_cursor,
    }
}

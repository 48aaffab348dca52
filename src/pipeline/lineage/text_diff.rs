use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};

/// Fragments of an Equal run no longer than this get absorbed into the
/// surrounding edits. A one-letter match inside a rewritten sentence is
/// noise, not common text.
const TRIVIAL_EQUAL_CHARS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffOp {
    Equal,
    Delete,
    Insert,
}

/// One run of the character diff between two version texts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextSegment {
    pub op: DiffOp,
    pub text: String,
}

/// Character-level diff between two texts, grouped into runs.
/// Identical inputs produce an empty list.
pub fn compare_text(old: &str, new: &str) -> Vec<TextSegment> {
    if old == new {
        return Vec::new();
    }

    let diff = TextDiff::from_chars(old, new);
    let mut segments: Vec<TextSegment> = Vec::new();
    for change in diff.iter_all_changes() {
        let op = match change.tag() {
            ChangeTag::Equal => DiffOp::Equal,
            ChangeTag::Delete => DiffOp::Delete,
            ChangeTag::Insert => DiffOp::Insert,
        };
        match segments.last_mut() {
            Some(last) if last.op == op => last.text.push_str(change.value()),
            _ => segments.push(TextSegment {
                op,
                text: change.value().to_string(),
            }),
        }
    }

    absorb_trivial_equals(segments)
}

/// Absorb short Equal runs sandwiched between edits into the edits on
/// both sides: the shared characters belong to the old text (delete run)
/// and the new text (insert run) alike.
fn absorb_trivial_equals(segments: Vec<TextSegment>) -> Vec<TextSegment> {
    let mut pending_delete = String::new();
    let mut pending_insert = String::new();
    let mut out: Vec<TextSegment> = Vec::new();

    let flush = |out: &mut Vec<TextSegment>, del: &mut String, ins: &mut String| {
        if !del.is_empty() {
            out.push(TextSegment {
                op: DiffOp::Delete,
                text: std::mem::take(del),
            });
        }
        if !ins.is_empty() {
            out.push(TextSegment {
                op: DiffOp::Insert,
                text: std::mem::take(ins),
            });
        }
    };

    let n = segments.len();
    for (i, seg) in segments.into_iter().enumerate() {
        match seg.op {
            DiffOp::Delete => pending_delete.push_str(&seg.text),
            DiffOp::Insert => pending_insert.push_str(&seg.text),
            DiffOp::Equal => {
                let trivial = seg.text.chars().count() <= TRIVIAL_EQUAL_CHARS;
                let between_edits =
                    (!pending_delete.is_empty() || !pending_insert.is_empty()) && i + 1 < n;
                if trivial && between_edits {
                    pending_delete.push_str(&seg.text);
                    pending_insert.push_str(&seg.text);
                } else {
                    flush(&mut out, &mut pending_delete, &mut pending_insert);
                    out.push(seg);
                }
            }
        }
    }
    flush(&mut out, &mut pending_delete, &mut pending_insert);
    out
}

/// Reassemble one side of the diff; sanity check used by tests and the
/// lineage verifier.
pub fn reconstruct(segments: &[TextSegment], side: DiffOp) -> String {
    segments
        .iter()
        .filter(|s| s.op == DiffOp::Equal || s.op == side)
        .map(|s| s.text.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_texts_diff_empty() {
        assert!(compare_text("same text", "same text").is_empty());
    }

    #[test]
    fn single_edit_produces_three_runs() {
        let segs = compare_text("rent is 950 euro", "rent is 990 euro");
        let ops: Vec<DiffOp> = segs.iter().map(|s| s.op).collect();
        assert!(ops.contains(&DiffOp::Delete));
        assert!(ops.contains(&DiffOp::Insert));
        assert_eq!(segs.first().map(|s| s.op), Some(DiffOp::Equal));
        assert_eq!(segs.last().map(|s| s.op), Some(DiffOp::Equal));
    }

    #[test]
    fn both_sides_reconstruct() {
        let old = "tenant pays 950 euro monthly, deposit held in escrow";
        let new = "tenant pays 990 euro quarterly, deposit returned on exit";
        let segs = compare_text(old, new);
        assert_eq!(reconstruct(&segs, DiffOp::Delete), old);
        assert_eq!(reconstruct(&segs, DiffOp::Insert), new);
    }

    #[test]
    fn trivial_equal_runs_absorbed() {
        // the lone matching "c" between edits folds into the edit runs
        let segs = compare_text("abcd", "axcy");
        assert_eq!(segs.len(), 3, "{segs:?}");
        assert_eq!(segs[0].op, DiffOp::Equal);
        assert_eq!(segs[0].text, "a");
        assert_eq!(segs[1].op, DiffOp::Delete);
        assert_eq!(segs[1].text, "bcd");
        assert_eq!(segs[2].op, DiffOp::Insert);
        assert_eq!(segs[2].text, "xcy");
    }

    #[test]
    fn two_empty_texts_diff_empty() {
        assert!(compare_text("", "").is_empty());
    }

    #[test]
    fn pure_insertion_against_empty() {
        let segs = compare_text("", "new content");
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].op, DiffOp::Insert);
        assert_eq!(segs[0].text, "new content");
    }
}

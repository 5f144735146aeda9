//! Line diff for comparing a regenerated menu with the committed one.

use std::fmt::Write as _;

/// Larger inputs are shown as a full replacement instead of an LCS diff.
const MAX_TABLE_CELLS: usize = 25_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    Same(&'a str),
    Removed(&'a str),
    Added(&'a str),
}

/// Longest-common-subsequence diff of two texts, line by line.
pub fn diff_lines<'a>(old: &'a str, new: &'a str) -> Vec<Line<'a>> {
    let old: Vec<&str> = old.lines().collect();
    let new: Vec<&str> = new.lines().collect();
    let (n, m) = (old.len(), new.len());

    if (n + 1).saturating_mul(m + 1) > MAX_TABLE_CELLS {
        return old
            .iter()
            .map(|l| Line::Removed(*l))
            .chain(new.iter().map(|l| Line::Added(*l)))
            .collect();
    }

    // lcs[i][j]: length of the LCS of old[i..] and new[j..]
    let width = m + 1;
    let mut lcs = vec![0u32; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i * width + j] = if old[i] == new[j] {
                lcs[(i + 1) * width + j + 1] + 1
            } else {
                lcs[(i + 1) * width + j].max(lcs[i * width + j + 1])
            };
        }
    }

    let mut ops = Vec::with_capacity(n + m);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if old[i] == new[j] {
            ops.push(Line::Same(old[i]));
            i += 1;
            j += 1;
        } else if lcs[(i + 1) * width + j] >= lcs[i * width + j + 1] {
            ops.push(Line::Removed(old[i]));
            i += 1;
        } else {
            ops.push(Line::Added(new[j]));
            j += 1;
        }
    }
    ops.extend(old[i..].iter().map(|l| Line::Removed(*l)));
    ops.extend(new[j..].iter().map(|l| Line::Added(*l)));
    ops
}

/// Unified diff with `context` lines around each change, or `None` when the
/// texts are identical.
pub fn unified(old_name: &str, new_name: &str, old: &str, new: &str, context: usize) -> Option<String> {
    if old == new {
        return None;
    }
    let ops = diff_lines(old, new);

    // line numbers consumed before each op
    let mut old_pos = Vec::with_capacity(ops.len() + 1);
    let mut new_pos = Vec::with_capacity(ops.len() + 1);
    let (mut o, mut n) = (0usize, 0usize);
    for op in &ops {
        old_pos.push(o);
        new_pos.push(n);
        match op {
            Line::Same(_) => {
                o += 1;
                n += 1;
            }
            Line::Removed(_) => o += 1,
            Line::Added(_) => n += 1,
        }
    }
    old_pos.push(o);
    new_pos.push(n);

    let mut hunks: Vec<(usize, usize)> = Vec::new();
    for (idx, op) in ops.iter().enumerate() {
        if matches!(op, Line::Same(_)) {
            continue;
        }
        let start = idx.saturating_sub(context);
        let end = (idx + 1 + context).min(ops.len());
        match hunks.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => hunks.push((start, end)),
        }
    }

    let mut out = String::new();
    let _ = writeln!(out, "--- {}", old_name);
    let _ = writeln!(out, "+++ {}", new_name);
    for (start, end) in hunks {
        let _ = writeln!(
            out,
            "@@ -{},{} +{},{} @@",
            old_pos[start] + 1,
            old_pos[end] - old_pos[start],
            new_pos[start] + 1,
            new_pos[end] - new_pos[start]
        );
        for op in &ops[start..end] {
            let _ = match op {
                Line::Same(l) => writeln!(out, " {}", l),
                Line::Removed(l) => writeln!(out, "-{}", l),
                Line::Added(l) => writeln!(out, "+{}", l),
            };
        }
    }

    // Texts differing only in a trailing newline have no line changes.
    if !out.contains("\n@@") {
        out.push_str("\\ files differ only in trailing newline\n");
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical() {
        assert!(unified("a", "b", "x\ny\n", "x\ny\n", 3).is_none());
    }

    #[test]
    fn test_single_change() {
        let ops = diff_lines("a\nb\nc\n", "a\nB\nc\n");
        assert_eq!(
            ops,
            vec![
                Line::Same("a"),
                Line::Removed("b"),
                Line::Added("B"),
                Line::Same("c"),
            ]
        );
    }

    #[test]
    fn test_unified_hunk_header() {
        let old = "1\n2\n3\n4\n5\n6\n7\n8\n9\n";
        let new = "1\n2\n3\n4\nfive\n6\n7\n8\n9\n";
        let diff = unified("grub.cfg", "generated", old, new, 1).unwrap();
        assert_eq!(
            diff,
            "--- grub.cfg\n+++ generated\n@@ -4,3 +4,3 @@\n 4\n-5\n+five\n 6\n"
        );
    }

    #[test]
    fn test_append_and_remove() {
        let diff = unified("old", "new", "a\n", "a\nb\n", 3).unwrap();
        assert!(diff.contains("+b\n"));
        let diff = unified("old", "new", "a\nb\n", "b\n", 3).unwrap();
        assert!(diff.contains("-a\n"));
    }

    #[test]
    fn test_trailing_newline_only() {
        let diff = unified("old", "new", "a\n", "a", 3).unwrap();
        assert!(diff.contains("trailing newline"));
    }
}

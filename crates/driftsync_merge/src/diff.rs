//! Three-way line merge.

/// Result of a three-way merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The edits did not overlap; this is the combined content.
    Merged(String),
    /// The edits overlap and cannot be combined automatically.
    Conflict,
}

impl MergeOutcome {
    /// Returns the merged content, or `None` on conflict.
    pub fn merged(self) -> Option<String> {
        match self {
            MergeOutcome::Merged(content) => Some(content),
            MergeOutcome::Conflict => None,
        }
    }

    /// Returns true if the merge produced content.
    pub fn is_merged(&self) -> bool {
        matches!(self, MergeOutcome::Merged(_))
    }
}

/// The lines one side changed, expressed against the ancestor.
///
/// `start..end` is the replaced line range in the ancestor; `replacement`
/// is the side's lines for that range. A pure insertion has `start == end`.
struct EditRegion<'a> {
    start: usize,
    end: usize,
    replacement: &'a [&'a str],
}

/// Merges two divergent edits of `base`.
///
/// Contents are compared line by line. Each side's edit is reduced to a
/// single replaced region by trimming the common line prefix and suffix
/// against the ancestor. If the two regions do not overlap, both edits are
/// spliced into the ancestor; otherwise the merge reports a conflict.
/// Two insertions at the same point are ambiguous and also conflict.
pub fn merge3(base: &str, local: &str, remote: &str) -> MergeOutcome {
    // One side untouched (or both sides identical): nothing to combine.
    if local == base {
        return MergeOutcome::Merged(remote.to_string());
    }
    if remote == base || local == remote {
        return MergeOutcome::Merged(local.to_string());
    }

    let base_lines = split_lines(base);
    let local_lines = split_lines(local);
    let remote_lines = split_lines(remote);

    let ours = edit_region(&base_lines, &local_lines);
    let theirs = edit_region(&base_lines, &remote_lines);

    let (first, second) = if ours.end <= theirs.start {
        (&ours, &theirs)
    } else if theirs.end <= ours.start {
        (&theirs, &ours)
    } else {
        return MergeOutcome::Conflict;
    };

    // Both inserting at the same line: order is ambiguous.
    if first.start == first.end && second.start == second.end && first.start == second.start {
        return MergeOutcome::Conflict;
    }

    let mut merged = String::with_capacity(base.len().max(local.len()).max(remote.len()));
    for line in &base_lines[..first.start] {
        merged.push_str(line);
    }
    for line in first.replacement {
        merged.push_str(line);
    }
    for line in &base_lines[first.end..second.start] {
        merged.push_str(line);
    }
    for line in second.replacement {
        merged.push_str(line);
    }
    for line in &base_lines[second.end..] {
        merged.push_str(line);
    }
    MergeOutcome::Merged(merged)
}

/// Splits content into lines that keep their terminators, so concatenating
/// the pieces reproduces the input byte for byte.
fn split_lines(content: &str) -> Vec<&str> {
    content.split_inclusive('\n').collect()
}

fn edit_region<'a>(base: &[&str], side: &'a [&'a str]) -> EditRegion<'a> {
    let max_prefix = base.len().min(side.len());
    let mut prefix = 0;
    while prefix < max_prefix && base[prefix] == side[prefix] {
        prefix += 1;
    }

    let max_suffix = max_prefix - prefix;
    let mut suffix = 0;
    while suffix < max_suffix && base[base.len() - 1 - suffix] == side[side.len() - 1 - suffix] {
        suffix += 1;
    }

    EditRegion {
        start: prefix,
        end: base.len() - suffix,
        replacement: &side[prefix..side.len() - suffix],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn one_sided_edit_merges() {
        let outcome = merge3("A\nB\n", "A\nX\n", "A\nB\n");
        assert_eq!(outcome, MergeOutcome::Merged("A\nX\n".to_string()));
    }

    #[test]
    fn overlapping_edits_conflict() {
        let outcome = merge3("A\nB\n", "A\nL\n", "A\nR\n");
        assert_eq!(outcome, MergeOutcome::Conflict);
    }

    #[test]
    fn disjoint_edits_combine() {
        let base = "one\ntwo\nthree\nfour\n";
        let local = "ONE\ntwo\nthree\nfour\n";
        let remote = "one\ntwo\nthree\nFOUR\n";
        let outcome = merge3(base, local, remote);
        assert_eq!(
            outcome,
            MergeOutcome::Merged("ONE\ntwo\nthree\nFOUR\n".to_string())
        );
    }

    #[test]
    fn identical_edits_merge() {
        let outcome = merge3("A\n", "A\nB\n", "A\nB\n");
        assert_eq!(outcome, MergeOutcome::Merged("A\nB\n".to_string()));
    }

    #[test]
    fn local_append_with_untouched_remote() {
        let outcome = merge3("A\n", "A\nB\n", "A\n");
        assert_eq!(outcome, MergeOutcome::Merged("A\nB\n".to_string()));
    }

    #[test]
    fn insert_and_distant_change_combine() {
        let base = "a\nb\nc\nd\ne\n";
        // Insert after the first line.
        let local = "a\nNEW\nb\nc\nd\ne\n";
        // Change the last line.
        let remote = "a\nb\nc\nd\nE\n";
        let outcome = merge3(base, local, remote);
        assert_eq!(
            outcome,
            MergeOutcome::Merged("a\nNEW\nb\nc\nd\nE\n".to_string())
        );
    }

    #[test]
    fn insertions_at_same_point_conflict() {
        let base = "a\nz\n";
        let local = "a\nL\nz\n";
        let remote = "a\nR\nz\n";
        assert_eq!(merge3(base, local, remote), MergeOutcome::Conflict);
    }

    #[test]
    fn deletion_and_distant_edit_combine() {
        let base = "a\nb\nc\nd\n";
        let local = "a\nc\nd\n"; // deleted b
        let remote = "a\nb\nc\nD\n"; // changed d
        let outcome = merge3(base, local, remote);
        assert_eq!(outcome, MergeOutcome::Merged("a\nc\nD\n".to_string()));
    }

    #[test]
    fn missing_trailing_newline_is_preserved() {
        let base = "a\nb";
        let local = "a\nb";
        let remote = "a\nb2";
        assert_eq!(
            merge3(base, local, remote),
            MergeOutcome::Merged("a\nb2".to_string())
        );
    }

    proptest! {
        #[test]
        fn untouched_local_yields_remote(
            base in "([a-c]\n){0,8}",
            remote in "([a-c]\n){0,8}",
        ) {
            let outcome = merge3(&base, &base, &remote);
            prop_assert_eq!(outcome, MergeOutcome::Merged(remote));
        }

        #[test]
        fn merge_never_panics(
            base in "([a-d]\n){0,6}",
            local in "([a-d]\n){0,6}",
            remote in "([a-d]\n){0,6}",
        ) {
            let _ = merge3(&base, &local, &remote);
        }
    }
}

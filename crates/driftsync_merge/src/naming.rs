//! Deterministic conflict-copy naming.

/// How many characters of the device identity go into the marker.
const DEVICE_TAG_LEN: usize = 8;

/// Derives the store key for a conflict copy of `key` authored by `device`.
///
/// The marker `conflict-<device-tag>` is inserted before the file's
/// extension, or appended when the name has none:
///
/// ```
/// use driftsync_merge::conflict_key;
///
/// assert_eq!(
///     conflict_key("docs/notes.txt", "a1b2c3d4e5f6"),
///     "docs/notes.conflict-a1b2c3d4.txt"
/// );
/// assert_eq!(
///     conflict_key("docs/LICENSE", "a1b2c3d4e5f6"),
///     "docs/LICENSE.conflict-a1b2c3d4"
/// );
/// ```
pub fn conflict_key(key: &str, device: &str) -> String {
    let tag: String = device.chars().take(DEVICE_TAG_LEN).collect();
    let (dir, name) = match key.rfind('/') {
        Some(idx) => key.split_at(idx + 1),
        None => ("", key),
    };
    // A leading dot is a hidden-file prefix, not an extension separator.
    match name.rfind('.').filter(|&idx| idx > 0) {
        Some(idx) => {
            let (stem, ext) = name.split_at(idx);
            format!("{dir}{stem}.conflict-{tag}{ext}")
        }
        None => format!("{dir}{name}.conflict-{tag}"),
    }
}

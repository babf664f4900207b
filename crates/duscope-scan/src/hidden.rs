//! Hidden-entry predicate.

use std::fs::DirEntry;

/// Check whether a name marks a hidden entry on POSIX-style filesystems.
pub fn is_hidden_name(name: &str) -> bool {
    name.starts_with('.')
}

/// Check whether a directory entry is hidden.
///
/// Dot-names are hidden everywhere. On Windows the hidden and system
/// attribute bits also count.
pub fn is_hidden(entry: &DirEntry) -> bool {
    if is_hidden_name(&entry.file_name().to_string_lossy()) {
        return true;
    }
    has_hidden_attribute(entry)
}

#[cfg(windows)]
fn has_hidden_attribute(entry: &DirEntry) -> bool {
    use std::os::windows::fs::MetadataExt;

    const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
    const FILE_ATTRIBUTE_SYSTEM: u32 = 0x4;

    entry
        .metadata()
        .map(|m| m.file_attributes() & (FILE_ATTRIBUTE_HIDDEN | FILE_ATTRIBUTE_SYSTEM) != 0)
        .unwrap_or(false)
}

#[cfg(not(windows))]
fn has_hidden_attribute(_entry: &DirEntry) -> bool {
    false
}

//! Folder string normalization.
//!
//! Prefixes are stored without a leading separator and with exactly one
//! trailing separator (`a/b/`); the root is the empty string. Any folder
//! string a caller passes in goes through [`normalize_folder`] before it is
//! compared against the catalog.

/// Split a path into its normalized components.
///
/// Both `/` and `\` separate components. Empty and `.` components are
/// dropped and `..` removes the previous component. Returns `None` if the
/// path escapes the root or contains a null byte.
///
/// # Examples
///
/// ```
/// use snapshelf_catalog::path::components;
/// assert_eq!(components("/a//b/./c/").unwrap(), vec!["a", "b", "c"]);
/// assert_eq!(components("a/../b").unwrap(), vec!["b"]);
/// assert!(components("../etc").is_none());
/// ```
pub fn components(path: &str) -> Option<Vec<&str>> {
    if path.contains('\0') {
        return None;
    }
    let mut components = Vec::new();
    for component in path.split(['/', '\\']) {
        match component {
            "" | "." => {},
            ".." => {
                components.pop()?;
            },
            normal => components.push(normal),
        }
    }
    Some(components)
}

/// Normalize a folder string into the stored prefix form.
///
/// # Examples
///
/// ```
/// use snapshelf_catalog::path::normalize_folder;
/// assert_eq!(normalize_folder("/home/user").as_deref(), Some("home/user/"));
/// assert_eq!(normalize_folder("home\\user\\").as_deref(), Some("home/user/"));
/// assert_eq!(normalize_folder("/").as_deref(), Some(""));
/// assert_eq!(normalize_folder("a/../.."), None);
/// ```
pub fn normalize_folder(folder: &str) -> Option<String> {
    let components = components(folder)?;
    Some(components.iter().fold(String::new(), |mut prefix, component| {
        prefix.push_str(component);
        prefix.push('/');
        prefix
    }))
}

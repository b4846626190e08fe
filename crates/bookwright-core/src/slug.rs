//! Filesystem-safe names for units, sections and examples.

/// Fallback used when a name has no alphanumeric characters at all.
pub const EMPTY_SLUG: &str = "untitled";

/// Turn a free-form title into a directory-safe slug.
///
/// Lower-cases ASCII letters, collapses runs of spaces, hyphens and
/// underscores into a single `_`, and drops every other non-alphanumeric
/// character. Separators never lead or trail the result.
///
/// ```
/// use bookwright_core::slug::slugify;
/// assert_eq!(slugify("Working with Arrays - Part 2"), "working_with_arrays_part_2");
/// ```
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_sep = false;

    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(c.to_ascii_lowercase());
        } else if c == ' ' || c == '-' || c == '_' {
            pending_sep = true;
        }
    }

    if out.is_empty() {
        EMPTY_SLUG.to_string()
    } else {
        out
    }
}

/// Turn a snake_case example name into a display title: `add_two` -> `Add Two`.
pub fn title_case(name: &str) -> String {
    name.split(['_', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

use super::BindingSource;

/// Key characters are ASCII letters; anything else terminates a key.
pub(super) fn is_key_char(ch: char) -> bool {
    ch.is_ascii_alphabetic()
}

/// Classify a sigil character, if it is one.
pub(super) fn sigil_source(ch: char) -> Option<BindingSource> {
    match ch {
        '@' => Some(BindingSource::Model),
        '#' => Some(BindingSource::Argument),
        _ => None,
    }
}

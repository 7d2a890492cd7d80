//! Identifier sanitization for map keys and bus-topic segments.

/// Rewrite `raw` so it is safe to use as a registry key and as a single
/// MQTT topic segment.
///
/// `/`, `#` and `+` are spelled out, `-` becomes `_`, and any leading or
/// trailing `_` left over is trimmed.
#[must_use]
pub fn sanitize(raw: &str) -> String {
    let escaped = raw
        .replace('/', "_slash_")
        .replace('#', "_hash_")
        .replace('+', "_plus_")
        .replace('-', "_");
    escaped.trim_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_leave_safe_names_untouched() {
        assert_eq!(sanitize("blind1"), "blind1");
    }

    #[test]
    fn should_replace_dashes() {
        assert_eq!(sanitize("udin-8r"), "udin_8r");
    }

    #[test]
    fn should_escape_topic_wildcards_and_separators() {
        let key = sanitize("a/b#c+d");
        assert_eq!(key, "a_slash_b_hash_c_plus_d");
        assert!(!key.contains(['/', '#', '+', '-']));
    }

    #[test]
    fn should_trim_leading_and_trailing_separators() {
        assert_eq!(sanitize("/ttyusb0"), "slash_ttyusb0");
        assert_eq!(sanitize("-udin-"), "udin");
        assert_eq!(sanitize("serial/by-id/usb-1/"), "serial_slash_by_id_slash_usb_1_slash");
    }

    #[test]
    fn should_return_empty_for_only_separators() {
        assert_eq!(sanitize("--"), "");
    }
}

//! Shell-style environment variable expansion for raw configuration text.
//!
//! Supports `$NAME` and `${NAME}`. Unset variables expand to the empty
//! string, so a reference to a missing variable never fails the load.

/// Expand `$NAME` / `${NAME}` references using the process environment.
pub fn expand_env(input: &str) -> String {
    expand_with(input, |name| {
        if name.is_empty() || name.contains(['=', '\0']) {
            return None;
        }
        std::env::var(name).ok()
    })
}

/// Expand references using a caller-supplied lookup.
///
/// Rules:
/// - `NAME` is `[A-Za-z0-9_]+`, or a single special character
///   (`*#$@!?-` or a digit).
/// - `${}` and an unterminated `${` are dropped from the output.
/// - A `$` not followed by a name is kept as-is.
pub fn expand_with<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        match shell_name(after) {
            Reference::Name(name, width) => {
                if let Some(value) = lookup(name) {
                    out.push_str(&value);
                }
                rest = &after[width..];
            }
            Reference::Invalid(width) => {
                rest = &after[width..];
            }
            Reference::None => {
                out.push('$');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

enum Reference<'a> {
    /// A name and the number of bytes it occupied after the `$`.
    Name(&'a str, usize),
    /// Bad syntax; skip this many bytes after the `$`.
    Invalid(usize),
    /// Not a reference; the `$` is literal.
    None,
}

fn shell_name(s: &str) -> Reference<'_> {
    let bytes = s.as_bytes();
    let Some(&first) = bytes.first() else {
        return Reference::None;
    };

    if first == b'{' {
        if bytes.len() > 2 && is_special(bytes[1]) && bytes[2] == b'}' {
            return Reference::Name(&s[1..2], 3);
        }
        return match s.find('}') {
            Some(1) => Reference::Invalid(2),
            Some(end) => Reference::Name(&s[1..end], end + 1),
            None => Reference::Invalid(1),
        };
    }

    if is_special(first) {
        return Reference::Name(&s[..1], 1);
    }

    let len = bytes.iter().take_while(|b| is_name_byte(**b)).count();
    if len == 0 {
        Reference::None
    } else {
        Reference::Name(&s[..len], len)
    }
}

fn is_special(b: u8) -> bool {
    matches!(b, b'*' | b'#' | b'$' | b'@' | b'!' | b'?' | b'-') || b.is_ascii_digit()
}

fn is_name_byte(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphanumeric()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(name: &str) -> Option<String> {
        match name {
            "PORT" => Some("2000".to_string()),
            "USER_NAME" => Some("panel".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_expand_plain_and_braced() {
        assert_eq!(expand_with("port: $PORT", env), "port: 2000");
        assert_eq!(expand_with("port: ${PORT}", env), "port: 2000");
        assert_eq!(expand_with("${USER_NAME}-svc", env), "panel-svc");
    }

    #[test]
    fn test_unset_expands_to_empty() {
        assert_eq!(expand_with("data: $MISSING/x", env), "data: /x");
        assert_eq!(expand_with("data: ${MISSING}", env), "data: ");
    }

    #[test]
    fn test_name_stops_at_non_name_byte() {
        assert_eq!(expand_with("$USER_NAME.local", env), "panel.local");
    }

    #[test]
    fn test_lone_dollar_is_literal() {
        assert_eq!(expand_with("cost: 5$", env), "cost: 5$");
        assert_eq!(expand_with("a $ b", env), "a $ b");
    }

    #[test]
    fn test_bad_brace_syntax_is_dropped() {
        assert_eq!(expand_with("x${}y", env), "xy");
        assert_eq!(expand_with("x${PORT", env), "xPORT");
    }

    #[test]
    fn test_special_single_char_names() {
        let lookup = |name: &str| (name == "1").then(|| "one".to_string());
        assert_eq!(expand_with("$1 ${1} $?", lookup), "one one ");
    }

    #[test]
    fn test_no_references_is_unchanged() {
        let text = "debug: true\npanel:\n  port: 1334\n";
        assert_eq!(expand_with(text, env), text);
    }

    #[test]
    fn test_multibyte_text_survives() {
        assert_eq!(expand_with("név: ${USER_NAME} ✓", env), "név: panel ✓");
    }
}

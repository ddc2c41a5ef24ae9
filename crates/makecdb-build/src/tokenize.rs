//! Shell-like splitting of a command line into arguments.
//!
//! Only double quotes and backslash escapes are understood. Single quotes,
//! variable expansion and the rest of the shell grammar are not.

/// Split a command line into argument tokens.
///
/// Unquoted whitespace separates tokens, `"` toggles a quoted region in which
/// whitespace is literal, and a backslash copies the next character verbatim
/// both inside and outside quotes. Quoted and unquoted segments that touch
/// form a single token, so `-I"foo bar"` is the one token `-Ifoo bar`.
///
/// Malformed input never fails: an unterminated quote ends the last token at
/// the end of input, and a trailing lone backslash is dropped.
pub fn split_command(cmd: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    // Distinguishes an explicit `""` from no token at all.
    let mut in_token = false;
    let mut quoted = false;

    let mut chars = cmd.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                    in_token = true;
                }
            }
            '"' => {
                quoted = !quoted;
                in_token = true;
            }
            c if !quoted && c.is_whitespace() => {
                if in_token {
                    args.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if in_token {
        args.push(current);
    }

    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert!(split_command("").is_empty());
        assert!(split_command("   \t ").is_empty());
    }

    #[test]
    fn test_plain_tokens_round_trip() {
        let tokens = vec!["gcc", "-O2", "-DNDEBUG", "-c", "src/main.c", "-o", "main.o"];
        let joined = tokens.join(" ");
        assert_eq!(split_command(&joined), tokens);
    }

    #[test]
    fn test_repeated_whitespace() {
        assert_eq!(split_command("  cc   -c\tx.c  "), vec!["cc", "-c", "x.c"]);
    }

    #[test]
    fn test_quote_attached_to_flag() {
        assert_eq!(
            split_command(r#"gcc -I"foo bar" -c x.c"#),
            vec!["gcc", "-Ifoo bar", "-c", "x.c"]
        );
    }

    #[test]
    fn test_quote_after_space() {
        assert_eq!(
            split_command(r#"gcc -I "foo bar" -c x.c"#),
            vec!["gcc", "-I", "foo bar", "-c", "x.c"]
        );
    }

    #[test]
    fn test_adjacent_segments_concatenate() {
        assert_eq!(split_command(r#"abc"def ghi"jkl"#), vec!["abcdef ghijkl"]);
    }

    #[test]
    fn test_backslash_escapes() {
        assert_eq!(split_command(r"foo\ bar baz"), vec!["foo bar", "baz"]);
        assert_eq!(split_command(r"a\\b"), vec![r"a\b"]);
        assert_eq!(split_command(r#""say \"hi\"""#), vec![r#"say "hi""#]);
    }

    #[test]
    fn test_empty_quoted_token() {
        assert_eq!(split_command(r#"cc "" x.c"#), vec!["cc", "", "x.c"]);
    }

    #[test]
    fn test_unterminated_quote() {
        assert_eq!(
            split_command(r#"cc -DMSG="hello world"#),
            vec!["cc", "-DMSG=hello world"]
        );
    }

    #[test]
    fn test_trailing_backslash_dropped() {
        assert_eq!(split_command("cc x.c \\"), vec!["cc", "x.c"]);
        assert_eq!(split_command("cc x.c\\"), vec!["cc", "x.c"]);
    }
}

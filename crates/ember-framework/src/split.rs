/// Shell-like argument splitting for command text.
///
/// Handles:
/// - Whitespace-separated arguments
/// - Quoted strings (single and double quotes)
/// - Backslash escapes inside double quotes
///
/// Total over any input: an unclosed quote runs to the end of the text, and a
/// trailing backslash is dropped.
pub fn split_args(input: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut escape_next = false;
    // Set once a quote opens, so `""` still yields an (empty) argument.
    let mut quoted = false;

    for ch in input.chars() {
        if escape_next {
            current.push(ch);
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_double_quote => {
                escape_next = true;
            }
            '\'' if !in_double_quote => {
                in_single_quote = !in_single_quote;
                quoted = true;
            }
            '"' if !in_single_quote => {
                in_double_quote = !in_double_quote;
                quoted = true;
            }
            c if c.is_whitespace() && !in_single_quote && !in_double_quote => {
                if !current.is_empty() || quoted {
                    args.push(std::mem::take(&mut current));
                }
                quoted = false;
            }
            _ => {
                current.push(ch);
            }
        }
    }

    if !current.is_empty() || quoted {
        args.push(current);
    }

    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_simple() {
        let args = split_args("echo hello world");
        assert_eq!(args, vec!["echo", "hello", "world"]);
    }

    #[test]
    fn test_split_quoted() {
        let args = split_args(r#"echo "hello world" test"#);
        assert_eq!(args, vec!["echo", "hello world", "test"]);
    }

    #[test]
    fn test_split_single_quoted() {
        let args = split_args("echo 'hello world' test");
        assert_eq!(args, vec!["echo", "hello world", "test"]);
    }

    #[test]
    fn test_split_mixed_quotes() {
        let args = split_args(r#"cmd "double's quote" 'single"s quote'"#);
        assert_eq!(args, vec!["cmd", "double's quote", r#"single"s quote"#]);
    }

    #[test]
    fn test_split_escape_in_double_quotes() {
        let args = split_args(r#"say "a \"b\" c""#);
        assert_eq!(args, vec!["say", r#"a "b" c"#]);
    }

    #[test]
    fn test_split_empty_quotes_yield_empty_arg() {
        let args = split_args(r#"set name """#);
        assert_eq!(args, vec!["set", "name", ""]);
    }

    #[test]
    fn test_split_unclosed_quote_runs_to_end() {
        let args = split_args("note 'unfinished thought here");
        assert_eq!(args, vec!["note", "unfinished thought here"]);
    }

    #[test]
    fn test_split_collapses_whitespace() {
        let args = split_args("  a \t b\n c  ");
        assert_eq!(args, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_split_whitespace_only() {
        assert!(split_args("").is_empty());
        assert!(split_args("   \t  ").is_empty());
    }
}

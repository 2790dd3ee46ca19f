// Shell-argument quoting discipline. Every dynamic string (file path,
// pattern, column name, filter value) that becomes part of the
// compiled command must go through `ShellArg::Quoted` — the type
// distinguishes values that still need escaping from static flags that
// are trusted by construction, so accidentally concatenating raw user
// data is a compile error, not a silent vulnerability.

use crate::error::{CompileError, Result};

/// One token of a shell command line.
#[derive(Debug, Clone)]
pub enum ShellArg {
    /// A static flag or subcommand name, written by this crate, never
    /// derived from plan data (e.g. `"-F"`, `"awk"`).
    Flag(&'static str),
    /// Dynamic content (a pattern, path, program body, column name)
    /// that must be escaped before it reaches the shell.
    Quoted(String),
    /// A raw, unquoted fragment inserted verbatim — used only for
    /// shell metacharacters this crate itself emits, such as `|` and
    /// `-P8`. Never constructed from plan data.
    Raw(String),
}

/// POSIX shell single-quote escape: wrap in `'...'`, replacing every
/// embedded `'` with `'\''` (close quote, escaped literal quote, reopen
/// quote). Safe for every byte a dynamic field can contain, including
/// `'`, `"`, `$`, `;`, `|`, `` ` ``, newlines, and spaces — none of it is
/// interpreted by the shell inside single quotes except `'` itself.
pub fn single_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for ch in s.chars() {
        if ch == '\'' {
            out.push_str("'\\''");
        } else {
            out.push(ch);
        }
    }
    out.push('\'');
    out
}

/// Escape `s` for embedding inside an AWK double-quoted string literal.
pub fn awk_string_literal(s: &str) -> String {
    escape_c_like(s)
}

/// Escape `s` for embedding inside a jq double-quoted string literal.
pub fn jq_string_literal(s: &str) -> String {
    escape_c_like(s)
}

fn escape_c_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

/// A static flag token must never itself carry shell metacharacters —
/// if it does, something in this crate (not a caller) built it wrong.
/// Reaching this is the one place a `CompileError::Quoting` can surface.
fn assert_inert_flag(flag: &str) -> Result<()> {
    const FORBIDDEN: &[char] = &['\'', '"', '$', ';', '|', '`', '\n', ' ', '&', '<', '>'];
    if flag.chars().any(|c| FORBIDDEN.contains(&c)) {
        return Err(CompileError::Quoting(format!(
            "internal flag token '{flag}' contains an unescaped shell metacharacter"
        )));
    }
    Ok(())
}

/// Render a sequence of tokens into a single space-joined shell
/// command fragment.
pub fn render(args: &[ShellArg]) -> Result<String> {
    let mut parts = Vec::with_capacity(args.len());
    for arg in args {
        match arg {
            ShellArg::Flag(f) => {
                assert_inert_flag(f)?;
                parts.push((*f).to_string());
            }
            ShellArg::Quoted(s) => parts.push(single_quote(s)),
            ShellArg::Raw(s) => parts.push(s.clone()),
        }
    }
    Ok(parts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_quote_escapes_embedded_quote() {
        assert_eq!(single_quote("it's"), "'it'\\''s'");
    }

    #[test]
    fn single_quote_is_inert_for_shell_metacharacters() {
        for dangerous in ["$(rm -rf /)", "`id`", "a;b", "a|b", "a\"b", "a\nb", "a b"] {
            let quoted = single_quote(dangerous);
            // Every character outside a `'\''` split stays literal —
            // the only special char inside single quotes is `'` itself.
            assert!(quoted.starts_with('\''));
            assert!(quoted.ends_with('\''));
        }
    }

    #[test]
    fn render_rejects_unsafe_flag() {
        let args = vec![ShellArg::Flag("-F"), ShellArg::Flag("bad flag")];
        assert!(render(&args).is_err());
    }

    #[test]
    fn render_joins_tokens_with_spaces() {
        let args = vec![
            ShellArg::Flag("grep"),
            ShellArg::Flag("-F"),
            ShellArg::Quoted("ERROR".into()),
            ShellArg::Quoted("app.log".into()),
        ];
        assert_eq!(render(&args).unwrap(), "grep -F 'ERROR' 'app.log'");
    }
}

// grep-family emitter. Handles `LineFilter` nodes with no field-aware
// operation downstream — pure line predicates. Prefers ripgrep when
// available; multiple consecutive `LineFilter`s become a pipe chain,
// never a single fused invocation, since grep has no way to express a
// conjunction across whole lines.

use crate::assemble::quote::{render, ShellArg};
use crate::backend::{Fragment, StreamFormat};
use crate::error::Result;
use crate::plan::LineOp;
use crate::registry::{GrepInfo, GrepVariant};

/// Emit one grep/ripgrep invocation for a single `LineFilter` node.
///
/// `format` is threaded through unchanged: grep is a pure line filter, so
/// whatever structure (or lack of it) the stream had going in, it still
/// has coming out — ndjson records stay ndjson, an already-tsv stream
/// stays tsv, purely by virtue of grep never touching a line's content.
pub fn emit_line_filter(kind: LineOp, pattern: &str, grep: &GrepInfo, format: StreamFormat) -> Result<Fragment> {
    let bin: &'static str = match grep.variant {
        GrepVariant::Rg => "rg",
        GrepVariant::Grep => "grep",
    };

    let mut args = vec![ShellArg::Flag(bin)];
    if matches!(grep.variant, GrepVariant::Rg) {
        args.push(ShellArg::Flag("--no-filename"));
    }

    // Ripgrep's default mode is already extended regex with no flag
    // needed (and no `-E`/`--extended-regexp` flag exists for it at
    // all); only GNU/BSD grep needs `-E` spelled out.
    let is_rg = matches!(grep.variant, GrepVariant::Rg);
    let final_pattern = match kind {
        LineOp::Contains => {
            args.push(ShellArg::Flag("-F"));
            pattern.to_string()
        }
        LineOp::Regex => {
            if !is_rg {
                args.push(ShellArg::Flag("-E"));
            }
            pattern.to_string()
        }
        LineOp::StartsWith => {
            if !is_rg {
                args.push(ShellArg::Flag("-E"));
            }
            format!("^{pattern}")
        }
        LineOp::EndsWith => {
            if !is_rg {
                args.push(ShellArg::Flag("-E"));
            }
            format!("{pattern}$")
        }
    };
    args.push(ShellArg::Quoted(final_pattern));

    let command = render(&args)?;
    Ok(Fragment::new(command, format.clone(), format))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grep_info() -> GrepInfo {
        GrepInfo {
            path: "grep".into(),
            variant: GrepVariant::Grep,
            supports_fixed_strings: true,
            supports_extended_regex: true,
        }
    }

    fn rg_info() -> GrepInfo {
        GrepInfo {
            path: "rg".into(),
            variant: GrepVariant::Rg,
            supports_fixed_strings: true,
            supports_extended_regex: true,
        }
    }

    #[test]
    fn contains_uses_fixed_string_mode() {
        let frag = emit_line_filter(LineOp::Contains, "ERROR", &grep_info(), StreamFormat::Raw).unwrap();
        assert_eq!(frag.command, "grep -F 'ERROR'");
    }

    #[test]
    fn rg_adds_no_filename() {
        let frag = emit_line_filter(LineOp::Contains, "ERROR", &rg_info(), StreamFormat::Raw).unwrap();
        assert_eq!(frag.command, "rg --no-filename -F 'ERROR'");
    }

    #[test]
    fn startswith_anchors_pattern() {
        let frag = emit_line_filter(LineOp::StartsWith, "WARN", &grep_info(), StreamFormat::Raw).unwrap();
        assert_eq!(frag.command, "grep -E '^WARN'");
    }

    #[test]
    fn endswith_anchors_pattern() {
        let frag = emit_line_filter(LineOp::EndsWith, "done", &grep_info(), StreamFormat::Raw).unwrap();
        assert_eq!(frag.command, "grep -E 'done$'");
    }

    #[test]
    fn pattern_with_shell_metacharacters_is_quoted() {
        let frag =
            emit_line_filter(LineOp::Contains, "a; rm -rf $HOME", &grep_info(), StreamFormat::Raw).unwrap();
        assert_eq!(frag.command, "grep -F 'a; rm -rf $HOME'");
    }

    #[test]
    fn rg_regex_omits_dash_e() {
        // ripgrep has no -E/--extended-regexp flag; its default mode is
        // already an extended-like regex.
        let frag = emit_line_filter(LineOp::Regex, "a;b|c$d", &rg_info(), StreamFormat::Raw).unwrap();
        assert_eq!(frag.command, "rg --no-filename 'a;b|c$d'");
    }

    #[test]
    fn rg_startswith_anchors_without_dash_e() {
        let frag = emit_line_filter(LineOp::StartsWith, "WARN", &rg_info(), StreamFormat::Raw).unwrap();
        assert_eq!(frag.command, "rg --no-filename '^WARN'");
    }

    #[test]
    fn rg_endswith_anchors_without_dash_e() {
        let frag = emit_line_filter(LineOp::EndsWith, "done", &rg_info(), StreamFormat::Raw).unwrap();
        assert_eq!(frag.command, "rg --no-filename 'done$'");
    }

    #[test]
    fn format_passes_through_unchanged() {
        let format = StreamFormat::Ndjson;
        let frag = emit_line_filter(LineOp::Contains, "x", &grep_info(), format.clone()).unwrap();
        assert_eq!(frag.input, format.clone());
        assert_eq!(frag.output, format);
    }
}

// sort-family emitter. Handles `Sort`, `Distinct`, and `Limit`.

use crate::assemble::quote::{render, ShellArg};
use crate::backend::{Fragment, StreamFormat};
use crate::error::Result;
use crate::registry::SortInfo;

fn parallel_args(sort_info: &SortInfo, cpus: usize) -> Vec<ShellArg> {
    if sort_info.supports_parallel {
        vec![
            ShellArg::Raw(format!("--parallel={cpus}")),
            ShellArg::Flag("-S"),
            ShellArg::Raw("80%".into()),
        ]
    } else {
        Vec::new()
    }
}

/// `sort -t<delim> -k<pos>[,<pos>][n][r] [--parallel=N -S 80%] -T <tmpdir>`
///
/// `delim` and `columns` are taken from the upstream fragment's output
/// format, so sort never disagrees with whatever AWK or jq already chose.
pub fn emit_sort(
    field_pos: usize,
    descending: bool,
    numeric: bool,
    delim: char,
    columns: Vec<String>,
    sort_info: &SortInfo,
    tmpdir: &str,
    cpus: usize,
) -> Result<Fragment> {
    // `-t<delim>` must travel as a single shell word even when `delim`
    // is whitespace (a tab, after a jq-to-tsv conversion) — an unquoted
    // tab would be split on by the shell's IFS and silently swallow the
    // delimiter. Quoting unconditionally is the spec's "literal tab
    // inside single quotes" fallback, applied to every delimiter.
    let mut args = vec![ShellArg::Flag("sort"), ShellArg::Quoted(format!("-t{delim}"))];

    // Order matters: spec §8 scenario 4's literal expected output is
    // `-k2,2rn` (descending before numeric), so `r` is pushed first.
    let mut key = format!("-k{field_pos},{field_pos}");
    if descending {
        key.push('r');
    }
    if numeric {
        key.push('n');
    }
    args.push(ShellArg::Raw(key));
    args.extend(parallel_args(sort_info, cpus));
    args.push(ShellArg::Flag("-T"));
    args.push(ShellArg::Quoted(tmpdir.to_string()));

    let command = render(&args)?;
    let format = StreamFormat::Tsv { delim, columns };
    Ok(Fragment::new(command, format.clone(), format))
}

/// `sort -u [--parallel=N -S 80%] -T <tmpdir>` — used when `Distinct` can
/// stand alone (no subsequent `Sort`). `-u` compares whole lines, so no
/// `-t`/`-k` is needed regardless of the upstream format.
pub fn emit_distinct_sort(format: StreamFormat, sort_info: &SortInfo, tmpdir: &str, cpus: usize) -> Result<Fragment> {
    let mut args = vec![ShellArg::Flag("sort"), ShellArg::Flag("-u")];
    args.extend(parallel_args(sort_info, cpus));
    args.push(ShellArg::Flag("-T"));
    args.push(ShellArg::Quoted(tmpdir.to_string()));

    let command = render(&args)?;
    Ok(Fragment::new(command, format.clone(), format))
}

/// `uniq` — used when `Distinct` follows an already-sorted stream.
pub fn emit_uniq(format: StreamFormat) -> Fragment {
    Fragment::new("uniq".to_string(), format.clone(), format)
}

/// `head -n <n>`
pub fn emit_limit(n: u64, format: StreamFormat) -> Fragment {
    Fragment::new(format!("head -n {n}"), format.clone(), format)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gnu_sort() -> SortInfo {
        SortInfo { path: "sort".into(), supports_parallel: true, supports_buffer_size: true }
    }

    fn bsd_sort() -> SortInfo {
        SortInfo { path: "sort".into(), supports_parallel: false, supports_buffer_size: false }
    }

    #[test]
    fn gnu_sort_numeric_descending() {
        let frag = emit_sort(2, true, true, ',', vec!["region".into(), "total".into()], &gnu_sort(), "/tmp", 8)
            .unwrap();
        assert_eq!(frag.command, "sort '-t,' -k2,2rn --parallel=8 -S 80% -T '/tmp'");
    }

    #[test]
    fn bsd_sort_omits_parallel_flags() {
        let frag = emit_sort(1, false, false, '\t', vec!["x".into()], &bsd_sort(), "/tmp", 4).unwrap();
        assert_eq!(frag.command, "sort '-t\t' -k1,1 -T '/tmp'");
    }

    #[test]
    fn tab_delimiter_is_quoted_not_raw() {
        // A bare, unquoted tab would be split on by the shell's IFS and
        // silently swallow the `-t` flag's argument.
        let frag = emit_sort(1, false, false, '\t', vec!["x".into()], &bsd_sort(), "/tmp", 4).unwrap();
        assert!(frag.command.contains("'-t\t'"));
    }

    #[test]
    fn distinct_standalone_uses_sort_dash_u_with_no_key_flags() {
        let format = StreamFormat::Tsv { delim: ',', columns: vec!["a".into()] };
        let frag = emit_distinct_sort(format, &gnu_sort(), "/tmp", 2).unwrap();
        assert_eq!(frag.command, "sort -u --parallel=2 -S 80% -T '/tmp'");
    }

    #[test]
    fn limit_emits_head() {
        let frag = emit_limit(10, StreamFormat::Raw);
        assert_eq!(frag.command, "head -n 10");
    }
}

// Subprocess probing for tool discovery. Each probe runs `<bin> --version`
// (or an equivalent) on a background thread and is joined with a
// timeout, since `std::process::Command` has no built-in deadline and a
// misconfigured binary must not be able to stall compilation.

use std::process::Command;
use std::sync::mpsc;
use std::time::Duration;

/// Upper bound on how long a single tool probe may run before the tool
/// is treated as absent.
pub const PROBE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Run `path <args>` and report whether it exited successfully. A probe
/// failure (missing binary, non-zero exit, timeout) is reported as
/// `false`, never as an error — absence is a normal outcome, not a bug.
pub fn probe_binary_args(path: &str, args: &[&str]) -> bool {
    let path = path.to_string();
    let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
    let (tx, rx) = mpsc::channel();

    let handle = std::thread::spawn(move || {
        let result = Command::new(&path).args(&args).output();
        let _ = tx.send(result.map(|o| o.status.success()).unwrap_or(false));
    });

    let ok = rx.recv_timeout(PROBE_TIMEOUT).unwrap_or(false);
    // Don't block compilation waiting on a hung child; let the thread
    // finish (or leak, for a genuinely stuck probe) on its own.
    let _ = handle;
    ok
}

/// Single-flag convenience wrapper over `probe_binary_args`.
pub fn probe_binary(path: &str, version_flag: &str) -> bool {
    probe_binary_args(path, &[version_flag])
}

/// Resolve the first binary in `candidates` (in preference order) for
/// which `probe_binary` succeeds. Returns the candidate name, not a full
/// path — callers that need an absolute path can canonicalize separately.
pub fn first_available<'a>(candidates: &[&'a str], version_flag: &str) -> Option<&'a str> {
    candidates.iter().copied().find(|bin| probe_binary(bin, version_flag))
}

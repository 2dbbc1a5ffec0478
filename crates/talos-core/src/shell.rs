//! Shell command execution engine
//!
//! Spawns one `sh -c` per call, drains stdout and stderr concurrently into
//! a single ordered transcript, and enforces a clamped timeout with a
//! forced kill on expiry. Timeouts are a normal terminal state, reported
//! inline in the result text so the model can see and react to them.
//!
//! A backgrounded grandchild inherits the output pipes and can hold them
//! open past the shell's exit, so the post-exit drain gets a short grace
//! window instead of waiting for EOF.

use std::sync::{Arc, Mutex};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::Duration;

pub const MIN_TIMEOUT_MS: u64 = 1_000;
pub const MAX_TIMEOUT_MS: u64 = 300_000;
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// How long to keep draining after the shell itself has exited.
const DRAIN_GRACE_MS: u64 = 500;

/// Clamp a caller-supplied timeout into the supported range. Signed so that
/// negative inputs clamp to the floor instead of wrapping.
pub fn clamp_timeout(raw_ms: i64) -> u64 {
    raw_ms.clamp(MIN_TIMEOUT_MS as i64, MAX_TIMEOUT_MS as i64) as u64
}

/// Run a command through the shell and return its full transcript.
///
/// The result is never empty: each output line appears prefixed with its
/// source channel, `(no output)` stands in when there were none, and exactly
/// one terminal line follows - `[exit: <code>]` or `[TIMEOUT after <ms>ms]`.
pub async fn execute(command: &str, timeout_ms: i64) -> String {
    let bound = clamp_timeout(timeout_ms);

    let mut child = match Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => return format!("error: failed to spawn shell: {}", e),
    };

    // Two producers, one consumer: the drain tasks split raw chunks into
    // prefixed lines, the collector is the only writer to the transcript.
    let (tx, rx) = mpsc::unbounded_channel::<String>();
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(drain(stdout, "[stdout] ", tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(drain(stderr, "[stderr] ", tx.clone()));
    }
    drop(tx);

    let transcript = Arc::new(Mutex::new(String::new()));
    let collector = tokio::spawn(collect(rx, Arc::clone(&transcript)));

    let mut timed_out = false;
    let status = match tokio::time::timeout(Duration::from_millis(bound), child.wait()).await {
        Ok(status) => status,
        Err(_) => {
            timed_out = true;
            tracing::warn!(command, bound, "command exceeded timeout, killing");
            if let Err(e) = child.kill().await {
                // Lost the race against a process exiting on its own.
                tracing::debug!("kill after timeout: {}", e);
            }
            child.wait().await
        }
    };

    // Pipes close once the child is gone, which ends the drains and in turn
    // the collector - unless a backgrounded grandchild still holds them.
    // The grace window bounds the call either way; whatever arrived by then
    // is the transcript.
    if tokio::time::timeout(Duration::from_millis(DRAIN_GRACE_MS), collector)
        .await
        .is_err()
    {
        tracing::debug!(command, "output pipes held open past exit, abandoning drain");
    }
    let transcript = std::mem::take(
        &mut *transcript.lock().unwrap_or_else(|e| e.into_inner()),
    );

    let mut result = if transcript.is_empty() {
        "(no output)\n".to_string()
    } else {
        transcript
    };
    if timed_out {
        result.push_str(&format!("[TIMEOUT after {}ms]", bound));
    } else {
        let code = status.map(|s| s.code().unwrap_or(-1)).unwrap_or(-1);
        result.push_str(&format!("[exit: {}]", code));
    }
    result
}

/// Read one pipe to EOF, splitting on line boundaries. Bytes after the last
/// newline stay buffered, so multi-byte sequences split across chunks are
/// only decoded once their line is complete.
async fn drain<R>(mut reader: R, prefix: &'static str, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin + Send,
{
    let mut chunk = [0u8; 4096];
    let mut pending: Vec<u8> = Vec::new();
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                pending.extend_from_slice(&chunk[..n]);
                while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
                    let rest = pending.split_off(pos + 1);
                    let mut line = std::mem::replace(&mut pending, rest);
                    line.pop();
                    if line.last() == Some(&b'\r') {
                        line.pop();
                    }
                    let _ = tx.send(format!("{}{}", prefix, String::from_utf8_lossy(&line)));
                }
            }
        }
    }
    if !pending.is_empty() {
        let _ = tx.send(format!("{}{}", prefix, String::from_utf8_lossy(&pending)));
    }
}

/// Sole writer to the transcript. Echoes each line live as it arrives; the
/// shared handle lets `execute` read what accumulated even when the drain is
/// abandoned at the grace bound.
async fn collect(mut rx: mpsc::UnboundedReceiver<String>, transcript: Arc<Mutex<String>>) {
    while let Some(line) = rx.recv().await {
        println!("{}", line);
        let mut guard = transcript.lock().unwrap_or_else(|e| e.into_inner());
        guard.push_str(&line);
        guard.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_range() {
        assert_eq!(clamp_timeout(-5), 1_000);
        assert_eq!(clamp_timeout(0), 1_000);
        assert_eq!(clamp_timeout(50), 1_000);
        assert_eq!(clamp_timeout(1_000), 1_000);
        assert_eq!(clamp_timeout(30_000), 30_000);
        assert_eq!(clamp_timeout(300_000), 300_000);
        assert_eq!(clamp_timeout(10_000_000), 300_000);
        assert_eq!(clamp_timeout(i64::MAX), 300_000);
    }

    #[tokio::test]
    async fn test_stdout_capture() {
        let result = execute("echo hello", 5_000).await;
        assert!(result.contains("[stdout] hello"));
        assert!(result.ends_with("[exit: 0]"));
    }

    #[tokio::test]
    async fn test_stderr_capture() {
        let result = execute("echo oops >&2", 5_000).await;
        assert!(result.contains("[stderr] oops"));
        assert!(result.ends_with("[exit: 0]"));
    }

    #[tokio::test]
    async fn test_no_output_sentinel() {
        let result = execute("true", 5_000).await;
        assert_eq!(result, "(no output)\n[exit: 0]");
    }

    #[tokio::test]
    async fn test_exit_code_reported() {
        let result = execute("exit 3", 5_000).await;
        assert_eq!(result, "(no output)\n[exit: 3]");
    }

    #[tokio::test]
    async fn test_line_order_within_channel() {
        let result = execute("printf 'one\\ntwo\\nthree\\n'", 5_000).await;
        let lines: Vec<&str> = result.lines().collect();
        assert_eq!(
            lines,
            vec!["[stdout] one", "[stdout] two", "[stdout] three", "[exit: 0]"]
        );
    }

    #[tokio::test]
    async fn test_unterminated_last_line_flushed() {
        let result = execute("printf 'no newline'", 5_000).await;
        assert!(result.contains("[stdout] no newline"));
    }

    #[tokio::test]
    async fn test_multibyte_output() {
        let result = execute("printf 'héllo wörld\\n'", 5_000).await;
        assert!(result.contains("[stdout] héllo wörld"));
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let start = std::time::Instant::now();
        // 50ms request clamps up to the 1s floor; the sleep outlives it.
        let result = execute("sleep 5", 50).await;
        assert!(result.ends_with("[TIMEOUT after 1000ms]"), "got: {}", result);
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_timeout_keeps_partial_output() {
        let result = execute("echo started; sleep 5", 50).await;
        assert!(result.contains("[stdout] started"));
        assert!(result.ends_with("[TIMEOUT after 1000ms]"));
    }

    #[tokio::test]
    async fn test_command_not_found_exit_code() {
        let result = execute("definitely_not_a_real_binary_xyz", 5_000).await;
        assert!(result.ends_with("[exit: 127]"));
    }

    #[tokio::test]
    async fn test_background_child_does_not_outlive_timeout_bound() {
        let start = std::time::Instant::now();
        // The backgrounded sleep inherits the pipes and survives the kill;
        // the drain grace bounds the call instead of waiting for pipe EOF.
        let result = execute("sleep 5 & wait", 50).await;
        assert!(result.ends_with("[TIMEOUT after 1000ms]"), "got: {}", result);
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_background_child_after_clean_exit() {
        let start = std::time::Instant::now();
        let result = execute("echo done; sleep 5 &", 5_000).await;
        assert!(result.contains("[stdout] done"));
        assert!(result.ends_with("[exit: 0]"), "got: {}", result);
        assert!(start.elapsed() < Duration::from_secs(3));
    }
}

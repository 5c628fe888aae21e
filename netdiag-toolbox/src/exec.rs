//! Subprocess launching and incremental line reading.
//!
//! Diagnostic binaries are started with a fixed argument vector, never via a
//! shell. Their stdout is consumed as it arrives and re-chunked into complete
//! lines; bytes after the last newline stay buffered until the next read or
//! end of stream.

use std::process::Stdio;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};

use crate::error::{DiagError, DiagResult};

/// A spawned diagnostic process with piped output streams.
///
/// The child carries `kill_on_drop`, so dropping this (or anything the
/// streams were moved into) when a session is aborted reaps the process.
pub struct SpawnedCommand {
    /// Standard output stream.
    pub stdout: ChildStdout,
    /// Standard error stream.
    pub stderr: ChildStderr,
    /// Process handle; await [`wait_exit`] on it for the exit code.
    pub child: Child,
}

/// Start `binary` with the given argument vector.
///
/// stdin is closed, stdout/stderr are piped. Arguments are passed as
/// discrete strings; no shell interpretation happens anywhere.
pub fn launch(binary: &str, args: &[&str]) -> DiagResult<SpawnedCommand> {
    let mut child = Command::new(binary)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| DiagError::Spawn {
            binary: binary.to_string(),
            message: e.to_string(),
        })?;

    log::debug!("spawned {binary} {}", args.join(" "));

    let stdout = child.stdout.take().ok_or_else(|| DiagError::Spawn {
        binary: binary.to_string(),
        message: "failed to capture stdout".to_string(),
    })?;
    let stderr = child.stderr.take().ok_or_else(|| DiagError::Spawn {
        binary: binary.to_string(),
        message: "failed to capture stderr".to_string(),
    })?;

    Ok(SpawnedCommand {
        stdout,
        stderr,
        child,
    })
}

/// Await process termination and return its exit code.
///
/// A signal-terminated process (no code) reports `-1`.
pub async fn wait_exit(child: &mut Child) -> DiagResult<i32> {
    let status = child.wait().await?;
    Ok(status.code().unwrap_or(-1))
}

/// Read the remaining stderr content, trimmed. Read failures yield an
/// empty string; stderr is diagnostic, not load-bearing.
pub async fn drain_stderr(mut stderr: ChildStderr) -> String {
    let mut buf = Vec::new();
    if let Err(e) = stderr.read_to_end(&mut buf).await {
        log::debug!("stderr drain failed: {e}");
        return String::new();
    }
    String::from_utf8_lossy(&buf).trim().to_string()
}

/// Re-chunks a byte stream into complete text lines.
///
/// Bytes are buffered until a line feed arrives, so multi-byte UTF-8
/// sequences split across read chunks decode intact. The buffer holds at
/// most one incomplete line; at end of stream a non-empty residual is
/// yielded as a final, unterminated line.
pub struct LineReader<R> {
    reader: R,
    buf: Vec<u8>,
    eof: bool,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    /// Wrap a byte stream.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            eof: false,
        }
    }

    /// Next complete line, without its trailing line feed.
    ///
    /// Returns `Ok(None)` once the stream is exhausted and the residual
    /// buffer has been flushed.
    pub async fn next_line(&mut self) -> DiagResult<Option<String>> {
        loop {
            if let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
                let rest = self.buf.split_off(pos + 1);
                let mut line = std::mem::replace(&mut self.buf, rest);
                line.pop();
                return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
            }

            if self.eof {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                let line = std::mem::take(&mut self.buf);
                return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
            }

            let mut chunk = [0u8; 4096];
            let n = self.reader.read(&mut chunk).await?;
            if n == 0 {
                self.eof = true;
            } else {
                self.buf.extend_from_slice(&chunk[..n]);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use tokio::io::ReadBuf;

    use super::*;

    /// Test stream yielding predetermined chunks, one per read call.
    struct ChunkedReader {
        chunks: Vec<Vec<u8>>,
        next: usize,
    }

    impl ChunkedReader {
        fn new(chunks: &[&[u8]]) -> Self {
            Self {
                chunks: chunks.iter().map(|c| c.to_vec()).collect(),
                next: 0,
            }
        }
    }

    impl AsyncRead for ChunkedReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            if self.next < self.chunks.len() {
                let chunk = self.chunks[self.next].clone();
                self.next += 1;
                buf.put_slice(&chunk);
            }
            Poll::Ready(Ok(()))
        }
    }

    async fn collect_lines(chunks: &[&[u8]]) -> Vec<String> {
        let mut reader = LineReader::new(ChunkedReader::new(chunks));
        let mut lines = Vec::new();
        while let Some(line) = reader.next_line().await.unwrap() {
            lines.push(line);
        }
        lines
    }

    // ==================== LineReader tests ====================

    #[tokio::test]
    async fn test_lines_from_single_chunk() {
        let lines = collect_lines(&[b"one\ntwo\nthree\n"]).await;
        assert_eq!(lines, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_line_split_across_chunks() {
        let lines = collect_lines(&[b"64 bytes fr", b"om 8.8.8.8\nnext\n"]).await;
        assert_eq!(lines, vec!["64 bytes from 8.8.8.8", "next"]);
    }

    #[tokio::test]
    async fn test_residual_flushed_at_eof() {
        let lines = collect_lines(&[b"complete\npartial"]).await;
        assert_eq!(lines, vec!["complete", "partial"]);
    }

    #[tokio::test]
    async fn test_empty_stream_yields_nothing() {
        let lines = collect_lines(&[]).await;
        assert!(lines.is_empty());
    }

    #[tokio::test]
    async fn test_empty_lines_preserved() {
        let lines = collect_lines(&[b"a\n\nb\n"]).await;
        assert_eq!(lines, vec!["a", "", "b"]);
    }

    #[tokio::test]
    async fn test_multibyte_sequence_split_across_chunks() {
        // "é" is 0xC3 0xA9; cut between the two bytes.
        let lines = collect_lines(&[b"caf\xC3", b"\xA9\n"]).await;
        assert_eq!(lines, vec!["café"]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_replaced_not_fatal() {
        let lines = collect_lines(&[b"ok\n\xFF\xFE\n"]).await;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "ok");
        assert!(lines[1].contains('\u{FFFD}'));
    }

    #[tokio::test]
    async fn test_trailing_newline_produces_no_empty_tail() {
        let lines = collect_lines(&[b"only\n"]).await;
        assert_eq!(lines, vec!["only"]);
    }

    // ==================== launch tests ====================

    #[tokio::test]
    async fn test_launch_missing_binary_is_spawn_error() {
        let result = launch("netdiag-test-no-such-binary", &[]);
        assert!(matches!(result, Err(DiagError::Spawn { .. })));
    }

    #[tokio::test]
    async fn test_launch_echo_streams_and_exits_zero() {
        let SpawnedCommand {
            stdout, mut child, ..
        } = launch("echo", &["hello", "world"]).unwrap();
        let mut reader = LineReader::new(stdout);
        let line = reader.next_line().await.unwrap();
        assert_eq!(line.as_deref(), Some("hello world"));
        assert_eq!(reader.next_line().await.unwrap(), None);
        assert_eq!(wait_exit(&mut child).await.unwrap(), 0);
    }
}

/// Fast size tier: ask the OS shell for a recursive directory listing and
/// read the grand total off its summary line.
///
/// On Windows this is `dir /a /s`, whose last summary line looks like
///
/// ```text
///      1234 File(s)  3,456,789,012 bytes
/// ```
///
/// The wording follows the console locale, so the parser accepts the
/// English and Simplified Chinese forms and gives up on anything else;
/// callers fall back to walking the tree. `cmd /U` makes the output
/// UTF-16LE whatever the console code page (GBK on Chinese systems), so
/// decoding does not depend on the locale. Other platforms have no
/// equivalent whose output counts only file bytes, so the tier reports
/// itself unavailable there.
use crossbeam_channel::RecvTimeoutError;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;
use tracing::debug;

const FILE_MARKERS: [&str; 2] = ["File(s)", "个文件"];
const BYTE_MARKERS: [&str; 2] = ["bytes", "字节"];

/// Run the platform listing command for `path` and return its byte total.
///
/// `None` means "use another strategy": the tier is unavailable on this
/// platform, the command failed or exceeded `timeout`, or its output could
/// not be parsed.
pub fn dir_command_total(path: &Path, timeout: Duration) -> Option<u64> {
    let command = listing_command(path)?;
    let output = decode_utf16le(&run_with_timeout(command, timeout)?);
    let total = parse_dir_total(&output);
    if total.is_none() {
        debug!("Unrecognised listing output for {}", path.display());
    }
    total
}

#[cfg(windows)]
fn listing_command(path: &Path) -> Option<Command> {
    use std::os::windows::process::CommandExt;

    let Some(quoted) = quoted_cmd_arg(path) else {
        debug!("Not handing {} to cmd; walking instead", path.display());
        return None;
    };
    let mut cmd = Command::new("cmd");
    // std does not escape for cmd.exe, so the quoted path goes in verbatim.
    cmd.args(["/U", "/C", "dir", "/a", "/s"]).raw_arg(quoted);
    Some(cmd)
}

#[cfg(not(windows))]
fn listing_command(_path: &Path) -> Option<Command> {
    None
}

/// Quote `path` for a `cmd /C` command line.
///
/// Inside double quotes cmd treats `&`, `|`, `<`, `>` and parentheses
/// literally. `%` still expands there, `"` would end the quoting, and `^`
/// is rejected along with them; such paths get `None`, as do paths that
/// are not valid Unicode.
#[cfg_attr(not(windows), allow(dead_code))]
fn quoted_cmd_arg(path: &Path) -> Option<String> {
    let text = path.to_str()?;
    if text.contains(['%', '^', '"']) {
        return None;
    }
    Some(format!("\"{text}\""))
}

/// Decode `cmd /U` output. A trailing odd byte is dropped.
fn decode_utf16le(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// Extract the grand total from `dir /s` output.
///
/// `dir /s` prints one summary per directory plus a final one for the
/// whole tree; the last match is the grand total.
pub fn parse_dir_total(output: &str) -> Option<u64> {
    output.lines().filter_map(parse_summary_line).last()
}

fn parse_summary_line(line: &str) -> Option<u64> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let [count, files, bytes, unit, ..] = tokens.as_slice() else {
        return None;
    };
    if !FILE_MARKERS.contains(files) || !BYTE_MARKERS.iter().any(|m| m.eq_ignore_ascii_case(unit))
    {
        return None;
    }
    parse_grouped(count)?;
    parse_grouped(bytes)
}

/// Parse a number that may carry `,` / `.` / NBSP thousands separators.
fn parse_grouped(token: &str) -> Option<u64> {
    let digits: String = token
        .chars()
        .filter(|c| !matches!(c, ',' | '.' | '\u{a0}' | '\u{202f}'))
        .collect();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Run `command`, capturing raw stdout, and kill it if it outlives `timeout`.
///
/// Returns `None` on spawn failure, timeout, or non-zero exit.
pub(crate) fn run_with_timeout(mut command: Command, timeout: Duration) -> Option<Vec<u8>> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());

    let mut child = match command.spawn() {
        Ok(c) => c,
        Err(e) => {
            debug!("Listing command failed to start: {e}");
            return None;
        }
    };
    let Some(mut stdout) = child.stdout.take() else {
        let _ = child.kill();
        let _ = child.wait();
        return None;
    };

    // A separate reader keeps a chatty child from blocking on a full pipe
    // while we wait with a timeout.
    let (tx, rx) = crossbeam_channel::bounded::<Vec<u8>>(1);
    let reader = thread::Builder::new()
        .name("foldersweep-dir-cmd".into())
        .spawn(move || {
            let mut buf = Vec::new();
            let _ = stdout.read_to_end(&mut buf);
            let _ = tx.send(buf);
        });
    if reader.is_err() {
        let _ = child.kill();
        let _ = child.wait();
        return None;
    }

    match rx.recv_timeout(timeout) {
        Ok(buf) => {
            let status = child.wait().ok()?;
            if !status.success() {
                debug!("Listing command exited with {status}");
                return None;
            }
            Some(buf)
        }
        Err(RecvTimeoutError::Timeout) => {
            debug!("Listing command exceeded {timeout:?}; killing it");
            let _ = child.kill();
            let _ = child.wait();
            None
        }
        Err(RecvTimeoutError::Disconnected) => {
            let _ = child.kill();
            let _ = child.wait();
            None
        }
    }
}

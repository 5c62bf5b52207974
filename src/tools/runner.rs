use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

use crate::cache::DiscoveryCache;
use crate::decision::RunDecision;
use crate::error::FailureReason;
use crate::findings::FindingsRegistry;
use crate::output::raw_writer::spawn_raw_writer;
use crate::parsers;
use crate::plan::PlanItem;
use crate::profile::TargetProfile;
use crate::tools::classify::{classify, OutcomeClass};
use crate::tools::registry::ToolId;

/// In-memory capture bound for parsing (spec.md §4.6 step 4). Raw stdout is
/// still streamed to disk in full through `raw_writer`; this only bounds
/// what the Signal Parser has to hold and scan.
pub const MAX_CAPTURE_BYTES: usize = 2 * 1024 * 1024;

/// Grace period between SIGTERM and SIGKILL when a tool blows past its
/// timeout (spec.md §4.6 step 3).
const KILL_GRACE: Duration = Duration::from_secs(5);

/// One row of the execution log (spec.md §4.7, §6). Every plan item
/// produces exactly one of these, regardless of whether it ran at all --
/// `decision` carries `Block`/`Skip`/`Allow` and the non-`Allow` rows stop
/// there (P1, P10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub tool: ToolId,
    pub decision: RunDecision,
    pub reason: String,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    pub exit_code: Option<i32>,
    pub class: Option<OutcomeClass>,
    pub failure_reason: Option<FailureReason>,
    pub findings_emitted: usize,
    pub timed_out: bool,
    pub raw_output_path: Option<String>,
}

impl ToolOutcome {
    pub fn blocked(tool: ToolId, reason: impl Into<String>) -> Self {
        Self {
            tool,
            decision: RunDecision::Block,
            reason: reason.into(),
            started_at: None,
            finished_at: None,
            duration_ms: None,
            exit_code: None,
            class: None,
            failure_reason: None,
            findings_emitted: 0,
            timed_out: false,
            raw_output_path: None,
        }
    }

    pub fn skipped(tool: ToolId, reason: impl Into<String>) -> Self {
        Self { decision: RunDecision::Skip, ..Self::blocked(tool, reason) }
    }
}

/// Execute one plan item end to end: check installation, spawn, capture,
/// classify, parse, and fold the results into the shared cache and
/// findings registry (spec.md §4.6). Only called once the Decision Layer
/// has already returned `Allow` for `item.tool`.
pub async fn run(
    item: &PlanItem,
    profile: &TargetProfile,
    cache: &DiscoveryCache,
    registry: &FindingsRegistry,
    skip_install_check: bool,
    output_dir: &Path,
) -> ToolOutcome {
    let tool = item.tool;
    let program = item
        .command_template
        .first()
        .cloned()
        .unwrap_or_else(|| tool.name().to_string());

    if !skip_install_check && which::which(&program).is_err() {
        return ToolOutcome {
            exit_code: None,
            class: Some(OutcomeClass::ExecutionError),
            failure_reason: Some(FailureReason::ToolNotInstalled),
            reason: "tool_not_installed".to_string(),
            decision: RunDecision::Allow,
            started_at: Some(Utc::now()),
            finished_at: Some(Utc::now()),
            duration_ms: Some(0),
            ..ToolOutcome::blocked(tool, "tool_not_installed")
        };
    }

    let mut cmd = Command::new(&program);
    cmd.args(&item.command_template[1..]);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);
    #[cfg(unix)]
    set_new_session(&mut cmd);

    let started_at = Utc::now();
    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            return ToolOutcome {
                reason: format!("spawn failed: {e}"),
                decision: RunDecision::Allow,
                started_at: Some(started_at),
                finished_at: Some(Utc::now()),
                duration_ms: Some(0),
                class: Some(OutcomeClass::ExecutionError),
                failure_reason: Some(FailureReason::ToolNotInstalled),
                ..ToolOutcome::blocked(tool, "spawn_failed")
            };
        }
    };

    let raw_path = output_dir.join(format!("{}.txt", tool.name()));
    let (raw_tx, raw_rx) = mpsc::channel::<Vec<u8>>(64);
    let writer_handle = spawn_raw_writer(raw_path.clone(), raw_rx);

    // Header (spec.md §6): tool, target, started_at go out before any
    // stdout/stderr bytes; exit_code is unknown until the child exits, so it
    // is appended as a trailer alongside the stderr excerpt below.
    let header = format!(
        "tool: {}\ntarget: {}\nstarted_at: {}\n--- stdout ---\n",
        tool.name(),
        profile.base_url(),
        started_at.to_rfc3339(),
    );
    let _ = raw_tx.send(header.into_bytes()).await;

    let stdout = child.stdout.take().expect("stdout is piped");
    let stderr = child.stderr.take().expect("stderr is piped");
    let stdout_tx = raw_tx.clone();
    let stdout_task =
        tokio::spawn(async move { capture_bounded(stdout, MAX_CAPTURE_BYTES, Some(stdout_tx)).await });
    let stderr_task = tokio::spawn(async move { capture_bounded(stderr, MAX_CAPTURE_BYTES, None).await });

    let timed_out;
    let exit_code;
    match tokio::time::timeout(Duration::from_secs(item.meta.timeout_s as u64), child.wait()).await {
        Ok(Ok(status)) => {
            timed_out = false;
            exit_code = status.code().unwrap_or(-1);
        }
        Ok(Err(_)) => {
            timed_out = false;
            exit_code = -1;
        }
        Err(_) => {
            terminate(&mut child).await;
            timed_out = true;
            exit_code = -1;
        }
    }

    let stdout_bytes = stdout_task.await.unwrap_or_default();
    let stderr_bytes = stderr_task.await.unwrap_or_default();
    if !stderr_bytes.is_empty() {
        let mut tail = b"\n--- stderr ---\n".to_vec();
        tail.extend_from_slice(&stderr_bytes[..stderr_bytes.len().min(MAX_CAPTURE_BYTES)]);
        let _ = raw_tx.send(tail).await;
    }
    let trailer = format!("\n--- exit_code: {exit_code} ---\n");
    let _ = raw_tx.send(trailer.into_bytes()).await;
    drop(raw_tx);
    let _ = tokio::time::timeout(Duration::from_secs(5), writer_handle).await;

    let stdout_str = String::from_utf8_lossy(&stdout_bytes).to_string();
    let outcome = parsers::parse(tool, &stdout_str, profile);
    cache.apply(outcome.cache_ops);
    let findings_emitted = outcome.findings.len();
    for finding in outcome.findings {
        registry.add(finding);
    }

    let (class, failure_reason) = if outcome.parse_failed && !timed_out && exit_code == 0 {
        (OutcomeClass::PartialSuccess, None)
    } else {
        classify(exit_code, &stdout_bytes, &stderr_bytes, findings_emitted, timed_out)
    };

    let finished_at = Utc::now();
    ToolOutcome {
        tool,
        decision: RunDecision::Allow,
        reason: "ready".to_string(),
        started_at: Some(started_at),
        finished_at: Some(finished_at),
        duration_ms: Some((finished_at - started_at).num_milliseconds().max(0) as u64),
        exit_code: Some(exit_code),
        class: Some(class),
        failure_reason,
        findings_emitted,
        timed_out,
        raw_output_path: Some(raw_path.display().to_string()),
    }
}

/// Drain `reader` to completion (so a full pipe buffer never blocks the
/// child), forwarding every chunk to `forward` for full-fidelity on-disk
/// capture while keeping only the first `cap` bytes in the returned buffer
/// for the Signal Parser.
async fn capture_bounded<R: AsyncRead + Unpin>(
    mut reader: R,
    cap: usize,
    forward: Option<mpsc::Sender<Vec<u8>>>,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(cap.min(64 * 1024));
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                if let Some(tx) = &forward {
                    let _ = tx.send(chunk[..n].to_vec()).await;
                }
                if buf.len() < cap {
                    let take = (cap - buf.len()).min(n);
                    buf.extend_from_slice(&chunk[..take]);
                }
            }
            Err(_) => break,
        }
    }
    buf
}

#[cfg(unix)]
fn set_new_session(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    unsafe {
        cmd.as_std_mut().pre_exec(|| {
            if libc::setsid() == -1 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }
}

#[cfg(unix)]
async fn terminate(child: &mut Child) {
    let Some(pid) = child.id() else { return };
    unsafe {
        libc::killpg(pid as i32, libc::SIGTERM);
    }
    let grace = tokio::time::sleep(KILL_GRACE);
    tokio::pin!(grace);
    tokio::select! {
        _ = child.wait() => return,
        _ = &mut grace => {}
    }
    unsafe {
        libc::killpg(pid as i32, libc::SIGKILL);
    }
    let _ = child.wait().await;
}

#[cfg(not(unix))]
async fn terminate(child: &mut Child) {
    let _ = child.start_kill();
    let _ = child.wait().await;
}

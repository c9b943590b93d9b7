//! Ctrl-C handling for `lockstep write`.
//!
//! The first interrupt cancels the write's token, which aborts staging and
//! leaves the project root untouched; a commit already under way finishes.
//! A second interrupt exits immediately.

use anyhow::{Context, Result};

use lockstep_writer::CancellationToken;

/// Exit status for a process stopped by SIGINT.
const INTERRUPTED_EXIT: i32 = 130;

/// A token cancelled by the first interrupt.
///
/// The handler is installed before this returns and lives on a
/// single-threaded runtime in a background thread.
pub fn cancel_on_interrupt() -> Result<CancellationToken> {
    let token = CancellationToken::new();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start signal runtime")?;

    #[cfg(unix)]
    let mut interrupt = {
        let _guard = runtime.enter();
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
            .context("failed to install interrupt handler")?
    };

    let cancel = token.clone();
    std::thread::Builder::new()
        .name("lockstep-interrupt".to_string())
        .spawn(move || {
            runtime.block_on(async move {
                let mut seen = 0usize;
                loop {
                    #[cfg(unix)]
                    let received = interrupt.recv().await.is_some();
                    #[cfg(not(unix))]
                    let received = tokio::signal::ctrl_c().await.is_ok();
                    if !received {
                        break;
                    }
                    seen += 1;
                    if seen == 1 {
                        tracing::warn!("interrupt received; cancelling write before commit");
                        cancel.cancel();
                    } else {
                        tracing::warn!("second interrupt; exiting");
                        std::process::exit(INTERRUPTED_EXIT);
                    }
                }
            });
        })
        .context("failed to spawn interrupt handler thread")?;

    Ok(token)
}

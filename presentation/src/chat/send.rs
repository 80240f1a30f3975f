//! Sending with Ctrl-C mapped to "stop streaming"

use cogerphere_application::{SessionError, SessionManager, StreamProgressNotifier};
use cogerphere_domain::SendOutcome;
use colored::Colorize;
use tracing::debug;

/// Run a send, cancelling it when Ctrl-C arrives.
///
/// The interrupt stops the stream instead of killing the process, so the
/// send still resolves (to [`SendOutcome::Cancelled`]) and state is settled.
pub async fn send_interruptible(
    manager: &SessionManager,
    content: &str,
    progress: &dyn StreamProgressNotifier,
) -> Result<SendOutcome, SessionError> {
    let send = manager.send_message_with_progress(content, progress);
    tokio::pin!(send);

    loop {
        tokio::select! {
            result = &mut send => return result,
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    debug!(error = %e, "Ctrl-C handler unavailable");
                    return send.await;
                }
                manager.stop_streaming();
            }
        }
    }
}

/// Print whatever the reporter did not already echo for this outcome.
pub fn print_outcome(outcome: &SendOutcome, echoed: bool) {
    match outcome {
        SendOutcome::Completed { content, .. } if !echoed => println!("{}", content),
        SendOutcome::Cancelled { .. } if !echoed => println!("{}", "[stopped]".dimmed()),
        _ => {}
    }
}

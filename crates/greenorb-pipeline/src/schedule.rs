//! Cancellable delays for the controller loops.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// A stop flag plus the sleeps that honour it.
///
/// Clones share the flag. Cancelling wakes every pending [`Pacer::wait`]
/// immediately; work already in progress is left to finish and check
/// [`Pacer::is_cancelled`] at its next step.
#[derive(Debug, Clone, Default)]
pub struct Pacer {
  token: CancellationToken,
}

impl Pacer {
  pub fn new() -> Self { Self::default() }

  pub fn cancel(&self) { self.token.cancel() }

  pub fn is_cancelled(&self) -> bool { self.token.is_cancelled() }

  /// Sleep for `duration` unless cancelled first. Returns `true` when the
  /// caller may continue.
  pub async fn wait(&self, duration: Duration) -> bool {
    tokio::select! {
      _ = self.token.cancelled() => false,
      _ = tokio::time::sleep(duration) => !self.token.is_cancelled(),
    }
  }
}

#[cfg(test)]
mod tests {
  use tokio::time::Instant;

  use super::*;

  #[tokio::test(start_paused = true)]
  async fn wait_sleeps_the_full_duration() {
    let pacer = Pacer::new();
    let started = Instant::now();
    assert!(pacer.wait(Duration::from_secs(15)).await);
    assert_eq!(started.elapsed(), Duration::from_secs(15));
  }

  #[tokio::test(start_paused = true)]
  async fn cancel_cuts_a_wait_short() {
    let pacer = Pacer::new();
    let waiter = tokio::spawn({
      let pacer = pacer.clone();
      async move { pacer.wait(Duration::from_secs(3600)).await }
    });

    tokio::time::sleep(Duration::from_secs(1)).await;
    pacer.cancel();

    assert!(!waiter.await.unwrap());
    assert!(pacer.is_cancelled());
  }

  #[tokio::test(start_paused = true)]
  async fn cancelled_pacer_never_waits() {
    let pacer = Pacer::new();
    pacer.cancel();
    let started = Instant::now();
    assert!(!pacer.wait(Duration::from_secs(5)).await);
    assert_eq!(started.elapsed(), Duration::ZERO);
  }
}

/// The user-facing warning channel. Deprecation warnings raised while
/// resolving imports go through this instead of the `log` facade so hosts can
/// route them into their own diagnostics.
pub trait Logger: Send + Sync {
  fn warn(&self, message: &str, deprecation: bool);
}

/// Forwards warnings to the `log` facade.
#[derive(Debug, Default)]
pub struct StdLogger;

impl Logger for StdLogger {
  fn warn(&self, message: &str, deprecation: bool) {
    if deprecation {
      log::warn!("Deprecation warning: {}", message);
    } else {
      log::warn!("{}", message);
    }
  }
}

/// Swallows every warning. Substituted per call when a load should not log.
#[derive(Debug, Default)]
pub struct QuietLogger;

impl Logger for QuietLogger {
  fn warn(&self, _message: &str, _deprecation: bool) {}
}

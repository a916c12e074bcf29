/// Receives human-readable progress lines. Delivery is best-effort.
pub trait ProgressSink: Send + Sync {
    /// Emit `message` nested `level` deep.
    fn emit(&self, level: usize, message: &str);
}

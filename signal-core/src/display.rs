use crate::counts::Lane;

/// Where the controller's decisions become visible: signal heads plus a
/// status console.
#[allow(async_fn_in_trait)]
pub trait SignalDisplay {
    /// Show `green` as green and the other lane as red.
    async fn show_signals(&mut self, green: Lane);

    /// Emit one human-readable status line.
    async fn report(&mut self, line: &str);
}

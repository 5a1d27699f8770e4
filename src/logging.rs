use tracing::{level_filters::LevelFilter, Dispatch};
use tracing_subscriber::fmt::MakeWriter;

/// Logging setup for one run. The resulting [`Dispatch`] is installed by the caller with
/// `tracing::dispatcher::with_default`, so nothing here touches process-global state.
#[derive(Debug, Clone, Copy)]
pub struct LogConfig {
    pub verbose: bool,
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new(false)
    }
}

impl LogConfig {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            ansi: true,
        }
    }

    pub fn ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    pub fn max_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::DEBUG
        } else {
            LevelFilter::INFO
        }
    }

    pub fn dispatch(&self) -> Dispatch {
        self.dispatch_to(std::io::stderr)
    }

    pub fn dispatch_to<W>(&self, writer: W) -> Dispatch
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(self.max_level())
            .with_target(false)
            .with_ansi(self.ansi)
            .with_writer(writer)
            .finish();
        Dispatch::new(subscriber)
    }
}

use std::fmt;
use std::hash::Hash;
use std::path::Path;
use fnv::{FnvHashMap, FnvHashSet};

pub mod data;
pub mod graph;
pub mod matrix;
pub mod unroll;
pub mod threshold;
pub mod toll;
pub mod timed;

pub type Map<K, V> = FnvHashMap<K, V>;
pub type Set<T> = FnvHashSet<T>;

pub use tolldata::Distance;

/// Anything usable as a location identifier.
pub trait Location: Clone + Ord + Hash + fmt::Debug + fmt::Display + Send + Sync {}

impl<T: Clone + Ord + Hash + fmt::Debug + fmt::Display + Send + Sync> Location for T {}


#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Error {
    /// Negative or non-finite edge weight.
    InvalidDistance,
    /// No edges to build a matrix from.
    EmptyGraph,
    /// The reference location has no outgoing record with a finite distance.
    NoReferenceData,
    /// Table is not square or its row and column ids differ.
    ShapeMismatch,
    /// A numeric consumer was handed an unreachable cell.
    Unreachable,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl std::error::Error for Error {}


mod logging_setup {
    use super::*;
    use tracing_subscriber::{EnvFilter, fmt, registry, prelude::*};
    use tracing_appender::{non_blocking, non_blocking::WorkerGuard};
    use std::fs::OpenOptions;

    fn build_and_set_global_subscriber<P>(logfile: Option<P>, is_test : bool) -> anyhow::Result<Option<WorkerGuard>> where
        P : AsRef<Path>
    {
        let stderr_log = fmt::layer().with_writer(std::io::stderr);
        let env_filter = EnvFilter::from_default_env();
        let r = registry().with(stderr_log).with(env_filter);

        let flush_guard = match logfile {
            Some(p) => {
                let logfile = OpenOptions::new()
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(p)?;
                let (writer, _guard) = non_blocking::NonBlockingBuilder::default()
                    .lossy(false)
                    .finish(logfile);
                let json = fmt::layer()
                    .json()
                    .with_span_list(true)
                    .with_current_span(false)
                    .with_writer(writer);

                let r = r.with(json);
                if is_test { r.try_init().ok(); }
                else { r.try_init().map_err(|e| anyhow::anyhow!("{}", e))?; }
                Some(_guard)
            },
            None => {
                if is_test { r.try_init().ok(); }
                else { r.try_init().map_err(|e| anyhow::anyhow!("{}", e))?; }
                None
            }
        };
        return Ok(flush_guard)
    }

    /// Install the global subscriber: stderr output filtered by `RUST_LOG`, plus an ndjson log
    /// file if `logfile` is given.  Keep the returned guard alive until exit to flush the file.
    pub fn init_logging(logfile: Option<impl AsRef<Path>>) -> anyhow::Result<Option<WorkerGuard>> {
        return build_and_set_global_subscriber(logfile, false);
    }

    #[allow(dead_code)]
    pub(crate) fn init_test_logging(logfile: Option<impl AsRef<Path>>) -> Option<WorkerGuard> {
        return build_and_set_global_subscriber(logfile, true).ok().flatten();
    }
}
pub use logging_setup::*;


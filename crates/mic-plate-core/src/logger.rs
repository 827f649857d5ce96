//! Stderr logger for the `log` facade.
//!
//! Lines look like `[  0.120s  INFO mic_plate::locate] message`. Records
//! from the `mic_plate*` crates pass at the configured level; everything
//! else (decoders, dependencies) is capped at `warn`.
//!
//! With the `tracing` feature, [`init_tracing`] installs a
//! `tracing-subscriber` instead.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

const OWN_PREFIX: &str = "mic_plate";

struct PlateLogger {
    level: LevelFilter,
    foreign: LevelFilter,
    started: Instant,
}

impl PlateLogger {
    fn limit_for(&self, target: &str) -> LevelFilter {
        if target.starts_with(OWN_PREFIX) {
            self.level
        } else {
            self.foreign
        }
    }
}

impl Log for PlateLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.limit_for(metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!(
            "[{:7.3}s {:>5} {}] {}\n",
            self.started.elapsed().as_secs_f64(),
            record.level(),
            record.target(),
            record.args()
        );
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<PlateLogger> = OnceLock::new();

/// Install the stderr logger with the given level for `mic_plate*` targets.
///
/// Only the first call installs the logger; later calls are no-ops.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let logger = LOGGER.get_or_init(|| PlateLogger {
        level,
        foreign: level.min(LevelFilter::Warn),
        started: Instant::now(),
    });
    log::set_logger(logger)?;
    log::set_max_level(level);
    Ok(())
}

/// `EnvFilter` directives used when `RUST_LOG` is unset.
#[cfg_attr(not(feature = "tracing"), allow(dead_code))]
fn default_directives(level: LevelFilter) -> String {
    let own = level.as_str().to_ascii_lowercase();
    let foreign = level.min(LevelFilter::Warn).as_str().to_ascii_lowercase();
    format!("{foreign},{OWN_PREFIX}={own}")
}

/// Install a `tracing` subscriber filtered by `RUST_LOG`.
///
/// Without `RUST_LOG` the filter is `warn,mic_plate=info`. Span close events
/// are emitted so the instrumented stages report their durations. `json`
/// switches to flattened JSON lines.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    init_tracing_with_level(json, LevelFilter::Info);
}

/// Like [`init_tracing`], with `level` for `mic_plate*` targets when
/// `RUST_LOG` is unset. Other targets are capped at `warn`.
#[cfg(feature = "tracing")]
pub fn init_tracing_with_level(json: bool, level: LevelFilter) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));
    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::CLOSE);
    let _ = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreign_targets_are_capped_at_warn() {
        let logger = PlateLogger {
            level: LevelFilter::Debug,
            foreign: LevelFilter::Warn,
            started: Instant::now(),
        };
        assert_eq!(logger.limit_for("mic_plate::classify"), LevelFilter::Debug);
        assert_eq!(logger.limit_for("mic_plate_grid::fitter"), LevelFilter::Debug);
        assert_eq!(logger.limit_for("png::decoder"), LevelFilter::Warn);
    }

    #[test]
    fn tracing_directives_follow_the_requested_level() {
        assert_eq!(default_directives(LevelFilter::Info), "warn,mic_plate=info");
        assert_eq!(default_directives(LevelFilter::Debug), "warn,mic_plate=debug");
        assert_eq!(default_directives(LevelFilter::Error), "error,mic_plate=error");
    }
}

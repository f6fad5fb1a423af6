use std::io::{stderr, IsTerminal};

use tracing::subscriber::SetGlobalDefaultError;
use tracing_glog::{Glog, GlogFields};
use tracing_subscriber::filter::{Directive, EnvFilter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Glog formatted events on stderr. `RUST_LOG` filters, `info` by default.
///
/// Only binaries call this; the library itself never installs a subscriber.
pub fn init() -> Result<(), SetGlobalDefaultError> {
	let default = Directive::from(tracing::Level::INFO);

	let fmt = tracing_subscriber::fmt::Layer::default()
		.with_ansi(stderr().is_terminal())
		.with_writer(stderr)
		.event_format(Glog::default().with_timer(tracing_glog::LocalTime::default()))
		.fmt_fields(GlogFields::default().compact());

	let filter = EnvFilter::builder()
		.with_default_directive(default)
		.from_env_lossy();

	let subscriber = Registry::default().with(filter).with(fmt);
	tracing::subscriber::set_global_default(subscriber)
}

use tracing_subscriber::fmt::format::JsonFields;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub const DEFAULT_FILTER: &str = "info,caption_player=debug,caption_socket=debug,chunk_upload=debug";

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing(json: bool) {
	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

	let fmt_layer = if json {
		tracing_subscriber::fmt::layer()
			.fmt_fields(JsonFields::default())
			.event_format(tracing_subscriber::fmt::format().json().flatten_event(true).with_span_list(false))
			.boxed()
	} else {
		tracing_subscriber::fmt::layer().with_target(true).boxed()
	};

	tracing_subscriber::registry().with(env_filter).with(fmt_layer).init();
}

use std::fmt;
use std::sync::OnceLock;

use time::macros::format_description;
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::{
    format, time::FormatTime, FmtContext, FormatEvent, FormatFields, FormattedFields,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

struct BracketedTime;

impl FormatTime for BracketedTime {
    fn format_time(&self, w: &mut format::Writer<'_>) -> fmt::Result {
        let now = time::OffsetDateTime::now_utc();
        let formatted = now
            .format(&format_description!(
                "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
            ))
            .map_err(|_| fmt::Error)?;
        write!(w, "[{}]", formatted)
    }
}

struct BracketedFormatter;

impl<S, N> FormatEvent<S, N> for BracketedFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        BracketedTime.format_time(&mut writer)?;

        write!(
            writer,
            "[{}]",
            event.metadata().level().to_string().to_lowercase()
        )?;

        // Extract request_id from span context if present
        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                let extensions = span.extensions();
                if let Some(fields) = extensions.get::<FormattedFields<N>>() {
                    if let Some(rid) = request_id(fields.fields.as_str()) {
                        write!(writer, " request_id={}", rid)?;
                        break;
                    }
                }
            }
        }

        write!(writer, " ")?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

fn request_id(fields: &str) -> Option<&str> {
    let start = fields.find("request_id=")?;
    let rest = &fields[start + "request_id=".len()..];
    let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    Some(&rest[..end])
}

static INIT_LOGGER: OnceLock<()> = OnceLock::new();

/// Install the global log subscriber. `RUST_LOG` selects the filter,
/// defaulting to `info`. Later calls are no-ops.
pub fn init_logger() {
    INIT_LOGGER.get_or_init(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        // no ANSI to keep fields parseable
        let fmt_layer = tracing_subscriber::fmt::layer()
            .event_format(BracketedFormatter)
            .fmt_fields(format::DefaultFields::new())
            .with_ansi(false);

        if let Err(err) = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
        {
            eprintln!("failed to install log subscriber: {err}");
        }
    });
}

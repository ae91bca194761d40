//! Tracing subscriber setup: plain-text console formatter and stage prefixes.
use std::fmt;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber, span};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::layer::{self, SubscriberExt as _};
use tracing_subscriber::registry::LookupSpan;

use super::types::{DRY_RUN_TARGET, STAGE_SPAN, STAGE_TARGET};

/// Environment variable that overrides the console filter (e.g. `VAI_LOG=debug`).
pub const LOG_ENV: &str = "VAI_LOG";

/// Extracts the `message` field from a [`tracing::Event`].
#[derive(Default)]
struct MessageExtractor {
    message: String,
}

impl Visit for MessageExtractor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}

/// Console prefix stored in the extensions of a `stage` span.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StagePrefix(String);

/// Collects the `position`, `total` and `name` fields of a `stage` span.
#[derive(Debug, Default)]
struct StageFields {
    position: Option<u64>,
    total: Option<u64>,
    name: Option<String>,
}

impl StageFields {
    fn prefix(&self) -> Option<String> {
        let name = self.name.as_deref()?;
        Some(match (self.position, self.total) {
            (Some(position), Some(total)) => format!("[{position}/{total}] {name}: "),
            _ => format!("{name}: "),
        })
    }
}

impl Visit for StageFields {
    fn record_u64(&mut self, field: &Field, value: u64) {
        match field.name() {
            "position" => self.position = Some(value),
            "total" => self.total = Some(value),
            _ => {}
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        if let Ok(value) = u64::try_from(value) {
            self.record_u64(field, value);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "name" {
            self.name = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "name" {
            self.name = Some(format!("{value:?}"));
        }
    }
}

/// A [`tracing_subscriber::Layer`] that turns the fields of each `stage`
/// span into the `[n/N] name: ` prefix used by [`ConsoleFormatter`].
#[derive(Debug, Default)]
struct StagePrefixLayer;

impl<S> tracing_subscriber::Layer<S> for StagePrefixLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: layer::Context<'_, S>) {
        if attrs.metadata().name() != STAGE_SPAN {
            return;
        }
        let mut fields = StageFields::default();
        attrs.record(&mut fields);
        if let Some(prefix) = fields.prefix()
            && let Some(span) = ctx.span(id)
        {
            span.extensions_mut().insert(StagePrefix(prefix));
        }
    }
}

/// Render one console line.
///
/// Stage headers get `==>`, dry-run actions `[DRY]`, debug lines `#`.
pub(super) fn render_line(level: Level, target: &str, prefix: &str, msg: &str) -> String {
    match (level, target) {
        (Level::ERROR, _) => format!("{prefix}error: {msg}"),
        (Level::WARN, _) => format!("{prefix}warning: {msg}"),
        (Level::INFO, STAGE_TARGET) => format!("{prefix}==> {msg}"),
        (Level::INFO, DRY_RUN_TARGET) => format!("{prefix}[DRY] {msg}"),
        (Level::INFO, _) => format!("{prefix}{msg}"),
        _ => format!("{prefix}# {msg}"),
    }
}

/// A [`FormatEvent`] that emits the installer's plain-text console lines.
struct ConsoleFormatter;

impl<S, N> FormatEvent<S, N> for ConsoleFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        // Innermost stage span wins.
        let mut prefix = String::new();
        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                if let Some(found) = span.extensions().get::<StagePrefix>() {
                    prefix.clone_from(&found.0);
                }
            }
        }

        let mut extractor = MessageExtractor::default();
        event.record(&mut extractor);

        let metadata = event.metadata();
        writeln!(
            writer,
            "{}",
            render_line(
                *metadata.level(),
                metadata.target(),
                &prefix,
                &extractor.message
            )
        )
    }
}

/// Build the console filter: `DEBUG` when verbose, `INFO` otherwise, unless
/// [`LOG_ENV`] says otherwise.
fn console_filter(verbose: bool) -> EnvFilter {
    let default = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    EnvFilter::builder()
        .with_default_directive(default.into())
        .with_env_var(LOG_ENV)
        .from_env_lossy()
}

/// Assemble the console subscriber writing to `make_writer`.
pub(super) fn console_subscriber<W>(
    verbose: bool,
    make_writer: W,
) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let console_layer = tracing_subscriber::fmt::layer()
        .event_format(ConsoleFormatter)
        .with_writer(make_writer);

    tracing_subscriber::registry()
        .with(console_filter(verbose))
        .with(StagePrefixLayer)
        .with(console_layer)
}

/// Initialise the global [`tracing`] subscriber.
///
/// All output goes to stdout as plain text. Must be called once at program
/// startup, before any logging.
pub fn init_subscriber(verbose: bool) {
    use tracing_subscriber::util::SubscriberInitExt as _;

    console_subscriber(verbose, std::io::stdout).init();
}

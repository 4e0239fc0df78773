use dotenvy::dotenv;
use regex::Regex;
use sessiongen_bot::backend::Backends;
use sessiongen_bot::bot::handlers::{self, Command};
use sessiongen_bot::config::{Settings, SESSION_TIMEOUT_SECS, SWEEP_INTERVAL_SECS};
use sessiongen_bot::flow::controller::ConversationController;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Regex patterns for redacting secrets from log output.
///
/// Everything this process touches is a credential: the bot token, the
/// application hash, and the exported session strings themselves.
struct RedactionPatterns {
    token_url: Regex,
    token: Regex,
    api_hash: Regex,
    session_string: Regex,
}

impl RedactionPatterns {
    /// Initialize all regex patterns
    ///
    /// # Errors
    ///
    /// Returns an error if any regex pattern is invalid
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            token_url: Regex::new(r"(https?://[^/]+/bot)([0-9]+:[A-Za-z0-9_-]+)(/?)")?,
            token: Regex::new(r"[0-9]{8,10}:[A-Za-z0-9_-]{35}")?,
            api_hash: Regex::new(r"(?i)(api_hash[=:]\s*)[0-9a-f]{32}")?,
            // Long url-safe base64 runs are session payloads
            session_string: Regex::new(r"[A-Za-z0-9_-]{88,}={0,2}")?,
        })
    }

    fn redact(&self, input: &str) -> String {
        let mut output = input.to_string();
        output = self
            .token_url
            .replace_all(&output, "$1[BOT_TOKEN]$3")
            .to_string();
        output = self.token.replace_all(&output, "[BOT_TOKEN]").to_string();
        output = self
            .api_hash
            .replace_all(&output, "$1[API_HASH]")
            .to_string();
        output = self
            .session_string
            .replace_all(&output, "[SESSION_STRING]")
            .to_string();
        output
    }
}

struct RedactingWriter<W: Write> {
    inner: W,
    patterns: Arc<RedactionPatterns>,
}

impl<W: Write> RedactingWriter<W> {
    const fn new(inner: W, patterns: Arc<RedactionPatterns>) -> Self {
        Self { inner, patterns }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let redacted = self.patterns.redact(&s);
        self.inner.write_all(redacted.as_bytes())?;
        // We return the original buffer length to satisfy the contract,
        // even if the redacted string length differs.
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter<F> {
    make_inner: F,
    patterns: Arc<RedactionPatterns>,
}

impl<F> RedactingMakeWriter<F> {
    const fn new(make_inner: F, patterns: Arc<RedactionPatterns>) -> Self {
        Self {
            make_inner,
            patterns,
        }
    }
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::new((self.make_inner)(), self.patterns.clone())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenv().ok();

    // Initialize redaction patterns early (before logging)
    let patterns = Arc::new(RedactionPatterns::new().map_err(|e| {
        eprintln!("Failed to compile redaction patterns: {e}");
        e
    })?);

    init_logging(patterns);

    info!("Starting session string generator bot...");

    let settings = init_settings();

    let controller = Arc::new(ConversationController::new(Backends::from_settings(
        &settings,
    )));
    spawn_idle_sweeper(controller.clone());

    let bot = Bot::new(settings.bot_token.clone());
    let handler = setup_handler();

    info!("Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![controller])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

fn init_logging(patterns: Arc<RedactionPatterns>) {
    let make_writer = RedactingMakeWriter::new(io::stderr, patterns);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}

fn init_settings() -> Arc<Settings> {
    match Settings::new() {
        Ok(s) => {
            info!("Configuration loaded successfully.");
            Arc::new(s)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    }
}

/// Periodically tears down conversations that went quiet mid-flow, so an
/// abandoned login can never hold its connection open indefinitely
fn spawn_idle_sweeper(controller: Arc<ConversationController>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(SWEEP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            let expired = controller
                .expire_idle(Duration::from_secs(SESSION_TIMEOUT_SECS))
                .await;
            if expired > 0 {
                info!(expired, "cleared idle conversations");
            }
        }
    });
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry().branch(
        Update::filter_message()
            .branch(
                dptree::entry()
                    .filter_command::<Command>()
                    .endpoint(dispatch_command),
            )
            .branch(
                dptree::filter(|msg: Message| handlers::is_conversational_text(&msg))
                    .endpoint(dispatch_text),
            ),
    )
}

async fn dispatch_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    controller: Arc<ConversationController>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::handle_command(bot, msg, cmd, controller).await {
        error!("Command handler error: {e}");
    }
    respond(())
}

async fn dispatch_text(
    bot: Bot,
    msg: Message,
    controller: Arc<ConversationController>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::handle_text(bot, msg, controller).await {
        error!("Text handler error: {e}");
    }
    respond(())
}

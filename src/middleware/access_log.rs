//! Access-log middleware.
//!
//! Wraps a handler and writes one line per request:
//!
//! ```text
//! [accesslogs] m=GET p=/users?id=5 t=412
//! ```
//!
//! `t` is in microseconds, or in milliseconds when colors are enabled.
//!
//! ```rust,no_run
//! use accesslogs::middleware::AccessLog;
//! use accesslogs::{Method, Request, Router, Server};
//!
//! # async fn list_users(_: Request) -> &'static str { "[]" }
//! # async fn run() -> Result<(), accesslogs::Error> {
//! let app = Router::new()
//!     .on(Method::GET, "/users", list_users)
//!     .into_handler();
//!
//! let app = AccessLog::new()
//!     .skip_paths_with_dots()
//!     .ignore_paths(["/healthz", "/readyz"])
//!     .ignore_path_prefixes(["/internal/"])
//!     .wrap(app);
//!
//! Server::bind("0.0.0.0:3000").serve(app).await
//! # }
//! ```
//!
//! # Filtering
//!
//! A request is skipped when its target (path plus query string) matches an
//! ignore rule. Rules are checked in a fixed order, first match wins:
//!
//! 1. [`skip_paths_with_dots`](AccessLog::skip_paths_with_dots): the target
//!    contains a `.` anywhere.
//! 2. [`ignore_paths`](AccessLog::ignore_paths): the target equals an entry.
//!    `/health` does not match `/health/`.
//! 3. [`ignore_path_prefixes`](AccessLog::ignore_path_prefixes): the target
//!    starts with an entry. Matching is literal, so `/internal` also matches
//!    `/internalize`.
//!
//! Skipped requests are passed straight through: no timer, no line.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use http::Method;
use nu_ansi_term::Color;

use crate::handler::{BoxedHandler, Handler};
use crate::request::Request;
use crate::response::Response;

const PREFIX: &str = "[accesslogs]";

// ── Sink ──────────────────────────────────────────────────────────────────────

/// Destination for formatted access-log lines.
///
/// Called once per logged request, possibly from many tasks at once.
/// Implementations must not interleave partial lines.
///
/// Any `Fn(&str) + Send + Sync + 'static` closure is a sink.
pub trait LogSink: Send + Sync + 'static {
    fn write_line(&self, line: &str);
}

/// Default sink: an `INFO` event with target `accesslogs`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write_line(&self, line: &str) {
        tracing::info!(target: "accesslogs", "{line}");
    }
}

impl<F> LogSink for F
where
    F: Fn(&str) + Send + Sync + 'static,
{
    fn write_line(&self, line: &str) {
        (self)(line)
    }
}

// ── Config ────────────────────────────────────────────────────────────────────

/// Filtering and formatting options of an [`AccessLog`].
///
/// Read-only once the middleware is built.
#[derive(Clone, Debug, Default)]
pub struct Config {
    colors: bool,
    skip_paths_with_dots: bool,
    ignored_paths: HashSet<String>,
    ignored_path_prefixes: Vec<String>,
}

impl Config {
    pub fn colors(&self) -> bool { self.colors }
    pub fn skips_paths_with_dots(&self) -> bool { self.skip_paths_with_dots }
    pub fn ignored_paths(&self) -> &HashSet<String> { &self.ignored_paths }
    pub fn ignored_path_prefixes(&self) -> &[String] { &self.ignored_path_prefixes }

    /// Whether a request for `path` is passed through without a log line.
    pub fn should_ignore(&self, path: &str) -> bool {
        if self.skip_paths_with_dots && path.contains('.') {
            return true;
        }
        if self.ignored_paths.contains(path) {
            return true;
        }
        // Linear scan: prefix lists are a handful of entries in practice.
        self.ignored_path_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }
}

// ── AccessLog ─────────────────────────────────────────────────────────────────

/// Access-log middleware builder.
///
/// Every setter consumes and returns the builder; [`wrap`](AccessLog::wrap)
/// consumes it for good.
pub struct AccessLog {
    config: Config,
    sink: Box<dyn LogSink>,
}

impl AccessLog {
    /// No colors, no filters, lines go to [`TracingSink`].
    pub fn new() -> Self {
        Self { config: Config::default(), sink: Box::new(TracingSink) }
    }

    /// Renders method, path and duration in ANSI colors, duration in
    /// milliseconds.
    pub fn with_colors(mut self) -> Self {
        self.config.colors = true;
        self
    }

    /// Skips any request whose target contains a `.`, typically static
    /// assets such as `/static/app.js`.
    pub fn skip_paths_with_dots(mut self) -> Self {
        self.config.skip_paths_with_dots = true;
        self
    }

    /// Skips requests whose target equals one of `paths`.
    ///
    /// Replaces any set given earlier.
    pub fn ignore_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.ignored_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Skips requests whose target starts with one of `prefixes`.
    ///
    /// Replaces any list given earlier.
    pub fn ignore_path_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.ignored_path_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Sends lines to `sink` instead of `tracing`.
    pub fn sink(mut self, sink: impl LogSink) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Wraps `next`, logging every request it serves that is not ignored.
    ///
    /// The response of `next` is returned untouched. A panic in `next`
    /// unwinds through the returned handler and no line is written.
    pub fn wrap(self, next: impl Handler) -> impl Handler {
        let next = next.into_boxed_handler();
        let log = Arc::new(self);
        move |req: Request| {
            let next = Arc::clone(&next);
            let log = Arc::clone(&log);
            async move { log.call(next, req).await }
        }
    }

    async fn call(&self, next: BoxedHandler, req: Request) -> Response {
        let target = req.path_and_query().to_owned();
        if self.config.should_ignore(&target) {
            return next.call(req).await;
        }

        let method = req.method().clone();
        let start = Instant::now();
        let response = next.call(req).await;
        let elapsed = start.elapsed();

        self.sink.write_line(&format_line(self.config.colors, &method, &target, elapsed));
        response
    }
}

impl Default for AccessLog {
    fn default() -> Self { Self::new() }
}

impl fmt::Debug for AccessLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessLog")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn format_line(colors: bool, method: &Method, target: &str, elapsed: Duration) -> String {
    if colors {
        format!(
            "{PREFIX} m={} p={} t={}",
            Color::Blue.paint(method.as_str()),
            Color::Yellow.paint(target),
            Color::Green.paint(elapsed.as_millis().to_string()),
        )
    } else {
        format!("{PREFIX} m={method} p={target} t={}", elapsed.as_micros())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bytes::Bytes;
    use http::StatusCode;

    use super::*;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<String>>>);

    impl Capture {
        fn lines(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    impl LogSink for Capture {
        fn write_line(&self, line: &str) {
            self.0.lock().unwrap().push(line.to_owned());
        }
    }

    fn request(method: Method, uri: &str) -> Request {
        http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Bytes::new())
            .unwrap()
            .into()
    }

    /// A handler that counts its calls and answers `200 ok`.
    fn counting(hits: Arc<AtomicUsize>) -> impl Handler {
        move |_req: Request| {
            let hits = Arc::clone(&hits);
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                "ok"
            }
        }
    }

    /// Runs one request through `log` wrapped around a counting handler and
    /// returns the captured lines and the number of handler calls.
    async fn run(log: AccessLog, uri: &str) -> (Vec<String>, usize) {
        let capture = Capture::default();
        let hits = Arc::new(AtomicUsize::new(0));
        let app = log
            .sink(capture.clone())
            .wrap(counting(Arc::clone(&hits)))
            .into_boxed_handler();

        let res = app.call(request(Method::GET, uri)).await;
        assert_eq!(res.status_code(), StatusCode::OK);
        (capture.lines(), hits.load(Ordering::SeqCst))
    }

    fn micros(line: &str) -> u128 {
        line.rsplit_once("t=").unwrap().1.parse().unwrap()
    }

    // ── should_ignore ─────────────────────────────────────────────────────────

    #[test]
    fn default_config_ignores_nothing() {
        let config = AccessLog::new().config().clone();
        assert!(!config.colors());
        assert!(!config.should_ignore("/"));
        assert!(!config.should_ignore(""));
        assert!(!config.should_ignore("/static/app.js"));
    }

    #[test]
    fn dots_only_skipped_when_enabled() {
        assert!(!AccessLog::new().config().skips_paths_with_dots());

        let log = AccessLog::new().skip_paths_with_dots();
        assert!(log.config().skips_paths_with_dots());
        assert!(log.config().should_ignore("/static/app.js"));
        assert!(log.config().should_ignore("/search?q=1.5"));
        assert!(!log.config().should_ignore("/static/app"));
    }

    #[test]
    fn exact_paths_match_exactly() {
        let log = AccessLog::new().ignore_paths(["/health"]);
        assert!(log.config().should_ignore("/health"));
        assert!(!log.config().should_ignore("/health/"));
        assert!(!log.config().should_ignore("/healthz"));
    }

    #[test]
    fn prefixes_match_literally() {
        let log = AccessLog::new().ignore_path_prefixes(["/internal/"]);
        assert!(log.config().should_ignore("/internal/metrics"));
        assert!(!log.config().should_ignore("/internalize"));
        assert!(!log.config().should_ignore("/internal"));
    }

    #[test]
    fn empty_entries() {
        let log = AccessLog::new().ignore_paths([""]);
        assert!(log.config().should_ignore(""));
        assert!(!log.config().should_ignore("/"));

        // An empty prefix is a prefix of everything.
        let log = AccessLog::new().ignore_path_prefixes([""]);
        assert!(log.config().should_ignore("/anything"));
    }

    #[test]
    fn setters_replace_previous_values() {
        let log = AccessLog::new()
            .ignore_paths(["/a"])
            .ignore_paths(["/b"])
            .ignore_path_prefixes(["/x/"])
            .ignore_path_prefixes(["/y/"]);

        assert!(!log.config().should_ignore("/a"));
        assert!(log.config().should_ignore("/b"));
        assert!(!log.config().should_ignore("/x/1"));
        assert!(log.config().should_ignore("/y/1"));
        assert_eq!(log.config().ignored_paths().len(), 1);
        assert_eq!(log.config().ignored_path_prefixes(), ["/y/".to_owned()]);
    }

    // ── wrap ──────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn logs_plain_line_in_micros() {
        let (lines, hits) = run(AccessLog::new(), "/users?id=5").await;

        assert_eq!(hits, 1);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("[accesslogs] m=GET p=/users?id=5 t="), "{}", lines[0]);
        assert!(!lines[0].contains('\x1b'));
        assert!(micros(&lines[0]) < 1_000_000, "{}", lines[0]);
    }

    #[tokio::test]
    async fn logs_colored_line_in_millis() {
        let (lines, hits) = run(AccessLog::new().with_colors(), "/users?id=5").await;

        assert_eq!(hits, 1);
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert!(line.starts_with("[accesslogs] m=\x1b[34mGET\x1b[0m p=\x1b[33m/users?id=5\x1b[0m t=\x1b[32m"), "{line:?}");
        assert!(line.ends_with("\x1b[0m"));

        let (_, millis) = line.rsplit_once("t=\x1b[32m").unwrap();
        let millis: u128 = millis.trim_end_matches("\x1b[0m").parse().unwrap();
        assert!(millis < 1_000, "{line:?}");
    }

    #[tokio::test]
    async fn ignored_requests_still_reach_handler() {
        let cases = [
            (AccessLog::new().skip_paths_with_dots(), "/static/app.js"),
            (AccessLog::new().ignore_paths(["/health"]), "/health"),
            (AccessLog::new().ignore_path_prefixes(["/internal/"]), "/internal/metrics"),
        ];

        for (log, uri) in cases {
            let (lines, hits) = run(log, uri).await;
            assert!(lines.is_empty(), "{uri} was logged: {lines:?}");
            assert_eq!(hits, 1, "{uri}");
        }
    }

    #[tokio::test]
    async fn near_misses_are_logged() {
        let (lines, _) = run(AccessLog::new().ignore_paths(["/health"]), "/health/").await;
        assert_eq!(lines.len(), 1);

        let (lines, _) = run(AccessLog::new().ignore_path_prefixes(["/internal/"]), "/internalize").await;
        assert_eq!(lines.len(), 1);
    }

    #[tokio::test]
    async fn duration_covers_the_handler() {
        let capture = Capture::default();
        let app = AccessLog::new()
            .sink(capture.clone())
            .wrap(|_req: Request| async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                StatusCode::NO_CONTENT
            })
            .into_boxed_handler();

        let res = app.call(request(Method::DELETE, "/users/42")).await;
        assert_eq!(res.status_code(), StatusCode::NO_CONTENT);

        let lines = capture.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("m=DELETE p=/users/42 "));
        assert!(micros(&lines[0]) >= 20_000, "{}", lines[0]);
    }

    /// `io::Write` target for a `tracing-subscriber` fmt layer.
    #[derive(Clone, Default)]
    struct Output(Arc<Mutex<Vec<u8>>>);

    impl Output {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl std::io::Write for Output {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn subscriber(output: Output) -> impl tracing::Subscriber + Send + Sync {
        tracing_subscriber::fmt()
            .with_writer(move || output.clone())
            .with_ansi(false)
            .without_time()
            .finish()
    }

    #[test]
    fn tracing_sink_emits_info_with_accesslogs_target() {
        let output = Output::default();
        tracing::subscriber::with_default(subscriber(output.clone()), || {
            TracingSink.write_line("[accesslogs] m=GET p=/users t=7");
        });

        let logged = output.contents();
        assert_eq!(logged.lines().count(), 1, "{logged}");
        assert_eq!(logged.trim(), "INFO accesslogs: [accesslogs] m=GET p=/users t=7");
    }

    #[tokio::test]
    async fn default_sink_is_tracing() {
        let output = Output::default();
        let _guard = tracing::subscriber::set_default(subscriber(output.clone()));

        let app = AccessLog::new()
            .ignore_paths(["/health"])
            .wrap(|_req: Request| async { "ok" })
            .into_boxed_handler();
        app.call(request(Method::GET, "/health")).await;
        app.call(request(Method::GET, "/users?id=5")).await;

        let logged = output.contents();
        assert_eq!(logged.lines().count(), 1, "{logged}");
        assert!(logged.contains("INFO accesslogs: [accesslogs] m=GET p=/users?id=5 t="), "{logged}");
    }

    #[tokio::test]
    async fn closure_sink() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let lines = Arc::clone(&lines);
            move |line: &str| lines.lock().unwrap().push(line.to_owned())
        };
        let app = AccessLog::new()
            .sink(sink)
            .wrap(|_req: Request| async { "ok" })
            .into_boxed_handler();

        app.call(request(Method::POST, "/users")).await;
        assert_eq!(lines.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn handler_panic_propagates_without_line() {
        let capture = Capture::default();
        let app = AccessLog::new()
            .sink(capture.clone())
            .wrap(|_req: Request| async {
                if true {
                    panic!("boom");
                }
                "unreachable"
            })
            .into_boxed_handler();

        let err = tokio::spawn(app.call(request(Method::GET, "/users")))
            .await
            .unwrap_err();
        assert!(err.is_panic());
        assert!(capture.lines().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_log_one_line_each() {
        let capture = Capture::default();
        let hits = Arc::new(AtomicUsize::new(0));
        let app = AccessLog::new()
            .ignore_paths(["/health"])
            .sink(capture.clone())
            .wrap(counting(Arc::clone(&hits)))
            .into_boxed_handler();

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..64 {
            let uri = if i % 4 == 0 { "/health".to_owned() } else { format!("/users/{i}") };
            tasks.spawn(app.call(request(Method::GET, &uri)));
        }
        while let Some(res) = tasks.join_next().await {
            assert_eq!(res.unwrap().status_code(), StatusCode::OK);
        }

        assert_eq!(hits.load(Ordering::SeqCst), 64);
        assert_eq!(capture.lines().len(), 48);
    }
}

//! The `search` and `repl` commands.

use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use smartsource_config::Config;
use smartsource_protocols::{SearchError, SearchRequest, SearchResponse};
use smartsource_retrieval::SearchEngine;

use crate::cli::{parse_filters, QueryOptions};
use crate::register::{build_embedder, index_registry};

/// Build an engine with every configured index.
pub(crate) async fn build_engine(config: &Config) -> Result<SearchEngine, SearchError> {
    let embedder = build_embedder(&config.embedding);
    SearchEngine::from_config(config, index_registry(), embedder).await
}

/// Turn query text and CLI options into a request.
pub(crate) fn build_request(text: &str, options: &QueryOptions) -> Result<SearchRequest, String> {
    let mut request = SearchRequest::new(text);
    request.filters = parse_filters(&options.filters)?;
    request.offset = options.offset;
    request.limit = options.limit;
    request.mode = options.mode;
    Ok(request)
}

pub(crate) fn render(response: &SearchResponse, pretty: bool) -> Result<String, serde_json::Error> {
    if pretty {
        serde_json::to_string_pretty(response)
    } else {
        serde_json::to_string(response)
    }
}

/// Run one query and return the rendered response.
pub(crate) async fn run_search(
    engine: &SearchEngine,
    text: &str,
    options: &QueryOptions,
) -> Result<String, Box<dyn std::error::Error>> {
    let request = build_request(text, options)?;
    let response = engine.search(request).await?;
    if response.degraded {
        warn!(failed = ?response.sources_failed, "Partial results");
    }
    Ok(render(&response, options.pretty)?)
}

/// Answer one query per input line until EOF, cancellation or Ctrl-C.
///
/// Errors on a single line are written to stderr and do not stop the loop.
/// Returns the number of queries answered.
pub(crate) async fn run_repl<R, W>(
    engine: &SearchEngine,
    options: &QueryOptions,
    input: R,
    out: &mut W,
    shutdown: CancellationToken,
) -> Result<usize, Box<dyn std::error::Error>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let mut answered = 0;

    loop {
        let line = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            break;
        };

        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        match run_search(engine, text, options).await {
            Ok(json) => {
                writeln!(out, "{}", json)?;
                out.flush()?;
                answered += 1;
            }
            Err(e) => eprintln!("error: {}", e),
        }
    }

    info!(queries = answered, "REPL finished");
    Ok(answered)
}

/// Cancel `token` on Ctrl-C. Abort the returned handle when done with it.
fn watch_ctrl_c(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    })
}

/// Wait for a background task. Returns false, and logs, if it panicked.
async fn join_background(name: &str, handle: JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(e) if e.is_cancelled() => true,
        Err(e) => {
            error!(task = name, "Background task failed: {}", e);
            false
        }
    }
}

/// Interactive loop on stdin with the cache sweeper running alongside.
pub(crate) async fn repl(
    engine: &SearchEngine,
    options: &QueryOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let shutdown = CancellationToken::new();
    let sweeper =
        engine.start_cache_sweeper(engine.settings().cache.sweep_interval(), shutdown.child_token());
    let ctrl_c = watch_ctrl_c(shutdown.clone());

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    let result = run_repl(engine, options, stdin, &mut stdout, shutdown.clone()).await;

    ctrl_c.abort();
    shutdown.cancel();
    join_background("ctrl_c", ctrl_c).await;
    if let Some(handle) = sweeper {
        join_background("cache_sweeper", handle).await;
    }
    result.map(|_| ())
}

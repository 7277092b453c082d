//! Pipe: one raw record per input line in, one JSON result per output line out.

use std::io::{self, BufRead, Write};

use serde::Serialize;
use tracing::{info, warn};

use crate::conf::NormalizerConfig;
use crate::parser::{DeadLetter, ErrorKind, Registry};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct PipeSummary {
    pub lines: usize,
    pub results: usize,
    pub rejected: usize,
}

/// Dispatch every non-blank line of `input` as `log_type` and write the
/// results to `output`. Rejected lines are logged as dead letters; only I/O
/// failures end the run.
pub fn normalize_lines<R, W>(
    registry: &Registry,
    log_type: &str,
    excerpt_limit: usize,
    input: R,
    output: &mut W,
) -> io::Result<PipeSummary>
where
    R: BufRead,
    W: Write,
{
    let mut summary = PipeSummary::default();

    for line in input.split(b'\n') {
        let line = line?;
        let raw = match std::str::from_utf8(&line) {
            Ok(raw) => raw.trim_end_matches('\r'),
            Err(e) => {
                summary.lines += 1;
                summary.rejected += 1;
                report(&undecodable_line(log_type, &line, e, excerpt_limit));
                continue;
            }
        };
        if raw.trim().is_empty() {
            continue;
        }
        summary.lines += 1;

        match registry.dispatch(log_type, raw) {
            Ok(records) => {
                for record in &records {
                    serde_json::to_writer(&mut *output, record)?;
                    output.write_all(b"\n")?;
                }
                summary.results += records.len();
            }
            Err(e) => {
                summary.rejected += 1;
                report(&e.dead_letter(raw, excerpt_limit));
            }
        }
    }

    output.flush()?;
    Ok(summary)
}

/// Dead letter for a line that is not UTF-8. The excerpt is lossy, the
/// length is that of the bytes as read.
fn undecodable_line(
    log_type: &str,
    line: &[u8],
    error: std::str::Utf8Error,
    excerpt_limit: usize,
) -> DeadLetter {
    let text = String::from_utf8_lossy(line);
    let mut letter =
        DeadLetter::new(log_type, ErrorKind::Decode, error.to_string(), &text, excerpt_limit);
    letter.raw_len = line.len();
    letter
}

fn report(letter: &DeadLetter) {
    let kind = letter.kind.as_str();
    match serde_json::to_string(letter) {
        Ok(json) => warn!(log_type = %letter.log_type, kind, dead_letter = %json, "Dead letter"),
        Err(_) => warn!(log_type = %letter.log_type, kind, error = %letter.error, "Dead letter"),
    }
}

/// Normalize stdin to stdout, then log the run summary and metrics.
pub fn run(
    registry: &Registry,
    config: &NormalizerConfig,
    log_type: &str,
) -> io::Result<PipeSummary> {
    let stdin = io::stdin();
    let mut stdout = io::BufWriter::new(io::stdout().lock());

    let summary = normalize_lines(
        registry,
        log_type,
        config.dead_letter_excerpt,
        stdin.lock(),
        &mut stdout,
    )?;

    info!(
        "Processed {} lines: {} results, {} rejected",
        summary.lines, summary.results, summary.rejected
    );
    match serde_json::to_string(&registry.metrics().snapshot()) {
        Ok(snapshot) => info!(metrics = %snapshot, "Normalizer metrics"),
        Err(e) => warn!("Failed to serialize metrics snapshot: {}", e),
    }
    Ok(summary)
}

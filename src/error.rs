//! Typed error enums for the subsystems that need to distinguish failure
//! kinds from their callers. Orchestration code (the scanner loop, the
//! scheduler) still talks in `anyhow::Result` at its own boundary.

use thiserror::Error;

/// Failures that can occur while vending a client from the provider pool.
/// Both are recoverable by rotation/retry; neither should ever propagate
/// out of a scan pass. Per-provider connect failures (bad URL, network
/// error, wrong chain id) never reach a caller as a typed error — they are
/// folded into `AllProvidersExhausted` once every endpoint has been tried.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no RPC providers configured")]
    NoProvidersConfigured,

    #[error("all configured providers exhausted")]
    AllProvidersExhausted,
}

/// Failures within a single price strategy. A strategy reports "no data at
/// this block" via `Ok(None)` (missing feed, zero/negative answer, contract
/// not deployed yet — all legitimate, all handled by falling through to the
/// next layer); `Transport` is the only variant ever constructed, covering
/// exhausted transient transport failures.
#[derive(Debug, Error)]
pub enum PriceError {
    #[error("transport error calling {contract} at block {block}: {source}")]
    Transport {
        contract: String,
        block: u64,
        #[source]
        source: anyhow::Error,
    },
}

/// Failures writing to the canonical CSV.
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("failed to acquire exclusive lock on {path}: {source}")]
    Lock {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV encode/decode error: {0}")]
    Csv(#[from] csv::Error),
}

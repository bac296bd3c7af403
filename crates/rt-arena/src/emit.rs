//! Structured TSV-style logging helpers.
//!
//! Mirrors the key=value, tab-separated log line convention used elsewhere in
//! the host's tooling, so arena chunk/reset events read the same way as other
//! runtime diagnostics.

/// Build a TSV-formatted log string from key-value pairs.
/// Values are sanitized to prevent TSV format corruption.
pub fn log_tsv(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| {
            let sanitized = v.replace(['\t', '\n', '\r'], " ");
            format!("{k}={sanitized}")
        })
        .collect::<Vec<_>>()
        .join("\t")
}

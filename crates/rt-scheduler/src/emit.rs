//! Structured TSV-style logging helpers, matching the key=value,
//! tab-separated convention used by [`rt_arena`](../../rt-arena) and the
//! host's own tooling.

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

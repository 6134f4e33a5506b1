//! Tracing configuration for debugging descriptor resolution and matching.
//!
//! Supports three output formats controlled by `RTTI_LOG_FORMAT`:
//!
//! - `text` (default): Standard `tracing-subscriber` flat output
//! - `tree`: Hierarchical indented output via `tracing-tree`
//! - `json`: One JSON object per span/event
//!
//! ## Quick start
//!
//! ```bash
//! # Follow every alias hop and guard decision
//! RTTI_LOG=rtti_core=trace RTTI_LOG_FORMAT=tree rtti-check --types t.json --type User v.json
//!
//! # Only matcher decisions, as JSON
//! RTTI_LOG="rtti_core::matcher=debug" RTTI_LOG_FORMAT=json rtti-check ...
//! ```
//!
//! The subscriber is only initialised when `RTTI_LOG` (or `RUST_LOG`) is set.

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt};
use tracing_tree::HierarchicalLayer;

/// Tracing output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Standard flat text lines (default).
    Text,
    /// Hierarchical indented tree via `tracing-tree`.
    Tree,
    /// Newline-delimited JSON objects.
    Json,
}

impl LogFormat {
    /// Parse a format name; unknown names fall back to [`LogFormat::Text`].
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "tree" => Self::Tree,
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    fn from_env() -> Self {
        Self::parse(&std::env::var("RTTI_LOG_FORMAT").unwrap_or_default())
    }
}

/// `RTTI_LOG` wins over `RUST_LOG` when both are set.
fn build_filter() -> EnvFilter {
    if let Ok(val) = std::env::var("RTTI_LOG") {
        EnvFilter::builder().parse_lossy(val)
    } else {
        EnvFilter::from_default_env()
    }
}

/// Indented tree output. Spans are only printed once an event happens inside
/// them, and re-printed when output returns to them after a sibling.
fn tree_layer<W>(writer: W) -> HierarchicalLayer<W>
where
    W: for<'writer> MakeWriter<'writer> + 'static,
{
    HierarchicalLayer::default()
        .with_writer(writer)
        .with_indent_amount(2)
        .with_indent_lines(true)
        .with_deferred_spans(true)
        .with_span_retrace(true)
        .with_targets(true)
}

/// Initialise the global tracing subscriber.
///
/// Does nothing when neither `RTTI_LOG` nor `RUST_LOG` is set. Output always
/// goes to stderr so it never mixes with check results on stdout.
pub fn init_tracing() {
    let has_rtti_log = std::env::var("RTTI_LOG").is_ok();
    let has_rust_log = std::env::var("RUST_LOG").is_ok();
    if !has_rtti_log && !has_rust_log {
        return;
    }

    let filter = build_filter();

    match LogFormat::from_env() {
        LogFormat::Tree => {
            Registry::default()
                .with(filter)
                .with(tree_layer(std::io::stderr))
                .init();
        }
        LogFormat::Json => {
            let json_layer = fmt::layer().json().with_writer(std::io::stderr);

            Registry::default().with(filter).with(json_layer).init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[test]
    fn parse_known_formats() {
        assert_eq!(LogFormat::parse("tree"), LogFormat::Tree);
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse(" text "), LogFormat::Text);
    }

    #[test]
    fn parse_unknown_format_falls_back_to_text() {
        assert_eq!(LogFormat::parse(""), LogFormat::Text);
        assert_eq!(LogFormat::parse("yaml"), LogFormat::Text);
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn tree_layer_defers_empty_spans() {
        let captured = Captured::default();
        let subscriber = Registry::default().with(tree_layer(captured.clone()));
        tracing::subscriber::with_default(subscriber, || {
            let quiet = tracing::info_span!("quiet_span").entered();
            drop(quiet);
            let _busy = tracing::info_span!("busy_span").entered();
            tracing::info!("value checked");
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("busy_span"), "{output}");
        assert!(output.contains("value checked"), "{output}");
        assert!(!output.contains("quiet_span"), "{output}");
    }
}

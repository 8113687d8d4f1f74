//! Structured span definitions.

use std::path::Path;

use tracing::{Level, Span, span};

use crate::bundle::Bundle;

pub fn scan_span(base: &Path) -> Span {
    span!(Level::INFO, "bundle.scan", base = %base.display())
}

pub fn bundle_span(bundle: &Bundle) -> Span {
    span!(
        Level::DEBUG,
        "bundle",
        name = bundle.name(),
        version = %bundle.version(),
        id = %bundle.id(),
    )
}

#![allow(dead_code)]
use std::path::PathBuf;

use oapi_merger_core::{Document, Internalizer, Loader, Summary};
use tracing::info;

pub fn init_tracing() {
    // should be run once, fail otherwise, we skip that error
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();

    info!("Tracing initialized");
}

pub fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(path)
}

pub fn internalize_fixture(path: &str) -> anyhow::Result<(Document, Summary)> {
    init_tracing();
    let mut loader = Loader::new();
    let mut document = loader.load(fixture(path))?;
    let summary = Internalizer::new(loader.files()).internalize(&mut document)?;
    Ok((document, summary))
}

//! Fixtures shared by the engine's unit tests.

use crate::channel::{ResultRecord, ResultSink, ResultSender, result_channel};
use crate::decision::ScanContext;
use crate::options::{Collaborators, ScanOptions};
use crate::state::RunState;
use hashscan_archive::error::Result as ArchiveResult;
use hashscan_archive::{ArchiveEntry, ArchiveOpener, ArchiveReader, DefaultOpener, MediaType};
use hashscan_store::{MockStore, StoreHandle};
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub(crate) fn options() -> ScanOptions {
    ScanOptions { poll_interval: Duration::from_millis(20), ..Default::default() }
}

/// Zip with stored entries; names ending in `/` become directories.
pub(crate) fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, data) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options).unwrap();
        } else {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

pub(crate) fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_fn(40, 30, |x, y| image::Rgb([(x * 6) as u8, (y * 8) as u8, 90]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Every record received so far.
pub(crate) fn drain(rx: &mut UnboundedReceiver<ResultRecord>) -> Vec<ResultRecord> {
    let mut records = Vec::new();
    while let Ok(record) = rx.try_recv() {
        records.push(record);
    }
    records
}

/// Default opener that counts how often readers are opened and closed.
#[derive(Default)]
pub(crate) struct CountingOpener {
    pub(crate) opened: Arc<AtomicUsize>,
    pub(crate) closed: Arc<AtomicUsize>,
}

struct CountingReader {
    inner: Box<dyn ArchiveReader>,
    closed: Arc<AtomicUsize>,
}

impl ArchiveReader for CountingReader {
    fn next_entry(&mut self) -> ArchiveResult<Option<ArchiveEntry>> {
        self.inner.next_entry()
    }

    fn close(&mut self) {
        self.inner.close();
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

impl ArchiveOpener for CountingOpener {
    fn open(&self, path: &Path, media: MediaType, contents: Option<Vec<u8>>) -> ArchiveResult<Box<dyn ArchiveReader>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let inner = DefaultOpener.open(path, media, contents)?;
        Ok(Box::new(CountingReader { inner, closed: Arc::clone(&self.closed) }))
    }
}

/// Halts the run as soon as the first container entry is emitted.
pub(crate) struct HaltingSink {
    pub(crate) state: RunState,
    pub(crate) inner: ResultSender,
}

impl ResultSink for HaltingSink {
    fn push(&self, record: ResultRecord) {
        if matches!(&record, ResultRecord::Hashed(item) if !item.internal_name.is_empty()) {
            self.state.halt();
        }
        self.inner.push(record);
    }
}

pub(crate) struct Harness {
    pub(crate) context: Arc<ScanContext>,
    pub(crate) results: UnboundedReceiver<ResultRecord>,
    pub(crate) store: Arc<MockStore>,
    pub(crate) opener: Arc<CountingOpener>,
}

impl Harness {
    pub(crate) fn new(store: MockStore, options: ScanOptions) -> Self {
        Self::configured(store, options, |with| with)
    }

    /// Like [`Harness::new`], with collaborators adjusted by `configure`.
    pub(crate) fn configured(
        store: MockStore,
        options: ScanOptions,
        configure: impl FnOnce(Collaborators) -> Collaborators,
    ) -> Self {
        let (sink, results) = result_channel();
        let sink = |_: &RunState| Arc::new(sink) as Arc<dyn ResultSink>;
        Self::with_sink(store, options, RunState::default(), sink, configure, results)
    }

    pub(crate) fn halting(store: MockStore, options: ScanOptions) -> Self {
        let (sink, results) = result_channel();
        let state = RunState::default();
        Self::with_sink(
            store,
            options,
            state,
            |state| Arc::new(HaltingSink { state: state.clone(), inner: sink }) as Arc<dyn ResultSink>,
            |with| with,
            results,
        )
    }

    fn with_sink(
        store: MockStore,
        options: ScanOptions,
        state: RunState,
        sink: impl FnOnce(&RunState) -> Arc<dyn ResultSink>,
        configure: impl FnOnce(Collaborators) -> Collaborators,
        results: UnboundedReceiver<ResultRecord>,
    ) -> Self {
        let store = Arc::new(store);
        let opener = Arc::new(CountingOpener::default());
        let handle: StoreHandle = store.clone();
        let collaborators = configure(Collaborators::new(handle).with_opener(opener.clone()));
        let sink = sink(&state);
        Self { context: Arc::new(ScanContext::new(options, state, sink, collaborators)), results, store, opener }
    }

    pub(crate) fn records(&mut self) -> Vec<ResultRecord> {
        drain(&mut self.results)
    }

    pub(crate) fn opened(&self) -> usize {
        self.opener.opened.load(Ordering::SeqCst)
    }

    pub(crate) fn closed(&self) -> usize {
        self.opener.closed.load(Ordering::SeqCst)
    }
}

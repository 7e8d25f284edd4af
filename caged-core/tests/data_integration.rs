//! Integration tests for the per-month data stages.
//!
//! Tests:
//! 1. Fetch is cache-first: the second fetch of a month makes no transport call
//! 2. A failing transfer leaves neither the archive nor its partial file behind
//! 3. An empty transfer is a fetch failure
//! 4. A real 7z archive extracts to a flat file, and re-extraction is a no-op
//! 5. An archive without the month's flat file fails and promotes nothing
//! 6. Extraction past its deadline is a timeout
//! 7. Fetch → extract → load → normalize over a fixture release

use reqwest::Url;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use caged_core::data::{
    load, normalize, ArchiveCache, ArchiveExtractor, ArchiveFetcher, ArchiveTransport,
    ExtractionError, TransportError, DEFAULT_BASE_URL,
};
use caged_core::domain::ReferenceMonth;

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

const FIXTURE: &str = "\
competênciamov;região;uf;município;seção;subclasse;saldomovimentação;salário;sexo
202403;5;43;430460;G;4711302;1;2.100,50;1
202403;5;43;430460;C;1091102;-1;1.850,00;3
202403;5;43;431490;Q;8610101;1;4.300,00;3
202403;5;43;431490;Z;0000000;1;abc;9
";

/// Transport that serves fixed bytes and counts how often it is asked.
struct CountingTransport {
    payload: Vec<u8>,
    calls: Arc<AtomicUsize>,
}

impl ArchiveTransport for CountingTransport {
    fn name(&self) -> &str {
        "counting"
    }

    fn retrieve(&self, _url: &Url, sink: &mut dyn Write) -> Result<u64, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        sink.write_all(&self.payload)?;
        Ok(self.payload.len() as u64)
    }
}

/// Transport that writes some bytes and then drops the connection.
struct BrokenTransport;

impl ArchiveTransport for BrokenTransport {
    fn name(&self) -> &str {
        "broken"
    }

    fn retrieve(&self, _url: &Url, sink: &mut dyn Write) -> Result<u64, TransportError> {
        sink.write_all(b"7z\xbc\xaf")?;
        Err(TransportError::Connect("connection reset by peer".into()))
    }
}

fn march() -> ReferenceMonth {
    ReferenceMonth::new(2024, 3).unwrap()
}

fn fetcher(dir: &Path, transport: Box<dyn ArchiveTransport>) -> ArchiveFetcher {
    ArchiveFetcher::new(
        Url::parse(DEFAULT_BASE_URL).unwrap(),
        ArchiveCache::new(dir),
        transport,
    )
}

/// Build `CAGEDMOV{token}.7z` in `dir` holding one flat file with `content`.
fn build_archive(dir: &Path, month: ReferenceMonth, content: &str) -> std::path::PathBuf {
    pack(dir, &month.archive_file_name(), &[(month.flat_file_name().as_str(), content)])
}

/// Build `dir/{name}` as a 7z archive of the given `(entry, content)` files.
fn pack(dir: &Path, name: &str, entries: &[(&str, &str)]) -> std::path::PathBuf {
    let src = dir.join("src");
    fs::create_dir_all(&src).unwrap();
    for (entry, content) in entries {
        fs::write(src.join(entry), content).unwrap();
    }

    let archive = dir.join(name);
    sevenz_rust::compress_to_path(&src, &archive).unwrap();
    fs::remove_dir_all(&src).unwrap();
    archive
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// ──────────────────────────────────────────────
// Fetch
// ──────────────────────────────────────────────

#[test]
fn second_fetch_is_served_from_cache() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let f = fetcher(
        dir.path(),
        Box::new(CountingTransport {
            payload: b"archive bytes".to_vec(),
            calls: Arc::clone(&calls),
        }),
    );

    let first = f.fetch(march()).unwrap();
    let second = f.fetch(march()).unwrap();

    assert_eq!(first, second);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(fs::read(&first).unwrap(), b"archive bytes");
}

#[test]
fn failed_transfer_leaves_nothing_behind() {
    let dir = tempfile::tempdir().unwrap();
    let f = fetcher(dir.path(), Box::new(BrokenTransport));

    let err = f.fetch(march()).unwrap_err();
    assert_eq!(err.month, march());
    assert!(matches!(err.cause, TransportError::Connect(_)));

    let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
    assert!(leftovers.is_empty(), "unexpected files: {leftovers:?}");
}

#[test]
fn empty_transfer_is_a_failure() {
    let dir = tempfile::tempdir().unwrap();
    let f = fetcher(
        dir.path(),
        Box::new(CountingTransport {
            payload: Vec::new(),
            calls: Arc::new(AtomicUsize::new(0)),
        }),
    );

    assert!(f.fetch(march()).is_err());
    assert!(!f.cache().archive_path(march()).exists());
}

// ──────────────────────────────────────────────
// Extract
// ──────────────────────────────────────────────

#[test]
fn archive_extracts_into_flat_cache() {
    let dir = tempfile::tempdir().unwrap();
    let archive = build_archive(dir.path(), march(), FIXTURE);
    let extractor = ArchiveExtractor::new(Duration::from_secs(30));

    let flat = extractor.extract(&archive, dir.path()).unwrap();
    assert_eq!(flat, dir.path().join("CAGEDMOV202403.txt"));
    assert_eq!(fs::read_to_string(&flat).unwrap(), FIXTURE);

    // Staging directory is gone.
    assert!(!dir.path().join(".extract-202403").exists());

    // Second call finds the existing file without touching the archive.
    fs::remove_file(&archive).unwrap();
    let again = extractor.extract(&archive, dir.path()).unwrap();
    assert_eq!(again, flat);
}

#[test]
fn archive_without_month_file_promotes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let archive = pack(
        dir.path(),
        &march().archive_file_name(),
        &[("CAGEDMOV202402.txt", FIXTURE), ("notes.md", "release notes")],
    );
    let extractor = ArchiveExtractor::new(Duration::from_secs(30));

    let err = extractor.extract(&archive, dir.path()).unwrap_err();
    assert!(
        matches!(&err, ExtractionError::NoMatchingFile { token, .. } if token == "202403"),
        "{err:?}"
    );

    // Neither the other month's flat file nor the notes reach the cache.
    assert_eq!(file_names(dir.path()), vec!["CAGEDMOV202403.7z".to_string()]);
}

#[test]
fn extraction_past_deadline_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let archive = build_archive(dir.path(), march(), FIXTURE);

    let err = ArchiveExtractor::new(Duration::ZERO)
        .extract(&archive, dir.path())
        .unwrap_err();
    assert!(
        matches!(err, ExtractionError::Timeout { after, .. } if after == Duration::ZERO),
        "{err:?}"
    );
    assert!(!dir.path().join("CAGEDMOV202403.txt").exists());
}

// ──────────────────────────────────────────────
// Full month
// ──────────────────────────────────────────────

#[test]
fn fixture_month_normalizes_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let archive = build_archive(dir.path(), march(), FIXTURE);

    // Archive already cached, so the transport is never consulted.
    let calls = Arc::new(AtomicUsize::new(0));
    let f = fetcher(
        dir.path(),
        Box::new(CountingTransport {
            payload: Vec::new(),
            calls: Arc::clone(&calls),
        }),
    );
    let fetched = f.fetch(march()).unwrap();
    assert_eq!(fetched, archive);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let flat = ArchiveExtractor::new(Duration::from_secs(30))
        .extract(&fetched, dir.path())
        .unwrap();
    let table = load(&flat, 3).unwrap();
    assert_eq!(table.len(), 3);

    let records = normalize(&table, march()).unwrap();
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.reference_month == march()));

    assert_eq!(records[0].municipality.as_deref(), Some("Canoas (RS)"));
    assert_eq!(records[0].sector.as_deref(), Some("Comércio"));
    assert_eq!(records[0].gender.as_deref(), Some("Masculino"));
    assert_eq!(records[0].wage, 2100.5);
    assert!(records[0].is_admission());

    assert!(records[1].is_termination());
    assert_eq!(records[1].sector.as_deref(), Some("Indústria"));
    assert_eq!(records[1].gender.as_deref(), Some("Feminino"));

    assert_eq!(records[2].municipality.as_deref(), Some("Porto Alegre (RS)"));
    assert_eq!(records[2].wage, 4300.0);
}

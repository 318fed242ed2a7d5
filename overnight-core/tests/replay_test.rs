//! Replay tapes read from disk and served through the provider trait.

use std::io::Write;

use overnight_core::data::{DataSource, QuoteProvider, ReplayError, ReplayTape, Universe};
use overnight_core::tripwire::{Thesis, TripwireSession};

const TAPE: &str = "\
tick,symbol,price,change,change_percent,observed_at
0,^TNX,4.250,0.010,0.24,2024-03-05T13:30:00Z
0,DX-Y.NYB,103.20,-0.10,-0.10,2024-03-05T13:30:00Z
1,^TNX,4.300,0.060,1.41,2024-03-05T13:30:20Z
2,^TNX,4.200,-0.040,-0.94,2024-03-05T13:30:40Z
2,DX-Y.NYB,,,,
";

fn write_tape(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn tape_from_file_drives_a_session() {
    let file = write_tape(TAPE);
    let tape = ReplayTape::from_path(file.path()).unwrap();
    assert_eq!(tape.len(), 3);

    let mut session = TripwireSession::new(Universe::default_overnight().tracked_instruments());
    let (first, rest) = tape.snapshots().split_first().unwrap();
    session.lock(first).unwrap();
    session.set_thesis(Thesis::Long).unwrap();

    let mut inverted = Vec::new();
    for snap in rest {
        inverted.push(session.refresh(snap).unwrap().session_inverted);
    }
    assert_eq!(inverted, vec![true, false]);
    // Blank dollar row on tick 2 left the dollar untouched.
    assert_eq!(
        session.instrument("DX-Y.NYB").unwrap().current_price(),
        Some(103.20)
    );
}

#[test]
fn tape_as_provider_serves_one_tick_per_fetch() {
    let file = write_tape(TAPE);
    let provider = ReplayTape::from_path(file.path()).unwrap().into_provider();
    let symbols = vec!["^TNX".to_string(), "DX-Y.NYB".to_string()];

    let first = provider.fetch(&symbols).unwrap();
    assert!(first.is_complete());
    assert_eq!(first.source, DataSource::Replay);

    let second = provider.fetch(&symbols).unwrap();
    assert_eq!(second.missing, vec!["DX-Y.NYB".to_string()]);

    let third = provider.fetch(&symbols).unwrap();
    assert_eq!(third.snapshot.get("^TNX").unwrap().price, 4.200);
    // Exhausted tapes keep serving the final tick.
    let again = provider.fetch(&symbols).unwrap();
    assert_eq!(again.snapshot, third.snapshot);
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ReplayTape::from_path(&dir.path().join("nope.csv")).unwrap_err();
    assert!(matches!(err, ReplayError::Io(_)));
}

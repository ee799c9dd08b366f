//! Note store integration tests against a real SQLite file.
//!
//! Run with: `cargo test`

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::cell::Cell;
use std::path::PathBuf;
use tempfile::TempDir;

use fastnote::app::NoteService;
use fastnote::backends::SqliteBackend;
use fastnote::clock::Clock;
use fastnote::{
    BackendError, NoteBackend, NoteContent, NoteError, NoteType, NoteValidationError,
};

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x10\0\0\0\x10\x08\x06";

// Advances one second per call, so every write gets a distinct timestamp
struct SteppingClock(Cell<NaiveDateTime>);

impl SteppingClock {
    fn boxed() -> Box<dyn Clock> {
        let start = NaiveDate::from_ymd_opt(2024, 5, 17)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        Box::new(Self(Cell::new(start)))
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> NaiveDateTime {
        let now = self.0.get();
        self.0.set(now + Duration::seconds(1));
        now
    }
}

fn tmp_dir() -> TempDir {
    tempfile::tempdir().expect("create tempdir")
}

fn db_path(dir: &TempDir) -> PathBuf {
    dir.path().join("notes.db")
}

fn open(dir: &TempDir) -> SqliteBackend {
    SqliteBackend::with_clock(db_path(dir), SteppingClock::boxed())
}

fn text(s: &str) -> NoteContent {
    NoteContent::Text(s.to_string())
}

#[test]
fn test_text_note_round_trip() {
    let dir = tmp_dir();
    let store = open(&dir);

    let body = "første linje\nsecond line 🚀\n";
    let id = store.create("Ünïcode", &text(body)).expect("create");
    let note = store.read(id).expect("read").expect("note exists");

    assert_eq!(note.id, id);
    assert_eq!(note.title, "Ünïcode");
    assert_eq!(note.content, text(body));
    assert_eq!(note.note_type(), NoteType::Text);
}

#[test]
fn test_table_is_created_on_first_use() {
    let dir = tmp_dir();
    let store = open(&dir);
    assert!(!db_path(&dir).exists(), "Nothing is opened before the first call");

    assert!(store.list().expect("list").is_empty());
    assert!(db_path(&dir).exists());
}

#[test]
fn test_search_matches_title_in_any_ascii_case() {
    let dir = tmp_dir();
    let store = open(&dir);
    let id = store.create("Meeting Notes", &text("agenda")).expect("create");
    store.create("Groceries", &text("milk")).expect("create");

    for query in ["meeting", "MEETING", "ing no"] {
        let found = store.search_by_title(query).expect("search");
        assert_eq!(found.len(), 1, "query '{query}'");
        assert_eq!(found[0].id, id);
    }
}

#[test]
fn test_table_is_recreated_after_file_removal() {
    let dir = tmp_dir();
    let store = open(&dir);
    store.create("before", &text("x")).expect("create");

    std::fs::remove_file(db_path(&dir)).expect("remove db file");

    assert!(store.list().expect("list on fresh file").is_empty());
    let id = store.create("after", &text("y")).expect("create");
    assert_eq!(store.read(id).expect("read").expect("exists").title, "after");
}

#[test]
fn test_missing_note_reads_as_none() {
    let dir = tmp_dir();
    let store = open(&dir);
    assert!(store.read(99).expect("read").is_none());
}

#[test]
fn test_update_moves_note_to_front() {
    let dir = tmp_dir();
    let store = open(&dir);

    let ids: Vec<i64> = (1..=4)
        .map(|n| store.create(&format!("N{n}"), &text("body")).expect("create"))
        .collect();

    let listed: Vec<i64> = store.list().expect("list").iter().map(|n| n.id).collect();
    assert_eq!(listed, vec![ids[3], ids[2], ids[1], ids[0]]);

    store.update(ids[1], "N2 edited", &text("new body")).expect("update");

    let listed = store.list().expect("list");
    assert_eq!(listed[0].id, ids[1]);
    assert_eq!(listed[0].title, "N2 edited");
    assert!(listed[0].updated_at > listed[0].created_at);
    assert_eq!(listed.len(), 4);
}

#[test]
fn test_created_at_never_changes() {
    let dir = tmp_dir();
    let store = open(&dir);

    let id = store.create("t", &text("v1")).expect("create");
    let before = store.list().expect("list")[0].clone();
    store.update(id, "t", &text("v2")).expect("update");
    let after = store.list().expect("list")[0].clone();

    assert_eq!(before.created_at, after.created_at);
    assert!(after.updated_at > before.updated_at);
}

#[test]
fn test_update_missing_note_is_noop() {
    let dir = tmp_dir();
    let store = open(&dir);
    let id = store.create("only", &text("one")).expect("create");

    store.update(id + 100, "ghost", &text("boo")).expect("update");

    let listed = store.list().expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].title, "only");
}

#[test]
fn test_delete_is_idempotent() {
    let dir = tmp_dir();
    let store = open(&dir);
    let keep = store.create("keep", &text("k")).expect("create");
    let gone = store.create("gone", &text("g")).expect("create");

    store.delete(gone).expect("delete");
    store.delete(gone).expect("delete again");
    store.delete(12_345).expect("delete unknown");

    let listed = store.list().expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, keep);
    assert!(store.read(gone).expect("read").is_none());
}

#[test]
fn test_ids_are_not_reused() {
    let dir = tmp_dir();
    let store = open(&dir);
    store.create("a", &text("1")).expect("create");
    let last = store.create("b", &text("2")).expect("create");

    store.delete(last).expect("delete");
    let next = store.create("c", &text("3")).expect("create");
    assert!(next > last, "Deleted ID {last} was handed out again");
}

#[test]
fn test_search_by_title() {
    let dir = tmp_dir();
    let store = open(&dir);

    let a = store.create("abc", &text("1")).expect("create");
    let upper = store.create("ABC upper", &text("2")).expect("create");
    let b = store.create("xx abc yy", &text("3")).expect("create");
    store.create("a%c wildcard", &text("4")).expect("create");
    let c = store.create("abcabc", &text("5")).expect("create");
    store.create("a_c", &text("6")).expect("create");
    store.update(a, "abc", &text("touched")).expect("update");

    let found: Vec<i64> = store
        .search_by_title("abc")
        .expect("search")
        .iter()
        .map(|n| n.id)
        .collect();
    assert_eq!(found, vec![a, c, b, upper]);

    // % and _ are plain characters, not wildcards
    let found = store.search_by_title("a%c").expect("search");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].title, "a%c wildcard");
    let found = store.search_by_title("a_c").expect("search");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].title, "a_c");

    assert!(store.search_by_title("zzz").expect("search").is_empty());
}

#[test]
fn test_image_note_keeps_type_and_bytes() {
    let dir = tmp_dir();
    let store = open(&dir);

    let id = store
        .create("screenshot", &NoteContent::Image(PNG.to_vec()))
        .expect("create");
    let note = store.read(id).expect("read").expect("exists");
    assert_eq!(note.content, NoteContent::Image(PNG.to_vec()));

    store
        .update(id, "renamed", &note.content)
        .expect("update");

    let note = store.read(id).expect("read").expect("exists");
    assert_eq!(note.title, "renamed");
    assert_eq!(note.note_type(), NoteType::Image);
    assert_eq!(note.content.len(), PNG.len());
    assert_eq!(store.list().expect("list")[0].note_type, NoteType::Image);
}

#[test]
fn test_notes_survive_reopening() {
    let dir = tmp_dir();
    let id = open(&dir).create("persist", &text("me")).expect("create");

    let reopened = SqliteBackend::new(db_path(&dir));
    let note = reopened.read(id).expect("read").expect("exists");
    assert_eq!(note.title, "persist");
}

#[test]
fn test_text_blob_with_invalid_utf8_reads_lossily() {
    let dir = tmp_dir();
    let store = open(&dir);
    store.list().expect("create table");

    let conn = rusqlite::Connection::open(db_path(&dir)).expect("open");
    conn.execute(
        "INSERT INTO notes (title, content, note_type, created_at, updated_at)
         VALUES ('legacy', ?1, 'text', '2024-01-01 00:00:00', '2024-01-01 00:00:00')",
        [vec![b'h', b'i', 0xfe]],
    )
    .expect("insert");
    let id = conn.last_insert_rowid();
    drop(conn);

    let note = store.read(id).expect("read").expect("exists");
    assert_eq!(note.content, text("hi\u{fffd}"));
}

#[test]
fn test_unknown_note_type_is_reported_as_corrupted() {
    let dir = tmp_dir();
    let store = open(&dir);
    store.list().expect("create table");

    let conn = rusqlite::Connection::open(db_path(&dir)).expect("open");
    conn.execute(
        "INSERT INTO notes (title, content, note_type, created_at, updated_at)
         VALUES ('odd', 'x', 'video', '2024-01-01 00:00:00', '2024-01-01 00:00:00')",
        [],
    )
    .expect("insert");
    drop(conn);

    let err = store.list().expect_err("unknown type");
    assert!(matches!(err, NoteError::Backend(BackendError::NoteCorrupted)));
}

#[test]
fn test_unopenable_path_is_a_backend_error() {
    let dir = tmp_dir();
    let store = SqliteBackend::new(dir.path().join("missing").join("notes.db"));

    let err = store.list().expect_err("parent directory is missing");
    assert!(matches!(
        err,
        NoteError::Backend(BackendError::DatabaseCreationError)
    ));
}

#[test]
fn test_empty_title_creates_no_row() {
    let dir = tmp_dir();
    let service = NoteService::new(Box::new(open(&dir)), 128, 1024);

    let err = service
        .add_text_note("", "content".to_string())
        .expect_err("empty title");
    assert!(matches!(
        err,
        NoteError::Validation(NoteValidationError::TitleEmpty)
    ));

    let store = open(&dir);
    assert!(store.list().expect("list").is_empty());
}

//! Shared fixtures for the parity suite.

use std::sync::Once;

use rosterdb::prelude::*;

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

/// One database under test; keeps its temp dir alive for SQLite.
pub struct TestDb {
    pub label: &'static str,
    pub db: Database,
    _tmp: Option<tempfile::TempDir>,
}

/// Both backends, ready to run the same scenario.
pub fn all_backends() -> Vec<TestDb> {
    init_tracing();
    let dir = tempfile::tempdir().expect("temp dir");
    let sqlite = Database::Sqlite(
        rosterdb::SqliteDatabase::builder()
            .path(dir.path().join("parity.db"))
            .pool_size(1)
            .open()
            .expect("open sqlite"),
    );
    vec![
        TestDb { label: "memory", db: Database::in_memory(), _tmp: None },
        TestDb { label: "sqlite", db: sqlite, _tmp: Some(dir) },
    ]
}

/// Begin with no deadline; the suites hold one transaction at a time.
pub fn begin(db: &Database) -> Transaction {
    db.begin_transaction(Timeout::Infinite).expect("begin transaction")
}

// =============================================================================
// Row seeds. Entities form IS-A chains, so most seeds insert their parents.
// =============================================================================

pub fn seed_user(tx: &mut Transaction, uid: i64) {
    let inserted = tx
        .insert(Entity::User, uid, &record! { "email" => format!("u{}@roster.io", uid) })
        .expect("insert user");
    assert!(inserted, "user {} already seeded", uid);
}

pub fn seed_student(tx: &mut Transaction, suid: i64) {
    seed_user(tx, suid);
    assert!(tx
        .insert(Entity::UtdPersonnel, suid, &record! { "u_type" => "student" })
        .expect("insert personnel"));
    assert!(tx
        .insert(Entity::Student, suid, &record! { "major" => "CS", "year" => 4i64 })
        .expect("insert student"));
}

pub fn seed_student_on_team(tx: &mut Transaction, suid: i64, tid: i64) {
    seed_student(tx, suid);
    assert!(tx
        .alter(Entity::Student, suid, &record! { "member_of" => tid })
        .expect("assign team"));
}

pub fn seed_faculty(tx: &mut Transaction, fuid: i64, tid: i64) {
    seed_user(tx, fuid);
    assert!(tx
        .insert(Entity::UtdPersonnel, fuid, &record! { "u_type" => "faculty" })
        .expect("insert personnel"));
    assert!(tx.insert_faculty(fuid, tid, &Record::new()).expect("insert faculty"));
}

pub fn seed_team(tx: &mut Transaction, tid: i64) {
    assert!(tx
        .insert_team(tid, &record! { "name" => format!("team-{}", tid) })
        .expect("insert team"));
}

pub fn seed_company(tx: &mut Transaction, name: &str) {
    assert!(tx
        .insert(Entity::Company, name, &record! { "address" => "800 W Campbell Rd" })
        .expect("insert company"));
}

pub fn seed_employee(tx: &mut Transaction, euid: i64, company: &str) {
    seed_user(tx, euid);
    assert!(tx
        .insert(Entity::Employee, euid, &record! { "works_at" => company })
        .expect("insert employee"));
}

pub fn seed_project(tx: &mut Transaction, pid: i64, company: &str) {
    assert!(tx
        .insert(
            Entity::Project,
            pid,
            &record! { "company" => company, "title" => format!("project-{}", pid), "status" => "proposed" },
        )
        .expect("insert project"));
}

/// Collect int keys, sorted, for order-independent assertions.
pub fn int_keys(keys: Vec<Key>) -> Vec<i64> {
    let mut ids: Vec<i64> = keys.iter().filter_map(Key::as_int).collect();
    ids.sort_unstable();
    ids
}

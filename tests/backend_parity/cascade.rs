//! Delete-policy semantics: CASCADE transitivity, SET-NULL, RESTRICT
//! atomicity. The mock store emulates what SQLite's foreign keys enforce
//! natively; these tests pin the two to each other.

use rosterdb::prelude::*;

use crate::common::*;

#[test]
fn cascade_removes_referencing_rows_transitively() {
    for backend in all_backends() {
        let mut tx = begin(&backend.db);
        // User -> UtdPersonnel -> Student is a two-level shadow chain.
        seed_student(&mut tx, 1);
        assert!(tx.delete(Entity::User, 1).unwrap());
        assert!(tx.load(Entity::UtdPersonnel, 1).unwrap().is_none(), "{}", backend.label);
        assert!(tx.load(Entity::Student, 1).unwrap().is_none(), "{}", backend.label);
        tx.rollback().unwrap();
    }
}

#[test]
fn cascade_follows_regular_fields_too() {
    for backend in all_backends() {
        let mut tx = begin(&backend.db);
        seed_company(&mut tx, "acme");
        seed_project(&mut tx, 10, "acme");
        seed_project(&mut tx, 11, "acme");
        tx.add_project_skill(10, "rust").unwrap();
        // Company -> Project (cascade) -> ProjectSkill (cascade).
        assert!(tx.delete(Entity::Company, "acme").unwrap());
        assert!(tx.load(Entity::Project, 10).unwrap().is_none());
        assert!(tx.load(Entity::Project, 11).unwrap().is_none());
        assert!(
            tx.find_all(Entity::ProjectSkill).unwrap().is_empty(),
            "{}: skills must follow their project",
            backend.label
        );
        tx.rollback().unwrap();
    }
}

#[test]
fn set_null_clears_the_field_but_keeps_the_row() {
    for backend in all_backends() {
        let mut tx = begin(&backend.db);
        seed_team(&mut tx, 50);
        seed_student_on_team(&mut tx, 2, 50);
        assert!(tx.delete_team(50).unwrap());
        let student = tx.load(Entity::Student, 2).unwrap().expect("student row survives");
        assert_eq!(student.get("member_of"), Some(&Value::Null), "{}", backend.label);
        tx.rollback().unwrap();
    }
}

#[test]
fn restrict_aborts_the_delete_with_a_constraint_error() {
    for backend in all_backends() {
        let mut tx = begin(&backend.db);
        seed_company(&mut tx, "acme");
        seed_employee(&mut tx, 3, "acme");
        let err = tx.delete(Entity::Company, "acme").unwrap_err();
        assert!(err.is_constraint(), "{}: {}", backend.label, err);
        assert!(tx.load(Entity::Company, "acme").unwrap().is_some());
        assert!(tx.load(Entity::Employee, 3).unwrap().is_some());
        tx.rollback().unwrap();
    }
}

#[test]
fn restrict_leaves_zero_partial_mutations() {
    for backend in all_backends() {
        let mut tx = begin(&backend.db);
        seed_company(&mut tx, "acme");
        // A cascading branch (projects) and a restricting branch (employee)
        // hang off the same company; the failed delete must undo both.
        seed_project(&mut tx, 20, "acme");
        seed_employee(&mut tx, 4, "acme");
        let err = tx.delete(Entity::Company, "acme").unwrap_err();
        assert!(err.is_constraint(), "{}", backend.label);
        assert!(
            tx.load(Entity::Project, 20).unwrap().is_some(),
            "{}: cascaded sibling must be restored",
            backend.label
        );
        assert!(tx.load(Entity::Employee, 4).unwrap().is_some());
        assert!(tx.load(Entity::Company, "acme").unwrap().is_some());
        tx.rollback().unwrap();
    }
}

#[test]
fn bulk_delete_is_all_or_nothing() {
    for backend in all_backends() {
        let mut tx = begin(&backend.db);
        seed_company(&mut tx, "free");
        seed_company(&mut tx, "held");
        seed_employee(&mut tx, 5, "held");
        let err = tx.delete_all(Entity::Company).unwrap_err();
        assert!(err.is_constraint(), "{}", backend.label);
        // Even the unreferenced company survives the failed purge.
        assert!(tx.load(Entity::Company, "free").unwrap().is_some(), "{}", backend.label);
        assert!(tx.load(Entity::Company, "held").unwrap().is_some());
        tx.rollback().unwrap();
    }
}

#[test]
fn bulk_delete_empties_the_table() {
    for backend in all_backends() {
        let mut tx = begin(&backend.db);
        seed_user(&mut tx, 6);
        seed_user(&mut tx, 7);
        assert!(tx.delete_all(Entity::User).unwrap());
        assert!(tx.find_all(Entity::User).unwrap().is_empty());
        // Second purge finds nothing to do.
        assert!(!tx.delete_all(Entity::User).unwrap(), "{}", backend.label);
        tx.rollback().unwrap();
    }
}

#[test]
fn delete_missing_row_returns_false() {
    for backend in all_backends() {
        let mut tx = begin(&backend.db);
        assert!(!tx.delete(Entity::User, 999).unwrap(), "{}", backend.label);
        tx.rollback().unwrap();
    }
}

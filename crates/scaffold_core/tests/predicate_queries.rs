use scaffold_core::{Contact, ContactDao, Predicate, RepoError, Store, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

fn seeded_dao() -> ContactDao {
    let dao = ContactDao::new(Arc::new(Store::open_in_memory().unwrap()));
    let mut contacts = vec![
        Contact::new("Alice", Some(30)),
        Contact::new("Bob", Some(30)),
        Contact::new("Alice", Some(41)),
        Contact::new("Dana", None),
    ];
    dao.create_all(&mut contacts).unwrap();
    dao
}

fn names(contacts: &[Contact]) -> Vec<&str> {
    contacts.iter().map(|contact| contact.name.as_str()).collect()
}

#[test]
fn query_eq_matches_single_constraint() {
    let dao = seeded_dao();

    let alices = dao.query_eq("name", "Alice".to_string()).unwrap();
    assert_eq!(alices.len(), 2);
    assert!(alices.iter().all(|contact| contact.name == "Alice"));

    let thirty = dao.query_by_age(30).unwrap();
    assert_eq!(names(&thirty), vec!["Alice", "Bob"]);
}

#[test]
fn query_columns_chains_constraints_with_and() {
    let dao = seeded_dao();

    let matched = dao
        .query_columns(
            &["name", "age"],
            &[Value::Text("Alice".to_string()), Value::Integer(41)],
        )
        .unwrap();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].age, Some(41));
}

#[test]
fn query_columns_with_mismatched_lengths_fails_before_touching_store() {
    // No contact table: any statement reaching SQLite would fail with a Db error.
    let store = Store::open_in_memory().unwrap();
    store.with_connection(|conn| conn.execute_batch("DROP TABLE tb_contact;").unwrap());
    let dao = ContactDao::new(Arc::new(store));

    let err = dao
        .query_columns(&["name", "age"], &[Value::Text("Alice".to_string())])
        .unwrap_err();
    assert!(matches!(err, RepoError::InvalidArgument(_)));

    let err = dao.query_columns::<&str, Value>(&[], &[Value::Integer(1)]).unwrap_err();
    assert!(matches!(err, RepoError::InvalidArgument(_)));
}

#[test]
fn empty_mapping_matches_query_all() {
    let dao = seeded_dao();

    let all = dao.query_all().unwrap();
    let mapped = dao.query_map(BTreeMap::<String, Value>::new()).unwrap();
    assert_eq!(mapped, all);
    assert_eq!(all.len(), 4);
}

#[test]
fn mapping_constraints_are_conjunctive() {
    let dao = seeded_dao();

    let mut mapping = BTreeMap::new();
    mapping.insert("name".to_string(), Value::Text("Alice".to_string()));
    mapping.insert("age".to_string(), Value::Integer(30));

    let matched = dao.query_map(mapping).unwrap();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].name, "Alice");
    assert_eq!(matched[0].age, Some(30));
}

#[test]
fn null_constraint_matches_missing_values() {
    let dao = seeded_dao();

    let matched = dao.query(&Predicate::new().eq("age", Value::Null)).unwrap();
    assert_eq!(names(&matched), vec!["Dana"]);
}

#[test]
fn id_column_can_be_used_in_predicates() {
    let dao = seeded_dao();

    let matched = dao.query(&Predicate::new().eq("id", 2_i64)).unwrap();
    assert_eq!(names(&matched), vec!["Bob"]);
}

#[test]
fn unknown_columns_are_rejected() {
    let dao = seeded_dao();

    let err = dao
        .query_eq("name = name OR 1", "x".to_string())
        .unwrap_err();
    assert!(matches!(err, RepoError::UnknownColumn { table: "tb_contact", .. }));

    let err = dao
        .count_where(&Predicate::new().eq("nickname", "x".to_string()))
        .unwrap_err();
    assert!(matches!(err, RepoError::UnknownColumn { .. }));
}

#[test]
fn results_are_ordered_by_id() {
    let dao = seeded_dao();

    let ids: Vec<i64> = dao
        .query_all()
        .unwrap()
        .iter()
        .map(|contact| contact.id.unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
}

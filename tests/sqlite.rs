#![cfg(feature = "sqlite")]

//! Query descriptions executed against SQLite, including eager-loads.

mod common;

use std::sync::{Arc, Mutex};

use common::{query, setup_db};
use relq::core::{Event, Hub, Operation, Subscriber, Topic};
use relq::prelude::*;
use relq::sqlite::SqliteError;
use serde_json::json;

fn usernames(records: &[Record]) -> Vec<&str> {
    records
        .iter()
        .map(|r| r["username"].as_str().unwrap())
        .collect()
}

#[test]
fn filter_order_and_paginate() {
    let db = setup_db();
    let records = db
        .find(
            "users",
            &query(
                r#"{
                    "where": {"field": {"name": "age", "predicate": ">", "value": 18}},
                    "orders": [{"field": "age", "direction": "desc"}],
                    "limit": 1,
                    "offset": 1
                }"#,
            ),
        )
        .unwrap();
    assert_eq!(usernames(&records), ["alice"]);
}

#[test]
fn offset_without_limit() {
    let db = setup_db();
    let records = db
        .find("users", &Query::new().order(Order::asc("id")).offset(2))
        .unwrap();
    assert_eq!(usernames(&records), ["carol"]);
}

#[test]
fn join_filter_deduplicates_origin_rows() {
    let db = setup_db();
    // alice has two posts, both match
    let q = query(
        r#"{
            "with": {"posts": {"where": {"field": {"name": "title", "predicate": "like", "value": "%"}}}},
            "orders": [{"field": "id"}]
        }"#,
    );
    let records = db.find("users", &q).unwrap();
    assert_eq!(usernames(&records), ["alice", "carol"]);
    assert_eq!(db.count("users", &q).unwrap(), 2);
}

#[test]
fn nested_join_filter() {
    let db = setup_db();
    let q = query(
        r#"{
            "with": {"posts": {"with": {"tags": {"where": {"field": {"name": "label", "predicate": "=", "value": "rust"}}}}}},
            "orders": [{"field": "id"}]
        }"#,
    );
    assert_eq!(usernames(&db.find("users", &q).unwrap()), ["alice"]);
}

#[test]
fn select_and_omit() {
    let db = setup_db();
    let records = db
        .find(
            "users",
            &query(r#"{"select": ["id", "username"], "where": {"field": {"name": "id", "predicate": "=", "value": 2}}}"#),
        )
        .unwrap();
    assert_eq!(records[0], json!({"id": 2, "username": "bob"}).as_object().unwrap().clone());

    let records = db
        .find("users", &query(r#"{"omit": ["password"], "orders": [{"field": "id"}]}"#))
        .unwrap();
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| !r.contains_key("password")));
    assert!(records.iter().all(|r| r.contains_key("age")));
}

mod preloads {
    use super::*;

    #[test]
    fn has_many() {
        let db = setup_db();
        let records = db
            .find("users", &query(r#"{"preloads": {"posts": null}, "orders": [{"field": "id"}]}"#))
            .unwrap();

        let titles = |i: usize| -> Vec<String> {
            records[i]["posts"]
                .as_array()
                .unwrap()
                .iter()
                .map(|p| p["title"].as_str().unwrap().to_owned())
                .collect()
        };
        assert_eq!(titles(0), ["hello", "draft"]);
        assert!(titles(1).is_empty());
        assert_eq!(titles(2), ["world"]);
    }

    #[test]
    fn scoped_has_many() {
        let db = setup_db();
        let records = db
            .find(
                "users",
                &query(
                    r#"{
                        "where": {"field": {"name": "id", "predicate": "=", "value": 1}},
                        "preloads": {"posts": {
                            "where": {"field": {"name": "published", "predicate": "=", "value": 1}},
                            "omit": ["published"]
                        }}
                    }"#,
                ),
            )
            .unwrap();
        assert_eq!(records[0]["posts"], json!([{"id": 1, "user_id": 1, "title": "hello"}]));
    }

    #[test]
    fn has_one_and_belongs_to() {
        let db = setup_db();
        let records = db
            .find("users", &query(r#"{"preloads": {"profile": null}, "orders": [{"field": "id"}]}"#))
            .unwrap();
        assert_eq!(records[0]["profile"]["bio"], json!("hi, I am alice"));
        assert_eq!(records[1]["profile"], json!(null));

        let posts = db
            .find("posts", &query(r#"{"preloads": {"author": {"select": ["id", "username"]}}, "orders": [{"field": "id"}]}"#))
            .unwrap();
        assert_eq!(posts[2]["author"], json!({"id": 3, "username": "carol"}));
    }

    #[test]
    fn many_to_many() {
        let db = setup_db();
        let posts = db
            .find("posts", &query(r#"{"preloads": {"tags": {"orders": [{"field": "label"}]}}, "orders": [{"field": "id"}]}"#))
            .unwrap();

        assert_eq!(posts[0]["tags"], json!([{"id": 1, "label": "rust"}, {"id": 2, "label": "sql"}]));
        assert_eq!(posts[1]["tags"], json!([]));
        assert_eq!(posts[2]["tags"], json!([{"id": 2, "label": "sql"}]));
    }

    #[test]
    fn nested() {
        let db = setup_db();
        let users = db
            .find(
                "users",
                &query(r#"{"select": ["username"], "preloads": {"posts": {"preloads": {"tags": null}}}, "where": {"field": {"name": "id", "predicate": "=", "value": 1}}}"#),
            )
            .unwrap();

        let posts = users[0]["posts"].as_array().unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0]["tags"].as_array().unwrap().len(), 2);
        assert_eq!(posts[1]["tags"], json!([]));
    }

    #[test]
    fn keys_match_across_column_affinity() {
        let registry = Registry::builder()
            .relation("users", "notes", Relation::direct("notes", "id", "user_id"))
            .relation(
                "notes",
                "owner",
                Relation::direct("users", "user_id", "id").with_cardinality(Cardinality::One),
            )
            .build();
        let db = Database::open_in_memory(Arc::new(registry)).unwrap();
        db.execute_batch(
            "CREATE TABLE users (id INTEGER PRIMARY KEY, username TEXT);
             CREATE TABLE notes (id INTEGER PRIMARY KEY, user_id TEXT, body TEXT);
             INSERT INTO users VALUES (1, 'alice'), (2, 'bob');
             INSERT INTO notes VALUES (1, '1', 'first'), (2, '1', 'second');",
        )
        .unwrap();

        let users = db
            .find("users", &query(r#"{"preloads": {"notes": null}, "orders": [{"field": "id"}]}"#))
            .unwrap();
        assert_eq!(users[0]["notes"].as_array().unwrap().len(), 2);
        assert_eq!(users[0]["notes"][0]["user_id"], json!("1"));
        assert_eq!(users[1]["notes"], json!([]));

        let notes = db
            .find("notes", &query(r#"{"preloads": {"owner": null}, "orders": [{"field": "id"}]}"#))
            .unwrap();
        assert_eq!(notes[1]["owner"]["username"], json!("alice"));
    }

    #[test]
    fn unknown_relation() {
        let db = setup_db();
        let err = db
            .find("users", &query(r#"{"preloads": {"comments": null}}"#))
            .unwrap_err();
        assert!(matches!(
            err,
            SqliteError::Query(relq::error::QueryError::RelationNotFound { .. })
        ));
    }
}

mod count_and_delete {
    use super::*;

    #[test]
    fn count_ignores_pagination() {
        let db = setup_db();
        let q = Query::new().limit(1).offset(1);
        let (records, count) = db.find_and_count("users", &q).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(count, 3);
    }

    #[test]
    fn delete_returns_rows() {
        let db = setup_db();
        let deleted = db.delete("posts", &Where::eq("published", 0)).unwrap();
        assert_eq!(deleted.len(), 1);
        assert_eq!(deleted[0]["title"], json!("draft"));
        assert_eq!(db.count("posts", &Query::new()).unwrap(), 2);
    }

    #[test]
    fn delete_without_condition_is_refused() {
        let db = setup_db();
        assert!(matches!(
            db.delete("posts", &Where::default()),
            Err(SqliteError::MissingWhereClause(_))
        ));
        assert_eq!(db.count("posts", &Query::new()).unwrap(), 3);
    }
}

#[derive(Default)]
struct Inbox(Mutex<Vec<Event>>);

impl Subscriber for Inbox {
    fn notify(&self, event: &Event) {
        self.0.lock().unwrap().push(event.clone());
    }
}

#[test]
fn hub_receives_query_and_delete_events() {
    let hub = Arc::new(Hub::new());
    let inbox = Arc::new(Inbox::default());
    let id = hub.register(inbox.clone());
    hub.subscribe(id, [Topic::new("posts", Operation::Delete).to_string()]);

    let db = setup_db().with_hub(hub.clone());
    db.find_and_count("posts", &Query::new()).unwrap();
    db.delete("posts", &Where::eq("id", 3)).unwrap();

    let events = inbox.0.lock().unwrap();
    // connected + delete; the query topic has no subscriber
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].event, "posts:delete");
    assert_eq!(events[1].data[0]["title"], json!("world"));
}

#[test]
fn hub_receives_create_and_update_events() {
    let hub = Arc::new(Hub::new());
    let inbox = Arc::new(Inbox::default());
    let id = hub.register(inbox.clone());
    hub.subscribe(
        id,
        [
            Topic::new("posts", Operation::Create).to_string(),
            Topic::new("posts", Operation::Update).to_string(),
        ],
    );

    let db = setup_db().with_hub(hub.clone());
    let draft = json!({"user_id": 2, "title": "fresh", "published": 0});
    let created = db.create("posts", &[draft.as_object().unwrap().clone()]).unwrap();
    let post_id = created[0]["id"].clone();

    let edit = json!({"id": post_id, "published": 1});
    db.update("posts", "id", &[edit.as_object().unwrap().clone()]).unwrap();

    let published = db
        .find("posts", &query(r#"{"where": {"field": {"name": "title", "predicate": "=", "value": "fresh"}}}"#))
        .unwrap();
    assert_eq!(published[0]["published"], json!(1));

    let events = inbox.0.lock().unwrap();
    // connected + create + update
    assert_eq!(events.len(), 3);
    assert_eq!(events[1].event, "posts:create");
    assert_eq!(events[1].data[0]["title"], json!("fresh"));
    assert_eq!(events[2].event, "posts:update");
    assert_eq!(events[2].data[0]["published"], json!(1));
}

#[test]
fn failed_create_publishes_nothing() {
    let hub = Arc::new(Hub::new());
    let inbox = Arc::new(Inbox::default());
    let id = hub.register(inbox.clone());
    hub.subscribe(id, [Topic::new("posts", Operation::Create).to_string()]);

    let db = setup_db().with_hub(hub.clone());
    let rows = [
        json!({"user_id": 1, "title": "kept?"}),
        json!({"title": "no owner"}),
    ];
    let records: Vec<Record> = rows.iter().map(|r| r.as_object().unwrap().clone()).collect();
    let err = db.create("posts", &records).unwrap_err();

    assert!(err.to_string().starts_with("record 1: "), "{err}");
    assert_eq!(db.count("posts", &Query::new()).unwrap(), 3);
    assert_eq!(inbox.0.lock().unwrap().len(), 1);
}

#[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
struct User {
    id: i64,
    username: String,
}

impl Model for User {
    const ENTITY: &'static str = "users";
}

#[test]
fn decode_into_model() {
    let db = setup_db();
    let users: Vec<User> = db
        .find_as(&Query::new().select(["id", "username"]).filter(Where::eq("username", "bob")))
        .unwrap();
    assert_eq!(
        users,
        [User {
            id: 2,
            username: "bob".into()
        }]
    );
}

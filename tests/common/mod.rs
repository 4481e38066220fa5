#![cfg(feature = "sqlite")]
#![allow(dead_code)]

use std::sync::Arc;

use relq::prelude::*;

pub const SCHEMA: &str = "
    CREATE TABLE users (id INTEGER PRIMARY KEY, username TEXT NOT NULL, age INTEGER, password TEXT);
    CREATE TABLE profiles (id INTEGER PRIMARY KEY, user_id INTEGER NOT NULL, bio TEXT);
    CREATE TABLE posts (id INTEGER PRIMARY KEY, user_id INTEGER NOT NULL, title TEXT, published INTEGER);
    CREATE TABLE tags (id INTEGER PRIMARY KEY, label TEXT);
    CREATE TABLE post_tags (post_id INTEGER NOT NULL, tag_id INTEGER NOT NULL);

    INSERT INTO users VALUES
        (1, 'alice', 30, 'a-secret'),
        (2, 'bob', 17, 'b-secret'),
        (3, 'carol', 41, 'c-secret');
    INSERT INTO profiles VALUES (1, 1, 'hi, I am alice'), (2, 3, 'carol here');
    INSERT INTO posts VALUES
        (1, 1, 'hello', 1),
        (2, 1, 'draft', 0),
        (3, 3, 'world', 1);
    INSERT INTO tags VALUES (1, 'rust'), (2, 'sql'), (3, 'unused');
    INSERT INTO post_tags VALUES (1, 1), (1, 2), (3, 2);
";

/// users -> posts (many), users -> profile (one), posts -> tags (many-to-many),
/// posts -> author (one)
pub fn registry() -> Registry {
    Registry::builder()
        .relation("users", "posts", Relation::direct("posts", "id", "user_id"))
        .relation(
            "users",
            "profile",
            Relation::direct("profiles", "id", "user_id").with_cardinality(Cardinality::One),
        )
        .relation(
            "posts",
            "tags",
            Relation::many_to_many("tags", "id", "post_tags", "post_id", "tag_id"),
        )
        .relation(
            "posts",
            "author",
            Relation::direct("users", "user_id", "id").with_cardinality(Cardinality::One),
        )
        .build()
}

/// In-memory database with the blog schema and seed rows
pub fn setup_db() -> Database {
    let db = Database::open_in_memory(Arc::new(registry())).expect("open in-memory database");
    db.execute_batch(SCHEMA).expect("create schema");
    db
}

/// Parses a query description, panicking on malformed test input
pub fn query(json: &str) -> Query {
    Query::from_json(json).expect("valid query description")
}

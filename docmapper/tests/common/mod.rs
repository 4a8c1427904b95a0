#![allow(dead_code)]

use docmapper::prelude::*;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Default, Clone, PartialEq, Mapped)]
pub struct Person {
    #[mapped(rename = "_id")]
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub age: i32,
    pub random_long: i64,
    pub alive: bool,
    pub weight: f64,
}

impl Person {
    pub fn new(id: i32, first_name: &str, age: i32) -> Self {
        Self {
            id,
            first_name: first_name.to_string(),
            last_name: "Saalweachter".to_string(),
            age,
            random_long: 42424242,
            alive: true,
            weight: 210.0,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Mapped)]
pub struct Child {
    pub name: String,
    pub age: i32,
}

#[derive(Debug, Default, Clone, PartialEq, Mapped)]
pub struct Family {
    #[mapped(rename = "_id")]
    pub id: i32,
    pub surname: String,
    #[mapped(nested)]
    pub head: Child,
    #[mapped(sequence)]
    pub children: Vec<Child>,
    #[mapped(skip)]
    pub cached_size: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub theme: String,
    pub notifications: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Mapped)]
pub struct Account {
    #[mapped(rename = "_id")]
    pub id: uuid::Uuid,
    pub owner: bson::oid::ObjectId,
    pub opened: chrono::DateTime<chrono::Utc>,
    pub last_seen: Option<bson::DateTime>,
    pub visits: u32,
    pub balance: u64,
    pub labels: Vec<String>,
    #[mapped(serde)]
    pub preferences: Preferences,
}

#[derive(Debug, Default, Clone, PartialEq, Mapped)]
pub struct Event {
    #[mapped(rename = "_id")]
    pub id: i32,
    #[mapped(serde)]
    pub at: chrono::DateTime<chrono::Utc>,
    #[mapped(serde)]
    pub preferences: Preferences,
}

/// Five people aged 25 to 29, inserted out of age order.
pub async fn people_fixture() -> (MemorySession, Table<Person>) {
    init_tracing();

    let session = MemorySession::builder().build().await.unwrap();
    let people = Table::<Person>::of("people");

    {
        let inserter = session.inserter(&people);
        for (id, age) in [(0, 27), (1, 25), (2, 29), (3, 26), (4, 28)] {
            inserter
                .insert(&Person::new(id, &format!("p{id}"), age))
                .await
                .unwrap();
        }
    }

    (session, people)
}

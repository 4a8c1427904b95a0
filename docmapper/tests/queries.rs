mod common;

use docmapper::{
    bson::{Bson, doc},
    prelude::*,
};

use common::{Child, Event, Family, Person, Preferences, people_fixture};

#[tokio::test]
async fn skip_and_limit() {
    let (session, people) = people_fixture().await;
    let everyone = session.query(&people);

    assert_eq!(everyone.all().await.unwrap().len(), 5);
    assert_eq!(everyone.skip(2).all().await.unwrap().len(), 3);
    assert_eq!(everyone.limit(3).all().await.unwrap().len(), 3);
    assert_eq!(everyone.skip(4).limit(3).all().await.unwrap().len(), 1);
    assert_eq!(everyone.limit(0).all().await.unwrap().len(), 5);
}

#[tokio::test]
async fn sorting() {
    let (session, people) = people_fixture().await;
    let age = member!(Person, age);

    let youngest = session.query(&people).ascending(&age).unwrap().first().await.unwrap();
    assert_eq!(youngest.age, 25);
    assert_eq!(youngest.first_name, "p1");

    let oldest = session.query(&people).descending(&age).unwrap().first().await.unwrap();
    assert_eq!(oldest.age, 29);

    let ages = session
        .query(&people)
        .ascending(&age)
        .unwrap()
        .skip(1)
        .limit(3)
        .all()
        .await
        .unwrap()
        .into_iter()
        .map(|person| person.age)
        .collect::<Vec<_>>();
    assert_eq!(ages, vec![26, 27, 28]);
}

#[tokio::test]
async fn unsorted_queries_keep_insertion_order() {
    let (session, people) = people_fixture().await;

    let ids = session
        .query(&people)
        .all()
        .await
        .unwrap()
        .into_iter()
        .map(|person| person.id)
        .collect::<Vec<_>>();

    assert_eq!(ids, vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn increments() {
    let (session, people) = people_fixture().await;
    let id = people.field(&member!(Person, id)).unwrap();
    let age = people.field(&member!(Person, age)).unwrap();

    let second = session.query(&people).filter(id.eq(1).unwrap()).unwrap();

    second.update(&age.inc(1).unwrap()).await.unwrap();
    assert_eq!(second.first().await.unwrap().age, 26);

    second.update(&age.inc(5).unwrap()).await.unwrap();
    assert_eq!(second.first().await.unwrap().age, 31);

    let untouched = session.query(&people).filter(id.eq(0).unwrap()).unwrap();
    assert_eq!(untouched.first().await.unwrap().age, 27);
}

#[tokio::test]
async fn combined_updates_apply_together() {
    let (session, people) = people_fixture().await;
    let id = people.field(&member!(Person, id)).unwrap();
    let age = people.field(&member!(Person, age)).unwrap();
    let alive = people.field(&member!(Person, alive)).unwrap();

    let third = session.query(&people).filter(id.eq(2).unwrap()).unwrap();
    third
        .update(&(age.inc(-4).unwrap() & alive.set(false).unwrap()))
        .await
        .unwrap();

    let person = third.first().await.unwrap();
    assert_eq!(person.age, 25);
    assert!(!person.alive);
}

#[tokio::test]
async fn empty_results() {
    let (session, people) = people_fixture().await;
    let age = people.field(&member!(Person, age)).unwrap();

    let nobody = session.query(&people).filter(age.gt(100).unwrap()).unwrap();

    let error = nobody.first().await.unwrap_err();
    assert!(error.is_empty_result());
    assert!(nobody.all().await.unwrap().is_empty());

    let mut result = nobody.result().await.unwrap();
    assert!(!result.more().await.unwrap());
    assert!(result.next().await.unwrap_err().is_empty_result());
}

#[tokio::test]
async fn filters_narrow_results() {
    let (session, people) = people_fixture().await;
    let age = people.field(&member!(Person, age)).unwrap();
    let first_name = people.field(&member!(Person, first_name)).unwrap();

    let middle = Filter::all([age.gt(25).unwrap(), age.lt(29).unwrap()]).unwrap();
    assert_eq!(session.query(&people).filter(middle).unwrap().all().await.unwrap().len(), 3);

    let not_p3 = session
        .query(&people)
        .filter(first_name.ne("p3").unwrap())
        .unwrap();
    assert_eq!(not_p3.all().await.unwrap().len(), 4);

    let bounded = session
        .query(&people)
        .filter(age.gte(26).unwrap())
        .unwrap()
        .filter(age.lte(27).unwrap())
        .unwrap();
    assert_eq!(bounded.all().await.unwrap().len(), 2);
    assert_eq!(
        bounded.current_filter().to_document(),
        doc! { "age": { "$gte": 26, "$lte": 27 } },
    );
}

#[tokio::test]
async fn conflicting_filters_are_rejected() {
    let (session, people) = people_fixture().await;
    let first_name = people.field(&member!(Person, first_name)).unwrap();

    let jack = session.query(&people).filter(first_name.eq("Jack").unwrap()).unwrap();
    let error = jack.filter(first_name.eq("John").unwrap()).unwrap_err();

    assert!(matches!(error, MapperError::ConflictingFilter { field, .. } if field == "first_name"));
    assert_eq!(jack.current_filter().to_document(), doc! { "first_name": "Jack" });
}

#[tokio::test]
async fn sorting_by_unmapped_members_fails() {
    let session = MemorySession::new();
    let families = Table::<Family>::of("families");

    let error = session
        .query(&families)
        .ascending(&member!(Family, cached_size))
        .unwrap_err();

    assert!(matches!(error, MapperError::UnmappedMember(_)));
}

#[tokio::test]
async fn removals() {
    let (session, people) = people_fixture().await;
    let age = people.field(&member!(Person, age)).unwrap();

    let older = session.query(&people).filter(age.gte(27).unwrap()).unwrap();
    older.remove_one().await.unwrap();
    assert_eq!(older.all().await.unwrap().len(), 2);
    assert_eq!(session.documents("people").await.len(), 4);

    older.remove_all().await.unwrap();
    assert!(older.all().await.unwrap().is_empty());
    assert_eq!(session.documents("people").await.len(), 2);

    session.query(&people).remove_all().await.unwrap();
    assert!(session.documents("people").await.is_empty());
}

#[tokio::test]
async fn update_from_rewrites_everything_but_the_identity() {
    let (session, people) = people_fixture().await;
    let id = people.field(&member!(Person, id)).unwrap();

    let replacement = Person {
        id: 99,
        first_name: "Sal".into(),
        last_name: "Paradise".into(),
        age: 40,
        random_long: 7,
        alive: false,
        weight: 150.5,
    };

    let third = session.query(&people).filter(id.eq(2).unwrap()).unwrap();
    third.update_from(&replacement).await.unwrap();

    let updated = third.first().await.unwrap();
    assert_eq!(updated, Person { id: 2, ..replacement });
}

#[tokio::test]
async fn upserts_insert_then_update() {
    let (session, people) = people_fixture().await;
    let id = people.field(&member!(Person, id)).unwrap();
    let inserter = session.inserter(&people);

    let mut newcomer = Person::new(9, "Ann", 33);
    inserter.upsert(&newcomer).await.unwrap();
    assert_eq!(session.documents("people").await.len(), 6);

    newcomer.age = 34;
    inserter.upsert(&newcomer).await.unwrap();
    assert_eq!(session.documents("people").await.len(), 6);

    let stored = session.query(&people).filter(id.eq(9).unwrap()).unwrap().first().await.unwrap();
    assert_eq!(stored, newcomer);
}

#[tokio::test]
async fn duplicate_identities_are_rejected() {
    let (session, people) = people_fixture().await;

    let error = session
        .inserter(&people)
        .insert(&Person::new(1, "again", 50))
        .await
        .unwrap_err();

    assert!(matches!(error, MapperError::Transport(_)));
    assert_eq!(session.documents("people").await.len(), 5);
}

#[tokio::test]
async fn cursors_decode_in_place() {
    let (session, people) = people_fixture().await;
    let age = member!(Person, age);

    let mut result = session
        .query(&people)
        .descending(&age)
        .unwrap()
        .result()
        .await
        .unwrap();

    let mut person = Person::default();
    let mut seen = Vec::new();
    while result.next_into(&mut person).await.unwrap() {
        seen.push(person.age);
    }

    assert_eq!(seen, vec![29, 28, 27, 26, 25]);
    assert!(!result.next_into(&mut person).await.unwrap());
    assert_eq!(person.age, 25);

    let mut first = Person::default();
    session
        .query(&people)
        .ascending(&age)
        .unwrap()
        .result()
        .await
        .unwrap()
        .first_into(&mut first)
        .await
        .unwrap();
    assert_eq!(first.first_name, "p1");
}

#[tokio::test]
async fn documents_that_drift_fail_to_decode() {
    let (session, people) = people_fixture().await;

    session
        .insert("people", doc! { "_id": 5, "first_name": "drifted", "age": "old" })
        .await
        .unwrap();

    let error = session.query(&people).all().await.unwrap_err();
    assert!(matches!(error, MapperError::MissingField { .. } | MapperError::TypeMismatch { .. }));
}

#[tokio::test]
async fn nested_documents_are_queryable() {
    let session = MemorySession::new();
    let families = Table::<Family>::of("families");
    let inserter = session.inserter(&families);

    for (id, head_age) in [(1, 41), (2, 35)] {
        inserter
            .insert(&Family {
                id,
                surname: format!("family{id}"),
                head: Child { name: "head".into(), age: head_age },
                children: vec![Child { name: "kid".into(), age: 4 }],
                cached_size: 3,
            })
            .await
            .unwrap();
    }

    let stored = session.documents("families").await;
    assert_eq!(stored[0].get_document("head").unwrap().get("age"), Some(&Bson::Int32(41)));

    let sorted = session
        .query(&families)
        .ascending(&member!(Family, surname))
        .unwrap()
        .all()
        .await
        .unwrap();

    assert_eq!(sorted.len(), 2);
    assert_eq!(sorted[1].head.age, 35);
    assert_eq!(sorted[1].children, vec![Child { name: "kid".into(), age: 4 }]);
    assert_eq!(sorted[1].cached_size, 0);
}

#[tokio::test]
async fn seeded_builders_and_raw_mappers() {
    let session = MemorySession::builder()
        .collection("kids", vec![doc! { "_id": 1, "name": "Cy", "age": 3 }])
        .build()
        .await
        .unwrap();

    let mut mapper = Mapper::new();
    mapper
        .add_field("name", member!(Child, name))
        .add_field("age", member!(Child, age));

    let kid = session.query_with("kids", &mapper).one().await.unwrap();
    assert_eq!(kid, Child { name: "Cy".into(), age: 3 });

    session
        .inserter_with("kids", &mapper)
        .insert(&Child { name: "Ann".into(), age: 9 })
        .await
        .unwrap();

    let stored = session.documents("kids").await;
    assert!(matches!(stored[1].get("_id"), Some(Bson::ObjectId(_))));
    assert_eq!(session.collections().await, vec!["kids".to_string()]);

    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn serde_fields_filter_and_update_in_their_stored_form() {
    let session = MemorySession::new();
    let events = Table::<Event>::of("events");
    let at = chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap();
    let dark = Preferences { theme: "dark".into(), notifications: true };

    session
        .inserter(&events)
        .insert(&Event { id: 1, at, preferences: dark.clone() })
        .await
        .unwrap();

    let at_field = events.field(&member!(Event, at)).unwrap();
    let preferences = events.field(&member!(Event, preferences)).unwrap();

    let stored = session.documents("events").await;
    assert_eq!(
        at_field.eq(at).unwrap().to_document().get("at"),
        stored[0].get("at"),
    );

    let matching = session
        .query(&events)
        .filter(at_field.eq(at).unwrap())
        .unwrap()
        .filter(preferences.eq(dark.clone()).unwrap())
        .unwrap();
    assert_eq!(matching.all().await.unwrap().len(), 1);

    let later = at + chrono::Duration::hours(1);
    matching
        .update(&at_field.set(later).unwrap())
        .await
        .unwrap();

    let moved = session
        .query(&events)
        .filter(at_field.gt(at).unwrap())
        .unwrap()
        .first()
        .await
        .unwrap();
    assert_eq!(moved, Event { id: 1, at: later, preferences: dark });
    assert!(matching.all().await.unwrap().is_empty());
}

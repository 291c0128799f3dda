use jsonapi_store::adapter::mock::{MockAdapter, Operation};
use jsonapi_store::record::{Related, RelationshipData, SchemaWarning};
use jsonapi_store::schema::{Field, FieldKind, Schema};
use jsonapi_store::{Document, EntityKey, ResourceConfig, Store, StoreError, StoreOptions};
use serde_json::{json, Value};

fn store_with(mock: &MockAdapter, options: StoreOptions) -> Store {
    let store = Store::new(mock.clone(), options);
    store
        .resource(
            ResourceConfig::new("person").path("people"),
            Schema::new()
                .field("id", Field::key())
                .field("firstName", Field::attribute())
                .field("address", Field::has_one())
                .field("friends", Field::has_many()),
        )
        .unwrap();
    store
        .resource(
            ResourceConfig::new("address").path("addresses"),
            Schema::new().field("id", Field::key()).field("street", Field::attribute()),
        )
        .unwrap();
    store
}

fn person(id: u32, friends: &[u32]) -> Value {
    let friends: Vec<Value> = friends.iter().map(|f| json!({ "type": "person", "id": f })).collect();
    json!({
        "type": "person",
        "id": id,
        "attributes": { "first-name": format!("Person{id}") },
        "relationships": { "friends": { "data": friends } }
    })
}

fn url_count(mock: &MockAdapter, url: &str) -> usize {
    mock.requests().iter().filter(|r| r.url == url).count()
}

#[tokio::test]
async fn test_has_one_target_is_fetched_once() {
    let mock = MockAdapter::new();
    let store = store_with(&mock, StoreOptions::default());
    mock.expect_get_item("/people/1").return_ok(Document::new(json!({
        "type": "person",
        "id": 1,
        "relationships": { "address": { "data": { "type": "address", "id": 9 } } }
    })));
    mock.expect_get_item("/addresses/9").return_ok(Document::new(json!({
        "type": "address",
        "id": 9,
        "attributes": { "street": "Main" }
    })));

    let owner = store.find("person", 1).await.unwrap();
    assert_eq!(
        owner.record().relationships["address"],
        RelationshipData::One(Related::Resolved(EntityKey::new("address", 9)))
    );

    let address = owner.get("address").await.unwrap().unwrap().into_model().unwrap();
    assert!(address.is_resolved());
    assert_eq!(owner.get("address.street").await.unwrap().unwrap().as_str(), Some("Main"));

    store.find("address", 9).await.unwrap();
    assert_eq!(url_count(&mock, "/addresses/9"), 1);
    mock.verify();
}

#[tokio::test]
async fn test_has_many_fetches_only_uncached_elements() {
    let mock = MockAdapter::new();
    let store = store_with(&mock, StoreOptions::default());
    mock.expect_get_item("/people/2").return_ok(Document::new(person(2, &[])));
    mock.expect_get_item("/people/1").return_ok(Document::new(person(1, &[2, 3])));
    mock.expect_get_item("/people/3").return_ok(Document::new(person(3, &[])));

    store.find("person", 2).await.unwrap();
    let owner = store.find("person", 1).await.unwrap();

    assert_eq!(url_count(&mock, "/people/2"), 1);
    assert_eq!(url_count(&mock, "/people/3"), 1);
    assert_eq!(
        owner.record().relationships["friends"],
        RelationshipData::Many(vec![
            Related::Resolved(EntityKey::new("person", 2)),
            Related::Resolved(EntityKey::new("person", 3)),
        ])
    );

    let friends = owner.get("friends").await.unwrap().unwrap().into_models().unwrap();
    let names: Vec<_> = friends.iter().map(|f| f.attribute("firstName").cloned()).collect();
    assert_eq!(names, vec![Some(json!("Person2")), Some(json!("Person3"))]);
    mock.verify();
}

#[tokio::test]
async fn test_duplicate_references_are_collapsed() {
    let mock = MockAdapter::new();
    let store = store_with(&mock, StoreOptions::default());
    mock.expect_get_item("/people/1").return_ok(Document::new(person(1, &[2, 2])));
    mock.expect_get_item("/people/2").return_ok(Document::new(person(2, &[])));

    let owner = store.find("person", 1).await.unwrap();
    assert_eq!(owner.record().relationships["friends"].keys().len(), 1);
    assert_eq!(mock.count(Operation::GetItem), 2);
}

#[tokio::test]
async fn test_mutual_references_converge() {
    let mock = MockAdapter::new();
    let store = store_with(&mock, StoreOptions::default());
    mock.expect_get_item("/people/1").return_ok(Document::new(person(1, &[2])));
    mock.expect_get_item("/people/2").return_ok(Document::new(person(2, &[1])));

    let first = store.find("person", 1).await.unwrap();
    assert_eq!(mock.count(Operation::GetItem), 2);

    let second = first.get("friends").await.unwrap().unwrap().into_models().unwrap().remove(0);
    assert_eq!(
        second.record().relationships["friends"],
        RelationshipData::Many(vec![Related::Resolved(EntityKey::new("person", 1))])
    );
    mock.verify();
}

#[tokio::test]
async fn test_depth_limit_stops_runaway_chains() {
    let mock = MockAdapter::new();
    let store = store_with(
        &mock,
        StoreOptions {
            max_resolution_depth: 1,
            ..StoreOptions::default()
        },
    );
    mock.expect_get_item("/people/1").return_ok(Document::new(person(1, &[2])));
    mock.expect_get_item("/people/2").return_ok(Document::new(person(2, &[3])));
    mock.expect_get_item("/people/3").return_ok(Document::new(person(3, &[4])));

    let err = store.find("person", 1).await.unwrap_err();
    match err {
        StoreError::ResolutionCycle { key, depth } => {
            assert_eq!(key, EntityKey::new("person", 3));
            assert_eq!(depth, 2);
        }
        other => panic!("expected a resolution cycle, got {other:?}"),
    }
    mock.verify();

    // The entity where resolution stopped stays cached with its raw references.
    let stuck = store.find_item("person", 3).await.unwrap().unwrap();
    assert!(stuck.resolved);
    assert_eq!(
        stuck.relationships["friends"],
        RelationshipData::Many(vec![Related::Reference(EntityKey::new("person", 4))])
    );
}

#[tokio::test]
async fn test_null_has_one_is_not_fetched() {
    let mock = MockAdapter::new();
    let store = store_with(&mock, StoreOptions::default());
    mock.expect_get_item("/people/1").return_ok(Document::new(json!({
        "type": "person",
        "id": 1,
        "relationships": { "address": { "data": null }, "friends": { "data": [] } }
    })));

    let owner = store.find("person", 1).await.unwrap();
    assert_eq!(owner.get("address").await.unwrap().unwrap().as_value(), Some(&Value::Null));
    assert!(owner.get("friends").await.unwrap().unwrap().into_models().unwrap().is_empty());
    assert_eq!(mock.count(Operation::GetItem), 1);
}

#[tokio::test]
async fn test_shape_mismatch_is_a_warning() {
    let mock = MockAdapter::new();
    let store = store_with(&mock, StoreOptions::default());
    mock.expect_get_item("/people/1").return_ok(Document::new(json!({
        "type": "person",
        "id": 1,
        "relationships": {
            "address": { "data": [{ "type": "address", "id": 9 }] },
            "friends": { "data": { "type": "person", "id": 2 } },
            "pets": { "data": [] }
        }
    })));

    let owner = store.find("person", 1).await.unwrap();
    assert_eq!(mock.count(Operation::GetItem), 1);
    assert_eq!(owner.record().relationships["address"].shape(), "array");
    assert_eq!(owner.record().relationships["friends"].shape(), "object");

    let warnings = owner.warnings();
    assert!(warnings.contains(&SchemaWarning::KindMismatch {
        field: "address".into(),
        expected: FieldKind::HasOne,
        found: "array",
    }));
    assert!(warnings.contains(&SchemaWarning::KindMismatch {
        field: "friends".into(),
        expected: FieldKind::HasMany,
        found: "object",
    }));
    assert!(warnings.contains(&SchemaWarning::UndeclaredRelationship { field: "pets".into() }));
}

#[tokio::test]
async fn test_included_resources_need_no_fetch() {
    let mock = MockAdapter::new();
    let store = store_with(&mock, StoreOptions::default());
    mock.expect_get_item("/people/1").return_ok(
        Document::new(json!({
            "type": "person",
            "id": 1,
            "relationships": { "address": { "data": { "type": "address", "id": 9 } } }
        }))
        .with_included(vec![json!({ "type": "address", "id": 9, "attributes": { "street": "Side" } })]),
    );

    let owner = store.find("person", 1).await.unwrap();
    assert_eq!(owner.get("address.street").await.unwrap().unwrap().as_str(), Some("Side"));
    assert_eq!(mock.count(Operation::GetItem), 1);
    mock.verify();
}

#[tokio::test]
async fn test_unregistered_related_type_fails_resolution() {
    let mock = MockAdapter::new();
    let store = store_with(&mock, StoreOptions::default());
    mock.expect_get_item("/people/1").return_ok(Document::new(json!({
        "type": "person",
        "id": 1,
        "relationships": { "address": { "data": { "type": "planet", "id": 3 } } }
    })));

    let err = store.find("person", 1).await.unwrap_err();
    assert!(matches!(err, StoreError::UnknownResource(name) if name == "planet"));
}

#[tokio::test]
async fn test_collection_members_share_one_fetch_of_a_common_target() {
    let mock = MockAdapter::new();
    let store = store_with(&mock, StoreOptions::default());
    mock.expect_get_all("/people")
        .return_ok(Document::new(json!([person(1, &[9]), person(2, &[9])])));
    mock.expect_get_item("/people/9").return_ok(Document::new(person(9, &[])));

    let people = store.find_all("person").await.unwrap();
    assert_eq!(people.len(), 2);
    assert_eq!(url_count(&mock, "/people/9"), 1);
    for member in &people {
        assert_eq!(
            member.record().relationships["friends"],
            RelationshipData::Many(vec![Related::Resolved(EntityKey::new("person", 9))])
        );
    }

    let shared = store.find_item("person", 9).await.unwrap().unwrap();
    assert_eq!(shared.attributes["firstName"], "Person9");
    mock.verify();
}

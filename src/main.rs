//! # Store Demo
//!
//! Registers two resources against a [`MockAdapter`] standing in for a server, then
//! walks through a fetch with relationship resolution, a cache hit, an update and a
//! create.

use jsonapi_store::adapter::mock::{MockAdapter, Operation};
use jsonapi_store::lifecycle::setup_tracing;
use jsonapi_store::schema::{Field, Schema};
use jsonapi_store::{Document, ResourceConfig, Store, StoreError, StoreOptions};
use serde_json::json;
use tracing::{info, Instrument};

#[tokio::main]
async fn main() -> Result<(), StoreError> {
    setup_tracing();

    let server = MockAdapter::new();
    server.expect_get_item("https://api.example.com/people/3").return_ok(Document::new(json!({
        "type": "person",
        "id": 3,
        "attributes": { "first-name": "Test3", "last-name": "Person" },
        "relationships": {
            "address": { "data": { "type": "address", "id": 9 } }
        }
    })));
    server.expect_get_item("https://api.example.com/addresses/9").return_ok(Document::new(json!({
        "type": "address",
        "id": 9,
        "attributes": { "street-name": "Main Street" }
    })));

    let store = Store::builder()
        .adapter(server.clone())
        .options(StoreOptions {
            host: "https://api.example.com/".to_string(),
            check_integrity: true,
            ..StoreOptions::default()
        })
        .build()?;

    let people = store.resource(
        ResourceConfig::new("person").path("people"),
        Schema::new()
            .field("id", Field::key())
            .field("firstName", Field::attribute())
            .field("lastName", Field::attribute())
            .field("address", Field::has_one().related("address")),
    )?;
    store.resource(
        ResourceConfig::new("address").path("addresses"),
        Schema::new().field("id", Field::key()).field("streetName", Field::attribute()),
    )?;

    let span = tracing::info_span!("lookup");
    let mut person = async {
        let person = people.find(3).await?;
        let street = person.get("address.streetName").await?;
        info!(first_name = ?person.attribute("firstName"), street = ?street, "Found person");

        // Second lookup is served from the cache.
        people.find(3).await?;
        info!(fetches = server.count(Operation::GetItem), "Cache hit");
        Ok::<_, StoreError>(person)
    }
    .instrument(span)
    .await?;

    server.expect_update_item("https://api.example.com/people/3").return_ok(Document::new(json!({
        "type": "person",
        "id": 3,
        "attributes": { "first-name": "Ada", "last-name": "Person" },
        "relationships": {
            "address": { "data": { "type": "address", "id": 9 } }
        }
    })));
    person.set("firstName", "Ada")?;
    person.save().await?;
    info!(first_name = ?person.attribute("firstName"), "Updated person");

    server.expect_save_item("https://api.example.com/people").return_ok(Document::new(json!({
        "type": "person",
        "id": 4,
        "attributes": { "first-name": "Grace", "last-name": "Hopper" },
        "relationships": { "address": { "data": null } }
    })));
    let mut grace = people.create()?;
    grace.set("firstName", "Grace")?;
    grace.set("lastName", "Hopper")?;
    grace.save().await?;
    info!(id = ?grace.id(), url = grace.url(), "Created person");

    info!(cache = %store.to_json().await?, "Cache contents");
    server.verify();
    store.shutdown().await?;

    info!("Demo completed successfully");
    Ok(())
}

use cucumber::given;
use platter_engine::{db_types::LineKind, test_utils::fixtures::*};

use crate::cucumber::{OrderFlowSystem, OrderWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut OrderWorld) {
    let system = OrderFlowSystem::new().await;
    world.system = Some(system);
}

#[given(expr = "the restaurant serves the {word} {string} for {int}")]
async fn catalog_item(world: &mut OrderWorld, kind: String, name: String, price: i64) {
    let kind = kind.parse::<LineKind>().expect("food or combo");
    let id = insert_catalog_item(world.api().db(), kind, &CatalogFixture::new(RESTAURANT, &name, price)).await;
    world.items.insert(name, id);
}

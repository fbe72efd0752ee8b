use kvorm::{
    Direction, FieldSchema, KvormConfig, KvormInstance, Record, TableSpec, Value,
};

async fn seeded_db() -> KvormInstance {
    let db = KvormInstance::builder(KvormConfig::named("query"))
        .table(
            TableSpec::new("products")
                .field("id", FieldSchema::number().primary_key().auto_increment())
                .field("name", FieldSchema::text().required())
                .field("price", FieldSchema::number().required())
                .field("stocked", FieldSchema::boolean().default_value(true)),
        )
        .build()
        .expect("schema");
    db.connect_memory().await.expect("connect");
    for (name, price, stocked) in [
        ("anvil", 120, true),
        ("bolt", 2, true),
        ("crate", 35, false),
        ("drill", 99, true),
        ("easel", 48, false),
    ] {
        db.from("products")
            .expect("chain")
            .insert(
                Record::new()
                    .with("name", name)
                    .with("price", price)
                    .with("stocked", stocked),
            )
            .get()
            .await
            .expect("seed");
    }
    db
}

fn names(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .map(|r| {
            r.get("name")
                .and_then(|v| v.as_text())
                .expect("name")
                .to_string()
        })
        .collect()
}

#[tokio::test]
async fn filters_conjoin() {
    let db = seeded_db().await;
    let rows = db
        .from("products")
        .expect("chain")
        .gt("price", 10)
        .eq("stocked", true)
        .get()
        .await
        .expect("read");
    let mut found = names(&rows);
    found.sort();
    assert_eq!(found, ["anvil", "drill"]);
}

#[tokio::test]
async fn ordering_operators_cover_boundaries() {
    let db = seeded_db().await;
    let gte = db
        .from("products")
        .expect("chain")
        .gte("price", 99)
        .get()
        .await
        .expect("read");
    assert_eq!(gte.len(), 2);

    let lte = db
        .from("products")
        .expect("chain")
        .lte("price", 2)
        .get()
        .await
        .expect("read");
    assert_eq!(names(&lte), ["bolt"]);

    let neq = db
        .from("products")
        .expect("chain")
        .neq("name", "anvil")
        .get()
        .await
        .expect("read");
    assert_eq!(neq.len(), 4);
}

#[tokio::test]
async fn order_sorts_ascending_and_descending() {
    let db = seeded_db().await;
    let asc = db
        .from("products")
        .expect("chain")
        .order("price", Direction::Asc)
        .get()
        .await
        .expect("read");
    assert_eq!(names(&asc), ["bolt", "crate", "easel", "drill", "anvil"]);

    let desc = db
        .from("products")
        .expect("chain")
        .order("price", Direction::Desc)
        .get()
        .await
        .expect("read");
    assert_eq!(names(&desc), ["anvil", "drill", "easel", "crate", "bolt"]);
}

#[tokio::test]
async fn offset_then_limit_pages_through_sorted_results() {
    let db = seeded_db().await;
    let page = db
        .from("products")
        .expect("chain")
        .order("price", Direction::Asc)
        .offset(1)
        .limit(2)
        .get()
        .await
        .expect("read");
    assert_eq!(names(&page), ["crate", "easel"]);
}

#[tokio::test]
async fn pagination_is_independent_of_call_order() {
    let db = seeded_db().await;
    let page = db
        .from("products")
        .expect("chain")
        .limit(2)
        .offset(1)
        .order("price", Direction::Asc)
        .get()
        .await
        .expect("read");
    assert_eq!(names(&page), ["crate", "easel"]);
}

#[tokio::test]
async fn offset_past_end_is_empty() {
    let db = seeded_db().await;
    let page = db
        .from("products")
        .expect("chain")
        .offset(100)
        .get()
        .await
        .expect("read");
    assert!(page.is_empty());
}

#[tokio::test]
async fn projection_keeps_only_named_fields() {
    let db = seeded_db().await;
    let rows = db
        .from("products")
        .expect("chain")
        .eq("name", "anvil")
        .select(&["name", "price"])
        .get()
        .await
        .expect("read");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].len(), 2);
    assert_eq!(rows[0].get("price"), Some(&Value::Integer(120)));
    assert!(rows[0].get("id").is_none());
    assert!(rows[0].get("stocked").is_none());
}

#[tokio::test]
async fn empty_projection_returns_full_records() {
    let db = seeded_db().await;
    let rows = db
        .from("products")
        .expect("chain")
        .eq("name", "bolt")
        .select(&[])
        .get()
        .await
        .expect("read");
    assert_eq!(rows.len(), 1);
    assert!(rows[0].get("id").is_some());
    assert!(rows[0].get("stocked").is_some());
}

#[tokio::test]
async fn projecting_an_absent_field_skips_it() {
    let db = seeded_db().await;
    let rows = db
        .from("products")
        .expect("chain")
        .eq("name", "bolt")
        .select(&["name", "color"])
        .get()
        .await
        .expect("read");
    assert_eq!(rows[0].len(), 1);
    assert!(rows[0].get("color").is_none());
}

#[tokio::test]
async fn filtering_on_absent_field_matches_nothing_except_neq() {
    let db = seeded_db().await;
    let eq = db
        .from("products")
        .expect("chain")
        .eq("color", "red")
        .get()
        .await
        .expect("read");
    assert!(eq.is_empty());

    let neq = db
        .from("products")
        .expect("chain")
        .neq("color", "red")
        .get()
        .await
        .expect("read");
    assert_eq!(neq.len(), 5);
}

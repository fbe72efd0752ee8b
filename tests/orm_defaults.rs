use std::collections::BTreeMap;
use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use kvorm::{
    FieldSchema, KvormConfig, KvormInstance, Record, TableSpec, Value,
};

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[tokio::test]
async fn generated_text_keys_are_uuid_shaped_and_distinct() {
    let db = KvormInstance::builder(KvormConfig::named("defaults"))
        .table(
            TableSpec::new("events")
                .field("id", FieldSchema::text().primary_key())
                .field("kind", FieldSchema::text().required()),
        )
        .build()
        .expect("schema");
    db.connect_memory().await.expect("connect");

    let mut seen = HashSet::new();
    for _ in 0..50 {
        let created = db
            .from("events")
            .expect("chain")
            .insert(Record::new().with("kind", "tick"))
            .get()
            .await
            .expect("insert");
        let id = created[0]
            .get("id")
            .and_then(|v| v.as_text())
            .expect("id")
            .to_string();
        assert_eq!(id.len(), 36);
        assert_eq!(id.as_bytes()[14], b'4');
        for pos in [8, 13, 18, 23] {
            assert_eq!(id.as_bytes()[pos], b'-');
        }
        assert!(seen.insert(id), "duplicate generated key");
    }
}

#[tokio::test]
async fn auto_increment_keys_are_strictly_increasing() {
    let db = KvormInstance::builder(KvormConfig::named("defaults"))
        .table(
            TableSpec::new("logs")
                .field("seq", FieldSchema::number().primary_key().auto_increment())
                .field("line", FieldSchema::text().required()),
        )
        .build()
        .expect("schema");
    db.connect_memory().await.expect("connect");

    let mut last = 0;
    for i in 0..10 {
        let created = db
            .from("logs")
            .expect("chain")
            .insert(Record::new().with("line", format!("line {i}")))
            .get()
            .await
            .expect("insert");
        let seq = created[0]
            .get("seq")
            .and_then(|v| v.as_integer())
            .expect("assigned key");
        assert!(seq > last);
        last = seq;
    }

    // Deleting does not recycle keys.
    db.from("logs").expect("chain").delete().get().await.expect("delete");
    let created = db
        .from("logs")
        .expect("chain")
        .insert(Record::new().with("line", "after clear"))
        .get()
        .await
        .expect("insert");
    let seq = created[0].get("seq").and_then(|v| v.as_integer()).expect("key");
    assert!(seq > last);
}

#[tokio::test]
async fn factory_defaults_run_per_insert() {
    let db = KvormInstance::builder(KvormConfig::named("defaults"))
        .table(
            TableSpec::new("notes")
                .field("id", FieldSchema::text().primary_key())
                .field("body", FieldSchema::text().required())
                .field(
                    "created_at",
                    FieldSchema::number().default_factory(|| Value::Integer(now_millis())),
                ),
        )
        .build()
        .expect("schema");
    db.connect_memory().await.expect("connect");

    let before = now_millis();
    let created = db
        .from("notes")
        .expect("chain")
        .insert(Record::new().with("body", "hello"))
        .get()
        .await
        .expect("insert");
    let after = now_millis();

    let stamp = created[0]
        .get("created_at")
        .and_then(|v| v.as_integer())
        .expect("created_at");
    assert!(stamp >= before && stamp <= after);
}

#[tokio::test]
async fn nested_object_defaults_fill_missing_subfields() {
    let db = KvormInstance::builder(KvormConfig::named("defaults"))
        .table(
            TableSpec::new("profiles")
                .field("id", FieldSchema::text().primary_key())
                .field(
                    "settings",
                    FieldSchema::object([
                        ("theme", FieldSchema::text().default_value("light")),
                        ("notifications", FieldSchema::boolean().default_value(true)),
                    ]),
                ),
        )
        .build()
        .expect("schema");
    db.connect_memory().await.expect("connect");

    // Partial object: only theme supplied, notifications comes from the default.
    let mut supplied = BTreeMap::new();
    supplied.insert("theme".to_string(), Value::Text("dark".into()));
    let created = db
        .from("profiles")
        .expect("chain")
        .insert(Record::new().with("settings", Value::Object(supplied)))
        .get()
        .await
        .expect("insert");

    let Some(Value::Object(settings)) = created[0].get("settings") else {
        panic!("settings missing");
    };
    assert_eq!(settings.get("theme"), Some(&Value::Text("dark".into())));
    assert_eq!(settings.get("notifications"), Some(&Value::Boolean(true)));
}

#[tokio::test]
async fn stored_defaults_do_not_alias_between_records() {
    let db = KvormInstance::builder(KvormConfig::named("defaults"))
        .table(
            TableSpec::new("docs")
                .field("id", FieldSchema::text().primary_key())
                .field(
                    "meta",
                    FieldSchema::object([("labels", FieldSchema::text())])
                        .default_value(Value::Object(BTreeMap::new())),
                ),
        )
        .build()
        .expect("schema");
    db.connect_memory().await.expect("connect");

    let a = db
        .from("docs")
        .expect("chain")
        .insert(Record::new())
        .get()
        .await
        .expect("insert");
    let a_id = a[0].get("id").expect("id").clone();

    // Mutating one record's defaulted object leaves the other untouched.
    let mut meta = BTreeMap::new();
    meta.insert("labels".to_string(), Value::Text("draft".into()));
    db.from("docs")
        .expect("chain")
        .update(
            Record::new()
                .with("id", a_id.clone())
                .with("meta", Value::Object(meta)),
        )
        .get()
        .await
        .expect("update");

    let b = db
        .from("docs")
        .expect("chain")
        .insert(Record::new())
        .get()
        .await
        .expect("insert");
    assert_eq!(
        b[0].get("meta"),
        Some(&Value::Object(BTreeMap::new()))
    );
}

use partload::model::{AttributeValue, Record, ScalarValue, TimeWindow};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Map, Value};

#[allow(dead_code)]
const CATEGORY_POOL: &[&str] = &[
    "Restaurants",
    "Bars",
    "Nightlife",
    "Italian",
    "Pizza",
    "Coffee & Tea",
    "Breakfast & Brunch",
    "Health & Medical",
    "Doctors",
    "Shopping",
    "Auto Repair",
    "Hotels & Travel",
    "Sushi Bars",
    "Mexican",
    "Beauty & Spas",
    "Nail Salons",
    "Dentists",
    "Pets",
    "Fast Food",
    "Arts & Entertainment",
];

#[allow(dead_code)]
const DAYS: &[&str] = &[
    "MONDAY",
    "TUESDAY",
    "WEDNESDAY",
    "THURSDAY",
    "FRIDAY",
    "SATURDAY",
    "SUNDAY",
];

/// Three records with category sets `{bars, nightlife}`, `{bars}` and
/// `{italian}`.
#[allow(dead_code)]
pub fn scenario_a() -> Vec<Record> {
    vec![
        business("r1").with_categories(["bars", "nightlife"]),
        business("r2").with_categories(["bars"]),
        business("r3").with_categories(["italian"]),
    ]
}

/// A boolean attribute, a string attribute and a nested one.
#[allow(dead_code)]
pub fn scenario_b() -> Vec<Record> {
    vec![
        business("r1").with_attribute("good_for_kids", AttributeValue::Bool(true)),
        business("r2").with_attribute("price_range", AttributeValue::Text("expensive".to_string())),
        business("r3").with_attribute(
            "menu",
            AttributeValue::Unsupported(r#"{"appetizers":["bread","olives"]}"#.to_string()),
        ),
    ]
}

/// A record with the core scalar fields filled in.
#[allow(dead_code)]
pub fn business(id: &str) -> Record {
    Record::new(id)
        .with_field("name", format!("Business {id}"))
        .with_field("city", "Phoenix")
        .with_field("state", "AZ")
        .with_field("stars", 4.0)
        .with_field("review_count", 12_i64)
        .with_field("open", true)
}

/// Seeded random corpus with overlapping categories, mixed attribute kinds
/// and opening hours.
#[allow(dead_code)]
pub fn generate_corpus(count: usize, seed: u64) -> Vec<Record> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut records = Vec::with_capacity(count);

    for idx in 0..count {
        let mut record = business(&format!("biz_{idx:06}"))
            .with_field("latitude", rng.random_range(33.0_f64..34.0))
            .with_field("longitude", rng.random_range(-112.5_f64..-111.5));

        let category_count = rng.random_range(0..5);
        for _ in 0..category_count {
            let category = CATEGORY_POOL[rng.random_range(0..CATEGORY_POOL.len())];
            record = record.with_category(category);
        }

        if rng.random_bool(0.7) {
            record = record.with_attribute(
                "good_for_kids",
                AttributeValue::Bool(rng.random_bool(0.5)),
            );
        }
        if rng.random_bool(0.5) {
            record = record.with_attribute(
                "price_range",
                AttributeValue::Integer(rng.random_range(1..5)),
            );
        }
        if rng.random_bool(0.4) {
            let noise = ["quiet", "average", "loud"][rng.random_range(0..3)];
            record = record.with_attribute("noise_level", AttributeValue::Text(noise.to_string()));
        }
        if rng.random_bool(0.3) {
            record = record.with_attribute(
                "parking",
                AttributeValue::Unsupported(r#"{"garage":false,"street":true}"#.to_string()),
            );
        }

        let open_days = rng.random_range(0..=DAYS.len());
        for day in &DAYS[..open_days] {
            record = record.with_hours(TimeWindow::new(*day, "08:00", "17:00"));
        }

        records.push(record);
    }

    records
}

/// Render a record in the JSON-lines input format.
#[allow(dead_code)]
pub fn to_json_line(record: &Record) -> String {
    let mut object = Map::new();
    object.insert("business_id".to_string(), json!(record.id));
    for (name, value) in &record.fields {
        object.insert(name.clone(), scalar_json(value));
    }
    object.insert("categories".to_string(), json!(record.categories));

    let mut attributes = Map::new();
    for entry in &record.attributes {
        let value = match &entry.value {
            AttributeValue::Bool(flag) => json!(flag),
            AttributeValue::Integer(value) => json!(value),
            AttributeValue::Text(text) => json!(text),
            AttributeValue::Unsupported(raw) => serde_json::from_str(raw).unwrap_or(Value::Null),
        };
        attributes.insert(entry.key.clone(), value);
    }
    object.insert("attributes".to_string(), Value::Object(attributes));

    let mut hours = Map::new();
    for window in &record.hours {
        hours.insert(
            window.day.to_lowercase(),
            json!({"open": window.open, "close": window.close}),
        );
    }
    object.insert("hours".to_string(), Value::Object(hours));

    Value::Object(object).to_string()
}

#[allow(dead_code)]
fn scalar_json(value: &ScalarValue) -> Value {
    match value {
        ScalarValue::Null => Value::Null,
        ScalarValue::Bool(flag) => json!(flag),
        ScalarValue::Integer(value) => json!(value),
        ScalarValue::Float(value) => json!(value),
        ScalarValue::Text(text) => json!(text),
    }
}

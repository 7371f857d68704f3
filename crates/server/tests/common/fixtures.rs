//! Staged snapshot fixtures.

use serde_json::{Value, json};

#[allow(dead_code)]
pub fn taxonomy(id: &str, title: &str) -> Value {
    json!({"id": id, "title": {"en": title}})
}

#[allow(dead_code)]
pub fn label(id: &str, taxonomy_id: &str, title: &str) -> Value {
    json!({"id": id, "taxonomy_id": taxonomy_id, "title": {"en": title}})
}

#[allow(dead_code)]
pub fn person(id: &str, name: &str) -> Value {
    json!({"id": id, "name": name})
}

#[allow(dead_code)]
pub fn session(id: &str, title: &str, start: &str) -> Value {
    json!({
        "id": id,
        "title": {"en": title},
        "start_date": start,
    })
}

#[allow(dead_code)]
pub fn session_label(id: &str, session_id: &str, label_id: &str) -> Value {
    json!({"id": id, "session_id": session_id, "label_id": label_id})
}

#[allow(dead_code)]
pub fn session_person(id: &str, session_id: &str, person_id: &str) -> Value {
    json!({"id": id, "session_id": session_id, "person_id": person_id})
}

/// One theme taxonomy with one label.
#[allow(dead_code)]
pub fn theme_taxonomies() -> Value {
    json!({
        "taxonomies": [taxonomy("t1", "Theme")],
        "labels": [label("l1", "t1", "Talks")],
    })
}

/// Two sessions, one speaker, with the speaker and the `l1` label on `s1`.
#[allow(dead_code)]
pub fn small_schedule() -> Value {
    json!({
        "people": [person("p1", "Ada Lovelace")],
        "sessions": [
            session("s1", "Opening keynote", "2026-06-01T09:00:00Z"),
            session("s2", "Lunch", "2026-06-01T12:00:00Z"),
        ],
        "session_links": [
            {"id": "k1", "session_id": "s1", "kind": "slides", "url": "https://example.org/s1.pdf"}
        ],
        "session_labels": [session_label("sl1", "s1", "l1")],
        "session_people": [session_person("sp1", "s1", "p1")],
    })
}

/// Count of `kind` in a summary section.
#[allow(dead_code)]
pub fn count(summary: &Value, resource: &str, kind: &str) -> u64 {
    summary[resource][kind].as_u64().unwrap_or(0)
}

// Event record normalizer — raw API items into canonical ActivityEvents.
//
// The API has shipped several shapes for the same record: flat rows with
// `object_type` / `type` / `actor_id`, and ActivityStreams-flavored rows that
// nest the same information under `as2_json` (sometimes as an embedded JSON
// string rather than an object). Top-level fields always win over nested ones.
// Anything the normalizer doesn't consume is passed through in `payload`.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::category::{classify, Category};
use crate::error::NormalizeError;

/// Top-level keys the normalizer reads. Everything else lands in `payload`.
const CONSUMED_KEYS: &[&str] = &[
    "id",
    "type",
    "object_type",
    "actor_id",
    "actor_username",
    "username",
    "summary",
    "published_at",
    "published",
    "created_at",
    "community_id",
    "as2_json",
    "payload",
];

/// A canonical, classified activity event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub id: String,
    pub category: Category,
    pub actor_id: Option<String>,
    /// Absent for the caller's own synthesized rows.
    pub actor_username: Option<String>,
    pub object_type: Option<String>,
    pub activity_verb: Option<String>,
    pub summary: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub community_id: Option<String>,
    /// Category-specific extras, passed through untouched.
    pub payload: Map<String, Value>,
}

/// Normalize one raw API item.
///
/// Only a non-object item or an item with no usable id is rejected; every
/// other missing field surfaces as `None`.
pub fn normalize(raw: &Value) -> Result<ActivityEvent, NormalizeError> {
    let obj = raw.as_object().ok_or(NormalizeError::NotAnObject)?;
    let as2 = as2_document(obj);
    let as2 = as2.as_ref().and_then(Value::as_object);

    let id = scalar(obj.get("id"))
        .or_else(|| as2.and_then(|a| scalar(a.get("id"))))
        .ok_or(NormalizeError::MissingId)?;

    let object_type = scalar(obj.get("object_type")).or_else(|| {
        as2.and_then(|a| a.get("object"))
            .and_then(Value::as_object)
            .and_then(|o| scalar(o.get("type")))
    });

    let activity_verb =
        scalar(obj.get("type")).or_else(|| as2.and_then(|a| scalar(a.get("type"))));

    let as2_actor = as2.and_then(|a| a.get("actor"));
    let actor_id = scalar(obj.get("actor_id")).or_else(|| match as2_actor {
        Some(Value::Object(actor)) => scalar(actor.get("id")),
        other => scalar(other),
    });
    let actor_username = scalar(obj.get("actor_username"))
        .or_else(|| scalar(obj.get("username")))
        .or_else(|| {
            as2_actor.and_then(Value::as_object).and_then(|actor| {
                scalar(actor.get("preferredUsername"))
                    .or_else(|| scalar(actor.get("username")))
                    .or_else(|| scalar(actor.get("name")))
            })
        });

    let summary = scalar(obj.get("summary")).or_else(|| as2.and_then(|a| scalar(a.get("summary"))));

    let published_at = ["published_at", "published", "created_at"]
        .iter()
        .find_map(|key| scalar(obj.get(*key)))
        .or_else(|| as2.and_then(|a| scalar(a.get("published"))))
        .and_then(|s| parse_timestamp(&s));

    let community_id = scalar(obj.get("community_id"));

    let mut payload: Map<String, Value> = obj
        .iter()
        .filter(|(k, _)| !CONSUMED_KEYS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    if let Some(Value::Object(extra)) = obj.get("payload") {
        for (k, v) in extra {
            payload.entry(k.clone()).or_insert_with(|| v.clone());
        }
    }

    let category = classify(object_type.as_deref(), activity_verb.as_deref());

    Ok(ActivityEvent {
        id,
        category,
        actor_id,
        actor_username,
        object_type,
        activity_verb,
        summary,
        published_at,
        community_id,
        payload,
    })
}

/// The result of normalizing a whole response batch.
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub events: Vec<ActivityEvent>,
    /// Events that matched no rule and were classified as `Other`.
    pub classification_gaps: usize,
    /// Raw items rejected by the normalizer.
    pub rejected: usize,
    /// Items dropped because their id was already seen in this batch.
    pub duplicates: usize,
}

/// Normalize a batch, dropping repeated ids (first occurrence wins).
pub fn normalize_batch(items: &[Value]) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();
    let mut seen: HashSet<String> = HashSet::new();

    for item in items {
        let event = match normalize(item) {
            Ok(event) => event,
            Err(e) => {
                debug!(error = %e, "Skipping unusable activity record");
                batch.rejected += 1;
                continue;
            }
        };

        if !seen.insert(event.id.clone()) {
            batch.duplicates += 1;
            continue;
        }

        if event.category == Category::Other {
            debug!(
                id = %event.id,
                object_type = event.object_type.as_deref().unwrap_or("-"),
                verb = event.activity_verb.as_deref().unwrap_or("-"),
                "Classification gap, using Other"
            );
            batch.classification_gaps += 1;
        }

        batch.events.push(event);
    }

    batch
}

/// `as2_json` may arrive as an object or as a JSON-encoded string.
fn as2_document(obj: &Map<String, Value>) -> Option<Value> {
    match obj.get("as2_json")? {
        Value::Object(_) => obj.get("as2_json").cloned(),
        Value::String(s) => serde_json::from_str::<Value>(s)
            .ok()
            .filter(Value::is_object),
        _ => None,
    }
}

/// Read a string-ish field. Empty strings and null count as absent; numbers
/// are rendered as strings so numeric ids survive.
fn scalar(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    // Some serializers drop the offset entirely; treat those as UTC.
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

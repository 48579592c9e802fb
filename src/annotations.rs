//! Lesson annotation store.
//!
//! Annotations live in one flat `key -> text` map persisted as a single JSON
//! blob. Keys are `{field}_{day}_{period}_{classId}`; external document
//! templates interpolate by these exact names, so the format must not drift.

use crate::db;
use crate::selection::CellRef;
use log::{info, warn};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const STORAGE_KEY: &str = "nassabi_weekly_lessons_v4";
pub const KEY_SEPARATOR: char = '_';
pub const MAX_FIELD_CHARS: usize = 10_000;

pub type Store = BTreeMap<String, String>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Goals,
    Homework,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Title, Field::Goals, Field::Homework];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Goals => "goals",
            Self::Homework => "homework",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "title" => Some(Self::Title),
            "goals" => Some(Self::Goals),
            "homework" => Some(Self::Homework),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnotationKey {
    pub field: Field,
    pub day: String,
    pub period: u8,
    pub class_id: String,
}

impl AnnotationKey {
    pub fn new(field: Field, cell: &CellRef) -> Self {
        Self {
            field,
            day: cell.day.clone(),
            period: cell.period,
            class_id: cell.class_id.clone(),
        }
    }

    pub fn encode(&self) -> String {
        make_key(self.field, &self.day, self.period, &self.class_id)
    }

    /// Splits into at most four parts, so everything after the period is the
    /// class id even when it contains the separator. Day names never do.
    pub fn decode(key: &str) -> Option<Self> {
        let mut parts = key.splitn(4, KEY_SEPARATOR);
        let field = Field::parse(parts.next()?)?;
        let day = parts.next()?;
        let period = parts.next()?;
        let class_id = parts.next()?;
        if day.is_empty() || class_id.is_empty() {
            return None;
        }
        if !period.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let period: u8 = period.parse().ok()?;
        Some(Self {
            field,
            day: day.to_string(),
            period,
            class_id: class_id.to_string(),
        })
    }
}

pub fn make_key(field: Field, day: &str, period: u8, class_id: &str) -> String {
    format!(
        "{}{sep}{}{sep}{}{sep}{}",
        field.as_str(),
        day,
        period,
        class_id,
        sep = KEY_SEPARATOR
    )
}

/// Text applied to one or more cells. Missing fields write an empty string.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnnotationPayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub goals: Option<String>,
    #[serde(default)]
    pub homework: Option<String>,
}

impl AnnotationPayload {
    pub fn get(&self, field: Field) -> &str {
        let v = match field {
            Field::Title => &self.title,
            Field::Goals => &self.goals,
            Field::Homework => &self.homework,
        };
        v.as_deref().unwrap_or("")
    }

    pub fn from_json(raw: Option<&serde_json::Value>) -> Result<Self, String> {
        let payload: Self = match raw {
            None => Self::default(),
            Some(v) if v.is_null() => Self::default(),
            Some(v) => serde_json::from_value(v.clone())
                .map_err(|e| format!("invalid payload: {}", e))?,
        };
        for field in Field::ALL {
            let n = payload.get(field).chars().count();
            if n > MAX_FIELD_CHARS {
                return Err(format!(
                    "payload.{} length must be <= {} (got {})",
                    field.as_str(),
                    MAX_FIELD_CHARS,
                    n
                ));
            }
        }
        Ok(payload)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CellAnnotation {
    pub title: String,
    pub goals: String,
    pub homework: String,
}

/// Reads the persisted store. Never fails: a missing, unreadable or malformed
/// blob resets annotations to empty.
pub fn load(conn: &Connection) -> Store {
    let raw = match db::storage_get(conn, STORAGE_KEY) {
        Ok(Some(v)) => v,
        Ok(None) => return Store::new(),
        Err(e) => {
            warn!("event=store_load status=reset reason=storage_read error={e:#}");
            return Store::new();
        }
    };
    match serde_json::from_str::<Store>(&raw) {
        Ok(store) => {
            info!("event=store_load status=ok entries={}", store.len());
            store
        }
        Err(e) => {
            warn!("event=store_load status=reset reason=corrupt error={e}");
            Store::new()
        }
    }
}

/// Serializes and persists the full mapping, replacing prior contents.
pub fn save(conn: &Connection, store: &Store) -> anyhow::Result<()> {
    let blob = serde_json::to_string(store)?;
    db::storage_set(conn, STORAGE_KEY, &blob)?;
    Ok(())
}

/// Writes the three fields of `payload` for every selected cell into a copy
/// of `store`.
pub fn apply_bulk<'a, I>(store: &Store, cells: I, payload: &AnnotationPayload) -> Store
where
    I: IntoIterator<Item = &'a CellRef>,
{
    let mut next = store.clone();
    for cell in cells {
        write_cell(&mut next, cell, payload);
    }
    next
}

pub fn apply_edit(store: &Store, cell: &CellRef, payload: &AnnotationPayload) -> Store {
    apply_bulk(store, std::iter::once(cell), payload)
}

pub fn read_cell(store: &Store, cell: &CellRef) -> CellAnnotation {
    let get = |field: Field| {
        store
            .get(&AnnotationKey::new(field, cell).encode())
            .cloned()
            .unwrap_or_default()
    };
    CellAnnotation {
        title: get(Field::Title),
        goals: get(Field::Goals),
        homework: get(Field::Homework),
    }
}

/// Global wipe across all teachers.
pub fn clear(conn: &Connection) -> anyhow::Result<Store> {
    let empty = Store::new();
    save(conn, &empty)?;
    info!("event=store_clear status=ok");
    Ok(empty)
}

/// Number of distinct cells with annotations, and keys that do not follow
/// the key format (left over from older blobs or hand edits).
pub fn summarize(store: &Store) -> (usize, usize) {
    let mut cells = std::collections::BTreeSet::new();
    let mut unrecognized = 0;
    for key in store.keys() {
        match AnnotationKey::decode(key) {
            Some(k) => {
                cells.insert((k.day, k.period, k.class_id));
            }
            None => unrecognized += 1,
        }
    }
    (cells.len(), unrecognized)
}

pub fn pretty_json(store: &Store) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(store)?)
}

fn write_cell(store: &mut Store, cell: &CellRef, payload: &AnnotationPayload) {
    for field in Field::ALL {
        store.insert(
            AnnotationKey::new(field, cell).encode(),
            payload.get(field).to_string(),
        );
    }
}

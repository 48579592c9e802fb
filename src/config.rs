use crate::annotations::KEY_SEPARATOR;
use crate::db;
use crate::selection::{is_empty_class, CellRef, EMPTY_PLACEHOLDER};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const WEEK_SECTION_KEY: &str = "setup.week";

const MAX_DAYS: usize = 7;
const MAX_PERIODS: i64 = 12;
const MAX_DAY_NAME_LEN: usize = 32;
const MAX_PLACEHOLDER_CHARS: usize = 8;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekSettings {
    pub days: Vec<String>,
    pub day_aliases: BTreeMap<String, String>,
    pub periods_per_day: u8,
    pub empty_placeholder: String,
}

impl Default for WeekSettings {
    fn default() -> Self {
        let days = ["الأحد", "الإثنين", "الثلاثاء", "الأربعاء", "الخميس"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut day_aliases = BTreeMap::new();
        day_aliases.insert("الاثنين".to_string(), "الإثنين".to_string());
        Self {
            days,
            day_aliases,
            periods_per_day: 7,
            empty_placeholder: EMPTY_PLACEHOLDER.to_string(),
        }
    }
}

impl WeekSettings {
    /// Canonical spelling of a day name, following `day_aliases`.
    pub fn normalize_day(&self, raw: &str) -> Option<&str> {
        let t = raw.trim();
        if let Some(d) = self.days.iter().find(|d| d.as_str() == t) {
            return Some(d.as_str());
        }
        let canonical = self.day_aliases.get(t)?;
        self.days
            .iter()
            .find(|d| *d == canonical)
            .map(|d| d.as_str())
    }

    pub fn periods(&self) -> impl Iterator<Item = u8> {
        1..=self.periods_per_day
    }

    pub fn valid_period(&self, period: i64) -> Option<u8> {
        if (1..=self.periods_per_day as i64).contains(&period) {
            Some(period as u8)
        } else {
            None
        }
    }

    /// Whether the cell still names a canonical day, an in-range period and
    /// an occupied class under these settings.
    pub fn admits(&self, cell: &CellRef) -> bool {
        self.days.iter().any(|d| *d == cell.day)
            && self.valid_period(cell.period as i64).is_some()
            && !is_empty_class(Some(cell.class_id.as_str()), &self.empty_placeholder)
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Stored section merged over defaults. Invalid stored data falls back to
/// defaults rather than blocking the workspace.
pub fn load_week_settings(conn: &Connection) -> WeekSettings {
    let stored = match db::settings_get_json(conn, WEEK_SECTION_KEY) {
        Ok(Some(v)) => v,
        Ok(None) => return WeekSettings::default(),
        Err(e) => {
            log::warn!(
                "event=settings_load status=defaults section={WEEK_SECTION_KEY} reason=read_error error={e:#}"
            );
            return WeekSettings::default();
        }
    };
    let Some(obj) = stored.as_object() else {
        log::warn!("event=settings_load status=defaults section={WEEK_SECTION_KEY} reason=not_object");
        return WeekSettings::default();
    };
    let mut settings = WeekSettings::default();
    match merge_week_patch(&mut settings, obj) {
        Ok(()) => settings,
        Err(msg) => {
            log::warn!("event=settings_load status=defaults section={WEEK_SECTION_KEY} reason={msg}");
            WeekSettings::default()
        }
    }
}

pub fn save_week_settings(conn: &Connection, settings: &WeekSettings) -> anyhow::Result<()> {
    db::settings_set_json(conn, WEEK_SECTION_KEY, &settings.to_json())
}

pub fn merge_week_patch(settings: &mut WeekSettings, patch: &Map<String, Value>) -> Result<(), String> {
    let mut next = settings.clone();
    for (k, v) in patch {
        match k.as_str() {
            "days" => next.days = parse_days(v)?,
            "dayAliases" => next.day_aliases = parse_aliases(v)?,
            "periodsPerDay" => {
                let n = v
                    .as_i64()
                    .ok_or_else(|| "periodsPerDay must be integer".to_string())?;
                if !(1..=MAX_PERIODS).contains(&n) {
                    return Err(format!("periodsPerDay must be in 1..={}", MAX_PERIODS));
                }
                next.periods_per_day = n as u8;
            }
            "emptyPlaceholder" => {
                let s = v
                    .as_str()
                    .ok_or_else(|| "emptyPlaceholder must be string".to_string())?;
                let n = s.chars().count();
                if n == 0 || n > MAX_PLACEHOLDER_CHARS {
                    return Err(format!(
                        "emptyPlaceholder length must be in 1..={}",
                        MAX_PLACEHOLDER_CHARS
                    ));
                }
                next.empty_placeholder = s.to_string();
            }
            other => return Err(format!("unknown setting: {}", other)),
        }
    }
    for (alias, canonical) in &next.day_aliases {
        if !next.days.contains(canonical) {
            return Err(format!(
                "dayAliases.{} points at unknown day {}",
                alias, canonical
            ));
        }
    }
    *settings = next;
    Ok(())
}

fn parse_days(v: &Value) -> Result<Vec<String>, String> {
    let arr = v
        .as_array()
        .ok_or_else(|| "days must be array of strings".to_string())?;
    if arr.is_empty() || arr.len() > MAX_DAYS {
        return Err(format!("days must contain 1..={} names", MAX_DAYS));
    }
    let mut out: Vec<String> = Vec::with_capacity(arr.len());
    for item in arr {
        let name = validate_day_name(item, "days")?;
        if out.contains(&name) {
            return Err(format!("duplicate day: {}", name));
        }
        out.push(name);
    }
    Ok(out)
}

fn parse_aliases(v: &Value) -> Result<BTreeMap<String, String>, String> {
    let obj = v
        .as_object()
        .ok_or_else(|| "dayAliases must be an object".to_string())?;
    let mut out = BTreeMap::new();
    for (alias, canonical) in obj {
        let canonical = canonical
            .as_str()
            .ok_or_else(|| format!("dayAliases.{} must be string", alias))?;
        out.insert(alias.trim().to_string(), canonical.trim().to_string());
    }
    Ok(out)
}

fn validate_day_name(v: &Value, key: &str) -> Result<String, String> {
    let s = v
        .as_str()
        .ok_or_else(|| format!("{} must be array of strings", key))?
        .trim();
    if s.is_empty() {
        return Err(format!("{} entries must be non-empty", key));
    }
    if s.chars().count() > MAX_DAY_NAME_LEN {
        return Err(format!("{} entries length must be <= {}", key, MAX_DAY_NAME_LEN));
    }
    // Keys are split on the separator; a day containing it would not decode.
    if s.contains(KEY_SEPARATOR) {
        return Err(format!("{} entries must not contain '{}'", key, KEY_SEPARATOR));
    }
    Ok(s.to_string())
}

use crate::config::WeekSettings;
use crate::ipc::error::HandlerErr;
use crate::ipc::types::{AppState, Request};
use crate::selection::{is_empty_class, CellRef};
use rusqlite::Connection;
use serde_json::Value;

pub fn db_conn(state: &AppState) -> Result<&Connection, HandlerErr> {
    state
        .db
        .as_ref()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
}

pub fn required_str(req: &Request, key: &str) -> Result<String, HandlerErr> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

/// `None` for absent or null, error for any non-string value.
pub fn opt_str<'a>(req: &'a Request, key: &str) -> Result<Option<&'a str>, HandlerErr> {
    match req.params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(HandlerErr::bad_params(format!("{} must be string or null", key))),
    }
}

pub fn required_day(req: &Request, settings: &WeekSettings) -> Result<String, HandlerErr> {
    let raw = required_str(req, "day")?;
    settings
        .normalize_day(&raw)
        .map(|d| d.to_string())
        .ok_or_else(|| {
            HandlerErr::bad_params(format!("unknown day: {}", raw))
                .with_details(serde_json::json!({ "days": settings.days }))
        })
}

pub fn required_period(req: &Request, settings: &WeekSettings) -> Result<u8, HandlerErr> {
    let Some(raw) = req.params.get("period") else {
        return Err(HandlerErr::bad_params("missing period"));
    };
    let n = raw
        .as_i64()
        .or_else(|| raw.as_str().and_then(|s| s.trim().parse::<i64>().ok()))
        .ok_or_else(|| HandlerErr::bad_params("period must be integer"))?;
    settings.valid_period(n).ok_or_else(|| {
        HandlerErr::bad_params(format!(
            "period must be in 1..={}",
            settings.periods_per_day
        ))
    })
}

/// A fully identified, non-empty lesson cell from `day`, `period`, `classId`.
pub fn required_cell(req: &Request, settings: &WeekSettings) -> Result<CellRef, HandlerErr> {
    let day = required_day(req, settings)?;
    let period = required_period(req, settings)?;
    let class_id = opt_str(req, "classId")?;
    match class_id {
        Some(c) if !is_empty_class(Some(c), &settings.empty_placeholder) => Ok(CellRef {
            day,
            period,
            class_id: c.to_string(),
        }),
        _ => Err(HandlerErr::new("empty_cell", "cell has no class")),
    }
}

use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use crate::annotations::Store;
use crate::config::WeekSettings;
use crate::schedule::Schedule;
use crate::selection::Selection;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Editing state of the single UI session.
#[derive(Debug, Default)]
pub struct Session {
    pub store: Store,
    pub selection: Selection,
    pub teacher: Option<String>,
}

#[derive(Default)]
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub settings: WeekSettings,
    pub schedule: Schedule,
    pub session: Session,
}

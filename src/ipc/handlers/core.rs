use crate::annotations;
use crate::config;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request, Session};
use crate::schedule::{Schedule, SCHEDULE_FILE_NAME};
use crate::selection::Selection;
use log::{info, warn};
use serde_json::json;
use std::path::{Path, PathBuf};

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    let conn = match db::open_db(&path) {
        Ok(conn) => conn,
        Err(e) => return err(&req.id, "db_open_failed", format!("{e:?}"), None),
    };

    state.settings = config::load_week_settings(&conn);
    let store = annotations::load(&conn);

    // A missing dataset is normal for a fresh workspace; a broken one must
    // not prevent the workspace from opening either.
    let (schedule, schedule_error) = load_workspace_schedule(&path);
    state.schedule = schedule;

    let teacher = state.schedule.teachers().into_iter().next();
    state.session = Session {
        store,
        selection: Selection::new(),
        teacher: teacher.clone(),
    };
    state.db = Some(conn);
    state.workspace = Some(path.clone());

    info!(
        "event=workspace_select status=ok path={} annotations={} teachers={}",
        path.display(),
        state.session.store.len(),
        state.schedule.teacher_count()
    );

    ok(
        &req.id,
        json!({
            "workspacePath": path.to_string_lossy(),
            "annotationCount": state.session.store.len(),
            "teacherCount": state.schedule.teacher_count(),
            "activeTeacher": teacher,
            "scheduleError": schedule_error,
        }),
    )
}

fn load_workspace_schedule(workspace: &Path) -> (Schedule, Option<String>) {
    let path = workspace.join(SCHEDULE_FILE_NAME);
    if !path.is_file() {
        return (Schedule::default(), None);
    }
    match Schedule::load(&path) {
        Ok(s) => (s, None),
        Err(e) => {
            warn!("event=schedule_load status=failed path={} error={e:#}", path.display());
            (Schedule::default(), Some(format!("{e:#}")))
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}

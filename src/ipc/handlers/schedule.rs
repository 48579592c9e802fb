use crate::ipc::error::{err, ok, HandlerErr};
use crate::ipc::helpers::{opt_str, required_str};
use crate::ipc::types::{AppState, Request};
use crate::schedule::Schedule;
use log::info;
use serde_json::json;
use std::path::PathBuf;

fn handle_schedule_load(state: &mut AppState, req: &Request) -> serde_json::Value {
    let path = match required_str(req, "path") {
        Ok(p) => PathBuf::from(p),
        Err(e) => return e.response(&req.id),
    };
    let schedule = match Schedule::load(&path) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "schedule_invalid", format!("{e:#}"), None),
    };

    let keep_teacher = state
        .session
        .teacher
        .as_deref()
        .map(|t| schedule.has_teacher(t))
        .unwrap_or(false);
    if !keep_teacher {
        state.session.teacher = schedule.teachers().into_iter().next();
    }
    state.schedule = schedule;
    info!(
        "event=schedule_load status=ok path={} teachers={}",
        path.display(),
        state.schedule.teacher_count()
    );

    ok(
        &req.id,
        json!({
            "teacherCount": state.schedule.teacher_count(),
            "activeTeacher": state.session.teacher,
        }),
    )
}

fn handle_schedule_teachers(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "teachers": state.schedule.teachers(),
            "activeTeacher": state.session.teacher,
        }),
    )
}

fn handle_schedule_select_teacher(state: &mut AppState, req: &Request) -> serde_json::Value {
    let teacher = match required_str(req, "teacher") {
        Ok(t) => t,
        Err(e) => return e.response(&req.id),
    };
    if !state.schedule.has_teacher(&teacher) {
        return err(
            &req.id,
            "not_found",
            format!("unknown teacher: {}", teacher),
            None,
        );
    }
    // Selection is deliberately kept across teacher switches.
    state.session.teacher = Some(teacher);
    ok(&req.id, json!({ "activeTeacher": state.session.teacher }))
}

fn resolve_teacher(state: &AppState, req: &Request) -> Result<String, HandlerErr> {
    let explicit = opt_str(req, "teacher")?.map(|s| s.trim().to_string());
    let teacher = explicit
        .filter(|s| !s.is_empty())
        .or_else(|| state.session.teacher.clone())
        .ok_or_else(|| HandlerErr::new("not_found", "no teacher selected"))?;
    if !state.schedule.has_teacher(&teacher) {
        return Err(HandlerErr::new(
            "not_found",
            format!("unknown teacher: {}", teacher),
        ));
    }
    Ok(teacher)
}

fn handle_schedule_grid(state: &mut AppState, req: &Request) -> serde_json::Value {
    let teacher = match resolve_teacher(state, req) {
        Ok(t) => t,
        Err(e) => return e.response(&req.id),
    };
    let rows = state.schedule.grid(
        &teacher,
        &state.settings,
        &state.session.selection,
        &state.session.store,
    );
    ok(
        &req.id,
        json!({
            "teacher": teacher,
            "days": state.settings.days,
            "periods": state.settings.periods().collect::<Vec<_>>(),
            "rows": rows,
            "selectedCount": state.session.selection.len(),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "schedule.load" => Some(handle_schedule_load(state, req)),
        "schedule.teachers" => Some(handle_schedule_teachers(state, req)),
        "schedule.selectTeacher" => Some(handle_schedule_select_teacher(state, req)),
        "schedule.grid" => Some(handle_schedule_grid(state, req)),
        _ => None,
    }
}

use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::helpers::{opt_str, required_day, required_period};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn toggle(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let day = required_day(req, &state.settings)?;
    let period = required_period(req, &state.settings)?;
    let class_id = opt_str(req, "classId")?;

    let changed = state.session.selection.toggle(
        &day,
        period,
        class_id,
        &state.settings.empty_placeholder,
    );
    let selected = class_id
        .map(|c| state.session.selection.contains(&day, period, c))
        .unwrap_or(false);
    Ok(json!({
        "changed": changed,
        "selected": selected,
        "count": state.session.selection.len(),
    }))
}

fn handle_selection_toggle(state: &mut AppState, req: &Request) -> serde_json::Value {
    match toggle(state, req) {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    }
}

fn handle_selection_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "cells": state.session.selection.cells(),
            "count": state.session.selection.len(),
        }),
    )
}

fn handle_selection_clear(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.session.selection.clear();
    ok(&req.id, json!({ "count": 0 }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "selection.toggle" => Some(handle_selection_toggle(state, req)),
        "selection.list" => Some(handle_selection_list(state, req)),
        "selection.clear" => Some(handle_selection_clear(state, req)),
        _ => None,
    }
}

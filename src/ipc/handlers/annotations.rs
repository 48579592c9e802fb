use crate::annotations::{self, AnnotationPayload};
use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::helpers::{db_conn, required_cell};
use crate::ipc::types::{AppState, Request};
use log::info;
use serde_json::json;

fn parse_payload(req: &Request) -> Result<AnnotationPayload, HandlerErr> {
    AnnotationPayload::from_json(req.params.get("payload")).map_err(HandlerErr::bad_params)
}

fn get(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    db_conn(state)?;
    let cell = required_cell(req, &state.settings)?;
    let cell_annotation = annotations::read_cell(&state.session.store, &cell);
    Ok(json!({
        "cell": cell,
        "title": cell_annotation.title,
        "goals": cell_annotation.goals,
        "homework": cell_annotation.homework,
    }))
}

fn update(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let cell = required_cell(req, &state.settings)?;
    let payload = parse_payload(req)?;

    let next = annotations::apply_edit(&state.session.store, &cell, &payload);
    annotations::save(conn, &next)
        .map_err(|e| HandlerErr::new("db_update_failed", format!("{e:#}")))?;
    state.session.store = next;
    info!(
        "event=annotation_edit status=ok day={} period={} class={}",
        cell.day, cell.period, cell.class_id
    );
    Ok(json!({ "written": annotations::Field::ALL.len(), "cell": cell }))
}

fn apply_bulk(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    if state.session.selection.is_empty() {
        return Err(HandlerErr::new("empty_selection", "no cells selected"));
    }
    let payload = parse_payload(req)?;

    let cells = state.session.selection.cells().to_vec();
    let next = annotations::apply_bulk(&state.session.store, &cells, &payload);
    annotations::save(conn, &next)
        .map_err(|e| HandlerErr::new("db_update_failed", format!("{e:#}")))?;
    state.session.store = next;
    state.session.selection.clear();

    let written = cells.len() * annotations::Field::ALL.len();
    info!(
        "event=annotation_bulk status=ok cells={} keys={}",
        cells.len(),
        written
    );
    Ok(json!({ "written": written, "cells": cells }))
}

fn clear(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let confirmed = req
        .params
        .get("confirm")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    if !confirmed {
        return Err(HandlerErr::new(
            "confirm_required",
            "clearing removes annotations for every teacher; pass confirm=true",
        ));
    }
    let removed = state.session.store.len();
    let empty = annotations::clear(conn)
        .map_err(|e| HandlerErr::new("db_update_failed", format!("{e:#}")))?;
    state.session.store = empty;
    Ok(json!({ "removed": removed }))
}

fn snapshot(state: &AppState) -> Result<serde_json::Value, HandlerErr> {
    db_conn(state)?;
    let text = annotations::pretty_json(&state.session.store)
        .map_err(|e| HandlerErr::new("internal", format!("{e:#}")))?;
    let (cells, unrecognized) = annotations::summarize(&state.session.store);
    Ok(json!({
        "count": state.session.store.len(),
        "cellCount": cells,
        "unrecognizedKeys": unrecognized,
        "entries": state.session.store,
        "json": text,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "annotations.get" => get(state, req),
        "annotations.update" => update(state, req),
        "annotations.applyBulk" => apply_bulk(state, req),
        "annotations.clear" => clear(state, req),
        "annotations.snapshot" => snapshot(state),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}

use crate::config;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::db_conn;
use crate::ipc::types::{AppState, Request};
use log::info;
use serde_json::json;

#[derive(Clone, Copy)]
enum SetupSection {
    Week,
}

impl SetupSection {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "week" => Some(Self::Week),
            _ => None,
        }
    }
}

fn handle_setup_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "week": state.settings.to_json() }))
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state) {
        Ok(c) => c,
        Err(e) => return e.response(&req.id),
    };
    let Some(section_raw) = req.params.get("section").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing section", None);
    };
    let Some(section) = SetupSection::parse(section_raw) else {
        return err(&req.id, "bad_params", "unknown section", None);
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };

    let dropped = match section {
        SetupSection::Week => {
            let mut next = state.settings.clone();
            if let Err(msg) = config::merge_week_patch(&mut next, patch_obj) {
                return err(&req.id, "bad_params", msg, None);
            }
            if let Err(e) = config::save_week_settings(conn, &next) {
                return err(&req.id, "db_update_failed", e.to_string(), None);
            }
            state.settings = next;
            // Cells picked under the old layout may no longer exist or may now read as empty.
            let settings = &state.settings;
            let dropped = state.session.selection.retain(|c| settings.admits(c));
            if dropped > 0 {
                info!("event=settings_update status=ok section=week selection_dropped={dropped}");
            }
            dropped
        }
    };
    ok(
        &req.id,
        json!({
            "week": state.settings.to_json(),
            "droppedFromSelection": dropped,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, req)),
        _ => None,
    }
}

use crate::annotations;
use crate::backup;
use crate::config;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::required_str;
use crate::ipc::types::{AppState, Request};
use log::{info, warn};
use serde_json::json;
use std::path::PathBuf;

fn handle_export_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.clone() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let out_path = match required_str(req, "outPath") {
        Ok(p) => PathBuf::from(p),
        Err(e) => return e.response(&req.id),
    };
    match backup::export_workspace_bundle(&workspace, &out_path) {
        Ok(summary) => {
            info!(
                "event=backup_export status=ok out={} sha256={}",
                out_path.display(),
                summary.db_sha256
            );
            ok(
                &req.id,
                json!({
                    "ok": true,
                    "bundleFormat": summary.bundle_format,
                    "entryCount": summary.entry_count,
                    "dbSha256": summary.db_sha256,
                }),
            )
        }
        Err(e) => err(&req.id, "backup_failed", format!("{e:#}"), None),
    }
}

fn handle_import_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.clone() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let in_path = match required_str(req, "inPath") {
        Ok(p) => PathBuf::from(p),
        Err(e) => return e.response(&req.id),
    };

    // The database file is replaced underneath us; close it first.
    drop(state.db.take());
    let imported = backup::import_workspace_bundle(&in_path, &workspace);

    let conn = match db::open_db(&workspace) {
        Ok(c) => c,
        Err(e) => {
            state.workspace = None;
            return err(&req.id, "db_open_failed", format!("{e:?}"), None);
        }
    };
    let summary = match imported {
        Ok(s) => s,
        Err(e) => {
            warn!("event=backup_import status=failed error={e:#}");
            state.db = Some(conn);
            return err(&req.id, "backup_failed", format!("{e:#}"), None);
        }
    };

    state.settings = config::load_week_settings(&conn);
    state.session.store = annotations::load(&conn);
    state.session.selection.clear();
    state.db = Some(conn);
    info!(
        "event=backup_import status=ok in={} annotations={}",
        in_path.display(),
        state.session.store.len()
    );

    ok(
        &req.id,
        json!({
            "ok": true,
            "bundleFormatDetected": summary.bundle_format_detected,
            "dbSha256": summary.db_sha256,
            "annotationCount": state.session.store.len(),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.exportWorkspaceBundle" => Some(handle_export_bundle(state, req)),
        "backup.importWorkspaceBundle" => Some(handle_import_bundle(state, req)),
        _ => None,
    }
}

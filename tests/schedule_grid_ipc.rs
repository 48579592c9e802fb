use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_planbookd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn planbookd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn error_code(value: &serde_json::Value) -> Option<&str> {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
}

fn write_schedule(workspace: &PathBuf) {
    let schedule = json!({
        "أحمد": {
            "الأحد": { "1": "رابع أ", "2": "—", "3": "رابع ب", "4": "" },
            "الاثنين": { "1": "خامس أ", "2": null }
        },
        "سارة": {
            "الأحد": { "1": "رابع ب" }
        }
    });
    std::fs::write(
        workspace.join("teacher_schedules.json"),
        serde_json::to_string_pretty(&schedule).expect("schedule json"),
    )
    .expect("write schedule");
}

fn cell<'a>(grid: &'a serde_json::Value, day: usize, period: usize) -> &'a serde_json::Value {
    grid.get("rows")
        .and_then(|r| r.get(day))
        .and_then(|r| r.get(period))
        .expect("grid cell")
}

#[test]
fn grid_projects_schedule_selection_and_titles() {
    let workspace = temp_dir("planbook-schedule-grid");
    write_schedule(&workspace);
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let teachers = request_ok(&mut stdin, &mut reader, "2", "schedule.teachers", json!({}));
    assert_eq!(
        teachers.get("teachers").cloned(),
        Some(json!(["أحمد", "سارة"]))
    );
    assert_eq!(
        teachers.get("activeTeacher").and_then(|v| v.as_str()),
        Some("أحمد")
    );

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "annotations.update",
        json!({
            "day": "الأحد",
            "period": 3,
            "classId": "رابع ب",
            "payload": { "title": "الكسور", "goals": "يقارن الكسور" }
        }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "selection.toggle",
        json!({ "day": "الأحد", "period": 1, "classId": "رابع أ" }),
    );

    let grid = request_ok(&mut stdin, &mut reader, "5", "schedule.grid", json!({}));
    let rows = grid.get("rows").and_then(|v| v.as_array()).expect("rows");
    assert_eq!(rows.len(), 5);
    assert!(rows
        .iter()
        .all(|r| r.as_array().map(|c| c.len()) == Some(7)));

    assert_eq!(cell(&grid, 0, 0).get("classId").and_then(|v| v.as_str()), Some("رابع أ"));
    assert_eq!(cell(&grid, 0, 0).get("selected").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(cell(&grid, 0, 1).get("empty").and_then(|v| v.as_bool()), Some(true));
    assert!(cell(&grid, 0, 1).get("classId").map(|v| v.is_null()).unwrap_or(false));
    assert_eq!(cell(&grid, 0, 2).get("title").and_then(|v| v.as_str()), Some("الكسور"));
    assert_eq!(cell(&grid, 0, 3).get("empty").and_then(|v| v.as_bool()), Some(true));
    // Dataset spells Monday "الاثنين"; the grid row uses the canonical name.
    assert_eq!(cell(&grid, 1, 0).get("day").and_then(|v| v.as_str()), Some("الإثنين"));
    assert_eq!(cell(&grid, 1, 0).get("classId").and_then(|v| v.as_str()), Some("خامس أ"));

    let got = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "annotations.get",
        json!({ "day": "الأحد", "period": 3, "classId": "رابع ب" }),
    );
    assert_eq!(got.get("goals").and_then(|v| v.as_str()), Some("يقارن الكسور"));
    assert_eq!(got.get("homework").and_then(|v| v.as_str()), Some(""));

    // Single-cell edits leave the pending selection alone.
    let listed = request_ok(&mut stdin, &mut reader, "7", "selection.list", json!({}));
    assert_eq!(listed.get("count").and_then(|v| v.as_u64()), Some(1));

    // Switching teacher keeps the selection; the same section shows its title.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "schedule.selectTeacher",
        json!({ "teacher": "سارة" }),
    );
    let grid = request_ok(&mut stdin, &mut reader, "9", "schedule.grid", json!({}));
    assert_eq!(grid.get("teacher").and_then(|v| v.as_str()), Some("سارة"));
    assert_eq!(cell(&grid, 0, 0).get("classId").and_then(|v| v.as_str()), Some("رابع ب"));
    assert_eq!(grid.get("selectedCount").and_then(|v| v.as_u64()), Some(1));

    let missing = request(
        &mut stdin,
        &mut reader,
        "10",
        "schedule.selectTeacher",
        json!({ "teacher": "nobody" }),
    );
    assert_eq!(error_code(&missing), Some("not_found"));

    let empty = request(
        &mut stdin,
        &mut reader,
        "11",
        "annotations.get",
        json!({ "day": "الأحد", "period": 2, "classId": "—" }),
    );
    assert_eq!(error_code(&empty), Some("empty_cell"));

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn schedule_load_reports_invalid_files() {
    let workspace = temp_dir("planbook-schedule-load");
    let bad = workspace.join("bad.json");
    std::fs::write(&bad, "{\"t\": []}").expect("write bad schedule");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let raw = request(
        &mut stdin,
        &mut reader,
        "1",
        "schedule.load",
        json!({ "path": bad.to_string_lossy() }),
    );
    assert_eq!(error_code(&raw), Some("schedule_invalid"));

    let no_teacher = request(&mut stdin, &mut reader, "2", "schedule.grid", json!({}));
    assert_eq!(error_code(&no_teacher), Some("not_found"));

    write_schedule(&workspace);
    let loaded = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "schedule.load",
        json!({ "path": workspace.join("teacher_schedules.json").to_string_lossy() }),
    );
    assert_eq!(loaded.get("teacherCount").and_then(|v| v.as_u64()), Some(2));
    assert_eq!(loaded.get("activeTeacher").and_then(|v| v.as_str()), Some("أحمد"));

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn week_settings_shape_the_grid() {
    let workspace = temp_dir("planbook-schedule-setup");
    write_schedule(&workspace);
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let setup = request_ok(&mut stdin, &mut reader, "2", "setup.get", json!({}));
    assert_eq!(setup.pointer("/week/periodsPerDay").and_then(|v| v.as_u64()), Some(7));
    assert_eq!(setup.pointer("/week/emptyPlaceholder").and_then(|v| v.as_str()), Some("—"));

    let bad = request(
        &mut stdin,
        &mut reader,
        "3",
        "setup.update",
        json!({ "section": "week", "patch": { "days": ["a_b"] } }),
    );
    assert_eq!(error_code(&bad), Some("bad_params"));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "setup.update",
        json!({ "section": "week", "patch": { "periodsPerDay": 6 } }),
    );
    let grid = request_ok(&mut stdin, &mut reader, "5", "schedule.grid", json!({}));
    assert_eq!(cell(&grid, 0, 0).get("period").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(
        grid.pointer("/rows/0").and_then(|v| v.as_array()).map(|r| r.len()),
        Some(6)
    );

    let out_of_range = request(
        &mut stdin,
        &mut reader,
        "6",
        "selection.toggle",
        json!({ "day": "الأحد", "period": 7, "classId": "A" }),
    );
    assert_eq!(error_code(&out_of_range), Some("bad_params"));

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn settings_change_prunes_cells_it_invalidates() {
    let workspace = temp_dir("planbook-schedule-prune");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    for (id, period, class_id) in [("2", 7, "X"), ("3", 2, "X"), ("4", 2, "Y")] {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            id,
            "selection.toggle",
            json!({ "day": "الأحد", "period": period, "classId": class_id }),
        );
    }

    let updated = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "setup.update",
        json!({ "section": "week", "patch": { "emptyPlaceholder": "X", "periodsPerDay": 3 } }),
    );
    assert_eq!(updated.get("droppedFromSelection").and_then(|v| v.as_u64()), Some(2));

    let listed = request_ok(&mut stdin, &mut reader, "6", "selection.list", json!({}));
    assert_eq!(listed.get("count").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(listed.pointer("/cells/0/classId").and_then(|v| v.as_str()), Some("Y"));

    let applied = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "annotations.applyBulk",
        json!({ "payload": { "title": "t" } }),
    );
    assert_eq!(applied.get("written").and_then(|v| v.as_u64()), Some(3));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "setup.update",
        json!({ "section": "week", "patch": { "emptyPlaceholder": "Y" } }),
    );
    let now_empty = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "selection.toggle",
        json!({ "day": "الأحد", "period": 2, "classId": "Y" }),
    );
    assert_eq!(now_empty.get("changed").and_then(|v| v.as_bool()), Some(false));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "setup.update",
        json!({ "section": "week", "patch": { "emptyPlaceholder": "—" } }),
    );
    let empty_apply = request(
        &mut stdin,
        &mut reader,
        "11",
        "annotations.applyBulk",
        json!({ "payload": { "title": "t" } }),
    );
    assert_eq!(error_code(&empty_apply), Some("empty_selection"));

    let snapshot = request_ok(&mut stdin, &mut reader, "12", "annotations.snapshot", json!({}));
    assert_eq!(snapshot.get("count").and_then(|v| v.as_u64()), Some(3));

    let _ = std::fs::remove_dir_all(workspace);
}

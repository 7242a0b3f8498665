use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::model::{next_record_id, Teacher};
use crate::store;
use serde_json::json;

const TEACHERS_KEY: &str = "teachers";

fn handle_teachers_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(session) = state.session.as_ref() else {
        return err(&req.id, "auth_required", "log in first", None);
    };

    let teachers: Vec<Teacher> = store::get(conn, TEACHERS_KEY, &session.id, Vec::new());
    let rows: Vec<serde_json::Value> = teachers
        .iter()
        .map(|t| json!({ "id": t.id, "name": t.name }))
        .collect();
    ok(&req.id, json!({ "teachers": rows }))
}

fn handle_teachers_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(session) = state.session.as_ref() else {
        return err(&req.id, "auth_required", "log in first", None);
    };

    let name = match req.params.get("name").and_then(|v| v.as_str()) {
        Some(v) => v.trim().to_string(),
        None => return err(&req.id, "bad_params", "missing name", None),
    };
    if name.is_empty() {
        return err(&req.id, "bad_params", "name must not be empty", None);
    }

    let mut teachers: Vec<Teacher> = store::get(conn, TEACHERS_KEY, &session.id, Vec::new());
    let teacher_id = next_record_id(teachers.iter().map(|t| t.id.as_str()));
    teachers.push(Teacher {
        id: teacher_id.clone(),
        name: name.clone(),
    });
    if let Err(e) = store::set(conn, TEACHERS_KEY, &session.id, &teachers) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }

    ok(&req.id, json!({ "teacherId": teacher_id, "name": name }))
}

fn handle_teachers_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(session) = state.session.as_ref() else {
        return err(&req.id, "auth_required", "log in first", None);
    };

    let teacher_id = match req.params.get("teacherId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing teacherId", None),
    };
    let name = match req.params.get("name").and_then(|v| v.as_str()) {
        Some(v) => v.trim().to_string(),
        None => return err(&req.id, "bad_params", "missing name", None),
    };
    if name.is_empty() {
        return err(&req.id, "bad_params", "name must not be empty", None);
    }

    let mut teachers: Vec<Teacher> = store::get(conn, TEACHERS_KEY, &session.id, Vec::new());
    let Some(teacher) = teachers.iter_mut().find(|t| t.id == teacher_id) else {
        return err(&req.id, "not_found", "teacher not found", None);
    };
    teacher.name = name;
    if let Err(e) = store::set(conn, TEACHERS_KEY, &session.id, &teachers) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }

    ok(&req.id, json!({ "ok": true }))
}

fn handle_teachers_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(session) = state.session.as_ref() else {
        return err(&req.id, "auth_required", "log in first", None);
    };

    let teacher_id = match req.params.get("teacherId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing teacherId", None),
    };

    let mut teachers: Vec<Teacher> = store::get(conn, TEACHERS_KEY, &session.id, Vec::new());
    let before = teachers.len();
    teachers.retain(|t| t.id != teacher_id);
    if teachers.len() == before {
        return err(&req.id, "not_found", "teacher not found", None);
    }
    if let Err(e) = store::set(conn, TEACHERS_KEY, &session.id, &teachers) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }

    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "teachers.list" => Some(handle_teachers_list(state, req)),
        "teachers.create" => Some(handle_teachers_create(state, req)),
        "teachers.update" => Some(handle_teachers_update(state, req)),
        "teachers.delete" => Some(handle_teachers_delete(state, req)),
        _ => None,
    }
}

use super::setup;
use crate::files;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::model::{Session, Student};
use crate::store;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rusqlite::Connection;
use serde_json::{json, Value};

const STUDENTS_KEY: &str = "students";

struct HandlerErr {
    code: &'static str,
    message: String,
    details: Option<serde_json::Value>,
}

impl HandlerErr {
    fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr {
            code: "bad_params",
            message: format!("missing {}", key),
            details: None,
        })
}

fn not_found(message: &str) -> HandlerErr {
    HandlerErr {
        code: "not_found",
        message: message.to_string(),
        details: None,
    }
}

fn load_students(conn: &Connection, session: &Session) -> Vec<Student> {
    store::get(conn, STUDENTS_KEY, &session.id, Vec::new())
}

fn save_students(
    conn: &Connection,
    session: &Session,
    students: &[Student],
) -> Result<(), HandlerErr> {
    store::set(conn, STUDENTS_KEY, &session.id, &students).map_err(|e| HandlerErr {
        code: "db_update_failed",
        message: e.to_string(),
        details: None,
    })
}

fn files_attach(conn: &Connection, session: &Session, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let slot = get_required_str(params, "slot")?;
    if slot != "certificates" && slot != "disabilityIdCard" {
        return Err(HandlerErr {
            code: "bad_params",
            message: "slot must be one of: certificates, disabilityIdCard".to_string(),
            details: None,
        });
    }
    let name = get_required_str(params, "name")?.trim().to_string();
    if name.is_empty() {
        return Err(HandlerErr {
            code: "bad_params",
            message: "name must not be empty".to_string(),
            details: None,
        });
    }

    let data_base64 = params.get("dataBase64").and_then(|v| v.as_str());
    let source_path = params.get("sourcePath").and_then(|v| v.as_str());
    let (bytes, type_source) = match (data_base64, source_path) {
        (Some(b64), None) => {
            let bytes = BASE64.decode(b64).map_err(|e| HandlerErr {
                code: "bad_params",
                message: format!("dataBase64 is not valid base64: {}", e),
                details: None,
            })?;
            (bytes, name.clone())
        }
        (None, Some(path)) => {
            let bytes = std::fs::read(path).map_err(|e| HandlerErr {
                code: "io_failed",
                message: e.to_string(),
                details: Some(json!({ "path": path })),
            })?;
            (bytes, path.to_string())
        }
        _ => {
            return Err(HandlerErr {
                code: "bad_params",
                message: "provide exactly one of dataBase64 or sourcePath".to_string(),
                details: None,
            });
        }
    };
    let media_type = params
        .get("mediaType")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| files::media_type_for_name(&type_source).to_string());

    let data_url = files::encode_data_url(&media_type, &bytes);
    let attachment = files::new_attachment(&name, &media_type, data_url);
    let meta = json!({
        "id": attachment.id,
        "name": attachment.name,
        "type": attachment.media_type,
        "date": attachment.date
    });

    let mut students = load_students(conn, session);
    let Some(student) = students.iter_mut().find(|s| s.id == student_id) else {
        return Err(not_found("student not found"));
    };
    match slot.as_str() {
        "certificates" => {
            let max_files = setup::max_upload_files(conn);
            if student.certificates.len() as i64 >= max_files {
                return Err(HandlerErr {
                    code: "limit_exceeded",
                    message: format!("you can only upload up to {} files", max_files),
                    details: Some(json!({ "maxFiles": max_files })),
                });
            }
            student.certificates.push(attachment);
        }
        _ => {
            // Single slot: a new card replaces the old one.
            student.disability_id_card = Some(attachment);
            student.has_disability_id_card = true;
        }
    }
    let certificate_count = student.certificates.len();
    save_students(conn, session, &students)?;
    Ok(json!({ "file": meta, "certificateCount": certificate_count }))
}

fn files_read(conn: &Connection, session: &Session, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let file_id = get_required_str(params, "fileId")?;
    let students = load_students(conn, session);
    let Some(student) = students.iter().find(|s| s.id == student_id) else {
        return Err(not_found("student not found"));
    };
    let found = student
        .certificates
        .iter()
        .find(|f| f.id == file_id)
        .or_else(|| {
            student
                .disability_id_card
                .as_ref()
                .filter(|f| f.id == file_id)
        });
    let Some(file) = found else {
        return Err(not_found("file not found"));
    };
    Ok(json!({ "file": file }))
}

fn files_remove(conn: &Connection, session: &Session, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let file_id = get_required_str(params, "fileId")?;
    let mut students = load_students(conn, session);
    let Some(student) = students.iter_mut().find(|s| s.id == student_id) else {
        return Err(not_found("student not found"));
    };

    let before = student.certificates.len();
    student.certificates.retain(|f| f.id != file_id);
    let mut removed = student.certificates.len() != before;
    if !removed
        && student
            .disability_id_card
            .as_ref()
            .map_or(false, |f| f.id == file_id)
    {
        student.disability_id_card = None;
        student.has_disability_id_card = false;
        removed = true;
    }
    if !removed {
        return Err(not_found("file not found"));
    }
    save_students(conn, session, &students)?;
    Ok(json!({ "ok": true }))
}

fn handle_files_attach(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(session) = state.session.as_ref() else {
        return err(&req.id, "auth_required", "log in first", None);
    };
    match files_attach(conn, session, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_files_read(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(session) = state.session.as_ref() else {
        return err(&req.id, "auth_required", "log in first", None);
    };
    match files_read(conn, session, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_files_remove(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(session) = state.session.as_ref() else {
        return err(&req.id, "auth_required", "log in first", None);
    };
    match files_remove(conn, session, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "files.attach" => Some(handle_files_attach(state, req)),
        "files.read" => Some(handle_files_read(state, req)),
        "files.remove" => Some(handle_files_remove(state, req)),
        _ => None,
    }
}

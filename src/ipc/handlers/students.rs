use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::model::{
    next_record_id, DisabilityLevel, Gender, GuardianStatus, ResidenceType, SensitiveInfo, Session,
    Student,
};
use crate::seed;
use crate::store;
use chrono::NaiveDate;
use log::info;
use rusqlite::Connection;
use serde_json::{json, Map, Value};

const STUDENTS_KEY: &str = "students";
const REQUIRED_FIELDS: [&str; 5] = ["name", "age", "grade", "disabilityType", "disabilityLevel"];

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

fn not_found_student() -> HandlerErr {
    HandlerErr {
        code: "not_found",
        message: "student not found".to_string(),
        details: None,
    }
}

fn sensitive_forbidden() -> HandlerErr {
    HandlerErr {
        code: "forbidden",
        message: "sensitive details are admin-only".to_string(),
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

fn parse_bool(v: &Value, key: &str) -> Result<bool, String> {
    v.as_bool()
        .ok_or_else(|| format!("{} must be boolean", key))
}

fn parse_i64_range(v: &Value, key: &str, min: i64, max: i64) -> Result<i64, String> {
    let n = v
        .as_i64()
        .ok_or_else(|| format!("{} must be integer", key))?;
    if !(min..=max).contains(&n) {
        return Err(format!("{} must be in {}..={}", key, min, max));
    }
    Ok(n)
}

fn parse_required_text(v: &Value, key: &str) -> Result<String, String> {
    let s = v
        .as_str()
        .ok_or_else(|| format!("{} must be string", key))?
        .trim()
        .to_string();
    if s.is_empty() {
        return Err(format!("{} must not be empty", key));
    }
    Ok(s)
}

fn parse_nullable_text(v: &Value, key: &str) -> Result<Option<String>, String> {
    if v.is_null() {
        return Ok(None);
    }
    let s = v
        .as_str()
        .ok_or_else(|| format!("{} must be string or null", key))?
        .trim();
    if s.is_empty() {
        return Ok(None);
    }
    Ok(Some(s.to_string()))
}

fn parse_date(v: &Value, key: &str) -> Result<Option<String>, String> {
    let Some(s) = parse_nullable_text(v, key)? else {
        return Ok(None);
    };
    if NaiveDate::parse_from_str(&s, "%Y-%m-%d").is_err() {
        return Err(format!("{} must be a YYYY-MM-DD date", key));
    }
    Ok(Some(s))
}

fn apply_sensitive_patch(
    sensitive: &mut SensitiveInfo,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    for (k, v) in patch {
        match k.as_str() {
            "wasAbused" => sensitive.was_abused = parse_bool(v, k)?,
            "isSafeAtHome" => sensitive.is_safe_at_home = parse_bool(v, k)?,
            "isFamilySupportive" => sensitive.is_family_supportive = parse_bool(v, k)?,
            "hasPTSD" => sensitive.has_ptsd = parse_bool(v, k)?,
            "hasSelfHarmHistory" => sensitive.has_self_harm_history = parse_bool(v, k)?,
            _ => return Err(format!("unknown sensitive field: {}", k)),
        }
    }
    Ok(())
}

fn apply_student_patch(student: &mut Student, patch: &Map<String, Value>) -> Result<(), String> {
    for (k, v) in patch {
        match k.as_str() {
            "name" => {
                let s = parse_required_text(v, k)?;
                if s.len() < 2 {
                    return Err("name must be at least 2 characters".to_string());
                }
                student.name = s;
            }
            "age" => student.age = parse_i64_range(v, k, 5, 22)?,
            "grade" => student.grade = parse_required_text(v, k)?,
            "disabilityType" => student.disability_type = parse_required_text(v, k)?,
            "disabilityLevel" => {
                let s = parse_required_text(v, k)?;
                student.disability_level = DisabilityLevel::parse(&s).ok_or_else(|| {
                    "disabilityLevel must be one of: Mild, Moderate, Severe".to_string()
                })?;
            }
            "gender" => {
                student.gender = match parse_nullable_text(v, k)? {
                    None => None,
                    Some(s) => Some(
                        Gender::parse(&s).ok_or_else(|| {
                            "gender must be one of: Male, Female, Other".to_string()
                        })?,
                    ),
                };
            }
            "address" => student.address = parse_nullable_text(v, k)?,
            "residenceType" => {
                student.residence_type = match parse_nullable_text(v, k)? {
                    None => None,
                    Some(s) => Some(ResidenceType::parse(&s).ok_or_else(|| {
                        "residenceType must be one of: Permanent, Temporary".to_string()
                    })?),
                };
            }
            "previousSchool" => student.previous_school = parse_nullable_text(v, k)?,
            "parentGuardianStatus" => {
                student.parent_guardian_status = match parse_nullable_text(v, k)? {
                    None => None,
                    Some(s) => Some(GuardianStatus::parse(&s).ok_or_else(|| {
                        "parentGuardianStatus must be one of: Both Parents, Single Parent, Guardian, Orphan"
                            .to_string()
                    })?),
                };
            }
            "teacherAssigned" => student.teacher_assigned = parse_nullable_text(v, k)?,
            "disabilityPercentage" => {
                student.disability_percentage = if v.is_null() {
                    None
                } else {
                    Some(parse_i64_range(v, k, 0, 100)?)
                };
            }
            "hasDisabilityIdCard" => student.has_disability_id_card = parse_bool(v, k)?,
            "medicalHistory" => student.medical_history = parse_nullable_text(v, k)?,
            "referredHospital" => student.referred_hospital = parse_nullable_text(v, k)?,
            "emergencyContact" => student.emergency_contact = parse_nullable_text(v, k)?,
            "admissionDate" => student.admission_date = parse_date(v, k)?,
            "otherNotes" => student.other_notes = parse_nullable_text(v, k)?,
            "sensitive" => {
                let Some(obj) = v.as_object() else {
                    return Err("sensitive must be an object".to_string());
                };
                apply_sensitive_patch(&mut student.sensitive, obj)?;
            }
            "id" => return Err("id is assigned at creation and cannot be changed".to_string()),
            "certificates" | "disabilityIdCard" => {
                return Err(format!("{} is managed via files.attach", k));
            }
            _ => return Err(format!("unknown student field: {}", k)),
        }
    }
    Ok(())
}

/// Full profile payload. Safeguarding fields are stripped unless the
/// caller is an admin.
fn profile_json(student: &Student, include_sensitive: bool) -> Value {
    let mut value = serde_json::to_value(student).unwrap_or(Value::Null);
    if !include_sensitive {
        if let Some(obj) = value.as_object_mut() {
            obj.remove("sensitive");
        }
    }
    value
}

fn summary_json(student: &Student) -> Value {
    json!({
        "id": student.id,
        "name": student.name,
        "age": student.age,
        "grade": student.grade,
        "disabilityType": student.disability_type,
        "disabilityLevel": student.disability_level.as_str(),
        "certificateCount": student.certificates.len(),
        "hasDisabilityIdCard": student.has_disability_id_card
    })
}

fn students_list(conn: &Connection, session: &Session) -> Result<Value, HandlerErr> {
    let students = load_students(conn, session);
    let rows: Vec<Value> = students.iter().map(summary_json).collect();
    Ok(json!({ "students": rows }))
}

fn students_get(
    conn: &Connection,
    session: &Session,
    params: &Value,
) -> Result<Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let students = load_students(conn, session);
    let Some(student) = students.iter().find(|s| s.id == student_id) else {
        return Err(not_found_student());
    };
    Ok(json!({ "student": profile_json(student, session.is_admin()) }))
}

fn students_create(
    conn: &Connection,
    session: &Session,
    params: &Value,
) -> Result<Value, HandlerErr> {
    let Some(fields) = params.as_object() else {
        return Err(HandlerErr {
            code: "bad_params",
            message: "params must be an object".to_string(),
            details: None,
        });
    };
    for key in REQUIRED_FIELDS {
        if !fields.contains_key(key) {
            return Err(HandlerErr {
                code: "bad_params",
                message: format!("missing {}", key),
                details: None,
            });
        }
    }
    if fields.contains_key("sensitive") && !session.is_admin() {
        return Err(sensitive_forbidden());
    }

    let mut students = load_students(conn, session);
    let id = next_record_id(students.iter().map(|s| s.id.as_str()));
    // The required fields were checked above, so the patch fills in
    // every placeholder core value.
    let mut student = Student::new(
        id,
        String::new(),
        0,
        String::new(),
        String::new(),
        DisabilityLevel::Mild,
    );
    apply_student_patch(&mut student, fields).map_err(|message| HandlerErr {
        code: "bad_params",
        message,
        details: None,
    })?;

    let created = profile_json(&student, session.is_admin());
    info!("created student {} for user {}", student.id, session.id);
    students.push(student);
    save_students(conn, session, &students)?;
    Ok(json!({ "student": created }))
}

fn students_update(
    conn: &Connection,
    session: &Session,
    params: &Value,
) -> Result<Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let Some(patch) = params.get("patch").and_then(|v| v.as_object()) else {
        return Err(HandlerErr {
            code: "bad_params",
            message: "patch must be an object".to_string(),
            details: None,
        });
    };
    if patch.contains_key("sensitive") && !session.is_admin() {
        return Err(sensitive_forbidden());
    }

    let mut students = load_students(conn, session);
    let Some(student) = students.iter_mut().find(|s| s.id == student_id) else {
        return Err(not_found_student());
    };
    apply_student_patch(student, patch).map_err(|message| HandlerErr {
        code: "bad_params",
        message,
        details: None,
    })?;
    let updated = profile_json(student, session.is_admin());
    save_students(conn, session, &students)?;
    Ok(json!({ "student": updated }))
}

fn students_delete(
    conn: &Connection,
    session: &Session,
    params: &Value,
) -> Result<Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let mut students = load_students(conn, session);
    let before = students.len();
    students.retain(|s| s.id != student_id);
    if students.len() == before {
        return Err(not_found_student());
    }
    save_students(conn, session, &students)?;
    Ok(json!({ "ok": true }))
}

fn students_seed_demo(conn: &Connection, session: &Session) -> Result<Value, HandlerErr> {
    if store::has(conn, STUDENTS_KEY, &session.id) {
        return Ok(json!({ "seeded": false, "skipped": true, "count": 0 }));
    }
    let roster = seed::demo_students();
    save_students(conn, session, &roster)?;
    info!("seeded demo roster for user {}", session.id);
    Ok(json!({ "seeded": true, "skipped": false, "count": roster.len() }))
}

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(session) = state.session.as_ref() else {
        return err(&req.id, "auth_required", "log in first", None);
    };
    match students_list(conn, session) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_students_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(session) = state.session.as_ref() else {
        return err(&req.id, "auth_required", "log in first", None);
    };
    match students_get(conn, session, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_students_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(session) = state.session.as_ref() else {
        return err(&req.id, "auth_required", "log in first", None);
    };
    match students_create(conn, session, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_students_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(session) = state.session.as_ref() else {
        return err(&req.id, "auth_required", "log in first", None);
    };
    match students_update(conn, session, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(session) = state.session.as_ref() else {
        return err(&req.id, "auth_required", "log in first", None);
    };
    match students_delete(conn, session, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_students_seed_demo(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(session) = state.session.as_ref() else {
        return err(&req.id, "auth_required", "log in first", None);
    };
    match students_seed_demo(conn, session) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.get" => Some(handle_students_get(state, req)),
        "students.create" => Some(handle_students_create(state, req)),
        "students.update" => Some(handle_students_update(state, req)),
        "students.delete" => Some(handle_students_delete(state, req)),
        "students.seedDemo" => Some(handle_students_seed_demo(state, req)),
        _ => None,
    }
}

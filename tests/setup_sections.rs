mod test_support;

use serde_json::json;
use test_support::{request, request_ok, spawn_sidecar, temp_dir};

#[test]
fn defaults_apply_before_any_update() {
    let workspace = temp_dir("sims-setup-defaults");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    // Setup is reachable without a session; the select screen needs it.
    let setup = request_ok(&mut stdin, &mut reader, "2", "setup.get", json!({}));
    assert_eq!(
        setup.pointer("/uploads/maxFiles").and_then(|v| v.as_i64()),
        Some(5)
    );
    assert_eq!(
        setup
            .pointer("/uploads/acceptedFileTypes")
            .and_then(|v| v.as_str()),
        Some(".pdf,.jpg,.jpeg,.png")
    );
    assert_eq!(
        setup
            .pointer("/security/confirmDeletes")
            .and_then(|v| v.as_bool()),
        Some(true)
    );
    assert_eq!(
        setup
            .pointer("/security/sessionRestore")
            .and_then(|v| v.as_bool()),
        Some(true)
    );
}

#[test]
fn updates_persist_across_restart() {
    let workspace = temp_dir("sims-setup-persist");

    {
        let (mut child, mut stdin, mut reader) = spawn_sidecar();
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "1",
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "2",
            "setup.update",
            json!({ "section": "uploads", "patch": { "maxFiles": 10 } }),
        );
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "3",
            "setup.update",
            json!({ "section": "security", "patch": { "confirmDeletes": false } }),
        );
        drop(stdin);
        let _ = child.wait();
    }

    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let setup = request_ok(&mut stdin, &mut reader, "2", "setup.get", json!({}));
    assert_eq!(
        setup.pointer("/uploads/maxFiles").and_then(|v| v.as_i64()),
        Some(10)
    );
    assert_eq!(
        setup
            .pointer("/security/confirmDeletes")
            .and_then(|v| v.as_bool()),
        Some(false)
    );
    // Untouched fields keep their defaults.
    assert_eq!(
        setup
            .pointer("/uploads/acceptedFileTypes")
            .and_then(|v| v.as_str()),
        Some(".pdf,.jpg,.jpeg,.png")
    );
    assert_eq!(
        setup
            .pointer("/security/sessionRestore")
            .and_then(|v| v.as_bool()),
        Some(true)
    );
}

#[test]
fn invalid_patches_are_rejected() {
    let workspace = temp_dir("sims-setup-invalid");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let cases = [
        ("2", json!({ "section": "uploads", "patch": { "maxFiles": 0 } })),
        ("3", json!({ "section": "uploads", "patch": { "maxFiles": 21 } })),
        (
            "4",
            json!({ "section": "uploads", "patch": { "maxFiles": "many" } }),
        ),
        (
            "5",
            json!({ "section": "uploads", "patch": { "acceptedFileTypes": "" } }),
        ),
        (
            "6",
            json!({ "section": "uploads", "patch": { "chunkSizeKb": 64 } }),
        ),
        (
            "7",
            json!({ "section": "security", "patch": { "sessionRestore": "yes" } }),
        ),
        ("8", json!({ "section": "printers", "patch": {} })),
        ("9", json!({ "section": "uploads" })),
    ];
    for (id, params) in cases {
        let resp = request(&mut stdin, &mut reader, id, "setup.update", params);
        assert_eq!(
            resp.pointer("/error/code").and_then(|v| v.as_str()),
            Some("bad_params"),
            "case {}",
            id
        );
    }

    // Nothing was saved along the way.
    let setup = request_ok(&mut stdin, &mut reader, "10", "setup.get", json!({}));
    assert_eq!(
        setup.pointer("/uploads/maxFiles").and_then(|v| v.as_i64()),
        Some(5)
    );
}

#[test]
fn session_restore_toggle_controls_workspace_select() {
    let workspace = temp_dir("sims-setup-restore-toggle");

    {
        let (mut child, mut stdin, mut reader) = spawn_sidecar();
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "1",
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "2",
            "auth.login",
            json!({ "email": "admin@school.com", "password": "password" }),
        );
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "3",
            "setup.update",
            json!({ "section": "security", "patch": { "sessionRestore": false } }),
        );
        drop(stdin);
        let _ = child.wait();
    }

    {
        let (mut child, mut stdin, mut reader) = spawn_sidecar();
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "1",
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );
        let session = request_ok(&mut stdin, &mut reader, "2", "auth.session", json!({}));
        assert!(session.get("session").map(|v| v.is_null()).unwrap_or(false));

        // Flipping the toggle back does not need a login.
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "3",
            "setup.update",
            json!({ "section": "security", "patch": { "sessionRestore": true } }),
        );
        drop(stdin);
        let _ = child.wait();
    }

    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    // The persisted login was never cleared, so it comes back.
    let session = request_ok(&mut stdin, &mut reader, "2", "auth.session", json!({}));
    assert_eq!(
        session.pointer("/session/email").and_then(|v| v.as_str()),
        Some("admin@school.com")
    );
}

//! Integration tests for the submission workflows: records, documents,
//! feedback, timetables and report downloads

mod common;

use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use common::{body_bytes, course, id_of, publication, spawn_app, TestApp, MAX_UPLOAD};
use iqac_common::models::FeedbackInput;
use iqac_server::error::ApiError;
use serde_json::{json, Value};
use uuid::Uuid;

/// GET returning status, headers and the raw body
async fn fetch(app: &TestApp, uri: &str, token: &str) -> (StatusCode, HeaderMap, Vec<u8>) {
    let request = Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    let status = response.status();
    let headers = response.headers().clone();
    (status, headers, body_bytes(response).await)
}

fn titles(list: &Value) -> Vec<String> {
    let mut titles: Vec<String> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["title"].as_str().unwrap().to_string())
        .collect();
    titles.sort();
    titles
}

// =============================================================================
// Records
// =============================================================================

#[tokio::test]
async fn test_record_review_cycle() {
    let app = spawn_app().await;
    let cse = app.create_department("Computer Science", "CSE").await;
    let (coordinator_id, coordinator) = app.create_coordinator(cse, "hod@college.edu").await;
    let (_, faculty) = app.create_user("faculty", Some(cse), "f@college.edu").await;

    let (status, record) = app
        .post("/api/records/research-publications", &faculty, publication("Graph coloring"))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", record);
    assert_eq!(record["status"], "pending");
    assert_eq!(record["department_id"], cse.to_string());
    assert_eq!(record["details"]["indexing"], "scopus");
    let uri = format!("/api/records/research-publications/{}", id_of(&record));
    let review_uri = format!("{}/review", uri);

    // Rejection must carry remarks
    let (status, _) = app
        .put(&review_uri, &coordinator, json!({ "status": "rejected" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, rejected) = app
        .put(
            &review_uri,
            &coordinator,
            json!({ "status": "rejected", "remarks": "DOI missing" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rejected["status"], "rejected");
    assert_eq!(rejected["remarks"], "DOI missing");
    assert_eq!(rejected["reviewed_by"], coordinator_id.to_string());

    // Editing a rejected record resubmits it
    let mut edited = publication("Graph coloring heuristics");
    edited["details"]["doi"] = json!("10.1109/ACCESS.2024.0001");
    let (status, resubmitted) = app.put(&uri, &faculty, edited.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resubmitted["status"], "pending");
    assert!(resubmitted["remarks"].is_null());
    assert!(resubmitted["reviewed_by"].is_null());

    let (status, approved) = app
        .put(&review_uri, &coordinator, json!({ "status": "approved" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], "approved");
    assert_eq!(approved["reviewer_name"], "Test coordinator");

    let (status, _) = app.put(&uri, &faculty, edited).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(app.delete(&uri, &faculty).await, StatusCode::FORBIDDEN);

    // Coordinators decide once; admins may overrule
    let (status, _) = app
        .put(
            &review_uri,
            &coordinator,
            json!({ "status": "rejected", "remarks": "Second thoughts" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, overruled) = app
        .put(
            &review_uri,
            &app.admin,
            json!({ "status": "rejected", "remarks": "Predatory venue" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(overruled["status"], "rejected");

    let (status, _) = app
        .put(&review_uri, &faculty, json!({ "status": "approved" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assert_eq!(app.delete(&uri, &faculty).await, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_coordinator_cannot_review_own_record() {
    let app = spawn_app().await;
    let cse = app.create_department("Computer Science", "CSE").await;
    let (_, coordinator) = app.create_coordinator(cse, "hod@college.edu").await;

    let (_, record) = app
        .post("/api/records/courses-taught", &coordinator, course("cs201"))
        .await;
    assert_eq!(record["details"]["course_code"], "CS201");

    let (status, _) = app
        .put(
            &format!("/api/records/courses-taught/{}/review", id_of(&record)),
            &coordinator,
            json!({ "status": "approved" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_record_creation_permissions() {
    let app = spawn_app().await;
    let cse = app.create_department("Computer Science", "CSE").await;
    let (_, faculty) = app.create_user("faculty", Some(cse), "f@college.edu").await;
    let (_, student) = app.create_user("student", Some(cse), "s@college.edu").await;
    let (_, sports) = app.create_user("sports", None, "sports@college.edu").await;

    let event = |category: &str| {
        json!({
            "title": "Annual meet",
            "academic_year": "2024-25",
            "start_date": "2025-01-10",
            "end_date": "2025-01-12",
            "details": { "category": category, "venue": "Main ground", "participants_count": 400 }
        })
    };

    let (status, _) = app
        .post("/api/records/institutional-events", &faculty, event("academic"))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post("/api/records/institutional-events", &sports, event("cultural"))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .post("/api/records/institutional-events", &sports, event("sports"))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert!(body["department_id"].is_null());

    let (status, _) = app
        .post("/api/records/research-publications", &sports, publication("Not mine"))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.post("/api/records/courses-taught", &student, course("CS101")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get("/api/records/hackathons", &faculty).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Details are checked against the kind
    let mut bad = publication("Unknown field");
    bad["details"]["citations"] = json!(12);
    let (status, _) = app.post("/api/records/research-publications", &faculty, bad).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut backwards = event("sports");
    backwards["end_date"] = json!("2025-01-01");
    let (status, _) = app
        .post("/api/records/institutional-events", &sports, backwards)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_record_list_scoping() {
    let app = spawn_app().await;
    let cse = app.create_department("Computer Science", "CSE").await;
    let ece = app.create_department("Electronics", "ECE").await;
    let (_, cse_coordinator) = app.create_coordinator(cse, "hod.cse@college.edu").await;
    let (_, ece_coordinator) = app.create_coordinator(ece, "hod.ece@college.edu").await;
    let (f1_id, f1) = app.create_user("faculty", Some(cse), "f1@college.edu").await;
    let (_, f2) = app.create_user("faculty", Some(cse), "f2@college.edu").await;
    let (_, student) = app.create_user("student", Some(cse), "s@college.edu").await;

    app.post("/api/records/courses-taught", &f1, course("CS101")).await;
    app.post("/api/records/courses-taught", &f2, course("CS102")).await;

    // Admin entries are approved straight away
    let mut admin_course = course("CS103");
    admin_course["department_id"] = json!(cse);
    let (status, approved) = app
        .post("/api/records/courses-taught", &app.admin, admin_course)
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(approved["status"], "approved");
    assert_eq!(approved["department_id"], cse.to_string());

    let (_, list) = app.get("/api/records/courses-taught", &f1).await;
    assert_eq!(titles(&list), vec!["CS101 lectures"]);

    let (_, list) = app.get("/api/records/courses-taught", &cse_coordinator).await;
    assert_eq!(list.as_array().unwrap().len(), 3);

    let (_, list) = app
        .get(&format!("/api/records/courses-taught?owner_id={}", f1_id), &cse_coordinator)
        .await;
    assert_eq!(titles(&list), vec!["CS101 lectures"]);

    let (_, list) = app.get("/api/records/courses-taught", &ece_coordinator).await;
    assert!(list.as_array().unwrap().is_empty());

    // Students see their department's approved courses
    let (_, list) = app.get("/api/records/courses-taught", &student).await;
    assert_eq!(titles(&list), vec!["CS103 lectures"]);
    let (status, _) = app
        .get(&format!("/api/records/courses-taught/{}", id_of(&approved)), &student)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, list) = app
        .get("/api/records/courses-taught?status=pending", &app.admin)
        .await;
    assert_eq!(list.as_array().unwrap().len(), 2);

    // A record is only reachable under its own kind
    let (status, _) = app
        .get(&format!("/api/records/research-publications/{}", id_of(&approved)), &app.admin)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_record_file_attachments() {
    let app = spawn_app().await;
    let cse = app.create_department("Computer Science", "CSE").await;
    let (_, faculty) = app.create_user("faculty", Some(cse), "f@college.edu").await;
    let (_, other) = app.create_user("faculty", Some(cse), "f2@college.edu").await;

    let (_, record) = app
        .post("/api/records/research-publications", &faculty, publication("Paper"))
        .await;
    let uri = format!("/api/records/research-publications/{}/files", id_of(&record));

    let (status, updated) = app
        .upload(&uri, &faculty, &[], Some(("certificate.PDF", b"%PDF-1.4 cert")))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", updated);
    let files = updated["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert!(files[0].as_str().unwrap().starts_with("uploads/records/"));
    assert!(files[0].as_str().unwrap().ends_with(".pdf"));

    let (status, _) = app
        .upload(&uri, &faculty, &[], Some(("payload.exe", b"MZ")))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.upload(&uri, &faculty, &[("note", "no file")], None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Not visible to another faculty member at all
    let (status, _) = app
        .upload(&uri, &other, &[], Some(("x.pdf", b"%PDF")))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Documents
// =============================================================================

#[tokio::test]
async fn test_document_upload_review_download() {
    let app = spawn_app().await;
    let cse = app.create_department("Computer Science", "CSE").await;
    let (_, coordinator) = app.create_coordinator(cse, "hod@college.edu").await;
    let (_, faculty) = app.create_user("faculty", Some(cse), "f@college.edu").await;
    let (_, other) = app.create_user("faculty", Some(cse), "f2@college.edu").await;

    let content = b"%PDF-1.4 syllabus for CS201";
    let (status, doc) = app
        .upload(
            "/api/documents",
            &faculty,
            &[("title", "CS201 Syllabus"), ("doc_type", "syllabus")],
            Some(("cs201 syllabus.pdf", content)),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", doc);
    assert_eq!(doc["status"], "pending");
    assert_eq!(doc["size_bytes"], content.len());
    assert_eq!(doc["mime_type"], "application/pdf");
    assert_eq!(doc["sha256"].as_str().unwrap().len(), 64);
    let id = id_of(&doc);

    let (_, list) = app.get("/api/documents", &faculty).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    let (_, list) = app.get("/api/documents", &other).await;
    assert!(list.as_array().unwrap().is_empty());
    let (status, _) = app.get(&format!("/api/documents/{}", id), &other).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, headers, bytes) =
        fetch(&app, &format!("/api/documents/{}/download", id), &coordinator).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, content);
    assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"cs201 syllabus.pdf\""
    );

    let (status, reviewed) = app
        .put(
            &format!("/api/documents/{}/review", id),
            &coordinator,
            json!({ "status": "approved" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reviewed["status"], "approved");

    let (_, list) = app.get("/api/documents?status=approved&doc_type=syllabus", &app.admin).await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    assert_eq!(
        app.delete(&format!("/api/documents/{}", id), &faculty).await,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        app.delete(&format!("/api/documents/{}", id), &app.admin).await,
        StatusCode::NO_CONTENT
    );
    let (status, _, _) = fetch(&app, &format!("/api/documents/{}/download", id), &app.admin).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_document_upload_validation() {
    let app = spawn_app().await;
    let cse = app.create_department("Computer Science", "CSE").await;
    let (_, faculty) = app.create_user("faculty", Some(cse), "f@college.edu").await;

    let (status, body) = app
        .upload(
            "/api/documents",
            &faculty,
            &[("doc_type", "minutes")],
            Some(("minutes.pdf", b"%PDF")),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("title"));

    let (status, _) = app
        .upload(
            "/api/documents",
            &faculty,
            &[("title", "Memo"), ("doc_type", "memo")],
            Some(("memo.pdf", b"%PDF")),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .upload(
            "/api/documents",
            &faculty,
            &[("title", "Minutes"), ("doc_type", "minutes")],
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let oversized = vec![b'a'; MAX_UPLOAD + 1];
    let (status, _) = app
        .upload(
            "/api/documents",
            &faculty,
            &[("title", "Huge"), ("doc_type", "report")],
            Some(("huge.txt", &oversized)),
        )
        .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

    let (_, list) = app.get("/api/documents", &faculty).await;
    assert!(list.as_array().unwrap().is_empty());
}

// =============================================================================
// Stored file cleanup
// =============================================================================

#[tokio::test]
async fn test_deleting_record_or_document_removes_file() {
    let app = spawn_app().await;
    let cse = app.create_department("Computer Science", "CSE").await;
    let (_, faculty) = app.create_user("faculty", Some(cse), "f@college.edu").await;

    let (_, record) = app
        .post("/api/records/research-publications", &faculty, publication("Paper"))
        .await;
    let record_uri = format!("/api/records/research-publications/{}", id_of(&record));
    let (status, updated) = app
        .upload(
            &format!("{}/files", record_uri),
            &faculty,
            &[],
            Some(("proof.pdf", b"%PDF-1.4 proof")),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", updated);
    let record_file = app.stored_file(updated["files"][0].as_str().unwrap());
    assert!(record_file.exists());

    assert_eq!(app.delete(&record_uri, &faculty).await, StatusCode::NO_CONTENT);
    assert!(!record_file.exists());

    let (status, doc) = app
        .upload(
            "/api/documents",
            &faculty,
            &[("title", "Lesson plan"), ("doc_type", "lesson_plan")],
            Some(("plan.docx", b"PK plan")),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", doc);
    let doc_file = app.stored_file(doc["file_path"].as_str().unwrap());
    assert!(doc_file.exists());

    assert_eq!(
        app.delete(&format!("/api/documents/{}", id_of(&doc)), &faculty).await,
        StatusCode::NO_CONTENT
    );
    assert!(!doc_file.exists());
}

#[tokio::test]
async fn test_deleting_user_removes_their_files() {
    let app = spawn_app().await;
    let cse = app.create_department("Computer Science", "CSE").await;
    let (faculty_id, faculty) = app.create_user("faculty", Some(cse), "f@college.edu").await;

    let (_, record) = app
        .post("/api/records/research-publications", &faculty, publication("Paper"))
        .await;
    let (_, updated) = app
        .upload(
            &format!("/api/records/research-publications/{}/files", id_of(&record)),
            &faculty,
            &[],
            Some(("proof.pdf", b"%PDF-1.4 proof")),
        )
        .await;
    let (_, doc) = app
        .upload(
            "/api/documents",
            &faculty,
            &[("title", "Minutes"), ("doc_type", "minutes")],
            Some(("minutes.txt", b"Meeting minutes")),
        )
        .await;

    let files = [
        app.stored_file(updated["files"][0].as_str().unwrap()),
        app.stored_file(doc["file_path"].as_str().unwrap()),
    ];
    assert!(files.iter().all(|f| f.exists()));

    assert_eq!(
        app.delete(&format!("/api/users/{}", faculty_id), &app.admin).await,
        StatusCode::NO_CONTENT
    );
    assert!(files.iter().all(|f| !f.exists()));

    let (_, list) = app.get("/api/documents", &app.admin).await;
    assert!(list.as_array().unwrap().is_empty());
}

// =============================================================================
// Feedback
// =============================================================================

struct FeedbackFixture {
    app: TestApp,
    faculty_id: Uuid,
    faculty: String,
    coordinator: String,
    student: String,
    course_id: Uuid,
}

async fn feedback_fixture() -> FeedbackFixture {
    let app = spawn_app().await;
    let cse = app.create_department("Computer Science", "CSE").await;
    let (_, coordinator) = app.create_coordinator(cse, "hod@college.edu").await;
    let (faculty_id, faculty) = app.create_user("faculty", Some(cse), "f@college.edu").await;
    let (_, student) = app.create_user("student", Some(cse), "s1@college.edu").await;

    let (_, record) = app.post("/api/records/courses-taught", &faculty, course("CS201")).await;
    let course_id = id_of(&record);

    FeedbackFixture {
        app,
        faculty_id,
        faculty,
        coordinator,
        student,
        course_id,
    }
}

#[tokio::test]
async fn test_feedback_submission_rules() {
    let fx = feedback_fixture().await;
    let app = &fx.app;
    let course_feedback = json!({
        "feedback_type": "course",
        "target_record_id": fx.course_id,
        "academic_year": "2024-25",
        "semester": 3,
        "rating": 4,
        "comments": "Well paced",
    });

    // Course still pending review
    let (status, _) = app.post("/api/feedback", &fx.student, course_feedback.clone()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.put(
        &format!("/api/records/courses-taught/{}/review", fx.course_id),
        &fx.coordinator,
        json!({ "status": "approved" }),
    )
    .await;

    let (status, body) = app.post("/api/feedback", &fx.student, course_feedback.clone()).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["rating"], 4);

    let (status, _) = app.post("/api/feedback", &fx.student, course_feedback.clone()).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Another academic year is a separate submission
    let mut next_year = course_feedback.clone();
    next_year["academic_year"] = json!("2025-26");
    let (status, _) = app.post("/api/feedback", &fx.student, next_year).await;
    assert_eq!(status, StatusCode::CREATED);

    let mut too_high = course_feedback.clone();
    too_high["rating"] = json!(6);
    too_high["academic_year"] = json!("2023-24");
    let (status, _) = app.post("/api/feedback", &fx.student, too_high).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.post("/api/feedback", &fx.faculty, course_feedback).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(
            "/api/feedback",
            &fx.student,
            json!({
                "feedback_type": "institution",
                "academic_year": "2024-25",
                "rating": 3,
                "target_user_id": fx.faculty_id,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post(
            "/api/feedback",
            &fx.student,
            json!({ "feedback_type": "institution", "academic_year": "2024-25", "rating": 3 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["target_user_id"].is_null());

    // Only teaching accounts can be rated as faculty
    let (_, me) = app.get("/api/auth/me", &fx.student).await;
    let (status, _) = app
        .post(
            "/api/feedback",
            &fx.student,
            json!({
                "feedback_type": "faculty",
                "target_user_id": id_of(&me),
                "academic_year": "2024-25",
                "rating": 5,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, own) = app.get("/api/feedback", &fx.student).await;
    assert_eq!(own.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_feedback_defaults_to_current_academic_year() {
    let fx = feedback_fixture().await;
    let app = &fx.app;
    iqac_common::db::set_setting(
        &app.state.db,
        iqac_common::db::CURRENT_ACADEMIC_YEAR_KEY,
        "2030-31",
    )
    .await
    .unwrap();

    let (status, body) = app
        .post("/api/feedback", &fx.student, json!({ "feedback_type": "institution", "rating": 5 }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["academic_year"], "2030-31");

    // Same defaulted year twice is a duplicate
    let (status, _) = app
        .post("/api/feedback", &fx.student, json!({ "feedback_type": "institution", "rating": 2 }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_duplicate_feedback_rejected_by_database() {
    let app = spawn_app().await;
    let cse = app.create_department("Computer Science", "CSE").await;
    let (student_id, _) = app.create_user("student", Some(cse), "s@college.edu").await;

    let input: FeedbackInput = serde_json::from_value(json!({
        "feedback_type": "institution",
        "academic_year": "2024-25",
        "rating": 4,
    }))
    .unwrap();

    // Insert directly, skipping the handler's pre-check
    iqac_server::db::feedback::insert(&app.state.db, student_id, &input, Some(cse))
        .await
        .unwrap();
    let err = iqac_server::db::feedback::insert(&app.state.db, student_id, &input, Some(cse))
        .await
        .unwrap_err();
    assert!(iqac_common::db::is_unique_violation(&err));
    assert_eq!(ApiError::from(err).status(), StatusCode::CONFLICT);

    let mut next_year = input.clone();
    next_year.academic_year = "2025-26".to_string();
    assert!(iqac_server::db::feedback::insert(&app.state.db, student_id, &next_year, Some(cse))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_feedback_anonymity() {
    let fx = feedback_fixture().await;
    let app = &fx.app;
    app.put(
        &format!("/api/records/courses-taught/{}/review", fx.course_id),
        &fx.coordinator,
        json!({ "status": "approved" }),
    )
    .await;

    let (status, _) = app
        .post(
            "/api/feedback",
            &fx.student,
            json!({
                "feedback_type": "course",
                "target_record_id": fx.course_id,
                "academic_year": "2024-25",
                "rating": 4,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .post(
            "/api/feedback",
            &fx.student,
            json!({
                "feedback_type": "faculty",
                "target_user_id": fx.faculty_id,
                "academic_year": "2024-25",
                "rating": 5,
                "comments": "Very approachable",
                "is_anonymous": true,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // The teacher sees both entries about them, never who wrote them
    let (_, list) = app.get("/api/feedback", &fx.faculty).await;
    let entries = list.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|f| f["student_id"].is_null()));
    assert!(entries.iter().all(|f| f["student_name"].is_null()));

    // The coordinator sees names on non-anonymous entries only
    let (_, list) = app.get("/api/feedback", &fx.coordinator).await;
    for entry in list.as_array().unwrap() {
        if entry["is_anonymous"] == true {
            assert!(entry["student_name"].is_null());
        } else {
            assert_eq!(entry["student_name"], "Test student");
        }
    }

    let (_, list) = app.get("/api/feedback", &app.admin).await;
    assert!(list
        .as_array()
        .unwrap()
        .iter()
        .all(|f| f["student_name"] == "Test student"));

    let (_, list) = app.get("/api/feedback?feedback_type=faculty", &app.admin).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["target_name"], "Test faculty");

    let (status, summary) = app.get("/api/feedback/summary", &app.admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary[0]["feedback_type"], "course");
    assert_eq!(summary[0]["count"], 1);
    assert_eq!(summary[0]["average_rating"], 4.0);
    assert_eq!(summary[1]["feedback_type"], "faculty");
    assert_eq!(summary[1]["average_rating"], 5.0);
}

// =============================================================================
// Timetables
// =============================================================================

fn slot(day: &str, period: u8, start: &str, end: &str, faculty: Option<Uuid>) -> Value {
    json!({
        "day": day,
        "period": period,
        "start_time": start,
        "end_time": end,
        "subject": "Data Structures",
        "faculty_id": faculty,
        "room": "B-101",
    })
}

fn timetable(department: Uuid, semester: i64, year: &str, slots: Vec<Value>) -> Value {
    json!({
        "department_id": department,
        "semester": semester,
        "academic_year": year,
        "section": "a",
        "slots": slots,
    })
}

#[tokio::test]
async fn test_timetable_upsert_and_clashes() {
    let app = spawn_app().await;
    let cse = app.create_department("Computer Science", "CSE").await;
    let ece = app.create_department("Electronics", "ECE").await;
    let (_, coordinator) = app.create_coordinator(cse, "hod@college.edu").await;
    let (_, ece_coordinator) = app.create_coordinator(ece, "hod.ece@college.edu").await;
    let (faculty_id, faculty) = app.create_user("faculty", Some(cse), "f@college.edu").await;
    let (student_id, student) = app.create_user("student", Some(cse), "s@college.edu").await;

    let first = timetable(
        cse,
        3,
        "2024-25",
        vec![
            slot("wednesday", 1, "09:00", "10:00", Some(faculty_id)),
            slot("monday", 2, "10:00", "11:00", Some(faculty_id)),
            slot("monday", 1, "09:00", "10:00", None),
        ],
    );
    let (status, created) = app.put("/api/timetables", &coordinator, first).await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["section"], "A");
    assert_eq!(created["slots"][0]["start_time"], "09:00");
    assert_eq!(created["slots"][0]["day"], "monday");

    // Same key replaces the grid
    let replacement = timetable(
        cse,
        3,
        "2024-25",
        vec![
            slot("wednesday", 1, "09:00", "10:00", Some(faculty_id)),
            slot("monday", 2, "10:00", "11:00", Some(faculty_id)),
        ],
    );
    let (status, replaced) = app.put("/api/timetables", &coordinator, replacement).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replaced["id"], created["id"]);
    assert_eq!(replaced["slots"].as_array().unwrap().len(), 2);

    let overlapping = timetable(
        cse,
        5,
        "2024-25",
        vec![
            slot("friday", 1, "09:00", "10:00", None),
            slot("friday", 2, "09:30", "10:30", None),
        ],
    );
    let (status, _) = app.put("/api/timetables", &coordinator, overlapping).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Same faculty, overlapping time, another timetable of the same year
    let clash = timetable(
        cse,
        5,
        "2024-25",
        vec![slot("monday", 3, "10:30", "11:30", Some(faculty_id))],
    );
    let (status, body) = app.put("/api/timetables", &coordinator, clash).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains(created["id"].as_str().unwrap()));

    let next_year = timetable(
        cse,
        5,
        "2025-26",
        vec![slot("monday", 3, "10:30", "11:30", Some(faculty_id))],
    );
    let (status, _) = app.put("/api/timetables", &coordinator, next_year).await;
    assert_eq!(status, StatusCode::CREATED);

    let student_slot = timetable(
        cse,
        7,
        "2024-25",
        vec![slot("tuesday", 1, "09:00", "10:00", Some(student_id))],
    );
    let (status, _) = app.put("/api/timetables", &coordinator, student_slot).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let foreign = timetable(cse, 1, "2024-25", Vec::new());
    let (status, _) = app.put("/api/timetables", &ece_coordinator, foreign.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.put("/api/timetables", &faculty, foreign).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Schedule of the faculty member for one year
    let (status, schedule) = app
        .get("/api/timetables/my-schedule?academic_year=2024-25", &faculty)
        .await;
    assert_eq!(status, StatusCode::OK);
    let days: Vec<&str> = schedule
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["day"].as_str().unwrap())
        .collect();
    assert_eq!(days, vec!["monday", "wednesday"]);
    assert_eq!(schedule[0]["department_name"], "Computer Science");
    assert_eq!(schedule[0]["section"], "A");

    let (_, schedule) = app.get("/api/timetables/my-schedule", &faculty).await;
    assert_eq!(schedule.as_array().unwrap().len(), 3);

    let (status, _) = app.get("/api/timetables/my-schedule", &student).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Department members read their own timetables only
    let (_, list) = app.get("/api/timetables", &student).await;
    assert_eq!(list.as_array().unwrap().len(), 2);
    let (_, list) = app.get("/api/timetables", &ece_coordinator).await;
    assert!(list.as_array().unwrap().is_empty());
    let id = id_of(&created);
    let (status, _) = app.get(&format!("/api/timetables/{}", id), &ece_coordinator).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(
        app.delete(&format!("/api/timetables/{}", id), &faculty).await,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        app.delete(&format!("/api/timetables/{}", id), &coordinator).await,
        StatusCode::NO_CONTENT
    );
}

#[tokio::test]
async fn test_timetable_defaults_to_current_academic_year() {
    let app = spawn_app().await;
    let cse = app.create_department("Computer Science", "CSE").await;
    let year = iqac_common::db::current_academic_year(&app.state.db).await.unwrap();

    let mut body = timetable(cse, 1, "", vec![slot("monday", 1, "09:00", "10:00", None)]);
    body.as_object_mut().unwrap().remove("academic_year");
    let (status, created) = app.put("/api/timetables", &app.admin, body).await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["academic_year"], year.as_str());
}

#[tokio::test]
async fn test_concurrent_timetable_deletes() {
    let app = spawn_app().await;
    let cse = app.create_department("Computer Science", "CSE").await;
    let (_, created) = app
        .put(
            "/api/timetables",
            &app.admin,
            timetable(cse, 2, "2024-25", vec![slot("tuesday", 1, "09:00", "10:00", None)]),
        )
        .await;
    let uri = format!("/api/timetables/{}", id_of(&created));

    let (first, second) = tokio::join!(app.delete(&uri, &app.admin), app.delete(&uri, &app.admin));
    let mut statuses = vec![first, second];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::NO_CONTENT, StatusCode::NOT_FOUND]);

    // Only the delete that removed the row is logged
    let (_, page) = app
        .get("/api/activity?action=DELETE&entity_type=timetable", &app.admin)
        .await;
    assert_eq!(page["total_results"], 1);
}

// =============================================================================
// Reports
// =============================================================================

#[tokio::test]
async fn test_report_downloads() {
    let app = spawn_app().await;
    let cse = app.create_department("Computer Science", "CSE").await;
    let (_, coordinator) = app.create_coordinator(cse, "hod@college.edu").await;
    let (_, faculty) = app.create_user("faculty", Some(cse), "f@college.edu").await;
    let (_, student) = app.create_user("student", Some(cse), "s@college.edu").await;

    app.post("/api/records/research-publications", &faculty, publication("Paper one"))
        .await;
    app.upload(
        "/api/documents",
        &faculty,
        &[("title", "Minutes"), ("doc_type", "minutes")],
        Some(("minutes.txt", b"Meeting minutes")),
    )
    .await;

    let (status, headers, bytes) =
        fetch(&app, "/api/reports/records/research-publications", &app.admin).await;
    assert_eq!(status, StatusCode::OK);
    assert!(bytes.starts_with(b"PK"));
    let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.contains("research-publications-report-"));
    assert!(disposition.ends_with(".xlsx\""));

    let (status, headers, bytes) = fetch(
        &app,
        "/api/reports/records/research-publications?format=pdf&status=pending",
        &faculty,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(bytes.starts_with(b"%PDF"));
    assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");

    let (status, _, bytes) = fetch(&app, "/api/reports/documents?format=pdf", &coordinator).await;
    assert_eq!(status, StatusCode::OK);
    assert!(bytes.starts_with(b"%PDF"));

    let (status, _, bytes) = fetch(&app, "/api/reports/feedback", &coordinator).await;
    assert_eq!(status, StatusCode::OK);
    assert!(bytes.starts_with(b"PK"));

    let (status, _, _) = fetch(&app, "/api/reports/records/courses-taught", &student).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _, _) = fetch(&app, "/api/reports/documents", &faculty).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _, _) = fetch(&app, "/api/reports/records/hackathons", &app.admin).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _, _) = fetch(&app, "/api/reports/feedback?format=csv", &app.admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

use crate::models::AppState;
use axum::Router;

pub mod agenda_routes;
pub mod assist_routes;
pub mod availability_routes;
pub mod dashboard_routes;
pub mod document_routes;
pub mod patient_routes;
pub mod treatment_routes;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(dashboard_routes::router())
        .merge(patient_routes::router())
        .merge(agenda_routes::router())
        .merge(treatment_routes::router())
        .merge(availability_routes::router())
        .merge(document_routes::router())
        .merge(assist_routes::router());

    Router::new()
        .route("/health", axum::routing::get(|| async { "ok" }))
        .nest("/api/v1", api)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::auth::hash_access_token;
    use crate::models::{AppointmentStatus, DashboardSettings, TreatmentPlanStatus};
    use crate::services::assist::tests::EchoRewriter;
    use crate::services::documents::tests::FakeCloud;
    use crate::services::fixtures::{document, treatment_plan, Practice};
    use crate::store::memory::MemoryStore;
    use crate::store::SessionIdentity;

    const TOKEN: &str = "test-session-token";

    struct Harness {
        app: Router,
        store: Arc<MemoryStore>,
        patient_id: Uuid,
        patient_user_id: Uuid,
    }

    /// Signed-in dentist with one patient; the in-memory store stays
    /// reachable for seeding and assertions.
    fn harness_with(setup: impl FnOnce(&Practice)) -> Harness {
        let p = Practice::new();
        p.store.add_session(
            &hash_access_token(TOKEN),
            SessionIdentity {
                session_token_id: Uuid::new_v4(),
                user_id: p.dentist_profile.user_id,
            },
        );
        setup(&p);
        let patient_id = p.patient.id;
        let patient_user_id = p.patient.user_id;
        let store = Arc::new(p.store);
        let state = AppState {
            store: store.clone(),
            cloud: Some(Arc::new(FakeCloud::default())),
            rewriter: Some(Arc::new(EchoRewriter::default())),
            settings: DashboardSettings::default(),
        };
        Harness {
            app: router(state),
            store,
            patient_id,
            patient_user_id,
        }
    }

    fn harness() -> Harness {
        harness_with(|_| {})
    }

    fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"));
        match body {
            Some(v) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(v.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    #[tokio::test]
    async fn missing_token_is_session_expired() {
        let h = harness();
        let req = Request::builder().uri("/api/v1/dashboard").body(Body::empty()).unwrap();
        let (status, body) = send(&h.app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "SESSION_EXPIRED");
    }

    #[tokio::test]
    async fn patient_accounts_cannot_open_the_dashboard() {
        let h = harness();
        h.store.add_session(
            &hash_access_token("patient-token"),
            SessionIdentity {
                session_token_id: Uuid::new_v4(),
                user_id: h.patient_user_id,
            },
        );
        let req = Request::builder()
            .uri("/api/v1/dashboard")
            .header(header::AUTHORIZATION, "Bearer patient-token")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&h.app, req).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn dashboard_lists_and_searches() {
        let h = harness_with(|p| {
            p.book(1, AppointmentStatus::Pending);
            p.book(2, AppointmentStatus::Confirmed);
        });
        let (status, body) = send(&h.app, request(Method::GET, "/api/v1/dashboard", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["active"].as_array().unwrap().len(), 2);
        assert_eq!(body["data"]["counts"]["pending"], 1);
        assert_eq!(body["data"]["active"][0]["triage"]["urgency"], "low");

        let (_, body) = send(&h.app, request(Method::GET, "/api/v1/dashboard?search=nobody", None)).await;
        assert!(body["data"]["active"].as_array().unwrap().is_empty());
        assert_eq!(body["data"]["counts"]["confirmed"], 1);
    }

    #[tokio::test]
    async fn accept_then_complete_with_prescriptions() {
        let mut appointment_id = Uuid::nil();
        let h = harness_with(|p| appointment_id = p.book(1, AppointmentStatus::Pending).id);

        let uri = format!("/api/v1/dashboard/appointments/{appointment_id}/accept");
        let (status, body) = send(&h.app, request(Method::POST, &uri, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["notices"][0]["title"], "Appointment Accepted");

        let uri = format!("/api/v1/dashboard/appointments/{appointment_id}/complete");
        let payload = json!({
            "summary": "Extraction of 48",
            "prescriptions": [
                {"medication_name": "Amoxicillin", "dosage": "500mg", "frequency": "Three times daily"},
                {"medication_name": "  ", "dosage": "", "frequency": ""}
            ]
        });
        let (status, body) = send(&h.app, request(Method::POST, &uri, Some(payload))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["prescriptions"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"]["prescriptions"][0]["duration_days"], 7);
        assert_eq!(body["data"]["completed"][0]["id"], appointment_id.to_string());
        assert_eq!(h.store.all_prescriptions().len(), 1);
    }

    #[tokio::test]
    async fn illegal_transition_is_conflict() {
        let mut appointment_id = Uuid::nil();
        let h = harness_with(|p| appointment_id = p.book(1, AppointmentStatus::Pending).id);
        let uri = format!("/api/v1/dashboard/appointments/{appointment_id}/complete");
        let (status, body) = send(&h.app, request(Method::POST, &uri, Some(json!({"summary": "x"})))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "TRANSITION_FAILED");
        assert_eq!(body["error"]["title"], "Update failed");
        assert_eq!(h.store.write_count(), 0);
    }

    #[tokio::test]
    async fn dossier_requires_a_shared_appointment() {
        let h = harness();
        let uri = format!("/api/v1/patients/{}/dossier", h.patient_id);
        let (status, _) = send(&h.app, request(Method::GET, &uri, None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn dossier_reports_degraded_sections() {
        let h = harness_with(|p| {
            p.book(24, AppointmentStatus::Pending);
            p.store.add_treatment_plan(treatment_plan(p.patient.id, p.dentist.id, "Crown", TreatmentPlanStatus::Active));
        });
        h.store.fail("medical_records_for");
        let uri = format!("/api/v1/patients/{}/dossier", h.patient_id);
        let (status, body) = send(&h.app, request(Method::GET, &uri, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["degraded"], json!(["medical_records"]));
        assert_eq!(body["data"]["active_treatment_plans"], 1);
        assert!(body["data"]["next_appointment"].is_object());
    }

    #[tokio::test]
    async fn booked_appointment_shows_on_that_days_agenda() {
        let h = harness_with(|p| {
            p.book(-24, AppointmentStatus::Completed);
        });
        let uri = format!("/api/v1/patients/{}/appointments", h.patient_id);
        let (status, body) = send(
            &h.app,
            request(
                Method::POST,
                &uri,
                Some(json!({"appointment_date": "2031-03-10T10:30:00", "reason": "Filling"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "pending");
        assert_eq!(body["data"]["duration_minutes"], 60);
        assert_eq!(body["data"]["patient_name"], "Joao Pereira");
        let booked = body["data"]["id"].clone();

        let (status, body) = send(&h.app, request(Method::GET, "/api/v1/agenda?date=2031-03-10", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["date"], "2031-03-10");
        let entries = body["data"]["appointments"].as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["id"], booked);
        assert_eq!(entries[0]["documents"], json!([]));

        let (_, body) = send(&h.app, request(Method::GET, "/api/v1/agenda?date=2031-03-11", None)).await;
        assert!(body["data"]["appointments"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn booking_needs_a_shared_patient() {
        let h = harness();
        let uri = format!("/api/v1/patients/{}/appointments", h.patient_id);
        let (status, _) = send(
            &h.app,
            request(Method::POST, &uri, Some(json!({"appointment_date": "2031-03-10T10:30:00"}))),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(h.store.write_count(), 0);
    }

    #[tokio::test]
    async fn time_off_round_trip() {
        let h = harness();
        let (status, _) = send(
            &h.app,
            request(Method::POST, "/api/v1/availability/time_off", Some(json!({"dates": []}))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &h.app,
            request(
                Method::POST,
                "/api/v1/availability/time_off",
                Some(json!({"dates": ["2026-08-03", "2026-08-04", "2026-08-03"]})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["created"], json!(["2026-08-03", "2026-08-04"]));

        let (status, body) = send(&h.app, request(Method::DELETE, "/api/v1/availability/time_off/2026-08-03", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["removed"], 1);

        let (_, body) = send(&h.app, request(Method::GET, "/api/v1/availability/time_off", None)).await;
        assert_eq!(body["data"], json!(["2026-08-04"]));
    }

    #[tokio::test]
    async fn toggle_selection_is_pure() {
        let h = harness();
        let (_, body) = send(
            &h.app,
            request(
                Method::POST,
                "/api/v1/availability/selection/toggle",
                Some(json!({"selected": ["2026-08-03"], "date": "2026-08-03"})),
            ),
        )
        .await;
        assert_eq!(body["data"]["selected"], json!([]));
        assert_eq!(h.store.write_count(), 0);
    }

    #[tokio::test]
    async fn raw_upload_marks_document_synced() {
        let mut document_id = Uuid::nil();
        let h = harness_with(|p| {
            let d = document(p.patient.id, p.dentist.id, "bitewing.png");
            document_id = d.id;
            p.store.add_document(d);
        });
        let req = Request::builder()
            .method(Method::POST)
            .uri(format!("/api/v1/documents/{document_id}/upload"))
            .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
            .header(header::CONTENT_TYPE, "image/png")
            .body(Body::from(vec![1u8, 2, 3]))
            .unwrap();
        let (status, body) = send(&h.app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["sync_status"], "synced");

        let uri = format!("/api/v1/documents?patient_id={}", h.patient_id);
        let (_, body) = send(&h.app, request(Method::GET, &uri, None)).await;
        assert_eq!(body["data"][0]["external_file_id"], "f-123");
    }

    #[tokio::test]
    async fn treatment_steps_over_http() {
        let mut plan_id = Uuid::nil();
        let h = harness_with(|p| {
            let plan = treatment_plan(p.patient.id, p.dentist.id, "Perio", TreatmentPlanStatus::Active);
            plan_id = plan.id;
            p.store.add_treatment_plan(plan);
        });
        let uri = format!("/api/v1/treatment_plans/{plan_id}/steps");
        let (status, _) = send(&h.app, request(Method::POST, &uri, Some(json!({"title": " "})))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = send(&h.app, request(Method::POST, &uri, Some(json!({"title": "Deep cleaning"})))).await;
        let step_id = body["data"][0]["id"].as_str().unwrap().to_string();
        let toggle = format!("/api/v1/treatment_plans/{plan_id}/steps/{step_id}/toggle");
        let (_, body) = send(&h.app, request(Method::POST, &toggle, None)).await;
        assert_eq!(body["data"][0]["completed"], true);
    }

    #[tokio::test]
    async fn rewrite_validates_before_calling_out() {
        let h = harness();
        let (status, body) = send(
            &h.app,
            request(Method::POST, "/api/v1/assist/rewrite", Some(json!({"currentText": "", "prompt": "tidy"}))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["title"], "Missing information");

        let (status, body) = send(
            &h.app,
            request(
                Method::POST,
                "/api/v1/assist/rewrite",
                Some(json!({"currentText": "pt ok", "prompt": "formal", "context": "record"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["rewrittenText"], "pt ok (formal)");
    }
}

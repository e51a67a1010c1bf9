use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware as axum_mw;
use axum::routing::{get, patch, post};
use tower_http::cors::{Any, CorsLayer};

use crate::middleware;
use crate::routes;
use crate::state::AppState;

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route(
            "/reports",
            get(routes::reports::list_reports).post(routes::reports::upload_report),
        )
        .route(
            "/reports/{id}",
            get(routes::reports::get_report).delete(routes::reports::delete_report),
        )
        .route("/reports/{id}/logs", get(routes::reports::list_logs))
        .route(
            "/reports/{id}/health-score",
            get(routes::reports::get_health_score),
        )
        .route(
            "/findings/{id}",
            patch(routes::findings::update_finding).delete(routes::findings::delete_finding),
        )
        .route("/stats", get(routes::stats::get_stats))
        .route(
            "/preferences",
            get(routes::preferences::get_preferences).put(routes::preferences::put_preferences),
        )
        .route_layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::auth::require_api_auth,
        ));

    let protected_pages = Router::new()
        .route(
            "/analyze",
            get(routes::pages::analyze_form).post(routes::pages::analyze_submit),
        )
        .route("/analyze/{*rest}", get(routes::pages::analyze_subpage))
        .route("/reports", get(routes::pages::reports_page))
        .route("/reports/{id}", get(routes::pages::report_page))
        .route_layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::auth::require_page_auth,
        ));

    Router::new()
        // Public (no auth)
        .route("/health", get(routes::health::health_check))
        .route("/", get(routes::pages::landing))
        .route("/signin", get(routes::pages::signin_page))
        .route("/auth/signin", get(routes::auth::signin))
        .route("/auth/callback", get(routes::auth::callback))
        .route("/auth/signout", post(routes::auth::signout))
        .merge(protected_pages)
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(
            state.max_upload_bytes + MULTIPART_OVERHEAD,
        ))
        .layer(axum_mw::from_fn(middleware::audit::audit_log))
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{SystemTime, UNIX_EPOCH};

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use uuid::Uuid;

    use medreports_ai::error::AiError;
    use medreports_ai::explain::Explainer;
    use medreports_ai::ocr::{ReportImage, TextExtractor};
    use medreports_auth::client::GoTrueClient;
    use medreports_auth::jsonwebtoken::{EncodingKey, Header, encode};
    use medreports_auth::jwt::{SupabaseClaims, decoding_key};
    use medreports_core::models::report::AnalysisStatus;
    use medreports_core::tables;
    use medreports_render::render::Renderer;
    use medreports_storage::memory::MemoryStore;
    use medreports_storage::store::Page;

    use super::build_router;
    use crate::state::{AppState, AuthSettings};

    const SECRET: &str = "test-jwt-secret-with-enough-length-for-hs256";
    const STRUCTURED: &str = r#"[{"name":"Glucose (blood sugar)","value":"95 mg/dL","status":"NORMAL","explanation":"Healthy level."},{"name":"LDL cholesterol","value":"160 mg/dL","status":"ABNORMAL","explanation":"Higher than ideal."}]
You are in good health."#;
    const LABELLED: &str = "**TEST_NAME:** Hemoglobin A1c (long-term blood sugar)\n**VALUE:** 6.1%\n**STATUS:** concerning\n**EXPLANATION:** Slightly elevated.\n---";

    /// Replies with fixed text or a fixed remote error.
    struct Stub(Result<String, String>);

    impl Stub {
        fn reply(&self) -> Result<String, AiError> {
            self.0.clone().map_err(|message| AiError::Remote {
                status: 429,
                message,
            })
        }
    }

    #[async_trait]
    impl TextExtractor for Stub {
        async fn extract_text(&self, _image: &ReportImage) -> Result<String, AiError> {
            self.reply()
        }
    }

    #[async_trait]
    impl Explainer for Stub {
        async fn explain(&self, _text: &str) -> Result<String, AiError> {
            self.reply()
        }
    }

    fn state_with(store: MemoryStore, ocr: Result<&str, &str>, explain: Result<&str, &str>) -> AppState {
        AppState {
            store: Arc::new(store),
            extractor: Arc::new(Stub(ocr.map(str::to_string).map_err(str::to_string))),
            explainer: Arc::new(Stub(explain.map(str::to_string).map_err(str::to_string))),
            renderer: Arc::new(Renderer::new().unwrap()),
            auth: Arc::new(AuthSettings {
                decoding_key: decoding_key(SECRET),
                gotrue: None,
                secure_cookies: false,
            }),
            public_url: None,
            max_upload_bytes: 1024 * 1024,
        }
    }

    fn test_state() -> AppState {
        state_with(MemoryStore::new(), Ok("Glucose 95 mg/dL"), Ok(STRUCTURED))
    }

    fn token_for(user_id: Uuid) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let claims = SupabaseClaims {
            sub: user_id.to_string(),
            aud: "authenticated".to_string(),
            exp: now + 3600,
            iat: Some(now),
            email: Some("pat@example.com".to_string()),
            role: Some("authenticated".to_string()),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn make_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    fn upload_request(uri: &str, token: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
        let boundary = "medreports-test-boundary";
        let mut body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"cbc.png\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn health_needs_no_auth() {
        let app = build_router(test_state());
        let response = app.oneshot(make_request("GET", "/health", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn api_requires_a_session() {
        let app = build_router(test_state());
        let response = app
            .oneshot(make_request("GET", "/api/reports", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn api_rejects_forged_token() {
        let app = build_router(test_state());
        let response = app
            .oneshot(make_request("GET", "/api/reports", Some("not.a.jwt")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn protected_page_redirects_to_signin() {
        let app = build_router(test_state());
        let response = app
            .oneshot(make_request("GET", "/analyze", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            "/signin?redirectTo=%2Fanalyze"
        );
    }

    #[tokio::test]
    async fn upload_runs_pipeline_and_persists() {
        let state = test_state();
        let user = Uuid::new_v4();
        let token = token_for(user);

        let response = build_router(state.clone())
            .oneshot(upload_request("/api/reports", &token, "image/png", b"png-bytes"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let outcome = body_json(response).await;
        assert_eq!(outcome["analysis"]["summary"], "You are in good health.");
        assert_eq!(outcome["analysis"]["findings"][0]["name"], "Glucose (blood sugar)");
        assert!(outcome["persist_error"].is_null());

        let report_id: Uuid = outcome["report_id"].as_str().unwrap().parse().unwrap();
        let report = state.store.get_report(user, report_id).await.unwrap();
        assert_eq!(report.analysis_status, AnalysisStatus::Completed);
        assert_eq!(report.patient_info.as_deref(), Some("You are in good health."));
        assert_eq!(report.original_text.as_deref(), Some("Glucose 95 mg/dL"));
        assert_eq!(report.file_type, "image/png");
        assert_eq!((report.total_tests, report.abnormal_tests), (2, 1));

        let steps: Vec<String> = state
            .store
            .list_processing_logs(report_id)
            .await
            .unwrap()
            .into_iter()
            .map(|l| format!("{}:{}", l.step, l.status))
            .collect();
        assert_eq!(
            steps,
            [
                "ocr:succeeded",
                "explanation:succeeded",
                "normalization:succeeded",
                "persistence:succeeded"
            ]
        );

        let response = build_router(state)
            .oneshot(make_request(
                "GET",
                &format!("/api/reports/{report_id}/health-score"),
                Some(&token),
            ))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["health_score"], 50);
    }

    #[tokio::test]
    async fn extraction_failure_persists_nothing() {
        let state = state_with(MemoryStore::new(), Err("quota exceeded"), Ok(STRUCTURED));
        let user = Uuid::new_v4();

        let response = build_router(state.clone())
            .oneshot(upload_request("/api/reports", &token_for(user), "image/jpeg", b"jpg"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_json(response).await["error"], "API Error: quota exceeded");
        assert!(
            state
                .store
                .list_reports(user, Page::default())
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn explanation_failure_marks_report_failed() {
        let state = state_with(MemoryStore::new(), Ok("text"), Err("model overloaded"));
        let user = Uuid::new_v4();

        let response = build_router(state.clone())
            .oneshot(upload_request("/api/reports", &token_for(user), "image/png", b"png"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            body_json(response).await["error"],
            "Failed to process text with Google AI"
        );

        let reports = state.store.list_reports(user, Page::default()).await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].analysis_status, AnalysisStatus::Failed);
    }

    #[tokio::test]
    async fn report_creation_failure_is_reported() {
        let state = state_with(
            MemoryStore::with_failing_table(tables::MEDICAL_REPORTS),
            Ok("text"),
            Ok(STRUCTURED),
        );
        let response = build_router(state)
            .oneshot(upload_request("/api/reports", &token_for(Uuid::new_v4()), "image/png", b"png"))
            .await
            .unwrap();
        assert_eq!(
            body_json(response).await["error"],
            "Failed to save report to database"
        );
    }

    #[tokio::test]
    async fn findings_write_failure_keeps_the_analysis() {
        let state = state_with(
            MemoryStore::with_failing_table(tables::TEST_RESULTS),
            Ok("text"),
            Ok(STRUCTURED),
        );
        let response = build_router(state)
            .oneshot(upload_request("/api/reports", &token_for(Uuid::new_v4()), "image/png", b"png"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let outcome = body_json(response).await;
        assert_eq!(outcome["analysis"]["findings"].as_array().unwrap().len(), 2);
        assert_eq!(
            outcome["persist_error"],
            "Failed to save analysis results to database"
        );
    }

    #[tokio::test]
    async fn plain_text_response_is_stored_as_summary() {
        let state = state_with(
            MemoryStore::new(),
            Ok("text"),
            Ok("Your report looks generally fine with ## no major concerns ** noted."),
        );
        let user = Uuid::new_v4();
        let response = build_router(state.clone())
            .oneshot(upload_request("/api/reports", &token_for(user), "image/png", b"png"))
            .await
            .unwrap();
        let outcome = body_json(response).await;
        let report_id: Uuid = outcome["report_id"].as_str().unwrap().parse().unwrap();

        let report = state.store.get_report(user, report_id).await.unwrap();
        assert_eq!(report.analysis_status, AnalysisStatus::Completed);
        assert_eq!(
            report.patient_info.as_deref(),
            Some("Your report looks generally fine with  no major concerns  noted.")
        );
        assert_eq!(report.total_tests, 0);
    }

    #[tokio::test]
    async fn non_image_upload_is_rejected() {
        let app = build_router(test_state());
        let response = app
            .oneshot(upload_request(
                "/api/reports",
                &token_for(Uuid::new_v4()),
                "application/pdf",
                b"%PDF",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let mut state = test_state();
        state.max_upload_bytes = 1024;
        let response = build_router(state)
            .oneshot(upload_request(
                "/api/reports",
                &token_for(Uuid::new_v4()),
                "image/png",
                &[0u8; 2048],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn reports_of_other_users_are_not_found() {
        let state = test_state();
        let owner = Uuid::new_v4();
        let response = build_router(state.clone())
            .oneshot(upload_request("/api/reports", &token_for(owner), "image/png", b"png"))
            .await
            .unwrap();
        let report_id = body_json(response).await["report_id"]
            .as_str()
            .unwrap()
            .to_string();

        let intruder = token_for(Uuid::new_v4());
        for (method, uri) in [
            ("GET", format!("/api/reports/{report_id}")),
            ("GET", format!("/api/reports/{report_id}/logs")),
            ("DELETE", format!("/api/reports/{report_id}")),
        ] {
            let response = build_router(state.clone())
                .oneshot(make_request(method, &uri, Some(&intruder)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{method} {uri}");
        }

        let response = build_router(state)
            .oneshot(make_request(
                "DELETE",
                &format!("/api/reports/{report_id}"),
                Some(&token_for(owner)),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn finding_edits_retally_report_counts() {
        let state = test_state();
        let user = Uuid::new_v4();
        let token = token_for(user);
        let response = build_router(state.clone())
            .oneshot(upload_request("/api/reports", &token, "image/png", b"png"))
            .await
            .unwrap();
        let report_id: Uuid = body_json(response).await["report_id"]
            .as_str()
            .unwrap()
            .parse()
            .unwrap();
        let findings = state.store.list_findings(report_id).await.unwrap();
        let ldl = &findings[1];

        let patch = |status: &str| {
            Request::builder()
                .method("PATCH")
                .uri(format!("/api/findings/{}", ldl.id))
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(format!(r#"{{"status":"{status}"}}"#)))
                .unwrap()
        };

        let response = build_router(state.clone())
            .oneshot(patch("high"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = build_router(state.clone())
            .oneshot(patch("NORMAL"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "NORMAL");

        let report = state.store.get_report(user, report_id).await.unwrap();
        assert_eq!((report.normal_tests, report.abnormal_tests), (2, 0));
    }

    #[tokio::test]
    async fn preferences_are_created_on_first_write() {
        let state = test_state();
        let token = token_for(Uuid::new_v4());

        let response = build_router(state.clone())
            .oneshot(make_request("GET", "/api/preferences", Some(&token)))
            .await
            .unwrap();
        let prefs = body_json(response).await;
        assert_eq!(prefs["saved"], false);
        assert_eq!(prefs["analysis_history_retention_days"], 365);

        for days in [30, 90] {
            let request = Request::builder()
                .method("PUT")
                .uri("/api/preferences")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(format!(
                    r#"{{"analysis_history_retention_days":{days}}}"#
                )))
                .unwrap();
            let response = build_router(state.clone()).oneshot(request).await.unwrap();
            let prefs = body_json(response).await;
            assert_eq!(prefs["saved"], true);
            assert_eq!(prefs["analysis_history_retention_days"], days);
            assert_eq!(prefs["email_notifications"], true);
        }
    }

    #[tokio::test]
    async fn stats_summarize_the_users_reports() {
        let state = test_state();
        let token = token_for(Uuid::new_v4());
        build_router(state.clone())
            .oneshot(upload_request("/api/reports", &token, "image/png", b"png"))
            .await
            .unwrap();

        let response = build_router(state)
            .oneshot(make_request("GET", "/api/stats", Some(&token)))
            .await
            .unwrap();
        let stats = body_json(response).await;
        assert_eq!(stats["total_reports"], 1);
        assert_eq!(stats["completed_reports"], 1);
        assert_eq!(stats["average_health_score"], 50);
    }

    #[tokio::test]
    async fn analyze_page_renders_results_from_cookie_session() {
        let token = token_for(Uuid::new_v4());
        let boundary = "b";
        let mut body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"cbc.png\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(b"png");
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri("/analyze")
            .header(header::COOKIE, format!("sb-access-token={token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();
        let response = build_router(test_state()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let html = body_text(response).await;
        assert!(html.contains("Glucose (blood sugar)"));
        assert!(html.contains("status abnormal"));
        assert!(html.contains("You are in good health."));
        assert!(html.contains("Important Medical Disclaimer"));
    }

    #[tokio::test]
    async fn analyze_page_shows_pipeline_errors_inline() {
        let state = state_with(MemoryStore::new(), Ok("text"), Err("down"));
        let token = token_for(Uuid::new_v4());
        let mut request = upload_request("/analyze", &token, "image/png", b"png");
        request.headers_mut().remove(header::AUTHORIZATION);
        request.headers_mut().insert(
            header::COOKIE,
            format!("sb-access-token={token}").parse().unwrap(),
        );

        let response = build_router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Failed to process text with Google AI"));
    }

    #[tokio::test]
    async fn signin_page_forwards_signed_in_users() {
        let token = token_for(Uuid::new_v4());
        let response = build_router(test_state())
            .oneshot(make_request("GET", "/signin?redirectTo=/reports", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/reports");

        let response = build_router(test_state())
            .oneshot(make_request("GET", "/signin?redirectTo=/reports", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn callback_redirects_to_sanitized_target() {
        let request = Request::builder()
            .uri("/auth/callback?redirectTo=//evil.example")
            .header(header::HOST, "app.test")
            .body(Body::empty())
            .unwrap();
        let response = build_router(test_state()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "http://app.test/");

        let mut state = test_state();
        state.public_url = Some("https://reports.example".to_string());
        let response = build_router(state)
            .oneshot(make_request("GET", "/auth/callback?redirectTo=/analyze", None))
            .await
            .unwrap();
        assert_eq!(
            response.headers()[header::LOCATION],
            "https://reports.example/analyze"
        );
    }

    #[tokio::test]
    async fn signout_clears_the_session_cookie() {
        let response = build_router(test_state())
            .oneshot(make_request("POST", "/auth/signout", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("sb-access-token=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn report_page_for_unknown_id_is_404() {
        let token = token_for(Uuid::new_v4());
        let response = build_router(test_state())
            .oneshot(make_request(
                "GET",
                &format!("/reports/{}", Uuid::new_v4()),
                Some(&token),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_text(response).await.contains("Report not found"));
    }

    #[tokio::test]
    async fn labelled_blocks_get_the_default_summary() {
        let state = state_with(MemoryStore::new(), Ok("HbA1c 6.1%"), Ok(LABELLED));
        let user = Uuid::new_v4();

        let response = build_router(state.clone())
            .oneshot(upload_request("/api/reports", &token_for(user), "image/png", b"png"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let outcome = body_json(response).await;
        assert_eq!(outcome["analysis"]["summary"], "");
        assert_eq!(outcome["analysis"]["findings"][0]["status"], "CONCERNING");
        assert!(outcome["persist_error"].is_null());

        let report_id: Uuid = outcome["report_id"].as_str().unwrap().parse().unwrap();
        let report = state.store.get_report(user, report_id).await.unwrap();
        assert_eq!(report.analysis_status, AnalysisStatus::Completed);
        assert_eq!(
            report.patient_info.as_deref(),
            Some("No patient summary available")
        );
        assert_eq!((report.total_tests, report.concerning_tests), (1, 1));

        let findings = state.store.list_findings(report_id).await.unwrap();
        assert_eq!(findings[0].test_name, "Hemoglobin A1c (long-term blood sugar)");
        assert_eq!(findings[0].test_value, "6.1%");
    }

    #[tokio::test]
    async fn pages_below_analyze_are_guarded() {
        let response = build_router(test_state())
            .oneshot(make_request("GET", "/analyze/history", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            "/signin?redirectTo=%2Fanalyze%2Fhistory"
        );

        let token = token_for(Uuid::new_v4());
        let response = build_router(test_state())
            .oneshot(make_request("GET", "/analyze/history", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_text(response).await.contains("Page not found"));
    }

    #[tokio::test]
    async fn signin_round_trip_keeps_the_target_query() {
        let mut state = test_state();
        state.public_url = Some("https://app.example".to_string());
        state.auth = Arc::new(AuthSettings {
            decoding_key: decoding_key(SECRET),
            gotrue: Some(GoTrueClient::new(
                reqwest::Client::new(),
                "https://project.supabase.co",
                "anon-key",
            )),
            secure_cookies: true,
        });

        let response = build_router(state.clone())
            .oneshot(make_request(
                "GET",
                "/auth/signin?redirectTo=%2Freports%3Flimit%3D5%26offset%3D10",
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let authorize =
            reqwest::Url::parse(response.headers()[header::LOCATION].to_str().unwrap()).unwrap();
        assert_eq!(authorize.path(), "/auth/v1/authorize");

        let callback = authorize
            .query_pairs()
            .find(|(key, _)| key == "redirect_to")
            .map(|(_, value)| value.into_owned())
            .unwrap();
        let callback = reqwest::Url::parse(&callback).unwrap();
        assert_eq!(callback.path(), "/auth/callback");
        let params: Vec<String> = callback
            .query_pairs()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        assert_eq!(params, ["redirectTo=/reports?limit=5&offset=10"]);

        let uri = format!("{}?{}", callback.path(), callback.query().unwrap());
        let response = build_router(state)
            .oneshot(make_request("GET", &uri, None))
            .await
            .unwrap();
        assert_eq!(
            response.headers()[header::LOCATION],
            "https://app.example/reports?limit=5&offset=10"
        );
    }
}

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Extension;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use medreports_auth::session::sanitize_redirect;
use medreports_render::render::Page;
use medreports_render::views::{
    AnalysisView, AnalyzePage, ErrorPage, LandingPage, ReportPage, ReportsPage, SignInPage,
};
use medreports_storage::error::StorageError;
use medreports_storage::store::user_report_stats;

use crate::error::ApiError;
use crate::middleware::auth::{AuthUser, optional_user};
use crate::pipeline::run_analysis;
use crate::routes::reports::ListQuery;
use crate::state::AppState;
use crate::upload::read_report_image;

fn render<T: Serialize>(state: &AppState, page: Page, view: &T) -> Result<Html<String>, ApiError> {
    Ok(Html(state.renderer.render(page, view)?))
}

pub async fn landing(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Html<String>, ApiError> {
    let user = optional_user(&state, &headers);
    render(
        &state,
        Page::Landing,
        &LandingPage {
            user_email: user.and_then(|u| u.email),
        },
    )
}

#[derive(Debug, Deserialize)]
pub struct SignInPageQuery {
    #[serde(rename = "redirectTo")]
    pub redirect_to: Option<String>,
    pub error: Option<String>,
}

/// Sign-in page. Already signed-in users go straight to `redirectTo`.
pub async fn signin_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SignInPageQuery>,
) -> Result<Response, ApiError> {
    let redirect_to = sanitize_redirect(query.redirect_to.as_deref());
    if optional_user(&state, &headers).is_some() {
        return Ok(Redirect::to(&redirect_to).into_response());
    }

    let page = SignInPage {
        user_email: None,
        redirect_to,
        error: query.error,
    };
    Ok(render(&state, Page::SignIn, &page)?.into_response())
}

pub async fn analyze_form(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Html<String>, ApiError> {
    let page = AnalyzePage::new(user.email, state.max_upload_bytes as u64);
    render(&state, Page::Analyze, &page)
}

/// Run the pipeline on an uploaded image and render the outcome. Failures
/// are shown on the page rather than as an error response.
pub async fn analyze_submit(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<Html<String>, ApiError> {
    let page = AnalyzePage::new(user.email.clone(), state.max_upload_bytes as u64);

    let page = match read_report_image(multipart, state.max_upload_bytes).await {
        Err(e) => page.with_error(e.to_string()),
        Ok(image) => {
            let file_name = image.file_name.clone();
            match run_analysis(&state, user.user_id, image).await {
                Ok(outcome) => {
                    let view = AnalysisView::new(
                        &file_name,
                        Some(outcome.report_id),
                        &outcome.raw_response,
                        &outcome.analysis,
                    );
                    let page = page.with_result(view);
                    match outcome.persist_error {
                        Some(e) => page.with_error(e),
                        None => page,
                    }
                }
                Err(e) => page.with_error(e.to_string()),
            }
        }
    };

    render(&state, Page::Analyze, &page)
}

/// Anything below `/analyze` other than the form itself.
pub async fn analyze_subpage(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Response, ApiError> {
    let page = ErrorPage {
        user_email: user.email,
        title: "Page not found".to_string(),
        message: "There is nothing at this address.".to_string(),
    };
    Ok((StatusCode::NOT_FOUND, render(&state, Page::Error, &page)?).into_response())
}

pub async fn reports_page(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ListQuery>,
) -> Result<Html<String>, ApiError> {
    let page = query.page();
    let stats = user_report_stats(state.store.as_ref(), user.user_id).await?;
    let reports = state.store.list_reports(user.user_id, page).await?;
    let view = ReportsPage::new(user.email, &stats, &reports, page.limit, page.offset);
    render(&state, Page::Reports, &view)
}

pub async fn report_page(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let report = match state.store.get_report(user.user_id, id).await {
        Ok(report) => report,
        Err(StorageError::NotFound { .. }) => {
            let page = ErrorPage {
                user_email: user.email,
                title: "Report not found".to_string(),
                message: "This report does not exist or belongs to another account."
                    .to_string(),
            };
            return Ok((StatusCode::NOT_FOUND, render(&state, Page::Error, &page)?).into_response());
        }
        Err(e) => return Err(e.into()),
    };
    let findings = state.store.list_findings(id).await?;
    let view = ReportPage::new(user.email, &report, &findings);
    Ok(render(&state, Page::Report, &view)?.into_response())
}

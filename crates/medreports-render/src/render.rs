use serde::Serialize;
use tera::{Context, Tera};

use crate::error::RenderError;

/// A server-rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Landing,
    SignIn,
    Analyze,
    Reports,
    Report,
    Error,
}

impl Page {
    pub fn template_name(self) -> &'static str {
        match self {
            Page::Landing => "index.html",
            Page::SignIn => "signin.html",
            Page::Analyze => "analyze.html",
            Page::Reports => "reports.html",
            Page::Report => "report.html",
            Page::Error => "error.html",
        }
    }
}

const TEMPLATES: [(&str, &str); 8] = [
    ("base.html", include_str!("../templates/base.html")),
    ("macros.html", include_str!("../templates/macros.html")),
    ("index.html", include_str!("../templates/index.html")),
    ("signin.html", include_str!("../templates/signin.html")),
    ("analyze.html", include_str!("../templates/analyze.html")),
    ("reports.html", include_str!("../templates/reports.html")),
    ("report.html", include_str!("../templates/report.html")),
    ("error.html", include_str!("../templates/error.html")),
];

/// Compiled page templates. Build once at start-up and share.
pub struct Renderer {
    tera: Tera,
}

impl Renderer {
    pub fn new() -> Result<Self, RenderError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES)
            .map_err(|e| RenderError::TemplateParse(e.to_string()))?;
        Ok(Self { tera })
    }

    /// Render `page` with the view's fields as template variables.
    pub fn render<T: Serialize>(&self, page: Page, view: &T) -> Result<String, RenderError> {
        let value = serde_json::to_value(view)?;
        let context =
            Context::from_value(value).map_err(|e| RenderError::TemplateRender(e.to_string()))?;

        let html = self.tera.render(page.template_name(), &context)?;
        tracing::debug!(template = page.template_name(), bytes = html.len(), "page rendered");
        Ok(html)
    }
}

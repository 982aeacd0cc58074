use anyhow::Result;
use axum::{http::StatusCode, response::Html};
use minijinja::{Environment, Value};

use crate::error::internal;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("index.html", include_str!("../templates/index.html")),
    ("login.html", include_str!("../templates/login.html")),
    ("register.html", include_str!("../templates/register.html")),
    ("tools.html", include_str!("../templates/tools.html")),
    ("report.html", include_str!("../templates/report.html")),
];

/// Compiled page templates. `.html` names get HTML auto-escaping.
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        for &(name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }
        Ok(Self { env })
    }

    pub fn render(&self, name: &str, ctx: Value) -> Result<String> {
        Ok(self.env.get_template(name)?.render(ctx)?)
    }

    /// Render for a handler, mapping failures to a logged 500.
    pub fn page(&self, name: &str, ctx: Value) -> Result<Html<String>, StatusCode> {
        self.render(name, ctx)
            .map(Html)
            .map_err(internal("template render failed"))
    }
}

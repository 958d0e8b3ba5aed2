//! Template compilation and rendering.
//!
//! Templates are [Handlebars](https://handlebarsjs.com/) sources stored with
//! a `.dust` suffix. Each project build compiles its templates into its own
//! registry, so templates never leak from one project into another.

use handlebars::Handlebars;
use log::debug;
use serde::Serialize;

use crate::fs::strip_extension;
use crate::{Error, Map};

/// File extension of template sources.
pub const TEMPLATE_EXTENSION: &str = ".dust";
/// The template rendered once per locale.
pub const ENTRY_TEMPLATE: &str = "index";

/// A project's compiled templates.
pub struct Templates<'reg> {
    hb: Handlebars<'reg>,
}

impl<'reg> Templates<'reg> {
    /// Compiles every template source, registering it under its file name
    /// with the template extension stripped.
    pub fn compile(sources: &Map<String, String>) -> Result<Self, Error> {
        let mut hb = Handlebars::new();
        for (file_name, source) in sources {
            let name = strip_extension(file_name, TEMPLATE_EXTENSION);
            debug!("Registering template {} from {}", name, file_name);
            hb.register_template_string(name, source)
                .map_err(|e| Error::TemplateCompile(name.to_string(), e.to_string()))?;
        }
        Ok(Self { hb })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.hb.has_template(name)
    }

    /// Renders the named template against the given data.
    pub fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<String, Error> {
        if !self.contains(name) {
            return Err(Error::TemplateRender(
                name.to_string(),
                "no such template".to_string(),
            ));
        }
        self.hb
            .render(name, data)
            .map_err(|e| Error::TemplateRender(name.to_string(), e.to_string()))
    }
}

//! HTML pages rendered once at startup.
//!
//! The templates are compiled into the binary. Every `.html` template escapes its
//! values, so titles, descriptions and urls from the configuration go in as plain text.

use serde::Serialize;
use tera::{Context, Tera};

use crate::config::{CommandInfo, Config};
use crate::error::ServerError;

const TEMPLATES: [(&str, &str); 4] = [
    ("layout.html", include_str!("../templates/layout.html")),
    ("index.html", include_str!("../templates/index.html")),
    ("command.html", include_str!("../templates/command.html")),
    ("document.html", include_str!("../templates/document.html")),
];

#[derive(Serialize)]
struct Link<'a> {
    href: String,
    text: &'a str,
}

#[derive(Serialize)]
struct Section<'a> {
    heading: &'static str,
    links: Vec<Link<'a>>,
}

#[derive(Debug)]
pub struct Pages {
    tera: Tera,
}

impl Pages {
    pub fn new() -> Result<Self, ServerError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES).map_err(|source| ServerError::Template { what: "templates", source })?;
        Ok(Self { tera })
    }

    pub fn index(&self, config: &Config) -> Result<String, ServerError> {
        let static_files = config
            .static_file_info
            .iter()
            .filter(|info| info.include_in_main_page)
            .map(|info| Link { href: info.url.clone(), text: &info.url })
            .collect();

        let commands = config
            .command_info
            .iter()
            .map(|info| Link { href: format!("/command/{}", info.id), text: &info.description })
            .collect();

        let debug = [
            ("/debug/config", "Configuration"),
            ("/debug/environment", "Environment"),
            ("/api/debug/runtime", "Runtime"),
        ]
        .into_iter()
        .map(|(href, text)| Link { href: href.to_string(), text })
        .collect();

        let sections = [
            Section { heading: "Static Files", links: static_files },
            Section { heading: "Commands", links: commands },
            Section { heading: "Debug", links: debug },
        ];

        let mut context = Context::new();
        context.insert("title", &config.main_page_info.title);
        context.insert("sections", &sections);
        self.render("index.html", &context)
    }

    /// A page that fetches the command's output from its API route.
    pub fn command(&self, info: &CommandInfo) -> Result<String, ServerError> {
        let command_line =
            std::iter::once(info.command.as_str()).chain(info.args.iter().map(String::as_str)).collect::<Vec<_>>().join(" ");

        let mut context = Context::new();
        context.insert("title", &info.description);
        context.insert("command_line", &command_line);
        context.insert("api", &format!("/api/command/{}", info.id));
        self.render("command.html", &context)
    }

    /// A page showing a pre-rendered JSON document.
    pub fn json_document(&self, title: &str, json: &str) -> Result<String, ServerError> {
        let mut context = Context::new();
        context.insert("title", title);
        context.insert("document", json);
        self.render("document.html", &context)
    }

    fn render(&self, name: &'static str, context: &Context) -> Result<String, ServerError> {
        self.tera.render(name, context).map_err(|source| ServerError::Template { what: name, source })
    }
}

// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-plc-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Embedded browser dashboard
//!
//! Two static pages compiled into the binary: the operator control page at
//! `/` and the temperature dashboard at `/monitoring`. Both call the JSON API
//! of the same server, scripts and styles are served under `/static/`.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use include_dir::{include_dir, Dir};
use rocket::http::{ContentType, Header};
use rocket::response::{self, Responder};
use rocket::{get, routes, Request, Response, Route};

static WEB_DIR: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/resources/web");

/// An embedded file with its content type
#[derive(Debug)]
pub struct StaticFileResponse(&'static [u8], ContentType);

impl<'r> Responder<'r, 'static> for StaticFileResponse {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        Response::build()
            .header(self.1)
            .header(Header::new("Cache-Control", "max-age=3600"))
            .sized_body(self.0.len(), Cursor::new(self.0))
            .ok()
    }
}

/// Look up an embedded file, `None` when it does not exist
pub fn embedded(path: &Path) -> Option<StaticFileResponse> {
    let file = WEB_DIR.get_file(path)?;
    let content_type = file
        .path()
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(ContentType::from_extension)
        .unwrap_or(ContentType::Binary);
    Some(StaticFileResponse(file.contents(), content_type))
}

/// Operator control page
#[get("/")]
pub async fn index() -> Option<StaticFileResponse> {
    embedded(Path::new("index.html"))
}

/// Temperature dashboard
#[get("/monitoring")]
pub async fn monitoring() -> Option<StaticFileResponse> {
    embedded(Path::new("monitoring.html"))
}

/// Scripts and stylesheets of both pages
#[get("/static/<path..>")]
pub async fn asset(path: PathBuf) -> Option<StaticFileResponse> {
    embedded(&path)
}

pub fn get_dashboard_routes() -> Vec<Route> {
    routes![index, monitoring, asset]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pages_are_embedded() {
        let index = embedded(Path::new("index.html")).unwrap();
        assert_eq!(index.1, ContentType::HTML);
        assert!(std::str::from_utf8(index.0).unwrap().contains("/static/app.js"));

        let script = embedded(Path::new("monitoring.js")).unwrap();
        assert_eq!(script.1, ContentType::JavaScript);
        assert!(std::str::from_utf8(script.0)
            .unwrap()
            .contains("/api/temperature"));

        assert_eq!(
            embedded(Path::new("style.css")).map(|file| file.1),
            Some(ContentType::CSS)
        );
    }

    #[test]
    fn test_unknown_file() {
        assert!(embedded(Path::new("missing.html")).is_none());
        assert!(embedded(Path::new("../Cargo.toml")).is_none());
    }
}

// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-plc-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rocket server builder

use anyhow::Result;
use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use log::{debug, info};
use rocket::config::LogLevel;
use rocket::data::{Limits, ToByteUnit};
use rocket::figment::Figment;
use rocket::{routes, Build, Rocket};
use rocket_okapi::okapi::merge::marge_spec_list;
use rocket_okapi::settings::OpenApiSettings;
use rocket_okapi::{get_openapi_route, rapidoc::*, settings::UrlObject};

use super::cors::{preflight, CORS};
use super::dashboard::get_dashboard_routes;
use super::plc::get_plc_routes;
use super::temperature::{get_temperature_routes, MonitorState};
use crate::config::{VariablesConfig, WebConfig};
use crate::modbus::SharedPlc;

/// Rocket settings derived from the web configuration
///
/// TLS is enabled when both a certificate and a key are configured.
pub fn rocket_figment(config: &WebConfig) -> Result<Figment> {
    let mut figment = rocket::Config::figment()
        .merge(("ident", config.name.clone()))
        .merge(("limits", Limits::new().limit("json", 1.mebibytes())))
        .merge(("address", config.address.clone()))
        .merge(("port", config.port))
        .merge(("log_level", LogLevel::Normal));

    if let (Some(cert), Some(key)) = (&config.cert, &config.key) {
        debug!("SSL certificates found in configuration, enabling TLS");
        let cert_data = BASE64_STANDARD.decode(cert)?;
        let key_data = BASE64_STANDARD.decode(key)?;
        figment = figment
            .merge(("tls.certs", cert_data))
            .merge(("tls.key", key_data));
        info!("TLS enabled for web server");
    }
    Ok(figment)
}

/// Build the API server
///
/// # Routes
///
/// - `/`, `/monitoring`: embedded control page and temperature dashboard
/// - `/api/...`: PLC and temperature endpoints
/// - `/api/openapi.json`: OpenAPI document
/// - `/api/docs/`: RapiDoc browser for the document
pub fn build_rocket(
    figment: Figment,
    plc: SharedPlc,
    variables: VariablesConfig,
    monitor: MonitorState,
) -> Result<Rocket<Build>> {
    let (plc_routes, plc_spec) = get_plc_routes();
    let (temperature_routes, temperature_spec) = get_temperature_routes();
    let spec = marge_spec_list(&[
        ("/".to_string(), plc_spec),
        ("/".to_string(), temperature_spec),
    ])
    .map_err(|err| anyhow::anyhow!("Failed to merge OpenAPI documents: {:?}", err))?;

    let rocket = rocket::custom(figment)
        .attach(CORS)
        .mount("/", plc_routes)
        .mount("/", temperature_routes)
        .mount("/", routes![preflight])
        .mount("/", get_dashboard_routes())
        .mount(
            "/api",
            vec![get_openapi_route(spec, &OpenApiSettings::default())],
        )
        .mount(
            "/api/docs/",
            make_rapidoc(&RapiDocConfig {
                title: Some("PLC monitor API".to_owned()),
                general: GeneralConfig {
                    spec_urls: vec![UrlObject::new("General", "../openapi.json")],
                    ..Default::default()
                },
                hide_show: HideShowConfig {
                    allow_spec_url_load: false,
                    allow_spec_file_load: false,
                    ..Default::default()
                },
                ..Default::default()
            }),
        )
        .manage(plc)
        .manage(variables)
        .manage(monitor);
    Ok(rocket)
}

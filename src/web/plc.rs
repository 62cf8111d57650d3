// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-plc-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! PLC variable and connection routes

use std::collections::BTreeMap;

use log::info;
use rocket::request::FromParam;
use rocket::serde::json::Json;
use rocket::{get, post, State};
use rocket_okapi::okapi::openapi3::OpenApi;
use rocket_okapi::{openapi, openapi_get_routes_spec};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::error::{ApiError, ApiResult};
use crate::config::{VariableDef, VariablesConfig};
use crate::modbus::codec::{self, FLOAT32_WORDS};
use crate::modbus::{CodecError, ConnectionStatus, PlcEndpoint, SharedPlc, TypedValue, VariableKind};

impl<'a> FromParam<'a> for VariableKind {
    type Error = String;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        param.parse()
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReadRequest {
    /// Zero-based coil or holding register address
    pub address: u16,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct WriteRequest {
    pub address: u16,
    /// `true`/`false` for bool, an integer for int, a number for real
    pub value: serde_json::Value,
}

/// Body of `POST /api/write/<kind>/<address>`
#[derive(Debug, Deserialize, JsonSchema)]
pub struct WriteValue {
    #[serde(default)]
    pub value: serde_json::Value,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct VariableResponse {
    pub success: bool,
    pub address: u16,
    pub value: TypedValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PlcTarget {
    pub ip: String,
    pub port: u16,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct PlcTargetStatus {
    pub ip: String,
    pub port: u16,
    pub connected: bool,
}

/// One entry of `/api/read_all`
#[derive(Debug, Serialize, JsonSchema)]
pub struct VariableReading {
    #[serde(rename = "type")]
    pub kind: VariableKind,
    pub address: u16,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<TypedValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Readings of `/api/read_all`, grouped by type then by name
pub type VariableReadings = BTreeMap<VariableKind, BTreeMap<String, VariableReading>>;

/// Reject a `REAL` that would run past the last holding register
fn check_address(kind: VariableKind, address: u16) -> Result<(), CodecError> {
    match kind {
        VariableKind::Real => codec::check_span(address, FLOAT32_WORDS),
        VariableKind::Bool | VariableKind::Int => Ok(()),
    }
}

/// Interpret a JSON value as a variable of the given kind
pub fn typed_value(kind: VariableKind, value: &serde_json::Value) -> Result<TypedValue, ApiError> {
    match kind {
        VariableKind::Bool => value
            .as_bool()
            .or_else(|| value.as_i64().map(|v| v != 0))
            .map(TypedValue::Bool)
            .ok_or_else(|| ApiError::bad_request("BOOL value must be true or false")),
        VariableKind::Int => {
            let value = value
                .as_i64()
                .ok_or_else(|| ApiError::bad_request("INT value must be an integer"))?;
            let value = i16::try_from(value).map_err(|_| CodecError::Range { value })?;
            Ok(TypedValue::Int(value))
        }
        VariableKind::Real => value
            .as_f64()
            .map(|v| TypedValue::Real(v as f32))
            .ok_or_else(|| ApiError::bad_request("REAL value must be a number")),
    }
}

/// # Connection status
///
/// Last known state of the PLC link.
#[openapi(tag = "PLC")]
#[get("/api/status")]
pub async fn get_status(plc: &State<SharedPlc>) -> Json<ConnectionStatus> {
    Json(plc.status().await)
}

/// # Current PLC target
#[openapi(tag = "PLC")]
#[get("/api/config")]
pub async fn get_config(plc: &State<SharedPlc>) -> Json<PlcTargetStatus> {
    let target = plc.target().await;
    let status = plc.status().await;
    Json(PlcTargetStatus {
        ip: target.address,
        port: target.port,
        connected: status.connected,
    })
}

/// # Change the PLC target
///
/// The new address is kept even when the PLC cannot be reached yet.
#[openapi(tag = "PLC")]
#[post("/api/config", format = "json", data = "<target>")]
pub async fn set_config(
    plc: &State<SharedPlc>,
    target: Json<PlcTarget>,
) -> ApiResult<PlcTargetStatus> {
    let PlcTarget { ip, port } = target.into_inner();
    if ip.trim().is_empty() {
        return Err(ApiError::bad_request("ip must not be empty"));
    }
    if port == 0 {
        return Err(ApiError::bad_request("port must not be 0"));
    }

    let current = plc.target().await;
    let endpoint = PlcEndpoint {
        address: ip.clone(),
        port,
        ..current
    };
    info!("Retargeting PLC link to {}", endpoint);
    let connected = plc.retarget(endpoint).await.is_ok();
    Ok(Json(PlcTargetStatus {
        ip,
        port,
        connected,
    }))
}

/// # Configured variables
#[openapi(tag = "PLC")]
#[get("/api/variables")]
pub async fn get_variables(variables: &State<VariablesConfig>) -> Json<VariablesConfig> {
    Json(variables.inner().clone())
}

/// # Read every configured variable
///
/// Grouped by type, then by name. A variable that cannot be read carries an
/// `error` instead of a `value`.
#[openapi(tag = "PLC")]
#[get("/api/read_all")]
pub async fn read_all(
    plc: &State<SharedPlc>,
    variables: &State<VariablesConfig>,
) -> Json<VariableReadings> {
    let mut readings: VariableReadings =
        [VariableKind::Bool, VariableKind::Int, VariableKind::Real]
            .into_iter()
            .map(|kind| (kind, BTreeMap::new()))
            .collect();
    for (kind, VariableDef { name, address, description }) in variables.iter() {
        let (value, error) = match plc.read(kind, *address).await {
            Ok(value) => (Some(value), None),
            Err(err) => (None, Some(err.to_string())),
        };
        readings.entry(kind).or_default().insert(
            name.clone(),
            VariableReading {
                kind,
                address: *address,
                description: description.clone(),
                value,
                error,
            },
        );
    }
    Json(readings)
}

async fn read_at(plc: &SharedPlc, kind: VariableKind, address: u16) -> ApiResult<VariableResponse> {
    check_address(kind, address)?;
    let value = plc.read(kind, address).await?;
    Ok(Json(VariableResponse {
        success: true,
        address,
        value,
        message: None,
    }))
}

async fn write_at(
    plc: &SharedPlc,
    kind: VariableKind,
    address: u16,
    value: &serde_json::Value,
) -> ApiResult<VariableResponse> {
    let value = typed_value(kind, value)?;
    check_address(kind, address)?;
    plc.write(address, value).await?;
    Ok(Json(VariableResponse {
        success: true,
        address,
        value,
        message: Some(format!("{} {} set to {}", kind.label(), address, value)),
    }))
}

/// # Read a variable
///
/// `kind` is one of `bool`, `int` or `real`.
#[openapi(tag = "PLC")]
#[post("/api/<kind>/read", format = "json", data = "<request>")]
pub async fn read_variable(
    plc: &State<SharedPlc>,
    kind: VariableKind,
    request: Json<ReadRequest>,
) -> ApiResult<VariableResponse> {
    read_at(plc, kind, request.address).await
}

/// # Write a variable
#[openapi(tag = "PLC")]
#[post("/api/<kind>/write", format = "json", data = "<request>")]
pub async fn write_variable(
    plc: &State<SharedPlc>,
    kind: VariableKind,
    request: Json<WriteRequest>,
) -> ApiResult<VariableResponse> {
    let WriteRequest { address, value } = request.into_inner();
    write_at(plc, kind, address, &value).await
}

/// # Read a variable by path
///
/// Same as `POST /api/<kind>/read` with the address in the path.
#[openapi(tag = "PLC")]
#[get("/api/read/<kind>/<address>")]
pub async fn read_by_path(
    plc: &State<SharedPlc>,
    kind: VariableKind,
    address: u16,
) -> ApiResult<VariableResponse> {
    read_at(plc, kind, address).await
}

/// # Write a variable by path
///
/// Body `{"value": ...}`.
#[openapi(tag = "PLC")]
#[post("/api/write/<kind>/<address>", format = "json", data = "<request>")]
pub async fn write_by_path(
    plc: &State<SharedPlc>,
    kind: VariableKind,
    address: u16,
    request: Json<WriteValue>,
) -> ApiResult<VariableResponse> {
    write_at(plc, kind, address, &request.value).await
}

pub fn get_plc_routes() -> (Vec<rocket::Route>, OpenApi) {
    openapi_get_routes_spec![
        get_status,
        get_config,
        set_config,
        get_variables,
        read_all,
        read_variable,
        write_variable,
        read_by_path,
        write_by_path
    ]
}

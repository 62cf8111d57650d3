// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-plc-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! JSON error responses of the API

use log::{debug, warn};
use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use rocket::Request;
use rocket_okapi::gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::Responses;
use rocket_okapi::response::OpenApiResponderInner;
use schemars::JsonSchema;
use serde::Serialize;

use crate::modbus::{CodecError, PlcError};
use crate::monitoring::StoreError;

/// Body of every error response
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ErrorBody {
    pub error: String,
}

/// An error answered as `{"error": "..."}` with a matching status
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: Status,
    pub message: String,
}

impl ApiError {
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(Status::BadRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Status::NotFound, message)
    }
}

impl From<PlcError> for ApiError {
    fn from(err: PlcError) -> Self {
        let status = match &err {
            PlcError::Connection(_) | PlcError::Timeout(_) => Status::ServiceUnavailable,
            PlcError::Codec(_) => Status::BadRequest,
            PlcError::Protocol(_) => Status::InternalServerError,
        };
        Self::new(status, err.to_string())
    }
}

impl From<CodecError> for ApiError {
    fn from(err: CodecError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::new(Status::InternalServerError, err.to_string())
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        if self.status.code >= 500 {
            warn!("{} {}: {}", request.method(), request.uri(), self.message);
        } else {
            debug!("{} {}: {}", request.method(), request.uri(), self.message);
        }
        let body = Json(ErrorBody {
            error: self.message,
        });
        response::Response::build_from(body.respond_to(request)?)
            .status(self.status)
            .ok()
    }
}

impl OpenApiResponderInner for ApiError {
    fn responses(generator: &mut OpenApiGenerator) -> rocket_okapi::Result<Responses> {
        let mut responses = Responses::default();
        let schema = generator.json_schema::<ErrorBody>();
        for status in [400, 404, 500, 503] {
            rocket_okapi::util::add_schema_response(
                &mut responses,
                status,
                "application/json",
                schema.clone(),
            )?;
        }
        Ok(responses)
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

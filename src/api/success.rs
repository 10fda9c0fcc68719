use actix_web::{body::BoxBody, http::StatusCode, HttpRequest, HttpResponse, Responder};
use serde::Serialize;
use std::borrow::Cow;

/// JSON envelope shared by every successful response.
#[derive(Serialize)]
pub struct Envelope<T: Serialize> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Cow<'static, str>>,
}

pub struct Success<T: Serialize> {
    status: StatusCode,
    body: Option<Envelope<T>>,
}

impl<T: Serialize> Success<T> {
    fn with_status(status: StatusCode, data: T) -> Self {
        Self { status, body: Some(Envelope { data, message: None }) }
    }

    pub fn ok(data: T) -> Self {
        Self::with_status(StatusCode::OK, data)
    }

    pub fn created(data: T) -> Self {
        Self::with_status(StatusCode::CREATED, data)
    }

    /// Ignored for 204 responses, which carry no body.
    pub fn message(mut self, msg: impl Into<Cow<'static, str>>) -> Self {
        if let Some(body) = &mut self.body {
            body.message = Some(msg.into());
        }
        self
    }
}

impl Success<()> {
    pub fn no_content() -> Self {
        Self { status: StatusCode::NO_CONTENT, body: None }
    }
}

impl<T: Serialize> Responder for Success<T> {
    type Body = BoxBody;

    fn respond_to(self, _req: &HttpRequest) -> HttpResponse<Self::Body> {
        let mut response = HttpResponse::build(self.status);
        match self.body {
            Some(body) => response.json(body),
            None => response.finish(),
        }
    }
}

use rocket::{http::{ContentType, Status}, response::{self, Responder, Response}, serde::json::Json, Request};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

pub struct JsonResponder<T> {
    pub response: T,
    pub status: Status
}

#[derive(Serialize, Deserialize)]
pub struct EmptyResponse {}

impl<T: Serialize> JsonResponder<T> {
    pub fn created(data: T) -> Self {
        JsonResponder::from(data, Status::Created)
    }

    pub fn from(data: T, status: Status) -> Self {
        Self { response: data, status }
    }
}

impl<'r, T: Serialize> Responder<'r, 'static> for JsonResponder<T> {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let data = Json(self.response);
        Response::build_from(data.respond_to(req)?)
            .header(ContentType::JSON)
            .status(self.status)
            .ok()
    }
}

/// CSV download with a suggested filename.
pub struct CsvResponder {
    pub filename: String,
    pub body: String
}

impl CsvResponder {
    pub fn attachment(filename: &str, body: String) -> Self {
        CsvResponder { filename: filename.to_owned(), body }
    }
}

impl<'r> Responder<'r, 'static> for CsvResponder {
    fn respond_to(self, _req: &'r Request<'_>) -> response::Result<'static> {
        Response::build()
            .header(ContentType::CSV)
            .raw_header(
                "Content-Disposition",
                format!("attachment; filename=\"{}\"", self.filename)
            )
            .sized_body(self.body.len(), Cursor::new(self.body))
            .ok()
    }
}

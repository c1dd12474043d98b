//! REST client for the clinic API.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::{ClinicBackend, StoreError, StoreResult};
use crate::models::{
    Appointment, AppointmentPatch, ImplantRecord, NewAppointment, NewPatient, Patient,
};

const IMPLANT_RECORDS: &str = "schede-impianto-picc";

/// Blocking HTTP implementation of [`ClinicBackend`].
pub struct HttpBackend {
    base_url: String,
    client: Client,
    timeout_secs: u64,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout_secs: u64) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| StoreError::remote(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn send(&self, request: RequestBuilder) -> StoreResult<Response> {
        let response = request.send().map_err(|e| {
            if e.is_connect() {
                StoreError::remote(format!("Cannot reach {}", self.base_url))
            } else if e.is_timeout() {
                StoreError::remote(format!("Request timed out after {}s", self.timeout_secs))
            } else {
                StoreError::remote(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let error = error_from_status(status.as_u16(), &body);
            warn!(status = status.as_u16(), error = %error, "Clinic API rejected request");
            return Err(error);
        }
        Ok(response)
    }

    fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> StoreResult<T> {
        self.send(request)?
            .json()
            .map_err(|e| StoreError::remote(format!("Malformed response: {}", e)))
    }
}

/// Map a failed response to the error taxonomy, keeping the server's `detail`.
pub fn error_from_status(status: u16, body: &str) -> StoreError {
    let message = detail_message(body).unwrap_or_else(|| format!("HTTP {}", status));
    match status {
        404 => StoreError::NotFound(message),
        409 => StoreError::Capacity(message),
        400 | 422 => StoreError::Validation(message),
        _ => StoreError::Remote { message },
    }
}

fn detail_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        _ => None,
    }
}

impl ClinicBackend for HttpBackend {
    fn list_appointments(
        &self,
        ambulatorio: &str,
        date: NaiveDate,
    ) -> StoreResult<Vec<Appointment>> {
        let data = date.format("%Y-%m-%d").to_string();
        debug!(ambulatorio, data = %data, "GET appointments");
        self.send_json(
            self.client
                .get(self.url("appointments"))
                .query(&[("ambulatorio", ambulatorio), ("data", data.as_str())]),
        )
    }

    fn get_appointment(&self, id: &str) -> StoreResult<Appointment> {
        self.send_json(self.client.get(self.url(&format!("appointments/{}", id))))
    }

    fn create_appointment(&self, request: &NewAppointment) -> StoreResult<Appointment> {
        self.send_json(self.client.post(self.url("appointments")).json(request))
    }

    fn update_appointment(&self, id: &str, patch: &AppointmentPatch) -> StoreResult<Appointment> {
        self.send_json(
            self.client
                .put(self.url(&format!("appointments/{}", id)))
                .json(patch),
        )
    }

    fn delete_appointment(&self, id: &str) -> StoreResult<()> {
        self.send(self.client.delete(self.url(&format!("appointments/{}", id))))?;
        Ok(())
    }

    fn list_patients(&self, ambulatorio: &str, status: &str) -> StoreResult<Vec<Patient>> {
        self.send_json(
            self.client
                .get(self.url("patients"))
                .query(&[("ambulatorio", ambulatorio), ("status", status)]),
        )
    }

    fn create_patient(&self, request: &NewPatient) -> StoreResult<Patient> {
        self.send_json(self.client.post(self.url("patients")).json(request))
    }

    fn holidays(&self, year: i32) -> StoreResult<Vec<String>> {
        debug!(year, "GET holidays");
        self.send_json(
            self.client
                .get(self.url("calendar/holidays"))
                .query(&[("anno", year)]),
        )
    }

    fn list_implant_records(&self, patient_id: &str) -> StoreResult<Vec<ImplantRecord>> {
        self.send_json(
            self.client
                .get(self.url(IMPLANT_RECORDS))
                .query(&[("patient_id", patient_id)]),
        )
    }

    fn create_implant_record(&self, record: &ImplantRecord) -> StoreResult<ImplantRecord> {
        self.send_json(self.client.post(self.url(IMPLANT_RECORDS)).json(record))
    }

    fn update_implant_record(
        &self,
        id: &str,
        record: &ImplantRecord,
    ) -> StoreResult<ImplantRecord> {
        self.send_json(
            self.client
                .put(self.url(&format!("{}/{}", IMPLANT_RECORDS, id)))
                .json(record),
        )
    }

    fn delete_implant_record(&self, id: &str) -> StoreResult<()> {
        self.send(
            self.client
                .delete(self.url(&format!("{}/{}", IMPLANT_RECORDS, id))),
        )?;
        Ok(())
    }

    fn implant_record_pdf(&self, id: &str) -> StoreResult<Vec<u8>> {
        let response = self.send(
            self.client
                .get(self.url(&format!("{}/{}/pdf", IMPLANT_RECORDS, id))),
        )?;
        let bytes = response
            .bytes()
            .map_err(|e| StoreError::remote(format!("Failed to read PDF: {}", e)))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Track;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    /// Answer one request on a loopback port with a canned status and body.
    /// The handle yields the request line that was received.
    fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();

            let mut content_length = 0;
            loop {
                let mut header = String::new();
                reader.read_line(&mut header).unwrap();
                let header = header.trim_end();
                if header.is_empty() {
                    break;
                }
                if let Some((name, value)) = header.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().unwrap();
                    }
                }
            }
            let mut request_body = vec![0; content_length];
            reader.read_exact(&mut request_body).unwrap();

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let mut stream = reader.into_inner();
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
            request_line.trim_end().to_string()
        });
        (base_url, handle)
    }

    fn booking() -> NewAppointment {
        NewAppointment {
            patient_id: "p1".into(),
            ambulatorio: "pta_centro".into(),
            date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            time: "09:00".into(),
            track: Track::Picc,
            services: vec!["medicazione_semplice".into()],
        }
    }

    #[test]
    fn test_trims_trailing_slash() {
        let backend = HttpBackend::new("http://localhost:8001/api/", 30).unwrap();
        assert_eq!(backend.base_url(), "http://localhost:8001/api");
        assert_eq!(
            backend.url("/appointments"),
            "http://localhost:8001/api/appointments"
        );
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            error_from_status(409, r#"{"detail":"Slot pieno"}"#),
            StoreError::Capacity("Slot pieno".into())
        );
        assert_eq!(
            error_from_status(404, ""),
            StoreError::NotFound("HTTP 404".into())
        );
        assert!(matches!(
            error_from_status(422, "{}"),
            StoreError::Validation(_)
        ));
        assert_eq!(
            error_from_status(500, r#"{"detail":"boom"}"#),
            StoreError::Remote {
                message: "boom".into()
            }
        );
    }

    #[test]
    fn test_validation_detail_list() {
        let body = r#"{"detail":[{"loc":["body","nome"],"msg":"field required"}]}"#;
        assert_eq!(
            error_from_status(422, body),
            StoreError::Validation("field required".into())
        );
    }

    #[test]
    fn test_full_slot_answer_is_capacity_error() {
        let (base_url, server) = serve_once("409 Conflict", r#"{"detail":"Slot pieno"}"#);
        let backend = HttpBackend::new(&base_url, 5).unwrap();
        let result = backend.create_appointment(&booking());
        assert_eq!(result, Err(StoreError::Capacity("Slot pieno".into())));
        assert_eq!(server.join().unwrap(), "POST /appointments HTTP/1.1");
    }

    #[test]
    fn test_holidays_are_fetched_for_year() {
        let (base_url, server) = serve_once("200 OK", r#"["2024-08-15","2024-12-25"]"#);
        let backend = HttpBackend::new(&base_url, 5).unwrap();
        let days = backend.holidays(2024).unwrap();
        assert_eq!(days, vec!["2024-08-15".to_string(), "2024-12-25".to_string()]);
        assert_eq!(
            server.join().unwrap(),
            "GET /calendar/holidays?anno=2024 HTTP/1.1"
        );
    }

    #[test]
    fn test_malformed_body_is_remote_error() {
        let (base_url, server) = serve_once("200 OK", "not json");
        let backend = HttpBackend::new(&base_url, 5).unwrap();
        assert!(matches!(
            backend.holidays(2024),
            Err(StoreError::Remote { .. })
        ));
        server.join().unwrap();
    }

    #[test]
    fn test_unreachable_server_is_remote_error() {
        // Take a free port, then close it so nothing is listening there
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let backend = HttpBackend::new(&format!("http://127.0.0.1:{}", port), 5).unwrap();
        let result = backend.holidays(2024);
        assert!(matches!(result, Err(StoreError::Remote { .. })));
    }
}

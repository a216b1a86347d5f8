use crate::errors::{AppError, ResultExt};
use crate::models::{
    apply_creation_defaults, fields, Lead, LeadResponse, LeadsResponse, MessageResponse,
};
use crate::repository::LeadRepository;
use crate::store::TableStore;
use crate::validation::LeadValidator;
use axum::{
    body::Bytes,
    extract::{rejection::PathRejection, Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;

const LEAD_NOT_FOUND: &str = "Lead not found";

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// CRUD access to the leads table.
    pub repository: LeadRepository,
    /// Payload validator, backed by the same repository for uniqueness lookups.
    pub validator: LeadValidator,
}

impl AppState {
    /// Builds the state around a single store handle.
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        let repository = LeadRepository::new(store);
        Self {
            validator: LeadValidator::new(repository.clone()),
            repository,
        }
    }
}

/// Health check endpoint.
///
/// # Returns
///
/// * `(StatusCode, Json<serde_json::Value>)` - HTTP 200 OK with health status JSON.
pub async fn health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Parses a request body into a lead payload.
///
/// An empty body, `null` or `{}` counts as "no data".
fn parse_payload(body: &Bytes) -> Result<Lead, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::BadRequest("No data provided".to_string()));
    }

    let value: Value = serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {}", e)))?;

    match value {
        Value::Null => Err(AppError::BadRequest("No data provided".to_string())),
        Value::Object(map) if map.is_empty() => {
            Err(AppError::BadRequest("No data provided".to_string()))
        }
        Value::Object(map) => Ok(map),
        _ => Err(AppError::BadRequest(
            "Request body must be a JSON object".to_string(),
        )),
    }
}

/// Ids are non-negative integers; anything else cannot name a lead.
fn lead_id(path: Result<Path<u64>, PathRejection>) -> Result<u64, AppError> {
    match path {
        Ok(Path(id)) => Ok(id),
        Err(rejection) => {
            tracing::debug!("Rejected lead id: {}", rejection);
            Err(AppError::NotFound(LEAD_NOT_FOUND.to_string()))
        }
    }
}

/// GET /api/leads
///
/// Lists every lead in the table.
pub async fn list_leads(
    State(state): State<Arc<AppState>>,
) -> Result<Json<LeadsResponse>, AppError> {
    tracing::info!("GET /api/leads");

    let leads = state
        .repository
        .list_all()
        .await
        .context("Error fetching leads")?;

    Ok(Json(LeadsResponse { leads }))
}

/// GET /api/leads/:id
///
/// # Returns
///
/// * `Result<Json<LeadResponse>, AppError>` - The lead, or 404 if no row has that id.
pub async fn get_lead(
    State(state): State<Arc<AppState>>,
    path: Result<Path<u64>, PathRejection>,
) -> Result<Json<LeadResponse>, AppError> {
    let id = lead_id(path)?;
    tracing::info!("GET /api/leads/{}", id);

    let lead = state
        .repository
        .get_by_id(id)
        .await
        .context("Error fetching lead")?
        .ok_or_else(|| AppError::NotFound(LEAD_NOT_FOUND.to_string()))?;

    Ok(Json(LeadResponse { lead }))
}

/// POST /api/leads
///
/// Validates the payload (including phone/email uniqueness), fills in
/// `lastconnected`, `status` and `tag` when absent, and inserts the lead.
///
/// # Returns
///
/// * `Result<(StatusCode, Json<LeadResponse>), AppError>` - 201 with the stored row,
///   400 with `errors` when validation fails.
pub async fn create_lead(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<LeadResponse>), AppError> {
    let mut data = parse_payload(&body)?;
    tracing::info!("POST /api/leads");

    let errors = state.validator.validate(&data, true).await;
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    apply_creation_defaults(&mut data, Utc::now());

    let lead = state
        .repository
        .insert(data)
        .await
        .context("Error creating lead")?;

    Ok((StatusCode::CREATED, Json(LeadResponse { lead })))
}

/// Whether an update touches phone or email, and so needs uniqueness checks.
///
/// Values equal to what is already stored are never looked up again; the
/// lead would otherwise collide with itself.
fn contact_changed(data: &Lead, existing: &Lead) -> bool {
    [fields::EMAIL, fields::PHONE]
        .into_iter()
        .any(|field| match data.get(field) {
            Some(value) => existing.get(field) != Some(value),
            None => false,
        })
}

/// PUT /api/leads/:id
///
/// Merges the payload into an existing lead after validation.
///
/// # Returns
///
/// * `Result<Json<LeadResponse>, AppError>` - The updated row; 400 on bad
///   payload, 404 if the lead does not exist.
pub async fn update_lead(
    State(state): State<Arc<AppState>>,
    path: Result<Path<u64>, PathRejection>,
    body: Bytes,
) -> Result<Json<LeadResponse>, AppError> {
    let id = lead_id(path)?;
    let data = parse_payload(&body)?;
    tracing::info!("PUT /api/leads/{}", id);

    let existing = state
        .repository
        .get_by_id(id)
        .await
        .context("Error updating lead")?
        .ok_or_else(|| AppError::NotFound(LEAD_NOT_FOUND.to_string()))?;

    let check_existing = contact_changed(&data, &existing);
    let errors = state.validator.validate(&data, check_existing).await;
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let lead = state
        .repository
        .update(id, data)
        .await
        .context("Error updating lead")?
        // Deleted between the lookup and the write
        .ok_or_else(|| AppError::NotFound(LEAD_NOT_FOUND.to_string()))?;

    tracing::info!("Lead {} updated", id);
    Ok(Json(LeadResponse { lead }))
}

/// DELETE /api/leads/:id
pub async fn delete_lead(
    State(state): State<Arc<AppState>>,
    path: Result<Path<u64>, PathRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = lead_id(path)?;
    tracing::info!("DELETE /api/leads/{}", id);

    let removed = state
        .repository
        .delete_by_id(id)
        .await
        .context("Error deleting lead")?;

    if !removed {
        return Err(AppError::NotFound(LEAD_NOT_FOUND.to_string()));
    }

    Ok(Json(MessageResponse {
        message: format!("Lead {} deleted successfully", id),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead(value: Value) -> Lead {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_parse_payload_rejects_empty_bodies() {
        for body in ["", "  ", "null", "{}"] {
            let err = parse_payload(&Bytes::from(body)).unwrap_err();
            assert!(matches!(err, AppError::BadRequest(ref m) if m == "No data provided"));
        }
    }

    #[test]
    fn test_parse_payload_rejects_non_objects() {
        let err = parse_payload(&Bytes::from("[1, 2]")).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m == "Request body must be a JSON object"));

        let err = parse_payload(&Bytes::from("{not json")).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m.starts_with("Invalid JSON body")));
    }

    #[test]
    fn test_parse_payload_keeps_field_order() {
        let data = parse_payload(&Bytes::from(r#"{"zeta":1,"alpha":2,"name":"x"}"#)).unwrap();
        let keys: Vec<&str> = data.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "name"]);
    }

    #[test]
    fn test_contact_changed() {
        let existing = lead(json!({ "phone": "9876543210", "email": "a@b.in" }));

        assert!(!contact_changed(&lead(json!({ "name": "x" })), &existing));
        assert!(!contact_changed(
            &lead(json!({ "phone": "9876543210", "email": "a@b.in" })),
            &existing
        ));
        assert!(contact_changed(&lead(json!({ "phone": "9123456789" })), &existing));
        assert!(contact_changed(&lead(json!({ "email": "c@d.in" })), &existing));
        assert!(contact_changed(
            &lead(json!({ "email": "a@b.in" })),
            &lead(json!({ "phone": "9876543210" }))
        ));
    }
}

use axum::http::StatusCode;
use serde::Deserialize;

use partstock_core::PartId;
use partstock_parts::{Constituent, NewPart, Part, PartKind};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

/// Fields are optional so that missing ones answer with our own
/// `validation_error` body instead of a deserializer message.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePartRequest {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub parts: Option<Vec<ConstituentRequest>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstituentRequest {
    pub part_id: Option<String>,
    pub quantity: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AdjustInventoryRequest {
    pub quantity: Option<i64>,
}

// -------------------------
// Request mapping
// -------------------------

pub fn to_new_part(req: CreatePartRequest) -> Result<NewPart, axum::response::Response> {
    let name = match req.name {
        Some(name) if !name.trim().is_empty() => name,
        _ => return Err(bad_request("name is required")),
    };

    let kind: PartKind = match req.kind.as_deref().map(str::parse::<PartKind>) {
        Some(Ok(kind)) => kind,
        Some(Err(_)) => return Err(bad_request("type must be one of: RAW, ASSEMBLED")),
        None => return Err(bad_request("type is required")),
    };

    let constituents = match req.parts {
        Some(parts) => Some(to_constituents(parts)?),
        None => None,
    };

    Ok(NewPart {
        name,
        kind,
        constituents,
    })
}

fn to_constituents(parts: Vec<ConstituentRequest>) -> Result<Vec<Constituent>, axum::response::Response> {
    let mut out = Vec::with_capacity(parts.len());
    for (index, p) in parts.into_iter().enumerate() {
        let part_id: PartId = match p.part_id.as_deref().map(str::parse::<PartId>) {
            Some(Ok(id)) => id,
            _ => return Err(bad_request(format!("parts[{index}].partId is required"))),
        };
        let quantity = match p.quantity {
            Some(q) if q >= 1 => u32::try_from(q)
                .map_err(|_| bad_request(format!("parts[{index}].quantity is too large")))?,
            Some(_) => return Err(bad_request(format!("parts[{index}].quantity must be >= 1"))),
            None => return Err(bad_request(format!("parts[{index}].quantity is required"))),
        };
        out.push(Constituent::new(part_id, quantity));
    }
    Ok(out)
}

pub fn to_adjust_quantity(req: AdjustInventoryRequest) -> Result<u64, axum::response::Response> {
    match req.quantity {
        Some(q) if q >= 1 => Ok(q as u64),
        Some(_) => Err(bad_request("quantity must be >= 1")),
        None => Err(bad_request("quantity is required")),
    }
}

fn bad_request(message: impl Into<String>) -> axum::response::Response {
    errors::json_error(StatusCode::BAD_REQUEST, "validation_error", message)
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn part_to_json(part: &Part) -> serde_json::Value {
    let mut body = serde_json::json!({
        "id": part.id_typed(),
        "name": part.name(),
        "type": part.kind(),
        "quantityInStock": part.stock(),
        "createdAt": part.created_at(),
    });
    if part.is_assembly() {
        body["constituents"] = part
            .constituents()
            .iter()
            .map(|c| {
                serde_json::json!({
                    "partId": c.part_id,
                    "quantity": c.quantity,
                })
            })
            .collect();
    }
    body
}

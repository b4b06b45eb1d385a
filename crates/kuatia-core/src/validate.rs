//! Per-step field validation.
//!
//! Each validator checks its step's fields in declaration order and stops at
//! the first violation. On success it returns the normalised record: text is
//! trimmed and blank optional fields become `None`.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::registration::{Company, Contributor, Establishment, TimbradoInput};
use crate::ruc::check_digit;

pub const MAX_LEGAL_NAME: usize = 255;
pub const MAX_TRADE_NAME: usize = 255;
pub const MAX_ACTIVITY_CODE: usize = 10;
pub const MAX_ACTIVITY_DESCRIPTION: usize = 255;
pub const MAX_CODE: usize = 3;
pub const MAX_ADDRESS: usize = 500;
pub const MAX_PHONE: usize = 20;
pub const MAX_EMAIL: usize = 255;

static DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+$").expect("digit pattern compiles"));
static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },
    #[error("{field} must contain only digits")]
    NotNumeric { field: &'static str },
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("{field} is not a valid email address")]
    InvalidEmail { field: &'static str },
    #[error("check digit has not been computed for RUC {ruc:?}")]
    CheckDigitMissing { ruc: String },
    #[error("timbrado_fecha_fin must not be earlier than timbrado_fecha_inicio")]
    DateOrder,
}

impl ValidationError {
    /// Wire name of the offending field, for inline display.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Required { field }
            | Self::NotNumeric { field }
            | Self::TooLong { field, .. }
            | Self::InvalidEmail { field } => field,
            Self::CheckDigitMissing { .. } => "ruc_dv",
            Self::DateOrder => "timbrado_fecha_fin",
        }
    }
}

fn required(field: &'static str, value: &str, max: usize) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required { field });
    }
    max_len(field, value, max)?;
    Ok(value.to_string())
}

fn optional(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => {
            max_len(field, v, max)?;
            Ok(Some(v.to_string()))
        }
    }
}

fn max_len(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

/// Step 1: the RUC must be digits only and carry the DV computed for its
/// current value. A missing or stale DV is reported separately from a
/// malformed RUC.
pub fn validate_contributor(input: &Contributor) -> Result<Contributor, ValidationError> {
    if input.ruc.is_empty() {
        return Err(ValidationError::Required { field: "ruc" });
    }
    if !DIGITS.is_match(&input.ruc) {
        return Err(ValidationError::NotNumeric { field: "ruc" });
    }
    match input.ruc_dv {
        Some(dv) if Some(dv) == check_digit(&input.ruc) => Ok(input.clone()),
        _ => Err(ValidationError::CheckDigitMissing {
            ruc: input.ruc.clone(),
        }),
    }
}

/// Step 2: legal name required; everything else optional but bounded.
pub fn validate_company(input: &Company) -> Result<Company, ValidationError> {
    Ok(Company {
        legal_name: required("razon_social", &input.legal_name, MAX_LEGAL_NAME)?,
        trade_name: optional("nombre_fantasia", input.trade_name.as_deref(), MAX_TRADE_NAME)?,
        activity_code: optional(
            "actividad_economica_codigo",
            input.activity_code.as_deref(),
            MAX_ACTIVITY_CODE,
        )?,
        activity_description: optional(
            "actividad_economica_descripcion",
            input.activity_description.as_deref(),
            MAX_ACTIVITY_DESCRIPTION,
        )?,
        regime: input.regime,
    })
}

/// Step 3: both codes required (defaults are applied by the form), the
/// email must look like one when given.
pub fn validate_establishment(input: &Establishment) -> Result<Establishment, ValidationError> {
    let code = required("establecimiento_codigo", &input.code, MAX_CODE)?;
    let issuance_point = required("punto_expedicion", &input.issuance_point, MAX_CODE)?;
    let address = optional(
        "establecimiento_direccion",
        input.address.as_deref(),
        MAX_ADDRESS,
    )?;
    let phone = optional("establecimiento_telefono", input.phone.as_deref(), MAX_PHONE)?;
    let email = optional("establecimiento_email", input.email.as_deref(), MAX_EMAIL)?;
    if let Some(email) = &email
        && !EMAIL.is_match(email)
    {
        return Err(ValidationError::InvalidEmail {
            field: "establecimiento_email",
        });
    }

    Ok(Establishment {
        code,
        issuance_point,
        address,
        phone,
        email,
    })
}

/// Step 4: timbrado number required; validity bounds must be ordered.
pub fn validate_timbrado(input: &TimbradoInput) -> Result<TimbradoInput, ValidationError> {
    let timbrado = input.timbrado.trim();
    if timbrado.is_empty() {
        return Err(ValidationError::Required { field: "timbrado" });
    }
    if let (Some(from), Some(until)) = (input.valid_from, input.valid_until)
        && until < from
    {
        return Err(ValidationError::DateOrder);
    }
    Ok(TimbradoInput {
        timbrado: timbrado.to_string(),
        valid_from: input.valid_from,
        valid_until: input.valid_until,
    })
}

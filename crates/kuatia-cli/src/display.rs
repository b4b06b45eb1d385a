//! Vertical card display for an invoicing configuration.
//!
//! Renders the stored fiscal setup grouped by wizard step, skipping empty
//! fields and sections that have nothing to show.

use std::fmt::Write as _;

use chrono::NaiveDate;
use kuatia_core::{InvoicingConfig, TaxpayerKind, certificate_requirement, format_ruc};

const DATE_FORMAT: &str = "%d/%m/%Y";

/// Print a configuration as a card. `today` decides the timbrado status line.
pub fn print_config_card(config: &InvoicingConfig, today: NaiveDate) {
    print!("{}", render_config_card(config, today));
}

pub fn render_config_card(config: &InvoicingConfig, today: NaiveDate) -> String {
    let mut out = String::new();
    let contributor = &config.contributor;
    let company = &config.company;
    let establishment = &config.establishment;
    let timbrado = &config.timbrado;

    let ruc = format_ruc(&contributor.ruc).unwrap_or_else(|| contributor.ruc.clone());
    let _ = writeln!(out, "=== {} ===", company.legal_name);
    if let Some(trade_name) = &company.trade_name {
        let _ = writeln!(out, "{trade_name}");
    }
    let _ = writeln!(out);

    let kind = match contributor.kind {
        TaxpayerKind::Natural => "natural person",
        TaxpayerKind::LegalEntity => "legal entity",
    };
    section(
        &mut out,
        "Contributor",
        &[("ruc", Some(ruc)), ("tipo_contribuyente", Some(kind.to_string()))],
    );

    section(
        &mut out,
        "Company",
        &[
            ("razon_social", Some(company.legal_name.clone())),
            ("nombre_fantasia", company.trade_name.clone()),
            (
                "actividad_economica",
                activity(
                    company.activity_code.as_deref(),
                    company.activity_description.as_deref(),
                ),
            ),
            (
                "tipo_regimen",
                company.regime.map(|r| format!("{} ({})", r.label(), r.code())),
            ),
        ],
    );

    section(
        &mut out,
        "Establishment",
        &[
            (
                "emission_point",
                Some(format!("{}-{}", establishment.code, establishment.issuance_point)),
            ),
            ("establecimiento_direccion", establishment.address.clone()),
            ("establecimiento_telefono", establishment.phone.clone()),
            ("establecimiento_email", establishment.email.clone()),
        ],
    );

    let certificate = if certificate_requirement(timbrado.sifen_environment).certificate_required {
        "required"
    } else {
        "not used"
    };
    section(
        &mut out,
        "Timbrado",
        &[
            ("timbrado", Some(timbrado.input.timbrado.clone())),
            (
                "timbrado_fecha_inicio",
                timbrado.input.valid_from.map(|d| d.format(DATE_FORMAT).to_string()),
            ),
            (
                "timbrado_fecha_fin",
                timbrado.input.valid_until.map(|d| d.format(DATE_FORMAT).to_string()),
            ),
            ("status", Some(timbrado_status(config, today).to_string())),
            ("sifen_environment", Some(timbrado.sifen_environment.to_string())),
            ("certificate", Some(certificate.to_string())),
        ],
    );

    out
}

fn activity(code: Option<&str>, description: Option<&str>) -> Option<String> {
    match (code, description) {
        (Some(c), Some(d)) => Some(format!("{c} {d}")),
        (Some(v), None) | (None, Some(v)) => Some(v.to_string()),
        (None, None) => None,
    }
}

fn timbrado_status(config: &InvoicingConfig, today: NaiveDate) -> &'static str {
    let input = &config.timbrado.input;
    if let Some(from) = input.valid_from
        && today < from
    {
        return "not yet valid";
    }
    if let Some(until) = input.valid_until
        && today > until
    {
        return "expired";
    }
    "valid"
}

fn section(out: &mut String, header: &str, rows: &[(&str, Option<String>)]) {
    if rows.iter().all(|(_, v)| v.is_none()) {
        return;
    }
    let _ = writeln!(out, "{header}");
    for (name, value) in rows {
        if let Some(value) = value {
            let _ = writeln!(out, "  {:<26} {}", name, value);
        }
    }
    let _ = writeln!(out);
}

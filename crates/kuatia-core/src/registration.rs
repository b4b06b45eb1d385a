//! Fiscal registration records: one per wizard step, plus the flat payload
//! sent to the backend once every step has been accepted.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Default code for both the establishment and the issuance point.
pub const DEFAULT_CODE: &str = "001";

/// `tipo_contribuyente`: 1 = natural person, 2 = legal entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum TaxpayerKind {
    Natural,
    #[default]
    LegalEntity,
}

impl From<TaxpayerKind> for u8 {
    fn from(kind: TaxpayerKind) -> u8 {
        match kind {
            TaxpayerKind::Natural => 1,
            TaxpayerKind::LegalEntity => 2,
        }
    }
}

impl TryFrom<u8> for TaxpayerKind {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Natural),
            2 => Ok(Self::LegalEntity),
            other => Err(format!("unknown tipo_contribuyente {other}, expected 1 or 2")),
        }
    }
}

/// `tipo_regimen`: SIFEN tax regime codes 1..=8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum TaxRegime {
    Tourism,
    Importer,
    Exporter,
    Maquila,
    Law6090,
    SmallProducer,
    MediumProducer,
    Accounting,
}

impl TaxRegime {
    pub const ALL: [TaxRegime; 8] = [
        Self::Tourism,
        Self::Importer,
        Self::Exporter,
        Self::Maquila,
        Self::Law6090,
        Self::SmallProducer,
        Self::MediumProducer,
        Self::Accounting,
    ];

    pub fn code(self) -> u8 {
        match self {
            Self::Tourism => 1,
            Self::Importer => 2,
            Self::Exporter => 3,
            Self::Maquila => 4,
            Self::Law6090 => 5,
            Self::SmallProducer => 6,
            Self::MediumProducer => 7,
            Self::Accounting => 8,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Tourism => "Régimen de Turismo",
            Self::Importer => "Importador",
            Self::Exporter => "Exportador",
            Self::Maquila => "Maquila",
            Self::Law6090 => "Ley N° 60/90",
            Self::SmallProducer => "Régimen del Pequeño Productor",
            Self::MediumProducer => "Régimen del Mediano Productor",
            Self::Accounting => "Régimen Contable",
        }
    }
}

impl From<TaxRegime> for u8 {
    fn from(regime: TaxRegime) -> u8 {
        regime.code()
    }
}

impl TryFrom<u8> for TaxRegime {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|r| r.code() == code)
            .ok_or_else(|| format!("unknown tipo_regimen {code}, expected 1..=8"))
    }
}

/// `sifen_environment`: which SIFEN endpoint invoices are sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SifenEnvironment {
    #[default]
    Demo,
    Test,
    Prod,
}

impl fmt::Display for SifenEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Demo => "demo",
            Self::Test => "test",
            Self::Prod => "prod",
        })
    }
}

impl std::str::FromStr for SifenEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "demo" => Ok(Self::Demo),
            "test" => Ok(Self::Test),
            "prod" => Ok(Self::Prod),
            other => Err(format!("unknown SIFEN environment {other:?}, expected demo, test or prod")),
        }
    }
}

/// Step 1: taxpayer identity.
///
/// `ruc_dv` must be the check digit of the current `ruc`; use
/// [`Contributor::new`] or [`Contributor::set_ruc`] to keep it in sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    pub ruc: String,
    #[serde(rename = "tipo_contribuyente")]
    pub kind: TaxpayerKind,
    #[serde(default)]
    pub ruc_dv: Option<u8>,
}

impl Contributor {
    pub fn new(ruc: impl Into<String>, kind: TaxpayerKind) -> Self {
        let mut contributor = Self {
            ruc: String::new(),
            kind,
            ruc_dv: None,
        };
        contributor.set_ruc(ruc);
        contributor
    }

    pub fn set_ruc(&mut self, ruc: impl Into<String>) {
        self.ruc = ruc.into();
        self.ruc_dv = crate::ruc::check_digit(&self.ruc);
    }
}

impl Default for Contributor {
    fn default() -> Self {
        Self::new("", TaxpayerKind::default())
    }
}

/// Step 2: company identity and activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    #[serde(rename = "razon_social")]
    pub legal_name: String,
    #[serde(rename = "nombre_fantasia", default)]
    pub trade_name: Option<String>,
    #[serde(rename = "actividad_economica_codigo", default)]
    pub activity_code: Option<String>,
    #[serde(rename = "actividad_economica_descripcion", default)]
    pub activity_description: Option<String>,
    #[serde(rename = "tipo_regimen", default)]
    pub regime: Option<TaxRegime>,
}

/// Step 3: where invoices are issued from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Establishment {
    #[serde(rename = "establecimiento_codigo", default = "default_code")]
    pub code: String,
    #[serde(rename = "punto_expedicion", default = "default_code")]
    pub issuance_point: String,
    #[serde(rename = "establecimiento_direccion", default)]
    pub address: Option<String>,
    #[serde(rename = "establecimiento_telefono", default)]
    pub phone: Option<String>,
    #[serde(rename = "establecimiento_email", default)]
    pub email: Option<String>,
}

fn default_code() -> String {
    DEFAULT_CODE.to_string()
}

impl Default for Establishment {
    fn default() -> Self {
        Self {
            code: default_code(),
            issuance_point: default_code(),
            address: None,
            phone: None,
            email: None,
        }
    }
}

/// Step 4 fields entered by the user. The environment is selected
/// separately so the certificate gate can react before submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimbradoInput {
    pub timbrado: String,
    #[serde(rename = "timbrado_fecha_inicio", default)]
    pub valid_from: Option<NaiveDate>,
    #[serde(rename = "timbrado_fecha_fin", default)]
    pub valid_until: Option<NaiveDate>,
}

/// Step 4 record as stored in the draft.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timbrado {
    #[serde(flatten)]
    pub input: TimbradoInput,
    #[serde(default)]
    pub sifen_environment: SifenEnvironment,
}

/// Records accepted so far. Each slot is filled only once its step has
/// passed validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationDraft {
    pub contributor: Option<Contributor>,
    pub company: Option<Company>,
    pub establishment: Option<Establishment>,
    pub timbrado: Option<Timbrado>,
}

impl RegistrationDraft {
    pub fn is_complete(&self) -> bool {
        self.contributor.is_some()
            && self.company.is_some()
            && self.establishment.is_some()
            && self.timbrado.is_some()
    }

    /// Assemble the payload; `None` until every step has been accepted.
    pub fn assemble(&self) -> Option<InvoicingConfig> {
        Some(InvoicingConfig {
            contributor: self.contributor.clone()?,
            company: self.company.clone()?,
            establishment: self.establishment.clone()?,
            timbrado: self.timbrado.clone()?,
        })
    }
}

/// The consolidated fiscal configuration, serialised as one flat JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoicingConfig {
    #[serde(flatten)]
    pub contributor: Contributor,
    #[serde(flatten)]
    pub company: Company,
    #[serde(flatten)]
    pub establishment: Establishment,
    #[serde(flatten)]
    pub timbrado: Timbrado,
}

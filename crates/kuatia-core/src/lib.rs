pub mod backend;
pub mod gate;
pub mod registration;
pub mod ruc;
pub mod validate;
pub mod wizard;

pub use backend::{BackendError, Certificate, EmptyCertificate, InvoicingBackend};
pub use gate::{CertificateRequirement, certificate_requirement};
pub use registration::{
    Company, Contributor, Establishment, InvoicingConfig, RegistrationDraft, SifenEnvironment,
    TaxRegime, TaxpayerKind, Timbrado, TimbradoInput,
};
pub use ruc::{Ruc, RucError, check_digit, format_ruc, verify_ruc};
pub use validate::ValidationError;
pub use wizard::{Step, SubmitOutcome, Wizard, WizardError};

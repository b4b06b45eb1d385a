//! Four-step fiscal registration wizard.
//!
//! ```text
//!   1 Contributor ──► 2 Company ──► 3 Establishment ──► 4 Timbrado ──► submitted
//!        ◄── back ───────── back ───────── back ──┘
//! ```
//!
//! Forward moves happen only through the `submit_*` methods, which validate
//! the step and merge the accepted record into the draft. `back` never
//! validates and never drops data. The final `submit` saves the assembled
//! configuration and, when the environment needs one, uploads the signing
//! certificate afterwards.

use std::fmt;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::backend::{BackendError, Certificate, InvoicingBackend};
use crate::gate::{CertificateRequirement, certificate_requirement};
use crate::registration::{
    Company, Contributor, Establishment, InvoicingConfig, RegistrationDraft, SifenEnvironment,
    Timbrado, TimbradoInput,
};
use crate::validate::{
    ValidationError, validate_company, validate_contributor, validate_establishment,
    validate_timbrado,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Step {
    #[default]
    Contributor,
    Company,
    Establishment,
    Timbrado,
}

impl Step {
    /// 1-based position shown to the user.
    pub fn number(self) -> u8 {
        match self {
            Self::Contributor => 1,
            Self::Company => 2,
            Self::Establishment => 3,
            Self::Timbrado => 4,
        }
    }

    fn previous(self) -> Option<Self> {
        match self {
            Self::Contributor => None,
            Self::Company => Some(Self::Contributor),
            Self::Establishment => Some(Self::Company),
            Self::Timbrado => Some(Self::Establishment),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Contributor => "contributor",
            Self::Company => "company",
            Self::Establishment => "establishment",
            Self::Timbrado => "timbrado",
        };
        write!(f, "{} ({name})", self.number())
    }
}

#[derive(Debug, Error)]
pub enum WizardError {
    #[error("step {attempted} cannot be submitted while on step {current}")]
    StepMismatch { current: Step, attempted: Step },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("a digital certificate is required for the {0} environment")]
    CertificateRequired(SifenEnvironment),
    #[error("a submission is already in progress")]
    InFlight,
    #[error("registration draft is incomplete")]
    Incomplete,
    #[error("saving the invoicing configuration failed: {0}")]
    SaveFailed(#[source] BackendError),
    #[error("configuration saved, but uploading the certificate failed: {0}")]
    CertificateUploadFailed(#[source] BackendError),
}

/// Result of a successful final submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub config: InvoicingConfig,
    pub certificate_uploaded: bool,
    /// The environment needs a certificate but the upload was skipped for
    /// lack of a password; it still has to be sent.
    pub certificate_pending: bool,
}

/// Values last typed into each step, accepted or not.
#[derive(Debug, Clone, Default)]
struct Forms {
    contributor: Contributor,
    company: Company,
    establishment: Establishment,
    timbrado: TimbradoInput,
}

/// Certificate password; redacted from `Debug` output.
#[derive(Clone, Default)]
struct Password(String);

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

/// In-memory wizard state. Owned by a single caller; dropping it discards
/// all progress.
#[derive(Debug, Default)]
pub struct Wizard {
    step: Step,
    draft: RegistrationDraft,
    forms: Forms,
    environment: SifenEnvironment,
    certificate: Option<Certificate>,
    certificate_password: Option<Password>,
    in_flight: bool,
    saved_without_certificate: bool,
}

impl Wizard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a configuration already stored by the backend. Every step
    /// is pre-filled but must still be submitted again in order.
    pub fn from_config(config: InvoicingConfig) -> Self {
        let mut contributor = config.contributor;
        let ruc = std::mem::take(&mut contributor.ruc);
        contributor.set_ruc(ruc);

        Self {
            forms: Forms {
                contributor,
                company: config.company,
                establishment: config.establishment,
                timbrado: config.timbrado.input,
            },
            environment: config.timbrado.sifen_environment,
            ..Self::default()
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn draft(&self) -> &RegistrationDraft {
        &self.draft
    }

    pub fn contributor_form(&self) -> &Contributor {
        &self.forms.contributor
    }

    pub fn company_form(&self) -> &Company {
        &self.forms.company
    }

    pub fn establishment_form(&self) -> &Establishment {
        &self.forms.establishment
    }

    pub fn timbrado_form(&self) -> &TimbradoInput {
        &self.forms.timbrado
    }

    /// Keystroke hook for the RUC field; the DV follows synchronously.
    pub fn set_ruc(&mut self, value: impl Into<String>) {
        self.forms.contributor.set_ruc(value);
    }

    /// Read-only DV for the current RUC field value.
    pub fn ruc_dv(&self) -> Option<u8> {
        self.forms.contributor.ruc_dv
    }

    fn expect_step(&self, attempted: Step) -> Result<(), WizardError> {
        if self.step != attempted {
            return Err(WizardError::StepMismatch {
                current: self.step,
                attempted,
            });
        }
        Ok(())
    }

    fn advance(&mut self) {
        let from = self.step;
        self.step = match from {
            Step::Contributor => Step::Company,
            Step::Company => Step::Establishment,
            Step::Establishment | Step::Timbrado => Step::Timbrado,
        };
        info!(from = from.number(), to = self.step.number(), "wizard advanced");
    }

    pub fn submit_contributor(&mut self, input: Contributor) -> Result<(), WizardError> {
        self.expect_step(Step::Contributor)?;
        self.forms.contributor = input;
        let accepted = validate_contributor(&self.forms.contributor).inspect_err(|e| {
            debug!(field = e.field(), error = %e, "contributor step rejected");
        })?;
        self.draft.contributor = Some(accepted);
        self.advance();
        Ok(())
    }

    pub fn submit_company(&mut self, input: Company) -> Result<(), WizardError> {
        self.expect_step(Step::Company)?;
        self.forms.company = input;
        let accepted = validate_company(&self.forms.company).inspect_err(|e| {
            debug!(field = e.field(), error = %e, "company step rejected");
        })?;
        self.forms.company = accepted.clone();
        self.draft.company = Some(accepted);
        self.advance();
        Ok(())
    }

    pub fn submit_establishment(&mut self, input: Establishment) -> Result<(), WizardError> {
        self.expect_step(Step::Establishment)?;
        self.forms.establishment = input;
        let accepted = validate_establishment(&self.forms.establishment).inspect_err(|e| {
            debug!(field = e.field(), error = %e, "establishment step rejected");
        })?;
        self.forms.establishment = accepted.clone();
        self.draft.establishment = Some(accepted);
        self.advance();
        Ok(())
    }

    /// Go back one step. Returns `false` on step 1.
    pub fn back(&mut self) -> bool {
        match self.step.previous() {
            Some(prev) => {
                debug!(from = self.step.number(), to = prev.number(), "wizard went back");
                self.step = prev;
                true
            }
            None => false,
        }
    }

    pub fn environment(&self) -> SifenEnvironment {
        self.environment
    }

    /// Change the SIFEN environment. An attached certificate is kept even
    /// when switching to `demo`; it is ignored for that submission.
    pub fn select_environment(&mut self, env: SifenEnvironment) {
        self.environment = env;
        debug!(
            environment = %env,
            certificate_required = self.certificate_requirement().certificate_required,
            "environment selected"
        );
    }

    pub fn certificate_requirement(&self) -> CertificateRequirement {
        certificate_requirement(self.environment)
    }

    pub fn attach_certificate(&mut self, certificate: Certificate) {
        info!(file = certificate.file_name(), "certificate attached");
        self.certificate = Some(certificate);
    }

    pub fn detach_certificate(&mut self) -> Option<Certificate> {
        self.certificate.take()
    }

    pub fn certificate(&self) -> Option<&Certificate> {
        self.certificate.as_ref()
    }

    pub fn set_certificate_password(&mut self, password: impl Into<String>) {
        let password = password.into();
        self.certificate_password = (!password.is_empty()).then_some(Password(password));
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight
    }

    /// The configuration was persisted by an earlier attempt whose
    /// certificate upload failed. Cleared by the next successful submit; a
    /// submit that skips the upload reports it in
    /// [`SubmitOutcome::certificate_pending`] instead.
    pub fn config_saved_without_certificate(&self) -> bool {
        self.saved_without_certificate
    }

    /// Whether the final submit affordance should be enabled.
    pub fn can_submit(&self) -> bool {
        self.step == Step::Timbrado
            && !self.in_flight
            && (!self.certificate_requirement().certificate_required || self.certificate.is_some())
    }

    /// Validate step 4, save the configuration and, when required and
    /// possible, upload the certificate. Both calls are awaited in order.
    ///
    /// On failure the wizard stays on step 4 with everything entered kept;
    /// nothing is retried. On success it resets to a fresh state.
    pub async fn submit<B>(
        &mut self,
        input: TimbradoInput,
        backend: &B,
    ) -> Result<SubmitOutcome, WizardError>
    where
        B: InvoicingBackend + ?Sized,
    {
        self.expect_step(Step::Timbrado)?;
        if self.in_flight {
            return Err(WizardError::InFlight);
        }

        self.forms.timbrado = input;
        let accepted = validate_timbrado(&self.forms.timbrado).inspect_err(|e| {
            debug!(field = e.field(), error = %e, "timbrado step rejected");
        })?;
        self.forms.timbrado = accepted.clone();

        let requirement = self.certificate_requirement();
        if requirement.certificate_required && self.certificate.is_none() {
            return Err(WizardError::CertificateRequired(self.environment));
        }

        self.draft.timbrado = Some(Timbrado {
            input: accepted,
            sifen_environment: self.environment,
        });
        let config = self.draft.assemble().ok_or(WizardError::Incomplete)?;

        // Cleared only on completion; an abandoned submission leaves the
        // wizard locked.
        self.in_flight = true;
        let result = self.send(&config, requirement, backend).await;
        self.in_flight = false;

        match result {
            Ok(certificate_uploaded) => {
                let certificate_pending = self.saved_without_certificate;
                info!(
                    ruc = %config.contributor.ruc,
                    environment = %config.timbrado.sifen_environment,
                    certificate_uploaded,
                    certificate_pending,
                    "invoicing configuration submitted"
                );
                *self = Self::new();
                Ok(SubmitOutcome {
                    config,
                    certificate_uploaded,
                    certificate_pending,
                })
            }
            Err(e) => {
                warn!(error = %e, "invoicing configuration submission failed");
                Err(e)
            }
        }
    }

    async fn send<B>(
        &mut self,
        config: &InvoicingConfig,
        requirement: CertificateRequirement,
        backend: &B,
    ) -> Result<bool, WizardError>
    where
        B: InvoicingBackend + ?Sized,
    {
        backend
            .save_config(config)
            .await
            .map_err(WizardError::SaveFailed)?;

        if !requirement.certificate_required {
            self.saved_without_certificate = false;
            return Ok(false);
        }

        let (Some(certificate), Some(Password(password))) =
            (&self.certificate, &self.certificate_password)
        else {
            warn!("certificate attached without a password; upload skipped");
            self.saved_without_certificate = true;
            return Ok(false);
        };

        match backend.upload_certificate(certificate, password).await {
            Ok(()) => {
                self.saved_without_certificate = false;
                Ok(true)
            }
            Err(e) => {
                self.saved_without_certificate = true;
                Err(WizardError::CertificateUploadFailed(e))
            }
        }
    }
}

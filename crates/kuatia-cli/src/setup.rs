//! Non-interactive setup: drive the registration wizard from an answers file.

use std::path::Path;

use anyhow::{Context, bail};
use kuatia_core::{
    Certificate, Company, Contributor, Establishment, InvoicingBackend, SifenEnvironment, Step,
    SubmitOutcome, TaxpayerKind, TimbradoInput, Wizard,
};
use serde::Deserialize;
use tracing::info;

/// Answers for every wizard step, as read from JSON.
///
/// ```json
/// {
///   "ruc": "80012345",
///   "tipo_contribuyente": 2,
///   "company": { "razon_social": "Mi Empresa S.A." },
///   "establishment": { "establecimiento_codigo": "001" },
///   "timbrado": { "timbrado": "12345678" },
///   "sifen_environment": "demo"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct SetupAnswers {
    pub ruc: String,
    #[serde(default)]
    pub tipo_contribuyente: TaxpayerKind,
    #[serde(default)]
    pub company: Company,
    #[serde(default)]
    pub establishment: Establishment,
    #[serde(default)]
    pub timbrado: TimbradoInput,
    #[serde(default)]
    pub sifen_environment: SifenEnvironment,
}

pub fn load_answers(path: &Path) -> anyhow::Result<SetupAnswers> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading answers file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing answers file {}", path.display()))
}

pub fn load_certificate(path: &Path) -> anyhow::Result<Certificate> {
    let bytes =
        std::fs::read(path).with_context(|| format!("reading certificate {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "certificate.p12".to_string());
    Ok(Certificate::new(file_name, bytes)?)
}

/// Run all four steps in order and submit through `backend`.
///
/// The first failing step aborts with that step's validation message.
pub async fn run_setup<B>(
    answers: SetupAnswers,
    certificate: Option<Certificate>,
    password: Option<String>,
    backend: &B,
) -> anyhow::Result<SubmitOutcome>
where
    B: InvoicingBackend + ?Sized,
{
    let mut wizard = Wizard::new();

    let contributor = Contributor::new(answers.ruc, answers.tipo_contribuyente);
    info!(ruc = %contributor.ruc, dv = ?contributor.ruc_dv, "contributor");
    wizard
        .submit_contributor(contributor)
        .with_context(|| format!("step {}", Step::Contributor))?;
    wizard
        .submit_company(answers.company)
        .with_context(|| format!("step {}", Step::Company))?;
    wizard
        .submit_establishment(answers.establishment)
        .with_context(|| format!("step {}", Step::Establishment))?;

    wizard.select_environment(answers.sifen_environment);
    if let Some(certificate) = certificate {
        wizard.attach_certificate(certificate);
    }
    if let Some(password) = password {
        wizard.set_certificate_password(password);
    }

    if !wizard.can_submit() {
        bail!(
            "the {} environment requires a digital certificate (pass --certificate)",
            wizard.environment()
        );
    }

    let outcome = wizard
        .submit(answers.timbrado, backend)
        .await
        .with_context(|| format!("step {}", Step::Timbrado))?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use kuatia_core::{BackendError, InvoicingConfig};

    use super::*;

    #[derive(Default)]
    struct CountingBackend {
        saves: Mutex<Vec<InvoicingConfig>>,
        uploads: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl InvoicingBackend for CountingBackend {
        async fn save_config(&self, config: &InvoicingConfig) -> Result<(), BackendError> {
            self.saves.lock().unwrap().push(config.clone());
            Ok(())
        }

        async fn upload_certificate(
            &self,
            certificate: &Certificate,
            _password: &str,
        ) -> Result<(), BackendError> {
            self.uploads
                .lock()
                .unwrap()
                .push(certificate.file_name().to_string());
            Ok(())
        }
    }

    fn write_answers(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    const DEMO_ANSWERS: &str = r#"{
        "ruc": "80012345",
        "tipo_contribuyente": 2,
        "company": { "razon_social": "Mi Empresa S.A." },
        "timbrado": { "timbrado": "12345678" },
        "sifen_environment": "demo"
    }"#;

    #[test]
    fn answers_apply_defaults() {
        let file = write_answers(r#"{ "ruc": "1234567" }"#);
        let answers = load_answers(file.path()).unwrap();
        assert_eq!(answers.tipo_contribuyente, TaxpayerKind::LegalEntity);
        assert_eq!(answers.establishment.code, "001");
        assert_eq!(answers.establishment.issuance_point, "001");
        assert_eq!(answers.sifen_environment, SifenEnvironment::Demo);
    }

    #[test]
    fn malformed_answers_report_path() {
        let file = write_answers("{ not json");
        let err = load_answers(file.path()).unwrap_err();
        assert!(err.to_string().contains("parsing answers file"));
    }

    #[test]
    fn empty_certificate_file_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(load_certificate(file.path()).is_err());
    }

    #[test]
    fn certificate_keeps_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("firma.p12");
        std::fs::write(&path, b"DER").unwrap();
        let cert = load_certificate(&path).unwrap();
        assert_eq!(cert.file_name(), "firma.p12");
        assert_eq!(cert.bytes(), b"DER");
    }

    #[tokio::test]
    async fn demo_setup_saves_once() {
        let file = write_answers(DEMO_ANSWERS);
        let backend = CountingBackend::default();

        let outcome = run_setup(load_answers(file.path()).unwrap(), None, None, &backend)
            .await
            .unwrap();

        assert!(!outcome.certificate_uploaded);
        assert_eq!(outcome.config.contributor.ruc_dv, Some(0));
        assert_eq!(backend.saves.lock().unwrap().len(), 1);
        assert!(backend.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_ruc_names_first_step() {
        let answers: SetupAnswers =
            serde_json::from_str(&DEMO_ANSWERS.replace("80012345", "8001234X")).unwrap();
        let backend = CountingBackend::default();

        let err = run_setup(answers, None, None, &backend).await.unwrap_err();
        let chain = format!("{err:#}");
        assert!(chain.contains("step 1 (contributor)"), "{chain}");
        assert!(chain.contains("ruc must contain only digits"), "{chain}");
        assert!(backend.saves.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn prod_without_certificate_is_refused() {
        let answers: SetupAnswers =
            serde_json::from_str(&DEMO_ANSWERS.replace("\"demo\"", "\"prod\"")).unwrap();
        let backend = CountingBackend::default();

        let err = run_setup(answers, None, None, &backend).await.unwrap_err();
        assert!(err.to_string().contains("requires a digital certificate"));
        assert!(backend.saves.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn prod_with_certificate_uploads() {
        let answers: SetupAnswers =
            serde_json::from_str(&DEMO_ANSWERS.replace("\"demo\"", "\"prod\"")).unwrap();
        let backend = CountingBackend::default();
        let cert = Certificate::new("firma.p12", b"DER".to_vec()).unwrap();

        let outcome = run_setup(answers, Some(cert), Some("secreto".into()), &backend)
            .await
            .unwrap();
        assert!(outcome.certificate_uploaded);
        assert_eq!(*backend.uploads.lock().unwrap(), vec!["firma.p12".to_string()]);
    }

    #[tokio::test]
    async fn prod_without_password_reports_pending_certificate() {
        let answers: SetupAnswers =
            serde_json::from_str(&DEMO_ANSWERS.replace("\"demo\"", "\"prod\"")).unwrap();
        let backend = CountingBackend::default();
        let cert = Certificate::new("firma.p12", b"DER".to_vec()).unwrap();

        let outcome = run_setup(answers, Some(cert), None, &backend).await.unwrap();
        assert!(!outcome.certificate_uploaded);
        assert!(outcome.certificate_pending);
        assert_eq!(backend.saves.lock().unwrap().len(), 1);
        assert!(backend.uploads.lock().unwrap().is_empty());
    }
}

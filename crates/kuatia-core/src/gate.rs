//! Certificate requirement per SIFEN environment.

use crate::registration::SifenEnvironment;

/// Whether the selected environment needs a digital certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CertificateRequirement {
    pub certificate_required: bool,
}

/// `demo` never takes a certificate; `test` and `prod` sign invoices and
/// cannot be submitted without one.
pub fn certificate_requirement(env: SifenEnvironment) -> CertificateRequirement {
    CertificateRequirement {
        certificate_required: matches!(env, SifenEnvironment::Test | SifenEnvironment::Prod),
    }
}

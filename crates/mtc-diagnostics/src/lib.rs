//! # mtc-diagnostics
//!
//! Checks that a Mautic integration is configured and can reach the API.
//!
//! [`ConfigValidator::validate_configuration`] always runs every stage and
//! never fails; problems become entries in the [`DiagnosticResult`].
//!
//! | stage        | on failure                       |
//! |--------------|----------------------------------|
//! | connectivity | error, `success = false`         |
//! | forms access | error, `success = false`         |
//! | segments     | warning only                     |

mod report;
mod validator;

pub use report::{ConnectionDetails, ConnectionReport, DiagnosticResult};
pub use validator::ConfigValidator;

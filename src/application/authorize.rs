//! Role authorization for admin-only routes

use tracing::debug;

use crate::domain::claims::PrincipalClaims;
use crate::domain::errors::AdmissionError;
use crate::domain::routes::RouteCategory;

/// Pure role gate. Only AdminOnly routes require an elevated role; an
/// unparseable role claim is treated as insufficient.
pub fn authorize(
    category: RouteCategory,
    claims: &PrincipalClaims,
) -> Result<(), AdmissionError> {
    if category != RouteCategory::AdminOnly {
        return Ok(());
    }

    let role = claims
        .role()
        .map_err(|_| AdmissionError::InsufficientPrivileges)?;
    if !role.is_admin() {
        debug!(role = %role, "Non-admin principal on an admin-only path");
        return Err(AdmissionError::InsufficientPrivileges);
    }
    Ok(())
}

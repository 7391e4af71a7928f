//! Well-known role name constants.
//!
//! These match the `role` claim carried in access tokens issued by the
//! platform's identity service.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_CONSULTOR: &str = "consultor";
pub const ROLE_DOCENTE: &str = "docente";
pub const ROLE_DIRECTIVO: &str = "directivo";

/// Roles allowed to author, publish, archive and delete assessment templates.
pub const TEMPLATE_ADMIN_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_CONSULTOR];

/// Whether `role` may use the assessment builder.
pub fn can_manage_templates(role: &str) -> bool {
    TEMPLATE_ADMIN_ROLES.contains(&role)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_and_consultor_manage_templates() {
        assert!(can_manage_templates(ROLE_ADMIN));
        assert!(can_manage_templates(ROLE_CONSULTOR));
    }

    #[test]
    fn teaching_roles_cannot_manage_templates() {
        assert!(!can_manage_templates(ROLE_DOCENTE));
        assert!(!can_manage_templates(ROLE_DIRECTIVO));
        assert!(!can_manage_templates(""));
    }
}

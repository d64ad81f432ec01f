//! JWT claims and role flags.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Role flags of a user account.
///
/// A user may hold several flags at once. Access checks are single lookups
/// (or short disjunctions) over these fields; there is no role table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RoleFlags {
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_admin: bool,
    pub is_teacher: bool,
    pub is_student: bool,
    pub is_guardian: bool,
}

impl RoleFlags {
    pub fn superuser() -> Self {
        Self {
            is_staff: true,
            is_superuser: true,
            ..Self::default()
        }
    }

    pub fn admin() -> Self {
        Self {
            is_admin: true,
            ..Self::default()
        }
    }

    pub fn teacher() -> Self {
        Self {
            is_teacher: true,
            ..Self::default()
        }
    }

    pub fn student() -> Self {
        Self {
            is_student: true,
            ..Self::default()
        }
    }

    pub fn guardian() -> Self {
        Self {
            is_guardian: true,
            ..Self::default()
        }
    }

    /// School or system administration: PIN issuance, user creation.
    pub fn has_admin_access(&self) -> bool {
        self.is_superuser || self.is_staff || self.is_admin
    }

    pub fn has_teacher_access(&self) -> bool {
        self.is_staff || self.is_teacher
    }

    pub fn has_student_access(&self) -> bool {
        self.is_staff || self.is_student
    }

    /// Guardians see what students see.
    pub fn has_guardian_access(&self) -> bool {
        self.is_staff || self.is_student || self.is_guardian
    }
}

/// JWT claims for access tokens.
///
/// - `sub`: User ID
/// - `school_id`: Owning school (None for accounts outside any school)
/// - `roles`: Role flags at the time the token was issued
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub school_id: Option<Uuid>,
    pub roles: RoleFlags,
    /// Expiration (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

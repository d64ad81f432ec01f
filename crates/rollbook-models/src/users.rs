//! User domain models and DTOs.

use chrono::{DateTime, Utc};
use rollbook_auth::RoleFlags;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::ids::{SchoolId, UserId};

/// A user account.
///
/// The password hash is never loaded into this struct; queries select the
/// columns below explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_admin: bool,
    pub is_teacher: bool,
    pub is_student: bool,
    pub is_guardian: bool,
    pub school_id: Option<SchoolId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Column list matching [`User`], for `SELECT` and `RETURNING` clauses.
    pub const COLUMNS: &'static str = "id, email, first_name, last_name, is_active, is_staff, \
         is_superuser, is_admin, is_teacher, is_student, is_guardian, school_id, created_at, \
         updated_at";

    pub fn roles(&self) -> RoleFlags {
        RoleFlags {
            is_staff: self.is_staff,
            is_superuser: self.is_superuser,
            is_admin: self.is_admin,
            is_teacher: self.is_teacher,
            is_student: self.is_student,
            is_guardian: self.is_guardian,
        }
    }
}

/// Role an administrator may grant when creating a user.
///
/// Superuser and staff status are only granted from the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AssignableRole {
    Admin,
    Teacher,
    Student,
    Guardian,
}

impl AssignableRole {
    pub fn apply(roles: &[AssignableRole]) -> RoleFlags {
        let mut flags = RoleFlags::default();
        for role in roles {
            match role {
                AssignableRole::Admin => flags.is_admin = true,
                AssignableRole::Teacher => flags.is_teacher = true,
                AssignableRole::Student => flags.is_student = true,
                AssignableRole::Guardian => flags.is_guardian = true,
            }
        }
        flags
    }
}

/// DTO for creating a user inside the caller's school.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUserDto {
    #[validate(email, length(max = 64))]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    #[validate(length(min = 1, max = 32))]
    pub first_name: String,
    #[validate(length(min = 1, max = 32))]
    pub last_name: String,
    #[serde(default)]
    pub roles: Vec<AssignableRole>,
}

/// DTO for updating the caller's own profile. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileDto {
    #[validate(email, length(max = 64))]
    pub email: Option<String>,
    #[validate(length(min = 8))]
    pub password: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub last_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assignable_roles_to_flags() {
        let flags = AssignableRole::apply(&[AssignableRole::Teacher, AssignableRole::Guardian]);
        assert!(flags.is_teacher);
        assert!(flags.is_guardian);
        assert!(!flags.is_admin);
        assert!(!flags.is_superuser);
    }

    #[test]
    fn test_create_user_roles_default_empty() {
        let dto: CreateUserDto = serde_json::from_str(
            r#"{"email":"t@school.test","password":"password123","first_name":"Ada","last_name":"L"}"#,
        )
        .unwrap();
        assert!(dto.roles.is_empty());
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn test_unknown_role_rejected() {
        let result: Result<CreateUserDto, _> = serde_json::from_str(
            r#"{"email":"t@school.test","password":"password123","first_name":"A","last_name":"L","roles":["superuser"]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_update_profile_validation() {
        let dto = UpdateProfileDto {
            email: Some("not-an-email".to_string()),
            ..Default::default()
        };
        assert!(dto.validate().is_err());
        assert!(UpdateProfileDto::default().validate().is_ok());
    }

    #[test]
    fn test_create_user_name_too_long() {
        let dto = CreateUserDto {
            email: "t@school.test".to_string(),
            password: "password123".to_string(),
            first_name: "a".repeat(33),
            last_name: "b".repeat(33),
            roles: Vec::new(),
        };
        let errors = dto.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("first_name"));
        assert!(errors.field_errors().contains_key("last_name"));
    }

    #[test]
    fn test_update_profile_respects_column_widths() {
        let long_email = format!("{}@school.test", "a".repeat(60));
        let dto = UpdateProfileDto {
            email: Some(long_email),
            ..Default::default()
        };
        assert!(dto.validate().unwrap_err().field_errors().contains_key("email"));

        let dto = UpdateProfileDto {
            first_name: Some("a".repeat(33)),
            ..Default::default()
        };
        assert!(dto.validate().unwrap_err().field_errors().contains_key("first_name"));

        let dto = UpdateProfileDto {
            last_name: Some("b".repeat(32)),
            ..Default::default()
        };
        assert!(dto.validate().is_ok());
    }
}

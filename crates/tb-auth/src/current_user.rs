//! Resolved authenticated user

use tb_core::traits::{Id, UserContext};

use crate::jwt::{Claims, JwtError};
use crate::role::Role;

/// The actor resolved from a verified token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: Id,
    pub role: Role,
}

impl CurrentUser {
    pub fn from_claims(claims: &Claims) -> Result<Self, JwtError> {
        let id: Id = claims
            .sub
            .parse()
            .map_err(|_| JwtError::Invalid(format!("non-numeric subject: {}", claims.sub)))?;
        Ok(Self {
            id,
            role: claims.role,
        })
    }
}

impl UserContext for CurrentUser {
    fn user_id(&self) -> Id {
        self.id
    }

    fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    fn is_team_lead(&self) -> bool {
        self.role.is_team_lead()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_claims() {
        let claims = Claims {
            sub: "42".into(),
            exp: 0,
            iat: 0,
            role: Role::Admin,
        };
        let user = CurrentUser::from_claims(&claims).unwrap();
        assert_eq!(user.user_id(), 42);
        assert!(user.is_admin());
        assert!(!user.is_team_lead());
    }

    #[test]
    fn test_bad_subject() {
        let claims = Claims {
            sub: "not-a-number".into(),
            exp: 0,
            iat: 0,
            role: Role::Member,
        };
        assert!(CurrentUser::from_claims(&claims).is_err());
    }
}

// JWT minting and verification

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use vidra_commons::constants::TOKEN_ISSUER;
use vidra_commons::{MemberId, Role};

use crate::error::{AuthError, AuthResult};

/// Claims carried by a Vidra bearer token.
///
/// The member's external id travels as `user_id`. `exp` mirrors the
/// session TTL at mint time but is advisory only; `reconnect` extends
/// the cache without rotating the token, so the two may diverge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user_id: MemberId,
    pub role: Role,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

/// Mint a signed HS256 token for a member.
pub fn mint_token(
    member_id: &MemberId,
    role: Role,
    secret: &str,
    ttl_secs: u64,
) -> AuthResult<String> {
    let now = Utc::now();
    let claims = TokenClaims {
        user_id: member_id.clone(),
        role,
        iss: TOKEN_ISSUER.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::seconds(ttl_secs as i64)).timestamp(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::InvalidToken(format!("encoding error: {e}")))
}

/// Verify a token's signature and claims, rejecting any algorithm but
/// HS256 and any issuer but ours.
///
/// Expiry is validated with zero leeway. A valid result proves the
/// member service signed the token; it does not prove the session is
/// still live.
pub fn verify_token(token: &str, secret: &str) -> AuthResult<TokenClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_issuer(&[TOKEN_ISSUER]);

    decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| AuthError::InvalidToken(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_mint_and_verify_round_trip() {
        let member = MemberId::generate();
        let token = mint_token(&member, Role::Member, SECRET, 3600).unwrap();
        let claims = verify_token(&token, SECRET).unwrap();
        assert_eq!(claims.user_id, member);
        assert_eq!(claims.role, Role::Member);
        assert_eq!(claims.iss, TOKEN_ISSUER);
        assert!(claims.exp - claims.iat == 3600);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = mint_token(&MemberId::generate(), Role::Member, SECRET, 3600).unwrap();
        assert!(matches!(
            verify_token(&token, "other-secret"),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        assert!(verify_token("not.a.token", SECRET).is_err());
        assert!(verify_token("", SECRET).is_err());
    }
}

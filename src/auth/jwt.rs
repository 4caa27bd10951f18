/// JWT Token Issuance and Verification
///
/// Access and refresh tokens are compact JWS strings signed with a single
/// shared HS256 secret. The verifier pins the algorithm itself and checks
/// expiry against an injected clock rather than the system time.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::auth::claims::{AccessClaims, Expiring, RefreshClaims};
use crate::auth::clock::Clock;
use crate::configuration::JwtSettings;
use crate::domain::UserRecord;
use crate::error::{ConfigError, TokenError};

const PINNED_ALGORITHM: Algorithm = Algorithm::HS256;
const PINNED_ALGORITHM_NAME: &str = "HS256";

/// Tokens handed back to the caller after login or refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token expiry (Unix timestamp)
    pub expire: i64,
}

/// Mints access/refresh token pairs
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    /// # Errors
    /// Returns a config error if the secret is missing or too short
    pub fn new(settings: &JwtSettings, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self {
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            access_token_expiry: settings.access_token_expiry,
            refresh_token_expiry: settings.refresh_token_expiry,
            clock,
        })
    }

    /// Sign a fresh access/refresh pair for `user`
    ///
    /// Both expiries are computed from a single clock reading.
    pub fn issue(&self, user: &UserRecord) -> Result<TokenPair, TokenError> {
        let now = self.clock.now();
        let access_claims =
            AccessClaims::for_user(user, expiry_from(now, self.access_token_expiry)?);
        let refresh_claims =
            RefreshClaims::for_user(user, expiry_from(now, self.refresh_token_expiry)?);

        let header = Header::new(PINNED_ALGORITHM);
        let access_token = encode(&header, &access_claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        let refresh_token = encode(&header, &refresh_claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expire: access_claims.exp,
        })
    }
}

fn expiry_from(now: i64, lifetime: i64) -> Result<i64, TokenError> {
    now.checked_add(lifetime)
        .ok_or_else(|| TokenError::Signing("token expiry out of range".to_string()))
}

/// Validates tokens minted by a `TokenIssuer` sharing the same secret
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

impl TokenVerifier {
    pub fn new(settings: &JwtSettings, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        settings.validate()?;

        let mut validation = Validation::new(PINNED_ALGORITHM);
        // Expiry is checked against `clock` below.
        validation.validate_exp = false;
        validation.leeway = 0;

        Ok(Self {
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
            validation,
            clock,
        })
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        self.verify(token)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        self.verify(token)
    }

    fn verify<T>(&self, token: &str) -> Result<T, TokenError>
    where
        T: DeserializeOwned + Expiring,
    {
        let alg = declared_algorithm(token)?;
        if alg != PINNED_ALGORITHM_NAME {
            tracing::warn!(alg = %alg, "Token declares unexpected algorithm");
            return Err(TokenError::WrongAlgorithm(alg));
        }

        let claims = decode::<T>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("JWT validation error: {}", e);
                match e.kind() {
                    ErrorKind::InvalidAlgorithm => {
                        TokenError::WrongAlgorithm(PINNED_ALGORITHM_NAME.to_string())
                    }
                    ErrorKind::ExpiredSignature => TokenError::Expired,
                    _ => TokenError::Invalid,
                }
            })?;

        if claims.is_expired_at(self.clock.now()) {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

/// Read `alg` from the header segment without trusting anything else in it
fn declared_algorithm(token: &str) -> Result<String, TokenError> {
    let mut segments = token.split('.');
    let header = match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(header), Some(_), Some(_), None) => header,
        _ => return Err(TokenError::Invalid),
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|_| TokenError::Invalid)?;
    let raw: RawHeader = serde_json::from_slice(&bytes).map_err(|_| TokenError::Invalid)?;
    Ok(raw.alg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::FixedClock;
    use uuid::Uuid;

    const NOW: i64 = 1_700_000_000;
    const DAY: i64 = 24 * 60 * 60;

    fn get_test_config() -> JwtSettings {
        JwtSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            access_token_expiry: DAY,
            refresh_token_expiry: DAY,
        }
    }

    fn user() -> UserRecord {
        UserRecord {
            id: Uuid::new_v4(),
            name: "Jon".to_string(),
            email: "jon@x.com".to_string(),
            password_hash: "hash".to_string(),
        }
    }

    fn pair(clock: &FixedClock) -> (TokenIssuer, TokenVerifier) {
        let config = get_test_config();
        let issuer = TokenIssuer::new(&config, Arc::new(clock.clone())).unwrap();
        let verifier = TokenVerifier::new(&config, Arc::new(clock.clone())).unwrap();
        (issuer, verifier)
    }

    fn forge(header: &str, claims: &str, signature: &str) -> String {
        format!(
            "{}.{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(claims),
            signature
        )
    }

    #[test]
    fn test_issue_and_verify() {
        let clock = FixedClock::new(NOW);
        let (issuer, verifier) = pair(&clock);
        let user = user();

        let tokens = issuer.issue(&user).expect("Failed to issue tokens");
        assert_eq!(tokens.expire, NOW + DAY);
        assert_ne!(tokens.access_token, tokens.refresh_token);

        let access = verifier.verify_access(&tokens.access_token).unwrap();
        assert_eq!(access, AccessClaims::for_user(&user, NOW + DAY));

        let refresh = verifier.verify_refresh(&tokens.refresh_token).unwrap();
        assert_eq!(refresh.email, user.email);
        assert_eq!(refresh.exp, NOW + DAY);
    }

    #[test]
    fn test_expiry_overflow_is_a_signing_error() {
        let clock = FixedClock::new(i64::MAX - 10);
        let (issuer, _) = pair(&clock);

        assert!(matches!(
            issuer.issue(&user()),
            Err(TokenError::Signing(_))
        ));
    }

    #[test]
    fn test_token_format() {
        let clock = FixedClock::new(NOW);
        let (issuer, _) = pair(&clock);
        let tokens = issuer.issue(&user()).unwrap();

        assert_eq!(tokens.access_token.split('.').count(), 3);
        assert_eq!(declared_algorithm(&tokens.access_token).unwrap(), "HS256");
        assert!(!tokens.refresh_token.contains('='));
    }

    #[test]
    fn test_expiry_with_fake_clock() {
        let clock = FixedClock::new(NOW);
        let (issuer, verifier) = pair(&clock);
        let tokens = issuer.issue(&user()).unwrap();

        clock.set(NOW + DAY);
        assert!(verifier.verify_refresh(&tokens.refresh_token).is_ok());

        clock.set(NOW + DAY + 1);
        assert_eq!(
            verifier.verify_refresh(&tokens.refresh_token),
            Err(TokenError::Expired)
        );
        assert_eq!(
            verifier.verify_access(&tokens.access_token),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_different_secret() {
        let clock = FixedClock::new(NOW);
        let (issuer, _) = pair(&clock);
        let tokens = issuer.issue(&user()).unwrap();

        let mut other = get_test_config();
        other.secret = "another-secret-key-at-least-32-characters".to_string();
        let verifier = TokenVerifier::new(&other, Arc::new(clock)).unwrap();

        assert_eq!(
            verifier.verify_refresh(&tokens.refresh_token),
            Err(TokenError::Invalid)
        );
    }

    #[test]
    fn test_tampered_token() {
        let clock = FixedClock::new(NOW);
        let (issuer, verifier) = pair(&clock);
        let tokens = issuer.issue(&user()).unwrap();

        let tampered = format!("{}X", tokens.access_token);
        assert_eq!(verifier.verify_access(&tampered), Err(TokenError::Invalid));
    }

    #[test]
    fn test_invalid_token() {
        let clock = FixedClock::new(NOW);
        let (_, verifier) = pair(&clock);

        for token in ["", "invalid.token.here", "a.b", "a.b.c.d"] {
            assert_eq!(
                verifier.verify_refresh(token),
                Err(TokenError::Invalid),
                "token {:?}",
                token
            );
        }
    }

    #[test]
    fn test_none_algorithm_rejected() {
        let clock = FixedClock::new(NOW);
        let (_, verifier) = pair(&clock);
        let claims = format!(r#"{{"email":"jon@x.com","exp":{}}}"#, NOW + DAY);

        let token = forge(r#"{"alg":"none","typ":"JWT"}"#, &claims, "");
        assert_eq!(
            verifier.verify_refresh(&token),
            Err(TokenError::WrongAlgorithm("none".to_string()))
        );
    }

    #[test]
    fn test_asymmetric_algorithm_rejected() {
        let clock = FixedClock::new(NOW);
        let (_, verifier) = pair(&clock);
        let claims = format!(r#"{{"email":"jon@x.com","exp":{}}}"#, NOW + DAY);

        let token = forge(r#"{"alg":"RS256","typ":"JWT"}"#, &claims, "c2ln");
        assert_eq!(
            verifier.verify_refresh(&token),
            Err(TokenError::WrongAlgorithm("RS256".to_string()))
        );
    }

    #[test]
    fn test_other_hmac_variant_rejected() {
        let clock = FixedClock::new(NOW);
        let (_, verifier) = pair(&clock);
        let config = get_test_config();
        let claims = RefreshClaims {
            email: "jon@x.com".to_string(),
            exp: NOW + DAY,
        };

        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap();

        assert_eq!(
            verifier.verify_refresh(&token),
            Err(TokenError::WrongAlgorithm("HS512".to_string()))
        );
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let clock = FixedClock::new(NOW);
        let (issuer, verifier) = pair(&clock);
        let tokens = issuer.issue(&user()).unwrap();

        assert_eq!(
            verifier.verify_access(&tokens.refresh_token),
            Err(TokenError::Invalid)
        );
    }

    #[test]
    fn test_rejects_weak_secret() {
        let mut config = get_test_config();
        config.secret = "short".to_string();

        assert!(TokenIssuer::new(&config, Arc::new(FixedClock::new(NOW))).is_err());
        assert!(TokenVerifier::new(&config, Arc::new(FixedClock::new(NOW))).is_err());
    }
}

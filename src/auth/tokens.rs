use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::{rngs::OsRng, Rng};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: i64,
    pub iat: i64,
}

/// HS256 signing and verification keys for access tokens. The current
/// instant is always passed in by the caller.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: TimeDuration,
}

impl JwtKeys {
    pub fn new(secret: &str, access_ttl_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl: TimeDuration::minutes(access_ttl_minutes),
        }
    }

    pub fn sign_access(&self, user_id: Uuid, now: OffsetDateTime) -> anyhow::Result<String> {
        let exp = now + self.access_ttl;
        let claims = Claims {
            sub: user_id,
            exp: exp.unix_timestamp(),
            iat: now.unix_timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "jwt signed");
        Ok(token)
    }

    /// Decodes and checks the token. Only HS256 signatures are accepted,
    /// and a token whose `exp` is at or before `now` is rejected with no
    /// leeway.
    pub fn verify_access(&self, token: &str, now: OffsetDateTime) -> anyhow::Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        // expiry is checked below against the caller's clock
        validation.validate_exp = false;
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        if data.claims.exp <= now.unix_timestamp() {
            anyhow::bail!("token expired");
        }
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

/// Six digit reset code, zero padded, drawn uniformly from the full
/// 000000..=999999 range.
pub fn generate_reset_code() -> String {
    let code: u32 = OsRng.gen_range(0..1_000_000);
    format!("{:06}", code)
}

#[cfg(test)]
mod jwt_tests {
    use super::*;
    use time::macros::datetime;

    fn make_keys() -> JwtKeys {
        JwtKeys::new("test-secret-key", 30)
    }

    #[test]
    fn sign_and_verify_access_token() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let now = datetime!(2024-05-01 12:00:00 UTC);
        let token = keys.sign_access(user_id, now).expect("sign access");
        let claims = keys.verify_access(&token, now).expect("verify token");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iat, now.unix_timestamp());
        assert_eq!(claims.exp, (now + TimeDuration::minutes(30)).unix_timestamp());
    }

    #[test]
    fn verify_rejects_token_at_expiry_instant() {
        let keys = make_keys();
        let now = datetime!(2024-05-01 12:00:00 UTC);
        let token = keys.sign_access(Uuid::new_v4(), now).expect("sign access");
        // one second before expiry still passes
        keys.verify_access(&token, now + TimeDuration::minutes(30) - TimeDuration::seconds(1))
            .expect("token should still be valid");
        // at expiry it does not
        let err = keys
            .verify_access(&token, now + TimeDuration::minutes(30))
            .unwrap_err();
        assert!(err.to_string().contains("expired"));
    }

    #[test]
    fn verify_rejects_tampered_token() {
        let keys = make_keys();
        let now = datetime!(2024-05-01 12:00:00 UTC);
        let mut token = keys.sign_access(Uuid::new_v4(), now).expect("sign access");
        let last = token.pop().expect("token is not empty");
        token.push(if last == 'A' { 'B' } else { 'A' });
        assert!(keys.verify_access(&token, now).is_err());
    }

    #[test]
    fn verify_rejects_foreign_key() {
        let signer = JwtKeys::new("one-secret", 30);
        let verifier = JwtKeys::new("another-secret", 30);
        let now = datetime!(2024-05-01 12:00:00 UTC);
        let token = signer.sign_access(Uuid::new_v4(), now).expect("sign access");
        assert!(verifier.verify_access(&token, now).is_err());
    }

    #[test]
    fn verify_rejects_other_algorithms() {
        let keys = make_keys();
        let now = datetime!(2024-05-01 12:00:00 UTC);
        let claims = Claims {
            sub: Uuid::new_v4(),
            exp: (now + TimeDuration::minutes(30)).unix_timestamp(),
            iat: now.unix_timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret("test-secret-key".as_bytes()),
        )
        .expect("sign hs384");
        assert!(keys.verify_access(&token, now).is_err());
    }
}

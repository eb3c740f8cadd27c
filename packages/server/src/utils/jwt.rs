use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// Claims read from bearer tokens issued by the identity provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Stable user id.
    pub sub: String,
    #[serde(default)]
    pub role: Option<String>,
    pub exp: usize,
}

/// Sign a token for `user_id`. Used by tooling and tests; production
/// tokens come from the identity provider.
pub fn sign(
    secret: &str,
    user_id: &str,
    role: Option<&str>,
    ttl: chrono::Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: user_id.to_owned(),
        role: role.map(str::to_owned),
        exp: (chrono::Utc::now() + ttl).timestamp().max(0) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Verify signature and expiry, then decode the claims.
pub fn verify(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

//! JWT verification for the WebSocket upgrade

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::game::PlayerIdentity;
use crate::util::time::unix_millis;
use crate::ws::ingress::sanitize_display_name;

type HmacSha256 = Hmac<Sha256>;

/// Claims issued by the account service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Account id
    pub sub: Uuid,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Selected cosmetic
    #[serde(default)]
    pub cosmetic: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

impl JwtClaims {
    /// Identity handed to the room registry
    pub fn into_identity(self) -> PlayerIdentity {
        let display_name = sanitize_display_name(self.name.as_deref(), &self.sub);
        let cosmetic = self
            .cosmetic
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "default".to_string());
        PlayerIdentity {
            account_id: self.sub,
            display_name,
            cosmetic,
        }
    }
}

/// Verify an HS256 token and extract its claims
pub fn verify_jwt(token: &str, secret: &str) -> Result<JwtClaims, AuthError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(AuthError::InvalidToken);
    }
    let (header_b64, payload_b64, signature_b64) = (parts[0], parts[1], parts[2]);

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| AuthError::InvalidToken)?;
    mac.update(header_b64.as_bytes());
    mac.update(b".");
    mac.update(payload_b64.as_bytes());

    let provided_signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AuthError::InvalidToken)?;
    mac.verify_slice(&provided_signature)
        .map_err(|_| AuthError::InvalidToken)?;

    let payload_json = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| AuthError::InvalidToken)?;
    let claims: JwtClaims =
        serde_json::from_slice(&payload_json).map_err(|_| AuthError::InvalidToken)?;

    if claims.exp < unix_millis() / 1000 {
        return Err(AuthError::TokenExpired);
    }

    Ok(claims)
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, self.to_string()).into_response()
    }
}

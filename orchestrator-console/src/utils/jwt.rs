use anyhow::Result;
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "companyCode", alias = "cmp")]
    pub company_code: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
}

/// Decode JWT claims without validation
///
/// The token is received straight from the ERP backend's login endpoint and
/// is only read to label the session. The backend verifies it on every call.
pub fn decode_jwt_claims(token: &str) -> Result<JwtClaims> {
    let parts: Vec<&str> = token.split('.').collect();

    if parts.len() != 3 {
        return Err(anyhow::anyhow!("Invalid JWT format"));
    }

    let payload = general_purpose::URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|e| anyhow::anyhow!("Failed to decode JWT payload: {}", e))?;

    let claims: JwtClaims = serde_json::from_slice(&payload)
        .map_err(|e| anyhow::anyhow!("Failed to parse JWT claims: {}", e))?;

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with(payload: serde_json::Value) -> String {
        let header = general_purpose::URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{}.{}.signature", header, body)
    }

    #[test]
    fn test_decode_jwt_claims() {
        let token = token_with(serde_json::json!({
            "sub": "accountant@bbp.example",
            "companyCode": "BBP",
            "exp": 9999999999i64
        }));

        let claims = decode_jwt_claims(&token).unwrap();
        assert_eq!(claims.sub, "accountant@bbp.example");
        assert_eq!(claims.company_code.as_deref(), Some("BBP"));
        assert_eq!(claims.email, None);
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert!(decode_jwt_claims("not-a-jwt").is_err());
        assert!(decode_jwt_claims("a.!!!.c").is_err());
    }
}

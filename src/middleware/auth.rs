use crate::chain::{HandlerResult, Next, Step};
use crate::request::Request;
use crate::response::Response;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::{json, Value};
use tracing::{debug, warn};

/// Claims of a verified bearer token, stored in `Request::extensions`.
#[derive(Debug, Clone, PartialEq)]
pub struct JwtClaims(pub Value);

/// Bearer token verification step.
///
/// Rejections are 401 with one of:
///
/// - `Missing Authorization Header`
/// - `Invalid Authorization Header` (scheme is not `Bearer`)
/// - `Missing Token in Authorization Header`
/// - `Unauthorized` (signature, expiry or claim check failed)
///
/// Tokens must carry `exp` unless [`JwtVerify::require_exp`] turns that off;
/// an `exp` that is present is always checked.
pub struct JwtVerify {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerify {
    /// HS256 verification with a shared secret.
    #[must_use]
    pub fn hs256(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);
        JwtVerify {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Whether tokens without an `exp` claim are rejected. Defaults to true.
    #[must_use]
    pub fn require_exp(mut self, required: bool) -> Self {
        if required {
            self.validation.required_spec_claims.insert("exp".to_string());
        } else {
            self.validation.required_spec_claims.remove("exp");
        }
        self
    }

    #[must_use]
    pub fn with_leeway(mut self, secs: u64) -> Self {
        self.validation.leeway = secs;
        self
    }

    #[must_use]
    pub fn with_issuer(mut self, iss: &str) -> Self {
        self.validation.set_issuer(&[iss]);
        self
    }

    #[must_use]
    pub fn with_audience(mut self, aud: &str) -> Self {
        self.validation.set_audience(&[aud]);
        self
    }

    fn reject(req: &Request, res: &mut Response, reason: &'static str) -> HandlerResult {
        debug!(
            request_id = %req.request_id,
            path = %req.path,
            reason = reason,
            "Bearer authentication rejected"
        );
        res.status(401).json(json!({ "error": reason }));
        Ok(())
    }
}

impl Step for JwtVerify {
    fn handle(&self, req: &mut Request, res: &mut Response, next: Next<'_>) -> HandlerResult {
        let Some(header) = req.header("authorization") else {
            return Self::reject(req, res, "Missing Authorization Header");
        };
        let mut parts = header.split(' ');
        if parts.next() != Some("Bearer") {
            return Self::reject(req, res, "Invalid Authorization Header");
        }
        let token = match parts.next() {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => return Self::reject(req, res, "Missing Token in Authorization Header"),
        };

        match decode::<Value>(&token, &self.key, &self.validation) {
            Ok(data) => {
                req.extensions.insert(JwtClaims(data.claims));
                next.run(req, res)
            }
            Err(e) => {
                warn!(
                    request_id = %req.request_id,
                    path = %req.path,
                    error = %e,
                    "JWT verification failed"
                );
                Self::reject(req, res, "Unauthorized")
            }
        }
    }
}

use crate::config::JwtConfig;
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::{ready, Ready};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;

/// External identity of the caller, taken from the token's `sub` claim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity(pub String);

impl Identity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
}

/// Verifies bearer tokens against the configured key
pub struct JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtValidator {
    /// RS256 when a public key is configured, HS256 otherwise
    pub fn from_config(config: &JwtConfig) -> Result<Self, String> {
        let (key, algorithm) = match (&config.public_key_pem, &config.hs256_secret) {
            (Some(pem), _) => (
                DecodingKey::from_rsa_pem(pem.as_bytes())
                    .map_err(|e| format!("Invalid JWT_PUBLIC_KEY_PEM: {}", e))?,
                Algorithm::RS256,
            ),
            (None, Some(secret)) => (DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256),
            (None, None) => return Err("no JWT verification key configured".to_string()),
        };

        let mut validation = Validation::new(algorithm);
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }
        Ok(Self { key, validation })
    }

    pub fn validate(&self, token: &str) -> Result<Identity, jsonwebtoken::errors::Error> {
        let data = decode::<Claims>(token, &self.key, &self.validation)?;
        Ok(Identity(data.claims.sub))
    }
}

/// JWT Authentication Middleware
pub struct JwtAuthMiddleware {
    validator: Arc<JwtValidator>,
}

impl JwtAuthMiddleware {
    pub fn new(validator: Arc<JwtValidator>) -> Self {
        Self { validator }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = JwtAuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthMiddlewareService {
            service: Rc::new(service),
            validator: Arc::clone(&self.validator),
        }))
    }
}

pub struct JwtAuthMiddlewareService<S> {
    service: Rc<S>,
    validator: Arc<JwtValidator>,
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let validator = self.validator.clone();

        Box::pin(async move {
            let auth_header = req
                .headers()
                .get("Authorization")
                .and_then(|h| h.to_str().ok())
                .ok_or_else(|| {
                    actix_web::error::ErrorUnauthorized("Missing Authorization header")
                })?;

            let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
                actix_web::error::ErrorUnauthorized("Invalid Authorization header format")
            })?;

            let identity = validator.validate(token).map_err(|e| {
                tracing::warn!("JWT validation failed: {}", e);
                actix_web::error::ErrorUnauthorized(format!("Invalid token: {}", e))
            })?;

            if identity.0.trim().is_empty() {
                return Err(actix_web::error::ErrorUnauthorized(
                    "Invalid token: empty subject",
                ));
            }

            req.extensions_mut().insert(identity);
            service.call(req).await
        })
    }
}

impl actix_web::FromRequest for Identity {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(
        req: &actix_web::HttpRequest,
        _payload: &mut actix_web::dev::Payload,
    ) -> Self::Future {
        match req.extensions().get::<Identity>() {
            Some(identity) => ready(Ok(identity.clone())),
            None => ready(Err(actix_web::error::ErrorUnauthorized(
                "User not authenticated",
            ))),
        }
    }
}

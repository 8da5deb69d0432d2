// Credential manager: argon2 password hashing and signed bearer tokens.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{PublicUser, User};

/// Tokens expire 7 days after issuance; there is no refresh or rotation.
pub const TOKEN_TTL_SECS: i64 = 7 * 24 * 3600;

const MIN_PASSWORD_LENGTH: usize = 8;

/// JWT claims embedded in every issued token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub iat: u64,
    pub exp: u64,
    pub jti: String,
}

impl Claims {
    pub fn user_id(&self) -> AppResult<i64> {
        self.sub
            .parse()
            .map_err(|_| AppError::Unauthorized("Invalid token subject".to_string()))
    }
}

/// Successful register/login result: the public user plus a bearer token.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthSession {
    pub user: PublicUser,
    pub token: String,
}

pub struct AuthService {
    db: Arc<Database>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthService {
    pub fn new(db: Arc<Database>, jwt_secret: &str) -> Self {
        Self {
            db,
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
        }
    }

    #[instrument(skip(self, password))]
    pub async fn register(&self, name: &str, email: &str, password: &str) -> AppResult<AuthSession> {
        if name.trim().is_empty() {
            return Err(AppError::Validation("Name is required".to_string()));
        }
        if !email.contains('@') {
            return Err(AppError::Validation("A valid email is required".to_string()));
        }
        if password.len() < MIN_PASSWORD_LENGTH {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }

        // Exact-match duplicate check; the UNIQUE column backstops races.
        if self.db.find_user_by_email(email).await?.is_some() {
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }

        let password_hash = hash_password(password)?;
        let user = self.db.insert_user(name, email, &password_hash).await?;
        let token = self.signed_token(&user, TOKEN_TTL_SECS)?;

        info!("Registered user {} ({})", user.name, user.id);
        Ok(AuthSession {
            user: PublicUser::from(&user),
            token,
        })
    }

    /// Unknown email and wrong password fail identically so the response
    /// does not reveal which accounts exist.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> AppResult<AuthSession> {
        let user = self
            .db
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AppError::Unauthorized("Invalid credentials".to_string()));
        }

        let token = self.signed_token(&user, TOKEN_TTL_SECS)?;

        info!("User {} logged in", user.id);
        Ok(AuthSession {
            user: PublicUser::from(&user),
            token,
        })
    }

    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }

    fn signed_token(&self, user: &User, ttl_secs: i64) -> AppResult<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AppError::Internal(format!("Clock error: {}", e)))?
            .as_secs() as i64;

        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            iat: now as u64,
            exp: (now + ttl_secs).max(0) as u64,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }
}

fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;

    Ok(password_hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn service() -> AuthService {
        let db = Arc::new(Database::in_memory().await.unwrap());
        AuthService::new(db, "test-secret")
    }

    #[test]
    fn password_hash_verifies_and_rejects() {
        let hash = hash_password("hunter2hunter2").unwrap();
        assert!(verify_password("hunter2hunter2", &hash).unwrap());
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[tokio::test]
    async fn register_then_login_round_trips() {
        let auth = service().await;
        let registered = auth
            .register("Ana", "ana@x.com", "hunter2hunter2")
            .await
            .unwrap();
        assert_eq!(registered.user.email, "ana@x.com");

        let session = auth.login("ana@x.com", "hunter2hunter2").await.unwrap();
        let claims = auth.verify(&session.token).unwrap();
        assert_eq!(claims.user_id().unwrap(), registered.user.id);
        assert_eq!(claims.email, "ana@x.com");
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_fail_alike() {
        let auth = service().await;
        auth.register("Ana", "ana@x.com", "hunter2hunter2")
            .await
            .unwrap();

        let wrong = auth.login("ana@x.com", "not-the-password").await;
        let unknown = auth.login("ghost@x.com", "hunter2hunter2").await;

        for result in [wrong, unknown] {
            match result {
                Err(AppError::Unauthorized(msg)) => assert_eq!(msg, "Invalid credentials"),
                other => panic!("expected Unauthorized, got {:?}", other.map(|s| s.user)),
            }
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let auth = service().await;
        auth.register("Ana", "ana@x.com", "hunter2hunter2")
            .await
            .unwrap();

        let result = auth.register("Another", "ana@x.com", "hunter2hunter2").await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn tampered_token_is_rejected() {
        let auth = service().await;
        let session = auth
            .register("Ana", "ana@x.com", "hunter2hunter2")
            .await
            .unwrap();

        let mut token = session.token;
        token.push('x');
        assert!(matches!(
            auth.verify(&token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let auth = service().await;
        auth.register("Ana", "ana@x.com", "hunter2hunter2")
            .await
            .unwrap();
        let user = auth
            .db
            .find_user_by_email("ana@x.com")
            .await
            .unwrap()
            .unwrap();

        // Expiry far enough in the past to clear default validation leeway.
        let token = auth.signed_token(&user, -300).unwrap();
        assert!(matches!(
            auth.verify(&token),
            Err(AppError::Unauthorized(_))
        ));
    }
}

use secrecy::ExposeSecret;
use serde::Deserialize;
use sqlx::PgPool;

use crate::config::AdminCredentials;
use crate::db;
use crate::error::{AppError, FieldErrors};
use crate::models::user::{CreateUserData, User};
use crate::services::password::{self, PasswordError};
use crate::services::validators::{self, REQUIRED};

pub const MIN_PASSWORD_LEN: usize = 6;

const MAX_FIRST_NAME_LEN: usize = 30;
const MAX_LAST_NAME_LEN: usize = 150;

const EMAIL_CONSTRAINT: &str = "users_email_key";
const PHONE_NUMBER_CONSTRAINT: &str = "users_phone_number_key";

const EMAIL_TAKEN: &str = "user with this email already exists.";
const PHONE_NUMBER_TAKEN: &str = "user with this phone number already exists.";

#[derive(thiserror::Error, Debug)]
pub enum AccountError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Password hashing failed: {0}")]
    Password(#[from] PasswordError),

    #[error("Password task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Could not register user")]
    Invalid(FieldErrors),

    #[error("Please provide both email and password")]
    MissingCredentials,

    #[error("Username or password incorrect")]
    InvalidCredentials,
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Database(e) => AppError::Database(e),
            AccountError::Password(e) => AppError::Internal(e.into()),
            AccountError::Task(e) => AppError::Internal(e.into()),
            AccountError::Invalid(errors) => {
                AppError::validation("Could not register user", errors)
            }
            AccountError::MissingCredentials => AppError::bad_request(err.to_string()),
            AccountError::InvalidCredentials => AppError::Unauthorized(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterInput {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginInput {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Registration fields after validation and normalisation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

pub fn validate_registration(input: RegisterInput) -> Result<NewAccount, FieldErrors> {
    let mut errors = FieldErrors::new();

    let email = input.email.map(|e| validators::normalize_email(&e));
    match &email {
        None => errors.add("email", REQUIRED),
        Some(email) if !validators::is_valid_email(email) => {
            errors.add("email", "Enter a valid email address.")
        }
        _ => {}
    }

    match &input.password {
        None => errors.add("password", REQUIRED),
        Some(password) if password.chars().count() < MIN_PASSWORD_LEN => errors.add(
            "password",
            format!("Ensure this field has at least {MIN_PASSWORD_LEN} characters."),
        ),
        _ => {}
    }

    let first_name = input.first_name.map(|n| n.trim().to_string());
    check_name(&mut errors, "first_name", first_name.as_deref(), MAX_FIRST_NAME_LEN);
    let last_name = input.last_name.map(|n| n.trim().to_string());
    check_name(&mut errors, "last_name", last_name.as_deref(), MAX_LAST_NAME_LEN);

    let phone_number = input
        .phone_number
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());
    if let Some(phone) = &phone_number {
        if !validators::is_valid_phone_number(phone) {
            errors.add(
                "phone_number",
                "Phone number must be entered in the format: '+999999999'. Up to 15 digits allowed.",
            );
        }
    }

    let address = input
        .address
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty());

    match (email, input.password, first_name, last_name) {
        (Some(email), Some(password), Some(first_name), Some(last_name)) if errors.is_empty() => {
            Ok(NewAccount {
                email,
                password,
                first_name,
                last_name,
                phone_number,
                address,
            })
        }
        _ => Err(errors),
    }
}

fn check_name(errors: &mut FieldErrors, field: &str, value: Option<&str>, max_len: usize) {
    match value {
        None => errors.add(field, REQUIRED),
        Some(name) if !validators::is_valid_name(name) => errors.add(
            field,
            "Name must contain only alphabets, space and characters ',.-",
        ),
        Some(name) if name.chars().count() > max_len => errors.add(
            field,
            format!("Ensure this field has no more than {max_len} characters."),
        ),
        _ => {}
    }
}

// PBKDF2 is CPU-bound; run it on the blocking pool
async fn hash_password(plain: String) -> Result<String, AccountError> {
    let hash = tokio::task::spawn_blocking(move || password::hash_password(&plain)).await??;
    Ok(hash)
}

async fn verify_password(plain: String, stored: String) -> Result<bool, AccountError> {
    let matches =
        tokio::task::spawn_blocking(move || password::verify_password(&plain, &stored)).await??;
    Ok(matches)
}

/// Creates a passenger account
#[tracing::instrument(skip(pool, input))]
pub async fn register(pool: &PgPool, input: RegisterInput) -> Result<User, AccountError> {
    let account = validate_registration(input).map_err(AccountError::Invalid)?;

    let mut errors = FieldErrors::new();
    if User::find_by_email(pool, &account.email).await?.is_some() {
        errors.add("email", EMAIL_TAKEN);
    }
    if let Some(phone) = &account.phone_number {
        if User::phone_number_taken(pool, phone).await? {
            errors.add("phone_number", PHONE_NUMBER_TAKEN);
        }
    }
    errors.into_result().map_err(AccountError::Invalid)?;

    let password_hash = hash_password(account.password.clone()).await?;

    let data = CreateUserData {
        email: account.email,
        password_hash,
        first_name: account.first_name,
        last_name: account.last_name,
        phone_number: account.phone_number,
        address: account.address,
        is_admin: false,
    };

    let user = match User::create(pool, data).await {
        Ok(user) => user,
        // Lost a race against a concurrent registration
        Err(e) => {
            return Err(match db::violated_constraint(&e) {
                Some(EMAIL_CONSTRAINT) => {
                    AccountError::Invalid(FieldErrors::single("email", EMAIL_TAKEN))
                }
                Some(PHONE_NUMBER_CONSTRAINT) => AccountError::Invalid(FieldErrors::single(
                    "phone_number",
                    PHONE_NUMBER_TAKEN,
                )),
                _ => e.into(),
            })
        }
    };

    tracing::info!(user_id = %user.id, "User registered");
    Ok(user)
}

/// Checks email and password against the stored account
#[tracing::instrument(skip(pool, input))]
pub async fn authenticate(pool: &PgPool, input: LoginInput) -> Result<User, AccountError> {
    let (Some(email), Some(password)) = (input.email, input.password) else {
        return Err(AccountError::MissingCredentials);
    };

    let email = validators::normalize_email(&email);
    let Some(user) = User::find_by_email(pool, &email).await? else {
        tracing::debug!("Login attempt for unknown email");
        return Err(AccountError::InvalidCredentials);
    };

    if !verify_password(password, user.password_hash.clone()).await? {
        tracing::debug!(user_id = %user.id, "Login attempt with wrong password");
        return Err(AccountError::InvalidCredentials);
    }

    Ok(user)
}

/// Creates the configured admin account, or promotes and resets an existing one
pub async fn ensure_admin(pool: &PgPool, admin: &AdminCredentials) -> Result<User, AccountError> {
    let email = validators::normalize_email(&admin.email);
    let password_hash = hash_password(admin.password.expose_secret().clone()).await?;

    let user = match User::find_by_email(pool, &email).await? {
        Some(existing) => User::promote_to_admin(pool, existing.id, &password_hash).await?,
        None => {
            User::create(
                pool,
                CreateUserData {
                    email,
                    password_hash,
                    first_name: "Admin".to_string(),
                    last_name: "User".to_string(),
                    phone_number: None,
                    address: None,
                    is_admin: true,
                },
            )
            .await?
        }
    };

    tracing::info!(user_id = %user.id, email = %user.email, "Admin account ready");
    Ok(user)
}

use crate::{
    auth::{hash_password, user, verify_password, AuthService},
    entities::User,
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    SqlErr,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RegisterInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginInput {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileInput {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

/// Public view of a shopper account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserProfile {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            created_at: model.created_at,
        }
    }
}

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginSession {
    pub token: String,
    pub user: UserProfile,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Registration, login and profile management for shoppers
#[derive(Clone)]
pub struct AccountService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    auth: Arc<AuthService>,
}

impl AccountService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        auth: Arc<AuthService>,
    ) -> Self {
        Self {
            db,
            event_sender,
            auth,
        }
    }

    /// Creates an account. Emails are compared case-insensitively; a taken
    /// email yields `Conflict`.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterInput) -> Result<UserProfile, ServiceError> {
        input.validate()?;
        let email = normalize_email(&input.email);

        if self.find_by_email(&email).await?.is_some() {
            return Err(ServiceError::Conflict(
                "An account with this email already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let user_id = Uuid::new_v4();
        let model = user::ActiveModel {
            id: Set(user_id),
            name: Set(input.name.trim().to_string()),
            email: Set(email),
            password_hash: Set(hash_password(&input.password)?),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let user = model.insert(&*self.db).await.map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::Conflict("An account with this email already exists".to_string())
            } else {
                ServiceError::DatabaseError(e)
            }
        })?;

        self.event_sender
            .send_or_log(Event::UserRegistered(user_id))
            .await;

        info!(%user_id, "Registered user");
        Ok(user.into())
    }

    /// Checks the password and issues a session token.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login(&self, input: LoginInput) -> Result<LoginSession, ServiceError> {
        input.validate()?;
        let email = normalize_email(&input.email);

        let user = match self.find_by_email(&email).await? {
            Some(user) => user,
            None => {
                warn!("Login attempt for unknown email");
                return Err(ServiceError::InvalidLogin);
            }
        };

        verify_password(&input.password, &user.password_hash)?;

        let token = self.auth.generate_token(&user)?;
        info!(user_id = %user.id, "User logged in");

        Ok(LoginSession {
            token,
            user: user.into(),
        })
    }

    #[instrument(skip(self))]
    pub async fn profile(&self, user_id: Uuid) -> Result<UserProfile, ServiceError> {
        self.find_user(user_id).await.map(Into::into)
    }

    #[instrument(skip(self, input))]
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        input: UpdateProfileInput,
    ) -> Result<UserProfile, ServiceError> {
        input.validate()?;
        let existing = self.find_user(user_id).await?;

        let mut model: user::ActiveModel = existing.clone().into();

        if let Some(name) = input.name {
            model.name = Set(name.trim().to_string());
        }

        if let Some(email) = input.email {
            let email = normalize_email(&email);
            if email != existing.email {
                if self.find_by_email(&email).await?.is_some() {
                    return Err(ServiceError::Conflict(
                        "An account with this email already exists".to_string(),
                    ));
                }
                model.email = Set(email);
            }
        }

        model.updated_at = Set(Utc::now());
        let updated = model.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::UserProfileUpdated(user_id))
            .await;

        Ok(updated.into())
    }

    async fn find_user(&self, user_id: Uuid) -> Result<user::Model, ServiceError> {
        User::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, ServiceError> {
        Ok(User::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db)
            .await?)
    }
}

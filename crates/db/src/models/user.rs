use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    entities::user,
    types::{AccountStatus, UserRole},
};

#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("User not found")]
    NotFound,
    #[error("A user with this email already exists")]
    EmailTaken,
    #[error("Account is not in a state that permits this operation: {0}")]
    InvalidState(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: UserRole,
    pub account_status: AccountStatus,
    pub delete_scheduled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub display_name: String,
    pub role: Option<UserRole>,
}

impl User {
    fn from_model(model: user::Model) -> Self {
        Self {
            id: model.uuid,
            email: model.email,
            display_name: model.display_name,
            role: model.role,
            account_status: model.account_status,
            delete_scheduled_at: model.delete_scheduled_at.map(Into::into),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = user::Entity::find()
            .filter(user::Column::Uuid.eq(id))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    pub async fn find_all<C: ConnectionTrait>(db: &C) -> Result<Vec<Self>, DbErr> {
        let models = user::Entity::find()
            .order_by_desc(user::Column::CreatedAt)
            .all(db)
            .await?;
        Ok(models.into_iter().map(Self::from_model).collect())
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateUser,
        user_id: Uuid,
    ) -> Result<Self, UserError> {
        let email = data.email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(UserError::ValidationError(
                "A valid email address is required".to_string(),
            ));
        }

        let existing = user::Entity::find()
            .filter(user::Column::Email.eq(email.clone()))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(UserError::EmailTaken);
        }

        let now = Utc::now();
        let active = user::ActiveModel {
            uuid: Set(user_id),
            email: Set(email),
            display_name: Set(data.display_name.clone()),
            role: Set(data.role.clone().unwrap_or_default()),
            account_status: Set(AccountStatus::Active),
            delete_scheduled_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        Ok(Self::from_model(model))
    }

    /// Soft-delete: mark the account PENDING_DELETE and schedule permanent
    /// erasure after the grace period.
    pub async fn schedule_delete<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        grace: Duration,
    ) -> Result<Self, UserError> {
        let record = user::Entity::find()
            .filter(user::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(UserError::NotFound)?;

        if record.account_status == AccountStatus::PendingDelete {
            return Err(UserError::InvalidState(
                "Account is already scheduled for deletion".to_string(),
            ));
        }

        let now = Utc::now();
        let mut active: user::ActiveModel = record.into();
        active.account_status = Set(AccountStatus::PendingDelete);
        active.delete_scheduled_at = Set(Some((now + grace).into()));
        active.updated_at = Set(now.into());
        let updated = active.update(db).await?;
        Ok(Self::from_model(updated))
    }

    /// Undo a pending soft-delete before the grace period elapses.
    pub async fn cancel_delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Self, UserError> {
        let record = user::Entity::find()
            .filter(user::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(UserError::NotFound)?;

        if record.account_status != AccountStatus::PendingDelete {
            return Err(UserError::InvalidState(
                "Account is not scheduled for deletion".to_string(),
            ));
        }

        let mut active: user::ActiveModel = record.into();
        active.account_status = Set(AccountStatus::Active);
        active.delete_scheduled_at = Set(None);
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(db).await?;
        Ok(Self::from_model(updated))
    }

    /// Accounts whose soft-delete grace period has elapsed as of `now`.
    pub async fn find_past_grace<C: ConnectionTrait>(
        db: &C,
        now: DateTime<Utc>,
    ) -> Result<Vec<Self>, DbErr> {
        let models = user::Entity::find()
            .filter(user::Column::AccountStatus.eq(AccountStatus::PendingDelete))
            .filter(user::Column::DeleteScheduledAt.lte(now))
            .all(db)
            .await?;
        Ok(models.into_iter().map(Self::from_model).collect())
    }

    pub async fn hard_delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let result = user::Entity::delete_many()
            .filter(user::Column::Uuid.eq(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use super::*;

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let mut options = sea_orm::ConnectOptions::new("sqlite::memory:".to_string());
        options.max_connections(1);
        let db = Database::connect(options).await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn create_user(db: &sea_orm::DatabaseConnection, email: &str) -> User {
        User::create(
            db,
            &CreateUser {
                email: email.to_string(),
                display_name: "Test user".to_string(),
                role: Some(UserRole::Citizen),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let db = setup_db().await;
        create_user(&db, "citizen@example.org").await;

        let err = User::create(
            &db,
            &CreateUser {
                email: "Citizen@Example.org".to_string(),
                display_name: "Duplicate".to_string(),
                role: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, UserError::EmailTaken));
    }

    #[tokio::test]
    async fn retention_respects_grace_period() {
        let db = setup_db().await;
        let user = create_user(&db, "leaving@example.org").await;

        let scheduled = User::schedule_delete(&db, user.id, Duration::days(14))
            .await
            .unwrap();
        assert_eq!(scheduled.account_status, AccountStatus::PendingDelete);
        let deadline = scheduled.delete_scheduled_at.expect("deadline set");

        let due_early = User::find_past_grace(&db, deadline - Duration::days(1))
            .await
            .unwrap();
        assert!(due_early.is_empty());

        let due_late = User::find_past_grace(&db, deadline + Duration::days(1))
            .await
            .unwrap();
        assert_eq!(due_late.len(), 1);
        assert_eq!(due_late[0].id, user.id);

        assert_eq!(User::hard_delete(&db, user.id).await.unwrap(), 1);
        assert!(User::find_by_id(&db, user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cancel_delete_restores_account() {
        let db = setup_db().await;
        let user = create_user(&db, "stays@example.org").await;

        User::schedule_delete(&db, user.id, Duration::days(14))
            .await
            .unwrap();
        let restored = User::cancel_delete(&db, user.id).await.unwrap();
        assert_eq!(restored.account_status, AccountStatus::Active);
        assert!(restored.delete_scheduled_at.is_none());

        let err = User::cancel_delete(&db, user.id).await.unwrap_err();
        assert!(matches!(err, UserError::InvalidState(_)));
    }
}

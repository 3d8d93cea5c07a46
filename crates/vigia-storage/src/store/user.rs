use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use vigia_common::status::Role;
use vigia_common::types::{ActiveUserSummary, CreateUserRequest, UpdateUserRequest, User};

use crate::auth::hash_password;
use crate::entities::user::{self, Column, Entity};
use crate::error::{Result, StorageError};
use crate::store::{now, parse_column, present, required, Store};

fn to_user(m: user::Model) -> Result<User> {
    Ok(User {
        role: parse_column("users.role", &m.role)?,
        id: m.id,
        username: m.username,
        email: m.email,
        first_name: m.first_name,
        paternal_surname: m.paternal_surname,
        maternal_surname: m.maternal_surname,
        phone: m.phone,
        position: m.position,
        active: m.active,
        password_hash: m.password_hash,
        token_version: m.token_version,
        last_login_at: m.last_login_at.map(|t| t.with_timezone(&Utc)),
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    })
}

async fn username_taken<C: ConnectionTrait>(
    conn: &C,
    username: &str,
    except_id: Option<i32>,
) -> Result<bool> {
    let mut q = Entity::find().filter(Column::Username.eq(username));
    if let Some(id) = except_id {
        q = q.filter(Column::Id.ne(id));
    }
    Ok(q.count(conn).await? > 0)
}

async fn email_taken<C: ConnectionTrait>(
    conn: &C,
    email: &str,
    except_id: Option<i32>,
) -> Result<bool> {
    let mut q = Entity::find().filter(Column::Email.eq(email));
    if let Some(id) = except_id {
        q = q.filter(Column::Id.ne(id));
    }
    Ok(q.count(conn).await? > 0)
}

/// Takes the write lock by touching the row, then reads it back.
async fn claim_user<C: ConnectionTrait>(
    conn: &C,
    id: i32,
    ts: DateTime<FixedOffset>,
) -> Result<user::Model> {
    let touched = Entity::update_many()
        .col_expr(Column::UpdatedAt, Expr::value(ts))
        .filter(Column::Id.eq(id))
        .exec(conn)
        .await?;
    if touched.rows_affected == 0 {
        return Err(StorageError::not_found("user", id));
    }
    Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| StorageError::not_found("user", id))
}

fn holds_admin(model: &user::Model) -> bool {
    model.active && model.role == Role::Administrator.as_str()
}

/// Fails unless an active administrator other than `id` exists.
async fn ensure_other_admin<C: ConnectionTrait>(conn: &C, id: i32) -> Result<()> {
    let others = Entity::find()
        .filter(Column::Role.eq(Role::Administrator.as_str()))
        .filter(Column::Active.eq(true))
        .filter(Column::Id.ne(id))
        .count(conn)
        .await?;
    if others == 0 {
        return Err(StorageError::Conflict(
            "at least one active administrator is required".to_string(),
        ));
    }
    Ok(())
}

impl Store {
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let model = Entity::find()
            .filter(Column::Username.eq(username))
            .one(self.db())
            .await?;
        model.map(to_user).transpose()
    }

    pub async fn get_user_by_id(&self, id: i32) -> Result<Option<User>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        model.map(to_user).transpose()
    }

    pub async fn count_users(&self) -> Result<u64> {
        Ok(Entity::find().count(self.db()).await?)
    }

    pub async fn count_active_users(&self) -> Result<u64> {
        Ok(Entity::find()
            .filter(Column::Active.eq(true))
            .count(self.db())
            .await?)
    }

    /// Creates an account. Username and email must both be unused; a clash
    /// fails with [`StorageError::Conflict`] and writes nothing.
    pub async fn create_user(&self, req: &CreateUserRequest) -> Result<User> {
        let username = required("username", Some(req.username.as_str()))?;
        let password = required("password", Some(req.password.as_str()))?;
        let email = required("email", Some(req.email.as_str()))?;
        let first_name = required("first_name", Some(req.first_name.as_str()))?;
        let paternal_surname = required("paternal_surname", Some(req.paternal_surname.as_str()))?;

        if username_taken(self.db(), username, None).await? {
            return Err(StorageError::Conflict(format!(
                "username '{username}' is already taken"
            )));
        }
        if email_taken(self.db(), email, None).await? {
            return Err(StorageError::Conflict(format!(
                "email '{email}' is already registered"
            )));
        }

        let ts = now();
        let am = user::ActiveModel {
            username: Set(username.to_owned()),
            email: Set(email.to_owned()),
            first_name: Set(first_name.to_owned()),
            paternal_surname: Set(paternal_surname.to_owned()),
            maternal_surname: Set(present(req.maternal_surname.as_deref()).map(str::to_owned)),
            phone: Set(present(req.phone.as_deref()).map(str::to_owned)),
            position: Set(present(req.position.as_deref()).map(str::to_owned)),
            password_hash: Set(hash_password(password)?),
            role: Set(req.role.unwrap_or(Role::Clerk).as_str().to_owned()),
            active: Set(true),
            token_version: Set(0),
            last_login_at: Set(None),
            created_at: Set(ts),
            updated_at: Set(ts),
            ..Default::default()
        };
        let model = am.insert(self.db()).await?;
        tracing::info!(user_id = model.id, username = %model.username, "User created");
        to_user(model)
    }

    /// Lists accounts ordered by name. Inactive accounts are skipped unless
    /// `include_inactive` is set.
    pub async fn list_users(
        &self,
        include_inactive: bool,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<User>> {
        let mut q = Entity::find();
        if !include_inactive {
            q = q.filter(Column::Active.eq(true));
        }
        let rows = q
            .order_by(Column::FirstName, Order::Asc)
            .order_by(Column::PaternalSurname, Order::Asc)
            .order_by(Column::Id, Order::Asc)
            .limit(limit as u64)
            .offset(offset as u64)
            .all(self.db())
            .await?;
        rows.into_iter().map(to_user).collect()
    }

    pub async fn count_listed_users(&self, include_inactive: bool) -> Result<u64> {
        let mut q = Entity::find();
        if !include_inactive {
            q = q.filter(Column::Active.eq(true));
        }
        Ok(q.count(self.db()).await?)
    }

    /// Active accounts for assignment pickers, sorted by name.
    pub async fn list_active_user_summaries(&self) -> Result<Vec<ActiveUserSummary>> {
        let users = self.list_users(false, u32::MAX as usize, 0).await?;
        Ok(users
            .into_iter()
            .map(|u| ActiveUserSummary {
                display_name: u.display_name(),
                id: u.id,
                username: u.username,
                role: u.role,
            })
            .collect())
    }

    /// Applies the fields present in `req` on behalf of `acting_user_id`.
    ///
    /// Changing the password revokes every token issued to the account.
    /// Demoting the last active administrator is a [`StorageError::Conflict`].
    pub async fn update_user(
        &self,
        id: i32,
        acting_user_id: i32,
        req: &UpdateUserRequest,
    ) -> Result<User> {
        let ts = now();
        let txn = self.db().begin().await?;
        let model = claim_user(&txn, id, ts).await?;

        let mut am: user::ActiveModel = model.clone().into();

        if let Some(username) = req.username.as_deref() {
            let username = required("username", Some(username))?;
            if username != model.username {
                if username_taken(&txn, username, Some(id)).await? {
                    return Err(StorageError::Conflict(format!(
                        "username '{username}' is already taken"
                    )));
                }
                am.username = Set(username.to_owned());
            }
        }
        if let Some(email) = req.email.as_deref() {
            let email = required("email", Some(email))?;
            if email != model.email {
                if email_taken(&txn, email, Some(id)).await? {
                    return Err(StorageError::Conflict(format!(
                        "email '{email}' is already registered"
                    )));
                }
                am.email = Set(email.to_owned());
            }
        }
        if let Some(first_name) = req.first_name.as_deref() {
            am.first_name = Set(required("first_name", Some(first_name))?.to_owned());
        }
        if let Some(surname) = req.paternal_surname.as_deref() {
            am.paternal_surname = Set(required("paternal_surname", Some(surname))?.to_owned());
        }
        if let Some(maternal) = req.maternal_surname.as_deref() {
            am.maternal_surname = Set(present(Some(maternal)).map(str::to_owned));
        }
        if let Some(phone) = req.phone.as_deref() {
            am.phone = Set(present(Some(phone)).map(str::to_owned));
        }
        if let Some(position) = req.position.as_deref() {
            am.position = Set(present(Some(position)).map(str::to_owned));
        }
        if let Some(role) = req.role {
            if role != Role::Administrator && holds_admin(&model) {
                ensure_other_admin(&txn, id).await?;
            }
            am.role = Set(role.as_str().to_owned());
        }
        if let Some(password) = req.password.as_deref() {
            let password = required("password", Some(password))?;
            am.password_hash = Set(hash_password(password)?);
            am.token_version = Set(model.token_version + 1);
        }
        am.updated_at = Set(ts);

        let updated = am.update(&txn).await?;
        txn.commit().await?;
        tracing::info!(user_id = id, acting_user_id, "User updated");
        to_user(updated)
    }

    /// Soft-deletes an account: the row stays, `active` becomes false and
    /// outstanding tokens are revoked. Deactivating yourself is rejected, as
    /// is deactivating the last active administrator.
    pub async fn deactivate_user(&self, id: i32, acting_user_id: i32) -> Result<User> {
        if id == acting_user_id {
            return Err(StorageError::Validation(
                "you cannot deactivate your own account".to_string(),
            ));
        }
        let ts = now();
        let txn = self.db().begin().await?;
        let model = claim_user(&txn, id, ts).await?;
        if holds_admin(&model) {
            ensure_other_admin(&txn, id).await?;
        }
        let token_version = model.token_version;
        let mut am: user::ActiveModel = model.into();
        am.active = Set(false);
        am.token_version = Set(token_version + 1);
        am.updated_at = Set(ts);
        let updated = am.update(&txn).await?;
        txn.commit().await?;
        tracing::info!(user_id = id, acting_user_id, "User deactivated");
        to_user(updated)
    }

    /// Invalidates every token issued so far to the account.
    pub async fn bump_token_version(&self, id: i32) -> Result<()> {
        let bumped = Entity::update_many()
            .col_expr(Column::TokenVersion, Expr::col(Column::TokenVersion).add(1))
            .col_expr(Column::UpdatedAt, Expr::value(now()))
            .filter(Column::Id.eq(id))
            .exec(self.db())
            .await?;
        if bumped.rows_affected == 0 {
            return Err(StorageError::not_found("user", id));
        }
        Ok(())
    }
}

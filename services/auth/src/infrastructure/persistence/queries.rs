//! 行映射与连接级查询。
//!
//! 连接池仓储与事务内仓储共享同一套 SQL:所有函数都以
//! `&mut PgConnection` 为执行器,池化仓储先 `acquire`,事务仓储
//! 传入事务内的连接。

use chrono::{DateTime, Utc};
use janua_common::{AccountId, AuditInfo, Pagination};
use janua_errors::{AppError, AppResult};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::domain::{
    Account, AuditEventType, AuditRecord, AuditRecordId, FailedAttemptOutcome, Role, RoleId,
    RoleName, Session, SessionId,
};
use crate::domain::{Email, HashedPassword, Username};

#[derive(sqlx::FromRow)]
pub(crate) struct AccountRow {
    id: Uuid,
    username: String,
    email: String,
    display_name: Option<String>,
    password_hash: Option<String>,
    active: bool,
    locked: bool,
    failed_login_attempts: i32,
    last_login_at: Option<DateTime<Utc>>,
    email_verified: bool,
    oauth2_provider: Option<String>,
    oauth2_provider_id: Option<String>,
    created_at: DateTime<Utc>,
    created_by: Option<String>,
    updated_at: DateTime<Utc>,
    updated_by: Option<String>,
}

impl AccountRow {
    fn into_account(self, roles: Vec<Role>) -> AppResult<Account> {
        Ok(Account {
            id: AccountId::from_uuid(self.id),
            username: Username::new(self.username)?,
            email: Email::new(self.email)?,
            display_name: self.display_name,
            password_hash: self.password_hash.map(HashedPassword::from_hash),
            active: self.active,
            locked: self.locked,
            failed_login_attempts: self.failed_login_attempts,
            last_login_at: self.last_login_at,
            email_verified: self.email_verified,
            oauth2_provider: self.oauth2_provider,
            oauth2_provider_id: self.oauth2_provider_id,
            roles,
            audit: AuditInfo {
                created_at: self.created_at,
                created_by: self.created_by,
                updated_at: self.updated_at,
                updated_by: self.updated_by,
            },
        })
    }
}

#[derive(sqlx::FromRow)]
struct RoleRow {
    id: Uuid,
    name: String,
}

impl RoleRow {
    fn into_role(self) -> AppResult<Role> {
        Ok(Role {
            id: RoleId(self.id),
            name: RoleName::parse(&self.name)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    account_id: Uuid,
    token: String,
    login_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
    logout_at: Option<DateTime<Utc>>,
    active: bool,
    ip_address: Option<String>,
    user_agent: Option<String>,
}

impl SessionRow {
    fn into_session(self) -> Session {
        Session {
            id: SessionId(self.id),
            account_id: AccountId::from_uuid(self.account_id),
            token: self.token,
            login_at: self.login_at,
            last_activity_at: self.last_activity_at,
            logout_at: self.logout_at,
            active: self.active,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AuditRow {
    id: Uuid,
    username: String,
    event_type: String,
    success: bool,
    message: String,
    ip_address: Option<String>,
    user_agent: Option<String>,
    created_at: DateTime<Utc>,
}

impl AuditRow {
    fn into_record(self) -> AppResult<AuditRecord> {
        Ok(AuditRecord {
            id: AuditRecordId(self.id),
            username: self.username,
            event_type: AuditEventType::parse(&self.event_type)?,
            success: self.success,
            message: self.message,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            created_at: self.created_at,
        })
    }
}

const ACCOUNT_COLUMNS: &str = "id, username, email, display_name, password_hash, active, locked, \
     failed_login_attempts, last_login_at, email_verified, oauth2_provider, oauth2_provider_id, \
     created_at, created_by, updated_at, updated_by";

fn db_err(err: sqlx::Error) -> AppError {
    match err {
        sqlx::Error::Database(e) if e.is_unique_violation() => {
            AppError::conflict(format!("Unique constraint violated: {e}"))
        }
        other => AppError::database(other.to_string()),
    }
}

async fn find_account(
    conn: &mut PgConnection,
    sql: &str,
    param: &str,
) -> AppResult<Option<Account>> {
    let row = sqlx::query_as::<_, AccountRow>(sql)
        .bind(param)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_err)?;

    match row {
        Some(row) => {
            let roles = roles_for_account(conn, row.id).await?;
            Ok(Some(row.into_account(roles)?))
        }
        None => Ok(None),
    }
}

async fn roles_for_account(conn: &mut PgConnection, account_id: Uuid) -> AppResult<Vec<Role>> {
    let rows = sqlx::query_as::<_, RoleRow>(
        "SELECT r.id, r.name FROM roles r \
         JOIN account_roles ar ON ar.role_id = r.id \
         WHERE ar.account_id = $1 \
         ORDER BY r.name",
    )
    .bind(account_id)
    .fetch_all(conn)
    .await
    .map_err(db_err)?;

    rows.into_iter().map(RoleRow::into_role).collect()
}

pub(crate) async fn account_by_id(
    conn: &mut PgConnection,
    id: &AccountId,
) -> AppResult<Option<Account>> {
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
    let row = sqlx::query_as::<_, AccountRow>(&sql)
        .bind(id.0)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_err)?;

    match row {
        Some(row) => {
            let roles = roles_for_account(conn, row.id).await?;
            Ok(Some(row.into_account(roles)?))
        }
        None => Ok(None),
    }
}

pub(crate) async fn account_by_username(
    conn: &mut PgConnection,
    username: &str,
) -> AppResult<Option<Account>> {
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE username = $1");
    find_account(conn, &sql, username).await
}

pub(crate) async fn account_by_username_or_email(
    conn: &mut PgConnection,
    identifier: &str,
) -> AppResult<Option<Account>> {
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE username = $1 OR email = $1");
    find_account(conn, &sql, identifier).await
}

pub(crate) async fn account_by_email(
    conn: &mut PgConnection,
    email: &str,
) -> AppResult<Option<Account>> {
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1");
    find_account(conn, &sql, email).await
}

pub(crate) async fn account_exists_by_username(
    conn: &mut PgConnection,
    username: &str,
) -> AppResult<bool> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM accounts WHERE username = $1)")
        .bind(username)
        .fetch_one(conn)
        .await
        .map_err(db_err)
}

pub(crate) async fn account_exists_by_email(
    conn: &mut PgConnection,
    email: &str,
) -> AppResult<bool> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM accounts WHERE email = $1)")
        .bind(email)
        .fetch_one(conn)
        .await
        .map_err(db_err)
}

pub(crate) async fn insert_account(conn: &mut PgConnection, account: &Account) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO accounts (id, username, email, display_name, password_hash, active, locked, \
         failed_login_attempts, last_login_at, email_verified, oauth2_provider, \
         oauth2_provider_id, created_at, created_by, updated_at, updated_by) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
    )
    .bind(account.id.0)
    .bind(account.username.as_str())
    .bind(account.email.as_str())
    .bind(&account.display_name)
    .bind(account.password_hash.as_ref().map(|h| h.as_str()))
    .bind(account.active)
    .bind(account.locked)
    .bind(account.failed_login_attempts)
    .bind(account.last_login_at)
    .bind(account.email_verified)
    .bind(&account.oauth2_provider)
    .bind(&account.oauth2_provider_id)
    .bind(account.audit.created_at)
    .bind(&account.audit.created_by)
    .bind(account.audit.updated_at)
    .bind(&account.audit.updated_by)
    .execute(&mut *conn)
    .await
    .map_err(db_err)?;

    for role in &account.roles {
        sqlx::query("INSERT INTO account_roles (account_id, role_id) VALUES ($1, $2)")
            .bind(account.id.0)
            .bind(role.id.0)
            .execute(&mut *conn)
            .await
            .map_err(db_err)?;
    }

    Ok(())
}

/// 更新账户的可变字段。角色在注册后不变,不在这里维护。
pub(crate) async fn update_account(conn: &mut PgConnection, account: &Account) -> AppResult<()> {
    sqlx::query(
        "UPDATE accounts SET email = $2, display_name = $3, password_hash = $4, active = $5, \
         locked = $6, failed_login_attempts = $7, last_login_at = $8, email_verified = $9, \
         oauth2_provider = $10, oauth2_provider_id = $11, updated_at = $12, updated_by = $13 \
         WHERE id = $1",
    )
    .bind(account.id.0)
    .bind(account.email.as_str())
    .bind(&account.display_name)
    .bind(account.password_hash.as_ref().map(|h| h.as_str()))
    .bind(account.active)
    .bind(account.locked)
    .bind(account.failed_login_attempts)
    .bind(account.last_login_at)
    .bind(account.email_verified)
    .bind(&account.oauth2_provider)
    .bind(&account.oauth2_provider_id)
    .bind(account.audit.updated_at)
    .bind(&account.audit.updated_by)
    .execute(conn)
    .await
    .map_err(db_err)?;

    Ok(())
}

#[derive(sqlx::FromRow)]
struct FailedAttemptRow {
    failed_login_attempts: i32,
    locked: bool,
    locked_now: bool,
}

/// 失败计数的原子更新。
///
/// 一条 UPDATE 同时完成计数与锁定判定,不存在读改写窗口:并发的
/// 失败登录各自拿到递增后的计数,恰好命中阈值的那一次得到
/// `locked_now = true`。
pub(crate) async fn record_failed_attempt(
    conn: &mut PgConnection,
    account_id: &AccountId,
    threshold: i32,
) -> AppResult<FailedAttemptOutcome> {
    let row = sqlx::query_as::<_, FailedAttemptRow>(
        "UPDATE accounts SET \
             failed_login_attempts = failed_login_attempts + 1, \
             locked = locked OR failed_login_attempts + 1 >= $2, \
             updated_at = NOW() \
         WHERE id = $1 \
         RETURNING failed_login_attempts, locked, \
                   (locked AND failed_login_attempts = $2) AS locked_now",
    )
    .bind(account_id.0)
    .bind(threshold)
    .fetch_optional(conn)
    .await
    .map_err(db_err)?
    .ok_or_else(|| AppError::not_found(format!("Account {account_id} not found")))?;

    Ok(FailedAttemptOutcome {
        attempts: row.failed_login_attempts,
        locked: row.locked,
        locked_now: row.locked_now,
    })
}

pub(crate) async fn role_by_name(
    conn: &mut PgConnection,
    name: &RoleName,
) -> AppResult<Option<Role>> {
    let row = sqlx::query_as::<_, RoleRow>("SELECT id, name FROM roles WHERE name = $1")
        .bind(name.as_str())
        .fetch_optional(conn)
        .await
        .map_err(db_err)?;

    row.map(RoleRow::into_role).transpose()
}

pub(crate) async fn insert_session(conn: &mut PgConnection, session: &Session) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO sessions (id, account_id, token, login_at, last_activity_at, logout_at, \
         active, ip_address, user_agent) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(session.id.0)
    .bind(session.account_id.0)
    .bind(&session.token)
    .bind(session.login_at)
    .bind(session.last_activity_at)
    .bind(session.logout_at)
    .bind(session.active)
    .bind(&session.ip_address)
    .bind(&session.user_agent)
    .execute(conn)
    .await
    .map_err(db_err)?;

    Ok(())
}

pub(crate) async fn session_by_token(
    conn: &mut PgConnection,
    token: &str,
) -> AppResult<Option<Session>> {
    let row = sqlx::query_as::<_, SessionRow>(
        "SELECT id, account_id, token, login_at, last_activity_at, logout_at, active, \
         ip_address, user_agent FROM sessions WHERE token = $1",
    )
    .bind(token)
    .fetch_optional(conn)
    .await
    .map_err(db_err)?;

    Ok(row.map(SessionRow::into_session))
}

pub(crate) async fn update_session(conn: &mut PgConnection, session: &Session) -> AppResult<()> {
    sqlx::query(
        "UPDATE sessions SET last_activity_at = $2, logout_at = $3, active = $4 WHERE id = $1",
    )
    .bind(session.id.0)
    .bind(session.last_activity_at)
    .bind(session.logout_at)
    .bind(session.active)
    .execute(conn)
    .await
    .map_err(db_err)?;

    Ok(())
}

pub(crate) async fn insert_audit_record(
    conn: &mut PgConnection,
    record: &AuditRecord,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO audit_log (id, username, event_type, success, message, ip_address, \
         user_agent, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(record.id.0)
    .bind(&record.username)
    .bind(record.event_type.as_str())
    .bind(record.success)
    .bind(&record.message)
    .bind(&record.ip_address)
    .bind(&record.user_agent)
    .bind(record.created_at)
    .execute(conn)
    .await
    .map_err(db_err)?;

    Ok(())
}

pub(crate) async fn audit_records_by_username(
    conn: &mut PgConnection,
    username: &str,
    pagination: &Pagination,
) -> AppResult<Vec<AuditRecord>> {
    let rows = sqlx::query_as::<_, AuditRow>(
        "SELECT id, username, event_type, success, message, ip_address, user_agent, created_at \
         FROM audit_log WHERE username = $1 \
         ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(username)
    .bind(pagination.page_size as i64)
    .bind(pagination.offset() as i64)
    .fetch_all(conn)
    .await
    .map_err(db_err)?;

    rows.into_iter().map(AuditRow::into_record).collect()
}

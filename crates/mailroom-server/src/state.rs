//! Shared application state handed to every handler.

use std::sync::Arc;

use mailroom_admin::{AuditService, DomainService, MailService, UserService};
use mailroom_auth::AuthService;
use mailroom_db::repository::{
    SurrealAuditLogRepository, SurrealDomainRepository, SurrealMessageRepository,
    SurrealSessionRepository, SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::any::Any;

use crate::config::ServerConfig;

pub type Auth = AuthService<
    SurrealUserRepository<Any>,
    SurrealSessionRepository<Any>,
    SurrealAuditLogRepository<Any>,
>;
pub type Users = UserService<SurrealUserRepository<Any>, SurrealDomainRepository<Any>>;
pub type Domains = DomainService<SurrealDomainRepository<Any>>;
pub type Mail = MailService<SurrealMessageRepository<Any>>;
pub type Audit = AuditService<SurrealAuditLogRepository<Any>>;

/// Session cookie attributes.
#[derive(Debug, Clone, Copy)]
pub struct CookieSettings {
    pub max_age_secs: u64,
    pub secure: bool,
}

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<Auth>,
    pub users: Arc<Users>,
    pub domains: Arc<Domains>,
    pub mail: Arc<Mail>,
    pub audit: Arc<Audit>,
    pub cookie: CookieSettings,
}

impl AppState {
    pub fn new(db: Surreal<Any>, config: &ServerConfig) -> Self {
        let users = SurrealUserRepository::new(db.clone());
        let domains = SurrealDomainRepository::new(db.clone());
        let audit = SurrealAuditLogRepository::new(db.clone());

        Self {
            auth: Arc::new(AuthService::new(
                users.clone(),
                SurrealSessionRepository::new(db.clone()),
                audit.clone(),
                config.auth.clone(),
            )),
            users: Arc::new(UserService::new(users, domains.clone(), config.auth.clone())),
            domains: Arc::new(DomainService::new(domains)),
            mail: Arc::new(MailService::new(
                SurrealMessageRepository::new(db),
                config.sender_domain.clone(),
            )),
            audit: Arc::new(AuditService::new(audit, config.audit_limit)),
            cookie: CookieSettings {
                max_age_secs: config.auth.session_lifetime_secs,
                secure: config.cookie_secure,
            },
        }
    }
}

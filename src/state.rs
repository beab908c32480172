use std::sync::Arc;

use crate::auth::PasswordHasher;
use crate::config::Config;
use crate::db::UserStore;
use crate::email::MailNotifier;
use crate::reset::TokenManager;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn UserStore>,
    pub mailer: Arc<dyn MailNotifier>,
    pub tokens: TokenManager,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn UserStore>,
        hasher: Arc<dyn PasswordHasher>,
        mailer: Arc<dyn MailNotifier>,
    ) -> Self {
        let tokens = TokenManager::new(store.clone(), hasher, config.token_ttl);
        Self {
            config,
            store,
            mailer,
            tokens,
        }
    }
}

use std::sync::Arc;

use crate::db::OrmConn;

#[derive(Clone)]
pub struct AppState {
    pub orm: OrmConn,
    pub auth: Arc<AuthSettings>,
}

/// Token signing settings shared by the login service and the request extractor.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

impl AppState {
    pub fn new(orm: OrmConn, jwt_secret: impl Into<String>, token_ttl_hours: i64) -> Self {
        Self {
            orm,
            auth: Arc::new(AuthSettings {
                jwt_secret: jwt_secret.into(),
                token_ttl_hours,
            }),
        }
    }
}

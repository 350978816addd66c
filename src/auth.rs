use async_trait::async_trait;
use pgwire::api::auth::{AuthSource, LoginInfo, Password};
use pgwire::error::PgWireResult;

/// Shared-secret password source for the cleartext startup handshake.
/// Identity comes from the login user name (resolved through the user
/// directory), not from the password.
#[derive(Debug)]
pub struct HangarAuthSource {
    password: String,
}

impl HangarAuthSource {
    pub fn new(password: String) -> Self {
        Self { password }
    }
}

#[async_trait]
impl AuthSource for HangarAuthSource {
    async fn get_password(&self, _login: &LoginInfo) -> PgWireResult<Password> {
        Ok(Password::new(None, self.password.as_bytes().to_vec()))
    }
}

//! 管理员口令校验。

use std::fmt;
use subtle::ConstantTimeEq;

/// 凭据校验能力，上传处理器只依赖这个接口。
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, candidate: &str) -> bool;
}

/// 单一共享口令，常量时间比较。
pub struct SharedPassword {
    secret: String,
}

impl SharedPassword {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for SharedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedPassword")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl CredentialVerifier for SharedPassword {
    fn verify(&self, candidate: &str) -> bool {
        candidate.as_bytes().ct_eq(self.secret.as_bytes()).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_requires_exact_match() {
        let password = SharedPassword::new("hallelujah");
        assert!(password.verify("hallelujah"));
        assert!(!password.verify("Hallelujah"));
        assert!(!password.verify("hallelujah "));
        assert!(!password.verify(""));
    }

    #[test]
    fn debug_output_hides_secret() {
        let password = SharedPassword::new("hallelujah");
        assert!(!format!("{password:?}").contains("hallelujah"));
    }
}

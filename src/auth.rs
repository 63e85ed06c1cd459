/// Admin credential check for the privileged operations.
///
/// Tokens are issued and rotated outside this service; the server only
/// compares what a session presents against the configured secret. With no
/// secret configured the privileged surface stays closed.
#[derive(Debug, Clone, Default)]
pub struct AdminGate {
    token: Option<String>,
}

impl AdminGate {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.is_empty()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.token.is_some()
    }

    pub fn verify(&self, presented: &str) -> bool {
        match &self.token {
            Some(expected) => constant_time_eq(expected.as_bytes(), presented.as_bytes()),
            None => false,
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

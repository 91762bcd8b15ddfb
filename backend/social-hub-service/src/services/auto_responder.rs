use crate::config::SocialConfig;
use crate::models::User;

/// Policy evaluated once for every new friend request.
///
/// When it fires, the request is accepted on the target's behalf through the
/// ordinary accept path, inside the request that created it.
pub trait AutoResponder: Send + Sync {
    fn should_auto_accept(&self, target: &User) -> bool;
}

/// Fires for targets whose handle starts with one of the configured prefixes
/// (case-insensitive)
#[derive(Debug, Clone, Default)]
pub struct PrefixAutoResponder {
    prefixes: Vec<String>,
}

impl PrefixAutoResponder {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            prefixes: prefixes
                .into_iter()
                .map(|p| p.as_ref().trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &SocialConfig) -> Self {
        Self::new(&config.auto_accept_prefixes)
    }
}

impl AutoResponder for PrefixAutoResponder {
    fn should_auto_accept(&self, target: &User) -> bool {
        let handle = target.username.to_lowercase();
        self.prefixes.iter().any(|prefix| handle.starts_with(prefix))
    }
}

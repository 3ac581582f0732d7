//! Context Registry (C4): groups pages into isolation units under a session
//! (spec §3 "Context", §4.3's sibling for non-session isolation).

use dashmap::DashMap;

use crate::{
    error::PageError,
    types::{Context, ContextStatus, ContextType},
};

pub struct ContextRegistry {
    contexts: DashMap<String, Context>,
}

impl Default for ContextRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextRegistry {
    pub fn new() -> Self {
        Self {
            contexts: DashMap::new(),
        }
    }

    pub fn create(&self, session_id: impl Into<String>, r#type: ContextType) -> Context {
        let context = Context::new(session_id, r#type);
        self.contexts.insert(context.id.clone(), context.clone());
        context
    }

    pub fn get(&self, context_id: &str) -> Result<Context, PageError> {
        self.contexts
            .get(context_id)
            .map(|c| c.clone())
            .ok_or_else(|| PageError::ContextNotFound(context_id.to_string()))
    }

    /// Enforces spec §3: "context access requires caller's resolved session
    /// to equal sessionId (or admin role)".
    pub fn check_access(
        &self,
        context_id: &str,
        session_id: &str,
        is_admin: bool,
    ) -> Result<Context, PageError> {
        let context = self.get(context_id)?;
        if is_admin || context.session_id == session_id {
            Ok(context)
        } else {
            Err(PageError::ContextMismatch {
                context_id: context_id.to_string(),
            })
        }
    }

    pub fn list_by_session(&self, session_id: &str) -> Vec<Context> {
        self.contexts
            .iter()
            .filter(|c| c.session_id == session_id)
            .map(|c| c.clone())
            .collect()
    }

    /// Marks one context destroyed. Callers are responsible for cascading
    /// page closure (spec §3 "Destroying a context closes all its pages").
    pub fn destroy(&self, context_id: &str) -> Result<(), PageError> {
        let mut entry = self
            .contexts
            .get_mut(context_id)
            .ok_or_else(|| PageError::ContextNotFound(context_id.to_string()))?;
        entry.status = ContextStatus::Destroyed;
        Ok(())
    }

    /// Destroys every context owned by `session_id` (spec §3 "Destroying a
    /// session destroys all its contexts").
    pub fn destroy_by_session(&self, session_id: &str) -> Vec<String> {
        let ids: Vec<String> = self
            .contexts
            .iter()
            .filter(|c| c.session_id == session_id)
            .map(|c| c.id.clone())
            .collect();
        for id in &ids {
            let _ = self.destroy(id);
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destroying_a_session_cascades_to_its_contexts() {
        let registry = ContextRegistry::new();
        let c1 = registry.create("sess1", ContextType::Default);
        let c2 = registry.create("sess1", ContextType::Incognito);
        let other = registry.create("sess2", ContextType::Default);

        let destroyed = registry.destroy_by_session("sess1");
        assert_eq!(destroyed.len(), 2);
        assert!(destroyed.contains(&c1.id));
        assert!(destroyed.contains(&c2.id));

        assert_eq!(registry.get(&c1.id).unwrap().status, ContextStatus::Destroyed);
        assert_eq!(registry.get(&other.id).unwrap().status, ContextStatus::Active);
    }

    #[test]
    fn cross_session_access_is_rejected_without_admin() {
        let registry = ContextRegistry::new();
        let ctx = registry.create("sess1", ContextType::Default);

        assert!(registry.check_access(&ctx.id, "sess1", false).is_ok());
        assert!(registry.check_access(&ctx.id, "sess2", false).is_err());
        assert!(registry.check_access(&ctx.id, "sess2", true).is_ok());
    }
}

use std::sync::Mutex;

/// Holds a decision the user typed before signing in.
pub trait DraftStore: Send + Sync {
    fn save(&self, text: &str);
    fn load(&self) -> Option<String>;
    fn clear(&self);
}

#[derive(Default)]
pub struct MemoryDraftStore {
    draft: Mutex<Option<String>>,
}

impl DraftStore for MemoryDraftStore {
    fn save(&self, text: &str) {
        if let Ok(mut draft) = self.draft.lock() {
            *draft = Some(text.to_string());
        }
    }

    fn load(&self) -> Option<String> {
        self.draft.lock().ok().and_then(|d| d.clone())
    }

    fn clear(&self) {
        if let Ok(mut draft) = self.draft.lock() {
            *draft = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_load_clear() {
        let store = MemoryDraftStore::default();
        assert_eq!(store.load(), None);
        store.save("Move to Lisbon?");
        store.save("Move to Porto?");
        assert_eq!(store.load().as_deref(), Some("Move to Porto?"));
        store.clear();
        assert_eq!(store.load(), None);
    }
}

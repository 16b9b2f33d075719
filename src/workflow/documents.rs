/// Decides when the documents of a run are fetched.
///
/// The dedup key is the thread identifier: the same thread is fetched at most
/// once until `reset` is called.
#[derive(Debug, Default, Clone)]
pub(crate) struct DocumentFetchRule {
    fetched: Option<String>,
}

impl DocumentFetchRule {
    /// Returns the thread to fetch if `thread_id` has not been fetched yet.
    pub fn observe(&mut self, thread_id: &str) -> Option<String> {
        if thread_id.is_empty() || self.fetched.as_deref() == Some(thread_id) {
            return None;
        }
        self.fetched = Some(thread_id.to_string());
        Some(thread_id.to_string())
    }

    pub fn reset(&mut self) {
        self.fetched = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_per_thread() {
        let mut rule = DocumentFetchRule::default();
        assert_eq!(rule.observe("t-1").as_deref(), Some("t-1"));
        assert_eq!(rule.observe("t-1"), None);
        assert_eq!(rule.observe("t-1"), None);
        assert_eq!(rule.observe("t-2").as_deref(), Some("t-2"));
        assert_eq!(rule.observe("t-2"), None);
    }

    #[test]
    fn empty_thread_never_fires() {
        let mut rule = DocumentFetchRule::default();
        assert_eq!(rule.observe(""), None);
        assert_eq!(rule.observe("t-1").as_deref(), Some("t-1"));
    }

    #[test]
    fn reset_allows_refetch() {
        let mut rule = DocumentFetchRule::default();
        rule.observe("t-1");
        rule.reset();
        assert_eq!(rule.observe("t-1").as_deref(), Some("t-1"));
    }
}

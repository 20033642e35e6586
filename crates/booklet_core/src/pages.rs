use shared::domain::PageSlug;

use crate::forms::FormRegistry;

/// The active page is never stored; it is derived from form validity on every query.
#[derive(Debug, Default, Clone)]
pub struct PageSequencer {
    slugs: Vec<PageSlug>,
}

impl PageSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_slug(&mut self, slug: PageSlug) {
        self.slugs.push(slug);
    }

    pub fn slugs(&self) -> &[PageSlug] {
        &self.slugs
    }

    /// A page is reachable iff every page declared before it is valid.
    pub fn is_reachable(&self, slug: &PageSlug, forms: &FormRegistry) -> bool {
        let mut active = true;
        for declared in &self.slugs {
            if declared == slug || !active {
                break;
            }
            active = forms.is_page_valid(declared);
        }
        active
    }

    pub fn default_slug(&self, forms: &FormRegistry) -> Option<&PageSlug> {
        self.slugs
            .iter()
            .find(|slug| !forms.is_page_valid(slug))
            .or_else(|| self.slugs.last())
    }

    pub fn is_default(&self, slug: &PageSlug, forms: &FormRegistry) -> bool {
        self.default_slug(forms) == Some(slug)
    }
}

#[cfg(test)]
#[path = "tests/pages_tests.rs"]
mod tests;

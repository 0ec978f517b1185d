use crate::resource::Resource;
use crate::tag::{Tag, tags_equal};
use std::fmt;
use std::ops::Not;
use std::rc::Rc;

/// A shareable predicate over `(resource, tag)`.
///
/// Filters are cheap to clone and compose with [`and`](ResourceFilter::and),
/// [`or`](ResourceFilter::or) and `!`.
pub struct ResourceFilter<R> {
    predicate: Rc<dyn Fn(&R, Option<&Tag>) -> bool>,
}

impl<R> Clone for ResourceFilter<R> {
    fn clone(&self) -> Self {
        Self {
            predicate: Rc::clone(&self.predicate),
        }
    }
}

impl<R> fmt::Debug for ResourceFilter<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResourceFilter(..)")
    }
}

impl<R: Resource> Default for ResourceFilter<R> {
    fn default() -> Self {
        Self::any()
    }
}

impl<R: Resource> ResourceFilter<R> {
    pub fn new(predicate: impl Fn(&R, Option<&Tag>) -> bool + 'static) -> Self {
        Self {
            predicate: Rc::new(predicate),
        }
    }

    #[must_use = "filter result should be checked"]
    pub fn test(&self, resource: &R, tag: Option<&Tag>) -> bool {
        (self.predicate)(resource, tag)
    }

    /// Accepts everything.
    pub fn any() -> Self {
        Self::new(|_, _| true)
    }

    /// Rejects everything.
    pub fn none() -> Self {
        Self::new(|_, _| false)
    }

    /// Accepts `resource` with any tag.
    pub fn of_resource(resource: R) -> Self {
        Self::new(move |r, _| *r == resource)
    }

    /// Accepts `resource` only with a tag equal to `tag`.
    pub fn of_resource_exact(resource: R, tag: Option<Tag>) -> Self {
        Self::new(move |r, t| *r == resource && tags_equal(t, tag.as_ref()))
    }

    /// Accepts any of `resources`.
    pub fn of_resources(resources: impl IntoIterator<Item = R>) -> Self {
        let resources: Vec<R> = resources.into_iter().collect();
        Self::new(move |r, _| resources.contains(r))
    }

    /// Accepts any resource whose tag equals `tag`.
    pub fn of_tag(tag: Option<Tag>) -> Self {
        Self::new(move |_, t| tags_equal(t, tag.as_ref()))
    }

    pub fn and(self, other: Self) -> Self {
        Self::new(move |r, t| self.test(r, t) && other.test(r, t))
    }

    pub fn or(self, other: Self) -> Self {
        Self::new(move |r, t| self.test(r, t) || other.test(r, t))
    }
}

impl<R: Resource> Not for ResourceFilter<R> {
    type Output = Self;

    fn not(self) -> Self {
        Self::new(move |r, t| !self.test(r, t))
    }
}

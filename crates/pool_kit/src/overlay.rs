//! Priority-ordered value overrides
//!
//! An [`OverlayableValue`] holds a default plus any number of contributed
//! overrides. The effective value is the contribution with the highest
//! priority; among equal priorities the one latest in the entry list wins.
//! Updating a contribution in place keeps its position in the list.

use std::fmt;

use crate::foundation::Token;

/// One contributed override
#[derive(Debug, Clone, PartialEq)]
struct OverlayEntry<T> {
    token: Token,
    value: T,
    priority: i32,
}

type ChangeListener<T> = Box<dyn FnMut(&T)>;

/// A default value plus prioritized overrides, with change notification
///
/// The effective value is recomputed on every read.
pub struct OverlayableValue<T: Clone + PartialEq> {
    default: T,
    entries: Vec<OverlayEntry<T>>,
    listeners: Vec<(Token, ChangeListener<T>)>,
}

impl<T: Clone + PartialEq> OverlayableValue<T> {
    /// Create an overlay with no contributions
    pub fn new(default: T) -> Self {
        Self {
            default,
            entries: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// Value reported when there are no contributions
    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// Effective value
    pub fn value(&self) -> &T {
        let mut best: Option<&OverlayEntry<T>> = None;
        for entry in &self.entries {
            if best.map_or(true, |current| entry.priority >= current.priority) {
                best = Some(entry);
            }
        }
        best.map_or(&self.default, |entry| &entry.value)
    }

    /// Add a contribution under a fresh token
    pub fn set_value(&mut self, value: T, priority: i32) -> Token {
        let token = Token::create();
        self.set_value_with(token, value, priority);
        token
    }

    /// Add a contribution, or replace the one registered under `token`
    pub fn set_value_with(&mut self, token: Token, value: T, priority: i32) {
        let before = self.value().clone();

        match self.entries.iter_mut().find(|entry| entry.token == token) {
            Some(entry) => {
                entry.value = value;
                entry.priority = priority;
            }
            None => self.entries.push(OverlayEntry { token, value, priority }),
        }

        self.notify_if_changed(&before);
    }

    /// Remove the contribution registered under `token`
    ///
    /// Returns false if no such contribution exists.
    pub fn remove_value(&mut self, token: Token) -> bool {
        let Some(index) = self.entries.iter().position(|entry| entry.token == token) else {
            return false;
        };

        let before = self.value().clone();
        self.entries.remove(index);
        self.notify_if_changed(&before);
        true
    }

    /// Drop every contribution
    pub fn clear(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        let before = self.value().clone();
        self.entries.clear();
        self.notify_if_changed(&before);
    }

    /// Number of contributions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no contributions
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a contribution is registered under `token`
    pub fn contains(&self, token: Token) -> bool {
        self.entries.iter().any(|entry| entry.token == token)
    }

    /// Call `listener` with the new effective value whenever it changes
    pub fn on_value_changed(&mut self, listener: impl FnMut(&T) + 'static) -> Token {
        let token = Token::create();
        self.listeners.push((token, Box::new(listener)));
        token
    }

    /// Remove a change listener
    pub fn unsubscribe(&mut self, token: Token) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(id, _)| *id != token);
        self.listeners.len() != before
    }

    fn notify_if_changed(&mut self, before: &T) {
        if self.value() == before {
            return;
        }
        let current = self.value().clone();
        for (_, listener) in &mut self.listeners {
            listener(&current);
        }
    }
}

impl<T: Clone + PartialEq + fmt::Debug> fmt::Debug for OverlayableValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayableValue")
            .field("value", self.value())
            .field("default", &self.default)
            .field("entries", &self.entries)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorded(overlay: &mut OverlayableValue<f32>) -> Rc<RefCell<Vec<f32>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        overlay.on_value_changed(move |value| sink.borrow_mut().push(*value));
        seen
    }

    #[test]
    fn test_default_without_entries() {
        let overlay = OverlayableValue::new(1.0_f32);
        assert_eq!(*overlay.value(), 1.0);
        assert!(overlay.is_empty());
    }

    #[test]
    fn test_highest_priority_wins() {
        let mut overlay = OverlayableValue::new(0);
        overlay.set_value(10, 5);
        overlay.set_value(20, 1);
        assert_eq!(*overlay.value(), 10);
    }

    #[test]
    fn test_equal_priority_last_writer_wins() {
        let mut overlay = OverlayableValue::new("default");
        let _first = overlay.set_value("first", 3);
        let second = overlay.set_value("second", 3);
        assert_eq!(*overlay.value(), "second");

        assert!(overlay.remove_value(second));
        assert_eq!(*overlay.value(), "first");
    }

    #[test]
    fn test_update_in_place_keeps_position() {
        let mut overlay = OverlayableValue::new(0);
        let first = overlay.set_value(1, 2);
        overlay.set_value(2, 2);

        // Same priority, earlier slot: the later entry still wins
        overlay.set_value_with(first, 3, 2);
        assert_eq!(*overlay.value(), 2);

        overlay.set_value_with(first, 3, 4);
        assert_eq!(*overlay.value(), 3);
    }

    #[test]
    fn test_set_value_with_unknown_token_appends() {
        let mut overlay = OverlayableValue::new(0);
        let token = Token::create();
        overlay.set_value_with(token, 7, 0);

        assert!(overlay.contains(token));
        assert_eq!(overlay.len(), 1);
        assert_eq!(*overlay.value(), 7);
    }

    #[test]
    fn test_notifies_only_on_change() {
        let mut overlay = OverlayableValue::new(1.0_f32);
        let seen = recorded(&mut overlay);

        let high = overlay.set_value(2.0, 10);
        overlay.set_value(3.0, 1);
        overlay.set_value(2.0, 10);
        assert_eq!(*seen.borrow(), vec![2.0]);

        overlay.remove_value(high);
        assert_eq!(*seen.borrow(), vec![2.0]);

        overlay.clear();
        assert_eq!(*seen.borrow(), vec![2.0, 1.0]);

        overlay.clear();
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn test_remove_unknown_token() {
        let mut overlay = OverlayableValue::new(0);
        let seen = Rc::new(RefCell::new(0));
        let counter = seen.clone();
        overlay.on_value_changed(move |_| *counter.borrow_mut() += 1);

        assert!(!overlay.remove_value(Token::create()));
        assert!(!overlay.remove_value(Token::INVALID));
        assert_eq!(*seen.borrow(), 0);
    }

    #[test]
    fn test_unsubscribe() {
        let mut overlay = OverlayableValue::new(0);
        let seen = Rc::new(RefCell::new(0));
        let counter = seen.clone();
        let listener = overlay.on_value_changed(move |_| *counter.borrow_mut() += 1);

        overlay.set_value(1, 0);
        assert!(overlay.unsubscribe(listener));
        assert!(!overlay.unsubscribe(listener));
        overlay.set_value(2, 0);

        assert_eq!(*seen.borrow(), 1);
    }

    #[test]
    fn test_negative_priorities() {
        let mut overlay = OverlayableValue::new(0);
        overlay.set_value(-1, -5);
        assert_eq!(*overlay.value(), -1);
        overlay.set_value(-2, -10);
        assert_eq!(*overlay.value(), -1);
    }
}

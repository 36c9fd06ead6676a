//! Live fields with change notification.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rulemsx_engine::Value;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// A change delivered to notification handlers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    /// Field name (e.g. `EMSX_AMOUNT`, `LAST_PRICE`)
    pub field: String,
    /// Value before the update
    pub old_value: Value,
    /// Value after the update
    pub new_value: Value,
    /// When the update was applied
    pub timestamp: DateTime<Utc>,
}

/// Receiver of field change notifications.
///
/// Handlers run on the thread that applied the update.
pub trait NotificationHandler: Send + Sync {
    /// Called once per update, after the new value is visible.
    fn process_notification(&self, change: &FieldChange);

    /// Whether anything still listens through this handler.
    ///
    /// Inactive handlers are dropped from the field on the next update or
    /// registration.
    fn is_active(&self) -> bool {
        true
    }
}

impl<F> NotificationHandler for F
where
    F: Fn(&FieldChange) + Send + Sync,
{
    fn process_notification(&self, change: &FieldChange) {
        self(change)
    }
}

/// A named field whose value is pushed by a feed.
pub struct FieldFeed {
    name: String,
    value: RwLock<Value>,
    handlers: RwLock<Vec<Arc<dyn NotificationHandler>>>,
}

impl FieldFeed {
    /// Create a field with an initial value.
    pub fn new(name: impl Into<String>, initial: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: RwLock::new(initial.into()),
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value.
    pub fn value(&self) -> Value {
        self.value.read().clone()
    }

    /// Register a handler. Handlers are notified in registration order.
    pub fn add_notification_handler(&self, handler: Arc<dyn NotificationHandler>) {
        let mut handlers = self.handlers.write();
        handlers.retain(|h| h.is_active());
        handlers.push(handler);
    }

    /// Number of active handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.read().iter().filter(|h| h.is_active()).count()
    }

    /// Apply an update and notify every handler.
    ///
    /// Handlers run after all locks are released, so a handler may read
    /// this field or register further handlers.
    pub fn update(&self, new_value: impl Into<Value>) -> FieldChange {
        let new_value = new_value.into();
        let old_value = std::mem::replace(&mut *self.value.write(), new_value.clone());

        let change = FieldChange {
            field: self.name.clone(),
            old_value,
            new_value,
            timestamp: Utc::now(),
        };

        let handlers = {
            let mut handlers = self.handlers.write();
            handlers.retain(|h| h.is_active());
            handlers.clone()
        };
        for handler in handlers {
            handler.process_notification(&change);
        }

        change
    }
}

impl fmt::Debug for FieldFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldFeed")
            .field("name", &self.name)
            .field("value", &self.value())
            .field("handlers", &self.handler_count())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_update_notifies_handlers_in_order() {
        let field = FieldFeed::new("EMSX_AMOUNT", Value::Integer(100));
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second"] {
            let seen = seen.clone();
            field.add_notification_handler(Arc::new(move |change: &FieldChange| {
                seen.lock().push(format!("{}:{}->{}", tag, change.old_value, change.new_value));
            }));
        }

        let change = field.update(Value::Integer(200));

        assert_eq!(change.field, "EMSX_AMOUNT");
        assert_eq!(field.value(), Value::Integer(200));
        assert_eq!(*seen.lock(), vec!["first:100->200", "second:100->200"]);
    }

    struct Expiring(Arc<AtomicBool>, Arc<Mutex<usize>>);

    impl NotificationHandler for Expiring {
        fn process_notification(&self, _change: &FieldChange) {
            *self.1.lock() += 1;
        }

        fn is_active(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn test_inactive_handlers_are_pruned() {
        let field = FieldFeed::new("LAST_PRICE", Value::Empty);
        let active = Arc::new(AtomicBool::new(true));
        let calls = Arc::new(Mutex::new(0));

        field.add_notification_handler(Arc::new(Expiring(active.clone(), calls.clone())));
        field.add_notification_handler(Arc::new(|_: &FieldChange| {}));
        field.update(Value::Integer(1));
        assert_eq!(*calls.lock(), 1);
        assert_eq!(field.handler_count(), 2);

        active.store(false, Ordering::SeqCst);
        assert_eq!(field.handler_count(), 1);

        field.update(Value::Integer(2));
        assert_eq!(*calls.lock(), 1);
        assert_eq!(field.handlers.read().len(), 1);
    }

    #[test]
    fn test_handler_may_read_field() {
        let field = Arc::new(FieldFeed::new("EMSX_EXCHANGE", "US"));
        let observed = Arc::new(Mutex::new(None));

        let f = Arc::downgrade(&field);
        let o = observed.clone();
        field.add_notification_handler(Arc::new(move |_: &FieldChange| {
            if let Some(field) = f.upgrade() {
                *o.lock() = Some(field.value());
            }
        }));

        field.update("LN");
        assert_eq!(*observed.lock(), Some(Value::from("LN")));
    }
}

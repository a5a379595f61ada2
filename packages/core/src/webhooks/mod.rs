//! Outbound webhook notifications.
//!
//! Events are built in [`event`], wrapped in the envelope from [`payload`],
//! sent once by [`dispatcher`] and classified by [`diagnostics`]. The
//! [`notifier`] module ties these together behind a fire-and-forget
//! [`Notifier`] seam.

pub mod diagnostics;
pub mod dispatcher;
pub mod event;
pub mod notifier;
pub mod payload;
pub mod resolver;

pub use diagnostics::{DispatchResult, ErrorKind};
pub use dispatcher::WebhookDispatcher;
pub use event::{EventKind, NotificationEvent, Urgency};
pub use notifier::{NotificationQueue, Notifier, WebhookNotifier};
pub use payload::WebhookPayload;
pub use resolver::{EndpointResolver, EnvWebhookDefaults};

mod local;
mod membership;
mod webhook;

pub use local::{DetachedMirror, TracingAuditLog};
pub use membership::{MemberEntry, StaticMembership};
pub use webhook::{WebhookClient, WebhookConfig};
